mod common;

use rust_decimal::Decimal;
use std::time::Duration;
use uuid::Uuid;

use common::{harness, harness_with, request, sign};
use storefront_orders::service::catalog::{NewProduct, PricingUpdate};
use storefront_orders::service::CreateOrderRequest;
use storefront_orders::{EcommerceError, OrderSettings, OrderStatus, PaymentStatus};

#[tokio::test]
async fn test_place_verify_then_cancel() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;

    let placed = h.service.create_order(h.user.account_id, request(&[(p1.id(), 2)])).await.unwrap();
    let order = &placed.order;
    assert_eq!(h.stock(p1.id()).await, 3);
    assert_eq!(order.total_amount(), Decimal::from(200));
    assert_eq!(order.payment_status(), PaymentStatus::Pending);
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(order.payment_intent_id(), placed.payment_intent.id);
    assert_eq!(h.gateway.last_amount(), Some(20000));
    assert_eq!(h.service.account(h.user.account_id).await.unwrap().orders(), &[order.id()]);
    assert_eq!(h.notifier.kinds(), vec!["placed"]);

    let intent = order.payment_intent_id().to_string();
    let paid = h.service.verify_payment(&intent, "pay_001", &sign(&intent, "pay_001")).await.unwrap();
    assert_eq!(paid.payment_status(), PaymentStatus::Paid);
    assert_eq!(paid.status(), OrderStatus::Processing);
    assert_eq!(paid.payment_confirmation_id(), Some("pay_001"));

    let cancelled = h.service.cancel_order(&h.user, order.id(), "found it cheaper").await.unwrap();
    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_eq!(cancelled.cancel_reason(), Some("found it cheaper"));
    // Stock is not returned and the order stays on record.
    assert_eq!(h.stock(p1.id()).await, 3);
    assert_eq!(h.service.account(h.user.account_id).await.unwrap().orders(), &[order.id()]);
    let stored = h.service.order(&h.user, order.id()).await.unwrap();
    assert_eq!(stored.status_history().len(), 3);
    assert_eq!(h.notifier.kinds(), vec!["placed", "payment_confirmed", "cancelled"]);
}

#[tokio::test]
async fn test_insufficient_stock_leaves_stock_untouched() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;

    let err = h.service.create_order(h.user.account_id, request(&[(p1.id(), 10)])).await.unwrap_err();
    match err {
        EcommerceError::InsufficientStock { product_id, requested, available } => {
            assert_eq!((product_id, requested, available), (p1.id(), 10, 5));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(h.stock(p1.id()).await, 5);
    assert_eq!(h.gateway.calls(), 0);
    assert!(h.service.account_orders(&h.user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_huge_quantity_is_a_stock_failure() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;

    let err = h.service.create_order(h.user.account_id, request(&[(p1.id(), 200_000)])).await.unwrap_err();
    assert!(matches!(err, EcommerceError::InsufficientStock { requested: 200_000, available: 5, .. }), "{err:?}");
    assert_eq!(h.stock(p1.id()).await, 5);
}

#[tokio::test]
async fn test_overflowing_total_is_rejected_and_rolled_back() {
    let h = harness().await;
    let vault = NewProduct { name: "Vault".into(), price: Decimal::MAX, discount_percent: Decimal::ZERO, stock: 5 };
    let vault = h.service.create_product(&h.admin, vault).await.unwrap();

    let err = h.service.create_order(h.user.account_id, request(&[(vault.id(), 2)])).await.unwrap_err();
    match err {
        EcommerceError::Validation { field, .. } => assert_eq!(field, "lineTotal"),
        other => panic!("unexpected {other:?}"),
    }

    let err = h.service.create_order(h.user.account_id, request(&[(vault.id(), 1)])).await.unwrap_err();
    match err {
        EcommerceError::Validation { field, .. } => assert_eq!(field, "totalAmount"),
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(h.stock(vault.id()).await, 5);
    assert_eq!(h.gateway.calls(), 0);
    assert!(h.service.account_orders(&h.user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_product_lines_reserve_cumulatively() {
    let h = harness().await;
    let p1 = h.product("Mug", 10, 0, 3).await;

    let err = h.service.create_order(h.user.account_id, request(&[(p1.id(), 2), (p1.id(), 2)])).await.unwrap_err();
    assert!(matches!(err, EcommerceError::InsufficientStock { .. }));
    assert_eq!(h.stock(p1.id()).await, 3);
}

#[tokio::test]
async fn test_gateway_failure_rolls_back_everything() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;
    let p2 = h.product("Bulb", 5, 0, 10).await;
    h.gateway.fail_next(true);

    let err = h.service.create_order(h.user.account_id, request(&[(p1.id(), 2), (p2.id(), 4)])).await.unwrap_err();
    assert!(matches!(err, EcommerceError::PaymentGateway(_)));
    assert_eq!(h.stock(p1.id()).await, 5);
    assert_eq!(h.stock(p2.id()).await, 10);
    assert!(h.service.account_orders(&h.user).await.unwrap().is_empty());
    assert!(h.notifier.kinds().is_empty());
}

#[tokio::test]
async fn test_slow_gateway_times_out_without_partial_writes() {
    let h = harness_with(OrderSettings { currency: "INR".into(), tx_timeout: Duration::from_millis(50) }).await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;
    h.gateway.delay(Duration::from_millis(500));

    let err = h.service.create_order(h.user.account_id, request(&[(p1.id(), 1)])).await.unwrap_err();
    assert!(matches!(err, EcommerceError::Timeout));
    assert_eq!(h.stock(p1.id()).await, 5);
    assert!(h.service.account_orders(&h.user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_total_uses_prices_captured_at_order_time() {
    let h = harness().await;
    let lamp = h.product("Desk Lamp", 200, 50, 5).await;
    let bulb = h.product("Bulb", 15, 0, 20).await;

    let placed = h.service.create_order(h.user.account_id, request(&[(lamp.id(), 2), (bulb.id(), 3)])).await.unwrap();
    let order = placed.order;
    assert_eq!(order.line_items()[0].unit_price, Decimal::from(100));
    assert_eq!(order.total_amount(), Decimal::from(245));
    let sum: Decimal = order.line_items().iter().map(|l| l.unit_price * Decimal::from(l.quantity)).sum();
    assert_eq!(order.total_amount(), sum);

    let update = PricingUpdate { price: Some(Decimal::from(900)), discount_percent: Some(Decimal::ZERO) };
    let repriced = h.service.update_pricing(&h.admin, lamp.id(), update).await.unwrap();
    assert_eq!(repriced.price_after_discount(), Decimal::from(900));

    let stored = h.service.order(&h.user, order.id()).await.unwrap();
    assert_eq!(stored.total_amount(), Decimal::from(245));
    assert_eq!(stored.line_items()[0].unit_price, Decimal::from(100));
}

#[tokio::test]
async fn test_amount_sent_to_gateway_rounds_half_away_from_zero() {
    let h = harness().await;
    // 0.99 * (1 - 0.5) = 0.495 -> 49.5 minor units -> 50
    let product = h
        .service
        .create_product(
            &h.admin,
            storefront_orders::service::catalog::NewProduct {
                name: "Sticker".into(),
                price: Decimal::new(99, 2),
                discount_percent: Decimal::from(50),
                stock: 10,
            },
        )
        .await
        .unwrap();
    h.service.create_order(h.user.account_id, request(&[(product.id(), 1)])).await.unwrap();
    assert_eq!(h.gateway.last_amount(), Some(50));
}

#[tokio::test]
async fn test_concurrent_orders_never_overdraw() {
    let h = harness().await;
    let p1 = h.product("Limited Print", 50, 0, 5).await;

    let a = h.service.create_order(h.user.account_id, request(&[(p1.id(), 3)]));
    let b = h.service.create_order(h.other.account_id, request(&[(p1.id(), 3)]));
    let (a, b) = tokio::join!(a, b);

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let failed = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert!(matches!(failed, EcommerceError::InsufficientStock { .. }));
    assert_eq!(h.stock(p1.id()).await, 2);
}

#[tokio::test]
async fn test_many_concurrent_orders_keep_stock_non_negative() {
    let h = harness().await;
    let p1 = h.product("Limited Print", 50, 0, 7).await;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let service = h.service.clone();
        let account = h.user.account_id;
        let id = p1.id();
        tasks.push(tokio::spawn(async move { service.create_order(account, request(&[(id, 1)])).await }));
    }
    let mut succeeded = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 7);
    assert_eq!(h.stock(p1.id()).await, 0);
    assert_eq!(h.service.account_orders(&h.user).await.unwrap().len(), 7);
}

#[tokio::test]
async fn test_verification_is_idempotent() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;
    let placed = h.service.create_order(h.user.account_id, request(&[(p1.id(), 1)])).await.unwrap();
    let intent = placed.payment_intent.id.clone();
    let sig = sign(&intent, "pay_42");

    let first = h.service.verify_payment(&intent, "pay_42", &sig).await.unwrap();
    let second = h.service.verify_payment(&intent, "pay_42", &sig).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second.status_history().len(), 2);
    assert_eq!(h.notifier.kinds(), vec!["placed", "payment_confirmed"]);
}

#[tokio::test]
async fn test_tampered_signature_marks_payment_failed() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;
    let placed = h.service.create_order(h.user.account_id, request(&[(p1.id(), 1)])).await.unwrap();
    let intent = placed.payment_intent.id.clone();
    let forged = sign(&intent, "pay_other");

    let err = h.service.verify_payment(&intent, "pay_1", &forged).await.unwrap_err();
    assert!(matches!(err, EcommerceError::PaymentVerificationFailed));
    let stored = h.service.order(&h.user, placed.order.id()).await.unwrap();
    assert_eq!(stored.payment_status(), PaymentStatus::Failed);
    assert_eq!(stored.status(), OrderStatus::Pending);
    assert_eq!(stored.payment_confirmation_id(), None);
    assert_eq!(h.notifier.kinds(), vec!["placed", "payment_failed"]);

    // A genuine confirmation afterwards still goes through.
    let paid = h.service.verify_payment(&intent, "pay_1", &sign(&intent, "pay_1")).await.unwrap();
    assert_eq!(paid.payment_status(), PaymentStatus::Paid);
}

#[tokio::test]
async fn test_tampered_replay_does_not_downgrade_paid_order() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;
    let placed = h.service.create_order(h.user.account_id, request(&[(p1.id(), 1)])).await.unwrap();
    let intent = placed.payment_intent.id.clone();
    h.service.verify_payment(&intent, "pay_1", &sign(&intent, "pay_1")).await.unwrap();

    let err = h.service.verify_payment(&intent, "pay_1", "deadbeef").await.unwrap_err();
    assert!(matches!(err, EcommerceError::PaymentVerificationFailed));
    let stored = h.service.order(&h.user, placed.order.id()).await.unwrap();
    assert_eq!(stored.payment_status(), PaymentStatus::Paid);
    assert_eq!(stored.status(), OrderStatus::Processing);
}

#[tokio::test]
async fn test_verify_rejects_unknown_intent_and_missing_fields() {
    let h = harness().await;
    let err = h.service.verify_payment("order_nope", "pay_1", &sign("order_nope", "pay_1")).await.unwrap_err();
    assert!(matches!(err, EcommerceError::NotFound(_)));

    match h.service.verify_payment("order_x", "", "abc").await.unwrap_err() {
        EcommerceError::Validation { field, .. } => assert_eq!(field, "confirmationId"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_request_validation_names_the_field() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;

    let field_of = |err: EcommerceError| match err {
        EcommerceError::Validation { field, .. } => field,
        other => panic!("unexpected {other:?}"),
    };

    let empty = request(&[]);
    assert_eq!(field_of(h.service.create_order(h.user.account_id, empty).await.unwrap_err()), "lineItems");

    let zero = request(&[(p1.id(), 0)]);
    assert_eq!(field_of(h.service.create_order(h.user.account_id, zero).await.unwrap_err()), "lineItems[0].quantity");

    let mut bad_zip: CreateOrderRequest = request(&[(p1.id(), 1)]);
    bad_zip.delivery_address.postal_code = "5600".into();
    assert_eq!(field_of(h.service.create_order(h.user.account_id, bad_zip).await.unwrap_err()), "deliveryAddress.postalCode");

    let mut no_street = request(&[(p1.id(), 1)]);
    no_street.delivery_address.street = String::new();
    assert_eq!(field_of(h.service.create_order(h.user.account_id, no_street).await.unwrap_err()), "deliveryAddress.street");

    assert_eq!(h.stock(p1.id()).await, 5);
}

#[tokio::test]
async fn test_unknown_product_or_account() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;

    let err = h.service.create_order(h.user.account_id, request(&[(p1.id(), 1), (Uuid::new_v4(), 1)])).await.unwrap_err();
    assert!(matches!(err, EcommerceError::NotFound(ref what) if what.starts_with("Product")));
    assert_eq!(h.stock(p1.id()).await, 5);

    let err = h.service.create_order(Uuid::new_v4(), request(&[(p1.id(), 1)])).await.unwrap_err();
    assert!(matches!(err, EcommerceError::NotFound(ref what) if what.starts_with("Account")));
}

#[tokio::test]
async fn test_cancellation_rules() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;
    let order = h.service.create_order(h.user.account_id, request(&[(p1.id(), 1)])).await.unwrap().order;

    let err = h.service.cancel_order(&h.other, order.id(), "not mine").await.unwrap_err();
    assert!(matches!(err, EcommerceError::NotAuthorized));
    let err = h.service.cancel_order(&h.user, order.id(), "  ").await.unwrap_err();
    assert!(matches!(err, EcommerceError::Validation { .. }));
    let err = h.service.cancel_order(&h.user, Uuid::new_v4(), "gone").await.unwrap_err();
    assert!(matches!(err, EcommerceError::NotFound(_)));

    h.service.update_status(&h.admin, order.id(), OrderStatus::Shipped, None).await.unwrap();
    let err = h.service.cancel_order(&h.user, order.id(), "too slow").await.unwrap_err();
    assert!(matches!(err, EcommerceError::InvalidTransition { from: OrderStatus::Shipped, to: OrderStatus::Cancelled }));
}

#[tokio::test]
async fn test_admin_status_updates() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;
    let order = h.service.create_order(h.user.account_id, request(&[(p1.id(), 1)])).await.unwrap().order;

    let err = h.service.update_status(&h.user, order.id(), OrderStatus::Delivered, None).await.unwrap_err();
    assert!(matches!(err, EcommerceError::NotAuthorized));

    // Skipping straight to delivered is allowed.
    let delivered = h.service.update_status(&h.admin, order.id(), OrderStatus::Delivered, None).await.unwrap();
    assert_eq!(delivered.status(), OrderStatus::Delivered);
    let history: Vec<_> = delivered.status_history().iter().map(|c| c.status).collect();
    assert_eq!(history, vec![OrderStatus::Pending, OrderStatus::Delivered]);

    let cancelled = h.service.update_status(&h.admin, order.id(), OrderStatus::Cancelled, None).await.unwrap();
    assert_eq!(cancelled.cancel_reason(), Some("No reason provided"));
    let err = h.service.update_status(&h.admin, order.id(), OrderStatus::Processing, None).await.unwrap_err();
    assert!(matches!(err, EcommerceError::InvalidTransition { .. }));
    assert_eq!(h.notifier.kinds(), vec!["placed", "status_changed", "cancelled"]);
}

#[tokio::test]
async fn test_orders_are_private_to_owner_and_admin() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;
    let order = h.service.create_order(h.user.account_id, request(&[(p1.id(), 1)])).await.unwrap().order;

    assert!(h.service.order(&h.user, order.id()).await.is_ok());
    assert!(h.service.order(&h.admin, order.id()).await.is_ok());
    assert!(matches!(h.service.order(&h.other, order.id()).await, Err(EcommerceError::NotAuthorized)));
    assert!(h.service.account_orders(&h.other).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_notification_failure_does_not_undo_order() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 5).await;
    h.notifier.fail(true);

    let placed = h.service.create_order(h.user.account_id, request(&[(p1.id(), 1)])).await.unwrap();
    assert_eq!(h.stock(p1.id()).await, 4);
    let intent = placed.payment_intent.id.clone();
    let paid = h.service.verify_payment(&intent, "pay_1", &sign(&intent, "pay_1")).await.unwrap();
    assert_eq!(paid.payment_status(), PaymentStatus::Paid);
}

#[tokio::test]
async fn test_restock_is_explicit() {
    let h = harness().await;
    let p1 = h.product("Desk Lamp", 100, 0, 2).await;
    h.service.create_order(h.user.account_id, request(&[(p1.id(), 2)])).await.unwrap();
    assert_eq!(h.stock(p1.id()).await, 0);

    assert!(matches!(h.service.restock(&h.user, p1.id(), 5).await, Err(EcommerceError::NotAuthorized)));
    assert_eq!(h.service.restock(&h.admin, p1.id(), 5).await.unwrap().stock(), 5);
    assert!(matches!(h.service.restock(&h.admin, p1.id(), 0).await, Err(EcommerceError::Validation { .. })));
}
