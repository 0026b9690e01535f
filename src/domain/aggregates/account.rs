//! Account Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EcommerceError, Result};

/// Account identity plus its append-only list of order references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub(crate) id: Uuid,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) is_admin: bool,
    pub(crate) orders: Vec<Uuid>,
    pub(crate) created_at: DateTime<Utc>,
}

impl Account {
    pub fn register(username: impl Into<String>, email: impl Into<String>, is_admin: bool) -> Result<Self> {
        let username = username.into().trim().to_string();
        let email = email.into().trim().to_lowercase();
        if username.len() < 3 { return Err(EcommerceError::validation("username", "must be at least 3 characters")); }
        if !email.contains('@') { return Err(EcommerceError::validation("email", "is invalid")); }
        Ok(Self { id: Uuid::now_v7(), username, email, is_admin, orders: vec![], created_at: Utc::now() })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn email(&self) -> &str { &self.email }
    pub fn orders(&self) -> &[Uuid] { &self.orders }

    pub(crate) fn append_order(&mut self, order_id: Uuid) { self.orders.push(order_id); }
}
