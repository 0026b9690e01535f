//! Bearer token verification
//!
//! Tokens are issued by the identity service; this side only checks them.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::service::Caller;
use crate::EcommerceError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    #[serde(default)]
    pub admin: bool,
    pub exp: u64,
}

/// The verified caller of a request.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Caller);

pub fn verify_token(token: &str, secret: &str) -> Result<Caller, EcommerceError> {
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::new(Algorithm::HS256))
        .map_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
            EcommerceError::Unauthenticated
        })?;
    let account_id = Uuid::parse_str(&data.claims.sub).map_err(|_| EcommerceError::Unauthenticated)?;
    Ok(Caller { account_id, is_admin: data.claims.admin })
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(EcommerceError::Unauthenticated)?;
        verify_token(token.trim(), &state.jwt_secret).map(AuthUser)
    }
}
