//! Caller identity for the REST layer.
//!
//! Authentication itself happens upstream; the resolver only reads who the
//! caller is. `HeaderIdentityResolver` trusts the `X-User-Id` and
//! `X-User-Role` headers set by the gateway.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::io::rest::errors::ApiError;
use crate::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Member,
}

/// The authenticated user behind a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// For members this is their account id
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Only an admin can do this".to_string()))
        }
    }

    /// Admins may act on any account, members only on their own
    pub fn require_self_or_admin(&self, account_id: &str) -> Result<(), ApiError> {
        if self.is_admin() || self.user_id == account_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "You can only access your own account, not '{}'",
                account_id
            )))
        }
    }
}

pub trait IdentityResolver: Send + Sync {
    /// `None` when the request carries no usable identity
    fn current_user(&self, headers: &HeaderMap) -> Option<Caller>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderIdentityResolver;

impl IdentityResolver for HeaderIdentityResolver {
    fn current_user(&self, headers: &HeaderMap) -> Option<Caller> {
        let user_id = headers.get(USER_ID_HEADER)?.to_str().ok()?.trim();
        if user_id.is_empty() {
            return None;
        }
        let role = match headers.get(USER_ROLE_HEADER)?.to_str().ok()?.trim().to_ascii_lowercase().as_str() {
            "admin" => Role::Admin,
            "member" => Role::Member,
            _ => return None,
        };
        Some(Caller {
            user_id: user_id.to_string(),
            role,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        state
            .identity_resolver
            .current_user(&parts.headers)
            .ok_or(ApiError::Unauthenticated)
    }
}
