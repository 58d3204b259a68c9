//! Authenticated caller identity.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UserId;
use crate::error::ApiError;

/// Caller role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular customer.
    User,
    /// Operator with access to every booking and event.
    Admin,
}

impl FromStr for Role {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(ApiError::InvalidRequest(format!("unknown role: {other}"))),
        }
    }
}

/// The authenticated user behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester {
    /// User id.
    pub user_id: UserId,
    /// Role.
    pub role: Role,
}

impl Requester {
    /// Creates a requester.
    #[must_use]
    pub const fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// `true` for admins.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// `true` if the requester owns the resource or is an admin.
    #[must_use]
    pub fn can_access(&self, owner: UserId) -> bool {
        self.user_id == owner || self.is_admin()
    }

    /// Fails with [`ApiError::Forbidden`] unless [`Self::can_access`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] for non-owners without admin role.
    pub fn ensure_access(&self, owner: UserId) -> Result<(), ApiError> {
        if self.can_access(owner) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// Fails with [`ApiError::Forbidden`] unless the requester is an admin.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] for non-admins.
    pub fn ensure_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}
