//! Caller identity: the [`IdentityProvider`] collaborator and the
//! [`Requester`] extractors built on it.
//!
//! Authentication itself happens upstream. [`HeaderIdentity`] trusts the
//! `x-user-id` / `x-user-role` headers set by the authenticating proxy;
//! [`StubIdentity`] answers every request with one configured user and is
//! only ever selected through configuration.

use std::fmt::Debug;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::{Requester, Role, UserId};
use crate::error::ApiError;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Resolves the caller of a request.
pub trait IdentityProvider: Send + Sync + Debug {
    /// Returns the requester, `None` for anonymous requests.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] if identity headers are present
    /// but malformed.
    fn identify(&self, headers: &HeaderMap) -> Result<Option<Requester>, ApiError>;
}

/// Identity taken from proxy-supplied headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderIdentity;

impl IdentityProvider for HeaderIdentity {
    fn identify(&self, headers: &HeaderMap) -> Result<Option<Requester>, ApiError> {
        let Some(raw_id) = headers.get(USER_ID_HEADER) else {
            return Ok(None);
        };
        let user_id = raw_id
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<uuid::Uuid>().ok())
            .map(UserId::from_uuid)
            .ok_or(ApiError::Unauthorized)?;
        let role = match headers.get(USER_ROLE_HEADER) {
            Some(raw_role) => raw_role
                .to_str()
                .ok()
                .and_then(|value| value.parse::<Role>().ok())
                .ok_or(ApiError::Unauthorized)?,
            None => Role::User,
        };
        Ok(Some(Requester::new(user_id, role)))
    }
}

/// Fixed identity for local development.
#[derive(Debug, Clone, Copy)]
pub struct StubIdentity {
    requester: Requester,
}

impl StubIdentity {
    /// Creates a provider that always answers with `requester`.
    #[must_use]
    pub const fn new(requester: Requester) -> Self {
        Self { requester }
    }
}

impl IdentityProvider for StubIdentity {
    fn identify(&self, _headers: &HeaderMap) -> Result<Option<Requester>, ApiError> {
        Ok(Some(self.requester))
    }
}

impl FromRequestParts<AppState> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .identity
            .identify(&parts.headers)?
            .ok_or(ApiError::Unauthorized)
    }
}

impl OptionalFromRequestParts<AppState> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        state.identity.identify(&parts.headers)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn missing_headers_are_anonymous() {
        let Ok(found) = HeaderIdentity.identify(&HeaderMap::new()) else {
            panic!("anonymous request should not fail");
        };
        assert!(found.is_none());
    }

    #[test]
    fn headers_resolve_user_and_role() {
        let map = headers(&[
            (USER_ID_HEADER, "0b6f7e36-4a1c-4c59-9c2d-3f1e2a8b9c01"),
            (USER_ROLE_HEADER, "Admin"),
        ]);
        let Ok(Some(requester)) = HeaderIdentity.identify(&map) else {
            panic!("identity expected");
        };
        assert!(requester.is_admin());
        assert_eq!(
            requester.user_id.to_string(),
            "0b6f7e36-4a1c-4c59-9c2d-3f1e2a8b9c01"
        );

        let map = headers(&[(USER_ID_HEADER, "0b6f7e36-4a1c-4c59-9c2d-3f1e2a8b9c01")]);
        let Ok(Some(requester)) = HeaderIdentity.identify(&map) else {
            panic!("identity expected");
        };
        assert_eq!(requester.role, Role::User);
    }

    #[test]
    fn malformed_headers_are_unauthorized() {
        let map = headers(&[(USER_ID_HEADER, "not-a-uuid")]);
        assert!(matches!(
            HeaderIdentity.identify(&map),
            Err(ApiError::Unauthorized)
        ));
        let map = headers(&[
            (USER_ID_HEADER, "0b6f7e36-4a1c-4c59-9c2d-3f1e2a8b9c01"),
            (USER_ROLE_HEADER, "root"),
        ]);
        assert!(matches!(
            HeaderIdentity.identify(&map),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn stub_ignores_headers() {
        let requester = Requester::new(UserId::new(), Role::Admin);
        let Ok(Some(found)) = StubIdentity::new(requester).identify(&HeaderMap::new()) else {
            panic!("stub identity expected");
        };
        assert_eq!(found, requester);
    }
}
