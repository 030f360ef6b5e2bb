//! Request authentication
//!
//! An [`Authenticator`] turns the bearer token of an opening request into a
//! typed [`RequestContext`] that is passed explicitly to the handlers.

use crate::protocol::{Status, StatusCode};

/// Caller identity established for one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Authenticated user, if any
    pub user_id: Option<i64>,
}

impl RequestContext {
    /// Context for an unauthenticated caller
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context for an authenticated user
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// Authenticated user id, or `Unauthenticated`
    pub fn require_user(&self) -> Result<i64, Status> {
        self.user_id
            .ok_or_else(|| Status::unauthenticated("user not found"))
    }
}

/// Authentication collaborator
pub trait Authenticator: Send + Sync + 'static {
    /// Validate the `authorization` value of a request
    fn authenticate(&self, authorization: Option<&str>) -> Result<RequestContext, Status>;
}

/// Accepts a single shared bearer token and maps it to a fixed user
#[derive(Debug, Clone)]
pub struct StaticTokenAuthenticator {
    token: String,
    user_id: i64,
}

impl StaticTokenAuthenticator {
    pub fn new(token: impl Into<String>, user_id: i64) -> Self {
        Self {
            token: token.into(),
            user_id,
        }
    }
}

impl Authenticator for StaticTokenAuthenticator {
    fn authenticate(&self, authorization: Option<&str>) -> Result<RequestContext, Status> {
        let header = authorization.ok_or_else(|| {
            Status::unauthenticated("request does not carry an authorization token")
        })?;

        match header.strip_prefix("Bearer ") {
            Some(token) if token == self.token => Ok(RequestContext::for_user(self.user_id)),
            _ => Err(Status::new(
                StatusCode::Unauthenticated,
                "authorization token is not valid",
            )),
        }
    }
}
