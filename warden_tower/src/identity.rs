use std::fmt;

use axum_core::{
    extract::FromRequestParts,
    response::{IntoResponse, Response},
};
use http::{request::Parts, Extensions};
use warden::jwt::{Subject, SubjectRef};

use crate::response::internal_error;

/// The authenticated subject of a request
///
/// Derived from the `sub` claim of a verified token and attached to the
/// request extensions by [`VerifyJwt`][crate::VerifyJwt].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AuthenticatedIdentity(Subject);

impl AuthenticatedIdentity {
    /// Constructs an identity for the given subject
    #[inline]
    pub fn new(subject: Subject) -> Self {
        Self(subject)
    }

    /// The subject identifier
    #[inline]
    #[must_use]
    pub fn subject(&self) -> &SubjectRef {
        &self.0
    }

    /// The subject identifier as a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Extracts the subject
    #[inline]
    #[must_use]
    pub fn into_subject(self) -> Subject {
        self.0
    }
}

impl fmt::Display for AuthenticatedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Looks up the authenticated identity in request extensions
///
/// Returns `None` when the request was not authenticated, or when the token
/// carried no `sub` claim.
#[must_use]
pub fn authenticated_identity(extensions: &Extensions) -> Option<&AuthenticatedIdentity> {
    extensions.get::<AuthenticatedIdentity>()
}

/// Rejection used when a handler asks for an identity that is not present
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("authenticated identity missing")]
pub struct MissingIdentity;

impl IntoResponse for MissingIdentity {
    fn into_response(self) -> Response {
        internal_error(&self.to_string())
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedIdentity
where
    S: Sync,
{
    type Rejection = MissingIdentity;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        authenticated_identity(&parts.extensions)
            .cloned()
            .ok_or(MissingIdentity)
    }
}
