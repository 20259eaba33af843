//! Tower middleware that authenticates bearer tokens and enforces OAuth2
//! scopes, for use with `axum` and other `tower`-based servers.
//!
//! An [`Authorizer`] wraps a [`warden_oauth2::Authority`] and produces two
//! kinds of layers:
//!
//! * [`Authorizer::jwt_layer`] requires a valid bearer token. Requests
//!   without one are rejected with `401 Unauthorized`. Accepted requests
//!   carry the [`AuthenticatedIdentity`] of the token's subject.
//! * [`Authorizer::scope_layer`] requires a bearer token whose `scope`
//!   claim satisfies a [`ScopePolicy`][warden_oauth2::ScopePolicy]. With
//!   the default [`TerseErrorHandler`], every failure is reported as
//!   `403 Forbidden` with the body `{"message":"Insufficient scope."}`.
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use warden_oauth2::{Authority, AuthorityConfig, ScopeToken};
//! use warden_tower::{AuthenticatedIdentity, Authorizer};
//!
//! # fn build() -> Result<Router, Box<dyn std::error::Error>> {
//! let config = AuthorityConfig::new("api", "https://issuer.example/");
//! let authorizer = Authorizer::new(Authority::from_config(&config)?);
//!
//! let app = Router::new()
//!     .route(
//!         "/documents",
//!         get(list_documents)
//!             .layer(authorizer.require_scope(ScopeToken::from_static("read"))),
//!     )
//!     .route("/whoami", get(whoami))
//!     .layer(authorizer.jwt_layer())
//!     .layer(warden_tower::request_id::layer());
//! # Ok(app)
//! # }
//!
//! async fn list_documents() -> &'static str {
//!     "[]"
//! }
//!
//! async fn whoami(identity: AuthenticatedIdentity) -> String {
//!     identity.to_string()
//! }
//! ```

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

use std::{fmt, future::Future, marker::PhantomData, pin::Pin};

mod authorizer;
mod identity;
mod jwt;
pub mod request_id;
pub mod response;
mod scope;

pub use authorizer::Authorizer;
pub use identity::{authenticated_identity, AuthenticatedIdentity, MissingIdentity};
pub use jwt::{OnJwtError, VerifyJwt};
pub use scope::{OnScopeError, VerifyScope};

pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

macro_rules! error_handler {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<ResBody = axum_core::body::Body> {
            _ty: PhantomData<fn() -> ResBody>,
        }

        impl<ResBody> $name<ResBody> {
            /// Instantiates a new instance over a given body type
            #[inline]
            pub fn new() -> Self {
                Self { _ty: PhantomData }
            }
        }

        impl<ResBody> fmt::Debug for $name<ResBody> {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(stringify!($name))
            }
        }

        impl<ResBody> Default for $name<ResBody> {
            #[inline]
            fn default() -> Self {
                Self { _ty: PhantomData }
            }
        }

        impl<ResBody> Clone for $name<ResBody> {
            #[inline]
            fn clone(&self) -> Self {
                Self { _ty: PhantomData }
            }
        }

        impl<ResBody> Copy for $name<ResBody> {}
    };
}

error_handler! {
    /// Responders that reveal as little as possible about a failure
    ///
    /// Authentication failures produce `401 {"message":"Unauthorized."}`.
    /// Scope checks produce `403 {"message":"Insufficient scope."}` whatever
    /// the cause. A key set that cannot be retrieved produces
    /// `500 Internal Server Error`.
    TerseErrorHandler
}

error_handler! {
    /// Responders that describe the cause of a failure
    ///
    /// The response message and the `www-authenticate` header carry the
    /// rendered error. Scope checks report an invalid token as `401`, a
    /// token that could not be checked as `500`, and a lack of scope as
    /// `403`.
    VerboseErrorHandler
}
