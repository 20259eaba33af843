//! Bearer-token authorization against an OAuth2 authorization server
//!
//! An [`Authority`] verifies tokens using keys published by the
//! authorization server in its JSON Web Key Set (JWKS), and optionally
//! checks that the token grants sufficient OAuth2 scope as defined in
//! [RFC 6749](https://datatracker.ietf.org/doc/html/rfc6749).
//!
//! Keys are found through a [`KeyResolver`]. [`RemoteJwks`] fetches the key
//! set over HTTP and keeps it in a time-bounded cache, while [`LocalJwks`]
//! holds a fixed key set in memory.
//!
//! # Example
//!
//! ```no_run
//! use warden::JwtRef;
//! use warden_oauth2::{Authority, AuthorityConfig, BasicClaimsWithScope, ScopePolicy};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuthorityConfig::new("api", "https://issuer/");
//! let authority = Authority::from_config(&config)?;
//!
//! let token = JwtRef::from_str("eyJhbGciOiJSUzI1NiIsImtpZCI6ImFiYyJ9.e30.c2ln");
//! let policy = ScopePolicy::allow_one_from_static("read");
//!
//! let claims: BasicClaimsWithScope = authority
//!     .verify_token_with_policy(token, &policy)
//!     .await?;
//! # let _ = claims;
//! # Ok(())
//! # }
//! ```
//!
//! # Feature flags
//!
//! This crate does not enable TLS support in `reqwest` itself. If your
//! application already uses `reqwest` with some TLS settings, those settings
//! will be used automatically. Otherwise, enable the `default-tls` or
//! `rustls-tls` feature to call out to an HTTPS endpoint.
//!
//! The `tokio` feature (on by default) enables background refreshing of a
//! remote key set.

#![cfg_attr(docsrs, feature(doc_cfg))]
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

mod authority;
mod config;
pub mod jwks;
pub mod oauth2;
mod policy;

pub use authority::{Authority, AuthorityError};
pub use config::AuthorityConfig;
pub use jwks::{KeyResolver, LocalJwks, RemoteJwks, ResolveError, RetrievalError};
pub use oauth2::{
    BasicClaimsWithScope, HasScope, InvalidScopeToken, Scope, ScopeToken, ScopeTokenRef,
};
pub use policy::{InsufficientScope, ScopePolicy};
