//! This crate implements the subset of the Javascript/JSON Object Signing and
//! Encryption (JOSE) standards needed to authorize requests that carry bearer
//! tokens issued by an external identity provider:
//!
//! * JSON Web Signature (JWS): [RFC7515][], RSA PKCS#1 v1.5 signatures only
//! * JSON Web Key (JWK): [RFC7517][], keys published with an `x5c`
//!   certificate chain
//! * JSON Web Token (JWT): [RFC7519][], registered claims validation
//!
//! A key becomes usable for verification only once the leading certificate of
//! its `x5c` chain has been wrapped in a PEM envelope and parsed into an RSA
//! public key.
//!
//! [RFC7515]: https://tools.ietf.org/html/rfc7515
//! [RFC7517]: https://tools.ietf.org/html/rfc7517
//! [RFC7519]: https://tools.ietf.org/html/rfc7519
//!
//! # Example
//!
//! ```no_run
//! use warden::{jwk, jwt, jwt::CoreHeaders, Jwks, JwtRef};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let jwks_document = "";
//! let keys: Jwks = serde_json::from_str(jwks_document)?;
//!
//! let token = JwtRef::from_str("eyJhbGciOiJSUzI1NiIsImtpZCI6ImFiYyJ9.e30.c2ln");
//!
//! let validator = jwt::CoreValidator::default()
//!     .require_audience(jwt::Audience::from_static("api"))
//!     .require_issuer(jwt::Issuer::from_static("https://issuer/"));
//!
//! let decomposed: jwt::Decomposed = token.decompose()?;
//! let key = decomposed
//!     .kid()
//!     .and_then(|kid| keys.get_key_by_id(kid))
//!     .ok_or("unable to find appropriate key")?
//!     .public_key()?;
//!
//! let validated: jwt::Validated = decomposed.verify(&key, &validator)?;
//! # let _ = validated;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

pub mod error;
pub mod jwa;
pub mod jwk;
mod jwks;
pub mod jws;
pub mod jwt;

#[cfg(test)]
pub(crate) mod test;

#[doc(inline)]
pub use jwk::Jwk;
#[doc(inline)]
pub use jwks::Jwks;
#[doc(inline)]
pub use jwt::{Jwt, JwtRef};
