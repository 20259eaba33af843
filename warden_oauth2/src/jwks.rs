//! Resolution of verification keys from a JSON Web Key Set (JWKS)

use std::{fmt, future::Future, pin::Pin};

use reqwest::StatusCode;
use thiserror::Error;
use warden::{error::KeyRejected, jwa::rsa::PublicKey, jwk::KeyIdRef, Jwk, Jwks};

mod local;
mod remote;

pub use local::LocalJwks;
pub use remote::RemoteJwks;

/// The future returned by a [`KeyResolver`]
pub type ResolveFuture<'a> =
    Pin<Box<dyn Future<Output = Result<PublicKey, ResolveError>> + Send + 'a>>;

/// A source of verification keys
///
/// Given the key ID declared in a token header, a resolver produces the
/// public key that should be used to verify the token's signature.
pub trait KeyResolver: fmt::Debug + Send + Sync + 'static {
    /// Resolves the key identified by `kid`
    ///
    /// A token that does not declare a key ID is never matched.
    fn resolve<'a>(&'a self, kid: Option<&'a KeyIdRef>) -> ResolveFuture<'a>;
}

/// An error occurring while retrieving a key set from its endpoint
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The HTTP request could not be completed
    #[error("request for key set at {url} failed")]
    Request {
        /// The key set endpoint
        url: String,
        /// The underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint responded with an unexpected status
    #[error("key set endpoint at {url} responded with status {status}")]
    Status {
        /// The key set endpoint
        url: String,
        /// The response status
        status: StatusCode,
    },

    /// The response body was not a key set document
    #[error("response from {url} is not a valid key set")]
    Parse {
        /// The key set endpoint
        url: String,
        /// The underlying decoding error
        #[source]
        source: reqwest::Error,
    },
}

/// An error occurring while resolving a verification key
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The key set could not be retrieved
    #[error("unable to retrieve key set")]
    Retrieval(#[from] RetrievalError),

    /// No key in the key set matches the token's key ID
    #[error("unable to find appropriate key")]
    UnknownKeyId,

    /// A key matched, but its certificate does not hold a usable RSA key
    #[error("matching key rejected")]
    KeyRejected(#[from] KeyRejected),
}

/// Finds the first key matching `kid` and extracts its public key
///
/// `Ok(None)` means the key set holds no such key.
fn select_key(jwks: &Jwks, kid: &KeyIdRef) -> Result<Option<PublicKey>, ResolveError> {
    match jwks.get_key_by_id(kid) {
        Some(jwk) => public_key_of(jwk).map(Some),
        None => Ok(None),
    }
}

fn public_key_of(jwk: &Jwk) -> Result<PublicKey, ResolveError> {
    jwk.public_key().map_err(|err| {
        let error: &dyn std::error::Error = &err;
        tracing::warn!(error, jwk.kid = ?jwk.key_id(), "matching key rejected");
        ResolveError::KeyRejected(err)
    })
}
