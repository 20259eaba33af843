//! Signing and verification of JSON Web Signatures ([RFC 7515][])
//!
//! Only the compact serialization is supported, and keys are RSA keys
//! used with one of the algorithms in [`jwa::Algorithm`].
//!
//! [RFC 7515]: https://tools.ietf.org/html/rfc7515

use crate::{error, jwa};

/// A key able to check a signature over a signing input
pub trait Verifier {
    /// Checks `signature` over `data` using `alg`
    ///
    /// # Errors
    ///
    /// Fails when the signature was not produced by the matching private
    /// key over exactly this data.
    fn verify(
        &self,
        alg: jwa::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::SignatureMismatch>;
}

/// A key able to produce a signature over a signing input
#[cfg(any(test, feature = "private-keys"))]
#[cfg_attr(docsrs, doc(cfg(feature = "private-keys")))]
pub trait Signer {
    /// Signs `data` using `alg`
    ///
    /// # Errors
    ///
    /// Fails only if the cryptographic backend fails.
    fn sign(&self, alg: jwa::Algorithm, data: &[u8]) -> Result<Vec<u8>, error::Unexpected>;
}
