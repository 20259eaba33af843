use aliri_base64::{Base64Url, Base64UrlRef};
use openssl::x509::X509;

use crate::{error, jwa, jws};

const MIN_MODULUS_BYTES: usize = 256;
const MAX_MODULUS_BYTES: usize = 1024;

/// RSA public key components
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PublicKey {
    modulus: Base64Url,
    exponent: Base64Url,
}

impl PublicKey {
    /// The public key's modulus
    pub fn modulus(&self) -> &Base64UrlRef {
        &self.modulus
    }

    /// The public key's exponent
    pub fn exponent(&self) -> &Base64UrlRef {
        &self.exponent
    }

    /// Extracts the RSA public key from a PEM-encoded X.509 certificate
    ///
    /// # Errors
    ///
    /// The certificate cannot be parsed, or its subject key is not an RSA key
    /// of an acceptable size.
    pub fn from_certificate_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let cert = X509::from_pem(pem.as_bytes()).map_err(error::key_rejected)?;
        let rsa = cert
            .public_key()
            .and_then(|key| key.rsa())
            .map_err(error::key_rejected)?;

        Self::from_components(
            Base64Url::from_raw(rsa.n().to_vec()),
            Base64Url::from_raw(rsa.e().to_vec()),
        )
    }

    /// Constructs a public key from the modulus and exponent
    ///
    /// # Errors
    ///
    /// The modulus is smaller than 2048 bits or larger than 8192 bits.
    pub fn from_components(
        modulus: impl Into<Base64Url>,
        exponent: impl Into<Base64Url>,
    ) -> Result<Self, error::KeyRejected> {
        let modulus = modulus.into();
        let exponent = exponent.into();

        let len = modulus.as_slice().len();
        if !(MIN_MODULUS_BYTES..=MAX_MODULUS_BYTES).contains(&len) {
            return Err(error::key_rejected(
                "key modulus must be between 2048 and 8192 bits",
            ));
        }

        if exponent.as_slice().is_empty() {
            return Err(error::key_rejected("key exponent is empty"));
        }

        Ok(Self { modulus, exponent })
    }
}

impl jws::Verifier for PublicKey {
    fn verify(
        &self,
        alg: jwa::Algorithm,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), error::SignatureMismatch> {
        let pk = ring::signature::RsaPublicKeyComponents {
            n: self.modulus.as_slice(),
            e: self.exponent.as_slice(),
        };

        pk.verify(alg.into_verification_params(), data, signature)
            .map_err(|_| error::SignatureMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{jwa::rsa::PrivateKey, jws::Signer, jws::Verifier};

    #[test]
    fn rejects_short_modulus() {
        let result = PublicKey::from_components(
            Base64Url::from_raw(vec![0xab; 128]),
            Base64Url::from_raw(vec![1, 0, 1]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_garbage_certificate() {
        let pem = "-----BEGIN CERTIFICATE-----\nbm90IGEgY2VydGlmaWNhdGU=\n-----END CERTIFICATE-----\n";
        assert!(PublicKey::from_certificate_pem(pem).is_err());
    }

    #[test]
    fn verifies_signature_from_matching_private_key() -> color_eyre::Result<()> {
        let key = PrivateKey::generate()?;
        let data = b"header.payload";
        let signature = key.sign(jwa::Algorithm::RS256, data)?;

        key.public_key()
            .verify(jwa::Algorithm::RS256, data, &signature)?;
        assert!(key
            .public_key()
            .verify(jwa::Algorithm::RS256, b"header.tampered", &signature)
            .is_err());
        Ok(())
    }
}
