//! Implementations of the JSON Web Keys (JWK) standard
//!
//! The specifications for JSON Web Keys can be found in [RFC7517][]. Keys are
//! consumed through their `x5c` certificate chain: the leading certificate is
//! re-encoded as PEM and its RSA public key extracted.
//!
//! [RFC7517]: https://tools.ietf.org/html/rfc7517

use aliri_base64::{Base64, Base64Ref, Base64Url, Base64UrlRef};
use aliri_braid::braid;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

use crate::{error, jwa::rsa::PublicKey};

const PEM_LINE_WIDTH: usize = 64;
const PEM_HEADER: &str = "-----BEGIN CERTIFICATE-----";
const PEM_FOOTER: &str = "-----END CERTIFICATE-----";

/// An identifier for a JWK
#[braid(serde, ref_doc = "A borrowed reference to JWK identifier ([`KeyId`])")]
pub struct KeyId;

/// The intended use for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub enum Usage {
    /// The key is intended for signing and verification
    #[serde(rename = "sig")]
    Signing,

    /// The key is intended for encryption
    #[serde(rename = "enc")]
    Encryption,
}

/// An identified JSON Web Key
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Jwk {
    #[serde(rename = "kty", default, skip_serializing_if = "Option::is_none")]
    key_type: Option<String>,

    #[serde(rename = "kid", default, skip_serializing_if = "Option::is_none")]
    key_id: Option<KeyId>,

    #[serde(
        rename = "use",
        default,
        deserialize_with = "informational",
        skip_serializing_if = "Option::is_none"
    )]
    usage: Option<Usage>,

    #[serde(
        rename = "n",
        default,
        deserialize_with = "informational",
        skip_serializing_if = "Option::is_none"
    )]
    modulus: Option<Base64Url>,

    #[serde(
        rename = "e",
        default,
        deserialize_with = "informational",
        skip_serializing_if = "Option::is_none"
    )]
    exponent: Option<Base64Url>,

    #[serde(rename = "x5c", default, skip_serializing_if = "Vec::is_empty")]
    certificate_chain: Vec<Base64>,
}

/// Reads a field that does not affect verification, dropping values that do
/// not decode
fn informational<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

impl Jwk {
    /// Constructs an RSA key published through the given DER certificate
    pub fn from_certificate(certificate: Base64) -> Self {
        Self {
            key_type: Some("RSA".to_owned()),
            certificate_chain: vec![certificate],
            ..Self::default()
        }
    }

    /// The key type
    #[must_use]
    pub fn key_type(&self) -> Option<&str> {
        self.key_type.as_deref()
    }

    /// The key ID
    #[must_use]
    pub fn key_id(&self) -> Option<&KeyIdRef> {
        self.key_id.as_deref()
    }

    /// The intended usage of the key
    #[must_use]
    pub fn usage(&self) -> Option<Usage> {
        self.usage
    }

    /// The published RSA modulus
    ///
    /// Informational only; verification always goes through the certificate.
    #[must_use]
    pub fn modulus(&self) -> Option<&Base64UrlRef> {
        self.modulus.as_deref()
    }

    /// The published RSA exponent
    #[must_use]
    pub fn exponent(&self) -> Option<&Base64UrlRef> {
        self.exponent.as_deref()
    }

    /// The DER certificates of the `x5c` chain, leaf first
    pub fn certificate_chain(&self) -> impl Iterator<Item = &Base64Ref> {
        self.certificate_chain.iter().map(|c| c.as_ref())
    }

    /// Sets the key ID
    pub fn with_key_id(self, kid: KeyId) -> Self {
        Self {
            key_id: Some(kid),
            ..self
        }
    }

    /// Sets the key's usage
    pub fn with_usage(self, usage: Usage) -> Self {
        Self {
            usage: Some(usage),
            ..self
        }
    }

    /// Records the RSA modulus and exponent alongside the certificate
    pub fn with_public_components(self, key: &PublicKey) -> Self {
        Self {
            modulus: Some(key.modulus().to_owned()),
            exponent: Some(key.exponent().to_owned()),
            ..self
        }
    }

    /// The leading `x5c` certificate wrapped in a PEM envelope
    ///
    /// The body is the standard base64 encoding of the DER bytes, broken
    /// into lines of 64 characters.
    #[must_use]
    pub fn certificate_pem(&self) -> Option<String> {
        let encoded = self.certificate_chain.first()?.to_string();

        let mut pem = String::with_capacity(
            PEM_HEADER.len() + PEM_FOOTER.len() + encoded.len() + encoded.len() / PEM_LINE_WIDTH + 3,
        );
        pem.push_str(PEM_HEADER);
        pem.push('\n');

        let mut rest = encoded.as_str();
        while !rest.is_empty() {
            let (line, tail) = rest.split_at(rest.len().min(PEM_LINE_WIDTH));
            pem.push_str(line);
            pem.push('\n');
            rest = tail;
        }

        pem.push_str(PEM_FOOTER);
        pem.push('\n');
        Some(pem)
    }

    /// Extracts the verification key from the leading `x5c` certificate
    ///
    /// # Errors
    ///
    /// The key has no certificate, or the certificate does not hold a usable
    /// RSA public key.
    pub fn public_key(&self) -> Result<PublicKey, error::KeyRejected> {
        let pem = self
            .certificate_pem()
            .ok_or_else(|| error::key_rejected("key does not carry an x5c certificate"))?;

        PublicKey::from_certificate_pem(&pem)
    }
}
