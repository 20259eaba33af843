use std::{fmt, sync::Arc};

use aliri_base64::{Base64, Base64Url};
use openssl::{
    asn1::Asn1Time,
    bn::BigNum,
    hash::MessageDigest,
    nid::Nid,
    pkey::{PKey, Private},
    rsa::Rsa,
    x509::{X509Builder, X509NameBuilder},
};
use ring::signature::RsaKeyPair;

use super::PublicKey;
use crate::{error, jwa, jws};

const CERTIFICATE_VALIDITY_DAYS: u32 = 30;

/// RSA private key
///
/// Used to mint signed tokens and self-signed certificates for keys
/// published in a key set.
#[derive(Clone)]
#[must_use]
pub struct PrivateKey {
    public_key: PublicKey,
    der: Vec<u8>,
    ring_cache: Arc<RsaKeyPair>,
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for PrivateKey {}

impl PrivateKey {
    /// Generates a new 2048-bit RSA key pair
    ///
    /// # Errors
    ///
    /// Unable to generate a private key.
    pub fn generate() -> Result<Self, error::Unexpected> {
        let rsa = Rsa::generate(2048).map_err(error::unexpected)?;
        Self::from_openssl_key(rsa).map_err(error::unexpected)
    }

    /// Imports an RSA key pair from a PEM file
    ///
    /// # Errors
    ///
    /// The provided PEM file is not a valid RSA private key.
    pub fn from_pem(pem: &str) -> Result<Self, error::KeyRejected> {
        let rsa = Rsa::private_key_from_pem(pem.as_bytes()).map_err(error::key_rejected)?;
        Self::from_openssl_key(rsa)
    }

    fn from_openssl_key(rsa: Rsa<Private>) -> Result<Self, error::KeyRejected> {
        let der = rsa.private_key_to_der().map_err(error::key_rejected)?;

        let public_key = PublicKey::from_components(
            Base64Url::from_raw(rsa.n().to_vec()),
            Base64Url::from_raw(rsa.e().to_vec()),
        )?;

        let ring_cache =
            Arc::new(RsaKeyPair::from_der(&der).map_err(|e| error::key_rejected(e.to_string()))?);

        Ok(Self {
            public_key,
            der,
            ring_cache,
        })
    }

    /// Provides access to the public key parameters
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Issues a self-signed X.509 certificate for this key
    ///
    /// The result is the DER encoding in standard base64, suitable as an
    /// entry in a key's `x5c` chain.
    ///
    /// # Errors
    ///
    /// The certificate could not be assembled or signed.
    pub fn self_signed_certificate(&self, common_name: &str) -> Result<Base64, error::Unexpected> {
        let rsa = Rsa::private_key_from_der(&self.der).map_err(error::unexpected)?;
        let pkey = PKey::from_rsa(rsa).map_err(error::unexpected)?;

        let mut name = X509NameBuilder::new().map_err(error::unexpected)?;
        name.append_entry_by_nid(Nid::COMMONNAME, common_name)
            .map_err(error::unexpected)?;
        let name = name.build();

        let serial = BigNum::from_u32(1)
            .and_then(|n| n.to_asn1_integer())
            .map_err(error::unexpected)?;
        let not_before = Asn1Time::days_from_now(0).map_err(error::unexpected)?;
        let not_after =
            Asn1Time::days_from_now(CERTIFICATE_VALIDITY_DAYS).map_err(error::unexpected)?;

        let mut builder = X509Builder::new().map_err(error::unexpected)?;
        builder.set_version(2).map_err(error::unexpected)?;
        builder
            .set_serial_number(&serial)
            .map_err(error::unexpected)?;
        builder.set_subject_name(&name).map_err(error::unexpected)?;
        builder.set_issuer_name(&name).map_err(error::unexpected)?;
        builder.set_pubkey(&pkey).map_err(error::unexpected)?;
        builder
            .set_not_before(&not_before)
            .map_err(error::unexpected)?;
        builder.set_not_after(&not_after).map_err(error::unexpected)?;
        builder
            .sign(&pkey, MessageDigest::sha256())
            .map_err(error::unexpected)?;

        let der = builder.build().to_der().map_err(error::unexpected)?;
        Ok(Base64::from_raw(der))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl jws::Signer for PrivateKey {
    fn sign(&self, alg: jwa::Algorithm, data: &[u8]) -> Result<Vec<u8>, error::Unexpected> {
        let mut buf = vec![0; self.ring_cache.public().modulus_len()];
        self.ring_cache
            .sign(
                alg.into_signing_params(),
                &ring::rand::SystemRandom::new(),
                data,
                &mut buf,
            )
            .map_err(|e| error::unexpected(e.to_string()))?;
        Ok(buf)
    }
}
