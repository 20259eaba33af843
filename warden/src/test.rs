use once_cell::sync::Lazy;

use crate::jwa::rsa::PrivateKey;

pub const KEY_ID: &str = "test-key";

static PRIVATE_KEY: Lazy<PrivateKey> =
    Lazy::new(|| PrivateKey::generate().expect("test key generation should succeed"));

/// A process-wide RSA key, generated once to keep the suite fast
pub fn private_key() -> &'static PrivateKey {
    &PRIVATE_KEY
}
