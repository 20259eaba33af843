//! RSA keys
//!
//! Public keys are obtained from the leading certificate of a published
//! key's `x5c` chain. Private keys exist only to mint tokens and
//! certificates when testing.

#[cfg(any(test, feature = "private-keys"))]
mod private;
mod public;

#[cfg(any(test, feature = "private-keys"))]
#[cfg_attr(docsrs, doc(cfg(feature = "private-keys")))]
pub use private::PrivateKey;
pub use public::PublicKey;
