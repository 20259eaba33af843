//! Signature algorithms from JSON Web Algorithms ([RFC7518][])
//!
//! Only the RSASSA-PKCS1-v1_5 family is supported.
//!
//! [RFC7518]: https://tools.ietf.org/html/rfc7518

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error;

pub mod rsa;

/// The `alg` values understood by this crate
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(clippy::upper_case_acronyms)]
#[non_exhaustive]
pub enum Algorithm {
    /// RSA using SHA-256 and PKCS 1.5
    RS256,
    /// RSA using SHA-384 and PKCS 1.5
    RS384,
    /// RSA using SHA-512 and PKCS 1.5
    RS512,
}

impl Algorithm {
    pub(crate) fn into_verification_params(self) -> &'static ring::signature::RsaParameters {
        match self {
            Self::RS256 => &ring::signature::RSA_PKCS1_2048_8192_SHA256,
            Self::RS384 => &ring::signature::RSA_PKCS1_2048_8192_SHA384,
            Self::RS512 => &ring::signature::RSA_PKCS1_2048_8192_SHA512,
        }
    }

    #[cfg(any(test, feature = "private-keys"))]
    pub(crate) fn into_signing_params(self) -> &'static dyn ring::signature::RsaEncoding {
        match self {
            Self::RS256 => &ring::signature::RSA_PKCS1_SHA256,
            Self::RS384 => &ring::signature::RSA_PKCS1_SHA384,
            Self::RS512 => &ring::signature::RSA_PKCS1_SHA512,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
        };

        f.write_str(s)
    }
}

impl TryFrom<&'_ str> for Algorithm {
    type Error = error::UnknownAlgorithm;

    #[inline]
    fn try_from(value: &'_ str) -> Result<Self, Self::Error> {
        match value {
            "RS256" => Ok(Self::RS256),
            "RS384" => Ok(Self::RS384),
            "RS512" => Ok(Self::RS512),
            _ => Err(error::unknown_algorithm(value.to_string())),
        }
    }
}

impl FromStr for Algorithm {
    type Err = error::UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_algorithms() {
        assert_eq!("RS256".parse::<Algorithm>().unwrap(), Algorithm::RS256);
        assert_eq!("RS512".parse::<Algorithm>().unwrap(), Algorithm::RS512);
    }

    #[test]
    fn rejects_unsupported_algorithms() {
        assert!("HS256".parse::<Algorithm>().is_err());
        assert!("none".parse::<Algorithm>().is_err());
        assert!("rs256".parse::<Algorithm>().is_err());
    }

    #[test]
    fn serializes_as_uppercase_name() {
        let json = serde_json::to_string(&Algorithm::RS384).unwrap();
        assert_eq!(json, r#""RS384""#);
    }
}
