//! Error types for token decomposition, verification, and signing

use std::{error::Error as StdError, fmt};

use thiserror::Error;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

macro_rules! opaque_error {
    ($(#[$meta:meta])* $name:ident => $ctor:ident, $msg:literal) => {
        $(#[$meta])*
        #[derive(Debug, Error)]
        #[error($msg)]
        pub struct $name {
            #[from]
            source: BoxedSource,
        }

        #[allow(dead_code)]
        pub(crate) fn $ctor(source: impl Into<BoxedSource>) -> $name {
            $name {
                source: source.into(),
            }
        }
    };
}

opaque_error! {
    /// A key could not be used for verification
    ///
    /// Produced when a published key carries no certificate, when the
    /// certificate cannot be parsed, or when it does not hold a usable RSA key.
    KeyRejected => key_rejected, "key rejected"
}

opaque_error! {
    /// Unexpected failure inside a cryptographic backend
    Unexpected => unexpected, "unexpected error"
}

/// An `alg` value that is not supported
#[derive(Debug, Error)]
#[error("'{alg}' does not match supported algorithms")]
pub struct UnknownAlgorithm {
    alg: String,
}

pub(crate) fn unknown_algorithm(alg: impl Into<String>) -> UnknownAlgorithm {
    UnknownAlgorithm { alg: alg.into() }
}

/// The token does not have the three dot-separated segments of a compact JWS
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("malformed JWT")]
pub struct MalformedJwt;

/// A segment of a compact JWS
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Segment {
    /// The JOSE header
    Header,
    /// The claims payload
    Payload,
    /// The signature
    Signature,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Header => "header",
            Self::Payload => "payload",
            Self::Signature => "signature",
        })
    }
}

/// One segment of the token could not be decoded or encoded
#[derive(Debug, Error)]
#[error("malformed JWT {segment}")]
pub struct MalformedSegment {
    segment: Segment,
    #[source]
    source: BoxedSource,
}

impl MalformedSegment {
    /// The segment at fault
    #[must_use]
    pub fn segment(&self) -> Segment {
        self.segment
    }
}

pub(crate) fn malformed_jwt_header(source: impl Into<BoxedSource>) -> MalformedSegment {
    MalformedSegment {
        segment: Segment::Header,
        source: source.into(),
    }
}

pub(crate) fn malformed_jwt_payload(source: impl Into<BoxedSource>) -> MalformedSegment {
    MalformedSegment {
        segment: Segment::Payload,
        source: source.into(),
    }
}

pub(crate) fn malformed_jwt_signature(source: impl Into<BoxedSource>) -> MalformedSegment {
    MalformedSegment {
        segment: Segment::Signature,
        source: source.into(),
    }
}

/// The signature does not match the signed content
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
#[error("signature mismatch")]
pub struct SignatureMismatch;

/// Why a token failed verification
#[derive(Debug, Error)]
pub enum JwtVerifyError {
    /// The signature does not match the header and payload
    #[error("token rejected by key")]
    SignatureMismatch(#[from] SignatureMismatch),

    /// The token is not a compact JWS
    #[error(transparent)]
    Malformed(#[from] MalformedJwt),

    /// A segment of the token could not be decoded
    #[error(transparent)]
    MalformedSegment(#[from] MalformedSegment),

    /// The token was authentic, but its claims were not acceptable
    #[error("token rejected by claims validator")]
    ClaimsRejected(#[from] ClaimsRejected),
}

impl JwtVerifyError {
    /// Whether the token was rejected because its signature did not verify
    #[must_use]
    pub fn is_signature_mismatch(&self) -> bool {
        matches!(self, Self::SignatureMismatch(_))
    }

    /// Whether the token could not be parsed
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::MalformedSegment(_))
    }

    /// The claims rejection, if the token was otherwise well-formed and authentic
    #[must_use]
    pub fn claims_rejection(&self) -> Option<&ClaimsRejected> {
        match self {
            Self::ClaimsRejected(rejection) => Some(rejection),
            _ => None,
        }
    }
}

/// Why a token could not be produced
#[derive(Debug, Error)]
pub enum JwtSigningError {
    /// The signer failed
    #[error(transparent)]
    Signer(#[from] Unexpected),

    /// The header or payload could not be serialized
    #[error(transparent)]
    Serialization(#[from] MalformedSegment),
}

/// Why the claims of an authentic token were not accepted
#[allow(missing_copy_implementations)]
#[derive(Debug, PartialEq, Eq, Error)]
pub enum ClaimsRejected {
    /// `alg` is not one of the approved algorithms
    #[error("invalid algorithm")]
    InvalidAlgorithm,

    /// No `aud` entry equals the expected audience
    #[error("invalid audience")]
    InvalidAudience,

    /// `iss` differs from the expected issuer
    #[error("invalid issuer")]
    InvalidIssuer,

    /// `exp` has passed
    #[error("token expired")]
    TokenExpired,

    /// `nbf` is still in the future
    #[error("token not yet valid")]
    TokenNotYetValid,

    /// A claim the validator requires is absent
    #[error("required {0} claim missing")]
    MissingRequiredClaim(&'static str),
}
