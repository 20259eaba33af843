use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use warden::{
    error::{JwtVerifyError, KeyRejected},
    jwt::{self, CoreClaims, CoreHeaders, HasAlgorithm},
    Jwks, JwtRef,
};

use crate::{
    jwks::{KeyResolver, LocalJwks, ResolveError, RetrievalError},
    AuthorityConfig, HasScope, InsufficientScope, ScopePolicy,
};

/// An error occurring while verifying a token with an [`Authority`]
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// The key set needed to verify the token could not be retrieved
    #[error("key set unavailable")]
    KeySetUnavailable(#[source] RetrievalError),

    /// Indicates that the authority cannot verify the JWT because it cannot
    /// find a key which matches the specifications in the token header
    #[error("no matching key found to validate JWT")]
    UnknownKeyId,

    /// The key matching the token could not be used for verification
    #[error("matching key rejected")]
    KeyRejected(#[source] KeyRejected),

    /// Indicates that the JWT was malformed or otherwise defective
    #[error("invalid JWT")]
    JwtVerifyError(#[from] JwtVerifyError),

    /// Indicates that, while the JWT was acceptable, it does not grant the
    /// level of authorization requested.
    #[error("access denied by policy")]
    PolicyDenial(#[from] InsufficientScope),
}

impl AuthorityError {
    /// Whether the failure lies with the authority rather than the token
    ///
    /// These failures are not the requester's fault and should not be
    /// reported as an authentication failure.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::KeySetUnavailable(_) | Self::KeyRejected(_))
    }
}

impl From<ResolveError> for AuthorityError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Retrieval(err) => Self::KeySetUnavailable(err),
            ResolveError::UnknownKeyId => Self::UnknownKeyId,
            ResolveError::KeyRejected(err) => Self::KeyRejected(err),
        }
    }
}

#[derive(Debug)]
struct Inner {
    resolver: Box<dyn KeyResolver>,
    validator: jwt::CoreValidator,
}

/// Verifies tokens issued by an authorization server
///
/// The authority resolves the key named in each token's header and checks
/// the token's signature and claims against its validator. Clones share the
/// same resolver.
#[derive(Debug, Clone)]
#[must_use]
pub struct Authority {
    inner: Arc<Inner>,
}

impl Authority {
    /// Constructs an authority that resolves keys with `resolver`
    pub fn new(resolver: impl KeyResolver, validator: jwt::CoreValidator) -> Self {
        Self {
            inner: Arc::new(Inner {
                resolver: Box::new(resolver),
                validator,
            }),
        }
    }

    /// Constructs an authority from a key set held in memory
    pub fn from_jwks(jwks: Jwks, validator: jwt::CoreValidator) -> Self {
        Self::new(LocalJwks::new(jwks), validator)
    }

    /// Constructs an authority that fetches keys from the configured
    /// authorization server
    ///
    /// # Errors
    ///
    /// The HTTP client could not be initialized.
    pub fn from_config(config: &AuthorityConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(config.remote_jwks()?, config.validator()))
    }

    /// The validator applied to each token
    pub fn validator(&self) -> &jwt::CoreValidator {
        &self.inner.validator
    }

    /// Authenticates the token, returning its validated claims
    ///
    /// # Errors
    ///
    /// The key could not be resolved, or the token is invalid according to
    /// the validator.
    pub async fn verify_token<C>(&self, token: &JwtRef) -> Result<C, AuthorityError>
    where
        C: for<'de> Deserialize<'de> + CoreClaims,
    {
        let decomposed: jwt::Decomposed = token.decompose().map_err(|err| {
            tracing::debug!(error = %err, "token rejected; malformed");
            err
        })?;

        self.inner
            .validator
            .check_algorithm(decomposed.alg())
            .map_err(|err| {
                tracing::debug!(jwt.alg = %decomposed.alg(), "token rejected; algorithm not approved");
                JwtVerifyError::from(err)
            })?;

        let key = self
            .inner
            .resolver
            .resolve(decomposed.kid())
            .await
            .map_err(AuthorityError::from)?;

        let validated: jwt::Validated<C> = decomposed
            .verify(&key, &self.inner.validator)
            .map_err(|err| {
                tracing::debug!(error = %err, "token rejected");
                err
            })?;

        tracing::trace!("token verified");

        let (_, claims) = validated.extract();
        Ok(claims)
    }

    /// Authenticates the token and checks access according to the policy
    ///
    /// # Errors
    ///
    /// Returns an error if the token is invalid or is not authorized by the
    /// policy.
    pub async fn verify_token_with_policy<C>(
        &self,
        token: &JwtRef,
        policy: &ScopePolicy,
    ) -> Result<C, AuthorityError>
    where
        C: for<'de> Deserialize<'de> + CoreClaims + HasScope,
    {
        let claims: C = self.verify_token(token).await?;

        policy.evaluate(claims.scope()).map_err(|err| {
            tracing::debug!("token rejected; insufficient scope");
            err
        })?;

        Ok(claims)
    }
}
