use std::sync::Arc;

use arc_swap::ArcSwap;
use warden::{jwa::rsa::PublicKey, jwk::KeyIdRef, Jwks};

use super::{KeyResolver, ResolveError, ResolveFuture};

/// A key resolver backed by a key set held in memory
///
/// The key set can be swapped out at any time without blocking readers.
#[derive(Debug)]
pub struct LocalJwks {
    jwks: ArcSwap<Jwks>,
}

impl LocalJwks {
    /// Constructs a resolver over the given key set
    pub fn new(jwks: Jwks) -> Self {
        Self {
            jwks: ArcSwap::from_pointee(jwks),
        }
    }

    /// Replaces the key set used for resolution
    pub fn set_jwks(&self, jwks: Jwks) {
        self.jwks.store(Arc::new(jwks));
    }

    /// The key set currently in use
    pub fn jwks(&self) -> Arc<Jwks> {
        self.jwks.load_full()
    }

    fn resolve_now(&self, kid: Option<&KeyIdRef>) -> Result<PublicKey, ResolveError> {
        let Some(kid) = kid else {
            tracing::debug!("token does not declare a key ID");
            return Err(ResolveError::UnknownKeyId);
        };

        let guard = self.jwks.load();
        super::select_key(&guard, kid)?.ok_or_else(|| {
            tracing::debug!(jwk.kid = %kid, "unable to find matching key");
            ResolveError::UnknownKeyId
        })
    }
}

impl From<Jwks> for LocalJwks {
    fn from(jwks: Jwks) -> Self {
        Self::new(jwks)
    }
}

impl KeyResolver for LocalJwks {
    fn resolve<'a>(&'a self, kid: Option<&'a KeyIdRef>) -> ResolveFuture<'a> {
        Box::pin(std::future::ready(self.resolve_now(kid)))
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use warden::{
        jwa::rsa::PrivateKey,
        jwk::{KeyId, Usage},
        Jwk,
    };

    use super::*;

    fn published(key: &PrivateKey, kid: &'static str) -> Result<Jwk> {
        Ok(Jwk::from_certificate(key.self_signed_certificate("warden-test")?)
            .with_key_id(KeyId::from_static(kid))
            .with_usage(Usage::Signing))
    }

    #[tokio::test]
    async fn resolves_key_by_id() -> Result<()> {
        let key = PrivateKey::generate()?;
        let jwks: Jwks = vec![published(&key, "abc")?].into_iter().collect();
        let resolver = LocalJwks::new(jwks);

        let resolved = resolver.resolve(Some(KeyIdRef::from_str("abc"))).await?;
        assert_eq!(&resolved, key.public_key());
        Ok(())
    }

    #[tokio::test]
    async fn missing_or_unknown_kid_is_not_found() -> Result<()> {
        let key = PrivateKey::generate()?;
        let jwks: Jwks = vec![published(&key, "abc")?].into_iter().collect();
        let resolver = LocalJwks::new(jwks);

        assert!(matches!(
            resolver.resolve(None).await,
            Err(ResolveError::UnknownKeyId)
        ));
        assert!(matches!(
            resolver.resolve(Some(KeyIdRef::from_str("xyz"))).await,
            Err(ResolveError::UnknownKeyId)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn matched_key_without_certificate_is_rejected() -> Result<()> {
        let jwks: Jwks = vec![Jwk::default().with_key_id(KeyId::from_static("abc"))]
            .into_iter()
            .collect();
        let resolver = LocalJwks::new(jwks);

        assert!(matches!(
            resolver.resolve(Some(KeyIdRef::from_str("abc"))).await,
            Err(ResolveError::KeyRejected(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn replaced_key_set_takes_effect() -> Result<()> {
        let key = PrivateKey::generate()?;
        let resolver = LocalJwks::new(Jwks::default());
        assert!(resolver
            .resolve(Some(KeyIdRef::from_str("abc")))
            .await
            .is_err());

        resolver.set_jwks(vec![published(&key, "abc")?].into_iter().collect());
        assert!(resolver
            .resolve(Some(KeyIdRef::from_str("abc")))
            .await
            .is_ok());
        Ok(())
    }
}
