use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use arc_swap::ArcSwapOption;
use reqwest::{
    header::{self, HeaderValue},
    Client, StatusCode,
};
use warden::{jwa::rsa::PublicKey, jwk::KeyIdRef, Jwks};

use super::{KeyResolver, ResolveError, ResolveFuture, RetrievalError};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const DEFAULT_MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct CachedJwks {
    jwks: Jwks,
    fetched_at: Instant,
    etag: Option<HeaderValue>,
    last_modified: Option<HeaderValue>,
}

/// A key resolver backed by a key set published at a remote URL
///
/// Fetched key sets are cached for a configurable time-to-live (five minutes
/// by default). A stale key set is refetched on the next resolution. When a
/// key ID cannot be found in a cached key set, the key set is refetched once
/// in case the authorization server has rotated its keys. A time-to-live of
/// zero disables caching entirely, fetching the key set on every resolution.
///
/// Clones share the same cache.
#[derive(Debug, Clone)]
pub struct RemoteJwks {
    url: String,
    client: Client,
    fetch_timeout: Duration,
    cache_ttl: Duration,
    min_refetch_interval: Duration,
    cache: Arc<ArcSwapOption<CachedJwks>>,
}

impl RemoteJwks {
    /// Constructs a resolver for the key set at `url`
    ///
    /// # Errors
    ///
    /// The HTTP client could not be initialized.
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("warden_oauth2/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::from_client(url, client))
    }

    /// Constructs a resolver for the key set at `url` using an existing client
    pub fn from_client(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            min_refetch_interval: DEFAULT_MIN_REFETCH_INTERVAL,
            cache: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// Bounds the time allowed for each fetch of the key set
    #[must_use]
    pub fn with_fetch_timeout(self, fetch_timeout: Duration) -> Self {
        Self {
            fetch_timeout,
            ..self
        }
    }

    /// Sets how long a fetched key set is used before it is refetched
    ///
    /// A time-to-live of zero disables caching.
    #[must_use]
    pub fn with_cache_ttl(self, cache_ttl: Duration) -> Self {
        Self { cache_ttl, ..self }
    }

    /// Sets the minimum age of a cached key set before an unknown key ID may
    /// trigger a refetch
    #[must_use]
    pub fn with_min_refetch_interval(self, min_refetch_interval: Duration) -> Self {
        Self {
            min_refetch_interval,
            ..self
        }
    }

    /// The URL of the key set
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The cached key set, if one is held
    #[must_use]
    pub fn cached_jwks(&self) -> Option<Jwks> {
        self.cache.load().as_ref().map(|cached| cached.jwks.clone())
    }

    fn caching_enabled(&self) -> bool {
        !self.cache_ttl.is_zero()
    }

    /// Refreshes the key set from the remote URL
    ///
    /// No retries are attempted. If the attempt to refresh the key set
    /// fails, the cached key set is left unchanged.
    ///
    /// # Errors
    ///
    /// The key set could not be retrieved.
    pub async fn refresh(&self) -> Result<(), RetrievalError> {
        self.fetch().await.map(|_| ())
    }

    /// Spawns a task that refreshes the key set at the given interval
    ///
    /// Failures are logged and the previous key set is kept. The task runs
    /// until the returned handle is aborted or the runtime shuts down.
    ///
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    #[cfg(feature = "tokio")]
    #[cfg_attr(docsrs, doc(cfg(feature = "tokio")))]
    pub fn spawn_refresh(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        assert!(!interval.is_zero(), "refresh interval must be non-zero");
        let this = self.clone();

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.tick().await;

            loop {
                timer.tick().await;
                // already logged; try again on the next tick
                let _ = this.refresh().await;
            }
        })
    }

    async fn current(&self) -> Result<(Arc<CachedJwks>, bool), RetrievalError> {
        if self.caching_enabled() {
            if let Some(cached) = self.cache.load_full() {
                if cached.fetched_at.elapsed() < self.cache_ttl {
                    tracing::trace!("using cached JWKS");
                    return Ok((cached, false));
                }
            }
        }

        Ok((self.fetch().await?, true))
    }

    #[tracing::instrument(skip(self), fields(jwks.url = %self.url))]
    async fn fetch(&self) -> Result<Arc<CachedJwks>, RetrievalError> {
        tracing::debug!("fetching JWKS");

        let previous = if self.caching_enabled() {
            self.cache.load_full()
        } else {
            None
        };

        let mut request = self.client.get(&self.url).timeout(self.fetch_timeout);

        if let Some(previous) = &previous {
            if let Some(etag) = &previous.etag {
                request = request.header(header::IF_NONE_MATCH, etag);
            } else if let Some(last_modified) = &previous.last_modified {
                request = request.header(header::IF_MODIFIED_SINCE, last_modified);
            }
        }

        let response = request.send().await.map_err(|source| {
            let error: &dyn std::error::Error = &source;
            tracing::warn!(error, "JWKS fetch failed; unable to complete request");
            RetrievalError::Request {
                url: self.url.clone(),
                source,
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_MODIFIED {
            if let Some(previous) = previous {
                tracing::debug!("JWKS not modified");
                let renewed = Arc::new(CachedJwks {
                    jwks: previous.jwks.clone(),
                    fetched_at: Instant::now(),
                    etag: previous.etag.clone(),
                    last_modified: previous.last_modified.clone(),
                });
                self.cache.store(Some(Arc::clone(&renewed)));
                return Ok(renewed);
            }
        }

        if !status.is_success() {
            tracing::warn!(
                http.status_code = status.as_u16(),
                "JWKS fetch failed; unexpected response status",
            );
            return Err(RetrievalError::Status {
                url: self.url.clone(),
                status,
            });
        }

        let etag = response.headers().get(header::ETAG).map(ToOwned::to_owned);
        let last_modified = response
            .headers()
            .get(header::LAST_MODIFIED)
            .map(ToOwned::to_owned);

        let jwks = response.json::<Jwks>().await.map_err(|source| {
            let error: &dyn std::error::Error = &source;
            tracing::warn!(error, "JWKS fetch failed; unable to parse key set");
            RetrievalError::Parse {
                url: self.url.clone(),
                source,
            }
        })?;

        tracing::info!(jwks.keys = jwks.keys().len(), "JWKS refreshed");

        let fetched = Arc::new(CachedJwks {
            jwks,
            fetched_at: Instant::now(),
            etag,
            last_modified,
        });

        if self.caching_enabled() {
            self.cache.store(Some(Arc::clone(&fetched)));
        }

        Ok(fetched)
    }

    async fn resolve_key(&self, kid: Option<&KeyIdRef>) -> Result<PublicKey, ResolveError> {
        let Some(kid) = kid else {
            tracing::debug!("token does not declare a key ID");
            return Err(ResolveError::UnknownKeyId);
        };

        let (current, fresh) = self.current().await?;
        if let Some(key) = super::select_key(&current.jwks, kid)? {
            return Ok(key);
        }

        if !fresh && current.fetched_at.elapsed() >= self.min_refetch_interval {
            tracing::debug!(jwk.kid = %kid, "key not found in cached JWKS; refetching");
            let refetched = self.fetch().await?;
            if let Some(key) = super::select_key(&refetched.jwks, kid)? {
                return Ok(key);
            }
        }

        tracing::debug!(jwk.kid = %kid, "unable to find matching key");
        Err(ResolveError::UnknownKeyId)
    }
}

impl KeyResolver for RemoteJwks {
    fn resolve<'a>(&'a self, kid: Option<&'a KeyIdRef>) -> ResolveFuture<'a> {
        Box::pin(self.resolve_key(kid))
    }
}
