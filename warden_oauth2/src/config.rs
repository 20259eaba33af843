use std::time::Duration;

use serde::{Deserialize, Deserializer};
use warden::jwt::{self, Audience, Issuer};

use crate::RemoteJwks;

const DEFAULT_JWKS_PATH: &str = ".well-known/jwks.json";
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_JWKS_CACHE_TTL: Duration = Duration::from_secs(300);

/// Configuration of an [`Authority`][crate::Authority] backed by a remote
/// authorization server
///
/// Durations are given in whole seconds when deserialized. A zero
/// `fetch_timeout` falls back to the default of ten seconds.
///
/// ```
/// use warden_oauth2::AuthorityConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config: AuthorityConfig = serde_json::from_str(
///     r#"{ "audience": "api", "authorization_server": "https://issuer/" }"#,
/// )?;
///
/// assert_eq!(config.jwks_url(), "https://issuer/.well-known/jwks.json");
/// assert_eq!(config.expected_issuer().as_str(), "https://issuer/");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[must_use]
pub struct AuthorityConfig {
    audience: Audience,
    authorization_server: String,
    #[serde(default)]
    issuer: Option<Issuer>,
    #[serde(default = "default_jwks_path")]
    jwks_path: String,
    #[serde(default = "default_fetch_timeout", deserialize_with = "seconds")]
    fetch_timeout: Duration,
    #[serde(default = "default_jwks_cache_ttl", deserialize_with = "seconds")]
    jwks_cache_ttl: Duration,
    #[serde(default, deserialize_with = "seconds")]
    leeway: Duration,
    #[serde(default)]
    require_subject: bool,
}

fn default_jwks_path() -> String {
    DEFAULT_JWKS_PATH.to_owned()
}

fn default_fetch_timeout() -> Duration {
    DEFAULT_FETCH_TIMEOUT
}

fn default_jwks_cache_ttl() -> Duration {
    DEFAULT_JWKS_CACHE_TTL
}

fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}

impl AuthorityConfig {
    /// Configures an authority for tokens intended for `audience`, issued by
    /// the authorization server at `authorization_server`
    pub fn new(audience: impl Into<String>, authorization_server: impl Into<String>) -> Self {
        Self {
            audience: Audience::new(audience.into()),
            authorization_server: authorization_server.into(),
            issuer: None,
            jwks_path: default_jwks_path(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            jwks_cache_ttl: DEFAULT_JWKS_CACHE_TTL,
            leeway: Duration::ZERO,
            require_subject: false,
        }
    }

    /// Expects tokens from an issuer other than the authorization server URL
    pub fn with_issuer(self, issuer: impl Into<String>) -> Self {
        Self {
            issuer: Some(Issuer::new(issuer.into())),
            ..self
        }
    }

    /// Overrides the path of the key set relative to the authorization server
    pub fn with_jwks_path(self, jwks_path: impl Into<String>) -> Self {
        Self {
            jwks_path: jwks_path.into(),
            ..self
        }
    }

    /// Bounds the time allowed to fetch the key set
    ///
    /// A zero timeout keeps the default.
    pub fn with_fetch_timeout(self, fetch_timeout: Duration) -> Self {
        Self {
            fetch_timeout,
            ..self
        }
    }

    /// Sets how long a fetched key set is cached; zero disables caching
    pub fn with_jwks_cache_ttl(self, jwks_cache_ttl: Duration) -> Self {
        Self {
            jwks_cache_ttl,
            ..self
        }
    }

    /// Allows a grace period when checking `exp` and `nbf`
    pub fn with_leeway(self, leeway: Duration) -> Self {
        Self { leeway, ..self }
    }

    /// Rejects tokens that do not carry a `sub` claim
    ///
    /// Off by default, as tokens issued to clients acting on their own
    /// behalf often have no subject.
    pub fn requiring_subject(self) -> Self {
        Self {
            require_subject: true,
            ..self
        }
    }

    /// The audience tokens must be intended for
    #[must_use]
    pub fn audience(&self) -> &jwt::AudienceRef {
        &self.audience
    }

    /// The base URL of the authorization server
    #[must_use]
    pub fn authorization_server(&self) -> &str {
        &self.authorization_server
    }

    /// The time allowed to fetch the key set
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        if self.fetch_timeout.is_zero() {
            DEFAULT_FETCH_TIMEOUT
        } else {
            self.fetch_timeout
        }
    }

    /// How long a fetched key set is cached
    #[must_use]
    pub fn jwks_cache_ttl(&self) -> Duration {
        self.jwks_cache_ttl
    }

    /// The grace period applied to `exp` and `nbf`
    #[must_use]
    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    /// The URL of the authorization server's key set
    ///
    /// A `/` is inserted between the authorization server URL and the key
    /// set path when the URL does not already end with one.
    #[must_use]
    pub fn jwks_url(&self) -> String {
        let path = self.jwks_path.trim_start_matches('/');
        let mut url = String::with_capacity(self.authorization_server.len() + path.len() + 1);
        url.push_str(&self.authorization_server);
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(path);
        url
    }

    /// The issuer tokens must come from
    ///
    /// Defaults to the authorization server URL, exactly as configured.
    pub fn expected_issuer(&self) -> Issuer {
        self.issuer
            .clone()
            .unwrap_or_else(|| Issuer::new(self.authorization_server.clone()))
    }

    /// A validator requiring the configured audience and issuer and an
    /// unexpired token
    ///
    /// A subject is required only when configured with
    /// [`requiring_subject`][Self::requiring_subject].
    pub fn validator(&self) -> jwt::CoreValidator {
        let validator = jwt::CoreValidator::default()
            .require_audience(self.audience.clone())
            .require_issuer(self.expected_issuer())
            .with_leeway(self.leeway());

        if self.require_subject {
            validator.require_subject()
        } else {
            validator
        }
    }

    /// A key resolver for the configured key set
    ///
    /// # Errors
    ///
    /// The HTTP client could not be initialized.
    pub fn remote_jwks(&self) -> Result<RemoteJwks, reqwest::Error> {
        Ok(RemoteJwks::new(self.jwks_url())?
            .with_fetch_timeout(self.fetch_timeout())
            .with_cache_ttl(self.jwks_cache_ttl()))
    }
}
