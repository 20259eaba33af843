#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use color_eyre::Result;
use serde::Serialize;
use warden::{
    jwa::{self, rsa::PrivateKey},
    jwk::{KeyId, Usage},
    jwt::{Audience, BasicClaims, BasicHeaders, Issuer, Subject},
    Jwk, Jwks, Jwt,
};
use warden_oauth2::{Authority, AuthorityConfig, BasicClaimsWithScope};

pub const AUDIENCE: &str = "api";
pub const ISSUER: &str = "https://issuer/";
pub const SUBJECT: &str = "user-1";

#[derive(Debug)]
struct ServerState {
    body: String,
    failing: AtomicBool,
}

/// An authorization server publishing a fixed key set
#[derive(Clone, Debug)]
pub struct KeyServer {
    state: Arc<ServerState>,
    base_url: String,
}

impl KeyServer {
    pub async fn start(jwks: Jwks) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}/", listener.local_addr()?);

        let state = Arc::new(ServerState {
            body: serde_json::to_string(&jwks)?,
            failing: AtomicBool::new(false),
        });

        let app = Router::new()
            .route("/.well-known/jwks.json", get(serve_jwks))
            .with_state(Arc::clone(&state));

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { state, base_url })
    }

    /// Makes the key set endpoint answer every request with `503`
    pub fn fail(&self) {
        self.state.failing.store(true, Ordering::SeqCst);
    }

    pub fn authority(&self) -> Result<Authority> {
        let config = AuthorityConfig::new(AUDIENCE, &self.base_url).with_issuer(ISSUER);
        Ok(Authority::from_config(&config)?)
    }
}

async fn serve_jwks(State(state): State<Arc<ServerState>>) -> Response {
    if state.failing.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    (
        [(header::CONTENT_TYPE, "application/json")],
        state.body.clone(),
    )
        .into_response()
}

#[derive(Clone, Debug)]
pub struct SigningKey {
    kid: &'static str,
    key: PrivateKey,
}

impl SigningKey {
    pub fn generate(kid: &'static str) -> Result<Self> {
        Ok(Self {
            kid,
            key: PrivateKey::generate()?,
        })
    }

    pub fn jwks(&self) -> Result<Jwks> {
        let jwk = Jwk::from_certificate(self.key.self_signed_certificate("warden-tower-test")?)
            .with_key_id(KeyId::from_static(self.kid))
            .with_usage(Usage::Signing)
            .with_public_components(self.key.public_key());
        Ok(std::iter::once(jwk).collect())
    }

    pub fn sign<P: Serialize>(&self, claims: &P) -> Result<Jwt> {
        let headers =
            BasicHeaders::with_key_id(jwa::Algorithm::RS256, KeyId::from_static(self.kid));
        Ok(Jwt::try_from_parts_with_signature(
            &headers, claims, &self.key,
        )?)
    }

    pub fn bearer<P: Serialize>(&self, claims: &P) -> Result<String> {
        Ok(format!("Bearer {}", self.sign(claims)?.as_str()))
    }
}

pub fn claims_with_scope(scope: &str) -> Result<BasicClaimsWithScope> {
    Ok(BasicClaimsWithScope {
        basic: basic_claims(),
        scope: scope.parse()?,
    })
}

pub fn basic_claims() -> BasicClaims {
    anonymous_claims().with_subject(Subject::from_static(SUBJECT))
}

/// Claims of a client acting on its own behalf, without a `sub`
pub fn anonymous_claims() -> BasicClaims {
    BasicClaims::new()
        .with_audience(Audience::from_static(AUDIENCE))
        .with_issuer(Issuer::from_static(ISSUER))
        .with_future_expiration(300)
}
