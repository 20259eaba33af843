#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
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

pub const AUDIENCE: &str = "api";
pub const ISSUER: &str = "https://issuer/";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Serve the key set with an `ETag`
    Serve,
    /// Serve the key set with a `Last-Modified` date and no `ETag`
    ServeLastModified,
    Fail,
    Garbage,
    /// Hold every response for the given time
    Stall(Duration),
}

#[derive(Debug)]
struct ServerState {
    body: Mutex<String>,
    version: AtomicUsize,
    hits: AtomicUsize,
    not_modified: AtomicUsize,
    mode: Mutex<Mode>,
}

/// A key set endpoint on an ephemeral local port
#[derive(Clone, Debug)]
pub struct JwksServer {
    state: Arc<ServerState>,
    addr: SocketAddr,
}

impl JwksServer {
    pub async fn start(jwks: &Jwks) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(ServerState {
            body: Mutex::new(serde_json::to_string(jwks)?),
            version: AtomicUsize::new(1),
            hits: AtomicUsize::new(0),
            not_modified: AtomicUsize::new(0),
            mode: Mutex::new(Mode::Serve),
        });

        let app = Router::new()
            .route("/.well-known/jwks.json", get(serve_jwks))
            .with_state(Arc::clone(&state));

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { state, addr })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn jwks_url(&self) -> String {
        format!("{}.well-known/jwks.json", self.base_url())
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn not_modified_responses(&self) -> usize {
        self.state.not_modified.load(Ordering::SeqCst)
    }

    pub fn set_jwks(&self, jwks: &Jwks) -> Result<()> {
        *self.state.body.lock().unwrap() = serde_json::to_string(jwks)?;
        self.state.version.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn set_mode(&self, mode: Mode) {
        *self.state.mode.lock().unwrap() = mode;
    }
}

async fn serve_jwks(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let mode = *state.mode.lock().unwrap();
    match mode {
        Mode::Fail => return (StatusCode::INTERNAL_SERVER_ERROR, "unavailable").into_response(),
        Mode::Garbage => {
            return (
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"not":"a key set""#,
            )
                .into_response()
        }
        Mode::Stall(delay) => tokio::time::sleep(delay).await,
        Mode::Serve | Mode::ServeLastModified => {}
    }

    let version = state.version.load(Ordering::SeqCst);
    let (validator, presented) = if mode == Mode::ServeLastModified {
        (
            (header::LAST_MODIFIED, last_modified(version)),
            headers.get(header::IF_MODIFIED_SINCE),
        )
    } else {
        (
            (header::ETAG, format!("\"v{version}\"")),
            headers.get(header::IF_NONE_MATCH),
        )
    };

    if presented.and_then(|v| v.to_str().ok()) == Some(validator.1.as_str()) {
        state.not_modified.fetch_add(1, Ordering::SeqCst);
        return StatusCode::NOT_MODIFIED.into_response();
    }

    let body = state.body.lock().unwrap().clone();
    (
        [
            (header::CONTENT_TYPE, "application/json".to_owned()),
            validator,
        ],
        body,
    )
        .into_response()
}

fn last_modified(version: usize) -> String {
    format!("Wed, 21 Oct 2015 07:{:02}:00 GMT", version % 60)
}

/// A signing key published under a key ID
#[derive(Clone, Debug)]
pub struct SigningKey {
    pub kid: &'static str,
    pub key: PrivateKey,
}

impl SigningKey {
    pub fn generate(kid: &'static str) -> Result<Self> {
        Ok(Self {
            kid,
            key: PrivateKey::generate()?,
        })
    }

    pub fn jwk(&self) -> Result<Jwk> {
        Ok(
            Jwk::from_certificate(self.key.self_signed_certificate("warden-test")?)
                .with_key_id(KeyId::from_static(self.kid))
                .with_usage(Usage::Signing)
                .with_public_components(self.key.public_key()),
        )
    }

    pub fn sign<P: Serialize>(&self, payload: &P) -> Result<Jwt> {
        let headers =
            BasicHeaders::with_key_id(jwa::Algorithm::RS256, KeyId::from_static(self.kid));
        Ok(Jwt::try_from_parts_with_signature(
            &headers, payload, &self.key,
        )?)
    }
}

pub fn jwks_of(keys: &[&SigningKey]) -> Result<Jwks> {
    keys.iter().map(|k| k.jwk()).collect()
}

pub fn claims() -> BasicClaims {
    BasicClaims::new()
        .with_audience(Audience::from_static(AUDIENCE))
        .with_issuer(Issuer::from_static(ISSUER))
        .with_subject(Subject::from_static("user-1"))
        .with_future_expiration(300)
}
