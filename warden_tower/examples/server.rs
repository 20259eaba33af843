//! Serves a small API protected by bearer tokens
//!
//! ```text
//! WARDEN_AUDIENCE=https://api.example.com/ \
//! WARDEN_AUTHORIZATION_SERVER=https://tenant.example.com/ \
//! RUST_LOG=warden_tower=trace,warden_oauth2=debug \
//! cargo run --example server
//! ```

use axum::{extract::Extension, routing::get, Router};
use tracing_subscriber::EnvFilter;
use warden_oauth2::{Authority, AuthorityConfig, BasicClaimsWithScope, ScopePolicy, ScopeToken};
use warden_tower::{AuthenticatedIdentity, Authorizer};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AuthorityConfig::new(
        std::env::var("WARDEN_AUDIENCE")?,
        std::env::var("WARDEN_AUTHORIZATION_SERVER")?,
    );
    tracing::info!(jwks.url = %config.jwks_url(), "using authorization server");

    let authorizer = Authorizer::new(Authority::from_config(&config)?);

    let app = Router::new()
        .route(
            "/documents",
            get(list_documents)
                .layer(authorizer.require_scope(ScopeToken::from_static("read"))),
        )
        .route(
            "/documents/purge",
            get(purge_documents).layer(
                authorizer.scope_layer(ScopePolicy::allow_one_from_static("delete admin")),
            ),
        )
        .route("/whoami", get(whoami).layer(authorizer.jwt_layer()))
        .layer(warden_tower::request_id::layer());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn list_documents() -> &'static str {
    "[]"
}

async fn purge_documents() -> &'static str {
    "purged"
}

async fn whoami(
    identity: AuthenticatedIdentity,
    Extension(claims): Extension<BasicClaimsWithScope>,
) -> String {
    let scope = claims
        .scope
        .iter()
        .map(|token| token.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{identity} holds scope \"{scope}\"")
}
