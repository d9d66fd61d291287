//! MemeForge share page server
//!
//! Serves the page behind share links so social previews pick up the meme.
//!
//! ## Routes
//!
//! - `GET /share?id=<cid>` renders the meme page with Open Graph tags;
//!   a missing or malformed id gets a "Meme not found" page and 404.
//! - `GET /health` returns `ok`.

mod page;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
};
use memeforge_core::config::AppConfig;
use memeforge_core::share::{ShareLinks, is_valid_cid};
use serde::Deserialize;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Default listen address.
const DEFAULT_BIND: &str = "0.0.0.0:3030";

/// Shared server state
struct AppState {
    links: ShareLinks,
}

#[derive(Debug, Deserialize)]
struct ShareQuery {
    id: Option<String>,
}

fn bind_addr() -> Result<SocketAddr, std::net::AddrParseError> {
    std::env::var("MEMEFORGE_BIND")
        .unwrap_or_else(|_| DEFAULT_BIND.to_string())
        .parse()
}

fn app(links: ShareLinks) -> Router {
    let state = Arc::new(AppState { links });
    Router::new()
        .route("/share", get(share))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memeforge_server=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::load(None)?;
    let links = ShareLinks::new(&config.share.origin, &config.share.gateway);
    let addr = bind_addr()?;

    info!(
        "MemeForge share server listening on {} (origin {}, gateway {})",
        addr,
        links.origin(),
        links.gateway()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(links)).await?;
    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn share(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ShareQuery>,
) -> (StatusCode, Html<String>) {
    match query.id {
        Some(id) if is_valid_cid(&id) => {
            info!("Serving share page for {}", id);
            (StatusCode::OK, Html(page::share_page(&state.links, &id)))
        }
        other => {
            warn!("Share page requested with bad id {:?}", other);
            (
                StatusCode::NOT_FOUND,
                Html(page::not_found_page(&state.links)),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use memeforge_core::share::DEFAULT_GATEWAY;
    use tower::ServiceExt;

    fn test_app() -> Router {
        app(ShareLinks::new("https://memes.example", DEFAULT_GATEWAY))
    }

    async fn get_body(uri: &str) -> (StatusCode, String) {
        let response = test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_body("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_share_page() {
        let (status, body) = get_body("/share?id=QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(
            "https://gateway.pinata.cloud/ipfs/QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"
        ));
        assert!(body.contains("og:title"));
    }

    #[tokio::test]
    async fn test_missing_id() {
        let (status, body) = get_body("/share").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Meme not found"));
    }

    #[tokio::test]
    async fn test_injected_id_rejected() {
        let (status, body) = get_body("/share?id=%22%3E%3Cscript%3Ealert(1)%3C%2Fscript%3E").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.contains("<script>"));
    }

    #[test]
    fn test_default_bind() {
        let addr: SocketAddr = DEFAULT_BIND.parse().unwrap();
        assert_eq!(addr.port(), 3030);
    }
}
