//! File relay: fetches a template's bytes server-side on behalf of the client.
//!
//! | Request                         | Response                                  |
//! |---------------------------------|-------------------------------------------|
//! | `GET /api/file-proxy` (no `u`)  | 400 `{"error":"Missing ?u="}`             |
//! | `u` not an http(s) URL          | 400 `{"error":"Invalid ?u="}`             |
//! | host not on the allow-list      | 403 `{"error":"Host not allowed"}`        |
//! | upstream non-2xx                | same status, empty body                   |
//! | upstream 2xx                    | 200, body as-is, `Content-Type` = docx    |
//! | anything else failing           | 500 `{"error":"<message>"}`               |
//! | `GET /health`                   | 200 `ok`                                  |

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use docgen::DOCX_MIME;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use url::Url;

pub const RELAY_PATH: &str = "/api/file-proxy";
pub const HEALTH_PATH: &str = "/health";
/// Query parameter carrying the target URL.
pub const TARGET_PARAM: &str = "u";

const MAX_REDIRECTS: usize = 10;

/// JSON error body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

/// Relay failures, each mapped to one HTTP response.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Missing ?u=")]
    MissingTarget,

    #[error("Invalid ?u=")]
    InvalidTarget,

    #[error("Host not allowed")]
    HostNotAllowed(String),

    #[error("Upstream responded {0}")]
    Upstream(StatusCode),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingTarget | Self::InvalidTarget => StatusCode::BAD_REQUEST,
            Self::HostNotAllowed(_) => StatusCode::FORBIDDEN,
            Self::Upstream(status) => return (*status, ()).into_response(),
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Whether `host` equals, or is a subdomain of, an allowed host.
pub fn host_allowed(host: &str, allowed: &[String]) -> bool {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    allowed.iter().any(|entry| {
        let entry = entry.to_ascii_lowercase();
        host == entry || host.ends_with(&format!(".{entry}"))
    })
}

/// Check the raw `u` value: present, absolute http(s), allowed host.
pub fn validate_target(raw: Option<&str>, allowed: &[String]) -> Result<Url, RelayError> {
    let raw = raw.map(str::trim).filter(|u| !u.is_empty());
    let Some(raw) = raw else {
        return Err(RelayError::MissingTarget);
    };
    let url = Url::parse(raw).map_err(|_| RelayError::InvalidTarget)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(RelayError::InvalidTarget);
    }
    let host = url.host_str().ok_or(RelayError::InvalidTarget)?;
    if !host_allowed(host, allowed) {
        return Err(RelayError::HostNotAllowed(host.to_string()));
    }
    Ok(url)
}

/// Shared relay state: outbound client and allow-list.
#[derive(Clone)]
pub struct RelayState {
    http: reqwest::Client,
    allowed_hosts: Arc<Vec<String>>,
}

impl RelayState {
    /// Build a state whose client only follows redirects to allowed hosts.
    pub fn new(allowed_hosts: Vec<String>) -> anyhow::Result<Self> {
        let allowed_hosts = Arc::new(allowed_hosts);
        let redirect_hosts = Arc::clone(&allowed_hosts);
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if attempt
                .url()
                .host_str()
                .is_some_and(|h| host_allowed(h, &redirect_hosts))
            {
                attempt.follow()
            } else {
                attempt.stop()
            }
        });
        let http = reqwest::Client::builder()
            .redirect(policy)
            .build()
            .context("Failed to build relay HTTP client")?;
        Ok(Self {
            http,
            allowed_hosts,
        })
    }

    pub fn allowed_hosts(&self) -> &[String] {
        &self.allowed_hosts
    }
}

#[derive(Debug, Deserialize)]
struct ProxyQuery {
    u: Option<String>,
}

async fn file_proxy(
    State(state): State<RelayState>,
    Query(query): Query<ProxyQuery>,
) -> Result<Response, RelayError> {
    let target = validate_target(query.u.as_deref(), &state.allowed_hosts).map_err(|e| {
        warn!(error = %e, "relay request rejected");
        e
    })?;
    let host = target.host_str().unwrap_or_default().to_string();

    let upstream = state
        .http
        .get(target)
        .send()
        .await
        .map_err(|e| RelayError::Internal(e.to_string()))?;
    let status = upstream.status();
    if !status.is_success() {
        warn!(%host, status = status.as_u16(), "upstream fetch failed");
        return Err(RelayError::Upstream(status));
    }

    let body = upstream
        .bytes()
        .await
        .map_err(|e| RelayError::Internal(e.to_string()))?;
    info!(%host, size = body.len(), "relayed file");
    Ok(([(header::CONTENT_TYPE, DOCX_MIME)], body).into_response())
}

async fn health() -> &'static str {
    "ok"
}

/// Router with the relay and health routes.
pub fn build_router(state: RelayState) -> Router {
    Router::new()
        .route(RELAY_PATH, get(file_proxy))
        .route(HEALTH_PATH, get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `bind_addr` and serve until the process exits.
pub async fn serve(bind_addr: &str, state: RelayState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!(
        addr = %listener.local_addr()?,
        allowed = ?state.allowed_hosts(),
        "file relay listening"
    );
    axum::serve(listener, build_router(state))
        .await
        .context("Relay server failed")
}
