//! Remote Data Gateway — one graph request per call, errors normalized.
//!
//! The gateway owns no global state: callers build a transport, wrap it in a
//! [`Gateway`], and pass the gateway (cheaply cloned) into every component
//! that needs graph data.
//!
//! ```text
//! execute(query, variables)
//!   ├─ transport fails            → DocfillError::Transport
//!   ├─ response.errors non-empty  → DocfillError::RemoteQuery("m1; m2")
//!   └─ otherwise                  → response.data (Null when absent)
//! ```

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::errors::{DocfillError, DocfillResult};

/// Operation name logged when the query text has none.
pub const ANONYMOUS_OPERATION: &str = "(anonymous)";

/// Header carrying the pinned API version.
const API_VERSION_HEADER: &str = "API-Version";

static OPERATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(query|mutation)\s+([A-Za-z0-9_]+)").expect("static regex is valid")
});

/// Extract the operation name from `query Foo` / `mutation Foo`.
pub fn operation_name(query: &str) -> &str {
    OPERATION_PATTERN
        .captures(query)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str())
        .unwrap_or(ANONYMOUS_OPERATION)
}

/// Wire body of a graph request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphRequest {
    pub query: String,
    pub variables: Value,
}

impl GraphRequest {
    pub fn new(query: &str, variables: Value) -> Self {
        Self {
            query: query.to_string(),
            variables,
        }
    }

    pub fn operation_name(&self) -> &str {
        operation_name(&self.query)
    }
}

/// One entry of the response `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphErrorEntry {
    #[serde(default)]
    pub message: String,
}

/// Wire body of a graph response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Vec<GraphErrorEntry>,
    /// Some platform failures arrive as a flat message instead of `errors`.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl GraphResponse {
    /// A success response carrying `data`.
    pub fn ok(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// An error response with the given messages.
    pub fn failed<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            errors: messages
                .into_iter()
                .map(|m| GraphErrorEntry { message: m.into() })
                .collect(),
            ..Self::default()
        }
    }

    fn error_messages(&self) -> Vec<String> {
        let mut messages: Vec<String> = self.errors.iter().map(|e| e.message.clone()).collect();
        if messages.is_empty() {
            if let Some(message) = &self.error_message {
                messages.push(message.clone());
            }
        }
        messages
    }
}

/// Sends a single graph request and returns the decoded response body.
///
/// `HttpTransport` is the production implementation; tests substitute fakes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GraphTransport: Send + Sync {
    async fn send(&self, request: &GraphRequest) -> DocfillResult<GraphResponse>;
}

/// `reqwest`-backed transport for the board platform's graph endpoint.
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    api_version: Option<String>,
}

impl HttpTransport {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        api_version: Option<String>,
    ) -> DocfillResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| DocfillError::Transport {
                operation: "(client)".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token,
            api_version,
        })
    }
}

#[async_trait]
impl GraphTransport for HttpTransport {
    async fn send(&self, request: &GraphRequest) -> DocfillResult<GraphResponse> {
        let operation = request.operation_name().to_string();
        let transport_err = |message: String| DocfillError::Transport {
            operation: operation.clone(),
            message,
        };

        let mut builder = self.http.post(&self.endpoint).json(request);
        if let Some(token) = &self.token {
            builder = builder.header(reqwest::header::AUTHORIZATION, token);
        }
        if let Some(version) = &self.api_version {
            builder = builder.header(API_VERSION_HEADER, version);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| transport_err(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_err(e.to_string()))?;

        match serde_json::from_str::<GraphResponse>(&body) {
            // Error statuses that still carry graph errors are reported as such.
            Ok(parsed) if status.is_success() || !parsed.error_messages().is_empty() => Ok(parsed),
            Ok(_) => Err(transport_err(format!("HTTP {status}"))),
            Err(_) if !status.is_success() => Err(transport_err(format!("HTTP {status}: {body}"))),
            Err(e) => Err(transport_err(format!("invalid response body: {e}"))),
        }
    }
}

/// Entry point for every graph query the pipeline issues.
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn GraphTransport>,
}

impl Gateway {
    pub fn new(transport: Arc<dyn GraphTransport>) -> Self {
        Self { transport }
    }

    /// Convenience constructor over the HTTP transport.
    pub fn http(
        endpoint: impl Into<String>,
        token: Option<String>,
        api_version: Option<String>,
    ) -> DocfillResult<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(
            endpoint,
            token,
            api_version,
        )?)))
    }

    /// Run `query` with `variables` and return the `data` payload unchanged.
    pub async fn execute(&self, query: &str, variables: Value) -> DocfillResult<Value> {
        let request = GraphRequest::new(query, variables);
        let operation = request.operation_name().to_string();

        let response = self.transport.send(&request).await?;

        let messages = response.error_messages();
        if !messages.is_empty() {
            error!(
                op = %operation,
                errors = ?messages,
                variables = %request.variables,
                "graph query FAILED"
            );
            return Err(DocfillError::RemoteQuery {
                operation,
                message: messages.join("; "),
            });
        }

        info!(op = %operation, "graph query ok");
        Ok(response.data.unwrap_or(Value::Null))
    }
}
