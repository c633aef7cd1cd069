//! Connectivity checks outside the fill pipeline: a storage write/read round
//! trip on a throwaway key and the graph API version.

use chrono::Utc;
use docgen::{queries, DocfillError, DocfillResult, Gateway, SharedStore};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Key written by the storage smoke test.
pub const DEBUG_KEY: &str = "tra_debug_test";

/// Version metadata reported by the graph API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVersion {
    #[serde(default)]
    pub kind: Option<String>,
    pub value: String,
}

/// What the storage round trip saw.
#[derive(Debug, Clone, Serialize)]
pub struct StorageProbe {
    pub before: Option<Value>,
    pub after: Option<Value>,
    pub written: Value,
}

impl StorageProbe {
    /// Whether the value read back is the one written.
    pub fn round_trip_ok(&self) -> bool {
        self.after.as_ref() == Some(&self.written)
    }
}

/// Read, overwrite and re-read [`DEBUG_KEY`].
pub async fn storage_smoke_test(store: &SharedStore) -> DocfillResult<StorageProbe> {
    let before = store.get(DEBUG_KEY).await?;
    let written = json!({ "savedAt": Utc::now().to_rfc3339() });
    store.set(DEBUG_KEY, written.clone()).await?;
    let after = store.get(DEBUG_KEY).await?;
    info!(?before, ?after, "storage smoke test");
    Ok(StorageProbe {
        before,
        after,
        written,
    })
}

#[derive(Debug, Deserialize)]
struct VersionData {
    version: Option<ApiVersion>,
}

/// The API version, or `None` when the API reports none.
pub async fn api_version(gateway: &Gateway) -> DocfillResult<Option<ApiVersion>> {
    let data = gateway.execute(queries::API_VERSION, json!({})).await?;
    if data.is_null() {
        return Ok(None);
    }
    let parsed: VersionData =
        serde_json::from_value(data).map_err(|e| DocfillError::Decode(e.to_string()))?;
    if let Some(version) = &parsed.version {
        info!(value = %version.value, "api version");
    }
    Ok(parsed.version)
}

/// Both checks; each fails independently.
#[derive(Debug)]
pub struct DiagnosticsReport {
    pub api_version: DocfillResult<Option<ApiVersion>>,
    pub storage: DocfillResult<StorageProbe>,
}

impl DiagnosticsReport {
    pub fn is_healthy(&self) -> bool {
        self.api_version.is_ok()
            && self
                .storage
                .as_ref()
                .map(StorageProbe::round_trip_ok)
                .unwrap_or(false)
    }

    /// Human-readable lines for the CLI.
    pub fn lines(&self) -> Vec<String> {
        let api = match &self.api_version {
            Ok(Some(v)) => format!("api version: {}", v.value),
            Ok(None) => "api version: (not reported)".to_string(),
            Err(e) => format!("api version: FAILED ({e})"),
        };
        let storage = match &self.storage {
            Ok(probe) if probe.round_trip_ok() => "storage: ok".to_string(),
            Ok(probe) => format!("storage: read back {:?}", probe.after),
            Err(e) => format!("storage: FAILED ({e})"),
        };
        vec![api, storage]
    }
}

pub async fn run(gateway: &Gateway, store: &SharedStore) -> DiagnosticsReport {
    let report = DiagnosticsReport {
        api_version: api_version(gateway).await,
        storage: storage_smoke_test(store).await,
    };
    if !report.is_healthy() {
        warn!(lines = ?report.lines(), "diagnostics found problems");
    }
    report
}
