//! Batch fill: resolve → fetch → fill → deliver, one selected document at a time.
//!
//! ```text
//! for each (category, document) in selection order:
//!     resolve_document_url  (gateway, exact name match)
//!     ByteSource::fetch_bytes (relay)
//!     TemplateEngine::fill  (placeholders → DownloadSink)
//! ```
//!
//! Nothing runs concurrently; the next document starts only after the
//! previous one was delivered or failed.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::download::SharedSink;
use crate::errors::{DocfillError, DocfillResult};
use crate::gateway::Gateway;
use crate::model::FieldValues;
use crate::resolver;
use crate::selection::{Selection, SelectionEntry};
use crate::template::TemplateEngine;

/// Fetches the bytes behind a transient access URL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ByteSource: Send + Sync {
    async fn fetch_bytes(&self, url: &str) -> DocfillResult<Vec<u8>>;
}

/// Shared byte source reference.
pub type SharedByteSource = Arc<dyn ByteSource>;

/// What a failed document does to the rest of the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Stop at the first failure and surface it.
    #[default]
    AbortOnError,
    /// Log the failure, record it, and move on.
    ContinueOnError,
}

impl fmt::Display for BatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AbortOnError => write!(f, "abort"),
            Self::ContinueOnError => write!(f, "continue"),
        }
    }
}

impl FromStr for BatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::AbortOnError),
            "continue" => Ok(Self::ContinueOnError),
            other => Err(format!("unknown batch policy '{other}' (expected abort|continue)")),
        }
    }
}

/// Result for one selected document.
#[derive(Debug)]
pub struct ItemOutcome {
    pub entry: SelectionEntry,
    /// Size of the delivered document, or the failure.
    pub result: DocfillResult<usize>,
}

/// Per-document results of a batch, in selection order.
#[derive(Debug, Default)]
pub struct FillReport {
    pub outcomes: Vec<ItemOutcome>,
}

impl FillReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// The last failure, which is the one a user gets to see.
    pub fn last_error(&self) -> Option<&DocfillError> {
        self.outcomes
            .iter()
            .rev()
            .find_map(|o| o.result.as_ref().err())
    }
}

/// The fill-and-download loop with its collaborators injected.
#[derive(Clone)]
pub struct FillPipeline {
    gateway: Gateway,
    source: SharedByteSource,
    engine: TemplateEngine,
    sink: SharedSink,
    policy: BatchPolicy,
}

impl FillPipeline {
    pub fn new(gateway: Gateway, source: SharedByteSource, sink: SharedSink) -> Self {
        Self {
            gateway,
            source,
            engine: TemplateEngine::default(),
            sink,
            policy: BatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_engine(mut self, engine: TemplateEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn policy(&self) -> BatchPolicy {
        self.policy
    }

    /// Fill every selected document with `values`.
    ///
    /// Under [`BatchPolicy::AbortOnError`] the first failure is returned and
    /// later documents are never touched; documents already delivered stay
    /// delivered.
    pub async fn run_fill_and_download(
        &self,
        selection: &Selection,
        values: &FieldValues,
    ) -> DocfillResult<FillReport> {
        if selection.is_empty() {
            return Err(DocfillError::EmptySelection);
        }
        info!(count = selection.len(), policy = %self.policy, "starting fill batch");

        let mut report = FillReport::default();
        for entry in selection {
            let result = self.fill_one(entry, values).await;
            if let Err(e) = &result {
                error!(
                    category_id = %entry.category_id,
                    document = %entry.document_name,
                    code = e.code(),
                    error = %e,
                    "fill failed"
                );
            }
            let result = match result {
                Err(e) if self.policy == BatchPolicy::AbortOnError => return Err(e),
                other => other,
            };
            report.outcomes.push(ItemOutcome {
                entry: entry.clone(),
                result,
            });
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "fill batch finished"
        );
        Ok(report)
    }

    async fn fill_one(&self, entry: &SelectionEntry, values: &FieldValues) -> DocfillResult<usize> {
        let url =
            resolver::resolve_document_url(&self.gateway, &entry.category_id, &entry.document_name)
                .await?;
        let bytes = self.source.fetch_bytes(&url).await?;
        let filled = self
            .engine
            .fill(&bytes, values, &entry.document_name, self.sink.as_ref())
            .await?;
        Ok(filled.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::MemorySink;
    use crate::gateway::{GraphResponse, MockGraphTransport};
    use serde_json::json;

    fn gateway_with_assets(calls: usize) -> Gateway {
        let mut transport = MockGraphTransport::new();
        transport.expect_send().times(calls).returning(|_| {
            Ok(GraphResponse::ok(json!({ "items": [{ "id": "7", "assets": [
                { "id": "1", "name": "order.docx", "public_url": "https://files.example/order" }
            ]}]})))
        });
        Gateway::new(Arc::new(transport))
    }

    #[test]
    fn test_batch_policy_parse() {
        assert_eq!("abort".parse::<BatchPolicy>().unwrap(), BatchPolicy::AbortOnError);
        assert_eq!(" Continue ".parse::<BatchPolicy>().unwrap(), BatchPolicy::ContinueOnError);
        assert!("retry".parse::<BatchPolicy>().is_err());
        assert_eq!(BatchPolicy::default().to_string(), "abort");
    }

    #[tokio::test]
    async fn test_empty_selection_fails_without_calls() {
        let pipeline = FillPipeline::new(
            gateway_with_assets(0),
            Arc::new(MockByteSource::new()),
            Arc::new(MemorySink::new()),
        );
        let err = pipeline
            .run_fill_and_download(&Selection::new(), &FieldValues::default())
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Please select at least one document first.");
    }

    #[tokio::test]
    async fn test_abort_stops_at_first_failure() {
        let mut source = MockByteSource::new();
        source
            .expect_fetch_bytes()
            .times(1)
            .returning(|_| Err(DocfillError::RelayFetch { status: 404 }));
        let sink = Arc::new(MemorySink::new());
        let pipeline = FillPipeline::new(gateway_with_assets(1), Arc::new(source), sink.clone());

        let mut selection = Selection::new();
        selection.toggle("7", "order.docx");
        selection.toggle("8", "order.docx");

        let err = pipeline
            .run_fill_and_download(&selection, &FieldValues::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DocfillError::RelayFetch { status: 404 }));
        assert!(sink.downloads().await.is_empty());
    }

    #[tokio::test]
    async fn test_continue_records_every_failure() {
        let mut source = MockByteSource::new();
        source
            .expect_fetch_bytes()
            .times(2)
            .returning(|_| Ok(Vec::new()));
        let pipeline = FillPipeline::new(
            gateway_with_assets(2),
            Arc::new(source),
            Arc::new(MemorySink::new()),
        )
        .with_policy(BatchPolicy::ContinueOnError);

        let mut selection = Selection::new();
        selection.toggle("7", "order.docx");
        selection.toggle("8", "order.docx");

        let report = pipeline
            .run_fill_and_download(&selection, &FieldValues::default())
            .await
            .unwrap();
        assert_eq!(report.failed(), 2);
        assert_eq!(report.succeeded(), 0);
        assert!(matches!(
            report.last_error(),
            Some(DocfillError::TemplateRender(_))
        ));
    }
}
