//! Delivery of filled documents.
//!
//! A browser host would trigger a download; here a [`DownloadSink`] decides
//! where the bytes go. [`DirectorySink`] writes files, [`MemorySink`] keeps
//! them for inspection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use crate::errors::DocfillResult;

/// A filled document ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Destination for filled documents.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn deliver(&self, download: Download) -> DocfillResult<()>;
}

/// Shared sink reference.
pub type SharedSink = Arc<dyn DownloadSink>;

/// Replace path separators and control characters so a document name can't
/// escape the output directory.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Writes each download into a directory, overwriting same-named files.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn shared(self) -> SharedSink {
        Arc::new(self)
    }
}

#[async_trait]
impl DownloadSink for DirectorySink {
    async fn deliver(&self, download: Download) -> DocfillResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(sanitize_file_name(&download.file_name));
        tokio::fs::write(&path, &download.bytes).await?;
        info!(path = %path.display(), size = download.bytes.len(), "document saved");
        Ok(())
    }
}

/// Collects downloads in memory.
#[derive(Default)]
pub struct MemorySink {
    downloads: Mutex<Vec<Download>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, in order.
    pub async fn downloads(&self) -> Vec<Download> {
        self.downloads.lock().await.clone()
    }
}

#[async_trait]
impl DownloadSink for MemorySink {
    async fn deliver(&self, download: Download) -> DocfillResult<()> {
        self.downloads.lock().await.push(download);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Order.docx"), "Order.docx");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name("a\\b:c.docx"), "a_b_c.docx");
        assert_eq!(sanitize_file_name("  "), "document");
    }

    #[tokio::test]
    async fn test_directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        sink.deliver(Download {
            file_name: "Custody Order.docx".into(),
            content_type: "x".into(),
            bytes: vec![1, 2, 3],
        })
        .await
        .unwrap();
        let written = std::fs::read(dir.path().join("out").join("Custody Order.docx")).unwrap();
        assert_eq!(written, vec![1, 2, 3]);
    }
}
