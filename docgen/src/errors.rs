//! Error taxonomy for the template-fill pipeline.
//!
//! Every failure the pipeline can surface to the top-level action handler is
//! represented here. The handler shows exactly one message at a time (the most
//! recent one), so each variant renders a self-contained sentence through
//! [`DocfillError::user_message`].
//!
//! | Variant            | Raised by                         |
//! |--------------------|-----------------------------------|
//! | RemoteQuery        | gateway: graph `errors` array      |
//! | Transport          | gateway: HTTP / decode failure     |
//! | DocumentNotFound   | resolver: no match / no public URL |
//! | RelayFetch         | relay client: non-2xx from relay   |
//! | TemplateRender     | template engine                    |
//! | EmptySelection     | pipeline: nothing selected         |
//! | NotSelectable      | session: disabled or unknown doc   |
//! | Lookup             | catalog: template board/group      |
//! | Store              | key-value store                    |
//! | Io                 | download sink                      |

use thiserror::Error;

use crate::store::StoreError;
use crate::template::TemplateError;

/// Result alias used across the crate.
pub type DocfillResult<T> = Result<T, DocfillError>;

/// Unified error type for all pipeline operations.
#[derive(Debug, Error)]
pub enum DocfillError {
    /// The graph API answered with one or more errors; messages are joined with `"; "`.
    #[error("{message}")]
    RemoteQuery { operation: String, message: String },

    /// The graph API could not be reached or returned an unreadable body.
    #[error("Graph request {operation} failed: {message}")]
    Transport { operation: String, message: String },

    /// No asset with the requested name (or it has no public URL).
    #[error("No file with a public URL found for the selected document.")]
    DocumentNotFound {
        category_id: String,
        document_name: String,
    },

    /// The byte relay answered with a non-success status.
    #[error("Proxy fetch failed: {status}")]
    RelayFetch { status: u16 },

    /// The byte relay could not be reached at all.
    #[error("Proxy request failed: {0}")]
    RelayUnavailable(String),

    /// Placeholder or structural failure while filling a template.
    #[error("Failed to render template")]
    TemplateRender(#[from] TemplateError),

    /// A fill was requested with nothing selected.
    #[error("Please select at least one document first.")]
    EmptySelection,

    /// Only listed docx documents of a category can be selected.
    #[error("Only .docx documents can be filled: '{document_name}' is not selectable.")]
    NotSelectable {
        category_id: String,
        document_name: String,
    },

    /// A named board or group could not be found.
    #[error("{0}")]
    Lookup(String),

    /// A graph payload did not have the expected shape.
    #[error("Unexpected response shape: {0}")]
    Decode(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocfillError {
    /// The single message shown to the user for this failure.
    ///
    /// Template failures keep the generic wording and leave the detail to the
    /// log, the same way every other variant is already user-facing text.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Short machine-readable code, used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RemoteQuery { .. } => "remote_query",
            Self::Transport { .. } => "transport",
            Self::DocumentNotFound { .. } => "document_not_found",
            Self::RelayFetch { .. } => "relay_fetch",
            Self::RelayUnavailable(_) => "relay_unavailable",
            Self::TemplateRender(_) => "template_render",
            Self::EmptySelection => "empty_selection",
            Self::NotSelectable { .. } => "not_selectable",
            Self::Lookup(_) => "lookup",
            Self::Decode(_) => "decode",
            Self::Store(_) => "store",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_query_message_is_the_joined_errors() {
        let err = DocfillError::RemoteQuery {
            operation: "FileURL".into(),
            message: "bad id; not authorized".into(),
        };
        assert_eq!(err.user_message(), "bad id; not authorized");
        assert_eq!(err.code(), "remote_query");
    }

    #[test]
    fn test_relay_fetch_message_includes_status() {
        let err = DocfillError::RelayFetch { status: 404 };
        assert_eq!(err.user_message(), "Proxy fetch failed: 404");
    }

    #[test]
    fn test_template_error_converts() {
        let err: DocfillError = TemplateError::EmptyContainer.into();
        assert_eq!(err.code(), "template_render");
        assert_eq!(err.user_message(), "Failed to render template");
    }
}
