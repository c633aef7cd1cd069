//! Template engine: fill `{field}` placeholders inside a packaged document.
//!
//! # Placeholder rules
//!
//! | Rule                       | Behavior                                   |
//! |----------------------------|--------------------------------------------|
//! | delimiters                 | single braces, `{name}`                    |
//! | name                       | trimmed; one of `petitioner`, `respondent`, `csp`, `drNumber` |
//! | unknown name               | [`TemplateError::UnknownPlaceholder`]      |
//! | `\n` in a value            | line break inside the same paragraph       |
//! | repeated placeholder       | every occurrence replaced                  |
//! | split across runs          | supported                                  |
//!
//! Text parts are `word/document.xml`, headers, footers, footnotes and
//! endnotes. Every other part is copied through unchanged.

mod markup;
mod package;
mod placeholder;

pub use package::MAIN_PART;

use tracing::{info, warn};

use crate::download::{Download, DownloadSink};
use crate::errors::DocfillResult;
use crate::model::{FieldValues, DOCX_MIME};

/// Failures raised while filling a template.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template file is empty")]
    EmptyContainer,

    #[error("Template is not a valid document package: {0}")]
    Container(String),

    #[error("Template package has no word/document.xml")]
    MissingMainPart,

    #[error("Malformed markup in {part}: {message}")]
    Markup { part: String, message: String },

    #[error("Unknown placeholder {{{name}}} in {part}")]
    UnknownPlaceholder { part: String, name: String },

    #[error("Unclosed placeholder {{{name} in {part}")]
    UnclosedTag { part: String, name: String },

    #[error("Closing brace without opening brace in {part} after {context:?}")]
    UnopenedTag { part: String, context: String },

    #[error("Failed to write filled package: {0}")]
    Write(String),
}

/// Render switches.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Turn `\n` in values into line breaks.
    pub linebreaks: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { linebreaks: true }
    }
}

/// Fills packaged documents with item field values.
#[derive(Debug, Clone, Default)]
pub struct TemplateEngine {
    options: RenderOptions,
}

impl TemplateEngine {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Substitute all placeholders in `container` and return the new package.
    pub fn render(&self, container: &[u8], values: &FieldValues) -> Result<Vec<u8>, TemplateError> {
        package::render_package(container, values, &self.options)
    }

    /// Render, hand the result to `sink` as `output_name`, and return the bytes.
    ///
    /// Render failures are logged with their detail; callers see the generic
    /// template message.
    pub async fn fill(
        &self,
        container: &[u8],
        values: &FieldValues,
        output_name: &str,
        sink: &dyn DownloadSink,
    ) -> DocfillResult<Vec<u8>> {
        let bytes = self.render(container, values).map_err(|e| {
            warn!(output = output_name, error = %e, "template render failed");
            e
        })?;
        sink.deliver(Download {
            file_name: output_name.to_string(),
            content_type: DOCX_MIME.to_string(),
            bytes: bytes.clone(),
        })
        .await?;
        info!(output = output_name, size = bytes.len(), "filled document delivered");
        Ok(bytes)
    }
}
