//! Template-fill pipeline for order templates kept on a board platform.
//!
//! This library provides:
//! - A graph API gateway that turns partial failures into errors
//! - Asset resolution from a document name to its transient download URL
//! - A `.docx` template engine filling `{petitioner}`, `{respondent}`, `{csp}`, `{drNumber}`
//! - A persistent cache of order types (categories) over a JSON key-value store
//! - Selection state and the sequential fill-and-download loop
//!
//! # Data flow
//!
//! ```text
//! Selection ─► resolver (gateway) ─► ByteSource (relay) ─► TemplateEngine ─► DownloadSink
//!                                                              ▲
//!                           catalog::fetch_field_values ───────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use docgen::{DirectorySink, FieldValues, FillPipeline, Gateway, Selection, SharedByteSource};
//!
//! # async fn run(source: SharedByteSource) -> docgen::DocfillResult<()> {
//! let gateway = Gateway::http("https://api.monday.com/v2", Some("token".into()), None)?;
//! let pipeline = FillPipeline::new(gateway, source, Arc::new(DirectorySink::new("filled")));
//!
//! let mut selection = Selection::new();
//! selection.toggle("1234", "Custody Order.docx");
//! pipeline
//!     .run_fill_and_download(&selection, &FieldValues::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod download;
pub mod errors;
pub mod gateway;
pub mod model;
pub mod pipeline;
pub mod queries;
pub mod resolver;
pub mod selection;
pub mod store;
pub mod template;

pub use cache::{CategoryCache, CACHE_KEY};
pub use catalog::{DocumentCatalog, DEFAULT_ORDER_GROUP, DEFAULT_TEMPLATE_BOARD};
pub use download::{DirectorySink, Download, DownloadSink, MemorySink, SharedSink};
pub use errors::{DocfillError, DocfillResult};
pub use gateway::{Gateway, GraphRequest, GraphResponse, GraphTransport, HttpTransport};
pub use model::{
    BoardContext, Category, Document, DocumentEntry, FieldValues, TemplateLocation, DOCX_MIME,
};
pub use pipeline::{BatchPolicy, ByteSource, FillPipeline, FillReport, SharedByteSource};
pub use selection::{DisplayGroup, Selection, SelectionEntry};
pub use store::{FileStore, KeyValueStore, MemoryStore, SharedStore, StoreError};
pub use template::{RenderOptions, TemplateEngine, TemplateError};
