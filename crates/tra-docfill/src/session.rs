//! Session controller: one mounted instance of the app.
//!
//! Drives the [`SessionMachine`] through mount (context → item values →
//! order types), lets the caller browse categories and toggle documents,
//! and runs fill batches. Only the most recent failure message is kept.

use std::sync::Arc;
use std::time::Duration;

use docgen::catalog::{self, DocumentCatalog};
use docgen::{
    BoardContext, Category, CategoryCache, DisplayGroup, DocfillError, DocumentEntry, FieldValues,
    FillPipeline, FillReport, Gateway, Selection, TemplateLocation,
};
use tracing::{info, warn};

use crate::platform::PlatformContext;
use crate::state_machine::{IllegalTransition, SessionMachine, SessionState, TransitionRecord};

/// Failures of session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Docfill(#[from] DocfillError),

    #[error(transparent)]
    Transition(#[from] IllegalTransition),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Names used to locate the template board.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub template_board: String,
    pub template_group: String,
    pub cache_ttl: Option<Duration>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            template_board: docgen::DEFAULT_TEMPLATE_BOARD.to_string(),
            template_group: docgen::DEFAULT_ORDER_GROUP.to_string(),
            cache_ttl: None,
        }
    }
}

pub struct Session {
    platform: Arc<dyn PlatformContext>,
    gateway: Gateway,
    cache: CategoryCache,
    catalog: DocumentCatalog,
    pipeline: FillPipeline,
    settings: SessionSettings,
    machine: SessionMachine,
    context: BoardContext,
    location: Option<TemplateLocation>,
    values: FieldValues,
    categories: Vec<Category>,
    selection: Selection,
    last_error: Option<String>,
}

impl Session {
    pub fn new(
        platform: Arc<dyn PlatformContext>,
        gateway: Gateway,
        pipeline: FillPipeline,
        settings: SessionSettings,
    ) -> Self {
        let cache = CategoryCache::new(gateway.clone(), platform.storage())
            .with_ttl(settings.cache_ttl);
        Self {
            catalog: DocumentCatalog::new(gateway.clone()),
            platform,
            gateway,
            cache,
            pipeline,
            settings,
            machine: SessionMachine::new(),
            context: BoardContext::default(),
            location: None,
            values: FieldValues::default(),
            categories: Vec::new(),
            selection: Selection::new(),
            last_error: None,
        }
    }

    /// Load context, item values and order types, ending in `Ready` or `Error`.
    ///
    /// A context failure is only logged; the session continues without an
    /// item and every field value stays empty. An item-values failure is
    /// recorded as the current message but the order types still load.
    pub async fn mount(&mut self) -> SessionResult<()> {
        self.mount_with(false).await
    }

    /// [`Session::mount`], but the order types always come from the gateway
    /// and overwrite the cache.
    pub async fn mount_refreshed(&mut self) -> SessionResult<()> {
        self.mount_with(true).await
    }

    async fn mount_with(&mut self, refresh: bool) -> SessionResult<()> {
        self.platform.value_created_for_user().await;

        match self.platform.context().await {
            Ok(context) => {
                info!(board_id = ?context.board_id, item_id = ?context.item_id, "context loaded");
                self.context = context;
            }
            Err(e) => warn!(error = %e, "could not read platform context"),
        }

        if let Some(item_id) = self.context.item_id.clone() {
            self.machine.advance(SessionState::LoadingItem, None)?;
            match catalog::fetch_field_values(&self.gateway, &item_id).await {
                Ok(values) => {
                    self.values = values;
                    self.machine.advance(SessionState::LoadingCategories, None)?;
                }
                Err(e) => {
                    self.record_failure(e);
                    self.machine
                        .advance(SessionState::LoadingCategories, Some("item values unavailable"))?;
                }
            }
        } else {
            self.machine
                .advance(SessionState::LoadingCategories, Some("no item in context"))?;
        }

        self.load_categories(refresh).await
    }

    /// Drop the cached order types and load them again.
    pub async fn refresh_categories(&mut self) -> SessionResult<()> {
        self.machine
            .advance(SessionState::LoadingCategories, Some("refresh"))?;
        self.load_categories(true).await
    }

    async fn load_categories(&mut self, force: bool) -> SessionResult<()> {
        let location = match self.location.clone() {
            Some(location) => location,
            None => match catalog::resolve_template_location(
                &self.gateway,
                &self.settings.template_board,
                &self.settings.template_group,
            )
            .await
            {
                Ok(location) => location,
                Err(e) => return Err(self.record_failure(e)),
            },
        };

        let loaded = if force {
            self.cache
                .refresh(&location.board_id, &location.group_id)
                .await
        } else {
            self.cache
                .get_categories(&location.board_id, &location.group_id)
                .await
        };
        match loaded {
            Ok(categories) => {
                info!(count = categories.len(), "order types ready");
                self.categories = categories;
                self.location = Some(location);
                self.machine.advance(SessionState::Ready, None)?;
                Ok(())
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    /// Documents of a category, fetched the first time it is expanded.
    ///
    /// Failures are logged and returned but do not change the session state.
    pub async fn documents(&mut self, category_id: &str) -> SessionResult<Vec<DocumentEntry>> {
        self.catalog.entries(category_id).await.map_err(|e| {
            warn!(category_id, error = %e, "could not list documents");
            SessionError::from(e)
        })
    }

    /// Flip selection of one document. Returns whether it is now selected.
    ///
    /// Deselecting always succeeds. Selecting requires a docx document listed
    /// under the category, loading the list first if needed; anything else is
    /// refused with [`DocfillError::NotSelectable`] and leaves the session
    /// state alone.
    pub async fn toggle(&mut self, category_id: &str, document_name: &str) -> SessionResult<bool> {
        if !self.selection.contains(category_id, document_name) {
            if self.catalog.loaded(category_id).is_none() {
                self.documents(category_id).await?;
            }
            if !self.catalog.selectable(category_id, document_name) {
                warn!(category_id, document_name, "document is not selectable");
                return Err(DocfillError::NotSelectable {
                    category_id: category_id.to_string(),
                    document_name: document_name.to_string(),
                }
                .into());
            }
        }
        Ok(self.selection.toggle(category_id, document_name))
    }

    /// Selected documents grouped under their category names.
    pub fn grouped_selection(&self) -> Vec<DisplayGroup> {
        self.selection.group_for_display(&self.categories)
    }

    /// Fill every selected document with the item's field values.
    ///
    /// An empty selection reports an error without entering `Filling`.
    /// Starting a batch clears the previous message.
    pub async fn fill_selected(&mut self) -> SessionResult<FillReport> {
        if self.selection.is_empty() {
            return Err(self.record_failure(DocfillError::EmptySelection));
        }

        self.last_error = None;
        let reason = format!("{} documents", self.selection.len());
        self.machine
            .advance(SessionState::Filling, Some(reason.as_str()))?;

        match self
            .pipeline
            .run_fill_and_download(&self.selection, &self.values)
            .await
        {
            Ok(report) => {
                match report.last_error() {
                    Some(e) => {
                        let message = e.user_message();
                        self.machine.fail(&message);
                        self.last_error = Some(message);
                    }
                    None => self.machine.advance(SessionState::Ready, None)?,
                }
                Ok(report)
            }
            Err(e) => Err(self.record_failure(e)),
        }
    }

    /// Dismiss the current message and return to `Ready`.
    pub fn dismiss_error(&mut self) -> SessionResult<()> {
        self.last_error = None;
        if self.machine.current() == SessionState::Error {
            self.machine.advance(SessionState::Ready, Some("dismissed"))?;
        }
        Ok(())
    }

    fn record_failure(&mut self, error: DocfillError) -> SessionError {
        let message = error.user_message();
        warn!(code = error.code(), error = %message, state = %self.machine.current(), "session action failed");
        self.machine.fail(&message);
        self.last_error = Some(message);
        SessionError::Docfill(error)
    }

    pub fn state(&self) -> SessionState {
        self.machine.current()
    }

    /// The single message on display, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn context(&self) -> &BoardContext {
        &self.context
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        self.machine.transitions()
    }

    pub fn summary(&self) -> String {
        self.machine.summary()
    }
}
