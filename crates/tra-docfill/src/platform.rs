//! The host platform as seen by a session: where the app was opened, the
//! installation's key-value storage, and the usage notification.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docgen::{BoardContext, DocfillResult, SharedStore};
use tracing::info;

/// Host platform collaborator.
#[async_trait]
pub trait PlatformContext: Send + Sync {
    /// Board and item the app is opened on.
    async fn context(&self) -> DocfillResult<BoardContext>;

    /// Installation-scoped key-value storage.
    fn storage(&self) -> SharedStore;

    /// Signal that the app delivered its first value to the user.
    async fn value_created_for_user(&self);
}

/// Platform backed by command-line identifiers and a local store.
pub struct CliPlatform {
    context: BoardContext,
    store: SharedStore,
    notifications: AtomicUsize,
}

impl CliPlatform {
    pub fn new(context: BoardContext, store: SharedStore) -> Self {
        Self {
            context,
            store,
            notifications: AtomicUsize::new(0),
        }
    }

    /// How many times `value_created_for_user` fired.
    pub fn notifications(&self) -> usize {
        self.notifications.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PlatformContext for CliPlatform {
    async fn context(&self) -> DocfillResult<BoardContext> {
        Ok(self.context.clone())
    }

    fn storage(&self) -> SharedStore {
        self.store.clone()
    }

    async fn value_created_for_user(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
        info!("value created for user");
    }
}
