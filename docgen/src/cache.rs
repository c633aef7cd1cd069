//! Category Cache — read-through / write-through memo of the order types.
//!
//! ```text
//! get_categories(board, group)
//!   ├─ store["orderTypesCache_v1"].orders is a list (and not expired) → return it
//!   └─ otherwise → OrderTypes query → first group's items → write entry → return
//! ```
//!
//! The key carries its schema version (`_v1`); bump it when the entry layout
//! changes. Entries written here also record `savedAt`, which an optional TTL
//! is checked against. Entries without `savedAt` never expire.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::errors::{DocfillError, DocfillResult};
use crate::gateway::Gateway;
use crate::model::Category;
use crate::queries;
use crate::store::SharedStore;

/// Storage key of the order-type cache entry.
pub const CACHE_KEY: &str = "orderTypesCache_v1";

#[derive(Debug, Deserialize)]
struct OrderTypesData {
    #[serde(default)]
    boards: Vec<BoardGroups>,
}

#[derive(Debug, Deserialize)]
struct BoardGroups {
    #[serde(default)]
    groups: Vec<GroupItems>,
}

#[derive(Debug, Deserialize)]
struct GroupItems {
    #[serde(default)]
    items_page: Option<ItemsPage>,
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    items: Vec<Category>,
}

/// Items of the first group of the first board in an `OrderTypes` payload.
pub fn categories_from_data(data: Value) -> DocfillResult<Vec<Category>> {
    if data.is_null() {
        return Ok(Vec::new());
    }
    let parsed: OrderTypesData =
        serde_json::from_value(data).map_err(|e| DocfillError::Decode(e.to_string()))?;
    Ok(parsed
        .boards
        .into_iter()
        .next()
        .and_then(|board| board.groups.into_iter().next())
        .and_then(|group| group.items_page)
        .map(|page| page.items)
        .unwrap_or_default())
}

/// Persistent memo of the order-type list.
#[derive(Clone)]
pub struct CategoryCache {
    gateway: Gateway,
    store: SharedStore,
    ttl: Option<Duration>,
}

impl CategoryCache {
    pub fn new(gateway: Gateway, store: SharedStore) -> Self {
        Self {
            gateway,
            store,
            ttl: None,
        }
    }

    /// Expire entries older than `ttl`.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Return the cached order types, fetching and storing them on a miss.
    pub async fn get_categories(
        &self,
        board_id: &str,
        group_id: &str,
    ) -> DocfillResult<Vec<Category>> {
        if let Some(categories) = self.read_cached().await {
            info!(count = categories.len(), "order types served from cache");
            return Ok(categories);
        }
        self.refresh(board_id, group_id).await
    }

    /// Fetch from the gateway and overwrite the cache entry, skipping the read.
    pub async fn refresh(&self, board_id: &str, group_id: &str) -> DocfillResult<Vec<Category>> {
        info!(board_id, group_id, "cache empty, fetching order types");
        let data = self
            .gateway
            .execute(
                queries::ORDER_TYPES,
                json!({ "boardIds": [board_id], "groupIds": [group_id] }),
            )
            .await?;
        let categories = categories_from_data(data)?;

        let entry = json!({
            "orders": categories,
            "savedAt": Utc::now().to_rfc3339(),
        });
        match self.store.set(CACHE_KEY, entry).await {
            Ok(()) => info!(count = categories.len(), "order types saved to storage"),
            Err(e) => warn!(error = %e, "failed to save order types to storage"),
        }
        Ok(categories)
    }

    /// Drop the cache entry so the next lookup goes to the gateway.
    pub async fn invalidate(&self) -> DocfillResult<()> {
        self.store.delete(CACHE_KEY).await?;
        info!("order type cache cleared");
        Ok(())
    }

    async fn read_cached(&self) -> Option<Vec<Category>> {
        let entry = match self.store.get(CACHE_KEY).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "order type cache unreadable, treating as empty");
                return None;
            }
        };

        let orders = entry.get("orders").filter(|o| o.is_array())?;

        if let Some(ttl) = self.ttl {
            if is_expired(&entry, ttl, Utc::now()) {
                info!(ttl_secs = ttl.as_secs(), "order type cache expired");
                return None;
            }
        }

        // Served as-is once it is a list; entries that are not objects decode empty.
        let categories = orders
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| Category::deserialize(item).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        Some(categories)
    }
}

fn is_expired(entry: &Value, ttl: Duration, now: DateTime<Utc>) -> bool {
    let Some(saved_at) = entry
        .get("savedAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    else {
        return false;
    };
    let age = now.signed_duration_since(saved_at.with_timezone(&Utc));
    age.to_std().map(|age| age > ttl).unwrap_or(false)
}
