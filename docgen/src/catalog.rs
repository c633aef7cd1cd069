//! Lookups around the template board: where it lives, what the current case
//! item says, and which documents each order type carries.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::errors::{DocfillError, DocfillResult};
use crate::gateway::Gateway;
use crate::model::{Document, DocumentEntry, FieldValues, TemplateLocation};
use crate::queries;
use crate::resolver;

/// Default name of the board holding the templates.
pub const DEFAULT_TEMPLATE_BOARD: &str = "TRA Templates";
/// Default title of the group whose items are the order types.
pub const DEFAULT_ORDER_GROUP: &str = "Orders";

#[derive(Debug, Deserialize)]
struct BoardsData {
    #[serde(default)]
    boards: Vec<BoardSummary>,
}

#[derive(Debug, Deserialize)]
struct BoardSummary {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    groups: Vec<GroupSummary>,
}

#[derive(Debug, Deserialize)]
struct GroupSummary {
    id: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemsData {
    #[serde(default)]
    items: Vec<ItemValues>,
}

#[derive(Debug, Deserialize)]
struct ItemValues {
    #[serde(default)]
    column_values: Vec<ColumnValue>,
}

#[derive(Debug, Deserialize)]
struct ColumnValue {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    column: Option<ColumnTitle>,
}

#[derive(Debug, Deserialize)]
struct ColumnTitle {
    #[serde(default)]
    title: Option<String>,
}

/// A board column (id, title, type).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BoardColumn {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

#[derive(Debug, Deserialize)]
struct ColumnsData {
    #[serde(default)]
    boards: Vec<BoardColumns>,
}

#[derive(Debug, Deserialize)]
struct BoardColumns {
    #[serde(default)]
    columns: Vec<BoardColumn>,
}

fn decode<T: for<'de> Deserialize<'de>>(data: Value) -> DocfillResult<T> {
    serde_json::from_value(data).map_err(|e| DocfillError::Decode(e.to_string()))
}

fn names_match(candidate: Option<&str>, wanted: &str) -> bool {
    candidate
        .map(|c| c.trim().eq_ignore_ascii_case(wanted.trim()))
        .unwrap_or(false)
}

/// Find the template board and order group by name (trimmed, case-insensitive).
pub async fn resolve_template_location(
    gateway: &Gateway,
    board_name: &str,
    group_title: &str,
) -> DocfillResult<TemplateLocation> {
    let data = gateway
        .execute(
            queries::TEMPLATE_BOARD_AND_GROUP,
            json!({ "limit": queries::PAGE_LIMIT }),
        )
        .await?;
    let boards: BoardsData = if data.is_null() {
        BoardsData { boards: Vec::new() }
    } else {
        decode(data)?
    };

    let board = boards
        .boards
        .into_iter()
        .find(|b| names_match(b.name.as_deref(), board_name))
        .ok_or_else(|| DocfillError::Lookup(format!("Template board '{board_name}' not found")))?;

    let group = board
        .groups
        .into_iter()
        .find(|g| names_match(g.title.as_deref(), group_title))
        .ok_or_else(|| {
            DocfillError::Lookup(format!(
                "Template group '{group_title}' not found on board '{board_name}'"
            ))
        })?;

    info!(board_id = %board.id, group_id = %group.id, "resolved template board and group");
    Ok(TemplateLocation {
        board_id: board.id,
        group_id: group.id,
    })
}

/// Read the four merge fields from the case item, by column title.
pub async fn fetch_field_values(gateway: &Gateway, item_id: &str) -> DocfillResult<FieldValues> {
    let data = gateway
        .execute(queries::ITEM_NAME_AND_VALUES, json!({ "itemId": [item_id] }))
        .await?;
    if data.is_null() {
        return Ok(FieldValues::default());
    }
    let items: ItemsData = decode(data)?;
    let columns = items
        .items
        .into_iter()
        .next()
        .map(|item| item.column_values)
        .unwrap_or_default();

    let values = FieldValues::from_titled(columns.iter().filter_map(|cv| {
        let title = cv.column.as_ref()?.title.as_deref()?;
        Some((title, cv.text.as_deref()))
    }));
    debug!(item_id, ?values, "item field values");
    Ok(values)
}

/// Columns of `board_id`.
pub async fn fetch_board_columns(
    gateway: &Gateway,
    board_id: &str,
) -> DocfillResult<Vec<BoardColumn>> {
    let data = gateway
        .execute(queries::BOARD_COLUMNS, json!({ "boardId": [board_id] }))
        .await?;
    if data.is_null() {
        return Ok(Vec::new());
    }
    let parsed: ColumnsData = decode(data)?;
    Ok(parsed
        .boards
        .into_iter()
        .next()
        .map(|b| b.columns)
        .unwrap_or_default())
}

/// Document lists per category, fetched on first expansion.
pub struct DocumentCatalog {
    gateway: Gateway,
    by_category: HashMap<String, Vec<Document>>,
}

impl DocumentCatalog {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            by_category: HashMap::new(),
        }
    }

    /// Documents attached to `category_id`, fetching them the first time.
    pub async fn documents(&mut self, category_id: &str) -> DocfillResult<&[Document]> {
        if !self.by_category.contains_key(category_id) {
            let assets = resolver::fetch_assets(&self.gateway, category_id).await?;
            info!(category_id, count = assets.len(), "fetched document names");
            self.by_category.insert(category_id.to_string(), assets);
        }
        Ok(self
            .by_category
            .get(category_id)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// Name + fillability for each document of `category_id`.
    pub async fn entries(&mut self, category_id: &str) -> DocfillResult<Vec<DocumentEntry>> {
        Ok(self
            .documents(category_id)
            .await?
            .iter()
            .map(DocumentEntry::from)
            .collect())
    }

    /// Already-loaded documents of `category_id`, without fetching.
    pub fn loaded(&self, category_id: &str) -> Option<&[Document]> {
        self.by_category.get(category_id).map(Vec::as_slice)
    }

    /// Whether `document_name` is a loaded, fillable document of `category_id`.
    ///
    /// Names match exactly; documents of a category not yet loaded are never
    /// selectable.
    pub fn selectable(&self, category_id: &str, document_name: &str) -> bool {
        self.loaded(category_id)
            .and_then(|docs| resolver::find_by_name(docs, document_name))
            .map(Document::is_fillable)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::gateway::{GraphResponse, MockGraphTransport};

    fn gateway_returning(payload: Value, calls: usize) -> Gateway {
        let mut transport = MockGraphTransport::new();
        transport
            .expect_send()
            .times(calls)
            .returning(move |_| Ok(GraphResponse::ok(payload.clone())));
        Gateway::new(Arc::new(transport))
    }

    #[tokio::test]
    async fn test_template_location_matches_trimmed_case_insensitive() {
        let gateway = gateway_returning(
            json!({ "boards": [
                { "id": "1", "name": "Open Cases", "groups": [] },
                { "id": "100", "name": "  tra templates ", "groups": [
                    { "id": "topics", "title": "Topics" },
                    { "id": "orders", "title": "ORDERS" }
                ]}
            ]}),
            1,
        );
        let location = resolve_template_location(&gateway, "TRA Templates", "Orders")
            .await
            .unwrap();
        assert_eq!(
            location,
            TemplateLocation {
                board_id: "100".into(),
                group_id: "orders".into()
            }
        );
    }

    #[tokio::test]
    async fn test_template_board_missing() {
        let gateway = gateway_returning(json!({ "boards": [] }), 1);
        let err = resolve_template_location(&gateway, "TRA Templates", "Orders")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("TRA Templates"));
    }

    #[tokio::test]
    async fn test_field_values_by_column_title() {
        let gateway = gateway_returning(
            json!({ "items": [{ "id": "42", "name": "Doe v. Roe", "column_values": [
                { "id": "text1", "text": "Jane Doe", "column": { "title": "Petitioner" } },
                { "id": "text2", "text": "John Roe", "column": { "title": "Respondent" } },
                { "id": "text3", "text": null, "column": { "title": "CSP" } },
                { "id": "text4", "text": "DR-1", "column": { "title": "DR#" } },
                { "id": "status", "text": "Open", "column": { "title": "Type of Case" } }
            ]}]}),
            1,
        );
        let values = fetch_field_values(&gateway, "42").await.unwrap();
        assert_eq!(values.petitioner, "Jane Doe");
        assert_eq!(values.respondent, "John Roe");
        assert_eq!(values.csp, "");
        assert_eq!(values.dr_number, "DR-1");
    }

    #[tokio::test]
    async fn test_document_catalog_fetches_once() {
        let gateway = gateway_returning(
            json!({ "items": [{ "id": "7", "assets": [
                { "id": "1", "name": "order.docx", "file_extension": "docx" },
                { "id": "2", "name": "scan.pdf", "file_extension": "pdf" }
            ]}]}),
            1,
        );
        let mut catalog = DocumentCatalog::new(gateway);
        let entries = catalog.entries("7").await.unwrap();
        assert_eq!(
            entries,
            vec![
                DocumentEntry { name: "order.docx".into(), fillable: true },
                DocumentEntry { name: "scan.pdf".into(), fillable: false },
            ]
        );
        assert_eq!(catalog.documents("7").await.unwrap().len(), 2);
        assert!(catalog.loaded("8").is_none());
    }

    #[tokio::test]
    async fn test_only_loaded_docx_documents_are_selectable() {
        let gateway = gateway_returning(
            json!({ "items": [{ "id": "7", "assets": [
                { "id": "1", "name": "order.docx", "file_extension": "docx" },
                { "id": "2", "name": "scan.pdf", "file_extension": "pdf" }
            ]}]}),
            1,
        );
        let mut catalog = DocumentCatalog::new(gateway);
        assert!(!catalog.selectable("7", "order.docx"));

        catalog.documents("7").await.unwrap();
        assert!(catalog.selectable("7", "order.docx"));
        assert!(!catalog.selectable("7", "scan.pdf"));
        assert!(!catalog.selectable("7", "Order.docx"));
        assert!(!catalog.selectable("7", "missing.docx"));
        assert!(!catalog.selectable("8", "order.docx"));
    }

    #[tokio::test]
    async fn test_board_columns() {
        let gateway = gateway_returning(
            json!({ "boards": [{ "id": "5", "columns": [
                { "id": "text1", "title": "Petitioner", "type": "text" }
            ]}]}),
            1,
        );
        let columns = fetch_board_columns(&gateway, "5").await.unwrap();
        assert_eq!(columns[0].title, "Petitioner");
        assert_eq!(columns[0].column_type, "text");
    }
}
