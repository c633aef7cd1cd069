//! Reference Resolver — document name → transient public URL.
//!
//! Matching is an exact, case-sensitive comparison on the asset name. Two
//! assets differing only in case are distinct documents; neither matches a
//! differently-cased query. Resolved URLs expire quickly, so nothing here is
//! cached: every fill resolves again right before fetching.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{DocfillError, DocfillResult};
use crate::gateway::Gateway;
use crate::model::Document;
use crate::queries;

#[derive(Debug, Deserialize)]
struct AssetsData {
    #[serde(default)]
    items: Vec<ItemAssets>,
}

#[derive(Debug, Deserialize)]
struct ItemAssets {
    #[serde(default)]
    assets: Vec<Document>,
}

/// All file assets attached to `item_id`, in the order the API lists them.
pub async fn fetch_assets(gateway: &Gateway, item_id: &str) -> DocfillResult<Vec<Document>> {
    let data = gateway
        .execute(queries::FILE_URL, json!({ "itemId": [item_id] }))
        .await?;
    assets_from_data(data)
}

fn assets_from_data(data: Value) -> DocfillResult<Vec<Document>> {
    if data.is_null() {
        return Ok(Vec::new());
    }
    let parsed: AssetsData =
        serde_json::from_value(data).map_err(|e| DocfillError::Decode(e.to_string()))?;
    Ok(parsed
        .items
        .into_iter()
        .next()
        .map(|item| item.assets)
        .unwrap_or_default())
}

/// First asset whose name equals `document_name` exactly.
pub fn find_by_name<'a>(assets: &'a [Document], document_name: &str) -> Option<&'a Document> {
    assets.iter().find(|a| a.name == document_name)
}

/// Resolve the public URL of `document_name` attached to `category_id`.
pub async fn resolve_document_url(
    gateway: &Gateway,
    category_id: &str,
    document_name: &str,
) -> DocfillResult<String> {
    let assets = fetch_assets(gateway, category_id).await?;

    let url = find_by_name(&assets, document_name).and_then(|asset| asset.public_url.clone());
    match url {
        Some(url) => {
            debug!(category_id, document_name, "resolved document url");
            Ok(url)
        }
        None => Err(DocfillError::DocumentNotFound {
            category_id: category_id.to_string(),
            document_name: document_name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::gateway::{GraphResponse, MockGraphTransport};

    fn gateway_with_assets(assets: Value) -> Gateway {
        let mut transport = MockGraphTransport::new();
        transport.expect_send().returning(move |req| {
            assert_eq!(req.operation_name(), "FileURL");
            Ok(GraphResponse::ok(json!({
                "items": [{ "id": "7", "name": "Custody", "assets": assets.clone() }]
            })))
        });
        Gateway::new(Arc::new(transport))
    }

    #[tokio::test]
    async fn test_resolves_exact_name() {
        let gateway = gateway_with_assets(json!([
            { "id": "1", "name": "other.docx", "public_url": "https://files/other" },
            { "id": "2", "name": "order.docx", "public_url": "https://files/order" }
        ]));
        let url = resolve_document_url(&gateway, "7", "order.docx").await.unwrap();
        assert_eq!(url, "https://files/order");
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let gateway = gateway_with_assets(json!([
            { "id": "1", "name": "order.docx", "public_url": "https://files/first" },
            { "id": "2", "name": "order.docx", "public_url": "https://files/second" }
        ]));
        let url = resolve_document_url(&gateway, "7", "order.docx").await.unwrap();
        assert_eq!(url, "https://files/first");
    }

    #[tokio::test]
    async fn test_case_differences_never_match() {
        let gateway = gateway_with_assets(json!([
            { "id": "1", "name": "Order.docx", "public_url": "https://files/upper" },
            { "id": "2", "name": "ORDER.DOCX", "public_url": "https://files/shout" }
        ]));
        let err = resolve_document_url(&gateway, "7", "order.docx")
            .await
            .unwrap_err();
        assert!(matches!(err, DocfillError::DocumentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_match_without_public_url_is_not_found() {
        let gateway = gateway_with_assets(json!([
            { "id": "1", "name": "order.docx", "url": "https://internal/order" }
        ]));
        let err = resolve_document_url(&gateway, "7", "order.docx")
            .await
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "No file with a public URL found for the selected document."
        );
    }

    #[test]
    fn test_null_data_has_no_assets() {
        assert!(assets_from_data(Value::Null).unwrap().is_empty());
        assert!(assets_from_data(json!({ "items": [] })).unwrap().is_empty());
    }
}
