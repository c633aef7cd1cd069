//! Domain records shared across the pipeline.
//!
//! Field names mirror the graph API payloads (snake_case) so records can be
//! deserialized straight out of a `data` response.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// MIME type of the packaged wordprocessing document format.
pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// File extension (without dot) of fillable templates.
pub const DOCX_EXTENSION: &str = "docx";

/// An order type: one item in the template board's order group.
///
/// Decoding is lenient so cached lists written by older versions still load:
/// numbers become strings and any other value becomes empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Uploader reference attached to an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUploader {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A file asset attached to a category item (a template document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Short-lived download link; never cached.
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub file_extension: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub uploaded_by: Option<AssetUploader>,
}

impl Document {
    /// Whether the asset is a packaged document and can be filled.
    ///
    /// Either the declared extension or the name suffix must say `docx`,
    /// compared case-insensitively.
    pub fn is_fillable(&self) -> bool {
        let by_extension = self
            .file_extension
            .as_deref()
            .map(|ext| ext.trim_start_matches('.').eq_ignore_ascii_case(DOCX_EXTENSION))
            .unwrap_or(false);
        by_extension
            || self
                .name
                .to_ascii_lowercase()
                .ends_with(&format!(".{DOCX_EXTENSION}"))
    }
}

/// Document name plus fillability, as listed under an expanded category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentEntry {
    pub name: String,
    pub fillable: bool,
}

impl From<&Document> for DocumentEntry {
    fn from(doc: &Document) -> Self {
        Self {
            name: doc.name.clone(),
            fillable: doc.is_fillable(),
        }
    }
}

/// The four item values merged into every template.
///
/// Unresolved fields stay empty strings; they still substitute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValues {
    pub petitioner: String,
    pub respondent: String,
    pub csp: String,
    #[serde(rename = "drNumber")]
    pub dr_number: String,
}

/// Placeholder names understood by the template engine.
pub const PLACEHOLDER_FIELDS: [&str; 4] = ["petitioner", "respondent", "csp", "drNumber"];

/// Column titles read from the case item, in placeholder order.
pub const PETITIONER_TITLE: &str = "Petitioner";
pub const RESPONDENT_TITLE: &str = "Respondent";
pub const CSP_TITLE: &str = "CSP";
pub const DR_NUMBER_TITLE: &str = "DR#";

impl FieldValues {
    /// Value for a placeholder name, or `None` if the name is not a known field.
    pub fn get(&self, placeholder: &str) -> Option<&str> {
        match placeholder {
            "petitioner" => Some(&self.petitioner),
            "respondent" => Some(&self.respondent),
            "csp" => Some(&self.csp),
            "drNumber" => Some(&self.dr_number),
            _ => None,
        }
    }

    /// Build from `(column title, text)` pairs; unknown titles are ignored.
    pub fn from_titled<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let mut values = Self::default();
        for (title, text) in pairs {
            let text = text.unwrap_or_default().to_string();
            match title {
                PETITIONER_TITLE => values.petitioner = text,
                RESPONDENT_TITLE => values.respondent = text,
                CSP_TITLE => values.csp = text,
                DR_NUMBER_TITLE => values.dr_number = text,
                _ => {}
            }
        }
        values
    }
}

/// Board and item the app was opened on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardContext {
    #[serde(default)]
    pub board_id: Option<String>,
    #[serde(default)]
    pub item_id: Option<String>,
}

/// Location of the order group that holds the template categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateLocation {
    pub board_id: String,
    pub group_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, ext: Option<&str>) -> Document {
        Document {
            id: "1".into(),
            name: name.into(),
            url: None,
            public_url: None,
            file_extension: ext.map(str::to_string),
            file_size: None,
            uploaded_by: None,
        }
    }

    #[test]
    fn test_fillable_by_extension_or_suffix() {
        assert!(doc("order", Some("docx")).is_fillable());
        assert!(doc("order", Some("DOCX")).is_fillable());
        assert!(doc("order", Some(".docx")).is_fillable());
        assert!(doc("Order.DocX", None).is_fillable());
        assert!(!doc("order.pdf", Some("pdf")).is_fillable());
        assert!(!doc("order.doc", None).is_fillable());
    }

    #[test]
    fn test_category_decodes_numbers_and_junk() {
        let categories: Vec<Category> = serde_json::from_value(serde_json::json!([
            { "id": 9, "name": "Legacy" },
            { "id": "3", "name": null, "extra": true },
            {}
        ]))
        .unwrap();
        assert_eq!(
            categories,
            vec![
                Category::new("9", "Legacy"),
                Category::new("3", ""),
                Category::default()
            ]
        );
    }

    #[test]
    fn test_field_values_from_titles() {
        let values = FieldValues::from_titled([
            ("Petitioner", Some("Jane Doe")),
            ("DR#", Some("DR-7")),
            ("CSP", None),
            ("Type of Case", Some("ignored")),
        ]);
        assert_eq!(values.petitioner, "Jane Doe");
        assert_eq!(values.dr_number, "DR-7");
        assert_eq!(values.csp, "");
        assert_eq!(values.respondent, "");
        assert_eq!(values.get("drNumber"), Some("DR-7"));
        assert_eq!(values.get("DrNumber"), None);
    }

    #[test]
    fn test_field_values_serialize_with_placeholder_names() {
        let json = serde_json::to_value(FieldValues::default()).unwrap();
        for field in PLACEHOLDER_FIELDS {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }
}
