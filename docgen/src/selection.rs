//! The set of (category, document) pairs a user picked for filling.
//!
//! Membership is by pair equality. Insertion order is kept because the
//! grouped display and the fill loop both follow it.

use serde::{Deserialize, Serialize};

use crate::model::Category;

/// One selected document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEntry {
    pub category_id: String,
    pub document_name: String,
}

impl SelectionEntry {
    pub fn new(category_id: impl Into<String>, document_name: impl Into<String>) -> Self {
        Self {
            category_id: category_id.into(),
            document_name: document_name.into(),
        }
    }
}

/// Selected documents under one display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayGroup {
    pub label: String,
    pub documents: Vec<String>,
}

/// Ordered, duplicate-free selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    entries: Vec<SelectionEntry>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the pair if absent, remove it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, category_id: &str, document_name: &str) -> bool {
        match self
            .entries
            .iter()
            .position(|e| e.category_id == category_id && e.document_name == document_name)
        {
            Some(idx) => {
                self.entries.remove(idx);
                false
            }
            None => {
                self.entries
                    .push(SelectionEntry::new(category_id, document_name));
                true
            }
        }
    }

    pub fn contains(&self, category_id: &str, document_name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.category_id == category_id && e.document_name == document_name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectionEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Group selected document names by category display name, in the order
    /// categories were first selected. Categories not in `categories` are
    /// labelled `Order {id}`.
    pub fn group_for_display(&self, categories: &[Category]) -> Vec<DisplayGroup> {
        let mut groups: Vec<DisplayGroup> = Vec::new();
        for entry in &self.entries {
            let label = categories
                .iter()
                .find(|c| c.id == entry.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("Order {}", entry.category_id));
            match groups.iter_mut().find(|g| g.label == label) {
                Some(group) => group.documents.push(entry.document_name.clone()),
                None => groups.push(DisplayGroup {
                    label,
                    documents: vec![entry.document_name.clone()],
                }),
            }
        }
        groups
    }
}

impl FromIterator<SelectionEntry> for Selection {
    fn from_iter<I: IntoIterator<Item = SelectionEntry>>(iter: I) -> Self {
        let mut selection = Selection::new();
        for entry in iter {
            if !selection.contains(&entry.category_id, &entry.document_name) {
                selection.entries.push(entry);
            }
        }
        selection
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a SelectionEntry;
    type IntoIter = std::slice::Iter<'a, SelectionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
