//! Named graph operations consumed by the pipeline.
//!
//! Every operation is named so the gateway can log it; variables are declared
//! explicitly and passed through [`crate::gateway::Gateway::execute`].

/// Page size used when listing boards and group items.
pub const PAGE_LIMIT: u32 = 500;

/// Columns of a board (id, title, type).
pub const BOARD_COLUMNS: &str = r#"
query BoardColumns($boardId: [ID!]) {
  boards(ids: $boardId) {
    id
    columns {
      id
      title
      type
    }
  }
}
"#;

/// All column values of an item, with the owning column title.
pub const ITEM_NAME_AND_VALUES: &str = r#"
query ItemNameAndValues($itemId: [ID!]) {
  items(ids: $itemId) {
    id
    name
    column_values {
      id
      text
      value
      column { title }
    }
  }
}
"#;

/// File assets attached to an item, including the transient public URL.
pub const FILE_URL: &str = r#"
query FileURL($itemId: [ID!]) {
  items(ids: $itemId) {
    id
    name
    assets(assets_source: all) {
      id
      name
      url
      public_url
      file_extension
      file_size
      uploaded_by { id name }
    }
  }
}
"#;

/// Items of one group on one board (the order types).
pub const ORDER_TYPES: &str = r#"
query OrderTypes($boardIds: [ID!], $groupIds: [String]) {
  boards(ids: $boardIds) {
    id
    name
    groups(ids: $groupIds) {
      id
      title
      items_page(limit: 500) {
        items {
          id
          name
        }
      }
    }
  }
}
"#;

/// Every board with its groups, up to [`PAGE_LIMIT`] boards.
pub const TEMPLATE_BOARD_AND_GROUP: &str = r#"
query TemplateBoardAndGroup($limit: Int) {
  boards(limit: $limit) {
    id
    name
    groups {
      id
      title
    }
  }
}
"#;

/// API version metadata.
pub const API_VERSION: &str = r#"
query ApiVersion {
  version {
    kind
    value
  }
}
"#;
