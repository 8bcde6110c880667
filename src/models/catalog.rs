//! Catalog models: categories, items, file attachments

use serde::{Deserialize, Serialize};

use super::User;

/// Item category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An uploaded image attached to an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUpload {
    pub id: i64,
    pub file_name: Option<String>,
    pub path: Option<String>,
}

/// A marketplace listing. Most fields are optional on the wire; the server
/// fills what the listing form provided.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Item {
    pub id: Option<i64>,
    pub category_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub price: Option<f64>,
    pub location: Option<String>,
    #[serde(default)]
    pub file_uploads: Vec<FileUpload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_deserializes_with_sparse_fields() {
        let item: Item = serde_json::from_str(
            r#"{"id":3,"title":"Calculus textbook","price":250.0,"file_uploads":[{"id":1,"file_name":"cover.jpg","path":"/uploads/cover.jpg"}]}"#,
        )
        .unwrap();
        assert_eq!(item.id, Some(3));
        assert_eq!(item.file_uploads.len(), 1);
        assert!(item.category.is_none());
    }
}
