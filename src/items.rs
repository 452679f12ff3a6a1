//! Item listing over a document collection

use mongodb::bson::{Bson, Document};
use serde::Serialize;
use serde_json::Value;

use crate::store::DocumentStore;
use crate::{Error, Result};

/// Collection served by the item routes
pub const ITEMS_COLLECTION: &str = "items";

const ID_FIELD: &str = "_id";

/// Every document of a collection, ready to serialize
#[derive(Debug, Clone, Serialize, PartialEq, utoipa::ToSchema)]
pub struct ItemList {
    pub count: usize,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Value>,
}

/// Read every document from `collection`.
///
/// No filter, projection, pagination or ordering is applied. Returns
/// [`Error::NotConnected`] without querying when `store` is absent.
pub async fn list_all(store: Option<&dyn DocumentStore>, collection: &str) -> Result<ItemList> {
    let store = store.ok_or(Error::NotConnected)?;

    let documents = store.find_all(collection).await?;
    let data: Vec<Value> = documents.into_iter().map(render_document).collect();

    tracing::debug!(collection, count = data.len(), "Listed items");

    Ok(ItemList {
        count: data.len(),
        data,
    })
}

/// Convert a document to JSON with its identifier as a plain string.
pub fn render_document(mut document: Document) -> Value {
    if let Some(id) = document.get(ID_FIELD) {
        let rendered = display_id(id);
        document.insert(ID_FIELD, rendered);
    }
    Bson::Document(document).into_relaxed_extjson()
}

fn display_id(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};

    #[test]
    fn test_object_id_rendered_as_hex() {
        let oid = ObjectId::new();
        let value = render_document(doc! { "_id": oid, "name": "widget" });

        assert_eq!(value["_id"], Value::String(oid.to_hex()));
        assert_eq!(value["name"], "widget");
    }

    #[test]
    fn test_string_id_kept_verbatim() {
        let value = render_document(doc! { "_id": "sku-1" });
        assert_eq!(value["_id"], "sku-1");
    }

    #[test]
    fn test_numeric_id_becomes_string() {
        let value = render_document(doc! { "_id": 42_i32, "qty": 3_i32 });
        assert_eq!(value["_id"], "42");
        assert_eq!(value["qty"], 3);
    }

    #[test]
    fn test_document_without_id_passes_through() {
        let value = render_document(doc! { "name": "loose" });
        assert!(value.get("_id").is_none());
        assert_eq!(value["name"], "loose");
    }

    #[tokio::test]
    async fn test_missing_store_is_not_connected() {
        let result = list_all(None, ITEMS_COLLECTION).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }
}
