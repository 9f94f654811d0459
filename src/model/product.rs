use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Catalog entry as read by the quote pipeline. Only the fields needed for
/// line-item enrichment are mapped; the rest of the document is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub slug: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
