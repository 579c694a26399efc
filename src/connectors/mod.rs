pub mod file;

use crate::domain::models::DocumentSource;
use crate::error::HarnessResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Batch size used when a connector is not told otherwise.
pub const INDEX_BATCH_SIZE: usize = 16;

/// Trait for connectors that produce their full document set in one pass.
#[async_trait]
pub trait LoadConnector: Send + Sync {
    /// Load every document, grouped into batches.
    async fn load_from_state(&self) -> HarnessResult<Vec<Vec<Document>>>;

    /// Get the document source.
    fn source(&self) -> DocumentSource;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub link: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicExpertInfo {
    pub display_name: String,
}

/// A document as a connector hands it to the indexing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub sections: Vec<Section>,
    pub source: DocumentSource,
    pub semantic_identifier: String,
    pub title: String,
    pub doc_updated_at: DateTime<Utc>,
    pub primary_owners: Option<Vec<BasicExpertInfo>>,
    pub secondary_owners: Option<Vec<BasicExpertInfo>>,
    /// Free-form tags; owners, timestamps and links have dedicated fields
    pub metadata: HashMap<String, serde_json::Value>,
}
