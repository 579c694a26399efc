use serde::{Deserialize, Serialize};

/// Retrieval strategy for a document search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Keyword,
    Semantic,
}

/// Whether the platform asks an LLM to judge result relevance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmEvaluationType {
    Agentic,
    Basic,
    /// Bypass LLM re-ranking entirely
    Skip,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalSearchSetting {
    Always,
    Never,
    Auto,
}

/// Retrieval options, serialised with the platform's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalDetails {
    pub run_search: OptionalSearchSetting,
    pub real_time: bool,
    pub filters: Option<serde_json::Value>,
    pub enable_auto_detect_filters: Option<bool>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub dedupe_docs: bool,
    pub chunks_above: u32,
    pub chunks_below: u32,
    pub full_doc: bool,
}

impl Default for RetrievalDetails {
    fn default() -> Self {
        Self {
            run_search: OptionalSearchSetting::Always,
            real_time: true,
            filters: None,
            enable_auto_detect_filters: None,
            offset: None,
            limit: None,
            dedupe_docs: false,
            chunks_above: 0,
            chunks_below: 0,
            full_doc: false,
        }
    }
}

/// Body of `POST /query/document-search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSearchRequest {
    pub message: String,
    pub search_type: SearchType,
    pub retrieval_options: RetrievalDetails,
    pub recency_bias_multiplier: f64,
    pub evaluation_type: LlmEvaluationType,
    pub rerank_settings: Option<serde_json::Value>,
    pub chunks_above: u32,
    pub chunks_below: u32,
    pub full_doc: bool,
}

impl DocumentSearchRequest {
    pub fn new(
        message: impl Into<String>,
        search_type: SearchType,
        evaluation_type: LlmEvaluationType,
    ) -> Self {
        Self {
            message: message.into(),
            search_type,
            retrieval_options: RetrievalDetails::default(),
            recency_bias_multiplier: 1.0,
            evaluation_type,
            rerank_settings: None,
            chunks_above: 0,
            chunks_below: 0,
            full_doc: false,
        }
    }

    /// Keyword search with LLM evaluation skipped.
    pub fn keyword(message: impl Into<String>) -> Self {
        Self::new(message, SearchType::Keyword, LlmEvaluationType::Skip)
    }
}

/// One entry of `top_documents`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchDoc {
    pub document_id: String,
    #[serde(default)]
    pub semantic_identifier: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub blurb: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSearchResponse {
    pub top_documents: Vec<SearchDoc>,
    #[serde(default)]
    pub llm_indices: Vec<usize>,
}
