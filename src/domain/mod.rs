pub mod models;
pub mod search;

pub use models::{
    AccessType, DocumentSource, IndexingStatus, InputType, SlackChannel, TestCcPair, TestConnector,
    TestCredential, TestLlmProvider, TestUser,
};
pub use search::{DocumentSearchRequest, LlmEvaluationType, RetrievalDetails, SearchDoc, SearchType};
