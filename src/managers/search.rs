use crate::clients::ApiClient;
use crate::domain::models::TestUser;
use crate::domain::search::{DocumentSearchRequest, DocumentSearchResponse, SearchDoc};
use crate::error::HarnessResult;
use tracing::debug;

pub struct DocumentSearchManager;

impl DocumentSearchManager {
    /// Run a document search as `user` and return the top documents.
    pub async fn search(
        api: &ApiClient,
        request: &DocumentSearchRequest,
        user: &TestUser,
    ) -> HarnessResult<Vec<SearchDoc>> {
        let response: DocumentSearchResponse = api
            .post_json("/query/document-search", request, &user.headers)
            .await?;
        debug!(
            "Search {:?} as {} returned {} documents",
            request.message,
            user.email,
            response.top_documents.len()
        );
        Ok(response.top_documents)
    }

    /// Content of each top document, in ranking order.
    pub async fn search_contents(
        api: &ApiClient,
        request: &DocumentSearchRequest,
        user: &TestUser,
    ) -> HarnessResult<Vec<String>> {
        let docs = Self::search(api, request, user).await?;
        Ok(docs.into_iter().map(|doc| doc.content).collect())
    }
}
