use crate::clients::ApiClient;
use crate::domain::models::{DocumentSource, TestCredential, TestUser};
use crate::error::HarnessResult;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Options for a new credential.
#[derive(Debug, Clone)]
pub struct CredentialSpec {
    pub name: Option<String>,
    pub source: DocumentSource,
    pub credential_json: serde_json::Value,
    pub admin_public: bool,
    pub curator_public: bool,
    pub groups: Vec<i64>,
}

impl CredentialSpec {
    pub fn new(source: DocumentSource, credential_json: serde_json::Value) -> Self {
        Self {
            name: None,
            source,
            credential_json,
            admin_public: true,
            curator_public: false,
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CredentialRequest<'a> {
    name: &'a str,
    credential_json: &'a serde_json::Value,
    admin_public: bool,
    source: DocumentSource,
    curator_public: bool,
    groups: &'a [i64],
}

#[derive(Debug, Deserialize)]
struct CredentialResponse {
    id: i64,
}

pub struct CredentialManager;

impl CredentialManager {
    pub async fn create(
        api: &ApiClient,
        spec: CredentialSpec,
        user_performing_action: &TestUser,
    ) -> HarnessResult<TestCredential> {
        let name = spec
            .name
            .unwrap_or_else(|| format!("test-credential-{}", Uuid::new_v4()));

        let request = CredentialRequest {
            name: &name,
            credential_json: &spec.credential_json,
            admin_public: spec.admin_public,
            source: spec.source,
            curator_public: spec.curator_public,
            groups: &spec.groups,
        };
        let created: CredentialResponse = api
            .post_json("/manage/credential", &request, &user_performing_action.headers)
            .await?;

        info!("Created {} credential {}", spec.source, created.id);

        Ok(TestCredential {
            id: created.id,
            name,
            credential_json: spec.credential_json,
            admin_public: spec.admin_public,
            source: spec.source,
            groups: spec.groups,
        })
    }
}
