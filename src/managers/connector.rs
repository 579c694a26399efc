use crate::clients::ApiClient;
use crate::domain::models::{AccessType, DocumentSource, InputType, TestConnector, TestUser};
use crate::error::HarnessResult;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Options for a new connector.
#[derive(Debug, Clone)]
pub struct ConnectorSpec {
    pub name: Option<String>,
    pub source: DocumentSource,
    pub input_type: InputType,
    /// Defaults to `{"file_locations": []}`
    pub connector_specific_config: Option<serde_json::Value>,
    pub is_public: bool,
    pub groups: Vec<i64>,
}

impl ConnectorSpec {
    pub fn new(source: DocumentSource, input_type: InputType) -> Self {
        Self {
            name: None,
            source,
            input_type,
            connector_specific_config: None,
            is_public: true,
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ConnectorUpdateRequest<'a> {
    name: &'a str,
    source: DocumentSource,
    input_type: InputType,
    connector_specific_config: &'a serde_json::Value,
    access_type: AccessType,
    groups: &'a [i64],
}

#[derive(Debug, Deserialize)]
struct ConnectorResponse {
    id: i64,
}

pub struct ConnectorManager;

impl ConnectorManager {
    pub async fn create(
        api: &ApiClient,
        spec: ConnectorSpec,
        user_performing_action: &TestUser,
    ) -> HarnessResult<TestConnector> {
        let name = spec
            .name
            .unwrap_or_else(|| format!("test-connector-{}", Uuid::new_v4()));
        let config = spec
            .connector_specific_config
            .unwrap_or_else(|| serde_json::json!({ "file_locations": [] }));
        let access_type = if spec.is_public {
            AccessType::Public
        } else {
            AccessType::Private
        };

        let request = ConnectorUpdateRequest {
            name: &name,
            source: spec.source,
            input_type: spec.input_type,
            connector_specific_config: &config,
            access_type,
            groups: &spec.groups,
        };
        let created: ConnectorResponse = api
            .post_json("/manage/admin/connector", &request, &user_performing_action.headers)
            .await?;

        info!("Created {} connector {} ({})", spec.source, name, created.id);

        Ok(TestConnector {
            id: created.id,
            name,
            source: spec.source,
            input_type: spec.input_type,
            connector_specific_config: config,
            access_type,
            groups: spec.groups,
        })
    }
}
