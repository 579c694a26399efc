use crate::clients::ApiClient;
use crate::domain::models::{TestLlmProvider, TestUser};
use crate::error::HarnessResult;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

const DEFAULT_PROVIDER: &str = "openai";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Options for a new LLM provider; unset fields take the platform test defaults.
#[derive(Debug, Clone, Default)]
pub struct LlmProviderSpec {
    pub name: Option<String>,
    pub provider: Option<String>,
    pub default_model_name: Option<String>,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub api_version: Option<String>,
    /// Defaults to public
    pub is_public: Option<bool>,
    pub groups: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct LlmProviderUpsertRequest {
    name: String,
    provider: String,
    default_model_name: String,
    fast_default_model_name: String,
    api_key: Option<String>,
    api_base: Option<String>,
    api_version: Option<String>,
    custom_config: Option<serde_json::Value>,
    is_public: bool,
    groups: Vec<i64>,
    display_model_names: Option<Vec<String>>,
    model_names: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct LlmProviderResponse {
    id: i64,
}

pub struct LlmProviderManager;

impl LlmProviderManager {
    /// Create a provider and make it the default; search requires one to exist.
    pub async fn create(
        api: &ApiClient,
        spec: LlmProviderSpec,
        user_performing_action: &TestUser,
    ) -> HarnessResult<TestLlmProvider> {
        let request = LlmProviderUpsertRequest {
            name: spec
                .name
                .unwrap_or_else(|| format!("test-provider-{}", Uuid::new_v4())),
            provider: spec.provider.unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            default_model_name: spec
                .default_model_name
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            fast_default_model_name: DEFAULT_MODEL.to_string(),
            api_key: spec.api_key,
            api_base: spec.api_base,
            api_version: spec.api_version,
            custom_config: None,
            is_public: spec.is_public.unwrap_or(true),
            groups: spec.groups,
            display_model_names: None,
            model_names: None,
        };

        let created: LlmProviderResponse = api
            .put_json(
                "/admin/llm/provider?is_creation=true",
                &request,
                &user_performing_action.headers,
            )
            .await?;

        api.post_empty(
            &format!("/admin/llm/provider/{}/default", created.id),
            &user_performing_action.headers,
        )
        .await?;

        info!("Created default LLM provider {} ({})", request.name, created.id);

        Ok(TestLlmProvider {
            id: created.id,
            name: request.name,
            provider: request.provider,
            default_model_name: request.default_model_name,
            is_public: request.is_public,
            groups: request.groups,
        })
    }
}
