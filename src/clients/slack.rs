use crate::domain::models::SlackChannel;
use crate::error::{HarnessError, HarnessResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const PAGE_LIMIT: &str = "200";

/// Client for the Slack Web API, authenticated with a bot token.
pub struct SlackClient {
    client: Client,
    base_url: String,
    token: String,
}

/// Workspace member as returned by `users.list`.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub profile: SlackProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlackProfile {
    #[serde(default)]
    pub email: Option<String>,
}

/// Channel as returned by the `conversations.*` methods.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_general: bool,
    #[serde(default)]
    pub is_archived: bool,
}

impl From<Conversation> for SlackChannel {
    fn from(conversation: Conversation) -> Self {
        SlackChannel {
            id: conversation.id,
            name: conversation.name,
            is_private: conversation.is_private,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackMessage {
    pub ts: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub user: Option<String>,
}

impl SlackClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Call a Web API method. Slack reports failures in the body, not the status.
    async fn call(&self, method: &str, params: &[(&str, &str)]) -> HarnessResult<Value> {
        let url = format!("{}/{}", self.base_url, method);

        debug!("Slack {} {:?}", method, params);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .form(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(HarnessError::Slack {
                method: method.to_string(),
                error: format!("HTTP {}: {}", status, body),
            });
        }

        let body: Value = response.json().await?;
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            return Err(HarnessError::Slack {
                method: method.to_string(),
                error,
            });
        }

        Ok(body)
    }

    /// Call a cursor-paginated method and collect `field` from every page.
    async fn call_paginated<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
        field: &str,
    ) -> HarnessResult<Vec<T>> {
        let mut items = Vec::new();
        let mut cursor = String::new();

        loop {
            let mut page_params: Vec<(&str, &str)> = params.to_vec();
            page_params.push(("limit", PAGE_LIMIT));
            if !cursor.is_empty() {
                page_params.push(("cursor", cursor.as_str()));
            }

            let body = self.call(method, &page_params).await?;
            if let Some(page) = body.get(field) {
                let page: Vec<T> = serde_json::from_value(page.clone())?;
                items.extend(page);
            }

            let next = body
                .pointer("/response_metadata/next_cursor")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            if next.is_empty() {
                break;
            }
            cursor = next;
        }

        Ok(items)
    }

    fn channel_from(method: &str, body: Value) -> HarnessResult<Conversation> {
        let channel = body.get("channel").cloned().ok_or_else(|| HarnessError::Slack {
            method: method.to_string(),
            error: "response has no channel".to_string(),
        })?;
        Ok(serde_json::from_value(channel)?)
    }

    pub async fn users_list(&self) -> HarnessResult<Vec<SlackUser>> {
        self.call_paginated("users.list", &[], "members").await
    }

    /// List channels of the given comma-separated `types`.
    pub async fn conversations_list(
        &self,
        types: &str,
        exclude_archived: bool,
    ) -> HarnessResult<Vec<Conversation>> {
        let exclude_archived = if exclude_archived { "true" } else { "false" };
        self.call_paginated(
            "conversations.list",
            &[("types", types), ("exclude_archived", exclude_archived)],
            "channels",
        )
        .await
    }

    pub async fn conversations_create(
        &self,
        name: &str,
        is_private: bool,
    ) -> HarnessResult<Conversation> {
        let is_private = if is_private { "true" } else { "false" };
        let body = self
            .call("conversations.create", &[("name", name), ("is_private", is_private)])
            .await?;
        Self::channel_from("conversations.create", body)
    }

    pub async fn conversations_rename(
        &self,
        channel_id: &str,
        name: &str,
    ) -> HarnessResult<Conversation> {
        let body = self
            .call("conversations.rename", &[("channel", channel_id), ("name", name)])
            .await?;
        Self::channel_from("conversations.rename", body)
    }

    pub async fn conversations_unarchive(&self, channel_id: &str) -> HarnessResult<()> {
        self.call("conversations.unarchive", &[("channel", channel_id)]).await?;
        Ok(())
    }

    pub async fn conversations_invite(
        &self,
        channel_id: &str,
        user_ids: &[String],
    ) -> HarnessResult<()> {
        let users = user_ids.join(",");
        self.call("conversations.invite", &[("channel", channel_id), ("users", users.as_str())])
            .await?;
        Ok(())
    }

    pub async fn conversations_kick(&self, channel_id: &str, user_id: &str) -> HarnessResult<()> {
        self.call("conversations.kick", &[("channel", channel_id), ("user", user_id)])
            .await?;
        Ok(())
    }

    /// User ids of every channel member.
    pub async fn conversations_members(&self, channel_id: &str) -> HarnessResult<Vec<String>> {
        self.call_paginated("conversations.members", &[("channel", channel_id)], "members")
            .await
    }

    pub async fn conversations_history(
        &self,
        channel_id: &str,
    ) -> HarnessResult<Vec<SlackMessage>> {
        self.call_paginated("conversations.history", &[("channel", channel_id)], "messages")
            .await
    }

    /// Post a message and return its timestamp.
    pub async fn chat_post_message(&self, channel_id: &str, text: &str) -> HarnessResult<String> {
        let body = self
            .call("chat.postMessage", &[("channel", channel_id), ("text", text)])
            .await?;
        body.get("ts")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| HarnessError::Slack {
                method: "chat.postMessage".to_string(),
                error: "response has no ts".to_string(),
            })
    }

    pub async fn chat_delete(&self, channel_id: &str, ts: &str) -> HarnessResult<()> {
        self.call("chat.delete", &[("channel", channel_id), ("ts", ts)]).await?;
        Ok(())
    }
}
