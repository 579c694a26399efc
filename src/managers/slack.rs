use crate::clients::SlackClient;
use crate::domain::models::SlackChannel;
use crate::error::{HarnessError, HarnessResult};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

const CHANNEL_TYPES: &str = "public_channel,private_channel";

/// Slack-side fixtures: channels, membership and messages.
pub struct SlackManager;

impl SlackManager {
    pub fn get_slack_client(base_url: &str, token: &str) -> SlackClient {
        SlackClient::new(base_url, token)
    }

    /// Map of workspace member email to Slack user id.
    pub async fn build_slack_user_email_id_map(
        client: &SlackClient,
    ) -> HarnessResult<HashMap<String, String>> {
        let users = client.users_list().await?;
        Ok(users
            .into_iter()
            .filter_map(|user| user.profile.email.map(|email| (email, user.id)))
            .collect())
    }

    /// Non-general channels of the requested kind; `only_get_done` keeps
    /// the ones released by an earlier run.
    async fn non_general_channels(
        client: &SlackClient,
        is_private: bool,
        only_get_done: bool,
    ) -> HarnessResult<Vec<SlackChannel>> {
        let types = if is_private { "private_channel" } else { "public_channel" };
        let conversations = client.conversations_list(types, false).await?;
        Ok(conversations
            .into_iter()
            .filter(|c| !c.is_general)
            .filter(|c| !only_get_done || c.name.contains("done"))
            .map(SlackChannel::from)
            .collect())
    }

    /// Rename a released channel for this run, or create a new one.
    async fn build_channel(
        client: &SlackClient,
        admin_user_id: &str,
        run_id: &str,
        is_private: bool,
        reuse: Option<&SlackChannel>,
    ) -> HarnessResult<SlackChannel> {
        let base = if is_private { "private_channel" } else { "public_channel" };
        let name = format!("{}-{}", base, run_id);

        let conversation = match reuse {
            Some(channel) => client.conversations_rename(&channel.id, &name).await?,
            None => client.conversations_create(&name, is_private).await?,
        };

        if let Err(e) = client.conversations_unarchive(&conversation.id).await {
            // already unarchived
            tracing::debug!("Unarchive {}: {}", conversation.id, e);
        }
        if let Err(e) = client
            .conversations_invite(&conversation.id, &[admin_user_id.to_string()])
            .await
        {
            tracing::debug!("Invite admin to {}: {}", conversation.id, e);
        }

        let mut channel = SlackChannel::from(conversation);
        channel.is_private = is_private;
        Ok(channel)
    }

    /// Provision an empty public and private channel for one run.
    ///
    /// Returns `(public, private, run_id)`; hand the run id to
    /// [`SlackManager::cleanup_after_test`] when done.
    pub async fn get_and_provision_available_slack_channels(
        client: &SlackClient,
        admin_user_id: &str,
    ) -> HarnessResult<(SlackChannel, SlackChannel, String)> {
        let run_id = Uuid::new_v4().to_string();

        let public_available = Self::non_general_channels(client, false, true).await?;
        let public =
            Self::build_channel(client, admin_user_id, &run_id, false, public_available.first())
                .await?;
        Self::delete_all_messages(client, &public).await?;

        let private_available = Self::non_general_channels(client, true, true).await?;
        let private =
            Self::build_channel(client, admin_user_id, &run_id, true, private_available.first())
                .await?;
        Self::delete_all_messages(client, &private).await?;

        info!(
            "Provisioned channels {} and {} for run {}",
            public.name, private.name, run_id
        );
        Ok((public, private, run_id))
    }

    /// Make the channel's members exactly the admin plus `user_ids`.
    pub async fn set_channel_members(
        client: &SlackClient,
        admin_user_id: &str,
        channel: &SlackChannel,
        user_ids: &[String],
    ) -> HarnessResult<()> {
        let members = client.conversations_members(&channel.id).await?;
        for member in members.iter().filter(|m| m.as_str() != admin_user_id) {
            match client.conversations_kick(&channel.id, member).await {
                Ok(()) => {}
                Err(e) if e.slack_code() == Some("cant_kick_self") => {}
                Err(e) => return Err(e),
            }
        }

        for user_id in user_ids {
            match client
                .conversations_invite(&channel.id, std::slice::from_ref(user_id))
                .await
            {
                Ok(()) => {}
                Err(e) if e.slack_code() == Some("already_in_channel") => {}
                Err(e) => return Err(e),
            }
        }

        info!("Set members of {} to {:?}", channel.name, user_ids);
        Ok(())
    }

    pub async fn add_message_to_channel(
        client: &SlackClient,
        channel: &SlackChannel,
        message: &str,
    ) -> HarnessResult<()> {
        client.chat_post_message(&channel.id, message).await?;
        info!("Posted to {}: {}", channel.name, message);
        Ok(())
    }

    /// Delete every message in the channel whose text is exactly `message`.
    pub async fn remove_message_from_channel(
        client: &SlackClient,
        channel: &SlackChannel,
        message: &str,
    ) -> HarnessResult<()> {
        let history = client.conversations_history(&channel.id).await?;
        let matching: Vec<_> = history.iter().filter(|m| m.text == message).collect();
        if matching.is_empty() {
            return Err(HarnessError::NotFound(format!(
                "message {:?} in channel {}",
                message, channel.name
            )));
        }

        for m in matching {
            client.chat_delete(&channel.id, &m.ts).await?;
        }
        info!("Deleted from {}: {}", channel.name, message);
        Ok(())
    }

    pub async fn delete_all_messages(
        client: &SlackClient,
        channel: &SlackChannel,
    ) -> HarnessResult<()> {
        let history = client.conversations_history(&channel.id).await?;
        for m in &history {
            client.chat_delete(&channel.id, &m.ts).await?;
        }
        Ok(())
    }

    /// Release every channel of this run by renaming it to `done_<uuid>`.
    /// Failures are logged, not returned.
    pub async fn cleanup_after_test(client: &SlackClient, run_id: &str) {
        let channels = match client.conversations_list(CHANNEL_TYPES, false).await {
            Ok(channels) => channels,
            Err(e) => {
                warn!("Could not list channels for cleanup of run {}: {}", run_id, e);
                return;
            }
        };

        for channel in channels.iter().filter(|c| c.name.contains(run_id)) {
            let new_name = format!("done_{}", Uuid::new_v4());
            if let Err(e) = client.conversations_rename(&channel.id, &new_name).await {
                warn!("Error renaming channel {}: {}", channel.id, e);
            }
        }
    }
}
