//! Slack prune scenario.
//!
//! Seeds a public and a private channel, indexes and permission-syncs them
//! through a SYNC-access CC-pair, checks that both an admin and a channel
//! member can find every message, deletes one private message at the
//! source, prunes, and checks that the deleted message is gone for both
//! users while the rest stay visible.

use crate::clients::{ApiClient, SlackClient};
use crate::config::Config;
use crate::domain::models::{AccessType, DocumentSource, InputType, SlackChannel, TestUser};
use crate::domain::search::DocumentSearchRequest;
use crate::error::{HarnessError, HarnessResult};
use crate::managers::{
    CcPairManager, CcPairSpec, ConnectorManager, ConnectorSpec, CredentialManager, CredentialSpec,
    DocumentSearchManager, LlmProviderManager, LlmProviderSpec, SlackManager, UserManager,
};
use chrono::Utc;
use std::collections::HashMap;
use tracing::info;

pub const PUBLIC_MESSAGE: &str = "Steve's favorite number is 809752";
pub const PRIVATE_MESSAGE: &str = "Sara's favorite number is 346794";
pub const MESSAGE_TO_DELETE: &str = "Rebecca's favorite number is 753468";
pub const QUERY: &str = "favorite number";

/// Search results seen by each user before and after the prune.
#[derive(Debug, Clone, Default)]
pub struct PruneReport {
    pub admin_before: Vec<String>,
    pub user_before: Vec<String>,
    pub admin_after: Vec<String>,
    pub user_after: Vec<String>,
}

/// Provision channels, run the scenario, and always release the channels.
pub async fn run_with_provisioned_channels(
    config: &Config,
    api: &ApiClient,
    slack: &SlackClient,
) -> HarnessResult<PruneReport> {
    let email_id_map = SlackManager::build_slack_user_email_id_map(slack).await?;
    let admin_user_id = slack_user_id(&email_id_map, &config.admin_email)?;

    let (public_channel, private_channel, run_id) =
        SlackManager::get_and_provision_available_slack_channels(slack, &admin_user_id).await?;

    let result = run(config, api, slack, &public_channel, &private_channel).await;

    SlackManager::cleanup_after_test(slack, &run_id).await;
    result
}

/// Run the scenario against already-provisioned, empty channels.
pub async fn run(
    config: &Config,
    api: &ApiClient,
    slack: &SlackClient,
    public_channel: &SlackChannel,
    private_channel: &SlackChannel,
) -> HarnessResult<PruneReport> {
    let wait = config.wait_settings();

    // The first user created is the admin
    let admin_user = UserManager::create(api, Some(&config.admin_email)).await?;
    let test_user_1 = UserManager::create(api, Some(&config.test_user_email)).await?;

    let email_id_map = SlackManager::build_slack_user_email_id_map(slack).await?;
    let admin_user_id = slack_user_id(&email_id_map, &admin_user.email)?;

    LlmProviderManager::create(
        api,
        LlmProviderSpec {
            api_key: config.openai_api_key.clone(),
            ..Default::default()
        },
        &admin_user,
    )
    .await?;

    let before = Utc::now();
    let credential = CredentialManager::create(
        api,
        CredentialSpec::new(
            DocumentSource::Slack,
            serde_json::json!({ "slack_bot_token": config.slack_bot_token()? }),
        ),
        &admin_user,
    )
    .await?;
    let connector = ConnectorManager::create(
        api,
        ConnectorSpec {
            name: Some("Slack".to_string()),
            connector_specific_config: Some(serde_json::json!({
                "workspace": config.slack_workspace,
                "channels": [public_channel.name, private_channel.name],
            })),
            is_public: true,
            groups: Vec::new(),
            ..ConnectorSpec::new(DocumentSource::Slack, InputType::Poll)
        },
        &admin_user,
    )
    .await?;
    let cc_pair = CcPairManager::create(
        api,
        connector.id,
        credential.id,
        CcPairSpec {
            access_type: AccessType::Sync,
            ..Default::default()
        },
        &admin_user,
    )
    .await?;
    CcPairManager::wait_for_indexing(api, &cc_pair, before, &wait, &admin_user).await?;

    // Initial Slack state
    let desired_channel_members = [&admin_user, &test_user_1];
    let member_ids = desired_channel_members
        .iter()
        .map(|user| slack_user_id(&email_id_map, &user.email))
        .collect::<HarnessResult<Vec<_>>>()?;
    SlackManager::set_channel_members(slack, &admin_user_id, private_channel, &member_ids).await?;

    SlackManager::add_message_to_channel(slack, public_channel, PUBLIC_MESSAGE).await?;
    SlackManager::add_message_to_channel(slack, private_channel, PRIVATE_MESSAGE).await?;
    SlackManager::add_message_to_channel(slack, private_channel, MESSAGE_TO_DELETE).await?;

    let before = Utc::now();
    CcPairManager::run_once(api, &cc_pair, &admin_user).await?;
    CcPairManager::wait_for_indexing(api, &cc_pair, before, &wait, &admin_user).await?;

    let before = Utc::now();
    CcPairManager::sync(api, &cc_pair, &admin_user).await?;
    CcPairManager::wait_for_sync(api, &cc_pair, before, &wait, &admin_user).await?;

    // Both users are in both channels and see everything
    let mut report = PruneReport::default();
    let all = [PUBLIC_MESSAGE, PRIVATE_MESSAGE, MESSAGE_TO_DELETE];

    report.admin_before = search_as(api, &admin_user, "before deleting").await?;
    check_visibility(&admin_user, "before deleting", &report.admin_before, &all, &[])?;

    report.user_before = search_as(api, &test_user_1, "before deleting").await?;
    check_visibility(&test_user_1, "before deleting", &report.user_before, &all, &[])?;

    // Delete at the source and prune
    info!("Deleting message: {}", MESSAGE_TO_DELETE);
    SlackManager::remove_message_from_channel(slack, private_channel, MESSAGE_TO_DELETE).await?;

    let now = Utc::now();
    CcPairManager::prune(api, &cc_pair, &admin_user).await?;
    CcPairManager::wait_for_prune(api, &cc_pair, now, &wait, &admin_user).await?;

    // The deleted message is gone for everyone
    let remaining = [PUBLIC_MESSAGE, PRIVATE_MESSAGE];

    report.admin_after = search_as(api, &admin_user, "after prune").await?;
    check_visibility(
        &admin_user,
        "after prune",
        &report.admin_after,
        &remaining,
        &[MESSAGE_TO_DELETE],
    )?;

    report.user_after = search_as(api, &test_user_1, "after prune").await?;
    check_visibility(
        &test_user_1,
        "after prune",
        &report.user_after,
        &remaining,
        &[MESSAGE_TO_DELETE],
    )?;

    Ok(report)
}

async fn search_as(api: &ApiClient, user: &TestUser, phase: &str) -> HarnessResult<Vec<String>> {
    let request = DocumentSearchRequest::keyword(QUERY);
    let contents = DocumentSearchManager::search_contents(api, &request, user).await?;
    info!("top_documents content {} for {}: {:?}", phase, user.email, contents);
    Ok(contents)
}

fn slack_user_id(email_id_map: &HashMap<String, String>, email: &str) -> HarnessResult<String> {
    email_id_map
        .get(email)
        .cloned()
        .ok_or_else(|| HarnessError::NotFound(format!("Slack user with email {}", email)))
}

/// Every `present` message is among `found` and no `absent` one is.
pub fn check_visibility(
    user: &TestUser,
    phase: &str,
    found: &[String],
    present: &[&str],
    absent: &[&str],
) -> HarnessResult<()> {
    for message in present {
        if !found.iter().any(|content| content == message) {
            return Err(HarnessError::Expectation(format!(
                "{} should see {:?} {}, got {:?}",
                user.email, message, phase, found
            )));
        }
    }
    for message in absent {
        if found.iter().any(|content| content == message) {
            return Err(HarnessError::Expectation(format!(
                "{} should not see {:?} {}, got {:?}",
                user.email, message, phase, found
            )));
        }
    }
    Ok(())
}
