use crate::clients::ApiClient;
use crate::config::WaitSettings;
use crate::domain::models::{datetime_from_json, AccessType, IndexingStatus, TestCcPair, TestUser};
use crate::error::HarnessResult;
use crate::managers::poll_until;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Options for binding a connector to a credential.
#[derive(Debug, Clone)]
pub struct CcPairSpec {
    pub name: Option<String>,
    pub access_type: AccessType,
    pub groups: Vec<i64>,
}

impl Default for CcPairSpec {
    fn default() -> Self {
        Self {
            name: None,
            access_type: AccessType::Public,
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CcPairRequest<'a> {
    name: &'a str,
    access_type: AccessType,
    groups: &'a [i64],
}

#[derive(Debug, Deserialize)]
struct CcPairResponse {
    data: i64,
}

#[derive(Debug, Serialize)]
struct RunOnceRequest {
    connector_id: i64,
    credential_ids: Vec<i64>,
    from_beginning: bool,
}

/// Creates CC-pairs and drives their indexing, permission-sync and prune jobs.
///
/// Every `wait_for_*` takes an `after` fence: a job only counts as done when
/// its completion timestamp is strictly later, so a completion left over from
/// an earlier run is never mistaken for the one just triggered.
pub struct CcPairManager;

impl CcPairManager {
    pub async fn create(
        api: &ApiClient,
        connector_id: i64,
        credential_id: i64,
        spec: CcPairSpec,
        user_performing_action: &TestUser,
    ) -> HarnessResult<TestCcPair> {
        let name = match spec.name {
            Some(name) => format!("{}-cc-pair", name),
            None => format!("test-cc-pair-{}", Uuid::new_v4()),
        };

        let request = CcPairRequest {
            name: &name,
            access_type: spec.access_type,
            groups: &spec.groups,
        };
        let created: CcPairResponse = api
            .put_json(
                &format!("/manage/connector/{}/credential/{}", connector_id, credential_id),
                &request,
                &user_performing_action.headers,
            )
            .await?;

        info!("Created CC pair {} ({})", name, created.data);

        Ok(TestCcPair {
            id: created.data,
            name,
            connector_id,
            credential_id,
            access_type: spec.access_type,
            groups: spec.groups,
        })
    }

    /// Trigger a from-the-beginning indexing run.
    pub async fn run_once(
        api: &ApiClient,
        cc_pair: &TestCcPair,
        user_performing_action: &TestUser,
    ) -> HarnessResult<()> {
        let request = RunOnceRequest {
            connector_id: cc_pair.connector_id,
            credential_ids: vec![cc_pair.credential_id],
            from_beginning: true,
        };
        api.post_json_unit(
            "/manage/admin/connector/run-once",
            &request,
            &user_performing_action.headers,
        )
        .await
    }

    pub async fn indexing_statuses(
        api: &ApiClient,
        user_performing_action: &TestUser,
    ) -> HarnessResult<Vec<IndexingStatus>> {
        api.get_json(
            "/manage/admin/connector/indexing-status",
            &user_performing_action.headers,
        )
        .await
    }

    /// Wait until an indexing run finishing after `after` has succeeded.
    pub async fn wait_for_indexing(
        api: &ApiClient,
        cc_pair: &TestCcPair,
        after: DateTime<Utc>,
        wait: &WaitSettings,
        user_performing_action: &TestUser,
    ) -> HarnessResult<()> {
        let operation = format!("CC pair {} indexing", cc_pair.id);
        poll_until(&operation, wait, || async move {
            let statuses = Self::indexing_statuses(api, user_performing_action).await?;
            Ok(statuses.iter().any(|status| {
                status.cc_pair_id == cc_pair.id
                    && !status.in_progress
                    && status.last_success.is_some_and(|success| success > after)
            }))
        })
        .await?;

        info!("Indexing complete: cc_pair={}", cc_pair.id);
        Ok(())
    }

    /// Trigger a permission sync.
    pub async fn sync(
        api: &ApiClient,
        cc_pair: &TestCcPair,
        user_performing_action: &TestUser,
    ) -> HarnessResult<()> {
        api.post_empty(
            &format!("/manage/admin/cc-pair/{}/sync", cc_pair.id),
            &user_performing_action.headers,
        )
        .await
    }

    /// Completion time of the latest permission sync, if any.
    pub async fn last_synced(
        api: &ApiClient,
        cc_pair: &TestCcPair,
        user_performing_action: &TestUser,
    ) -> HarnessResult<Option<DateTime<Utc>>> {
        let value: serde_json::Value = api
            .get_json(
                &format!("/manage/admin/cc-pair/{}/sync", cc_pair.id),
                &user_performing_action.headers,
            )
            .await?;
        Ok(datetime_from_json(&value))
    }

    /// Wait for a permission sync completing after `after`, then let the
    /// index settle so searches see the new ACLs.
    pub async fn wait_for_sync(
        api: &ApiClient,
        cc_pair: &TestCcPair,
        after: DateTime<Utc>,
        wait: &WaitSettings,
        user_performing_action: &TestUser,
    ) -> HarnessResult<()> {
        let operation = format!("CC pair {} permission sync", cc_pair.id);
        poll_until(&operation, wait, || async move {
            let last_synced = Self::last_synced(api, cc_pair, user_performing_action).await?;
            Ok(last_synced.is_some_and(|synced| synced > after))
        })
        .await?;

        info!("Permission sync complete: cc_pair={}", cc_pair.id);

        if !wait.sync_settle.is_zero() {
            info!("Waiting {:?} for the index to pick up the sync", wait.sync_settle);
            tokio::time::sleep(wait.sync_settle).await;
        }
        Ok(())
    }

    /// Trigger a prune of documents deleted at the source.
    pub async fn prune(
        api: &ApiClient,
        cc_pair: &TestCcPair,
        user_performing_action: &TestUser,
    ) -> HarnessResult<()> {
        api.post_empty(
            &format!("/manage/admin/cc-pair/{}/prune", cc_pair.id),
            &user_performing_action.headers,
        )
        .await
    }

    /// Completion time of the latest prune, if any.
    pub async fn last_pruned(
        api: &ApiClient,
        cc_pair: &TestCcPair,
        user_performing_action: &TestUser,
    ) -> HarnessResult<Option<DateTime<Utc>>> {
        let value: serde_json::Value = api
            .get_json(
                &format!("/manage/admin/cc-pair/{}/last_pruned", cc_pair.id),
                &user_performing_action.headers,
            )
            .await?;
        Ok(datetime_from_json(&value))
    }

    pub async fn wait_for_prune(
        api: &ApiClient,
        cc_pair: &TestCcPair,
        after: DateTime<Utc>,
        wait: &WaitSettings,
        user_performing_action: &TestUser,
    ) -> HarnessResult<()> {
        let operation = format!("CC pair {} pruning", cc_pair.id);
        poll_until(&operation, wait, || async move {
            let last_pruned = Self::last_pruned(api, cc_pair, user_performing_action).await?;
            Ok(last_pruned.is_some_and(|pruned| pruned > after))
        })
        .await?;

        info!("Pruning complete: cc_pair={}", cc_pair.id);
        Ok(())
    }
}
