pub mod cc_pair;
pub mod connector;
pub mod credential;
pub mod llm_provider;
pub mod search;
pub mod slack;
pub mod user;

pub use cc_pair::{CcPairManager, CcPairSpec};
pub use connector::{ConnectorManager, ConnectorSpec};
pub use credential::{CredentialManager, CredentialSpec};
pub use llm_provider::{LlmProviderManager, LlmProviderSpec};
pub use search::DocumentSearchManager;
pub use slack::SlackManager;
pub use user::UserManager;

use crate::config::WaitSettings;
use crate::error::{HarnessError, HarnessResult};
use std::future::Future;
use tokio::time::Instant;
use tracing::info;

/// Re-check `done` every poll interval until it reports true.
///
/// Fails with [`HarnessError::Timeout`] once the timeout has elapsed; errors
/// from `done` abort immediately.
pub async fn poll_until<F, Fut>(
    operation: &str,
    wait: &WaitSettings,
    mut done: F,
) -> HarnessResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<bool>>,
{
    let start = Instant::now();

    loop {
        if done().await? {
            return Ok(());
        }

        let elapsed = start.elapsed();
        if elapsed > wait.timeout {
            return Err(HarnessError::Timeout {
                operation: operation.to_string(),
                waited: elapsed,
            });
        }

        info!(
            "Waiting for {}. elapsed={:.2}s timeout={}s",
            operation,
            elapsed.as_secs_f64(),
            wait.timeout.as_secs()
        );
        tokio::time::sleep(wait.poll_interval).await;
    }
}
