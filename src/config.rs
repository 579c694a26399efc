use crate::error::{HarnessError, HarnessResult};
use std::env;
use std::time::Duration;

/// Harness configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Platform API base URL (default: http://localhost:8080)
    pub api_server_url: String,
    /// Slack Web API base URL
    pub slack_api_url: String,
    /// Slack bot token used both by the harness and by the connector credential
    pub slack_bot_token: Option<String>,
    /// Key for the LLM provider the platform requires before searching
    pub openai_api_key: Option<String>,
    /// Workspace name written into the Slack connector config
    pub slack_workspace: String,
    /// Email of the first (admin) user
    pub admin_email: String,
    /// Email of the non-admin user
    pub test_user_email: String,
    pub poll_interval: Duration,
    /// Upper bound for every wait helper
    pub max_delay: Duration,
    /// Extra wait after a permission sync so the index sees the new ACLs
    pub sync_settle: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let api_server_url = env::var("API_SERVER_URL").unwrap_or_else(|_| {
            let protocol = env::var("API_SERVER_PROTOCOL").unwrap_or_else(|_| "http".to_string());
            let host = env::var("API_SERVER_HOST").unwrap_or_else(|_| "localhost".to_string());
            let port = env::var("API_SERVER_PORT").unwrap_or_else(|_| "8080".to_string());
            format!("{}://{}:{}", protocol, host, port)
        });

        Self {
            api_server_url,
            slack_api_url: env::var("SLACK_API_URL")
                .unwrap_or_else(|_| "https://slack.com/api".to_string()),
            slack_bot_token: env::var("SLACK_BOT_TOKEN").ok(),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            slack_workspace: env::var("SLACK_WORKSPACE")
                .unwrap_or_else(|_| "onyx-test-workspace".to_string()),
            admin_email: env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@onyx-test.com".to_string()),
            test_user_email: env::var("TEST_USER_EMAIL")
                .unwrap_or_else(|_| "test_user_1@onyx-test.com".to_string()),
            poll_interval: secs_from_env("TEST_POLL_INTERVAL_SECS", 5),
            max_delay: secs_from_env("TEST_MAX_DELAY_SECS", 45),
            sync_settle: secs_from_env("TEST_SYNC_SETTLE_SECS", 5),
        }
    }

    /// Slack bot token, required by every Slack scenario.
    pub fn slack_bot_token(&self) -> HarnessResult<&str> {
        self.slack_bot_token
            .as_deref()
            .ok_or_else(|| HarnessError::MissingEnv("SLACK_BOT_TOKEN".to_string()))
    }

    /// Polling settings for the CC-pair wait helpers.
    pub fn wait_settings(&self) -> WaitSettings {
        WaitSettings {
            poll_interval: self.poll_interval,
            timeout: self.max_delay,
            sync_settle: self.sync_settle,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// How wait helpers poll the platform.
#[derive(Debug, Clone, Copy)]
pub struct WaitSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub sync_settle: Duration,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(45),
            sync_settle: Duration::from_secs(5),
        }
    }
}

fn secs_from_env(name: &str, default: u64) -> Duration {
    let secs = env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}
