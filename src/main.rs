use anyhow::Context;
use clap::{Parser, Subcommand};
use connector_job_tests::clients::{ApiClient, SlackClient};
use connector_job_tests::connectors::file::LocalFileConnector;
use connector_job_tests::connectors::{LoadConnector, INDEX_BATCH_SIZE};
use connector_job_tests::scenarios::slack_prune;
use connector_job_tests::Config;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "connector-job-tests",
    version,
    about = "Connector job checks against a running platform"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seed Slack, index, sync, delete a message, prune and verify search results
    SlackPrune,
    /// Load local files with the file connector and print the documents as JSON
    FileDocuments {
        /// Files or directories to load
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long, default_value_t = INDEX_BATCH_SIZE)]
        batch_size: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "connector_job_tests=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Command::SlackPrune => {
            info!("API server URL: {}", config.api_server_url);
            info!("Slack API URL: {}", config.slack_api_url);

            let api = ApiClient::new(config.api_server_url.clone());
            let slack = SlackClient::new(config.slack_api_url.clone(), config.slack_bot_token()?);

            slack_prune::run_with_provisioned_channels(&config, &api, &slack)
                .await
                .context("Slack prune scenario failed")?;
            info!("Slack prune scenario passed");
        }
        Command::FileDocuments { paths, batch_size } => {
            let connector = LocalFileConnector::new(paths).with_batch_size(batch_size);
            let batches = connector.load_from_state().await?;
            println!("{}", serde_json::to_string_pretty(&batches)?);
        }
    }

    Ok(())
}
