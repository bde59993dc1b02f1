//! RelicBot CLI: analyze one pull request and comment with observability
//! recommendations.
//!
//! The trigger comes from the environment (`GITHUB_REPOSITORY`,
//! `PR_NUMBER`, `GITHUB_TOKEN`, model and NewRelic credentials); optional
//! settings come from `relicbot.toml` or the file named by
//! `RELICBOT_CONFIG`.
//!
//! In CI the process always exits 0 and reports failures on the PR.
//! `--local` checks the environment up front and exits 1 on failure.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use relicbot_agent::{Agent, ConversationDriver, RunOutcome, post_failure};
use relicbot_config::{AppConfig, ConfigError, TriggerEnv};
use relicbot_github::GitHubClient;
use relicbot_newrelic::NerdGraphClient;
use relicbot_tools::ToolRegistry;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "relicbot",
    about = "RelicBot: NewRelic observability recommendations for pull requests",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Local test mode: check the environment first and exit non-zero on failure
    #[arg(long)]
    local: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let succeeded = match run(&cli).await {
        Ok(succeeded) => succeeded,
        Err(e) => {
            error!("{e:#}");
            if cli.local {
                eprintln!("\n  Test failed: {e:#}");
            }
            false
        }
    };
    ExitCode::from(exit_status(cli.local, succeeded))
}

/// Whether the analysis completed. Failures reported on the PR still
/// count as failures here; [`exit_status`] decides what the job sees.
async fn run(cli: &Cli) -> anyhow::Result<bool> {
    let env = match TriggerEnv::from_env() {
        Ok(env) => env,
        Err(e) => {
            report_setup_error(cli, &e);
            return Ok(false);
        }
    };
    info!(repo = %env.repository, pr = env.pr_number, "Trigger");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            report_setup_error(cli, &e);
            let github = GitHubClient::new(&env.repository, &env.github_token)
                .with_base_url(&env.github_api_url);
            report_on_pr(cli, &github, env.pr_number, &e.to_string()).await?;
            return Ok(false);
        }
    };
    info!(provider = %config.provider, model = config.model(), "Configuration loaded");

    // Without a client nothing can be posted either.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let github = Arc::new(
        GitHubClient::new(&env.repository, &env.github_token)
            .with_base_url(&config.github_api_url)
            .with_client(client.clone()),
    );

    let (Some(model_key), Some(newrelic_key)) = (
        env.model_api_key(config.provider),
        env.newrelic_api_key.as_deref(),
    ) else {
        let e = ConfigError::MissingEnv(env.missing_required(config.provider));
        report_setup_error(cli, &e);
        report_on_pr(cli, github.as_ref(), env.pr_number, &e.to_string()).await?;
        return Ok(false);
    };

    let newrelic = Arc::new(
        NerdGraphClient::new(newrelic_key)
            .with_endpoint(&config.newrelic_api_url)
            .with_client(client.clone()),
    );
    let provider = relicbot_providers::build_from_config(&config, model_key, client);
    let tools = Arc::new(
        ToolRegistry::new(github.clone(), newrelic, env.pr_number)
            .with_default_account(env.newrelic_account_id.clone()),
    );

    let driver = ConversationDriver::from_config(provider, tools, &config);
    let agent = Agent::new(github, driver, env.pr_number).with_config(&config);

    let outcome = agent.run().await.context("Failed to post to the PR")?;
    let succeeded = !matches!(outcome, RunOutcome::Failed { .. });
    if cli.local && succeeded {
        println!("\n  Test completed successfully!");
    }
    Ok(succeeded)
}

/// In CI a setup failure becomes the run's error comment. Local runs only
/// print it.
async fn report_on_pr(
    cli: &Cli,
    github: &GitHubClient,
    pr_number: u64,
    message: &str,
) -> anyhow::Result<()> {
    if cli.local {
        return Ok(());
    }
    post_failure(github, pr_number, message)
        .await
        .context("Failed to report the setup failure on the PR")
}

/// CI runs never fail the job; local runs surface the failure.
fn exit_status(local: bool, succeeded: bool) -> u8 {
    if succeeded || !local { 0 } else { 1 }
}

fn report_setup_error(cli: &Cli, e: &ConfigError) {
    error!("{e}");
    if !cli.local {
        return;
    }

    eprintln!();
    if let ConfigError::MissingEnv(vars) = e {
        eprintln!("  Missing required environment variables:");
        for var in vars {
            eprintln!("    - {var}");
        }
        eprintln!();
        eprintln!("  Set them like this:");
        eprintln!("    export GITHUB_REPOSITORY='your-org/your-repo'");
        eprintln!("    export PR_NUMBER='123'");
        eprintln!("    export GITHUB_TOKEN='your-token'");
        eprintln!("    export CLAUDE_API_KEY='your-key'   (or OPENAI_API_KEY with provider = \"openai\")");
        eprintln!("    export NEWRELIC_API_KEY='your-key'");
    } else {
        eprintln!("  ERROR: {e}");
    }
    eprintln!();
}
