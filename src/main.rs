use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rss_digest::core::config::DEFAULT_CONFIG_PATH;
use rss_digest::{check_llm, run_digest, send_test_email, Config, RunOutcome};

#[derive(Parser)]
#[command(name = "rss-digest")]
#[command(about = "Collects relevant news from RSS feeds and mails a daily digest")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, short, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, filter, compose and send the digest (default)
    Run {
        /// Compose the digest but do not send it
        #[arg(long)]
        dry_run: bool,

        /// Write the composed HTML here (dry runs print to stdout otherwise)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Send a test prompt to the configured text-generation service
    CheckLlm,

    /// Send a test email with the configured SMTP settings
    TestEmail,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    Config::load_env_file();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, &config).await {
        Ok(code) => code,
        Err(error) => {
            tracing::error!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "rss_digest=debug" } else { "rss_digest=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(command: Option<Commands>, config: &Config) -> anyhow::Result<ExitCode> {
    match command.unwrap_or(Commands::Run {
        dry_run: false,
        output: None,
    }) {
        Commands::Run { dry_run, output } => {
            let outcome = run_digest(config, dry_run)
                .await
                .context("failed to set up the digest pipeline")?;
            report(outcome, output)
        }
        Commands::CheckLlm => {
            let reply = check_llm(config).await.context("llm check failed")?;
            println!("{}", reply.trim());
            Ok(ExitCode::SUCCESS)
        }
        Commands::TestEmail => {
            send_test_email(config).await.context("test email failed")?;
            println!("test email sent to {}", config.smtp.to);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn report(outcome: RunOutcome, output: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    match outcome {
        RunOutcome::NothingToSend { failed_sources, .. } => {
            tracing::info!(failed_sources, "nothing to send today");
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::Delivered { candidates, digest } => {
            tracing::info!(candidates, path = ?digest.path, "digest delivered");
            Ok(ExitCode::SUCCESS)
        }
        RunOutcome::DeliveryFailed { candidates, .. } => {
            tracing::error!(candidates, "digest could not be delivered");
            Ok(ExitCode::FAILURE)
        }
        RunOutcome::Rendered { candidates, digest } => {
            match output {
                Some(path) => {
                    std::fs::write(&path, &digest.body)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    tracing::info!(candidates, path = %path.display(), "digest written");
                }
                None => println!("{}", digest.body),
            }
            if let Some(topics) = digest.subject_topics {
                tracing::info!(%topics, "subject topics");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
