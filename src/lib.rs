pub mod core;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub use crate::core::config::{Config, ConfigError};
pub use crate::core::pipeline::{Pipeline, RunOutcome, SetupError};

use crate::core::llm::{call_chat_completion, LlmError};
use crate::core::notify::{Notifier, NotifyError, SmtpMailer};

/// One complete digest run against the given configuration.
pub async fn run_digest(config: &Config, dry_run: bool) -> Result<RunOutcome, SetupError> {
    tracing::info!(
        sources = config.sources.len(),
        keywords = config.digest.keywords.len(),
        dry_run,
        "starting digest run"
    );
    let mut pipeline = Pipeline::from_config(config, dry_run, StdRng::from_entropy())?;
    Ok(pipeline.run(Utc::now()).await)
}

/// Round trip to the configured text-generation service.
pub async fn check_llm(config: &Config) -> Result<String, LlmError> {
    call_chat_completion(
        &config.llm,
        "You are a connectivity checker.",
        "Reply with exactly: ok",
    )
    .await
}

pub async fn send_test_email(config: &Config) -> Result<(), NotifyError> {
    let mailer = SmtpMailer::new(&config.smtp)?;
    let notifier = Notifier::new(Box::new(mailer), &config.smtp, &config.digest.subject_prefix);
    tracing::info!(to = %config.smtp.to, "sending test email");
    notifier.send_test().await
}
