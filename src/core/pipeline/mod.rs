use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;

use crate::core::config::Config;
use crate::core::digest::{DigestComposer, DigestResult};
use crate::core::feed::fetcher::{build_client, FetchError};
use crate::core::feed::FeedIngester;
use crate::core::filter::RelevanceFilter;
use crate::core::llm::{build_generator, LlmError};
use crate::core::notify::{Notifier, NotifyError, SmtpMailer};

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("feed client: {0}")]
    Fetch(#[from] FetchError),
    #[error("text generation: {0}")]
    Llm(#[from] LlmError),
    #[error("mail transport: {0}")]
    Notify(#[from] NotifyError),
}

pub enum Delivery {
    Email(Notifier),
    /// Compose only; the caller decides what to do with the body.
    DryRun,
}

#[derive(Debug)]
pub enum RunOutcome {
    /// No article survived the age and keyword filters; nothing was composed or sent.
    NothingToSend { fetched_sources: usize, failed_sources: usize },
    Delivered { candidates: usize, digest: DigestResult },
    DeliveryFailed { candidates: usize, digest: DigestResult },
    Rendered { candidates: usize, digest: DigestResult },
}

pub struct Pipeline {
    ingester: FeedIngester,
    filter: RelevanceFilter,
    composer: DigestComposer,
    delivery: Delivery,
}

impl Pipeline {
    pub fn new(
        ingester: FeedIngester,
        filter: RelevanceFilter,
        composer: DigestComposer,
        delivery: Delivery,
    ) -> Self {
        Self {
            ingester,
            filter,
            composer,
            delivery,
        }
    }

    pub fn from_config(config: &Config, dry_run: bool, rng: StdRng) -> Result<Self, SetupError> {
        let client = build_client(Duration::from_secs(config.feed_timeout_secs))?;
        let ingester = FeedIngester::new(
            client,
            config.sources.clone(),
            config.digest.max_age_hours,
        );
        let filter = RelevanceFilter::new(&config.digest.keywords);
        let composer = DigestComposer::new(
            build_generator(&config.llm)?,
            config.digest.clone(),
            rng,
        );
        let delivery = if dry_run {
            Delivery::DryRun
        } else {
            let mailer = SmtpMailer::new(&config.smtp)?;
            Delivery::Email(Notifier::new(
                Box::new(mailer),
                &config.smtp,
                &config.digest.subject_prefix,
            ))
        };
        Ok(Self::new(ingester, filter, composer, delivery))
    }

    /// fetch -> filter -> compose -> deliver, strictly in sequence.
    pub async fn run(&mut self, now: DateTime<Utc>) -> RunOutcome {
        tracing::info!("collecting articles");
        let report = self.ingester.collect(now).await;
        let fetched = report.articles.len();
        let candidates = self.filter.apply(report.articles);
        tracing::info!(
            fetched_sources = report.fetched_sources,
            failed_sources = report.failed_sources,
            fetched,
            candidates = candidates.len(),
            "relevant articles found"
        );

        if candidates.is_empty() {
            tracing::info!("no relevant articles, skipping digest");
            return RunOutcome::NothingToSend {
                fetched_sources: report.fetched_sources,
                failed_sources: report.failed_sources,
            };
        }

        let digest = self.composer.compose(&candidates).await;
        let candidates = candidates.len();

        match &self.delivery {
            Delivery::DryRun => RunOutcome::Rendered { candidates, digest },
            Delivery::Email(notifier) => {
                tracing::info!("sending digest");
                if notifier.deliver(&digest, now.date_naive()).await {
                    RunOutcome::Delivered { candidates, digest }
                } else {
                    RunOutcome::DeliveryFailed { candidates, digest }
                }
            }
        }
    }
}
