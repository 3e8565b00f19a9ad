pub mod fetcher;
pub mod parser;
pub mod types;

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use html2text::render::text_renderer::TrivialDecorator;

use fetcher::{fetch_feed, FetchError};
use parser::{build_dedup_key, parse_feed_bytes, FeedParseError};
pub use types::{Article, EntryText, FeedSource, ParsedFeed, Published};

const PLAIN_TEXT_WIDTH: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("parse failed: {0}")]
    Parse(#[from] FeedParseError),
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub articles: Vec<Article>,
    pub fetched_sources: usize,
    pub failed_sources: usize,
}

#[derive(Debug, Clone)]
pub struct FeedIngester {
    client: reqwest::Client,
    sources: Vec<FeedSource>,
    max_age: TimeDelta,
}

impl FeedIngester {
    pub fn new(client: reqwest::Client, sources: Vec<FeedSource>, max_age_hours: u32) -> Self {
        Self {
            client,
            sources,
            max_age: TimeDelta::hours(i64::from(max_age_hours)),
        }
    }

    /// Fetches every source in order. A broken source is logged and contributes nothing.
    pub async fn collect(&self, now: DateTime<Utc>) -> IngestReport {
        let cutoff = self.cutoff(now);
        let mut seen = HashSet::new();
        let mut report = IngestReport::default();

        for source in &self.sources {
            tracing::info!(source = %source.name, url = %source.url, "fetching feed");
            match self.load_source(source).await {
                Ok(feed) => {
                    let mut kept = 0_usize;
                    for article in select_recent(&source.name, feed, cutoff) {
                        if seen.insert(build_dedup_key(&article)) {
                            report.articles.push(article);
                            kept += 1;
                        }
                    }
                    tracing::debug!(source = %source.name, kept, "feed processed");
                    report.fetched_sources += 1;
                }
                Err(error) => {
                    tracing::warn!(source = %source.name, error = %error, "skipping feed");
                    report.failed_sources += 1;
                }
            }
        }

        report
    }

    /// `None` when the configured age reaches past the representable range.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_sub_signed(self.max_age)
    }

    async fn load_source(&self, source: &FeedSource) -> Result<ParsedFeed, IngestError> {
        let body = fetch_feed(&self.client, &source.url).await?;
        Ok(parse_feed_bytes(&body)?)
    }
}

/// Turns feed entries into articles, dropping only entries whose structured
/// timestamp lies before `cutoff`. Undated entries always pass.
pub fn select_recent(
    source: &str,
    feed: ParsedFeed,
    cutoff: Option<DateTime<Utc>>,
) -> Vec<Article> {
    feed.entries
        .into_iter()
        .filter(|entry| {
            match (entry.published.timestamp(), cutoff) {
                (Some(timestamp), Some(cutoff)) => timestamp >= cutoff,
                _ => true,
            }
        })
        .filter_map(|entry| {
            let title = collapse_whitespace(&entry.title);
            let link = entry.link.trim().to_string();
            if title.is_empty() || link.is_empty() {
                return None;
            }
            let summary = entry
                .summary
                .or(entry.content)
                .map(|text| summary_text(&text))
                .unwrap_or_default();
            Some(Article {
                source: source.to_string(),
                title,
                link,
                summary,
                published: entry.published,
            })
        })
        .collect()
}

fn summary_text(text: &EntryText) -> String {
    if text.is_html {
        html_to_text(&text.body)
    } else {
        collapse_whitespace(&text.body)
    }
}

/// Flattens feed HTML into a single line of text.
pub fn html_to_text(html: &str) -> String {
    let rendered = html2text::config::with_decorator(TrivialDecorator::new())
        .string_from_read(html.as_bytes(), PLAIN_TEXT_WIDTH)
        .unwrap_or_else(|_| html.to_string());
    collapse_whitespace(&rendered)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feed::types::ParsedEntry;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use chrono::TimeZone;
    use std::time::Duration;

    fn entry(title: &str, link: &str, published: Published) -> ParsedEntry {
        ParsedEntry {
            title: title.to_string(),
            link: link.to_string(),
            summary: Some(EntryText::html("<p>Some <em>summary</em></p>")),
            content: None,
            published,
        }
    }

    fn feed(entries: Vec<ParsedEntry>) -> ParsedFeed {
        ParsedFeed { entries }
    }

    #[test]
    fn age_cutoff_is_inclusive_at_the_boundary() {
        let cutoff = Utc.with_ymd_and_hms(2026, 2, 23, 12, 0, 0).unwrap();
        let parsed = feed(vec![
            entry("too old", "https://a/1", Published::At(cutoff - TimeDelta::seconds(1))),
            entry("on the boundary", "https://a/2", Published::At(cutoff)),
            entry("just inside", "https://a/3", Published::At(cutoff + TimeDelta::seconds(1))),
        ]);

        let titles: Vec<_> = select_recent("A", parsed, Some(cutoff))
            .into_iter()
            .map(|article| article.title)
            .collect();
        assert_eq!(titles, vec!["on the boundary", "just inside"]);
    }

    #[test]
    fn undated_entries_survive_any_cutoff() {
        let cutoff = Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap();
        let parsed = feed(vec![
            entry("no date", "https://a/1", Published::Unknown),
            entry("raw date", "https://a/2", Published::Raw("gestern".to_string())),
        ]);

        let articles = select_recent("A", parsed, Some(cutoff));
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source, "A");
        assert_eq!(articles[1].published, Published::Raw("gestern".to_string()));
    }

    #[test]
    fn entries_without_title_or_link_are_skipped() {
        let cutoff = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let parsed = feed(vec![
            entry("", "https://a/1", Published::Unknown),
            entry("linkless", " ", Published::Unknown),
            entry("kept", "https://a/3", Published::Unknown),
        ]);

        let articles = select_recent("A", parsed, Some(cutoff));
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "kept");
        assert_eq!(articles[0].summary, "Some summary");
    }

    #[test]
    fn plain_text_with_angle_brackets_survives() {
        let cutoff = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        let mut plain = entry(
            "Chrome  blocks <iframe> cookies",
            "https://a/1",
            Published::Unknown,
        );
        plain.summary = Some(EntryText::plain(
            "Plain text: use <script> tags carefully for tracking",
        ));

        let articles = select_recent("A", feed(vec![plain]), Some(cutoff));

        assert_eq!(articles[0].title, "Chrome blocks <iframe> cookies");
        assert_eq!(
            articles[0].summary,
            "Plain text: use <script> tags carefully for tracking"
        );
        let filter = crate::core::filter::RelevanceFilter::new(["cookies"]);
        assert!(filter.matches(&articles[0]));
    }

    #[test]
    fn missing_cutoff_keeps_everything() {
        let ancient = Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap();
        let parsed = feed(vec![entry("old", "https://a/1", Published::At(ancient))]);
        assert_eq!(select_recent("A", parsed, None).len(), 1);
    }

    #[tokio::test]
    async fn huge_age_limit_does_not_overflow() {
        let client = fetcher::build_client(Duration::from_secs(5)).expect("client should build");
        let ingester = FeedIngester::new(client, Vec::new(), 3_000_000_000);
        let now = Utc.with_ymd_and_hms(2026, 2, 24, 12, 0, 0).unwrap();

        assert_eq!(ingester.cutoff(now), None);
        let report = ingester.collect(now).await;
        assert!(report.articles.is_empty());
    }

    #[test]
    fn html_is_flattened_to_plain_text() {
        assert_eq!(
            html_to_text("<p>Die  <b>DSGVO</b></p>\n<p>gilt.</p>"),
            "Die DSGVO gilt."
        );
    }

    async fn spawn_feed_server() -> (String, tokio::task::JoinHandle<()>) {
        let app = Router::new()
            .route(
                "/good.xml",
                get(|| async { include_str!("../../../fixtures/sample.rss.xml") }),
            )
            .route(
                "/down.xml",
                get(|| async { (StatusCode::BAD_GATEWAY, "upstream down").into_response() }),
            )
            .route("/garbage.xml", get(|| async { "<html>not a feed" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("local addr should exist");
        let join_handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server should run");
        });
        (format!("http://{address}"), join_handle)
    }

    #[tokio::test]
    async fn failing_sources_do_not_block_healthy_ones() {
        let (base, server_task) = spawn_feed_server().await;
        let sources = vec![
            FeedSource {
                name: "Down".to_string(),
                url: format!("{base}/down.xml"),
            },
            FeedSource {
                name: "Garbage".to_string(),
                url: format!("{base}/garbage.xml"),
            },
            FeedSource {
                name: "Ticker".to_string(),
                url: format!("{base}/good.xml"),
            },
        ];
        let client = fetcher::build_client(Duration::from_secs(5)).expect("client should build");
        let ingester = FeedIngester::new(client, sources, 24);
        let now = Utc.with_ymd_and_hms(2026, 2, 24, 12, 0, 0).unwrap();

        let report = ingester.collect(now).await;

        assert_eq!(report.failed_sources, 2);
        assert_eq!(report.fetched_sources, 1);
        assert_eq!(report.articles.len(), 3);
        assert!(report.articles.iter().all(|article| article.source == "Ticker"));

        server_task.abort();
    }

    #[tokio::test]
    async fn the_same_link_from_two_sources_is_kept_once() {
        let (base, server_task) = spawn_feed_server().await;
        let sources = vec![
            FeedSource {
                name: "First".to_string(),
                url: format!("{base}/good.xml"),
            },
            FeedSource {
                name: "Second".to_string(),
                url: format!("{base}/good.xml"),
            },
        ];
        let client = fetcher::build_client(Duration::from_secs(5)).expect("client should build");
        let ingester = FeedIngester::new(client, sources, 24);
        let now = Utc.with_ymd_and_hms(2026, 2, 24, 12, 0, 0).unwrap();

        let report = ingester.collect(now).await;

        assert_eq!(report.fetched_sources, 2);
        assert_eq!(report.articles.len(), 3);
        assert!(report.articles.iter().all(|article| article.source == "First"));

        server_task.abort();
    }
}
