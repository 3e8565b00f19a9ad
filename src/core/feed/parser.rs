use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, FeedType, Text};
use serde::Deserialize;

use super::types::{Article, EntryText, ParsedEntry, ParsedFeed, Published};
use crate::core::importer::normalize_url;

#[derive(Debug, thiserror::Error)]
pub enum FeedParseError {
    #[error("feed payload is empty")]
    EmptyPayload,
    #[error("xml feed parse error: {0}")]
    Xml(#[from] feed_rs::parser::ParseFeedError),
    #[error("json feed parse error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
struct JsonFeed {
    #[serde(default)]
    items: Vec<JsonFeedItem>,
}

#[derive(Debug, Clone, Deserialize)]
struct JsonFeedItem {
    title: Option<String>,
    url: Option<String>,
    summary: Option<String>,
    content_text: Option<String>,
    content_html: Option<String>,
    date_published: Option<String>,
    date_modified: Option<String>,
}

pub fn parse_feed_bytes(raw: &[u8]) -> Result<ParsedFeed, FeedParseError> {
    let trimmed = raw.trim_ascii_start();
    if trimmed.is_empty() {
        return Err(FeedParseError::EmptyPayload);
    }
    if trimmed[0] == b'{' {
        return parse_json_feed(trimmed);
    }
    parse_xml_feed(trimmed)
}

/// Key used to drop the same story announced by several feeds in one run.
/// Articles always carry a link, so the normalized link is the key.
pub fn build_dedup_key(article: &Article) -> String {
    normalize_url(&article.link)
}

fn parse_xml_feed(raw: &[u8]) -> Result<ParsedFeed, FeedParseError> {
    let feed = feed_rs::parser::parse(raw)?;
    // RSS descriptions are entity-encoded HTML whatever feed-rs labels them.
    let markup_summaries = matches!(
        feed.feed_type,
        FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2
    );
    let entries = feed
        .entries
        .iter()
        .map(|entry| entry_from_xml(entry, markup_summaries))
        .collect();
    Ok(ParsedFeed { entries })
}

fn parse_json_feed(raw: &[u8]) -> Result<ParsedFeed, FeedParseError> {
    let feed: JsonFeed = serde_json::from_slice(raw)?;
    let entries = feed
        .items
        .into_iter()
        .map(|item| ParsedEntry {
            title: item.title.unwrap_or_default(),
            link: item.url.unwrap_or_default(),
            summary: item.summary.map(EntryText::plain),
            content: item
                .content_html
                .map(EntryText::html)
                .or_else(|| item.content_text.map(EntryText::plain)),
            published: published_from_text(item.date_published.or(item.date_modified)),
        })
        .collect();
    Ok(ParsedFeed { entries })
}

fn entry_from_xml(entry: &Entry, markup_summaries: bool) -> ParsedEntry {
    let link = entry
        .links
        .first()
        .map(|entry_link| entry_link.href.clone())
        .unwrap_or_default();
    let title = entry
        .title
        .as_ref()
        .map(|text| text.content.clone())
        .unwrap_or_default();
    let summary = entry.summary.as_ref().map(|text| EntryText {
        body: text.content.clone(),
        is_html: markup_summaries || is_markup(text),
    });
    let content = entry.content.as_ref().and_then(|content| {
        let body = content.body.clone()?;
        let subtype = content.content_type.subty();
        Some(EntryText {
            body,
            is_html: subtype.as_str().contains("html"),
        })
    });
    // feed-rs drops dates it cannot parse, so there is no raw text left to keep here.
    let published = entry
        .published
        .or(entry.updated)
        .map_or(Published::Unknown, Published::At);

    ParsedEntry {
        title,
        link,
        summary,
        content,
        published,
    }
}

fn is_markup(text: &Text) -> bool {
    text.content_type.subty().as_str().contains("html")
}

fn published_from_text(raw: Option<String>) -> Published {
    let Some(raw) = raw.filter(|value| !value.trim().is_empty()) else {
        return Published::Unknown;
    };
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(timestamp) => Published::At(timestamp.with_timezone(&Utc)),
        Err(_) => Published::Raw(raw),
    }
}
