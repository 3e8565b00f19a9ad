use chrono::{DateTime, Utc};

/// Publication time of an entry as far as the feed told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    /// Structured timestamp, eligible for the age cutoff.
    At(DateTime<Utc>),
    /// Date text the parser could not turn into a timestamp.
    Raw(String),
    Unknown,
}

impl Published {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(timestamp) => Some(*timestamp),
            Self::Raw(_) | Self::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

/// Entry text together with whether the feed declared it as markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryText {
    pub body: String,
    pub is_html: bool,
}

impl EntryText {
    pub fn plain(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            is_html: false,
        }
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            is_html: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    /// Already entity-decoded by the parser; never markup.
    pub title: String,
    pub link: String,
    pub summary: Option<EntryText>,
    pub content: Option<EntryText>,
    pub published: Published,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    pub entries: Vec<ParsedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub source: String,
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: Published,
}
