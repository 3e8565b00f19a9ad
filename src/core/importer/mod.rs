use std::collections::{BTreeMap, HashSet};

use reqwest::Url;

use crate::core::feed::FeedSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSource {
    pub title: String,
    pub feed_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("invalid OPML content: {0}")]
    Opml(String),
}

pub fn parse_opml(opml_content: &str) -> Result<Vec<ImportSource>, ImportError> {
    let doc = roxmltree::Document::parse(opml_content)
        .map_err(|error| ImportError::Opml(error.to_string()))?;
    let mut results = Vec::new();

    for node in doc.descendants().filter(|node| node.has_tag_name("outline")) {
        let Some(feed_url) = node.attribute("xmlUrl").map(str::trim) else {
            continue;
        };
        if feed_url.is_empty() {
            continue;
        }

        let title = node
            .attribute("title")
            .or_else(|| node.attribute("text"))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(feed_url)
            .to_string();
        results.push(ImportSource {
            title,
            feed_url: feed_url.to_string(),
        });
    }

    Ok(results)
}

/// Combines the configured feed table with imported sources. Configured
/// entries win; an import is dropped when its URL or its name is already taken.
pub fn merge_sources(
    configured: &BTreeMap<String, String>,
    imported: Vec<ImportSource>,
) -> Vec<FeedSource> {
    let mut seen_urls = HashSet::new();
    let mut seen_names = HashSet::new();
    let mut sources = Vec::with_capacity(configured.len() + imported.len());

    for (name, url) in configured {
        let normalized = normalize_url(url);
        if normalized.is_empty() || !seen_urls.insert(normalized) {
            tracing::warn!(source = %name, url = %url, "ignoring duplicate feed url");
            continue;
        }
        seen_names.insert(name.clone());
        sources.push(FeedSource {
            name: name.clone(),
            url: url.trim().to_string(),
        });
    }

    for source in imported {
        let normalized = normalize_url(&source.feed_url);
        if normalized.is_empty() || seen_urls.contains(&normalized) {
            continue;
        }
        if !seen_names.insert(source.title.clone()) {
            tracing::warn!(source = %source.title, "imported feed name already in use, skipping");
            continue;
        }
        seen_urls.insert(normalized);
        sources.push(FeedSource {
            name: source.title,
            url: source.feed_url,
        });
    }

    sources
}

/// Lowercases scheme and host (the URL parser does that) and drops a
/// trailing slash. Paths and queries keep their case.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    match Url::parse(trimmed) {
        Ok(parsed) => parsed.as_str().trim_end_matches('/').to_string(),
        Err(_) => trimmed.trim_end_matches('/').to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_opml_fixture() {
        let opml = include_str!("../../../fixtures/feeds.opml");
        let sources = parse_opml(opml).expect("opml should parse");

        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0].title, "Heise Security");
        assert_eq!(sources[1].title, "EFF Updates");
        assert_eq!(sources[2].feed_url, "https://netzpolitik.org/feed/");
    }

    #[test]
    fn rejects_broken_opml() {
        assert!(matches!(
            parse_opml("<opml><body>"),
            Err(ImportError::Opml(_))
        ));
    }

    #[test]
    fn configured_feeds_win_over_imports() {
        let configured = BTreeMap::from([
            (
                "Netzpolitik".to_string(),
                "https://netzpolitik.org/feed".to_string(),
            ),
            ("Golem".to_string(), "https://www.golem.de/rss.php".to_string()),
        ]);
        let imported = vec![
            ImportSource {
                title: "netzpolitik.org".to_string(),
                feed_url: "https://NETZPOLITIK.org/feed/".to_string(),
            },
            ImportSource {
                title: "Golem".to_string(),
                feed_url: "https://golem.example/other.xml".to_string(),
            },
            ImportSource {
                title: "EFF".to_string(),
                feed_url: "https://www.eff.org/rss/updates.xml".to_string(),
            },
        ];

        let merged = merge_sources(&configured, imported);
        let names: Vec<_> = merged.iter().map(|source| source.name.as_str()).collect();
        assert_eq!(names, vec!["Golem", "Netzpolitik", "EFF"]);
    }

    #[test]
    fn normalization_keeps_path_case() {
        assert_eq!(
            normalize_url(" HTTPS://Example.COM/Feed/ "),
            "https://example.com/Feed"
        );
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
        assert_eq!(normalize_url("not a url/"), "not a url");
    }

    #[test]
    fn duplicate_configured_urls_are_collapsed() {
        let configured = BTreeMap::from([
            ("A".to_string(), "https://example.com/feed/".to_string()),
            ("B".to_string(), "https://example.com/feed".to_string()),
        ]);

        let merged = merge_sources(&configured, Vec::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "A");
    }
}
