use std::fmt::Write;

use super::dates::format_published;
use super::{truncate_chars, DigestPath, DigestResult};
use crate::core::config::DigestSettings;
use crate::core::feed::Article;

/// Line prefix the model uses to hand back subject-line topics.
pub const TOPICS_MARKER: &str = "SUBJECT-TOPICS:";

pub const SYSTEM_PROMPT: &str = "You are a tech-savvy privacy journalist writing an informative, \
relaxed email newsletter. You answer with the newsletter HTML only, followed by the requested \
subject-topics line.";

pub fn build_prompt(articles: &[Article], settings: &DigestSettings) -> String {
    let count = settings.max_articles;
    let mut listing = String::new();
    for (index, article) in articles.iter().enumerate() {
        let _ = write!(
            listing,
            "
Article {number}:
Source: {source}
Title: {title}
Published: {published}
Link: {link}
Summary: {summary}
---
",
            number = index + 1,
            source = article.source,
            title = article.title,
            published = format_published(&article.published),
            link = article.link,
            summary = truncate_chars(&article.summary, settings.prompt_summary_chars),
        );
    }

    format!(
        "Here are today's candidate articles:
{listing}
TASK:
1. Select exactly {count} of the most interesting and most relevant articles above \
(all of them if there are fewer than {count}).
2. Rank them by relevance and importance, most important first.
3. Write a newsletter in {language} containing:
   - a short, friendly introduction
   - for every selected article: an easy-to-read summary of 2-3 sentences, its source, \
its publish date and its link
   - NO numbering of the articles
   - a closing note that this newsletter was assembled automatically by an AI
4. Write out every selected article in full. Do NOT use placeholders such as \
\"more articles...\" and do not truncate the output.

Format the newsletter as HTML suitable for email, with pleasant but not overly formal styling.
Every article MUST show its source and its publish date.

Finally, add one separate last line with the three most important topics of the first three \
articles, for the email subject, in exactly this format:
{TOPICS_MARKER} Topic1, Topic2, Topic3
",
        language = settings.language,
    )
}

/// Splits the model output into body and subject topics. The first marker
/// line supplies the topics; every marker line is removed from the body.
/// Returns `None` when nothing usable is left.
pub fn parse_response(raw: &str) -> Option<DigestResult> {
    let mut subject_topics = None;
    let mut body_lines = Vec::new();

    for line in raw.lines() {
        match marker_value(line) {
            Some(topics) => {
                if subject_topics.is_none() {
                    subject_topics = Some(topics).filter(|value| !value.is_empty());
                }
            }
            None => body_lines.push(line),
        }
    }

    let body = strip_code_fence(body_lines.join("\n").trim()).to_string();
    if body.is_empty() {
        return None;
    }
    Some(DigestResult {
        body,
        subject_topics,
        path: DigestPath::Generated,
    })
}

fn marker_value(line: &str) -> Option<String> {
    let trimmed = line.trim().trim_start_matches(['*', '_', '#', ' ']);
    let prefix = trimmed.get(..TOPICS_MARKER.len())?;
    if !prefix.eq_ignore_ascii_case(TOPICS_MARKER) {
        return None;
    }
    let value = trimmed[TOPICS_MARKER.len()..]
        .trim()
        .trim_matches(['*', '_'])
        .trim();
    Some(value.to_string())
}

fn strip_code_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    let rest = rest.split_once('\n').map_or("", |(_, content)| content);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
