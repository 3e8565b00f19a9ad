//! Self-contained HTML used when no generated digest is available.

use std::fmt::Write;

use super::dates::format_published;
use super::truncate_chars;
use crate::core::config::DigestSettings;
use crate::core::feed::Article;

const STYLE: &str = r#"
        body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; line-height: 1.6; color: #333; max-width: 800px; margin: 0 auto; padding: 20px; }
        .header { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 30px; border-radius: 12px; text-align: center; margin-bottom: 30px; }
        .header h1 { margin: 0; font-size: 28px; }
        .header p { margin: 10px 0 0 0; opacity: 0.9; font-size: 16px; }
        .article { background: #f8f9fa; border-left: 4px solid #667eea; padding: 25px; margin-bottom: 25px; border-radius: 10px; box-shadow: 0 2px 6px rgba(0,0,0,0.08); }
        .article h3 { margin-top: 0; font-size: 20px; line-height: 1.4; }
        .article h3 a { color: #667eea; text-decoration: none; }
        .meta { color: #666; font-size: 14px; margin-bottom: 15px; }
        .source { font-weight: bold; color: #764ba2; }
        .date { font-style: italic; }
        .summary { font-size: 16px; line-height: 1.7; }
        .footer-note { margin-top: 40px; padding: 20px; background: linear-gradient(135deg, #f1f3f4 0%, #e8eaf6 100%); border-radius: 10px; text-align: center; font-size: 14px; color: #555; }
        .footer-note p { margin: 5px 0; }
"#;

pub const AUTOMATED_NOTE: &str = "This digest was assembled automatically by rss-digest.";

pub fn render_fallback(articles: &[&Article], settings: &DigestSettings) -> String {
    let mut blocks = String::new();
    for article in articles {
        let _ = write!(
            blocks,
            r#"
    <div class="article">
        <h3><a href="{link}">{title}</a></h3>
        <div class="meta">
            <span class="source">{source}</span> |
            <span class="date">{date}</span>
        </div>
        <div class="summary">{summary}</div>
    </div>
"#,
            link = html_escape(&article.link),
            title = html_escape(&article.title),
            source = html_escape(&article.source),
            date = html_escape(&format_published(&article.published)),
            summary = html_escape(&truncate_chars(
                &article.summary,
                settings.fallback_summary_chars
            )),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <style>{STYLE}</style>
</head>
<body>
    <div class="header">
        <h1>{title}</h1>
        <p>{tagline}</p>
    </div>
{blocks}
    <div class="footer-note">
        <p>{AUTOMATED_NOTE}</p>
        <p>The summary service was unavailable today, so these articles were picked at random from the matching news.</p>
    </div>
</body>
</html>
"#,
        title = html_escape(&settings.title),
        tagline = html_escape(&settings.tagline),
    )
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
