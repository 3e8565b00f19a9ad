pub mod dates;
pub mod prompt;
pub mod render;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::core::config::DigestSettings;
use crate::core::feed::Article;
use crate::core::llm::{LlmError, TextGenerator};
use prompt::{build_prompt, parse_response, SYSTEM_PROMPT};
use render::render_fallback;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestPath {
    Generated,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestResult {
    pub body: String,
    /// Only ever set by the generated path.
    pub subject_topics: Option<String>,
    pub path: DigestPath,
}

pub struct DigestComposer {
    generator: Box<dyn TextGenerator>,
    settings: DigestSettings,
    rng: StdRng,
}

impl DigestComposer {
    pub fn new(generator: Box<dyn TextGenerator>, settings: DigestSettings, rng: StdRng) -> Self {
        Self {
            generator,
            settings,
            rng,
        }
    }

    /// Asks the generator to select, rank and summarize. Any failure there
    /// degrades to the random-sample fallback; this never returns an error.
    pub async fn compose(&mut self, articles: &[Article]) -> DigestResult {
        tracing::info!(
            generator = self.generator.name(),
            candidates = articles.len(),
            "composing digest"
        );
        match self.generate(articles).await {
            Ok(result) => {
                tracing::info!(topics = ?result.subject_topics, "generated digest");
                result
            }
            Err(error) => {
                tracing::warn!(error = %error, "generation failed, using fallback digest");
                self.fallback(articles)
            }
        }
    }

    async fn generate(&self, articles: &[Article]) -> Result<DigestResult, LlmError> {
        let prompt = build_prompt(articles, &self.settings);
        let raw = self.generator.generate(SYSTEM_PROMPT, &prompt).await?;
        parse_response(&raw).ok_or(LlmError::EmptyResponse)
    }

    /// Uniform sample without replacement of `min(max_articles, len)` articles.
    pub fn fallback(&mut self, articles: &[Article]) -> DigestResult {
        let count = self.settings.max_articles.min(articles.len());
        let selected: Vec<&Article> = articles.choose_multiple(&mut self.rng, count).collect();
        DigestResult {
            body: render_fallback(&selected, &self.settings),
            subject_topics: None,
            path: DigestPath::Fallback,
        }
    }
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with `...`.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}
