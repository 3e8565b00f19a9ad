use crate::core::feed::Article;

/// Case-insensitive substring match of keywords against title and summary.
#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    keywords: Vec<String>,
}

impl RelevanceFilter {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|keyword| keyword.as_ref().trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn matches(&self, article: &Article) -> bool {
        let title = article.title.to_lowercase();
        let summary = article.summary.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| title.contains(keyword.as_str()) || summary.contains(keyword.as_str()))
    }

    pub fn apply(&self, articles: Vec<Article>) -> Vec<Article> {
        articles
            .into_iter()
            .filter(|article| self.matches(article))
            .collect()
    }
}
