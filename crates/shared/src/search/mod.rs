//! Search collection: every enabled source is queried once and the hits are
//! merged into a single ordered [`SearchResult`].

pub mod news;
pub mod web;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::models::{ResearchQuery, SearchHit, SearchResult};
use crate::text::strip_html;

pub use news::NewsApiClient;
pub use web::WebSearchClient;

/// A single external search or news provider.
#[async_trait]
pub trait SearchSource: Send + Sync {
    fn name(&self) -> &str;

    /// Returns at most `limit` hits in the provider's ranking order. Sources
    /// apply `days_back` and `language` as closely as the provider allows.
    async fn search(&self, query: &ResearchQuery, limit: usize) -> Result<Vec<SearchHit>>;
}

pub struct SearchCollector {
    sources: Vec<Arc<dyn SearchSource>>,
    default_max_results: usize,
}

impl SearchCollector {
    pub fn new(sources: Vec<Arc<dyn SearchSource>>, default_max_results: usize) -> Self {
        Self {
            sources,
            default_max_results,
        }
    }

    /// Sources enabled by the config: NewsAPI when a key is present, web search
    /// unless switched off.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut sources: Vec<Arc<dyn SearchSource>> = Vec::new();

        match &config.news_api_key {
            Some(key) => sources.push(Arc::new(NewsApiClient::new(
                key.clone(),
                config.news_api_base.clone(),
                config.research_days_back,
                config.search_timeout_secs,
            )?)),
            None => info!("NEWS_API_KEY not set, news source disabled"),
        }

        if config.web_search_enabled {
            sources.push(Arc::new(WebSearchClient::new(
                config.web_search_base.clone(),
                config.research_days_back,
                config.search_timeout_secs,
            )?));
        }

        if sources.is_empty() {
            warn!("No search sources enabled; research will always come back empty");
        }

        Ok(Self::new(sources, config.max_search_results))
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Query every source once. Any failure fails the whole collection, so
    /// callers never see a partial result.
    pub async fn collect(&self, query: &ResearchQuery) -> Result<SearchResult> {
        let limit = query
            .filters()
            .max_results
            .unwrap_or(self.default_max_results)
            .max(1);

        info!(topic = query.topic(), sources = self.sources.len(), "collecting search results");

        let per_source = try_join_all(
            self.sources
                .iter()
                .map(|source| source.search(query, limit)),
        )
        .await?;

        let mut seen_urls = HashSet::new();
        let mut hits = Vec::new();

        for (source, source_hits) in self.sources.iter().zip(per_source) {
            let before = hits.len();
            for hit in source_hits.into_iter().filter_map(normalize_hit).take(limit) {
                if seen_urls.insert(hit.url.clone()) {
                    hits.push(hit);
                }
            }
            info!(source = source.name(), kept = hits.len() - before, "source done");
        }

        Ok(SearchResult::new(hits))
    }
}

fn normalize_hit(hit: SearchHit) -> Option<SearchHit> {
    let title = strip_html(&hit.title);
    let url = hit.url.trim().to_string();
    if title.is_empty() || url.is_empty() {
        return None;
    }

    Some(SearchHit {
        title,
        snippet: strip_html(&hit.snippet),
        url,
        published_at: hit.published_at,
        source: hit.source.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::fakes::StaticSource;
    use crate::models::SearchFilters;

    fn hit(title: &str, url: &str) -> SearchHit {
        SearchHit {
            title: title.to_string(),
            snippet: format!("About {}", title),
            url: url.to_string(),
            published_at: None,
            source: "Test".to_string(),
        }
    }

    fn query() -> ResearchQuery {
        ResearchQuery::new("electric vehicles", SearchFilters::default()).unwrap()
    }

    #[tokio::test]
    async fn test_collect_preserves_source_order() {
        let news = StaticSource::new("news", vec![hit("A", "https://a"), hit("B", "https://b")]);
        let web = StaticSource::new("web", vec![hit("C", "https://c")]);
        let collector = SearchCollector::new(vec![Arc::new(news), Arc::new(web)], 10);

        let result = collector.collect(&query()).await.unwrap();
        let titles: Vec<_> = result.hits().iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_collect_dedupes_urls_first_wins() {
        let news = StaticSource::new("news", vec![hit("From news", "https://same")]);
        let web = StaticSource::new("web", vec![hit("From web", "https://same")]);
        let collector = SearchCollector::new(vec![Arc::new(news), Arc::new(web)], 10);

        let result = collector.collect(&query()).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.hits()[0].title, "From news");
    }

    #[tokio::test]
    async fn test_collect_drops_malformed_hits() {
        let source = StaticSource::new(
            "web",
            vec![hit("", "https://x"), hit("No url", "  "), hit("<b>Good</b>", "https://ok")],
        );
        let collector = SearchCollector::new(vec![Arc::new(source)], 10);

        let result = collector.collect(&query()).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.hits()[0].title, "Good");
    }

    #[tokio::test]
    async fn test_collect_honors_max_results_filter() {
        let hits = (0..8).map(|i| hit(&format!("T{}", i), &format!("https://{}", i))).collect();
        let collector = SearchCollector::new(vec![Arc::new(StaticSource::new("web", hits))], 10);
        let filters = SearchFilters {
            max_results: Some(3),
            ..SearchFilters::default()
        };
        let query = ResearchQuery::new("ev", filters).unwrap();

        let result = collector.collect(&query).await.unwrap();
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn test_collect_no_sources_is_empty() {
        let collector = SearchCollector::new(Vec::new(), 10);
        let result = collector.collect(&query()).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_any_failing_source_fails_everything() {
        let good = StaticSource::new("news", vec![hit("A", "https://a")]);
        let bad = StaticSource::failing("web", AppError::Network("web timed out".to_string()));
        let collector = SearchCollector::new(vec![Arc::new(good), Arc::new(bad)], 10);

        let err = collector.collect(&query()).await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }
}
