use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::SearchSource;
use crate::error::{AppError, Result};
use crate::models::{ResearchQuery, SearchHit};

/// Web search over DuckDuckGo's no-JavaScript results page.
pub struct WebSearchClient {
    client: Client,
    base_url: String,
    default_days_back: u32,
}

impl WebSearchClient {
    pub fn new(base_url: String, default_days_back: u32, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent("Mozilla/5.0 (compatible; ResearchStudio/1.0)")
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            default_days_back,
        })
    }

    /// DuckDuckGo only knows coarse date windows (`df`) and regions (`kl`),
    /// so the look-back is rounded up to the nearest window.
    fn build_url(&self, query: &ResearchQuery) -> String {
        let days_back = query.filters().days_back.unwrap_or(self.default_days_back);
        let language = query.filters().language.as_deref().unwrap_or("en");

        format!(
            "{}?q={}&df={}&kl={}",
            self.base_url,
            urlencoding::encode(query.topic()),
            date_window(days_back),
            region_for_language(language)
        )
    }

    fn parse_results(html: &str, limit: usize) -> Vec<SearchHit> {
        let document = Html::parse_document(html);
        let (Ok(result_sel), Ok(link_sel), Ok(snippet_sel)) = (
            Selector::parse("div.result"),
            Selector::parse("a.result__a"),
            Selector::parse(".result__snippet"),
        ) else {
            return Vec::new();
        };

        document
            .select(&result_sel)
            .filter(|result| !is_ad(result))
            .filter_map(|result| {
                let link = result.select(&link_sel).next()?;
                let url = resolve_link(link.value().attr("href")?)?;
                let snippet = result
                    .select(&snippet_sel)
                    .next()
                    .map(|s| s.text().collect::<String>())
                    .unwrap_or_default();

                Some(SearchHit {
                    title: link.text().collect::<String>(),
                    snippet,
                    url,
                    published_at: None,
                    source: "Web".to_string(),
                })
            })
            .take(limit)
            .collect()
    }
}

fn date_window(days_back: u32) -> &'static str {
    match days_back {
        0..=1 => "d",
        2..=7 => "w",
        8..=31 => "m",
        _ => "y",
    }
}

fn region_for_language(language: &str) -> &'static str {
    match language.to_lowercase().as_str() {
        "en" => "us-en",
        "de" => "de-de",
        "fr" => "fr-fr",
        "es" => "es-es",
        "it" => "it-it",
        "nl" => "nl-nl",
        "pt" => "br-pt",
        _ => "wt-wt",
    }
}

fn is_ad(result: &ElementRef) -> bool {
    result
        .value()
        .classes()
        .any(|class| class == "result--ad")
}

/// DuckDuckGo wraps outbound links in a redirect (`//duckduckgo.com/l/?uddg=...`).
/// Unwrap it; pass plain links through.
fn resolve_link(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&absolute).ok()?;
    let is_redirect = parsed
        .host_str()
        .map(|h| h.ends_with("duckduckgo.com"))
        .unwrap_or(false)
        && parsed.path().starts_with("/l/");

    if is_redirect {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }

    match parsed.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}

#[async_trait]
impl SearchSource for WebSearchClient {
    fn name(&self) -> &str {
        "Web"
    }

    async fn search(&self, query: &ResearchQuery, limit: usize) -> Result<Vec<SearchHit>> {
        let url = self.build_url(query);
        debug!(topic = query.topic(), "querying web search");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::from_search_transport("Web search", e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(AppError::RateLimited {
                provider: "Web search".to_string(),
                message: "too many requests".to_string(),
            });
        }
        // DuckDuckGo answers 202 with a challenge page when it suspects a bot
        if status.as_u16() != 200 {
            return Err(AppError::Network(format!("Web search returned status {}", status)));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AppError::Network(format!("Failed to read web search response: {}", e)))?;

        Ok(Self::parse_results(&html, limit))
    }
}
