use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::SearchSource;
use crate::error::{AppError, Result};
use crate::models::{ResearchQuery, SearchHit};

/// NewsAPI caps `pageSize` at 100.
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    #[serde(default)]
    source: ArticleSource,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ArticleSource {
    name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct NewsError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

pub struct NewsApiClient {
    client: Client,
    api_key: String,
    base_url: String,
    default_days_back: u32,
}

impl NewsApiClient {
    pub fn new(
        api_key: String,
        base_url: String,
        default_days_back: u32,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            default_days_back,
        })
    }

    fn build_url(&self, query: &ResearchQuery, limit: usize, now: DateTime<Utc>) -> String {
        let days_back = query.filters().days_back.unwrap_or(self.default_days_back);
        let from = (now - Duration::days(i64::from(days_back))).format("%Y-%m-%d");
        let language = query.filters().language.as_deref().unwrap_or("en");

        format!(
            "{}/everything?q={}&from={}&sortBy=relevancy&language={}&pageSize={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(query.topic()),
            from,
            urlencoding::encode(language),
            limit.min(MAX_PAGE_SIZE)
        )
    }

    fn classify_error(status: StatusCode, body: &str) -> AppError {
        let parsed: NewsError = serde_json::from_str(body).unwrap_or_default();
        let message = if parsed.message.is_empty() {
            body.to_string()
        } else {
            parsed.message
        };

        match parsed.code.as_str() {
            "rateLimited" => AppError::RateLimited {
                provider: "NewsAPI".to_string(),
                message,
            },
            "apiKeyExhausted" | "maximumResultsReached" => AppError::Quota {
                provider: "NewsAPI".to_string(),
                message,
            },
            _ if status == StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited {
                provider: "NewsAPI".to_string(),
                message,
            },
            _ => AppError::Network(format!("NewsAPI returned error: {} - {}", status, message)),
        }
    }

    fn into_hit(article: Article) -> Option<SearchHit> {
        let title = article.title?;
        // NewsAPI blanks out takedowns instead of dropping them
        if title.trim() == "[Removed]" {
            return None;
        }

        let published_at = article
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Some(SearchHit {
            title,
            snippet: article.description.unwrap_or_default(),
            url: article.url?,
            published_at,
            source: article.source.name.unwrap_or_else(|| "Unknown".to_string()),
        })
    }
}

#[async_trait]
impl SearchSource for NewsApiClient {
    fn name(&self) -> &str {
        "NewsAPI"
    }

    async fn search(&self, query: &ResearchQuery, limit: usize) -> Result<Vec<SearchHit>> {
        let url = self.build_url(query, limit, Utc::now());
        debug!(topic = query.topic(), "querying NewsAPI");

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| AppError::from_search_transport("NewsAPI", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(Self::classify_error(status, &error_text));
        }

        let news = response
            .json::<NewsResponse>()
            .await
            .map_err(|e| AppError::Network(format!("Failed to parse NewsAPI response: {}", e)))?;

        Ok(news
            .articles
            .into_iter()
            .filter_map(Self::into_hit)
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SearchFilters;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> NewsApiClient {
        NewsApiClient::new("news-key".to_string(), base.to_string(), 30, 5).unwrap()
    }

    #[test]
    fn test_build_url_uses_filters_and_defaults() {
        let client = client("https://newsapi.org/v2/");
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();

        let query = ResearchQuery::new("electric vehicles", SearchFilters::default()).unwrap();
        assert_eq!(
            client.build_url(&query, 10, now),
            "https://newsapi.org/v2/everything?q=electric%20vehicles&from=2026-01-02&sortBy=relevancy&language=en&pageSize=10"
        );

        let filters = SearchFilters {
            days_back: Some(7),
            language: Some("de".to_string()),
            max_results: None,
        };
        let query = ResearchQuery::new("EV", filters).unwrap();
        let url = client.build_url(&query, 500, now);
        assert!(url.contains("from=2026-01-25"));
        assert!(url.contains("language=de"));
        assert!(url.contains("pageSize=100"));
    }

    #[tokio::test]
    async fn test_search_maps_articles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/everything"))
            .and(query_param("q", "electric vehicles"))
            .and(header("X-Api-Key", "news-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "totalResults": 3,
                "articles": [
                    {
                        "source": {"id": null, "name": "Reuters"},
                        "title": "EV sales climb",
                        "description": "Sales rose 20%.",
                        "url": "https://reuters.example/ev",
                        "publishedAt": "2026-01-30T08:00:00Z"
                    },
                    {
                        "source": {"id": null, "name": "[Removed]"},
                        "title": "[Removed]",
                        "description": "[Removed]",
                        "url": "https://removed.com",
                        "publishedAt": "1970-01-01T00:00:00Z"
                    },
                    {
                        "source": {"name": "Blog"},
                        "title": "Charging networks",
                        "description": null,
                        "url": "https://blog.example/charging",
                        "publishedAt": "not a date"
                    }
                ]
            })))
            .mount(&server)
            .await;

        let query = ResearchQuery::new("electric vehicles", SearchFilters::default()).unwrap();
        let hits = client(&server.uri()).search(&query, 10).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "EV sales climb");
        assert_eq!(hits[0].source, "Reuters");
        assert_eq!(
            hits[0].published_at,
            Some(Utc.with_ymd_and_hms(2026, 1, 30, 8, 0, 0).unwrap())
        );
        assert_eq!(hits[1].snippet, "");
        assert_eq!(hits[1].published_at, None);
    }

    #[tokio::test]
    async fn test_rate_limited_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/everything"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "status": "error",
                "code": "rateLimited",
                "message": "You have made too many requests recently."
            })))
            .mount(&server)
            .await;

        let query = ResearchQuery::new("ev", SearchFilters::default()).unwrap();
        let err = client(&server.uri()).search(&query, 10).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited { .. }));
    }

    #[test]
    fn test_classify_other_errors() {
        let quota = NewsApiClient::classify_error(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"status":"error","code":"apiKeyExhausted","message":"out of requests"}"#,
        );
        assert!(matches!(quota, AppError::Quota { .. }));

        let invalid = NewsApiClient::classify_error(
            StatusCode::UNAUTHORIZED,
            r#"{"status":"error","code":"apiKeyInvalid","message":"bad key"}"#,
        );
        assert!(matches!(invalid, AppError::Network(ref msg) if msg.contains("bad key")));
    }
}
