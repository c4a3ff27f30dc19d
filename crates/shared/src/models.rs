use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Upper bound on the number of angles an [`Insight`] carries.
pub const MAX_ANGLES: usize = 5;
/// Upper bound on the number of key facts an [`Insight`] carries.
pub const MAX_KEY_FACTS: usize = 5;

/// Optional narrowing applied to every source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub days_back: Option<u32>,
    pub language: Option<String>,
    pub max_results: Option<usize>,
}

/// What the user asked to research. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuery {
    topic: String,
    filters: SearchFilters,
}

impl ResearchQuery {
    pub fn new(topic: impl Into<String>, filters: SearchFilters) -> Result<Self> {
        let topic = topic.into().trim().to_string();
        if topic.is_empty() {
            return Err(AppError::InvalidInput(
                "Enter a topic to research".to_string(),
            ));
        }
        Ok(Self { topic, filters })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }
}

/// A single normalized record from any source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Publisher or source name ("Reuters", "Web")
    pub source: String,
}

/// Ordered hits, best-ranked first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    hits: Vec<SearchHit>,
}

impl SearchResult {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }

    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Lenient parse of a model's one-word answer; anything unrecognized is
    /// neutral.
    pub fn parse(text: &str) -> Self {
        let lower = text.trim().to_lowercase();
        if lower.starts_with("positive") {
            Sentiment::Positive
        } else if lower.starts_with("negative") {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

/// What the summarizer extracted from one round of research.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub topic: String,
    pub summary: String,
    pub key_facts: Vec<String>,
    pub sentiment: Sentiment,
    pub angles: Vec<String>,
}

impl Insight {
    pub fn angle(&self, index: usize) -> Option<&str> {
        self.angles.get(index).map(|s| s.as_str())
    }
}

/// The five fixed post styles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostStyle {
    #[default]
    NewsAnalysis,
    EducationalExplainer,
    PersonalOpinion,
    EngagementQuestion,
    TrendPrediction,
}

impl PostStyle {
    pub const ALL: [PostStyle; 5] = [
        PostStyle::NewsAnalysis,
        PostStyle::EducationalExplainer,
        PostStyle::PersonalOpinion,
        PostStyle::EngagementQuestion,
        PostStyle::TrendPrediction,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PostStyle::NewsAnalysis => "News Analysis",
            PostStyle::EducationalExplainer => "Educational Explainer",
            PostStyle::PersonalOpinion => "Personal Opinion",
            PostStyle::EngagementQuestion => "Engagement Question",
            PostStyle::TrendPrediction => "Trend Prediction",
        }
    }

    /// Stable identifier used in form values.
    pub fn slug(&self) -> &'static str {
        match self {
            PostStyle::NewsAnalysis => "news-analysis",
            PostStyle::EducationalExplainer => "educational",
            PostStyle::PersonalOpinion => "opinion",
            PostStyle::EngagementQuestion => "engagement",
            PostStyle::TrendPrediction => "trend",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.slug() == slug)
    }
}

/// The current post. Regeneration replaces the body and bumps the version;
/// older bodies are not kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostDraft {
    pub style: PostStyle,
    pub angle: String,
    pub body: String,
    pub version: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_trims_topic() {
        let query = ResearchQuery::new("  electric vehicles \n", SearchFilters::default()).unwrap();
        assert_eq!(query.topic(), "electric vehicles");
    }

    #[test]
    fn test_query_rejects_blank_topic() {
        let err = ResearchQuery::new("   ", SearchFilters::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_style_slugs_round_trip_for_every_style() {
        for style in PostStyle::ALL {
            assert_eq!(PostStyle::from_slug(style.slug()), Some(style));
        }
        assert_eq!(PostStyle::from_slug("listicle"), None);
    }

    #[test]
    fn test_sentiment_parse_is_lenient() {
        assert_eq!(Sentiment::parse("Positive."), Sentiment::Positive);
        assert_eq!(Sentiment::parse(" negative"), Sentiment::Negative);
        assert_eq!(Sentiment::parse("Mixed"), Sentiment::Neutral);
    }
}
