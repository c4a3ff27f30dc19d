// Public modules
pub mod config;
pub mod content;
pub mod error;
pub mod fakes;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod search;
pub mod session;
pub mod summarizer;
pub mod text;

// Re-export commonly used types
pub use config::{Config, LlmProvider, LlmSettings};
pub use content::PostGenerator;
pub use error::{AppError, Result};
pub use llm::{build_model, CompletionModel, CompletionRequest};
pub use models::{Insight, PostDraft, PostStyle, ResearchQuery, SearchFilters, SearchHit, SearchResult, Sentiment};
pub use search::{SearchCollector, SearchSource};
pub use session::{Pipeline, ResearchSession, SessionPhase, SessionStore};
pub use summarizer::ResearchSummarizer;
