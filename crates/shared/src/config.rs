use std::env;
use std::str::FromStr;

use crate::error::{AppError, Result};

pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_ANTHROPIC_BASE: &str = "https://api.anthropic.com/v1";
pub const DEFAULT_NEWS_API_BASE: &str = "https://newsapi.org/v2";
pub const DEFAULT_WEB_SEARCH_BASE: &str = "https://html.duckduckgo.com/html/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
}

impl LlmProvider {
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OpenAI",
            LlmProvider::Anthropic => "Anthropic",
        }
    }

    fn key_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "gpt-3.5-turbo",
            LlmProvider::Anthropic => "claude-3-5-haiku-20241022",
        }
    }

    fn default_base(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => DEFAULT_OPENAI_BASE,
            LlmProvider::Anthropic => DEFAULT_ANTHROPIC_BASE,
        }
    }

    fn base_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OPENAI_API_BASE",
            LlmProvider::Anthropic => "ANTHROPIC_API_BASE",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "anthropic" | "claude" => Ok(LlmProvider::Anthropic),
            other => Err(AppError::Config(format!(
                "LLM_PROVIDER must be 'openai' or 'anthropic', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmSettings,
    /// Absent key disables the NewsAPI source.
    pub news_api_key: Option<String>,
    pub news_api_base: String,
    pub web_search_enabled: bool,
    pub web_search_base: String,
    pub search_timeout_secs: u64,
    pub max_search_results: usize,
    pub research_days_back: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as
    /// missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = match get("LLM_PROVIDER") {
            Some(raw) => raw.parse::<LlmProvider>()?,
            None => LlmProvider::OpenAi,
        };

        let api_key = get(provider.key_var()).ok_or_else(|| {
            AppError::Config(format!(
                "{key} not found.\n\n\
                To fix this, create ~/.config/research-studio/.env with:\n  \
                {key}=your_key_here\n  \
                NEWS_API_KEY=your_key_here   (optional)",
                key = provider.key_var()
            ))
        })?;

        let llm = LlmSettings {
            provider,
            api_key,
            api_base: get(provider.base_var()).unwrap_or_else(|| provider.default_base().to_string()),
            model: get("LLM_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            temperature: parse_or("LLM_TEMPERATURE", get("LLM_TEMPERATURE"), 0.7)?,
            max_tokens: parse_or("LLM_MAX_TOKENS", get("LLM_MAX_TOKENS"), 1000)?,
            timeout_secs: parse_or("LLM_TIMEOUT_SECS", get("LLM_TIMEOUT_SECS"), 60)?,
        };

        Ok(Self {
            llm,
            news_api_key: get("NEWS_API_KEY"),
            news_api_base: get("NEWS_API_BASE").unwrap_or_else(|| DEFAULT_NEWS_API_BASE.to_string()),
            web_search_enabled: parse_or("WEB_SEARCH_ENABLED", get("WEB_SEARCH_ENABLED"), true)?,
            web_search_base: get("WEB_SEARCH_BASE")
                .unwrap_or_else(|| DEFAULT_WEB_SEARCH_BASE.to_string()),
            search_timeout_secs: parse_or("SEARCH_TIMEOUT_SECS", get("SEARCH_TIMEOUT_SECS"), 10)?,
            max_search_results: parse_or("MAX_SEARCH_RESULTS", get("MAX_SEARCH_RESULTS"), 10)?,
            research_days_back: parse_or("RESEARCH_DAYS_BACK", get("RESEARCH_DAYS_BACK"), 30)?,
        })
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/research-studio/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("research-studio").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        Some(value) => value
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: '{}'", key, value))),
        None => Ok(default),
    }
}
