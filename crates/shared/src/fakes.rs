//! Deterministic stand-ins for the external services. Used by the unit tests
//! here, the integration tests, and the server's route tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::llm::{CompletionModel, CompletionRequest};
use crate::models::{ResearchQuery, SearchHit};
use crate::search::SearchSource;

/// Replies with canned responses in order and records every request.
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    failure: Option<AppError>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `error`.
    pub fn failing(error: AppError) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            failure: Some(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_response(&self, response: impl Into<String>) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response.into());
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.prompt).collect()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut responses| responses.pop_front());

        match next {
            Some(text) if !text.trim().is_empty() => Ok(text),
            Some(_) => Err(AppError::Model("Scripted model returned an empty response".to_string())),
            None => Err(AppError::Model("Scripted model has no responses left".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A search source with a fixed answer.
pub struct StaticSource {
    name: String,
    hits: Vec<SearchHit>,
    failure: Option<AppError>,
    calls: Mutex<usize>,
}

impl StaticSource {
    pub fn new(name: &str, hits: Vec<SearchHit>) -> Self {
        Self {
            name: name.to_string(),
            hits,
            failure: None,
            calls: Mutex::new(0),
        }
    }

    pub fn failing(name: &str, error: AppError) -> Self {
        Self {
            name: name.to_string(),
            hits: Vec::new(),
            failure: Some(error),
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }
}

#[async_trait]
impl SearchSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, _query: &ResearchQuery, limit: usize) -> Result<Vec<SearchHit>> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.hits.iter().take(limit).cloned().collect()),
        }
    }
}
