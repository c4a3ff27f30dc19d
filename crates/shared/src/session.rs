//! Per-browser research state and the in-memory store that holds it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::content::PostGenerator;
use crate::error::{AppError, Result};
use crate::llm::{build_model, CompletionModel};
use crate::models::{Insight, PostDraft, PostStyle, ResearchQuery, SearchFilters, SearchResult};
use crate::search::SearchCollector;
use crate::summarizer::ResearchSummarizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Researching,
    InsightReady,
    Drafting,
    DraftReady,
    Regenerating,
}

impl SessionPhase {
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Researching => "researching",
            SessionPhase::InsightReady => "insight-ready",
            SessionPhase::Drafting => "drafting",
            SessionPhase::DraftReady => "draft-ready",
            SessionPhase::Regenerating => "regenerating",
        }
    }
}

/// The three stages, shared by every session.
pub struct Pipeline {
    pub collector: SearchCollector,
    pub summarizer: ResearchSummarizer,
    pub generator: PostGenerator,
}

impl Pipeline {
    /// Summarizer and generator share one model client.
    pub fn new(collector: SearchCollector, model: Arc<dyn CompletionModel>) -> Self {
        Self {
            collector,
            summarizer: ResearchSummarizer::new(model.clone()),
            generator: PostGenerator::new(model),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let model = build_model(&config.llm)?;
        let collector = SearchCollector::from_config(config)?;
        info!(
            model = model.model_name(),
            sources = ?collector.source_names(),
            "pipeline ready"
        );
        Ok(Self::new(collector, model))
    }
}

#[derive(Debug)]
pub struct ResearchSession {
    id: Uuid,
    phase: SessionPhase,
    query: Option<ResearchQuery>,
    results: Option<SearchResult>,
    insight: Option<Insight>,
    draft: Option<PostDraft>,
    last_error: Option<String>,
}

impl ResearchSession {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            phase: SessionPhase::Idle,
            query: None,
            results: None,
            insight: None,
            draft: None,
            last_error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn query(&self) -> Option<&ResearchQuery> {
        self.query.as_ref()
    }

    pub fn results(&self) -> Option<&SearchResult> {
        self.results.as_ref()
    }

    pub fn insight(&self) -> Option<&Insight> {
        self.insight.as_ref()
    }

    pub fn draft(&self) -> Option<&PostDraft> {
        self.draft.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Collect and summarize a new topic. On success everything from the
    /// previous topic is replaced; on failure it is left as it was.
    pub async fn start_research(
        &mut self,
        pipeline: &Pipeline,
        topic: &str,
        filters: SearchFilters,
    ) -> Result<()> {
        let previous = self.begin(SessionPhase::Researching);

        let outcome = async {
            let query = ResearchQuery::new(topic, filters)?;
            let results = pipeline.collector.collect(&query).await?;
            let insight = pipeline.summarizer.summarize(&query, &results).await?;
            Ok::<_, AppError>((query, results, insight))
        }
        .await;

        let (query, results, insight) = self.settle(previous, outcome)?;
        self.query = Some(query);
        self.results = Some(results);
        self.insight = Some(insight);
        self.draft = None;
        self.phase = SessionPhase::InsightReady;
        Ok(())
    }

    /// First draft for the chosen angle and style. Replaces any current draft.
    pub async fn generate_post(
        &mut self,
        pipeline: &Pipeline,
        angle: &str,
        style: PostStyle,
    ) -> Result<()> {
        let Some(insight) = self.insight.clone() else {
            return self.reject("Run research before generating a post");
        };

        let previous = self.begin(SessionPhase::Drafting);
        let outcome = pipeline.generator.generate(&insight, angle, style, None).await;

        let draft = self.settle(previous, outcome)?;
        self.draft = Some(draft);
        self.phase = SessionPhase::DraftReady;
        Ok(())
    }

    /// New version of the current draft, same angle and style.
    pub async fn regenerate(&mut self, pipeline: &Pipeline) -> Result<()> {
        let (Some(insight), Some(draft)) = (self.insight.clone(), self.draft.clone()) else {
            return self.reject("Generate a post before regenerating");
        };

        let previous = self.begin(SessionPhase::Regenerating);
        let outcome = pipeline
            .generator
            .generate(&insight, &draft.angle, draft.style, Some(&draft))
            .await;

        let next = self.settle(previous, outcome)?;
        self.draft = Some(next);
        self.phase = SessionPhase::DraftReady;
        Ok(())
    }

    pub async fn improve_hook(&mut self, pipeline: &Pipeline) -> Result<()> {
        let (Some(insight), Some(draft)) = (self.insight.clone(), self.draft.clone()) else {
            return self.reject("Generate a post before improving its hook");
        };

        let previous = self.begin(SessionPhase::Regenerating);
        let outcome = pipeline.generator.improve_hook(&insight, &draft).await;

        let next = self.settle(previous, outcome)?;
        self.draft = Some(next);
        self.phase = SessionPhase::DraftReady;
        Ok(())
    }

    /// Replace the draft body with the user's edit. The version stays, since
    /// the model did not produce a new draft.
    pub fn edit_draft(&mut self, body: &str) -> Result<()> {
        let body = body.replace("\r\n", "\n");
        let body = body.trim();
        if body.is_empty() {
            return self.reject("The post is empty");
        }
        let id = self.id;
        match self.draft.as_mut() {
            Some(draft) => {
                if draft.body != body {
                    draft.body = body.to_string();
                    info!(session = %id, version = draft.version, "draft edited");
                }
                Ok(())
            }
            None => self.reject("Generate a post before editing it"),
        }
    }

    /// Drop everything and go back to an empty page. The id is kept.
    pub fn reset(&mut self) {
        info!(session = %self.id, "session reset");
        *self = Self::new(self.id);
    }

    /// Current draft as a download: (file name, body).
    pub fn download(&self) -> Option<(String, String)> {
        let draft = self.draft.as_ref()?;
        let topic = self.query.as_ref().map(|q| q.topic()).unwrap_or("post");
        Some((download_file_name(topic), draft.body.clone()))
    }

    fn begin(&mut self, phase: SessionPhase) -> SessionPhase {
        self.last_error = None;
        std::mem::replace(&mut self.phase, phase)
    }

    fn settle<T>(&mut self, previous: SessionPhase, outcome: Result<T>) -> Result<T> {
        if let Err(e) = &outcome {
            warn!(session = %self.id, phase = self.phase.label(), error = %e, "action failed");
            self.phase = previous;
            self.last_error = Some(e.user_message());
        }
        outcome
    }

    /// Show `err` in the banner without changing phase.
    pub fn record_error(&mut self, err: &AppError) {
        self.last_error = Some(err.user_message());
    }

    fn reject(&mut self, message: &str) -> Result<()> {
        let err = AppError::InvalidInput(message.to_string());
        self.record_error(&err);
        Err(err)
    }
}

/// "electric vehicles" -> "linkedin_post_electric_vehicles.txt"
fn download_file_name(topic: &str) -> String {
    let slug: String = topic
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    if slug.is_empty() {
        "linkedin_post.txt".to_string()
    } else {
        format!("linkedin_post_{}.txt", slug)
    }
}

/// Sessions idle longer than this are dropped on the next insert.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(60 * 60);
/// Hard cap on live sessions; the least recently used one goes first.
pub const MAX_SESSIONS: usize = 1000;

struct SessionEntry {
    session: Arc<Mutex<ResearchSession>>,
    last_seen: Instant,
}

/// Sessions by id. Each session has its own lock, so one browser waiting on a
/// model call never blocks another.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    idle_ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(SESSION_IDLE_TTL, MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Look up a live session without creating one.
    pub async fn get(&self, id: Option<Uuid>) -> Option<Arc<Mutex<ResearchSession>>> {
        let id = id?;
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();

        let entry = sessions.get_mut(&id)?;
        if now.duration_since(entry.last_seen) < self.idle_ttl {
            entry.last_seen = now;
            return Some(entry.session.clone());
        }
        sessions.remove(&id);
        info!(session = %id, "session expired");
        None
    }

    /// Look up `id`, or start a fresh session under a new id when it is
    /// missing, unknown or expired.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, Arc<Mutex<ResearchSession>>) {
        if let Some(id) = id {
            if let Some(session) = self.get(Some(id)).await {
                return (id, session);
            }
        }

        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(ResearchSession::new(id)));
        let now = Instant::now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_ttl);
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id);
            match oldest {
                Some(oldest) => {
                    sessions.remove(&oldest);
                }
                None => break,
            }
        }
        if sessions.len() < before {
            info!(evicted = before - sessions.len(), "evicted sessions");
        }

        sessions.insert(
            id,
            SessionEntry {
                session: session.clone(),
                last_seen: now,
            },
        );
        info!(session = %id, "new session");
        (id, session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
