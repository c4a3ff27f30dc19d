use std::sync::Arc;

use tracing::info;

use crate::error::{AppError, Result};
use crate::llm::{CompletionModel, CompletionRequest};
use crate::models::{Insight, PostDraft, PostStyle};
use crate::prompts::{self, PostContext, StyleTemplate};

const REGENERATE_TEMPERATURE: f32 = 0.9;
const HOOK_TEMPERATURE: f32 = 0.8;
const HOOK_MAX_TOKENS: u32 = 60;

pub struct PostGenerator {
    model: Arc<dyn CompletionModel>,
}

impl PostGenerator {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self { model }
    }

    /// Draft a post for `angle` in `style`. With a `prior` draft this is a
    /// regeneration: the previous body goes back to the model with a rewrite
    /// instruction, and the version moves up by one.
    pub async fn generate(
        &self,
        insight: &Insight,
        angle: &str,
        style: PostStyle,
        prior: Option<&PostDraft>,
    ) -> Result<PostDraft> {
        let angle = angle.trim();
        if angle.is_empty() {
            return Err(AppError::InvalidInput(
                "Pick one of the suggested angles or write your own".to_string(),
            ));
        }

        let template = style.template();
        let ctx = PostContext {
            topic: &insight.topic,
            angle,
            summary: &insight.summary,
            key_facts: &insight.key_facts,
        };

        let (request, version) = match prior {
            None => {
                info!(style = style.label(), "generating post");
                let prompt = prompts::post_prompt(template, &ctx);
                (CompletionRequest::new(prompt).with_temperature(template.temperature), 1)
            }
            Some(previous) => {
                let version = previous.version + 1;
                let variation = prompts::regenerate_variation(version);
                info!(style = style.label(), version, "regenerating post");
                let prompt = prompts::regenerate_prompt(template, &ctx, &previous.body, variation);
                (
                    CompletionRequest::new(prompt).with_temperature(REGENERATE_TEMPERATURE),
                    version,
                )
            }
        };

        let raw = self.model.complete(&request).await?;
        let body = ensure_hashtags(raw.trim(), &insight.topic, template);

        Ok(PostDraft {
            style,
            angle: angle.to_string(),
            body,
            version,
        })
    }

    /// Replace the opening line with a punchier one. Counts as a new version
    /// since the body changes.
    pub async fn improve_hook(&self, insight: &Insight, draft: &PostDraft) -> Result<PostDraft> {
        let mut lines: Vec<&str> = draft.body.lines().collect();
        let current_hook = lines.first().copied().unwrap_or_default();

        let request = CompletionRequest::new(prompts::hook_prompt(&insight.topic, current_hook))
            .with_temperature(HOOK_TEMPERATURE)
            .with_max_tokens(HOOK_MAX_TOKENS);
        let response = self.model.complete(&request).await?;

        let hook = response
            .lines()
            .map(|l| l.trim().trim_matches('"').trim())
            .find(|l| !l.is_empty())
            .ok_or_else(|| AppError::Model("Model returned an empty hook".to_string()))?;

        if lines.is_empty() {
            lines.push(hook);
        } else {
            lines[0] = hook;
        }

        info!(version = draft.version + 1, "hook improved");
        Ok(PostDraft {
            style: draft.style,
            angle: draft.angle.clone(),
            body: lines.join("\n"),
            version: draft.version + 1,
        })
    }
}

/// "electric vehicles" -> "#ElectricVehicles"
fn topic_hashtag(topic: &str) -> Option<String> {
    let tag: String = topic
        .split_whitespace()
        .take(3)
        .map(|word| {
            let word: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();

    (!tag.is_empty()).then(|| format!("#{}", tag))
}

/// Append hashtags when the model left them out.
fn ensure_hashtags(body: &str, topic: &str, template: &StyleTemplate) -> String {
    if body.contains('#') {
        return body.to_string();
    }

    let mut tags: Vec<String> = topic_hashtag(topic).into_iter().collect();
    tags.extend(template.default_hashtags.iter().map(|t| t.to_string()));
    tags.push("#LinkedIn".to_string());

    format!("{}\n\n{}", body, tags.join(" "))
}
