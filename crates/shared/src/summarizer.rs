use std::sync::Arc;

use tracing::info;

use crate::error::{AppError, Result};
use crate::llm::{CompletionModel, CompletionRequest};
use crate::models::{Insight, ResearchQuery, SearchHit, SearchResult, Sentiment, MAX_ANGLES, MAX_KEY_FACTS};
use crate::prompts;
use crate::text::{clean_text, strip_list_marker, truncate_at_boundary, truncate_with_ellipsis};

/// Budget for the rendered source block, in bytes.
pub const SUMMARY_CONTEXT_CHARS: usize = 6000;
/// Per-hit snippet cap before the block budget is applied.
const SNIPPET_CHARS: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Summary,
    KeyFacts,
    Angles,
}

pub struct ResearchSummarizer {
    model: Arc<dyn CompletionModel>,
    context_chars: usize,
}

impl ResearchSummarizer {
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        Self {
            model,
            context_chars: SUMMARY_CONTEXT_CHARS,
        }
    }

    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    pub async fn summarize(&self, query: &ResearchQuery, results: &SearchResult) -> Result<Insight> {
        if results.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "No sources found for \"{}\". Try a broader topic or a longer time window.",
                query.topic()
            )));
        }

        let (sources_block, kept) = render_sources(results.hits(), self.context_chars);
        if kept < results.len() {
            info!(kept, dropped = results.len() - kept, "trimmed sources to fit context budget");
        }

        let prompt = prompts::research_prompt(query.topic(), &sources_block);
        let response = self.model.complete(&CompletionRequest::new(prompt)).await?;

        let insight = parse_insight(query.topic(), &response)?;
        info!(
            angles = insight.angles.len(),
            facts = insight.key_facts.len(),
            sentiment = insight.sentiment.label(),
            "research summarized"
        );
        Ok(insight)
    }
}

fn render_hit(index: usize, hit: &SearchHit) -> String {
    let mut block = format!("[{}] {}", index + 1, hit.title);
    match hit.published_at {
        Some(date) => block.push_str(&format!(" ({}, {})", hit.source, date.format("%B %-d, %Y"))),
        None => block.push_str(&format!(" ({})", hit.source)),
    }
    block.push('\n');
    if !hit.snippet.is_empty() {
        block.push_str(&truncate_with_ellipsis(&hit.snippet, SNIPPET_CHARS));
        block.push('\n');
    }
    block.push_str(&format!("URL: {}\n", hit.url));
    block
}

/// Render hits in rank order, dropping from the lowest-ranked end until the
/// block fits `budget`. The top hit always survives, cut down if it must be.
/// Returns the block and the number of hits kept.
pub fn render_sources(hits: &[SearchHit], budget: usize) -> (String, usize) {
    let blocks: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| render_hit(i, hit))
        .collect();

    let mut kept = blocks.len();
    let joined_len = |n: usize| blocks[..n].iter().map(|b| b.len() + 1).sum::<usize>();
    while kept > 1 && joined_len(kept) > budget {
        kept -= 1;
    }

    let rendered = blocks[..kept].join("\n");
    if rendered.len() > budget {
        return (truncate_at_boundary(&rendered, budget).to_string(), kept);
    }
    (rendered, kept)
}

fn section_header(line: &str) -> Option<(Section, &str)> {
    let bare = line.trim().trim_start_matches(['#', '*', ' ']);
    let upper = bare.to_uppercase();

    let headers = [
        ("SUMMARY:", Section::Summary),
        ("KEY FACTS:", Section::KeyFacts),
        ("ANGLES:", Section::Angles),
    ];
    for (prefix, section) in headers {
        if upper.starts_with(prefix) {
            let rest = bare[prefix.len()..].trim_start_matches('*').trim();
            return Some((section, rest));
        }
    }
    None
}

/// Parse the line-oriented reply described in the research prompt.
pub fn parse_insight(topic: &str, text: &str) -> Result<Insight> {
    let mut section = Section::Preamble;
    let mut sentiment = Sentiment::Neutral;
    let mut summary_lines: Vec<&str> = Vec::new();
    let mut key_facts = Vec::new();
    let mut angles = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let bare = trimmed.trim_start_matches(['#', '*', ' ']);
        if bare.to_uppercase().starts_with("SENTIMENT:") {
            sentiment = Sentiment::parse(bare["SENTIMENT:".len()..].trim_matches(['*', ' ']));
            continue;
        }

        if let Some((next, rest)) = section_header(trimmed) {
            section = next;
            if !rest.is_empty() && section == Section::Summary {
                summary_lines.push(rest);
            }
            continue;
        }

        match section {
            Section::Preamble => {}
            Section::Summary => summary_lines.push(trimmed),
            Section::KeyFacts => {
                let fact = strip_list_marker(trimmed).unwrap_or(trimmed);
                key_facts.push(fact.to_string());
            }
            Section::Angles => {
                let angle = strip_list_marker(trimmed).unwrap_or(trimmed);
                angles.push(angle.trim_matches('*').trim().to_string());
            }
        }
    }

    let summary = clean_text(&summary_lines.join(" "));
    if summary.is_empty() {
        return Err(AppError::Model(
            "Model response did not contain a SUMMARY section".to_string(),
        ));
    }

    key_facts.truncate(MAX_KEY_FACTS);
    angles.retain(|a: &String| !a.is_empty());
    angles.truncate(MAX_ANGLES);

    Ok(Insight {
        topic: topic.to_string(),
        summary,
        key_facts,
        sentiment,
        angles,
    })
}
