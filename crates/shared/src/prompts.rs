//! Prompt templates. Everything the user or a search provider typed goes into
//! a fenced section of a fixed template; nothing is spliced into the
//! instructions themselves.

use crate::models::PostStyle;

/// Instructions and sampling for one post style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleTemplate {
    pub style: PostStyle,
    pub role: &'static str,
    pub structure: &'static [&'static str],
    pub tone: &'static str,
    pub length: &'static str,
    pub temperature: f32,
    /// Appended when the model forgets hashtags.
    pub default_hashtags: &'static [&'static str],
}

const NEWS_ANALYSIS: StyleTemplate = StyleTemplate {
    style: PostStyle::NewsAnalysis,
    role: "You are writing a LinkedIn post analyzing recent news.",
    structure: &[
        "Lead with the news (what happened)",
        "Why it matters (2-3 points)",
        "Implications for the industry",
        "Your perspective or prediction",
        "Engagement question",
    ],
    tone: "Analytical but accessible",
    length: "150-200 words",
    temperature: 0.7,
    default_hashtags: &["#News", "#Industry"],
};

const EDUCATIONAL: StyleTemplate = StyleTemplate {
    style: PostStyle::EducationalExplainer,
    role: "You are writing an educational LinkedIn post to teach something.",
    structure: &[
        "Hook: common misconception or question",
        "Clear explanation (use analogies if helpful)",
        "Practical example",
        "Key takeaway",
        "Ask readers about their experience",
    ],
    tone: "Friendly teacher, not condescending",
    length: "150-250 words",
    temperature: 0.7,
    default_hashtags: &["#Learning", "#Explained"],
};

const OPINION: StyleTemplate = StyleTemplate {
    style: PostStyle::PersonalOpinion,
    role: "You are sharing a personal opinion or hot take on LinkedIn.",
    structure: &[
        "Bold opening statement (your opinion)",
        "Context (why you're talking about this)",
        "Your reasoning (2-3 points)",
        "Acknowledge other perspectives",
        "Invite debate and discussion",
    ],
    tone: "Confident but respectful",
    length: "150-200 words",
    temperature: 0.8,
    default_hashtags: &["#Opinion", "#Leadership"],
};

const ENGAGEMENT: StyleTemplate = StyleTemplate {
    style: PostStyle::EngagementQuestion,
    role: "You are creating a LinkedIn post to spark conversation.",
    structure: &[
        "Present an interesting question or scenario",
        "Provide context (1-2 paragraphs)",
        "Show different perspectives",
        "Ask for audience input",
    ],
    tone: "Curious and inviting",
    length: "100-150 words",
    temperature: 0.7,
    default_hashtags: &["#Discussion", "#Community"],
};

const TREND: StyleTemplate = StyleTemplate {
    style: PostStyle::TrendPrediction,
    role: "You are writing a LinkedIn post predicting future trends.",
    structure: &[
        "What's happening now",
        "Why it matters",
        "What's coming next (prediction)",
        "How to prepare",
        "Engagement question",
    ],
    tone: "Forward-looking and grounded in the research",
    length: "150-200 words",
    temperature: 0.8,
    default_hashtags: &["#FutureOfWork", "#Trends"],
};

impl PostStyle {
    pub fn template(&self) -> &'static StyleTemplate {
        match self {
            PostStyle::NewsAnalysis => &NEWS_ANALYSIS,
            PostStyle::EducationalExplainer => &EDUCATIONAL,
            PostStyle::PersonalOpinion => &OPINION,
            PostStyle::EngagementQuestion => &ENGAGEMENT,
            PostStyle::TrendPrediction => &TREND,
        }
    }
}

/// Rewrite instructions for regeneration, picked by draft version.
pub const REGENERATE_VARIATIONS: [&str; 4] = [
    "Make it shorter and punchier: cut anything that is not essential.",
    "Make it bolder: open with a stronger, more surprising hook.",
    "Use a different angle into the same point, with different examples.",
    "Make it more personal: write as a practitioner sharing a lesson learned.",
];

pub fn regenerate_variation(version: u32) -> &'static str {
    let index = (version as usize).saturating_sub(2) % REGENERATE_VARIATIONS.len();
    REGENERATE_VARIATIONS[index]
}

pub const RESEARCH_INSTRUCTIONS: &str = r#"You are a research analyst. Analyze the sources below about the topic and respond in EXACTLY this format:

SENTIMENT: <one word: Positive, Negative, or Neutral>
SUMMARY:
<2-4 sentences: the main insights and what they mean>
KEY FACTS:
- <fact, one sentence>
- <up to 5 facts>
ANGLES:
1. <one-sentence angle for a LinkedIn post>
2. <up to 5 angles>

RULES:
1. Use ONLY the sources below - no external knowledge
2. Be concise and focus on actionable insights
3. Do not add any text outside the four sections"#;

pub const HOOK_INSTRUCTIONS: &str = r#"Improve this opening line for a LinkedIn post.
Make it more attention-grabbing. Use curiosity, surprise, or a bold statement.
Return only the improved hook (one line), with no quotes or commentary."#;

pub const POST_GUIDELINES: [&str; 5] = [
    "Start with a hook (first line must grab attention)",
    "Use short paragraphs (2-3 lines max)",
    "Include relevant emojis (but don't overdo it)",
    "End with an engagement question or call-to-action",
    "Add 3-5 relevant hashtags at the end",
];

/// Wrap untrusted text in a labeled fence.
pub fn fenced(label: &str, content: &str) -> String {
    format!("<<<{label}\n{}\n{label}>>>", content.trim())
}

pub fn research_prompt(topic: &str, sources_block: &str) -> String {
    format!(
        "{}\n\n{}\n\n{}",
        RESEARCH_INSTRUCTIONS,
        fenced("TOPIC", topic),
        fenced("SOURCES", sources_block)
    )
}

pub struct PostContext<'a> {
    pub topic: &'a str,
    pub angle: &'a str,
    pub summary: &'a str,
    pub key_facts: &'a [String],
}

pub fn post_prompt(template: &StyleTemplate, ctx: &PostContext<'_>) -> String {
    let mut prompt = String::new();

    prompt.push_str(template.role);
    prompt.push_str("\n\nStructure:\n");
    for (i, step) in template.structure.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, step));
    }
    prompt.push_str(&format!("\nTone: {}\n", template.tone));
    prompt.push_str(&format!("Length: {}\n", template.length));
    prompt.push_str("\nGuidelines:\n");
    for line in POST_GUIDELINES {
        prompt.push_str(&format!("- {}\n", line));
    }

    prompt.push('\n');
    prompt.push_str(&fenced("TOPIC", ctx.topic));
    prompt.push('\n');
    prompt.push_str(&fenced("ANGLE", ctx.angle));
    prompt.push('\n');
    prompt.push_str(&fenced("RESEARCH", ctx.summary));
    if !ctx.key_facts.is_empty() {
        let facts = ctx
            .key_facts
            .iter()
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n");
        prompt.push('\n');
        prompt.push_str(&fenced("KEY FACTS", &facts));
    }
    prompt.push_str("\n\nWrite the post now. Return only the post text.");
    prompt
}

pub fn regenerate_prompt(
    template: &StyleTemplate,
    ctx: &PostContext<'_>,
    previous_body: &str,
    variation: &str,
) -> String {
    format!(
        "{}\n\nThe previous draft below needs to be rewritten.\n{}\n\nRewrite instruction: {}\nKeep the same style and angle, but do not reuse the previous opening line.",
        post_prompt(template, ctx),
        fenced("PREVIOUS DRAFT", previous_body),
        variation
    )
}

pub fn hook_prompt(topic: &str, current_hook: &str) -> String {
    format!(
        "{}\n\n{}\n{}",
        HOOK_INSTRUCTIONS,
        fenced("TOPIC", topic),
        fenced("CURRENT HOOK", current_hook)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> PostContext<'static> {
        PostContext {
            topic: "electric vehicles",
            angle: "Charging is the bottleneck",
            summary: "EV sales rose.",
            key_facts: &[],
        }
    }

    #[test]
    fn test_every_style_has_its_own_template() {
        for style in PostStyle::ALL {
            assert_eq!(style.template().style, style);
        }
    }

    #[test]
    fn test_post_prompt_uses_only_selected_template() {
        for style in PostStyle::ALL {
            let prompt = post_prompt(style.template(), &ctx());
            assert!(prompt.contains(style.template().role));
            for other in PostStyle::ALL.iter().filter(|o| **o != style) {
                assert!(
                    !prompt.contains(other.template().role),
                    "{:?} prompt leaked {:?} instructions",
                    style,
                    other
                );
            }
        }
    }

    #[test]
    fn test_user_text_is_fenced() {
        let prompt = post_prompt(NEWS_ANALYSIS.style.template(), &ctx());
        assert!(prompt.contains("<<<ANGLE\nCharging is the bottleneck\nANGLE>>>"));
        assert!(prompt.contains("<<<TOPIC\nelectric vehicles\nTOPIC>>>"));
    }

    #[test]
    fn test_regenerate_variation_cycles_from_version_two() {
        assert_eq!(regenerate_variation(2), REGENERATE_VARIATIONS[0]);
        assert_eq!(regenerate_variation(3), REGENERATE_VARIATIONS[1]);
        assert_eq!(regenerate_variation(6), REGENERATE_VARIATIONS[0]);
    }

    #[test]
    fn test_research_prompt_contains_sections() {
        let prompt = research_prompt("ev", "[1] A");
        assert!(prompt.contains("SENTIMENT:"));
        assert!(prompt.contains("ANGLES:"));
        assert!(prompt.contains("<<<SOURCES\n[1] A\nSOURCES>>>"));
    }
}
