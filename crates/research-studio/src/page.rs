use shared::{Insight, PostDraft, PostStyle, ResearchSession, SearchResult, SessionPhase};

/// Look-back windows offered in the research form, in days.
pub const DAYS_BACK_OPTIONS: [u32; 4] = [7, 14, 30, 90];

pub struct PageContext<'a> {
    pub session: &'a ResearchSession,
    /// Names of the enabled search sources
    pub sources: &'a [&'a str],
    pub model_name: &'a str,
    pub default_days_back: u32,
}

pub fn render(ctx: &PageContext<'_>) -> String {
    let session = ctx.session;
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("  <meta charset=\"UTF-8\">\n");
    html.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str("  <title>Research-to-Post Studio</title>\n");
    html.push_str("  <style>\n");
    html.push_str("    body { font-family: Arial, sans-serif; max-width: 900px; margin: 40px auto; padding: 0 20px; line-height: 1.6; }\n");
    html.push_str("    h1 { color: #2c3e50; border-bottom: 3px solid #0a66c2; padding-bottom: 10px; }\n");
    html.push_str("    h2 { color: #34495e; margin: 30px 0 10px 0; padding: 8px 10px; background-color: #ecf0f1; border-left: 4px solid #0a66c2; }\n");
    html.push_str("    .metadata { color: #7f8c8d; font-size: 0.9em; }\n");
    html.push_str("    .banner { padding: 10px 15px; margin: 20px 0; border-radius: 4px; background-color: #fdecea; color: #b71c1c; border-left: 4px solid #e74c3c; }\n");
    html.push_str("    .sentiment { display: inline-block; padding: 2px 10px; border-radius: 10px; background-color: #ecf0f1; }\n");
    html.push_str("    .link { color: #0a66c2; text-decoration: none; }\n");
    html.push_str("    textarea { width: 100%; min-height: 320px; font-family: inherit; font-size: 1em; }\n");
    html.push_str("    input[type=text] { width: 70%; padding: 6px; }\n");
    html.push_str("    button { padding: 6px 14px; cursor: pointer; }\n");
    html.push_str("    li { margin: 6px 0; }\n");
    html.push_str("  </style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<h1>Research-to-Post Studio</h1>\n");
    html.push_str(&format!(
        "<p class=\"metadata\">Model: {} &middot; Sources: {}</p>\n",
        escape_html(ctx.model_name),
        if ctx.sources.is_empty() {
            "none enabled".to_string()
        } else {
            escape_html(&ctx.sources.join(", "))
        }
    ));

    if let Some(message) = session.last_error() {
        html.push_str(&format!(
            "<div class=\"banner\" role=\"alert\">{}</div>\n",
            escape_html(message)
        ));
    }

    render_research_form(&mut html, ctx);

    if let (Some(insight), Some(results)) = (session.insight(), session.results()) {
        render_insight(&mut html, insight, results);
        render_post_form(&mut html, insight, session.draft());
    }

    if let Some(draft) = session.draft() {
        render_draft(&mut html, draft);
    }

    if session.phase() != SessionPhase::Idle {
        html.push_str("<hr>\n");
        html.push_str("<form method=\"post\" action=\"/reset\"><button type=\"submit\">Start New Research</button></form>\n");
    }

    html.push_str("</body>\n</html>");
    html
}

fn render_research_form(html: &mut String, ctx: &PageContext<'_>) {
    let topic = ctx.session.query().map(|q| q.topic()).unwrap_or_default();
    let selected_days = ctx
        .session
        .query()
        .and_then(|q| q.filters().days_back)
        .unwrap_or(ctx.default_days_back);

    html.push_str("<h2>1. Research</h2>\n");
    html.push_str("<form method=\"post\" action=\"/research\">\n");
    html.push_str(&format!(
        "  <input type=\"text\" name=\"topic\" placeholder=\"e.g. electric vehicles\" value=\"{}\" required>\n",
        escape_html(topic)
    ));
    html.push_str("  <select name=\"days_back\">\n");
    for days in DAYS_BACK_OPTIONS {
        let selected = if days == selected_days { " selected" } else { "" };
        html.push_str(&format!(
            "    <option value=\"{}\"{}>Last {} days</option>\n",
            days, selected, days
        ));
    }
    html.push_str("  </select>\n");
    html.push_str("  <button type=\"submit\">Start Research</button>\n");
    html.push_str("</form>\n");
}

fn render_insight(html: &mut String, insight: &Insight, results: &SearchResult) {
    html.push_str("<h2>2. Insight</h2>\n");
    html.push_str(&format!(
        "<p><span class=\"sentiment\">Sentiment: {}</span></p>\n",
        insight.sentiment.label()
    ));
    html.push_str(&format!("<p>{}</p>\n", escape_html(&insight.summary)));

    if !insight.key_facts.is_empty() {
        html.push_str("<h3>Key facts</h3>\n<ul>\n");
        for fact in &insight.key_facts {
            html.push_str(&format!("  <li>{}</li>\n", escape_html(fact)));
        }
        html.push_str("</ul>\n");
    }

    html.push_str(&format!(
        "<details>\n  <summary>Sources ({})</summary>\n  <ol>\n",
        results.len()
    ));
    for hit in results.hits() {
        let date = hit
            .published_at
            .map(|d| format!(", {}", d.format("%B %-d, %Y")))
            .unwrap_or_default();
        html.push_str(&format!(
            "    <li><a href=\"{}\" class=\"link\" target=\"_blank\" rel=\"noopener\">{}</a> <span class=\"metadata\">({}{})</span></li>\n",
            escape_html(&hit.url),
            escape_html(&hit.title),
            escape_html(&hit.source),
            date
        ));
    }
    html.push_str("  </ol>\n</details>\n");
}

fn render_post_form(html: &mut String, insight: &Insight, draft: Option<&PostDraft>) {
    let chosen_angle = draft.map(|d| d.angle.as_str());
    let chosen_style = draft.map(|d| d.style).unwrap_or_default();

    html.push_str("<h2>3. Angle and style</h2>\n");
    html.push_str("<form method=\"post\" action=\"/generate\">\n");

    if insight.angles.is_empty() {
        html.push_str("  <p class=\"metadata\">No angles were suggested. Write your own below.</p>\n");
    }
    for (i, angle) in insight.angles.iter().enumerate() {
        let checked = match chosen_angle {
            Some(chosen) => chosen == angle,
            None => i == 0,
        };
        html.push_str(&format!(
            "  <label><input type=\"radio\" name=\"angle\" value=\"{}\"{}> {}</label><br>\n",
            escape_html(angle),
            if checked { " checked" } else { "" },
            escape_html(angle)
        ));
    }
    html.push_str("  <p><input type=\"text\" name=\"custom_angle\" placeholder=\"Or write your own angle\"></p>\n");

    html.push_str("  <select name=\"style\">\n");
    for style in PostStyle::ALL {
        let selected = if style == chosen_style { " selected" } else { "" };
        html.push_str(&format!(
            "    <option value=\"{}\"{}>{}</option>\n",
            style.slug(),
            selected,
            style.label()
        ));
    }
    html.push_str("  </select>\n");
    html.push_str("  <button type=\"submit\">Generate Post</button>\n");
    html.push_str("</form>\n");
}

fn render_draft(html: &mut String, draft: &PostDraft) {
    html.push_str("<h2>4. Your post</h2>\n");
    html.push_str(&format!(
        "<p class=\"metadata\">{} &middot; version {} &middot; {} characters</p>\n",
        draft.style.label(),
        draft.version,
        draft.body.chars().count()
    ));
    html.push_str("<form method=\"post\" action=\"/edit\">\n");
    html.push_str(&format!(
        "  <textarea name=\"body\">{}</textarea>\n",
        escape_html(&draft.body)
    ));
    html.push_str("  <p>\n");
    html.push_str("    <button type=\"submit\">Save Edits</button>\n");
    html.push_str("    <button type=\"submit\" formaction=\"/regenerate\">Regenerate</button>\n");
    html.push_str("    <button type=\"submit\" formaction=\"/hook\">Improve Hook</button>\n");
    html.push_str("    <button type=\"submit\" formaction=\"/download\">Download .txt</button>\n");
    html.push_str("  </p>\n");
    html.push_str("</form>\n");
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{AppError, Sentiment};
    use uuid::Uuid;

    fn context<'a>(session: &'a ResearchSession) -> PageContext<'a> {
        PageContext {
            session,
            sources: &["NewsAPI", "Web"],
            model_name: "gpt-3.5-turbo",
            default_days_back: 30,
        }
    }

    // ========================================================================
    // HTML escaping
    // ========================================================================

    #[test]
    fn test_escape_html_combined() {
        assert_eq!(
            escape_html("<a href=\"x\">Tom & Jerry's</a>"),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    // ========================================================================
    // Page sections
    // ========================================================================

    #[test]
    fn test_idle_page_has_only_research_form() {
        let session = ResearchSession::new(Uuid::new_v4());
        let html = render(&context(&session));

        assert!(html.contains("action=\"/research\""));
        assert!(!html.contains("action=\"/generate\""));
        assert!(!html.contains("action=\"/reset\""));
        assert!(!html.contains("class=\"banner\""));
        assert!(html.contains("Sources: NewsAPI, Web"));
        assert!(html.contains("<option value=\"30\" selected>"));
    }

    #[test]
    fn test_error_banner_is_escaped() {
        let mut session = ResearchSession::new(Uuid::new_v4());
        session.record_error(&AppError::InvalidInput("<script>".to_string()));
        let html = render(&context(&session));

        assert!(html.contains("class=\"banner\""));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_post_form_lists_every_style_and_angle() {
        let insight = Insight {
            topic: "ev".to_string(),
            summary: "Summary".to_string(),
            key_facts: vec![],
            sentiment: Sentiment::Neutral,
            angles: vec!["First".to_string(), "Second".to_string()],
        };
        let mut html = String::new();
        render_post_form(&mut html, &insight, None);

        for style in PostStyle::ALL {
            assert!(html.contains(&format!("value=\"{}\"", style.slug())));
        }
        assert!(html.contains("value=\"First\" checked"));
        assert!(html.contains("value=\"Second\">"));
        assert!(html.contains("name=\"custom_angle\""));
    }

    #[test]
    fn test_post_form_without_angles_invites_custom_angle() {
        let insight = Insight {
            topic: "ev".to_string(),
            summary: "Summary".to_string(),
            key_facts: vec![],
            sentiment: Sentiment::Neutral,
            angles: vec![],
        };
        let mut html = String::new();
        render_post_form(&mut html, &insight, None);
        assert!(html.contains("Write your own below"));
        assert!(!html.contains("type=\"radio\""));
    }

    #[test]
    fn test_draft_shows_version_and_actions() {
        let draft = PostDraft {
            style: PostStyle::EducationalExplainer,
            angle: "Charging".to_string(),
            body: "Line one\n#EV".to_string(),
            version: 2,
        };
        let mut html = String::new();
        render_draft(&mut html, &draft);

        assert!(html.contains("Educational Explainer &middot; version 2"));
        assert!(html.contains("<textarea name=\"body\">Line one\n#EV</textarea>"));
        assert!(!html.contains("readonly"));
        assert!(html.contains("<form method=\"post\" action=\"/edit\">"));
        assert!(html.contains("formaction=\"/regenerate\""));
        assert!(html.contains("formaction=\"/hook\""));
        assert!(html.contains("formaction=\"/download\""));
    }
}
