use scraper::Html;

/// Collapse runs of whitespace into single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop any markup and return the visible text, whitespace-collapsed.
pub fn strip_html(text: &str) -> String {
    if !text.contains('<') {
        return clean_text(text);
    }
    let fragment = Html::parse_fragment(text);
    let visible: String = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    clean_text(&visible)
}

/// Truncate to at most `max_bytes`, respecting UTF-8 boundaries.
pub fn truncate_at_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Like [`truncate_at_boundary`] but marks the cut with an ellipsis.
pub fn truncate_with_ellipsis(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    format!("{}...", truncate_at_boundary(text, max_bytes).trim_end())
}

/// Strip a leading list marker ("1.", "2)", "-", "*", "•") from a line.
pub fn strip_list_marker(line: &str) -> Option<&str> {
    let trimmed = line.trim();

    // "2024 sales ..." and "1.5 million ..." are content, not markers
    let digits = trimmed.len() - trimmed.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let after = trimmed[digits..].strip_prefix(['.', ')'])?;
        if !after.starts_with(char::is_whitespace) {
            return None;
        }
        let stripped = after.trim();
        return (!stripped.is_empty()).then_some(stripped);
    }

    for marker in ['-', '*', '•'] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            let stripped = rest.trim();
            return (!stripped.is_empty()).then_some(stripped);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a\n\tb   c "), "a b c");
    }

    #[test]
    fn test_strip_html_removes_tags() {
        assert_eq!(
            strip_html("<p>EV sales <b>doubled</b> in 2024</p>"),
            "EV sales doubled in 2024"
        );
    }

    #[test]
    fn test_strip_html_plain_text_untouched() {
        assert_eq!(strip_html("no  markup here"), "no markup here");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // "é" is two bytes; cutting at 1 would split it
        assert_eq!(truncate_at_boundary("é", 1), "");
        assert_eq!(truncate_at_boundary("abc", 10), "abc");
        assert_eq!(truncate_at_boundary("abcdef", 3), "abc");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("hello world", 5), "hello...");
        assert_eq!(truncate_with_ellipsis("short", 50), "short");
    }

    #[test]
    fn test_strip_list_marker_variants() {
        assert_eq!(strip_list_marker("1. First"), Some("First"));
        assert_eq!(strip_list_marker("12) Twelfth"), Some("Twelfth"));
        assert_eq!(strip_list_marker("- dash"), Some("dash"));
        assert_eq!(strip_list_marker("• bullet"), Some("bullet"));
        assert_eq!(strip_list_marker("* star"), Some("star"));
        assert_eq!(strip_list_marker("plain line"), None);
        assert_eq!(strip_list_marker("-"), None);
    }

    #[test]
    fn test_strip_list_marker_keeps_leading_numbers() {
        assert_eq!(strip_list_marker("2024 sales hit 14 million units"), None);
        assert_eq!(strip_list_marker("1.5 million EVs were sold"), None);
        assert_eq!(strip_list_marker("3.Missing space"), None);
        assert_eq!(strip_list_marker("3. 2024 was a record"), Some("2024 was a record"));
    }
}
