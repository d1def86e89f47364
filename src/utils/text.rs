// Text processing utilities

/// String manipulation utilities
pub mod string {
    /// Truncate text to at most `max_chars` characters, marking the cut with an ellipsis
    pub fn truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        if max_chars <= 3 {
            return "...".to_string();
        }

        let kept: String = text.chars().take(max_chars - 3).collect();
        format!("{}...", kept)
    }

    /// Case-insensitive substring test
    pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }

    /// Clean and normalize whitespace
    pub fn normalize_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Markdown slicing utilities
pub mod markdown {
    /// Drop everything before the first occurrence of `marker`; unchanged when absent
    pub fn keep_from<'a>(text: &'a str, marker: &str) -> &'a str {
        match text.find(marker) {
            Some(index) => &text[index..],
            None => text,
        }
    }

    /// Drop `marker` and everything after it; unchanged when absent
    pub fn cut_at<'a>(text: &'a str, marker: &str) -> &'a str {
        match text.find(marker) {
            Some(index) => &text[..index],
            None => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(string::truncate("Hello World", 8), "Hello...");
        assert_eq!(string::truncate("Hi", 10), "Hi");
        assert_eq!(string::truncate("abcdef", 2), "...");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "ééééééééé";
        assert_eq!(string::truncate(text, 5), "éé...");
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(string::contains_ignore_case("Requires a DeepWiki Account", "requires a deepwiki account"));
        assert!(!string::contains_ignore_case("public", "private"));
    }

    #[test]
    fn test_markdown_slicing() {
        let text = "preamble\n## Project Overview\nbody\nWiki pages you might want to explore:\n- a";
        let kept = markdown::keep_from(text, "## Project Overview");
        assert!(kept.starts_with("## Project Overview"));

        let cut = markdown::cut_at(kept, "Wiki pages you might want to explore:");
        assert_eq!(cut, "## Project Overview\nbody\n");

        assert_eq!(markdown::keep_from("plain", "missing"), "plain");
        assert_eq!(markdown::cut_at("plain", "missing"), "plain");
    }
}
