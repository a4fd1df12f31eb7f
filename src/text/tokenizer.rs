//! Tokenization, prompt cleaning, and term frequency.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::stemmer::stem;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "is", "it", "as", "be", "was", "are", "been", "being", "have", "has", "had", "do",
        "does", "did", "will", "would", "could", "should", "may", "might", "can", "shall", "must",
        "this", "that", "these", "those", "i", "me", "my", "we", "our", "you", "your", "he", "she",
        "his", "her", "they", "them", "their", "what", "which", "who", "when", "where", "how",
        "why", "not", "no", "so", "if", "then", "than", "too", "very", "just", "about", "also",
        "into", "each", "all", "any", "some", "more", "most", "other", "up", "out", "its", "only",
        "own", "same", "there", "here", "am", "were", "while", "during", "before", "after",
        "above", "below", "between", "through", "again", "further", "once", "both", "such", "don",
        "didn", "doesn", "won", "isn", "aren", "wasn", "weren", "let", "need", "want", "like",
        "make", "think", "know", "see", "get", "got", "go", "going", "one", "two", "first", "new",
        "well", "now", "way", "even", "back", "much", "because", "thing", "things", "still", "us",
        "really", "right", "re", "ve", "ll", "said", "say", "use", "used",
    ]
    .into_iter()
    .collect()
});

/// XML-style blocks injected by editors and hooks, e.g. `<ide_selection>…</ide_selection>`.
static TAG_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<[a-z_-]+>.*?</[a-z_-]+>").expect("tag pattern is a valid regex")
});

/// Convert raw text into stemmed, filtered tokens.
///
/// Splits on everything except letters, digits, `-` and `_`, so compound
/// tokens such as `session-expiry` survive intact into the stemmer.
pub fn tokenize(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .filter(|raw| !raw.is_empty())
        .map(stem)
        .filter(|token| token.len() > 1 && !STOP_WORDS.contains(token.as_str()))
        .collect()
}

/// Strip editor/system tag blocks from a raw prompt and trim it.
pub fn clean_prompt(raw: &str) -> String {
    TAG_BLOCK.replace_all(raw, "").trim().to_string()
}

/// Normalized term frequencies: occurrences of each token divided by the token count.
pub fn term_frequency(tokens: &[String]) -> HashMap<&str, f64> {
    let mut tf: HashMap<&str, f64> = HashMap::with_capacity(tokens.len());
    for token in tokens {
        *tf.entry(token.as_str()).or_insert(0.0) += 1.0;
    }
    let n = tokens.len().max(1) as f64;
    for value in tf.values_mut() {
        *value /= n;
    }
    tf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(input: &str) -> Vec<String> {
        tokenize(input)
    }

    #[test]
    fn test_tokenize_empty() {
        assert!(toks("").is_empty());
    }

    #[test]
    fn test_tokenize_stop_words_only() {
        assert!(toks("the and or but in on at").is_empty());
    }

    #[test]
    fn test_tokenize_basic() {
        assert_eq!(
            toks("add JWT authentication to the API"),
            vec!["add", "jwt", "authentica", "api"]
        );
    }

    #[test]
    fn test_tokenize_keeps_hyphenated_compounds() {
        assert_eq!(
            toks("fix: the session-expiry bug!"),
            vec!["fix", "session-expiry", "bug"]
        );
    }

    #[test]
    fn test_tokenize_mixed_case() {
        assert_eq!(
            toks("Create UserProfile Component"),
            vec!["create", "userprofile", "component"]
        );
    }

    #[test]
    fn test_tokenize_numbers_preserved() {
        assert_eq!(
            toks("add base64 encoding to v2 api"),
            vec!["add", "base64", "encod", "v2", "api"]
        );
    }

    #[test]
    fn test_tokenize_drops_single_chars() {
        assert_eq!(toks("a b c real token"), vec!["real", "token"]);
    }

    #[test]
    fn test_tokenize_keeps_underscores() {
        assert_eq!(toks("rename user_id column"), vec!["rename", "user_id", "column"]);
    }

    #[test]
    fn test_clean_prompt_plain() {
        assert_eq!(clean_prompt("plain prompt text"), "plain prompt text");
    }

    #[test]
    fn test_clean_prompt_strips_ide_selection() {
        assert_eq!(
            clean_prompt("fix this <ide_selection>some code here</ide_selection> please"),
            "fix this  please"
        );
    }

    #[test]
    fn test_clean_prompt_strips_system_reminder() {
        assert_eq!(
            clean_prompt("<system-reminder>hook output</system-reminder>actual prompt"),
            "actual prompt"
        );
    }

    #[test]
    fn test_clean_prompt_multiple_and_multiline_tags() {
        assert_eq!(
            clean_prompt(
                "<ide_opened_file>foo.js\nline two</ide_opened_file>fix bug<system-reminder>x</system-reminder>"
            ),
            "fix bug"
        );
    }

    #[test]
    fn test_clean_prompt_trims() {
        assert_eq!(clean_prompt("  hello world  "), "hello world");
    }

    #[test]
    fn test_term_frequency() {
        let tokens: Vec<String> = ["auth", "token", "auth", "jwt"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let tf = term_frequency(&tokens);
        assert_eq!(tf["auth"], 0.5);
        assert_eq!(tf["token"], 0.25);
        assert_eq!(tf["jwt"], 0.25);
    }

    #[test]
    fn test_term_frequency_empty() {
        assert!(term_frequency(&[]).is_empty());
    }
}
