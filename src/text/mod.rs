//! Text normalization shared by prompts, stored node content, and response summaries.
//!
//! All three go through [`tokenize`] so they land in one vocabulary.

mod stemmer;
mod tokenizer;

pub use stemmer::stem;
pub use tokenizer::{clean_prompt, term_frequency, tokenize};

/// Longest prefix of `s` holding at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// `s` cut to `max_chars` characters, with `...` appended when anything was cut.
pub fn ellipsize(s: &str, max_chars: usize) -> String {
    let head = truncate_chars(s, max_chars);
    if head.len() < s.len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}
