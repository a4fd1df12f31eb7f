//! Lightweight two-pass suffix stemmer.

/// Derivational suffixes, longest first so the first hit is the longest match.
///
/// `-er` is not in the list: container, server, computer and docker are roots,
/// not derivations.
const DERIVATIONAL_SUFFIXES: &[&str] = &[
    "ization", "ising", "izing", "ional", "ment", "ness", "less", "able", "ible", "tion", "sion",
    "ling", "ally", "ful", "ous", "ive", "ing", "ed", "ly",
];

/// Stem a lowercase word.
///
/// Pass 1 strips plurals (`-ies` → `-y`, `-es`, `-s`, never after another `s`).
/// Pass 2 strips at most one derivational suffix. Words shorter than four
/// bytes are returned unchanged.
pub fn stem(word: &str) -> String {
    if word.len() < 4 {
        return word.to_string();
    }

    let bytes = word.as_bytes();
    let len = bytes.len();

    let singular: String = if len > 4 && word.ends_with("ies") {
        format!("{}y", &word[..len - 3])
    } else if len > 4 && word.ends_with("es") && bytes[len - 3] != b's' {
        word[..len - 2].to_string()
    } else if len > 3 && bytes[len - 1] == b's' && bytes[len - 2] != b's' {
        word[..len - 1].to_string()
    } else {
        word.to_string()
    };

    for suffix in DERIVATIONAL_SUFFIXES {
        if singular.len() > suffix.len() + 2 && singular.ends_with(suffix) {
            return singular[..singular.len() - suffix.len()].to_string();
        }
    }

    singular
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_stems(cases: &[(&str, &str)]) {
        for (input, expected) in cases {
            assert_eq!(stem(input), *expected, "stem({input:?})");
        }
    }

    #[test]
    fn test_short_words_unchanged() {
        assert_stems(&[("the", "the"), ("go", "go"), ("api", "api")]);
    }

    #[test]
    fn test_plural_ies() {
        assert_stems(&[("dependencies", "dependency"), ("queries", "query")]);
    }

    #[test]
    fn test_plural_es_not_after_s() {
        assert_stems(&[
            ("matches", "match"),
            ("processes", "processe"),
            ("classes", "classe"),
        ]);
    }

    #[test]
    fn test_plural_s() {
        assert_stems(&[
            ("containers", "container"),
            ("tokens", "token"),
            ("less", "less"),
        ]);
    }

    #[test]
    fn test_derivational_suffixes() {
        assert_stems(&[
            ("containerization", "container"),
            ("optimization", "optim"),
            ("deployment", "deploy"),
            ("management", "manage"),
            ("readiness", "readi"),
            ("processing", "process"),
            ("running", "runn"),
            ("configurable", "configur"),
            ("accessible", "access"),
            ("quickly", "quick"),
        ]);
    }

    #[test]
    fn test_er_is_kept() {
        assert_stems(&[
            ("server", "server"),
            ("container", "container"),
            ("computer", "computer"),
            ("docker", "docker"),
            ("water", "water"),
        ]);
    }

    #[test]
    fn test_both_passes() {
        assert_stems(&[("authentications", "authentica"), ("authentication", "authentica")]);
    }

    #[test]
    fn test_non_ascii_word_does_not_panic() {
        // Multi-byte letters before an ASCII suffix keep slicing on char boundaries.
        assert_eq!(stem("éléments"), "élé");
        assert_eq!(stem("naïve"), "naïve");
    }
}
