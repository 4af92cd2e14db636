use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s']").unwrap());
static WORD_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());
static APOSTROPHE_TRIM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^'+|'+$").unwrap());

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "am", "and", "or", "but", "if",
    "then", "so", "than", "that", "this", "these", "those", "it", "its", "i", "me", "my", "you",
    "your", "we", "our", "they", "their", "he", "she", "his", "her", "what", "which", "who",
    "whom", "how", "why", "when", "where", "can", "could", "would", "should", "will", "do",
    "does", "did", "have", "has", "had", "not", "no", "yes", "please", "there", "any", "some",
];

const ACTION_WORDS: &[&str] = &[
    "tell", "know", "explain", "want", "need", "like", "help", "show", "give", "find", "get",
    "make", "describe", "learn", "understand",
];

const PREPOSITIONS: &[&str] = &[
    "about", "of", "in", "on", "for", "with", "to", "from", "at", "by", "into", "over", "under",
];

/// Tokenize text into lowercase words.
/// Preserves apostrophes within words (e.g., "dog's").
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned = NON_WORD.replace_all(text, " ");
    cleaned
        .to_lowercase()
        .split_whitespace()
        .map(|t| APOSTROPHE_TRIM.replace_all(t, "").to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Lowercase words split on every non-word boundary, keeping only words
/// longer than two characters. Used for literal context matching.
pub fn context_words(text: &str) -> HashSet<String> {
    WORD_BOUNDARY
        .split(&text.to_lowercase())
        .filter(|w| w.chars().count() > 2)
        .map(str::to_string)
        .collect()
}

/// Up to `limit` content keywords, most frequent first; ties keep
/// first-seen order. Stop words, action words and prepositions are removed.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for token in WORD_BOUNDARY.split(&text.to_lowercase()) {
        if token.chars().count() <= 2
            || STOP_WORDS.contains(&token)
            || ACTION_WORDS.contains(&token)
            || PREPOSITIONS.contains(&token)
        {
            continue;
        }
        let count = counts.entry(token.to_string()).or_default();
        if *count == 0 {
            order.push(token.to_string());
        }
        *count += 1;
    }

    // Stable sort keeps first-seen order among equal counts
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.truncate(limit);
    order
}

/// Uppercase first character, as used for proper-name detection.
pub fn starts_uppercase(value: &str) -> bool {
    value.chars().next().is_some_and(char::is_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_tokenize() {
        assert_eq!(tokenize("Hello, world!"), vec!["hello", "world"]);
    }

    #[test]
    fn test_possessive_preserved() {
        assert_eq!(tokenize("My dog's name"), vec!["my", "dog's", "name"]);
    }

    #[test]
    fn test_quotes_stripped() {
        assert_eq!(tokenize("'hello' 'world'"), vec!["hello", "world"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \t\n ").is_empty());
    }

    #[test]
    fn test_context_words_drop_short_tokens() {
        let words = context_words("My dog is a Labrador, OK?");
        assert!(words.contains("dog"));
        assert!(words.contains("labrador"));
        assert!(!words.contains("is"));
        assert!(!words.contains("ok"));
    }

    #[test]
    fn test_keywords_filter_function_words() {
        let kw = extract_keywords("Can you tell me about quantum physics?", 3);
        assert_eq!(kw, vec!["quantum", "physics"]);
    }

    #[test]
    fn test_keywords_rank_by_frequency() {
        let kw = extract_keywords("gardens need water; roses need water and sun", 3);
        assert_eq!(kw[0], "water");
        assert_eq!(kw.len(), 3);
    }

    #[test]
    fn test_keywords_empty_when_only_function_words() {
        assert!(extract_keywords("what is it about?", 3).is_empty());
    }

    #[test]
    fn test_starts_uppercase() {
        assert!(starts_uppercase("Buddy"));
        assert!(!starts_uppercase("buddy"));
        assert!(!starts_uppercase(""));
    }
}
