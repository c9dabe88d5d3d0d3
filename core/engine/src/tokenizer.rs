use regex::Regex;
use tracing::debug;

/// Splits free text into word and punctuation tokens.
///
/// Words keep internal hyphens and apostrophes (`acme-2`, `don't`);
/// any other punctuation character becomes a token of its own.
/// Case is preserved because matching is exact.
pub struct Tokenizer {
    pattern: Regex,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"\w+(?:['\-]\w+)*|[^\w\s]").unwrap(),
        }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let tokens: Vec<String> = self
            .pattern
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();

        debug!("tokens: {:?}", tokens);
        tokens
    }
}
