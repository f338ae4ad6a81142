//! Candidate name sequences.
//!
//! Each rename table owns its own generator; sequences are deterministic and
//! restart from the beginning on [`NameGenerator::reset`].

use crate::whitelist::keywords::is_language_keyword;

/// Characters used for the first position of ordered names.
const FIRST_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Characters used for subsequent positions.
const REST_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Which sequence to draw names from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NameStrategy {
    /// `a, b, ..., z, a0, b0, ..., z0, a1, ...`
    #[default]
    Ordered,
    /// Words in list order, then again with numeric suffixes `1, 2, ...`.
    Dictionary(Vec<String>),
}

/// Infinite, restartable sequence of candidate names.
#[derive(Debug, Clone)]
pub struct NameGenerator {
    strategy: NameStrategy,
    counter: usize,
    round: usize,
}

impl Default for NameGenerator {
    fn default() -> Self {
        Self::new(NameStrategy::Ordered)
    }
}

impl NameGenerator {
    #[must_use]
    pub fn new(strategy: NameStrategy) -> Self {
        let strategy = match strategy {
            NameStrategy::Dictionary(words) => {
                let words: Vec<String> = words.into_iter().filter(|w| is_identifier(w)).collect();
                if words.is_empty() {
                    tracing::warn!("name dictionary has no usable words, using ordered names");
                    NameStrategy::Ordered
                } else {
                    NameStrategy::Dictionary(words)
                }
            }
            NameStrategy::Ordered => NameStrategy::Ordered,
        };
        Self {
            strategy,
            counter: 0,
            round: 0,
        }
    }

    /// Next candidate that is not a language reserved word.
    pub fn next_name(&mut self) -> String {
        loop {
            let candidate = self.raw_next();
            if !is_language_keyword(&candidate) {
                return candidate;
            }
        }
    }

    /// Restart the sequence from its first element.
    pub fn reset(&mut self) {
        self.counter = 0;
        self.round = 0;
    }

    fn raw_next(&mut self) -> String {
        match &self.strategy {
            NameStrategy::Ordered => {
                let name = encode_name(self.counter);
                self.counter += 1;
                name
            }
            NameStrategy::Dictionary(words) => {
                let word = &words[self.counter];
                let name = if self.round == 0 {
                    word.clone()
                } else {
                    format!("{word}{}", self.round)
                };
                self.counter += 1;
                if self.counter == words.len() {
                    self.counter = 0;
                    self.round += 1;
                }
                name
            }
        }
    }
}

impl Iterator for NameGenerator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        Some(self.next_name())
    }
}

fn encode_name(mut n: usize) -> String {
    let first_len = FIRST_CHARS.len();
    let rest_len = REST_CHARS.len();

    let first_idx = n % first_len;
    n /= first_len;

    let mut name = String::with_capacity(4);
    name.push(FIRST_CHARS[first_idx] as char);

    while n > 0 {
        n -= 1;
        let idx = n % rest_len;
        n /= rest_len;
        name.push(REST_CHARS[idx] as char);
    }

    name
}

/// Whether `word` can be used verbatim as an identifier.
#[must_use]
pub fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordered_sequence() {
        let mut gen = NameGenerator::default();
        let names: Vec<String> = (0..29).map(|_| gen.next_name()).collect();
        assert_eq!(names[0], "a");
        assert_eq!(names[25], "z");
        assert_eq!(names[26], "a0");
        assert_eq!(names[27], "b0");
        assert_eq!(names[28], "c0");
    }

    #[test]
    fn test_ordered_names_unique() {
        let mut seen = std::collections::HashSet::new();
        for name in NameGenerator::default().take(5000) {
            assert!(seen.insert(name.clone()), "duplicate {name}");
        }
    }

    #[test]
    fn test_reserved_words_skipped() {
        let names: Vec<String> = NameGenerator::default().take(2000).collect();
        assert!(!names.iter().any(|n| n == "do" || n == "if" || n == "in"));
    }

    #[test]
    fn test_reset_restarts() {
        let mut gen = NameGenerator::default();
        gen.next_name();
        gen.next_name();
        gen.reset();
        assert_eq!(gen.next_name(), "a");
    }

    #[test]
    fn test_dictionary_cycles_with_suffix() {
        let words = vec!["alpha".to_string(), "if".to_string(), "9bad".to_string(), "beta".to_string()];
        let names: Vec<String> = NameGenerator::new(NameStrategy::Dictionary(words)).take(5).collect();
        assert_eq!(names, vec!["alpha", "beta", "alpha1", "if1", "beta1"]);
    }

    #[test]
    fn test_empty_dictionary_falls_back_to_ordered() {
        let mut gen = NameGenerator::new(NameStrategy::Dictionary(vec!["1x".into()]));
        assert_eq!(gen.next_name(), "a");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("_a$1"));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }
}
