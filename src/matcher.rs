//! Keyword matching against entry text.
//!
//! Rules are literal keywords or phrases, matched case-insensitively. The
//! default [`MatchMode::WordBoundary`] only accepts whole-word occurrences, so
//! `cat` does not match inside `Scattered`. [`MatchMode::Substring`] is the
//! looser opt-in mode.
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchError {
    /// Keyword could not be compiled (only reachable through the regex size limit).
    #[error("Invalid keyword rule '{rule}': {source}")]
    InvalidRule {
        rule: String,
        #[source]
        source: regex::Error,
    },
}

/// How a keyword must appear in the text to count as a match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Whole word or phrase only.
    #[default]
    WordBoundary,
    /// Anywhere in the text, including inside longer words.
    Substring,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    keyword: String,
    pattern: Regex,
}

/// A compiled set of keyword rules.
///
/// Compile once per invocation. Cloning shares the compiled rules, so each
/// feed task can hold its own handle; matching is pure and takes `&self`.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    rules: Arc<[CompiledRule]>,
    mode: MatchMode,
}

impl KeywordMatcher {
    /// Compiles `rules` in the order given.
    ///
    /// Blank rules are dropped. Rules that differ only by case are collapsed
    /// to the first occurrence.
    pub fn new<S: AsRef<str>>(rules: &[S], mode: MatchMode) -> Result<Self, MatchError> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(rules.len());

        for rule in rules {
            let keyword = rule.as_ref().trim();
            if keyword.is_empty() {
                continue;
            }
            if !seen.insert(keyword.to_lowercase()) {
                tracing::debug!(keyword = %keyword, "Duplicate keyword rule ignored");
                continue;
            }

            let pattern = RegexBuilder::new(&build_pattern(keyword, mode))
                .case_insensitive(true)
                .build()
                .map_err(|source| MatchError::InvalidRule {
                    rule: keyword.to_string(),
                    source,
                })?;

            compiled.push(CompiledRule {
                keyword: keyword.to_string(),
                pattern,
            });
        }

        Ok(Self {
            rules: compiled.into(),
            mode,
        })
    }

    /// Returns the keywords found in `text`, in rule order.
    pub fn matches(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        self.rules
            .iter()
            .filter(|rule| rule.pattern.is_match(text))
            .map(|rule| rule.keyword.clone())
            .collect()
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.keyword.as_str())
    }
}

/// One-shot word-boundary match of `text` against `rules`.
///
/// Convenience over [`KeywordMatcher`] for callers that match a single text.
pub fn match_keywords<S: AsRef<str>>(text: &str, rules: &[S]) -> Result<Vec<String>, MatchError> {
    Ok(KeywordMatcher::new(rules, MatchMode::WordBoundary)?.matches(text))
}

/// Builds the regex source for one keyword.
///
/// `\b` is only anchored on a side whose edge character is a word character;
/// keywords such as `C++` or `.NET` have no boundary after/before the symbol.
fn build_pattern(keyword: &str, mode: MatchMode) -> String {
    let escaped = regex::escape(keyword);
    match mode {
        MatchMode::Substring => escaped,
        MatchMode::WordBoundary => {
            let lead = keyword.chars().next().is_some_and(is_word_char);
            let trail = keyword.chars().next_back().is_some_and(is_word_char);
            format!(
                "{}{}{}",
                if lead { r"\b" } else { "" },
                escaped,
                if trail { r"\b" } else { "" }
            )
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
