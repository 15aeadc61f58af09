use crate::error::{ScanError, ScanResult};
use camino::Utf8Path;
use indexmap::IndexSet;
use regex::{Regex, RegexBuilder};
use std::fs;

/// Replacement written over every matched span.
///
/// Not length preserving: a three-letter word and a ten-letter word both become
/// the same seven characters.
pub const MASK_TOKEN: &str = "*******";

/// Case-insensitive set of forbidden words for one run
///
/// Words are trimmed and lowercased on insertion. Iteration follows first
/// insertion order so matching and statistics are deterministic for a given
/// word list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForbiddenWords {
    words: IndexSet<String>,
}

impl ForbiddenWords {
    /// Build a word set, dropping blank entries and case-insensitive duplicates
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .filter_map(|word| {
                let word = word.as_ref().trim();
                (!word.is_empty()).then(|| word.to_lowercase())
            })
            .collect();
        Self { words }
    }

    /// Load a word list with one word per line
    pub fn from_file(path: &Utf8Path) -> ScanResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ScanError::io(path, e))?;
        let words = Self::new(content.lines());

        tracing::info!("Loaded {} forbidden words from {}", words.len(), path);
        Ok(words)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

/// Outcome of matching one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch<'m> {
    /// The line with every matched span replaced by [`MASK_TOKEN`]
    pub redacted: String,

    /// Matches per word, counted against the original line. Only words with at
    /// least one match are listed, in word-set order.
    pub word_counts: Vec<(&'m str, usize)>,
}

impl LineMatch<'_> {
    /// Total matches on the line across all words
    pub fn total(&self) -> usize {
        self.word_counts.iter().map(|(_, count)| count).sum()
    }

    pub fn has_matches(&self) -> bool {
        !self.word_counts.is_empty()
    }
}

/// Whole-word, case-insensitive matcher with one pre-compiled pattern per word
///
/// Each word is counted independently against the unmodified line, so the
/// count for a word never depends on which other words were checked first.
/// Redaction merges the spans of all words: where spans of different words
/// overlap, the union is masked once.
#[derive(Debug, Clone)]
pub struct WordMatcher {
    patterns: Vec<(String, Regex)>,
}

impl WordMatcher {
    /// Compile a `\b<word>\b` pattern for every word in the set
    pub fn new(words: &ForbiddenWords) -> ScanResult<Self> {
        let patterns = words
            .iter()
            .map(|word| {
                RegexBuilder::new(&format!(r"\b{}\b", regex::escape(word)))
                    .case_insensitive(true)
                    .build()
                    .map(|regex| (word.to_string(), regex))
                    .map_err(|e| ScanError::InvalidWord {
                        word: word.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect::<ScanResult<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Count and redact forbidden words in a single line
    pub fn scan(&self, line: &str) -> LineMatch<'_> {
        let mut spans = Vec::new();
        let mut word_counts = Vec::new();

        for (word, regex) in &self.patterns {
            let before = spans.len();
            spans.extend(regex.find_iter(line).map(|m| (m.start(), m.end())));

            let count = spans.len() - before;
            if count > 0 {
                word_counts.push((word.as_str(), count));
            }
        }

        if spans.is_empty() {
            return LineMatch {
                redacted: line.to_string(),
                word_counts,
            };
        }

        LineMatch {
            redacted: mask_spans(line, spans),
            word_counts,
        }
    }
}

/// Replace each union of overlapping spans with a single mask token
fn mask_spans(line: &str, mut spans: Vec<(usize, usize)>) -> String {
    spans.sort_unstable();

    let mut redacted = String::with_capacity(line.len());
    let mut cursor = 0;
    let mut current: Option<(usize, usize)> = None;

    for (start, end) in spans {
        match current {
            Some((open_start, open_end)) if start < open_end => {
                current = Some((open_start, open_end.max(end)));
            }
            Some((open_start, open_end)) => {
                redacted.push_str(&line[cursor..open_start]);
                redacted.push_str(MASK_TOKEN);
                cursor = open_end;
                current = Some((start, end));
            }
            None => current = Some((start, end)),
        }
    }

    if let Some((open_start, open_end)) = current {
        redacted.push_str(&line[cursor..open_start]);
        redacted.push_str(MASK_TOKEN);
        cursor = open_end;
    }

    redacted.push_str(&line[cursor..]);
    redacted
}
