//! Vocabulary loading for the GPT-2 resource format.
//!
//! A vocabulary is published as two artifacts:
//!
//! - a token table (`<name>-encoder.json`): a flat JSON object mapping each
//!   byte-level token string to its integer id;
//! - a merge list (`<name>-vocab.bpe`): a header line followed by one merge per
//!   line, two whitespace-separated symbols each, in rank order.
//!
//! # Example Merge List
//!
//! ```text
//! #version: 0.2
//! Ġ t
//! Ġ a
//! h e
//! ```
//!
//! Here `Ġ t` has rank 0 (merged first), `Ġ a` rank 1 and `h e` rank 2.

use std::path::Path;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use super::token::Token;

/// Errors that can occur when loading vocabulary artifacts.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("Resource missing: {name} ({source})")]
    ResourceMissing {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Resource {name} is not valid UTF-8 ({source})")]
    InvalidEncoding {
        name: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("Invalid merge line: {0:?}")]
    InvalidMergeLine(String),
    #[error("Invalid token table: {0}")]
    InvalidVocabulary(#[from] serde_json::Error),
    #[error("Token id {id} assigned to both {first:?} and {second:?}")]
    DuplicateTokenId {
        id: Token,
        first: String,
        second: String,
    },
}

/// Bijective mapping between byte-level token strings and token ids.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    encoder: FxHashMap<String, Token>,
    decoder: FxHashMap<Token, String>,
}

impl Vocabulary {
    /// Build a vocabulary from a token table, rejecting ids used twice.
    pub fn from_map(encoder: FxHashMap<String, Token>) -> Result<Self, VocabError> {
        let mut decoder = FxHashMap::with_capacity_and_hasher(encoder.len(), Default::default());
        for (symbol, &token) in &encoder {
            if let Some(first) = decoder.insert(token, symbol.clone()) {
                let (first, second) = if first < *symbol {
                    (first, symbol.clone())
                } else {
                    (symbol.clone(), first)
                };
                return Err(VocabError::DuplicateTokenId {
                    id: token,
                    first,
                    second,
                });
            }
        }
        Ok(Self { encoder, decoder })
    }

    /// Parse a token table from its JSON form.
    pub fn from_json(data: &[u8]) -> Result<Self, VocabError> {
        let encoder: FxHashMap<String, Token> = serde_json::from_slice(data)?;
        Self::from_map(encoder)
    }

    /// Look up the id of a token string.
    #[inline]
    pub fn token(&self, symbol: &str) -> Option<Token> {
        self.encoder.get(symbol).copied()
    }

    /// Look up the token string of an id.
    #[inline]
    pub fn symbol(&self, token: Token) -> Option<&str> {
        self.decoder.get(&token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.encoder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty()
    }

    /// Largest id in the table, if any.
    pub fn max_token(&self) -> Option<Token> {
        self.decoder.keys().max().copied()
    }
}

/// Merge priorities for adjacent symbol pairs. Lower rank merges first.
///
/// Stored as a two-level map so lookups borrow both halves of the pair
/// without building a key.
#[derive(Debug, Clone, Default)]
pub struct MergeRanks {
    ranks: FxHashMap<String, FxHashMap<String, u32>>,
    len: usize,
}

impl MergeRanks {
    /// Build a rank table from pairs listed in rank order.
    ///
    /// A pair listed twice keeps the rank of its last occurrence.
    pub fn from_pairs<I, L, R>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, R)>,
        L: Into<String>,
        R: Into<String>,
    {
        let mut merges = Self::default();
        for (rank, (left, right)) in pairs.into_iter().enumerate() {
            merges.insert(left.into(), right.into(), rank as u32);
        }
        merges
    }

    /// Parse a merge list.
    ///
    /// The first line is a version header and is skipped. Trailing blank lines
    /// are ignored; every other line must hold exactly two symbols.
    pub fn parse(text: &str) -> Result<Self, VocabError> {
        let mut lines: Vec<&str> = text
            .split('\n')
            .skip(1)
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
        }

        let mut merges = Self::default();
        for (rank, line) in lines.into_iter().enumerate() {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next(), fields.next()) {
                (Some(left), Some(right), None) => {
                    merges.insert(left.to_string(), right.to_string(), rank as u32);
                }
                _ => return Err(VocabError::InvalidMergeLine(line.to_string())),
            }
        }
        Ok(merges)
    }

    fn insert(&mut self, left: String, right: String, rank: u32) {
        self.ranks.entry(left).or_default().insert(right, rank);
        self.len += 1;
    }

    /// Rank of the pair `(left, right)`, or `None` if it never merges.
    #[inline]
    pub fn rank(&self, left: &str, right: &str) -> Option<u32> {
        self.ranks.get(left)?.get(right).copied()
    }

    /// Number of merge lines the table was built from.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn resource_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_resource(path: &Path) -> Result<Vec<u8>, VocabError> {
    std::fs::read(path).map_err(|source| VocabError::ResourceMissing {
        name: resource_name(path),
        source,
    })
}

/// Load a token table from a JSON file.
pub fn load_vocabulary_file(path: impl AsRef<Path>) -> Result<Vocabulary, VocabError> {
    let path = path.as_ref();
    let vocabulary = Vocabulary::from_json(&read_resource(path)?)?;
    debug!(path = %path.display(), tokens = vocabulary.len(), "loaded token table");
    Ok(vocabulary)
}

/// Load a merge list from a file.
pub fn load_merges_file(path: impl AsRef<Path>) -> Result<MergeRanks, VocabError> {
    let path = path.as_ref();
    let text = String::from_utf8(read_resource(path)?).map_err(|source| {
        VocabError::InvalidEncoding {
            name: resource_name(path),
            source,
        }
    })?;
    let merges = MergeRanks::parse(&text)?;
    debug!(path = %path.display(), merges = merges.len(), "loaded merge list");
    Ok(merges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_from_json() {
        let vocabulary = Vocabulary::from_json(br#"{"a": 0, "b": 1, "ab": 2}"#).unwrap();

        assert_eq!(vocabulary.len(), 3);
        assert_eq!(vocabulary.token("ab"), Some(Token(2)));
        assert_eq!(vocabulary.symbol(Token(1)), Some("b"));
        assert_eq!(vocabulary.token("ba"), None);
        assert_eq!(vocabulary.max_token(), Some(Token(2)));
    }

    #[test]
    fn test_vocabulary_rejects_duplicate_ids() {
        let err = Vocabulary::from_json(br#"{"a": 0, "b": 0}"#).unwrap_err();
        match err {
            VocabError::DuplicateTokenId { id, first, second } => {
                assert_eq!(id, Token(0));
                assert_eq!((first.as_str(), second.as_str()), ("a", "b"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_vocabulary_rejects_non_integer_ids() {
        let err = Vocabulary::from_json(br#"{"a": "zero"}"#).unwrap_err();
        assert!(matches!(err, VocabError::InvalidVocabulary(_)));

        let err = Vocabulary::from_json(br#"{"a": -1}"#).unwrap_err();
        assert!(matches!(err, VocabError::InvalidVocabulary(_)));
    }

    #[test]
    fn test_parse_merges_assigns_ranks_in_file_order() {
        let merges = MergeRanks::parse("#version: 0.2\nĠ t\nh e\nĠt he\n").unwrap();

        assert_eq!(merges.len(), 3);
        assert_eq!(merges.rank("Ġ", "t"), Some(0));
        assert_eq!(merges.rank("h", "e"), Some(1));
        assert_eq!(merges.rank("Ġt", "he"), Some(2));
        assert_eq!(merges.rank("t", "Ġ"), None);
    }

    #[test]
    fn test_parse_merges_without_trailing_newline_keeps_last_line() {
        let merges = MergeRanks::parse("#version: 0.2\na b\nab c").unwrap();
        assert_eq!(merges.rank("ab", "c"), Some(1));
    }

    #[test]
    fn test_parse_merges_handles_crlf() {
        let merges = MergeRanks::parse("#version: 0.2\r\na b\r\n\r\n").unwrap();
        assert_eq!(merges.len(), 1);
        assert_eq!(merges.rank("a", "b"), Some(0));
    }

    #[test]
    fn test_parse_merges_rejects_malformed_line() {
        let err = MergeRanks::parse("#version: 0.2\na b\na b c\n").unwrap_err();
        assert!(matches!(err, VocabError::InvalidMergeLine(line) if line == "a b c"));

        let err = MergeRanks::parse("#version: 0.2\nlonely\n").unwrap_err();
        assert!(matches!(err, VocabError::InvalidMergeLine(line) if line == "lonely"));
    }

    #[test]
    fn test_header_only_merge_list_is_empty() {
        let merges = MergeRanks::parse("#version: 0.2\n").unwrap();
        assert!(merges.is_empty());
    }

    #[test]
    fn test_duplicate_pair_keeps_last_rank() {
        let merges = MergeRanks::from_pairs([("a", "b"), ("c", "d"), ("a", "b")]);
        assert_eq!(merges.rank("a", "b"), Some(2));
        assert_eq!(merges.len(), 3);
    }

    #[test]
    fn test_missing_file_reports_resource_name() {
        let err = load_merges_file("/nonexistent/dir/gpt3-vocab.bpe").unwrap_err();
        assert!(matches!(err, VocabError::ResourceMissing { name, .. } if name == "gpt3-vocab.bpe"));
    }

    #[test]
    fn test_merge_list_must_be_utf8() {
        let path = std::env::temp_dir().join(format!("gptok-{}-bad-vocab.bpe", std::process::id()));
        std::fs::write(&path, b"#version: 0.2\na b\n\xff\xfe c\n").unwrap();

        let result = load_merges_file(&path);
        std::fs::remove_file(&path).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(matches!(result, Err(VocabError::InvalidEncoding { name: n, .. }) if n == name));
    }

    #[test]
    fn test_load_merges_file() {
        let path = std::env::temp_dir().join(format!("gptok-{}-vocab.bpe", std::process::id()));
        std::fs::write(&path, "#version: 0.2\nĠ t\nh e\n").unwrap();

        let merges = load_merges_file(&path);
        std::fs::remove_file(&path).unwrap();

        let merges = merges.unwrap();
        assert_eq!(merges.len(), 2);
        assert_eq!(merges.rank("h", "e"), Some(1));
    }
}
