//! Locating the published vocabulary artifacts by name.
//!
//! A vocabulary `<stem>` lives in a resource directory as two files:
//! `<stem>-encoder.json` (token table) and `<stem>-vocab.bpe` (merge list).
//! The directory is `$GPTOK_RESOURCE_DIR` when set, otherwise the crate's
//! `resources/` directory.
//!
//! # Example
//!
//! ```no_run
//! use gptok::pretrained::from_pretrained;
//!
//! let tokenizer = from_pretrained("gpt3").unwrap();
//! let tokens = tokenizer.encode("Hello, world!").unwrap();
//! ```

use std::path::{Path, PathBuf};

use tracing::info;

use super::tokenizer::{Tokenizer, TokenizerError};

/// Environment variable overriding the resource directory.
pub const RESOURCE_DIR_ENV: &str = "GPTOK_RESOURCE_DIR";

/// Supported pretrained vocabulary types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PretrainedVocab {
    /// GPT-2 / GPT-3 byte-level BPE (50257 tokens)
    Gpt3,
}

impl PretrainedVocab {
    /// Parse vocabulary name from string.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gpt3" | "gpt2" | "r50k_base" => Some(Self::Gpt3),
            _ => None,
        }
    }

    /// Get all supported vocabulary names.
    pub fn supported_names() -> &'static [&'static str] {
        &["gpt3", "gpt2", "r50k_base"]
    }

    /// File name stem of the vocabulary's artifacts.
    pub fn stem(self) -> &'static str {
        match self {
            Self::Gpt3 => "gpt3",
        }
    }
}

/// Resource directory consulted by [`from_pretrained`].
pub fn resource_dir() -> PathBuf {
    std::env::var_os(RESOURCE_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("resources"))
}

/// Path of the token table for `stem` inside `dir`.
pub fn encoder_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}-encoder.json"))
}

/// Path of the merge list for `stem` inside `dir`.
pub fn merges_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}-vocab.bpe"))
}

/// Create a pretrained tokenizer by vocabulary name.
///
/// # Supported Names
/// - `gpt3`, `gpt2`, `r50k_base` - GPT-2/GPT-3 vocabulary
pub fn from_pretrained(name: &str) -> Result<Tokenizer, TokenizerError> {
    let vocab = PretrainedVocab::from_name(name).ok_or_else(|| {
        TokenizerError::UnknownPretrained(format!(
            "{}. Supported: {}",
            name,
            PretrainedVocab::supported_names().join(", ")
        ))
    })?;

    from_vocab(vocab)
}

/// Create a pretrained tokenizer from vocabulary enum.
pub fn from_vocab(vocab: PretrainedVocab) -> Result<Tokenizer, TokenizerError> {
    let dir = resource_dir();
    info!(vocab = vocab.stem(), dir = %dir.display(), "loading pretrained vocabulary");
    from_dir(vocab.stem(), &dir)
}

/// Create a tokenizer from the artifacts named `stem` in `dir`.
///
/// Unlike [`from_pretrained`], any stem is accepted.
pub fn from_dir(stem: &str, dir: impl AsRef<Path>) -> Result<Tokenizer, TokenizerError> {
    let dir = dir.as_ref();
    Tokenizer::from_files(encoder_path(dir, stem), merges_path(dir, stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vocab::VocabError;

    #[test]
    fn test_from_name_aliases() {
        for name in PretrainedVocab::supported_names() {
            assert_eq!(PretrainedVocab::from_name(name), Some(PretrainedVocab::Gpt3));
        }
        assert_eq!(PretrainedVocab::from_name("cl100k_base"), None);
    }

    #[test]
    fn test_unknown_pretrained() {
        let err = from_pretrained("cl100k_base").unwrap_err();
        match err {
            TokenizerError::UnknownPretrained(msg) => {
                assert!(msg.starts_with("cl100k_base"));
                assert!(msg.contains("gpt3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_artifact_paths() {
        let dir = Path::new("/data/bpe");
        assert_eq!(
            encoder_path(dir, "gpt3"),
            PathBuf::from("/data/bpe/gpt3-encoder.json")
        );
        assert_eq!(merges_path(dir, "gpt3"), PathBuf::from("/data/bpe/gpt3-vocab.bpe"));
    }

    #[test]
    fn test_missing_directory_is_resource_missing() {
        let err = from_dir("gpt3", "/nonexistent/gptok").unwrap_err();
        assert!(matches!(
            err,
            TokenizerError::Vocab(VocabError::ResourceMissing { ref name, .. })
                if name == "gpt3-encoder.json"
        ));
    }
}
