//! gptok - byte-level BPE tokenizer compatible with the GPT-2/GPT-3 vocabulary.
//!
//! ```no_run
//! use gptok::pretrained::from_pretrained;
//!
//! let tokenizer = from_pretrained("gpt3")?;
//! let tokens = tokenizer.encode("Hello, world!")?;
//! assert_eq!(tokenizer.decode(&tokens)?, "Hello, world!");
//! # Ok::<(), gptok::TokenizerError>(())
//! ```
//!
//! Features:
//! - Exact GPT-2 pre-tokenization pattern on a regexr backend (PCRE2 optional)
//! - Rank-ordered pair merging with per-call memoization
//! - Optional bounded LRU cache shared across calls
//! - Rayon parallelism for batch encoding
//! - Aho-Corasick matching for special tokens such as `<|endoftext|>`

pub mod core;

pub use crate::core::{
    byte_level, pretokenize, pretrained, token_count, vocab, ChatModel, MergeRanks, Token,
    Tokenizer, TokenizerError, VocabError, Vocabulary, ENDOFTEXT, GPT2_PATTERN,
};
