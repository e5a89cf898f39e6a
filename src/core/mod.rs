//! Core tokenization engine for gptok.
//!
//! Encoding flows one way through the modules below, decoding the mirror way:
//!
//! text → [`pretokenize`] chunks → [`byte_level`] remap → [`bpe`] merges →
//! [`vocab`] lookup → [`Token`]s
//!
//! - [`Tokenizer`]: encode/decode facade, special tokens, batch APIs
//! - [`bpe`]: greedy rank-ordered pair merging over one chunk
//! - [`byte_level`]: byte ↔ printable character bijection
//! - [`pretokenize`]: GPT-2 chunking pattern and regex backends
//! - [`vocab`]: token table and merge list loading
//! - [`pretrained`]: locating the published vocabulary by name
//! - [`token_count`]: per-model chat overhead and token counting

pub mod bpe;
pub mod byte_level;
mod cache;
pub mod pretokenize;
pub mod pretrained;
mod token;
pub mod token_count;
mod tokenizer;
pub mod vocab;

pub use bpe::byte_pair_merge;
pub use byte_level::{byte_level_decode, byte_level_encode};
pub use pretokenize::{Pretokenizer, CASE_INSENSITIVE_CONTRACTIONS_PATTERN, GPT2_PATTERN};
pub use token::Token;
pub use token_count::{count_chat_tokens, ChatModel, REPLY_PRIMING_TOKENS};
pub use tokenizer::{Tokenizer, TokenizerError, ENDOFTEXT};
pub use vocab::{load_merges_file, load_vocabulary_file, MergeRanks, VocabError, Vocabulary};
