use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use aho_corasick::{AhoCorasick, MatchKind};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, trace};

use super::bpe::byte_pair_merge;
use super::byte_level::byte_level_decode;
use super::cache::{shared_cache, SharedCache, TokenCache};
use super::pretokenize::{Pretokenizer, GPT2_PATTERN};
use super::token::Token;
use super::vocab::{load_merges_file, load_vocabulary_file, MergeRanks, VocabError, Vocabulary};

#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Vocabulary error: {0}")]
    Vocab(#[from] VocabError),
    #[error("Regex compilation error (regexr): {0}")]
    Regex(#[from] regexr::Error),
    #[cfg(feature = "pcre2")]
    #[error("PCRE2 error: {0}")]
    Pcre2(#[from] pcre2::Error),
    #[error("PCRE2 feature not enabled. Compile with --features pcre2")]
    Pcre2NotEnabled,
    #[error("Aho-Corasick build error: {0}")]
    AhoCorasick(#[from] aho_corasick::BuildError),
    #[error("Unknown pretrained vocabulary: {0}")]
    UnknownPretrained(String),
    #[error("Merged symbol {0:?} is not in the vocabulary")]
    UnmappableSymbol(String),
    #[error("Special token {0:?} is not in the vocabulary")]
    UnknownSpecialToken(String),
    #[error("Invalid token: {0}")]
    InvalidToken(Token),
    #[error("Invalid byte-level character: {0:?}")]
    InvalidCharacter(char),
}

/// End-of-text marker of the GPT-2/GPT-3 vocabulary.
pub const ENDOFTEXT: &str = "<|endoftext|>";

/// Byte-level BPE tokenizer for GPT-2/GPT-3 style vocabularies.
///
/// Encoding runs the pre-tokenizer over the text, merges every chunk with the
/// rank table and looks the resulting symbols up in the vocabulary. Decoding
/// reverses the lookup and maps the byte-level characters back to bytes.
///
/// The vocabulary, rank table and compiled pattern are immutable after
/// construction and shared between clones, so a tokenizer can be used from
/// many threads at once.
///
/// # Caching
///
/// Each call to [`encode`](Self::encode) memoizes chunk merges in a map it owns
/// and drops on return. [`with_cache_size`](Self::with_cache_size) switches to a
/// bounded LRU cache kept for the tokenizer's lifetime and shared by all calls.
///
/// # Example
///
/// ```no_run
/// use gptok::Tokenizer;
///
/// let tokenizer = Tokenizer::from_files("gpt3-encoder.json", "gpt3-vocab.bpe")?;
/// let tokens = tokenizer.encode("Hello, world!")?;
/// assert_eq!(tokenizer.decode(&tokens)?, "Hello, world!");
/// # Ok::<(), gptok::TokenizerError>(())
/// ```
pub struct Tokenizer {
    vocabulary: Arc<Vocabulary>,
    merges: Arc<MergeRanks>,
    pretokenizer: Arc<Pretokenizer>,
    special_tokens: FxHashMap<String, Token>,
    special_token_strings: Vec<String>,
    // Indexed by Aho-Corasick pattern id, parallel to `special_token_strings`.
    special_token_ids: Vec<Token>,
    special_matcher: Option<Arc<AhoCorasick>>,
    chunk_cache: Option<SharedCache>,
    cache_size: usize,
}

impl Tokenizer {
    /// Create a tokenizer from loaded tables, using [`GPT2_PATTERN`].
    ///
    /// [`ENDOFTEXT`] is registered as a special token when the vocabulary has it.
    pub fn new(vocabulary: Vocabulary, merges: MergeRanks) -> Result<Self, TokenizerError> {
        let pretokenizer = Pretokenizer::new(GPT2_PATTERN)?;
        debug!(
            tokens = vocabulary.len(),
            merges = merges.len(),
            "building tokenizer"
        );

        let tokenizer = Self {
            vocabulary: Arc::new(vocabulary),
            merges: Arc::new(merges),
            pretokenizer: Arc::new(pretokenizer),
            special_tokens: FxHashMap::default(),
            special_token_strings: Vec::new(),
            special_token_ids: Vec::new(),
            special_matcher: None,
            chunk_cache: None,
            cache_size: 0,
        };

        if tokenizer.vocabulary.token(ENDOFTEXT).is_some() {
            tokenizer.with_special_tokens([ENDOFTEXT])
        } else {
            Ok(tokenizer)
        }
    }

    /// Create a tokenizer from the raw bytes of a token table and a merge list.
    pub fn from_bytes(encoder_json: &[u8], merges: &str) -> Result<Self, TokenizerError> {
        let vocabulary = Vocabulary::from_json(encoder_json)?;
        let merges = MergeRanks::parse(merges)?;
        Self::new(vocabulary, merges)
    }

    /// Create a tokenizer from a token table file and a merge list file.
    pub fn from_files(
        encoder_path: impl AsRef<Path>,
        merges_path: impl AsRef<Path>,
    ) -> Result<Self, TokenizerError> {
        let vocabulary = load_vocabulary_file(encoder_path)?;
        let merges = load_merges_file(merges_path)?;
        Self::new(vocabulary, merges)
    }

    /// Replace the pre-tokenization pattern, keeping the current regex backend.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, TokenizerError> {
        let pretokenizer = Pretokenizer::with_backend(
            pattern,
            self.pretokenizer.uses_jit(),
            self.pretokenizer.uses_pcre2(),
        )?;
        self.pretokenizer = Arc::new(pretokenizer);
        Ok(self)
    }

    /// Switch to (or away from) the PCRE2 regex backend.
    ///
    /// # Errors
    /// Returns an error if `pcre2` feature is not enabled or regex compilation fails.
    pub fn pcre2(mut self, use_pcre2: bool) -> Result<Self, TokenizerError> {
        let pretokenizer = Pretokenizer::with_backend(
            self.pretokenizer.pattern(),
            self.pretokenizer.uses_jit(),
            use_pcre2,
        )?;
        self.pretokenizer = Arc::new(pretokenizer);
        Ok(self)
    }

    /// Enable or disable JIT compilation for the regex backend.
    pub fn jit(mut self, use_jit: bool) -> Result<Self, TokenizerError> {
        let pretokenizer = Pretokenizer::with_backend(
            self.pretokenizer.pattern(),
            use_jit,
            self.pretokenizer.uses_pcre2(),
        )?;
        self.pretokenizer = Arc::new(pretokenizer);
        Ok(self)
    }

    /// Keep an LRU cache of `cache_size` merged chunks across calls.
    ///
    /// A size of 0 returns to the per-call cache.
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self.chunk_cache = NonZeroUsize::new(cache_size).map(shared_cache);
        trace!(cache_size, "chunk cache configured");
        self
    }

    /// Register strings that [`encode_with_special`](Self::encode_with_special)
    /// maps straight to their vocabulary id.
    ///
    /// Replaces any previously registered special tokens.
    pub fn with_special_tokens<I, S>(mut self, names: I) -> Result<Self, TokenizerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut special_tokens = FxHashMap::default();
        let mut special_token_strings = Vec::new();
        let mut special_token_ids = Vec::new();
        for name in names {
            let name = name.as_ref();
            let token = self
                .vocabulary
                .token(name)
                .ok_or_else(|| TokenizerError::UnknownSpecialToken(name.to_string()))?;
            if special_tokens.insert(name.to_string(), token).is_none() {
                special_token_strings.push(name.to_string());
                special_token_ids.push(token);
            }
        }

        self.special_matcher = if special_token_strings.is_empty() {
            None
        } else {
            let matcher = AhoCorasick::builder()
                .match_kind(MatchKind::LeftmostLongest)
                .build(&special_token_strings)?;
            Some(Arc::new(matcher))
        };
        self.special_tokens = special_tokens;
        self.special_token_strings = special_token_strings;
        self.special_token_ids = special_token_ids;
        Ok(self)
    }

    fn token_cache(&self) -> TokenCache<'_> {
        match &self.chunk_cache {
            Some(cache) => TokenCache::shared(cache),
            None => TokenCache::scoped(),
        }
    }

    /// Split text into pre-tokenization chunks.
    pub fn split<'t>(&self, text: &'t str) -> Result<Vec<&'t str>, TokenizerError> {
        self.pretokenizer.split(text)
    }

    /// Merge one chunk, returning its symbols joined by single spaces.
    pub fn bpe(&self, chunk: &str) -> String {
        byte_pair_merge(chunk, &self.merges)
    }

    /// Merge one chunk through `cache` and append its token ids to `out`.
    fn encode_chunk(
        &self,
        chunk: &str,
        cache: &mut TokenCache<'_>,
        out: &mut Vec<Token>,
    ) -> Result<(), TokenizerError> {
        cache.with_merged(
            chunk,
            |chunk| byte_pair_merge(chunk, &self.merges),
            |merged| {
                for symbol in merged.split(' ') {
                    let token = self
                        .vocabulary
                        .token(symbol)
                        .ok_or_else(|| TokenizerError::UnmappableSymbol(symbol.to_string()))?;
                    out.push(token);
                }
                Ok(())
            },
        )
    }

    /// Encode text to token ids. Special token strings get no special treatment.
    pub fn encode(&self, text: &str) -> Result<Vec<Token>, TokenizerError> {
        let mut cache = self.token_cache();
        let mut tokens = Vec::with_capacity(text.len() / 3);
        for chunk in self.pretokenizer.split(text)? {
            self.encode_chunk(chunk, &mut cache, &mut tokens)?;
        }
        Ok(tokens)
    }

    /// Encode text to token ids using Rayon parallel processing.
    ///
    /// Chunks are merged on the thread pool and reassembled in input order, so
    /// the result equals [`encode`](Self::encode). Only beneficial for very
    /// large texts.
    pub fn encode_rayon(&self, text: &str) -> Result<Vec<Token>, TokenizerError> {
        let chunks = self.pretokenizer.split(text)?;
        let results: Vec<Vec<Token>> = chunks
            .par_iter()
            .map_init(
                || self.token_cache(),
                |cache, chunk| {
                    let mut tokens = Vec::new();
                    self.encode_chunk(chunk, cache, &mut tokens)?;
                    Ok::<_, TokenizerError>(tokens)
                },
            )
            .collect::<Result<_, TokenizerError>>()?;

        Ok(results.into_iter().flatten().collect())
    }

    /// Encode text, mapping registered special token strings directly to their ids.
    pub fn encode_with_special(&self, text: &str) -> Result<Vec<Token>, TokenizerError> {
        let Some(ref special_matcher) = self.special_matcher else {
            return self.encode(text);
        };

        let mut result = Vec::new();
        let mut last_end = 0;

        for m in special_matcher.find_iter(text) {
            if m.start() > last_end {
                result.extend(self.encode(&text[last_end..m.start()])?);
            }

            result.push(self.special_token_ids[m.pattern().as_usize()]);

            last_end = m.end();
        }

        if last_end < text.len() {
            result.extend(self.encode(&text[last_end..])?);
        }

        Ok(result)
    }

    /// Number of tokens `text` encodes to.
    pub fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        self.encode(text).map(|tokens| tokens.len())
    }

    /// Decode token ids back to the exact bytes they encode.
    pub fn decode_bytes(&self, tokens: &[Token]) -> Result<Vec<u8>, TokenizerError> {
        let mut text = String::with_capacity(tokens.len() * 4);
        for &token in tokens {
            let symbol = self
                .vocabulary
                .symbol(token)
                .ok_or(TokenizerError::InvalidToken(token))?;
            text.push_str(symbol);
        }

        byte_level_decode(&text).map_err(TokenizerError::InvalidCharacter)
    }

    /// Decode token ids to a string.
    ///
    /// Byte sequences that are not valid UTF-8 (a token sequence cut inside a
    /// multi-byte character) are replaced with U+FFFD.
    pub fn decode(&self, tokens: &[Token]) -> Result<String, TokenizerError> {
        let bytes = self.decode_bytes(tokens)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Batch encode multiple texts in parallel.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<Token>>, TokenizerError> {
        texts.par_iter().map(|text| self.encode(text)).collect()
    }

    /// Batch encode multiple texts with special token handling.
    pub fn encode_batch_with_special(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<Token>>, TokenizerError> {
        texts
            .par_iter()
            .map(|text| self.encode_with_special(text))
            .collect()
    }

    /// Batch decode multiple token lists in parallel.
    pub fn decode_batch(&self, token_lists: &[Vec<Token>]) -> Result<Vec<String>, TokenizerError> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode(tokens))
            .collect()
    }

    /// Get the vocabulary size: highest token id + 1.
    pub fn vocab_size(&self) -> usize {
        self.vocabulary
            .max_token()
            .map_or(0, |token| token.id() as usize + 1)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn merges(&self) -> &MergeRanks {
        &self.merges
    }

    pub fn pattern(&self) -> &str {
        self.pretokenizer.pattern()
    }

    /// Get the special tokens map.
    pub fn special_tokens(&self) -> &FxHashMap<String, Token> {
        &self.special_tokens
    }

    /// Clear the shared chunk cache, if one is configured.
    pub fn clear_cache(&self) {
        if let Some(Ok(mut cache)) = self.chunk_cache.as_ref().map(|c| c.lock()) {
            cache.clear();
        }
    }

    /// Number of chunks held by the shared cache (0 with the per-call cache).
    pub fn cache_len(&self) -> usize {
        self.chunk_cache
            .as_ref()
            .and_then(|c| c.lock().ok().map(|c| c.len()))
            .unwrap_or(0)
    }
}

impl Clone for Tokenizer {
    fn clone(&self) -> Self {
        Self {
            vocabulary: Arc::clone(&self.vocabulary),
            merges: Arc::clone(&self.merges),
            pretokenizer: Arc::clone(&self.pretokenizer),
            special_tokens: self.special_tokens.clone(),
            special_token_strings: self.special_token_strings.clone(),
            special_token_ids: self.special_token_ids.clone(),
            special_matcher: self.special_matcher.clone(),
            // Caches are not shared between clones
            chunk_cache: NonZeroUsize::new(self.cache_size).map(shared_cache),
            cache_size: self.cache_size,
        }
    }
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer")
            .field("vocab_size", &self.vocab_size())
            .field("merges", &self.merges.len())
            .field("pretokenizer", &self.pretokenizer)
            .field("special_tokens", &self.special_token_strings)
            .field("cache_size", &self.cache_size)
            .finish()
    }
}
