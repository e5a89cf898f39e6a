//! Pre-tokenization: splitting text into chunks before BPE.
//!
//! Chunks are the leftmost non-overlapping matches of a fixed pattern. For the
//! GPT-2 pattern every character of the input belongs to exactly one chunk, so
//! concatenating the chunks reproduces the input.

use regexr::{Regex as RegexrRegex, RegexBuilder};

#[cfg(feature = "pcre2")]
use pcre2::bytes::Regex as Pcre2Regex;

use super::tokenizer::TokenizerError;

/// GPT-2/GPT-3 (r50k_base) pre-tokenization pattern.
///
/// In priority order a chunk is: a contraction suffix, an optional space plus
/// letters, an optional space plus digits, an optional space plus other
/// non-whitespace, whitespace not followed by non-whitespace, or any whitespace.
pub const GPT2_PATTERN: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// Variant of [`GPT2_PATTERN`] that also splits upper-case contractions (`'S`, `'LL`).
///
/// Not compatible with the reference vocabulary's outputs for such text.
pub const CASE_INSENSITIVE_CONTRACTIONS_PATTERN: &str =
    r"(?i:'s|'t|'re|'ve|'m|'ll|'d)| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// Regex backend enum for switching between regexr (default) and PCRE2 (optional)
enum RegexBackend {
    Regexr(Box<RegexrRegex>),
    #[cfg(feature = "pcre2")]
    Pcre2(Pcre2Regex),
}

impl RegexBackend {
    fn compile(pattern: &str, use_jit: bool, use_pcre2: bool) -> Result<Self, TokenizerError> {
        if use_pcre2 {
            return Self::compile_pcre2(pattern, use_jit);
        }
        let regex = RegexBuilder::new(pattern).jit(use_jit).build()?;
        Ok(RegexBackend::Regexr(Box::new(regex)))
    }

    #[cfg(feature = "pcre2")]
    fn compile_pcre2(pattern: &str, use_jit: bool) -> Result<Self, TokenizerError> {
        let mut builder = pcre2::bytes::RegexBuilder::new();
        if use_jit {
            builder.jit_if_available(true);
        }
        builder.utf(true);
        builder.ucp(true);
        Ok(RegexBackend::Pcre2(builder.build(pattern)?))
    }

    #[cfg(not(feature = "pcre2"))]
    fn compile_pcre2(_pattern: &str, _use_jit: bool) -> Result<Self, TokenizerError> {
        Err(TokenizerError::Pcre2NotEnabled)
    }

    /// Find all matches in the given text, returning (start, end) byte offsets
    fn find_iter(&self, text: &str) -> Result<Vec<(usize, usize)>, TokenizerError> {
        match self {
            RegexBackend::Regexr(regex) => Ok(regex
                .find_iter(text)
                .map(|m| (m.start(), m.end()))
                .collect()),
            // PCRE2 can fail mid-scan (match or JIT stack limit).
            #[cfg(feature = "pcre2")]
            RegexBackend::Pcre2(regex) => regex
                .find_iter(text.as_bytes())
                .map(|m| m.map(|m| (m.start(), m.end())).map_err(TokenizerError::from))
                .collect(),
        }
    }
}

/// Compiled pre-tokenization pattern, owned by one tokenizer (or shared between
/// clones of it).
pub struct Pretokenizer {
    regex: RegexBackend,
    pattern: String,
    use_jit: bool,
    use_pcre2: bool,
}

impl Pretokenizer {
    /// Compile `pattern` with the regexr backend and JIT enabled.
    pub fn new(pattern: &str) -> Result<Self, TokenizerError> {
        Self::with_backend(pattern, true, false)
    }

    /// Compile `pattern` with an explicit backend choice.
    ///
    /// Fails with [`TokenizerError::Pcre2NotEnabled`] when PCRE2 is requested
    /// without the `pcre2` feature.
    pub fn with_backend(
        pattern: &str,
        use_jit: bool,
        use_pcre2: bool,
    ) -> Result<Self, TokenizerError> {
        Ok(Self {
            regex: RegexBackend::compile(pattern, use_jit, use_pcre2)?,
            pattern: pattern.to_string(),
            use_jit,
            use_pcre2,
        })
    }

    /// Byte offsets of every chunk in `text`, in order.
    ///
    /// A backend that fails partway through returns the error, never a
    /// truncated list.
    pub fn spans(&self, text: &str) -> Result<Vec<(usize, usize)>, TokenizerError> {
        self.regex.find_iter(text)
    }

    /// Split `text` into chunks, in order.
    pub fn split<'t>(&self, text: &'t str) -> Result<Vec<&'t str>, TokenizerError> {
        Ok(self
            .spans(text)?
            .into_iter()
            .filter(|&(start, end)| end > start)
            .map(|(start, end)| &text[start..end])
            .collect())
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn uses_jit(&self) -> bool {
        self.use_jit
    }

    pub fn uses_pcre2(&self) -> bool {
        self.use_pcre2
    }
}

impl std::fmt::Debug for Pretokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pretokenizer")
            .field("pattern", &self.pattern)
            .field("use_jit", &self.use_jit)
            .field("use_pcre2", &self.use_pcre2)
            .finish()
    }
}
