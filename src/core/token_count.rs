//! Token counting for chat requests.
//!
//! Chat models charge a fixed number of tokens per message on top of the
//! encoded role and content, and prime every reply with a few more. The
//! per-model overhead lives in one table here so the tokenizer itself stays
//! model-agnostic.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::tokenizer::{Tokenizer, TokenizerError};

/// Tokens added once per request for the primed assistant reply.
pub const REPLY_PRIMING_TOKENS: usize = 3;

/// Chat model identifier, parsed by prefix from the API model name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChatModel {
    Gpt35Turbo,
    Gpt4,
    Gpt4Turbo,
    Gpt4o,
    Specific(String),
}

impl ChatModel {
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("gpt-3.5") {
            Self::Gpt35Turbo
        } else if name.starts_with("gpt-4o") {
            Self::Gpt4o
        } else if name.starts_with("gpt-4-turbo") {
            Self::Gpt4Turbo
        } else if name.starts_with("gpt-4") {
            Self::Gpt4
        } else {
            Self::Specific(name.to_string())
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Gpt35Turbo => "gpt-3.5-turbo",
            Self::Gpt4 => "gpt-4",
            Self::Gpt4Turbo => "gpt-4-turbo",
            Self::Gpt4o => "gpt-4o",
            Self::Specific(name) => name,
        }
    }

    /// Fixed tokens each message costs beyond its role and content.
    pub fn tokens_per_message(&self) -> usize {
        match self {
            Self::Gpt35Turbo => 4,
            Self::Gpt4 | Self::Gpt4Turbo | Self::Gpt4o | Self::Specific(_) => 3,
        }
    }
}

impl fmt::Display for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ChatModel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ChatModel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

/// Token count of a chat request: every message's role and content tokens
/// plus the model's per-message overhead, plus [`REPLY_PRIMING_TOKENS`].
pub fn count_chat_tokens<I, R, C>(
    tokenizer: &Tokenizer,
    model: &ChatModel,
    messages: I,
) -> Result<usize, TokenizerError>
where
    I: IntoIterator<Item = (R, C)>,
    R: AsRef<str>,
    C: AsRef<str>,
{
    let per_message = model.tokens_per_message();
    let mut total = REPLY_PRIMING_TOKENS;
    for (role, content) in messages {
        total += tokenizer.count_tokens(role.as_ref())?
            + tokenizer.count_tokens(content.as_ref())?
            + per_message;
    }
    Ok(total)
}
