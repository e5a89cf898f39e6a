use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A vocabulary id.
///
/// Serializes as a bare integer; its textual form is the decimal id, which makes
/// it usable as a map key in JSON.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Token(pub u32);

impl Token {
    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl From<u32> for Token {
    #[inline]
    fn from(id: u32) -> Self {
        Token(id)
    }
}

impl From<Token> for u32 {
    #[inline]
    fn from(token: Token) -> Self {
        token.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Token {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_decimal_text_form() {
        assert_eq!(Token(50256).to_string(), "50256");
        assert_eq!("42".parse::<Token>().unwrap(), Token(42));
        assert!("-1".parse::<Token>().is_err());
        assert!("abc".parse::<Token>().is_err());
    }

    #[test]
    fn test_serde_is_transparent() {
        let json = serde_json::to_string(&vec![Token(1), Token(2)]).unwrap();
        assert_eq!(json, "[1,2]");

        let tokens: Vec<Token> = serde_json::from_str("[7,8]").unwrap();
        assert_eq!(tokens, vec![Token(7), Token(8)]);
    }

    #[test]
    fn test_token_as_map_key() {
        let mut counts = BTreeMap::new();
        counts.insert(Token(3), 1);
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(json, r#"{"3":1}"#);
    }
}
