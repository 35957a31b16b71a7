//! Token model produced by the [`Lexer`](crate::lexer::Lexer).

use serde::{Deserialize, Serialize};

/// Keyword following `//` that opens an annotation block.
pub const BEGIN_DOC: &str = "+gendoc";
/// Keyword following `//` that closes an annotation block (matched case-insensitively).
pub const END_DOC: &str = "-gendoc";

pub const BEGIN_HTML_COMMENT: &str = "<!--";
pub const END_HTML_COMMENT: &str = "-->";

/// Closed set of token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Illegal,
    Eof,

    Space,
    Tab,
    NewLine,
    CarriageReturn,
    Control,

    Text,

    ForwardSlash,
    DoubleForwardSlash,
    Hash,
    BeginHtmlComment,
    EndHtmlComment,

    BeginDocGen,
    EndDocGen,

    /// Synthetic kind for blocks built straight from schema/sample files.
    Message,
}

impl TokenKind {
    /// Kind for a single whitespace byte, if it is one.
    pub fn whitespace(ch: u8) -> Option<TokenKind> {
        match ch {
            b' ' => Some(TokenKind::Space),
            b'\t' => Some(TokenKind::Tab),
            b'\n' => Some(TokenKind::NewLine),
            b'\r' => Some(TokenKind::CarriageReturn),
            0x0c => Some(TokenKind::Control),
            _ => None,
        }
    }

    pub fn is_whitespace(self) -> bool {
        matches!(
            self,
            TokenKind::Space
                | TokenKind::Tab
                | TokenKind::NewLine
                | TokenKind::CarriageReturn
                | TokenKind::Control
        )
    }

    /// Space, tab or form-feed: whitespace that does not break a line.
    pub fn is_blank(self) -> bool {
        matches!(self, TokenKind::Space | TokenKind::Tab | TokenKind::Control)
    }

    pub fn is_html_comment(self) -> bool {
        matches!(self, TokenKind::BeginHtmlComment | TokenKind::EndHtmlComment)
    }
}

/// Identity of the file a token was read from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub file: String,
    pub path: String,
}

/// A single lexed token.
///
/// `literal` is the exact source text the token covers, so concatenating the
/// literals of a full token stream reproduces the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub literal: String,
    /// Captured `key=value` metadata; only set on [`TokenKind::BeginDocGen`].
    #[serde(rename = "annotationLiteral", default)]
    pub meta_annotation: String,
    pub line: usize,
    pub column: usize,
    pub source: Source,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>) -> Self {
        Token {
            kind,
            literal: literal.into(),
            meta_annotation: String::new(),
            line: 0,
            column: 0,
            source: Source::default(),
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl Default for Token {
    fn default() -> Self {
        Token::new(TokenKind::Eof, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_lookup() {
        assert_eq!(TokenKind::whitespace(b' '), Some(TokenKind::Space));
        assert_eq!(TokenKind::whitespace(b'\n'), Some(TokenKind::NewLine));
        assert_eq!(TokenKind::whitespace(0x0c), Some(TokenKind::Control));
        assert_eq!(TokenKind::whitespace(b'a'), None);
    }

    #[test]
    fn blank_excludes_line_breaks() {
        assert!(TokenKind::Tab.is_blank());
        assert!(!TokenKind::NewLine.is_blank());
        assert!(!TokenKind::CarriageReturn.is_blank());
    }

    #[test]
    fn token_serializes_with_interim_field_names() {
        let mut tok = Token::new(TokenKind::BeginDocGen, "//+gendoc id=foo");
        tok.meta_annotation = "id=foo".to_string();
        let json = serde_json::to_value(&tok).unwrap();
        assert_eq!(json["type"], "BEGIN_DOC_GEN");
        assert_eq!(json["annotationLiteral"], "id=foo");
    }
}
