//! Marker-aware lexer for arbitrary source text.
//!
//! No host language grammar is assumed. Whitespace is tokenized byte by byte
//! so captured bodies keep their original layout, `//` is inspected for the
//! `+gendoc`/`-gendoc` keywords, and `<!--`/`-->` are matched speculatively
//! so markdown-wrapped markers are recognized. Everything else collapses into
//! `Text` runs.

use crate::token::{
    Source, Token, TokenKind, BEGIN_DOC, BEGIN_HTML_COMMENT, END_DOC, END_HTML_COMMENT,
};

/// Bytes that end a `Text` run in addition to whitespace and control bytes.
const PUNCTUATION: &[u8] = b"/#<-";

/// Single-pass lexer over one file.
pub struct Lexer<'a> {
    input: &'a str,
    source: Source,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, file_name: impl Into<String>, path: impl Into<String>) -> Self {
        Lexer {
            input,
            source: Source {
                file: file_name.into(),
                path: path.into(),
            },
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Advance past the next token and return it. Returns `Eof` forever once
    /// the input is exhausted.
    pub fn next_token(&mut self) -> Token {
        let start = self.pos;
        let (line, column) = (self.line, self.column);
        let mut meta_annotation = String::new();

        let kind = match self.peek(0) {
            None => TokenKind::Eof,
            Some(b'/') => self.read_slash(&mut meta_annotation),
            Some(b'#') => {
                self.advance(1);
                TokenKind::Hash
            }
            Some(b'<') => self.read_html_comment(BEGIN_HTML_COMMENT, TokenKind::BeginHtmlComment),
            Some(b'-') => self.read_html_comment(END_HTML_COMMENT, TokenKind::EndHtmlComment),
            Some(ch) => match TokenKind::whitespace(ch) {
                Some(kind) => {
                    self.advance(1);
                    kind
                }
                None if is_control(ch) => {
                    self.advance(1);
                    TokenKind::Illegal
                }
                None => {
                    self.read_text();
                    TokenKind::Text
                }
            },
        };

        Token {
            kind,
            literal: self.input[start..self.pos].to_string(),
            meta_annotation,
            line,
            column,
            source: self.source.clone(),
        }
    }

    // -- Cursor -----------------------------------------------------------------

    fn peek(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    fn rest(&self) -> &[u8] {
        &self.input.as_bytes()[self.pos..]
    }

    /// Move the cursor `n` bytes forward, keeping line/column in step.
    /// Columns count characters, not bytes.
    fn advance(&mut self, n: usize) {
        let end = (self.pos + n).min(self.input.len());
        for &b in &self.input.as_bytes()[self.pos..end] {
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else if b & 0xC0 != 0x80 {
                self.column += 1;
            }
        }
        self.pos = end;
    }

    // -- Token readers ----------------------------------------------------------

    fn read_slash(&mut self, meta_annotation: &mut String) -> TokenKind {
        if self.peek(1) != Some(b'/') {
            self.advance(1);
            return TokenKind::ForwardSlash;
        }
        let after = &self.rest()[2..];
        if after.starts_with(BEGIN_DOC.as_bytes()) {
            self.advance(2 + BEGIN_DOC.len());
            *meta_annotation = self.read_meta_annotation();
            TokenKind::BeginDocGen
        } else if after.len() >= END_DOC.len()
            && after[..END_DOC.len()].eq_ignore_ascii_case(END_DOC.as_bytes())
        {
            self.advance(2 + END_DOC.len());
            TokenKind::EndDocGen
        } else {
            self.advance(2);
            TokenKind::DoubleForwardSlash
        }
    }

    /// Capture the rest of the marker line as metadata.
    ///
    /// A backslash directly before a line break continues the metadata on the
    /// next line; both characters are dropped from the capture. The line break
    /// that ends the metadata is left for the next token.
    fn read_meta_annotation(&mut self) -> String {
        let mut captured = String::new();
        let mut segment_start = self.pos;
        while let Some(ch) = self.peek(0) {
            match ch {
                b'\n' => break,
                b'\\' if self.peek(1) == Some(b'\n') => {
                    captured.push_str(&self.input[segment_start..self.pos]);
                    self.advance(2);
                    segment_start = self.pos;
                }
                b'\\' if self.peek(1) == Some(b'\r') && self.peek(2) == Some(b'\n') => {
                    captured.push_str(&self.input[segment_start..self.pos]);
                    self.advance(3);
                    segment_start = self.pos;
                }
                _ => self.advance(1),
            }
        }
        captured.push_str(&self.input[segment_start..self.pos]);
        captured.trim().to_string()
    }

    /// Speculatively match an HTML comment delimiter. On a miss the cursor is
    /// left at the start and only the leading character is consumed as text.
    fn read_html_comment(&mut self, delimiter: &str, kind: TokenKind) -> TokenKind {
        if !self.rest().starts_with(delimiter.as_bytes()) {
            self.advance(1);
            return TokenKind::Text;
        }
        self.advance(delimiter.len());
        while self.peek(0) == Some(b' ') {
            self.advance(1);
        }
        kind
    }

    fn read_text(&mut self) {
        let len = self
            .rest()
            .iter()
            .position(|&b| is_text_boundary(b))
            .unwrap_or(self.input.len() - self.pos);
        self.advance(len.max(1));
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields tokens up to, but not including, `Eof`.
    fn next(&mut self) -> Option<Token> {
        let tok = self.next_token();
        (!tok.is(TokenKind::Eof)).then_some(tok)
    }
}

/// Lex a whole input into a token vector (without the trailing `Eof`).
pub fn tokenize(input: &str, file_name: &str, path: &str) -> Vec<Token> {
    Lexer::new(input, file_name, path).collect()
}

fn is_control(b: u8) -> bool {
    b < 0x20
}

fn is_text_boundary(b: u8) -> bool {
    TokenKind::whitespace(b).is_some() || is_control(b) || PUNCTUATION.contains(&b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kinds_and_literals(input: &str) -> Vec<(TokenKind, String)> {
        tokenize(input, "bar", "/foo/bar")
            .into_iter()
            .map(|t| (t.kind, t.literal))
            .collect()
    }

    #[test]
    fn marker_inside_block_comment() {
        let input = "foo stuyfsdfsf\n/* som comment\n//+gendoc type=message consumer=[] \\\nmultiline=val2\nclass {\n\tstuff string {get; set;}\n}\n//-gendoc\n\n/// <summary> ignorethis\n# another comment\n";
        let expected: Vec<(TokenKind, &str)> = vec![
            (TokenKind::Text, "foo"),
            (TokenKind::Space, " "),
            (TokenKind::Text, "stuyfsdfsf"),
            (TokenKind::NewLine, "\n"),
            (TokenKind::ForwardSlash, "/"),
            (TokenKind::Text, "*"),
            (TokenKind::Space, " "),
            (TokenKind::Text, "som"),
            (TokenKind::Space, " "),
            (TokenKind::Text, "comment"),
            (TokenKind::NewLine, "\n"),
            (
                TokenKind::BeginDocGen,
                "//+gendoc type=message consumer=[] \\\nmultiline=val2",
            ),
            (TokenKind::NewLine, "\n"),
            (TokenKind::Text, "class"),
            (TokenKind::Space, " "),
            (TokenKind::Text, "{"),
            (TokenKind::NewLine, "\n"),
            (TokenKind::Tab, "\t"),
            (TokenKind::Text, "stuff"),
            (TokenKind::Space, " "),
            (TokenKind::Text, "string"),
            (TokenKind::Space, " "),
            (TokenKind::Text, "{get;"),
            (TokenKind::Space, " "),
            (TokenKind::Text, "set;}"),
            (TokenKind::NewLine, "\n"),
            (TokenKind::Text, "}"),
            (TokenKind::NewLine, "\n"),
            (TokenKind::EndDocGen, "//-gendoc"),
            (TokenKind::NewLine, "\n"),
            (TokenKind::NewLine, "\n"),
            (TokenKind::DoubleForwardSlash, "//"),
            (TokenKind::ForwardSlash, "/"),
            (TokenKind::Space, " "),
            (TokenKind::Text, "<"),
            (TokenKind::Text, "summary>"),
            (TokenKind::Space, " "),
            (TokenKind::Text, "ignorethis"),
            (TokenKind::NewLine, "\n"),
            (TokenKind::Hash, "#"),
            (TokenKind::Space, " "),
            (TokenKind::Text, "another"),
            (TokenKind::Space, " "),
            (TokenKind::Text, "comment"),
            (TokenKind::NewLine, "\n"),
        ];
        let got = kinds_and_literals(input);
        let expected: Vec<(TokenKind, String)> = expected
            .into_iter()
            .map(|(k, l)| (k, l.to_string()))
            .collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn continuation_is_dropped_from_metadata() {
        let mut lexer = Lexer::new(
            "//+gendoc type=example \\\ncategory=message \\\r\nid=foo\nbody",
            "bar",
            "/foo/bar",
        );
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::BeginDocGen);
        assert_eq!(tok.meta_annotation, "type=example category=message id=foo");
        assert_eq!(lexer.next_token().kind, TokenKind::NewLine);
    }

    #[test]
    fn html_wrapped_markers() {
        let got = kinds_and_literals("<!-- //+gendoc category=info -->\nhi\n<!--   //-gendoc -->");
        let kinds: Vec<TokenKind> = got.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::BeginHtmlComment,
                TokenKind::BeginDocGen,
                TokenKind::NewLine,
                TokenKind::Text,
                TokenKind::NewLine,
                TokenKind::BeginHtmlComment,
                TokenKind::EndDocGen,
                TokenKind::Space,
                TokenKind::EndHtmlComment,
            ]
        );
        assert_eq!(got[0].1, "<!-- ");
        assert_eq!(got[5].1, "<!--   ");
    }

    #[test]
    fn begin_marker_metadata_keeps_comment_close() {
        let mut lexer = Lexer::new("<!-- //+gendoc category=info -->\n", "a.md", "a.md");
        lexer.next_token();
        let tok = lexer.next_token();
        assert_eq!(tok.meta_annotation, "category=info -->");
    }

    #[test]
    fn failed_speculative_match_restores_cursor() {
        let got = kinds_and_literals("<!x --x a-->");
        assert_eq!(
            got,
            vec![
                (TokenKind::Text, "<".to_string()),
                (TokenKind::Text, "!x".to_string()),
                (TokenKind::Space, " ".to_string()),
                (TokenKind::Text, "-".to_string()),
                (TokenKind::Text, "-".to_string()),
                (TokenKind::Text, "x".to_string()),
                (TokenKind::Space, " ".to_string()),
                (TokenKind::Text, "a".to_string()),
                (TokenKind::EndHtmlComment, "-->".to_string()),
            ]
        );
    }

    #[test]
    fn end_marker_is_case_insensitive() {
        let got = kinds_and_literals("//-GenDoc");
        assert_eq!(got, vec![(TokenKind::EndDocGen, "//-GenDoc".to_string())]);
    }

    #[test]
    fn begin_marker_is_case_sensitive() {
        let got = kinds_and_literals("//+GENDOC");
        assert_eq!(got[0].0, TokenKind::DoubleForwardSlash);
    }

    #[test]
    fn positions_and_source_are_recorded() {
        let toks = tokenize("ab\n  //-gendoc", "f.cs", "/src/f.cs");
        let end = toks.iter().find(|t| t.is(TokenKind::EndDocGen)).unwrap();
        assert_eq!((end.line, end.column), (2, 3));
        assert_eq!(end.source.file, "f.cs");
        assert_eq!(end.source.path, "/src/f.cs");
        assert_eq!((toks[0].line, toks[0].column), (1, 1));
    }

    #[test]
    fn columns_count_characters() {
        let toks = tokenize("é x", "f", "f");
        assert_eq!(toks[2].column, 3);
    }

    #[test]
    fn control_bytes_are_illegal() {
        let got = kinds_and_literals("a\u{1}b");
        assert_eq!(got[1].0, TokenKind::Illegal);
        assert_eq!(got[2], (TokenKind::Text, "b".to_string()));
    }

    #[test]
    fn eof_is_idempotent() {
        let mut lexer = Lexer::new("x", "f", "f");
        lexer.next_token();
        for _ in 0..3 {
            let tok = lexer.next_token();
            assert_eq!(tok.kind, TokenKind::Eof);
            assert_eq!(tok.literal, "");
        }
    }

    proptest! {
        #[test]
        fn literals_reproduce_input(input in "\\PC*") {
            let joined: String = tokenize(&input, "f", "f").into_iter().map(|t| t.literal).collect();
            prop_assert_eq!(joined, input);
        }

        #[test]
        fn literals_reproduce_marker_heavy_input(
            input in "(//\\+gendoc|//-gendoc|<!--|-->|[ \\t\\r\\n\\\\#/<>=a-z-])*"
        ) {
            let joined: String = tokenize(&input, "f", "f").into_iter().map(|t| t.literal).collect();
            prop_assert_eq!(joined, input);
        }
    }
}
