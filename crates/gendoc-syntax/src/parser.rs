//! Block parser: turns a token stream into validated annotation blocks.
//!
//! Text outside `//+gendoc ... //-gendoc` pairs is thrown away. Each pair
//! yields one [`GenDocBlock`] whose metadata has been parsed, whose body has
//! been interpolated from the supplied environment, and whose identity and
//! parent linkage have been checked against its precedence class.
//!
//! Errors never stop the scan; every problem in a file is reported in one
//! pass.

use crate::annotation::{Category, ContentType, GenDoc, Precedence};
use crate::error::{ParseError, ParseErrorKind};
use crate::expand::expand;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

static RE_NAME_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9~\-|#._]+").unwrap());

/// Repository-level context stamped onto service annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub service_id: String,
    pub service_repo_url: String,
    pub service_repo_lang: String,
    /// Business level domain, e.g. `warehouse`.
    pub business_domain: String,
    /// Bounded context within the business domain.
    pub bounded_domain: String,
}

impl Config {
    /// `urn:<business domain>:<bounded domain>:<id>`
    pub fn service_urn(&self, id: &str) -> String {
        format!("urn:{}:{}:{}", self.business_domain, self.bounded_domain, id)
    }
}

/// One begin/end marker pair and everything derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenDocBlock {
    #[serde(rename = "beginToken")]
    pub begin_token: Token,
    pub annotation: GenDoc,
    #[serde(rename = "docCategory")]
    pub precedence: Precedence,
    pub value: String,
    #[serde(rename = "endToken")]
    pub end_token: Token,
}

pub struct Parser<'a, 'c> {
    lexer: Lexer<'a>,
    config: &'c Config,
    environ: Vec<String>,
    /// Begin marker that closed an unterminated block; scanned next.
    pending: Option<Token>,
    blocks: Vec<GenDocBlock>,
    errors: Vec<ParseError>,
}

impl<'a, 'c> Parser<'a, 'c> {
    pub fn new(lexer: Lexer<'a>, config: &'c Config) -> Self {
        Parser {
            lexer,
            config,
            environ: Vec::new(),
            pending: None,
            blocks: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Environment used for body interpolation, as `KEY=VALUE` entries.
    pub fn with_environment(mut self, environ: Vec<String>) -> Self {
        self.environ = environ;
        self
    }

    /// Scan the whole input. Blocks come back in source order.
    pub fn parse(mut self) -> (Vec<GenDocBlock>, Vec<ParseError>) {
        loop {
            let tok = self.next_token();
            match tok.kind {
                TokenKind::Eof => break,
                TokenKind::BeginDocGen => {
                    if let Some(block) = self.parse_block(tok) {
                        self.blocks.push(block);
                    }
                }
                _ => {}
            }
        }
        debug!(
            file = %self.lexer.source().path,
            blocks = self.blocks.len(),
            errors = self.errors.len(),
            "parsed file"
        );
        (self.blocks, self.errors)
    }

    fn next_token(&mut self) -> Token {
        match self.pending.take() {
            Some(tok) => tok,
            None => self.lexer.next_token(),
        }
    }

    fn fail(&mut self, at: &Token, kind: impl Into<ParseErrorKind>) -> Option<GenDocBlock> {
        self.errors.push(ParseError::at(at, kind));
        None
    }

    fn parse_block(&mut self, begin: Token) -> Option<GenDocBlock> {
        if let Some(byte) = begin
            .meta_annotation
            .bytes()
            .find(|b| b.is_ascii_control() && !b.is_ascii_whitespace())
        {
            return self.fail(&begin, ParseErrorKind::Illegal(byte));
        }
        let annotation = match GenDoc::parse(&begin.meta_annotation) {
            Ok(annotation) => annotation,
            Err(err) => return self.fail(&begin, err),
        };

        let mut body = Vec::new();
        let end = loop {
            let tok = self.next_token();
            match tok.kind {
                TokenKind::EndDocGen => break tok,
                TokenKind::Eof => return self.fail(&begin, ParseErrorKind::NoEndMarker),
                TokenKind::BeginDocGen => {
                    self.pending = Some(tok);
                    return self.fail(&begin, ParseErrorKind::NoEndMarker);
                }
                _ => body.push(tok),
            }
        };

        let raw: String = trim_body(&body).iter().map(|t| t.literal.as_str()).collect();
        let value = match expand(&raw, &self.environ) {
            Ok(value) => value,
            Err(err) => return self.fail(&begin, err),
        };

        let Some(category) = annotation.category else {
            return self.fail(&begin, ParseErrorKind::CategoryRequired);
        };
        let annotation = match self.validate(annotation, category, &value) {
            Ok(annotation) => annotation,
            Err(err) => return self.fail(&begin, err),
        };

        Some(GenDocBlock {
            begin_token: begin,
            annotation,
            precedence: category.precedence(),
            value,
            end_token: end,
        })
    }

    /// Fill in fallbacks and enforce the required fields of each precedence
    /// class.
    fn validate(
        &self,
        mut a: GenDoc,
        category: Category,
        value: &str,
    ) -> Result<GenDoc, ParseErrorKind> {
        if a.content_type == Some(ContentType::NameId) {
            if let Some(m) = RE_NAME_ID.find(value) {
                a.id = m.as_str().to_string();
            }
        }

        match category {
            Category::Root | Category::Info | Category::Server => {
                if a.id.is_empty() {
                    if self.config.service_id.is_empty() {
                        return Err(ParseErrorKind::IdRequired("service"));
                    }
                    a.id = self.config.service_id.clone();
                }
                a.service_repo_lang = self.config.service_repo_lang.clone();
                a.service_repo_url = self.config.service_repo_url.clone();
                a.service_urn = self.config.service_urn(&a.id);
            }
            Category::Channel => {
                if a.id.is_empty() {
                    return Err(ParseErrorKind::IdRequired("channel"));
                }
                if a.parent.is_empty() {
                    if self.config.service_id.is_empty() {
                        return Err(ParseErrorKind::ParentRequired("channel"));
                    }
                    a.parent = self.config.service_id.clone();
                }
            }
            Category::SubOperation | Category::PubOperation => {
                if a.id.is_empty() {
                    return Err(ParseErrorKind::IdRequired("operation"));
                }
                if a.parent.is_empty() {
                    if a.channel_id.is_empty() {
                        return Err(ParseErrorKind::ParentRequired("operation"));
                    }
                    a.parent = a.channel_id.clone();
                }
            }
            Category::Message => {
                if a.id.is_empty() {
                    return Err(ParseErrorKind::IdRequired("message"));
                }
                // a message and the operation carrying it share an id
                if a.parent.is_empty() {
                    a.parent = a.id.clone();
                }
                if a.content_type.is_none() {
                    return Err(ParseErrorKind::ContentTypeRequired("message"));
                }
            }
        }

        a.name = a.id.clone();
        Ok(a)
    }
}

/// Drop the line break after the begin marker, and the comment wrapper,
/// trailing blanks and final line break before the end marker.
fn trim_body(body: &[Token]) -> &[Token] {
    let mut body = body;

    match body {
        [first, ..] if first.is(TokenKind::NewLine) => body = &body[1..],
        [first, second, ..]
            if first.is(TokenKind::CarriageReturn) && second.is(TokenKind::NewLine) =>
        {
            body = &body[2..]
        }
        _ => {}
    }

    body = trim_trailing_blanks(body);
    if let [rest @ .., last] = body {
        if last.kind.is_html_comment() {
            body = trim_trailing_blanks(rest);
        }
    }
    if let [rest @ .., last] = body {
        if last.is(TokenKind::NewLine) {
            body = rest;
            if let [rest @ .., last] = body {
                if last.is(TokenKind::CarriageReturn) {
                    body = rest;
                }
            }
        }
    }
    body
}

fn trim_trailing_blanks(mut body: &[Token]) -> &[Token] {
    while let [rest @ .., last] = body {
        if !last.kind.is_blank() {
            break;
        }
        body = rest;
    }
    body
}

/// Parse one file's text in a single call.
pub fn parse_source(
    input: &str,
    file_name: &str,
    path: &str,
    config: &Config,
    environ: &[String],
) -> (Vec<GenDocBlock>, Vec<ParseError>) {
    Parser::new(Lexer::new(input, file_name, path), config)
        .with_environment(environ.to_vec())
        .parse()
}
