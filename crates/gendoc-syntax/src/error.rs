//! Block-level parse errors.

use crate::annotation::AnnotationError;
use crate::token::Token;
use std::fmt;
use thiserror::Error;

/// Where in the input an error was raised: the begin marker of the block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn of(token: &Token) -> Self {
        Location {
            file: token.source.file.clone(),
            line: token.line,
            column: token.column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error(transparent)]
    Annotation(#[from] AnnotationError),
    #[error("illegal byte {0:#04x} in marker metadata")]
    Illegal(u8),
    #[error("no corresponding //-gendoc end marker found")]
    NoEndMarker,
    #[error("variable '{name}' specified in the content was not found in the environment ({reason})")]
    Expansion { name: String, reason: String },
    #[error("category must be specified")]
    CategoryRequired,
    #[error("{0} annotation: id must be specified")]
    IdRequired(&'static str),
    #[error("{0} annotation: parent must be specified")]
    ParentRequired(&'static str),
    #[error("{0} annotation: content type must be specified")]
    ContentTypeRequired(&'static str),
}

/// A [`ParseErrorKind`] tagged with the location of the offending block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{location}] {kind}")]
pub struct ParseError {
    pub location: Location,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn at(token: &Token, kind: impl Into<ParseErrorKind>) -> Self {
        ParseError {
            location: Location::of(token),
            kind: kind.into(),
        }
    }
}
