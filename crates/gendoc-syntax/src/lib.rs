//! gendoc syntax: marker lexer, annotation metadata and annotation blocks.
//!
//! Sources carry documentation for an event-driven service landscape inside
//! comments:
//!
//! ```text
//! //+gendoc category=message type=description id=order-created
//! Emitted once an order has been accepted.
//! //-gendoc
//! ```
//!
//! [`lexer::Lexer`] tokenizes any text without knowing its host language,
//! [`parser::Parser`] turns the token stream into validated
//! [`parser::GenDocBlock`]s.

pub mod annotation;
pub mod error;
pub mod expand;
pub mod lexer;
pub mod parser;
pub mod token;

pub use annotation::{AnnotationError, Category, ContentType, GenDoc, Precedence};
pub use error::{Location, ParseError, ParseErrorKind};
pub use lexer::Lexer;
pub use parser::{parse_source, Config, GenDocBlock, Parser};
pub use token::{Source, Token, TokenKind};
