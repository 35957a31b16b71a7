//! Environment interpolation for captured bodies.
//!
//! `$NAME` and `${NAME}` are replaced from an explicitly supplied environment
//! (ordered `KEY=VALUE` strings, later entries win). The process environment
//! is never consulted here.

use crate::error::ParseErrorKind;

#[derive(Debug)]
enum Unresolved {
    Missing,
    Empty,
}

/// Expand every variable reference in `input`.
///
/// A reference to a name that is absent, or bound to an empty value, is an
/// error.
pub fn expand(input: &str, environ: &[String]) -> Result<String, ParseErrorKind> {
    let lookup = |name: &str| -> Result<Option<String>, Unresolved> {
        let value = environ
            .iter()
            .rev()
            .filter_map(|entry| entry.split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value);
        match value {
            None => Err(Unresolved::Missing),
            Some("") => Err(Unresolved::Empty),
            Some(value) => Ok(Some(value.to_string())),
        }
    };

    shellexpand::env_with_context(input, lookup)
        .map(|expanded| expanded.into_owned())
        .map_err(|err| ParseErrorKind::Expansion {
            name: err.var_name,
            reason: match err.cause {
                Unresolved::Missing => "not set".to_string(),
                Unresolved::Empty => "set but empty".to_string(),
            },
        })
}
