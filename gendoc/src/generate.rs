//! Turning source files into an ordered list of annotation blocks.
//!
//! Every file is analyzed on its own tokio task; at most `concurrency` tasks
//! run at once. Results are collected in one place and the run is
//! all-or-nothing: a single failing block fails the whole batch.

use crate::files::FileEntry;
use anyhow::{bail, Context, Result};
use gendoc_syntax::{
    parse_source, Category, Config, ContentType, GenDoc, GenDocBlock, ParseError, Source, Token,
    TokenKind,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub const DEFAULT_CONCURRENCY: usize = 20;

const SCHEMA_MARKER: &str = ".schema.json";
const SAMPLE_MARKER: &str = ".sample.json";

/// One file's content, ready for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub file_name: String,
    pub full_path: String,
    pub content: String,
}

impl Input {
    /// Content type for files that are message documents in their own right.
    fn standalone_content(&self) -> Option<ContentType> {
        if self.full_path.contains(SCHEMA_MARKER) {
            Some(ContentType::JsonSchema)
        } else if self.full_path.contains(SAMPLE_MARKER) {
            Some(ContentType::Example)
        } else {
            None
        }
    }

    /// Message block covering the whole file, e.g. `OrderCreated.schema.json`
    /// describes message `OrderCreated`.
    fn standalone_block(&self, content_type: ContentType) -> GenDocBlock {
        let id = self
            .file_name
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();
        let token = Token {
            source: Source {
                file: self.file_name.clone(),
                path: self.full_path.clone(),
            },
            ..Token::new(TokenKind::Message, "")
        };
        GenDocBlock {
            begin_token: token.clone(),
            annotation: GenDoc {
                category: Some(Category::Message),
                content_type: Some(content_type),
                name: id.clone(),
                id,
                ..GenDoc::default()
            },
            precedence: Category::Message.precedence(),
            value: self.content.clone(),
            end_token: token,
        }
    }
}

/// Read every listed file. Invalid UTF-8 is decoded lossily.
pub async fn load_inputs(entries: &[FileEntry]) -> Result<Vec<Input>> {
    let mut inputs = Vec::with_capacity(entries.len());
    for entry in entries {
        let bytes = tokio::fs::read(&entry.path)
            .await
            .with_context(|| format!("failed to read {}", entry.path.display()))?;
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %entry.path.display(), "file is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };
        inputs.push(Input {
            file_name: entry.name.clone(),
            full_path: entry.path.to_string_lossy().into_owned(),
            content,
        });
    }
    Ok(inputs)
}

/// Bounded-parallel analysis of a batch of inputs.
pub struct Analyzer {
    config: Arc<Config>,
    environ: Arc<Vec<String>>,
    concurrency: usize,
}

impl Analyzer {
    pub fn new(config: Config, environ: Vec<String>) -> Self {
        Analyzer {
            config: Arc::new(config),
            environ: Arc::new(environ),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Analyze all inputs and return their blocks stably sorted by precedence.
    ///
    /// Blocks of equal precedence keep input order, then in-file order,
    /// however the tasks happen to finish.
    pub async fn run(&self, inputs: Vec<Input>) -> Result<Vec<GenDocBlock>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let total = inputs.len();

        for (index, input) in inputs.into_iter().enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .context("analysis semaphore closed")?;
            let config = Arc::clone(&self.config);
            let environ = Arc::clone(&self.environ);
            tasks.spawn(async move {
                let outcome = analyze(&input, &config, &environ);
                drop(permit);
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<(Vec<GenDocBlock>, Vec<ParseError>)>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = joined.context("analysis task failed")?;
            outcomes[index] = Some(outcome);
        }

        let mut blocks = Vec::new();
        let mut failures = Vec::new();
        for (found, errors) in outcomes.into_iter().flatten() {
            blocks.extend(found);
            failures.extend(errors.into_iter().map(|err| format!(" - {err}")));
        }

        if !failures.is_empty() {
            bail!(
                "{}\nanalysis failed: not all documents could be parsed",
                failures.join("\n")
            );
        }

        blocks.sort_by_key(|block| block.precedence);
        info!(files = total, blocks = blocks.len(), "analysis complete");
        Ok(blocks)
    }
}

fn analyze(
    input: &Input,
    config: &Config,
    environ: &[String],
) -> (Vec<GenDocBlock>, Vec<ParseError>) {
    if let Some(content_type) = input.standalone_content() {
        debug!(path = %input.full_path, %content_type, "standalone message file");
        return (vec![input.standalone_block(content_type)], Vec::new());
    }
    let (blocks, errors) = parse_source(
        &input.content,
        &input.file_name,
        &input.full_path,
        config,
        environ,
    );
    debug!(path = %input.full_path, blocks = blocks.len(), errors = errors.len(), "analyzed");
    (blocks, errors)
}

// -- Interim state ------------------------------------------------------------

/// Serialize analyzed blocks as an interim state document.
pub fn interim_state(blocks: &[GenDocBlock]) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(blocks).context("failed to serialize interim state")
}

/// Concatenate interim state documents in input order and sort by precedence.
pub fn merge_interim(inputs: &[Input]) -> Result<Vec<GenDocBlock>> {
    let mut blocks = Vec::new();
    for input in inputs {
        let state: Vec<GenDocBlock> = serde_json::from_str(&input.content)
            .with_context(|| format!("invalid interim state in {}", input.full_path))?;
        blocks.extend(state);
    }
    blocks.sort_by_key(|block| block.precedence);
    Ok(blocks)
}
