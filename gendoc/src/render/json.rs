//! JSON renderer: structured output for tooling integration.

use crate::asyncapi::model::AsyncApiDocument;
use crate::render::Renderer;
use anyhow::{Context, Result};

pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, doc: &AsyncApiDocument) -> Result<String> {
        let mut out =
            serde_json::to_string_pretty(doc).context("failed to serialize document as JSON")?;
        out.push('\n');
        Ok(out)
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}
