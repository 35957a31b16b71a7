//! Annotation metadata: the `key=value` pairs following `//+gendoc`.
//!
//! ```text
//! //+gendoc category=message type=example id=order-created parent=orders
//! ```
//!
//! Recognized keys are `id`, `parent`/`p`, `serviceId`, `channelId`, `type`
//! and `category`/`cat`/`c`. Unknown keys are skipped so new metadata can be
//! added to sources before the tool understands it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading the metadata string of a begin marker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("'{0}' cannot be split into a key=value")]
    UnparseableTag(String),
    #[error("key '{key}' and value '{value}': both key and value must be a non-zero length string")]
    ZeroLengthKeyOrValue { key: String, value: String },
    #[error("category '{0}' incorrect, should be one of ['root','info','server','channel','subOperation','pubOperation','message']")]
    IncorrectCategory(String),
    #[error("type '{0}' incorrect, should be one of ['json_schema','example','title','summary','description','nameId']")]
    IncorrectContentType(String),
}

// -- Content type -------------------------------------------------------------

/// Where the captured body ends up in the generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "json_schema")]
    JsonSchema,
    #[serde(rename = "example")]
    Example,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "summary")]
    Summary,
    #[serde(rename = "description")]
    Description,
    /// The body itself is the identifier of the entity.
    #[serde(rename = "nameId")]
    NameId,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::JsonSchema => "json_schema",
            ContentType::Example => "example",
            ContentType::Title => "title",
            ContentType::Summary => "summary",
            ContentType::Description => "description",
            ContentType::NameId => "nameId",
        }
    }
}

impl FromStr for ContentType {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json_schema" => Ok(ContentType::JsonSchema),
            "example" => Ok(ContentType::Example),
            "title" => Ok(ContentType::Title),
            "summary" => Ok(ContentType::Summary),
            "description" => Ok(ContentType::Description),
            "nameId" => Ok(ContentType::NameId),
            other => Err(AnnotationError::IncorrectContentType(other.to_string())),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -- Category -----------------------------------------------------------------

/// Top-level category of an annotation; decides where in the hierarchy it goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Root,
    Info,
    Server,
    Channel,
    SubOperation,
    PubOperation,
    Message,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Root => "root",
            Category::Info => "info",
            Category::Server => "server",
            Category::Channel => "channel",
            Category::SubOperation => "subOperation",
            Category::PubOperation => "pubOperation",
            Category::Message => "message",
        }
    }

    pub fn precedence(self) -> Precedence {
        match self {
            Category::Root | Category::Info | Category::Server => Precedence::Service,
            Category::Channel => Precedence::Channel,
            Category::SubOperation | Category::PubOperation => Precedence::Operation,
            Category::Message => Precedence::Message,
        }
    }
}

impl FromStr for Category {
    type Err = AnnotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(Category::Root),
            "info" => Ok(Category::Info),
            "server" => Ok(Category::Server),
            "channel" => Ok(Category::Channel),
            "subOperation" => Ok(Category::SubOperation),
            "pubOperation" => Ok(Category::PubOperation),
            "message" => Ok(Category::Message),
            other => Err(AnnotationError::IncorrectCategory(other.to_string())),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -- Precedence ---------------------------------------------------------------

/// Depth of an entity in the service hierarchy.
///
/// `Structural` is reserved for the synthetic root and branch nodes of the
/// context tree; every annotation maps to one of the four other classes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum Precedence {
    Structural = 0,
    Service = 1,
    Channel = 2,
    Operation = 3,
    Message = 4,
}

impl Precedence {
    /// The class one level up, i.e. where a parent is looked up.
    pub fn parent(self) -> Option<Precedence> {
        match self {
            Precedence::Structural => None,
            Precedence::Service => Some(Precedence::Structural),
            Precedence::Channel => Some(Precedence::Service),
            Precedence::Operation => Some(Precedence::Channel),
            Precedence::Message => Some(Precedence::Operation),
        }
    }
}

impl From<Precedence> for u8 {
    fn from(p: Precedence) -> u8 {
        p as u8
    }
}

impl TryFrom<u8> for Precedence {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Precedence::Structural),
            1 => Ok(Precedence::Service),
            2 => Ok(Precedence::Channel),
            3 => Ok(Precedence::Operation),
            4 => Ok(Precedence::Message),
            other => Err(format!("unknown precedence class {other}")),
        }
    }
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Precedence::Structural => "structural",
            Precedence::Service => "service",
            Precedence::Channel => "channel",
            Precedence::Operation => "operation",
            Precedence::Message => "message",
        };
        f.write_str(name)
    }
}

// -- GenDoc record ------------------------------------------------------------

/// Parsed metadata of one annotation block.
///
/// Starts out as whatever the marker declared; the block parser then fills in
/// fallbacks (`parent`, `id`, service URN) during validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenDoc {
    #[serde(rename = "category", default)]
    pub category: Option<Category>,
    #[serde(rename = "type", default)]
    pub content_type: Option<ContentType>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    /// Owning service, for children declared outside the service's repo.
    #[serde(rename = "serviceId", default)]
    pub service_id: String,
    /// Owning channel, for operations declared outside the channel's repo.
    #[serde(rename = "channelId", default)]
    pub channel_id: String,
    #[serde(default)]
    pub parent: String,
    #[serde(rename = "serviceURN", default)]
    pub service_urn: String,
    #[serde(rename = "serviceRepoUrl", default)]
    pub service_repo_url: String,
    #[serde(rename = "serviceRepoLang", default)]
    pub service_repo_lang: String,
}

/// Tokens that only close a wrapping comment and carry no metadata.
const COMMENT_SENTINELS: &[&str] = &["-->", "#", "##"];

impl GenDoc {
    /// Parse the raw metadata captured after `//+gendoc`.
    pub fn parse(raw: &str) -> Result<GenDoc, AnnotationError> {
        let mut doc = GenDoc::default();
        for pair in raw.split_whitespace() {
            if COMMENT_SENTINELS.contains(&pair) {
                continue;
            }
            let mut parts = pair.split('=');
            let (key, value) = match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => (key, value),
                _ => return Err(AnnotationError::UnparseableTag(pair.to_string())),
            };
            if key.is_empty() || value.is_empty() {
                return Err(AnnotationError::ZeroLengthKeyOrValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
            match key {
                "id" => doc.id = value.to_string(),
                "parent" | "p" => doc.parent = value.to_string(),
                "serviceId" => doc.service_id = value.to_string(),
                "channelId" => doc.channel_id = value.to_string(),
                "type" => doc.content_type = Some(value.parse()?),
                "category" | "cat" | "c" => doc.category = Some(value.parse()?),
                _ => debug!(pair, key, "unknown gendoc key, skipping"),
            }
        }
        Ok(doc)
    }

    pub fn precedence(&self) -> Option<Precedence> {
        self.category.map(Category::precedence)
    }
}
