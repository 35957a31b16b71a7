//! Storage locations and the clients that read from and write to them.
//!
//! Locations are URLs of the form `<scheme>://<rest>`:
//!
//! - `local://<path>`: a directory; `$HOME` and `~` are expanded.
//! - `azblob://<account>/<container>`: an Azure blob container.

mod local;

pub use local::LocalStorage;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    Local { root: PathBuf },
    AzBlob { account: String, container: String },
}

impl StorageLocation {
    /// Directory on disk for `local://` locations.
    pub fn local_root(&self) -> Result<&Path> {
        match self {
            StorageLocation::Local { root } => Ok(root),
            other => bail!("{other} is not a local:// location"),
        }
    }
}

impl FromStr for StorageLocation {
    type Err = anyhow::Error;

    fn from_str(location: &str) -> Result<Self> {
        if location.is_empty() {
            bail!("storage location must not be empty");
        }
        let Some((scheme, rest)) = location.split_once("://") else {
            bail!("protocol error in '{location}', expected the `<scheme>://` form");
        };
        match scheme {
            "local" => {
                if rest.is_empty() {
                    bail!("'{location}': at least one file system segment must be provided");
                }
                let expanded = shellexpand::full(rest)
                    .with_context(|| format!("failed to expand '{rest}'"))?;
                Ok(StorageLocation::Local {
                    root: PathBuf::from(expanded.as_ref()),
                })
            }
            "azblob" => {
                let mut segments = rest.trim_start_matches('/').split('/');
                match (segments.next(), segments.next()) {
                    (Some(account), Some(container))
                        if !account.is_empty() && !container.is_empty() =>
                    {
                        Ok(StorageLocation::AzBlob {
                            account: account.to_string(),
                            container: container.to_string(),
                        })
                    }
                    _ => bail!("'{location}': expected azblob://<account>/<container>"),
                }
            }
            other => bail!(
                "unsupported protocol '{other}://', must be one of ['local://','azblob://']"
            ),
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageLocation::Local { root } => write!(f, "local://{}", root.display()),
            StorageLocation::AzBlob { account, container } => {
                write!(f, "azblob://{account}/{container}")
            }
        }
    }
}

/// Copy everything stored at a location into a local directory.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub emit_path: PathBuf,
}

/// Store `body` under `key` (a `/`-separated relative path) at a location.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub key: String,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<()>;
    async fn upload(&self, request: &UploadRequest) -> Result<()>;
}

/// Create the client for `location`.
pub fn client_for(location: &StorageLocation) -> Result<Box<dyn StorageClient>> {
    match location {
        StorageLocation::Local { root } => Ok(Box::new(LocalStorage::new(root.clone()))),
        StorageLocation::AzBlob { .. } => {
            bail!("unsupported storage backend: no client for {location} in this build")
        }
    }
}
