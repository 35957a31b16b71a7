//! Recursive source file listing.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Files below any of these directories are ignored.
const SKIP_DIRS: &[&str] = &[
    "bin",
    "dist",
    "node_modules",
    ".cache",
    ".terraform",
    ".git",
    "obj",
    "target",
];

const SKIP_FILES: &[&str] = &[".DS_Store", ".dockerignore", ".gitignore"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// File name without directories, e.g. `order.schema.json`.
    pub name: String,
    pub path: PathBuf,
    /// Extension without the dot; empty when there is none.
    pub file_type: String,
}

/// List every file below `base` in lexical path order.
pub fn list_files(base: &Path) -> Result<Vec<FileEntry>> {
    if !base.is_dir() {
        anyhow::bail!("not a directory: {}", base.display());
    }
    let pattern = format!("{}/**/*", glob::Pattern::escape(&base.to_string_lossy()));
    let mut files = Vec::new();
    for entry in glob::glob(&pattern).with_context(|| format!("invalid glob pattern: {}", pattern))? {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                warn!(path = %err.path().display(), error = %err.error(), "skipping unreadable path");
                continue;
            }
        };
        if !path.is_file() || is_skipped(base, &path) {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_type = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        files.push(FileEntry {
            name,
            path,
            file_type,
        });
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn is_skipped(base: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(base).unwrap_or(path);
    let mut components: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let Some(file_name) = components.pop() else {
        return true;
    };
    SKIP_FILES.contains(&file_name.as_str())
        || components.iter().any(|dir| SKIP_DIRS.contains(&dir.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn lists_recursively_in_order() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/b.cs");
        touch(dir.path(), "src/a.cs");
        touch(dir.path(), "README.md");
        touch(dir.path(), "schemas/evt.schema.json");

        let files = list_files(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["README.md", "evt.schema.json", "a.cs", "b.cs"]);
        assert_eq!(files[1].file_type, "json");
        assert!(files[2].path.ends_with("src/a.cs"));
    }

    #[test]
    fn skips_build_and_vcs_directories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "keep.tf");
        touch(dir.path(), "node_modules/pkg/index.js");
        touch(dir.path(), ".git/HEAD");
        touch(dir.path(), "src/obj/Debug/gen.cs");
        touch(dir.path(), "bin/tool");
        touch(dir.path(), ".gitignore");
        touch(dir.path(), "docs/.DS_Store");

        let files = list_files(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["keep.tf"]);
    }

    #[test]
    fn dot_files_are_listed() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".env.sample");
        let files = list_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_type, "sample");
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(list_files(&dir.path().join("nope")).is_err());
    }
}
