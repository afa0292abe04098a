//! Source tree traversal and file decoding.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// Extensions indexed when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["cs", "md", "txt"];

/// What to do with bytes that are not valid UTF-8.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Drop invalid sequences and keep the rest of the file.
    #[default]
    Lossy,
    /// Fail the run, naming the offending file.
    Strict,
}

impl std::str::FromStr for DecodePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lossy" => Ok(Self::Lossy),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown decode policy: {other}")),
        }
    }
}

/// A file selected for indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the walk root.
    pub rel_path: PathBuf,
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|allowed| allowed.trim_start_matches('.') == ext)
}

/// Recursively list files under `root` whose extension is allowed, sorted by
/// path. Hidden and git-ignored entries are skipped.
///
/// # Errors
///
/// Returns an error if a directory cannot be read.
pub fn collect_source_files(root: &Path, extensions: &[String]) -> Result<Vec<SourceFile>> {
    let walker = ignore::WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.into_path();
        if !has_allowed_extension(&path, extensions) {
            continue;
        }
        let rel_path = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        files.push(SourceFile { path, rel_path });
    }
    Ok(files)
}

/// Decode file bytes according to `policy`.
///
/// # Errors
///
/// Returns [`IndexError::Decode`] under [`DecodePolicy::Strict`] when `bytes`
/// is not valid UTF-8.
pub fn decode(bytes: Vec<u8>, policy: DecodePolicy, path: &Path) -> Result<String> {
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => match policy {
            DecodePolicy::Strict => Err(IndexError::Decode {
                path: path.display().to_string(),
            }),
            DecodePolicy::Lossy => {
                let bytes = err.into_bytes();
                let mut text = String::with_capacity(bytes.len());
                for chunk in bytes.utf8_chunks() {
                    text.push_str(chunk.valid());
                }
                tracing::debug!(path = %path.display(), "dropped invalid UTF-8 sequences");
                Ok(text)
            }
        },
    }
}

/// Read and decode a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoding fails.
pub async fn read_source(path: &Path, policy: DecodePolicy) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    decode(bytes, policy, path)
}
