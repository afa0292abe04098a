//! Chunk id schemes.

use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

/// Length of the content hash suffix in `content` ids.
const HASH_PREFIX_LEN: usize = 16;

/// How chunk ids (and the `source` metadata) are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdScheme {
    /// `{relative_path}:{index}:{blake3[..16]}`. Editing a chunk produces a new id
    /// and same-named files in different directories never collide.
    #[default]
    Content,
    /// `{file_name}_{index}`, compatible with stores written by earlier tools.
    Legacy,
}

impl IdScheme {
    /// Source label recorded for a file at `rel_path` (relative to the walk root).
    #[must_use]
    pub fn source_for(self, rel_path: &Path) -> String {
        match self {
            Self::Content => normalize_rel_path(rel_path),
            Self::Legacy => rel_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Id of the `index`-th chunk of `source` with the given text.
    #[must_use]
    pub fn chunk_id(self, source: &str, index: usize, text: &str) -> String {
        match self {
            Self::Content => {
                let hash = blake3::hash(text.as_bytes()).to_hex();
                format!("{source}:{index}:{}", &hash.as_str()[..HASH_PREFIX_LEN])
            }
            Self::Legacy => format!("{source}_{index}"),
        }
    }
}

impl std::str::FromStr for IdScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "content" => Ok(Self::Content),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!("unknown id scheme: {other}")),
        }
    }
}

/// Join path components with `/` regardless of platform.
fn normalize_rel_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
