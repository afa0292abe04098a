//! Enumerates the ids already present in a store.

use std::collections::HashMap;

use codeqa_store::VectorStore;

use crate::error::Result;

/// Default page size used when enumerating stored ids.
pub const DEFAULT_SCAN_BATCH_SIZE: u64 = 100;

/// Ids of every chunk already embedded in the collection, with the
/// `source` each one was stored under.
#[derive(Debug, Clone, Default)]
pub struct ExistingIdSet {
    ids: HashMap<String, String>,
}

impl ExistingIdSet {
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// Record an id written during the current run.
    pub fn insert(&mut self, id: String, source: String) -> bool {
        self.ids.insert(id, source).is_none()
    }

    /// Stored ids whose record names `source`.
    pub fn ids_for_source<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a str> {
        self.ids
            .iter()
            .filter(move |(_, s)| s.as_str() == source)
            .map(|(id, _)| id.as_str())
    }

    /// Forget ids deleted from the store.
    pub fn remove(&mut self, id: &str) {
        self.ids.remove(id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<(String, String)> for ExistingIdSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Page through `collection` in batches of `batch_size` and collect every id.
///
/// Stops at the first empty page or at a page shorter than `batch_size`.
///
/// # Errors
///
/// Returns the first store error encountered.
pub async fn load_existing_ids(
    store: &dyn VectorStore,
    collection: &str,
    batch_size: u64,
) -> Result<ExistingIdSet> {
    let batch_size = batch_size.max(1);
    let mut existing = ExistingIdSet::default();
    let mut offset = 0u64;

    loop {
        let page = store.get(collection, batch_size, offset).await?;
        if page.is_empty() {
            break;
        }
        let fetched = u64::try_from(page.len())?;
        existing.ids.extend(
            page.ids
                .into_iter()
                .zip(page.metadatas.into_iter().map(|m| m.source)),
        );
        offset += fetched;
        if fetched < batch_size {
            break;
        }
    }

    tracing::info!(count = existing.len(), "loaded existing embedded chunks");
    Ok(existing)
}
