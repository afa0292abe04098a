//! Removal of records whose source file no longer exists.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use codeqa_store::VectorStore;

use crate::error::Result;
use crate::indexer::IndexerConfig;
use crate::walk::collect_source_files;

/// Outcome of a prune pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub records_scanned: usize,
    pub records_deleted: usize,
    /// Distinct sources that were removed.
    pub orphaned_sources: Vec<String>,
}

/// Deletes records whose `source` is not produced by the current walk.
pub struct Pruner {
    store: Arc<dyn VectorStore>,
    config: IndexerConfig,
}

impl Pruner {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, config: IndexerConfig) -> Self {
        Self { store, config }
    }

    /// Compare stored sources with the files under `root` and delete orphans.
    ///
    /// All pages are read before anything is deleted so that deletion does
    /// not shift the pages still to be read.
    ///
    /// # Errors
    ///
    /// Returns an error if the walk or any store call fails.
    pub async fn prune(&self, root: &Path) -> Result<PruneReport> {
        let scheme = self.config.id_scheme;
        let live: HashSet<String> = collect_source_files(root, &self.config.extensions)?
            .iter()
            .map(|f| scheme.source_for(&f.rel_path))
            .collect();

        let collection = &self.config.collection;
        let batch_size = self.config.scan_batch_size.max(1);
        let mut report = PruneReport::default();
        let mut orphans = Vec::new();
        let mut orphaned_sources = HashSet::new();
        let mut offset = 0u64;

        loop {
            let page = self.store.get(collection, batch_size, offset).await?;
            if page.is_empty() {
                break;
            }
            let fetched = u64::try_from(page.len())?;
            report.records_scanned += page.len();
            for (id, meta) in page.ids.into_iter().zip(page.metadatas) {
                if !live.contains(&meta.source) {
                    orphaned_sources.insert(meta.source);
                    orphans.push(id);
                }
            }
            offset += fetched;
            if fetched < batch_size {
                break;
            }
        }

        report.records_deleted = orphans.len();
        if !orphans.is_empty() {
            self.store.delete(collection, orphans).await?;
        }

        let mut sources: Vec<String> = orphaned_sources.into_iter().collect();
        sources.sort();
        for source in &sources {
            tracing::info!(source = %source, "removed records of deleted file");
        }
        report.orphaned_sources = sources;

        tracing::info!(
            scanned = report.records_scanned,
            deleted = report.records_deleted,
            "prune finished"
        );
        Ok(report)
    }
}
