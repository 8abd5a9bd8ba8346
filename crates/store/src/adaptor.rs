//! The adaptor facade.
//!
//! One classification per operation, one dispatch to the owning tier. The
//! facade never swallows an error; the two deliberate downgrades (permission
//! failures on File-Tier save and delete) happen inside the File Tier and
//! are documented there.

use crate::engine::DocumentStore;
use crate::error::Result;
use crate::files::{DiskFileIo, FileStore, FileTierSettings, TiddlerFileIo};
use crate::registry::FileInfo;
use crate::tier::{Classifier, Tier};
use crate::volatile::VolatileCache;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tidsync_core::{FIELD_TITLE, Tiddler, TiddlerFields, WikiConfig};
use tracing::instrument;

/// Result of an [`SyncAdaptor::updated_titles`] comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncUpdate {
    /// Document Store titles the caller does not know yet.
    pub modifications: Vec<String>,
    /// Always empty: the engine is only queried for titles it still holds,
    /// so remote deletions are structurally undetectable.
    pub deletions: Vec<String>,
}

/// The tiered persistence adaptor.
///
/// Routes each titled tiddler to exactly one backing store (the volatile
/// singleton map, the volatile drafts map, individual files, or the embedded
/// document engine) and performs save/load/delete against it.
pub struct SyncAdaptor {
    classifier: Classifier,
    memory: VolatileCache,
    drafts: VolatileCache,
    files: FileStore,
    documents: DocumentStore,
    compaction: Option<tokio::task::JoinHandle<()>>,
}

impl SyncAdaptor {
    /// Open the adaptor for a wiki, writing File-Tier tiddlers to disk.
    ///
    /// Creates the tiddlers directory if missing, opens the document engine
    /// data file adjacent to it, seeds the file registry from pre-existing
    /// tiddler files, pre-populates the Memory-Tier singletons, and starts
    /// the engine compaction task (unless the interval is zero).
    pub async fn open(config: &WikiConfig) -> Result<Self> {
        Self::open_with_io(config, Arc::new(DiskFileIo)).await
    }

    /// Open the adaptor with a custom File-Tier I/O collaborator.
    pub async fn open_with_io(config: &WikiConfig, io: Arc<dyn TiddlerFileIo>) -> Result<Self> {
        let tiddlers_dir = config.tiddlers_path();
        tokio::fs::create_dir_all(&tiddlers_dir).await?;

        let settings = FileTierSettings {
            directory: tiddlers_dir,
            path_filters: config.compiled_path_filters()?,
            ext_filters: config.compiled_ext_filters()?,
        };
        let files = FileStore::with_io(settings, io);
        files.load_directory().await?;

        let documents = DocumentStore::open(&config.database_path()).await?;

        let classifier = Classifier::default();
        let memory = VolatileCache::new("in-memory");
        for title in classifier.singletons() {
            let mut fields = TiddlerFields::new();
            fields.insert(FIELD_TITLE.to_string(), title.to_string());
            memory.put(title, fields).await;
        }
        let drafts = VolatileCache::new("drafts");

        let compaction = (config.compaction_interval_secs > 0)
            .then(|| documents.spawn_compaction(Duration::from_secs(config.compaction_interval_secs)));

        Ok(Self { classifier, memory, drafts, files, documents, compaction })
    }

    /// Save a tiddler to its owning tier.
    ///
    /// Memory, Draft, and Document Store saves return `None`; File-Tier
    /// saves return the descriptor of the written file.
    #[instrument(skip(self, tiddler), fields(title = %tiddler.title()))]
    pub async fn save(&self, tiddler: &Tiddler) -> Result<Option<FileInfo>> {
        let title = tiddler.title();
        match self.classifier.classify(title, Some(tiddler.fields())) {
            Tier::Memory => {
                self.memory.put(title, tiddler.fields().clone()).await;
                tracing::debug!("save \"{title}\" to in-memory cache");
                Ok(None)
            }
            Tier::Draft => {
                self.drafts.put(title, tiddler.fields().clone()).await;
                tracing::debug!("save \"{title}\" to drafts cache");
                Ok(None)
            }
            Tier::File => Ok(Some(self.files.save(tiddler).await?)),
            Tier::DocumentStore => {
                self.documents.upsert(tiddler).await?;
                Ok(None)
            }
        }
    }

    /// Load the field mapping for a title from its owning tier.
    ///
    /// File-Tier titles return `None` by design: their content is resident
    /// from the startup directory scan, so load does not re-read disk. A
    /// missing Document Store record also returns `None`, not an error.
    #[instrument(skip(self))]
    pub async fn load(&self, title: &str) -> Result<Option<TiddlerFields>> {
        match self.classifier.classify(title, None) {
            Tier::Memory => {
                tracing::debug!("load \"{title}\" from in-memory cache");
                Ok(self.memory.get(title).await)
            }
            Tier::Draft => {
                tracing::debug!("load \"{title}\" from drafts cache");
                Ok(self.drafts.get(title).await)
            }
            Tier::File => {
                tracing::debug!("load \"{title}\" deferred to the startup file scan");
                Ok(None)
            }
            Tier::DocumentStore => Ok(self.documents.find_one(title).await?),
        }
    }

    /// Delete a title from its owning tier.
    ///
    /// Deleting an absent title is a no-op success in every tier.
    #[instrument(skip(self))]
    pub async fn delete(&self, title: &str) -> Result<()> {
        match self.classifier.classify(title, None) {
            Tier::Memory => {
                if self.memory.delete(title).await {
                    tracing::debug!("delete \"{title}\" from in-memory cache");
                }
                Ok(())
            }
            Tier::Draft => {
                if self.drafts.delete(title).await {
                    tracing::debug!("delete \"{title}\" from drafts cache");
                }
                Ok(())
            }
            Tier::File => self.files.delete(title).await,
            Tier::DocumentStore => {
                let removed = self.documents.remove(title).await?;
                if removed > 0 {
                    tracing::debug!("delete \"{title}\" from document engine");
                }
                Ok(())
            }
        }
    }

    /// Compare the Document Store's titles against the caller's known set.
    ///
    /// Every engine title absent from `known` is reported as a modification
    /// to pull in. `deletions` is always empty; see [`SyncUpdate`].
    #[instrument(skip(self, known), fields(known_titles = known.len()))]
    pub async fn updated_titles(&self, known: &HashSet<String>) -> Result<SyncUpdate> {
        let titles = self.documents.list_titles().await?;
        let modifications: Vec<String> = titles.into_iter().filter(|title| !known.contains(title)).collect();
        tracing::debug!("{} modified titles to pull", modifications.len());
        Ok(SyncUpdate { modifications, deletions: Vec::new() })
    }

    /// The File-Tier descriptor tracked for a title, if any.
    ///
    /// Non-system titles have no descriptor; their tiers carry no per-title
    /// metadata the caller would need.
    pub async fn file_info(&self, title: &str) -> Option<FileInfo> {
        self.files.file_info(title).await
    }
}

impl Drop for SyncAdaptor {
    fn drop(&mut self) {
        if let Some(task) = self.compaction.take() {
            task.abort();
        }
    }
}
