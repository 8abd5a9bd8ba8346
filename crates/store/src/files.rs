//! The File Tier.
//!
//! System-namespace tiddlers live as individual files in the tiddlers
//! directory, tracked in a [`FileRegistry`] of descriptors. Descriptor
//! derivation is pure; all I/O goes through the [`TiddlerFileIo`] seam so
//! the permission-degrade policy can be exercised without a filesystem.
//!
//! The registry follows write-then-register ordering: a descriptor is stored
//! only after the collaborator confirms the write, with the single exception
//! of a recoverable permission failure, which stores the descriptor flagged
//! `write_error` so the next save derives an escaped filepath.

use crate::error::{Error, Result, is_permission_error};
use crate::registry::{FileInfo, FileRegistry};
use crate::tidfile;
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tidsync_core::{FIELD_TEXT, FIELD_TITLE, FilterRule, Tiddler};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::instrument;

/// Settings the File Tier derives descriptors from.
#[derive(Debug, Clone)]
pub struct FileTierSettings {
    /// Directory holding the tiddler files.
    pub directory: PathBuf,
    /// Path override rules applied to titles, first match wins.
    pub path_filters: Vec<FilterRule>,
    /// Extension override rules applied to titles, first match wins.
    pub ext_filters: Vec<FilterRule>,
}

impl FileTierSettings {
    /// Settings with no override rules.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into(), path_filters: Vec::new(), ext_filters: Vec::new() }
    }
}

/// File write/delete collaborator consumed by the File Tier.
///
/// The production implementation is [`DiskFileIo`]; tests substitute failing
/// implementations to exercise the error policy.
#[async_trait]
pub trait TiddlerFileIo: Send + Sync {
    /// Write the tiddler at the resolved descriptor, returning the descriptor
    /// actually written.
    async fn save_file(&self, tiddler: &Tiddler, info: &FileInfo) -> io::Result<FileInfo>;

    /// Delete the descriptor's data file and its meta companion, if any.
    async fn delete_file(&self, info: &FileInfo) -> io::Result<()>;
}

/// Disk-backed collaborator writing the `.tid` and data+`.meta` formats.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFileIo;

#[async_trait]
impl TiddlerFileIo for DiskFileIo {
    async fn save_file(&self, tiddler: &Tiddler, info: &FileInfo) -> io::Result<FileInfo> {
        if let Some(parent) = info.filepath.parent() {
            fs::create_dir_all(parent).await?;
        }
        if let Some(meta_path) = info.meta_path() {
            let text = tiddler.get(FIELD_TEXT).unwrap_or_default();
            fs::write(&info.filepath, text).await?;
            fs::write(&meta_path, tidfile::serialize_meta(tiddler.fields())).await?;
        } else {
            fs::write(&info.filepath, tidfile::serialize_tid(tiddler.fields())).await?;
        }
        Ok(info.clone())
    }

    async fn delete_file(&self, info: &FileInfo) -> io::Result<()> {
        remove_if_present(&info.filepath).await?;
        if let Some(meta_path) = info.meta_path() {
            remove_if_present(&meta_path).await?;
        }
        Ok(())
    }
}

/// Remove a file, treating an already-missing file as done.
async fn remove_if_present(path: &std::path::Path) -> io::Result<()> {
    match fs::remove_file(path).await {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Derive the target descriptor for a tiddler. Pure; performs no I/O.
///
/// The extension comes from the override rules or the content-type table;
/// the filename stem from the override rules or the sanitized title, unless
/// the prior descriptor is flagged `write_error`, in which case an escaped
/// stem is derived instead. An unchanged extension reuses the prior
/// filepath; otherwise the stem is deduplicated against the registry so two
/// titles never share a file.
pub fn resolve_file_info(
    tiddler: &Tiddler,
    existing: Option<&FileInfo>,
    settings: &FileTierSettings,
    registry: &FileRegistry,
) -> FileInfo {
    let title = tiddler.title();

    let extension = settings
        .ext_filters
        .iter()
        .find(|rule| rule.is_match(title))
        .map(|rule| rule.replacement().to_string())
        .unwrap_or_else(|| tidfile::extension_for_type(tiddler.content_type()).to_string());
    let file_type = tidfile::type_for_extension(&extension).to_string();
    let has_meta_file = tidfile::needs_meta_file(&extension);

    if let Some(prev) = existing
        && !prev.write_error
        && prev.filepath.to_string_lossy().ends_with(&extension)
    {
        return FileInfo { filepath: prev.filepath.clone(), file_type, has_meta_file, write_error: false };
    }

    let stem = if existing.is_some_and(|prev| prev.write_error) {
        tidfile::encode_filename(title)
    } else {
        settings
            .path_filters
            .iter()
            .find_map(|rule| rule.apply(title))
            .unwrap_or_else(|| tidfile::sanitize_filename(title))
    };

    let mut filepath = settings.directory.join(format!("{stem}{extension}"));
    let mut counter = 1;
    while registry.is_filepath_taken(&filepath, title) {
        filepath = settings.directory.join(format!("{stem} {counter}{extension}"));
        counter += 1;
    }

    FileInfo { filepath, file_type, has_meta_file, write_error: false }
}

/// The File Tier: descriptor resolution, save/delete with the
/// permission-degrade policy, and the startup directory scan.
pub struct FileStore {
    settings: FileTierSettings,
    registry: Mutex<FileRegistry>,
    io: Arc<dyn TiddlerFileIo>,
}

impl FileStore {
    /// Create a File Tier writing to disk.
    pub fn new(settings: FileTierSettings) -> Self {
        Self::with_io(settings, Arc::new(DiskFileIo))
    }

    /// Create a File Tier with a custom I/O collaborator.
    pub fn with_io(settings: FileTierSettings, io: Arc<dyn TiddlerFileIo>) -> Self {
        Self { settings, registry: Mutex::new(FileRegistry::new()), io }
    }

    /// Save a tiddler to its resolved file.
    ///
    /// On success the registry is updated and, when the tiddler previously
    /// lived at a different path or extension, the stale file is removed so
    /// no orphan remains. A permission failure flags the descriptor in the
    /// registry and returns the recoverable error; any other failure leaves
    /// the registry unchanged.
    #[instrument(skip(self, tiddler), fields(title = %tiddler.title()))]
    pub async fn save(&self, tiddler: &Tiddler) -> Result<FileInfo> {
        let title = tiddler.title().to_string();
        let mut registry = self.registry.lock().await;
        let existing = registry.get(&title).cloned();
        let target = resolve_file_info(tiddler, existing.as_ref(), &self.settings, &registry);

        match self.io.save_file(tiddler, &target).await {
            Ok(saved) => {
                registry.insert(&title, saved.clone());
                if let Some(prev) = existing
                    && prev.filepath != saved.filepath
                {
                    tracing::debug!("cleaning up stale tiddler file {}", prev.filepath.display());
                    self.io.delete_file(&prev).await?;
                }
                tracing::debug!("save \"{title}\" to filesystem");
                Ok(saved)
            }
            Err(err) if is_permission_error(&err) => {
                let mut flagged = target;
                flagged.write_error = true;
                registry.insert(&title, flagged.clone());
                tracing::warn!(
                    "sync failed for \"{title}\" and will be retried with encoded filepath {}",
                    flagged.filepath.display()
                );
                Err(Error::permission(title, flagged.filepath, "open", err))
            }
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Delete a tiddler's file.
    ///
    /// An untracked title is a no-op success. A permission failure during
    /// unlink is downgraded to a desynchronization warning with success
    /// reported upward; the registry entry is retained, since entries are
    /// removed only after a confirmed delete.
    #[instrument(skip(self))]
    pub async fn delete(&self, title: &str) -> Result<()> {
        let mut registry = self.registry.lock().await;
        let Some(info) = registry.get(title).cloned() else {
            return Ok(());
        };

        match self.io.delete_file(&info).await {
            Ok(()) => {
                registry.remove(title);
                tracing::debug!("delete \"{title}\" from filesystem");
                Ok(())
            }
            Err(err) if is_permission_error(&err) => {
                tracing::warn!(
                    "server desynchronized; error deleting file {} for deleted tiddler \"{title}\": {err}",
                    info.filepath.display()
                );
                Ok(())
            }
            Err(err) => Err(Error::Io(err)),
        }
    }

    /// Scan the tiddlers directory and seed the registry from pre-existing
    /// `.tid` files and data+`.meta` pairs. Returns the number of tracked
    /// titles. Unparseable files are skipped with a warning; a missing
    /// directory is an empty wiki.
    #[instrument(skip(self), fields(directory = %self.settings.directory.display()))]
    pub async fn load_directory(&self) -> Result<usize> {
        let mut dir = match fs::read_dir(&self.settings.directory).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };

        let mut registry = self.registry.lock().await;
        let mut tracked = 0;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".meta") {
                continue;
            }
            match self.track_existing_file(&path).await {
                Ok(Some((title, info))) => {
                    registry.insert(title, info);
                    tracked += 1;
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!("skipping unreadable tiddler file {}: {err}", path.display());
                }
            }
        }

        tracing::info!("tracking {tracked} tiddler files");
        Ok(tracked)
    }

    /// Build the registry entry for one pre-existing file, if it is a
    /// tiddler file at all.
    async fn track_existing_file(&self, path: &std::path::Path) -> Result<Option<(String, FileInfo)>> {
        let extension = match path.extension() {
            Some(ext) => format!(".{}", ext.to_string_lossy()),
            None => return Ok(None),
        };

        if extension == tidfile::TID_EXTENSION {
            let content = fs::read_to_string(path).await?;
            let fields = tidfile::parse_tid(&content)?;
            let Some(title) = fields.get(FIELD_TITLE) else {
                tracing::warn!("tiddler file {} has no title field", path.display());
                return Ok(None);
            };
            let info = FileInfo {
                filepath: path.to_path_buf(),
                file_type: tidfile::TID_FILE_TYPE.to_string(),
                has_meta_file: false,
                write_error: false,
            };
            return Ok(Some((title.clone(), info)));
        }

        // A typed data file is only a tiddler if its .meta companion exists.
        let mut meta_path = path.to_path_buf().into_os_string();
        meta_path.push(".meta");
        let meta_content = match fs::read_to_string(PathBuf::from(meta_path)).await {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let fields = tidfile::parse_meta(&meta_content)?;
        let Some(title) = fields.get(FIELD_TITLE) else {
            tracing::warn!("meta file for {} has no title field", path.display());
            return Ok(None);
        };
        let info = FileInfo {
            filepath: path.to_path_buf(),
            file_type: tidfile::type_for_extension(&extension).to_string(),
            has_meta_file: true,
            write_error: false,
        };
        Ok(Some((title.clone(), info)))
    }

    /// Registry snapshot lookup for a title.
    pub async fn file_info(&self, title: &str) -> Option<FileInfo> {
        self.registry.lock().await.get(title).cloned()
    }

    /// Number of tracked titles.
    pub async fn tracked_len(&self) -> usize {
        self.registry.lock().await.len()
    }
}
