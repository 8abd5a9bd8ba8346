//! The File-Tier descriptor registry.
//!
//! The registry maps each File-Tier title to the descriptor of its on-disk
//! file. It is owned exclusively by the File Tier for the process lifetime
//! and follows a write-then-register discipline: entries are created or
//! replaced only after a confirmed successful write, and removed only after
//! a confirmed successful delete, so a crash mid-write leaves the registry
//! describing only previously-successful state. The one exception is a
//! recoverable permission failure, which stores the descriptor flagged
//! `write_error` so the next save derives an encoded filepath.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// On-disk location and status of one File-Tier tiddler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Path of the data file inside the tiddlers directory.
    pub filepath: PathBuf,
    /// Content type of the file (not necessarily of the tiddler).
    pub file_type: String,
    /// Whether a companion `.meta` file holds the non-text fields.
    pub has_meta_file: bool,
    /// Set when the last write failed with a recoverable permission error;
    /// the next save derives an encoded filepath instead.
    #[serde(default)]
    pub write_error: bool,
}

impl FileInfo {
    /// Path of the companion metadata file, when one is required.
    pub fn meta_path(&self) -> Option<PathBuf> {
        if self.has_meta_file {
            let mut meta = self.filepath.clone().into_os_string();
            meta.push(".meta");
            Some(PathBuf::from(meta))
        } else {
            None
        }
    }
}

/// Process-wide title-to-descriptor table.
#[derive(Debug, Default)]
pub struct FileRegistry {
    entries: HashMap<String, FileInfo>,
}

impl FileRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the descriptor for a title.
    pub fn get(&self, title: &str) -> Option<&FileInfo> {
        self.entries.get(title)
    }

    /// Register or replace the descriptor for a title.
    pub fn insert(&mut self, title: impl Into<String>, info: FileInfo) {
        self.entries.insert(title.into(), info);
    }

    /// Remove the descriptor for a title. Returns the removed value.
    pub fn remove(&mut self, title: &str) -> Option<FileInfo> {
        self.entries.remove(title)
    }

    /// Whether the title is tracked.
    pub fn contains(&self, title: &str) -> bool {
        self.entries.contains_key(title)
    }

    /// Number of tracked titles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any title other than `excluding` already owns the filepath.
    /// Used by the resolver to avoid assigning one file to two titles.
    pub fn is_filepath_taken(&self, filepath: &Path, excluding: &str) -> bool {
        self.entries
            .iter()
            .any(|(title, info)| title != excluding && info.filepath == filepath)
    }

    /// Tracked titles, for diagnostics.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info_at(path: &str) -> FileInfo {
        FileInfo {
            filepath: PathBuf::from(path),
            file_type: "application/x-tiddler".to_string(),
            has_meta_file: false,
            write_error: false,
        }
    }

    #[test]
    fn test_insert_get_remove() {
        let mut registry = FileRegistry::new();
        assert!(registry.is_empty());

        registry.insert("$:/config/Sample", info_at("/wiki/tiddlers/$__config_Sample.tid"));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("$:/config/Sample"));
        assert_eq!(
            registry.get("$:/config/Sample").unwrap().filepath,
            PathBuf::from("/wiki/tiddlers/$__config_Sample.tid")
        );

        let removed = registry.remove("$:/config/Sample").unwrap();
        assert_eq!(removed.filepath, PathBuf::from("/wiki/tiddlers/$__config_Sample.tid"));
        assert!(registry.remove("$:/config/Sample").is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let mut registry = FileRegistry::new();
        registry.insert("$:/a", info_at("/wiki/tiddlers/a.tid"));
        registry.insert("$:/a", info_at("/wiki/tiddlers/a.json"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("$:/a").unwrap().filepath, PathBuf::from("/wiki/tiddlers/a.json"));
    }

    #[test]
    fn test_is_filepath_taken() {
        let mut registry = FileRegistry::new();
        registry.insert("$:/a", info_at("/wiki/tiddlers/a.tid"));

        assert!(registry.is_filepath_taken(Path::new("/wiki/tiddlers/a.tid"), "$:/b"));
        assert!(!registry.is_filepath_taken(Path::new("/wiki/tiddlers/a.tid"), "$:/a"));
        assert!(!registry.is_filepath_taken(Path::new("/wiki/tiddlers/b.tid"), "$:/b"));
    }

    #[test]
    fn test_meta_path() {
        let mut info = info_at("/wiki/tiddlers/style.css");
        assert_eq!(info.meta_path(), None);

        info.has_meta_file = true;
        assert_eq!(info.meta_path(), Some(PathBuf::from("/wiki/tiddlers/style.css.meta")));
    }
}
