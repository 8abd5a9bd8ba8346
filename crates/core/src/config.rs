//! Wiki store configuration.
//!
//! Configuration is loaded from a `tidsync.toml` file (or built in code) and
//! covers the on-disk layout, the File Tier filter overrides, the document
//! engine compaction cadence, and the logging section.
//!
//! ```toml
//! wiki_dir = "/home/me/wiki"
//! tiddlers_subdir = "tiddlers"
//! compaction_interval_secs = 600
//! path_filters = ['^\$:/config/=config/']
//! ext_filters = ['^\$:/plain/=.txt']
//!
//! [logging]
//! level = "warn"
//! format = "pretty"
//!
//! [logging.file]
//! enabled = false
//! level = "debug"
//! ```

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default name of the directory holding individually addressed tiddler files.
pub const DEFAULT_TIDDLERS_SUBDIR: &str = "tiddlers";

/// Default name of the document engine data file, adjacent to the tiddlers
/// directory.
pub const DATABASE_FILENAME: &str = "tiddlers.db";

/// Default document engine compaction interval.
pub const DEFAULT_COMPACTION_INTERVAL_SECS: u64 = 600;

/// Top-level configuration for a tidsync wiki store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfig {
    /// Root directory of the wiki. The tiddlers directory and the document
    /// engine data file both live under it.
    pub wiki_dir: PathBuf,

    /// Subdirectory of `wiki_dir` holding File-Tier tiddler files.
    #[serde(default = "default_tiddlers_subdir")]
    pub tiddlers_subdir: String,

    /// Path filter override lines, `regex=replacement`, applied to titles to
    /// pick a relative filepath inside the tiddlers directory.
    #[serde(default)]
    pub path_filters: Vec<String>,

    /// Extension filter override lines, `regex=.ext`, applied to titles to
    /// override the extension chosen from the content-type table.
    #[serde(default)]
    pub ext_filters: Vec<String>,

    /// Seconds between document engine compaction passes. Zero disables the
    /// background task.
    #[serde(default = "default_compaction_interval")]
    pub compaction_interval_secs: u64,

    /// Logging section.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_tiddlers_subdir() -> String {
    DEFAULT_TIDDLERS_SUBDIR.to_string()
}

fn default_compaction_interval() -> u64 {
    DEFAULT_COMPACTION_INTERVAL_SECS
}

impl WikiConfig {
    /// Build a configuration rooted at the given wiki directory, with
    /// defaults for everything else.
    pub fn new(wiki_dir: impl Into<PathBuf>) -> Self {
        Self {
            wiki_dir: wiki_dir.into(),
            tiddlers_subdir: default_tiddlers_subdir(),
            path_filters: Vec::new(),
            ext_filters: Vec::new(),
            compaction_interval_secs: default_compaction_interval(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a toml file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a toml string.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::parse(format!("invalid configuration: {e}")))
    }

    /// The directory holding File-Tier tiddler files.
    pub fn tiddlers_path(&self) -> PathBuf {
        self.wiki_dir.join(&self.tiddlers_subdir)
    }

    /// The document engine data file, adjacent to the tiddlers directory.
    pub fn database_path(&self) -> PathBuf {
        self.wiki_dir.join(DATABASE_FILENAME)
    }

    /// Compile the path filter override lines.
    pub fn compiled_path_filters(&self) -> Result<Vec<FilterRule>> {
        FilterRule::parse_lines(&self.path_filters)
    }

    /// Compile the extension filter override lines.
    pub fn compiled_ext_filters(&self) -> Result<Vec<FilterRule>> {
        FilterRule::parse_lines(&self.ext_filters)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level for stderr output.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for stderr: `pretty`, `json`, or `compact`.
    #[serde(default = "default_log_format")]
    pub format: String,

    /// File logging configuration.
    #[serde(default)]
    pub file: FileLoggingConfig,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format(), file: FileLoggingConfig::default() }
    }
}

/// File logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLoggingConfig {
    /// Enable logging to a daily-rolled file under the log directory.
    #[serde(default)]
    pub enabled: bool,

    /// Level for the file layer (may be more verbose than stderr).
    #[serde(default = "default_file_log_level")]
    pub level: String,
}

fn default_file_log_level() -> String {
    "debug".to_string()
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self { enabled: false, level: default_file_log_level() }
    }
}

/// One compiled `regex=replacement` override line.
///
/// The left side is a regular expression matched against a tiddler title.
/// Path filters rewrite the matched title into a relative filepath fragment
/// via [`FilterRule::apply`], with `$1`-style capture references expanded;
/// extension filters only test the title and take the right side verbatim as
/// the extension (including the leading dot).
#[derive(Debug, Clone)]
pub struct FilterRule {
    pattern: Regex,
    replacement: String,
}

impl FilterRule {
    /// Parse a single `regex=replacement` line.
    pub fn parse(line: &str) -> Result<Self> {
        let (pattern, replacement) = line
            .split_once('=')
            .ok_or_else(|| Error::parse(format!("filter rule `{line}` is missing `=`")))?;
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::parse(format!("filter rule `{line}` has an invalid pattern: {e}")))?;
        Ok(Self { pattern, replacement: replacement.to_string() })
    }

    /// Parse a batch of lines, skipping blanks.
    pub fn parse_lines(lines: &[String]) -> Result<Vec<Self>> {
        lines
            .iter()
            .map(String::as_str)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Self::parse)
            .collect()
    }

    /// Whether the pattern matches the title.
    pub fn is_match(&self, title: &str) -> bool {
        self.pattern.is_match(title)
    }

    /// The raw right side of the rule.
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Rewrite a matching title, expanding capture references in the
    /// replacement. Returns `None` when the pattern does not match.
    pub fn apply(&self, title: &str) -> Option<String> {
        if self.pattern.is_match(title) {
            Some(self.pattern.replace(title, self.replacement.as_str()).into_owned())
        } else {
            None
        }
    }
}
