//! Error types for the tiered tiddler store.
//!
//! The taxonomy separates recoverable permission failures, which the File
//! Tier degrades into a retry signal, from fatal I/O and engine failures,
//! which are propagated unchanged to the caller of the single operation that
//! hit them.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the tiered store
#[derive(Error, Debug)]
pub enum Error {
    /// Permission-class failure (EACCES/EPERM) on a File-Tier syscall.
    /// Recoverable: the descriptor is flagged and the save is retried with an
    /// encoded filepath.
    #[error("permission denied for \"{title}\" during {syscall}; will be retried with encoded filepath {}", filepath.display())]
    Permission {
        title: String,
        filepath: PathBuf,
        syscall: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Any other filesystem failure; fatal to the single operation
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unique-index violation on a path that should have been an upsert;
    /// indicates a logic defect, not a recoverable runtime condition
    #[error("unique title constraint violated: {0}")]
    Constraint(String),

    /// SQLite engine error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Engine connection error
    #[error("connection error: {0}")]
    Connection(#[from] tokio_rusqlite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from the core crate (validation, configuration)
    #[error(transparent)]
    Core(#[from] tidsync_core::Error),
}

impl Error {
    /// Create a recoverable permission error for a File-Tier syscall
    pub fn permission(
        title: impl Into<String>,
        filepath: impl Into<PathBuf>,
        syscall: &'static str,
        source: std::io::Error,
    ) -> Self {
        Self::Permission { title: title.into(), filepath: filepath.into(), syscall, source }
    }

    /// Create a constraint error with a message
    pub fn constraint(msg: impl Into<String>) -> Self {
        Self::Constraint(msg.into())
    }

    /// Whether the caller should retry the operation (true only for
    /// permission-class failures)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Permission { .. })
    }
}

/// Whether an I/O error is in the recoverable permission class.
pub(crate) fn is_permission_error(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::PermissionDenied
}

/// Map an engine error from an upsert path, surfacing unique-constraint
/// violations as [`Error::Constraint`].
pub(crate) fn map_upsert_error(err: tokio_rusqlite::Error) -> Error {
    if let tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(failure, ref message)) = err
        && failure.code == rusqlite::ErrorCode::ConstraintViolation
    {
        return Error::constraint(message.clone().unwrap_or_else(|| failure.to_string()));
    }
    Error::Connection(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_error_display() {
        let err = Error::permission(
            "$:/config/Sample",
            "/wiki/tiddlers/$__config_Sample.tid",
            "open",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = err.to_string();
        assert!(text.contains("$:/config/Sample"));
        assert!(text.contains("open"));
        assert!(text.contains("encoded filepath"));
    }

    #[test]
    fn test_is_recoverable() {
        let permission = Error::permission(
            "t",
            "/p",
            "unlink",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(permission.is_recoverable());

        let io: Error = std::io::Error::new(std::io::ErrorKind::Other, "disk full").into();
        assert!(!io.is_recoverable());

        let constraint = Error::constraint("title");
        assert!(!constraint.is_recoverable());
    }

    #[test]
    fn test_is_permission_error() {
        assert!(is_permission_error(&std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied"
        )));
        assert!(!is_permission_error(&std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing"
        )));
    }

    #[test]
    fn test_map_upsert_error_constraint() {
        let failure = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT),
            Some("UNIQUE constraint failed: tiddlers.title".to_string()),
        );
        let err = map_upsert_error(tokio_rusqlite::Error::Error(failure));
        assert!(matches!(err, Error::Constraint(_)));
        assert!(err.to_string().contains("tiddlers.title"));
    }

    #[test]
    fn test_map_upsert_error_passthrough() {
        let err = map_upsert_error(tokio_rusqlite::Error::ConnectionClosed);
        assert!(matches!(err, Error::Connection(_)));
    }

    #[test]
    fn test_error_from_sqlite() {
        let sqlite_err = rusqlite::Error::InvalidPath("test path".into());
        let err: Error = sqlite_err.into();
        assert!(matches!(err, Error::Sqlite(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
