//! Shared domain types for the tidsync wiki store.
//!
//! This crate holds the tiddler data model, the wiki configuration, the
//! logging bootstrap, and the core error type. The storage tiers and the
//! adaptor facade live in `tidsync-store`.

pub mod config;
pub mod error;
pub mod logging;
pub mod tiddler;

pub use config::{FilterRule, WikiConfig};
pub use error::{Error, Result};
pub use logging::{LogFormat, LoggingSettings, init_logging};
pub use tiddler::{FIELD_DRAFT_OF, FIELD_TEXT, FIELD_TITLE, FIELD_TYPE, Tiddler, TiddlerFields};
