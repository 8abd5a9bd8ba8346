//! Tiered persistence routing for a TiddlyWiki-style note store.
//!
//! Every titled tiddler is classified into exactly one backing store: a
//! volatile singleton map, a volatile drafts map, individual files in the
//! tiddlers directory, or an embedded SQLite document engine. It is then
//! saved, loaded, and deleted against that store with consistent semantics. Permission
//! failures on the file path degrade into a retry signal instead of failing
//! the sync cycle.
//!
//! # Example
//!
//! ```ignore
//! use tidsync_core::{Tiddler, WikiConfig};
//! use tidsync_store::SyncAdaptor;
//!
//! let config = WikiConfig::new("/home/me/wiki");
//! let adaptor = SyncAdaptor::open(&config).await?;
//!
//! let mut note = Tiddler::new("My Note")?;
//! note.set("text", "hello")?;
//! adaptor.save(&note).await?;
//!
//! let fields = adaptor.load("My Note").await?;
//! let update = adaptor.updated_titles(&known_titles).await?;
//! for title in update.modifications {
//!     println!("pull {title}");
//! }
//! ```

mod adaptor;
mod engine;
mod error;
mod files;
mod registry;
mod schema;
mod tidfile;
mod tier;
mod volatile;

pub use adaptor::{SyncAdaptor, SyncUpdate};
pub use engine::DocumentStore;
pub use error::{Error, Result};
pub use files::{DiskFileIo, FileStore, FileTierSettings, TiddlerFileIo, resolve_file_info};
pub use registry::{FileInfo, FileRegistry};
pub use tidfile::{extension_for_type, parse_meta, parse_tid, serialize_meta, serialize_tid};
pub use tier::{Classifier, DEFAULT_SINGLETONS, DRAFT_TITLE_PREFIX, SYSTEM_PREFIX, Tier};
pub use volatile::VolatileCache;
