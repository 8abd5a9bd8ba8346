//! The Document Store Tier.
//!
//! All non-system, non-draft, non-singleton tiddlers live in an embedded
//! SQLite engine, one JSON row per tiddler with a unique index on the title.
//! Upserts are last-writer-wins; the data file sits adjacent to the tiddlers
//! directory and is compacted periodically by a background task.

use crate::error::{Result, map_upsert_error};
use crate::schema;
use rusqlite::{OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tidsync_core::{Tiddler, TiddlerFields};
use tokio_rusqlite::Connection;
use tracing::instrument;

/// Handle to the embedded document engine.
#[derive(Clone)]
pub struct DocumentStore {
    conn: Arc<Connection>,
}

impl DocumentStore {
    /// Open or create the engine data file and apply migrations.
    #[instrument(skip_all, fields(db_path = %db_path.display()))]
    pub async fn open(db_path: &Path) -> Result<Self> {
        tracing::info!("opening document engine at {}", db_path.display());
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    /// Open a transient in-memory engine.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            schema::migrate(conn)?;
            Ok::<_, rusqlite::Error>(())
        })
        .await?;
        Ok(Self { conn: Arc::new(conn) })
    }

    /// Insert or replace the record for the tiddler's title.
    ///
    /// The title is the match key; a missing record is created, an existing
    /// one replaced. Callers never see an insert/update distinction.
    #[instrument(skip(self, tiddler), fields(title = %tiddler.title()))]
    pub async fn upsert(&self, tiddler: &Tiddler) -> Result<()> {
        let title = tiddler.title().to_string();
        let fields_json = serde_json::to_string(tiddler.fields())?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached(
                    r#"
                    INSERT INTO tiddlers (title, fields_json)
                    VALUES (?1, ?2)
                    ON CONFLICT (title) DO UPDATE SET
                        fields_json = excluded.fields_json,
                        updated_at = datetime('now')
                    "#,
                )?;
                stmt.execute(params![&title, &fields_json])?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .map_err(map_upsert_error)?;

        tracing::debug!("save \"{}\" to document engine", tiddler.title());
        Ok(())
    }

    /// Look up the field mapping for a title.
    ///
    /// The returned value is exactly the stored field mapping; the engine's
    /// internal row identifier never appears in it.
    #[instrument(skip(self))]
    pub async fn find_one(&self, title: &str) -> Result<Option<TiddlerFields>> {
        let title = title.to_owned();
        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached("SELECT fields_json FROM tiddlers WHERE title = ?1")?;
                let row = stmt
                    .query_row(params![&title], |row| row.get::<_, String>(0))
                    .optional()?;
                Ok::<_, rusqlite::Error>(row)
            })
            .await?;

        match row {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Remove the record for a title, returning how many rows went away
    /// (zero or one, given the unique index).
    #[instrument(skip(self))]
    pub async fn remove(&self, title: &str) -> Result<usize> {
        let title = title.to_owned();
        let removed = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare_cached("DELETE FROM tiddlers WHERE title = ?1")?;
                let removed = stmt.execute(params![&title])?;
                Ok::<_, rusqlite::Error>(removed)
            })
            .await?;
        Ok(removed)
    }

    /// All titles currently held by the engine.
    pub async fn list_titles(&self) -> Result<Vec<String>> {
        let titles = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare_cached("SELECT title FROM tiddlers ORDER BY title")?;
                let titles = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok::<_, rusqlite::Error>(titles)
            })
            .await?;
        Ok(titles)
    }

    /// Number of records held by the engine.
    pub async fn len(&self) -> Result<usize> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM tiddlers", [], |row| row.get(0))?;
                Ok::<_, rusqlite::Error>(count)
            })
            .await?;
        Ok(count as usize)
    }

    /// Rewrite the data file, reclaiming space from removed records.
    #[instrument(skip(self))]
    pub async fn compact(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch("VACUUM;")?;
                Ok::<_, rusqlite::Error>(())
            })
            .await?;
        tracing::debug!("document engine compacted");
        Ok(())
    }

    /// Start a background task compacting the engine on the given interval.
    pub fn spawn_compaction(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the engine is
            // not compacted at startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = engine.compact().await {
                    tracing::warn!("document engine compaction failed: {err}");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tidsync_core::{FIELD_TEXT, FIELD_TITLE};

    fn tiddler(title: &str, text: &str) -> Tiddler {
        let mut t = Tiddler::new(title).unwrap();
        t.set(FIELD_TEXT, text).unwrap();
        t
    }

    #[tokio::test]
    async fn test_upsert_find_one_round_trip() {
        let engine = DocumentStore::open_in_memory().await.unwrap();
        let t = tiddler("My Note", "hello");
        engine.upsert(&t).await.unwrap();

        let fields = engine.find_one("My Note").await.unwrap().unwrap();
        assert_eq!(&fields, t.fields());
        // Exactly the saved fields, nothing storage-internal.
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get(FIELD_TITLE).map(String::as_str), Some("My Note"));
        assert_eq!(fields.get(FIELD_TEXT).map(String::as_str), Some("hello"));
    }

    #[tokio::test]
    async fn test_find_one_absent_is_none() {
        let engine = DocumentStore::open_in_memory().await.unwrap();
        assert_eq!(engine.find_one("Missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_twice_keeps_one_record() {
        let engine = DocumentStore::open_in_memory().await.unwrap();
        engine.upsert(&tiddler("My Note", "first")).await.unwrap();
        engine.upsert(&tiddler("My Note", "second")).await.unwrap();

        assert_eq!(engine.len().await.unwrap(), 1);
        let fields = engine.find_one("My Note").await.unwrap().unwrap();
        assert_eq!(fields.get(FIELD_TEXT).map(String::as_str), Some("second"));
    }

    #[tokio::test]
    async fn test_remove_reports_count() {
        let engine = DocumentStore::open_in_memory().await.unwrap();
        engine.upsert(&tiddler("My Note", "hello")).await.unwrap();

        assert_eq!(engine.remove("My Note").await.unwrap(), 1);
        assert_eq!(engine.remove("My Note").await.unwrap(), 0);
        assert_eq!(engine.find_one("My Note").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_titles_sorted() {
        let engine = DocumentStore::open_in_memory().await.unwrap();
        engine.upsert(&tiddler("Banana", "b")).await.unwrap();
        engine.upsert(&tiddler("Apple", "a")).await.unwrap();

        assert_eq!(engine.list_titles().await.unwrap(), vec!["Apple", "Banana"]);
    }

    #[tokio::test]
    async fn test_compact_runs() {
        let engine = DocumentStore::open_in_memory().await.unwrap();
        engine.upsert(&tiddler("My Note", "hello")).await.unwrap();
        engine.remove("My Note").await.unwrap();
        engine.compact().await.unwrap();
        assert_eq!(engine.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_open_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("tiddlers.db");

        {
            let engine = DocumentStore::open(&db_path).await.unwrap();
            engine.upsert(&tiddler("My Note", "hello")).await.unwrap();
        }

        let engine = DocumentStore::open(&db_path).await.unwrap();
        let fields = engine.find_one("My Note").await.unwrap().unwrap();
        assert_eq!(fields.get(FIELD_TEXT).map(String::as_str), Some("hello"));
    }

    #[tokio::test]
    async fn test_raw_duplicate_insert_maps_to_constraint_error() {
        let engine = DocumentStore::open_in_memory().await.unwrap();
        engine.upsert(&tiddler("My Note", "hello")).await.unwrap();

        // Bypass the upsert to provoke the unique index directly.
        let err = engine
            .conn
            .call(|conn| {
                conn.execute(
                    "INSERT INTO tiddlers (title, fields_json) VALUES ('My Note', '{}')",
                    [],
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .map_err(crate::error::map_upsert_error)
            .unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
    }
}
