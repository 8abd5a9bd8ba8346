//! Volatile title-to-fields caches.
//!
//! One instance backs the Memory Tier (pre-populated singletons), another the
//! Draft Tier (work-in-progress tiddlers). Contents never reach disk or the
//! document engine.

use std::collections::HashMap;
use tidsync_core::TiddlerFields;
use tokio::sync::Mutex;

/// A named in-memory map of title to field mapping.
///
/// Absent titles behave as not yet created; `delete` of an absent title is a
/// no-op reporting `false`.
#[derive(Debug)]
pub struct VolatileCache {
    name: &'static str,
    entries: Mutex<HashMap<String, TiddlerFields>>,
}

impl VolatileCache {
    /// Create an empty cache. The name appears in log events only.
    pub fn new(name: &'static str) -> Self {
        Self { name, entries: Mutex::new(HashMap::new()) }
    }

    /// The cache name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Look up a title, returning a copy of its fields.
    pub async fn get(&self, title: &str) -> Option<TiddlerFields> {
        self.entries.lock().await.get(title).cloned()
    }

    /// Store a copy of the fields under the title, replacing any previous
    /// value.
    pub async fn put(&self, title: impl Into<String>, fields: TiddlerFields) {
        self.entries.lock().await.insert(title.into(), fields);
    }

    /// Remove a title. Returns whether an entry existed.
    pub async fn delete(&self, title: &str) -> bool {
        self.entries.lock().await.remove(title).is_some()
    }

    /// Whether the title is present.
    pub async fn contains(&self, title: &str) -> bool {
        self.entries.lock().await.contains_key(title)
    }

    /// Number of entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidsync_core::FIELD_TITLE;

    fn fields_for(title: &str) -> TiddlerFields {
        let mut fields = TiddlerFields::new();
        fields.insert(FIELD_TITLE.to_string(), title.to_string());
        fields
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let cache = VolatileCache::new("memory");
        assert_eq!(cache.get("$:/StoryList").await, None);

        let fields = fields_for("$:/StoryList");
        cache.put("$:/StoryList", fields.clone()).await;
        assert_eq!(cache.get("$:/StoryList").await, Some(fields));
        assert!(cache.contains("$:/StoryList").await);
    }

    #[tokio::test]
    async fn test_put_replaces_previous_value() {
        let cache = VolatileCache::new("drafts");
        cache.put("Draft of My Note", fields_for("Draft of My Note")).await;

        let mut updated = fields_for("Draft of My Note");
        updated.insert("text".to_string(), "new text".to_string());
        cache.put("Draft of My Note", updated.clone()).await;

        assert_eq!(cache.get("Draft of My Note").await, Some(updated));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = VolatileCache::new("memory");
        cache.put("$:/StoryList", fields_for("$:/StoryList")).await;

        assert!(cache.delete("$:/StoryList").await);
        assert!(!cache.delete("$:/StoryList").await);
        assert_eq!(cache.get("$:/StoryList").await, None);
    }
}
