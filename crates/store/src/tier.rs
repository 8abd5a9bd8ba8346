//! Title classification.
//!
//! Every title maps to exactly one storage tier. Classification is a pure
//! function of the title, the optional field mapping, and the classifier's
//! singleton set; it performs no I/O and must never fail.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tidsync_core::TiddlerFields;

/// Title prefix of the system namespace (internal/configuration tiddlers).
pub const SYSTEM_PREFIX: &str = "$:/";

/// Title prefix marking a draft when no fields are available.
pub const DRAFT_TITLE_PREFIX: &str = "Draft of ";

/// Singleton titles handled volatilely by default.
pub const DEFAULT_SINGLETONS: &[&str] = &["$:/StoryList"];

/// The storage tier owning a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    /// Volatile singleton map
    Memory,
    /// Volatile work-in-progress map
    Draft,
    /// Individual files in the tiddlers directory
    File,
    /// Embedded title-indexed document engine
    DocumentStore,
}

impl Tier {
    /// Get the string representation of this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Memory => "memory",
            Tier::Draft => "draft",
            Tier::File => "file",
            Tier::DocumentStore => "document-store",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pure title-to-tier classifier.
///
/// Rules, in documented priority order:
///
/// 1. Pre-registered singleton keys are `Memory`. The singleton keys are
///    themselves system-namespace titles (`$:/StoryList`), so this rule must
///    run before the namespace rule or the singletons would leak to disk.
/// 2. Titles starting with `$:/` are `File`.
/// 3. Tiddlers carrying a draft marker are `Draft`. With fields available
///    the marker is the `draft.of` field or the `Draft of ` title prefix;
///    with only a title (delete and load paths) the title prefix alone
///    decides, so that save and delete classify consistently.
/// 4. Everything else is `DocumentStore`.
#[derive(Debug, Clone)]
pub struct Classifier {
    singletons: BTreeSet<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::with_singletons(DEFAULT_SINGLETONS.iter().map(|s| s.to_string()))
    }
}

impl Classifier {
    /// Build a classifier with an explicit singleton set.
    pub fn with_singletons(singletons: impl IntoIterator<Item = String>) -> Self {
        Self { singletons: singletons.into_iter().collect() }
    }

    /// The singleton titles this classifier routes to the Memory Tier.
    pub fn singletons(&self) -> impl Iterator<Item = &str> {
        self.singletons.iter().map(String::as_str)
    }

    /// Classify a title into its owning tier.
    ///
    /// `fields` is available on save paths and absent on delete/load paths,
    /// where only the title-prefix form of the draft rule applies.
    pub fn classify(&self, title: &str, fields: Option<&TiddlerFields>) -> Tier {
        if self.singletons.contains(title) {
            return Tier::Memory;
        }
        if title.starts_with(SYSTEM_PREFIX) {
            return Tier::File;
        }
        let has_draft_field = fields.is_some_and(|f| f.contains_key(tidsync_core::FIELD_DRAFT_OF));
        if has_draft_field || title.starts_with(DRAFT_TITLE_PREFIX) {
            return Tier::Draft;
        }
        Tier::DocumentStore
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidsync_core::{FIELD_DRAFT_OF, FIELD_TITLE};

    fn fields_for(title: &str) -> TiddlerFields {
        let mut fields = TiddlerFields::new();
        fields.insert(FIELD_TITLE.to_string(), title.to_string());
        fields
    }

    #[test]
    fn test_singletons_win_over_system_prefix() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("$:/StoryList", None), Tier::Memory);
        assert_eq!(
            classifier.classify("$:/StoryList", Some(&fields_for("$:/StoryList"))),
            Tier::Memory
        );
    }

    #[test]
    fn test_system_titles_are_file_tier() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("$:/config/Sample", None), Tier::File);
        assert_eq!(classifier.classify("$:/plugins/tidsync/readme", None), Tier::File);
    }

    #[test]
    fn test_draft_field_marker() {
        let classifier = Classifier::default();
        let mut fields = fields_for("Working Copy");
        fields.insert(FIELD_DRAFT_OF.to_string(), "My Note".to_string());
        assert_eq!(classifier.classify("Working Copy", Some(&fields)), Tier::Draft);
    }

    #[test]
    fn test_draft_title_prefix_without_fields() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("Draft of My Note", None), Tier::Draft);
    }

    #[test]
    fn test_system_prefix_wins_over_draft_marker() {
        let classifier = Classifier::default();
        let mut fields = fields_for("$:/state/edit");
        fields.insert(FIELD_DRAFT_OF.to_string(), "$:/state".to_string());
        assert_eq!(classifier.classify("$:/state/edit", Some(&fields)), Tier::File);
    }

    #[test]
    fn test_everything_else_is_document_store() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("My Note", None), Tier::DocumentStore);
        assert_eq!(
            classifier.classify("My Note", Some(&fields_for("My Note"))),
            Tier::DocumentStore
        );
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = Classifier::default();
        for _ in 0..3 {
            assert_eq!(classifier.classify("My Note", None), Tier::DocumentStore);
            assert_eq!(classifier.classify("$:/StoryList", None), Tier::Memory);
            assert_eq!(classifier.classify("$:/config/Sample", None), Tier::File);
            assert_eq!(classifier.classify("Draft of My Note", None), Tier::Draft);
        }
    }

    #[test]
    fn test_custom_singleton_set() {
        let classifier = Classifier::with_singletons(vec!["$:/HistoryList".to_string()]);
        assert_eq!(classifier.classify("$:/HistoryList", None), Tier::Memory);
        assert_eq!(classifier.classify("$:/StoryList", None), Tier::File);
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(Tier::Memory.to_string(), "memory");
        assert_eq!(Tier::Draft.to_string(), "draft");
        assert_eq!(Tier::File.to_string(), "file");
        assert_eq!(Tier::DocumentStore.to_string(), "document-store");
    }
}
