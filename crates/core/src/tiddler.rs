//! The tiddler data model.
//!
//! A tiddler is a titled unit of content: a unique `title` plus a mapping of
//! field name to field value. The title doubles as the primary key across
//! every storage tier, so construction validates that it is present and
//! non-empty. Tiers always store copies; the caller keeps ownership of the
//! value it passed in.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field name holding the tiddler title.
pub const FIELD_TITLE: &str = "title";

/// Field name holding the body text.
pub const FIELD_TEXT: &str = "text";

/// Field name holding the content type, which drives the on-disk extension.
pub const FIELD_TYPE: &str = "type";

/// Reserved field marking a draft and naming the original it was forked from.
pub const FIELD_DRAFT_OF: &str = "draft.of";

/// Ordered field-name to field-value mapping.
///
/// A `BTreeMap` keeps serialization deterministic, which matters for the
/// on-disk tiddler file format and for test comparisons.
pub type TiddlerFields = BTreeMap<String, String>;

/// A titled unit of content with a field mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tiddler {
    fields: TiddlerFields,
}

impl Tiddler {
    /// Create a tiddler with the given title and no other fields.
    pub fn new(title: impl Into<String>) -> Result<Self> {
        let mut fields = TiddlerFields::new();
        fields.insert(FIELD_TITLE.to_string(), title.into());
        Self::from_fields(fields)
    }

    /// Build a tiddler from a complete field mapping.
    ///
    /// Fails if the `title` field is missing or empty.
    pub fn from_fields(fields: TiddlerFields) -> Result<Self> {
        match fields.get(FIELD_TITLE) {
            Some(title) if !title.is_empty() => Ok(Self { fields }),
            Some(_) => Err(Error::validation("tiddler title cannot be empty")),
            None => Err(Error::validation("tiddler is missing the title field")),
        }
    }

    /// The tiddler title.
    pub fn title(&self) -> &str {
        self.fields.get(FIELD_TITLE).map(String::as_str).unwrap_or_default()
    }

    /// The full field mapping.
    pub fn fields(&self) -> &TiddlerFields {
        &self.fields
    }

    /// Consume the tiddler, yielding its field mapping.
    pub fn into_fields(self) -> TiddlerFields {
        self.fields
    }

    /// Look up a single field value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Set a field value. Setting `title` to an empty value is rejected.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        if name == FIELD_TITLE && value.is_empty() {
            return Err(Error::validation("tiddler title cannot be empty"));
        }
        self.fields.insert(name, value);
        Ok(())
    }

    /// The declared content type, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.get(FIELD_TYPE)
    }

    /// The title of the original this tiddler is a draft of, if any.
    pub fn draft_of(&self) -> Option<&str> {
        self.get(FIELD_DRAFT_OF)
    }

    /// Whether this tiddler carries the draft marker field.
    pub fn is_draft(&self) -> bool {
        self.fields.contains_key(FIELD_DRAFT_OF)
    }
}
