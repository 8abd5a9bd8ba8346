//! The on-disk tiddler file format.
//!
//! A tiddler is persisted either as a single `.tid` file (header of
//! `name: value` lines, a blank line, then the body text) or, for
//! non-wikitext content types, as a data file holding the raw text plus a
//! companion `.meta` file holding the remaining fields in the same header
//! format. This module also owns the extension table and the filename
//! derivation helpers used by the descriptor resolver.

use crate::error::Result;
use tidsync_core::{Error as CoreError, FIELD_TEXT, TiddlerFields};

/// Extension of single-file tiddlers.
pub const TID_EXTENSION: &str = ".tid";

/// Content type of single-file tiddlers.
pub const TID_FILE_TYPE: &str = "application/x-tiddler";

/// Maximum length of a derived filename stem.
const MAX_FILENAME_LEN: usize = 200;

/// Pick the on-disk extension for a tiddler content type.
///
/// Unknown types fall back to `.tid`, which can represent any field mapping.
pub fn extension_for_type(content_type: Option<&str>) -> &'static str {
    match content_type.unwrap_or("") {
        "" | "text/vnd.tiddlywiki" | "application/x-tiddler" => TID_EXTENSION,
        "text/plain" => ".txt",
        "text/html" => ".html",
        "text/css" => ".css",
        "application/javascript" => ".js",
        "application/json" => ".json",
        "text/markdown" | "text/x-markdown" => ".md",
        _ => TID_EXTENSION,
    }
}

/// The file content type implied by an extension (the inverse of
/// [`extension_for_type`]).
pub fn type_for_extension(extension: &str) -> &'static str {
    match extension {
        ".txt" => "text/plain",
        ".html" => "text/html",
        ".css" => "text/css",
        ".js" => "application/javascript",
        ".json" => "application/json",
        ".md" => "text/markdown",
        _ => TID_FILE_TYPE,
    }
}

/// Whether files with this extension need a companion `.meta` file.
pub fn needs_meta_file(extension: &str) -> bool {
    extension != TID_EXTENSION
}

/// Serialize a field mapping to the single-file `.tid` format.
pub fn serialize_tid(fields: &TiddlerFields) -> String {
    let mut out = serialize_meta(fields);
    out.push('\n');
    if let Some(text) = fields.get(FIELD_TEXT) {
        out.push_str(text);
    }
    out
}

/// Serialize the non-text fields to the `.meta` header format.
pub fn serialize_meta(fields: &TiddlerFields) -> String {
    let mut out = String::new();
    for (name, value) in fields {
        if name != FIELD_TEXT {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push('\n');
        }
    }
    out
}

/// Parse the single-file `.tid` format back into a field mapping.
pub fn parse_tid(content: &str) -> Result<TiddlerFields> {
    let (header, text) = match content.split_once("\n\n") {
        Some((header, text)) => (header, Some(text)),
        None => (content.trim_end_matches('\n'), None),
    };
    let mut fields = parse_meta(header)?;
    if let Some(text) = text
        && !text.is_empty()
    {
        fields.insert(FIELD_TEXT.to_string(), text.to_string());
    }
    Ok(fields)
}

/// Parse the `.meta` header format.
pub fn parse_meta(content: &str) -> Result<TiddlerFields> {
    let mut fields = TiddlerFields::new();
    for line in content.lines() {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| CoreError::parse(format!("malformed tiddler header line `{line}`")))?;
        fields.insert(name.trim().to_string(), value.strip_prefix(' ').unwrap_or(value).to_string());
    }
    Ok(fields)
}

/// Derive a filesystem-safe filename stem from a title.
///
/// The system namespace prefix becomes `$__`, path separators and other
/// reserved characters become `_`, and the result is length-capped.
pub fn sanitize_filename(title: &str) -> String {
    let name = title.replace("$:/", "$__");
    let mut out: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*' | '^' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if out.chars().count() > MAX_FILENAME_LEN {
        out = out.chars().take(MAX_FILENAME_LEN).collect();
    }
    out
}

/// Derive an escaped filename stem for the write-error retry path.
///
/// Every byte outside the unreserved set is percent-encoded, sidestepping
/// filesystems that reject the characters the plain derivation keeps.
pub fn encode_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for byte in title.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'_' | b'-' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
