//! Structured-document store adapter.
//!
//! Pages and the TOC are generic key/value documents (JSON objects with
//! nested `cc` block lists), not typed structs; the repair logic only ever
//! inspects a handful of fields and must round-trip everything else
//! untouched. Saves go through a temp file in the target directory followed
//! by a rename, so a failed write never leaves a partial document behind.
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// A structured document: the top-level JSON object of a page or TOC file.
pub type Document = serde_json::Map<String, Value>;

/// Load a document, failing if the file is unreadable or not a JSON object.
pub fn load_document(path: &Path) -> Result<Document> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("parse {}", path.display()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("{}: not a JSON object", path.display())),
    }
}

/// Save a document atomically: write a temp file next to the target, then
/// rename it into place. On failure the temp file is removed.
pub fn save_document(path: &Path, doc: &Document) -> Result<()> {
    let json = serde_json::to_string_pretty(doc).context("serialize document")?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{}: no usable file name", path.display()))?;
    let tmp_path = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(".{file_name}.tmp"));
    let write_and_rename = fs::write(&tmp_path, format!("{json}\n"))
        .and_then(|()| fs::rename(&tmp_path, path));
    if let Err(err) = write_and_rename {
        let _ = fs::remove_file(&tmp_path);
        return Err(err).with_context(|| format!("write {}", path.display()));
    }
    Ok(())
}

/// Read a string-valued field, treating a missing or non-string value as
/// empty. Timestamps (`cre`/`mod`) come through here verbatim.
pub fn str_field(doc: &Document, key: &str) -> String {
    doc.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Read an integer-valued field; a JSON string holding an integer also
/// counts, since hand-edited documents sometimes quote their numbers.
pub fn int_field(doc: &Document, key: &str) -> Option<i64> {
    match doc.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
