//! Ground-truth directory scan and cached-index load.
//!
//! The scanner is strictly read-only: every decision about a file is
//! returned as data and logged, so the operator can audit what a repair
//! would touch before confirming it.
use crate::doc::{self, Document};
use crate::entry::Entry;
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Result of scanning the pages directory.
pub struct ScanOutcome {
    /// Parsed page entries, in on-disk name order (unsorted).
    pub pages: Vec<Entry>,
    /// Files matching `*.json` that could not be parsed as a page document;
    /// slated for quarantine, never silently dropped.
    pub unparsable: Vec<String>,
}

/// Scan every candidate page file under `pages_dir`.
///
/// Candidates are files named `*.json` or `*.json.*`, excluding backup names
/// ending in `~`. A parsable document without a `startPage` field is not a
/// page and is skipped; an unparsable file is only quarantine-worthy when its
/// name ends in exactly `.json` (dotted variants are assumed to be stray
/// copies and left alone).
pub fn scan_pages(pages_dir: &Path) -> Result<ScanOutcome> {
    let mut names = Vec::new();
    let dir = fs::read_dir(pages_dir)
        .with_context(|| format!("read pages directory {}", pages_dir.display()))?;
    for item in dir {
        let item = item.with_context(|| format!("read {}", pages_dir.display()))?;
        if !item.path().is_file() {
            continue;
        }
        match item.file_name().into_string() {
            Ok(name) => {
                if is_page_candidate(&name) {
                    names.push(name);
                }
            }
            Err(raw) => {
                tracing::info!(
                    "{} has a non-UTF-8 name; ignored",
                    raw.to_string_lossy()
                );
            }
        }
    }
    names.sort();

    let mut outcome = ScanOutcome {
        pages: Vec::new(),
        unparsable: Vec::new(),
    };
    for name in names {
        match doc::load_document(&pages_dir.join(&name)) {
            Ok(page) => match entry_from_page(&name, &page) {
                Some(entry) => {
                    tracing::debug!(
                        "{} is titled \"{}\", starts at page {}, and contains {} sheet(s)",
                        name,
                        entry.title,
                        entry.start_page,
                        entry.sheet_count
                    );
                    outcome.pages.push(entry);
                }
                None => {
                    tracing::info!("{name} does not mention a start page; ignored");
                }
            },
            Err(err) => {
                if name.ends_with(".json") {
                    tracing::warn!(
                        "{name} cannot be parsed as a page file ({err:#}); will be quarantined"
                    );
                    outcome.unparsable.push(name);
                } else {
                    tracing::info!("{name} cannot be parsed as a page file; ignored");
                }
            }
        }
    }
    Ok(outcome)
}

/// Load the existing TOC document, pre-filtered to entries whose page file
/// still exists. Returns `None` when no usable TOC is available (absent,
/// unreadable, or missing its entry list); reconciliation then runs without
/// a baseline.
pub fn load_toc(toc_path: &Path, pages_dir: &Path) -> Option<Vec<Entry>> {
    if !toc_path.exists() {
        tracing::debug!("no TOC file at {}", toc_path.display());
        return None;
    }
    let toc = match doc::load_document(toc_path) {
        Ok(toc) => toc,
        Err(err) => {
            tracing::warn!("TOC file could not be parsed ({err:#}); ignored");
            return None;
        }
    };
    let Some(Value::Array(raw_entries)) = toc.get("cc") else {
        tracing::warn!("TOC file has no entry list; ignored");
        return None;
    };
    tracing::debug!("TOC file parsed");

    let mut entries = Vec::new();
    for raw in raw_entries.iter().filter_map(Value::as_object) {
        let entry = entry_from_toc(raw);
        if pages_dir.join(&entry.filename).exists() {
            tracing::debug!("TOC entry for {} read", entry.filename);
            entries.push(entry);
        } else {
            tracing::info!(
                "TOC entry for {} does not correspond to an existing file; ignored",
                entry.filename
            );
        }
    }
    Some(entries)
}

fn is_page_candidate(name: &str) -> bool {
    if name.ends_with('~') {
        return false;
    }
    name.ends_with(".json") || name.contains(".json.")
}

/// Build an entry from a parsed page document, or `None` if the document
/// carries no `startPage` and therefore is not a page.
fn entry_from_page(filename: &str, page: &Document) -> Option<Entry> {
    let start_page = doc::int_field(page, "startPage")?;
    let mut title = String::new();
    let mut sheet_count = 0;
    if let Some(Value::Array(blocks)) = page.get("cc") {
        for block in blocks.iter().filter_map(Value::as_object) {
            if block.get("typ").and_then(Value::as_str) == Some("title") {
                if let Some(Value::Array(children)) = block.get("cc") {
                    for child in children.iter().filter_map(Value::as_object) {
                        if child.get("typ").and_then(Value::as_str) == Some("text") {
                            title = doc::str_field(child, "text");
                        }
                    }
                }
            } else if let Some(sheet) = block.get("sheet").and_then(Value::as_i64) {
                sheet_count = sheet_count.max(sheet + 1);
            }
        }
    }
    Some(Entry {
        filename: filename.to_string(),
        title,
        start_page,
        sheet_count,
        created: doc::str_field(page, "cre"),
        modified: doc::str_field(page, "mod"),
    })
}

fn entry_from_toc(raw: &Document) -> Entry {
    let start_page = doc::int_field(raw, "startPage").unwrap_or(0);
    Entry {
        filename: Entry::canonical_filename(start_page),
        title: doc::str_field(raw, "title"),
        start_page,
        sheet_count: doc::int_field(raw, "sheetCount").unwrap_or(0),
        created: doc::str_field(raw, "cre"),
        modified: doc::str_field(raw, "mod"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_page(dir: &Path, name: &str, title: &str, start_page: i64, sheets: &[i64]) {
        let mut blocks = vec![serde_json::json!({
            "typ": "title",
            "cc": [{ "typ": "text", "text": title }],
        })];
        for sheet in sheets {
            blocks.push(serde_json::json!({ "typ": "gfxpage", "sheet": sheet }));
        }
        let page = serde_json::json!({
            "typ": "page",
            "cre": "2013-01-05T14:07:32",
            "mod": "2013-01-06T09:00:00",
            "startPage": start_page,
            "cc": blocks,
        });
        fs::write(dir.join(name), serde_json::to_string(&page).unwrap()).unwrap();
    }

    #[test]
    fn scans_pages_with_titles_and_sheet_counts() {
        let dir = TempDir::new().unwrap();
        write_page(dir.path(), "1.json", "Intro", 1, &[0]);
        write_page(dir.path(), "5.json", "Data", 5, &[0, 1]);

        let outcome = scan_pages(dir.path()).unwrap();
        assert!(outcome.unparsable.is_empty());
        assert_eq!(outcome.pages.len(), 2);
        assert_eq!(outcome.pages[0].filename, "1.json");
        assert_eq!(outcome.pages[0].title, "Intro");
        assert_eq!(outcome.pages[0].sheet_count, 1);
        assert_eq!(outcome.pages[1].filename, "5.json");
        assert_eq!(outcome.pages[1].start_page, 5);
        assert_eq!(outcome.pages[1].sheet_count, 2);
    }

    #[test]
    fn sheet_count_is_max_index_plus_one() {
        let dir = TempDir::new().unwrap();
        write_page(dir.path(), "1.json", "Sparse", 1, &[4]);
        let outcome = scan_pages(dir.path()).unwrap();
        assert_eq!(outcome.pages[0].sheet_count, 5);
    }

    #[test]
    fn classifies_unparsable_and_ignored_files() {
        let dir = TempDir::new().unwrap();
        write_page(dir.path(), "1.json", "Intro", 1, &[0]);
        fs::write(dir.path().join("2.json"), "{ truncated").unwrap();
        fs::write(dir.path().join("3.json.orig"), "also not json").unwrap();
        fs::write(dir.path().join("4.json~"), "backup, skipped").unwrap();
        fs::write(dir.path().join("notes.txt"), "unrelated").unwrap();
        // Parses but has no startPage: not a page file.
        fs::write(dir.path().join("style.json"), r#"{"typ":"style"}"#).unwrap();

        let outcome = scan_pages(dir.path()).unwrap();
        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.unparsable, vec!["2.json".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_names_are_skipped_not_fatal() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        write_page(dir.path(), "1.json", "Intro", 1, &[0]);
        let raw = OsStr::from_bytes(b"bad\xff.json");
        fs::write(dir.path().join(raw), "ignored").unwrap();

        let outcome = scan_pages(dir.path()).unwrap();
        assert_eq!(outcome.pages.len(), 1);
        assert!(outcome.unparsable.is_empty());
    }

    #[test]
    fn toc_loader_prefilters_missing_files() {
        let dir = TempDir::new().unwrap();
        let pages = dir.path().join("pages");
        fs::create_dir(&pages).unwrap();
        write_page(&pages, "1.json", "Intro", 1, &[0]);

        let toc = serde_json::json!({
            "typ": "toc",
            "cc": [
                { "typ": "entry", "startPage": 1, "sheetCount": 1, "title": "Intro",
                  "cre": "2013-01-05T14:07:32", "mod": "2013-01-06T09:00:00" },
                { "typ": "entry", "startPage": 3, "sheetCount": 1, "title": "X",
                  "cre": "2013-01-07T00:00:00", "mod": "2013-01-07T00:00:00" },
            ],
        });
        let toc_path = dir.path().join("toc.json");
        fs::write(&toc_path, serde_json::to_string(&toc).unwrap()).unwrap();

        let entries = load_toc(&toc_path, &pages).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].filename, "1.json");
        assert_eq!(entries[0].title, "Intro");
    }

    #[test]
    fn toc_loader_reports_unusable_toc_as_absent() {
        let dir = TempDir::new().unwrap();
        let pages = dir.path().join("pages");
        fs::create_dir(&pages).unwrap();

        assert!(load_toc(&dir.path().join("toc.json"), &pages).is_none());

        let toc_path = dir.path().join("toc.json");
        fs::write(&toc_path, "scrambled").unwrap();
        assert!(load_toc(&toc_path, &pages).is_none());

        fs::write(&toc_path, r#"{"typ":"toc"}"#).unwrap();
        assert!(load_toc(&toc_path, &pages).is_none());
    }
}
