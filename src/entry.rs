//! Normalized catalog record for one page, shared by the TOC loader and the
//! directory scanner.
//!
//! The ordering implemented here is the canonical page order: it decides the
//! sequence in which pages are renumbered, so it must be total and depend only
//! on the entry's own fields. Structural equality (`PartialEq`) is exactly
//! "compares as equal" under that order, which is what lets a scanned page be
//! matched against its TOC record: any field drift, including a bare
//! modification-time change, makes the match fail and forces a TOC rebuild.
use std::cmp::Ordering;

/// One page's catalog record, built either from a TOC entry or from a page
/// document on disk.
///
/// `created` and `modified` carry the document's `cre`/`mod` values verbatim.
/// In practice these are ISO-8601 local timestamps, so string comparison
/// agrees with chronological comparison; keeping them verbatim means equality
/// against the TOC never depends on a date parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub filename: String,
    pub title: String,
    pub start_page: i64,
    pub sheet_count: i64,
    pub created: String,
    pub modified: String,
}

impl Ord for Entry {
    /// Canonical page order: creation time, then declared start page, then
    /// modification time, filename, title, and sheet count as tie-breaks.
    fn cmp(&self, other: &Self) -> Ordering {
        self.created
            .cmp(&other.created)
            .then_with(|| self.start_page.cmp(&other.start_page))
            .then_with(|| self.modified.cmp(&other.modified))
            .then_with(|| self.filename.cmp(&other.filename))
            .then_with(|| self.title.cmp(&other.title))
            .then_with(|| self.sheet_count.cmp(&other.sheet_count))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Entry {
    /// The filename a page starting at `start_page` is supposed to have.
    pub fn canonical_filename(start_page: i64) -> String {
        format!("{start_page}.json")
    }

    /// The resource-directory name paired with this entry's current filename.
    ///
    /// Derived by textual substitution of "json" with "res" across the whole
    /// name, so a file like `3.json.new` maps to `3.res.new`.
    pub fn resource_dir(&self) -> String {
        self.filename.replace("json", "res")
    }
}
