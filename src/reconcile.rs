//! Drift computation between the loaded TOC and the scanned pages, plus the
//! renumbering plan derived from it.
//!
//! The TOC side is treated as a multiset with removal by structural
//! equality: a scanned page "confirms" a TOC entry only when every field
//! matches, so a title or timestamp edit counts as drift even when the page
//! numbering is untouched. The set is small (hundreds of entries at most),
//! so a plain vector with linear removal is used.
use crate::entry::Entry;

/// Outcome of reconciling the scanned pages against the loaded TOC.
pub struct Reconciliation {
    /// All scanned entries in canonical order, with `start_page` rewritten
    /// to the contiguous assignment.
    pub entries: Vec<Entry>,
    /// Whether any entry's `start_page` had to change.
    pub renumbered: bool,
    /// A TOC was loaded, every TOC entry was matched, and every scanned page
    /// was found in the TOC.
    pub perfect_match: bool,
    /// TOC entries left unmatched after the walk: referenced pages with no
    /// structurally equal file on disk.
    pub orphans: Vec<Entry>,
}

impl Reconciliation {
    /// True when the TOC already describes the directory exactly and no
    /// renumbering is needed; the run can stop without mutating anything.
    pub fn is_clean(&self) -> bool {
        self.perfect_match && !self.renumbered
    }
}

/// Sort the scanned entries into canonical order, assign contiguous page
/// numbers, and match entries off against the TOC multiset.
///
/// `toc` is `None` when no usable TOC was loaded; matching is then skipped
/// and the result can never be a perfect match.
pub fn reconcile(mut actual: Vec<Entry>, toc: Option<Vec<Entry>>) -> Reconciliation {
    actual.sort();

    let toc_loaded = toc.is_some();
    let mut remaining = toc.unwrap_or_default();
    let mut perfect_match = toc_loaded;
    let mut renumbered = false;
    let mut next_page = 1;

    for entry in &mut actual {
        if let Some(pos) = remaining.iter().position(|candidate| candidate == entry) {
            remaining.remove(pos);
        } else if toc_loaded {
            perfect_match = false;
            tracing::info!("no TOC entry for {}", entry.filename);
        }
        if entry.start_page != next_page {
            tracing::info!(
                "renumbering {} to start on page {next_page}",
                entry.filename
            );
            entry.start_page = next_page;
            renumbered = true;
        }
        next_page += entry.sheet_count;
    }

    if !remaining.is_empty() {
        perfect_match = false;
        for orphan in &remaining {
            tracing::warn!("no file for TOC entry {}", orphan.filename);
        }
    }

    Reconciliation {
        entries: actual,
        renumbered,
        perfect_match,
        orphans: remaining,
    }
}

/// One planned relocation: a page file whose name does not encode its
/// assigned start page, plus the resource-directory names that travel with
/// it.
#[derive(Debug, Clone)]
pub struct PlannedRename {
    pub old_filename: String,
    pub new_filename: String,
    pub new_start_page: i64,
    pub old_res: String,
    pub new_res: String,
}

impl PlannedRename {
    /// Interim name the resource directory passes through while its page is
    /// vacated. A leftover one on disk marks an earlier run that died
    /// mid-repair.
    pub fn res_tmp(&self) -> String {
        format!("{}.tmp", self.old_res)
    }

    /// Backup name the original page file is parked under.
    pub fn backup(&self) -> String {
        format!("{}~", self.old_filename)
    }
}

/// Compute the rename plan: the entries whose current filename differs from
/// the canonical `"<startPage>.json"`.
pub fn plan_renames(entries: &[Entry]) -> Vec<PlannedRename> {
    entries
        .iter()
        .filter(|entry| entry.filename != Entry::canonical_filename(entry.start_page))
        .map(|entry| PlannedRename {
            old_filename: entry.filename.clone(),
            new_filename: Entry::canonical_filename(entry.start_page),
            new_start_page: entry.start_page,
            old_res: entry.resource_dir(),
            new_res: format!("{}.res", entry.start_page),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(filename: &str, created: &str, start_page: i64, sheet_count: i64) -> Entry {
        Entry {
            filename: filename.to_string(),
            title: String::new(),
            start_page,
            sheet_count,
            created: created.to_string(),
            modified: created.to_string(),
        }
    }

    #[test]
    fn assigns_contiguous_start_pages() {
        let actual = vec![
            page("5.json", "2013-02-01T00:00:00", 5, 2),
            page("1.json", "2013-01-01T00:00:00", 1, 1),
        ];
        let recon = reconcile(actual, None);

        assert!(recon.renumbered);
        assert!(!recon.perfect_match);
        assert_eq!(recon.entries[0].filename, "1.json");
        assert_eq!(recon.entries[0].start_page, 1);
        assert_eq!(recon.entries[1].filename, "5.json");
        assert_eq!(recon.entries[1].start_page, 2);

        let plan = plan_renames(&recon.entries);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].old_filename, "5.json");
        assert_eq!(plan[0].new_filename, "2.json");
        assert_eq!(plan[0].old_res, "5.res");
        assert_eq!(plan[0].new_res, "2.res");
    }

    #[test]
    fn contiguity_holds_across_sheet_counts() {
        let actual = vec![
            page("1.json", "2013-01-01T00:00:00", 1, 1),
            page("2.json", "2013-01-02T00:00:00", 2, 3),
            page("9.json", "2013-01-03T00:00:00", 9, 2),
        ];
        let recon = reconcile(actual, None);
        let starts: Vec<i64> = recon.entries.iter().map(|e| e.start_page).collect();
        assert_eq!(starts, vec![1, 2, 5]);
    }

    #[test]
    fn clean_tree_short_circuits() {
        let actual = vec![
            page("1.json", "2013-01-01T00:00:00", 1, 1),
            page("2.json", "2013-01-02T00:00:00", 2, 2),
        ];
        let toc = actual.clone();
        let recon = reconcile(actual, Some(toc));
        assert!(recon.is_clean());
        assert!(recon.orphans.is_empty());
    }

    #[test]
    fn timestamp_drift_breaks_the_match() {
        let actual = vec![page("1.json", "2013-01-01T00:00:00", 1, 1)];
        let mut stale = actual.clone();
        stale[0].modified = "2013-06-01T00:00:00".to_string();

        let recon = reconcile(actual, Some(stale));
        assert!(!recon.perfect_match);
        assert!(!recon.is_clean());
        // The stale record shows up both as an unmatched file and an orphan.
        assert_eq!(recon.orphans.len(), 1);
    }

    #[test]
    fn orphaned_toc_entries_are_reported_and_dropped() {
        let actual = vec![page("1.json", "2013-01-01T00:00:00", 1, 1)];
        let mut toc = actual.clone();
        toc.push(page("3.json", "2013-03-01T00:00:00", 3, 1));

        let recon = reconcile(actual, Some(toc));
        assert!(!recon.perfect_match);
        assert_eq!(recon.orphans.len(), 1);
        assert_eq!(recon.orphans[0].filename, "3.json");
        // The rewritten TOC is built from `entries`, which excludes orphans.
        assert_eq!(recon.entries.len(), 1);
    }

    #[test]
    fn duplicate_toc_entries_match_as_a_multiset() {
        let one = page("1.json", "2013-01-01T00:00:00", 1, 1);
        let actual = vec![one.clone()];
        let toc = vec![one.clone(), one];

        let recon = reconcile(actual, Some(toc));
        // One copy matches; the duplicate is left over as an orphan.
        assert_eq!(recon.orphans.len(), 1);
        assert!(!recon.perfect_match);
    }

    #[test]
    fn missing_toc_never_counts_as_perfect() {
        let actual = vec![page("1.json", "2013-01-01T00:00:00", 1, 1)];
        let recon = reconcile(actual, None);
        assert!(!recon.perfect_match);
        assert!(!recon.renumbered);
        assert!(!recon.is_clean());
    }
}
