//! The mutation sequence: quarantine, TOC rewrite, and the two-phase
//! renumbering pass.
//!
//! Ordering is the safety mechanism here. The preflight runs before any
//! destructive step and refuses to start if an earlier run left debris
//! behind; once mutation begins, the first failure aborts the remaining
//! steps and reports the offending file, and already-applied renames stay
//! in place for manual inspection. Renumbering vacates every affected file
//! to a backup name before placing any document under its new name, so
//! plans that permute page numbers never clobber one another.
use crate::doc::{self, Document};
use crate::entry::Entry;
use crate::reconcile::PlannedRename;
use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;

/// Confirmation seam between planning and mutation, injected by the driver
/// so the mutation path is testable without a terminal.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

/// Interactive confirmation: any line of input proceeds, end-of-input
/// declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        println!("{prompt}");
        let mut line = String::new();
        matches!(io::stdin().read_line(&mut line), Ok(n) if n > 0)
    }
}

/// Apply the full repair: preflight, quarantine unparsable files, rewrite
/// the TOC, then renumber. Any error leaves whatever already succeeded in
/// place; there is no compensating rollback.
pub fn apply(
    pages_dir: &Path,
    toc_path: &Path,
    entries: &[Entry],
    renames: &[PlannedRename],
    unparsable: &[String],
) -> Result<()> {
    preflight(pages_dir, renames)?;
    quarantine(pages_dir, unparsable)?;
    rewrite_toc(toc_path, entries)?;
    renumber(pages_dir, renames)?;
    Ok(())
}

/// Fail closed before touching anything: a leftover `<res>.tmp` for any
/// planned rename means an earlier or concurrent run did not finish, which
/// this tool cannot untangle.
pub fn preflight(pages_dir: &Path, renames: &[PlannedRename]) -> Result<()> {
    for plan in renames {
        let tmp = plan.res_tmp();
        if pages_dir.join(&tmp).exists() {
            bail!("{tmp} exists, which indicates an unfinished repair; refusing to continue");
        }
    }
    Ok(())
}

/// Side-line every unparsable `.json` file under a `.unparsed~` name.
pub fn quarantine(pages_dir: &Path, unparsable: &[String]) -> Result<()> {
    for name in unparsable {
        let quarantined = format!("{name}.unparsed~");
        fs::rename(pages_dir.join(name), pages_dir.join(&quarantined))
            .with_context(|| format!("quarantine {name} as {quarantined}"))?;
        tracing::info!("quarantined {name} as {quarantined}");
    }
    Ok(())
}

#[derive(Serialize)]
struct TocEntryRecord<'a> {
    typ: &'static str,
    cre: &'a str,
    #[serde(rename = "mod")]
    modified: &'a str,
    #[serde(rename = "startPage")]
    start_page: i64,
    #[serde(rename = "sheetCount")]
    sheet_count: i64,
    title: &'a str,
}

/// Serialize the reconciled entry list as the new TOC document and write it
/// over the old one. The envelope gets fresh timestamps; each entry keeps
/// its own.
pub fn rewrite_toc(toc_path: &Path, entries: &[Entry]) -> Result<()> {
    tracing::info!("rebuilding TOC file");
    let now = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
    let records: Vec<Value> = entries
        .iter()
        .map(|entry| {
            serde_json::to_value(TocEntryRecord {
                typ: "entry",
                cre: &entry.created,
                modified: &entry.modified,
                start_page: entry.start_page,
                sheet_count: entry.sheet_count,
                title: &entry.title,
            })
            .context("serialize TOC entry")
        })
        .collect::<Result<_>>()?;

    let mut toc = Document::new();
    toc.insert("typ".to_string(), Value::from("toc"));
    toc.insert("cre".to_string(), Value::from(now.clone()));
    toc.insert("mod".to_string(), Value::from(now));
    toc.insert("cc".to_string(), Value::Array(records));

    doc::save_document(toc_path, &toc)?;
    tracing::info!("new TOC file saved");
    Ok(())
}

/// Two-phase renumbering: vacate every affected file to its backup name
/// (parking resource directories under `.tmp`), then place each held
/// document under its canonical new name.
pub fn renumber(pages_dir: &Path, renames: &[PlannedRename]) -> Result<()> {
    // Re-parse every affected page before moving anything, stamping in the
    // assigned start page.
    let mut held: Vec<Document> = Vec::with_capacity(renames.len());
    for plan in renames {
        let mut page = doc::load_document(&pages_dir.join(&plan.old_filename))
            .with_context(|| format!("reload {} for renumbering", plan.old_filename))?;
        page.insert("startPage".to_string(), Value::from(plan.new_start_page));
        held.push(page);
    }

    // Phase A: vacate.
    for plan in renames {
        let backup = plan.backup();
        let _ = fs::remove_file(pages_dir.join(&backup));
        fs::rename(pages_dir.join(&plan.old_filename), pages_dir.join(&backup))
            .with_context(|| format!("rename {} as {backup}", plan.old_filename))?;
        tracing::info!("renamed {} as {backup}", plan.old_filename);

        let res = pages_dir.join(&plan.old_res);
        if res.exists() {
            let tmp = plan.res_tmp();
            fs::rename(&res, pages_dir.join(&tmp))
                .with_context(|| format!("rename {} as {tmp}", plan.old_res))?;
            tracing::info!("renamed {} as {tmp}", plan.old_res);
        }
    }

    // Phase B: place.
    for (plan, page) in renames.iter().zip(&held) {
        let target = pages_dir.join(&plan.new_filename);
        if target.exists() {
            return Err(anyhow!(
                "{} already exists; cannot renumber {} as page {}",
                plan.new_filename,
                plan.old_filename,
                plan.new_start_page
            ));
        }
        doc::save_document(&target, page)
            .with_context(|| format!("renumber {} as {}", plan.old_filename, plan.new_filename))?;
        tracing::info!("renumbered {} as {}", plan.old_filename, plan.new_filename);

        let res_tmp = pages_dir.join(plan.res_tmp());
        if res_tmp.exists() {
            let res_target = pages_dir.join(&plan.new_res);
            if res_target.exists() {
                return Err(anyhow!(
                    "{} already exists; cannot renumber {}",
                    plan.new_res,
                    plan.res_tmp()
                ));
            }
            fs::rename(&res_tmp, &res_target)
                .with_context(|| format!("rename {} as {}", plan.res_tmp(), plan.new_res))?;
            tracing::info!("renumbered {} as {}", plan.old_res, plan.new_res);
        }
    }
    Ok(())
}
