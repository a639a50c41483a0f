//! Notebook root resolution.
use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// The TOC file name inside a notebook root.
pub const TOC_FILENAME: &str = "toc.json";

/// The pages subdirectory name inside a notebook root.
pub const PAGES_DIRNAME: &str = "pages";

/// Resolve the notebook root: the explicit argument when given, otherwise
/// the unique `*.nb` directory in the current working directory.
pub fn resolve_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        if !dir.is_dir() {
            bail!("{} is not a directory", dir.display());
        }
        return Ok(dir.to_path_buf());
    }
    let cwd = env::current_dir().context("resolve current directory")?;
    find_notebook(&cwd)
}

/// Find the single `*.nb` directory under `dir`. Zero or multiple matches
/// are both fatal; guessing between notebooks is worse than stopping.
pub fn find_notebook(dir: &Path) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    for item in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let item = item.with_context(|| format!("read {}", dir.display()))?;
        let path = item.path();
        let is_nb = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(".nb"));
        if is_nb && path.is_dir() {
            candidates.push(path);
        }
    }
    candidates.sort();
    match candidates.len() {
        0 => bail!("no notebook found in {}", dir.display()),
        1 => {
            let root = candidates.remove(0);
            tracing::info!("loading notebook {}", root.display());
            Ok(root)
        }
        _ => bail!("multiple notebooks found in {}", dir.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn finds_the_unique_notebook() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("lab.nb")).unwrap();
        fs::create_dir(dir.path().join("unrelated")).unwrap();
        // A file named like a notebook does not count.
        fs::write(dir.path().join("stray.nb"), "").unwrap();

        let root = find_notebook(dir.path()).unwrap();
        assert_eq!(root.file_name().unwrap(), "lab.nb");
    }

    #[test]
    fn zero_or_multiple_notebooks_are_fatal() {
        let empty = TempDir::new().unwrap();
        assert!(find_notebook(empty.path()).is_err());

        let crowded = TempDir::new().unwrap();
        fs::create_dir(crowded.path().join("a.nb")).unwrap();
        fs::create_dir(crowded.path().join("b.nb")).unwrap();
        assert!(find_notebook(crowded.path()).is_err());
    }

    #[test]
    fn explicit_root_must_be_a_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.nb");
        assert!(resolve_root(Some(&missing)).is_err());

        fs::create_dir(dir.path().join("lab.nb")).unwrap();
        let root = resolve_root(Some(&dir.path().join("lab.nb"))).unwrap();
        assert!(root.ends_with("lab.nb"));
    }
}
