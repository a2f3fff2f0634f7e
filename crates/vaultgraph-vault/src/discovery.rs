//! Filesystem discovery of vaults and note files.

use std::path::{Path, PathBuf};
use vaultgraph_core::{Error, Result};
use walkdir::{DirEntry, WalkDir};

/// Hidden entries below the walk root; the root itself is always allowed
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Whether `path` is a directory holding the `marker` subdirectory
pub fn is_vault(path: &Path, marker: &str) -> bool {
    path.is_dir() && path.join(marker).is_dir()
}

/// Every vault under `root`, in walk order.
///
/// Found vaults are not descended into, so nested vaults are reported once
/// through their outermost ancestor.
pub fn discover_vaults(root: &Path, marker: &str) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::vault_not_found(root.display().to_string()));
    }

    let mut vaults = Vec::new();
    let mut walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping unreadable entry during discovery: {}", e);
                continue;
            }
        };
        if entry.file_type().is_dir() && entry.path().join(marker).is_dir() {
            log::debug!("Found vault at {}", entry.path().display());
            vaults.push(entry.into_path());
            walker.skip_current_dir();
        }
    }

    log::info!("Discovered {} vaults under {}", vaults.len(), root.display());
    Ok(vaults)
}

/// Note files below `root` with `extension`, skipping hidden path components.
///
/// Returned sorted so batches are reproducible.
pub fn note_files(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!("Skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .map(DirEntry::into_path)
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn test_note_files_skip_hidden_components() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "A.md");
        touch(root, "sub/B.MD");
        touch(root, "sub/notes.txt");
        touch(root, ".obsidian/workspace.md");
        touch(root, ".hidden.md");
        touch(root, "sub/.trash/Old.md");

        let files: Vec<_> = note_files(root, "md")
            .into_iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(files, vec![PathBuf::from("A.md"), PathBuf::from("sub/B.MD")]);
    }

    #[test]
    fn test_discover_vaults_stops_at_vault_roots() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("work/.obsidian")).unwrap();
        fs::create_dir_all(root.join("work/nested/.obsidian")).unwrap();
        fs::create_dir_all(root.join("personal/journal/.obsidian")).unwrap();
        fs::create_dir_all(root.join("plain/folder")).unwrap();

        let vaults = discover_vaults(root, ".obsidian").unwrap();
        assert_eq!(
            vaults,
            vec![root.join("personal/journal"), root.join("work")]
        );
        assert!(is_vault(&root.join("work"), ".obsidian"));
        assert!(!is_vault(&root.join("plain"), ".obsidian"));
    }

    #[test]
    fn test_discover_missing_root() {
        let err = discover_vaults(Path::new("/definitely/not/here"), ".obsidian").unwrap_err();
        assert!(matches!(err, Error::VaultNotFound { .. }));
    }
}
