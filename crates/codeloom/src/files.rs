//! Filesystem boundary: reads, writes, backups, and context trees.

use crate::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a file's content, or `None` if it does not exist.
pub fn read_if_exists(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(eyre!("Failed to read {}: {}", path.display(), err)),
    }
}

/// Write content to a file, creating parent directories as needed.
pub fn write_with_parents(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|err| eyre!("Failed to create {}: {}", parent.display(), err))?;
        }
    }
    fs::write(path, content).map_err(|err| eyre!("Failed to write {}: {}", path.display(), err))
}

/// Backup destination for `source`: the source path flattened into a single
/// file name plus a timestamp, under the backup directory. The timestamp
/// keeps repeated backups of the same file from colliding.
pub fn backup_path(backup_dir: &Path, source: &Path) -> PathBuf {
    let flattened: String = source
        .to_string_lossy()
        .chars()
        .map(|c| if std::path::is_separator(c) { '_' } else { c })
        .collect();
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    backup_dir.join(format!("{flattened}.{stamp}.bak"))
}

/// Durably copy `source` to `backup`, creating the backup directory.
pub fn create_backup(source: &Path, backup: &Path) -> Result<()> {
    if let Some(parent) = backup.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| eyre!("Failed to create backup dir {}: {}", parent.display(), err))?;
    }
    fs::copy(source, backup).map_err(|err| {
        eyre!(
            "Failed to back up {} to {}: {}",
            source.display(),
            backup.display(),
            err
        )
    })?;
    Ok(())
}

/// Render a depth-limited tree of a directory for prompt context.
///
/// Hidden files and commonly ignored directories (target, node_modules, …)
/// are skipped via the standard ignore filters.
pub fn directory_tree(root: &Path, max_depth: usize) -> Result<String> {
    let mut tree = String::new();

    let walker = ignore::WalkBuilder::new(root)
        .max_depth(Some(max_depth))
        .hidden(true)
        .build();

    for entry in walker {
        let entry = entry.map_err(|err| eyre!("Failed to walk {}: {}", root.display(), err))?;
        if entry.depth() == 0 {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        let indent = "  ".repeat(entry.depth() - 1);
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());

        if is_dir {
            tree.push_str(&format!("{indent}{name}/\n"));
        } else {
            tree.push_str(&format!("{indent}{name}\n"));
        }
    }

    Ok(tree)
}
