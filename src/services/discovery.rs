use crate::error::{ScanError, ScanResult};
use camino::{Utf8Path, Utf8PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Returns true for dot-files and dot-directories (`.git`, `.env`, ...)
///
/// The walk root itself is never treated as hidden.
pub fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn is_skipped(entry: &DirEntry, skip_dir: Option<&Utf8Path>) -> bool {
    match skip_dir {
        Some(dir) => entry.depth() > 0 && entry.file_type().is_dir() && entry.path() == dir,
        None => false,
    }
}

/// Recursively list every regular, non-hidden file under `root`.
///
/// Hidden directories are not descended into and symlinks are not followed.
/// Files are returned sorted by path within each directory so that submission
/// order is stable between runs.
///
/// `skip_dir`, when it lies under `root`, is pruned from the walk. The output
/// directory is passed here so a run never rescans its own artifacts.
///
/// # Errors
///
/// Fails with [`ScanError::Setup`] when `root` itself cannot be read.
/// Unreadable subdirectories and non UTF-8 paths are logged and skipped.
pub fn collect_files(
    root: &Utf8Path,
    skip_dir: Option<&Utf8Path>,
) -> ScanResult<Vec<Utf8PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e) && !is_skipped(e, skip_dir));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                return Err(ScanError::Setup {
                    path: root.to_path_buf(),
                    source,
                });
            }
            Err(e) => {
                tracing::warn!("Skipping unreadable entry under {}: {}", root, e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        match Utf8PathBuf::from_path_buf(entry.into_path()) {
            Ok(path) => files.push(path),
            Err(path) => tracing::warn!("Skipping non UTF-8 path: {}", path.display()),
        }
    }

    tracing::debug!("Discovered {} files under {}", files.len(), root);
    Ok(files)
}
