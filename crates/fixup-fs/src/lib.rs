use std::io;
use std::path::{Path, PathBuf};

use tracing::trace;
use walkdir::WalkDir;

pub use crate::path::*;

mod path;

#[derive(Debug, thiserror::Error)]
pub enum CopyError {
    #[error("Failed to walk the directory `{}`", path.simplified_display())]
    WalkDir {
        path: PathBuf,
        #[source]
        err: walkdir::Error,
    },
    #[error("Failed to create directory `{}`", path.simplified_display())]
    CreateDir {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("Failed to copy `{}` to `{}`", from.simplified_display(), to.simplified_display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("Failed to recreate symlink `{}`", path.simplified_display())]
    Symlink {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
}

/// Recursively copy the directory `src` to `dst`, recreating symbolic links instead of
/// following them.
///
/// Relative links inside the tree (like the `Versions/Current` link of a macOS framework)
/// therefore keep pointing at the copied files.
pub fn copy_dir_preserving_symlinks(src: &Path, dst: &Path) -> Result<(), CopyError> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|err| CopyError::WalkDir {
            path: src.to_path_buf(),
            err,
        })?;

        let path = entry.path();
        let Ok(relative) = path.strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);

        if entry.file_type().is_symlink() {
            let link = fs_err::read_link(path).map_err(|err| CopyError::Symlink {
                path: path.to_path_buf(),
                err,
            })?;
            trace!(
                "Recreating symlink {} -> {}",
                target.simplified_display(),
                link.simplified_display()
            );
            create_symlink(&link, &target, path).map_err(|err| CopyError::Symlink {
                path: target.clone(),
                err,
            })?;
        } else if entry.file_type().is_dir() {
            fs_err::create_dir_all(&target).map_err(|err| CopyError::CreateDir {
                path: target.clone(),
                err,
            })?;
        } else {
            fs_err::copy(path, &target).map_err(|err| CopyError::Copy {
                from: path.to_path_buf(),
                to: target.clone(),
                err,
            })?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn create_symlink(original: &Path, link: &Path, _source: &Path) -> io::Result<()> {
    fs_err::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn create_symlink(original: &Path, link: &Path, source: &Path) -> io::Result<()> {
    if source.is_dir() {
        fs_err::os::windows::fs::symlink_dir(original, link)
    } else {
        fs_err::os::windows::fs::symlink_file(original, link)
    }
}
