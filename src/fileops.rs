use crate::history::HistoryLogger;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use walkdir::WalkDir;

/// Destructive filesystem actions behind one success/failure signal.
///
/// Implementations never prompt and never panic: a failure is logged and
/// reported as `false`, and the caller decides whether it matters.
pub trait FileOps: Send + Sync {
    /// Deletes a file or a directory tree. A missing path is a success.
    fn delete_item(&self, path: &Path) -> bool;

    /// Moves `src` to `dst`, creating the destination's parent directories.
    fn move_item(&self, src: &Path, dst: &Path) -> bool;

    /// Copies a file or directory tree, creating the destination's parents.
    fn copy_item(&self, src: &Path, dst: &Path) -> bool;
}

pub struct FsFileOps {
    history: Arc<HistoryLogger>,
}

impl FsFileOps {
    pub fn new(history: Arc<HistoryLogger>) -> Self {
        Self { history }
    }

    fn record(&self, action: &str, detail: String, result: &io::Result<()>) -> bool {
        match result {
            Ok(()) => {
                log::info!("{} {}", action, detail);
                self.history.record(action, detail);
                true
            }
            Err(e) => {
                log::warn!("{} failed for {}: {}", action, detail, e);
                self.history
                    .record(&format!("{}_FAILED", action), format!("{} ({})", detail, e));
                false
            }
        }
    }
}

impl FileOps for FsFileOps {
    fn delete_item(&self, path: &Path) -> bool {
        if fs::symlink_metadata(path).is_err() {
            log::debug!("already gone: {}", path.display());
            return true;
        }

        let result = remove_path(path);
        self.record("DELETE", path.display().to_string(), &result)
    }

    fn move_item(&self, src: &Path, dst: &Path) -> bool {
        let result = ensure_parent(dst).and_then(|_| {
            match fs::rename(src, dst) {
                Ok(()) => Ok(()),
                // Rename cannot cross volumes; fall back to copy then delete.
                Err(_) if src.exists() => copy_path(src, dst).and_then(|_| remove_path(src)),
                Err(e) => Err(e),
            }
        });
        self.record(
            "MOVE",
            format!("{} -> {}", src.display(), dst.display()),
            &result,
        )
    }

    fn copy_item(&self, src: &Path, dst: &Path) -> bool {
        let result = ensure_parent(dst).and_then(|_| copy_path(src, dst));
        self.record(
            "COPY",
            format!("{} -> {}", src.display(), dst.display()),
            &result,
        )
    }
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    let result = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match result {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            clear_readonly(path)?;
            if metadata.is_dir() {
                fs::remove_dir_all(path)
            } else {
                fs::remove_file(path)
            }
        }
        other => other,
    }
}

#[allow(clippy::permissions_set_readonly_false)]
fn clear_readonly(path: &Path) -> io::Result<()> {
    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        let mut permissions = entry.metadata()?.permissions();
        if permissions.readonly() {
            permissions.set_readonly(false);
            fs::set_permissions(entry.path(), permissions)?;
        }
    }
    Ok(())
}

fn copy_path(src: &Path, dst: &Path) -> io::Result<()> {
    if !src.is_dir() {
        fs::copy(src, dst)?;
        return Ok(());
    }

    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
