use crate::error::SweepError;
use crate::inventory::RemovableUnit;
use crate::locations::CONTENT_DIR_VALUE;
use crate::pipeline::RemovalContext;
use crate::store::Access;
use std::path::{Path, PathBuf};

/// Moves a library's content directory under `new_parent` and points its
/// store entry at the new location. Returns the new content directory.
pub fn relocate(
    ctx: &RemovalContext,
    unit: &RemovableUnit,
    new_parent: &Path,
) -> Result<PathBuf, SweepError> {
    if !unit.has_content_dir() {
        return Err(SweepError::OperationFailed(format!(
            "{} has no content directory to move",
            unit.name
        )));
    }
    if !unit.content_dir.exists() {
        return Err(SweepError::NotFound(unit.content_dir.display().to_string()));
    }

    let folder = unit
        .content_dir
        .file_name()
        .ok_or_else(|| SweepError::OperationFailed("content directory has no name".to_string()))?;
    let target = new_parent.join(folder);
    if target == unit.content_dir {
        return Ok(target);
    }
    if target.exists() {
        return Err(SweepError::OperationFailed(format!(
            "{} already exists",
            target.display()
        )));
    }

    // Open for writing first so a read-only store fails before anything moves.
    let handle = ctx
        .store
        .open_subtree(unit.root, &unit.sub_key, Access::ReadWrite)?;

    if !ctx.file_ops.move_item(&unit.content_dir, &target) {
        return Err(SweepError::OperationFailed(format!(
            "could not move {} to {}",
            unit.content_dir.display(),
            target.display()
        )));
    }

    let value = target.to_string_lossy();
    if let Err(e) = ctx
        .store
        .write_string_value(&handle, CONTENT_DIR_VALUE, &value)
    {
        log::error!("[{}] could not update {}: {}", unit.name, CONTENT_DIR_VALUE, e);
        if !ctx.file_ops.move_item(&target, &unit.content_dir) {
            log::error!(
                "[{}] content left at {}; registry still points to {}",
                unit.name,
                target.display(),
                unit.content_dir.display()
            );
        }
        return Err(e.into());
    }

    ctx.history.record(
        "WRITE_VALUE",
        format!("{}\\{} = {}", handle.display_path(), CONTENT_DIR_VALUE, value),
    );
    log::info!("[{}] relocated to {}", unit.name, target.display());
    Ok(target)
}
