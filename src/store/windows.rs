use super::{display_path, join_key, Access, ConfigStore, StoreRoot, SubtreeHandle};
use crate::error::StoreError;
use std::io;
use std::path::Path;
use std::process::Command;
use winreg::enums::*;
use winreg::RegKey;

/// The Windows registry, rooted in the local machine hive.
pub struct RegistryStore;

impl RegistryStore {
    pub fn new() -> Self {
        Self
    }

    fn hive() -> RegKey {
        RegKey::predef(HKEY_LOCAL_MACHINE)
    }

    fn full_path(root: StoreRoot, path: &str) -> String {
        join_key(root.key_path(), path)
    }

    fn open(&self, root: StoreRoot, path: &str, access: Access) -> Result<RegKey, StoreError> {
        let flags = match access {
            Access::Read => KEY_READ,
            Access::ReadWrite => KEY_READ | KEY_WRITE,
        };
        Self::hive()
            .open_subkey_with_flags(Self::full_path(root, path), flags)
            .map_err(|e| map_io(e, root, path))
    }
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn map_io(e: io::Error, root: StoreRoot, path: &str) -> StoreError {
    match e.kind() {
        io::ErrorKind::NotFound => StoreError::NotFound(display_path(root, path)),
        io::ErrorKind::PermissionDenied => {
            StoreError::AccessDenied(format!("{}: {}", display_path(root, path), e))
        }
        _ => StoreError::Io(e),
    }
}

impl ConfigStore for RegistryStore {
    fn open_subtree(
        &self,
        root: StoreRoot,
        path: &str,
        access: Access,
    ) -> Result<SubtreeHandle, StoreError> {
        self.open(root, path, access)?;
        Ok(SubtreeHandle {
            root,
            path: path.to_string(),
            access,
        })
    }

    fn enumerate_child_names(&self, handle: &SubtreeHandle) -> Result<Vec<String>, StoreError> {
        let key = self.open(handle.root, &handle.path, Access::Read)?;
        key.enum_keys()
            .collect::<io::Result<Vec<String>>>()
            .map_err(StoreError::Io)
    }

    fn read_string_value(&self, handle: &SubtreeHandle, name: &str) -> Option<String> {
        let key = self.open(handle.root, &handle.path, Access::Read).ok()?;
        key.get_value::<String, _>(name).ok()
    }

    fn write_string_value(
        &self,
        handle: &SubtreeHandle,
        name: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        if handle.access != Access::ReadWrite {
            return Err(StoreError::AccessDenied(format!(
                "{} was opened read-only",
                handle.display_path()
            )));
        }
        let key = self.open(handle.root, &handle.path, Access::ReadWrite)?;
        key.set_value(name, &value.to_string())
            .map_err(|e| map_io(e, handle.root, &handle.path))
    }

    fn export_subtree(
        &self,
        handle: &SubtreeHandle,
        destination: &Path,
    ) -> Result<(), StoreError> {
        let key = format!(r"HKLM\{}", Self::full_path(handle.root, &handle.path));
        let output = Command::new("reg")
            .arg("export")
            .arg(&key)
            .arg(destination)
            .arg("/y")
            .output()
            .map_err(|e| StoreError::Export {
                key: key.clone(),
                destination: destination.to_path_buf(),
                reason: e.to_string(),
            })?;

        if output.status.success() && destination.exists() {
            Ok(())
        } else {
            Err(StoreError::Export {
                key,
                destination: destination.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }

    fn delete_subtree(&self, root: StoreRoot, path: &str) -> Result<(), StoreError> {
        if path.is_empty() {
            return Err(StoreError::Backend(format!(
                "refusing to delete store root {}",
                root
            )));
        }
        Self::hive()
            .delete_subkey_all(Self::full_path(root, path))
            .map_err(|e| map_io(e, root, path))
    }

    fn check_write_access(&self) -> Result<(), StoreError> {
        match Self::hive().open_subkey_with_flags("SOFTWARE", KEY_READ | KEY_WRITE) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Err(
                StoreError::AccessDenied(
                    "write access to HKLM\\SOFTWARE requires running as administrator"
                        .to_string(),
                ),
            ),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn backup_extension(&self) -> &'static str {
        "reg"
    }
}
