//! Access to the hierarchical configuration store that records installed
//! libraries.
//!
//! The store is a tree of named keys, each holding string values. Libraries
//! live under one of two roots. Backends are root-agnostic: the caller always
//! says which root it means.

pub mod tree;
#[cfg(windows)]
pub mod windows;

pub use tree::TreeStore;
#[cfg(windows)]
pub use windows::RegistryStore;

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreRoot {
    Primary,
    Compatibility,
}

impl StoreRoot {
    pub const ALL: [StoreRoot; 2] = [StoreRoot::Primary, StoreRoot::Compatibility];

    pub fn key_path(&self) -> &'static str {
        match self {
            StoreRoot::Primary => r"SOFTWARE\Native Instruments",
            StoreRoot::Compatibility => r"SOFTWARE\WOW6432Node\Native Instruments",
        }
    }
}

impl fmt::Display for StoreRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreRoot::Primary => write!(f, "Primary"),
            StoreRoot::Compatibility => write!(f, "Compatibility"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    ReadWrite,
}

/// An opened key. Cheap to clone; backends re-resolve it on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtreeHandle {
    pub root: StoreRoot,
    pub path: String,
    pub access: Access,
}

impl SubtreeHandle {
    pub fn display_path(&self) -> String {
        display_path(self.root, &self.path)
    }
}

pub fn display_path(root: StoreRoot, path: &str) -> String {
    if path.is_empty() {
        root.to_string()
    } else {
        format!(r"{}\{}", root, path)
    }
}

/// Joins key segments with the store separator.
pub fn join_key(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!(r"{}\{}", parent, child)
    }
}

pub trait ConfigStore: Send + Sync {
    fn open_subtree(
        &self,
        root: StoreRoot,
        path: &str,
        access: Access,
    ) -> Result<SubtreeHandle, StoreError>;

    fn enumerate_child_names(&self, handle: &SubtreeHandle) -> Result<Vec<String>, StoreError>;

    /// Absent values and non-string values both read as `None`.
    fn read_string_value(&self, handle: &SubtreeHandle, name: &str) -> Option<String>;

    fn write_string_value(
        &self,
        handle: &SubtreeHandle,
        name: &str,
        value: &str,
    ) -> Result<(), StoreError>;

    /// Writes the subtree to `destination`, replacing any file already there.
    fn export_subtree(&self, handle: &SubtreeHandle, destination: &Path)
        -> Result<(), StoreError>;

    fn delete_subtree(&self, root: StoreRoot, path: &str) -> Result<(), StoreError>;

    /// Fails with `AccessDenied` when the process cannot mutate the store.
    fn check_write_access(&self) -> Result<(), StoreError>;

    /// File extension used for exported subtrees.
    fn backup_extension(&self) -> &'static str;
}

#[cfg(windows)]
pub fn system_store(_locations: &crate::locations::Locations) -> Result<Box<dyn ConfigStore>, StoreError> {
    Ok(Box::new(RegistryStore::new()))
}

#[cfg(not(windows))]
pub fn system_store(locations: &crate::locations::Locations) -> Result<Box<dyn ConfigStore>, StoreError> {
    Ok(Box::new(TreeStore::open(&locations.store_file)?))
}
