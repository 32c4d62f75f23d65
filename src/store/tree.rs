use super::{display_path, Access, ConfigStore, StoreRoot, SubtreeHandle};
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub values: BTreeMap<String, String>,
    #[serde(default)]
    pub children: BTreeMap<String, Node>,
}

impl Node {
    fn child(&self, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, node)| node)
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, node)| node)
    }

    fn child_key(&self, name: &str) -> Option<String> {
        self.children
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned()
    }

    fn descend(&self, path: &str) -> Option<&Node> {
        segments(path).try_fold(self, |node, segment| node.child(segment))
    }

    fn descend_mut(&mut self, path: &str) -> Option<&mut Node> {
        segments(path).try_fold(self, |node, segment| node.child_mut(segment))
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('\\').filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TreeFile {
    #[serde(default)]
    primary: Node,
    #[serde(default)]
    compatibility: Node,
}

impl TreeFile {
    fn root(&self, root: StoreRoot) -> &Node {
        match root {
            StoreRoot::Primary => &self.primary,
            StoreRoot::Compatibility => &self.compatibility,
        }
    }

    fn root_mut(&mut self, root: StoreRoot) -> &mut Node {
        match root {
            StoreRoot::Primary => &mut self.primary,
            StoreRoot::Compatibility => &mut self.compatibility,
        }
    }
}

#[derive(Serialize)]
struct ExportedSubtree<'a> {
    key: String,
    node: &'a Node,
}

/// Portable store: the whole tree kept in memory and, when opened from a
/// file, written back as JSON after every mutation.
pub struct TreeStore {
    tree: Mutex<TreeFile>,
    path: Option<PathBuf>,
}

impl TreeStore {
    pub fn in_memory() -> Self {
        Self {
            tree: Mutex::new(TreeFile::default()),
            path: None,
        }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let tree = if path.exists() {
            let content = fs::read_to_string(path)?;
            serde_json::from_str(&content).map_err(|e| {
                StoreError::Backend(format!("invalid store file {}: {}", path.display(), e))
            })?
        } else {
            TreeFile::default()
        };

        Ok(Self {
            tree: Mutex::new(tree),
            path: Some(path.to_path_buf()),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, TreeFile>, StoreError> {
        self.tree
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }

    fn persist(&self, tree: &TreeFile) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(tree)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Creates every missing key along `path` and returns a writable handle.
    pub fn create_subtree(&self, root: StoreRoot, path: &str) -> Result<SubtreeHandle, StoreError> {
        let mut tree = self.lock()?;
        let mut node = tree.root_mut(root);
        for segment in segments(path) {
            let key = node.child_key(segment).unwrap_or_else(|| segment.to_string());
            node = node.children.entry(key).or_default();
        }
        self.persist(&tree)?;

        Ok(SubtreeHandle {
            root,
            path: path.to_string(),
            access: Access::ReadWrite,
        })
    }
}

impl ConfigStore for TreeStore {
    fn open_subtree(
        &self,
        root: StoreRoot,
        path: &str,
        access: Access,
    ) -> Result<SubtreeHandle, StoreError> {
        let tree = self.lock()?;
        if tree.root(root).descend(path).is_none() {
            return Err(StoreError::NotFound(display_path(root, path)));
        }

        Ok(SubtreeHandle {
            root,
            path: path.to_string(),
            access,
        })
    }

    fn enumerate_child_names(&self, handle: &SubtreeHandle) -> Result<Vec<String>, StoreError> {
        let tree = self.lock()?;
        let node = tree
            .root(handle.root)
            .descend(&handle.path)
            .ok_or_else(|| StoreError::NotFound(handle.display_path()))?;
        Ok(node.children.keys().cloned().collect())
    }

    fn read_string_value(&self, handle: &SubtreeHandle, name: &str) -> Option<String> {
        let tree = self.lock().ok()?;
        let node = tree.root(handle.root).descend(&handle.path)?;
        node.values
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
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

        let mut tree = self.lock()?;
        let node = tree
            .root_mut(handle.root)
            .descend_mut(&handle.path)
            .ok_or_else(|| StoreError::NotFound(handle.display_path()))?;

        let key = node
            .values
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| name.to_string());
        node.values.insert(key, value.to_string());

        self.persist(&tree)
    }

    fn export_subtree(
        &self,
        handle: &SubtreeHandle,
        destination: &Path,
    ) -> Result<(), StoreError> {
        let tree = self.lock()?;
        let node = tree
            .root(handle.root)
            .descend(&handle.path)
            .ok_or_else(|| StoreError::NotFound(handle.display_path()))?;

        let exported = ExportedSubtree {
            key: handle.display_path(),
            node,
        };
        let content = serde_json::to_string_pretty(&exported).map_err(|e| StoreError::Export {
            key: handle.display_path(),
            destination: destination.to_path_buf(),
            reason: e.to_string(),
        })?;

        fs::write(destination, content).map_err(|e| StoreError::Export {
            key: handle.display_path(),
            destination: destination.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn delete_subtree(&self, root: StoreRoot, path: &str) -> Result<(), StoreError> {
        let (parent_path, leaf) = match path.rsplit_once('\\') {
            Some((parent, leaf)) => (parent, leaf),
            None => ("", path),
        };
        if leaf.is_empty() {
            return Err(StoreError::Backend(format!(
                "refusing to delete store root {}",
                root
            )));
        }

        let mut tree = self.lock()?;
        let parent = tree
            .root_mut(root)
            .descend_mut(parent_path)
            .ok_or_else(|| StoreError::NotFound(display_path(root, path)))?;
        let key = parent
            .child_key(leaf)
            .ok_or_else(|| StoreError::NotFound(display_path(root, path)))?;
        parent.children.remove(&key);

        self.persist(&tree)
    }

    fn check_write_access(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        if let Err(e) = fs::create_dir_all(dir) {
            return Err(StoreError::AccessDenied(format!("{}: {}", dir.display(), e)));
        }

        let probe = fs::OpenOptions::new().create(true).append(true).open(path);
        match probe {
            Ok(_) => {
                // An empty file from the probe is not a valid tree; seed it.
                if fs::metadata(path).map(|m| m.len() == 0).unwrap_or(false) {
                    let tree = self.lock()?;
                    self.persist(&tree)?;
                }
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Err(
                StoreError::AccessDenied(format!("{}: {}", path.display(), e)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    fn backup_extension(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locations::CONTENT_DIR_VALUE;

    fn seeded() -> TreeStore {
        let store = TreeStore::in_memory();
        let handle = store
            .create_subtree(StoreRoot::Primary, "Factory Strings")
            .unwrap();
        store
            .write_string_value(&handle, CONTENT_DIR_VALUE, "/data/Factory Strings")
            .unwrap();
        store.create_subtree(StoreRoot::Primary, "Kontakt 7").unwrap();
        store
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let store = seeded();
        let err = store
            .open_subtree(StoreRoot::Compatibility, "Factory Strings", Access::Read)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_enumerate_and_read_are_case_insensitive() {
        let store = seeded();
        let root = store
            .open_subtree(StoreRoot::Primary, "", Access::Read)
            .unwrap();
        assert_eq!(
            store.enumerate_child_names(&root).unwrap(),
            vec!["Factory Strings", "Kontakt 7"]
        );

        let unit = store
            .open_subtree(StoreRoot::Primary, "factory strings", Access::Read)
            .unwrap();
        assert_eq!(
            store.read_string_value(&unit, "contentdir").as_deref(),
            Some("/data/Factory Strings")
        );
        assert_eq!(store.read_string_value(&unit, "Missing"), None);
    }

    #[test]
    fn test_write_requires_write_access() {
        let store = seeded();
        let unit = store
            .open_subtree(StoreRoot::Primary, "Factory Strings", Access::Read)
            .unwrap();
        let err = store
            .write_string_value(&unit, CONTENT_DIR_VALUE, "/elsewhere")
            .unwrap_err();
        assert!(matches!(err, StoreError::AccessDenied(_)));
    }

    #[test]
    fn test_delete_subtree_and_root_refusal() {
        let store = seeded();
        store
            .delete_subtree(StoreRoot::Primary, "Factory Strings")
            .unwrap();
        assert!(store
            .open_subtree(StoreRoot::Primary, "Factory Strings", Access::Read)
            .is_err());
        assert!(store
            .delete_subtree(StoreRoot::Primary, "Factory Strings")
            .unwrap_err()
            .is_not_found());
        assert!(store.delete_subtree(StoreRoot::Primary, "").is_err());
    }

    #[test]
    fn test_file_store_persists_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        {
            let store = TreeStore::open(&path).unwrap();
            store.check_write_access().unwrap();
            let handle = store
                .create_subtree(StoreRoot::Compatibility, "Session Horns")
                .unwrap();
            store
                .write_string_value(&handle, CONTENT_DIR_VALUE, "/data/Session Horns")
                .unwrap();
        }

        let reopened = TreeStore::open(&path).unwrap();
        let handle = reopened
            .open_subtree(StoreRoot::Compatibility, "Session Horns", Access::Read)
            .unwrap();
        assert_eq!(
            reopened.read_string_value(&handle, CONTENT_DIR_VALUE).as_deref(),
            Some("/data/Session Horns")
        );

        let backup = dir.path().join("Session Horns.json");
        reopened.export_subtree(&handle, &backup).unwrap();
        let exported = fs::read_to_string(&backup).unwrap();
        assert!(exported.contains(r#""key": "Compatibility\\Session Horns""#));
        assert!(exported.contains("/data/Session Horns"));
    }

    #[test]
    fn test_export_into_missing_directory_fails() {
        let store = seeded();
        let handle = store
            .open_subtree(StoreRoot::Primary, "Factory Strings", Access::Read)
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = store
            .export_subtree(&handle, &dir.path().join("nope/backup.json"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Export { .. }));
    }
}
