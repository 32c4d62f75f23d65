//! Shared fixtures for unit tests: a fake host laid out in a temp dir and
//! store/file-op wrappers that observe or interfere with a removal.

use crate::error::StoreError;
use crate::fileops::{FileOps, FsFileOps};
use crate::history::HistoryLogger;
use crate::inventory::{InventorySnapshot, RemovableUnit};
use crate::locations::{Locations, CONTENT_DIR_VALUE};
use crate::pipeline::{CancellationToken, RemovalContext};
use crate::store::{Access, ConfigStore, StoreRoot, SubtreeHandle, TreeStore};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

fn product_xml(name: &str, snpid: &str) -> String {
    format!(
        "  <Product version=\"1\">\n    <Name>{}</Name>\n    <SNPID>{}</SNPID>\n  </Product>\n",
        name, snpid
    )
}

pub fn write_descriptor(locations: &Locations, name: &str, snpid: &str) {
    fs::create_dir_all(&locations.descriptor_dir).unwrap();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ProductHints>\n{}</ProductHints>\n",
        product_xml(name, snpid)
    );
    fs::write(locations.descriptor_file(name).unwrap(), xml).unwrap();
}

pub fn write_catalog(locations: &Locations, products: &[(&str, &str)]) {
    fs::create_dir_all(&locations.descriptor_dir).unwrap();
    let body: String = products
        .iter()
        .map(|(name, snpid)| product_xml(name, snpid))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<ProductHints>\n{}</ProductHints>\n",
        body
    );
    fs::write(locations.catalog_file(), xml).unwrap();
}

/// Two installed libraries sharing one host: "Factory Strings" (SNP42) and
/// "Session Horns" (SNP99).
pub struct Fixture {
    pub dir: TempDir,
    pub locations: Locations,
    pub store: Arc<TreeStore>,
    pub history: Arc<HistoryLogger>,
    pub units: Vec<RemovableUnit>,
    pub unit: RemovableUnit,
}

impl Fixture {
    pub fn factory_strings() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let locations = Locations::rooted_at(dir.path());
        let store = Arc::new(TreeStore::in_memory());
        let mut units = Vec::new();

        for (name, snpid) in [("Factory Strings", "SNP42"), ("Session Horns", "SNP99")] {
            let content_dir = dir.path().join("Libraries").join(name);
            fs::create_dir_all(content_dir.join("Instruments")).unwrap();
            fs::write(content_dir.join("Instruments/Violins.nki"), "nki").unwrap();

            let handle = store.create_subtree(StoreRoot::Primary, name).unwrap();
            store
                .write_string_value(&handle, CONTENT_DIR_VALUE, &content_dir.to_string_lossy())
                .unwrap();

            write_descriptor(&locations, name, snpid);
            units.push(RemovableUnit::new(name, content_dir, StoreRoot::Primary, name));
        }
        write_catalog(&locations, &[("Factory Strings", "SNP42"), ("Session Horns", "SNP99")]);

        fs::create_dir_all(&locations.cache_dir).unwrap();
        for name in ["K SNP42 a.cache", "K SNP42 b.cache", "K SNP99 c.cache"] {
            fs::write(locations.cache_dir.join(name), "cache").unwrap();
        }
        fs::create_dir_all(&locations.token_dir).unwrap();
        for name in ["SNP42.xml", "SNP99.xml"] {
            fs::write(locations.token_dir.join(name), "token").unwrap();
        }
        fs::write(&locations.database_file, "db").unwrap();

        let unit = units[0].clone();
        Self {
            dir,
            locations,
            store,
            history: Arc::new(HistoryLogger::in_memory()),
            units,
            unit,
        }
    }

    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot::from_units(&self.units)
    }

    pub fn context(&self, store: Arc<dyn ConfigStore>) -> RemovalContext {
        RemovalContext::new(store, self.locations.clone(), Arc::clone(&self.history))
    }

    pub fn cache(&self, name: &str) -> PathBuf {
        self.locations.cache_dir.join(name)
    }

    pub fn token(&self, name: &str) -> PathBuf {
        self.locations.token_dir.join(name)
    }

    pub fn actions(&self) -> Vec<String> {
        self.history
            .session_entries()
            .into_iter()
            .map(|e| e.action)
            .collect()
    }
}

/// Passes every call through and remembers whether `watch` existed at the
/// moment the registry entry was deleted.
pub struct ObservingStore {
    inner: Arc<dyn ConfigStore>,
    watch: PathBuf,
    seen_at_delete: Mutex<Option<bool>>,
}

impl ObservingStore {
    pub fn new(inner: Arc<dyn ConfigStore>, watch: PathBuf) -> Self {
        Self {
            inner,
            watch,
            seen_at_delete: Mutex::new(None),
        }
    }

    pub fn backup_seen_at_delete(&self) -> Option<bool> {
        *self.seen_at_delete.lock().unwrap()
    }
}

/// Blocks `delete_subtree` until the test sends on the paired channel.
pub struct GatedStore {
    inner: Arc<dyn ConfigStore>,
    gate: Mutex<Receiver<()>>,
}

impl GatedStore {
    pub fn new(inner: Arc<dyn ConfigStore>, gate: Receiver<()>) -> Self {
        Self {
            inner,
            gate: Mutex::new(gate),
        }
    }
}

macro_rules! delegate_store {
    ($ty:ty, |$this:ident, $root:ident, $path:ident| $delete:block) => {
        impl ConfigStore for $ty {
            fn open_subtree(
                &self,
                root: StoreRoot,
                path: &str,
                access: Access,
            ) -> Result<SubtreeHandle, StoreError> {
                self.inner.open_subtree(root, path, access)
            }

            fn enumerate_child_names(
                &self,
                handle: &SubtreeHandle,
            ) -> Result<Vec<String>, StoreError> {
                self.inner.enumerate_child_names(handle)
            }

            fn read_string_value(&self, handle: &SubtreeHandle, name: &str) -> Option<String> {
                self.inner.read_string_value(handle, name)
            }

            fn write_string_value(
                &self,
                handle: &SubtreeHandle,
                name: &str,
                value: &str,
            ) -> Result<(), StoreError> {
                self.inner.write_string_value(handle, name, value)
            }

            fn export_subtree(
                &self,
                handle: &SubtreeHandle,
                destination: &Path,
            ) -> Result<(), StoreError> {
                self.inner.export_subtree(handle, destination)
            }

            fn delete_subtree(&self, $root: StoreRoot, $path: &str) -> Result<(), StoreError> {
                let $this = self;
                $delete
            }

            fn check_write_access(&self) -> Result<(), StoreError> {
                self.inner.check_write_access()
            }

            fn backup_extension(&self) -> &'static str {
                self.inner.backup_extension()
            }
        }
    };
}

delegate_store!(ObservingStore, |this, root, path| {
    *this.seen_at_delete.lock().unwrap() = Some(this.watch.exists());
    this.inner.delete_subtree(root, path)
});

delegate_store!(GatedStore, |this, root, path| {
    let _ = this
        .gate
        .lock()
        .unwrap()
        .recv_timeout(Duration::from_secs(10));
    this.inner.delete_subtree(root, path)
});

/// Real file operations that set the token right after `trigger` is deleted.
pub struct CancelAfterDelete {
    inner: FsFileOps,
    trigger: PathBuf,
    token: CancellationToken,
}

impl CancelAfterDelete {
    pub fn new(history: Arc<HistoryLogger>, trigger: PathBuf, token: CancellationToken) -> Self {
        Self {
            inner: FsFileOps::new(history),
            trigger,
            token,
        }
    }
}

impl FileOps for CancelAfterDelete {
    fn delete_item(&self, path: &Path) -> bool {
        let ok = self.inner.delete_item(path);
        if path == self.trigger {
            self.token.cancel();
        }
        ok
    }

    fn move_item(&self, src: &Path, dst: &Path) -> bool {
        self.inner.move_item(src, dst)
    }

    fn copy_item(&self, src: &Path, dst: &Path) -> bool {
        self.inner.copy_item(src, dst)
    }
}
