use crate::error::StoreError;
use crate::locations::CONTENT_DIR_VALUE;
use crate::store::{Access, ConfigStore, StoreRoot};
use crate::utils::calculate_dir_size;
use glob::Pattern;
use rayon::prelude::*;
use std::cell::Cell;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};

/// Products that live next to libraries in the store but are never
/// standalone libraries.
const EXCLUDED_NAMES: &[&str] = &[
    "Kontakt",
    "Kontakt 5",
    "Kontakt 6",
    "Kontakt 7",
    "Kontakt 8",
    "Kontakt Player",
    "Native Access",
    "Native Access 2",
    "NTKDaemon",
    "Service Center",
    "Controller Editor",
    "Battery 4",
    "Massive",
    "Massive X",
    "FM8",
    "Absynth 5",
    "Kinetic Metal",
    "Monark",
    "Razor",
    "Supercharger",
    "Replika",
    "Raum",
];

const EXCLUDED_PATTERNS: &[&str] = &[
    "Komplete*",
    "Maschine*",
    "Traktor*",
    "Reaktor*",
    "Guitar Rig*",
    "*Kontrol*",
    "*Effects Series*",
];

pub struct RemovableUnit {
    pub name: String,
    pub content_dir: PathBuf,
    pub root: StoreRoot,
    pub sub_key: String,
    cached_size: Cell<Option<u64>>,
}

impl Clone for RemovableUnit {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            content_dir: self.content_dir.clone(),
            root: self.root,
            sub_key: self.sub_key.clone(),
            cached_size: Cell::new(self.cached_size.get()),
        }
    }
}

impl std::fmt::Debug for RemovableUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemovableUnit")
            .field("name", &self.name)
            .field("content_dir", &self.content_dir)
            .field("root", &self.root)
            .field("sub_key", &self.sub_key)
            .finish()
    }
}

impl RemovableUnit {
    pub fn new(
        name: impl Into<String>,
        content_dir: impl Into<PathBuf>,
        root: StoreRoot,
        sub_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content_dir: content_dir.into(),
            root,
            sub_key: sub_key.into(),
            cached_size: Cell::new(None),
        }
    }

    pub fn has_content_dir(&self) -> bool {
        !self.content_dir.as_os_str().is_empty()
    }

    /// Size of the content directory; walked once, then cached.
    pub fn size_on_disk(&self) -> u64 {
        if let Some(size) = self.cached_size.get() {
            return size;
        }
        let size = if self.has_content_dir() {
            calculate_dir_size(&self.content_dir)
        } else {
            0
        };
        self.cached_size.set(Some(size));
        size
    }

    pub fn set_size_on_disk(&self, size: u64) {
        self.cached_size.set(Some(size));
    }

    pub fn known_size(&self) -> Option<u64> {
        self.cached_size.get()
    }
}

/// Names present in the last inventory scan.
#[derive(Debug, Clone, Default)]
pub struct InventorySnapshot {
    names: HashSet<String>,
}

impl InventorySnapshot {
    pub fn from_units(units: &[RemovableUnit]) -> Self {
        Self {
            names: units.iter().map(|u| u.name.clone()).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }
}

pub struct InventoryScanner {
    excluded_patterns: Vec<Pattern>,
}

impl InventoryScanner {
    pub fn new() -> Self {
        let excluded_patterns = EXCLUDED_PATTERNS
            .iter()
            .filter_map(|p| Pattern::new(&p.to_lowercase()).ok())
            .collect();
        Self { excluded_patterns }
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        if EXCLUDED_NAMES.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            return true;
        }
        let lower = name.to_lowercase();
        self.excluded_patterns.iter().any(|p| p.matches(&lower))
    }

    /// Enumerates both roots. A root that does not exist contributes nothing;
    /// a name seen in the primary root shadows the same name in the
    /// compatibility root.
    pub fn scan(&self, store: &dyn ConfigStore) -> Result<Vec<RemovableUnit>, StoreError> {
        let mut units: Vec<RemovableUnit> = Vec::new();
        let mut seen = HashSet::new();

        for root in StoreRoot::ALL {
            let handle = match store.open_subtree(root, "", Access::Read) {
                Ok(handle) => handle,
                Err(e) if e.is_not_found() => {
                    log::debug!("store root {} not present", root);
                    continue;
                }
                Err(e) => return Err(e),
            };

            for name in store.enumerate_child_names(&handle)? {
                if self.is_excluded(&name) {
                    log::debug!("skipping non-library entry {}", name);
                    continue;
                }
                if !seen.insert(name.to_lowercase()) {
                    continue;
                }

                let content_dir = store
                    .open_subtree(root, &name, Access::Read)
                    .ok()
                    .and_then(|h| store.read_string_value(&h, CONTENT_DIR_VALUE))
                    .map(PathBuf::from)
                    .unwrap_or_default();

                units.push(RemovableUnit::new(name.clone(), content_dir, root, name));
            }
        }

        units.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        log::info!("inventory: {} removable libraries", units.len());
        Ok(units)
    }

    pub fn find<'a>(units: &'a [RemovableUnit], name: &str) -> Option<&'a RemovableUnit> {
        units
            .iter()
            .find(|u| u.name == name)
            .or_else(|| units.iter().find(|u| u.name.eq_ignore_ascii_case(name)))
    }
}

fn content_dirs(units: &[RemovableUnit]) -> Vec<(usize, PathBuf)> {
    units
        .iter()
        .enumerate()
        .filter(|(_, u)| u.has_content_dir())
        .map(|(i, u)| (i, u.content_dir.clone()))
        .collect()
}

/// Walks every content directory in parallel and caches the sizes on the
/// units. Units without a content directory report zero.
pub fn compute_sizes(units: &[RemovableUnit]) {
    let sizes: Vec<(usize, u64)> = content_dirs(units)
        .par_iter()
        .map(|(i, dir)| (*i, calculate_dir_size(dir)))
        .collect();
    for unit in units {
        unit.set_size_on_disk(0);
    }
    for (i, size) in sizes {
        units[i].set_size_on_disk(size);
    }
}

/// Same walk on the rayon pool without blocking; results arrive as
/// `(unit index, bytes)`.
pub fn spawn_size_scan(units: &[RemovableUnit]) -> Receiver<(usize, u64)> {
    let dirs = content_dirs(units);
    let (tx, rx) = channel();
    rayon::spawn(move || {
        dirs.par_iter().for_each_with(tx, |tx, (i, dir)| {
            let _ = tx.send((*i, calculate_dir_size(dir)));
        });
    });
    rx
}

impl Default for InventoryScanner {
    fn default() -> Self {
        Self::new()
    }
}
