use std::path::{Path, PathBuf};

use crate::config::Config;

pub const CATALOG_FILE_NAME: &str = "NativeAccess.xml";
pub const CONTENT_DIR_VALUE: &str = "ContentDir";

/// The fixed set of host locations a removal touches.
#[derive(Debug, Clone)]
pub struct Locations {
    pub descriptor_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub database_file: PathBuf,
    pub token_dir: PathBuf,
    pub backup_dir: PathBuf,
    /// Backing file for the portable tree store on hosts without a registry.
    pub store_file: PathBuf,
}

impl Locations {
    #[cfg(windows)]
    pub fn system() -> Self {
        let local = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(r"C:\"));
        let common_files = std::env::var_os("CommonProgramFiles")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Program Files\Common Files"));
        let public = std::env::var_os("PUBLIC")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Users\Public"));

        Self {
            descriptor_dir: common_files.join(r"Native Instruments\Service Center"),
            cache_dir: local.join(r"Native Instruments\Kontakt\LibrariesCache"),
            database_file: local.join(r"Native Instruments\Kontakt\komplete.db3"),
            token_dir: public.join(r"Documents\Native Instruments\Native Access\ras3"),
            backup_dir: Config::data_dir().join("backups"),
            store_file: Config::data_dir().join("store.json"),
        }
    }

    #[cfg(not(windows))]
    pub fn system() -> Self {
        let support = PathBuf::from("/Library/Application Support/Native Instruments");
        let user_support = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Native Instruments");

        Self {
            descriptor_dir: support.join("Service Center"),
            cache_dir: user_support.join("Kontakt/LibrariesCache"),
            database_file: user_support.join("Kontakt/komplete.db3"),
            token_dir: PathBuf::from("/Users/Shared/Native Instruments/Native Access/ras3"),
            backup_dir: Config::data_dir().join("backups"),
            store_file: Config::data_dir().join("store.json"),
        }
    }

    /// Lays every location out under one directory.
    pub fn rooted_at(base: &Path) -> Self {
        Self {
            descriptor_dir: base.join("Service Center"),
            cache_dir: base.join("LibrariesCache"),
            database_file: base.join("komplete.db3"),
            token_dir: base.join("ras3"),
            backup_dir: base.join("backups"),
            store_file: base.join("store.json"),
        }
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.descriptor_dir.join(CATALOG_FILE_NAME)
    }

    /// `None` when the name would escape `descriptor_dir`.
    pub fn descriptor_file(&self, unit_name: &str) -> Option<PathBuf> {
        descriptor_path(&self.descriptor_dir, unit_name)
    }

    pub fn database_backup_file(&self) -> PathBuf {
        let mut name = self
            .database_file
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".bak");
        self.database_file.with_file_name(name)
    }
}

/// Joins `<unit_name>.xml` onto `dir`. Store key names may contain `/`, so
/// anything that is not a single plain file name is refused.
pub fn descriptor_path(dir: &Path, unit_name: &str) -> Option<PathBuf> {
    if unit_name.is_empty()
        || unit_name == "."
        || unit_name == ".."
        || unit_name.contains(['/', '\\'])
    {
        return None;
    }
    let path = dir.join(format!("{}.xml", unit_name));
    (path.parent() == Some(dir)).then_some(path)
}
