use byte_unit::{Byte, UnitType};
use std::path::Path;
use walkdir::WalkDir;

pub fn format_size(size: u64) -> String {
    let adjusted = Byte::from_u64(size).get_appropriate_unit(UnitType::Binary);
    format!("{:.1}", adjusted)
}

pub fn calculate_dir_size(path: &Path) -> u64 {
    if !path.exists() {
        return 0;
    }

    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}

/// Turns a unit name into something safe to use as a file stem.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Factory Strings"), "Factory Strings");
        assert_eq!(sanitize_file_name("Drums: Vol/2?"), "Drums_ Vol_2_");
        assert_eq!(sanitize_file_name(" ... "), "unnamed");
    }

    #[test]
    fn test_calculate_dir_size() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a"), vec![0u8; 10]).unwrap();
        fs::write(dir.path().join("sub/b"), vec![0u8; 5]).unwrap();
        assert_eq!(calculate_dir_size(dir.path()), 15);
        assert_eq!(calculate_dir_size(&dir.path().join("missing")), 0);
    }

    #[test]
    fn test_format_size_uses_binary_units() {
        assert!(format_size(2048).contains("KiB"));
    }
}
