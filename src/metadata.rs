use crate::error::SweepError;
use crate::locations::{descriptor_path, Locations};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use xmltree::{Element, XMLNode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInfo {
    pub product_id: String,
    pub name: String,
    /// Per-unit descriptor the id came from; `None` when it came from the
    /// shared catalog, which must never be deleted.
    pub descriptor: Option<PathBuf>,
}

#[derive(Debug, Clone)]
struct ProductEntry {
    name: String,
    product_id: String,
}

pub struct MetadataResolver {
    descriptor_dir: PathBuf,
    catalog_file: PathBuf,
}

impl MetadataResolver {
    pub fn new(locations: &Locations) -> Self {
        Self {
            descriptor_dir: locations.descriptor_dir.clone(),
            catalog_file: locations.catalog_file(),
        }
    }

    pub fn resolve(&self, unit_name: &str) -> Result<ProductInfo, SweepError> {
        let descriptor = descriptor_path(&self.descriptor_dir, unit_name)
            .filter(|d| d.is_file() && !self.is_catalog(d));

        if let Some(descriptor) = descriptor {
            let entries = read_entries(&descriptor);
            let matched = find_by_name(&entries, unit_name).or(match entries.as_slice() {
                [only] => Some(only),
                _ => None,
            });
            if let Some(entry) = matched {
                log::debug!(
                    "[{}] product id {} from {}",
                    unit_name,
                    entry.product_id,
                    descriptor.display()
                );
                return Ok(ProductInfo {
                    product_id: entry.product_id.clone(),
                    name: entry.name.clone(),
                    descriptor: Some(descriptor),
                });
            }
        }

        if self.catalog_file.is_file() {
            let entries = read_entries(&self.catalog_file);
            if let Some(entry) = find_by_name(&entries, unit_name) {
                log::debug!(
                    "[{}] product id {} from catalog",
                    unit_name,
                    entry.product_id
                );
                return Ok(ProductInfo {
                    product_id: entry.product_id.clone(),
                    name: entry.name.clone(),
                    descriptor: None,
                });
            }
        }

        Err(SweepError::NotFound(format!(
            "no descriptor or catalog entry for {}",
            unit_name
        )))
    }

    pub fn is_catalog(&self, path: &Path) -> bool {
        path == self.catalog_file
            || path
                .file_name()
                .zip(self.catalog_file.file_name())
                .map(|(a, b)| a.to_string_lossy().eq_ignore_ascii_case(&b.to_string_lossy()))
                .unwrap_or(false)
                && path.parent() == self.catalog_file.parent()
    }
}

fn find_by_name<'a>(entries: &'a [ProductEntry], name: &str) -> Option<&'a ProductEntry> {
    entries.iter().find(|e| e.name.eq_ignore_ascii_case(name))
}

fn read_entries(path: &Path) -> Vec<ProductEntry> {
    let parsed = File::open(path)
        .map_err(|e| e.to_string())
        .and_then(|f| Element::parse(BufReader::new(f)).map_err(|e| e.to_string()));

    match parsed {
        Ok(root) => {
            let mut entries = Vec::new();
            collect_products(&root, &mut entries);
            entries
        }
        Err(e) => {
            log::warn!("unreadable descriptor {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

fn collect_products(element: &Element, entries: &mut Vec<ProductEntry>) {
    if element.name == "Product" {
        let name = child_text(element, "Name");
        let product_id = child_text(element, "SNPID").or_else(|| {
            element
                .get_child("ProductSpecific")
                .and_then(|ps| child_text(ps, "SNPID"))
        });
        if let (Some(name), Some(product_id)) = (name, product_id) {
            entries.push(ProductEntry { name, product_id });
        }
        return;
    }

    for child in element.children.iter().filter_map(XMLNode::as_element) {
        collect_products(child, entries);
    }
}

fn child_text(element: &Element, name: &str) -> Option<String> {
    element
        .get_child(name)
        .and_then(|c| c.get_text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
