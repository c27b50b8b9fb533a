//! Image depot lookup.
//!
//! The depot is a directory tree of `<vendor>/<version>/` holding
//! bootable qcow2 images. The core only needs one operation from it:
//! resolve an image reference like `cumulus-3.7.6` to an on-disk path.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::BuildError;

#[derive(Debug)]
pub struct ImageDepot {
    root: PathBuf,
    /// Vendor directory name to available version directory names.
    vm_types: IndexMap<String, Vec<String>>,
}

impl ImageDepot {
    /// Open a depot directory and index the vendors that actually hold
    /// files. Vendor directories with nothing below them are skipped.
    pub fn open(path: &Path) -> Result<Self, BuildError> {
        if !path.exists() {
            return Err(BuildError::Config(format!(
                "image depot {} was not found",
                path.display()
            )));
        }
        let root = path.canonicalize()?;

        let mut vm_types = IndexMap::new();
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let vendor_dir = entry.path();
            if !dir_holds_files(&vendor_dir)? {
                continue;
            }
            let mut versions = Vec::new();
            for version in fs::read_dir(&vendor_dir)? {
                let version = version?;
                if version.file_type()?.is_dir() {
                    versions.push(version.file_name().to_string_lossy().into_owned());
                }
            }
            versions.sort();
            let vendor = entry.file_name().to_string_lossy().into_owned();
            tracing::debug!(vendor = %vendor, versions = versions.len(), "indexed depot vendor");
            vm_types.insert(vendor, versions);
        }

        Ok(Self { root, vm_types })
    }

    /// Resolve an image reference (`<vendor>-<version>`) to the first
    /// qcow2 file under the matching depot subdirectory.
    pub fn resolve_image(&self, image: &str) -> Result<PathBuf, BuildError> {
        let Some((vendor, version)) = image.split_once('-') else {
            return Err(BuildError::UnknownVmType(image.to_string()));
        };
        if !self.vm_types.contains_key(vendor) {
            return Err(BuildError::UnknownVmType(image.to_string()));
        }
        let search_root = self.root.join(vendor).join(version);
        find_qcow2(&search_root)?.ok_or_else(|| BuildError::ImageNotFound(image.to_string()))
    }

    /// Vendors with at least one image available.
    pub fn vendors(&self) -> impl Iterator<Item = &str> {
        self.vm_types.keys().map(String::as_str)
    }

    pub fn versions(&self, vendor: &str) -> &[String] {
        self.vm_types
            .get(vendor)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// True if any regular file exists anywhere below `dir`.
fn dir_holds_files(dir: &Path) -> Result<bool, BuildError> {
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in fs::read_dir(&current)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_file() {
                return Ok(true);
            }
            if file_type.is_dir() {
                stack.push(entry.path());
            }
        }
    }
    Ok(false)
}

/// First `.qcow2` file found below `root`, walking breadth-first with an
/// explicit stack.
fn find_qcow2(root: &Path) -> Result<Option<PathBuf>, BuildError> {
    if !root.is_dir() {
        return Ok(None);
    }
    let mut stack = vec![root.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries: Vec<_> = fs::read_dir(&current)?.collect::<Result<_, _>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let file_type = entry.file_type()?;
            let path = entry.path();
            if file_type.is_file() && path.extension().is_some_and(|ext| ext == "qcow2") {
                return Ok(Some(path));
            }
            if file_type.is_dir() {
                stack.push(path);
            }
        }
    }
    Ok(None)
}
