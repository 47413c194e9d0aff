//! Per-subset item indexing.
//!
//! Indexing binds item ids to unresolved image paths without reading
//! annotation files or pixels. Paths in the produced maps are localized and
//! relative to the dataset root; duplicate ids keep the last occurrence.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use walkdir::WalkDir;

use super::manifest::{localize_path, name_from_path, Manifest};
use super::{Flavor, IMAGE_EXTENSIONS, SUBSET_LIST_EXT};
use crate::error::ImportError;
use crate::meta::{RegistryEntry, LABELS_REGISTRY_FILE};

/// Indexes one subset of a manifest-driven flavor.
pub(crate) fn index_subset(
    root: &Path,
    manifest: &Manifest,
    flavor: Flavor,
    subset: &str,
) -> Result<IndexMap<String, String>, ImportError> {
    let skip = flavor.id_skip_segments();

    match manifest {
        Manifest::Flat(_) => {
            let value = manifest
                .get_str(subset)
                .expect("subset names come from manifest keys");
            index_from_list_file(root, subset, value, skip)
        }
        Manifest::Yaml(mapping) => {
            let value = mapping
                .get(subset)
                .expect("subset names come from manifest keys");
            index_yaml_subset(root, subset, value, skip)
        }
    }
}

fn index_yaml_subset(
    root: &Path,
    subset: &str,
    value: &serde_yaml::Value,
    skip: usize,
) -> Result<IndexMap<String, String>, ImportError> {
    match value {
        serde_yaml::Value::String(source) => {
            if source.ends_with(SUBSET_LIST_EXT) {
                index_from_list_file(root, subset, source, skip)
            } else {
                index_from_folder(root, subset, source, skip)
            }
        }
        serde_yaml::Value::Sequence(paths) => {
            let mut index = IndexMap::new();
            for entry in paths {
                let path = entry
                    .as_str()
                    .ok_or_else(|| ImportError::ManifestInvalid {
                        path: root.to_path_buf(),
                        message: format!(
                            "subset '{subset}' path sequence contains a non-string entry"
                        ),
                    })?;
                index.insert(name_from_path(path, skip), localize_path(path));
            }
            Ok(index)
        }
        _ => Err(ImportError::ManifestInvalid {
            path: root.to_path_buf(),
            message: format!(
                "subset '{subset}' must be a list file, a folder, or a sequence of paths"
            ),
        }),
    }
}

/// Reads a subset list file: one image path per non-blank line.
fn index_from_list_file(
    root: &Path,
    subset: &str,
    value: &str,
    skip: usize,
) -> Result<IndexMap<String, String>, ImportError> {
    let list_path = root.join(localize_path(value));
    if !list_path.is_file() {
        return Err(ImportError::SubsetListMissing {
            subset: subset.to_string(),
            path: list_path,
        });
    }

    let data = fs::read_to_string(&list_path)?;
    let mut index = IndexMap::new();
    for line in data.lines() {
        if line.trim().is_empty() {
            continue;
        }
        index.insert(name_from_path(line, skip), localize_path(line));
    }
    Ok(index)
}

/// Walks a subset image folder recursively for regular files, in sorted
/// root-relative order.
fn index_from_folder(
    root: &Path,
    subset: &str,
    value: &str,
    skip: usize,
) -> Result<IndexMap<String, String>, ImportError> {
    let folder = root.join(localize_path(value));
    if !folder.is_dir() {
        return Err(ImportError::SubsetFolderMissing {
            subset: subset.to_string(),
            path: folder,
        });
    }

    let mut rel_paths = Vec::new();
    for entry in WalkDir::new(&folder).follow_links(true) {
        let entry = entry.map_err(|source| ImportError::Walk {
            path: folder.clone(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        rel_paths.push(rel_string(root, entry.path()));
    }
    rel_paths.sort();

    let mut index = IndexMap::new();
    for rel in rel_paths {
        index.insert(name_from_path(&rel, skip), localize_path(&rel));
    }
    Ok(index)
}

/// Classification subset names: the directories directly under the dataset
/// root, sorted.
pub(crate) fn classification_subset_names(root: &Path) -> Result<Vec<String>, ImportError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Indexes one classification subset, either from its `labels.json` registry
/// or by walking its label directories.
pub(crate) fn index_classification_subset(
    root: &Path,
    subset: &str,
    registry: Option<&IndexMap<String, RegistryEntry>>,
) -> Result<IndexMap<String, String>, ImportError> {
    if let Some(registry) = registry {
        return Ok(registry
            .iter()
            .map(|(id, entry)| (id.clone(), format!("{subset}/{}", entry.path)))
            .collect());
    }

    let subset_dir = root.join(subset);
    let mut label_dirs = Vec::new();
    for entry in fs::read_dir(&subset_dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            label_dirs.push(entry.path());
        }
    }
    label_dirs.sort();

    let mut index = IndexMap::new();
    for label_dir in label_dirs {
        let mut rel_paths = Vec::new();

        // A per-label list file enumerates image paths ahead of the walk.
        let list_path = label_dir.join(LABELS_REGISTRY_FILE);
        if list_path.is_file() {
            let dir_rel = rel_string(root, &label_dir);
            let data = fs::read_to_string(&list_path)?;
            rel_paths.extend(
                data.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| format!("{dir_rel}/{line}")),
            );
        }

        let mut walked = Vec::new();
        for entry in WalkDir::new(&label_dir).follow_links(true) {
            let entry = entry.map_err(|source| ImportError::Walk {
                path: label_dir.clone(),
                source,
            })?;
            if !entry.file_type().is_file() || !has_image_extension(entry.path()) {
                continue;
            }
            walked.push(rel_string(root, entry.path()));
        }
        walked.sort();
        rel_paths.extend(walked);

        for rel in rel_paths {
            // Ids keep the label directory: only the subset segment drops.
            index.insert(name_from_path(&rel, 1), rel);
        }
    }
    Ok(index)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
