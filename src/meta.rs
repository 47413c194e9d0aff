//! Side-car metadata files.
//!
//! Three optional files ride alongside a dataset:
//!
//! - `dataset_meta.json` — overrides the derived label vocabulary (and, for
//!   pose datasets, the point categories).
//! - `images.meta` — an image size index mapping item id to `height width`,
//!   letting the extractor skip image probing entirely.
//! - `labels.json` — the classification per-item registry, a JSON object
//!   keyed by item id with `{"path": .., "labels": [..]}` entries.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ImportError;

pub const DATASET_META_FILE: &str = "dataset_meta.json";
pub const IMAGE_META_FILE: &str = "images.meta";
pub const LABELS_REGISTRY_FILE: &str = "labels.json";

/// Categories read from a `dataset_meta.json` side-car.
#[derive(Clone, Debug, Default)]
pub struct DatasetMeta {
    /// `(name, parent)` pairs in canonical id order.
    pub labels: Vec<(String, Option<String>)>,
    /// `(skeleton label id, point sub-label names)` entries.
    pub point_categories: Vec<(usize, Vec<String>)>,
}

#[derive(Debug, Deserialize)]
struct MetaFile {
    #[serde(default)]
    label_map: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    label_categories: Option<Vec<LabelEntry>>,
    #[serde(default)]
    point_categories: Option<Vec<PointEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LabelEntry {
    Name(String),
    WithParent(String, String),
}

// Accepts both `[id, [subs]]` and `[id, [subs], joints]` entries.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PointEntry {
    Pair(usize, Vec<String>),
    Triple(usize, Vec<String>, serde_json::Value),
}

impl PointEntry {
    fn into_pair(self) -> (usize, Vec<String>) {
        match self {
            PointEntry::Pair(id, subs) | PointEntry::Triple(id, subs, _) => (id, subs),
        }
    }
}

/// True when `dir` carries a `dataset_meta.json`.
pub fn has_dataset_meta(dir: &Path) -> bool {
    dir.join(DATASET_META_FILE).is_file()
}

/// Parses the `dataset_meta.json` in `dir`.
///
/// Labels come from `label_categories` when present (names or
/// `[name, parent]` pairs in file order), else from `label_map` with ids
/// ordered by the numeric key.
pub fn parse_dataset_meta(dir: &Path) -> Result<DatasetMeta, ImportError> {
    let path = dir.join(DATASET_META_FILE);
    let data = fs::read_to_string(&path)?;
    let parsed: MetaFile =
        serde_json::from_str(&data).map_err(|source| ImportError::MetaParse {
            path: path.clone(),
            source,
        })?;

    let labels = if let Some(entries) = parsed.label_categories {
        entries
            .into_iter()
            .map(|entry| match entry {
                LabelEntry::Name(name) => (name, None),
                LabelEntry::WithParent(name, parent) => (name, Some(parent)),
            })
            .collect()
    } else if let Some(label_map) = parsed.label_map {
        let mut by_id: Vec<(i64, String)> = Vec::with_capacity(label_map.len());
        for (key, value) in label_map {
            let id: i64 = key.parse().map_err(|_| ImportError::MetaInvalid {
                path: path.clone(),
                message: format!("label_map key '{key}' is not an integer"),
            })?;
            let name = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            by_id.push((id, name));
        }
        by_id.sort_by_key(|(id, _)| *id);
        by_id.into_iter().map(|(_, name)| (name, None)).collect()
    } else {
        return Err(ImportError::MetaInvalid {
            path,
            message: "expected a label_map or label_categories entry".to_string(),
        });
    };

    Ok(DatasetMeta {
        labels,
        point_categories: parsed
            .point_categories
            .unwrap_or_default()
            .into_iter()
            .map(PointEntry::into_pair)
            .collect(),
    })
}

/// Parses an `images.meta` size index: one `<item id> <height> <width>` line
/// per item, blank lines ignored. Ids may contain interior whitespace; the
/// two rightmost tokens are the dimensions.
pub fn parse_image_size_index(path: &Path) -> Result<BTreeMap<String, (u32, u32)>, ImportError> {
    let data = fs::read_to_string(path)?;
    let mut index = BTreeMap::new();

    for (line_idx, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let line_num = line_idx + 1;

        let (rest, width_token) =
            trimmed
                .rsplit_once(char::is_whitespace)
                .ok_or_else(|| ImportError::SizeIndexInvalid {
                    path: path.to_path_buf(),
                    line: line_num,
                    message: "expected '<id> <height> <width>'".to_string(),
                })?;
        let (id, height_token) = rest.trim_end().rsplit_once(char::is_whitespace).ok_or_else(
            || ImportError::SizeIndexInvalid {
                path: path.to_path_buf(),
                line: line_num,
                message: "expected '<id> <height> <width>'".to_string(),
            },
        )?;

        let height: u32 =
            height_token
                .parse()
                .map_err(|_| ImportError::SizeIndexInvalid {
                    path: path.to_path_buf(),
                    line: line_num,
                    message: format!("invalid height '{height_token}'"),
                })?;
        let width: u32 = width_token
            .parse()
            .map_err(|_| ImportError::SizeIndexInvalid {
                path: path.to_path_buf(),
                line: line_num,
                message: format!("invalid width '{width_token}'"),
            })?;

        index.insert(id.trim_end().to_string(), (height, width));
    }

    Ok(index)
}

/// One entry of the classification `labels.json` registry.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct RegistryEntry {
    pub path: String,
    pub labels: Vec<String>,
}

/// Parses a classification `labels.json` registry, preserving key order.
pub fn parse_label_registry(path: &Path) -> Result<IndexMap<String, RegistryEntry>, ImportError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|source| ImportError::RegistryParse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn dataset_meta_label_map_orders_by_numeric_key() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(
            temp.path().join(DATASET_META_FILE),
            r#"{"label_map": {"10": "truck", "2": "car", "0": "person"}}"#,
        )
        .expect("write meta");

        let meta = parse_dataset_meta(temp.path()).expect("parse meta");
        let names: Vec<&str> = meta.labels.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["person", "car", "truck"]);
    }

    #[test]
    fn dataset_meta_label_categories_keep_parents() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(
            temp.path().join(DATASET_META_FILE),
            r#"{
                "label_categories": ["person", ["head", "person"]],
                "point_categories": [[0, ["head"]]]
            }"#,
        )
        .expect("write meta");

        let meta = parse_dataset_meta(temp.path()).expect("parse meta");
        assert_eq!(meta.labels[0], ("person".to_string(), None));
        assert_eq!(
            meta.labels[1],
            ("head".to_string(), Some("person".to_string()))
        );
        assert_eq!(meta.point_categories, vec![(0, vec!["head".to_string()])]);
    }

    #[test]
    fn dataset_meta_rejects_non_integer_keys() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(
            temp.path().join(DATASET_META_FILE),
            r#"{"label_map": {"person": "0"}}"#,
        )
        .expect("write meta");

        let err = parse_dataset_meta(temp.path()).unwrap_err();
        assert!(matches!(err, ImportError::MetaInvalid { .. }));
    }

    #[test]
    fn size_index_allows_ids_with_spaces() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join(IMAGE_META_FILE);
        fs::write(&path, "train/a 480 640\nodd name 10 20\n\n").expect("write index");

        let index = parse_image_size_index(&path).expect("parse index");
        assert_eq!(index.get("train/a"), Some(&(480, 640)));
        assert_eq!(index.get("odd name"), Some(&(10, 20)));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn size_index_rejects_short_lines() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join(IMAGE_META_FILE);
        fs::write(&path, "only_two 480\n").expect("write index");

        let err = parse_image_size_index(&path).unwrap_err();
        assert!(matches!(err, ImportError::SizeIndexInvalid { line: 1, .. }));
    }

    #[test]
    fn registry_preserves_key_order() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join(LABELS_REGISTRY_FILE);
        fs::write(
            &path,
            r#"{
                "b": {"path": "catB/b.jpg", "labels": ["catB"]},
                "a": {"path": "catA/a.jpg", "labels": ["catA", "extra"]}
            }"#,
        )
        .expect("write registry");

        let registry = parse_label_registry(&path).expect("parse registry");
        let ids: Vec<&str> = registry.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(registry["a"].labels, vec!["catA", "extra"]);
    }
}
