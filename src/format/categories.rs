//! Category loading and label-id resolution, per flavor.
//!
//! A `dataset_meta.json` side-car, when present, wins outright. Otherwise
//! the vocabulary is derived from the legacy names file, the YAML `names`
//! entry, or (for classification) the directory structure plus registries.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use super::manifest::{localize_path, Manifest};
use super::{KPT_SHAPE_KEY, NO_LABEL_DIR};
use crate::error::{AnnotationError, ImportError};
use crate::meta::{has_dataset_meta, parse_dataset_meta, RegistryEntry};
use crate::model::{Categories, LabelCategories, PointsCategories};

/// The `kpt_shape` manifest entry: `[pointCount, valuesPerPoint]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct KptShape {
    pub points: usize,
    pub values_per_point: usize,
}

impl KptShape {
    /// Token count of a full pose record. Saturates instead of overflowing;
    /// loading rejects shapes whose count does not fit a `usize`.
    pub(crate) fn record_fields(self) -> usize {
        self.points
            .saturating_mul(self.values_per_point)
            .saturating_add(5)
    }
}

/// Reads and validates `kpt_shape` from a YAML manifest.
pub(crate) fn kpt_shape(manifest: &Manifest) -> Result<KptShape, ImportError> {
    let value = manifest
        .yaml_entry(KPT_SHAPE_KEY)
        .ok_or_else(|| ImportError::KeypointShape {
            message: format!("missing {KPT_SHAPE_KEY} entry"),
        })?;

    let shape: Vec<i64> =
        serde_yaml::from_value(value.clone()).map_err(|_| ImportError::KeypointShape {
            message: format!("failed to parse {KPT_SHAPE_KEY}; expected [points, values]"),
        })?;

    if shape.len() != 2 {
        return Err(ImportError::KeypointShape {
            message: format!("expected 2 entries, found {}", shape.len()),
        });
    }
    if !matches!(shape[1], 2 | 3) {
        return Err(ImportError::KeypointShape {
            message: format!("unexpected values per point {}; expected 2 or 3", shape[1]),
        });
    }
    if shape[0] < 0 {
        return Err(ImportError::KeypointShape {
            message: format!(
                "unexpected number of points {}; expected non-negative integer",
                shape[0]
            ),
        });
    }

    let points = shape[0] as usize;
    let values_per_point = shape[1] as usize;
    if points
        .checked_mul(values_per_point)
        .and_then(|values| values.checked_add(5))
        .is_none()
    {
        return Err(ImportError::KeypointShape {
            message: format!("number of points {points} is too large"),
        });
    }

    Ok(KptShape {
        points,
        values_per_point,
    })
}

/// The YAML `names` entry: a sequence (id = index) or a mapping (id = rank
/// of the key after an ascending sort).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NamesSpec {
    Sequence(Vec<String>),
    Mapping(BTreeMap<i64, String>),
}

impl NamesSpec {
    /// Names in canonical id order.
    pub(crate) fn canonical_names(&self) -> Vec<String> {
        match self {
            NamesSpec::Sequence(names) => names.clone(),
            NamesSpec::Mapping(mapping) => mapping.values().cloned().collect(),
        }
    }
}

/// Extracts the `names` entry from a YAML manifest.
pub(crate) fn names_spec(manifest: &Manifest, manifest_path: &Path) -> Result<NamesSpec, ImportError> {
    let value = manifest
        .yaml_entry("names")
        .ok_or_else(|| ImportError::NamesMissing {
            path: manifest_path.to_path_buf(),
        })?;

    serde_yaml::from_value(value.clone()).map_err(|_| ImportError::NamesInvalid {
        path: manifest_path.to_path_buf(),
        message: "expected a sequence of names or an id-to-name mapping".to_string(),
    })
}

/// Maps raw label-id tokens to canonical ids.
///
/// List dialects admit `0..len`; mapping dialects go through the cached
/// sorted-key remap; pose layers a skeleton-id to label-id step on top.
/// Anything unmapped is an undeclared label.
#[derive(Clone, Debug)]
pub(crate) struct LabelIdMap {
    list_len: usize,
    dict_remap: Option<BTreeMap<i64, usize>>,
    skeleton_ids: Option<Vec<usize>>,
}

impl LabelIdMap {
    pub(crate) fn list(len: usize) -> Self {
        Self {
            list_len: len,
            dict_remap: None,
            skeleton_ids: None,
        }
    }

    pub(crate) fn from_spec(spec: &NamesSpec) -> Self {
        match spec {
            NamesSpec::Sequence(names) => Self::list(names.len()),
            NamesSpec::Mapping(mapping) => Self {
                list_len: 0,
                dict_remap: Some(
                    mapping
                        .keys()
                        .enumerate()
                        .map(|(rank, &key)| (key, rank))
                        .collect(),
                ),
                skeleton_ids: None,
            },
        }
    }

    /// Adds the pose skeleton-id remap (index = base id, value = canonical
    /// label id).
    pub(crate) fn with_skeletons(mut self, skeleton_ids: Vec<usize>) -> Self {
        self.skeleton_ids = Some(skeleton_ids);
        self
    }

    pub(crate) fn map(&self, raw: &str) -> Result<usize, AnnotationError> {
        let id: i64 = raw.parse().map_err(|_| AnnotationError::FieldParse {
            field: "label id".to_string(),
            value: raw.to_string(),
            expected: "integer",
        })?;

        let base = match &self.dict_remap {
            Some(remap) => *remap
                .get(&id)
                .ok_or_else(|| AnnotationError::UndeclaredLabel {
                    label: raw.to_string(),
                })?,
            None => {
                if id < 0 || id as usize >= self.list_len {
                    return Err(AnnotationError::UndeclaredLabel {
                        label: raw.to_string(),
                    });
                }
                id as usize
            }
        };

        match &self.skeleton_ids {
            Some(ids) => ids
                .get(base)
                .copied()
                .ok_or_else(|| AnnotationError::UndeclaredLabel {
                    label: raw.to_string(),
                }),
            None => Ok(base),
        }
    }
}

fn categories_from_meta(dir: &Path) -> Result<Categories, ImportError> {
    let meta = parse_dataset_meta(dir)?;

    let mut labels = LabelCategories::new();
    for (name, parent) in meta.labels {
        match parent {
            Some(parent) => labels.add_child(name, parent),
            None => labels.add(name),
        };
    }

    let points = if meta.point_categories.is_empty() {
        None
    } else {
        let mut points = PointsCategories::new();
        for (label_id, point_names) in meta.point_categories {
            points.add(label_id, point_names);
        }
        Some(points)
    };

    Ok(Categories { labels, points })
}

/// Legacy names file: one label per non-empty line, id = line order. A
/// `dataset_meta.json` next to the names file overrides it.
pub(crate) fn load_darknet_categories(
    root: &Path,
    manifest: &Manifest,
    manifest_path: &Path,
) -> Result<Categories, ImportError> {
    let names_value = manifest
        .get_str("names")
        .ok_or_else(|| ImportError::NamesMissing {
            path: manifest_path.to_path_buf(),
        })?;
    let names_path = root.join(localize_path(names_value));

    if let Some(dir) = names_path.parent() {
        if has_dataset_meta(dir) {
            return categories_from_meta(dir);
        }
    }

    let data = fs::read_to_string(&names_path)?;
    let mut labels = LabelCategories::new();
    for line in data.lines() {
        let name = line.trim();
        if !name.is_empty() {
            labels.add(name);
        }
    }

    Ok(Categories::from_labels(labels))
}

/// YAML `names` vocabulary for detection-style flavors. A root
/// `dataset_meta.json` overrides it.
pub(crate) fn load_detection_categories(
    root: &Path,
    manifest: &Manifest,
    manifest_path: &Path,
) -> Result<Categories, ImportError> {
    if has_dataset_meta(root) {
        return categories_from_meta(root);
    }

    let spec = names_spec(manifest, manifest_path)?;
    Ok(Categories::from_labels(LabelCategories::from_names(
        spec.canonical_names(),
    )))
}

/// Skeleton + point-sub-label vocabulary for pose datasets.
///
/// Sub-labels fall back to `<skeleton>_point_<i>` names unless a caller
/// hint supplies them; the hint must cover every skeleton and stay within
/// the declared point count.
pub(crate) fn load_pose_categories(
    root: &Path,
    manifest: &Manifest,
    manifest_path: &Path,
    shape: KptShape,
    sub_label_hint: Option<&BTreeMap<String, Vec<String>>>,
) -> Result<Categories, ImportError> {
    // The names entry is mandatory even when a meta file overrides it.
    if manifest.yaml_entry("names").is_none() {
        return Err(ImportError::NamesMissing {
            path: manifest_path.to_path_buf(),
        });
    }

    if has_dataset_meta(root) {
        return categories_from_meta(root);
    }

    let skeleton_labels = names_spec(manifest, manifest_path)?.canonical_names();

    if let Some(hint) = sub_label_hint {
        let missing: Vec<&str> = skeleton_labels
            .iter()
            .filter(|skeleton| !hint.contains_key(*skeleton))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::SkeletonHint {
                message: format!("skeletons absent from the hint: {}", missing.join(", ")),
            });
        }

        let oversized: Vec<&str> = skeleton_labels
            .iter()
            .filter(|skeleton| hint[*skeleton].len() > shape.points)
            .map(String::as_str)
            .collect();
        if !oversized.is_empty() {
            return Err(ImportError::SkeletonHint {
                message: format!(
                    "the dataset declares {} point(s) per skeleton; these skeletons have more sub-labels: {}",
                    shape.points,
                    oversized.join(", ")
                ),
            });
        }
    }

    let children_for = |skeleton: &str| -> Vec<String> {
        match sub_label_hint {
            Some(hint) => hint[skeleton].clone(),
            None => (0..shape.points)
                .map(|i| format!("{skeleton}_point_{i}"))
                .collect(),
        }
    };

    let mut labels = LabelCategories::new();
    let mut points = PointsCategories::new();

    for skeleton in &skeleton_labels {
        labels.add(skeleton.clone());
    }
    for skeleton in &skeleton_labels {
        let skeleton_id = labels
            .find(skeleton)
            .expect("skeleton labels were added above");
        let children = children_for(skeleton);
        for child in &children {
            labels.add_child(child.clone(), skeleton.clone());
        }
        points.add(skeleton_id, children);
    }

    let points = (!points.is_empty()).then_some(points);
    Ok(Categories { labels, points })
}

/// Classification vocabulary: union of label directory names (excluding the
/// reserved `no_label` directory) and registry-referenced labels, sorted.
pub(crate) fn load_classification_categories(
    root: &Path,
    subsets: &[String],
    registries: &BTreeMap<String, IndexMap<String, RegistryEntry>>,
) -> Result<Categories, ImportError> {
    if has_dataset_meta(root) {
        return categories_from_meta(root);
    }

    let mut names = BTreeSet::new();

    for subset in subsets {
        if let Some(registry) = registries.get(subset) {
            for entry in registry.values() {
                names.extend(entry.labels.iter().cloned());
            }
        }

        let subset_dir = root.join(subset);
        for entry in fs::read_dir(&subset_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name != NO_LABEL_DIR {
                names.insert(name);
            }
        }
    }

    Ok(Categories::from_labels(LabelCategories::from_names(names)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml_manifest(text: &str) -> Manifest {
        Manifest::Yaml(serde_yaml::from_str(text).expect("valid yaml"))
    }

    #[test]
    fn kpt_shape_validates_values_per_point() {
        let manifest = yaml_manifest("kpt_shape: [17, 3]\n");
        let shape = kpt_shape(&manifest).expect("valid shape");
        assert_eq!(shape.points, 17);
        assert_eq!(shape.values_per_point, 3);
        assert_eq!(shape.record_fields(), 5 + 17 * 3);

        let bad = yaml_manifest("kpt_shape: [17, 4]\n");
        assert!(matches!(
            kpt_shape(&bad),
            Err(ImportError::KeypointShape { .. })
        ));

        let missing = yaml_manifest("names: [a]\n");
        assert!(matches!(
            kpt_shape(&missing),
            Err(ImportError::KeypointShape { .. })
        ));

        let oversized = yaml_manifest(&format!("kpt_shape: [{}, 2]\n", i64::MAX));
        assert!(matches!(
            kpt_shape(&oversized),
            Err(ImportError::KeypointShape { .. })
        ));
    }

    #[test]
    fn names_mapping_sorts_keys_for_canonical_order() {
        let manifest = yaml_manifest("names:\n  7: truck\n  0: person\n  3: car\n");
        let spec = names_spec(&manifest, Path::new("data.yaml")).expect("names");
        assert_eq!(spec.canonical_names(), vec!["person", "car", "truck"]);

        let map = LabelIdMap::from_spec(&spec);
        assert_eq!(map.map("7").expect("declared"), 2);
        assert_eq!(map.map("0").expect("declared"), 0);
        assert!(matches!(
            map.map("1"),
            Err(AnnotationError::UndeclaredLabel { .. })
        ));
    }

    #[test]
    fn list_map_bounds_ids() {
        let map = LabelIdMap::list(3);
        assert_eq!(map.map("2").expect("declared"), 2);
        assert!(matches!(
            map.map("3"),
            Err(AnnotationError::UndeclaredLabel { .. })
        ));
        assert!(matches!(
            map.map("-1"),
            Err(AnnotationError::UndeclaredLabel { .. })
        ));
        assert!(matches!(
            map.map("x"),
            Err(AnnotationError::FieldParse { .. })
        ));
    }

    #[test]
    fn pose_categories_auto_name_sub_labels() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let manifest = yaml_manifest("names: [person]\nkpt_shape: [2, 2]\n");
        let shape = kpt_shape(&manifest).expect("shape");

        let categories =
            load_pose_categories(temp.path(), &manifest, Path::new("data.yaml"), shape, None)
                .expect("categories");

        assert_eq!(categories.labels.len(), 3);
        assert_eq!(categories.labels.find("person"), Some(0));
        assert_eq!(
            categories
                .labels
                .find_with_parent("person_point_0", Some("person")),
            Some(1)
        );

        let points = categories.points.expect("points categories");
        assert_eq!(
            points.get(0),
            Some(
                &[
                    "person_point_0".to_string(),
                    "person_point_1".to_string()
                ][..]
            )
        );
    }

    #[test]
    fn pose_hint_must_cover_every_skeleton() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let manifest = yaml_manifest("names: [person, horse]\nkpt_shape: [2, 2]\n");
        let shape = kpt_shape(&manifest).expect("shape");

        let hint = BTreeMap::from([("person".to_string(), vec!["head".to_string()])]);
        let err = load_pose_categories(
            temp.path(),
            &manifest,
            Path::new("data.yaml"),
            shape,
            Some(&hint),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::SkeletonHint { .. }));
    }

    #[test]
    fn pose_hint_must_fit_point_count() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let manifest = yaml_manifest("names: [person]\nkpt_shape: [1, 2]\n");
        let shape = kpt_shape(&manifest).expect("shape");

        let hint = BTreeMap::from([(
            "person".to_string(),
            vec!["head".to_string(), "tail".to_string()],
        )]);
        let err = load_pose_categories(
            temp.path(),
            &manifest,
            Path::new("data.yaml"),
            shape,
            Some(&hint),
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::SkeletonHint { .. }));
    }
}
