//! The extraction facade.
//!
//! [`Extractor::open`] resolves the manifest, loads the label vocabulary,
//! and indexes every subset without touching a single annotation file or
//! image. Items materialize one at a time, on first access through
//! [`Extractor::get`] or a [`Cursor`], and stay cached afterwards. An item
//! whose materialization fails under a tolerant [`ErrorPolicy`] is evicted
//! and never resurfaces.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;

use crate::error::{AnnotationError, ImportError};
use crate::format::categories::{
    kpt_shape, load_classification_categories, load_darknet_categories,
    load_detection_categories, load_pose_categories, names_spec, KptShape, LabelIdMap,
};
use crate::format::index::{
    classification_subset_names, index_classification_subset, index_subset,
};
use crate::format::manifest::{strip_extension, Manifest};
use crate::format::record::{parse_record, RecordContext};
use crate::format::{Flavor, IMAGES_DIR, LABELS_DIR, LABELS_EXT, NO_LABEL_DIR};
use crate::meta::{
    parse_image_size_index, parse_label_registry, RegistryEntry, IMAGE_META_FILE,
    LABELS_REGISTRY_FILE,
};
use crate::model::{
    Annotation, Categories, FileProbe, ImageRef, ImageSizeProbe, Item, Label,
};
use crate::policy::{ErrorPolicy, Tolerate};

/// Construction knobs beyond the dataset path and flavor.
pub struct ExtractorOptions {
    /// Explicit image size index path. Without it, an `images.meta` at the
    /// dataset root is picked up when present.
    pub image_meta: Option<PathBuf>,
    /// Point sub-label names per skeleton label, for pose datasets. Without
    /// a hint, sub-labels get generated `<skeleton>_point_<i>` names.
    pub skeleton_sub_labels: Option<BTreeMap<String, Vec<String>>>,
    pub policy: Box<dyn ErrorPolicy>,
    pub probe: Box<dyn ImageSizeProbe>,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            image_meta: None,
            skeleton_sub_labels: None,
            policy: Box::new(Tolerate::new()),
            probe: Box::new(FileProbe),
        }
    }
}

enum Slot {
    /// Indexed but not yet materialized: the root-relative image path.
    Pending(String),
    Ready(Item),
}

/// One named subset: an insertion-ordered id-to-slot map.
pub struct Subset {
    name: String,
    slots: IndexMap<String, Slot>,
}

impl Subset {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of live items, materialized or not. Evicted items are gone.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Item ids in indexing order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    /// An already-materialized item. Use [`Extractor::get`] to force
    /// materialization.
    pub fn get(&self, id: &str) -> Option<&Item> {
        match self.slots.get(id) {
            Some(Slot::Ready(item)) => Some(item),
            _ => None,
        }
    }
}

/// A lazy extractor over one dataset root.
pub struct Extractor {
    root: PathBuf,
    flavor: Flavor,
    categories: Categories,
    label_map: LabelIdMap,
    kpt_shape: Option<KptShape>,
    size_index: BTreeMap<String, (u32, u32)>,
    registries: BTreeMap<String, IndexMap<String, RegistryEntry>>,
    subsets: Vec<Subset>,
    probe: Box<dyn ImageSizeProbe>,
    policy: Box<dyn ErrorPolicy>,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("root", &self.root)
            .field("flavor", &self.flavor)
            .field("categories", &self.categories)
            .field("label_map", &self.label_map)
            .field("kpt_shape", &self.kpt_shape)
            .field("size_index", &self.size_index)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    /// Opens a dataset with a tolerant policy and the header-only image
    /// probe.
    ///
    /// For manifest-driven flavors `path` is the manifest file (`obj.data`
    /// or `data.yaml`); for [`Flavor::Classification`] it is the dataset
    /// root directory.
    pub fn open(path: impl AsRef<Path>, flavor: Flavor) -> Result<Self, ImportError> {
        Self::open_with_options(path, flavor, ExtractorOptions::default())
    }

    pub fn open_with_options(
        path: impl AsRef<Path>,
        flavor: Flavor,
        options: ExtractorOptions,
    ) -> Result<Self, ImportError> {
        let path = path.as_ref();
        match flavor {
            Flavor::Classification => Self::open_classification(path, options),
            _ => Self::open_manifest(path, flavor, options),
        }
    }

    fn open_manifest(
        path: &Path,
        flavor: Flavor,
        options: ExtractorOptions,
    ) -> Result<Self, ImportError> {
        if !path.is_file() {
            return Err(ImportError::ManifestMissing {
                path: path.to_path_buf(),
            });
        }
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let manifest = if flavor.uses_yaml_manifest() {
            Manifest::load_yaml(path)?
        } else {
            Manifest::load_flat(path)?
        };

        let shape = match flavor {
            Flavor::Pose => Some(kpt_shape(&manifest)?),
            _ => None,
        };

        let (categories, label_map) = match flavor {
            Flavor::Darknet => {
                let categories = load_darknet_categories(&root, &manifest, path)?;
                let label_map = LabelIdMap::list(categories.labels.len());
                (categories, label_map)
            }
            Flavor::Detection | Flavor::Segmentation | Flavor::OrientedBoxes => {
                let categories = load_detection_categories(&root, &manifest, path)?;
                let label_map = if crate::meta::has_dataset_meta(&root) {
                    LabelIdMap::list(categories.labels.len())
                } else {
                    LabelIdMap::from_spec(&names_spec(&manifest, path)?)
                };
                (categories, label_map)
            }
            Flavor::Pose => {
                let spec = names_spec(&manifest, path)?;
                let categories = load_pose_categories(
                    &root,
                    &manifest,
                    path,
                    shape.expect("shape is resolved for pose above"),
                    options.skeleton_sub_labels.as_ref(),
                )?;

                let mut skeleton_ids = Vec::new();
                for name in spec.canonical_names() {
                    let id = categories.labels.find(&name).ok_or_else(|| {
                        ImportError::NamesInvalid {
                            path: path.to_path_buf(),
                            message: format!("skeleton '{name}' is not a declared label"),
                        }
                    })?;
                    skeleton_ids.push(id);
                }
                let label_map = LabelIdMap::from_spec(&spec).with_skeletons(skeleton_ids);
                (categories, label_map)
            }
            Flavor::Classification => unreachable!("handled by open_classification"),
        };

        let size_index = load_size_index(&root, options.image_meta.as_deref())?;

        // A manifest with only reserved keys yields an empty dataset.
        let subset_names = manifest.subset_names(flavor.reserved_keys());

        let mut subsets = Vec::with_capacity(subset_names.len());
        for name in subset_names {
            let index = index_subset(&root, &manifest, flavor, &name)?;
            debug!("indexed {} item(s) in subset '{name}'", index.len());
            subsets.push(Subset {
                name,
                slots: index
                    .into_iter()
                    .map(|(id, rel)| (id, Slot::Pending(rel)))
                    .collect(),
            });
        }

        Ok(Self {
            root,
            flavor,
            categories,
            label_map,
            kpt_shape: shape,
            size_index,
            registries: BTreeMap::new(),
            subsets,
            probe: options.probe,
            policy: options.policy,
        })
    }

    fn open_classification(path: &Path, options: ExtractorOptions) -> Result<Self, ImportError> {
        if !path.is_dir() {
            return Err(ImportError::DatasetDirMissing {
                path: path.to_path_buf(),
            });
        }
        let root = path.to_path_buf();

        let subset_names = classification_subset_names(&root)?;

        let mut registries = BTreeMap::new();
        for subset in &subset_names {
            let registry_path = root.join(subset).join(LABELS_REGISTRY_FILE);
            if registry_path.is_file() {
                registries.insert(subset.clone(), parse_label_registry(&registry_path)?);
            }
        }

        let categories = load_classification_categories(&root, &subset_names, &registries)?;
        let label_map = LabelIdMap::list(categories.labels.len());
        let size_index = load_size_index(&root, options.image_meta.as_deref())?;

        let mut subsets = Vec::with_capacity(subset_names.len());
        for name in subset_names {
            let index = index_classification_subset(&root, &name, registries.get(&name))?;
            debug!("indexed {} item(s) in subset '{name}'", index.len());
            subsets.push(Subset {
                name,
                slots: index
                    .into_iter()
                    .map(|(id, rel)| (id, Slot::Pending(rel)))
                    .collect(),
            });
        }

        Ok(Self {
            root,
            flavor: Flavor::Classification,
            categories,
            label_map,
            kpt_shape: None,
            size_index,
            registries,
            subsets,
            probe: options.probe,
            policy: options.policy,
        })
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn subset_names(&self) -> impl Iterator<Item = &str> {
        self.subsets.iter().map(|subset| subset.name.as_str())
    }

    pub fn subset(&self, name: &str) -> Option<&Subset> {
        self.subsets.iter().find(|subset| subset.name == name)
    }

    /// Total live item count across subsets, materialized or not.
    pub fn len(&self) -> usize {
        self.subsets.iter().map(Subset::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materializes (if needed) and returns one item. `Ok(None)` covers
    /// unknown ids and items evicted by the error policy; `Err` means the
    /// policy chose to abort.
    pub fn get(&mut self, subset: &str, id: &str) -> Result<Option<&Item>, ImportError> {
        let Some(subset_idx) = self.subsets.iter().position(|s| s.name == subset) else {
            return Ok(None);
        };
        let Some(slot_idx) = self.subsets[subset_idx].slots.get_index_of(id) else {
            return Ok(None);
        };

        if !self.materialize_at(subset_idx, slot_idx)? {
            return Ok(None);
        }
        Ok(self.subsets[subset_idx].get(id))
    }

    /// A lending cursor over every subset in order, materializing one item
    /// per step.
    pub fn cursor(&mut self) -> Cursor<'_> {
        let end = self.subsets.len();
        Cursor {
            extractor: self,
            subset_idx: 0,
            end_subset_idx: end,
            slot_idx: 0,
        }
    }

    /// A lending cursor over a single subset, or `None` for an unknown name.
    pub fn subset_cursor(&mut self, name: &str) -> Option<Cursor<'_>> {
        let subset_idx = self.subsets.iter().position(|s| s.name == name)?;
        Some(Cursor {
            extractor: self,
            subset_idx,
            end_subset_idx: subset_idx + 1,
            slot_idx: 0,
        })
    }

    /// Materializes the slot at the given position. Returns `false` when the
    /// policy tolerated a failure and the slot was evicted (later slots
    /// shift down by one).
    fn materialize_at(&mut self, subset_idx: usize, slot_idx: usize) -> Result<bool, ImportError> {
        let (id, image_rel) = {
            let subset = &self.subsets[subset_idx];
            let (id, slot) = subset
                .slots
                .get_index(slot_idx)
                .expect("slot position is checked by the caller");
            match slot {
                Slot::Ready(_) => return Ok(true),
                Slot::Pending(rel) => (id.clone(), rel.clone()),
            }
        };
        let subset_name = self.subsets[subset_idx].name.clone();

        match self.build_item(&subset_name, &id, &image_rel) {
            Ok((item, record_errors)) => {
                for error in record_errors {
                    self.policy.report_annotation_error(error, &id, &subset_name)?;
                }
                let (_, slot) = self.subsets[subset_idx]
                    .slots
                    .get_index_mut(slot_idx)
                    .expect("slot position is checked by the caller");
                *slot = Slot::Ready(item);
                Ok(true)
            }
            Err(error) => {
                self.policy.report_item_error(error, &id, &subset_name)?;
                self.subsets[subset_idx].slots.shift_remove_index(slot_idx);
                Ok(false)
            }
        }
    }

    /// Reads annotations (and the image size when records demand one) for a
    /// single pending item. Record-level failures come back alongside the
    /// item instead of failing it.
    fn build_item(
        &self,
        subset: &str,
        id: &str,
        image_rel: &str,
    ) -> Result<(Item, Vec<AnnotationError>), ImportError> {
        let image_path = self.root.join(image_rel);
        let mut image = match self.size_index.get(id) {
            Some(&size) => ImageRef::with_size(&image_path, size),
            None => ImageRef::new(&image_path),
        };

        if self.flavor == Flavor::Classification {
            let (annotations, errors) = self.classification_annotations(subset, id, image_rel);
            return Ok((Item::new(id, subset, image, annotations), errors));
        }

        let annotation_path = self.annotation_path(image_rel);
        let records = match self.flavor {
            // The legacy layout mandates a label file per listed image.
            Flavor::Darknet => read_records(&annotation_path)?,
            _ => {
                if annotation_path.is_file() {
                    read_records(&annotation_path)?
                } else {
                    Vec::new()
                }
            }
        };

        let mut annotations = Vec::new();
        let mut errors = Vec::new();

        if !records.is_empty() {
            let (height, width) = match image.size() {
                Some(size) => size,
                None => {
                    if !image_path.is_file() {
                        return Err(ImportError::ImageSizeUnavailable { path: image_path });
                    }
                    let size = self.probe.probe(&image_path)?;
                    image.set_size(size);
                    size
                }
            };

            let ctx = RecordContext {
                label_map: &self.label_map,
                categories: &self.categories,
                kpt_shape: self.kpt_shape,
                height,
                width,
            };
            for record in &records {
                let fields: Vec<&str> = record.iter().map(String::as_str).collect();
                match parse_record(self.flavor, &fields, &ctx) {
                    Ok(annotation) => annotations.push(annotation),
                    Err(error) => errors.push(error),
                }
            }
        }

        Ok((Item::new(id, subset, image, annotations), errors))
    }

    /// The annotation file for an image.
    ///
    /// The legacy layout keeps it next to the image. Directory layouts
    /// mirror the `images/` tree under `labels/`; an image outside
    /// `images/` maps through `labels/../<path>`, which collapses back to
    /// a `.txt` next to the image.
    fn annotation_path(&self, image_rel: &str) -> PathBuf {
        let label_rel = match self.flavor {
            Flavor::Darknet => image_rel.to_string(),
            _ => {
                let prefix = format!("{IMAGES_DIR}/");
                match image_rel.strip_prefix(&prefix) {
                    Some(tail) => format!("{LABELS_DIR}/{tail}"),
                    None => image_rel.to_string(),
                }
            }
        };
        self.root
            .join(format!("{}.{LABELS_EXT}", strip_extension(&label_rel)))
    }

    /// Labels from the registry entry when one exists, from the label
    /// directory segment otherwise. The `no_label` directory yields none.
    fn classification_annotations(
        &self,
        subset: &str,
        id: &str,
        image_rel: &str,
    ) -> (Vec<Annotation>, Vec<AnnotationError>) {
        let mut annotations = Vec::new();
        let mut errors = Vec::new();

        if let Some(entry) = self
            .registries
            .get(subset)
            .and_then(|registry| registry.get(id))
        {
            for name in &entry.labels {
                match self.categories.labels.find(name) {
                    Some(label) => annotations.push(Label::new(label).into()),
                    None => errors.push(AnnotationError::UndeclaredLabel {
                        label: name.clone(),
                    }),
                }
            }
            return (annotations, errors);
        }

        let mut segments = image_rel.split('/');
        let label_dir = segments.nth(1);
        let has_file_segment = segments.next().is_some();
        if let Some(name) = label_dir {
            if has_file_segment && name != NO_LABEL_DIR {
                match self.categories.labels.find(name) {
                    Some(label) => annotations.push(Label::new(label).into()),
                    None => errors.push(AnnotationError::UndeclaredLabel {
                        label: name.to_string(),
                    }),
                }
            }
        }
        (annotations, errors)
    }
}

/// Lending iterator over an extractor: each step materializes at most one
/// item and skips evicted ones.
pub struct Cursor<'a> {
    extractor: &'a mut Extractor,
    subset_idx: usize,
    end_subset_idx: usize,
    slot_idx: usize,
}

impl Cursor<'_> {
    /// The next live item, or `Ok(None)` at the end. `Err` means the error
    /// policy aborted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<&Item>, ImportError> {
        loop {
            if self.subset_idx >= self.end_subset_idx {
                return Ok(None);
            }
            if self.slot_idx >= self.extractor.subsets[self.subset_idx].slots.len() {
                self.subset_idx += 1;
                self.slot_idx = 0;
                continue;
            }

            if self
                .extractor
                .materialize_at(self.subset_idx, self.slot_idx)?
            {
                let idx = self.slot_idx;
                self.slot_idx += 1;
                let (_, slot) = self.extractor.subsets[self.subset_idx]
                    .slots
                    .get_index(idx)
                    .expect("slot position was just materialized");
                match slot {
                    Slot::Ready(item) => return Ok(Some(item)),
                    Slot::Pending(_) => unreachable!("materialize_at left the slot pending"),
                }
            }
            // Eviction shifts later slots down; retry the same position.
        }
    }
}

fn load_size_index(
    root: &Path,
    explicit: Option<&Path>,
) -> Result<BTreeMap<String, (u32, u32)>, ImportError> {
    match explicit {
        Some(path) => parse_image_size_index(path),
        None => {
            let implicit = root.join(IMAGE_META_FILE);
            if implicit.is_file() {
                parse_image_size_index(&implicit)
            } else {
                Ok(BTreeMap::new())
            }
        }
    }
}

fn read_records(path: &Path) -> Result<Vec<Vec<String>>, ImportError> {
    let data = fs::read_to_string(path)?;
    Ok(data
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split_whitespace().map(str::to_string).collect())
        .collect())
}
