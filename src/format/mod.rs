//! The per-variant extraction core.
//!
//! One [`Flavor`] per on-disk layout, selected at construction. Dispatch is
//! match-based: each concern (manifest resolution, category loading, item
//! indexing, record parsing) switches on the flavor in one place.

pub(crate) mod categories;
pub(crate) mod index;
pub(crate) mod manifest;
pub(crate) mod record;

/// The dataset layout variant handled by an extractor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flavor {
    /// Legacy line-based layout: flat `obj.data` manifest, `obj.names`
    /// label file, per-subset list files, labels next to images.
    Darknet,
    /// Directory-based detection layout with a YAML manifest and parallel
    /// `images/` + `labels/` trees.
    Detection,
    /// Like [`Flavor::Detection`] with polygon records.
    Segmentation,
    /// Like [`Flavor::Detection`] with 4-corner oriented-box records.
    OrientedBoxes,
    /// Like [`Flavor::Detection`] with skeleton/keypoint records and a
    /// mandatory `kpt_shape` manifest entry.
    Pose,
    /// Subset/label directory tree (optionally with a `labels.json`
    /// registry); no manifest at all.
    Classification,
}

impl Flavor {
    /// Manifest keys that never name a subset.
    pub(crate) fn reserved_keys(self) -> &'static [&'static str] {
        match self {
            Flavor::Darknet => &["classes", "names", "backup"],
            Flavor::Classification => &[],
            _ => &["classes", "names", "backup", "path", "kpt_shape"],
        }
    }

    /// Leading path segments stripped when deriving an item id: one for the
    /// legacy `<subset>_obj/` wrapper, two for `images/<subset>/`.
    pub(crate) fn id_skip_segments(self) -> usize {
        match self {
            Flavor::Darknet | Flavor::Classification => 1,
            _ => 2,
        }
    }

    pub(crate) fn uses_yaml_manifest(self) -> bool {
        !matches!(self, Flavor::Darknet | Flavor::Classification)
    }
}

pub(crate) const LABELS_EXT: &str = "txt";
pub(crate) const SUBSET_LIST_EXT: &str = ".txt";
pub(crate) const IMAGES_DIR: &str = "images";
pub(crate) const LABELS_DIR: &str = "labels";
pub(crate) const NO_LABEL_DIR: &str = "no_label";
pub(crate) const KPT_SHAPE_KEY: &str = "kpt_shape";
pub(crate) const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];
