//! Typed annotations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Keypoint visibility, following the 0/1/2 convention of pose label files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Absent,
    Hidden,
    #[default]
    Visible,
}

impl Visibility {
    /// Maps a raw visibility flag to the enum. Values outside `0..=2`
    /// clamp to the nearest convention value.
    pub fn from_flag(flag: i64) -> Self {
        match flag {
            i64::MIN..=0 => Visibility::Absent,
            1 => Visibility::Hidden,
            _ => Visibility::Visible,
        }
    }

    pub fn as_flag(self) -> i64 {
        match self {
            Visibility::Absent => 0,
            Visibility::Hidden => 1,
            Visibility::Visible => 2,
        }
    }
}

/// An axis-aligned bounding box in pixel coordinates.
///
/// `(x, y)` is the top-left corner; `w` and `h` are the extents. Oriented-box
/// records are fitted to a minimum-area rectangle and stored here too, with
/// the residual rotation kept in `attributes`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub label: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Bbox {
    pub fn new(x: f64, y: f64, w: f64, h: f64, label: usize) -> Self {
        Self {
            x,
            y,
            w,
            h,
            label,
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute to the box.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The box center, `(cx, cy)`.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.w * 0.5, self.y + self.h * 0.5)
    }
}

/// A polygon in pixel coordinates as a flat `[x0, y0, x1, y1, ..]` list,
/// preserving source file order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<f64>,
    pub label: usize,
}

impl Polygon {
    pub fn new(points: Vec<f64>, label: usize) -> Self {
        Self { points, label }
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.points.len() / 2
    }
}

/// One skeleton keypoint in pixel coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub visibility: Visibility,
    /// Canonical id of the point sub-label.
    pub label: usize,
}

/// An ordered set of keypoints belonging to one skeleton label.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub points: Vec<Point>,
    pub label: usize,
}

/// A bare classification label with no geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub label: usize,
}

impl Label {
    pub fn new(label: usize) -> Self {
        Self { label }
    }
}

/// One typed ground-truth unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Annotation {
    Bbox(Bbox),
    Polygon(Polygon),
    Skeleton(Skeleton),
    Label(Label),
}

impl Annotation {
    /// The canonical label id of the annotation, whatever its kind.
    pub fn label(&self) -> usize {
        match self {
            Annotation::Bbox(bbox) => bbox.label,
            Annotation::Polygon(polygon) => polygon.label,
            Annotation::Skeleton(skeleton) => skeleton.label,
            Annotation::Label(label) => label.label,
        }
    }

    pub fn as_bbox(&self) -> Option<&Bbox> {
        match self {
            Annotation::Bbox(bbox) => Some(bbox),
            _ => None,
        }
    }

    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Annotation::Polygon(polygon) => Some(polygon),
            _ => None,
        }
    }

    pub fn as_skeleton(&self) -> Option<&Skeleton> {
        match self {
            Annotation::Skeleton(skeleton) => Some(skeleton),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&Label> {
        match self {
            Annotation::Label(label) => Some(label),
            _ => None,
        }
    }
}

impl From<Bbox> for Annotation {
    fn from(bbox: Bbox) -> Self {
        Annotation::Bbox(bbox)
    }
}

impl From<Polygon> for Annotation {
    fn from(polygon: Polygon) -> Self {
        Annotation::Polygon(polygon)
    }
}

impl From<Skeleton> for Annotation {
    fn from(skeleton: Skeleton) -> Self {
        Annotation::Skeleton(skeleton)
    }
}

impl From<Label> for Annotation {
    fn from(label: Label) -> Self {
        Annotation::Label(label)
    }
}
