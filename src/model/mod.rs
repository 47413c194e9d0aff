//! The unified in-memory dataset model.
//!
//! Every format variant extracts into the same small vocabulary: an [`Item`]
//! belonging to a named subset, carrying an [`ImageRef`] and a list of typed
//! [`Annotation`]s, all resolved against shared [`Categories`]. Geometry is
//! always absolute pixel coordinates with the origin at the top-left corner.

mod annotation;
mod categories;
mod image;
mod item;

pub use annotation::{Annotation, Bbox, Label, Point, Polygon, Skeleton, Visibility};
pub use categories::{Categories, LabelCategories, LabelCategory, PointsCategories};
pub use image::{FileProbe, ImageRef, ImageSizeProbe};
pub use item::Item;
