//! Dataset items.

use super::{Annotation, ImageRef};

/// One dataset record: an image reference plus its annotations, keyed by a
/// path-derived id within a named subset.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub id: String,
    pub subset: String,
    pub image: ImageRef,
    pub annotations: Vec<Annotation>,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        subset: impl Into<String>,
        image: ImageRef,
        annotations: Vec<Annotation>,
    ) -> Self {
        Self {
            id: id.into(),
            subset: subset.into(),
            image,
            annotations,
        }
    }
}
