//! Label and point-label vocabularies shared by every item of an extractor.

use std::collections::BTreeMap;

/// One named label, optionally parented to another label (pose sub-labels
/// carry their skeleton as parent).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelCategory {
    pub name: String,
    pub parent: Option<String>,
}

/// An ordered set of unique `(name, parent)` labels.
///
/// Ids are dense positions `0..N`, assigned at insertion and stable for the
/// extractor lifetime.
#[derive(Clone, Debug, Default)]
pub struct LabelCategories {
    items: Vec<LabelCategory>,
    index: BTreeMap<(String, String), usize>,
}

impl LabelCategories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds categories from plain names, ids following iteration order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut categories = Self::new();
        for name in names {
            categories.add(name);
        }
        categories
    }

    /// Adds a top-level label and returns its id. Adding an existing
    /// `(name, parent)` pair returns the id it already has.
    pub fn add(&mut self, name: impl Into<String>) -> usize {
        self.insert(name.into(), None)
    }

    /// Adds a label with a parent and returns its id.
    pub fn add_child(&mut self, name: impl Into<String>, parent: impl Into<String>) -> usize {
        self.insert(name.into(), Some(parent.into()))
    }

    fn insert(&mut self, name: String, parent: Option<String>) -> usize {
        let key = (name.clone(), parent.clone().unwrap_or_default());
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.items.len();
        self.items.push(LabelCategory { name, parent });
        self.index.insert(key, id);
        id
    }

    /// Finds a top-level label by name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.find_with_parent(name, None)
    }

    /// Finds a label by name and parent.
    pub fn find_with_parent(&self, name: &str, parent: Option<&str>) -> Option<usize> {
        let key = (name.to_string(), parent.unwrap_or_default().to_string());
        self.index.get(&key).copied()
    }

    pub fn get(&self, id: usize) -> Option<&LabelCategory> {
        self.items.get(id)
    }

    /// True when `id` lies in the dense id space `0..len`.
    pub fn contains_id(&self, id: usize) -> bool {
        id < self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelCategory> {
        self.items.iter()
    }
}

/// Point sub-label names per skeleton label id, in declared point order.
#[derive(Clone, Debug, Default)]
pub struct PointsCategories {
    items: BTreeMap<usize, Vec<String>>,
}

impl PointsCategories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label_id: usize, point_names: Vec<String>) {
        self.items.insert(label_id, point_names);
    }

    pub fn get(&self, label_id: usize) -> Option<&[String]> {
        self.items.get(&label_id).map(Vec::as_slice)
    }

    /// Skeleton label ids in ascending order.
    pub fn skeleton_ids(&self) -> Vec<usize> {
        self.items.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.items.iter().map(|(&id, names)| (id, names.as_slice()))
    }
}

/// The shared category info of an extractor: the label vocabulary plus, for
/// pose datasets, the per-skeleton point sub-labels.
#[derive(Clone, Debug, Default)]
pub struct Categories {
    pub labels: LabelCategories,
    pub points: Option<PointsCategories>,
}

impl Categories {
    pub fn from_labels(labels: LabelCategories) -> Self {
        Self {
            labels,
            points: None,
        }
    }
}
