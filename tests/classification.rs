//! Classification layout: subset directories of label directories, with an
//! optional per-subset `labels.json` registry.

mod common;

use std::path::Path;

use darklabel::{Extractor, Flavor, ImportError};

fn write_dataset(root: &Path) {
    common::write_bmp(&root.join("train/catA/one.bmp"), 32, 32);
    common::write_bmp(&root.join("train/catB/two.bmp"), 32, 32);
    common::write_bmp(&root.join("train/no_label/three.bmp"), 32, 32);
    common::write_bmp(&root.join("val/catA/four.bmp"), 32, 32);
}

#[test]
fn label_directories_become_sorted_categories() {
    let temp = tempfile::tempdir().expect("create temp dir");
    write_dataset(temp.path());

    let dataset = Extractor::open(temp.path(), Flavor::Classification).expect("open dataset");

    assert_eq!(
        dataset.subset_names().collect::<Vec<_>>(),
        vec!["train", "val"]
    );
    let names: Vec<&str> = dataset
        .categories()
        .labels
        .iter()
        .map(|category| category.name.as_str())
        .collect();
    // no_label is reserved, not a category.
    assert_eq!(names, vec!["catA", "catB"]);
}

#[test]
fn items_get_one_label_from_their_directory() {
    let temp = tempfile::tempdir().expect("create temp dir");
    write_dataset(temp.path());

    let mut dataset = Extractor::open(temp.path(), Flavor::Classification).expect("open dataset");
    assert_eq!(dataset.len(), 4);

    let item = dataset
        .get("train", "catB/two")
        .expect("materialize")
        .expect("item exists");
    assert_eq!(item.annotations.len(), 1);
    assert_eq!(item.annotations[0].label(), 1);

    let unlabeled = dataset
        .get("train", "no_label/three")
        .expect("materialize")
        .expect("item exists");
    assert!(unlabeled.annotations.is_empty());
}

#[test]
fn registry_overrides_the_directory_walk() {
    let temp = tempfile::tempdir().expect("create temp dir");
    write_dataset(temp.path());
    common::write_file(
        &temp.path().join("train/labels.json"),
        r#"{
            "one": {"path": "catA/one.bmp", "labels": ["catA", "catB"]},
            "extra": {"path": "catB/two.bmp", "labels": []}
        }"#,
    );

    let mut dataset = Extractor::open(temp.path(), Flavor::Classification).expect("open dataset");

    // The registry defines the subset's item set outright.
    let ids: Vec<&str> = dataset.subset("train").expect("subset").ids().collect();
    assert_eq!(ids, vec!["one", "extra"]);

    let item = dataset
        .get("train", "one")
        .expect("materialize")
        .expect("item exists");
    let labels: Vec<usize> = item.annotations.iter().map(|a| a.label()).collect();
    assert_eq!(labels, vec![0, 1]);

    let extra = dataset
        .get("train", "extra")
        .expect("materialize")
        .expect("item exists");
    assert!(extra.annotations.is_empty());

    // The unregistered subset still walks its directories.
    assert!(dataset
        .get("val", "catA/four")
        .expect("materialize")
        .is_some());
}

#[test]
fn root_meta_file_overrides_directory_names() {
    let temp = tempfile::tempdir().expect("create temp dir");
    write_dataset(temp.path());
    common::write_file(
        &temp.path().join("dataset_meta.json"),
        r#"{"label_categories": ["catA", "catB", "catC"]}"#,
    );

    let dataset = Extractor::open(temp.path(), Flavor::Classification).expect("open dataset");
    assert_eq!(dataset.categories().labels.len(), 3);
}

#[test]
fn missing_root_fails_at_open() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let err = Extractor::open(temp.path().join("nowhere"), Flavor::Classification).unwrap_err();
    assert!(matches!(err, ImportError::DatasetDirMissing { .. }));
}
