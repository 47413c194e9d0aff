//! Legacy Darknet layout: flat manifest, names file, per-subset list files,
//! annotations next to images.

mod common;

use std::path::Path;

use darklabel::policy::{FailFast, Tolerate};
use darklabel::{Extractor, ExtractorOptions, Flavor, ImportError};

fn write_dataset(root: &Path) {
    common::write_file(
        &root.join("obj.data"),
        "classes = 2\ntrain = data/train.txt\nnames = data/obj.names\nbackup = backup/\n",
    );
    common::write_file(&root.join("obj.names"), "person\ncar\n");
    common::write_file(
        &root.join("train.txt"),
        "data/obj_train_data/street.bmp\ndata/obj_train_data/sub/alley.bmp\n",
    );

    common::write_bmp(&root.join("obj_train_data/street.bmp"), 640, 480);
    common::write_file(
        &root.join("obj_train_data/street.txt"),
        "0 0.5 0.5 0.5 0.25\n1 0.25 0.25 0.1 0.1\n",
    );

    common::write_bmp(&root.join("obj_train_data/sub/alley.bmp"), 320, 240);
    common::write_file(&root.join("obj_train_data/sub/alley.txt"), "");
}

#[test]
fn imports_listed_items_with_pixel_geometry() {
    let temp = tempfile::tempdir().expect("create temp dir");
    write_dataset(temp.path());

    let mut dataset =
        Extractor::open(temp.path().join("obj.data"), Flavor::Darknet).expect("open dataset");

    assert_eq!(dataset.subset_names().collect::<Vec<_>>(), vec!["train"]);
    assert_eq!(dataset.len(), 2);
    let names: Vec<&str> = dataset
        .categories()
        .labels
        .iter()
        .map(|category| category.name.as_str())
        .collect();
    assert_eq!(names, vec!["person", "car"]);

    let item = dataset
        .get("train", "street")
        .expect("materialize")
        .expect("item exists")
        .clone();
    assert_eq!(item.subset, "train");
    assert_eq!(item.image.size(), Some((480, 640)));
    assert_eq!(item.annotations.len(), 2);

    let bbox = item.annotations[0].as_bbox().expect("bbox");
    assert_eq!(bbox.label, 0);
    assert!((bbox.x - 160.0).abs() < 1e-6);
    assert!((bbox.y - 180.0).abs() < 1e-6);
    assert!((bbox.w - 320.0).abs() < 1e-6);
    assert!((bbox.h - 120.0).abs() < 1e-6);

    // Nested list entries keep their sub-path in the id.
    let nested = dataset
        .get("train", "sub/alley")
        .expect("materialize")
        .expect("item exists");
    assert!(nested.annotations.is_empty());
    // An empty annotation file never triggers an image probe.
    assert_eq!(nested.image.size(), None);
}

#[test]
fn missing_annotation_file_evicts_the_item() {
    let temp = tempfile::tempdir().expect("create temp dir");
    write_dataset(temp.path());
    std::fs::remove_file(temp.path().join("obj_train_data/street.txt")).expect("remove labels");

    let policy = Tolerate::new();
    let log = policy.log();
    let mut dataset = Extractor::open_with_options(
        temp.path().join("obj.data"),
        Flavor::Darknet,
        ExtractorOptions {
            policy: Box::new(policy),
            ..Default::default()
        },
    )
    .expect("open dataset");

    assert_eq!(dataset.len(), 2);
    assert!(dataset.get("train", "street").expect("tolerated").is_none());
    assert_eq!(dataset.len(), 1);
    assert_eq!(log.item_failure_count(), 1);

    let failures = log.take_item_failures();
    assert_eq!(failures[0].item_id, "street");
    assert!(matches!(failures[0].error, ImportError::Io(_)));

    // The healthy item is unaffected.
    assert!(dataset
        .get("train", "sub/alley")
        .expect("materialize")
        .is_some());
}

#[test]
fn fail_fast_policy_aborts_on_first_failure() {
    let temp = tempfile::tempdir().expect("create temp dir");
    write_dataset(temp.path());
    std::fs::remove_file(temp.path().join("obj_train_data/street.txt")).expect("remove labels");

    let mut dataset = Extractor::open_with_options(
        temp.path().join("obj.data"),
        Flavor::Darknet,
        ExtractorOptions {
            policy: Box::new(FailFast),
            ..Default::default()
        },
    )
    .expect("open dataset");

    let err = dataset.cursor().next().unwrap_err();
    assert!(matches!(err, ImportError::Io(_)));
}

#[test]
fn missing_manifest_fails_at_open() {
    let temp = tempfile::tempdir().expect("create temp dir");
    let err = Extractor::open(temp.path().join("obj.data"), Flavor::Darknet).unwrap_err();
    assert!(matches!(err, ImportError::ManifestMissing { .. }));
}

#[test]
fn missing_names_file_fails_at_open() {
    let temp = tempfile::tempdir().expect("create temp dir");
    write_dataset(temp.path());
    std::fs::remove_file(temp.path().join("obj.names")).expect("remove names");

    let err = Extractor::open(temp.path().join("obj.data"), Flavor::Darknet).unwrap_err();
    assert!(matches!(err, ImportError::Io(_)));
}

#[test]
fn meta_file_next_to_names_overrides_it() {
    let temp = tempfile::tempdir().expect("create temp dir");
    write_dataset(temp.path());
    common::write_file(
        &temp.path().join("dataset_meta.json"),
        r#"{"label_map": {"0": "cat", "1": "dog", "2": "bird"}}"#,
    );

    let dataset =
        Extractor::open(temp.path().join("obj.data"), Flavor::Darknet).expect("open dataset");
    let names: Vec<&str> = dataset
        .categories()
        .labels
        .iter()
        .map(|category| category.name.as_str())
        .collect();
    assert_eq!(names, vec!["cat", "dog", "bird"]);
}
