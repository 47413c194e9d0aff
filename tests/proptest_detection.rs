//! Property tests for the detection record path: any well-formed label file
//! decodes to pixel geometry consistent with the normalized source values.

mod common;

use proptest::prelude::*;

use darklabel::{Extractor, Flavor};

#[derive(Clone, Debug)]
struct RawBox {
    label: usize,
    cx: f64,
    cy: f64,
    w: f64,
    h: f64,
}

fn arb_box(label_count: usize) -> impl Strategy<Value = RawBox> {
    (
        0..label_count,
        0.0..=1.0f64,
        0.0..=1.0f64,
        0.001..=1.0f64,
        0.001..=1.0f64,
    )
        .prop_map(|(label, cx, cy, w, h)| RawBox { label, cx, cy, w, h })
}

fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    }
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn detection_records_decode_consistently(
        boxes in prop::collection::vec(arb_box(3), 0..12),
        (width, height) in (16u32..512, 16u32..512),
    ) {
        let temp = tempfile::tempdir().expect("create temp dir");
        common::write_file(
            &temp.path().join("data.yaml"),
            "train: images/train\nnames: [a, b, c]\n",
        );
        common::write_bmp(&temp.path().join("images/train/img.bmp"), width, height);

        let mut lines = String::new();
        for raw in &boxes {
            lines.push_str(&format!(
                "{} {} {} {} {}\n",
                raw.label, raw.cx, raw.cy, raw.w, raw.h
            ));
        }
        common::write_file(&temp.path().join("labels/train/img.txt"), lines);

        let mut dataset = Extractor::open(temp.path().join("data.yaml"), Flavor::Detection)
            .expect("open dataset");
        let item = dataset
            .get("train", "img")
            .expect("materialize")
            .expect("item exists");

        prop_assert_eq!(item.annotations.len(), boxes.len());
        if !boxes.is_empty() {
            prop_assert_eq!(item.image.size(), Some((height, width)));
        }

        let eps = 1e-9 * f64::from(width.max(height));
        for (annotation, raw) in item.annotations.iter().zip(&boxes) {
            let bbox = annotation.as_bbox().expect("bbox");
            prop_assert_eq!(bbox.label, raw.label);

            let (cx, cy) = bbox.center();
            prop_assert!((cx - raw.cx * f64::from(width)).abs() <= eps);
            prop_assert!((cy - raw.cy * f64::from(height)).abs() <= eps);
            prop_assert!((bbox.w - raw.w * f64::from(width)).abs() <= eps);
            prop_assert!((bbox.h - raw.h * f64::from(height)).abs() <= eps);
        }
    }

    #[test]
    fn garbage_lines_never_panic_or_leak_items(
        junk in prop::collection::vec("[ -~]{0,40}", 0..8),
    ) {
        let temp = tempfile::tempdir().expect("create temp dir");
        common::write_file(
            &temp.path().join("data.yaml"),
            "train: images/train\nnames: [a]\n",
        );
        common::write_bmp(&temp.path().join("images/train/img.bmp"), 64, 64);
        common::write_file(&temp.path().join("labels/train/img.txt"), junk.join("\n"));

        let mut dataset = Extractor::open(temp.path().join("data.yaml"), Flavor::Detection)
            .expect("open dataset");

        // The default tolerant policy keeps the item whatever the file held.
        let item = dataset
            .get("train", "img")
            .expect("materialize")
            .expect("item exists");
        prop_assert!(item.annotations.len() <= junk.len());
    }
}
