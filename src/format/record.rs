//! The record parser family.
//!
//! One whitespace-split annotation line plus the image pixel dimensions go
//! in; one typed [`Annotation`] comes out, or an [`AnnotationError`] that the
//! error policy sees. Geometry in label files is normalized to `[0, 1]` and
//! is scaled to pixels here.

use std::str::FromStr;

use super::categories::{KptShape, LabelIdMap};
use super::Flavor;
use crate::error::AnnotationError;
use crate::geometry::min_area_rect;
use crate::model::{Annotation, Bbox, Categories, Point, Polygon, Skeleton, Visibility};

/// Rotations below this magnitude collapse to an unrotated box.
const ROTATION_EPSILON: f64 = 1e-5;

/// Shared context of one record parse.
pub(crate) struct RecordContext<'a> {
    pub label_map: &'a LabelIdMap,
    pub categories: &'a Categories,
    pub kpt_shape: Option<KptShape>,
    /// Image height in pixels.
    pub height: u32,
    /// Image width in pixels.
    pub width: u32,
}

/// Parses one annotation record for a line-based flavor.
pub(crate) fn parse_record(
    flavor: Flavor,
    fields: &[&str],
    ctx: &RecordContext<'_>,
) -> Result<Annotation, AnnotationError> {
    match flavor {
        Flavor::Darknet | Flavor::Detection => parse_detection(fields, ctx),
        Flavor::Segmentation => parse_segmentation(fields, ctx),
        Flavor::OrientedBoxes => parse_oriented_box(fields, ctx),
        Flavor::Pose => parse_pose(fields, ctx),
        Flavor::Classification => unreachable!("classification has no line records"),
    }
}

fn parse_field<T: FromStr>(
    value: &str,
    field: impl Into<String>,
    expected: &'static str,
) -> Result<T, AnnotationError> {
    value.parse().map_err(|_| AnnotationError::FieldParse {
        field: field.into(),
        value: value.to_string(),
        expected,
    })
}

/// `label xc yc w h`, all geometry normalized.
fn parse_detection(fields: &[&str], ctx: &RecordContext<'_>) -> Result<Annotation, AnnotationError> {
    if fields.len() != 5 {
        return Err(AnnotationError::FieldCount {
            kind: "bbox",
            found: fields.len(),
            expected: "5 fields (label, xc, yc, w, h)",
        });
    }

    let label = ctx.label_map.map(fields[0])?;

    let w: f64 = parse_field(fields[3], "bbox width", "float")?;
    let h: f64 = parse_field(fields[4], "bbox height", "float")?;
    let x = parse_field::<f64>(fields[1], "bbox center x", "float")? - w * 0.5;
    let y = parse_field::<f64>(fields[2], "bbox center y", "float")? - h * 0.5;

    let (img_w, img_h) = (ctx.width as f64, ctx.height as f64);
    Ok(Bbox::new(x * img_w, y * img_h, w * img_w, h * img_h, label).into())
}

/// `label x1 y1 x2 y2 x3 y3 ..`; odd field count above 5.
fn parse_segmentation(
    fields: &[&str],
    ctx: &RecordContext<'_>,
) -> Result<Annotation, AnnotationError> {
    if fields.len() <= 5 || fields.len() % 2 != 1 {
        return Err(AnnotationError::FieldCount {
            kind: "polygon",
            found: fields.len(),
            expected: "an odd number > 5 of fields (label, x1, y1, x2, y2, x3, y3, ...)",
        });
    }

    let label = ctx.label_map.map(fields[0])?;

    let (img_w, img_h) = (ctx.width as f64, ctx.height as f64);
    let mut points = Vec::with_capacity(fields.len() - 1);
    for (idx, value) in fields[1..].iter().enumerate() {
        let axis = if idx % 2 == 0 { "x" } else { "y" };
        let coord: f64 = parse_field(value, format!("polygon point {} {axis}", idx / 2), "float")?;
        let scale = if idx % 2 == 0 { img_w } else { img_h };
        points.push(coord * scale);
    }

    Ok(Polygon::new(points, label).into())
}

/// `label x1 y1 x2 y2 x3 y3 x4 y4`: four corners fitted to a minimum-area
/// rectangle, stored axis-aligned with the rotation as an attribute when it
/// exceeds [`ROTATION_EPSILON`].
fn parse_oriented_box(
    fields: &[&str],
    ctx: &RecordContext<'_>,
) -> Result<Annotation, AnnotationError> {
    if fields.len() != 9 {
        return Err(AnnotationError::FieldCount {
            kind: "bbox",
            found: fields.len(),
            expected: "9 fields (label, x1, y1, x2, y2, x3, y3, x4, y4)",
        });
    }

    let label = ctx.label_map.map(fields[0])?;

    let (img_w, img_h) = (ctx.width as f64, ctx.height as f64);
    let mut corners = [(0.0, 0.0); 4];
    for (idx, corner) in corners.iter_mut().enumerate() {
        let x: f64 = parse_field(fields[1 + idx * 2], format!("bbox point {idx} x"), "float")?;
        let y: f64 = parse_field(fields[2 + idx * 2], format!("bbox point {idx} y"), "float")?;
        *corner = (x * img_w, y * img_h);
    }

    let rect = min_area_rect(&corners);
    let rotation = rect.angle_deg.rem_euclid(180.0);

    let mut bbox = Bbox::new(
        rect.cx - rect.w * 0.5,
        rect.cy - rect.h * 0.5,
        rect.w,
        rect.h,
        label,
    );
    if rotation.abs() > ROTATION_EPSILON {
        bbox = bbox.with_attribute("rotation", rotation.to_string());
    }

    Ok(bbox.into())
}

/// `label xc yc w h (px py [pv])*`: the box fields only resolve the skeleton
/// label, points follow the declared `kpt_shape`.
fn parse_pose(fields: &[&str], ctx: &RecordContext<'_>) -> Result<Annotation, AnnotationError> {
    let shape = ctx
        .kpt_shape
        .expect("pose extraction always carries a keypoint shape");

    if fields.len() != shape.record_fields() {
        return Err(AnnotationError::FieldCount {
            kind: "skeleton",
            found: fields.len(),
            expected: "5 fields (label, xc, yc, w, h) plus values for each point",
        });
    }

    let label = ctx.label_map.map(fields[0])?;

    let skeleton_name = ctx
        .categories
        .labels
        .get(label)
        .map(|category| category.name.clone())
        .ok_or_else(|| AnnotationError::UndeclaredLabel {
            label: fields[0].to_string(),
        })?;
    let point_names = ctx
        .categories
        .points
        .as_ref()
        .and_then(|points| points.get(label))
        .ok_or_else(|| AnnotationError::UndeclaredLabel {
            label: fields[0].to_string(),
        })?;

    let (img_w, img_h) = (ctx.width as f64, ctx.height as f64);
    let mut points = Vec::with_capacity(point_names.len());

    // Sub-label hints may register fewer points than the record carries;
    // trailing chunks without a registered sub-label are skipped.
    for (point_index, point_name) in point_names.iter().enumerate() {
        let base = 5 + point_index * shape.values_per_point;
        let x: f64 = parse_field(
            fields[base],
            format!("skeleton point {point_index} x"),
            "float",
        )?;
        let y: f64 = parse_field(
            fields[base + 1],
            format!("skeleton point {point_index} y"),
            "float",
        )?;

        let visibility = if shape.values_per_point == 3 {
            let flag: i64 = parse_field(
                fields[base + 2],
                format!("skeleton point {point_index} visibility"),
                "integer",
            )?;
            Visibility::from_flag(flag)
        } else {
            Visibility::Visible
        };

        let point_label = ctx
            .categories
            .labels
            .find_with_parent(point_name, Some(&skeleton_name))
            .ok_or_else(|| AnnotationError::UndeclaredLabel {
                label: point_name.clone(),
            })?;

        points.push(Point {
            x: x * img_w,
            y: y * img_h,
            visibility,
            label: point_label,
        });
    }

    Ok(Skeleton { points, label }.into())
}
