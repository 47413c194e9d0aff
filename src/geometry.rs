//! Minimum-area rectangle fitting for oriented-box records.

/// A rectangle with center, extents, and rotation in degrees within
/// `[0, 180)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct RotatedRect {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
    pub angle_deg: f64,
}

/// Fits the minimum-area rectangle around `points` with rotating calipers
/// over the convex hull.
///
/// Ties between candidate orientations resolve to the first minimal hull
/// edge, so axis-aligned input stays at rotation 0.
pub(crate) fn min_area_rect(points: &[(f64, f64)]) -> RotatedRect {
    let hull = convex_hull(points);

    match hull.len() {
        0 => RotatedRect {
            cx: 0.0,
            cy: 0.0,
            w: 0.0,
            h: 0.0,
            angle_deg: 0.0,
        },
        1 => RotatedRect {
            cx: hull[0].0,
            cy: hull[0].1,
            w: 0.0,
            h: 0.0,
            angle_deg: 0.0,
        },
        2 => rect_for_edge(&hull, hull[0], hull[1]),
        _ => {
            let mut best: Option<RotatedRect> = None;
            for i in 0..hull.len() {
                let a = hull[i];
                let b = hull[(i + 1) % hull.len()];
                let candidate = rect_for_edge(&hull, a, b);
                let keep = match &best {
                    Some(current) => candidate.w * candidate.h < current.w * current.h,
                    None => true,
                };
                if keep {
                    best = Some(candidate);
                }
            }
            best.expect("hull has at least one edge")
        }
    }
}

/// Bounding rectangle of `points` oriented along the edge `a -> b`.
fn rect_for_edge(points: &[(f64, f64)], a: (f64, f64), b: (f64, f64)) -> RotatedRect {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len = (dx * dx + dy * dy).sqrt();
    let (ux, uy) = if len > 0.0 {
        (dx / len, dy / len)
    } else {
        (1.0, 0.0)
    };

    let mut s_min = f64::INFINITY;
    let mut s_max = f64::NEG_INFINITY;
    let mut t_min = f64::INFINITY;
    let mut t_max = f64::NEG_INFINITY;

    for &(x, y) in points {
        let s = x * ux + y * uy;
        let t = -x * uy + y * ux;
        s_min = s_min.min(s);
        s_max = s_max.max(s);
        t_min = t_min.min(t);
        t_max = t_max.max(t);
    }

    let cs = (s_min + s_max) * 0.5;
    let ct = (t_min + t_max) * 0.5;

    RotatedRect {
        cx: cs * ux - ct * uy,
        cy: cs * uy + ct * ux,
        w: s_max - s_min,
        h: t_max - t_min,
        angle_deg: uy.atan2(ux).to_degrees().rem_euclid(180.0),
    }
}

/// Andrew's monotone chain. Returns the hull in counter-clockwise order
/// starting from the lexicographically smallest point; collinear points are
/// dropped.
fn convex_hull(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut sorted: Vec<(f64, f64)> = points.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted.dedup();

    if sorted.len() < 3 {
        return sorted;
    }

    let cross = |o: (f64, f64), a: (f64, f64), b: (f64, f64)| {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };

    let mut lower: Vec<(f64, f64)> = Vec::new();
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<(f64, f64)> = Vec::new();
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);

    if lower.len() < 3 {
        // All input points collinear; fall back to the two extremes.
        return vec![sorted[0], sorted[sorted.len() - 1]];
    }
    lower
}
