//! Path construction for the generators, and arc-length trimming.

use crate::value::ShapeData;
use glam::Vec2;
use kurbo::{Arc, BezPath, ParamCurve, ParamCurveArclen, PathEl, PathSeg, Point};
use std::f64::consts::FRAC_PI_2;

/// Control point distance of a quarter-circle cubic, as a fraction of the radius.
pub const ELLIPSE_CONTROL_POINT: f64 = 0.55228;

const ARC_TOLERANCE: f64 = 0.1;
const ARCLEN_ACCURACY: f64 = 1e-3;

fn pt(v: Vec2) -> Point {
    Point::new(v.x as f64, v.y as f64)
}

pub fn shape_to_path(shape: &ShapeData) -> BezPath {
    let mut bp = BezPath::new();
    let count = shape.vertices.len();
    if count == 0 {
        return bp;
    }
    bp.move_to(pt(shape.vertices[0]));
    for i in 0..count {
        let next = (i + 1) % count;
        if next == 0 && !shape.closed {
            break;
        }
        let p0 = shape.vertices[i];
        let p1 = shape.vertices[next];
        let out = shape.out_tangents.get(i).copied().unwrap_or(Vec2::ZERO);
        let inn = shape.in_tangents.get(next).copied().unwrap_or(Vec2::ZERO);
        if out == Vec2::ZERO && inn == Vec2::ZERO {
            bp.line_to(pt(p1));
        } else {
            bp.curve_to(pt(p0 + out), pt(p1 + inn), pt(p1));
        }
    }
    if shape.closed {
        bp.close_path();
    }
    bp
}

/// Rounded rectangle around `center`.
///
/// Starts on the right edge, `radius` below the top-right corner, and runs
/// clockwise (counter-clockwise when `reversed`). Dash phase and trim offsets
/// depend on this start point.
pub fn rounded_rect(center: Vec2, size: Vec2, radius: f32, reversed: bool) -> BezPath {
    let hw = (size.x / 2.0) as f64;
    let hh = (size.y / 2.0) as f64;
    let r = (radius.max(0.0) as f64).min(hw.min(hh));
    let (cx, cy) = (center.x as f64, center.y as f64);
    let (left, right, top, bottom) = (cx - hw, cx + hw, cy - hh, cy + hh);

    let mut path = BezPath::new();
    let corner = |path: &mut BezPath, center: Point, start_angle: f64, sweep: f64| {
        if r > 0.0 {
            let arc = Arc {
                center,
                radii: kurbo::Vec2::new(r, r),
                start_angle,
                sweep_angle: sweep,
                x_rotation: 0.0,
            };
            path.extend(arc.append_iter(ARC_TOLERANCE));
        }
    };

    path.move_to(Point::new(right, top + r));
    if !reversed {
        path.line_to(Point::new(right, bottom - r));
        corner(&mut path, Point::new(right - r, bottom - r), 0.0, FRAC_PI_2);
        path.line_to(Point::new(left + r, bottom));
        corner(&mut path, Point::new(left + r, bottom - r), FRAC_PI_2, FRAC_PI_2);
        path.line_to(Point::new(left, top + r));
        corner(&mut path, Point::new(left + r, top + r), 2.0 * FRAC_PI_2, FRAC_PI_2);
        path.line_to(Point::new(right - r, top));
        corner(&mut path, Point::new(right - r, top + r), 3.0 * FRAC_PI_2, FRAC_PI_2);
    } else {
        corner(&mut path, Point::new(right - r, top + r), 0.0, -FRAC_PI_2);
        path.line_to(Point::new(left + r, top));
        corner(&mut path, Point::new(left + r, top + r), 3.0 * FRAC_PI_2, -FRAC_PI_2);
        path.line_to(Point::new(left, bottom - r));
        corner(&mut path, Point::new(left + r, bottom - r), 2.0 * FRAC_PI_2, -FRAC_PI_2);
        path.line_to(Point::new(right - r, bottom));
        corner(&mut path, Point::new(right - r, bottom - r), FRAC_PI_2, -FRAC_PI_2);
    }
    path.close_path();
    path
}

/// Four cubic quarter arcs starting at the top.
pub fn ellipse(center: Vec2, size: Vec2, reversed: bool) -> BezPath {
    let hw = (size.x / 2.0) as f64;
    let hh = (size.y / 2.0) as f64;
    let cw = hw * ELLIPSE_CONTROL_POINT;
    let ch = hh * ELLIPSE_CONTROL_POINT;
    let (cx, cy) = (center.x as f64, center.y as f64);
    let p = |x: f64, y: f64| Point::new(cx + x, cy + y);

    let mut path = BezPath::new();
    path.move_to(p(0.0, -hh));
    if reversed {
        path.curve_to(p(-cw, -hh), p(-hw, -ch), p(-hw, 0.0));
        path.curve_to(p(-hw, ch), p(-cw, hh), p(0.0, hh));
        path.curve_to(p(cw, hh), p(hw, ch), p(hw, 0.0));
        path.curve_to(p(hw, -ch), p(cw, -hh), p(0.0, -hh));
    } else {
        path.curve_to(p(cw, -hh), p(hw, -ch), p(hw, 0.0));
        path.curve_to(p(hw, ch), p(cw, hh), p(0.0, hh));
        path.curve_to(p(-cw, hh), p(-hw, ch), p(-hw, 0.0));
        path.curve_to(p(-hw, -ch), p(-cw, -hh), p(0.0, -hh));
    }
    path.close_path();
    path
}

/// Segments of a path grouped by subpath, closing lines included.
fn contours(path: &BezPath) -> Vec<Vec<PathSeg>> {
    let mut out: Vec<Vec<PathSeg>> = Vec::new();
    let mut start = Point::ZERO;
    let mut last = Point::ZERO;
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                out.push(Vec::new());
                start = p;
                last = p;
            }
            PathEl::LineTo(p) => {
                push_seg(&mut out, PathSeg::Line(kurbo::Line::new(last, p)));
                last = p;
            }
            PathEl::QuadTo(p1, p2) => {
                push_seg(&mut out, PathSeg::Quad(kurbo::QuadBez::new(last, p1, p2)));
                last = p2;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                push_seg(&mut out, PathSeg::Cubic(kurbo::CubicBez::new(last, p1, p2, p3)));
                last = p3;
            }
            PathEl::ClosePath => {
                if last != start {
                    push_seg(&mut out, PathSeg::Line(kurbo::Line::new(last, start)));
                }
                last = start;
            }
        }
    }
    out
}

fn push_seg(out: &mut Vec<Vec<PathSeg>>, seg: PathSeg) {
    match out.last_mut() {
        Some(contour) => contour.push(seg),
        None => out.push(vec![seg]),
    }
}

pub fn path_length(path: &BezPath) -> f64 {
    contours(path)
        .iter()
        .flatten()
        .map(|seg| seg.arclen(ARCLEN_ACCURACY))
        .sum()
}

/// The part of `path` between two arc lengths, measured across all subpaths
/// as one run. Pieces keep their subpath breaks.
fn segment(contours: &[Vec<PathSeg>], lengths: &[Vec<f64>], from: f64, to: f64, out: &mut BezPath) {
    let mut offset = 0.0;
    for (contour, seg_lengths) in contours.iter().zip(lengths) {
        let mut pen: Option<Point> = None;
        for (seg, &len) in contour.iter().zip(seg_lengths) {
            let seg_start = offset;
            let seg_end = offset + len;
            offset = seg_end;
            let lo = from.max(seg_start);
            let hi = to.min(seg_end);
            if hi <= lo || len <= 0.0 {
                continue;
            }
            let t0 = if lo <= seg_start {
                0.0
            } else {
                seg.inv_arclen(lo - seg_start, ARCLEN_ACCURACY)
            };
            let t1 = if hi >= seg_end {
                1.0
            } else {
                seg.inv_arclen(hi - seg_start, ARCLEN_ACCURACY)
            };
            let piece = seg.subsegment(t0..t1);
            let start = piece.start();
            if pen.map_or(true, |p| p.distance(start) > 1e-6) {
                out.move_to(start);
            }
            match piece {
                PathSeg::Line(l) => out.line_to(l.p1),
                PathSeg::Quad(q) => out.quad_to(q.p1, q.p2),
                PathSeg::Cubic(c) => out.curve_to(c.p1, c.p2, c.p3),
            }
            pen = Some(piece.end());
        }
    }
}

/// Trims `path` to `[start, end]` of its length, shifted by `offset`; all
/// three are fractions of the full length and the window wraps around.
/// `start == end` leaves nothing; a full window leaves the path alone.
pub fn trim_path(path: &BezPath, start: f32, end: f32, offset: f32) -> BezPath {
    let contours = contours(path);
    let lengths: Vec<Vec<f64>> = contours
        .iter()
        .map(|c| c.iter().map(|seg| seg.arclen(ARCLEN_ACCURACY)).collect())
        .collect();
    let total: f64 = lengths.iter().flatten().sum();

    let (start, end, offset) = (start as f64, end as f64, offset as f64);
    if total <= 0.0 || ((end - start).abs() - 1.0).abs() < 0.01 {
        return path.clone();
    }
    if (start - end).abs() < f64::EPSILON {
        return BezPath::new();
    }

    let shift = offset * total;
    let mut lo = start.min(end) * total + shift;
    let mut hi = start.max(end) * total + shift;
    if lo >= total && hi >= total {
        lo = lo.rem_euclid(total);
        hi = hi.rem_euclid(total);
    }
    if lo < 0.0 {
        lo = lo.rem_euclid(total);
    }
    if hi < 0.0 {
        hi = hi.rem_euclid(total);
    }
    if (lo - hi).abs() < f64::EPSILON {
        return BezPath::new();
    }
    if lo > hi {
        lo -= total;
    }

    let mut out = BezPath::new();
    if lo < 0.0 {
        segment(&contours, &lengths, total + lo, total, &mut out);
        segment(&contours, &lengths, 0.0, hi, &mut out);
    } else if hi > total {
        segment(&contours, &lengths, lo, total, &mut out);
        segment(&contours, &lengths, 0.0, hi - total, &mut out);
    } else {
        segment(&contours, &lengths, lo, hi, &mut out);
    }
    out
}
