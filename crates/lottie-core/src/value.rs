//! Semantic value types carried by animated properties, and how two of them
//! blend.

use glam::{Vec2, Vec4};
use lottie_data::model as data;

pub trait Interpolatable: Sized + Clone + PartialEq + Default {
    fn lerp(&self, other: &Self, t: f32) -> Self;

    /// Interpolation along a spatial curve. `tan_out` leaves `self`, `tan_in`
    /// arrives at `other`; both are relative to their vertex.
    fn lerp_spatial(
        &self,
        other: &Self,
        t: f32,
        _tan_out: Option<Vec2>,
        _tan_in: Option<Vec2>,
    ) -> Self {
        self.lerp(other, t)
    }
}

impl Interpolatable for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolatable for Vec2 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec2::lerp(*self, *other, t)
    }

    fn lerp_spatial(
        &self,
        other: &Self,
        t: f32,
        tan_out: Option<Vec2>,
        tan_in: Option<Vec2>,
    ) -> Self {
        let p0 = *self;
        let p3 = *other;
        let p1 = p0 + tan_out.unwrap_or(Vec2::ZERO);
        let p2 = p3 + tan_in.unwrap_or(Vec2::ZERO);

        let one_minus_t = 1.0 - t;
        let one_minus_t_sq = one_minus_t * one_minus_t;
        let one_minus_t_cub = one_minus_t_sq * one_minus_t;

        let t_sq = t * t;
        let t_cub = t_sq * t;

        p0 * one_minus_t_cub
            + p1 * 3.0 * one_minus_t_sq * t
            + p2 * 3.0 * one_minus_t * t_sq
            + p3 * t_cub
    }
}

/// RGBA, each channel in 0..=1. Interpolated channel-wise.
impl Interpolatable for Vec4 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec4::lerp(*self, *other, t)
    }
}

/// Gradient stops. Positions and colors are parallel arrays.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GradientColor {
    pub positions: Vec<f32>,
    pub colors: Vec<Vec4>,
}

impl GradientColor {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Interpolatable for GradientColor {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        // Stops correspond by index; an exporter never changes the stop count
        // within one track, so extra stops are dropped rather than invented.
        let count = self.len().min(other.len());
        GradientColor {
            positions: (0..count)
                .map(|i| self.positions[i].lerp(&other.positions[i], t))
                .collect(),
            colors: (0..count)
                .map(|i| self.colors[i].lerp(other.colors[i], t))
                .collect(),
        }
    }
}

/// A cubic spline: vertices with in/out tangents relative to each vertex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShapeData {
    pub closed: bool,
    pub vertices: Vec<Vec2>,
    pub in_tangents: Vec<Vec2>,
    pub out_tangents: Vec<Vec2>,
}

impl ShapeData {
    pub fn from_model(path: &data::BezierPath, scale: f32) -> Self {
        let conv = |pts: &[data::Vec2]| -> Vec<Vec2> {
            pts.iter().map(|p| Vec2::from(*p) * scale).collect()
        };
        ShapeData {
            closed: path.c,
            vertices: conv(&path.v),
            in_tangents: conv(&path.i),
            out_tangents: conv(&path.o),
        }
    }
}

impl Interpolatable for ShapeData {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        // Point-wise by index. Vertex counts should match; when they don't,
        // the shorter shape wins.
        let count = self.vertices.len().min(other.vertices.len());
        if count == 0 {
            return self.clone();
        }

        let pick = |list: &[Vec2], i: usize| list.get(i).copied().unwrap_or(Vec2::ZERO);
        let mut out = ShapeData {
            closed: self.closed || other.closed,
            vertices: Vec::with_capacity(count),
            in_tangents: Vec::with_capacity(count),
            out_tangents: Vec::with_capacity(count),
        };
        for i in 0..count {
            out.vertices
                .push(self.vertices[i].lerp(other.vertices[i], t));
            out.in_tangents
                .push(pick(&self.in_tangents, i).lerp(pick(&other.in_tangents, i), t));
            out.out_tangents
                .push(pick(&self.out_tangents, i).lerp(pick(&other.out_tangents, i), t));
        }
        out
    }
}

// Value parsers: raw document value + resolution scale -> semantic value.

pub fn parse_point(raw: &[f32], scale: f32) -> Vec2 {
    let x = raw.first().copied().unwrap_or(0.0);
    let y = raw.get(1).copied().unwrap_or(0.0);
    Vec2::new(x, y) * scale
}

/// Colors arrive either normalized or as 0..255 bytes. Anything above 1 means
/// bytes. A missing alpha is opaque in either range.
pub fn parse_color(raw: &[f32]) -> Vec4 {
    let r = raw.first().copied().unwrap_or(0.0);
    let g = raw.get(1).copied().unwrap_or(0.0);
    let b = raw.get(2).copied().unwrap_or(0.0);
    let alpha = raw.get(3).copied();
    let bytes = r.max(g).max(b).max(alpha.unwrap_or(0.0)) > 1.0;
    let unit = if bytes { 255.0 } else { 1.0 };
    Vec4::new(r / unit, g / unit, b / unit, alpha.map_or(1.0, |a| a / unit))
}

/// Gradient stops are `[pos, r, g, b] * count` followed by optional `[pos, a]` pairs.
pub fn parse_gradient(raw: &[f32], color_count: usize) -> GradientColor {
    let mut gradient = GradientColor::default();
    let color_data_len = (color_count * 4).min(raw.len() - raw.len() % 4);
    for chunk in raw[..color_data_len].chunks_exact(4) {
        gradient.positions.push(chunk[0]);
        gradient
            .colors
            .push(parse_color(&[chunk[1], chunk[2], chunk[3]]));
    }

    let alpha_stops: Vec<(f32, f32)> = raw[color_data_len..]
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect();
    if !alpha_stops.is_empty() {
        for (pos, color) in gradient.positions.iter().zip(gradient.colors.iter_mut()) {
            color.w = interpolate_alpha(&alpha_stops, *pos);
        }
    }
    gradient
}

fn interpolate_alpha(stops: &[(f32, f32)], t: f32) -> f32 {
    let Some(&(first_t, first_a)) = stops.first() else {
        return 1.0;
    };
    if t <= first_t {
        return first_a;
    }
    for pair in stops.windows(2) {
        let (t1, a1) = pair[0];
        let (t2, a2) = pair[1];
        if t <= t2 {
            let range = t2 - t1;
            let ratio = if range == 0.0 { 0.0 } else { (t - t1) / range };
            return a1 + (a2 - a1) * ratio;
        }
    }
    stops.last().map_or(1.0, |&(_, a)| a)
}
