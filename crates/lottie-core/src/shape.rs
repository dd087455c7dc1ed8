//! Immutable shape content models, parsed once per composition.

use crate::animation::AnimatableValue;
use crate::composition::ParseContext;
use crate::renderer::{FillRule, GradientKind, LineCap, LineJoin, MergeMode};
use crate::transform::TransformModel;
use crate::value::{parse_color, parse_gradient, parse_point, GradientColor, ShapeData};
use glam::{Vec2, Vec4};
use lottie_data::model as data;

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeModel {
    Group(GroupModel),
    Rectangle(RectangleModel),
    Ellipse(EllipseModel),
    Path(PathModel),
    Fill(FillModel),
    Stroke(StrokeModel),
    GradientFill(GradientFillModel),
    GradientStroke(GradientStrokeModel),
    Transform(TransformModel),
    Trim(TrimModel),
    Repeater(RepeaterModel),
    Merge(MergeModel),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupModel {
    pub name: String,
    pub items: Vec<ShapeModel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RectangleModel {
    pub name: String,
    /// Center.
    pub position: AnimatableValue<Vec2>,
    pub size: AnimatableValue<Vec2>,
    pub radius: AnimatableValue<f32>,
    pub reversed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EllipseModel {
    pub name: String,
    pub position: AnimatableValue<Vec2>,
    pub size: AnimatableValue<Vec2>,
    pub reversed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathModel {
    pub name: String,
    pub shape: AnimatableValue<ShapeData>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillModel {
    pub color: AnimatableValue<Vec4>,
    pub opacity: AnimatableValue<f32>,
    pub rule: FillRule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashKind {
    Dash,
    Gap,
    Offset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub width: AnimatableValue<f32>,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f32,
    pub dashes: Vec<(DashKind, AnimatableValue<f32>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeModel {
    pub color: AnimatableValue<Vec4>,
    pub opacity: AnimatableValue<f32>,
    pub style: StrokeStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientModel {
    pub kind: GradientKind,
    pub start: AnimatableValue<Vec2>,
    pub end: AnimatableValue<Vec2>,
    pub colors: AnimatableValue<GradientColor>,
    pub opacity: AnimatableValue<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientFillModel {
    pub gradient: GradientModel,
    pub rule: FillRule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientStrokeModel {
    pub gradient: GradientModel,
    pub style: StrokeStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimMode {
    /// Every path is trimmed on its own.
    Simultaneous,
    /// All paths of the group are trimmed as one continuous length.
    Individually,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrimModel {
    /// Percent.
    pub start: AnimatableValue<f32>,
    /// Percent.
    pub end: AnimatableValue<f32>,
    /// Degrees; 360 is one full path length.
    pub offset: AnimatableValue<f32>,
    pub mode: TrimMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeaterModel {
    pub copies: AnimatableValue<f32>,
    pub offset: AnimatableValue<f32>,
    pub transform: TransformModel,
    pub start_opacity: AnimatableValue<f32>,
    pub end_opacity: AnimatableValue<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeModel {
    pub mode: MergeMode,
}

fn scalar(v: &f32, _scale: f32) -> f32 {
    *v
}

fn scaled(v: &f32, scale: f32) -> f32 {
    *v * scale
}

fn point(v: &data::MultiDimensional, scale: f32) -> Vec2 {
    parse_point(v, scale)
}

fn color(v: &data::MultiDimensional, _scale: f32) -> Vec4 {
    parse_color(v)
}

/// Parses one `it`/`shapes` list. Hidden items are dropped here and unknown
/// ones are reported once on the composition.
pub fn parse_shapes(shapes: &[data::Shape], ctx: &mut ParseContext<'_>) -> Vec<ShapeModel> {
    shapes
        .iter()
        .filter_map(|shape| parse_shape(shape, ctx))
        .collect()
}

fn is_hidden(hd: Option<bool>) -> bool {
    hd.unwrap_or(false)
}

fn parse_shape(shape: &data::Shape, ctx: &mut ParseContext<'_>) -> Option<ShapeModel> {
    let timeline = ctx.timeline;
    let scale = ctx.scale;
    let model = match shape {
        data::Shape::Group(g) => {
            if is_hidden(g.hd) {
                return None;
            }
            ShapeModel::Group(GroupModel {
                name: g.nm.clone().unwrap_or_default(),
                items: parse_shapes(&g.it, ctx),
            })
        }
        data::Shape::Rect(r) => {
            if is_hidden(r.hd) {
                return None;
            }
            let radius = match &r.r {
                Some(prop) => AnimatableValue::from_property(prop, timeline, scale, 0.0, scaled),
                None => AnimatableValue::Constant(0.0),
            };
            ShapeModel::Rectangle(RectangleModel {
                name: r.nm.clone().unwrap_or_default(),
                position: AnimatableValue::from_property(&r.p, timeline, scale, Vec2::ZERO, point),
                size: AnimatableValue::from_property(&r.s, timeline, scale, Vec2::ZERO, point),
                radius,
                reversed: r.d == Some(3),
            })
        }
        data::Shape::Ellipse(e) => {
            if is_hidden(e.hd) {
                return None;
            }
            ShapeModel::Ellipse(EllipseModel {
                name: e.nm.clone().unwrap_or_default(),
                position: AnimatableValue::from_property(&e.p, timeline, scale, Vec2::ZERO, point),
                size: AnimatableValue::from_property(&e.s, timeline, scale, Vec2::ZERO, point),
                reversed: e.d == Some(3),
            })
        }
        data::Shape::Path(p) => {
            if is_hidden(p.hd) {
                return None;
            }
            ShapeModel::Path(PathModel {
                name: p.nm.clone().unwrap_or_default(),
                shape: AnimatableValue::from_property(
                    &p.ks,
                    timeline,
                    scale,
                    ShapeData::default(),
                    ShapeData::from_model,
                ),
            })
        }
        data::Shape::Fill(f) => {
            if is_hidden(f.hd) {
                return None;
            }
            ShapeModel::Fill(FillModel {
                color: AnimatableValue::from_property(&f.c, timeline, scale, Vec4::ONE, color),
                opacity: AnimatableValue::from_property(&f.o, timeline, scale, 100.0, scalar),
                rule: FillRule::from_code(f.r),
            })
        }
        data::Shape::Stroke(s) => {
            if is_hidden(s.hd) {
                return None;
            }
            ShapeModel::Stroke(StrokeModel {
                color: AnimatableValue::from_property(&s.c, timeline, scale, Vec4::ONE, color),
                opacity: AnimatableValue::from_property(&s.o, timeline, scale, 100.0, scalar),
                style: StrokeStyle {
                    width: AnimatableValue::from_property(&s.w, timeline, scale, 1.0, scaled),
                    cap: LineCap::from_code(s.lc),
                    join: LineJoin::from_code(s.lj),
                    miter_limit: s.ml.unwrap_or(4.0),
                    dashes: parse_dashes(&s.d, ctx),
                },
            })
        }
        data::Shape::GradientFill(g) => {
            if is_hidden(g.hd) {
                return None;
            }
            ShapeModel::GradientFill(GradientFillModel {
                gradient: GradientModel {
                    kind: GradientKind::from_code(g.t),
                    start: AnimatableValue::from_property(&g.s, timeline, scale, Vec2::ZERO, point),
                    end: AnimatableValue::from_property(&g.e, timeline, scale, Vec2::ZERO, point),
                    colors: parse_gradient_colors(&g.g, ctx),
                    opacity: AnimatableValue::from_property(&g.o, timeline, scale, 100.0, scalar),
                },
                rule: FillRule::from_code(g.r),
            })
        }
        data::Shape::GradientStroke(g) => {
            if is_hidden(g.hd) {
                return None;
            }
            ShapeModel::GradientStroke(GradientStrokeModel {
                gradient: GradientModel {
                    kind: GradientKind::from_code(g.t),
                    start: AnimatableValue::from_property(&g.s, timeline, scale, Vec2::ZERO, point),
                    end: AnimatableValue::from_property(&g.e, timeline, scale, Vec2::ZERO, point),
                    colors: parse_gradient_colors(&g.g, ctx),
                    opacity: AnimatableValue::from_property(&g.o, timeline, scale, 100.0, scalar),
                },
                style: StrokeStyle {
                    width: AnimatableValue::from_property(&g.w, timeline, scale, 1.0, scaled),
                    cap: LineCap::from_code(g.lc),
                    join: LineJoin::from_code(g.lj),
                    miter_limit: g.ml.unwrap_or(4.0),
                    dashes: parse_dashes(&g.d, ctx),
                },
            })
        }
        data::Shape::Transform(t) => {
            ShapeModel::Transform(TransformModel::from_model(&t.t, timeline, scale))
        }
        data::Shape::Trim(t) => {
            if is_hidden(t.hd) {
                return None;
            }
            ShapeModel::Trim(TrimModel {
                start: AnimatableValue::from_property(&t.s, timeline, scale, 0.0, scalar),
                end: AnimatableValue::from_property(&t.e, timeline, scale, 100.0, scalar),
                offset: AnimatableValue::from_property(&t.o, timeline, scale, 0.0, scalar),
                mode: if t.m == 2 {
                    TrimMode::Individually
                } else {
                    TrimMode::Simultaneous
                },
            })
        }
        data::Shape::Repeater(r) => {
            if is_hidden(r.hd) {
                return None;
            }
            ShapeModel::Repeater(RepeaterModel {
                copies: AnimatableValue::from_property(&r.c, timeline, scale, 1.0, scalar),
                offset: AnimatableValue::from_property(&r.o, timeline, scale, 0.0, scalar),
                transform: TransformModel::from_model(&r.tr.t, timeline, scale),
                start_opacity: AnimatableValue::from_property(&r.tr.so, timeline, scale, 100.0, scalar),
                end_opacity: AnimatableValue::from_property(&r.tr.eo, timeline, scale, 100.0, scalar),
            })
        }
        data::Shape::MergePaths(m) => {
            if is_hidden(m.hd) {
                return None;
            }
            ShapeModel::Merge(MergeModel {
                mode: MergeMode::from_code(m.mm),
            })
        }
        data::Shape::Unknown => {
            ctx.warn(format!("Unknown shape type in layer {}", ctx.layer_name));
            return None;
        }
    };
    Some(model)
}

fn parse_dashes(
    dashes: &[data::DashProperty],
    ctx: &mut ParseContext<'_>,
) -> Vec<(DashKind, AnimatableValue<f32>)> {
    dashes
        .iter()
        .filter_map(|dash| {
            let kind = match dash.n.as_deref() {
                Some("d") | Some("v") => DashKind::Dash,
                Some("g") => DashKind::Gap,
                Some("o") => DashKind::Offset,
                _ => return None,
            };
            let value = AnimatableValue::from_property(&dash.v, ctx.timeline, ctx.scale, 0.0, scaled);
            Some((kind, value))
        })
        .collect()
}

fn parse_gradient_colors(
    colors: &data::GradientColors,
    ctx: &mut ParseContext<'_>,
) -> AnimatableValue<GradientColor> {
    let count = colors.p as usize;
    AnimatableValue::from_property(
        &colors.k,
        ctx.timeline,
        ctx.scale,
        GradientColor::default(),
        move |raw: &Vec<f32>, _| parse_gradient(raw, count),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyframe::Timeline;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn parse(value: serde_json::Value, scale: f32) -> (Vec<ShapeModel>, BTreeSet<String>) {
        let shapes: Vec<data::Shape> = serde_json::from_value(value).unwrap();
        let mut warnings = BTreeSet::new();
        let mut ctx = ParseContext::new(Timeline::new(0.0, 60.0, 30.0), scale, &mut warnings);
        let models = parse_shapes(&shapes, &mut ctx);
        (models, warnings)
    }

    #[test]
    fn test_spatial_values_are_scaled() {
        let (models, _) = parse(
            json!([{ "ty": "rc", "p": { "k": [10, 20] }, "s": { "k": [100, 50] }, "r": { "k": 4 } }]),
            2.0,
        );
        match &models[0] {
            ShapeModel::Rectangle(r) => {
                assert_eq!(r.position, AnimatableValue::Constant(Vec2::new(20.0, 40.0)));
                assert_eq!(r.size, AnimatableValue::Constant(Vec2::new(200.0, 100.0)));
                assert_eq!(r.radius, AnimatableValue::Constant(8.0));
            }
            other => panic!("expected rectangle, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_radius_defaults_to_zero() {
        let (models, _) = parse(json!([{ "ty": "rc", "p": { "k": [0, 0] }, "s": { "k": [10, 10] } }]), 1.0);
        let ShapeModel::Rectangle(r) = &models[0] else {
            panic!("expected rectangle");
        };
        assert_eq!(r.radius, AnimatableValue::Constant(0.0));
    }

    #[test]
    fn test_hidden_and_unknown_items_are_dropped() {
        let (models, warnings) = parse(
            json!([
                { "ty": "fl", "hd": true, "c": { "k": [1, 0, 0, 1] }, "o": { "k": 100 } },
                { "ty": "zz" },
                { "ty": "tm", "s": { "k": 0 }, "e": { "k": 50 }, "o": { "k": 0 }, "m": 2 }
            ]),
            1.0,
        );
        assert_eq!(models.len(), 1);
        assert!(matches!(&models[0], ShapeModel::Trim(t) if t.mode == TrimMode::Individually));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_stroke_dashes() {
        let (models, _) = parse(
            json!([{
                "ty": "st", "c": { "k": [0, 0, 0, 1] }, "o": { "k": 100 }, "w": { "k": 3 }, "lc": 1, "lj": 3,
                "d": [{ "n": "d", "v": { "k": 4 } }, { "n": "g", "v": { "k": 2 } }, { "n": "o", "v": { "k": 1 } }]
            }]),
            1.0,
        );
        let ShapeModel::Stroke(s) = &models[0] else {
            panic!("expected stroke");
        };
        assert_eq!(s.style.cap, LineCap::Butt);
        assert_eq!(s.style.join, LineJoin::Bevel);
        assert_eq!(s.style.dashes.len(), 3);
        assert_eq!(s.style.dashes[2].0, DashKind::Offset);
    }
}
