use crate::animation::AnimatableValue;
use crate::composition::ParseContext;
use crate::shape::{parse_shapes, ShapeModel};
use crate::transform::TransformModel;
use glam::Vec4;
use lottie_data::model as data;

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Shape,
    Image {
        ref_id: String,
    },
    Solid {
        color: Vec4,
        width: f32,
        height: f32,
    },
    Null,
    Text {
        document: Option<serde_json::Value>,
    },
    PreComp {
        ref_id: String,
        width: f32,
        height: f32,
        /// Seconds into the precomposition, when remapped.
        time_remap: Option<AnimatableValue<f32>>,
    },
    Unknown(u8),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Unique within its composition or precomposition; parents refer to it.
    pub id: Option<i64>,
    pub name: String,
    pub kind: LayerKind,
    pub in_frame: f32,
    pub out_frame: f32,
    pub start_time: f32,
    pub time_stretch: f32,
    pub parent: Option<i64>,
    pub hidden: bool,
    pub transform: TransformModel,
    pub shapes: Vec<ShapeModel>,
}

impl Layer {
    pub fn from_model(layer: &data::Layer, ctx: &mut ParseContext<'_>) -> Self {
        let name = layer.nm.clone().unwrap_or_default();
        ctx.layer_name = name.clone();
        let timeline = ctx.timeline;
        let scale = ctx.scale;

        let kind = match layer.ty {
            0 => LayerKind::PreComp {
                ref_id: layer.ref_id.clone().unwrap_or_default(),
                width: layer.w.unwrap_or(0) as f32 * scale,
                height: layer.h.unwrap_or(0) as f32 * scale,
                time_remap: layer
                    .tm
                    .as_ref()
                    .map(|tm| AnimatableValue::from_property(tm, timeline, scale, 0.0, |v, _| *v)),
            },
            1 => LayerKind::Solid {
                color: layer.color.as_deref().map(parse_hex_color).unwrap_or(Vec4::ZERO),
                width: layer.sw.unwrap_or(0) as f32 * scale,
                height: layer.sh.unwrap_or(0) as f32 * scale,
            },
            2 => LayerKind::Image {
                ref_id: layer.ref_id.clone().unwrap_or_default(),
            },
            3 => LayerKind::Null,
            4 => LayerKind::Shape,
            5 => LayerKind::Text {
                document: layer.t.clone(),
            },
            other => {
                ctx.warn(format!("Unknown layer type {other}"));
                LayerKind::Unknown(other)
            }
        };

        let shapes = match (&kind, &layer.shapes) {
            (LayerKind::Shape, Some(shapes)) => parse_shapes(shapes, ctx),
            _ => Vec::new(),
        };

        Layer {
            id: layer.ind,
            name,
            kind,
            in_frame: layer.ip,
            out_frame: layer.op,
            start_time: layer.st,
            time_stretch: if layer.sr == 0.0 { 1.0 } else { layer.sr },
            parent: layer.parent,
            hidden: layer.hd.unwrap_or(false),
            transform: TransformModel::from_model(&layer.ks, timeline, scale),
            shapes,
        }
    }

    /// Frame of the containing composition mapped into this layer's own time.
    pub fn local_frame(&self, frame: f32) -> f32 {
        (frame - self.start_time) / self.time_stretch
    }

    /// Layers show from their in frame up to, not including, their out frame.
    pub fn is_visible_at(&self, frame: f32) -> bool {
        !self.hidden && frame >= self.in_frame && frame < self.out_frame
    }
}

/// `#rrggbb` or `#rrggbbaa`. Unparseable input yields transparent black.
pub fn parse_hex_color(hex: &str) -> Vec4 {
    let digits = hex.trim_start_matches('#');
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .map(|v| v as f32 / 255.0)
    };
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Vec4::new(r, g, b, channel(6).unwrap_or(1.0)),
        _ => Vec4::ZERO,
    }
}
