//! Per-frame output handed to an external rasterizer.

use crate::value::GradientColor;
use glam::{Mat3, Vec2, Vec4};
use kurbo::BezPath;
use serde::Serialize;

#[derive(Debug, Clone, Default)]
pub struct RenderTree {
    pub width: f32,
    pub height: f32,
    /// Painter's order: the first layer is drawn first.
    pub layers: Vec<RenderLayer>,
}

#[derive(Debug, Clone)]
pub struct RenderLayer {
    pub id: Option<i64>,
    pub name: String,
    /// Layer-to-composition matrix, parents included.
    pub transform: Mat3,
    pub opacity: u8,
    pub content: LayerContent,
}

#[derive(Debug, Clone)]
pub enum LayerContent {
    Shapes(Vec<ShapeNode>),
    Image { asset_id: String, width: f32, height: f32 },
    Solid { color: Vec4, width: f32, height: f32 },
    /// Text documents are laid out by the host.
    Text(Option<serde_json::Value>),
    PreComp(Vec<RenderLayer>),
}

#[derive(Debug, Clone)]
pub struct ShapeNode {
    pub geometry: ShapeGeometry,
    /// Group chain matrix, relative to the owning layer.
    pub transform: Mat3,
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
    pub opacity: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    Path(BezPath),
    Boolean {
        mode: MergeMode,
        shapes: Vec<ShapeGeometry>,
    },
}

impl ShapeGeometry {
    /// Every subpath of the geometry in one path. Boolean modes are left to
    /// the renderer; this is the `Merge` reading.
    pub fn to_path(&self) -> BezPath {
        match self {
            ShapeGeometry::Path(path) => path.clone(),
            ShapeGeometry::Boolean { shapes, .. } => {
                let mut out = BezPath::new();
                for shape in shapes {
                    out.extend(shape.to_path().elements().iter().copied());
                }
                out
            }
        }
    }

    pub fn apply_affine(&mut self, affine: kurbo::Affine) {
        match self {
            ShapeGeometry::Path(path) => path.apply_affine(affine),
            ShapeGeometry::Boolean { shapes, .. } => {
                for shape in shapes {
                    shape.apply_affine(affine);
                }
            }
        }
    }

    /// Combines a group's active geometry into the single shape a paint covers.
    pub fn combine(mut shapes: Vec<ShapeGeometry>) -> ShapeGeometry {
        if shapes.len() == 1 {
            if let Some(only) = shapes.pop() {
                return only;
            }
        }
        if shapes.iter().all(|s| matches!(s, ShapeGeometry::Path(_))) {
            let mut out = BezPath::new();
            for shape in &shapes {
                if let ShapeGeometry::Path(path) = shape {
                    out.extend(path.elements().iter().copied());
                }
            }
            return ShapeGeometry::Path(out);
        }
        ShapeGeometry::Boolean {
            mode: MergeMode::Merge,
            shapes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub paint: Paint,
    pub rule: FillRule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub paint: Paint,
    pub width: f32,
    pub cap: LineCap,
    pub join: LineJoin,
    pub miter_limit: f32,
    pub dash: Option<DashPattern>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Vec4),
    Gradient(Gradient),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    pub kind: GradientKind,
    pub start: Vec2,
    pub end: Vec2,
    pub stops: GradientColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GradientKind {
    Linear,
    Radial,
}

impl GradientKind {
    pub fn from_code(code: u8) -> Self {
        if code == 2 {
            GradientKind::Radial
        } else {
            GradientKind::Linear
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashPattern {
    pub array: Vec<f32>,
    pub offset: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl FillRule {
    pub fn from_code(code: Option<u8>) -> Self {
        match code {
            Some(2) => FillRule::EvenOdd,
            _ => FillRule::NonZero,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => LineCap::Butt,
            3 => LineCap::Square,
            _ => LineCap::Round,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => LineJoin::Miter,
            3 => LineJoin::Bevel,
            _ => LineJoin::Round,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MergeMode {
    Merge,
    Add,
    Subtract,
    Intersect,
    Exclude,
}

impl MergeMode {
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => MergeMode::Add,
            3 => MergeMode::Subtract,
            4 => MergeMode::Intersect,
            5 => MergeMode::Exclude,
            _ => MergeMode::Merge,
        }
    }
}

/// glam column-major 3x3 to kurbo's `[a b c d e f]`.
pub fn mat3_to_affine(m: Mat3) -> kurbo::Affine {
    kurbo::Affine::new([
        m.x_axis.x as f64,
        m.x_axis.y as f64,
        m.y_axis.x as f64,
        m.y_axis.y as f64,
        m.z_axis.x as f64,
        m.z_axis.y as f64,
    ])
}

/// Opacity in 0..=1 to the 0..=255 the renderer expects.
pub fn opacity_to_u8(opacity: f32) -> u8 {
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}

// Flat summaries for diagnostics and the CLI's JSON output.

#[derive(Debug, Clone, Serialize)]
pub struct RenderTreeSummary {
    pub width: f32,
    pub height: f32,
    pub layers: Vec<LayerSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerSummary {
    pub id: Option<i64>,
    pub name: String,
    pub opacity: u8,
    pub transform: [f32; 6],
    pub kind: &'static str,
    pub shapes: Vec<ShapeSummary>,
    pub children: Vec<LayerSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShapeSummary {
    pub svg: String,
    pub bounds: [f64; 4],
    pub fill: Option<[f32; 4]>,
    pub stroke_width: Option<f32>,
    pub fill_rule: FillRule,
    pub opacity: u8,
}

impl RenderTree {
    pub fn summary(&self) -> RenderTreeSummary {
        RenderTreeSummary {
            width: self.width,
            height: self.height,
            layers: self.layers.iter().map(RenderLayer::summary).collect(),
        }
    }
}

impl RenderLayer {
    pub fn summary(&self) -> LayerSummary {
        let m = self.transform;
        let (kind, shapes, children) = match &self.content {
            LayerContent::Shapes(nodes) => (
                "shape",
                nodes.iter().map(ShapeNode::summary).collect(),
                Vec::new(),
            ),
            LayerContent::Image { .. } => ("image", Vec::new(), Vec::new()),
            LayerContent::Solid { .. } => ("solid", Vec::new(), Vec::new()),
            LayerContent::Text(_) => ("text", Vec::new(), Vec::new()),
            LayerContent::PreComp(layers) => (
                "precomp",
                Vec::new(),
                layers.iter().map(RenderLayer::summary).collect(),
            ),
        };
        LayerSummary {
            id: self.id,
            name: self.name.clone(),
            opacity: self.opacity,
            transform: [
                m.x_axis.x, m.x_axis.y, m.y_axis.x, m.y_axis.y, m.z_axis.x, m.z_axis.y,
            ],
            kind,
            shapes,
            children,
        }
    }
}

impl ShapeNode {
    pub fn summary(&self) -> ShapeSummary {
        use kurbo::Shape as _;
        let path = self.geometry.to_path();
        let bounds = path.bounding_box();
        let fill = self.fill.as_ref().and_then(|f| match &f.paint {
            Paint::Solid(c) => Some(c.to_array()),
            Paint::Gradient(_) => None,
        });
        ShapeSummary {
            svg: path.to_svg(),
            bounds: [bounds.x0, bounds.y0, bounds.x1, bounds.y1],
            fill,
            stroke_width: self.stroke.as_ref().map(|s| s.width),
            fill_rule: self.fill.as_ref().map(|f| f.rule).unwrap_or_default(),
            opacity: self.opacity,
        }
    }
}
