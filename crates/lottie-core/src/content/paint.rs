use crate::animation::KeyframeAnimation;
use crate::observer::ChangeListener;
use crate::renderer::{
    opacity_to_u8, DashPattern, Fill, FillRule, Gradient, GradientKind, LineCap, LineJoin, Paint,
    ShapeGeometry, ShapeNode, Stroke,
};
use crate::shape::{
    DashKind, FillModel, GradientFillModel, GradientModel, GradientStrokeModel, StrokeModel,
    StrokeStyle,
};
use crate::value::GradientColor;
use glam::{Mat3, Vec2, Vec4};
use std::sync::Arc;

fn node(geometry: ShapeGeometry, fill: Option<Fill>, stroke: Option<Stroke>, opacity: f32) -> ShapeNode {
    ShapeNode {
        geometry,
        transform: Mat3::IDENTITY,
        fill,
        stroke,
        opacity: opacity_to_u8(opacity / 100.0),
    }
}

#[derive(Debug)]
pub struct FillContent {
    color: KeyframeAnimation<Vec4>,
    opacity: KeyframeAnimation<f32>,
    rule: FillRule,
}

impl FillContent {
    pub fn new(model: &FillModel) -> Self {
        FillContent {
            color: model.color.create_animation(),
            opacity: model.opacity.create_animation(),
            rule: model.rule,
        }
    }

    pub fn set_progress(&mut self, progress: f32) -> bool {
        self.color.set_progress(progress) | self.opacity.set_progress(progress)
    }

    pub fn add_listener(&mut self, listener: &Arc<dyn ChangeListener>) {
        self.color.add_listener(listener);
        self.opacity.add_listener(listener);
    }

    pub fn paint(&self, geometry: ShapeGeometry) -> ShapeNode {
        let fill = Fill {
            paint: Paint::Solid(*self.color.value()),
            rule: self.rule,
        };
        node(geometry, Some(fill), None, *self.opacity.value())
    }
}

/// Width, caps, joins and dashes shared by solid and gradient strokes.
#[derive(Debug)]
struct StrokeStyleAnimation {
    width: KeyframeAnimation<f32>,
    cap: LineCap,
    join: LineJoin,
    miter_limit: f32,
    dashes: Vec<(DashKind, KeyframeAnimation<f32>)>,
}

impl StrokeStyleAnimation {
    fn new(style: &StrokeStyle) -> Self {
        StrokeStyleAnimation {
            width: style.width.create_animation(),
            cap: style.cap,
            join: style.join,
            miter_limit: style.miter_limit,
            dashes: style
                .dashes
                .iter()
                .map(|(kind, value)| (*kind, value.create_animation()))
                .collect(),
        }
    }

    fn set_progress(&mut self, progress: f32) -> bool {
        let mut changed = self.width.set_progress(progress);
        for (_, dash) in &mut self.dashes {
            changed |= dash.set_progress(progress);
        }
        changed
    }

    fn add_listener(&mut self, listener: &Arc<dyn ChangeListener>) {
        self.width.add_listener(listener);
        for (_, dash) in &mut self.dashes {
            dash.add_listener(listener);
        }
    }

    fn stroke(&self, paint: Paint) -> Stroke {
        Stroke {
            paint,
            width: *self.width.value(),
            cap: self.cap,
            join: self.join,
            miter_limit: self.miter_limit,
            dash: self.resolve_dash(),
        }
    }

    fn resolve_dash(&self) -> Option<DashPattern> {
        let mut array = Vec::new();
        let mut offset = 0.0;
        for (kind, value) in &self.dashes {
            match kind {
                DashKind::Offset => offset = *value.value(),
                DashKind::Dash | DashKind::Gap => array.push(*value.value()),
            }
        }
        if array.is_empty() {
            return None;
        }
        if array.len() % 2 != 0 {
            let clone = array.clone();
            array.extend(clone);
        }
        let total: f32 = array.iter().sum();
        offset = if total > 0.0 { offset.rem_euclid(total) } else { 0.0 };
        Some(DashPattern { array, offset })
    }
}

#[derive(Debug)]
pub struct StrokeContent {
    color: KeyframeAnimation<Vec4>,
    opacity: KeyframeAnimation<f32>,
    style: StrokeStyleAnimation,
}

impl StrokeContent {
    pub fn new(model: &StrokeModel) -> Self {
        StrokeContent {
            color: model.color.create_animation(),
            opacity: model.opacity.create_animation(),
            style: StrokeStyleAnimation::new(&model.style),
        }
    }

    pub fn set_progress(&mut self, progress: f32) -> bool {
        let mut changed = self.color.set_progress(progress);
        changed |= self.opacity.set_progress(progress);
        changed |= self.style.set_progress(progress);
        changed
    }

    pub fn add_listener(&mut self, listener: &Arc<dyn ChangeListener>) {
        self.color.add_listener(listener);
        self.opacity.add_listener(listener);
        self.style.add_listener(listener);
    }

    pub fn paint(&self, geometry: ShapeGeometry) -> ShapeNode {
        let stroke = self.style.stroke(Paint::Solid(*self.color.value()));
        node(geometry, None, Some(stroke), *self.opacity.value())
    }
}

#[derive(Debug)]
struct GradientAnimation {
    kind: GradientKind,
    start: KeyframeAnimation<Vec2>,
    end: KeyframeAnimation<Vec2>,
    colors: KeyframeAnimation<GradientColor>,
    opacity: KeyframeAnimation<f32>,
}

impl GradientAnimation {
    fn new(model: &GradientModel) -> Self {
        GradientAnimation {
            kind: model.kind,
            start: model.start.create_animation(),
            end: model.end.create_animation(),
            colors: model.colors.create_animation(),
            opacity: model.opacity.create_animation(),
        }
    }

    fn set_progress(&mut self, progress: f32) -> bool {
        let mut changed = self.start.set_progress(progress);
        changed |= self.end.set_progress(progress);
        changed |= self.colors.set_progress(progress);
        changed |= self.opacity.set_progress(progress);
        changed
    }

    fn add_listener(&mut self, listener: &Arc<dyn ChangeListener>) {
        self.start.add_listener(listener);
        self.end.add_listener(listener);
        self.colors.add_listener(listener);
        self.opacity.add_listener(listener);
    }

    fn paint(&self) -> Paint {
        Paint::Gradient(Gradient {
            kind: self.kind,
            start: *self.start.value(),
            end: *self.end.value(),
            stops: self.colors.value().clone(),
        })
    }
}

#[derive(Debug)]
pub struct GradientFillContent {
    gradient: GradientAnimation,
    rule: FillRule,
}

impl GradientFillContent {
    pub fn new(model: &GradientFillModel) -> Self {
        GradientFillContent {
            gradient: GradientAnimation::new(&model.gradient),
            rule: model.rule,
        }
    }

    pub fn set_progress(&mut self, progress: f32) -> bool {
        self.gradient.set_progress(progress)
    }

    pub fn add_listener(&mut self, listener: &Arc<dyn ChangeListener>) {
        self.gradient.add_listener(listener);
    }

    pub fn paint(&self, geometry: ShapeGeometry) -> ShapeNode {
        let fill = Fill {
            paint: self.gradient.paint(),
            rule: self.rule,
        };
        node(geometry, Some(fill), None, *self.gradient.opacity.value())
    }
}

#[derive(Debug)]
pub struct GradientStrokeContent {
    gradient: GradientAnimation,
    style: StrokeStyleAnimation,
}

impl GradientStrokeContent {
    pub fn new(model: &GradientStrokeModel) -> Self {
        GradientStrokeContent {
            gradient: GradientAnimation::new(&model.gradient),
            style: StrokeStyleAnimation::new(&model.style),
        }
    }

    pub fn set_progress(&mut self, progress: f32) -> bool {
        self.gradient.set_progress(progress) | self.style.set_progress(progress)
    }

    pub fn add_listener(&mut self, listener: &Arc<dyn ChangeListener>) {
        self.gradient.add_listener(listener);
        self.style.add_listener(listener);
    }

    pub fn paint(&self, geometry: ShapeGeometry) -> ShapeNode {
        let stroke = self.style.stroke(self.gradient.paint());
        node(geometry, None, Some(stroke), *self.gradient.opacity.value())
    }
}
