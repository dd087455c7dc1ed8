use crate::animation::{AnimatableValue, KeyframeAnimation};
use crate::keyframe::Timeline;
use crate::observer::ChangeListener;
use glam::{Mat3, Vec2};
use lottie_data::model as data;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum PositionModel {
    Unified(AnimatableValue<Vec2>),
    Split {
        x: AnimatableValue<f32>,
        y: AnimatableValue<f32>,
    },
}

/// Anchor, position, scale (percent), rotation (degrees) and opacity (percent).
#[derive(Debug, Clone, PartialEq)]
pub struct TransformModel {
    pub anchor: AnimatableValue<Vec2>,
    pub position: PositionModel,
    pub scale: AnimatableValue<Vec2>,
    pub rotation: AnimatableValue<f32>,
    pub opacity: AnimatableValue<f32>,
}

impl Default for TransformModel {
    fn default() -> Self {
        TransformModel {
            anchor: AnimatableValue::Constant(Vec2::ZERO),
            position: PositionModel::Unified(AnimatableValue::Constant(Vec2::ZERO)),
            scale: AnimatableValue::Constant(Vec2::splat(100.0)),
            rotation: AnimatableValue::Constant(0.0),
            opacity: AnimatableValue::Constant(100.0),
        }
    }
}

impl TransformModel {
    pub fn from_model(t: &data::Transform, timeline: Timeline, scale: f32) -> Self {
        let point = |v: &data::Vec3DefaultZero, s: f32| Vec2::new(v.0[0], v.0[1]) * s;
        let position = match &t.p {
            data::PositionProperty::Unified(p) => {
                PositionModel::Unified(AnimatableValue::from_property(p, timeline, scale, Vec2::ZERO, point))
            }
            data::PositionProperty::Split { x, y } => PositionModel::Split {
                x: AnimatableValue::from_property(x, timeline, scale, 0.0, |v, s| v * s),
                y: AnimatableValue::from_property(y, timeline, scale, 0.0, |v, s| v * s),
            },
        };
        TransformModel {
            anchor: AnimatableValue::from_property(&t.a, timeline, scale, Vec2::ZERO, point),
            position,
            scale: AnimatableValue::from_property(&t.s, timeline, scale, Vec2::splat(100.0), |v, _| {
                Vec2::new(v.0[0], v.0[1])
            }),
            rotation: AnimatableValue::from_property(&t.r, timeline, scale, 0.0, |v, _| *v),
            opacity: AnimatableValue::from_property(&t.o, timeline, scale, 100.0, |v, _| *v),
        }
    }

    pub fn create_animation(&self) -> TransformAnimation {
        TransformAnimation {
            anchor: self.anchor.create_animation(),
            position: match &self.position {
                PositionModel::Unified(p) => PositionAnimation::Unified(p.create_animation()),
                PositionModel::Split { x, y } => PositionAnimation::Split {
                    x: x.create_animation(),
                    y: y.create_animation(),
                },
            },
            scale: self.scale.create_animation(),
            rotation: self.rotation.create_animation(),
            opacity: self.opacity.create_animation(),
        }
    }
}

#[derive(Debug)]
enum PositionAnimation {
    Unified(KeyframeAnimation<Vec2>),
    Split {
        x: KeyframeAnimation<f32>,
        y: KeyframeAnimation<f32>,
    },
}

/// Live transform of a layer, group or repeater.
#[derive(Debug)]
pub struct TransformAnimation {
    anchor: KeyframeAnimation<Vec2>,
    position: PositionAnimation,
    scale: KeyframeAnimation<Vec2>,
    rotation: KeyframeAnimation<f32>,
    opacity: KeyframeAnimation<f32>,
}

impl TransformAnimation {
    pub fn set_progress(&mut self, progress: f32) -> bool {
        let mut changed = self.anchor.set_progress(progress);
        changed |= match &mut self.position {
            PositionAnimation::Unified(p) => p.set_progress(progress),
            PositionAnimation::Split { x, y } => x.set_progress(progress) | y.set_progress(progress),
        };
        changed |= self.scale.set_progress(progress);
        changed |= self.rotation.set_progress(progress);
        changed |= self.opacity.set_progress(progress);
        changed
    }

    pub fn add_listener(&mut self, listener: &Arc<dyn ChangeListener>) {
        self.anchor.add_listener(listener);
        match &mut self.position {
            PositionAnimation::Unified(p) => {
                p.add_listener(listener);
            }
            PositionAnimation::Split { x, y } => {
                x.add_listener(listener);
                y.add_listener(listener);
            }
        }
        self.scale.add_listener(listener);
        self.rotation.add_listener(listener);
        self.opacity.add_listener(listener);
    }

    pub fn anchor(&self) -> Vec2 {
        *self.anchor.value()
    }

    pub fn position(&self) -> Vec2 {
        match &self.position {
            PositionAnimation::Unified(p) => *p.value(),
            PositionAnimation::Split { x, y } => Vec2::new(*x.value(), *y.value()),
        }
    }

    /// Scale as a factor, 1.0 being 100%.
    pub fn scale(&self) -> Vec2 {
        *self.scale.value() / 100.0
    }

    pub fn rotation_degrees(&self) -> f32 {
        *self.rotation.value()
    }

    /// Opacity in 0..=1.
    pub fn opacity(&self) -> f32 {
        (*self.opacity.value() / 100.0).clamp(0.0, 1.0)
    }

    /// `T(position) * R(rotation) * S(scale) * T(-anchor)`
    pub fn matrix(&self) -> Mat3 {
        Mat3::from_translation(self.position())
            * Mat3::from_angle(self.rotation_degrees().to_radians())
            * Mat3::from_scale(self.scale())
            * Mat3::from_translation(-self.anchor())
    }

    /// Matrix of repeater copy number `amount` (fractional when offset):
    /// position and rotation are multiplied, scale is raised to the power.
    pub fn repeater_matrix(&self, amount: f32) -> Mat3 {
        let scale = self.scale();
        let anchor = self.anchor();
        Mat3::from_translation(self.position() * amount)
            * Mat3::from_scale(Vec2::new(scale.x.powf(amount), scale.y.powf(amount)))
            * Mat3::from_translation(anchor)
            * Mat3::from_angle((self.rotation_degrees() * amount).to_radians())
            * Mat3::from_translation(-anchor)
    }
}
