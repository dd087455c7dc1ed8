//! Path generators: each owns its animated parameters and a lazily rebuilt path.

use super::TrimValues;
use crate::animation::KeyframeAnimation;
use crate::observer::{ChangeListener, ContentInvalidator, RedrawRequests};
use crate::path_ops::{ellipse, rounded_rect, shape_to_path, trim_path};
use crate::shape::{EllipseModel, PathModel, RectangleModel};
use crate::value::ShapeData;
use glam::Vec2;
use kurbo::BezPath;
use std::sync::Arc;

/// Cached path plus the dirty flag its animations flip.
#[derive(Debug)]
pub(crate) struct PathCache {
    invalidator: Arc<ContentInvalidator>,
    path: Option<BezPath>,
    applied_trim: Option<TrimValues>,
    rebuilds: usize,
}

impl PathCache {
    fn new(redraw: &RedrawRequests) -> Self {
        PathCache {
            invalidator: ContentInvalidator::new(Some(redraw.clone())),
            path: None,
            applied_trim: None,
            rebuilds: 0,
        }
    }

    pub(crate) fn listener(&self) -> Arc<dyn ChangeListener> {
        self.invalidator.clone()
    }

    fn is_dirty(&self) -> bool {
        self.invalidator.dirty().is_dirty()
    }

    fn get(&mut self, trim: Option<TrimValues>, build: impl FnOnce() -> BezPath) -> &BezPath {
        let dirty = self.invalidator.dirty().take();
        if dirty || self.path.is_none() || self.applied_trim != trim {
            let mut path = build();
            if let Some(t) = trim {
                path = trim_path(&path, t.start, t.end, t.offset);
            }
            self.path = Some(path);
            self.applied_trim = trim;
            self.rebuilds += 1;
        }
        self.path.get_or_insert_with(BezPath::new)
    }
}

macro_rules! generator_common {
    () => {
        pub fn is_dirty(&self) -> bool {
            self.cache.is_dirty()
        }

        /// How many times the path has been rebuilt.
        pub fn rebuilds(&self) -> usize {
            self.cache.rebuilds
        }

        pub(crate) fn listener(&self) -> Arc<dyn ChangeListener> {
            self.cache.listener()
        }
    };
}

#[derive(Debug)]
pub struct RectangleContent {
    pub name: String,
    position: KeyframeAnimation<Vec2>,
    size: KeyframeAnimation<Vec2>,
    radius: KeyframeAnimation<f32>,
    reversed: bool,
    pub(crate) trim_index: Option<usize>,
    cache: PathCache,
}

impl RectangleContent {
    pub fn new(model: &RectangleModel, redraw: &RedrawRequests) -> Self {
        let cache = PathCache::new(redraw);
        let listener = cache.listener();
        let mut position = model.position.create_animation();
        let mut size = model.size.create_animation();
        let mut radius = model.radius.create_animation();
        position.add_listener(&listener);
        size.add_listener(&listener);
        radius.add_listener(&listener);
        RectangleContent {
            name: model.name.clone(),
            position,
            size,
            radius,
            reversed: model.reversed,
            trim_index: None,
            cache,
        }
    }

    pub fn set_progress(&mut self, progress: f32) -> bool {
        let mut changed = self.position.set_progress(progress);
        changed |= self.size.set_progress(progress);
        changed |= self.radius.set_progress(progress);
        changed
    }

    /// Radius actually used: never more than half the shorter side.
    pub fn effective_radius(&self) -> f32 {
        let size = *self.size.value();
        self.radius.value().max(0.0).min(size.x.min(size.y) / 2.0)
    }

    pub fn path(&mut self, trim: Option<TrimValues>) -> &BezPath {
        let (position, size, radius, reversed) = (
            *self.position.value(),
            *self.size.value(),
            *self.radius.value(),
            self.reversed,
        );
        self.cache
            .get(trim, || rounded_rect(position, size, radius, reversed))
    }

    generator_common!();
}

#[derive(Debug)]
pub struct EllipseContent {
    pub name: String,
    position: KeyframeAnimation<Vec2>,
    size: KeyframeAnimation<Vec2>,
    reversed: bool,
    pub(crate) trim_index: Option<usize>,
    cache: PathCache,
}

impl EllipseContent {
    pub fn new(model: &EllipseModel, redraw: &RedrawRequests) -> Self {
        let cache = PathCache::new(redraw);
        let listener = cache.listener();
        let mut position = model.position.create_animation();
        let mut size = model.size.create_animation();
        position.add_listener(&listener);
        size.add_listener(&listener);
        EllipseContent {
            name: model.name.clone(),
            position,
            size,
            reversed: model.reversed,
            trim_index: None,
            cache,
        }
    }

    pub fn set_progress(&mut self, progress: f32) -> bool {
        self.position.set_progress(progress) | self.size.set_progress(progress)
    }

    pub fn path(&mut self, trim: Option<TrimValues>) -> &BezPath {
        let (position, size, reversed) = (*self.position.value(), *self.size.value(), self.reversed);
        self.cache.get(trim, || ellipse(position, size, reversed))
    }

    generator_common!();
}

#[derive(Debug)]
pub struct PathContent {
    pub name: String,
    shape: KeyframeAnimation<ShapeData>,
    pub(crate) trim_index: Option<usize>,
    cache: PathCache,
}

impl PathContent {
    pub fn new(model: &PathModel, redraw: &RedrawRequests) -> Self {
        let cache = PathCache::new(redraw);
        let mut shape = model.shape.create_animation();
        shape.add_listener(&cache.listener());
        PathContent {
            name: model.name.clone(),
            shape,
            trim_index: None,
            cache,
        }
    }

    pub fn set_progress(&mut self, progress: f32) -> bool {
        self.shape.set_progress(progress)
    }

    pub fn path(&mut self, trim: Option<TrimValues>) -> &BezPath {
        let shape = &self.shape;
        self.cache.get(trim, || shape_to_path(shape.value()))
    }

    generator_common!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimatableValue;
    use crate::keyframe::Timeline;
    use crate::path_ops::path_length;
    use crate::value::parse_point;
    use lottie_data::model as data;
    use serde_json::json;

    fn rect_model(size: serde_json::Value, radius: f32) -> RectangleModel {
        let size: data::Property<Vec<f32>> = serde_json::from_value(json!({ "k": size })).unwrap();
        RectangleModel {
            name: "rect".into(),
            position: AnimatableValue::Constant(Vec2::new(50.0, 25.0)),
            size: AnimatableValue::from_property(
                &size,
                Timeline::new(0.0, 60.0, 30.0),
                1.0,
                Vec2::ZERO,
                |v, s| parse_point(v, s),
            ),
            radius: AnimatableValue::Constant(radius),
            reversed: false,
        }
    }

    #[test]
    fn test_radius_clamp() {
        let redraw = RedrawRequests::new();
        let rect = RectangleContent::new(&rect_model(json!([100, 50]), 40.0), &redraw);
        assert_eq!(rect.effective_radius(), 25.0);
    }

    #[test]
    fn test_path_is_rebuilt_only_after_change() {
        let redraw = RedrawRequests::new();
        let mut rect = RectangleContent::new(
            &rect_model(
                json!([{ "t": 0, "s": [100, 50], "e": [200, 50] }, { "t": 60 }]),
                0.0,
            ),
            &redraw,
        );

        let first = path_length(rect.path(None));
        assert!((first - 300.0).abs() < 1e-6);
        rect.path(None);
        assert_eq!(rect.rebuilds(), 1);

        assert!(rect.set_progress(0.5));
        assert!(rect.is_dirty());
        assert_eq!(redraw.take(), 1);
        let second = path_length(rect.path(None));
        assert!((second - 400.0).abs() < 1e-6);
        assert_eq!(rect.rebuilds(), 2);

        assert!(!rect.set_progress(0.5));
        assert!(!rect.is_dirty());
        assert_eq!(redraw.pending(), 0);
    }

    #[test]
    fn test_trim_change_rebuilds() {
        let redraw = RedrawRequests::new();
        let mut rect = RectangleContent::new(&rect_model(json!([100, 50]), 0.0), &redraw);
        let full = path_length(rect.path(None));
        let half = path_length(rect.path(Some(TrimValues {
            start: 0.0,
            end: 0.5,
            offset: 0.0,
        })));
        assert!((half * 2.0 - full).abs() < 1e-3);
        assert_eq!(rect.rebuilds(), 2);
    }
}
