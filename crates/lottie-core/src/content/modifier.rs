use super::TrimValues;
use crate::animation::KeyframeAnimation;
use crate::observer::ChangeListener;
use crate::path_ops::trim_path;
use crate::renderer::{mat3_to_affine, opacity_to_u8, ShapeGeometry, ShapeNode};
use crate::shape::{RepeaterModel, TrimMode, TrimModel};
use crate::transform::TransformAnimation;
use kurbo::BezPath;
use std::sync::Arc;

#[derive(Debug)]
pub struct TrimContent {
    start: KeyframeAnimation<f32>,
    end: KeyframeAnimation<f32>,
    offset: KeyframeAnimation<f32>,
    pub mode: TrimMode,
}

impl TrimContent {
    pub fn new(model: &TrimModel) -> Self {
        TrimContent {
            start: model.start.create_animation(),
            end: model.end.create_animation(),
            offset: model.offset.create_animation(),
            mode: model.mode,
        }
    }

    pub fn set_progress(&mut self, progress: f32) -> bool {
        let mut changed = self.start.set_progress(progress);
        changed |= self.end.set_progress(progress);
        changed |= self.offset.set_progress(progress);
        changed
    }

    pub fn add_listener(&mut self, listener: &Arc<dyn ChangeListener>) {
        self.start.add_listener(listener);
        self.end.add_listener(listener);
        self.offset.add_listener(listener);
    }

    pub fn values(&self) -> TrimValues {
        TrimValues {
            start: *self.start.value() / 100.0,
            end: *self.end.value() / 100.0,
            offset: *self.offset.value() / 360.0,
        }
    }

    /// Trims everything drawn so far as one continuous length.
    pub fn apply_individually(&self, geometry: Vec<ShapeGeometry>) -> Vec<ShapeGeometry> {
        if geometry.is_empty() {
            return geometry;
        }
        let mut joined = BezPath::new();
        for shape in &geometry {
            joined.extend(shape.to_path().elements().iter().copied());
        }
        let values = self.values();
        vec![ShapeGeometry::Path(trim_path(
            &joined,
            values.start,
            values.end,
            values.offset,
        ))]
    }
}

#[derive(Debug)]
pub struct RepeaterContent {
    copies: KeyframeAnimation<f32>,
    offset: KeyframeAnimation<f32>,
    transform: TransformAnimation,
    start_opacity: KeyframeAnimation<f32>,
    end_opacity: KeyframeAnimation<f32>,
}

impl RepeaterContent {
    pub fn new(model: &RepeaterModel) -> Self {
        RepeaterContent {
            copies: model.copies.create_animation(),
            offset: model.offset.create_animation(),
            transform: model.transform.create_animation(),
            start_opacity: model.start_opacity.create_animation(),
            end_opacity: model.end_opacity.create_animation(),
        }
    }

    pub fn set_progress(&mut self, progress: f32) -> bool {
        let mut changed = self.copies.set_progress(progress);
        changed |= self.offset.set_progress(progress);
        changed |= self.transform.set_progress(progress);
        changed |= self.start_opacity.set_progress(progress);
        changed |= self.end_opacity.set_progress(progress);
        changed
    }

    pub fn add_listener(&mut self, listener: &Arc<dyn ChangeListener>) {
        self.copies.add_listener(listener);
        self.offset.add_listener(listener);
        self.transform.add_listener(listener);
        self.start_opacity.add_listener(listener);
        self.end_opacity.add_listener(listener);
    }

    pub fn copies(&self) -> usize {
        self.copies.value().max(0.0) as usize
    }

    /// Opacity of copy `index`, 0..=1.
    fn copy_opacity(&self, index: usize, copies: usize) -> f32 {
        let t = index as f32 / copies as f32;
        let start = *self.start_opacity.value() / 100.0;
        let end = *self.end_opacity.value() / 100.0;
        start + (end - start) * t
    }

    /// Replaces everything drawn so far with its copies. `blocks` is in
    /// document order; the result is a single block already in painter's
    /// order, the last copy at the bottom.
    pub fn apply(
        &self,
        blocks: Vec<Vec<ShapeNode>>,
        geometry: Vec<ShapeGeometry>,
    ) -> (Vec<Vec<ShapeNode>>, Vec<ShapeGeometry>) {
        let copies = self.copies();
        let offset = *self.offset.value();
        let mut painted = Vec::new();
        let mut repeated = Vec::new();

        for index in (0..copies).rev() {
            let matrix = self.transform.repeater_matrix(index as f32 + offset);
            let alpha = self.copy_opacity(index, copies);
            for node in blocks.iter().rev().flatten() {
                let mut node = node.clone();
                node.transform = matrix * node.transform;
                node.opacity = opacity_to_u8(node.opacity as f32 / 255.0 * alpha);
                painted.push(node);
            }
        }
        for index in 0..copies {
            let affine = mat3_to_affine(self.transform.repeater_matrix(index as f32 + offset));
            for shape in &geometry {
                let mut shape = shape.clone();
                shape.apply_affine(affine);
                repeated.push(shape);
            }
        }

        let blocks = if painted.is_empty() { Vec::new() } else { vec![painted] };
        (blocks, repeated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimatableValue;
    use crate::path_ops::path_length;
    use crate::transform::TransformModel;
    use glam::{Mat3, Vec2};
    use kurbo::Shape;

    fn repeater(copies: f32, position: Vec2, eo: f32) -> RepeaterContent {
        let mut transform = TransformModel::default();
        transform.position = crate::transform::PositionModel::Unified(AnimatableValue::Constant(position));
        RepeaterContent::new(&RepeaterModel {
            copies: AnimatableValue::Constant(copies),
            offset: AnimatableValue::Constant(0.0),
            transform,
            start_opacity: AnimatableValue::Constant(100.0),
            end_opacity: AnimatableValue::Constant(eo),
        })
    }

    fn square() -> ShapeGeometry {
        ShapeGeometry::Path(kurbo::Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1))
    }

    fn node() -> ShapeNode {
        ShapeNode {
            geometry: square(),
            transform: Mat3::IDENTITY,
            fill: None,
            stroke: None,
            opacity: 255,
        }
    }

    #[test]
    fn test_repeater_copies_in_painter_order() {
        let rep = repeater(3.0, Vec2::new(20.0, 0.0), 0.0);
        let (blocks, geometry) = rep.apply(vec![vec![node()]], vec![square()]);
        assert_eq!(blocks.len(), 1);
        let nodes = &blocks[0];
        assert_eq!(nodes.len(), 3);
        // Last copy first, original on top.
        assert_eq!(nodes[0].transform.transform_point2(Vec2::ZERO), Vec2::new(40.0, 0.0));
        assert_eq!(nodes[2].transform, Mat3::IDENTITY);
        assert_eq!(nodes[2].opacity, 255);
        assert_eq!(nodes[1].opacity, opacity_to_u8(2.0 / 3.0));
        assert_eq!(geometry.len(), 3);
        assert_eq!(geometry[1].to_path().bounding_box().x0, 20.0);
    }

    #[test]
    fn test_zero_copies_removes_content() {
        let rep = repeater(0.0, Vec2::ZERO, 100.0);
        let (blocks, geometry) = rep.apply(vec![vec![node()]], vec![square()]);
        assert!(blocks.is_empty());
        assert!(geometry.is_empty());
    }

    #[test]
    fn test_individual_trim_spans_all_paths() {
        let trim = TrimContent::new(&TrimModel {
            start: AnimatableValue::Constant(0.0),
            end: AnimatableValue::Constant(50.0),
            offset: AnimatableValue::Constant(0.0),
            mode: TrimMode::Individually,
        });
        let mut second = square();
        second.apply_affine(kurbo::Affine::translate((20.0, 0.0)));
        let trimmed = trim.apply_individually(vec![square(), second]);
        assert_eq!(trimmed.len(), 1);
        let path = trimmed[0].to_path();
        assert!((path_length(&path) - 40.0).abs() < 1e-6);
        // Only the first square survives.
        assert!(path.bounding_box().x1 <= 10.0 + 1e-9);
    }
}
