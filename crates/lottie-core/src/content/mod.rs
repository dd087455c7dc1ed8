//! Live shape content of one layer instance.
//!
//! A [`ContentGroup`] mirrors a group of [`ShapeModel`]s with per-instance
//! animation state. Evaluating it walks the items in document order: path
//! generators add to the active geometry, paints cover whatever is active
//! at their position, and modifiers rewrite what came before them.

mod generator;
mod modifier;
mod paint;

pub use generator::{EllipseContent, PathContent, RectangleContent};
pub use modifier::{RepeaterContent, TrimContent};
pub use paint::{FillContent, GradientFillContent, GradientStrokeContent, StrokeContent};

use crate::observer::{ChangeListener, ContentInvalidator, RedrawRequests};
use crate::renderer::{mat3_to_affine, opacity_to_u8, MergeMode, ShapeGeometry, ShapeNode};
use crate::shape::{ShapeModel, TrimMode};
use crate::transform::TransformAnimation;
use std::sync::Arc;

/// Trim window as fractions of the path length; `offset` is in turns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimValues {
    pub start: f32,
    pub end: f32,
    pub offset: f32,
}

#[derive(Debug)]
pub enum Content {
    Group(ContentGroup),
    Rectangle(RectangleContent),
    Ellipse(EllipseContent),
    Path(PathContent),
    Fill(FillContent),
    Stroke(StrokeContent),
    GradientFill(GradientFillContent),
    GradientStroke(GradientStrokeContent),
    Trim(TrimContent),
    Repeater(RepeaterContent),
    Merge(MergeMode),
}

impl Content {
    fn set_progress(&mut self, progress: f32) -> bool {
        match self {
            Content::Group(g) => g.set_progress(progress),
            Content::Rectangle(c) => c.set_progress(progress),
            Content::Ellipse(c) => c.set_progress(progress),
            Content::Path(c) => c.set_progress(progress),
            Content::Fill(c) => c.set_progress(progress),
            Content::Stroke(c) => c.set_progress(progress),
            Content::GradientFill(c) => c.set_progress(progress),
            Content::GradientStroke(c) => c.set_progress(progress),
            Content::Trim(c) => c.set_progress(progress),
            Content::Repeater(c) => c.set_progress(progress),
            Content::Merge(_) => false,
        }
    }

    fn simultaneous_trim(&self) -> Option<&TrimContent> {
        match self {
            Content::Trim(t) if t.mode == TrimMode::Simultaneous => Some(t),
            _ => None,
        }
    }

    fn trim_slot(&mut self) -> Option<&mut Option<usize>> {
        match self {
            Content::Group(g) => Some(&mut g.trim_index),
            Content::Rectangle(c) => Some(&mut c.trim_index),
            Content::Ellipse(c) => Some(&mut c.trim_index),
            Content::Path(c) => Some(&mut c.trim_index),
            _ => None,
        }
    }

    fn trim_index(&self) -> Option<usize> {
        match self {
            Content::Group(g) => g.trim_index,
            Content::Rectangle(c) => c.trim_index,
            Content::Ellipse(c) => c.trim_index,
            Content::Path(c) => c.trim_index,
            _ => None,
        }
    }
}

/// Evaluation result of a group.
#[derive(Debug, Default)]
pub struct GroupOutput {
    /// Painter's order, in the coordinate space of the group's parent.
    pub nodes: Vec<ShapeNode>,
    /// Geometry still active after the group, for paints further up.
    pub geometry: Vec<ShapeGeometry>,
}

#[derive(Debug)]
pub struct ContentGroup {
    pub name: String,
    contents: Vec<Content>,
    transform: Option<TransformAnimation>,
    /// Simultaneous trim among this group's siblings that applies to it.
    trim_index: Option<usize>,
    /// Forwards changes that do not flow through a generator's own cache.
    invalidator: Arc<ContentInvalidator>,
}

impl ContentGroup {
    pub fn new(name: &str, items: &[ShapeModel], redraw: &RedrawRequests) -> Self {
        let invalidator = ContentInvalidator::new(Some(redraw.clone()));
        let group_listener: Arc<dyn ChangeListener> = invalidator.clone();
        let mut transform = None;
        let mut contents = Vec::with_capacity(items.len());

        for item in items {
            let content = match item {
                ShapeModel::Group(g) => Content::Group(ContentGroup::new(&g.name, &g.items, redraw)),
                ShapeModel::Rectangle(m) => Content::Rectangle(RectangleContent::new(m, redraw)),
                ShapeModel::Ellipse(m) => Content::Ellipse(EllipseContent::new(m, redraw)),
                ShapeModel::Path(m) => Content::Path(PathContent::new(m, redraw)),
                ShapeModel::Fill(m) => Content::Fill(FillContent::new(m)),
                ShapeModel::Stroke(m) => Content::Stroke(StrokeContent::new(m)),
                ShapeModel::GradientFill(m) => Content::GradientFill(GradientFillContent::new(m)),
                ShapeModel::GradientStroke(m) => {
                    Content::GradientStroke(GradientStrokeContent::new(m))
                }
                ShapeModel::Trim(m) => Content::Trim(TrimContent::new(m)),
                ShapeModel::Repeater(m) => Content::Repeater(RepeaterContent::new(m)),
                ShapeModel::Merge(m) => Content::Merge(m.mode),
                ShapeModel::Transform(m) => {
                    let mut animation = m.create_animation();
                    animation.add_listener(&group_listener);
                    transform = Some(animation);
                    continue;
                }
            };
            contents.push(content);
        }

        let mut group = ContentGroup {
            name: name.to_string(),
            contents,
            transform,
            trim_index: None,
            invalidator,
        };
        group.bind_trims();
        group.subscribe_paints();
        group
    }

    /// Each generator and child group takes the nearest simultaneous trim
    /// before it, or failing that the nearest one after it, and listens to it.
    fn bind_trims(&mut self) {
        let trims: Vec<usize> = self
            .contents
            .iter()
            .enumerate()
            .filter(|(_, c)| c.simultaneous_trim().is_some())
            .map(|(i, _)| i)
            .collect();
        if trims.is_empty() {
            return;
        }

        for i in 0..self.contents.len() {
            let bound = trims
                .iter()
                .rev()
                .find(|&&t| t < i)
                .or_else(|| trims.iter().find(|&&t| t > i))
                .copied();
            let Some(trim) = bound else { continue };
            let listener: Arc<dyn ChangeListener> = match &self.contents[i] {
                Content::Rectangle(c) => c.listener(),
                Content::Ellipse(c) => c.listener(),
                Content::Path(c) => c.listener(),
                Content::Group(g) => g.invalidator.clone(),
                _ => continue,
            };
            if let Some(slot) = self.contents[i].trim_slot() {
                *slot = Some(trim);
            }
            if let Content::Trim(t) = &mut self.contents[trim] {
                t.add_listener(&listener);
            }
        }
    }

    fn subscribe_paints(&mut self) {
        let listener: Arc<dyn ChangeListener> = self.invalidator.clone();
        for content in &mut self.contents {
            match content {
                Content::Fill(c) => c.add_listener(&listener),
                Content::Stroke(c) => c.add_listener(&listener),
                Content::GradientFill(c) => c.add_listener(&listener),
                Content::GradientStroke(c) => c.add_listener(&listener),
                Content::Repeater(c) => c.add_listener(&listener),
                Content::Trim(c) if c.mode == TrimMode::Individually => c.add_listener(&listener),
                _ => {}
            }
        }
    }

    pub fn contents(&self) -> &[Content] {
        &self.contents
    }

    pub fn contents_mut(&mut self) -> &mut [Content] {
        &mut self.contents
    }

    pub fn set_progress(&mut self, progress: f32) -> bool {
        let mut changed = match &mut self.transform {
            Some(t) => t.set_progress(progress),
            None => false,
        };
        for content in &mut self.contents {
            changed |= content.set_progress(progress);
        }
        changed
    }

    fn trim_values(&self, index: usize) -> Option<TrimValues> {
        let trim = self.contents.get(index)?.trim_index()?;
        self.contents.get(trim)?.simultaneous_trim().map(TrimContent::values)
    }

    /// Resolves the group at the current progress. `inherited` is the trim
    /// bound to this group in its parent, used by items with no trim of
    /// their own.
    pub fn evaluate(&mut self, inherited: Option<TrimValues>) -> GroupOutput {
        self.invalidator.dirty().take();
        let mut blocks: Vec<Vec<ShapeNode>> = Vec::new();
        let mut active: Vec<ShapeGeometry> = Vec::new();

        for i in 0..self.contents.len() {
            let trim = self.trim_values(i).or(inherited);
            match &mut self.contents[i] {
                Content::Rectangle(c) => active.push(ShapeGeometry::Path(c.path(trim).clone())),
                Content::Ellipse(c) => active.push(ShapeGeometry::Path(c.path(trim).clone())),
                Content::Path(c) => active.push(ShapeGeometry::Path(c.path(trim).clone())),
                Content::Group(g) => {
                    let out = g.evaluate(trim);
                    active.extend(out.geometry);
                    if !out.nodes.is_empty() {
                        blocks.push(out.nodes);
                    }
                }
                Content::Fill(c) => paint_active(&mut blocks, &active, |g| c.paint(g)),
                Content::Stroke(c) => paint_active(&mut blocks, &active, |g| c.paint(g)),
                Content::GradientFill(c) => paint_active(&mut blocks, &active, |g| c.paint(g)),
                Content::GradientStroke(c) => paint_active(&mut blocks, &active, |g| c.paint(g)),
                Content::Trim(t) => {
                    if t.mode == TrimMode::Individually {
                        active = t.apply_individually(std::mem::take(&mut active));
                    }
                }
                Content::Repeater(r) => {
                    let (repeated_blocks, repeated) =
                        r.apply(std::mem::take(&mut blocks), std::mem::take(&mut active));
                    blocks = repeated_blocks;
                    active = repeated;
                }
                Content::Merge(mode) => {
                    if active.len() > 1 {
                        let shapes = std::mem::take(&mut active);
                        active.push(match mode {
                            MergeMode::Merge => ShapeGeometry::combine(shapes),
                            mode => ShapeGeometry::Boolean { mode: *mode, shapes },
                        });
                    }
                }
            }
        }

        // Later items sit below earlier ones.
        let mut nodes: Vec<ShapeNode> = blocks.into_iter().rev().flatten().collect();
        if let Some(transform) = &self.transform {
            let matrix = transform.matrix();
            let alpha = transform.opacity();
            for node in &mut nodes {
                node.transform = matrix * node.transform;
                node.opacity = opacity_to_u8(node.opacity as f32 / 255.0 * alpha);
            }
            let affine = mat3_to_affine(matrix);
            for shape in &mut active {
                shape.apply_affine(affine);
            }
        }
        GroupOutput {
            nodes,
            geometry: active,
        }
    }

    /// True when some animation feeding this group changed since the last
    /// evaluation.
    pub fn needs_evaluation(&self) -> bool {
        self.invalidator.dirty().is_dirty()
            || self.contents.iter().any(|c| match c {
                Content::Group(g) => g.needs_evaluation(),
                Content::Rectangle(c) => c.is_dirty(),
                Content::Ellipse(c) => c.is_dirty(),
                Content::Path(c) => c.is_dirty(),
                _ => false,
            })
    }
}

fn paint_active(
    blocks: &mut Vec<Vec<ShapeNode>>,
    active: &[ShapeGeometry],
    paint: impl FnOnce(ShapeGeometry) -> ShapeNode,
) {
    if active.is_empty() {
        return;
    }
    blocks.push(vec![paint(ShapeGeometry::combine(active.to_vec()))]);
}
