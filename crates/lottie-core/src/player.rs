//! Per-instance live state of a composition and per-frame evaluation.

use crate::animation::KeyframeAnimation;
use crate::composition::{Composition, LayerList};
use crate::content::ContentGroup;
use crate::layer::{Layer, LayerKind};
use crate::observer::RedrawRequests;
use crate::renderer::{opacity_to_u8, LayerContent, RenderLayer, RenderTree};
use crate::transform::TransformAnimation;
use glam::{Mat3, Vec4};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug)]
enum LiveContent {
    Shapes(ContentGroup),
    Image { asset_id: String, width: f32, height: f32 },
    Solid { color: Vec4, width: f32, height: f32 },
    Text(Option<serde_json::Value>),
    PreComp {
        layers: Vec<LayerInstance>,
        time_remap: Option<KeyframeAnimation<f32>>,
    },
    Null,
}

/// One layer of one animation instance.
#[derive(Debug)]
pub struct LayerInstance {
    pub id: Option<i64>,
    pub name: String,
    parent: Option<i64>,
    in_frame: f32,
    out_frame: f32,
    start_time: f32,
    time_stretch: f32,
    hidden: bool,
    /// Frame in the containing composition at the last update.
    frame: f32,
    transform: TransformAnimation,
    content: LiveContent,
    redraw: RedrawRequests,
}

impl LayerInstance {
    fn new(layer: &Layer, composition: &Composition, precomp_stack: &mut Vec<String>) -> Self {
        let redraw = RedrawRequests::new();
        let content = match &layer.kind {
            LayerKind::Shape => LiveContent::Shapes(ContentGroup::new(&layer.name, &layer.shapes, &redraw)),
            LayerKind::Image { ref_id } => {
                let (width, height) = composition
                    .image(ref_id)
                    .map(|image| (image.width, image.height))
                    .unwrap_or_default();
                LiveContent::Image {
                    asset_id: ref_id.clone(),
                    width,
                    height,
                }
            }
            LayerKind::Solid { color, width, height } => LiveContent::Solid {
                color: *color,
                width: *width,
                height: *height,
            },
            LayerKind::Text { document } => LiveContent::Text(document.clone()),
            LayerKind::PreComp { ref_id, time_remap, .. } => {
                let layers = if precomp_stack.contains(ref_id) {
                    warn!(precomp = %ref_id, "Precomposition references itself; skipping");
                    Vec::new()
                } else if let Some(precomp) = composition.precomp(ref_id) {
                    precomp_stack.push(ref_id.clone());
                    let layers = instantiate(&precomp.layers, composition, precomp_stack);
                    precomp_stack.pop();
                    layers
                } else {
                    warn!(precomp = %ref_id, "Missing precomposition asset");
                    Vec::new()
                };
                LiveContent::PreComp {
                    layers,
                    time_remap: time_remap.as_ref().map(|tm| tm.create_animation()),
                }
            }
            LayerKind::Null | LayerKind::Unknown(_) => LiveContent::Null,
        };

        LayerInstance {
            id: layer.id,
            name: layer.name.clone(),
            parent: layer.parent,
            in_frame: layer.in_frame,
            out_frame: layer.out_frame,
            start_time: layer.start_time,
            time_stretch: layer.time_stretch,
            hidden: layer.hidden,
            frame: 0.0,
            transform: layer.transform.create_animation(),
            content,
            redraw,
        }
    }

    pub fn is_visible(&self) -> bool {
        !self.hidden && self.frame >= self.in_frame && self.frame < self.out_frame
    }

    pub fn local_frame(&self) -> f32 {
        (self.frame - self.start_time) / self.time_stretch
    }

    pub fn redraw_requests(&self) -> &RedrawRequests {
        &self.redraw
    }

    pub fn shapes(&self) -> Option<&ContentGroup> {
        match &self.content {
            LiveContent::Shapes(group) => Some(group),
            _ => None,
        }
    }

    fn set_frame(&mut self, frame: f32, composition: &Composition) -> bool {
        let was_visible = self.is_visible();
        self.frame = frame;
        let local_frame = self.local_frame();
        let progress = composition.progress_for_frame(local_frame);
        // Shape content raises its own requests through its invalidators.
        let mut own_changed = self.transform.set_progress(progress);
        own_changed |= self.is_visible() != was_visible;
        let mut content_changed = false;
        match &mut self.content {
            LiveContent::Shapes(group) => content_changed = group.set_progress(progress),
            LiveContent::PreComp { layers, time_remap } => {
                let child_frame = match time_remap {
                    Some(tm) => {
                        own_changed |= tm.set_progress(progress);
                        composition.start_frame() + *tm.value() * composition.frame_rate()
                    }
                    None => local_frame,
                };
                for layer in layers {
                    content_changed |= layer.set_frame(child_frame, composition);
                }
            }
            _ => {}
        }
        if own_changed {
            self.redraw.request();
        }
        own_changed || content_changed
    }

    fn pending_redraws(&self) -> usize {
        let own = self.redraw.pending();
        match &self.content {
            LiveContent::PreComp { layers, .. } => own + layers.iter().map(|l| l.pending_redraws()).sum::<usize>(),
            _ => own,
        }
    }

    fn take_redraws(&self) -> usize {
        let own = self.redraw.take();
        match &self.content {
            LiveContent::PreComp { layers, .. } => own + layers.iter().map(|l| l.take_redraws()).sum::<usize>(),
            _ => own,
        }
    }
}

fn instantiate(list: &LayerList, composition: &Composition, precomp_stack: &mut Vec<String>) -> Vec<LayerInstance> {
    list.layers()
        .iter()
        .map(|layer| LayerInstance::new(layer, composition, precomp_stack))
        .collect()
}

/// Layer-to-composition matrix: own transform under every ancestor's.
fn world_matrix(layers: &[LayerInstance], index: usize) -> Mat3 {
    let mut matrix = layers[index].transform.matrix();
    let mut visited = HashSet::from([index]);
    let mut parent = layers[index].parent;
    while let Some(parent_id) = parent {
        // Duplicate ids resolve to the last layer carrying them.
        let Some(parent_index) = layers.iter().rposition(|l| l.id == Some(parent_id)) else {
            break;
        };
        if !visited.insert(parent_index) {
            warn!(layer = %layers[index].name, "Parent chain forms a cycle");
            break;
        }
        matrix = layers[parent_index].transform.matrix() * matrix;
        parent = layers[parent_index].parent;
    }
    matrix
}

fn render_layers(layers: &mut [LayerInstance]) -> Vec<RenderLayer> {
    let mut out = Vec::new();
    // The first layer of a list is the topmost one.
    for index in (0..layers.len()).rev() {
        if !layers[index].is_visible() {
            continue;
        }
        let transform = world_matrix(layers, index);
        let layer = &mut layers[index];
        let content = match &mut layer.content {
            LiveContent::Null => continue,
            LiveContent::Shapes(group) => LayerContent::Shapes(group.evaluate(None).nodes),
            LiveContent::Image { asset_id, width, height } => LayerContent::Image {
                asset_id: asset_id.clone(),
                width: *width,
                height: *height,
            },
            LiveContent::Solid { color, width, height } => LayerContent::Solid {
                color: *color,
                width: *width,
                height: *height,
            },
            LiveContent::Text(document) => LayerContent::Text(document.clone()),
            LiveContent::PreComp { layers, .. } => LayerContent::PreComp(render_layers(layers)),
        };
        out.push(RenderLayer {
            id: layer.id,
            name: layer.name.clone(),
            transform,
            opacity: opacity_to_u8(layer.transform.opacity()),
            content,
        });
    }
    out
}

/// Live playback state for one use of a shared [`Composition`].
#[derive(Debug)]
pub struct AnimationInstance {
    composition: Arc<Composition>,
    layers: Vec<LayerInstance>,
    progress: f32,
}

impl AnimationInstance {
    pub fn new(composition: Arc<Composition>) -> Self {
        let mut precomp_stack = Vec::new();
        let layers = instantiate(&composition.layers, &composition, &mut precomp_stack);
        debug!(layers = layers.len(), "Created animation instance");
        let mut instance = AnimationInstance {
            composition,
            layers,
            progress: 0.0,
        };
        instance.apply(0.0);
        instance.take_redraw_requests();
        instance
    }

    pub fn composition(&self) -> &Arc<Composition> {
        &self.composition
    }

    pub fn layers(&self) -> &[LayerInstance] {
        &self.layers
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn frame(&self) -> f32 {
        self.composition.frame_for_progress(self.progress)
    }

    /// Moves every animation to `progress` (clamped to `[0, 1]`). Returns
    /// whether anything visible may have changed.
    pub fn set_progress(&mut self, progress: f32) -> bool {
        let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        self.apply(progress)
    }

    pub fn set_frame(&mut self, frame: f32) -> bool {
        self.set_progress(self.composition.progress_for_frame(frame))
    }

    fn apply(&mut self, progress: f32) -> bool {
        self.progress = progress;
        let frame = self.composition.frame_for_progress(progress);
        let mut changed = false;
        for layer in &mut self.layers {
            changed |= layer.set_frame(frame, &self.composition);
        }
        changed
    }

    pub fn pending_redraw_requests(&self) -> usize {
        self.layers.iter().map(|l| l.pending_redraws()).sum()
    }

    pub fn take_redraw_requests(&self) -> usize {
        self.layers.iter().map(|l| l.take_redraws()).sum()
    }

    /// Everything visible at the current progress, in painter's order.
    pub fn render_tree(&mut self) -> RenderTree {
        let (width, height) = self
            .composition
            .bounds
            .map(|b| (b.width() as f32, b.height() as f32))
            .unwrap_or_default();
        RenderTree {
            width,
            height,
            layers: render_layers(&mut self.layers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::CompositionBuilder;
    use crate::renderer::ShapeGeometry;
    use glam::Vec2;
    use kurbo::Shape;
    use serde_json::json;

    fn instance(doc: serde_json::Value) -> AnimationInstance {
        let composition = CompositionBuilder::new().from_value(doc).unwrap();
        AnimationInstance::new(Arc::new(composition))
    }

    fn shape_layer(ind: i64, extra: serde_json::Value) -> serde_json::Value {
        let mut layer = json!({
            "ty": 4, "ind": ind, "ip": 0, "op": 60, "st": 0,
            "ks": {},
            "shapes": [
                { "ty": "rc", "p": { "k": [0, 0] }, "s": { "k": [10, 10] }, "r": { "k": 0 } },
                { "ty": "fl", "c": { "k": [1, 0, 0, 1] }, "o": { "k": 100 } }
            ]
        });
        if let (Some(base), Some(extra)) = (layer.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        layer
    }

    fn doc(layers: serde_json::Value) -> serde_json::Value {
        json!({ "v": "5.7.0", "fr": 30, "ip": 0, "op": 60, "w": 200, "h": 100, "layers": layers })
    }

    #[test]
    fn test_progress_is_clamped() {
        let mut anim = instance(doc(json!([shape_layer(1, json!({}))])));
        anim.set_progress(1.5);
        assert_eq!(anim.progress(), 1.0);
        anim.set_progress(-0.5);
        assert_eq!(anim.progress(), 0.0);
        anim.set_frame(30.0);
        assert_eq!(anim.progress(), 0.5);
        assert_eq!(anim.frame(), 30.0);
    }

    #[test]
    fn test_layer_window_and_painter_order() {
        let mut anim = instance(doc(json!([
            shape_layer(1, json!({ "nm": "top" })),
            shape_layer(2, json!({ "nm": "bottom", "ip": 30 }))
        ])));
        let tree = anim.render_tree();
        assert_eq!((tree.width, tree.height), (200.0, 100.0));
        assert_eq!(tree.layers.len(), 1);

        anim.set_frame(30.0);
        let tree = anim.render_tree();
        let names: Vec<&str> = tree.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["bottom", "top"]);
    }

    #[test]
    fn test_parent_transforms_compose() {
        let mut anim = instance(doc(json!([
            shape_layer(1, json!({ "nm": "child", "parent": 2, "ks": { "p": { "k": [10, 0] } } })),
            { "ty": 3, "ind": 2, "nm": "null", "ip": 0, "op": 60, "ks": { "p": { "k": [100, 50] } } }
        ])));
        let tree = anim.render_tree();
        assert_eq!(tree.layers.len(), 1);
        let origin = tree.layers[0].transform.transform_point2(Vec2::ZERO);
        assert_eq!(origin, Vec2::new(110.0, 50.0));
    }

    #[test]
    fn test_parent_cycle_is_guarded() {
        let mut anim = instance(doc(json!([
            shape_layer(1, json!({ "parent": 2 })),
            shape_layer(2, json!({ "parent": 1 }))
        ])));
        assert_eq!(anim.render_tree().layers.len(), 2);
    }

    #[test]
    fn test_animated_layer_requests_redraw() {
        let mut anim = instance(doc(json!([shape_layer(1, json!({
            "ks": { "o": { "k": [{ "t": 0, "s": [0] }, { "t": 60, "s": [100] }] } }
        }))])));
        assert_eq!(anim.pending_redraw_requests(), 0);
        assert_eq!(anim.render_tree().layers[0].opacity, 0);

        assert!(anim.set_progress(0.5));
        assert!(anim.take_redraw_requests() >= 1);
        assert_eq!(anim.render_tree().layers[0].opacity, 128);

        assert!(!anim.set_progress(0.5));
        assert_eq!(anim.pending_redraw_requests(), 0);
    }

    #[test]
    fn test_start_time_shifts_layer_animations() {
        let mut anim = instance(doc(json!([shape_layer(1, json!({
            "st": 30,
            "ks": { "p": { "k": [{ "t": 0, "s": [0, 0] }, { "t": 30, "s": [30, 0] }] } }
        }))])));
        anim.set_frame(45.0);
        let origin = anim.render_tree().layers[0].transform.transform_point2(Vec2::ZERO);
        assert!((origin.x - 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_precomp_time_remap() {
        let composition = CompositionBuilder::new()
            .from_value(json!({
                "v": "5.7.0", "fr": 30, "ip": 0, "op": 60, "w": 100, "h": 100,
                "assets": [{
                    "id": "comp_0",
                    "layers": [shape_layer(1, json!({
                        "ks": { "p": { "k": [{ "t": 0, "s": [0, 0] }, { "t": 60, "s": [60, 0] }] } }
                    }))]
                }],
                "layers": [{
                    "ty": 0, "ind": 1, "refId": "comp_0", "w": 100, "h": 100, "ip": 0, "op": 60,
                    "ks": {},
                    "tm": { "k": [{ "t": 0, "s": [1] }, { "t": 60, "s": [1] }] }
                }]
            }))
            .unwrap();
        let mut anim = AnimationInstance::new(Arc::new(composition));
        anim.set_frame(10.0);
        let tree = anim.render_tree();
        let LayerContent::PreComp(children) = &tree.layers[0].content else {
            panic!("expected precomp content");
        };
        // One second into the precomp is frame 30 regardless of the outer frame.
        let origin = children[0].transform.transform_point2(Vec2::ZERO);
        assert!((origin.x - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_time_remap_counts_from_composition_start() {
        let composition = CompositionBuilder::new()
            .from_value(json!({
                "v": "5.7.0", "fr": 30, "ip": 10, "op": 70, "w": 100, "h": 100,
                "assets": [{
                    "id": "comp_0",
                    "layers": [shape_layer(1, json!({
                        "ks": { "p": { "k": [{ "t": 10, "s": [0, 0] }, { "t": 70, "s": [60, 0] }] } }
                    }))]
                }],
                "layers": [{
                    "ty": 0, "ind": 1, "refId": "comp_0", "w": 100, "h": 100, "ip": 10, "op": 70,
                    "ks": {},
                    "tm": { "k": [{ "t": 10, "s": [1] }, { "t": 70, "s": [1] }] }
                }]
            }))
            .unwrap();
        let mut anim = AnimationInstance::new(Arc::new(composition));
        anim.set_frame(20.0);
        let tree = anim.render_tree();
        let LayerContent::PreComp(children) = &tree.layers[0].content else {
            panic!("expected precomp content");
        };
        // One second after a start at frame 10 is frame 40.
        let origin = children[0].transform.transform_point2(Vec2::ZERO);
        assert!((origin.x - 30.0).abs() < 1e-3);
    }

    #[test]
    fn test_shape_layer_output() {
        let mut anim = instance(doc(json!([shape_layer(1, json!({}))])));
        let tree = anim.render_tree();
        let LayerContent::Shapes(nodes) = &tree.layers[0].content else {
            panic!("expected shapes");
        };
        assert_eq!(nodes.len(), 1);
        let ShapeGeometry::Path(path) = &nodes[0].geometry else {
            panic!("expected a single path");
        };
        assert_eq!(path.bounding_box(), kurbo::Rect::new(-5.0, -5.0, 5.0, 5.0));
    }
}
