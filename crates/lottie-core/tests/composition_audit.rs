//! End-to-end checks over whole documents.
//!
//! Run with: cargo test -p lottie-core --test composition_audit

use lottie_core::content::Content;
use lottie_core::path_ops::path_length;
use lottie_core::{
    AnimatableValue, AnimationInstance, CompositionBuilder, Easing, LayerContent, ShapeGeometry,
    Timeline,
};
use lottie_data::model::Property;
use serde_json::json;
use std::sync::Arc;

fn document(layers: serde_json::Value) -> serde_json::Value {
    json!({
        "v": "5.5.0",
        "fr": 30,
        "ip": 0,
        "op": 60,
        "w": 500,
        "h": 500,
        "nm": "Test",
        "layers": layers
    })
}

fn shape_layer(shapes: serde_json::Value) -> serde_json::Value {
    json!({
        "ty": 4,
        "ind": 1,
        "ip": 0,
        "op": 60,
        "st": 0,
        "nm": "Shape Layer",
        "ks": {
            "o": { "a": 0, "k": 100 },
            "r": { "a": 0, "k": 0 },
            "p": { "a": 0, "k": [250, 250, 0] },
            "a": { "a": 0, "k": [0, 0, 0] },
            "s": { "a": 0, "k": [100, 100, 100] }
        },
        "shapes": shapes
    })
}

fn instance(doc: serde_json::Value) -> AnimationInstance {
    let composition = CompositionBuilder::new()
        .from_value(doc)
        .expect("Failed to parse test lottie");
    AnimationInstance::new(Arc::new(composition))
}

fn scalar(k: serde_json::Value) -> AnimatableValue<f32> {
    let prop: Property<f32> = serde_json::from_value(json!({ "k": k })).unwrap();
    AnimatableValue::from_property(&prop, Timeline::new(0.0, 60.0, 30.0), 1.0, 0.0, |v, _| *v)
}

mod timing {
    use super::*;

    #[test]
    fn test_duration_of_two_seconds() {
        let comp = CompositionBuilder::new().from_value(document(json!([]))).unwrap();
        assert_eq!(comp.duration_ms(), 2000.0);
        assert_eq!(comp.duration_frames(), 60.0);
    }

    #[test]
    fn test_duration_round_trips_to_frames() {
        for (ip, op, fr) in [(0.0, 60.0, 30.0), (10.0, 95.0, 24.0), (0.0, 181.0, 59.94)] {
            let comp = CompositionBuilder::new()
                .from_value(json!({ "fr": fr, "ip": ip, "op": op, "w": 10, "h": 10, "layers": [] }))
                .unwrap();
            let ms = comp.duration_ms();
            assert!((ms - (op - ip) / fr * 1000.0).abs() < 1e-2);
            let frames = ms / 1000.0 * fr;
            assert!((frames - (op - ip)).abs() < 1e-3, "{ip}..{op}@{fr}");
        }
    }
}

mod keyframes {
    use super::*;

    #[test]
    fn test_backfilled_segments_are_contiguous() {
        let value = scalar(json!([
            { "t": 0, "s": [0] },
            { "t": 12, "s": [5] },
            { "t": 40, "s": [9] },
            { "t": 55, "s": [1] }
        ]));
        let kfs = value.keyframes();
        assert_eq!(kfs.len(), 4);
        for pair in kfs.windows(2) {
            assert_eq!(pair[0].end_frame, Some(pair[1].start_frame));
            assert_eq!(pair[0].end_value, pair[1].start_value);
        }
    }

    #[test]
    fn test_trailing_keyframe_without_value_is_dropped() {
        let value = scalar(json!([
            { "t": 0, "s": [0] },
            { "t": 20, "s": [10] },
            { "t": 40, "s": [20] },
            { "t": 60 }
        ]));
        assert_eq!(value.keyframes().len(), 3);
        assert_eq!(value.keyframes()[2].end_frame, Some(60.0));
    }

    #[test]
    fn test_keyframe_without_value_mid_track_keeps_segments_contiguous() {
        let value = scalar(json!([
            { "t": 0, "s": [0] },
            { "t": 10 },
            { "t": 20, "s": [10] },
            { "t": 60 }
        ]));
        let kfs = value.keyframes();
        assert_eq!(kfs.len(), 2);
        assert_eq!(kfs[0].end_frame, Some(kfs[1].start_frame));

        let mut anim = value.create_animation();
        let mut previous = *anim.value();
        for frame in 0..=20 {
            anim.set_progress(frame as f32 / 60.0);
            assert!((anim.value() - frame as f32 / 2.0).abs() < 1e-3, "frame {frame}");
            assert!(*anim.value() >= previous);
            previous = *anim.value();
        }
    }

    #[test]
    fn test_hold_never_interpolates() {
        let mut anim = scalar(json!([{ "t": 0, "s": [0], "e": [100], "h": 1 }, { "t": 30 }])).create_animation();
        assert!(anim.is_animated());
        for frame in 0..=30 {
            anim.set_progress(frame as f32 / 60.0);
            assert_eq!(*anim.value(), 0.0, "frame {frame}");
        }
    }

    #[test]
    fn test_zero_control_points_are_linear() {
        let value = scalar(json!([
            { "t": 0, "s": [0], "e": [60], "o": { "x": [0], "y": [0] }, "i": { "x": [0], "y": [0] } },
            { "t": 60 }
        ]));
        assert_eq!(value.keyframes()[0].easing, Some(Easing::Linear));
        let mut anim = value.create_animation();
        for frame in [6.0, 21.0, 33.0, 57.0] {
            anim.set_progress(frame / 60.0);
            assert!((anim.value() - frame).abs() < 1e-3);
        }
    }

    #[test]
    fn test_static_keyframe_is_flat() {
        let mut anim = scalar(json!([{ "t": 0, "s": [7] }])).create_animation();
        anim.set_progress(0.1);
        let a = *anim.value();
        anim.set_progress(0.9);
        assert_eq!(a, *anim.value());
        assert_eq!(a, 7.0);
    }
}

mod shapes {
    use super::*;

    fn shapes_at(anim: &mut AnimationInstance) -> Vec<lottie_core::ShapeNode> {
        let tree = anim.render_tree();
        match tree.layers.into_iter().next().map(|l| l.content) {
            Some(LayerContent::Shapes(nodes)) => nodes,
            other => panic!("expected a shape layer, got {other:?}"),
        }
    }

    #[test]
    fn test_rectangle_radius_clamps() {
        let mut anim = instance(document(json!([shape_layer(json!([{
            "ty": "gr",
            "it": [
                { "ty": "rc", "p": { "k": [0, 0] }, "s": { "k": [100, 50] }, "r": { "k": 40 } },
                { "ty": "fl", "c": { "k": [1, 0, 0, 1] }, "o": { "k": 100 } }
            ]
        }]))])));

        let Some(Content::Group(group)) = anim.layers()[0].shapes().and_then(|g| g.contents().first()) else {
            panic!("expected a group");
        };
        let Some(Content::Rectangle(rect)) = group.contents().first() else {
            panic!("expected a rectangle");
        };
        assert_eq!(rect.effective_radius(), 25.0);

        let nodes = shapes_at(&mut anim);
        let ShapeGeometry::Path(path) = &nodes[0].geometry else {
            panic!("expected a path");
        };
        // Two straight edges of 50 and two half circles of radius 25.
        let expected = 2.0 * 50.0 + 2.0 * std::f64::consts::PI * 25.0;
        assert!((path_length(path) - expected).abs() < 0.5);
    }

    #[test]
    fn test_trim_halves_stroke_length() {
        let mut anim = instance(document(json!([shape_layer(json!([
            { "ty": "el", "p": { "k": [0, 0] }, "s": { "k": [100, 100] } },
            { "ty": "tm", "s": { "k": 0 }, "e": { "k": 50 }, "o": { "k": 0 }, "m": 1 },
            { "ty": "st", "c": { "k": [0, 0, 0, 1] }, "o": { "k": 100 }, "w": { "k": 4 } }
        ]))])));
        let nodes = shapes_at(&mut anim);
        let length = path_length(&nodes[0].geometry.to_path());
        let circumference = std::f64::consts::PI * 100.0;
        assert!((length - circumference / 2.0).abs() < 0.5);
        assert_eq!(nodes[0].stroke.as_ref().map(|s| s.width), Some(4.0));
    }

    #[test]
    fn test_merge_concatenates_paths() {
        let mut anim = instance(document(json!([shape_layer(json!([
            { "ty": "rc", "p": { "k": [0, 0] }, "s": { "k": [10, 10] } },
            { "ty": "rc", "p": { "k": [30, 0] }, "s": { "k": [10, 10] } },
            { "ty": "mm", "mm": 1 },
            { "ty": "fl", "c": { "k": [0, 0, 0, 1] }, "o": { "k": 100 } }
        ]))])));
        let nodes = shapes_at(&mut anim);
        assert_eq!(nodes.len(), 1);
        let path = nodes[0].geometry.to_path();
        let subpaths = path
            .elements()
            .iter()
            .filter(|el| matches!(el, kurbo::PathEl::MoveTo(_)))
            .count();
        assert_eq!(subpaths, 2);
    }

    #[test]
    fn test_repeater_yields_copies() {
        let mut anim = instance(document(json!([shape_layer(json!([
            { "ty": "rc", "p": { "k": [0, 0] }, "s": { "k": [10, 10] } },
            { "ty": "fl", "c": { "k": [0, 0, 0, 1] }, "o": { "k": 100 } },
            { "ty": "rp", "c": { "k": 4 }, "o": { "k": 0 }, "tr": { "p": { "k": [15, 0] }, "so": { "k": 100 }, "eo": { "k": 20 } } }
        ]))])));
        let nodes = shapes_at(&mut anim);
        assert_eq!(nodes.len(), 4);
        let opacities: Vec<u8> = nodes.iter().map(|n| n.opacity).collect();
        assert_eq!(opacities.last(), Some(&255));
        assert!(opacities.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_animated_shape_redraws_only_on_change() {
        let mut anim = instance(document(json!([shape_layer(json!([
            { "ty": "rc", "p": { "k": [0, 0] }, "s": { "k": [{ "t": 0, "s": [10, 10] }, { "t": 30, "s": [50, 50] }] } },
            { "ty": "fl", "c": { "k": [0, 0, 0, 1] }, "o": { "k": 100 } }
        ]))])));
        anim.render_tree();

        assert!(anim.set_frame(15.0));
        assert_eq!(anim.take_redraw_requests(), 1);
        let nodes = shapes_at(&mut anim);
        assert!((path_length(&nodes[0].geometry.to_path()) - 120.0).abs() < 1e-3);

        // Past the last keyframe nothing moves any more.
        anim.set_frame(40.0);
        anim.take_redraw_requests();
        assert!(!anim.set_frame(50.0));
        assert_eq!(anim.pending_redraw_requests(), 0);
    }
}

mod assets {
    use super::*;

    #[test]
    fn test_image_count_warning_is_reported_once() {
        let assets: Vec<serde_json::Value> = (0..6)
            .map(|i| json!({ "id": format!("image_{i}"), "w": 10, "h": 10, "u": "images/", "p": format!("img_{i}.png") }))
            .collect();
        let mut doc = document(json!([]));
        doc["assets"] = json!(assets);
        let comp = CompositionBuilder::new().from_value(doc).unwrap();

        for _ in 0..3 {
            let warnings: Vec<&String> = comp
                .warnings()
                .iter()
                .filter(|w| w.contains("images"))
                .collect();
            assert_eq!(warnings.len(), 1);
            assert!(warnings[0].starts_with("You have 6 images."));
        }
        assert_eq!(comp.images.len(), 6);
    }

    #[test]
    fn test_precomp_layers_render_as_children() {
        let mut doc = document(json!([{
            "ty": 0, "ind": 1, "refId": "comp_0", "w": 500, "h": 500, "ip": 0, "op": 60, "ks": {}
        }]));
        doc["assets"] = json!([{ "id": "comp_0", "layers": [shape_layer(json!([
            { "ty": "rc", "p": { "k": [0, 0] }, "s": { "k": [10, 10] } },
            { "ty": "fl", "c": { "k": [0, 0, 0, 1] }, "o": { "k": 100 } }
        ]))] }]);
        let mut anim = instance(doc);
        let tree = anim.render_tree();
        let LayerContent::PreComp(children) = &tree.layers[0].content else {
            panic!("expected precomp content");
        };
        assert_eq!(children.len(), 1);
        assert!(matches!(&children[0].content, LayerContent::Shapes(nodes) if nodes.len() == 1));
    }
}
