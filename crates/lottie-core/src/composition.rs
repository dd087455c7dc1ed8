//! The parsed document: immutable once built and shared between instances.

use crate::error::CompositionError;
use crate::keyframe::Timeline;
use crate::layer::Layer;
use crate::shape::{parse_shapes, ShapeModel};
use lottie_data::model::{self as data, LottieJson};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Above this many image assets the composition carries a warning.
const MAX_RECOMMENDED_IMAGES: usize = 4;

/// Cooperative cancellation for loading. Cloned handles share one flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// State threaded through layer and shape parsing.
pub struct ParseContext<'a> {
    pub timeline: Timeline,
    pub scale: f32,
    pub layer_name: String,
    warnings: &'a mut BTreeSet<String>,
}

impl<'a> ParseContext<'a> {
    pub fn new(timeline: Timeline, scale: f32, warnings: &'a mut BTreeSet<String>) -> Self {
        ParseContext {
            timeline,
            scale,
            layer_name: String::new(),
            warnings,
        }
    }

    pub fn warn(&mut self, message: String) {
        if self.warnings.insert(message.clone()) {
            warn!("{message}");
        }
    }
}

/// Layers of one scope (the root or a precomposition) plus the id lookup
/// parents resolve through. Duplicate ids: the last one wins.
#[derive(Debug, Clone, Default)]
pub struct LayerList {
    layers: Vec<Layer>,
    by_id: HashMap<i64, usize>,
}

impl LayerList {
    pub fn new(layers: Vec<Layer>) -> Self {
        let mut by_id = HashMap::new();
        for (index, layer) in layers.iter().enumerate() {
            if let Some(id) = layer.id {
                by_id.insert(id, index);
            }
        }
        LayerList { layers, by_id }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn by_id(&self, id: i64) -> Option<&Layer> {
        self.by_id.get(&id).map(|&index| &self.layers[index])
    }

    pub fn index_of(&self, id: i64) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Precomposition {
    pub id: String,
    pub name: Option<String>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub layers: LayerList,
}

/// Image metadata only. Pixels are decoded by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    pub id: String,
    pub width: f32,
    pub height: f32,
    pub file_name: String,
    pub directory: Option<String>,
    pub embedded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub name: String,
    pub family: String,
    pub style: String,
    pub ascent: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharacterKey {
    pub character: String,
    pub family: String,
    pub style: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontCharacter {
    pub character: String,
    pub size: f32,
    pub width: f32,
    pub family: String,
    pub style: String,
    pub shapes: Vec<ShapeModel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub name: String,
    pub start_frame: f32,
    pub duration_frames: f32,
}

#[derive(Debug, Clone)]
pub struct Composition {
    pub name: Option<String>,
    pub version: Option<String>,
    /// Output size, scaled. Absent when the document lacks `w` or `h`.
    pub bounds: Option<kurbo::Rect>,
    pub timeline: Timeline,
    pub scale: f32,
    pub layers: LayerList,
    pub precomps: HashMap<String, Precomposition>,
    pub images: HashMap<String, ImageAsset>,
    pub fonts: HashMap<String, Font>,
    pub characters: HashMap<CharacterKey, FontCharacter>,
    pub markers: Vec<Marker>,
    warnings: BTreeSet<String>,
}

impl Composition {
    pub fn start_frame(&self) -> f32 {
        self.timeline.start_frame
    }

    pub fn end_frame(&self) -> f32 {
        self.timeline.end_frame
    }

    pub fn frame_rate(&self) -> f32 {
        self.timeline.frame_rate
    }

    pub fn duration_ms(&self) -> f32 {
        self.timeline.duration_ms()
    }

    pub fn duration_frames(&self) -> f32 {
        self.timeline.duration_frames()
    }

    pub fn progress_for_frame(&self, frame: f32) -> f32 {
        self.timeline.progress_for_frame(frame)
    }

    pub fn frame_for_progress(&self, progress: f32) -> f32 {
        self.timeline.frame_for_progress(progress)
    }

    pub fn layer_by_id(&self, id: i64) -> Option<&Layer> {
        self.layers.by_id(id)
    }

    pub fn precomp(&self, id: &str) -> Option<&Precomposition> {
        self.precomps.get(id)
    }

    pub fn image(&self, id: &str) -> Option<&ImageAsset> {
        self.images.get(id)
    }

    pub fn character(&self, character: &str, family: &str, style: &str) -> Option<&FontCharacter> {
        self.characters.get(&CharacterKey {
            character: character.to_string(),
            family: family.to_string(),
            style: style.to_string(),
        })
    }

    /// Non-fatal problems found while building, de-duplicated and sorted.
    pub fn warnings(&self) -> &BTreeSet<String> {
        &self.warnings
    }
}

#[derive(Debug, Clone)]
pub struct CompositionBuilder {
    scale: f32,
    cancellation: Option<CancellationFlag>,
}

impl Default for CompositionBuilder {
    fn default() -> Self {
        CompositionBuilder {
            scale: 1.0,
            cancellation: None,
        }
    }
}

impl CompositionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolution factor applied to every spatial value at parse time.
    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub fn from_slice(&self, bytes: &[u8]) -> Result<Composition, CompositionError> {
        let document: LottieJson = serde_json::from_slice(bytes)?;
        self.build(&document)
    }

    pub fn from_value(&self, value: serde_json::Value) -> Result<Composition, CompositionError> {
        let document: LottieJson = serde_json::from_value(value)?;
        self.build(&document)
    }

    fn check_cancelled(&self) -> Result<(), CompositionError> {
        match &self.cancellation {
            Some(flag) if flag.is_cancelled() => Err(CompositionError::Cancelled),
            _ => Ok(()),
        }
    }

    pub fn build(&self, doc: &LottieJson) -> Result<Composition, CompositionError> {
        self.check_cancelled()?;
        let scale = self.scale;
        let timeline = Timeline::new(doc.ip, doc.op, doc.fr);
        let bounds = match (doc.w, doc.h) {
            (Some(w), Some(h)) => Some(kurbo::Rect::new(
                0.0,
                0.0,
                (w as f32 * scale) as f64,
                (h as f32 * scale) as f64,
            )),
            _ => None,
        };

        let mut warnings = BTreeSet::new();
        let mut ctx = ParseContext::new(timeline, scale, &mut warnings);

        let mut images = HashMap::new();
        let mut precomps = HashMap::new();
        for asset in &doc.assets {
            if let Some(file_name) = &asset.p {
                images.insert(
                    asset.id.clone(),
                    ImageAsset {
                        id: asset.id.clone(),
                        width: asset.w.unwrap_or(0) as f32 * scale,
                        height: asset.h.unwrap_or(0) as f32 * scale,
                        file_name: file_name.clone(),
                        directory: asset.u.clone(),
                        embedded: asset.e == Some(1),
                    },
                );
            } else if let Some(layers) = &asset.layers {
                let layers = parse_layers(layers, &mut ctx);
                precomps.insert(
                    asset.id.clone(),
                    Precomposition {
                        id: asset.id.clone(),
                        name: asset.nm.clone(),
                        width: asset.w.map(|w| w as f32 * scale),
                        height: asset.h.map(|h| h as f32 * scale),
                        layers: LayerList::new(layers),
                    },
                );
            }
        }
        if images.len() > MAX_RECOMMENDED_IMAGES {
            ctx.warn(format!(
                "You have {} images. Lottie should primarily be used with shapes. If you are using Adobe Illustrator, convert the Illustrator layers to shape layers.",
                images.len()
            ));
        }
        self.check_cancelled()?;

        let fonts: HashMap<String, Font> = doc
            .fonts
            .iter()
            .flat_map(|list| list.list.iter())
            .map(|font| {
                (
                    font.name.clone(),
                    Font {
                        name: font.name.clone(),
                        family: font.family.clone(),
                        style: font.style.clone(),
                        ascent: font.ascent,
                    },
                )
            })
            .collect();
        self.check_cancelled()?;

        let mut characters = HashMap::new();
        for ch in &doc.chars {
            ctx.layer_name = format!("glyph {}", ch.ch);
            let shapes = ch
                .data
                .as_ref()
                .map(|data| parse_shapes(&data.shapes, &mut ctx))
                .unwrap_or_default();
            let key = CharacterKey {
                character: ch.ch.clone(),
                family: ch.family.clone(),
                style: ch.style.clone(),
            };
            characters.insert(
                key,
                FontCharacter {
                    character: ch.ch.clone(),
                    size: ch.size,
                    width: ch.w,
                    family: ch.family.clone(),
                    style: ch.style.clone(),
                    shapes,
                },
            );
        }
        self.check_cancelled()?;

        let layers = LayerList::new(parse_layers(&doc.layers, &mut ctx));
        self.check_cancelled()?;

        let markers = doc
            .markers
            .iter()
            .map(|m| Marker {
                name: m.cm.clone().unwrap_or_default(),
                start_frame: m.tm.unwrap_or(0.0),
                duration_frames: m.dr.unwrap_or(0.0),
            })
            .collect();

        debug!(
            layers = layers.len(),
            precomps = precomps.len(),
            images = images.len(),
            warnings = warnings.len(),
            "built composition"
        );

        Ok(Composition {
            name: doc.nm.clone(),
            version: doc.v.clone(),
            bounds,
            timeline,
            scale,
            layers,
            precomps,
            images,
            fonts,
            characters,
            markers,
            warnings,
        })
    }
}

fn parse_layers(layers: &[data::Layer], ctx: &mut ParseContext<'_>) -> Vec<Layer> {
    layers.iter().map(|layer| Layer::from_model(layer, ctx)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frame_fields_default_to_zero() {
        let comp = CompositionBuilder::new().from_value(json!({ "layers": [] })).unwrap();
        assert_eq!(comp.start_frame(), 0.0);
        assert_eq!(comp.end_frame(), 0.0);
        assert_eq!(comp.frame_rate(), 0.0);
        assert!(comp.bounds.is_none());
        assert!(comp.warnings().is_empty());
    }

    #[test]
    fn test_bounds_are_scaled() {
        let comp = CompositionBuilder::new()
            .scale(2.0)
            .from_value(json!({ "w": 100, "h": 50, "ip": 0, "op": 60, "fr": 30, "layers": [] }))
            .unwrap();
        assert_eq!(comp.bounds, Some(kurbo::Rect::new(0.0, 0.0, 200.0, 100.0)));
        assert_eq!(comp.duration_ms(), 2000.0);
    }

    #[test]
    fn test_assets_split_into_images_and_precomps() {
        let comp = CompositionBuilder::new()
            .from_value(json!({
                "ip": 0, "op": 60, "fr": 30,
                "assets": [
                    { "id": "img_0", "w": 10, "h": 20, "u": "images/", "p": "img_0.png", "e": 0 },
                    { "id": "comp_0", "layers": [{ "ty": 3, "ind": 1, "ip": 0, "op": 60 }] }
                ],
                "layers": []
            }))
            .unwrap();
        assert_eq!(comp.image("img_0").map(|i| i.height), Some(20.0));
        let precomp = comp.precomp("comp_0").unwrap();
        assert!(precomp.layers.by_id(1).is_some());
        assert!(comp.image("comp_0").is_none());
    }

    #[test]
    fn test_duplicate_layer_ids_last_wins() {
        let comp = CompositionBuilder::new()
            .from_value(json!({
                "ip": 0, "op": 60, "fr": 30,
                "layers": [
                    { "ty": 3, "ind": 1, "nm": "first", "ip": 0, "op": 60 },
                    { "ty": 3, "ind": 1, "nm": "second", "ip": 0, "op": 60 }
                ]
            }))
            .unwrap();
        assert_eq!(comp.layers.len(), 2);
        assert_eq!(comp.layer_by_id(1).map(|l| l.name.as_str()), Some("second"));
    }

    #[test]
    fn test_fonts_and_characters() {
        let comp = CompositionBuilder::new()
            .from_value(json!({
                "ip": 0, "op": 60, "fr": 30,
                "fonts": { "list": [{ "fName": "Roboto-Regular", "fFamily": "Roboto", "fStyle": "Regular", "ascent": 75 }] },
                "chars": [{
                    "ch": "A", "size": 12, "w": 60, "style": "Regular", "fFamily": "Roboto",
                    "data": { "shapes": [{ "ty": "gr", "it": [{ "ty": "sh", "ks": { "k": { "c": true, "v": [[0, 0], [1, 0], [1, 1]], "i": [[0, 0], [0, 0], [0, 0]], "o": [[0, 0], [0, 0], [0, 0]] } } }] }] }
                }],
                "layers": []
            }))
            .unwrap();
        assert_eq!(comp.fonts["Roboto-Regular"].family, "Roboto");
        let glyph = comp.character("A", "Roboto", "Regular").unwrap();
        assert_eq!(glyph.width, 60.0);
        assert_eq!(glyph.shapes.len(), 1);
        assert!(comp.character("A", "Roboto", "Bold").is_none());
    }

    #[test]
    fn test_cancelled_build_publishes_nothing() {
        let flag = CancellationFlag::new();
        flag.cancel();
        let result = CompositionBuilder::new()
            .cancellation(flag)
            .from_value(json!({ "layers": [] }));
        assert!(matches!(result, Err(CompositionError::Cancelled)));
    }

    #[test]
    fn test_malformed_document_is_a_parse_error() {
        let result = CompositionBuilder::new().from_slice(b"{ \"layers\": 7 }");
        assert!(matches!(result, Err(CompositionError::Parse(_))));
    }
}
