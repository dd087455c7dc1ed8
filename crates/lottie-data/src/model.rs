use serde::{de::DeserializeOwned, de::SeqAccess, Deserialize, Deserializer, Serialize};
use std::fmt;

/// Top level document as exported by bodymovin.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LottieJson {
    #[serde(default)]
    pub v: Option<String>,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ip: f32,
    #[serde(default)]
    pub op: f32,
    #[serde(default)]
    pub fr: f32,
    #[serde(default)]
    pub w: Option<u32>,
    #[serde(default)]
    pub h: Option<u32>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub fonts: Option<FontList>,
    #[serde(default)]
    pub chars: Vec<FontCharacter>,
    #[serde(default)]
    pub markers: Vec<Marker>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Layer {
    #[serde(default)]
    pub ty: u8, // 0=precomp 1=solid 2=image 3=null 4=shape 5=text
    #[serde(default)]
    pub ind: Option<i64>,
    #[serde(default)]
    pub parent: Option<i64>,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ip: f32,
    #[serde(default)]
    pub op: f32,
    #[serde(default)]
    pub st: f32,
    #[serde(default = "default_one")]
    pub sr: f32, // Time stretch
    #[serde(default)]
    pub ks: Transform,
    #[serde(default)]
    pub tm: Option<Property<f32>>, // Time remap, seconds
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default, rename = "refId")]
    pub ref_id: Option<String>, // PreComp, Image
    #[serde(default)]
    pub w: Option<u32>, // PreComp
    #[serde(default)]
    pub h: Option<u32>, // PreComp
    #[serde(default, rename = "sc")]
    pub color: Option<String>, // Solid color
    #[serde(default)]
    pub sw: Option<u32>,
    #[serde(default)]
    pub sh: Option<u32>,
    #[serde(default)]
    pub shapes: Option<Vec<Shape>>,
    #[serde(default)]
    pub t: Option<serde_json::Value>, // Text document, laid out externally
}

fn default_one() -> f32 {
    1.0
}

// Shapes

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "ty")]
pub enum Shape {
    #[serde(rename = "gr")]
    Group(GroupShape),
    #[serde(rename = "rc")]
    Rect(RectShape),
    #[serde(rename = "el")]
    Ellipse(EllipseShape),
    #[serde(rename = "sh")]
    Path(PathShape),
    #[serde(rename = "fl")]
    Fill(FillShape),
    #[serde(rename = "st")]
    Stroke(StrokeShape),
    #[serde(rename = "gf")]
    GradientFill(GradientFillShape),
    #[serde(rename = "gs")]
    GradientStroke(GradientStrokeShape),
    #[serde(rename = "tr")]
    Transform(TransformShape),
    #[serde(rename = "tm")]
    Trim(TrimShape),
    #[serde(rename = "rp")]
    Repeater(RepeaterShape),
    #[serde(rename = "mm")]
    MergePaths(MergePathsShape),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub it: Vec<Shape>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RectShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub d: Option<u8>,
    #[serde(default)]
    pub s: Property<MultiDimensional>,
    #[serde(default)]
    pub p: Property<MultiDimensional>,
    #[serde(default)]
    pub r: Option<Property<f32>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EllipseShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub d: Option<u8>, // 3 = counter-clockwise
    #[serde(default)]
    pub s: Property<MultiDimensional>,
    #[serde(default)]
    pub p: Property<MultiDimensional>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub ks: Property<BezierPath>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FillShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub c: Property<MultiDimensional>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub r: Option<u8>, // 1 = non-zero, 2 = even-odd
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StrokeShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub c: Property<MultiDimensional>,
    #[serde(default)]
    pub w: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub lc: u8,
    #[serde(default)]
    pub lj: u8,
    #[serde(default)]
    pub ml: Option<f32>,
    #[serde(default)]
    pub d: Vec<DashProperty>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DashProperty {
    #[serde(default)]
    pub n: Option<String>, // "d" dash, "g" gap, "o" offset
    #[serde(default)]
    pub v: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GradientFillShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub s: Property<MultiDimensional>,
    #[serde(default)]
    pub e: Property<MultiDimensional>,
    #[serde(default = "default_gradient_type")]
    pub t: u8, // 1 = linear, 2 = radial
    #[serde(default)]
    pub g: GradientColors,
    #[serde(default)]
    pub r: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GradientStrokeShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub w: Property<f32>,
    #[serde(default)]
    pub s: Property<MultiDimensional>,
    #[serde(default)]
    pub e: Property<MultiDimensional>,
    #[serde(default = "default_gradient_type")]
    pub t: u8,
    #[serde(default)]
    pub g: GradientColors,
    #[serde(default)]
    pub lc: u8,
    #[serde(default)]
    pub lj: u8,
    #[serde(default)]
    pub ml: Option<f32>,
    #[serde(default)]
    pub d: Vec<DashProperty>,
}

fn default_gradient_type() -> u8 {
    1
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GradientColors {
    #[serde(default)]
    pub p: u32, // Number of color stops
    #[serde(default)]
    pub k: Property<Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrimShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub s: Property<f32>,
    #[serde(default)]
    pub e: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default = "default_trim_mode")]
    pub m: u8, // 1 = simultaneously, 2 = individually
}

fn default_trim_mode() -> u8 {
    1
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RepeaterShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub c: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default)]
    pub tr: RepeaterTransform,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RepeaterTransform {
    #[serde(flatten)]
    pub t: Transform,
    #[serde(default)]
    pub so: Property<f32>,
    #[serde(default)]
    pub eo: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MergePathsShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub hd: Option<bool>,
    #[serde(default)]
    pub mm: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransformShape {
    #[serde(flatten)]
    pub t: Transform,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Transform {
    #[serde(default)]
    pub a: Property<Vec3DefaultZero>, // Anchor
    #[serde(default)]
    pub p: PositionProperty,
    #[serde(default)]
    pub s: Property<Vec3Scale>,
    #[serde(default, alias = "rz")]
    pub r: Property<f32>, // Rotation, degrees
    #[serde(default)]
    pub o: Property<f32>, // Opacity, 0..100
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum PositionProperty {
    Split {
        x: Property<f32>,
        y: Property<f32>,
    },
    Unified(Property<Vec3DefaultZero>),
}

impl Default for PositionProperty {
    fn default() -> Self {
        PositionProperty::Unified(Property::default())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Property<T> {
    #[serde(default)]
    pub a: u8,
    #[serde(default)]
    #[serde(bound(deserialize = "T: DeserializeOwned"))]
    pub k: Value<T>,
    #[serde(default)]
    pub ix: Option<u32>,
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Property {
            a: 0,
            k: Value::Default,
            ix: None,
        }
    }
}

impl<T> Property<T> {
    pub fn fixed(value: T) -> Self {
        Property {
            a: 0,
            k: Value::Static(value),
            ix: None,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub enum Value<T> {
    Default,
    Static(T),
    Animated(Vec<Keyframe<T>>),
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Value<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;

        if v.is_null() {
            return Ok(Value::Default);
        }

        // A keyframe track is an array whose first entry is an object carrying `t`.
        // Anything else is a single value, possibly wrapped in an array.
        let is_track = v
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|first| first.as_object())
            .is_some_and(|obj| obj.contains_key("t"));

        if is_track {
            return serde_json::from_value::<Vec<Keyframe<T>>>(v)
                .map(Value::Animated)
                .map_err(serde::de::Error::custom);
        }

        if let Ok(val) = serde_json::from_value::<T>(v.clone()) {
            return Ok(Value::Static(val));
        }

        if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
            if let Some(first) = vec.into_iter().next() {
                return Ok(Value::Static(first));
            }
        }

        Ok(Value::Default)
    }
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Default
    }
}

/// One raw keyframe entry. Entries without `t` describe a constant value.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Keyframe<T> {
    #[serde(default)]
    pub t: Option<f32>,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub s: Option<T>,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub e: Option<T>,
    #[serde(default)]
    pub i: Option<BezierTangent>,
    #[serde(default)]
    pub o: Option<BezierTangent>,
    #[serde(default)]
    pub to: Option<Vec<f32>>,
    #[serde(default)]
    pub ti: Option<Vec<f32>>,
    #[serde(default)]
    pub h: Option<u8>,
}

impl<T> Keyframe<T> {
    /// A keyframe entry with only a time and start value.
    pub fn at(t: f32, s: Option<T>) -> Self {
        Keyframe {
            t: Some(t),
            s,
            e: None,
            i: None,
            o: None,
            to: None,
            ti: None,
            h: None,
        }
    }
}

fn deserialize_keyframe_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    if v.is_null() {
        return Ok(None);
    }

    if let Ok(val) = serde_json::from_value(v.clone()) {
        return Ok(Some(val));
    }

    if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
        if let Some(first) = vec.into_iter().next() {
            return Ok(Some(first));
        }
    }

    Ok(None)
}

pub type Vec2 = [f32; 2];
pub type Vec3 = [f32; 3];

/// Vector valued property (points, sizes, colors). Length varies by exporter.
pub type MultiDimensional = Vec<f32>;

/// Bezier tangent control points for keyframe easing.
/// Matches the JSON format: {"x": [0.48], "y": [1]} or {"x": 0.48, "y": 1}
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BezierTangent {
    #[serde(deserialize_with = "deserialize_tangent_component")]
    pub x: Vec<f32>,
    #[serde(deserialize_with = "deserialize_tangent_component")]
    pub y: Vec<f32>,
}

impl BezierTangent {
    pub fn new(x: f32, y: f32) -> Self {
        BezierTangent {
            x: vec![x],
            y: vec![y],
        }
    }

    /// First component pair, which drives scalar easing.
    pub fn first(&self) -> Option<(f32, f32)> {
        Some((*self.x.first()?, *self.y.first()?))
    }
}

fn deserialize_tangent_component<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Component {
        One(f32),
        Many(Vec<f32>),
    }
    Ok(match Component::deserialize(deserializer)? {
        Component::One(v) => vec![v],
        Component::Many(v) => v,
    })
}

// Wrapper for Vec3 with Z defaulting to 0.0
#[derive(Debug, Clone, Serialize)]
pub struct Vec3DefaultZero(pub Vec3);

impl Default for Vec3DefaultZero {
    fn default() -> Self {
        Vec3DefaultZero([0.0, 0.0, 0.0])
    }
}

impl<'de> Deserialize<'de> for Vec3DefaultZero {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Vec3Visitor;
        impl<'de> serde::de::Visitor<'de> for Vec3Visitor {
            type Value = Vec3DefaultZero;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of 2 or 3 floats")
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let x = seq.next_element()?.unwrap_or(0.0);
                let y = seq.next_element()?.unwrap_or(0.0);
                let z = seq.next_element()?.unwrap_or(0.0);
                while seq.next_element::<f32>()?.is_some() {}
                Ok(Vec3DefaultZero([x, y, z]))
            }
        }
        deserializer.deserialize_seq(Vec3Visitor)
    }
}

// Wrapper for Vec3 with Z defaulting to 100.0 (for Scale)
#[derive(Debug, Clone, Serialize)]
pub struct Vec3Scale(pub Vec3);

impl Default for Vec3Scale {
    fn default() -> Self {
        Vec3Scale([100.0, 100.0, 100.0])
    }
}

impl<'de> Deserialize<'de> for Vec3Scale {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Vec3ScaleVisitor;
        impl<'de> serde::de::Visitor<'de> for Vec3ScaleVisitor {
            type Value = Vec3Scale;
            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a sequence of 2 or 3 floats")
            }
            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let x = seq.next_element()?.unwrap_or(100.0);
                let y = seq.next_element()?.unwrap_or(100.0);
                let z = seq.next_element()?.unwrap_or(100.0);
                while seq.next_element::<f32>()?.is_some() {}
                Ok(Vec3Scale([x, y, z]))
            }
        }
        deserializer.deserialize_seq(Vec3ScaleVisitor)
    }
}

/// Cubic spline as stored in the document: vertices plus tangents relative to them.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct BezierPath {
    #[serde(default)]
    pub c: bool,
    #[serde(default)]
    pub i: Vec<Vec2>,
    #[serde(default)]
    pub o: Vec<Vec2>,
    #[serde(default)]
    pub v: Vec<Vec2>,
}

// Assets

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub layers: Option<Vec<Layer>>,
    #[serde(default)]
    pub w: Option<u32>,
    #[serde(default)]
    pub h: Option<u32>,
    #[serde(default)]
    pub u: Option<String>, // Directory
    #[serde(default)]
    pub p: Option<String>, // File name or data URI
    #[serde(default)]
    pub e: Option<u8>, // Embedded
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct FontList {
    #[serde(default)]
    pub list: Vec<Font>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Font {
    #[serde(rename = "fName")]
    pub name: String,
    #[serde(default, rename = "fFamily")]
    pub family: String,
    #[serde(default, rename = "fStyle")]
    pub style: String,
    #[serde(default)]
    pub ascent: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FontCharacter {
    pub ch: String,
    #[serde(default)]
    pub size: f32,
    #[serde(default)]
    pub w: f32,
    #[serde(default)]
    pub style: String,
    #[serde(default, rename = "fFamily")]
    pub family: String,
    #[serde(default)]
    pub data: Option<CharacterData>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CharacterData {
    #[serde(default)]
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Marker {
    #[serde(default)]
    pub cm: Option<String>,
    #[serde(default)]
    pub tm: Option<f32>,
    #[serde(default)]
    pub dr: Option<f32>,
}
