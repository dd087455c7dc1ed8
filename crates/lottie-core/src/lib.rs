//! Interpretation of Lottie documents: composition parsing, keyframe
//! interpolation, shape content evaluation and per-frame render trees.
//!
//! A [`Composition`] is parsed once and shared; every [`AnimationInstance`]
//! built from it carries its own live animation state.

pub mod animation;
pub mod composition;
pub mod content;
pub mod easing;
pub mod error;
pub mod keyframe;
pub mod layer;
pub mod observer;
pub mod path_ops;
pub mod player;
pub mod renderer;
pub mod shape;
pub mod transform;
pub mod value;

pub use animation::{AnimatableValue, KeyframeAnimation};
pub use composition::{
    CancellationFlag, CharacterKey, Composition, CompositionBuilder, Font, FontCharacter,
    ImageAsset, LayerList, Marker, Precomposition,
};
pub use easing::Easing;
pub use error::CompositionError;
pub use keyframe::{Keyframe, Timeline};
pub use layer::{Layer, LayerKind};
pub use observer::{ChangeListener, ContentInvalidator, DirtyFlag, ListenerId, RedrawRequests};
pub use player::{AnimationInstance, LayerInstance};
pub use renderer::*;
pub use value::{GradientColor, Interpolatable, ShapeData};
