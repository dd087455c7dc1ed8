//! Animated parameters and the live interpolation objects built from them.

use crate::keyframe::{parse_keyframes, Keyframe, Timeline};
use crate::observer::{ChangeListener, ChangeNotifier, ListenerId};
use crate::value::Interpolatable;
use lottie_data::model as data;
use std::sync::Arc;

/// Parsed parameter: a constant or a shared keyframe track. Immutable and
/// shared by every instance of a composition.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimatableValue<T> {
    Constant(T),
    Keyframed(Arc<[Keyframe<T>]>),
}

impl<T: Interpolatable> AnimatableValue<T> {
    pub fn from_property<R>(
        prop: &data::Property<R>,
        timeline: Timeline,
        scale: f32,
        default: T,
        parser: impl Fn(&R, f32) -> T,
    ) -> Self {
        match &prop.k {
            data::Value::Default => AnimatableValue::Constant(default),
            data::Value::Static(v) => AnimatableValue::Constant(parser(v, scale)),
            data::Value::Animated(raw) => {
                let mut keyframes: Vec<Keyframe<T>> = parse_keyframes(raw, timeline, scale, parser)
                    .into_iter()
                    .filter(|kf| kf.start_value.is_some())
                    .collect();
                if keyframes.len() == 1 && keyframes[0].is_static() {
                    let value = keyframes.pop().and_then(|kf| kf.start_value);
                    return AnimatableValue::Constant(value.unwrap_or(default));
                }
                if keyframes.is_empty() {
                    return AnimatableValue::Constant(default);
                }
                AnimatableValue::Keyframed(keyframes.into())
            }
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, AnimatableValue::Keyframed(_))
    }

    pub fn keyframes(&self) -> &[Keyframe<T>] {
        match self {
            AnimatableValue::Constant(_) => &[],
            AnimatableValue::Keyframed(kfs) => kfs,
        }
    }

    pub fn create_animation(&self) -> KeyframeAnimation<T> {
        KeyframeAnimation::new(self.clone())
    }
}

impl<T: Default> Default for AnimatableValue<T> {
    fn default() -> Self {
        AnimatableValue::Constant(T::default())
    }
}

/// Live interpolation state for one parameter of one animation instance.
///
/// Remembers the last progress and the segment that satisfied it; queries
/// that stay inside that segment skip the search.
#[derive(Debug)]
pub struct KeyframeAnimation<T> {
    source: AnimatableValue<T>,
    progress: f32,
    cached_index: Option<usize>,
    value: T,
    notifier: ChangeNotifier,
}

impl<T: Interpolatable> KeyframeAnimation<T> {
    pub fn new(source: AnimatableValue<T>) -> Self {
        let value = match &source {
            AnimatableValue::Constant(v) => v.clone(),
            AnimatableValue::Keyframed(kfs) => kfs
                .first()
                .and_then(|kf| kf.start_value.clone())
                .unwrap_or_default(),
        };
        let mut animation = KeyframeAnimation {
            source,
            progress: 0.0,
            cached_index: None,
            value,
            notifier: ChangeNotifier::new(),
        };
        animation.value = animation.resolve(0.0);
        animation
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_animated(&self) -> bool {
        self.source.is_animated()
    }

    pub fn add_listener(&mut self, listener: &Arc<dyn ChangeListener>) -> ListenerId {
        self.notifier.add_listener(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.notifier.remove_listener(id)
    }

    /// Moves to `progress` and re-resolves. Listeners hear about it only when
    /// the value actually changed; the return value says the same.
    pub fn set_progress(&mut self, progress: f32) -> bool {
        if !self.source.is_animated() {
            self.progress = progress;
            return false;
        }
        self.progress = progress;
        let value = self.resolve(progress);
        if value == self.value {
            return false;
        }
        self.value = value;
        self.notifier.notify();
        true
    }

    fn resolve(&mut self, progress: f32) -> T {
        let keyframes = match &self.source {
            AnimatableValue::Constant(v) => return v.clone(),
            AnimatableValue::Keyframed(kfs) => Arc::clone(kfs),
        };
        let index = self.segment_index(&keyframes, progress);
        self.cached_index = Some(index);
        interpolate(&keyframes[index], progress).unwrap_or_else(|| self.value.clone())
    }

    fn segment_index(&self, keyframes: &[Keyframe<T>], progress: f32) -> usize {
        if let Some(index) = self.cached_index {
            if keyframes.get(index).is_some_and(|kf| kf.contains(progress)) {
                return index;
            }
        }
        if let Some(index) = keyframes.iter().position(|kf| kf.contains(progress)) {
            return index;
        }
        match keyframes.first() {
            Some(first) if progress < first.start_progress() => 0,
            _ => keyframes.len().saturating_sub(1),
        }
    }
}

fn interpolate<T: Interpolatable>(kf: &Keyframe<T>, progress: f32) -> Option<T> {
    let start = kf.start_value.as_ref()?;
    let Some(easing) = kf.easing else {
        return Some(start.clone());
    };
    let Some(end) = kf.end_value.as_ref() else {
        return Some(start.clone());
    };
    if kf.hold {
        return Some(start.clone());
    }

    let span_start = kf.start_progress();
    let span = kf.end_progress() - span_start;
    let fraction = if span > 0.0 {
        ((progress - span_start) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };

    if fraction <= 0.0 {
        return Some(start.clone());
    }
    if fraction >= 1.0 {
        return Some(end.clone());
    }

    let eased = easing.ease(fraction);
    Some(if kf.path_out.is_some() || kf.path_in.is_some() {
        start.lerp_spatial(end, eased, kf.path_out, kf.path_in)
    } else {
        start.lerp(end, eased)
    })
}
