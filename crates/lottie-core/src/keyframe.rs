//! Keyframe segments and the frame/progress mapping they are measured in.

use crate::easing::Easing;
use glam::Vec2;
use lottie_data::model as data;

/// Tangent magnitude cap for easing control points. Broken exports can carry
/// huge values that make the curve solver useless.
const MAX_CONTROL_POINT: f32 = 100.0;

/// Frame range and rate of the composition a keyframe belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Timeline {
    pub start_frame: f32,
    pub end_frame: f32,
    pub frame_rate: f32,
}

impl Timeline {
    pub fn new(start_frame: f32, end_frame: f32, frame_rate: f32) -> Self {
        Timeline {
            start_frame,
            end_frame,
            frame_rate,
        }
    }

    pub fn duration_ms(&self) -> f32 {
        if self.frame_rate <= 0.0 {
            return 0.0;
        }
        (self.end_frame - self.start_frame) / self.frame_rate * 1000.0
    }

    pub fn duration_frames(&self) -> f32 {
        self.duration_ms() * self.frame_rate / 1000.0
    }

    pub fn progress_for_frame(&self, frame: f32) -> f32 {
        let span = self.duration_frames();
        if span <= 0.0 {
            return 0.0;
        }
        (frame - self.start_frame) / span
    }

    pub fn frame_for_progress(&self, progress: f32) -> f32 {
        self.start_frame + progress * self.duration_frames()
    }
}

/// One interpolation segment.
///
/// `start_value` may only be missing on a trailing keyframe that exists to
/// donate its frame to the previous segment; `parse_keyframes` drops those.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe<T> {
    pub timeline: Timeline,
    pub start_value: Option<T>,
    pub end_value: Option<T>,
    pub start_frame: f32,
    pub end_frame: Option<f32>,
    /// `None` marks a static segment.
    pub easing: Option<Easing>,
    pub hold: bool,
    /// Spatial tangents, relative to the start and end value respectively.
    pub path_out: Option<Vec2>,
    pub path_in: Option<Vec2>,
    spans_timeline: bool,
}

impl<T: Clone> Keyframe<T> {
    /// A segment covering the whole timeline that always yields `value`.
    pub fn constant(timeline: Timeline, value: T) -> Self {
        Keyframe {
            timeline,
            start_value: Some(value.clone()),
            end_value: Some(value),
            start_frame: timeline.start_frame,
            end_frame: None,
            easing: None,
            hold: false,
            path_out: None,
            path_in: None,
            spans_timeline: true,
        }
    }
}

impl<T> Keyframe<T> {
    pub fn is_static(&self) -> bool {
        self.easing.is_none()
    }

    pub fn start_progress(&self) -> f32 {
        if self.spans_timeline {
            return f32::NEG_INFINITY;
        }
        self.timeline.progress_for_frame(self.start_frame)
    }

    pub fn end_progress(&self) -> f32 {
        if self.spans_timeline {
            return f32::INFINITY;
        }
        match self.end_frame {
            Some(frame) => self.timeline.progress_for_frame(frame),
            None => 1.0,
        }
    }

    /// Inclusive on both ends, so neighbours share their boundary.
    pub fn contains(&self, progress: f32) -> bool {
        progress >= self.start_progress() && progress <= self.end_progress()
    }
}

/// Builds the keyframe sequence of one animated property.
///
/// `parser` converts a raw document value into its semantic type and receives
/// the resolution `scale` so spatial values can be scaled once here.
pub fn parse_keyframes<R, T>(
    raw: &[data::Keyframe<R>],
    timeline: Timeline,
    scale: f32,
    parser: impl Fn(&R, f32) -> T,
) -> Vec<Keyframe<T>>
where
    T: Clone,
{
    // Valueless entries carry no segment. Only the last one is kept, as the
    // sentinel that closes the final segment.
    let last = raw.len().saturating_sub(1);
    let mut keyframes: Vec<Keyframe<T>> = raw
        .iter()
        .enumerate()
        .filter(|(i, entry)| entry.s.is_some() || *i == last)
        .map(|(_, entry)| parse_keyframe(entry, timeline, scale, &parser))
        .collect();
    set_end_frames(&mut keyframes);
    keyframes
}

fn parse_keyframe<R, T: Clone>(
    entry: &data::Keyframe<R>,
    timeline: Timeline,
    scale: f32,
    parser: &impl Fn(&R, f32) -> T,
) -> Keyframe<T> {
    let start_value = entry.s.as_ref().map(|v| parser(v, scale));

    let Some(start_frame) = entry.t else {
        return match start_value {
            Some(value) => Keyframe::constant(timeline, value),
            None => Keyframe {
                timeline,
                start_value: None,
                end_value: None,
                start_frame: timeline.start_frame,
                end_frame: None,
                easing: None,
                hold: false,
                path_out: None,
                path_in: None,
                spans_timeline: true,
            },
        };
    };

    let hold = entry.h == Some(1);
    let mut end_value = entry.e.as_ref().map(|v| parser(v, scale));

    let easing = if hold {
        end_value = start_value.clone();
        Easing::Linear
    } else {
        let out_point = entry.o.as_ref().and_then(|t| t.first());
        let in_point = entry.i.as_ref().and_then(|t| t.first());
        match (out_point, in_point) {
            (Some(cp1), Some(cp2)) => Easing::cubic(
                clamp_control_point(cp1, scale),
                clamp_control_point(cp2, scale),
            ),
            _ => Easing::Linear,
        }
    };

    let tangent = |raw: &Option<Vec<f32>>| {
        raw.as_deref()
            .filter(|v| v.len() >= 2)
            .map(|v| Vec2::new(v[0], v[1]) * scale)
    };

    Keyframe {
        timeline,
        start_value,
        end_value,
        start_frame,
        end_frame: None,
        easing: Some(easing),
        hold,
        path_out: tangent(&entry.to),
        path_in: tangent(&entry.ti),
        spans_timeline: false,
    }
}

/// Reads a control point at resolution scale, clamps it, and returns it in
/// unit easing space.
fn clamp_control_point((x, y): (f32, f32), scale: f32) -> Vec2 {
    if scale <= 0.0 {
        return Vec2::new(x, y);
    }
    let x = (x * scale).clamp(-scale, scale);
    let y = (y * scale).clamp(-MAX_CONTROL_POINT, MAX_CONTROL_POINT);
    Vec2::new(x / scale, y / scale)
}

fn set_end_frames<T: Clone>(keyframes: &mut Vec<Keyframe<T>>) {
    for i in 1..keyframes.len() {
        let (head, tail) = keyframes.split_at_mut(i);
        let current = &mut head[i - 1];
        let next = &tail[0];
        if current.spans_timeline {
            continue;
        }
        current.end_frame = Some(next.start_frame);
        if current.end_value.is_none() {
            current.end_value = next.start_value.clone();
        }
    }

    if keyframes.len() > 1 && keyframes.last().is_some_and(|kf| kf.start_value.is_none()) {
        keyframes.pop();
    }
}
