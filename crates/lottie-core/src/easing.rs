use glam::Vec2;

/// Maps a linear fraction of a keyframe span onto an eased fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    /// CSS-style cubic with implicit endpoints (0,0) and (1,1).
    CubicBezier { p1: Vec2, p2: Vec2 },
}

impl Easing {
    /// Builds the curve for the out tangent of one keyframe and the in tangent
    /// of the next. Control points lying on the diagonal describe a straight line.
    pub fn cubic(p1: Vec2, p2: Vec2) -> Self {
        let on_diagonal = |p: Vec2| (p.x - p.y).abs() < f32::EPSILON;
        if on_diagonal(p1) && on_diagonal(p2) {
            Easing::Linear
        } else {
            Easing::CubicBezier {
                p1: Vec2::new(p1.x.clamp(0.0, 1.0), p1.y),
                p2: Vec2::new(p2.x.clamp(0.0, 1.0), p2.y),
            }
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, Easing::Linear)
    }

    pub fn ease(&self, fraction: f32) -> f32 {
        match self {
            Easing::Linear => fraction,
            Easing::CubicBezier { p1, p2 } => solve_cubic_bezier(*p1, *p2, fraction),
        }
    }
}

fn bezier_component(a: f32, b: f32, t: f32) -> f32 {
    let one_minus_t = 1.0 - t;
    3.0 * one_minus_t * one_minus_t * t * a + 3.0 * one_minus_t * t * t * b + t * t * t
}

fn bezier_slope(a: f32, b: f32, t: f32) -> f32 {
    let one_minus_t = 1.0 - t;
    3.0 * one_minus_t * one_minus_t * a + 6.0 * one_minus_t * t * (b - a) + 3.0 * t * t * (1.0 - b)
}

/// Solves the curve for `x` and returns the matching `y`.
pub fn solve_cubic_bezier(p1: Vec2, p2: Vec2, x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    // Newton-Raphson
    let mut t = x;
    let mut converged = false;
    for _ in 0..8 {
        let err = bezier_component(p1.x, p2.x, t) - x;
        if err.abs() < 1e-5 {
            converged = true;
            break;
        }
        let dx_dt = bezier_slope(p1.x, p2.x, t);
        if dx_dt.abs() < 1e-6 {
            break;
        }
        t -= err / dx_dt;
    }

    // Flat slopes stall Newton; x(t) is monotonic on [0,1] so bisection always lands.
    if !converged || !(0.0..=1.0).contains(&t) {
        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        t = x;
        for _ in 0..32 {
            let est = bezier_component(p1.x, p2.x, t);
            if (est - x).abs() < 1e-6 {
                break;
            }
            if est < x {
                lo = t;
            } else {
                hi = t;
            }
            t = (lo + hi) * 0.5;
        }
    }

    bezier_component(p1.y, p2.y, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_control_points_are_linear() {
        let easing = Easing::cubic(Vec2::ZERO, Vec2::ZERO);
        assert!(easing.is_linear());
        for i in 0..=10 {
            let x = i as f32 / 10.0;
            assert_eq!(easing.ease(x), x);
        }
    }

    #[test]
    fn test_ease_in_out_is_symmetric() {
        let easing = Easing::cubic(Vec2::new(0.42, 0.0), Vec2::new(0.58, 1.0));
        assert!(!easing.is_linear());
        assert!((easing.ease(0.5) - 0.5).abs() < 1e-3);
        let a = easing.ease(0.25);
        let b = easing.ease(0.75);
        assert!((a + b - 1.0).abs() < 1e-3);
        assert!(a < 0.25);
    }

    #[test]
    fn test_flat_slope_falls_back_to_bisection() {
        // x'(t) vanishes at the ends when both x controls sit on the boundary.
        let easing = Easing::cubic(Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0));
        let mut last = 0.0;
        for i in 1..10 {
            let y = easing.ease(i as f32 / 10.0);
            assert!(y >= last - 1e-4, "easing must be monotonic here");
            last = y;
        }
    }

    #[test]
    fn test_out_of_range_x_is_clamped() {
        let easing = Easing::cubic(Vec2::new(3.0, 0.2), Vec2::new(-2.0, 0.8));
        match easing {
            Easing::CubicBezier { p1, p2 } => {
                assert_eq!(p1.x, 1.0);
                assert_eq!(p2.x, 0.0);
            }
            Easing::Linear => panic!("expected a cubic"),
        }
        assert_eq!(easing.ease(1.0), 1.0);
    }
}
