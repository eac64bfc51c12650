// extensions/easing.rs
//
// Pure easing functions for tween pacing.
// No state, no dependencies on tweens or hosts — just math.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

/// Easing curve applied to normalized time.
///
/// Polynomial, sine and back curves accept any real `t` and extrapolate
/// their formula outside [0, 1]. Expo, circ, elastic and bounce curves clamp
/// `t` to [0, 1] first, since their formulas are piecewise or undefined
/// outside the unit range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    /// Constant velocity (no easing).
    #[default]
    Linear,
    /// Slow start.
    QuadIn,
    /// Slow end.
    QuadOut,
    /// Slow start and end.
    QuadInOut,
    /// Stronger slow start.
    CubicIn,
    /// Stronger slow end.
    CubicOut,
    /// Stronger slow start and end.
    CubicInOut,
    /// Very strong slow start.
    QuartIn,
    /// Very strong slow end.
    QuartOut,
    /// Very strong slow start and end.
    QuartInOut,
    QuintIn,
    QuintOut,
    QuintInOut,
    /// Sine wave easing (smooth).
    SineIn,
    SineOut,
    SineInOut,
    /// Exponential easing (dramatic). Clamps `t`.
    ExpoIn,
    ExpoOut,
    ExpoInOut,
    /// Quarter-circle easing. Clamps `t`.
    CircIn,
    CircOut,
    CircInOut,
    /// Overshoot then settle.
    BackIn,
    BackOut,
    BackInOut,
    /// Elastic spring. Clamps `t`.
    ElasticIn,
    ElasticOut,
    ElasticInOut,
    /// Bouncy finish. Clamps `t`.
    BounceIn,
    BounceOut,
    BounceInOut,
}

impl Easing {
    /// Every easing curve, in declaration order.
    pub const ALL: [Easing; 31] = [
        Easing::Linear,
        Easing::QuadIn,
        Easing::QuadOut,
        Easing::QuadInOut,
        Easing::CubicIn,
        Easing::CubicOut,
        Easing::CubicInOut,
        Easing::QuartIn,
        Easing::QuartOut,
        Easing::QuartInOut,
        Easing::QuintIn,
        Easing::QuintOut,
        Easing::QuintInOut,
        Easing::SineIn,
        Easing::SineOut,
        Easing::SineInOut,
        Easing::ExpoIn,
        Easing::ExpoOut,
        Easing::ExpoInOut,
        Easing::CircIn,
        Easing::CircOut,
        Easing::CircInOut,
        Easing::BackIn,
        Easing::BackOut,
        Easing::BackInOut,
        Easing::ElasticIn,
        Easing::ElasticOut,
        Easing::ElasticInOut,
        Easing::BounceIn,
        Easing::BounceOut,
        Easing::BounceInOut,
    ];

    /// Apply the easing function to a normalized time value `t`.
    /// Returns the eased progress, typically in [0, 1] but free to overshoot.
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Easing::Linear => t,

            // Quadratic
            Easing::QuadIn => t * t,
            Easing::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }

            // Cubic
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }

            // Quartic
            Easing::QuartIn => t.powi(4),
            Easing::QuartOut => 1.0 - (1.0 - t).powi(4),
            Easing::QuartInOut => {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }

            // Quintic
            Easing::QuintIn => t.powi(5),
            Easing::QuintOut => 1.0 - (1.0 - t).powi(5),
            Easing::QuintInOut => {
                if t < 0.5 {
                    16.0 * t.powi(5)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(5) / 2.0
                }
            }

            // Sine
            Easing::SineIn => 1.0 - (t * PI / 2.0).cos(),
            Easing::SineOut => (t * PI / 2.0).sin(),
            Easing::SineInOut => -((PI * t).cos() - 1.0) / 2.0,

            // Exponential
            Easing::ExpoIn => {
                let t = unit(t);
                if t == 0.0 { 0.0 } else { 2.0_f32.powf(10.0 * t - 10.0) }
            }
            Easing::ExpoOut => {
                let t = unit(t);
                if t == 1.0 { 1.0 } else { 1.0 - 2.0_f32.powf(-10.0 * t) }
            }
            Easing::ExpoInOut => {
                let t = unit(t);
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else if t < 0.5 {
                    2.0_f32.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2.0_f32.powf(-20.0 * t + 10.0)) / 2.0
                }
            }

            // Circular
            Easing::CircIn => {
                let t = unit(t);
                1.0 - (1.0 - t * t).sqrt()
            }
            Easing::CircOut => {
                let t = unit(t);
                (1.0 - (t - 1.0).powi(2)).sqrt()
            }
            Easing::CircInOut => {
                let t = unit(t);
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }

            // Back (overshoot)
            Easing::BackIn => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                C3 * t * t * t - C1 * t * t
            }
            Easing::BackOut => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
            }
            Easing::BackInOut => {
                const C1: f32 = 1.70158;
                const C2: f32 = C1 * 1.525;
                if t < 0.5 {
                    (2.0 * t).powi(2) * ((C2 + 1.0) * 2.0 * t - C2) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((C2 + 1.0) * (t * 2.0 - 2.0) + C2) + 2.0) / 2.0
                }
            }

            // Elastic
            Easing::ElasticIn => {
                const C4: f32 = (2.0 * PI) / 3.0;
                let t = unit(t);
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else {
                    -(2.0_f32.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * C4).sin()
                }
            }
            Easing::ElasticOut => {
                const C4: f32 = (2.0 * PI) / 3.0;
                let t = unit(t);
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else {
                    2.0_f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * C4).sin() + 1.0
                }
            }
            Easing::ElasticInOut => {
                const C5: f32 = (2.0 * PI) / 4.5;
                let t = unit(t);
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else if t < 0.5 {
                    -(2.0_f32.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * C5).sin()) / 2.0
                } else {
                    (2.0_f32.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * C5).sin()) / 2.0 + 1.0
                }
            }

            // Bounce
            Easing::BounceIn => 1.0 - bounce_out(1.0 - unit(t)),
            Easing::BounceOut => bounce_out(unit(t)),
            Easing::BounceInOut => {
                let t = unit(t);
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
        }
    }

    /// The snake_case name of this curve (matches its serialized form).
    pub fn name(self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::QuadIn => "quad_in",
            Easing::QuadOut => "quad_out",
            Easing::QuadInOut => "quad_in_out",
            Easing::CubicIn => "cubic_in",
            Easing::CubicOut => "cubic_out",
            Easing::CubicInOut => "cubic_in_out",
            Easing::QuartIn => "quart_in",
            Easing::QuartOut => "quart_out",
            Easing::QuartInOut => "quart_in_out",
            Easing::QuintIn => "quint_in",
            Easing::QuintOut => "quint_out",
            Easing::QuintInOut => "quint_in_out",
            Easing::SineIn => "sine_in",
            Easing::SineOut => "sine_out",
            Easing::SineInOut => "sine_in_out",
            Easing::ExpoIn => "expo_in",
            Easing::ExpoOut => "expo_out",
            Easing::ExpoInOut => "expo_in_out",
            Easing::CircIn => "circ_in",
            Easing::CircOut => "circ_out",
            Easing::CircInOut => "circ_in_out",
            Easing::BackIn => "back_in",
            Easing::BackOut => "back_out",
            Easing::BackInOut => "back_in_out",
            Easing::ElasticIn => "elastic_in",
            Easing::ElasticOut => "elastic_out",
            Easing::ElasticInOut => "elastic_in_out",
            Easing::BounceIn => "bounce_in",
            Easing::BounceOut => "bounce_out",
            Easing::BounceInOut => "bounce_in_out",
        }
    }

    /// Look up a curve by its snake_case name.
    pub fn from_name(name: &str) -> Option<Easing> {
        Easing::ALL.iter().copied().find(|e| e.name() == name)
    }
}

#[inline]
fn unit(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

#[inline]
fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}
