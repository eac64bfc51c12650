// extensions/mod.rs
//
// Freestanding animation and control utilities.
// Nothing here knows about scenes or entities — hosts opt in by creating
// tweens and state machines and ticking them from their own loop.

pub mod easing;
pub mod group;
pub mod interpolation;
pub mod state_machine;
pub mod tween;

pub use easing::Easing;
pub use group::{Animate, TweenGroup, TweenId};
pub use interpolation::{
    resolve, lerp, lerp_vec2, Color, Interpolate, InterpolationError, InterpolationFn, Record,
    Value,
};
pub use state_machine::{StateBuilder, StateDef, StateMachine, StateMachineError};
pub use tween::{LoopType, Tween, TweenConfig, TweenError};
