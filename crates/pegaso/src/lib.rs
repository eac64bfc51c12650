pub mod extensions;

// Re-export key types at crate root for convenience
pub use extensions::{
    Easing, lerp, lerp_vec2,
    resolve, Color, Interpolate, InterpolationError, InterpolationFn, Record, Value,
    LoopType, Tween, TweenConfig, TweenError,
    Animate, TweenGroup, TweenId,
    StateBuilder, StateDef, StateMachine, StateMachineError,
};

pub use glam::Vec2;
