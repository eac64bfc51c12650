// extensions/tween.rs
//
// Tween — drives a single external property from a start to an end value.
// Decoupled from any scene: the target is reached only through a setter
// (and a getter used to snapshot the start value).
//
// Usage:
//   let tween = Tween::to(&sprite, |s| &mut s.pos, Vec2::new(200.0, 100.0), 0.5)?
//       .with_easing(Easing::CubicOut)
//       .with_loops(Tween::<Vec2>::INFINITE)
//       .with_loop_type(LoopType::Restart)
//       .auto_play(true);
//   tween.update(dt);  // once per frame

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::easing::Easing;
use super::interpolation::{Interpolate, InterpolationError, InterpolationFn};

/// What happens when a cycle ends and more loops remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopType {
    /// Replay start → end identically.
    Restart,
    /// Reverse direction every cycle.
    #[default]
    PingPong,
    /// Shift the range forward by one step: the old end becomes the new start.
    Increment,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TweenError {
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
    #[error("tween duration must be finite and positive, got {0}")]
    InvalidDuration(f32),
    #[error("tween target is already borrowed")]
    TargetBorrowed,
}

/// Plain-data tween settings, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TweenConfig {
    /// Length of one cycle in seconds.
    pub duration: f32,
    pub easing: Easing,
    /// Number of cycles, or -1 for infinite.
    pub loops: i32,
    pub loop_type: LoopType,
    pub auto_play: bool,
}

impl Default for TweenConfig {
    fn default() -> Self {
        Self {
            duration: 1.0,
            easing: Easing::Linear,
            loops: 1,
            loop_type: LoopType::PingPong,
            auto_play: false,
        }
    }
}

impl TweenConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Writes a value to the target. Returns `false` once the target is gone.
type Setter<T> = Box<dyn FnMut(&T) -> bool>;
type Getter<T> = Box<dyn Fn() -> Option<T>>;

/// A time-driven animator for one property.
pub struct Tween<T: Interpolate> {
    setter: Setter<T>,
    getter: Getter<T>,
    target_lost: bool,

    easing: Easing,
    interpolation: InterpolationFn<T>,

    from: T,
    to: T,
    duration: f32,
    loop_count: i32,
    loop_type: LoopType,
    auto_play: bool,

    elapsed: f32,
    current_loop: i32,
    is_reverse: bool,
    has_started: bool,
    is_complete: bool,

    on_start: Option<Box<dyn FnMut()>>,
    on_update: Option<Box<dyn FnMut(&T)>>,
    on_complete: Option<Box<dyn FnMut()>>,
}

impl<T: Interpolate> Tween<T> {
    /// Loop count meaning "never complete".
    pub const INFINITE: i32 = -1;

    /// Tween a field of a shared host object.
    ///
    /// The tween keeps only a weak handle to `target`; once the host is
    /// dropped, writes become no-ops. `from` is read from the host now, so
    /// the host must not be borrowed at construction.
    ///
    /// The host is borrowed mutably only for the duration of each access.
    /// A write that finds the host already borrowed is skipped for that
    /// frame, and `value()` returns `None` while it is borrowed.
    pub fn to<H: 'static>(
        target: &Rc<RefCell<H>>,
        property: fn(&mut H) -> &mut T,
        to: T,
        duration: f32,
    ) -> Result<Self, TweenError> {
        let from = {
            let mut host = target.try_borrow_mut().map_err(|_| TweenError::TargetBorrowed)?;
            property(&mut host).clone()
        };

        let write_handle = Rc::downgrade(target);
        let setter = move |value: &T| {
            let Some(host) = write_handle.upgrade() else {
                return false;
            };
            match host.try_borrow_mut() {
                Ok(mut host) => *property(&mut host) = value.clone(),
                Err(_) => log::warn!("tween target is borrowed; skipping write"),
            }
            true
        };

        let read_handle = Rc::downgrade(target);
        let getter = move || {
            let host = read_handle.upgrade()?;
            let mut host = host.try_borrow_mut().ok()?;
            let value = property(&mut host).clone();
            Some(value)
        };

        Self::new(Box::new(setter), Box::new(getter), from, to, duration)
    }

    /// Tween through an explicit setter/getter pair.
    ///
    /// Useful for composed or derived properties that don't live in a
    /// single field. `from` is read from `getter` now.
    pub fn to_property(
        mut setter: impl FnMut(T) + 'static,
        getter: impl Fn() -> T + 'static,
        to: T,
        duration: f32,
    ) -> Result<Self, TweenError> {
        let from = getter();
        Self::new(
            Box::new(move |value: &T| {
                setter(value.clone());
                true
            }),
            Box::new(move || Some(getter())),
            from,
            to,
            duration,
        )
    }

    fn new(
        setter: Setter<T>,
        getter: Getter<T>,
        from: T,
        to: T,
        duration: f32,
    ) -> Result<Self, TweenError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(TweenError::InvalidDuration(duration));
        }
        let interpolation = T::resolve(&from, &to)?;

        Ok(Self {
            setter,
            getter,
            target_lost: false,
            easing: Easing::Linear,
            interpolation,
            from,
            to,
            duration,
            loop_count: 1,
            loop_type: LoopType::PingPong,
            auto_play: false,
            elapsed: 0.0,
            current_loop: 1,
            is_reverse: false,
            has_started: false,
            is_complete: false,
            on_start: None,
            on_update: None,
            on_complete: None,
        })
    }

    // -- Builder methods --

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Number of cycles (>= 1), or [`Tween::INFINITE`].
    pub fn with_loops(mut self, count: i32) -> Self {
        if count < 1 && count != Self::INFINITE {
            log::warn!("tween loop count {} behaves as a single cycle", count);
        }
        self.loop_count = count;
        self
    }

    pub fn with_loop_type(mut self, loop_type: LoopType) -> Self {
        self.loop_type = loop_type;
        self
    }

    /// Start on the first `update` without an explicit `play`.
    pub fn auto_play(mut self, auto_play: bool) -> Self {
        self.auto_play = auto_play;
        self
    }

    /// Apply every setting in `config`, including its duration.
    pub fn with_config(mut self, config: &TweenConfig) -> Result<Self, TweenError> {
        if !config.duration.is_finite() || config.duration <= 0.0 {
            return Err(TweenError::InvalidDuration(config.duration));
        }
        self.duration = config.duration;
        Ok(self
            .with_easing(config.easing)
            .with_loops(config.loops)
            .with_loop_type(config.loop_type)
            .auto_play(config.auto_play))
    }

    /// Called once per play cycle, on the first active tick.
    pub fn on_start(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_start = Some(Box::new(callback));
        self
    }

    /// Called with every value written to the target.
    pub fn on_update(mut self, callback: impl FnMut(&T) + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    /// Called once when the last cycle finishes.
    pub fn on_complete(mut self, callback: impl FnMut() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    // -- Lifecycle --

    /// Advance by `dt` seconds and write the new value to the target.
    pub fn update(&mut self, dt: f32) {
        if self.is_complete || (!self.auto_play && !self.has_started) {
            return;
        }

        if !self.has_started {
            self.has_started = true;
            if let Some(callback) = &mut self.on_start {
                callback();
            }
        }

        self.elapsed += dt;

        if self.elapsed >= self.duration {
            if self.loop_count == Self::INFINITE || self.current_loop < self.loop_count {
                self.elapsed = 0.0;
                self.current_loop += 1;
                match self.loop_type {
                    LoopType::Restart => {}
                    LoopType::PingPong => self.is_reverse = !self.is_reverse,
                    LoopType::Increment => {
                        let next = (self.interpolation)(&self.from, &self.to, 2.0);
                        self.from = std::mem::replace(&mut self.to, next);
                    }
                }
            } else {
                // Snap to the end of the leg just finished.
                let end = if self.is_reverse { self.from.clone() } else { self.to.clone() };
                self.write(&end);
                self.is_complete = true;
                if let Some(callback) = &mut self.on_update {
                    callback(&end);
                }
                if let Some(callback) = &mut self.on_complete {
                    callback();
                }
                return;
            }
        }

        let mut t = self.elapsed / self.duration;
        if self.is_reverse {
            t = 1.0 - t;
        }
        let eased = self.easing.apply(t);
        let value = (self.interpolation)(&self.from, &self.to, eased);

        self.write(&value);
        if let Some(callback) = &mut self.on_update {
            callback(&value);
        }
    }

    /// Start ticking. Does not rewind: on a running tween this does nothing.
    pub fn play(&mut self) {
        self.has_started = true;
    }

    /// Rewind to the initial state and write `from` back to the target.
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.is_complete = false;
        self.has_started = false;
        self.current_loop = 1;
        self.is_reverse = false;
        let from = self.from.clone();
        self.write(&from);
    }

    fn write(&mut self, value: &T) {
        if !(self.setter)(value) && !self.target_lost {
            log::warn!("tween target was dropped; further writes are ignored");
            self.target_lost = true;
        }
    }

    // -- Inspection --

    pub fn from(&self) -> &T {
        &self.from
    }

    pub fn to_value(&self) -> &T {
        &self.to
    }

    /// Current value of the target, or `None` if the host was dropped or
    /// is borrowed elsewhere.
    pub fn value(&self) -> Option<T> {
        (self.getter)()
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn loop_count(&self) -> i32 {
        self.loop_count
    }

    pub fn loop_type(&self) -> LoopType {
        self.loop_type
    }

    /// 1-based index of the cycle in progress.
    pub fn current_loop(&self) -> i32 {
        self.current_loop
    }

    pub fn is_reverse(&self) -> bool {
        self.is_reverse
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn is_playing(&self) -> bool {
        self.has_started && !self.is_complete
    }

    /// Normalized progress through the current cycle [0, 1].
    pub fn progress(&self) -> f32 {
        if self.is_complete {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }
}

impl<T: Interpolate + fmt::Debug> fmt::Debug for Tween<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tween")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("duration", &self.duration)
            .field("easing", &self.easing)
            .field("loop_count", &self.loop_count)
            .field("loop_type", &self.loop_type)
            .field("elapsed", &self.elapsed)
            .field("current_loop", &self.current_loop)
            .field("is_reverse", &self.is_reverse)
            .field("has_started", &self.has_started)
            .field("is_complete", &self.is_complete)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::interpolation::{Color, Value};
    use glam::Vec2;
    use std::cell::Cell;

    #[derive(Debug, Default)]
    struct Sprite {
        x: f32,
        pos: Vec2,
        tint: Color,
    }

    fn sprite() -> Rc<RefCell<Sprite>> {
        Rc::new(RefCell::new(Sprite::default()))
    }

    fn counter() -> (Rc<Cell<u32>>, impl FnMut() + 'static) {
        let count = Rc::new(Cell::new(0));
        let handle = count.clone();
        (count, move || handle.set(handle.get() + 1))
    }

    #[test]
    fn tween_position_halfway() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.pos, Vec2::new(100.0, 50.0), 1.0)
            .unwrap()
            .auto_play(true);

        tween.update(0.5);
        assert!((host.borrow().pos - Vec2::new(50.0, 25.0)).length() < 0.01);
        assert!(tween.is_playing());
    }

    #[test]
    fn completion_snaps_to_end() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.x, 100.0, 1.0)
            .unwrap()
            .with_loops(1)
            .auto_play(true);

        tween.update(1.5);
        assert!(tween.is_complete());
        assert_eq!(host.borrow().x, 100.0);
    }

    #[test]
    fn waits_for_play_without_auto_play() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.x, 10.0, 1.0).unwrap();

        tween.update(0.5);
        assert_eq!(host.borrow().x, 0.0);
        assert!(!tween.has_started());

        tween.play();
        tween.update(0.5);
        assert!((host.borrow().x - 5.0).abs() < 0.001);
    }

    #[test]
    fn ping_pong_returns_to_start() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.x, 100.0, 1.0)
            .unwrap()
            .with_loop_type(LoopType::PingPong)
            .with_loops(2)
            .auto_play(true);

        tween.update(0.5);
        assert!((host.borrow().x - 50.0).abs() < 0.01);
        tween.update(0.5);
        assert!((host.borrow().x - 100.0).abs() < 0.01);
        assert!(tween.is_reverse());
        tween.update(0.5);
        assert!((host.borrow().x - 50.0).abs() < 0.01);
        tween.update(0.5);

        assert!(tween.is_complete());
        assert_eq!(host.borrow().x, 0.0);
        assert_eq!(tween.current_loop(), 2);
    }

    #[test]
    fn increment_shifts_range() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.x, 10.0, 1.0)
            .unwrap()
            .with_loop_type(LoopType::Increment)
            .with_loops(3)
            .auto_play(true);

        tween.update(1.0);
        assert_eq!((*tween.from(), *tween.to_value()), (10.0, 20.0));
        tween.update(1.0);
        assert_eq!((*tween.from(), *tween.to_value()), (20.0, 30.0));
        tween.update(1.0);

        assert!(tween.is_complete());
        assert_eq!(host.borrow().x, 30.0);
    }

    #[test]
    fn restart_replays_forward() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.x, 100.0, 1.0)
            .unwrap()
            .with_loop_type(LoopType::Restart)
            .with_loops(2)
            .auto_play(true);

        tween.update(1.0);
        assert_eq!(host.borrow().x, 0.0);
        assert!(!tween.is_reverse());
        tween.update(0.25);
        assert!((host.borrow().x - 25.0).abs() < 0.01);
    }

    #[test]
    fn infinite_loops_never_complete() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.x, 1.0, 0.1)
            .unwrap()
            .with_loops(Tween::<f32>::INFINITE)
            .auto_play(true);

        for _ in 0..1000 {
            tween.update(0.05);
        }
        assert!(!tween.is_complete());
        assert!(tween.current_loop() > 100);
    }

    #[test]
    fn callbacks_fire_in_order() {
        let (starts, on_start) = counter();
        let (completes, on_complete) = counter();
        let updates = Rc::new(RefCell::new(Vec::new()));
        let seen = updates.clone();

        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.x, 4.0, 1.0)
            .unwrap()
            .auto_play(true)
            .on_start(on_start)
            .on_update(move |v| seen.borrow_mut().push(*v))
            .on_complete(on_complete);

        tween.update(0.5);
        tween.update(0.75);
        tween.update(1.0);

        assert_eq!(starts.get(), 1);
        assert_eq!(completes.get(), 1);
        assert_eq!(*updates.borrow(), vec![2.0, 4.0]);
    }

    #[test]
    fn complete_tween_leaves_target_alone() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.x, 1.0, 1.0)
            .unwrap()
            .auto_play(true);
        tween.update(2.0);
        host.borrow_mut().x = -7.0;
        tween.update(0.5);
        assert_eq!(host.borrow().x, -7.0);
    }

    #[test]
    fn reset_is_idempotent() {
        let (starts, on_start) = counter();
        let host = sprite();
        host.borrow_mut().x = 3.0;
        let mut tween = Tween::to(&host, |s| &mut s.x, 9.0, 1.0)
            .unwrap()
            .with_loops(2)
            .auto_play(true)
            .on_start(on_start);

        tween.update(1.0);
        tween.update(1.0);
        assert!(tween.is_complete());

        tween.reset();
        tween.reset();
        assert_eq!(host.borrow().x, 3.0);
        assert!(!tween.is_complete());
        assert!(!tween.has_started());
        assert_eq!(tween.current_loop(), 1);
        assert!(!tween.is_reverse());
        assert_eq!(tween.elapsed(), 0.0);

        // A fresh play cycle fires on_start again.
        tween.update(0.1);
        assert_eq!(starts.get(), 2);
    }

    #[test]
    fn easing_shapes_progress() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.x, 100.0, 1.0)
            .unwrap()
            .with_easing(Easing::QuadIn)
            .auto_play(true);
        tween.update(0.5);
        assert!((host.borrow().x - 25.0).abs() < 0.01);
    }

    #[test]
    fn color_target_rounds() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.tint, Color::WHITE, 1.0)
            .unwrap()
            .auto_play(true);
        tween.update(0.5);
        assert_eq!(host.borrow().tint, Color::new(128.0, 128.0, 128.0));
    }

    #[test]
    fn explicit_accessor_pair() {
        // A derived property: drive both coordinates from one scalar.
        let host = sprite();
        let write = host.clone();
        let read = host.clone();
        let mut tween = Tween::to_property(
            move |v: f32| {
                write.borrow_mut().pos = Vec2::splat(v);
            },
            move || read.borrow().pos.x,
            8.0,
            2.0,
        )
        .unwrap()
        .auto_play(true);

        tween.update(1.0);
        assert_eq!(host.borrow().pos, Vec2::splat(4.0));
        assert_eq!(tween.value(), Some(4.0));
    }

    #[test]
    fn rejects_bad_duration() {
        let host = sprite();
        for duration in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let err = Tween::to(&host, |s| &mut s.x, 1.0, duration).unwrap_err();
            assert!(matches!(err, TweenError::InvalidDuration(_)));
        }
    }

    #[test]
    fn rejects_unsupported_values() {
        let result = Tween::to_property(|_: Value| {}, || Value::from("idle"), Value::from(1.0), 1.0);
        assert!(matches!(
            result,
            Err(TweenError::Interpolation(InterpolationError::UnsupportedType { .. }))
        ));
    }

    #[test]
    fn dropped_host_is_ignored() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.x, 1.0, 1.0)
            .unwrap()
            .auto_play(true);
        drop(host);

        tween.update(0.5);
        tween.update(0.6);
        assert!(tween.is_complete());
        assert_eq!(tween.value(), None);
    }

    #[test]
    fn config_from_json() {
        let config = TweenConfig::from_json(
            r#"{ "duration": 0.5, "easing": "back_out", "loops": -1, "loop_type": "restart" }"#,
        )
        .unwrap();
        assert_eq!(config.easing, Easing::BackOut);
        assert!(!config.auto_play);

        let host = sprite();
        let tween = Tween::to(&host, |s| &mut s.x, 1.0, 1.0)
            .unwrap()
            .with_config(&config)
            .unwrap();
        assert_eq!(tween.duration(), 0.5);
        assert_eq!(tween.loop_count(), Tween::<f32>::INFINITE);
        assert_eq!(tween.loop_type(), LoopType::Restart);
    }

    #[test]
    fn config_rejects_non_positive_duration() {
        let host = sprite();
        for duration in [0.0, -0.5] {
            let config = TweenConfig { duration, ..Default::default() };
            let err = Tween::to(&host, |s| &mut s.x, 1.0, 1.0)
                .unwrap()
                .with_config(&config)
                .unwrap_err();
            assert_eq!(err, TweenError::InvalidDuration(duration));
        }
    }

    #[test]
    fn play_does_not_rewind_running_tween() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.x, 100.0, 1.0)
            .unwrap()
            .auto_play(true);

        tween.update(0.5);
        tween.play();
        assert_eq!(tween.elapsed(), 0.5);
        tween.update(0.25);
        assert!((host.borrow().x - 75.0).abs() < 0.01);
    }

    #[test]
    fn increment_extrapolates_vectors_and_colors() {
        let host = sprite();
        let mut pos = Tween::to(&host, |s| &mut s.pos, Vec2::new(10.0, 5.0), 1.0)
            .unwrap()
            .with_loop_type(LoopType::Increment)
            .with_loops(2)
            .auto_play(true);
        pos.update(1.0);
        assert_eq!(*pos.from(), Vec2::new(10.0, 5.0));
        assert_eq!(*pos.to_value(), Vec2::new(20.0, 10.0));
        pos.update(1.0);
        assert_eq!(host.borrow().pos, Vec2::new(20.0, 10.0));

        let mut tint = Tween::to(&host, |s| &mut s.tint, Color::new(10.0, 20.0, 30.0), 1.0)
            .unwrap()
            .with_loop_type(LoopType::Increment)
            .with_loops(2)
            .auto_play(true);
        tint.update(1.0);
        assert_eq!(*tint.to_value(), Color::new(20.0, 40.0, 60.0));
        tint.update(1.0);
        assert_eq!(host.borrow().tint, Color::new(20.0, 40.0, 60.0));
    }

    #[test]
    fn zero_loops_runs_single_cycle() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.x, 10.0, 1.0)
            .unwrap()
            .with_loops(0)
            .auto_play(true);

        tween.update(1.0);
        assert!(tween.is_complete());
        assert_eq!(tween.current_loop(), 1);
        assert_eq!(host.borrow().x, 10.0);
    }

    #[test]
    fn shared_borrow_of_host_does_not_panic() {
        let host = sprite();
        let mut tween = Tween::to(&host, |s| &mut s.x, 10.0, 1.0)
            .unwrap()
            .auto_play(true);

        {
            let guard = host.borrow();
            assert_eq!(tween.value(), None);
            // The write is skipped while the host is borrowed.
            tween.update(0.5);
            assert_eq!(guard.x, 0.0);

            let busy = Tween::to(&host, |s| &mut s.x, 1.0, 1.0);
            assert!(matches!(busy, Err(TweenError::TargetBorrowed)));
        }

        assert_eq!(tween.value(), Some(0.0));
        tween.update(0.25);
        assert!((host.borrow().x - 7.5).abs() < 0.01);
    }
}
