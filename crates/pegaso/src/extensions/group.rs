// extensions/group.rs
//
// TweenGroup — owns tweens of any value type and ticks them together.
// Stands in for a scene that would otherwise update each tween per frame.
//
// Usage:
//   let mut tweens = TweenGroup::new();
//   let id = tweens.add(Tween::to(&sprite, |s| &mut s.x, 100.0, 0.5)?.auto_play(true));
//   tweens.tick(dt);  // Advances all tweens, drops the finished ones

use super::interpolation::Interpolate;
use super::tween::Tween;

/// Type-erased view of a tween, so tweens of different value types can
/// share one group.
pub trait Animate {
    fn update(&mut self, dt: f32);
    fn play(&mut self);
    fn reset(&mut self);
    fn is_complete(&self) -> bool;
    fn is_playing(&self) -> bool;
}

impl<T: Interpolate> Animate for Tween<T> {
    fn update(&mut self, dt: f32) {
        Tween::update(self, dt);
    }

    fn play(&mut self) {
        Tween::play(self);
    }

    fn reset(&mut self) {
        Tween::reset(self);
    }

    fn is_complete(&self) -> bool {
        Tween::is_complete(self)
    }

    fn is_playing(&self) -> bool {
        Tween::is_playing(self)
    }
}

/// Handle to a tween for later reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(pub u32);

/// Manages a set of tweens, ticked in insertion order.
#[derive(Default)]
pub struct TweenGroup {
    tweens: Vec<(TweenId, Box<dyn Animate>)>,
    next_id: u32,
}

impl TweenGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tween. Returns a handle for later control.
    pub fn add(&mut self, tween: impl Animate + 'static) -> TweenId {
        let id = TweenId(self.next_id);
        self.next_id += 1;
        self.tweens.push((id, Box::new(tween)));
        id
    }

    /// Remove a tween by handle.
    pub fn remove(&mut self, id: TweenId) -> bool {
        let before = self.tweens.len();
        self.tweens.retain(|(tid, _)| *tid != id);
        self.tweens.len() != before
    }

    /// Start a tween that was added without auto-play.
    pub fn play(&mut self, id: TweenId) -> bool {
        match self.get_mut(id) {
            Some(tween) => {
                tween.play();
                true
            }
            None => false,
        }
    }

    pub fn play_all(&mut self) {
        for (_, tween) in self.tweens.iter_mut() {
            tween.play();
        }
    }

    /// Rewind a tween and write its start value back to its target.
    pub fn reset(&mut self, id: TweenId) -> bool {
        match self.get_mut(id) {
            Some(tween) => {
                tween.reset();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: TweenId) -> bool {
        self.tweens.iter().any(|(tid, _)| *tid == id)
    }

    pub fn is_playing(&self, id: TweenId) -> bool {
        self.tweens
            .iter()
            .find(|(tid, _)| *tid == id)
            .is_some_and(|(_, tween)| tween.is_playing())
    }

    fn get_mut(&mut self, id: TweenId) -> Option<&mut Box<dyn Animate>> {
        self.tweens
            .iter_mut()
            .find(|(tid, _)| *tid == id)
            .map(|(_, tween)| tween)
    }

    /// Advance all tweens by `dt` and drop the ones that completed.
    /// Returns the number of tweens that completed this tick.
    pub fn tick(&mut self, dt: f32) -> usize {
        for (_, tween) in self.tweens.iter_mut() {
            tween.update(dt);
        }

        let before = self.tweens.len();
        self.tweens.retain(|(_, tween)| !tween.is_complete());
        let completed = before - self.tweens.len();
        if completed > 0 {
            log::trace!("{} tween(s) completed", completed);
        }
        completed
    }

    /// Number of live tweens.
    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    /// Whether there are no live tweens.
    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    /// Drop all tweens without touching their targets.
    pub fn clear(&mut self) {
        self.tweens.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Body {
        pos: Vec2,
        angle: f32,
    }

    #[test]
    fn ticks_mixed_value_types() {
        let body = Rc::new(RefCell::new(Body::default()));
        let mut tweens = TweenGroup::new();
        tweens.add(
            Tween::to(&body, |b| &mut b.pos, Vec2::new(10.0, 0.0), 1.0)
                .unwrap()
                .auto_play(true),
        );
        tweens.add(Tween::to(&body, |b| &mut b.angle, 2.0, 2.0).unwrap().auto_play(true));

        assert_eq!(tweens.tick(1.0), 1);
        assert_eq!(body.borrow().pos, Vec2::new(10.0, 0.0));
        assert!((body.borrow().angle - 1.0).abs() < 0.001);
        assert_eq!(tweens.len(), 1);

        assert_eq!(tweens.tick(1.0), 1);
        assert!(tweens.is_empty());
    }

    #[test]
    fn paused_tweens_wait_for_play() {
        let body = Rc::new(RefCell::new(Body::default()));
        let mut tweens = TweenGroup::new();
        let id = tweens.add(Tween::to(&body, |b| &mut b.angle, 4.0, 1.0).unwrap());

        tweens.tick(0.5);
        assert_eq!(body.borrow().angle, 0.0);
        assert!(!tweens.is_playing(id));

        assert!(tweens.play(id));
        tweens.tick(0.5);
        assert!((body.borrow().angle - 2.0).abs() < 0.001);
        assert!(tweens.is_playing(id));
    }

    #[test]
    fn reset_and_remove_by_handle() {
        let body = Rc::new(RefCell::new(Body::default()));
        let mut tweens = TweenGroup::new();
        let id = tweens.add(Tween::to(&body, |b| &mut b.angle, 4.0, 1.0).unwrap().auto_play(true));

        tweens.tick(0.5);
        assert!(tweens.reset(id));
        assert_eq!(body.borrow().angle, 0.0);

        assert!(tweens.remove(id));
        assert!(!tweens.contains(id));
        assert!(!tweens.remove(id));
        assert!(!tweens.play(id));
    }
}
