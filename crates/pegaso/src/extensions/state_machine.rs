// extensions/state_machine.rs
//
// Generic finite state machine with guarded transitions.
// States are keyed by any small Copy identifier (usually a fieldless enum).
// Every callback receives the context explicitly; the machine never holds
// a reference to the object it drives.
//
// Usage:
//   let mut fsm = StateMachine::<Mode, Hero>::new();
//   fsm.state(Mode::Idle, Hero::idle)?
//       .with_enter(|hero, _| hero.stop())
//       .transitions_to(Mode::Walk, "hero.speed > 0", |hero| hero.speed > 0.0)?;
//   fsm.state(Mode::Walk, Hero::walk)?
//       .transitions_to(Mode::Idle, "hero.speed == 0", |hero| hero.speed == 0.0)?;
//   fsm.update(&mut hero, dt)?;  // once per frame
//
// The first registered state is the initial state. Transitions out of a
// state are evaluated in registration order and at most one fires per tick.

use std::collections::HashMap;
use std::fmt::{self, Debug, Write as _};
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    #[error("state {0} already registered")]
    DuplicateState(String),
    #[error("invalid transition {from} -> {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: &'static str,
    },
    #[error("state {0} not found")]
    UnknownState(String),
}

pub type UpdateFn<C> = Box<dyn FnMut(&mut C, f32)>;
pub type EnterFn<S, C> = Box<dyn FnMut(&mut C, Option<S>)>;
pub type ExitFn<S, C> = Box<dyn FnMut(&mut C, S)>;
pub type GuardFn<C> = Box<dyn Fn(&C) -> bool>;

/// Behavior bundle for one state.
pub struct StateDef<S, C> {
    /// Runs every tick while the state is current.
    pub update: UpdateFn<C>,
    /// Runs on entry, with the state being left.
    pub on_enter: Option<EnterFn<S, C>>,
    /// Runs on exit, with the state being entered.
    pub on_exit: Option<ExitFn<S, C>>,
}

impl<S, C> StateDef<S, C> {
    pub fn new(update: impl FnMut(&mut C, f32) + 'static) -> Self {
        Self {
            update: Box::new(update),
            on_enter: None,
            on_exit: None,
        }
    }

    pub fn with_enter(mut self, on_enter: impl FnMut(&mut C, Option<S>) + 'static) -> Self {
        self.on_enter = Some(Box::new(on_enter));
        self
    }

    pub fn with_exit(mut self, on_exit: impl FnMut(&mut C, S) + 'static) -> Self {
        self.on_exit = Some(Box::new(on_exit));
        self
    }
}

struct Transition<S, C> {
    to: S,
    /// Human-readable rendering of the guard, for diagrams only.
    label: String,
    guard: GuardFn<C>,
}

pub struct StateMachine<S, C> {
    states: HashMap<S, StateDef<S, C>>,
    /// Registration order of `states`.
    order: Vec<S>,
    /// Outgoing transitions per source state, in priority order.
    transitions: HashMap<S, Vec<Transition<S, C>>>,
    current: Option<S>,
    previous: Option<S>,
}

impl<S, C> StateMachine<S, C>
where
    S: Copy + Eq + Hash + Debug,
{
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            order: Vec::new(),
            transitions: HashMap::new(),
            current: None,
            previous: None,
        }
    }

    pub fn current_state(&self) -> Option<S> {
        self.current
    }

    pub fn previous_state(&self) -> Option<S> {
        self.previous
    }

    /// Registered states, in registration order.
    pub fn states(&self) -> &[S] {
        &self.order
    }

    pub fn has_state(&self, state: S) -> bool {
        self.states.contains_key(&state)
    }

    /// Outgoing transitions of `state` as `(destination, label)`, in
    /// priority order.
    pub fn transitions_from(&self, state: S) -> impl Iterator<Item = (S, &str)> + '_ {
        self.transitions
            .get(&state)
            .into_iter()
            .flatten()
            .map(|t| (t.to, t.label.as_str()))
    }

    // -- Registration --

    /// Register a state and return a builder for its hooks and transitions.
    pub fn state(
        &mut self,
        name: S,
        update: impl FnMut(&mut C, f32) + 'static,
    ) -> Result<StateBuilder<'_, S, C>, StateMachineError> {
        self.add_state(name, StateDef::new(update))?;
        Ok(StateBuilder {
            machine: self,
            name,
        })
    }

    /// Register a fully described state in one call.
    ///
    /// The first state registered becomes current, without running its
    /// `on_enter`.
    pub fn add_state(&mut self, name: S, def: StateDef<S, C>) -> Result<(), StateMachineError> {
        if self.states.contains_key(&name) {
            return Err(StateMachineError::DuplicateState(format!("{:?}", name)));
        }

        log::debug!("state registered: {:?}", name);
        self.states.insert(name, def);
        self.order.push(name);

        if self.current.is_none() {
            self.current = Some(name);
        }
        Ok(())
    }

    /// Register a guarded transition. Earlier registrations take priority.
    ///
    /// `from` must already be registered; `to` is only checked when the
    /// transition fires. Registering the same pair again replaces the guard
    /// and keeps the original priority.
    pub fn add_transition(
        &mut self,
        from: S,
        to: S,
        label: impl Into<String>,
        guard: impl Fn(&C) -> bool + 'static,
    ) -> Result<(), StateMachineError> {
        let invalid = |reason| StateMachineError::InvalidTransition {
            from: format!("{:?}", from),
            to: format!("{:?}", to),
            reason,
        };
        if from == to {
            return Err(invalid("a state cannot transition to itself"));
        }
        if !self.states.contains_key(&from) {
            return Err(invalid("source state is not registered"));
        }

        log::debug!("transition registered: {:?} -> {:?}", from, to);
        let label = label.into();
        let guard: GuardFn<C> = Box::new(guard);
        let outgoing = self.transitions.entry(from).or_default();
        match outgoing.iter_mut().find(|t| t.to == to) {
            Some(existing) => {
                existing.label = label;
                existing.guard = guard;
            }
            None => outgoing.push(Transition { to, label, guard }),
        }
        Ok(())
    }

    // -- Runtime --

    /// Evaluate the current state's transitions, fire at most one, then run
    /// the (possibly new) current state's update.
    pub fn update(&mut self, ctx: &mut C, dt: f32) -> Result<(), StateMachineError> {
        let Some(current) = self.current else {
            return Ok(());
        };

        let view: &C = ctx;
        let next = self
            .transitions
            .get(&current)
            .and_then(|outgoing| outgoing.iter().find(|t| (t.guard)(view)))
            .map(|t| t.to);

        if let Some(next) = next {
            self.set_state(ctx, next)?;
        }

        if let Some(def) = self.current.and_then(|state| self.states.get_mut(&state)) {
            (def.update)(ctx, dt);
        }
        Ok(())
    }

    /// Switch to `state` without consulting any guard. Exit and enter hooks
    /// still run.
    pub fn force_state(&mut self, ctx: &mut C, state: S) -> Result<(), StateMachineError> {
        if !self.states.contains_key(&state) {
            return Err(StateMachineError::UnknownState(format!("{:?}", state)));
        }
        self.set_state(ctx, state)
    }

    fn set_state(&mut self, ctx: &mut C, next: S) -> Result<(), StateMachineError> {
        if !self.states.contains_key(&next) {
            return Err(StateMachineError::UnknownState(format!("{:?}", next)));
        }
        log::trace!("state change: {:?} -> {:?}", self.current, next);

        if let Some(exit) = self
            .current
            .and_then(|state| self.states.get_mut(&state))
            .and_then(|def| def.on_exit.as_mut())
        {
            exit(ctx, next);
        }

        self.previous = self.current;
        self.current = Some(next);

        if let Some(enter) = self.states.get_mut(&next).and_then(|def| def.on_enter.as_mut()) {
            enter(ctx, self.previous);
        }
        Ok(())
    }

    // -- Diagnostics --

    /// Render every state and transition as a fenced Mermaid
    /// `stateDiagram-v2` block, edges annotated with their guard labels.
    pub fn mermaid_diagram(&self) -> String {
        let mut out = String::from("```mermaid\nstateDiagram-v2\n");
        for state in &self.order {
            let _ = writeln!(out, "    state {}", node_name(state));
        }
        for from in &self.order {
            for (to, label) in self.transitions_from(*from) {
                let _ = writeln!(out, "    {} --> {}: {}", node_name(from), node_name(&to), label);
            }
        }
        out.push_str("```");
        out
    }

    /// One-line summary of a state's hooks and outgoing transitions.
    pub fn describe_state(&self, state: S) -> Option<String> {
        let def = self.states.get(&state)?;
        let mut out = format!("{:?}", state);

        let hooks: Vec<&str> = [
            def.on_enter.as_ref().map(|_| "enter"),
            def.on_exit.as_ref().map(|_| "exit"),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !hooks.is_empty() {
            let _ = write!(out, " ({})", hooks.join(", "));
        }

        let edges: Vec<String> = self
            .transitions_from(state)
            .map(|(to, label)| format!("{:?} [{}]", to, label))
            .collect();
        if !edges.is_empty() {
            let _ = write!(out, " -> {}", edges.join(", "));
        }
        Some(out)
    }
}

impl<S, C> Default for StateMachine<S, C>
where
    S: Copy + Eq + Hash + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Debug, C> Debug for StateMachine<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("states", &self.order)
            .field("current", &self.current)
            .field("previous", &self.previous)
            .finish_non_exhaustive()
    }
}

fn node_name<S: Debug>(state: &S) -> String {
    let rendered = format!("{:?}", state);
    // String-like keys render with Debug quotes; Mermaid ids go bare.
    let name = rendered
        .strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(&rendered);
    if name.contains(' ') {
        format!("\"{}\"", name)
    } else {
        name.to_string()
    }
}

/// Chainable configuration for a freshly registered state.
pub struct StateBuilder<'a, S, C> {
    machine: &'a mut StateMachine<S, C>,
    name: S,
}

impl<'a, S, C> StateBuilder<'a, S, C>
where
    S: Copy + Eq + Hash + Debug,
{
    pub fn with_enter(self, on_enter: impl FnMut(&mut C, Option<S>) + 'static) -> Self {
        if let Some(def) = self.machine.states.get_mut(&self.name) {
            def.on_enter = Some(Box::new(on_enter));
        }
        self
    }

    pub fn with_exit(self, on_exit: impl FnMut(&mut C, S) + 'static) -> Self {
        if let Some(def) = self.machine.states.get_mut(&self.name) {
            def.on_exit = Some(Box::new(on_exit));
        }
        self
    }

    pub fn transitions_to(
        self,
        to: S,
        label: impl Into<String>,
        guard: impl Fn(&C) -> bool + 'static,
    ) -> Result<Self, StateMachineError> {
        self.machine.add_transition(self.name, to, label, guard)?;
        Ok(self)
    }
}
