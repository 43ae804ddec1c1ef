//! # States
//!
//! Stack of application states such as menus, gameplay and pause screens. Changes to the stack are
//! requested at any time and applied at the start of the next [StateStack::simulate].

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use crate::Diagnostics;
use crate::Event;
use crate::LogDiagnostics;
use crate::Message;
use crate::Severity;

/// # State ID
///
/// Application defined identifier of a [State].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct StateId(pub u32);

/// # State
///
/// Every method returns whether the states below this one should also receive the call.
pub trait State {
    /// Handles a window event.
    fn handle_event(&mut self, event: &Event) -> bool {
        let _ = event;
        true
    }

    /// Handles a message.
    fn handle_message(&mut self, message: &Message) -> bool {
        let _ = message;
        true
    }

    /// Advances the state by `dt`.
    fn simulate(&mut self, dt: Duration) -> bool;
}

type Factory = Box<dyn Fn() -> Box<dyn State>>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Change {
    Push { id: StateId, suspend: bool },
    Pop,
    Clear,
}

/// # State Stack
pub struct StateStack {
    factories: BTreeMap<StateId, Factory>,
    stack: Vec<(StateId, Box<dyn State>)>,
    suspended: Vec<(StateId, (StateId, Box<dyn State>))>,
    pending: Vec<Change>,
    diagnostics: Rc<dyn Diagnostics>,
}

impl StateStack {
    /// Returns an empty stack reporting through the given diagnostics.
    pub fn new(diagnostics: Rc<dyn Diagnostics>) -> Self {
        Self {
            factories: BTreeMap::new(),
            stack: Vec::new(),
            suspended: Vec::new(),
            pending: Vec::new(),
            diagnostics,
        }
    }

    /// Registers the factory creating the state with the given ID, replacing any previous one.
    pub fn register<S: State + 'static>(&mut self, id: StateId, factory: impl Fn() -> S + 'static) {
        self.factories
            .insert(id, Box::new(move || Box::new(factory()) as Box<dyn State>));
    }

    /// Requests a new state on top of the stack, unless the state is already on top.
    pub fn push(&mut self, id: StateId) {
        if self.top() != Some(id) {
            self.pending.push(Change::Push { id, suspend: false });
        }
    }

    /// Requests a new state replacing the top of the stack until the new state is popped.
    pub fn push_suspending(&mut self, id: StateId) {
        self.pending.push(Change::Push { id, suspend: true });
    }

    /// Requests removal of the top state.
    pub fn pop(&mut self) {
        self.pending.push(Change::Pop);
    }

    /// Requests removal of every state.
    pub fn clear(&mut self) {
        self.pending.push(Change::Clear);
    }

    /// Returns the ID of the top state.
    pub fn top(&self) -> Option<StateId> {
        self.stack.last().map(|(id, _)| *id)
    }

    /// Returns the IDs of the states from bottom to top.
    pub fn ids(&self) -> impl Iterator<Item = StateId> + '_ {
        self.stack.iter().map(|(id, _)| *id)
    }

    /// Returns the number of states.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns true if there are no states.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Passes the event to the states from the top down.
    pub fn handle_event(&mut self, event: &Event) {
        for (_, state) in self.stack.iter_mut().rev() {
            if !state.handle_event(event) {
                break;
            }
        }
    }

    /// Passes the message to the states from the top down.
    pub fn handle_message(&mut self, message: &Message) {
        for (_, state) in self.stack.iter_mut().rev() {
            if !state.handle_message(message) {
                break;
            }
        }
    }

    /// Applies the requested changes, then simulates the states from the top down.
    pub fn simulate(&mut self, dt: Duration) {
        self.apply_pending_changes();

        for (_, state) in self.stack.iter_mut().rev() {
            if !state.simulate(dt) {
                break;
            }
        }
    }

    fn apply_pending_changes(&mut self) {
        for change in std::mem::take(&mut self.pending) {
            match change {
                Change::Push { id, suspend } => {
                    let Some(factory) = self.factories.get(&id) else {
                        self.diagnostics
                            .log(&format!("state {} is not registered", id.0), Severity::Error);
                        continue;
                    };
                    let state = factory();

                    if suspend {
                        if let Some(previous) = self.stack.pop() {
                            self.suspended.push((id, previous));
                        }
                    }

                    self.stack.push((id, state));
                }
                Change::Pop => {
                    let Some((id, _)) = self.stack.pop() else {
                        continue;
                    };

                    if self.suspended.last().is_some_and(|(suspender, _)| *suspender == id) {
                        if let Some((_, previous)) = self.suspended.pop() {
                            self.stack.push(previous);
                        }
                    }
                }
                Change::Clear => {
                    self.stack.clear();
                    self.suspended.clear();
                }
            }
        }
    }
}

impl Default for StateStack {
    fn default() -> Self {
        Self::new(Rc::new(LogDiagnostics))
    }
}
