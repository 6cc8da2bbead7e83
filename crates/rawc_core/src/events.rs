//! Event values and a table-driven implementation of the event callbacks.
//!
//! Every event monitors a condition whose *margin* is non-negative exactly
//! when the condition holds. An event crosses during a step when its margin
//! goes from negative at the previous accepted step to non-negative now; the
//! crossing distance is the linear estimate of where inside the step that
//! happened, in `[0, 1]`.
//!
//! Events may belong to a node with event states. Such an event only becomes
//! active while its node is in one of the event's phases, and firing it can
//! move the node to another phase and assign variables.

use crate::buffer::DataBuffer;
use crate::traits::{constant, Scalar};

/// Distance stored for events that did not cross in the current attempt.
pub const NO_CROSSING: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventValue<T> {
    pub previous: T,
    pub current: T,
    pub distance: T,
}

impl<T: Scalar> EventValue<T> {
    /// A value whose margin has not changed, e.g. right after `init`.
    pub fn settled(margin: T) -> Self {
        Self {
            previous: margin,
            current: margin,
            distance: constant(NO_CROSSING),
        }
    }

    pub fn crossed(&self) -> bool {
        self.distance >= T::zero()
    }
}

/// Predicate over values in segment 0, addressed by data index.
///
/// Strict and non-strict comparisons share a margin. An event fires when the
/// margin goes from negative to non-negative, so the point where both sides
/// are equal always counts as a crossing.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Less(usize, usize),
    LessOrEqual(usize, usize),
    Greater(usize, usize),
    GreaterOrEqual(usize, usize),
    /// Holds while both operands are within the event's approximation.
    Equal(usize, usize),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    /// Signed margin, non-negative when the condition holds.
    pub fn margin<T: Scalar>(&self, values: &[T], approximation: T) -> T {
        match self {
            Condition::Less(a, b) | Condition::LessOrEqual(a, b) => values[*b] - values[*a],
            Condition::Greater(a, b) | Condition::GreaterOrEqual(a, b) => {
                values[*a] - values[*b]
            }
            Condition::Equal(a, b) => approximation - (values[*a] - values[*b]).abs(),
            Condition::And(lhs, rhs) => lhs
                .margin(values, approximation)
                .min(rhs.margin(values, approximation)),
            Condition::Or(lhs, rhs) => lhs
                .margin(values, approximation)
                .max(rhs.margin(values, approximation)),
        }
    }
}

/// Right-hand side of a set-variable action, read from segment 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Constant(f64),
    Value(usize),
    /// `factor * values[index]`
    Scaled(usize, f64),
}

impl Operand {
    fn eval<T: Scalar>(self, values: &[T]) -> T {
        match self {
            Operand::Constant(value) => constant(value),
            Operand::Value(index) => values[index],
            Operand::Scaled(index, factor) => values[index] * constant(factor),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    pub target: usize,
    pub value: Operand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub condition: Condition,
    pub approximation: f64,
    /// Phase slot of the node owning the event.
    pub node: usize,
    /// Phases in which the event is enabled. Empty means always enabled.
    pub phases: Vec<usize>,
    /// Phase the node moves to when the event fires.
    pub goto: Option<usize>,
    /// Assignments applied in order when the event fires.
    pub actions: Vec<Assignment>,
}

impl Event {
    pub fn new(condition: Condition) -> Self {
        Self {
            condition,
            approximation: 0.0,
            node: 0,
            phases: Vec::new(),
            goto: None,
            actions: Vec::new(),
        }
    }

    pub fn with_approximation(mut self, approximation: f64) -> Self {
        self.approximation = approximation;
        self
    }

    pub fn on_node(mut self, slot: usize) -> Self {
        self.node = slot;
        self
    }

    pub fn in_phases(mut self, phases: impl IntoIterator<Item = usize>) -> Self {
        self.phases = phases.into_iter().collect();
        self
    }

    pub fn goto(mut self, phase: usize) -> Self {
        self.goto = Some(phase);
        self
    }

    pub fn set(mut self, target: usize, value: Operand) -> Self {
        self.actions.push(Assignment { target, value });
        self
    }

    /// Whether the owning node is in a phase that enables this event.
    pub fn is_enabled<T: Scalar>(&self, data: &DataBuffer<T>) -> bool {
        self.phases.is_empty() || self.phases.contains(&data.phase(self.node))
    }

    fn margin<T: Scalar>(&self, values: &[T]) -> T {
        self.condition.margin(values, constant(self.approximation))
    }
}

/// Conditions for every event slot of a layout, in index order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    events: Vec<Event>,
}

impl EventTable {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Seeds previous and current margins from the state in segment 0.
    pub fn prime<T: Scalar>(&self, data: &mut DataBuffer<T>) {
        data.clear_active_events();
        for (index, event) in self.events.iter().enumerate() {
            let margin = event.margin(data.data());
            data.set_event_value(index, EventValue::settled(margin));
        }
    }

    pub fn is_enabled<T: Scalar>(&self, index: usize, data: &DataBuffer<T>) -> bool {
        self.events[index].is_enabled(data)
    }

    /// Writes current margins and crossing distances, rebuilding the active
    /// set from the crossing events whose node is in an enabling phase.
    pub fn update<T: Scalar>(&self, data: &mut DataBuffer<T>) {
        data.clear_active_events();
        for (index, event) in self.events.iter().enumerate() {
            let previous = data.event_value(index).previous;
            let current = event.margin(data.data());
            let distance = if previous < T::zero() && current >= T::zero() {
                previous / (previous - current)
            } else {
                constant(NO_CROSSING)
            };

            data.set_event_value(
                index,
                EventValue {
                    previous,
                    current,
                    distance,
                },
            );
            if distance >= T::zero() && event.is_enabled(data) {
                data.activate_event(index);
            }
        }
    }

    /// Fires the active events in order. An event disabled by a phase change
    /// of an earlier event in the same call is skipped.
    pub fn fire<T: Scalar>(&self, data: &mut DataBuffer<T>) {
        for position in 0..data.active_events().len() {
            let event = &self.events[data.active_events()[position]];
            if !event.is_enabled(data) {
                continue;
            }
            if let Some(phase) = event.goto {
                data.set_phase(event.node, phase);
            }
            for action in &event.actions {
                let value = action.value.eval(data.data());
                data.set(action.target, value);
            }
        }
    }

    /// Commits the current margins as the reference for the next step.
    pub fn post_update<T: Scalar>(&self, data: &mut DataBuffer<T>) {
        for index in 0..self.events.len() {
            let mut value = data.event_value(index);
            value.previous = value.current;
            data.set_event_value(index, value);
        }
    }
}
