//! The segmented data arena shared by a network and its integrator.
//!
//! A buffer holds `order + event_refinement` consecutive segments of
//! `data_size` values. Segment 0 is the live state of the network, segments
//! `1..order` hold integrator stage data and the optional last segment is the
//! snapshot a refining step rolls back to. Everything, including the active
//! event list, is sized up front so stepping never allocates.

use crate::error::{Error, Result};
use crate::events::EventValue;
use crate::network::{NetworkLayout, EVENT_VALUE_STRIDE};
use crate::traits::Scalar;

#[derive(Debug, Clone)]
pub struct DataBuffer<T> {
    layout: NetworkLayout,
    order: usize,
    segments: usize,
    values: Vec<T>,
    active: Vec<usize>,
    phases: Vec<usize>,
}

impl<T: Scalar> DataBuffer<T> {
    pub fn new(layout: NetworkLayout, order: usize) -> Result<Self> {
        if order == 0 {
            return Err(Error::ZeroOrder);
        }
        let segments = layout.segments(order);
        let values = vec![T::zero(); segments * layout.data_size()];
        let active = Vec::with_capacity(layout.event_count());
        let phases = vec![0; layout.phase_slots()];

        Ok(Self {
            layout,
            order,
            segments,
            values,
            active,
            phases,
        })
    }

    pub fn layout(&self) -> &NetworkLayout {
        &self.layout
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn segment_count(&self) -> usize {
        self.segments
    }

    pub fn data_size(&self) -> usize {
        self.layout.data_size()
    }

    /// Offset of the first value of `segment` in the flat buffer.
    pub fn offset(&self, segment: usize) -> usize {
        debug_assert!(segment < self.segments);
        segment * self.layout.data_size()
    }

    pub fn nth(&self, segment: usize) -> &[T] {
        let start = self.offset(segment);
        &self.values[start..start + self.data_size()]
    }

    pub fn nth_mut(&mut self, segment: usize) -> &mut [T] {
        let start = self.offset(segment);
        let end = start + self.data_size();
        &mut self.values[start..end]
    }

    /// Checked variant of [`DataBuffer::nth`] for driver code.
    pub fn try_nth(&self, segment: usize) -> Result<&[T]> {
        if segment >= self.segments {
            return Err(Error::SegmentOutOfRange {
                segment,
                segments: self.segments,
            });
        }
        Ok(self.nth(segment))
    }

    pub fn data(&self) -> &[T] {
        self.nth(0)
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        self.nth_mut(0)
    }

    pub fn states(&self, segment: usize) -> &[T] {
        let range = self.layout.states().offset(self.offset(segment));
        &self.values[range]
    }

    pub fn states_mut(&mut self, segment: usize) -> &mut [T] {
        let range = self.layout.states().offset(self.offset(segment));
        &mut self.values[range]
    }

    pub fn derivatives(&self, segment: usize) -> &[T] {
        let range = self.layout.derivatives().offset(self.offset(segment));
        &self.values[range]
    }

    pub fn derivatives_mut(&mut self, segment: usize) -> &mut [T] {
        let range = self.layout.derivatives().offset(self.offset(segment));
        &mut self.values[range]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Reads value `index` of segment 0.
    pub fn get(&self, index: usize) -> T {
        self.values[index]
    }

    pub fn set(&mut self, index: usize, value: T) {
        self.values[index] = value;
    }

    /// Writes the current time and step size into the layout's time slots.
    pub fn set_clock(&mut self, t: T, dt: T) {
        if let Some(index) = self.layout.time() {
            self.values[index] = t;
        }
        if let Some(index) = self.layout.timestep() {
            self.values[index] = dt;
        }
    }

    /// Segment used to roll back refined steps, if the layout reserves one.
    pub fn scratch_segment(&self) -> Option<usize> {
        self.layout.event_refinement().then_some(self.order)
    }

    /// Copies segment 0 into the scratch segment.
    pub fn snapshot(&mut self) {
        if let Some(scratch) = self.scratch_segment() {
            let start = self.offset(scratch);
            let size = self.data_size();
            self.values.copy_within(0..size, start);
        }
    }

    /// Restores segment 0 from the scratch segment.
    pub fn restore(&mut self) {
        if let Some(scratch) = self.scratch_segment() {
            let start = self.offset(scratch);
            let size = self.data_size();
            self.values.copy_within(start..start + size, 0);
        }
    }

    /// Zeroes every segment except segment 0.
    pub fn clear_scratch(&mut self) {
        let size = self.data_size();
        self.values[size..].fill(T::zero());
    }

    pub fn event_value(&self, event: usize) -> EventValue<T> {
        let base = self.event_base(event);
        EventValue {
            previous: self.values[base],
            current: self.values[base + 1],
            distance: self.values[base + 2],
        }
    }

    pub fn set_event_value(&mut self, event: usize, value: EventValue<T>) {
        let base = self.event_base(event);
        self.values[base] = value.previous;
        self.values[base + 1] = value.current;
        self.values[base + 2] = value.distance;
    }

    fn event_base(&self, event: usize) -> usize {
        debug_assert!(event < self.layout.event_count());
        self.layout.event_values().start + event * EVENT_VALUE_STRIDE
    }

    /// Current event state of the node owning phase `slot`.
    pub fn phase(&self, slot: usize) -> usize {
        self.phases[slot]
    }

    pub fn set_phase(&mut self, slot: usize, phase: usize) {
        self.phases[slot] = phase;
    }

    /// Returns every node to its initial event state.
    pub fn reset_phases(&mut self) {
        self.phases.fill(0);
    }

    /// Active events, nearest crossing first.
    pub fn active_events(&self) -> &[usize] {
        &self.active
    }

    pub fn clear_active_events(&mut self) {
        self.active.clear();
    }

    /// Inserts `event` into the active set, keeping it ordered by crossing
    /// distance and then by event index.
    pub fn activate_event(&mut self, event: usize) {
        if self.active.contains(&event) {
            return;
        }
        let distance = self.event_value(event).distance;
        let position = self.active.partition_point(|&other| {
            let other_distance = self.event_value(other).distance;
            other_distance < distance || (other_distance == distance && other < event)
        });
        self.active.insert(position, event);
    }
}
