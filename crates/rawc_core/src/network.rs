//! Static description of a generated network's data segment.
//!
//! A generated model emits one [`NetworkLayout`] describing where its states,
//! derivatives and event values live inside a segment. The layout is immutable
//! for the lifetime of the model and is shared by every buffer built for it.

use crate::config::BuildOptions;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Values stored per event: previous margin, current margin, crossing distance.
pub const EVENT_VALUE_STRIDE: usize = 3;

/// Half-open interval `[start, end)` of offsets into a segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn empty() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The same range shifted by `base`, as a slice index.
    pub fn offset(&self, base: usize) -> std::ops::Range<usize> {
        base + self.start..base + self.end
    }

    fn check(self, name: &'static str, data_size: usize) -> Result<Self> {
        if self.start > self.end || self.end > data_size {
            return Err(Error::RangeOutOfBounds {
                name,
                start: self.start,
                end: self.end,
                data_size,
            });
        }
        Ok(self)
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(value: std::ops::Range<usize>) -> Self {
        Self::new(value.start, value.end)
    }
}

/// Shape of a logical variable stored as a column-major block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub rows: usize,
    pub columns: usize,
}

impl Dimension {
    pub const fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns }
    }

    pub const fn scalar() -> Self {
        Self::new(1, 1)
    }

    pub fn size(&self) -> usize {
        self.rows * self.columns
    }

    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.columns == 1
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self::scalar()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkLayout {
    data_size: usize,
    states: Range,
    derivatives: Range,
    event_values: Range,
    phase_slots: usize,
    time: Option<usize>,
    timestep: Option<usize>,
    event_refinement: bool,
    minimum_timestep: f64,
}

impl NetworkLayout {
    /// Creates a layout for segments of `data_size` values.
    ///
    /// Fails when a range does not fit in the segment or when states and
    /// derivatives differ in length.
    pub fn new(data_size: usize, states: Range, derivatives: Range) -> Result<Self> {
        if data_size == 0 {
            return Err(Error::EmptyLayout);
        }
        let states = states.check("states", data_size)?;
        let derivatives = derivatives.check("derivatives", data_size)?;
        if states.len() != derivatives.len() {
            return Err(Error::DerivativeMismatch {
                states: states.len(),
                derivatives: derivatives.len(),
            });
        }

        Ok(Self {
            data_size,
            states,
            derivatives,
            event_values: Range::empty(),
            phase_slots: 0,
            time: None,
            timestep: None,
            event_refinement: false,
            minimum_timestep: 0.0,
        })
    }

    /// Reserves `count` event slots starting at `start`.
    pub fn with_events(mut self, start: usize, count: usize) -> Result<Self> {
        let range = Range::new(start, start + count * EVENT_VALUE_STRIDE);
        self.event_values = range.check("event values", self.data_size)?;
        Ok(self)
    }

    /// Reserves one event-state slot per node that declares event phases.
    /// Phase slots live beside the segments, so rollback never touches them.
    pub fn with_phase_slots(mut self, count: usize) -> Self {
        self.phase_slots = count;
        self
    }

    /// Records the data indices holding the current time and time step.
    pub fn with_time_slots(mut self, time: usize, timestep: usize) -> Result<Self> {
        Range::new(time, time + 1).check("time", self.data_size)?;
        Range::new(timestep, timestep + 1).check("timestep", self.data_size)?;
        self.time = Some(time);
        self.timestep = Some(timestep);
        Ok(self)
    }

    pub fn with_event_refinement(mut self, minimum_timestep: f64) -> Self {
        self.event_refinement = true;
        self.minimum_timestep = minimum_timestep;
        self
    }

    /// Applies the refinement settings of a set of build options.
    pub fn with_options(mut self, options: &BuildOptions) -> Self {
        self.event_refinement = options.event_refinement;
        self.minimum_timestep = options.minimum_timestep;
        self
    }

    pub fn data_size(&self) -> usize {
        self.data_size
    }

    pub fn states(&self) -> Range {
        self.states
    }

    pub fn derivatives(&self) -> Range {
        self.derivatives
    }

    pub fn event_values(&self) -> Range {
        self.event_values
    }

    pub fn event_count(&self) -> usize {
        self.event_values.len() / EVENT_VALUE_STRIDE
    }

    pub fn phase_slots(&self) -> usize {
        self.phase_slots
    }

    pub fn time(&self) -> Option<usize> {
        self.time
    }

    pub fn timestep(&self) -> Option<usize> {
        self.timestep
    }

    pub fn event_refinement(&self) -> bool {
        self.event_refinement
    }

    pub fn minimum_timestep(&self) -> f64 {
        self.minimum_timestep
    }

    /// Number of segments a buffer needs for an integrator of `order`.
    pub fn segments(&self, order: usize) -> usize {
        order + usize::from(self.event_refinement)
    }
}
