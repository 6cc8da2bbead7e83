use crate::buffer::DataBuffer;
use crate::error::Result;
use crate::integrator::{refine_step, StepReport};
use crate::meta::NetworkMeta;
use crate::network::{Dimension, NetworkLayout};
use num_traits::{Float, FromPrimitive, NumAssign};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in generated networks.
/// Covers both `float` (`f32`) and `double` (`f64`) precision builds.
///
/// The compound-assignment operators are required so that builtin and
/// accelerated kernels accept exactly the same scalar types.
pub trait Scalar: Float + FromPrimitive + NumAssign + Debug + 'static {}

impl<T: Float + FromPrimitive + NumAssign + Debug + 'static> Scalar for T {}

/// Converts an `f64` literal into the network's scalar type.
pub(crate) fn constant<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}

/// The callback contract every generated network implements.
///
/// All callbacks operate on the buffer passed in and never fail: the buffer
/// was sized for this network when it was allocated. Only `layout`, `init`
/// and `diff` are required; the remaining callbacks default to the behavior
/// of a network without auxiliary variables or events.
pub trait Network<T: Scalar> {
    /// Where states, derivatives and event values live in a segment.
    fn layout(&self) -> &NetworkLayout;

    /// Allocates a buffer for an integrator of the given order.
    fn alloc(&self, order: usize) -> Result<DataBuffer<T>> {
        DataBuffer::new(self.layout().clone(), order)
    }

    /// One-time setup before integration.
    fn prepare(&self, _data: &mut DataBuffer<T>, _t: T) {}

    /// Establishes the initial state in segment 0.
    fn init(&self, data: &mut DataBuffer<T>, t: T);

    /// Clears integrator scratch segments and event phases, then
    /// re-initializes.
    fn reset(&self, data: &mut DataBuffer<T>, t: T) {
        data.clear_scratch();
        data.reset_phases();
        self.init(data, t);
    }

    /// Called once per full step, before any stage.
    fn pre(&self, _data: &mut DataBuffer<T>, _t: T, _dt: T) {}

    /// Refreshes auxiliary variables before a stage re-evaluates derivatives.
    fn prediff(&self, _data: &mut DataBuffer<T>) {}

    /// Writes derivatives for the current segment. `dt` is stage-local.
    fn diff(&self, data: &mut DataBuffer<T>, t: T, dt: T);

    /// Finalizes a completed step; `t` is the time after the step.
    fn post(&self, _data: &mut DataBuffer<T>, _t: T, _dt: T) {}

    /// Recomputes every event value and the ordered active set.
    fn events_update(&self, data: &mut DataBuffer<T>) {
        data.clear_active_events();
    }

    fn events_post_update(&self, _data: &mut DataBuffer<T>) {}

    fn events_fire(&self, _data: &mut DataBuffer<T>) {}

    /// Shape of logical variable `index`.
    fn dimension(&self, _index: usize) -> Dimension {
        Dimension::scalar()
    }

    fn meta(&self) -> Option<&NetworkMeta> {
        None
    }

    /// Whether a terminal event has stopped the simulation.
    fn terminated(&self, _data: &DataBuffer<T>) -> bool {
        false
    }

    /// Time the driver advances by after an accepted step of `accepted`.
    fn timestep(&self, _data: &DataBuffer<T>, accepted: T) -> T {
        accepted
    }
}

/// A stateless integration strategy selected once per model.
pub trait Integrator<T: Scalar> {
    fn name(&self) -> &'static str;

    /// Number of buffer segments the integrator works in.
    fn order(&self) -> usize;

    /// Step size for the framework's first derivative evaluation.
    fn first_stage_dt(&self, dt: T) -> T {
        dt
    }

    /// Advances segment 0 by `dt`, assuming its derivatives were just evaluated.
    fn diff<N: Network<T> + ?Sized>(&self, network: &N, data: &mut DataBuffer<T>, t: T, dt: T);

    /// Performs one full step. Overriding this replaces the event-refining
    /// step entirely.
    fn step<N: Network<T> + ?Sized>(
        &self,
        network: &N,
        data: &mut DataBuffer<T>,
        t: T,
        dt: T,
    ) -> StepReport<T> {
        refine_step(self, network, data, t, dt)
    }
}
