//! The generic integrator step and the driver loop built on it.
//!
//! # Algorithm
//!
//! One call to [`refine_step`] advances segment 0 from `t` to `t + dt`:
//!
//! 1. `pre(t, dt)` runs once.
//! 2. With event refinement, segment 0 is snapshotted into the scratch segment.
//! 3. The network evaluates derivatives, the integrator advances the state and
//!    `post(t + dt, dt)` finalizes the attempt.
//! 4. `events_update` rebuilds the active set. With no active event the step
//!    is accepted. Otherwise the nearest crossing decides: when it lies at the
//!    end of the step, or the step cannot shrink below the minimum time step,
//!    the events fire and the step is accepted. Otherwise `dt` shrinks to the
//!    crossing, segment 0 is restored and the attempt repeats.
//!
//! Termination relies on `dt` shrinking monotonically toward the minimum
//! time step, so there is no iteration bound.

use crate::buffer::DataBuffer;
use crate::traits::{constant, Integrator, Network, Scalar};
use tracing::{debug, info, trace, warn};

/// Crossings at or beyond `1 - DISTANCE_TOLERANCE` count as the end of the step.
pub const DISTANCE_TOLERANCE: f64 = 1e-9;

/// Outcome of one accepted step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport<T> {
    /// The step size that was accepted, at most the requested one.
    pub dt: T,
    /// Number of rolled-back attempts.
    pub refinements: usize,
    /// Whether `events_fire` ran.
    pub fired: bool,
}

/// Advances `data` by one step of the integrator.
pub fn step<T, I, N>(integrator: &I, network: &N, data: &mut DataBuffer<T>, t: T, dt: T) -> StepReport<T>
where
    T: Scalar,
    I: Integrator<T> + ?Sized,
    N: Network<T> + ?Sized,
{
    integrator.step(network, data, t, dt)
}

/// The event-refining step every builtin integrator uses.
pub fn refine_step<T, I, N>(
    integrator: &I,
    network: &N,
    data: &mut DataBuffer<T>,
    t: T,
    dt: T,
) -> StepReport<T>
where
    T: Scalar,
    I: Integrator<T> + ?Sized,
    N: Network<T> + ?Sized,
{
    let refine = network.layout().event_refinement() && data.scratch_segment().is_some();
    let minimum_timestep = constant::<T>(network.layout().minimum_timestep());
    let end_of_step = constant::<T>(1.0 - DISTANCE_TOLERANCE);

    network.pre(data, t, dt);
    if refine {
        data.snapshot();
    }

    let mut dt = dt;
    let mut refinements = 0;
    loop {
        data.set_clock(t, dt);
        network.diff(data, t, integrator.first_stage_dt(dt));
        integrator.diff(network, data, t, dt);
        network.post(data, t + dt, dt);

        network.events_update(data);
        let Some(&event) = data.active_events().first() else {
            network.events_post_update(data);
            data.set_clock(t + dt, dt);
            if refinements > 0 {
                debug!(t = ?t, dt = ?dt, refinements, "accepted refined step without events");
            }
            return StepReport {
                dt,
                refinements,
                fired: false,
            };
        };

        let mut distance = data.event_value(event).distance;
        if !distance.is_finite() {
            distance = T::zero();
        }

        let at_floor = dt <= minimum_timestep;
        if !refine || at_floor || distance >= end_of_step {
            if refine && at_floor && distance < end_of_step {
                warn!(
                    t = ?t,
                    dt = ?dt,
                    event,
                    distance = ?distance,
                    "event refinement stalled at the minimum time step"
                );
            }
            network.events_fire(data);
            network.events_post_update(data);
            network.post(data, t + dt, dt);
            data.set_clock(t + dt, dt);
            debug!(t = ?t, dt = ?dt, event, refinements, "events fired");
            return StepReport {
                dt,
                refinements,
                fired: true,
            };
        }

        dt = (distance * dt).max(minimum_timestep);
        refinements += 1;
        trace!(t = ?t, dt = ?dt, event, distance = ?distance, "refining step");
        data.restore();
    }
}

/// Steps from `from` until `to` is reached or the network terminates.
///
/// Returns the time reached. The last step is not shortened to land on `to`.
pub fn run<T, I, N>(integrator: &I, network: &N, data: &mut DataBuffer<T>, from: T, step: T, to: T) -> T
where
    T: Scalar,
    I: Integrator<T> + ?Sized,
    N: Network<T> + ?Sized,
{
    run_observed(integrator, network, data, from, step, to, |_, _| {})
}

/// Like [`run`], calling `observe` with the new time after every step.
pub fn run_observed<T, I, N, F>(
    integrator: &I,
    network: &N,
    data: &mut DataBuffer<T>,
    from: T,
    step: T,
    to: T,
    mut observe: F,
) -> T
where
    T: Scalar,
    I: Integrator<T> + ?Sized,
    N: Network<T> + ?Sized,
    F: FnMut(T, &DataBuffer<T>),
{
    info!(
        integrator = integrator.name(),
        from = ?from,
        step = ?step,
        to = ?to,
        "starting run"
    );

    let mut t = from;
    let mut steps = 0usize;
    while t < to && !network.terminated(data) {
        let report = integrator.step(network, data, t, step);
        let advance = network.timestep(data, report.dt);
        if !(advance > T::zero()) {
            warn!(t = ?t, advance = ?advance, "network reported a non-positive time step");
            break;
        }
        t = t + advance;
        steps += 1;
        observe(t, data);
    }

    info!(steps, t = ?t, terminated = network.terminated(data), "run finished");
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Condition, Event, EventTable, EventValue, Operand};
    use crate::network::{NetworkLayout, Range};
    use crate::solvers::{Euler, RungeKutta};
    use approx::assert_relative_eq;
    use std::cell::{Cell, RefCell};

    /// A network that reports a scripted sequence of crossing distances.
    struct Scripted {
        layout: NetworkLayout,
        distances: RefCell<Vec<f64>>,
        fired: Cell<usize>,
        attempts: RefCell<Vec<f64>>,
    }

    impl Scripted {
        fn new(distances: Vec<f64>, minimum_timestep: f64) -> Self {
            let layout = NetworkLayout::new(5, Range::new(0, 1), Range::new(1, 2))
                .and_then(|l| l.with_events(2, 1))
                .map(|l| l.with_event_refinement(minimum_timestep))
                .unwrap();
            Self {
                layout,
                distances: RefCell::new(distances),
                fired: Cell::new(0),
                attempts: RefCell::new(Vec::new()),
            }
        }
    }

    impl Network<f64> for Scripted {
        fn layout(&self) -> &NetworkLayout {
            &self.layout
        }

        fn init(&self, data: &mut DataBuffer<f64>, _t: f64) {
            data.set(0, 0.0);
        }

        fn diff(&self, data: &mut DataBuffer<f64>, _t: f64, dt: f64) {
            self.attempts.borrow_mut().push(dt);
            data.set(1, 1.0);
        }

        fn events_update(&self, data: &mut DataBuffer<f64>) {
            data.clear_active_events();
            let mut distances = self.distances.borrow_mut();
            let distance = if distances.len() > 1 {
                distances.remove(0)
            } else {
                distances[0]
            };
            data.set_event_value(
                0,
                EventValue {
                    previous: -1.0,
                    current: 1.0,
                    distance,
                },
            );
            if distance >= 0.0 || distance.is_nan() {
                data.activate_event(0);
            }
        }

        fn events_fire(&self, _data: &mut DataBuffer<f64>) {
            self.fired.set(self.fired.get() + 1);
        }
    }

    #[test]
    fn crossing_mid_step_refines_once() {
        let network = Scripted::new(vec![0.5, 1.0], 1e-6);
        let mut data = network.alloc(1).unwrap();
        network.init(&mut data, 0.0);

        let report = step(&Euler, &network, &mut data, 0.0, 0.1);
        assert_eq!(report.refinements, 1);
        assert!(report.fired);
        assert!(report.dt <= 0.1);
        assert_relative_eq!(report.dt, 0.05);
        assert_eq!(network.fired.get(), 1);
        // The rolled-back attempt leaves no trace in the state.
        assert_relative_eq!(data.get(0), 0.05);
    }

    #[test]
    fn zero_distance_terminates_at_minimum_timestep() {
        let network = Scripted::new(vec![0.0], 1e-6);
        let mut data = network.alloc(1).unwrap();
        network.init(&mut data, 0.0);

        let report = step(&Euler, &network, &mut data, 0.0, 0.1);
        assert!(report.fired);
        assert_eq!(report.refinements, 1);
        assert_eq!(report.dt, 1e-6);
        assert_eq!(network.attempts.borrow().as_slice(), &[0.1, 1e-6]);
    }

    #[test]
    fn non_finite_distance_is_treated_as_zero() {
        let network = Scripted::new(vec![f64::NAN], 1e-3);
        let mut data = network.alloc(1).unwrap();
        network.init(&mut data, 0.0);

        let report = step(&Euler, &network, &mut data, 0.0, 0.1);
        assert!(report.fired);
        assert_eq!(report.dt, 1e-3);
    }

    #[test]
    fn runge_kutta_refinement_restores_stage_input() {
        let network = Scripted::new(vec![0.25, 1.0], 1e-6);
        let mut data = network.alloc(4).unwrap();
        assert_eq!(data.segment_count(), 5);
        network.init(&mut data, 0.0);

        let report = step(&RungeKutta, &network, &mut data, 0.0, 0.2);
        assert_eq!(report.refinements, 1);
        assert_relative_eq!(report.dt, 0.05);
        assert_relative_eq!(data.get(0), 0.05, epsilon = 1e-15);
        // First network evaluation of each attempt uses half the step.
        assert_relative_eq!(network.attempts.borrow()[0], 0.1);
        assert_relative_eq!(network.attempts.borrow()[4], 0.025);
    }

    /// A falling ball that bounces when its height crosses zero.
    struct Ball {
        layout: NetworkLayout,
        events: EventTable,
    }

    impl Ball {
        fn new() -> Self {
            // height, velocity | dheight, dvelocity | ground | event slots | t, dt
            let layout = NetworkLayout::new(10, Range::new(0, 2), Range::new(2, 4))
                .and_then(|l| l.with_events(5, 1))
                .and_then(|l| l.with_time_slots(8, 9))
                .map(|l| l.with_event_refinement(1e-9))
                .unwrap();
            Self {
                layout,
                events: EventTable::new(vec![Event::new(Condition::Less(0, 4))
                    .set(1, Operand::Scaled(1, -0.5))
                    .set(0, Operand::Constant(0.0))]),
            }
        }
    }

    impl Network<f64> for Ball {
        fn layout(&self) -> &NetworkLayout {
            &self.layout
        }

        fn init(&self, data: &mut DataBuffer<f64>, _t: f64) {
            data.set(0, 1.0);
            data.set(1, 0.0);
            self.events.prime(data);
        }

        fn diff(&self, data: &mut DataBuffer<f64>, _t: f64, _dt: f64) {
            let velocity = data.get(1);
            data.set(2, velocity);
            data.set(3, -9.81);
        }

        fn events_update(&self, data: &mut DataBuffer<f64>) {
            self.events.update(data);
        }

        fn events_post_update(&self, data: &mut DataBuffer<f64>) {
            self.events.post_update(data);
        }

        fn events_fire(&self, data: &mut DataBuffer<f64>) {
            self.events.fire(data);
            self.events.prime(data);
        }
    }

    #[test]
    fn run_lands_bouncing_ball_on_the_ground() {
        let network = Ball::new();
        let mut data = network.alloc(4).unwrap();
        network.init(&mut data, 0.0);

        let mut heights = Vec::new();
        let t = run_observed(&RungeKutta, &network, &mut data, 0.0, 0.01, 1.0, |_, data| {
            heights.push(data.get(0));
        });

        assert!(t >= 1.0);
        assert!(heights.iter().all(|&h| h >= -1e-6));
        assert_eq!(data.get(8), t);
        assert!(data.get(1) != 0.0);
    }

    #[test]
    fn run_without_events_advances_by_fixed_steps() {
        let network = Scripted::new(vec![-1.0], 1e-6);
        let mut data = network.alloc(1).unwrap();
        network.init(&mut data, 0.0);
        let mut times = Vec::new();
        let t = run_observed(&Euler, &network, &mut data, 0.0, 0.25, 1.0, |t, _| times.push(t));
        assert_eq!(times, vec![0.25, 0.5, 0.75, 1.0]);
        assert_eq!(t, 1.0);
    }
}
