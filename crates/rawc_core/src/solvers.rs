use crate::buffer::DataBuffer;
use crate::integrator::StepReport;
use crate::traits::{constant, Integrator, Network, Scalar};
use serde::{Deserialize, Serialize};

/// Forward Euler integrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euler;

impl<T: Scalar> Integrator<T> for Euler {
    fn name(&self) -> &'static str {
        "euler"
    }

    fn order(&self) -> usize {
        1
    }

    fn diff<N: Network<T> + ?Sized>(&self, network: &N, data: &mut DataBuffer<T>, _t: T, dt: T) {
        let layout = network.layout();
        let states = layout.states();
        let derivatives = layout.derivatives();
        let values = data.as_mut_slice();

        // x_{n+1} = x_n + dt * dx/dt
        for i in 0..states.len() {
            values[states.start + i] = values[states.start + i] + dt * values[derivatives.start + i];
        }
    }
}

/// Classic Runge-Kutta 4th Order integrator.
///
/// Segment 0 is working storage. Segment 1 keeps the state at the start of
/// the step, and the derivative slots of segments 1 to 3 keep K1 to K3 while
/// K4 is evaluated in segment 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RungeKutta;

impl<T: Scalar> Integrator<T> for RungeKutta {
    fn name(&self) -> &'static str {
        "runge-kutta"
    }

    fn order(&self) -> usize {
        4
    }

    fn first_stage_dt(&self, dt: T) -> T {
        dt * constant(0.5)
    }

    fn diff<N: Network<T> + ?Sized>(&self, network: &N, data: &mut DataBuffer<T>, t: T, dt: T) {
        let half = constant::<T>(0.5) * dt;
        let sixth = dt / constant(6.0);
        let third = dt / constant(3.0);

        let layout = network.layout();
        let states = layout.states();
        let derivatives = layout.derivatives();
        let n = states.len();
        let segment = layout.data_size();
        let anchor = segment + states.start;
        let k = |stage: usize| stage * segment + derivatives.start;

        {
            let values = data.as_mut_slice();
            values.copy_within(states.offset(0), anchor);
            values.copy_within(derivatives.offset(0), k(1));
            // y = y0 + dt/2 * k1
            advance(values, states.start, anchor, k(1), half, n);
        }

        network.prediff(data);
        network.diff(data, t + half, half);
        {
            let values = data.as_mut_slice();
            values.copy_within(derivatives.offset(0), k(2));
            // y = y0 + dt/2 * k2
            advance(values, states.start, anchor, k(2), half, n);
        }

        network.prediff(data);
        network.diff(data, t + half, half);
        {
            let values = data.as_mut_slice();
            values.copy_within(derivatives.offset(0), k(3));
            // y = y0 + dt * k3
            advance(values, states.start, anchor, k(3), dt, n);
        }

        network.prediff(data);
        network.diff(data, t + dt, dt);

        // y_next = y0 + dt/6 * (k1 + 2k2 + 2k3 + k4)
        let values = data.as_mut_slice();
        for i in 0..n {
            values[states.start + i] = values[anchor + i]
                + sixth * values[k(1) + i]
                + third * values[k(2) + i]
                + third * values[k(3) + i]
                + sixth * values[derivatives.start + i];
        }
    }
}

fn advance<T: Scalar>(values: &mut [T], target: usize, anchor: usize, slope: usize, h: T, n: usize) {
    for i in 0..n {
        values[target + i] = values[anchor + i] + h * values[slope + i];
    }
}

/// Integrator choices available to generated models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntegratorKind {
    Euler,
    #[default]
    RungeKutta,
    /// Supplied by the model itself; cannot be built from options.
    Custom,
}

/// Runtime-selected builtin integrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stepper {
    Euler(Euler),
    RungeKutta(RungeKutta),
}

impl Stepper {
    /// Builds the integrator for `kind`, or `None` for custom integrators.
    pub fn build(kind: IntegratorKind) -> Option<Self> {
        match kind {
            IntegratorKind::Euler => Some(Stepper::Euler(Euler)),
            IntegratorKind::RungeKutta => Some(Stepper::RungeKutta(RungeKutta)),
            IntegratorKind::Custom => None,
        }
    }
}

impl<T: Scalar> Integrator<T> for Stepper {
    fn name(&self) -> &'static str {
        match self {
            Stepper::Euler(inner) => Integrator::<T>::name(inner),
            Stepper::RungeKutta(inner) => Integrator::<T>::name(inner),
        }
    }

    fn order(&self) -> usize {
        match self {
            Stepper::Euler(inner) => Integrator::<T>::order(inner),
            Stepper::RungeKutta(inner) => Integrator::<T>::order(inner),
        }
    }

    fn first_stage_dt(&self, dt: T) -> T {
        match self {
            Stepper::Euler(inner) => inner.first_stage_dt(dt),
            Stepper::RungeKutta(inner) => inner.first_stage_dt(dt),
        }
    }

    fn diff<N: Network<T> + ?Sized>(&self, network: &N, data: &mut DataBuffer<T>, t: T, dt: T) {
        match self {
            Stepper::Euler(inner) => inner.diff(network, data, t, dt),
            Stepper::RungeKutta(inner) => inner.diff(network, data, t, dt),
        }
    }

    fn step<N: Network<T> + ?Sized>(
        &self,
        network: &N,
        data: &mut DataBuffer<T>,
        t: T,
        dt: T,
    ) -> StepReport<T> {
        match self {
            Stepper::Euler(inner) => inner.step(network, data, t, dt),
            Stepper::RungeKutta(inner) => inner.step(network, data, t, dt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{NetworkLayout, Range};
    use approx::assert_relative_eq;

    /// dx/dt = -lambda * x with a single state.
    struct Decay {
        layout: NetworkLayout,
        lambda: f64,
        prediffs: std::cell::Cell<usize>,
    }

    impl Decay {
        fn new(lambda: f64) -> Self {
            Self {
                layout: NetworkLayout::new(2, Range::new(0, 1), Range::new(1, 2)).unwrap(),
                lambda,
                prediffs: std::cell::Cell::new(0),
            }
        }
    }

    impl Network<f64> for Decay {
        fn layout(&self) -> &NetworkLayout {
            &self.layout
        }

        fn init(&self, data: &mut DataBuffer<f64>, _t: f64) {
            data.set(0, 1.0);
        }

        fn prediff(&self, _data: &mut DataBuffer<f64>) {
            self.prediffs.set(self.prediffs.get() + 1);
        }

        fn diff(&self, data: &mut DataBuffer<f64>, _t: f64, _dt: f64) {
            let x = data.get(0);
            data.set(1, -self.lambda * x);
        }
    }

    #[test]
    fn euler_step_is_exact() {
        let network = Decay::new(2.0);
        let mut data = network.alloc(Integrator::<f64>::order(&Euler)).unwrap();
        network.init(&mut data, 0.0);
        data.set(0, 3.0);

        let report = Euler.step(&network, &mut data, 0.0, 0.1);
        assert_eq!(report.dt, 0.1);
        assert_relative_eq!(data.get(0), 3.0 * (1.0 - 2.0 * 0.1), epsilon = 1e-15);
    }

    #[test]
    fn runge_kutta_matches_fourth_order_taylor_polynomial() {
        let lambda = 1.5;
        let dt = 0.2;
        let network = Decay::new(lambda);
        let mut data = network.alloc(Integrator::<f64>::order(&RungeKutta)).unwrap();
        assert_eq!(data.segment_count(), 4);
        network.init(&mut data, 0.0);

        RungeKutta.step(&network, &mut data, 0.0, dt);

        let h = lambda * dt;
        let expected = 1.0 - h + h * h / 2.0 - h.powi(3) / 6.0 + h.powi(4) / 24.0;
        assert_relative_eq!(data.get(0), expected, epsilon = 1e-14);
        assert_eq!(network.prediffs.get(), 3);
        // Segment 1 keeps the state at the start of the step.
        assert_eq!(data.states(1), &[1.0]);
        assert_relative_eq!(data.derivatives(1)[0], -lambda);
    }

    #[test]
    fn stepper_dispatches_to_builtin_integrators() {
        let network = Decay::new(1.0);
        let stepper = Stepper::build(IntegratorKind::RungeKutta).unwrap();
        assert_eq!(Integrator::<f64>::order(&stepper), 4);
        assert_eq!(Integrator::<f64>::name(&stepper), "runge-kutta");
        assert!(Stepper::build(IntegratorKind::Custom).is_none());

        let mut by_stepper = network.alloc(4).unwrap();
        let mut direct = network.alloc(4).unwrap();
        network.init(&mut by_stepper, 0.0);
        network.init(&mut direct, 0.0);
        stepper.step(&network, &mut by_stepper, 0.0, 0.05);
        RungeKutta.step(&network, &mut direct, 0.0, 0.05);
        assert_eq!(by_stepper.as_slice(), direct.as_slice());
    }

    #[test]
    fn integrator_kind_uses_kebab_case_names() {
        let kind: IntegratorKind = serde_json::from_str("\"runge-kutta\"").unwrap();
        assert_eq!(kind, IntegratorKind::RungeKutta);
        assert_eq!(serde_json::to_string(&IntegratorKind::Euler).unwrap(), "\"euler\"");
    }
}
