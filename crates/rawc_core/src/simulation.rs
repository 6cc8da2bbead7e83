//! A self-contained driver owning a network, its integrator and its buffer.

use crate::buffer::DataBuffer;
use crate::config::{BuildOptions, Precision};
use crate::integrator::{run_observed, StepReport};
use crate::network::Dimension;
use crate::solvers::Stepper;
use crate::traits::{Integrator, Network, Scalar};
use anyhow::{bail, Context};

pub struct Simulation<T, N, I> {
    network: N,
    integrator: I,
    data: DataBuffer<T>,
    t: T,
}

impl<T, N, I> Simulation<T, N, I>
where
    T: Scalar,
    N: Network<T>,
    I: Integrator<T>,
{
    pub fn new(network: N, integrator: I) -> crate::Result<Self> {
        let data = network.alloc(integrator.order())?;
        Ok(Self {
            network,
            integrator,
            data,
            t: T::zero(),
        })
    }

    pub fn prepare(&mut self, t: T) {
        self.network.prepare(&mut self.data, t);
    }

    pub fn init(&mut self, t: T) {
        self.network.init(&mut self.data, t);
        self.t = t;
    }

    pub fn reset(&mut self, t: T) {
        self.network.reset(&mut self.data, t);
        self.t = t;
    }

    /// Advances by one step of at most `dt`.
    pub fn step(&mut self, dt: T) -> StepReport<T> {
        let report = self
            .integrator
            .step(&self.network, &mut self.data, self.t, dt);
        self.t = self.t + self.network.timestep(&self.data, report.dt);
        report
    }

    /// Steps until `to` and returns the time reached.
    pub fn run(&mut self, step: T, to: T) -> T {
        self.run_observed(step, to, |_, _| {})
    }

    pub fn run_observed<F>(&mut self, step: T, to: T, observe: F) -> T
    where
        F: FnMut(T, &DataBuffer<T>),
    {
        self.t = run_observed(
            &self.integrator,
            &self.network,
            &mut self.data,
            self.t,
            step,
            to,
            observe,
        );
        self.t
    }

    pub fn t(&self) -> T {
        self.t
    }

    pub fn get(&self, index: usize) -> T {
        self.data.get(index)
    }

    pub fn set(&mut self, index: usize, value: T) {
        self.data.set(index, value);
    }

    pub fn data(&self) -> &DataBuffer<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataBuffer<T> {
        &mut self.data
    }

    pub fn dimension(&self, index: usize) -> Dimension {
        self.network.dimension(index)
    }

    /// Data index of a state named by its dotted path.
    pub fn find_variable(&self, path: &str) -> Option<usize> {
        self.network.meta()?.find_variable(path)
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn integrator(&self) -> &I {
        &self.integrator
    }
}

impl<T, N> Simulation<T, N, Stepper>
where
    T: Scalar,
    N: Network<T>,
{
    /// Builds a simulation with the builtin integrator named by `options`.
    pub fn from_options(network: N, options: &BuildOptions) -> anyhow::Result<Self> {
        options.validate().context("invalid build options")?;

        if Precision::of::<T>() != Some(options.precision) {
            bail!(
                "scalar type does not match {:?} precision",
                options.precision
            );
        }
        if network.layout().event_refinement() != options.event_refinement {
            bail!(
                "network layout event refinement ({}) does not match build options ({})",
                network.layout().event_refinement(),
                options.event_refinement
            );
        }
        let Some(stepper) = Stepper::build(options.integrator) else {
            bail!("custom integrators must be passed to Simulation::new");
        };

        Self::new(network, stepper).context("failed to allocate simulation buffer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{ChildKind, ChildMeta, NetworkMeta, NodeMeta, StateMeta};
    use crate::network::{NetworkLayout, Range};
    use crate::solvers::{Euler, IntegratorKind};
    use approx::assert_relative_eq;

    static NODES: [NodeMeta; 1] = [NodeMeta {
        name: "",
        parent: None,
        first_child: Some(0),
    }];
    static STATES: [StateMeta; 1] = [StateMeta {
        name: "x",
        parent: 0,
        index: 0,
    }];
    static CHILDREN: [ChildMeta; 1] = [ChildMeta {
        kind: ChildKind::State(0),
        next: None,
    }];

    /// dx/dt = 1 with the time kept in data slot 2.
    struct Ramp {
        layout: NetworkLayout,
        meta: NetworkMeta,
    }

    impl Ramp {
        fn new(options: &BuildOptions) -> Self {
            Self {
                layout: NetworkLayout::new(4, Range::new(0, 1), Range::new(1, 2))
                    .and_then(|l| l.with_time_slots(2, 3))
                    .map(|l| l.with_options(options))
                    .unwrap(),
                meta: NetworkMeta {
                    name: "ramp",
                    nodes: &NODES,
                    states: &STATES,
                    children: &CHILDREN,
                },
            }
        }
    }

    impl Network<f64> for Ramp {
        fn layout(&self) -> &NetworkLayout {
            &self.layout
        }

        fn init(&self, data: &mut DataBuffer<f64>, _t: f64) {
            data.set(0, 10.0);
        }

        fn diff(&self, data: &mut DataBuffer<f64>, _t: f64, _dt: f64) {
            data.set(1, 1.0);
        }

        fn dimension(&self, index: usize) -> Dimension {
            if index == 0 {
                Dimension::scalar()
            } else {
                Dimension::new(2, 1)
            }
        }

        fn meta(&self) -> Option<&NetworkMeta> {
            Some(&self.meta)
        }
    }

    #[test]
    fn builds_from_options_and_runs() {
        let options = BuildOptions::default();
        let mut sim = Simulation::from_options(Ramp::new(&options), &options).unwrap();
        assert_eq!(Integrator::<f64>::order(sim.integrator()), 4);
        assert_eq!(sim.data().segment_count(), 4);

        sim.init(0.0);
        let t = sim.run(0.5, 2.0);
        assert_eq!(t, 2.0);
        assert_relative_eq!(sim.get(0), 12.0, epsilon = 1e-12);
        assert_eq!(sim.get(2), 2.0);
        assert_eq!(sim.find_variable("x"), Some(0));
        assert_eq!(sim.find_variable("y"), None);
        assert_eq!(sim.dimension(1), Dimension::new(2, 1));
    }

    #[test]
    fn from_options_rejects_mismatches() {
        let options = BuildOptions {
            precision: Precision::Float,
            ..BuildOptions::default()
        };
        let err = Simulation::<f64, _, _>::from_options(Ramp::new(&options), &options)
            .err()
            .expect("precision mismatch should fail");
        assert!(format!("{err}").contains("precision"));

        let options = BuildOptions {
            integrator: IntegratorKind::Custom,
            ..BuildOptions::default()
        };
        let err = Simulation::<f64, _, _>::from_options(Ramp::new(&options), &options)
            .err()
            .expect("custom integrators cannot be built");
        assert!(format!("{err}").contains("custom"));

        let refined = BuildOptions {
            event_refinement: true,
            ..BuildOptions::default()
        };
        let err = Simulation::<f64, _, _>::from_options(Ramp::new(&BuildOptions::default()), &refined)
            .err()
            .expect("layout and options disagree");
        assert!(format!("{err}").contains("event refinement"));
    }

    #[test]
    fn reset_restores_initial_state_and_clears_stages() {
        let options = BuildOptions::default();
        let mut sim = Simulation::new(Ramp::new(&options), Euler).unwrap();
        sim.init(0.0);
        sim.step(0.25);
        assert_eq!(sim.t(), 0.25);
        assert_eq!(sim.get(0), 10.25);

        sim.set(0, -3.0);
        sim.reset(1.0);
        assert_eq!(sim.t(), 1.0);
        assert_eq!(sim.get(0), 10.0);
    }
}
