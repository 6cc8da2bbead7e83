pub mod buffer;
pub mod config;
pub mod error;
pub mod events;
pub mod integrator;
pub mod math;
pub mod meta;
pub mod network;
pub mod simulation;
pub mod solvers;
/// The `rawc_core` crate is the runtime that generated network code links
/// against. It is generic over `f32` and `f64` scalars.
///
/// Key components:
/// - **Traits**: `Scalar`, `Network` (the callback contract a generated model
///   implements) and `Integrator` (stateless stepping strategies).
/// - **Buffer**: `DataBuffer`, the segmented arena holding states, derivatives,
///   integrator stages, event values and the rollback snapshot.
/// - **Integrator**: the event-refining step and the `run` driver loop.
/// - **Solvers**: `Euler` and `RungeKutta`, plus the runtime-selected `Stepper`.
/// - **Math**: dense column-major kernels, scalar helpers and the sparse
///   `LᵀDL` family, with nalgebra-backed kernels behind the `accelerated`
///   feature.
pub mod traits;

pub use buffer::DataBuffer;
pub use config::{BuildOptions, LinalgBackend, Precision};
pub use error::{Error, Result};
pub use integrator::{run, step, StepReport};
pub use network::{Dimension, NetworkLayout, Range};
pub use simulation::Simulation;
pub use solvers::{Euler, IntegratorKind, RungeKutta, Stepper};
pub use traits::{Integrator, Network, Scalar};
