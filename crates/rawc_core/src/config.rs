use crate::solvers::IntegratorKind;
use crate::traits::Scalar;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Precision {
    Float,
    #[default]
    Double,
}

impl Precision {
    /// The precision matching scalar type `T`, if it is `f32` or `f64` sized.
    pub fn of<T: Scalar>() -> Option<Self> {
        match std::mem::size_of::<T>() {
            4 => Some(Precision::Float),
            8 => Some(Precision::Double),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinalgBackend {
    #[default]
    Builtin,
    Lapack,
    Accelerate,
}

impl LinalgBackend {
    /// The kernel family compiled into this build. The backend is fixed by
    /// the `accelerated` feature; both external backends map to it.
    pub fn compiled() -> Self {
        if cfg!(feature = "accelerated") {
            LinalgBackend::Lapack
        } else {
            LinalgBackend::Builtin
        }
    }

    /// Whether `math` dispatches to this backend in the current build.
    pub fn is_available(self) -> bool {
        match self {
            LinalgBackend::Builtin => !cfg!(feature = "accelerated"),
            LinalgBackend::Lapack | LinalgBackend::Accelerate => cfg!(feature = "accelerated"),
        }
    }
}

/// Options a model is generated with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildOptions {
    pub precision: Precision,
    pub integrator: IntegratorKind,
    pub event_refinement: bool,
    pub minimum_timestep: f64,
    pub backend: LinalgBackend,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            precision: Precision::Double,
            integrator: IntegratorKind::RungeKutta,
            event_refinement: false,
            minimum_timestep: 1e-9,
            backend: LinalgBackend::compiled(),
        }
    }
}

impl BuildOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.minimum_timestep.is_finite() || self.minimum_timestep < 0.0 {
            bail!(
                "minimum timestep must be finite and non-negative, got {}",
                self.minimum_timestep
            );
        }
        if !self.backend.is_available() {
            if cfg!(feature = "accelerated") {
                bail!(
                    "linear algebra backend {:?} is not compiled in: the `accelerated` feature replaces the builtin kernels",
                    self.backend
                );
            }
            bail!(
                "linear algebra backend {:?} requires the `accelerated` feature",
                self.backend
            );
        }
        if self.event_refinement && self.minimum_timestep == 0.0 {
            warn!("event refinement with a zero minimum timestep may refine indefinitely");
        }
        Ok(())
    }
}
