//! Math kernels called by generated network callbacks.
//!
//! All matrices are column-major slices. The builtin dense kernels are always
//! available under [`dense`]; the crate-level re-exports pick the
//! nalgebra-backed versions of `matrix_multiply` and `transpose` when the
//! `accelerated` feature is enabled, and only then expose the operations that
//! need a linear algebra backend.

pub mod dense;
pub mod scalar;
pub mod sparse;

#[cfg(feature = "accelerated")]
pub mod accelerated;

pub use dense::{csum, diag, diag_matrix, hcat, index, rsum, tril, triu, vcat};
pub use sparse::{
    slinsolve, sltdl, sltdl_dinv, sltdl_dinv_linvt, sltdl_linv, sltdl_linvt, try_slinsolve,
    EliminationTree,
};

#[cfg(not(feature = "accelerated"))]
pub use dense::{matrix_multiply, transpose};

#[cfg(feature = "accelerated")]
pub use accelerated::{inverse, linsolve, matrix_multiply, pseudoinverse, qr, transpose};
