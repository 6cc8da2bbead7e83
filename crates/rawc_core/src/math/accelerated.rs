//! nalgebra-backed kernels, compiled with the `accelerated` feature.
//!
//! These take the same column-major slices as the builtin kernels but may
//! allocate internally. `matrix_multiply` and `transpose` share the builtin
//! signatures and bounds, so a kernel call generic over [`Scalar`] compiles
//! with either backend. The operations that have no builtin counterpart
//! (`inverse`, `pseudoinverse`, `qr`, `linsolve`) only exist here and also
//! need [`RealField`], which `f32` and `f64` implement.

use crate::error::{Error, Result};
use crate::traits::{constant, Scalar};
use nalgebra::{DMatrix, RealField};

/// Singular values below this are treated as zero by [`pseudoinverse`].
pub const PSEUDOINVERSE_TOLERANCE: f64 = 1e-12;

fn matrix<T: Scalar>(x: &[T], rows: usize, columns: usize) -> DMatrix<T> {
    DMatrix::from_column_slice(rows, columns, x)
}

/// `ret = x0 * x1` for `x0: rows0 x columns0` and `x1: columns0 x columns1`.
pub fn matrix_multiply<T: Scalar>(
    ret: &mut [T],
    x0: &[T],
    x1: &[T],
    rows0: usize,
    columns0: usize,
    columns1: usize,
) {
    let product = matrix(x0, rows0, columns0) * matrix(x1, columns0, columns1);
    ret.copy_from_slice(product.as_slice());
}

pub fn transpose<T: Scalar>(ret: &mut [T], x: &[T], rows: usize, columns: usize) {
    ret.copy_from_slice(matrix(x, rows, columns).transpose().as_slice());
}

/// Inverts an `n x n` matrix.
pub fn inverse<T: Scalar + RealField>(ret: &mut [T], x: &[T], n: usize) -> Result<()> {
    let inverse = matrix(x, n, n).try_inverse().ok_or(Error::Singular)?;
    ret.copy_from_slice(inverse.as_slice());
    Ok(())
}

/// Moore-Penrose pseudoinverse of a `rows x columns` matrix; `ret` is
/// `columns x rows`.
pub fn pseudoinverse<T: Scalar + RealField>(
    ret: &mut [T],
    x: &[T],
    rows: usize,
    columns: usize,
) -> Result<()> {
    let pinv = matrix(x, rows, columns)
        .pseudo_inverse(constant::<T>(PSEUDOINVERSE_TOLERANCE))
        .map_err(|_| Error::Singular)?;
    ret.copy_from_slice(pinv.as_slice());
    Ok(())
}

/// Thin QR decomposition of a `rows x columns` matrix.
///
/// With `k = min(rows, columns)`, `q` receives the `rows x k` orthonormal
/// factor and `r` the `k x columns` upper-triangular one.
pub fn qr<T: Scalar + RealField>(q: &mut [T], r: &mut [T], x: &[T], rows: usize, columns: usize) {
    let decomposition = matrix(x, rows, columns).qr();
    q.copy_from_slice(decomposition.q().as_slice());
    r.copy_from_slice(decomposition.r().as_slice());
}

/// Solves `A X = B` for a general `n x n` matrix by LU decomposition.
pub fn linsolve<T: Scalar + RealField>(
    ret: &mut [T],
    a: &[T],
    b: &[T],
    n: usize,
    columns: usize,
) -> Result<()> {
    let solution = matrix(a, n, n)
        .lu()
        .solve(&matrix(b, n, columns))
        .ok_or(Error::Singular)?;
    ret.copy_from_slice(solution.as_slice());
    Ok(())
}
