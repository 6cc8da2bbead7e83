//! Portable dense kernels over column-major storage.
//!
//! Every kernel writes into `ret` and never allocates. Shapes are trusted:
//! the generator sizes every operand at compile time, so mismatches are only
//! checked in debug builds.

use crate::traits::Scalar;

/// `ret[i] = x[indices[i]]`.
pub fn index<T: Scalar>(ret: &mut [T], x: &[T], indices: &[usize]) {
    debug_assert_eq!(ret.len(), indices.len());
    for (out, &i) in ret.iter_mut().zip(indices) {
        *out = x[i];
    }
}

/// Stacks `x0` (`rows0 x columns`) on top of `x1` (`rows1 x columns`).
pub fn vcat<T: Scalar>(ret: &mut [T], x0: &[T], x1: &[T], rows0: usize, rows1: usize, columns: usize) {
    debug_assert_eq!(x0.len(), rows0 * columns);
    debug_assert_eq!(x1.len(), rows1 * columns);
    debug_assert_eq!(ret.len(), (rows0 + rows1) * columns);

    let rows = rows0 + rows1;
    for c in 0..columns {
        let column = &mut ret[c * rows..(c + 1) * rows];
        column[..rows0].copy_from_slice(&x0[c * rows0..(c + 1) * rows0]);
        column[rows0..].copy_from_slice(&x1[c * rows1..(c + 1) * rows1]);
    }
}

/// Places `x1` to the right of `x0`; with column-major storage this is plain
/// concatenation.
pub fn hcat<T: Scalar>(ret: &mut [T], x0: &[T], x1: &[T]) {
    debug_assert_eq!(ret.len(), x0.len() + x1.len());
    ret[..x0.len()].copy_from_slice(x0);
    ret[x0.len()..].copy_from_slice(x1);
}

/// Transposes a `rows x columns` matrix.
pub fn transpose<T: Scalar>(ret: &mut [T], x: &[T], rows: usize, columns: usize) {
    debug_assert_eq!(x.len(), rows * columns);
    debug_assert_eq!(ret.len(), rows * columns);
    for c in 0..columns {
        for r in 0..rows {
            ret[c + r * columns] = x[r + c * rows];
        }
    }
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
    debug_assert_eq!(x0.len(), rows0 * columns0);
    debug_assert_eq!(x1.len(), columns0 * columns1);
    debug_assert_eq!(ret.len(), rows0 * columns1);

    for c in 0..columns1 {
        for r in 0..rows0 {
            let mut acc = T::zero();
            for k in 0..columns0 {
                acc = acc + x0[r + k * rows0] * x1[k + c * columns0];
            }
            ret[r + c * rows0] = acc;
        }
    }
}

/// Extracts the diagonal of an `n x n` matrix.
pub fn diag<T: Scalar>(ret: &mut [T], x: &[T], n: usize) {
    debug_assert_eq!(x.len(), n * n);
    for i in 0..n {
        ret[i] = x[i * (n + 1)];
    }
}

/// Builds an `n x n` diagonal matrix from a vector of length `n`.
pub fn diag_matrix<T: Scalar>(ret: &mut [T], x: &[T]) {
    let n = x.len();
    debug_assert_eq!(ret.len(), n * n);
    ret.fill(T::zero());
    for i in 0..n {
        ret[i * (n + 1)] = x[i];
    }
}

/// Lower triangle of a `rows x columns` matrix, zeros above the diagonal.
pub fn tril<T: Scalar>(ret: &mut [T], x: &[T], rows: usize, columns: usize) {
    debug_assert_eq!(ret.len(), rows * columns);
    for c in 0..columns {
        for r in 0..rows {
            let i = r + c * rows;
            ret[i] = if r >= c { x[i] } else { T::zero() };
        }
    }
}

/// Upper triangle of a `rows x columns` matrix, zeros below the diagonal.
pub fn triu<T: Scalar>(ret: &mut [T], x: &[T], rows: usize, columns: usize) {
    debug_assert_eq!(ret.len(), rows * columns);
    for c in 0..columns {
        for r in 0..rows {
            let i = r + c * rows;
            ret[i] = if r <= c { x[i] } else { T::zero() };
        }
    }
}

/// Sums across columns, one value per row.
pub fn csum<T: Scalar>(ret: &mut [T], x: &[T], rows: usize, columns: usize) {
    debug_assert_eq!(ret.len(), rows);
    ret.copy_from_slice(&x[..rows]);
    for c in 1..columns {
        for r in 0..rows {
            ret[r] = ret[r] + x[r + c * rows];
        }
    }
}

/// Sums down rows, one value per column.
pub fn rsum<T: Scalar>(ret: &mut [T], x: &[T], rows: usize, columns: usize) {
    debug_assert_eq!(ret.len(), columns);
    for (c, out) in ret.iter_mut().enumerate() {
        *out = x[c * rows..(c + 1) * rows]
            .iter()
            .fold(T::zero(), |acc, &v| acc + v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2x3 matrix [[1, 3, 5], [2, 4, 6]] stored column-major.
    const M: [f64; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

    #[test]
    fn index_gathers_values() {
        let mut ret = [0.0; 3];
        index(&mut ret, &M, &[5, 0, 5]);
        assert_eq!(ret, [6.0, 1.0, 6.0]);
    }

    #[test]
    fn vcat_interleaves_columns() {
        let top = [1.0, 2.0];
        let bottom = [10.0, 20.0, 30.0, 40.0];
        let mut ret = [0.0; 6];
        vcat(&mut ret, &top, &bottom, 1, 2, 2);
        assert_eq!(ret, [1.0, 10.0, 20.0, 2.0, 30.0, 40.0]);

        let mut ret = [0.0; 8];
        hcat(&mut ret, &M, &top);
        assert_eq!(ret, [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 1.0, 2.0]);
    }

    #[test]
    fn transpose_swaps_axes() {
        let mut ret = [0.0; 6];
        transpose(&mut ret, &M, 2, 3);
        assert_eq!(ret, [1.0, 3.0, 5.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn multiply_non_square() {
        // (2x3) * (3x1)
        let mut ret = [0.0; 2];
        matrix_multiply(&mut ret, &M, &[1.0, 0.0, -1.0], 2, 3, 1);
        assert_eq!(ret, [-4.0, -4.0]);

        let mut ret = [0.0; 1];
        matrix_multiply(&mut ret, &[3.0], &[-2.0], 1, 1, 1);
        assert_eq!(ret, [-6.0]);
    }

    #[test]
    fn diagonal_round_trip() {
        let mut square = [0.0; 9];
        diag_matrix(&mut square, &[1.0, 2.0, 3.0]);
        assert_eq!(square, [1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0]);
        let mut d = [0.0; 3];
        diag(&mut d, &square, 3);
        assert_eq!(d, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn triangles_zero_the_other_half() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let mut lower = [9.0; 4];
        let mut upper = [9.0; 4];
        tril(&mut lower, &x, 2, 2);
        triu(&mut upper, &x, 2, 2);
        assert_eq!(lower, [1.0, 2.0, 0.0, 4.0]);
        assert_eq!(upper, [1.0, 0.0, 3.0, 4.0]);
    }

    #[test]
    fn sums_along_each_axis() {
        let mut rows = [0.0; 2];
        csum(&mut rows, &M, 2, 3);
        assert_eq!(rows, [9.0, 12.0]);

        let mut columns = [0.0; 3];
        rsum(&mut columns, &M, 2, 3);
        assert_eq!(columns, [3.0, 7.0, 11.0]);
    }
}
