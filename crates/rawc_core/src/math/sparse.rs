//! Sparse `LᵀDL` factorization over an elimination tree.
//!
//! For a symmetric positive definite `n x n` matrix `A` whose sparsity is
//! described by an elimination tree (every index has at most one parent, and
//! parents precede their children), `A = LᵀDL` with `L` unit lower triangular.
//! The factorization runs in place: `D` replaces the diagonal and the
//! multipliers of `L` replace the eliminated lower-triangle entries. Only
//! entries on a path from an index to the root are ever touched, so the cost
//! follows the tree's depth rather than `n³`.
//!
//! This is the factorization used for joint-space inertia matrices of
//! branched kinematic trees (Featherstone, "Rigid Body Dynamics Algorithms",
//! ch. 6). It is exact only when `A` has no nonzeros outside the pattern the
//! tree implies; a dense matrix needs the chain tree `parent[i] = i - 1`.
//!
//! Right-hand sides are stored column-major; every solve processes
//! `b.len() / n` columns.

use crate::error::{Error, Result};
use crate::traits::Scalar;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EliminationTree {
    parent: Vec<Option<usize>>,
}

impl EliminationTree {
    pub fn new(parent: Vec<Option<usize>>) -> Result<Self> {
        for (index, parent) in parent.iter().enumerate() {
            if let Some(parent) = *parent {
                if parent >= index {
                    return Err(Error::InvalidParent { index, parent });
                }
            }
        }
        Ok(Self { parent })
    }

    /// Builds a tree from the generator's signed encoding, where any negative
    /// entry marks a root.
    pub fn from_signed(parent: &[i32]) -> Result<Self> {
        Self::new(
            parent
                .iter()
                .map(|&p| usize::try_from(p).ok())
                .collect(),
        )
    }

    /// The tree of a dense matrix: every index hangs off its predecessor.
    pub fn chain(n: usize) -> Self {
        Self {
            parent: (0..n).map(|i| i.checked_sub(1)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parent[index]
    }

    /// Proper ancestors of `index`, nearest first.
    pub fn ancestors(&self, index: usize) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent[index],
        }
    }
}

pub struct Ancestors<'a> {
    tree: &'a EliminationTree,
    next: Option<usize>,
}

impl Iterator for Ancestors<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = self.tree.parent[current];
        Some(current)
    }
}

/// Factors `a` into `LᵀDL` in place, last row first.
pub fn sltdl<T: Scalar>(a: &mut [T], tree: &EliminationTree) {
    let n = tree.len();
    debug_assert_eq!(a.len(), n * n);

    for k in (0..n).rev() {
        let kk = k * (n + 1);
        for i in tree.ancestors(k) {
            let ki = k + i * n;
            let multiplier = a[ki] / a[kk];

            // A_ij -= a * A_kj along the path from i to the root.
            a[i + i * n] = a[i + i * n] - multiplier * a[k + i * n];
            for j in tree.ancestors(i) {
                a[i + j * n] = a[i + j * n] - multiplier * a[k + j * n];
            }

            a[ki] = multiplier;
        }
    }
}

fn columns<T>(b: &[T], n: usize) -> usize {
    debug_assert!(n == 0 || b.len() % n == 0);
    if n == 0 {
        0
    } else {
        b.len() / n
    }
}

/// `b = D⁻¹ L⁻ᵀ b`.
pub fn sltdl_dinv_linvt<T: Scalar>(ltdl: &[T], b: &mut [T], tree: &EliminationTree) {
    let n = tree.len();
    for column in 0..columns(b, n) {
        let x = &mut b[column * n..(column + 1) * n];
        for i in (0..n).rev() {
            for j in tree.ancestors(i) {
                x[j] = x[j] - ltdl[i + j * n] * x[i];
            }
            x[i] = x[i] / ltdl[i * (n + 1)];
        }
    }
}

/// `b = L⁻¹ b`.
pub fn sltdl_linv<T: Scalar>(ltdl: &[T], b: &mut [T], tree: &EliminationTree) {
    let n = tree.len();
    for column in 0..columns(b, n) {
        let x = &mut b[column * n..(column + 1) * n];
        for i in 0..n {
            for j in tree.ancestors(i) {
                x[i] = x[i] - ltdl[i + j * n] * x[j];
            }
        }
    }
}

/// `b = L⁻ᵀ b`.
pub fn sltdl_linvt<T: Scalar>(ltdl: &[T], b: &mut [T], tree: &EliminationTree) {
    let n = tree.len();
    for column in 0..columns(b, n) {
        let x = &mut b[column * n..(column + 1) * n];
        for i in (0..n).rev() {
            for j in tree.ancestors(i) {
                x[j] = x[j] - ltdl[i + j * n] * x[i];
            }
        }
    }
}

/// `b = D⁻¹ b`.
pub fn sltdl_dinv<T: Scalar>(ltdl: &[T], b: &mut [T], n: usize) {
    for column in 0..columns(b, n) {
        let x = &mut b[column * n..(column + 1) * n];
        for i in 0..n {
            x[i] = x[i] / ltdl[i * (n + 1)];
        }
    }
}

/// Solves `A X = B` for every column of `b`.
///
/// `ltdl` is caller-provided `n x n` workspace that receives the
/// factorization, so repeated solves against the same matrix can reuse it
/// through the individual solve kernels.
pub fn slinsolve<T: Scalar>(
    ret: &mut [T],
    a: &[T],
    b: &[T],
    tree: &EliminationTree,
    ltdl: &mut [T],
) {
    debug_assert_eq!(ret.len(), b.len());
    ltdl.copy_from_slice(a);
    ret.copy_from_slice(b);

    sltdl(ltdl, tree);
    sltdl_dinv_linvt(ltdl, ret, tree);
    sltdl_linv(ltdl, ret, tree);
}

/// Checked entry point for callers that do not trust their shapes.
pub fn try_slinsolve<T: Scalar>(
    ret: &mut [T],
    a: &[T],
    b: &[T],
    tree: &EliminationTree,
    ltdl: &mut [T],
) -> Result<()> {
    let n = tree.len();
    for (expected, actual) in [(n * n, a.len()), (n * n, ltdl.len()), (b.len(), ret.len())] {
        if expected != actual {
            return Err(Error::DimensionMismatch { expected, actual });
        }
    }
    if n > 0 && b.len() % n != 0 {
        return Err(Error::DimensionMismatch {
            expected: b.len().next_multiple_of(n),
            actual: b.len(),
        });
    }
    slinsolve(ret, a, b, tree, ltdl);
    Ok(())
}
