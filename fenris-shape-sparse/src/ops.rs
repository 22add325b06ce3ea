//! Structured sparse operators: row-wise Kronecker products, vector-field intertwining,
//! congruence transforms and zero-row regularization.
use nalgebra::{DVectorView, DVectorViewMut, RealField, Scalar};
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::{CsrMatrix, SparseFormatError};
use num::Zero;
use rayon::prelude::*;
use std::mem;

/// Sparsity pattern of a CSR matrix, computed before any column index or value is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowPattern {
    offsets: Vec<usize>,
}

impl RowPattern {
    /// Constructs the pattern from per-row nonzero counts.
    pub fn from_row_counts(counts: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(counts.len() + 1);
        offsets.push(0);
        let mut total = 0;
        for count in counts {
            total += count;
            offsets.push(total);
        }
        Self { offsets }
    }

    pub fn nrows(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn nnz(&self) -> usize {
        self.offsets.last().copied().unwrap_or(0)
    }

    pub fn row_nnz(&self, row: usize) -> usize {
        self.offsets[row + 1] - self.offsets[row]
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Allocates the CSR arrays for this pattern and fills every row in parallel.
    ///
    /// The closure receives the row index together with the column index and value slices
    /// of that row, whose lengths are exactly the row counts of the pattern. Column indices
    /// must be written in increasing order.
    pub fn fill_par<T, F>(self, ncols: usize, fill_row: F) -> Result<CsrMatrix<T>, SparseFormatError>
    where
        T: Scalar + Zero + Send,
        F: Fn(usize, &mut [usize], &mut [T]) + Sync,
    {
        let nnz = self.nnz();
        let mut col_indices = vec![0; nnz];
        let mut values = vec![T::zero(); nnz];
        {
            let col_rows = split_rows(&mut col_indices, &self.offsets);
            let value_rows = split_rows(&mut values, &self.offsets);
            col_rows
                .into_par_iter()
                .zip(value_rows)
                .enumerate()
                .for_each(|(i, (cols, vals))| fill_row(i, cols, vals));
        }
        CsrMatrix::try_from_csr_data(self.nrows(), ncols, self.offsets, col_indices, values)
    }
}

fn split_rows<'a, X>(mut data: &'a mut [X], offsets: &[usize]) -> Vec<&'a mut [X]> {
    let mut rows = Vec::with_capacity(offsets.len().saturating_sub(1));
    for window in offsets.windows(2) {
        let (row, rest) = mem::take(&mut data).split_at_mut(window[1] - window[0]);
        rows.push(row);
        data = rest;
    }
    rows
}

/// Nonzero entries of a single row of a CSR matrix.
fn nonzero_entries<'a, T: Scalar + Zero>(
    matrix: &'a CsrMatrix<T>,
    row: usize,
) -> impl Iterator<Item = (usize, &'a T)> + 'a {
    let range = matrix.row_offsets()[row]..matrix.row_offsets()[row + 1];
    matrix.col_indices()[range.clone()]
        .iter()
        .copied()
        .zip(&matrix.values()[range])
        .filter(|(_, v)| !v.is_zero())
}

/// Computes the row-wise Kronecker product of the given factors.
///
/// All factors must have the same number of rows `M`. Row `r` of the result is the
/// Kronecker product of row `r` of every factor, so that the result is `M × Π ncols_k`.
/// The first factor is the most significant, i.e. the column of a product of entries at
/// columns `(c_0, c_1, ..., c_{d-1})` is `(...(c_0 n_1 + c_1) n_2 + ...) + c_{d-1}`.
/// Only products of nonzero entries are stored, so the support of each row is the
/// Cartesian product of the supports of the factor rows.
///
/// # Panics
///
/// Panics if no factors are given or if the factors do not have the same number of rows.
pub fn kronecker_rows<T>(factors: &[&CsrMatrix<T>]) -> CsrMatrix<T>
where
    T: RealField + Copy + Send + Sync,
{
    assert!(!factors.is_empty(), "Kronecker product requires at least one factor.");
    let nrows = factors[0].nrows();
    assert!(
        factors.iter().all(|f| f.nrows() == nrows),
        "All Kronecker factors must have the same number of rows."
    );
    let widths: Vec<usize> = factors.iter().map(|f| f.ncols()).collect();
    let ncols = widths.iter().product();

    let counts: Vec<usize> = (0..nrows)
        .into_par_iter()
        .map(|i| {
            factors
                .iter()
                .map(|f| nonzero_entries(f, i).count())
                .product()
        })
        .collect();

    RowPattern::from_row_counts(&counts)
        .fill_par(ncols, |i, cols, vals| {
            if cols.is_empty() {
                return;
            }
            let supports: Vec<Vec<(usize, T)>> = factors
                .iter()
                .map(|f| nonzero_entries(f, i).map(|(j, v)| (j, *v)).collect())
                .collect();

            // Odometer over the Cartesian product, last factor varying fastest, which
            // produces the columns in increasing order
            let mut multi_index = vec![0; supports.len()];
            for (col_out, val_out) in cols.iter_mut().zip(vals.iter_mut()) {
                let mut col = 0;
                let mut val = T::one();
                for ((support, &k), &width) in supports.iter().zip(&multi_index).zip(&widths) {
                    let (c, v) = support[k];
                    col = col * width + c;
                    val *= v;
                }
                *col_out = col;
                *val_out = val;

                for axis in (0..supports.len()).rev() {
                    multi_index[axis] += 1;
                    if multi_index[axis] < supports[axis].len() {
                        break;
                    }
                    multi_index[axis] = 0;
                }
            }
        })
        .expect("Must succeed since columns are sorted and within bounds")
}

/// Expands a scalar operator to a vector-valued operator with `dim` interleaved components.
///
/// Given a scalar matrix `M × N`, returns the `(dim·M) × (dim·N)` matrix where row
/// `dim·i + k` holds the entries of scalar row `i` at columns `dim·j + k`. The result does
/// not couple different components.
pub fn intertwine<T>(scalar: &CsrMatrix<T>, dim: usize) -> CsrMatrix<T>
where
    T: Scalar + Zero + Send + Sync,
{
    assert!(dim > 0, "Number of components must be positive.");
    let counts: Vec<usize> = (0..dim * scalar.nrows())
        .map(|row| scalar.row(row / dim).nnz())
        .collect();

    RowPattern::from_row_counts(&counts)
        .fill_par(dim * scalar.ncols(), |row, cols, vals| {
            let (i, k) = (row / dim, row % dim);
            let scalar_row = scalar.row(i);
            for (col_out, &j) in cols.iter_mut().zip(scalar_row.col_indices()) {
                *col_out = dim * j + k;
            }
            vals.clone_from_slice(scalar_row.values());
        })
        .expect("Must succeed since columns are sorted and within bounds")
}

/// Computes the congruence transform `Pᵀ A P`.
pub fn congruence<T>(a: &CsrMatrix<T>, p: &CsrMatrix<T>) -> CsrMatrix<T>
where
    T: RealField + Copy,
{
    assert_eq!(a.nrows(), a.ncols(), "Matrix must be square.");
    assert_eq!(a.ncols(), p.nrows(), "Dimension mismatch in congruence transform.");
    let p_t = p.transpose();
    let p_t_a = &p_t * a;
    &p_t_a * p
}

/// Replaces (numerically) zero rows of a symmetric matrix by unit diagonal rows.
///
/// A row is considered zero if the Euclidean norm of its stored values is below
/// `tolerance`. For every such row `i`, the row is replaced by the single entry
/// `(i, i) = 1` and all entries in column `i` are removed from the other rows, so that
/// the result remains symmetric. Returns the regularized matrix together with the indices
/// of the regularized rows in increasing order.
pub fn regularize_zero_rows<T>(matrix: &CsrMatrix<T>, tolerance: T) -> (CsrMatrix<T>, Vec<usize>)
where
    T: RealField + Copy + Send + Sync,
{
    assert_eq!(matrix.nrows(), matrix.ncols(), "Matrix must be square.");
    let is_zero_row: Vec<bool> = (0..matrix.nrows())
        .into_par_iter()
        .map(|i| {
            let row = matrix.row(i);
            let norm_squared = row.values().iter().fold(T::zero(), |acc, &v| acc + v * v);
            norm_squared.sqrt() < tolerance
        })
        .collect();
    let zero_rows: Vec<usize> = is_zero_row
        .iter()
        .enumerate()
        .filter_map(|(i, &zero)| zero.then_some(i))
        .collect();

    let counts: Vec<usize> = (0..matrix.nrows())
        .map(|i| {
            if is_zero_row[i] {
                1
            } else {
                matrix
                    .row(i)
                    .col_indices()
                    .iter()
                    .filter(|&&j| !is_zero_row[j])
                    .count()
            }
        })
        .collect();

    let regularized = RowPattern::from_row_counts(&counts)
        .fill_par(matrix.ncols(), |i, cols, vals| {
            if is_zero_row[i] {
                cols[0] = i;
                vals[0] = T::one();
            } else {
                let row = matrix.row(i);
                let kept = row
                    .col_indices()
                    .iter()
                    .zip(row.values())
                    .filter(|(&j, _)| !is_zero_row[j]);
                for ((col_out, val_out), (&j, &v)) in cols.iter_mut().zip(vals.iter_mut()).zip(kept) {
                    *col_out = j;
                    *val_out = v;
                }
            }
        })
        .expect("Must succeed since the kept columns are a sorted subset of the input columns");

    (regularized, zero_rows)
}

/// Computes `y = A x`.
pub fn spmv<T>(y: DVectorViewMut<T>, a: &CsrMatrix<T>, x: DVectorView<T>)
where
    T: RealField + Copy,
{
    let mut y = y;
    assert_eq!(y.len(), a.nrows());
    assert_eq!(x.len(), a.ncols());
    spmm_csr_dense(T::zero(), &mut y, T::one(), Op::NoOp(a), Op::NoOp(&x));
}

/// Computes `y = Aᵀ x`.
pub fn spmv_transpose<T>(y: DVectorViewMut<T>, a: &CsrMatrix<T>, x: DVectorView<T>)
where
    T: RealField + Copy,
{
    let mut y = y;
    assert_eq!(y.len(), a.ncols());
    assert_eq!(x.len(), a.nrows());
    spmm_csr_dense(T::zero(), &mut y, T::one(), Op::Transpose(a), Op::NoOp(&x));
}
