//! Sparse matrices that evaluate spline basis functions at a set of points.
use crate::{TensorSplineSpace, UnivariateSplineSpace};
use fenris_shape_sparse::ops::{kronecker_rows, RowPattern};
use log::debug;
use nalgebra_sparse::CsrMatrix;
use rayon::prelude::*;

/// Builds the `M × n` matrix whose entry `(r, i)` is basis function `i` of `space`
/// evaluated at `points[r]`.
///
/// Only nonzero values are stored.
pub fn univariate_interpolation_matrix(space: &UnivariateSplineSpace, points: &[f64]) -> CsrMatrix<f64> {
    let rows: Vec<Vec<(usize, f64)>> = points
        .par_iter()
        .map(|&x| space.evaluate_nonzero(x))
        .collect();
    let counts: Vec<usize> = rows.iter().map(Vec::len).collect();

    RowPattern::from_row_counts(&counts)
        .fill_par(space.dim(), |r, cols, vals| {
            for ((col, val), &(i, value)) in cols.iter_mut().zip(vals.iter_mut()).zip(&rows[r]) {
                *col = i;
                *val = value;
            }
        })
        .expect("Must succeed since basis indices are increasing and less than the dimension")
}

/// Builds one univariate interpolation matrix per axis of the tensor space.
///
/// `coordinates[axis]` holds the coordinate along `axis` of every point, so all entries of
/// `coordinates` must have the same length.
pub fn axis_interpolation_matrices(space: &TensorSplineSpace, coordinates: &[Vec<f64>]) -> Vec<CsrMatrix<f64>> {
    assert_eq!(
        coordinates.len(),
        space.num_axes(),
        "Must provide one coordinate array per axis."
    );
    space
        .axes()
        .iter()
        .zip(coordinates)
        .map(|(axis, coords)| univariate_interpolation_matrix(axis, coords))
        .collect()
}

/// Builds the `M × N` scalar interpolation matrix of the tensor space, where `N` is the
/// dimension of the tensor space.
///
/// Row `r` is the Kronecker product of row `r` of the univariate interpolation matrices.
pub fn tensor_interpolation_matrix(space: &TensorSplineSpace, coordinates: &[Vec<f64>]) -> CsrMatrix<f64> {
    let matrices = axis_interpolation_matrices(space, coordinates);
    let factors: Vec<&CsrMatrix<f64>> = matrices.iter().collect();
    let matrix = kronecker_rows(&factors);
    debug!(
        "Assembled tensor spline interpolation matrix: {} x {} with {} nonzeros",
        matrix.nrows(),
        matrix.ncols(),
        matrix.nnz()
    );
    matrix
}
