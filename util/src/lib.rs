use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;

/// Poor man's approx assertion for matrices
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = $x - $y;

        let max_absdiff = diff.abs().max();
        let approx_eq = max_absdiff <= $tol;

        if !approx_eq {
            println!("abstol: {:e}", $tol);
            println!("left: {}", $x);
            println!("right: {}", $y);
            println!("diff: {:e}", diff);
        }
        assert!(approx_eq);
    }};
}

#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::catch_unwind;
        use std::stringify;
        let expr_string = stringify!($e);
        let result = catch_unwind(|| $e);
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}

/// Dense copy of a sparse matrix, convenient for comparisons in tests.
pub fn to_dense(matrix: &CsrMatrix<f64>) -> DMatrix<f64> {
    DMatrix::from(matrix)
}

/// Largest absolute difference between a sparse matrix and its transpose.
pub fn max_asymmetry(matrix: &CsrMatrix<f64>) -> f64 {
    let dense = to_dense(matrix);
    (&dense - dense.transpose()).abs().max()
}

/// Deterministic, non-trivial vector with entries in `[-1, 1]`.
pub fn pseudo_random_vector(len: usize, seed: usize) -> DVector<f64> {
    DVector::from_fn(len, |i, _| {
        let x = ((i + 1) * 7919 + seed * 104729) % 1000;
        2.0 * (x as f64) / 999.0 - 1.0
    })
}
