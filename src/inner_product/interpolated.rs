use crate::inner_product::InnerProduct;
use eyre::eyre;
use fenris_shape_sparse::factorization::CholeskySolver;
use fenris_shape_sparse::ops::{congruence, regularize_zero_rows};
use log::info;
use nalgebra::{DVectorView, DVectorViewMut};
use nalgebra_sparse::CsrMatrix;

/// Rows of `Iᵀ A I` whose values have a smaller Euclidean norm are considered zero.
pub const ZERO_ROW_TOLERANCE: f64 = 1e-13;

/// The restriction of a nodal inner product to the range of an interpolation operator.
///
/// Given the matrix `A` of a nodal inner product and an interpolation operator `I` whose
/// columns are nodal interpolants of basis functions (for example B-splines), the restricted
/// inner product has the matrix `Iᵀ A I`. Basis functions that vanish at every vertex of the
/// mesh produce zero rows, which are replaced by unit diagonal rows before factorization.
///
/// The restriction is only meaningful when the support of the basis functions, intersected
/// with the physical domain, is faithfully captured by the mesh. If a basis function's support
/// extends past the physical domain, or the domain has holes that intersect the support, the
/// restricted inner product does not equal the inner product of the interpolated fields.
#[derive(Debug)]
pub struct InterpolatedInnerProduct {
    matrix: CsrMatrix<f64>,
    regularized_rows: Vec<usize>,
    factorization: CholeskySolver<f64>,
}

impl InterpolatedInnerProduct {
    pub fn new(a: &CsrMatrix<f64>, interpolation: &CsrMatrix<f64>) -> eyre::Result<Self> {
        let restricted = congruence(a, interpolation);
        let (matrix, regularized_rows) = regularize_zero_rows(&restricted, ZERO_ROW_TOLERANCE);
        if !regularized_rows.is_empty() {
            info!(
                "Regularized {} of {} rows of the interpolated inner product",
                regularized_rows.len(),
                matrix.nrows()
            );
        }
        let factorization = CholeskySolver::factor(&matrix)
            .map_err(|err| eyre!("Failed to factor interpolated inner product matrix: {}", err))?;
        Ok(Self {
            matrix,
            regularized_rows,
            factorization,
        })
    }

    /// Indices of the rows that were replaced by unit diagonal rows, in increasing order.
    pub fn regularized_rows(&self) -> &[usize] {
        &self.regularized_rows
    }
}

impl InnerProduct for InterpolatedInnerProduct {
    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn riesz_map(&self, v: DVectorView<f64>, out: DVectorViewMut<f64>) -> eyre::Result<()> {
        assert_eq!(v.len(), self.dim(), "Vector dimension must match inner product dimension.");
        assert_eq!(out.len(), self.dim(), "Vector dimension must match inner product dimension.");
        self.factorization.solve_into(v, out);
        Ok(())
    }

    fn matrix(&self) -> &CsrMatrix<f64> {
        &self.matrix
    }
}
