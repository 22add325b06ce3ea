use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut, RealField};
use nalgebra_sparse::factorization::{CholeskyError, CscCholesky};
use nalgebra_sparse::{CscMatrix, CsrMatrix};

/// Sparse Cholesky factorization of a symmetric positive definite CSR matrix.
#[derive(Debug, Clone)]
pub struct CholeskySolver<T: RealField> {
    factorization: CscCholesky<T>,
    dim: usize,
}

impl<T: RealField + Copy> CholeskySolver<T> {
    pub fn factor(matrix: &CsrMatrix<T>) -> Result<Self, CholeskyError> {
        assert_eq!(matrix.nrows(), matrix.ncols(), "Matrix must be square.");
        let csc = CscMatrix::from(matrix);
        let factorization = CscCholesky::factor(&csc)?;
        Ok(Self {
            factorization,
            dim: matrix.nrows(),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Solves `A x = b`, storing `x` in `out`.
    pub fn solve_into(&self, b: DVectorView<T>, mut out: DVectorViewMut<T>) {
        assert_eq!(b.len(), self.dim);
        assert_eq!(out.len(), self.dim);
        let mut x = DMatrix::from_iterator(self.dim, 1, b.iter().copied());
        self.factorization.solve_mut(&mut x);
        out.copy_from(&x.column(0));
    }

    pub fn solve(&self, b: DVectorView<T>) -> DVector<T> {
        let mut x = DVector::zeros(self.dim);
        self.solve_into(b, x.as_view_mut());
        x
    }
}
