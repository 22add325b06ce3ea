use nalgebra::{DMatrix, DVector, Dyn, Matrix, RealField, Scalar, StorageMut, U1};

/// An orthonormal set of vectors, stored column-wise.
///
/// Used to represent the nullspace of a singular but positive semi-definite operator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthonormalBasis<T: Scalar> {
    vectors: DMatrix<T>,
}

impl<T: RealField + Copy> OrthonormalBasis<T> {
    /// Orthonormalizes the given vectors with modified Gram-Schmidt.
    ///
    /// Vectors that are (numerically) linearly dependent on the preceding vectors are
    /// discarded.
    ///
    /// # Panics
    ///
    /// Panics if the vectors do not all have the same length.
    pub fn from_vectors(vectors: &[DVector<T>], tolerance: T) -> Self {
        let n = vectors.first().map(|v| v.len()).unwrap_or(0);
        let mut accepted: Vec<DVector<T>> = Vec::with_capacity(vectors.len());
        for v in vectors {
            assert_eq!(v.len(), n, "All basis vectors must have the same length.");
            let original_norm = v.norm();
            let mut w = v.clone();
            for q in &accepted {
                let coeff = q.dot(&w);
                w.axpy(-coeff, q, T::one());
            }
            let norm = w.norm();
            if norm > tolerance * original_norm && norm > T::zero() {
                w /= norm;
                accepted.push(w);
            }
        }

        Self {
            vectors: DMatrix::from_fn(n, accepted.len(), |i, j| accepted[j][i]),
        }
    }

    pub fn len(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.ncols() == 0
    }

    pub fn vector_len(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn vectors(&self) -> &DMatrix<T> {
        &self.vectors
    }

    /// Removes the components along the basis vectors, i.e. computes `x <- (I - Q Qᵀ) x`.
    pub fn remove_components<S>(&self, x: &mut Matrix<T, Dyn, U1, S>)
    where
        S: StorageMut<T, Dyn, U1>,
    {
        assert_eq!(x.len(), self.vector_len(), "Vector length must match basis vector length.");
        for q in self.vectors.column_iter() {
            let coeff = q.dot(&*x);
            x.axpy(-coeff, &q, T::one());
        }
    }
}
