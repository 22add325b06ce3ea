//! Preconditioned conjugate gradient for symmetric positive (semi-)definite operators.
use crate::nullspace::OrthonormalBasis;
use core::fmt;
use nalgebra::{DVector, DVectorView, DVectorViewMut, DMatrix, RealField, Scalar};
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::CsrMatrix;
use num::Zero;
use std::error::Error;
use std::marker::PhantomData;

pub trait LinearOperator<T: Scalar> {
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error + Send + Sync>>;
}

impl<'a, T, A> LinearOperator<T> for &'a A
where
    T: Scalar,
    A: ?Sized + LinearOperator<T>,
{
    fn apply(&self, y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error + Send + Sync>> {
        <A as LinearOperator<T>>::apply(self, y, x)
    }
}

impl<T> LinearOperator<T> for DMatrix<T>
where
    T: RealField + Copy,
{
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error + Send + Sync>> {
        y.gemv(T::one(), self, &x, T::zero());
        Ok(())
    }
}

impl<T> LinearOperator<T> for CsrMatrix<T>
where
    T: RealField + Copy,
{
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error + Send + Sync>> {
        spmm_csr_dense(T::zero(), &mut y, T::one(), Op::NoOp(self), Op::NoOp(&x));
        Ok(())
    }
}

pub struct IdentityOperator;

impl<T: Scalar> LinearOperator<T> for IdentityOperator {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error + Send + Sync>> {
        y.copy_from(&x);
        Ok(())
    }
}

/// Inverse-diagonal (Jacobi) preconditioner, optionally restricted to the orthogonal
/// complement of a nullspace.
///
/// With a nullspace basis `N`, the preconditioner applies `(I - N Nᵀ) D⁻¹ (I - N Nᵀ)`, which
/// keeps every search direction of CG orthogonal to the nullspace.
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner<T: Scalar> {
    inverse_diagonal: DVector<T>,
    nullspace: Option<OrthonormalBasis<T>>,
}

impl<T: RealField + Copy> JacobiPreconditioner<T> {
    /// Builds the preconditioner from the diagonal of the given matrix.
    ///
    /// Zero diagonal entries are treated as ones.
    pub fn from_csr(matrix: &CsrMatrix<T>) -> Self {
        let inverse_diagonal = DVector::from_iterator(
            matrix.nrows(),
            (0..matrix.nrows()).map(|i| {
                let row = matrix.row(i);
                let d = row
                    .col_indices()
                    .iter()
                    .zip(row.values())
                    .find(|(&j, _)| j == i)
                    .map(|(_, &v)| v)
                    .unwrap_or(T::zero());
                if d == T::zero() {
                    T::one()
                } else {
                    T::one() / d
                }
            }),
        );
        Self {
            inverse_diagonal,
            nullspace: None,
        }
    }

    pub fn with_nullspace(self, nullspace: OrthonormalBasis<T>) -> Self {
        Self {
            nullspace: Some(nullspace),
            ..self
        }
    }
}

impl<T: RealField + Copy> LinearOperator<T> for JacobiPreconditioner<T> {
    fn apply(&self, mut y: DVectorViewMut<T>, x: DVectorView<T>) -> Result<(), Box<dyn Error + Send + Sync>> {
        assert_eq!(y.len(), self.inverse_diagonal.len());
        y.copy_from(&x);
        if let Some(nullspace) = &self.nullspace {
            nullspace.remove_components(&mut y);
        }
        y.component_mul_assign(&self.inverse_diagonal);
        if let Some(nullspace) = &self.nullspace {
            nullspace.remove_components(&mut y);
        }
        Ok(())
    }
}

pub trait CgStoppingCriterion<T: Scalar> {
    fn has_converged(&self, b_norm: T, iteration: usize, approx_residual: DVectorView<T>) -> bool;
}

/// Relative residual tolerance ||r|| <= tol * ||b||.
///
/// Note that we use the *approximate* residual given by Conjugate-Gradient. For ill-conditioned
/// problems, it is possible that CG's residual converges, but the real residual does not.
#[derive(Debug, Clone, Copy)]
pub struct RelativeResidualCriterion<T: Scalar> {
    tol: T,
}

impl<T: Scalar + Zero> RelativeResidualCriterion<T> {
    pub fn new(tol: T) -> Self {
        Self { tol }
    }
}

impl Default for RelativeResidualCriterion<f64> {
    fn default() -> Self {
        Self::new(1e-8)
    }
}

impl<T> CgStoppingCriterion<T> for RelativeResidualCriterion<T>
where
    T: RealField + Copy,
{
    fn has_converged(&self, b_norm: T, _iteration: usize, approx_residual: DVectorView<T>) -> bool {
        approx_residual.norm() <= self.tol * b_norm
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum SolveErrorKind {
    OperatorError(Box<dyn Error + Send + Sync>),
    PreconditionerError(Box<dyn Error + Send + Sync>),
    IndefiniteOperator,
    IndefinitePreconditioner,
    MaxIterationsReached { max_iter: usize },
}

impl fmt::Display for SolveErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OperatorError(err) => {
                write!(f, "Error applying operator: ")?;
                err.fmt(f)
            }
            Self::PreconditionerError(err) => {
                write!(f, "Error applying preconditioner: ")?;
                err.fmt(f)
            }
            Self::IndefiniteOperator => write!(f, "Operator appears to be indefinite."),
            Self::IndefinitePreconditioner => write!(f, "Indefinite preconditioner."),
            Self::MaxIterationsReached { max_iter } => {
                write!(f, "Max iterations ({}) reached.", max_iter)
            }
        }
    }
}

#[non_exhaustive]
#[derive(Debug)]
pub struct SolveError<T> {
    pub output: CgOutput<T>,
    pub kind: SolveErrorKind,
}

impl<T> SolveError<T> {
    fn new(output: CgOutput<T>, kind: SolveErrorKind) -> Self {
        Self { output, kind }
    }
}

impl<T> fmt::Display for SolveError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CG solve failed after {} iterations. ", self.output.num_iterations)?;
        write!(f, "Error: {}", self.kind)
    }
}

impl<T: fmt::Debug> std::error::Error for SolveError<T> {}

#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct CgOutput<T> {
    /// Number of iterations of the solver.
    ///
    /// Corresponds to the number of updates made to the (initial) solution vector,
    pub num_iterations: usize,
    marker: PhantomData<T>,
}

#[allow(non_snake_case)]
#[derive(Debug)]
pub struct ConjugateGradient<T, A, P, Criterion>
where
    T: Scalar,
{
    r: DVector<T>,
    z: DVector<T>,
    p: DVector<T>,
    Ap: DVector<T>,
    operator: A,
    preconditioner: P,
    stopping_criterion: Criterion,
    max_iter: Option<usize>,
}

impl<T: Scalar + Zero> ConjugateGradient<T, (), IdentityOperator, ()> {
    pub fn new() -> Self {
        Self {
            r: DVector::zeros(0),
            z: DVector::zeros(0),
            p: DVector::zeros(0),
            Ap: DVector::zeros(0),
            operator: (),
            preconditioner: IdentityOperator,
            stopping_criterion: (),
            max_iter: None,
        }
    }
}

impl<T: Scalar + Zero> Default for ConjugateGradient<T, (), IdentityOperator, ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar, P, Criterion> ConjugateGradient<T, (), P, Criterion> {
    pub fn with_operator<A>(self, operator: A) -> ConjugateGradient<T, A, P, Criterion> {
        ConjugateGradient {
            r: self.r,
            z: self.z,
            p: self.p,
            Ap: self.Ap,
            operator,
            preconditioner: self.preconditioner,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }
}

impl<T: Scalar, A, P, Criterion> ConjugateGradient<T, A, P, Criterion> {
    pub fn with_preconditioner<P2>(self, preconditioner: P2) -> ConjugateGradient<T, A, P2, Criterion> {
        ConjugateGradient {
            r: self.r,
            z: self.z,
            p: self.p,
            Ap: self.Ap,
            operator: self.operator,
            preconditioner,
            stopping_criterion: self.stopping_criterion,
            max_iter: self.max_iter,
        }
    }

    pub fn with_max_iter(self, max_iter: usize) -> Self {
        Self {
            max_iter: Some(max_iter),
            ..self
        }
    }
}

impl<T: Scalar, A, P> ConjugateGradient<T, A, P, ()> {
    pub fn with_stopping_criterion<Criterion>(
        self,
        stopping_criterion: Criterion,
    ) -> ConjugateGradient<T, A, P, Criterion> {
        ConjugateGradient {
            r: self.r,
            z: self.z,
            p: self.p,
            Ap: self.Ap,
            operator: self.operator,
            preconditioner: self.preconditioner,
            stopping_criterion,
            max_iter: self.max_iter,
        }
    }
}

impl<T, A, P, Criterion> ConjugateGradient<T, A, P, Criterion>
where
    T: RealField + Copy,
    A: LinearOperator<T>,
    P: LinearOperator<T>,
    Criterion: CgStoppingCriterion<T>,
{
    pub fn solve_with_guess<'b>(
        &mut self,
        b: impl Into<DVectorView<'b, T>>,
        x: impl Into<DVectorViewMut<'b, T>>,
    ) -> Result<CgOutput<T>, SolveError<T>> {
        self.solve_with_guess_(b.into(), x.into())
    }

    #[allow(non_snake_case)]
    fn solve_with_guess_(&mut self, b: DVectorView<T>, mut x: DVectorViewMut<T>) -> Result<CgOutput<T>, SolveError<T>> {
        use SolveErrorKind::*;
        assert_eq!(b.len(), x.len());

        let mut output = CgOutput {
            num_iterations: 0,
            marker: PhantomData,
        };

        let n = x.len();
        self.r.resize_vertically_mut(n, T::zero());
        self.z.resize_vertically_mut(n, T::zero());
        self.p.resize_vertically_mut(n, T::zero());
        self.Ap.resize_vertically_mut(n, T::zero());
        let Self {
            r,
            z,
            p,
            Ap,
            operator,
            preconditioner,
            stopping_criterion,
            max_iter,
        } = self;

        // r = b - Ax
        if let Err(err) = operator.apply(r.as_view_mut(), x.as_view()) {
            return Err(SolveError::new(output, OperatorError(err)));
        }
        r.zip_apply(&b, |r_i, b_i| *r_i = b_i - *r_i);

        // z = Pr
        if let Err(err) = preconditioner.apply(z.as_view_mut(), r.as_view()) {
            return Err(SolveError::new(output, PreconditionerError(err)));
        }

        p.copy_from(&*z);

        let mut zTr = z.dot(&*r);
        let b_norm = b.norm();

        if b_norm == T::zero() {
            x.fill(T::zero());
            return Ok(output);
        }

        loop {
            if stopping_criterion.has_converged(b_norm, output.num_iterations, r.as_view()) {
                break;
            } else if let Some(max_iter) = *max_iter {
                if output.num_iterations >= max_iter {
                    return Err(SolveError::new(output, MaxIterationsReached { max_iter }));
                }
            }

            // Ap = A * p
            if let Err(err) = operator.apply(Ap.as_view_mut(), p.as_view()) {
                return Err(SolveError::new(output, OperatorError(err)));
            }
            let pAp = p.dot(&*Ap);

            if pAp <= T::zero() {
                return Err(SolveError::new(output, IndefiniteOperator));
            }
            if zTr <= T::zero() {
                return Err(SolveError::new(output, IndefinitePreconditioner));
            }

            let alpha = zTr / pAp;
            // x <- x + alpha * p
            x.zip_apply(&*p, |x_i, p_i| *x_i += alpha * p_i);
            // r <- r - alpha * Ap
            r.zip_apply(&*Ap, |r_i, Ap_i| *r_i -= alpha * Ap_i);

            // Number of iterations corresponds to number of updates to the x vector
            output.num_iterations += 1;

            // z <- P r
            if let Err(err) = preconditioner.apply(z.as_view_mut(), r.as_view()) {
                return Err(SolveError::new(output, PreconditionerError(err)));
            }
            let zTr_next = z.dot(&*r);
            let beta = zTr_next / zTr;

            // p <- z + beta * p
            p.zip_apply(&*z, |p_i, z_i| *p_i = z_i + beta * *p_i);

            zTr = zTr_next;
        }

        Ok(output)
    }
}
