//! Clamped, uniformly refined B-spline spaces on axis-aligned boxes and the sparse matrices
//! that evaluate them at a set of points.
pub mod basis;
pub mod interpolation;
pub mod knots;

mod error;

pub use error::SplineError;
pub use knots::{TensorSplineSpace, UnivariateSplineSpace};
