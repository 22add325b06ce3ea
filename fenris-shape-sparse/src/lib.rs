//! Sparse operators and linear solvers used to build control-space interpolation
//! operators and inner-product metrics.
pub mod cg;
pub mod factorization;
pub mod nullspace;
pub mod ops;

pub use nalgebra_sparse;
