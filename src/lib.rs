//! Control spaces for PDE-constrained shape optimization.
//!
//! A control space describes the admissible deformations of a reference mesh. It maps vectors
//! of control parameters to a deformation field on the mesh (and back, for derivatives), and
//! carries an inner product whose Riesz map turns derivatives into search directions.
//! Three kinds of control spaces are provided: nodal finite element deformations
//! ([`FeControlSpace`](control::FeControlSpace)), nodal deformations on a coarse mesh that are
//! prolongated to a uniformly refined mesh
//! ([`FeMultiGridControlSpace`](control::FeMultiGridControlSpace)) and tensor-product B-spline
//! deformations ([`BsplineControlSpace`](control::BsplineControlSpace)).
pub mod allocators;
pub mod assembly;
pub mod connectivity;
pub mod control;
pub mod error;
pub mod inner_product;
pub mod mesh;
pub mod space;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub mod sparse {
    pub use fenris_shape_sparse::*;
}

pub mod spline {
    pub use fenris_shape_spline::*;
}
