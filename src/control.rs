//! Control spaces: spaces of admissible deformations of a reference mesh.
//!
//! A control space maps a vector of control parameters `q` to a nodal displacement field on
//! the reference mesh (`interpolate`) and maps nodal (dual) fields back to the control space
//! (`restrict`, the transpose of `interpolate`). The deformation field of the domain is
//! `T = id + interpolate(q)`, where `id` holds the reference vertex coordinates, and the
//! moved mesh is the reference mesh with vertex coordinates taken from `T`.
//!
//! Nodal values are stored in interleaved layout: component `k` at vertex `i` is stored at
//! index `dim * i + k`.
use crate::inner_product::InnerProduct;
use crate::mesh::Mesh;
use crate::space::nodal_coordinates;
use nalgebra::allocator::Allocator;
use nalgebra::{DVector, DVectorView, DVectorViewMut, DefaultAllocator, DimName};
use std::cell::{Ref, RefCell};
use std::fmt::Debug;

mod bspline;
mod multigrid;
mod nodal;
mod vector;

pub use bspline::*;
pub use multigrid::*;
pub use nodal::*;
pub use vector::*;

/// A space of geometric transformations of a reference mesh.
pub trait ControlSpace: Debug {
    /// The number of control parameters, i.e. the length of control vectors.
    fn dimension(&self) -> usize;

    /// The geometric dimension of the mesh.
    fn geometric_dim(&self) -> usize;

    /// The length of nodal vector fields on the reference mesh.
    fn nodal_dimension(&self) -> usize;

    /// Maps a nodal (dual) field on the reference mesh to the control space.
    fn restrict(&self, residual: DVectorView<f64>, out: DVectorViewMut<f64>);

    /// Maps control parameters to a nodal displacement field on the reference mesh.
    fn interpolate(&self, vector: DVectorView<f64>, out: DVectorViewMut<f64>);

    /// Sets the deformation to `T = id + interpolate(q)` and moves the mesh accordingly.
    ///
    /// # Panics
    ///
    /// Panics if `q` does not belong to this control space.
    fn update_domain(&self, q: &ControlVector);

    /// Returns the zero element of the control space as a plain vector.
    fn get_zero_vec(&self) -> DVector<f64> {
        DVector::zeros(self.dimension())
    }

    fn inner_product(&self) -> &dyn InnerProduct;

    /// Interleaved coordinates of the reference mesh vertices.
    fn identity(&self) -> DVectorView<'_, f64>;

    /// A copy of the current deformation field `T`.
    fn deformation(&self) -> DVector<f64>;

    /// The number of nodes of the finite element function that shares its values with control
    /// vectors, or `None` if control vectors are not finite element functions.
    fn nodal_view_size(&self) -> Option<usize>;

    /// Computes the primal representative `out` of the dual control vector `v`.
    ///
    /// # Panics
    ///
    /// Panics if `v` or `out` do not belong to this control space.
    fn riesz_map(&self, v: &ControlVector, out: &mut ControlVector) -> eyre::Result<()> {
        assert!(
            v.belongs_to(self) && out.belongs_to(self),
            "Riesz map requires vectors of the same control space."
        );
        self.inner_product()
            .riesz_map(v.data().as_view(), out.data_mut().as_view_mut())
    }
}

/// The reference mesh of a control space together with its current deformation.
#[derive(Debug)]
pub struct DeformedDomain<D, C>
where
    D: DimName,
    DefaultAllocator: Allocator<f64, D>,
{
    reference_mesh: Mesh<f64, D, C>,
    identity: DVector<f64>,
    deformation: RefCell<DVector<f64>>,
    moved_mesh: RefCell<Mesh<f64, D, C>>,
}

impl<D, C> DeformedDomain<D, C>
where
    D: DimName,
    C: Clone,
    DefaultAllocator: Allocator<f64, D>,
{
    pub fn new(reference_mesh: Mesh<f64, D, C>) -> Self {
        let identity = nodal_coordinates(&reference_mesh);
        Self {
            moved_mesh: RefCell::new(reference_mesh.clone()),
            deformation: RefCell::new(identity.clone()),
            identity,
            reference_mesh,
        }
    }
}

impl<D, C> DeformedDomain<D, C>
where
    D: DimName,
    DefaultAllocator: Allocator<f64, D>,
{
    pub fn reference_mesh(&self) -> &Mesh<f64, D, C> {
        &self.reference_mesh
    }

    pub fn identity(&self) -> &DVector<f64> {
        &self.identity
    }

    pub fn deformation(&self) -> Ref<'_, DVector<f64>> {
        self.deformation.borrow()
    }

    pub fn moved_mesh(&self) -> Ref<'_, Mesh<f64, D, C>> {
        self.moved_mesh.borrow()
    }

    pub fn nodal_dimension(&self) -> usize {
        self.identity.len()
    }

    /// Stores the displacement produced by `displace` plus the identity as the new deformation
    /// and moves the mesh vertices to it.
    pub fn update(&self, displace: impl FnOnce(DVectorViewMut<f64>)) {
        let mut deformation = self.deformation.borrow_mut();
        displace(deformation.as_view_mut());
        *deformation += &self.identity;
        self.moved_mesh
            .borrow_mut()
            .set_vertices_from_interleaved(deformation.as_slice());
    }
}
