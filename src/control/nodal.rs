use crate::connectivity::Connectivity;
use crate::control::{ControlSpace, ControlVector, DeformedDomain};
use crate::inner_product::{FeInnerProduct, InnerProduct, InnerProductConfig};
use crate::mesh::Mesh;
use log::info;
use nalgebra::allocator::Allocator;
use nalgebra::{DVector, DVectorView, DVectorViewMut, DefaultAllocator, DimName};
use std::cell::Ref;
use std::fmt::Debug;

/// Control space of nodal (continuous piecewise linear) displacement fields on the mesh.
///
/// Control vectors are themselves finite element functions, so interpolation and restriction
/// are plain copies.
#[derive(Debug)]
pub struct FeControlSpace<D, C>
where
    D: DimName,
    DefaultAllocator: Allocator<f64, D>,
{
    domain: DeformedDomain<D, C>,
    inner_product: FeInnerProduct,
}

impl<D, C> FeControlSpace<D, C>
where
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<f64, D>,
{
    pub fn new(mesh: Mesh<f64, D, C>, inner_product: &InnerProductConfig) -> eyre::Result<Self> {
        let inner_product = FeInnerProduct::assemble(&mesh, inner_product)?;
        let domain = DeformedDomain::new(mesh);
        info!(
            "Constructed nodal control space of dimension {} on a mesh with {} vertices",
            domain.nodal_dimension(),
            domain.reference_mesh().vertices().len()
        );
        Ok(Self { domain, inner_product })
    }

    pub fn reference_mesh(&self) -> &Mesh<f64, D, C> {
        self.domain.reference_mesh()
    }

    pub fn moved_mesh(&self) -> Ref<'_, Mesh<f64, D, C>> {
        self.domain.moved_mesh()
    }

    pub fn fe_inner_product(&self) -> &FeInnerProduct {
        &self.inner_product
    }
}

impl<D, C> ControlSpace for FeControlSpace<D, C>
where
    D: DimName,
    C: Connectivity + Debug,
    DefaultAllocator: Allocator<f64, D>,
{
    fn dimension(&self) -> usize {
        self.domain.nodal_dimension()
    }

    fn geometric_dim(&self) -> usize {
        D::dim()
    }

    fn nodal_dimension(&self) -> usize {
        self.domain.nodal_dimension()
    }

    fn restrict(&self, residual: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        out.copy_from(&residual);
    }

    fn interpolate(&self, vector: DVectorView<f64>, mut out: DVectorViewMut<f64>) {
        out.copy_from(&vector);
    }

    fn update_domain(&self, q: &ControlVector) {
        assert!(q.belongs_to(self), "Control vector must belong to this control space.");
        self.domain
            .update(|displacement| self.interpolate(q.data().as_view(), displacement));
    }

    fn inner_product(&self) -> &dyn InnerProduct {
        &self.inner_product
    }

    fn identity(&self) -> DVectorView<'_, f64> {
        self.domain.identity().as_view()
    }

    fn deformation(&self) -> DVector<f64> {
        self.domain.deformation().clone()
    }

    fn nodal_view_size(&self) -> Option<usize> {
        Some(self.domain.reference_mesh().vertices().len())
    }
}
