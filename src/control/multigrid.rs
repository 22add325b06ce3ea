use crate::allocators::DimAllocator;
use crate::connectivity::Connectivity;
use crate::control::{ControlSpace, ControlVector, DeformedDomain};
use crate::error::ConfigurationError;
use crate::inner_product::{FeInnerProduct, InnerProduct, InnerProductConfig};
use crate::mesh::refinement::{refine_uniformly_repeat, RefineConnectivity, UniformRefinement};
use crate::mesh::Mesh;
use fenris_shape_sparse::ops::{intertwine, spmv, spmv_transpose};
use log::info;
use nalgebra::allocator::Allocator;
use nalgebra::{DVector, DVectorView, DVectorViewMut, DefaultAllocator, DimName};
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};
use std::cell::Ref;
use std::fmt::Debug;

/// Parameters of a multigrid control space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiGridConfig {
    /// The number of uniform refinements from the control mesh to the fine mesh.
    pub refinements: usize,
    /// Polynomial order of the control functions. Only `1` is supported.
    pub order: usize,
}

impl Default for MultiGridConfig {
    fn default() -> Self {
        Self {
            refinements: 1,
            order: 1,
        }
    }
}

/// Control space of nodal displacement fields on a coarse mesh, prolongated to a uniformly
/// refined mesh.
///
/// The given mesh is the control (coarse) mesh, and the deformed domain is its uniform
/// refinement. The inner product lives on the coarse mesh, and restriction is the transpose
/// of prolongation.
#[derive(Debug)]
pub struct FeMultiGridControlSpace<D, C>
where
    D: DimName,
    DefaultAllocator: Allocator<f64, D>,
{
    coarse_mesh: Mesh<f64, D, C>,
    domain: DeformedDomain<D, C>,
    prolongation: CsrMatrix<f64>,
    inner_product: FeInnerProduct,
}

impl<D, C> FeMultiGridControlSpace<D, C>
where
    D: DimName,
    C: Connectivity,
    UniformRefinement: RefineConnectivity<C, OutputConnectivity = C>,
    DefaultAllocator: DimAllocator<f64, D>,
{
    pub fn new(
        mesh: Mesh<f64, D, C>,
        inner_product: &InnerProductConfig,
        config: &MultiGridConfig,
    ) -> eyre::Result<Self> {
        if config.order != 1 {
            return Err(ConfigurationError::UnsupportedOrder { order: config.order }.into());
        }

        let (fine_mesh, scalar_prolongation) = refine_uniformly_repeat(&mesh, config.refinements);
        let prolongation = intertwine(&scalar_prolongation, D::dim());
        let inner_product = FeInnerProduct::assemble(&mesh, inner_product)?;
        let domain = DeformedDomain::new(fine_mesh);

        info!(
            "Constructed multigrid control space of dimension {} ({} refinements, fine mesh with {} vertices)",
            prolongation.ncols(),
            config.refinements,
            domain.reference_mesh().vertices().len()
        );

        Ok(Self {
            coarse_mesh: mesh,
            domain,
            prolongation,
            inner_product,
        })
    }
}

impl<D, C> FeMultiGridControlSpace<D, C>
where
    D: DimName,
    DefaultAllocator: Allocator<f64, D>,
{
    /// The mesh on which control vectors are defined.
    pub fn coarse_mesh(&self) -> &Mesh<f64, D, C> {
        &self.coarse_mesh
    }

    /// The refined reference mesh that is deformed.
    pub fn reference_mesh(&self) -> &Mesh<f64, D, C> {
        self.domain.reference_mesh()
    }

    pub fn moved_mesh(&self) -> Ref<'_, Mesh<f64, D, C>> {
        self.domain.moved_mesh()
    }

    /// The vector-valued prolongation from the coarse mesh to the fine mesh.
    pub fn prolongation(&self) -> &CsrMatrix<f64> {
        &self.prolongation
    }
}

impl<D, C> ControlSpace for FeMultiGridControlSpace<D, C>
where
    D: DimName,
    C: Connectivity + Debug,
    DefaultAllocator: Allocator<f64, D>,
{
    fn dimension(&self) -> usize {
        self.prolongation.ncols()
    }

    fn geometric_dim(&self) -> usize {
        D::dim()
    }

    fn nodal_dimension(&self) -> usize {
        self.domain.nodal_dimension()
    }

    fn restrict(&self, residual: DVectorView<f64>, out: DVectorViewMut<f64>) {
        spmv_transpose(out, &self.prolongation, residual);
    }

    fn interpolate(&self, vector: DVectorView<f64>, out: DVectorViewMut<f64>) {
        spmv(out, &self.prolongation, vector);
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
        Some(self.coarse_mesh.vertices().len())
    }
}
