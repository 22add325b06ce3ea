use crate::connectivity::Connectivity;
use crate::control::{ControlSpace, ControlVector, DeformedDomain};
use crate::error::ConfigurationError;
use crate::inner_product::{assemble_inner_product_matrix, InnerProduct, InnerProductConfig, InterpolatedInnerProduct};
use crate::mesh::Mesh;
use crate::space::nodal_coordinates_along_axis;
use fenris_shape_sparse::ops::{intertwine, spmv, spmv_transpose};
use fenris_shape_spline::interpolation::tensor_interpolation_matrix;
use fenris_shape_spline::TensorSplineSpace;
use log::info;
use nalgebra::allocator::Allocator;
use nalgebra::{DVector, DVectorView, DVectorViewMut, DefaultAllocator, DimName};
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};
use std::cell::Ref;
use std::fmt::Debug;

/// Parameters of a tensor-product B-spline control space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BsplineConfig {
    /// One interval `(min, max)` per geometric dimension, describing a box around the part
    /// of the domain that is allowed to move.
    pub bbox: Vec<(f64, f64)>,
    /// Spline order per axis. Order `o` means piecewise polynomials of degree `o - 1`.
    pub orders: Vec<usize>,
    /// Number of uniform subdivisions of the knot vector per axis, giving `2^level` spans.
    pub levels: Vec<usize>,
    /// Number of basis functions removed at each end of every axis. Defaults to one per axis,
    /// which makes all deformations vanish on the boundary of the box.
    #[serde(default)]
    pub boundary_regularities: Option<Vec<usize>>,
}

impl BsplineConfig {
    pub fn new(bbox: Vec<(f64, f64)>, orders: Vec<usize>, levels: Vec<usize>) -> Self {
        Self {
            bbox,
            orders,
            levels,
            boundary_regularities: None,
        }
    }

    pub fn with_boundary_regularities(self, regularities: Vec<usize>) -> Self {
        Self {
            boundary_regularities: Some(regularities),
            ..self
        }
    }

    /// Builds the tensor spline space described by the configuration.
    pub fn spline_space(&self) -> Result<TensorSplineSpace, ConfigurationError> {
        let regularities = self
            .boundary_regularities
            .clone()
            .unwrap_or_else(|| vec![1; self.bbox.len()]);
        Ok(TensorSplineSpace::new(&self.bbox, &self.orders, &self.levels, &regularities)?)
    }
}

/// Sizes of a B-spline control space on a particular mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BsplineSizes {
    /// Geometric dimension.
    pub dim: usize,
    /// Number of scalar nodal degrees of freedom (mesh vertices).
    pub num_nodes: usize,
    /// Dimensions of the univariate spline spaces.
    pub axis_dims: Vec<usize>,
    /// Dimension of the scalar tensor spline space.
    pub scalar_dim: usize,
}

impl BsplineSizes {
    pub fn new(space: &TensorSplineSpace, num_nodes: usize) -> Self {
        Self {
            dim: space.num_axes(),
            num_nodes,
            axis_dims: space.axis_dims(),
            scalar_dim: space.dim(),
        }
    }

    /// The number of control parameters.
    pub fn control_dim(&self) -> usize {
        self.dim * self.scalar_dim
    }

    /// The length of nodal vector fields.
    pub fn nodal_dim(&self) -> usize {
        self.dim * self.num_nodes
    }
}

/// Control space of vector fields whose components are tensor-product B-splines on a box.
///
/// The interpolation operator maps spline coefficients (in interleaved layout: component `k`
/// of scalar basis function `j` at index `dim * j + k`) to nodal displacements, and its
/// columns are the nodal interpolants of the vector-valued basis functions. The inner product
/// is a nodal inner product restricted to the spline space.
#[derive(Debug)]
pub struct BsplineControlSpace<D, C>
where
    D: DimName,
    DefaultAllocator: Allocator<f64, D>,
{
    spline_space: TensorSplineSpace,
    sizes: BsplineSizes,
    domain: DeformedDomain<D, C>,
    interpolation: CsrMatrix<f64>,
    inner_product: InterpolatedInnerProduct,
}

impl<D, C> BsplineControlSpace<D, C>
where
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<f64, D>,
{
    pub fn new(
        mesh: Mesh<f64, D, C>,
        inner_product: &InnerProductConfig,
        config: &BsplineConfig,
    ) -> eyre::Result<Self> {
        let dim = D::dim();
        if config.bbox.len() != dim {
            return Err(ConfigurationError::GeometricDimensionMismatch {
                expected: dim,
                actual: config.bbox.len(),
            }
            .into());
        }
        let spline_space = config.spline_space()?;
        let sizes = BsplineSizes::new(&spline_space, mesh.vertices().len());

        let coordinates: Vec<Vec<f64>> = (0..dim)
            .map(|axis| nodal_coordinates_along_axis(&mesh, axis))
            .collect();
        let scalar_interpolation = tensor_interpolation_matrix(&spline_space, &coordinates);
        let interpolation = intertwine(&scalar_interpolation, dim);
        debug_assert_eq!(interpolation.nrows(), sizes.nodal_dim());
        debug_assert_eq!(interpolation.ncols(), sizes.control_dim());

        let nodal = assemble_inner_product_matrix(&mesh, inner_product)?;
        let inner_product = InterpolatedInnerProduct::new(&nodal.matrix, &interpolation)?;

        info!(
            "Constructed B-spline control space with univariate dimensions {:?} (dimension {}, {} nodal dofs)",
            sizes.axis_dims,
            sizes.control_dim(),
            sizes.nodal_dim()
        );

        Ok(Self {
            spline_space,
            sizes,
            domain: DeformedDomain::new(mesh),
            interpolation,
            inner_product,
        })
    }
}

impl<D, C> BsplineControlSpace<D, C>
where
    D: DimName,
    DefaultAllocator: Allocator<f64, D>,
{
    pub fn spline_space(&self) -> &TensorSplineSpace {
        &self.spline_space
    }

    pub fn sizes(&self) -> &BsplineSizes {
        &self.sizes
    }

    /// The `(dim M) × (dim N)` interpolation operator.
    pub fn interpolation_matrix(&self) -> &CsrMatrix<f64> {
        &self.interpolation
    }

    pub fn interpolated_inner_product(&self) -> &InterpolatedInnerProduct {
        &self.inner_product
    }

    pub fn reference_mesh(&self) -> &Mesh<f64, D, C> {
        self.domain.reference_mesh()
    }

    pub fn moved_mesh(&self) -> Ref<'_, Mesh<f64, D, C>> {
        self.domain.moved_mesh()
    }
}

impl<D, C> ControlSpace for BsplineControlSpace<D, C>
where
    D: DimName,
    C: Connectivity + Debug,
    DefaultAllocator: Allocator<f64, D>,
{
    fn dimension(&self) -> usize {
        self.sizes.control_dim()
    }

    fn geometric_dim(&self) -> usize {
        D::dim()
    }

    fn nodal_dimension(&self) -> usize {
        self.sizes.nodal_dim()
    }

    fn restrict(&self, residual: DVectorView<f64>, out: DVectorViewMut<f64>) {
        spmv_transpose(out, &self.interpolation, residual);
    }

    fn interpolate(&self, vector: DVectorView<f64>, out: DVectorViewMut<f64>) {
        spmv(out, &self.interpolation, vector);
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
        None
    }
}
