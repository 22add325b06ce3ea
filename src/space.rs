//! Helpers for continuous piecewise linear (P1) vector-valued functions on a mesh.
//!
//! A P1 function with `D` components has one value per component at every mesh vertex.
//! Values are stored in interleaved layout: component `k` at vertex `i` is stored at
//! index `D * i + k`.
use crate::mesh::Mesh;
use nalgebra::allocator::Allocator;
use nalgebra::{DVector, DefaultAllocator, DimName, OVector, Scalar};
use std::marker::PhantomData;

/// Returns the interleaved vertex coordinates of the mesh.
///
/// This is the P1 interpolant of the identity map `x ↦ x`.
pub fn nodal_coordinates<T, D, C>(mesh: &Mesh<T, D, C>) -> DVector<T>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    let values: Vec<_> = mesh
        .vertices()
        .iter()
        .flat_map(|v| v.coords.iter().cloned())
        .collect();
    DVector::from_vec(values)
}

/// Returns the coordinate along `axis` of every vertex of the mesh.
///
/// # Panics
///
/// Panics if `axis >= D`.
pub fn nodal_coordinates_along_axis<T, D, C>(mesh: &Mesh<T, D, C>, axis: usize) -> Vec<T>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    assert!(axis < D::dim(), "Axis must be smaller than the geometric dimension.");
    mesh.vertices().iter().map(|v| v[axis].clone()).collect()
}

/// Read-only per-vertex view of an interleaved P1 function with `D` components.
#[derive(Debug, Clone, Copy)]
pub struct FunctionView<'a, T, D> {
    values: &'a [T],
    marker: PhantomData<D>,
}

impl<'a, T, D> FunctionView<'a, T, D>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    /// # Panics
    ///
    /// Panics if the number of values is not divisible by `D`.
    pub fn from_slice(values: &'a [T]) -> Self {
        assert_eq!(
            values.len() % D::dim(),
            0,
            "Number of values must be divisible by the number of components."
        );
        Self {
            values,
            marker: PhantomData,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.values.len() / D::dim()
    }

    pub fn node_value(&self, node: usize) -> OVector<T, D> {
        let d = D::dim();
        OVector::<T, D>::from_column_slice(&self.values[d * node..d * (node + 1)])
    }

    pub fn iter(&self) -> impl Iterator<Item = OVector<T, D>> + 'a {
        self.values
            .chunks_exact(D::dim())
            .map(OVector::<T, D>::from_column_slice)
    }

    pub fn as_slice(&self) -> &'a [T] {
        self.values
    }
}

/// Mutable per-vertex view of an interleaved P1 function with `D` components.
#[derive(Debug)]
pub struct FunctionViewMut<'a, T, D> {
    values: &'a mut [T],
    marker: PhantomData<D>,
}

impl<'a, T, D> FunctionViewMut<'a, T, D>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    /// # Panics
    ///
    /// Panics if the number of values is not divisible by `D`.
    pub fn from_slice(values: &'a mut [T]) -> Self {
        assert_eq!(
            values.len() % D::dim(),
            0,
            "Number of values must be divisible by the number of components."
        );
        Self {
            values,
            marker: PhantomData,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.values.len() / D::dim()
    }

    pub fn node_value(&self, node: usize) -> OVector<T, D> {
        self.as_view().node_value(node)
    }

    pub fn set_node_value(&mut self, node: usize, value: &OVector<T, D>) {
        let d = D::dim();
        self.values[d * node..d * (node + 1)].clone_from_slice(value.as_slice());
    }

    /// Sets the value at every node from a function of the node index.
    pub fn set_from_fn(&mut self, mut f: impl FnMut(usize) -> OVector<T, D>) {
        for node in 0..self.num_nodes() {
            let value = f(node);
            self.set_node_value(node, &value);
        }
    }

    pub fn as_view(&self) -> FunctionView<'_, T, D> {
        FunctionView {
            values: &*self.values,
            marker: PhantomData,
        }
    }
}
