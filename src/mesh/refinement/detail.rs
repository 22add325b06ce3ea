//! Lower level details for refinement abstractions.

use crate::allocators::DimAllocator;
use crate::connectivity::{Tet4Connectivity, Tri3d2Connectivity};
use crate::mesh::refinement::{InvalidVertexCount, RefineConnectivity, UniformRefinement, VertexRepresentation};
use core::cmp::{max, min};
use core::hash::{Hash, Hasher};
use nalgebra::base::default_allocator::DefaultAllocator;
use nalgebra::base::dimension::DimName;
use nalgebra::OPoint;
use nalgebra::RealField;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VertexLabel(pub usize);

impl VertexRepresentation for VertexLabel {
    fn construct_vertex<T, D>(&self, all_vertices: &[OPoint<T, D>]) -> OPoint<T, D>
    where
        T: RealField,
        D: DimName,
        DefaultAllocator: DimAllocator<T, D>,
    {
        let &Self(vertex_idx) = self;
        all_vertices[vertex_idx].clone()
    }

    fn populate_interpolation_weights(&self, weights: &mut Vec<(usize, f64)>) {
        weights.push((self.0, 1.0));
    }
}

#[derive(Debug, Copy, Clone, Eq)]
pub struct EdgeMidpointLabel(pub [usize; 2]);

impl EdgeMidpointLabel {
    fn canonical_vertex_indices(&self) -> [usize; 2] {
        let &EdgeMidpointLabel([a, b]) = self;
        [min(a, b), max(a, b)]
    }
}

impl VertexRepresentation for EdgeMidpointLabel {
    fn construct_vertex<T, D>(&self, all_vertices: &[OPoint<T, D>]) -> OPoint<T, D>
    where
        T: RealField,
        D: DimName,
        DefaultAllocator: DimAllocator<T, D>,
    {
        let &Self(vertex_indices) = self;
        let [a, b] = vertex_indices.map(|idx| &all_vertices[idx]);
        OPoint::from((&a.coords + &b.coords) / T::from_subset(&2.0))
    }

    fn populate_interpolation_weights(&self, weights: &mut Vec<(usize, f64)>) {
        let [a, b] = self.canonical_vertex_indices();
        weights.extend_from_slice(&[(a, 0.5), (b, 0.5)]);
    }
}

impl PartialEq for EdgeMidpointLabel {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_vertex_indices() == other.canonical_vertex_indices()
    }
}

impl Hash for EdgeMidpointLabel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_vertex_indices().hash(state)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum VertexOrEdgeMidpointVertex {
    Vertex(VertexLabel),
    EdgeMidpoint(EdgeMidpointLabel),
}

impl From<VertexLabel> for VertexOrEdgeMidpointVertex {
    fn from(label: VertexLabel) -> Self {
        Self::Vertex(label)
    }
}

impl From<EdgeMidpointLabel> for VertexOrEdgeMidpointVertex {
    fn from(label: EdgeMidpointLabel) -> Self {
        Self::EdgeMidpoint(label)
    }
}

impl VertexRepresentation for VertexOrEdgeMidpointVertex {
    fn construct_vertex<T, D>(&self, all_vertices: &[OPoint<T, D>]) -> OPoint<T, D>
    where
        T: RealField,
        D: DimName,
        DefaultAllocator: DimAllocator<T, D>,
    {
        match self {
            Self::Vertex(label) => label.construct_vertex(all_vertices),
            Self::EdgeMidpoint(label) => label.construct_vertex(all_vertices),
        }
    }

    fn populate_interpolation_weights(&self, weights: &mut Vec<(usize, f64)>) {
        match self {
            Self::Vertex(label) => label.populate_interpolation_weights(weights),
            Self::EdgeMidpoint(label) => label.populate_interpolation_weights(weights),
        }
    }
}

pub fn edge_midpoint(vertices: [usize; 2]) -> EdgeMidpointLabel {
    EdgeMidpointLabel(vertices)
}

pub fn vertex(vertex: usize) -> VertexLabel {
    VertexLabel(vertex)
}

/// Vertex labels of the children of a boundary facet (a segment or a triangle).
///
/// Facets with any other number of vertices are passed through unrefined.
pub(crate) fn refine_facet_labels(facet: &[usize]) -> Vec<Vec<VertexOrEdgeMidpointVertex>> {
    match *facet {
        [a, b] => {
            let m = edge_midpoint([a, b]).into();
            let [a, b] = [a, b].map(|idx| vertex(idx).into());
            vec![vec![a, m], vec![m, b]]
        }
        [a, b, c] => {
            let d = edge_midpoint([a, b]).into();
            let e = edge_midpoint([b, c]).into();
            let f = edge_midpoint([c, a]).into();
            let [a, b, c] = [a, b, c].map(|idx| vertex(idx).into());
            vec![vec![a, d, f], vec![d, b, e], vec![f, e, c], vec![d, e, f]]
        }
        _ => vec![facet.iter().map(|&idx| vertex(idx).into()).collect()],
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IntermediateTri3d2([VertexOrEdgeMidpointVertex; 3]);

impl RefineConnectivity<Tri3d2Connectivity> for UniformRefinement {
    type Intermediate = IntermediateTri3d2;
    type OutputConnectivity = Tri3d2Connectivity;

    fn populate_refined_connectivity(
        &self,
        connectivity: &Tri3d2Connectivity,
        intermediates: &mut Vec<Self::Intermediate>,
    ) {
        let &Tri3d2Connectivity([a, b, c]) = connectivity;
        let d = edge_midpoint([a, b]).into();
        let e = edge_midpoint([b, c]).into();
        let f = edge_midpoint([c, a]).into();
        let [a, b, c] = [a, b, c].map(|vertex_idx| vertex(vertex_idx).into());

        intermediates.extend_from_slice(&[
            IntermediateTri3d2([a, d, f]),
            IntermediateTri3d2([d, b, e]),
            IntermediateTri3d2([f, e, c]),
            IntermediateTri3d2([d, e, f]),
        ]);
    }

    fn populate_vertex_labels(&self, intermediate: &Self::Intermediate, labels: &mut Vec<VertexOrEdgeMidpointVertex>) {
        labels.extend_from_slice(&intermediate.0);
    }

    fn construct_output_connectivity(
        &self,
        _intermediate: &Self::Intermediate,
        vertex_indices: &[usize],
    ) -> Result<Self::OutputConnectivity, InvalidVertexCount> {
        Ok(Tri3d2Connectivity(
            vertex_indices.try_into().map_err(|_| InvalidVertexCount)?,
        ))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IntermediateTet4([VertexOrEdgeMidpointVertex; 4]);

impl RefineConnectivity<Tet4Connectivity> for UniformRefinement {
    type Intermediate = IntermediateTet4;
    type OutputConnectivity = Tet4Connectivity;

    /// Splits the tetrahedron into four corner tetrahedra and an inner octahedron, which is
    /// in turn split into four tetrahedra along the diagonal between the midpoints of the
    /// edges `(0, 2)` and `(1, 3)`.
    ///
    /// Corner children keep the orientation of the parent. Every child has exactly an eighth
    /// of the parent's volume.
    fn populate_refined_connectivity(
        &self,
        connectivity: &Tet4Connectivity,
        intermediates: &mut Vec<Self::Intermediate>,
    ) {
        let &Tet4Connectivity([a, b, c, d]) = connectivity;
        let m01 = edge_midpoint([a, b]).into();
        let m02 = edge_midpoint([a, c]).into();
        let m03 = edge_midpoint([a, d]).into();
        let m12 = edge_midpoint([b, c]).into();
        let m13 = edge_midpoint([b, d]).into();
        let m23 = edge_midpoint([c, d]).into();
        let [x0, x1, x2, x3] = [a, b, c, d].map(|vertex_idx| vertex(vertex_idx).into());

        intermediates.extend_from_slice(&[
            IntermediateTet4([x0, m01, m02, m03]),
            IntermediateTet4([m01, x1, m12, m13]),
            IntermediateTet4([m02, m12, x2, m23]),
            IntermediateTet4([m03, m13, m23, x3]),
            IntermediateTet4([m01, m02, m03, m13]),
            IntermediateTet4([m01, m12, m02, m13]),
            IntermediateTet4([m02, m03, m13, m23]),
            IntermediateTet4([m02, m13, m12, m23]),
        ]);
    }

    fn populate_vertex_labels(&self, intermediate: &Self::Intermediate, labels: &mut Vec<VertexOrEdgeMidpointVertex>) {
        labels.extend_from_slice(&intermediate.0);
    }

    fn construct_output_connectivity(
        &self,
        _intermediate: &Self::Intermediate,
        vertex_indices: &[usize],
    ) -> Result<Self::OutputConnectivity, InvalidVertexCount> {
        Ok(Tet4Connectivity(
            vertex_indices.try_into().map_err(|_| InvalidVertexCount)?,
        ))
    }
}
