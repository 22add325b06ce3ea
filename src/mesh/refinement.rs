//! Uniform mesh refinement with vertex provenance.
//!
//! Refinement keeps track of where every new vertex comes from (an original vertex or the
//! midpoint of an original edge), which is exactly the information needed to prolongate
//! piecewise linear functions from the coarse mesh to the refined mesh.
use crate::allocators::DimAllocator;
use crate::mesh::{MarkedFacet, Mesh};
use nalgebra::{DefaultAllocator, DimName, OPoint, RealField};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use rustc_hash::FxHashMap;

pub mod detail;

pub use detail::{EdgeMidpointLabel, VertexLabel, VertexOrEdgeMidpointVertex};

#[derive(Debug, Clone)]
pub struct InvalidVertexCount;

pub trait VertexRepresentation: Clone {
    fn construct_vertex<T, D>(&self, all_vertices: &[OPoint<T, D>]) -> OPoint<T, D>
    where
        T: RealField,
        D: DimName,
        DefaultAllocator: DimAllocator<T, D>;

    /// Appends the weights with which the values at the original vertices combine into the
    /// value of a piecewise linear function at this vertex.
    fn populate_interpolation_weights(&self, weights: &mut Vec<(usize, f64)>);
}

/// Defines a refinement scheme for a given connectivity.
pub trait RefineConnectivity<Connectivity> {
    /// An intermediate connectivity type that holds the necessary information
    /// to represent the connectivity in a manner independent of the index labeling of
    /// new vertices.
    type Intermediate;
    /// The resulting connectivity type after refinement.
    type OutputConnectivity;

    /// For a given connectivity, produce a set of intermediate connectivities that represent
    /// refined connectivities.
    fn populate_refined_connectivity(&self, connectivity: &Connectivity, intermediates: &mut Vec<Self::Intermediate>);

    /// Populate a set of vertex labels associated with an intermediate connectivity.
    fn populate_vertex_labels(&self, intermediate: &Self::Intermediate, labels: &mut Vec<VertexOrEdgeMidpointVertex>);

    /// Construct the final connectivity from an intermediate given final,
    /// globally consistent vertex indices.
    ///
    /// The implementation must succeed if the number of vertex indices is equal to the
    /// number of vertex labels associated with the intermediate.
    fn construct_output_connectivity(
        &self,
        intermediate: &Self::Intermediate,
        vertex_indices: &[usize],
    ) -> Result<Self::OutputConnectivity, InvalidVertexCount>;
}

pub struct UniformRefinement;

/// A refined mesh together with the provenance of each of its vertices.
#[derive(Debug, Clone)]
pub struct RefinedMesh<T, D, C>
where
    T: RealField,
    D: DimName,
    DefaultAllocator: DimAllocator<T, D>,
{
    pub mesh: Mesh<T, D, C>,
    /// `vertex_labels[i]` describes how vertex `i` of the refined mesh was obtained from the
    /// vertices of the original mesh.
    pub vertex_labels: Vec<VertexOrEdgeMidpointVertex>,
    pub num_parent_vertices: usize,
}

impl<T, D, C> RefinedMesh<T, D, C>
where
    T: RealField,
    D: DimName,
    DefaultAllocator: DimAllocator<T, D>,
{
    /// The `n_fine × n_coarse` matrix that prolongates scalar piecewise linear functions
    /// from the original mesh to the refined mesh.
    pub fn prolongation_matrix(&self) -> CsrMatrix<f64> {
        prolongation_matrix(&self.vertex_labels, self.num_parent_vertices)
    }
}

/// Assembles the prolongation matrix described by the given vertex labels.
pub fn prolongation_matrix<L: VertexRepresentation>(vertex_labels: &[L], num_parent_vertices: usize) -> CsrMatrix<f64> {
    let mut coo = CooMatrix::new(vertex_labels.len(), num_parent_vertices);
    let mut weights = Vec::new();
    for (row, label) in vertex_labels.iter().enumerate() {
        weights.clear();
        label.populate_interpolation_weights(&mut weights);
        for &(col, weight) in &weights {
            coo.push(row, col, weight);
        }
    }
    CsrMatrix::from(&coo)
}

/// Refine a mesh with the provided refinement scheme.
///
/// Marked boundary facets are refined along with the cells, so that the children of a
/// facet carry the marker of their parent.
pub fn refine_mesh<T, D, C, Refinement>(
    mesh: &Mesh<T, D, C>,
    refinement_scheme: Refinement,
) -> RefinedMesh<T, D, Refinement::OutputConnectivity>
where
    T: RealField,
    D: DimName,
    Refinement: RefineConnectivity<C>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let mut label_to_idx_map = FxHashMap::default();
    let mut next_vertex_idx = 0;
    let mut index_of = |label: &VertexOrEdgeMidpointVertex| {
        *label_to_idx_map.entry(*label).or_insert_with(|| {
            let idx = next_vertex_idx;
            next_vertex_idx += 1;
            idx
        })
    };

    let mut new_connectivity = Vec::new();

    // Local buffers
    let mut intermediates = Vec::new();
    let mut vertex_labels = Vec::new();
    let mut new_vertex_indices = Vec::new();
    for connectivity in mesh.connectivity() {
        intermediates.clear();
        refinement_scheme.populate_refined_connectivity(connectivity, &mut intermediates);
        for intermediate in &intermediates {
            vertex_labels.clear();
            new_vertex_indices.clear();
            refinement_scheme.populate_vertex_labels(intermediate, &mut vertex_labels);
            new_vertex_indices.extend(vertex_labels.iter().map(&mut index_of));
            let new_cell_connectivity = refinement_scheme
                .construct_output_connectivity(intermediate, &new_vertex_indices)
                .expect("Must succeed since vertex label count is consistent with vertex index count");
            new_connectivity.push(new_cell_connectivity);
        }
    }

    let mut new_facets = Vec::new();
    for facet in mesh.boundary_facets() {
        for child in detail::refine_facet_labels(&facet.vertices) {
            let vertices = child.iter().map(&mut index_of).collect();
            new_facets.push(MarkedFacet::new(vertices, facet.marker));
        }
    }

    let mut new_vertices = vec![OPoint::origin(); next_vertex_idx];
    let mut labels = vec![VertexOrEdgeMidpointVertex::Vertex(VertexLabel(0)); next_vertex_idx];
    for (label, index) in label_to_idx_map {
        new_vertices[index] = label.construct_vertex(mesh.vertices());
        labels[index] = label;
    }

    RefinedMesh {
        mesh: Mesh::from_vertices_and_connectivity(new_vertices, new_connectivity).with_boundary_facets(new_facets),
        vertex_labels: labels,
        num_parent_vertices: mesh.vertices().len(),
    }
}

/// Apply one round of uniform mesh refinement.
///
/// This is a convenience function for `refine_mesh(mesh, UniformRefinement)`.
pub fn refine_uniformly<T, D, C>(mesh: &Mesh<T, D, C>) -> RefinedMesh<T, D, C>
where
    T: RealField,
    D: DimName,
    UniformRefinement: RefineConnectivity<C, OutputConnectivity = C>,
    DefaultAllocator: DimAllocator<T, D>,
{
    refine_mesh(mesh, UniformRefinement)
}

/// Repeatedly applies uniform mesh refinement to the given mesh.
///
/// Returns the finest mesh together with the scalar prolongation matrix from the given mesh
/// to the finest mesh, which is the product of the prolongations of the individual steps.
pub fn refine_uniformly_repeat<T, D, C>(mesh: &Mesh<T, D, C>, repeat_times: usize) -> (Mesh<T, D, C>, CsrMatrix<f64>)
where
    T: RealField,
    D: DimName,
    C: Clone,
    UniformRefinement: RefineConnectivity<C, OutputConnectivity = C>,
    DefaultAllocator: DimAllocator<T, D>,
{
    let mut mesh: Mesh<_, _, _> = mesh.clone();
    let mut prolongation = CsrMatrix::identity(mesh.vertices().len());
    for _ in 0..repeat_times {
        let refined = refine_uniformly(&mesh);
        prolongation = &refined.prolongation_matrix() * &prolongation;
        mesh = refined.mesh;
    }
    (mesh, prolongation)
}
