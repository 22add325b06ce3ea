use crate::connectivity::{Connectivity, Tet4Connectivity, Tri3d2Connectivity};
use itertools::Itertools;
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OPoint, OVector, RealField, Scalar, U2, U3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod procedural;
pub mod refinement;

/// A boundary facet of a mesh, tagged with an integer boundary marker.
///
/// The vertex indices refer to the vertices of the mesh the facet belongs to. Facets are
/// segments for two-dimensional meshes and triangles for three-dimensional meshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkedFacet {
    pub vertices: Vec<usize>,
    pub marker: usize,
}

impl MarkedFacet {
    pub fn new(vertices: Vec<usize>, marker: usize) -> Self {
        Self { vertices, marker }
    }
}

/// Index-based data structure for conforming meshes (i.e. no hanging nodes), with
/// optionally marked boundary facets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct Mesh<T: Scalar, D, Connectivity>
where
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    // serde's not able correctly determine the necessary trait bounds in this case,
    // so write our own
    #[serde(bound(
        serialize = "<DefaultAllocator as Allocator<T, D>>::Buffer: Serialize",
        deserialize = "<DefaultAllocator as Allocator<T, D>>::Buffer: Deserialize<'de>"
    ))]
    vertices: Vec<OPoint<T, D>>,
    #[serde(bound(
        serialize = "Connectivity: Serialize",
        deserialize = "Connectivity: Deserialize<'de>"
    ))]
    connectivity: Vec<Connectivity>,
    #[serde(default)]
    boundary_facets: Vec<MarkedFacet>,
}

pub type Mesh2d<T, Connectivity> = Mesh<T, U2, Connectivity>;
pub type Mesh3d<T, Connectivity> = Mesh<T, U3, Connectivity>;

pub type TriangleMesh2d<T> = Mesh2d<T, Tri3d2Connectivity>;
pub type Tet4Mesh<T> = Mesh3d<T, Tet4Connectivity>;

impl<T, D, Connectivity> Mesh<T, D, Connectivity>
where
    T: Scalar,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    pub fn vertices(&self) -> &[OPoint<T, D>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[Connectivity] {
        &self.connectivity
    }

    pub fn boundary_facets(&self) -> &[MarkedFacet] {
        &self.boundary_facets
    }

    /// Construct a mesh from vertices and connectivity.
    ///
    /// The provided connectivity is expected only to return valid (i.e. in-bounds) indices.
    /// Users of the mesh are permitted to panic if they encounter invalid indices.
    /// The mesh has no marked boundary facets.
    pub fn from_vertices_and_connectivity(vertices: Vec<OPoint<T, D>>, connectivity: Vec<Connectivity>) -> Self {
        Self {
            vertices,
            connectivity,
            boundary_facets: Vec::new(),
        }
    }

    /// Replaces the marked boundary facets of the mesh.
    pub fn with_boundary_facets(self, boundary_facets: Vec<MarkedFacet>) -> Self {
        Self {
            boundary_facets,
            ..self
        }
    }

    /// Returns the sorted, unique boundary markers present in the mesh.
    pub fn boundary_markers(&self) -> Vec<usize> {
        self.boundary_facets
            .iter()
            .map(|f| f.marker)
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// Returns the sorted, unique indices of the vertices that belong to a facet
    /// with one of the given markers.
    pub fn vertices_on_boundaries(&self, markers: &[usize]) -> Vec<usize> {
        self.boundary_facets
            .iter()
            .filter(|facet| markers.contains(&facet.marker))
            .flat_map(|facet| facet.vertices.iter().copied())
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// Overwrites the vertex coordinates with values stored in interleaved layout, i.e.
    /// coordinate `k` of vertex `i` is taken from `values[D * i + k]`.
    ///
    /// # Panics
    ///
    /// Panics if the number of values does not match the number of vertex coordinates.
    pub fn set_vertices_from_interleaved(&mut self, values: &[T]) {
        let d = D::dim();
        assert_eq!(
            values.len(),
            d * self.vertices.len(),
            "Number of values must match the number of vertex coordinates."
        );
        for (vertex, coords) in self.vertices.iter_mut().zip(values.chunks_exact(d)) {
            for (x, value) in vertex.coords.iter_mut().zip(coords) {
                *x = value.clone();
            }
        }
    }
}

impl<T, D, C> Mesh<T, D, C>
where
    T: Scalar,
    D: DimName,
    C: Connectivity,
    C::FaceConnectivity: Connectivity,
    DefaultAllocator: Allocator<T, D>,
{
    /// Finds faces which are only connected to exactly one cell, along with the connected cell
    /// index and the local index of the face within that cell.
    pub fn find_boundary_faces(&self) -> Vec<(C::FaceConnectivity, usize, usize)> {
        // Count the number of occurrences of "equivalent" faces (in the sense that they refer
        // to the same vertex indices). Use a BTreeMap to avoid non-determinism due to
        // HashMap's internal randomization.
        let mut face_counts: BTreeMap<Vec<usize>, (C::FaceConnectivity, usize, usize, usize)> = BTreeMap::new();
        for (conn_idx, cell_conn) in self.connectivity.iter().enumerate() {
            for local_idx in 0..cell_conn.num_faces() {
                if let Some(face_conn) = cell_conn.get_face_connectivity(local_idx) {
                    let mut key = face_conn.vertex_indices().to_vec();
                    key.sort_unstable();
                    face_counts
                        .entry(key)
                        .and_modify(|(_, _, _, count)| *count += 1)
                        .or_insert((face_conn, conn_idx, local_idx, 1));
                }
            }
        }

        // Take only the faces which have a count of 1, which correspond to boundary faces
        face_counts
            .into_values()
            .filter(|&(_, _, _, count)| count == 1)
            .map(|(face, cell, local, _)| (face, cell, local))
            .collect()
    }

    /// Returns a sorted list of vertices that are determined to be on the boundary.
    ///
    /// A vertex is considered to be a part of the boundary if it belongs to a boundary face.
    pub fn find_boundary_vertices(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        for (connectivity, _, _) in self.find_boundary_faces() {
            indices.extend_from_slice(connectivity.vertex_indices());
        }
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Marks the boundary facets of the mesh with the given classification function.
    ///
    /// The function receives the vertices of each boundary face and returns the marker of
    /// the face, or `None` if the face should remain unmarked. Any previously marked facets
    /// are discarded.
    pub fn mark_boundary<F>(&mut self, mut classify: F)
    where
        F: FnMut(&[OPoint<T, D>]) -> Option<usize>,
    {
        let mut facets = Vec::new();
        let mut face_vertices = Vec::new();
        for (face, _, _) in self.find_boundary_faces() {
            face_vertices.clear();
            face_vertices.extend(face.vertex_indices().iter().map(|&i| self.vertices[i].clone()));
            if let Some(marker) = classify(&face_vertices) {
                facets.push(MarkedFacet::new(face.vertex_indices().to_vec(), marker));
            }
        }
        self.boundary_facets = facets;
    }
}

impl<T, D, C> Mesh<T, D, C>
where
    T: RealField,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    /// Translates all vertices of the mesh by the given translation vector.
    pub fn translate(&mut self, translation: &OVector<T, D>) {
        self.transform_vertices(|p| *p += translation);
    }

    /// Transform all vertices of the mesh by the given transformation function.
    pub fn transform_vertices<F>(&mut self, mut transformation: F)
    where
        F: FnMut(&mut OPoint<T, D>),
    {
        for p in &mut self.vertices {
            transformation(p);
        }
    }
}
