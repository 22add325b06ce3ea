//! Cell connectivity of simplex meshes.
//!
//! Every cell is a simplex given by the global indices of its vertices. Facet `i` of a simplex
//! is the sub-simplex opposite to local vertex `i`, ordered so that its normal points out of a
//! positively oriented cell.
use serde::{Deserialize, Serialize};

pub trait Connectivity: Clone {
    /// Connectivity of the facets of the cell.
    type FaceConnectivity: Connectivity;

    fn num_faces(&self) -> usize;
    fn get_face_connectivity(&self, index: usize) -> Option<Self::FaceConnectivity>;

    fn vertex_indices(&self) -> &[usize];
}

/// Terminates the facet chain for cells whose facets are never needed.
impl Connectivity for () {
    type FaceConnectivity = ();

    fn num_faces(&self) -> usize {
        0
    }

    fn get_face_connectivity(&self, _index: usize) -> Option<Self::FaceConnectivity> {
        None
    }

    fn vertex_indices(&self) -> &[usize] {
        &[]
    }
}

/// Vertices of the facet opposite to local vertex `i` of a positively oriented simplex with `N`
/// vertices, where `M = N - 1`.
///
/// The remaining vertices are taken in cyclic order starting after `i`. For an even number of
/// vertices this reverses the orientation of every other facet, which a single swap corrects.
fn opposite_facet<const N: usize, const M: usize>(vertices: &[usize; N], i: usize) -> [usize; M] {
    debug_assert_eq!(M + 1, N);
    let mut facet = [0; M];
    for (k, v) in facet.iter_mut().enumerate() {
        *v = vertices[(i + 1 + k) % N];
    }
    if N % 2 == 0 && i % 2 == 1 {
        facet.swap(0, 1);
    }
    facet
}

macro_rules! simplex_connectivity {
    ($(#[$attr:meta])* $name:ident, $num_vertices:literal, faces: $face:ident) => {
        $(#[$attr])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub [usize; $num_vertices]);

        impl Connectivity for $name {
            type FaceConnectivity = $face;

            fn num_faces(&self) -> usize {
                $num_vertices
            }

            fn get_face_connectivity(&self, index: usize) -> Option<Self::FaceConnectivity> {
                (index < $num_vertices).then(|| $face(opposite_facet(&self.0, index)))
            }

            fn vertex_indices(&self) -> &[usize] {
                &self.0
            }
        }
    };
    ($(#[$attr:meta])* $name:ident, $num_vertices:literal) => {
        $(#[$attr])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub [usize; $num_vertices]);

        impl Connectivity for $name {
            type FaceConnectivity = ();

            fn num_faces(&self) -> usize {
                0
            }

            fn get_face_connectivity(&self, _index: usize) -> Option<Self::FaceConnectivity> {
                None
            }

            fn vertex_indices(&self) -> &[usize] {
                &self.0
            }
        }
    };
}

simplex_connectivity!(
    /// A boundary segment of a triangle mesh in 2D.
    Segment2d2Connectivity,
    2
);

simplex_connectivity!(
    /// A boundary triangle of a tetrahedral mesh in 3D.
    Tri3d3Connectivity,
    3
);

simplex_connectivity!(
    /// A linear triangle in 2D. Vertices are expected in counter-clockwise order.
    Tri3d2Connectivity,
    3,
    faces: Segment2d2Connectivity
);

simplex_connectivity!(
    /// A linear tetrahedron in 3D with positive orientation.
    Tet4Connectivity,
    4,
    faces: Tri3d3Connectivity
);
