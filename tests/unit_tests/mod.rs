mod assembly;
mod mesh;

use fenris_shape::connectivity::Connectivity;
use fenris_shape::mesh::Mesh;
use nalgebra::allocator::Allocator;
use nalgebra::{DMatrix, DefaultAllocator, DimName};

/// Signed volumes of all cells of a simplicial mesh.
pub fn signed_cell_volumes<D, C>(mesh: &Mesh<f64, D, C>) -> Vec<f64>
where
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<f64, D>,
{
    let d = D::dim();
    let factorial: f64 = (1..=d).map(|k| k as f64).product();
    mesh.connectivity()
        .iter()
        .map(|cell| {
            let indices = cell.vertex_indices();
            let x0 = &mesh.vertices()[indices[0]];
            let jacobian = DMatrix::from_fn(d, d, |r, c| mesh.vertices()[indices[c + 1]][r] - x0[r]);
            jacobian.determinant() / factorial
        })
        .collect()
}

pub fn total_volume<D, C>(mesh: &Mesh<f64, D, C>) -> f64
where
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<f64, D>,
{
    signed_cell_volumes(mesh).iter().map(|v| v.abs()).sum()
}
