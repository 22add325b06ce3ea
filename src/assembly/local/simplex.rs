use crate::connectivity::Connectivity;
use crate::mesh::Mesh;
use eyre::eyre;
use nalgebra::allocator::Allocator;
use nalgebra::{DMatrix, DVectorView, DefaultAllocator, DimName, OPoint, RealField};

/// Volume and barycentric coordinate gradients of a straight-sided simplex.
///
/// For linear elements the barycentric coordinates coincide with the basis functions, so their
/// (constant) gradients are all that is needed to integrate products of basis functions and
/// their gradients exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexGeometry<T: RealField> {
    volume: T,
    // Column a holds the gradient of the barycentric coordinate of vertex a
    gradients: DMatrix<T>,
}

impl<T: RealField + Copy> SimplexGeometry<T> {
    /// Computes the geometry of the simplex with the given `D + 1` vertices.
    ///
    /// Returns an error if the number of vertices does not match the dimension or if the
    /// simplex is degenerate.
    pub fn from_vertices<D>(vertices: &[OPoint<T, D>]) -> eyre::Result<Self>
    where
        D: DimName,
        DefaultAllocator: Allocator<T, D>,
    {
        let d = D::dim();
        if vertices.len() != d + 1 {
            return Err(eyre!(
                "Simplex in {} dimensions must have {} vertices, but got {}",
                d,
                d + 1,
                vertices.len()
            ));
        }

        let x0 = &vertices[0];
        let jacobian = DMatrix::from_fn(d, d, |r, c| vertices[c + 1][r] - x0[r]);
        let det = jacobian.determinant();
        let inverse = jacobian
            .try_inverse()
            .ok_or_else(|| eyre!("Degenerate simplex with Jacobian determinant {}", det))?;

        let mut gradients = DMatrix::zeros(d, d + 1);
        for a in 1..=d {
            let grad = inverse.row(a - 1).transpose();
            gradients.column_mut(a).copy_from(&grad);
            let mut first = gradients.column_mut(0);
            first -= &grad;
        }

        let mut factorial = T::one();
        for k in 2..=d {
            factorial *= T::from_usize(k).expect("Must be able to fit usize in T");
        }

        Ok(Self {
            volume: det.abs() / factorial,
            gradients,
        })
    }

    pub fn volume(&self) -> T {
        self.volume
    }

    pub fn num_vertices(&self) -> usize {
        self.gradients.ncols()
    }

    pub fn dim(&self) -> usize {
        self.gradients.nrows()
    }

    pub fn gradient(&self, vertex: usize) -> DVectorView<'_, T> {
        self.gradients.column(vertex)
    }

    /// The integral of `φ_a φ_b` over the simplex for linear basis functions `φ_a` and `φ_b`.
    pub fn mass_entry(&self, a: usize, b: usize) -> T {
        let d = self.dim();
        let numerator = if a == b { T::one() + T::one() } else { T::one() };
        let denominator = T::from_usize((d + 1) * (d + 2)).expect("Must be able to fit usize in T");
        self.volume * numerator / denominator
    }
}

/// Computes the geometry of the given element of the mesh.
pub fn element_geometry<T, D, C>(mesh: &Mesh<T, D, C>, element_index: usize) -> eyre::Result<SimplexGeometry<T>>
where
    T: RealField + Copy,
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<T, D>,
{
    let vertices: Vec<_> = mesh.connectivity()[element_index]
        .vertex_indices()
        .iter()
        .map(|&v| mesh.vertices()[v].clone())
        .collect();
    SimplexGeometry::from_vertices(&vertices)
        .map_err(|err| eyre!("Failed to compute geometry of element {}: {}", element_index, err))
}
