use crate::assembly::local::{element_geometry, ElementConnectivityAssembler, ElementMatrixAssembler, SimplexGeometry};
use crate::connectivity::Connectivity;
use crate::mesh::Mesh;
use nalgebra::allocator::Allocator;
use nalgebra::{DMatrixViewMut, DefaultAllocator, DimName, RealField};

/// Assembles the element matrix of the bilinear form
///
/// $$
/// a(u, v) = \int_K \nabla u : \nabla v + c \\, u \cdot v \\, \mathrm{d}V
/// $$
///
/// for linear basis functions with `solution_dim` components, where $c$ is the mass coefficient.
///
/// The matrix is stored in interleaved layout, i.e. entry `(s * a + i, s * b + i)` couples
/// component `i` of vertices `a` and `b`. Different components are not coupled.
///
/// # Panics
///
/// Panics if the output matrix does not have the dimensions of the element matrix.
pub fn assemble_element_laplace_matrix<T>(
    mut output: DMatrixViewMut<T>,
    geometry: &SimplexGeometry<T>,
    solution_dim: usize,
    mass_coefficient: T,
) where
    T: RealField + Copy,
{
    let s = solution_dim;
    let n = geometry.num_vertices();
    assert_eq!(output.nrows(), s * n, "Output matrix dimension mismatch");
    assert_eq!(output.ncols(), s * n, "Output matrix dimension mismatch");

    output.fill(T::zero());
    let volume = geometry.volume();
    for a in 0..n {
        for b in 0..n {
            let mut entry = volume * geometry.gradient(a).dot(&geometry.gradient(b));
            if mass_coefficient != T::zero() {
                entry += mass_coefficient * geometry.mass_entry(a, b);
            }
            for i in 0..s {
                output[(s * a + i, s * b + i)] = entry;
            }
        }
    }
}

/// Element assembler for the (vector) Laplace and Helmholtz bilinear forms with linear elements.
///
/// See [`assemble_element_laplace_matrix`].
#[derive(Debug, Clone)]
pub struct ElementLaplaceAssembler<'a, T, D, C>
where
    T: RealField,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    mesh: &'a Mesh<T, D, C>,
    solution_dim: usize,
    mass_coefficient: T,
}

impl<'a, T, D, C> ElementLaplaceAssembler<'a, T, D, C>
where
    T: RealField + Copy,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    /// A scalar Laplace assembler without mass contribution.
    pub fn from_mesh(mesh: &'a Mesh<T, D, C>) -> Self {
        Self {
            mesh,
            solution_dim: 1,
            mass_coefficient: T::zero(),
        }
    }

    pub fn with_solution_dim(self, solution_dim: usize) -> Self {
        Self { solution_dim, ..self }
    }

    pub fn with_mass_coefficient(self, mass_coefficient: T) -> Self {
        Self {
            mass_coefficient,
            ..self
        }
    }
}

impl<'a, T, D, C> ElementConnectivityAssembler for ElementLaplaceAssembler<'a, T, D, C>
where
    T: RealField,
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<T, D>,
{
    fn solution_dim(&self) -> usize {
        self.solution_dim
    }

    fn num_elements(&self) -> usize {
        self.mesh.num_elements()
    }

    fn num_nodes(&self) -> usize {
        self.mesh.num_nodes()
    }

    fn element_node_count(&self, element_index: usize) -> usize {
        self.mesh.element_node_count(element_index)
    }

    fn populate_element_nodes(&self, output: &mut [usize], element_index: usize) {
        self.mesh.populate_element_nodes(output, element_index)
    }
}

impl<'a, T, D, C> ElementMatrixAssembler<T> for ElementLaplaceAssembler<'a, T, D, C>
where
    T: RealField + Copy,
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<T, D>,
{
    fn assemble_element_matrix_into(&self, element_index: usize, output: DMatrixViewMut<T>) -> eyre::Result<()> {
        let geometry = element_geometry(self.mesh, element_index)?;
        assemble_element_laplace_matrix(output, &geometry, self.solution_dim, self.mass_coefficient);
        Ok(())
    }
}
