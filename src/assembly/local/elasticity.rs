use crate::assembly::local::{element_geometry, ElementConnectivityAssembler, ElementMatrixAssembler, SimplexGeometry};
use crate::connectivity::Connectivity;
use crate::mesh::Mesh;
use eyre::eyre;
use nalgebra::allocator::Allocator;
use nalgebra::{DMatrixViewMut, DefaultAllocator, DimName, RealField};
use numeric_literals::replace_float_literals;

/// Assembles the element matrix of the bilinear form
///
/// $$
/// a(u, v) = \int_K \mu \\, \varepsilon(u) : \varepsilon(v) \\, \mathrm{d}V,
/// \qquad \varepsilon(u) = \frac{1}{2} (\nabla u + \nabla u^T),
/// $$
///
/// for linear vector-valued basis functions and a constant stiffness $\mu$ on the element.
///
/// # Panics
///
/// Panics if the output matrix does not have the dimensions of the element matrix.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
pub fn assemble_element_elasticity_matrix<T>(mut output: DMatrixViewMut<T>, geometry: &SimplexGeometry<T>, stiffness: T)
where
    T: RealField + Copy,
{
    let d = geometry.dim();
    let n = geometry.num_vertices();
    assert_eq!(output.nrows(), d * n, "Output matrix dimension mismatch");
    assert_eq!(output.ncols(), d * n, "Output matrix dimension mismatch");

    let scale = 0.5 * stiffness * geometry.volume();
    for a in 0..n {
        let grad_a = geometry.gradient(a);
        for b in 0..n {
            let grad_b = geometry.gradient(b);
            let grad_dot = grad_a.dot(&grad_b);
            for i in 0..d {
                for j in 0..d {
                    let mut entry = grad_a[j] * grad_b[i];
                    if i == j {
                        entry += grad_dot;
                    }
                    output[(d * a + i, d * b + j)] = scale * entry;
                }
            }
        }
    }
}

/// Element assembler for the linear elasticity bilinear form `∫ μ ε(u) : ε(v)` with a
/// piecewise linear stiffness `μ` given by its vertex values.
///
/// The stiffness is averaged over each element, which integrates the piecewise linear
/// stiffness exactly against the constant strain products.
#[derive(Debug, Clone)]
pub struct ElementElasticityAssembler<'a, T, D, C>
where
    T: RealField,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    mesh: &'a Mesh<T, D, C>,
    vertex_stiffness: &'a [T],
}

impl<'a, T, D, C> ElementElasticityAssembler<'a, T, D, C>
where
    T: RealField,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    /// # Panics
    ///
    /// Panics if the number of stiffness values does not match the number of mesh vertices.
    pub fn new(mesh: &'a Mesh<T, D, C>, vertex_stiffness: &'a [T]) -> Self {
        assert_eq!(
            vertex_stiffness.len(),
            mesh.vertices().len(),
            "Must provide one stiffness value per vertex."
        );
        Self { mesh, vertex_stiffness }
    }
}

impl<'a, T, D, C> ElementConnectivityAssembler for ElementElasticityAssembler<'a, T, D, C>
where
    T: RealField,
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<T, D>,
{
    fn solution_dim(&self) -> usize {
        D::dim()
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

impl<'a, T, D, C> ElementMatrixAssembler<T> for ElementElasticityAssembler<'a, T, D, C>
where
    T: RealField + Copy,
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<T, D>,
{
    fn assemble_element_matrix_into(&self, element_index: usize, output: DMatrixViewMut<T>) -> eyre::Result<()> {
        let geometry = element_geometry(self.mesh, element_index)?;
        let vertices = self.mesh.connectivity()[element_index].vertex_indices();
        let mut stiffness = T::zero();
        for &v in vertices {
            stiffness += self.vertex_stiffness[v];
        }
        stiffness /= T::from_usize(vertices.len()).expect("Must be able to fit usize in T");
        if stiffness <= T::zero() {
            return Err(eyre!(
                "Non-positive stiffness {} on element {}",
                stiffness,
                element_index
            ));
        }
        assemble_element_elasticity_matrix(output, &geometry, stiffness);
        Ok(())
    }
}
