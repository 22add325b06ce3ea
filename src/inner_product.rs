//! Inner products on spaces of deformation fields.
//!
//! An inner product is represented by a symmetric positive (semi-)definite sparse matrix `A`.
//! Evaluating the inner product of `u` and `v` amounts to computing `vᵀ A u`, and the
//! *Riesz map* takes a dual vector (for example the derivative of a shape functional) to its
//! primal representative by solving `A x = v`.
use crate::assembly::global::{
    apply_homogeneous_dirichlet_bc_csr, apply_homogeneous_dirichlet_bc_csr_with_diagonal,
    apply_homogeneous_dirichlet_bc_rhs, CsrAssembler,
};
use crate::assembly::local::{ElementElasticityAssembler, ElementLaplaceAssembler};
use crate::connectivity::Connectivity;
use crate::error::ConfigurationError;
use crate::mesh::Mesh;
use eyre::eyre;
use fenris_shape_sparse::cg::{CgOutput, ConjugateGradient, JacobiPreconditioner, RelativeResidualCriterion};
use fenris_shape_sparse::factorization::CholeskySolver;
use fenris_shape_sparse::nullspace::OrthonormalBasis;
use fenris_shape_sparse::ops::spmv;
use log::{debug, info};
use nalgebra::allocator::Allocator;
use nalgebra::{DVector, DVectorView, DVectorViewMut, DefaultAllocator, DimName};
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

mod interpolated;
mod nullspace;

pub use interpolated::*;
pub use nullspace::*;

/// Relative residual tolerance of the projected conjugate gradient solver.
const CG_TOLERANCE: f64 = 1e-10;
/// Stiffness of the elasticity inner product on fixed boundaries.
const FIXED_BOUNDARY_STIFFNESS: f64 = 1.0;
/// Stiffness of the elasticity inner product on free boundaries.
const FREE_BOUNDARY_STIFFNESS: f64 = 10.0;

/// The bilinear forms available for nodal inner products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InnerProductKind {
    /// `∫ ∇u : ∇v + u · v`.
    Helmholtz,
    /// `∫ ∇u : ∇v`. Singular without fixed boundaries, with translations as nullspace.
    Laplace,
    /// `∫ μ ε(u) : ε(v)` with a stiffness `μ` that grades from fixed boundaries towards free
    /// boundaries. Singular without fixed boundaries, with rigid motions as nullspace.
    Elasticity,
}

/// Describes how to construct a nodal inner product on a mesh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerProductConfig {
    pub kind: InnerProductKind,
    /// Boundary markers of the parts of the boundary that are not allowed to move.
    #[serde(default)]
    pub fixed_boundaries: Vec<usize>,
}

impl InnerProductConfig {
    pub fn new(kind: InnerProductKind) -> Self {
        Self {
            kind,
            fixed_boundaries: Vec::new(),
        }
    }

    pub fn with_fixed_boundaries(self, fixed_boundaries: Vec<usize>) -> Self {
        Self {
            fixed_boundaries,
            ..self
        }
    }
}

/// An inner product on a space of vectors of fixed dimension.
pub trait InnerProduct: Debug {
    /// The dimension of the vectors the inner product operates on.
    fn dim(&self) -> usize;

    /// Computes the primal representative `out` of the dual vector `v`.
    fn riesz_map(&self, v: DVectorView<f64>, out: DVectorViewMut<f64>) -> eyre::Result<()>;

    /// Evaluates the inner product `vᵀ A u`.
    fn eval(&self, u: DVectorView<f64>, v: DVectorView<f64>) -> f64 {
        assert_eq!(u.len(), self.dim(), "Vector dimension must match inner product dimension.");
        assert_eq!(v.len(), self.dim(), "Vector dimension must match inner product dimension.");
        let mut a_u = DVector::zeros(self.dim());
        spmv(a_u.as_view_mut(), self.matrix(), u);
        v.dot(&a_u)
    }

    /// The matrix `A` representing the inner product.
    fn matrix(&self) -> &CsrMatrix<f64>;
}

/// The assembled matrix of a nodal inner product together with its constraints.
#[derive(Debug, Clone)]
pub struct AssembledInnerProduct {
    pub matrix: CsrMatrix<f64>,
    /// Sorted indices of the vertices subject to homogeneous Dirichlet conditions.
    pub dirichlet_nodes: Vec<usize>,
    /// Orthonormal basis of the nullspace of the matrix, if the matrix is singular.
    pub nullspace: Option<OrthonormalBasis<f64>>,
}

fn resolve_boundaries<D, C>(
    mesh: &Mesh<f64, D, C>,
    fixed_boundaries: &[usize],
) -> Result<(Vec<usize>, Vec<usize>), ConfigurationError>
where
    D: DimName,
    DefaultAllocator: Allocator<f64, D>,
{
    let markers = mesh.boundary_markers();
    if !fixed_boundaries.is_empty() && markers.is_empty() {
        return Err(ConfigurationError::NoBoundaryMarkers);
    }
    for &id in fixed_boundaries {
        if !markers.contains(&id) {
            return Err(ConfigurationError::UnknownBoundaryId {
                id,
                available: markers,
            });
        }
    }
    let free = markers
        .iter()
        .copied()
        .filter(|id| !fixed_boundaries.contains(id))
        .collect();
    let mut fixed = fixed_boundaries.to_vec();
    fixed.sort_unstable();
    fixed.dedup();
    Ok((fixed, free))
}

/// Computes the piecewise linear stiffness of the elasticity inner product.
///
/// The stiffness is harmonic, equal to one on fixed boundaries and to ten on free
/// boundaries. Where a fixed and a free boundary meet, the free value is used.
/// Without any marked boundary the stiffness is one everywhere.
pub fn elasticity_stiffness<D, C>(mesh: &Mesh<f64, D, C>, fixed: &[usize], free: &[usize]) -> eyre::Result<DVector<f64>>
where
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<f64, D>,
{
    let num_vertices = mesh.vertices().len();
    let mut boundary_values = DVector::zeros(num_vertices);
    let mut is_constrained = vec![false; num_vertices];
    for (ids, value) in [(fixed, FIXED_BOUNDARY_STIFFNESS), (free, FREE_BOUNDARY_STIFFNESS)] {
        for v in mesh.vertices_on_boundaries(ids) {
            boundary_values[v] = value;
            is_constrained[v] = true;
        }
    }
    let constrained: Vec<usize> = (0..num_vertices).filter(|&v| is_constrained[v]).collect();
    if constrained.is_empty() {
        return Ok(DVector::repeat(num_vertices, FIXED_BOUNDARY_STIFFNESS));
    }

    // Lift the boundary values into the right-hand side, then solve for the interior values
    let mut stiffness_matrix = CsrAssembler::default().assemble(&ElementLaplaceAssembler::from_mesh(mesh))?;
    let mut rhs = DVector::zeros(num_vertices);
    spmv(rhs.as_view_mut(), &stiffness_matrix, boundary_values.as_view());
    rhs.neg_mut();
    apply_homogeneous_dirichlet_bc_csr(&mut stiffness_matrix, &constrained, 1);
    for &v in &constrained {
        let diagonal = stiffness_matrix
            .get_entry(v, v)
            .map(|entry| entry.into_value())
            .unwrap_or(1.0);
        rhs[v] = diagonal * boundary_values[v];
    }

    let solver = CholeskySolver::factor(&stiffness_matrix)
        .map_err(|err| eyre!("Failed to factor stiffness problem for elasticity inner product: {}", err))?;
    Ok(solver.solve(rhs.as_view()))
}

/// Assembles the matrix of a nodal inner product on the given mesh.
///
/// When boundaries are fixed, homogeneous Dirichlet conditions with a unit diagonal are applied
/// to all vertices on these boundaries. Otherwise, the nullspace of the matrix is computed for the Laplace and
/// elasticity inner products.
pub fn assemble_inner_product_matrix<D, C>(
    mesh: &Mesh<f64, D, C>,
    config: &InnerProductConfig,
) -> eyre::Result<AssembledInnerProduct>
where
    D: DimName,
    C: Connectivity,
    DefaultAllocator: Allocator<f64, D>,
{
    let dim = D::dim();
    if dim != 2 && dim != 3 {
        return Err(ConfigurationError::UnsupportedDimension { dim }.into());
    }
    let (fixed, free) = resolve_boundaries(mesh, &config.fixed_boundaries)?;

    let assembler = CsrAssembler::default();
    let mut matrix = match config.kind {
        InnerProductKind::Helmholtz => assembler.assemble(
            &ElementLaplaceAssembler::from_mesh(mesh)
                .with_solution_dim(dim)
                .with_mass_coefficient(1.0),
        )?,
        InnerProductKind::Laplace => {
            assembler.assemble(&ElementLaplaceAssembler::from_mesh(mesh).with_solution_dim(dim))?
        }
        InnerProductKind::Elasticity => {
            let stiffness = elasticity_stiffness(mesh, &fixed, &free)?;
            assembler.assemble(&ElementElasticityAssembler::new(mesh, stiffness.as_slice()))?
        }
    };

    let dirichlet_nodes = mesh.vertices_on_boundaries(&fixed);
    let nullspace = if fixed.is_empty() {
        let basis = nullspace_vectors(mesh, config.kind);
        (!basis.is_empty()).then(|| OrthonormalBasis::from_vectors(&basis, 1e-12))
    } else {
        // The inner product acts as the identity on the constrained degrees of freedom
        apply_homogeneous_dirichlet_bc_csr_with_diagonal(&mut matrix, &dirichlet_nodes, dim, 1.0);
        None
    };

    debug!(
        "Assembled {:?} inner product matrix: {} x {} with {} nonzeros",
        config.kind,
        matrix.nrows(),
        matrix.ncols(),
        matrix.nnz()
    );

    Ok(AssembledInnerProduct {
        matrix,
        dirichlet_nodes,
        nullspace,
    })
}

#[derive(Debug)]
enum RieszSolver {
    Cholesky(CholeskySolver<f64>),
    ProjectedCg {
        nullspace: OrthonormalBasis<f64>,
        preconditioner: JacobiPreconditioner<f64>,
    },
}

/// A nodal inner product on the continuous piecewise linear vector fields of a mesh.
///
/// The Riesz map uses a sparse Cholesky factorization when the matrix is nonsingular and
/// a conjugate gradient solver projected onto the orthogonal complement of the nullspace
/// otherwise.
#[derive(Debug)]
pub struct FeInnerProduct {
    kind: InnerProductKind,
    matrix: CsrMatrix<f64>,
    dirichlet_nodes: Vec<usize>,
    solution_dim: usize,
    solver: RieszSolver,
}

impl FeInnerProduct {
    pub fn assemble<D, C>(mesh: &Mesh<f64, D, C>, config: &InnerProductConfig) -> eyre::Result<Self>
    where
        D: DimName,
        C: Connectivity,
        DefaultAllocator: Allocator<f64, D>,
    {
        let AssembledInnerProduct {
            matrix,
            dirichlet_nodes,
            nullspace,
        } = assemble_inner_product_matrix(mesh, config)?;

        let solver = match nullspace {
            None => {
                let factorization = CholeskySolver::factor(&matrix)
                    .map_err(|err| eyre!("Failed to factor {:?} inner product matrix: {}", config.kind, err))?;
                RieszSolver::Cholesky(factorization)
            }
            Some(nullspace) => RieszSolver::ProjectedCg {
                preconditioner: JacobiPreconditioner::from_csr(&matrix).with_nullspace(nullspace.clone()),
                nullspace,
            },
        };

        info!(
            "Constructed {:?} inner product of dimension {} ({} Dirichlet nodes, nullspace dimension {})",
            config.kind,
            matrix.nrows(),
            dirichlet_nodes.len(),
            match &solver {
                RieszSolver::Cholesky(_) => 0,
                RieszSolver::ProjectedCg { nullspace, .. } => nullspace.len(),
            }
        );

        Ok(Self {
            kind: config.kind,
            matrix,
            dirichlet_nodes,
            solution_dim: D::dim(),
            solver,
        })
    }

    pub fn kind(&self) -> InnerProductKind {
        self.kind
    }

    /// Sorted indices of the vertices whose displacements are fixed to zero.
    pub fn dirichlet_nodes(&self) -> &[usize] {
        &self.dirichlet_nodes
    }

    pub fn nullspace(&self) -> Option<&OrthonormalBasis<f64>> {
        match &self.solver {
            RieszSolver::Cholesky(_) => None,
            RieszSolver::ProjectedCg { nullspace, .. } => Some(nullspace),
        }
    }
}

impl InnerProduct for FeInnerProduct {
    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn riesz_map(&self, v: DVectorView<f64>, mut out: DVectorViewMut<f64>) -> eyre::Result<()> {
        assert_eq!(v.len(), self.dim(), "Vector dimension must match inner product dimension.");
        assert_eq!(out.len(), self.dim(), "Vector dimension must match inner product dimension.");
        let mut rhs = v.clone_owned();
        match &self.solver {
            RieszSolver::Cholesky(factorization) => {
                apply_homogeneous_dirichlet_bc_rhs(&mut rhs, &self.dirichlet_nodes, self.solution_dim);
                factorization.solve_into(rhs.as_view(), out);
            }
            RieszSolver::ProjectedCg {
                nullspace,
                preconditioner,
            } => {
                nullspace.remove_components(&mut rhs);
                out.fill(0.0);
                let output: CgOutput<f64> = ConjugateGradient::new()
                    .with_operator(&self.matrix)
                    .with_preconditioner(preconditioner)
                    .with_stopping_criterion(RelativeResidualCriterion::new(CG_TOLERANCE))
                    .with_max_iter(10 * self.dim().max(100))
                    .solve_with_guess(&rhs, &mut out)
                    .map_err(|err| eyre!("Riesz map of {:?} inner product failed: {}", self.kind, err))?;
                debug!(
                    "Projected CG for {:?} Riesz map converged in {} iterations",
                    self.kind, output.num_iterations
                );
                nullspace.remove_components(&mut out);
            }
        }
        Ok(())
    }

    fn matrix(&self) -> &CsrMatrix<f64> {
        &self.matrix
    }
}
