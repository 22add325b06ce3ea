use fenris_shape::assembly::global::{
    apply_homogeneous_dirichlet_bc_csr, apply_homogeneous_dirichlet_bc_csr_with_diagonal,
    apply_homogeneous_dirichlet_bc_rhs, CsrAssembler,
};
use fenris_shape::assembly::local::{
    assemble_element_elasticity_matrix, assemble_element_laplace_matrix, ElementElasticityAssembler,
    ElementLaplaceAssembler, SimplexGeometry,
};
use fenris_shape::mesh::procedural::{create_unit_cube_uniform_tet_mesh, create_unit_square_uniform_tri_mesh_2d};
use fenris_shape::space::nodal_coordinates;
use fenris_shape::sparse::ops::spmv;
use matrixcompare::assert_matrix_eq;
use nalgebra::{DMatrix, DVector, Point2, Point3};
use nalgebra_sparse::CsrMatrix;
use util::{max_asymmetry, pseudo_random_vector};

fn reference_triangle() -> SimplexGeometry<f64> {
    SimplexGeometry::from_vertices(&[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)]).unwrap()
}

fn reference_tet() -> SimplexGeometry<f64> {
    SimplexGeometry::from_vertices(&[
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
    ])
    .unwrap()
}

fn csr_mul(matrix: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let mut y = DVector::zeros(matrix.nrows());
    spmv(y.as_view_mut(), matrix, x.as_view());
    y
}

/// Interleaved nodal values of the rigid motions of `points` with the given dimension.
fn rigid_motions(coords: &DVector<f64>, dim: usize) -> Vec<DVector<f64>> {
    let n = coords.len() / dim;
    let mut motions = Vec::new();
    for k in 0..dim {
        motions.push(DVector::from_fn(dim * n, |i, _| if i % dim == k { 1.0 } else { 0.0 }));
    }
    let x = |v: usize, k: usize| coords[dim * v + k];
    if dim == 2 {
        motions.push(DVector::from_fn(2 * n, |i, _| {
            let (v, k) = (i / 2, i % 2);
            [-x(v, 1), x(v, 0)][k]
        }));
    } else {
        motions.push(DVector::from_fn(3 * n, |i, _| {
            let (v, k) = (i / 3, i % 3);
            [-x(v, 1), x(v, 0), 0.0][k]
        }));
        motions.push(DVector::from_fn(3 * n, |i, _| {
            let (v, k) = (i / 3, i % 3);
            [-x(v, 2), 0.0, x(v, 0)][k]
        }));
        motions.push(DVector::from_fn(3 * n, |i, _| {
            let (v, k) = (i / 3, i % 3);
            [0.0, -x(v, 2), x(v, 1)][k]
        }));
    }
    motions
}

#[test]
fn simplex_geometry_of_reference_elements() {
    let triangle = reference_triangle();
    assert_eq!(triangle.dim(), 2);
    assert_eq!(triangle.num_vertices(), 3);
    assert!((triangle.volume() - 0.5).abs() < 1e-15);
    let expected_gradients = [[-1.0, -1.0], [1.0, 0.0], [0.0, 1.0]];
    for (a, expected) in expected_gradients.iter().enumerate() {
        let expected = DVector::from_column_slice(expected);
        assert_matrix_eq!(triangle.gradient(a).clone_owned(), expected, comp = abs, tol = 1e-15);
    }
    assert!((triangle.mass_entry(0, 0) - 1.0 / 12.0).abs() < 1e-15);
    assert!((triangle.mass_entry(0, 1) - 1.0 / 24.0).abs() < 1e-15);

    let tet = reference_tet();
    assert_eq!(tet.dim(), 3);
    assert_eq!(tet.num_vertices(), 4);
    assert!((tet.volume() - 1.0 / 6.0).abs() < 1e-15);
    // Barycentric gradients sum to zero
    let sum = (0..4).fold(DVector::zeros(3), |acc, a| acc + tet.gradient(a));
    assert!(sum.norm() < 1e-15);
}

#[test]
fn simplex_geometry_is_independent_of_orientation() {
    let vertices = [Point2::<f64>::new(0.0, 0.0), Point2::new(0.0, 1.0), Point2::new(1.0, 0.0)];
    let flipped = SimplexGeometry::from_vertices(&vertices).unwrap();
    assert!((flipped.volume() - 0.5).abs() < 1e-15);
    assert_matrix_eq!(
        flipped.gradient(1).clone_owned(),
        DVector::from_column_slice(&[0.0, 1.0]),
        comp = abs,
        tol = 1e-15
    );
}

#[test]
fn simplex_geometry_rejects_invalid_simplices() {
    let degenerate =
        SimplexGeometry::from_vertices(&[Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), Point2::new(2.0, 2.0)]);
    assert!(degenerate.is_err());

    let too_few = SimplexGeometry::from_vertices(&[Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)]);
    assert!(too_few.is_err());
}

#[test]
fn element_laplace_matrix_of_reference_triangle() {
    let geometry = reference_triangle();
    let mut stiffness = DMatrix::zeros(3, 3);
    assemble_element_laplace_matrix(stiffness.as_view_mut(), &geometry, 1, 0.0);

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
        1.0, -0.5, -0.5,
        -0.5, 0.5, 0.0,
        -0.5, 0.0, 0.5,
    ]);
    assert_matrix_eq!(stiffness, expected, comp = abs, tol = 1e-15);

    // The mass contribution integrates the constant function to the volume
    let mut helmholtz = DMatrix::zeros(3, 3);
    assemble_element_laplace_matrix(helmholtz.as_view_mut(), &geometry, 1, 1.0);
    let mass = &helmholtz - &stiffness;
    assert!((mass.sum() - 0.5).abs() < 1e-15);
    assert_matrix_eq!(mass, mass.transpose(), comp = abs, tol = 1e-15);
}

#[test]
fn element_laplace_matrix_decouples_components() {
    let geometry = reference_tet();
    let mut scalar = DMatrix::zeros(4, 4);
    assemble_element_laplace_matrix(scalar.as_view_mut(), &geometry, 1, 2.0);
    let mut vector = DMatrix::zeros(12, 12);
    assemble_element_laplace_matrix(vector.as_view_mut(), &geometry, 3, 2.0);

    for a in 0..4 {
        for b in 0..4 {
            for i in 0..3 {
                for j in 0..3 {
                    let expected = if i == j { scalar[(a, b)] } else { 0.0 };
                    assert_eq!(vector[(3 * a + i, 3 * b + j)], expected);
                }
            }
        }
    }
    // Rows of the stiffness part sum to zero
    let mut stiffness = DMatrix::zeros(4, 4);
    assemble_element_laplace_matrix(stiffness.as_view_mut(), &geometry, 1, 0.0);
    for row in stiffness.row_iter() {
        assert!(row.sum().abs() < 1e-15);
    }
}

#[test]
fn element_elasticity_matrix_annihilates_rigid_motions() {
    // Triangle
    {
        let vertices = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
        let geometry = SimplexGeometry::from_vertices(&vertices).unwrap();
        let mut matrix = DMatrix::zeros(6, 6);
        assemble_element_elasticity_matrix(matrix.as_view_mut(), &geometry, 2.0);
        assert_matrix_eq!(matrix, matrix.transpose(), comp = abs, tol = 1e-14);

        let coords = DVector::from_column_slice(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        for motion in rigid_motions(&coords, 2) {
            assert!((&matrix * motion).norm() < 1e-14);
        }

        // u = (x, 0) has strain diag(1, 0), so the energy is stiffness * volume
        let stretch = DVector::from_column_slice(&[0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        assert!((stretch.dot(&(&matrix * &stretch)) - 1.0).abs() < 1e-14);
    }

    // Tetrahedron
    {
        let geometry = reference_tet();
        let mut matrix = DMatrix::zeros(12, 12);
        assemble_element_elasticity_matrix(matrix.as_view_mut(), &geometry, 1.0);
        assert_matrix_eq!(matrix, matrix.transpose(), comp = abs, tol = 1e-14);

        #[rustfmt::skip]
        let coords = DVector::from_column_slice(&[
            0.0, 0.0, 0.0,
            1.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            0.0, 0.0, 1.0,
        ]);
        let motions = rigid_motions(&coords, 3);
        assert_eq!(motions.len(), 6);
        for motion in motions {
            assert!((&matrix * motion).norm() < 1e-14);
        }

        // The six rigid motions span the whole nullspace
        let eigenvalues = matrix.symmetric_eigenvalues();
        let num_zero = eigenvalues.iter().filter(|&&lambda| lambda.abs() < 1e-12).count();
        assert_eq!(num_zero, 6);
    }
}

#[test]
fn csr_assembler_pattern_of_unit_square() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1);
    let assembler = CsrAssembler::<f64>::default();

    // Vertices 1 and 2 do not share a triangle
    let pattern = assembler.assemble_pattern(&mesh);
    assert_eq!(pattern.major_dim(), 4);
    assert_eq!(pattern.nnz(), 14);
    assert_eq!(pattern.lane(0), &[0, 1, 2, 3]);
    assert_eq!(pattern.lane(1), &[0, 1, 3]);
    assert_eq!(pattern.lane(2), &[0, 2, 3]);

    // Vector-valued problems have dense blocks
    let laplace = ElementLaplaceAssembler::from_mesh(&mesh).with_solution_dim(2);
    let pattern = assembler.assemble_pattern(&laplace);
    assert_eq!(pattern.major_dim(), 8);
    assert_eq!(pattern.nnz(), 4 * 14);
    assert_eq!(pattern.lane(2), &[0, 1, 2, 3, 6, 7]);
}

#[test]
fn assembled_laplace_matrix_properties() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(3);
    let n = mesh.vertices().len();
    let assembler = CsrAssembler::default();

    let stiffness = assembler.assemble(&ElementLaplaceAssembler::from_mesh(&mesh)).unwrap();
    assert_eq!(stiffness.nrows(), n);
    assert!(max_asymmetry(&stiffness) < 1e-14);
    assert!(csr_mul(&stiffness, &DVector::repeat(n, 1.0)).norm() < 1e-13);

    let helmholtz = assembler
        .assemble(&ElementLaplaceAssembler::from_mesh(&mesh).with_mass_coefficient(1.0))
        .unwrap();
    let ones = DVector::repeat(n, 1.0);
    assert!((ones.dot(&csr_mul(&helmholtz, &ones)) - 1.0).abs() < 1e-13);

    // The Dirichlet energy of u = x is the area of the domain
    let x = DVector::from_iterator(n, mesh.vertices().iter().map(|v| v.x));
    assert!((x.dot(&csr_mul(&stiffness, &x)) - 1.0).abs() < 1e-13);

    // Assembling into an existing matrix accumulates
    let mut accumulated = stiffness.clone();
    assembler
        .assemble_into_csr(&mut accumulated, &ElementLaplaceAssembler::from_mesh(&mesh))
        .unwrap();
    assert_matrix_eq!(DMatrix::from(&accumulated), 2.0 * DMatrix::from(&stiffness), comp = abs, tol = 1e-14);
}

#[test]
fn assembled_elasticity_matrix_annihilates_rigid_motions() {
    {
        let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(3);
        let n = mesh.vertices().len();
        let stiffness = pseudo_random_vector(n, 3).map(|x| 2.0 + x);
        let matrix = CsrAssembler::default()
            .assemble(&ElementElasticityAssembler::new(&mesh, stiffness.as_slice()))
            .unwrap();
        assert_eq!(matrix.nrows(), 2 * n);
        assert!(max_asymmetry(&matrix) < 1e-13);
        for motion in rigid_motions(&nodal_coordinates(&mesh), 2) {
            assert!(csr_mul(&matrix, &motion).norm() < 1e-12);
        }
    }

    {
        let mesh = create_unit_cube_uniform_tet_mesh::<f64>(2);
        let n = mesh.vertices().len();
        let stiffness = vec![1.0; n];
        let matrix = CsrAssembler::default()
            .assemble(&ElementElasticityAssembler::new(&mesh, &stiffness))
            .unwrap();
        assert_eq!(matrix.nrows(), 3 * n);
        assert!(max_asymmetry(&matrix) < 1e-13);
        for motion in rigid_motions(&nodal_coordinates(&mesh), 3) {
            assert!(csr_mul(&matrix, &motion).norm() < 1e-12);
        }
    }
}

#[test]
fn elasticity_assembler_rejects_non_positive_stiffness() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1);
    let stiffness = vec![1.0, -2.0, 1.0, -2.0];
    let result = CsrAssembler::default().assemble(&ElementElasticityAssembler::new(&mesh, &stiffness));
    assert!(result.is_err());
}

#[test]
#[should_panic]
fn elasticity_assembler_requires_one_stiffness_per_vertex() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1);
    let stiffness = vec![1.0; 3];
    let _ = ElementElasticityAssembler::new(&mesh, &stiffness);
}

#[test]
fn dirichlet_conditions_keep_matrix_symmetric() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(2);
    let original = CsrAssembler::default()
        .assemble(
            &ElementLaplaceAssembler::from_mesh(&mesh)
                .with_solution_dim(2)
                .with_mass_coefficient(1.0),
        )
        .unwrap();
    let scale = original.get_entry(0, 0).unwrap().into_value();

    let mut matrix = original.clone();
    let nodes = [0, 4];
    apply_homogeneous_dirichlet_bc_csr(&mut matrix, &nodes, 2);
    assert!(max_asymmetry(&matrix) < 1e-14);

    let dense = DMatrix::from(&matrix);
    let original_dense = DMatrix::from(&original);
    let constrained = [0, 1, 8, 9];
    for i in 0..dense.nrows() {
        for j in 0..dense.ncols() {
            let expected = if constrained.contains(&i) || constrained.contains(&j) {
                if i == j {
                    scale
                } else {
                    0.0
                }
            } else {
                original_dense[(i, j)]
            };
            assert_eq!(dense[(i, j)], expected);
        }
    }

    let mut rhs = DVector::repeat(18, 1.0);
    apply_homogeneous_dirichlet_bc_rhs(&mut rhs, &nodes, 2);
    for (i, &value) in rhs.iter().enumerate() {
        let expected = if constrained.contains(&i) { 0.0 } else { 1.0 };
        assert_eq!(value, expected);
    }
}

#[test]
fn dirichlet_conditions_with_prescribed_diagonal() {
    let mesh = create_unit_cube_uniform_tet_mesh::<f64>(1);
    let original = CsrAssembler::default()
        .assemble(
            &ElementLaplaceAssembler::from_mesh(&mesh)
                .with_solution_dim(3)
                .with_mass_coefficient(1.0),
        )
        .unwrap();
    // The representative scale of this matrix is not one
    assert_ne!(original.get_entry(0, 0).unwrap().into_value(), 1.0);

    let mut matrix = original.clone();
    let nodes = [0, 7];
    apply_homogeneous_dirichlet_bc_csr_with_diagonal(&mut matrix, &nodes, 3, 1.0);
    assert!(max_asymmetry(&matrix) < 1e-14);

    let dense = DMatrix::from(&matrix);
    let original_dense = DMatrix::from(&original);
    let constrained = [0, 1, 2, 21, 22, 23];
    for i in 0..dense.nrows() {
        for j in 0..dense.ncols() {
            let expected = if constrained.contains(&i) || constrained.contains(&j) {
                if i == j {
                    1.0
                } else {
                    0.0
                }
            } else {
                original_dense[(i, j)]
            };
            assert_eq!(dense[(i, j)], expected);
        }
    }
}
