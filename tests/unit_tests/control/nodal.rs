use crate::unit_tests::control::{interpolate, restrict};
use fenris_shape::control::{ControlSpace, ControlVector, FeControlSpace};
use fenris_shape::inner_product::{InnerProductConfig, InnerProductKind};
use fenris_shape::mesh::procedural::{create_unit_cube_uniform_tet_mesh, create_unit_square_uniform_tri_mesh_2d};
use fenris_shape::space::nodal_coordinates;
use matrixcompare::assert_matrix_eq;
use nalgebra::{DVector, Point2, Vector2, U2};
use std::rc::Rc;
use util::pseudo_random_vector;

macro_rules! test_zero_control_keeps_reference_domain {
    ($name:ident, $mesh:expr, $dim:expr) => {
        paste::item! {
            #[test]
            fn [<zero_control_keeps_reference_domain_ $name>]() {
                let mesh = $mesh;
                let num_vertices = mesh.vertices().len();
                let config = InnerProductConfig::new(InnerProductKind::Helmholtz);
                let concrete = Rc::new(FeControlSpace::new(mesh.clone(), &config).unwrap());
                let space: Rc<dyn ControlSpace> = concrete.clone();

                assert_eq!(space.dimension(), $dim * num_vertices);
                assert_eq!(space.nodal_dimension(), space.dimension());
                assert_eq!(space.geometric_dim(), $dim);
                assert_eq!(space.nodal_view_size(), Some(num_vertices));
                assert_eq!(space.get_zero_vec(), DVector::zeros($dim * num_vertices));

                let q = ControlVector::new(space.clone());
                assert_eq!(q.data(), &DVector::zeros($dim * num_vertices));
                assert_eq!(interpolate(space.as_ref(), q.data()), DVector::zeros($dim * num_vertices));

                space.update_domain(&q);
                assert_eq!(space.deformation(), space.identity().clone_owned());
                assert_eq!(space.identity().clone_owned(), nodal_coordinates(&mesh));
                assert_eq!(*concrete.moved_mesh(), mesh);
                assert_eq!(concrete.reference_mesh(), &mesh);
            }
        }
    };
}

test_zero_control_keeps_reference_domain!(dim2, create_unit_square_uniform_tri_mesh_2d::<f64>(3), 2);
test_zero_control_keeps_reference_domain!(dim3, create_unit_cube_uniform_tet_mesh::<f64>(2), 3);

#[test]
fn restrict_and_interpolate_are_copies() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(2);
    let config = InnerProductConfig::new(InnerProductKind::Laplace);
    let space = FeControlSpace::new(mesh, &config).unwrap();

    let x = pseudo_random_vector(space.dimension(), 3);
    assert_eq!(interpolate(&space, &x), x);
    assert_eq!(restrict(&space, &x), x);
}

#[test]
fn update_domain_translates_mesh() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(2);
    let config = InnerProductConfig::new(InnerProductKind::Helmholtz);
    let concrete = Rc::new(FeControlSpace::new(mesh.clone(), &config).unwrap());
    let space: Rc<dyn ControlSpace> = concrete.clone();

    let mut q = ControlVector::new(space.clone());
    q.fe_view_mut::<U2>()
        .unwrap()
        .set_from_fn(|_| Vector2::new(1.0, -2.0));
    space.update_domain(&q);

    let moved = concrete.moved_mesh();
    for (moved_vertex, vertex) in moved.vertices().iter().zip(mesh.vertices()) {
        assert_eq!(moved_vertex, &(vertex + Vector2::new(1.0, -2.0)));
    }
    assert_eq!(moved.connectivity(), mesh.connectivity());
    assert_eq!(moved.boundary_facets(), mesh.boundary_facets());
    assert_eq!(moved.vertices()[0], Point2::new(1.0, -2.0));

    let expected_deformation = nodal_coordinates(&mesh) + q.data();
    assert_matrix_eq!(space.deformation(), expected_deformation);
    // The reference domain is unaffected
    assert_eq!(space.identity().clone_owned(), nodal_coordinates(&mesh));
    assert_eq!(concrete.reference_mesh(), &mesh);
}

#[test]
fn update_domain_does_not_accumulate() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(2);
    let config = InnerProductConfig::new(InnerProductKind::Helmholtz);
    let concrete = Rc::new(FeControlSpace::new(mesh.clone(), &config).unwrap());
    let space: Rc<dyn ControlSpace> = concrete.clone();

    let q = ControlVector::from_data(space.clone(), pseudo_random_vector(space.dimension(), 11));
    space.update_domain(&q);
    space.update_domain(&q);
    assert_matrix_eq!(space.deformation(), nodal_coordinates(&mesh) + q.data(), comp = abs, tol = 1e-15);

    space.update_domain(&ControlVector::new(space.clone()));
    assert_eq!(*concrete.moved_mesh(), mesh);
}

#[test]
#[should_panic]
fn update_domain_rejects_vector_from_other_space() {
    let config = InnerProductConfig::new(InnerProductKind::Helmholtz);
    let space: Rc<dyn ControlSpace> =
        Rc::new(FeControlSpace::new(create_unit_square_uniform_tri_mesh_2d::<f64>(1), &config).unwrap());
    let other: Rc<dyn ControlSpace> =
        Rc::new(FeControlSpace::new(create_unit_square_uniform_tri_mesh_2d::<f64>(1), &config).unwrap());
    space.update_domain(&ControlVector::new(other));
}

#[test]
fn construction_propagates_inner_product_errors() {
    let config = InnerProductConfig::new(InnerProductKind::Laplace).with_fixed_boundaries(vec![5]);
    let result = FeControlSpace::new(create_unit_square_uniform_tri_mesh_2d::<f64>(1), &config);
    assert!(result.is_err());
}
