use fenris_shape::control::{
    BsplineConfig, BsplineControlSpace, ControlSpace, ControlVector, FeControlSpace, OptimizationVector,
};
use fenris_shape::inner_product::{InnerProductConfig, InnerProductKind};
use fenris_shape::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use matrixcompare::assert_matrix_eq;
use nalgebra::{DVector, Vector2, U2, U3};
use std::rc::Rc;
use util::pseudo_random_vector;

fn nodal_space(kind: InnerProductKind) -> Rc<dyn ControlSpace> {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(2);
    let config = InnerProductConfig::new(kind);
    Rc::new(FeControlSpace::new(mesh, &config).unwrap())
}

fn random_vector(space: &Rc<dyn ControlSpace>, seed: usize) -> ControlVector {
    ControlVector::from_data(space.clone(), pseudo_random_vector(space.dimension(), seed))
}

#[test]
fn zeroed_clone_is_independent_zero_vector() {
    let space = nodal_space(InnerProductKind::Helmholtz);
    let mut v = random_vector(&space, 1);
    let original = v.data().clone();

    let mut w = v.zeroed_clone();
    assert!(w.same_space(&v));
    assert_eq!(w.dimension(), v.dimension());
    assert_eq!(w.data(), &DVector::zeros(18));

    // Modifying one vector leaves the other unchanged
    w.data_mut().fill(3.0);
    assert_eq!(v.data(), &original);
    v.scale(0.0);
    assert_eq!(w.data(), &DVector::repeat(18, 3.0));
}

#[test]
fn arithmetic_operations() {
    let space = nodal_space(InnerProductKind::Helmholtz);
    let x = random_vector(&space, 1);
    let y = random_vector(&space, 2);

    let mut v = x.zeroed_clone();
    v.set(&x);
    assert_eq!(v.data(), x.data());

    v.plus(&y);
    assert_eq!(v.data(), &(x.data() + y.data()));

    v.scale(-2.0);
    assert_eq!(v.data(), &((x.data() + y.data()) * -2.0));

    let mut v = x.zeroed_clone();
    v.set(&x);
    v.axpy(0.5, &y);
    assert_matrix_eq!(v.data().clone(), x.data() + y.data() * 0.5, comp = abs, tol = 1e-15);

    assert_eq!(v.dimension(), 18);
    assert_eq!(OptimizationVector::dimension(&v), space.dimension());
}

#[test]
fn dot_uses_inner_product_of_space() {
    for kind in [InnerProductKind::Helmholtz, InnerProductKind::Laplace, InnerProductKind::Elasticity] {
        let space = nodal_space(kind);
        let x = random_vector(&space, 4);
        let y = random_vector(&space, 5);

        let expected = space
            .inner_product()
            .eval(x.data().as_view(), y.data().as_view());
        assert_eq!(x.dot(&y), expected);
        assert!((x.dot(&y) - y.dot(&x)).abs() <= 1e-12 * expected.abs().max(1.0));
        assert!(x.dot(&x) >= 0.0);
    }
}

#[test]
#[should_panic(expected = "Cannot add control vectors from different control spaces.")]
fn plus_rejects_vectors_from_different_spaces() {
    // Identically configured spaces are still different spaces
    let space = nodal_space(InnerProductKind::Helmholtz);
    let other = nodal_space(InnerProductKind::Helmholtz);
    let mut v = ControlVector::new(space);
    v.plus(&ControlVector::new(other));
}

#[test]
#[should_panic(expected = "different control spaces")]
fn dot_rejects_vectors_from_different_spaces() {
    let v = ControlVector::new(nodal_space(InnerProductKind::Helmholtz));
    let w = ControlVector::new(nodal_space(InnerProductKind::Helmholtz));
    v.dot(&w);
}

#[test]
#[should_panic(expected = "different control spaces")]
fn axpy_rejects_vectors_from_different_spaces() {
    let mut v = ControlVector::new(nodal_space(InnerProductKind::Helmholtz));
    let w = ControlVector::new(nodal_space(InnerProductKind::Helmholtz));
    v.axpy(1.0, &w);
}

#[test]
#[should_panic(expected = "different control spaces")]
fn set_rejects_vectors_from_different_spaces() {
    let mut v = ControlVector::new(nodal_space(InnerProductKind::Helmholtz));
    let w = ControlVector::new(nodal_space(InnerProductKind::Helmholtz));
    v.set(&w);
}

#[test]
#[should_panic]
fn from_data_rejects_wrong_length() {
    let space = nodal_space(InnerProductKind::Helmholtz);
    ControlVector::from_data(space, DVector::zeros(17));
}

#[test]
fn display_lists_values() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1);
    let config = InnerProductConfig::new(InnerProductKind::Helmholtz);
    let space: Rc<dyn ControlSpace> = Rc::new(FeControlSpace::new(mesh, &config).unwrap());
    let data = DVector::from_column_slice(&[1.0, -0.5, 0.0, 2.25, 0.0, 0.0, 0.0, 3.0]);
    let v = ControlVector::from_data(space, data);
    assert_eq!(v.to_string(), "[1 -0.5 0 2.25 0 0 0 3]");
}

#[test]
fn fe_view_of_nodal_control_vector() {
    let space = nodal_space(InnerProductKind::Helmholtz);
    let mut v = ControlVector::new(space);

    {
        let mut view = v.fe_view_mut::<U2>().unwrap();
        assert_eq!(view.num_nodes(), 9);
        view.set_node_value(4, &Vector2::new(0.25, -1.0));
    }
    assert_eq!(v.data()[8], 0.25);
    assert_eq!(v.data()[9], -1.0);

    let view = v.fe_view::<U2>().unwrap();
    assert_eq!(view.num_nodes(), 9);
    assert_eq!(view.node_value(4), Vector2::new(0.25, -1.0));
    assert_eq!(view.node_value(0), Vector2::zeros());

    // The geometric dimension must match
    assert!(v.fe_view::<U3>().is_none());
    assert!(v.fe_view_mut::<U3>().is_none());
}

#[test]
fn bspline_control_vector_has_no_fe_view() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(4);
    let config = InnerProductConfig::new(InnerProductKind::Helmholtz);
    let bspline = BsplineConfig::new(vec![(0.0, 1.0), (0.0, 1.0)], vec![2, 2], vec![1, 1]);
    let space: Rc<dyn ControlSpace> = Rc::new(BsplineControlSpace::new(mesh, &config, &bspline).unwrap());
    let mut v = ControlVector::new(space);
    assert!(v.fe_view::<U2>().is_none());
    assert!(v.fe_view_mut::<U2>().is_none());
}

#[test]
fn riesz_map_solves_inner_product_system() {
    let space = nodal_space(InnerProductKind::Helmholtz);
    let v = random_vector(&space, 7);
    let x = v.riesz_map().unwrap();
    assert!(x.same_space(&v));

    let a = space.inner_product().matrix();
    let mut ax = DVector::zeros(x.dimension());
    fenris_shape::sparse::ops::spmv(ax.as_view_mut(), a, x.data().as_view());
    assert_matrix_eq!(ax, v.data().clone(), comp = abs, tol = 1e-10);

    // The trait method writes into a provided vector
    let mut out = v.zeroed_clone();
    space.riesz_map(&v, &mut out).unwrap();
    assert_matrix_eq!(out.data().clone(), x.data().clone(), comp = abs, tol = 1e-14);
}

#[test]
#[should_panic(expected = "Riesz map requires vectors of the same control space.")]
fn riesz_map_rejects_vector_from_other_space() {
    let space = nodal_space(InnerProductKind::Helmholtz);
    let other = nodal_space(InnerProductKind::Helmholtz);
    let v = ControlVector::new(other);
    let mut out = ControlVector::new(space.clone());
    let _ = space.riesz_map(&v, &mut out);
}
