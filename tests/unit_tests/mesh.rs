use fenris_shape::connectivity::{
    Connectivity, Segment2d2Connectivity, Tet4Connectivity, Tri3d2Connectivity, Tri3d3Connectivity,
};
use fenris_shape::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use fenris_shape::mesh::{MarkedFacet, TriangleMesh2d};
use nalgebra::{Point2, Point3, Vector2};


#[test]
fn tri_find_boundary_faces() {
    // Single square split into two triangles
    {
        let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1);
        let boundary_faces = mesh.find_boundary_faces();
        assert_eq!(boundary_faces.len(), 4);

        let mut cells: Vec<_> = boundary_faces.iter().map(|(_, cell, _)| *cell).collect();
        cells.sort_unstable();
        assert_eq!(cells, [0, 0, 1, 1]);

        // The diagonal is shared by both triangles
        assert!(boundary_faces
            .iter()
            .all(|(face, _, _)| face != &Segment2d2Connectivity([0, 3]) && face != &Segment2d2Connectivity([3, 0])));
    }

    // 2x2 squares
    {
        let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(2);
        assert_eq!(mesh.find_boundary_faces().len(), 8);
        assert_eq!(mesh.find_boundary_vertices(), vec![0, 1, 2, 3, 5, 6, 7, 8]);
    }
}

#[test]
fn unit_square_boundary_markers() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1);
    assert_eq!(mesh.boundary_facets().len(), 4);
    assert_eq!(mesh.boundary_markers(), vec![1, 2, 3, 4]);

    assert_eq!(mesh.vertices_on_boundaries(&[1]), vec![0, 2]);
    assert_eq!(mesh.vertices_on_boundaries(&[2]), vec![1, 3]);
    assert_eq!(mesh.vertices_on_boundaries(&[3]), vec![0, 1]);
    assert_eq!(mesh.vertices_on_boundaries(&[4]), vec![2, 3]);
    assert_eq!(mesh.vertices_on_boundaries(&[1, 3]), vec![0, 1, 2]);
    assert!(mesh.vertices_on_boundaries(&[7]).is_empty());
    assert!(mesh.vertices_on_boundaries(&[]).is_empty());
}

#[test]
fn mark_boundary_replaces_previous_markers() {
    let mut mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(2);
    mesh.mark_boundary(|points| points.iter().all(|p| p.x == 0.0).then(|| 7));

    assert_eq!(mesh.boundary_markers(), vec![7]);
    assert_eq!(mesh.boundary_facets().len(), 2);
    assert_eq!(mesh.vertices_on_boundaries(&[7]), vec![0, 3, 6]);
    assert!(mesh.vertices_on_boundaries(&[1]).is_empty());
}

#[test]
fn mesh_without_facets_has_no_markers() {
    let vertices = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
    let mesh = TriangleMesh2d::from_vertices_and_connectivity(vertices, vec![Tri3d2Connectivity([0, 1, 2])]);
    assert!(mesh.boundary_markers().is_empty());
    assert!(mesh.vertices_on_boundaries(&[1]).is_empty());

    let mesh = mesh.with_boundary_facets(vec![MarkedFacet::new(vec![1, 2], 5)]);
    assert_eq!(mesh.boundary_markers(), vec![5]);
    assert_eq!(mesh.vertices_on_boundaries(&[5]), vec![1, 2]);
}

#[test]
fn set_vertices_from_interleaved_moves_all_vertices() {
    let mut mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1);
    let values = [0.0, 0.0, 2.0, 0.0, 0.0, 3.0, 2.0, 3.5];
    mesh.set_vertices_from_interleaved(&values);

    assert_eq!(mesh.vertices()[0], Point2::new(0.0, 0.0));
    assert_eq!(mesh.vertices()[1], Point2::new(2.0, 0.0));
    assert_eq!(mesh.vertices()[2], Point2::new(0.0, 3.0));
    assert_eq!(mesh.vertices()[3], Point2::new(2.0, 3.5));
    // Topology and markers are left untouched
    assert_eq!(mesh.connectivity().len(), 2);
    assert_eq!(mesh.boundary_markers(), vec![1, 2, 3, 4]);
}

#[test]
#[should_panic]
fn set_vertices_from_interleaved_rejects_wrong_length() {
    let mut mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1);
    mesh.set_vertices_from_interleaved(&[0.0; 7]);
}

#[test]
fn translate_and_transform_vertices() {
    let mut mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(1);
    mesh.translate(&Vector2::new(1.0, -1.0));
    assert_eq!(mesh.vertices()[0], Point2::new(1.0, -1.0));
    assert_eq!(mesh.vertices()[3], Point2::new(2.0, 0.0));

    mesh.transform_vertices(|p| p.y *= 2.0);
    assert_eq!(mesh.vertices()[0], Point2::new(1.0, -2.0));
    assert_eq!(mesh.vertices()[3], Point2::new(2.0, 0.0));
    assert_eq!(mesh.boundary_markers(), vec![1, 2, 3, 4]);
}

#[test]
fn mesh_serde_json_round_trip() {
    let mesh = create_unit_square_uniform_tri_mesh_2d::<f64>(2);
    let json = serde_json::to_string(&mesh).unwrap();
    let deserialized: TriangleMesh2d<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialized, mesh);
}

#[test]
fn triangle_facets_are_opposite_edges() {
    let cell = Tri3d2Connectivity([4, 7, 9]);
    assert_eq!(cell.num_faces(), 3);
    assert_eq!(cell.get_face_connectivity(0), Some(Segment2d2Connectivity([7, 9])));
    assert_eq!(cell.get_face_connectivity(1), Some(Segment2d2Connectivity([9, 4])));
    assert_eq!(cell.get_face_connectivity(2), Some(Segment2d2Connectivity([4, 7])));
    assert_eq!(cell.get_face_connectivity(3), None);

    let segment = Segment2d2Connectivity([7, 9]);
    assert_eq!(segment.num_faces(), 0);
    assert_eq!(segment.get_face_connectivity(0), None);
}

#[test]
fn tetrahedron_facets_point_outwards() {
    let vertices = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
    ];
    let cell = Tet4Connectivity([0, 1, 2, 3]);
    assert_eq!(cell.num_faces(), 4);
    assert_eq!(cell.get_face_connectivity(4), None);

    for i in 0..4 {
        let face = cell.get_face_connectivity(i).unwrap();
        assert!(!face.vertex_indices().contains(&i));

        let Tri3d3Connectivity([a, b, c]) = face;
        let normal = (vertices[b] - vertices[a]).cross(&(vertices[c] - vertices[a]));
        let outward = vertices[a] - vertices[i];
        assert!(normal.dot(&outward) > 0.0, "facet {} is oriented inwards", i);
    }
}
