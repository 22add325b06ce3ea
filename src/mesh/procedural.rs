//! Basic procedural mesh generation routines.
//!
//! The generated meshes carry boundary markers following the usual convention for
//! axis-aligned utility meshes: `1` for `x = min`, `2` for `x = max`, `3` for `y = min`,
//! `4` for `y = max` and, in three dimensions, `5` for `z = min` and `6` for `z = max`.
use crate::connectivity::{Tet4Connectivity, Tri3d2Connectivity};
use crate::mesh::{Tet4Mesh, TriangleMesh2d};
use nalgebra::allocator::Allocator;
use nalgebra::{DefaultAllocator, DimName, OPoint, Point2, Point3, RealField, Vector2, Vector3};
use numeric_literals::replace_float_literals;

/// Coordinate of grid line `i` out of `n` cells on `[min, max]`.
///
/// The last grid line coincides exactly with `max`.
fn grid_coordinate<T: RealField + Copy>(min: T, max: T, i: usize, n: usize) -> T {
    if i == n {
        max
    } else {
        let i_as_t = T::from_usize(i).expect("Must be able to fit usize in T");
        let n_as_t = T::from_usize(n).expect("Must be able to fit usize in T");
        min + (max - min) * i_as_t / n_as_t
    }
}

/// Returns the marker of the axis-aligned box face that contains all the given points.
#[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
fn box_face_marker<T, D>(points: &[OPoint<T, D>], min: &[T], max: &[T]) -> Option<usize>
where
    T: RealField + Copy,
    D: DimName,
    DefaultAllocator: Allocator<T, D>,
{
    for axis in 0..D::dim() {
        let tol = 1e-10 * (max[axis] - min[axis]);
        let on_plane = |value: T| points.iter().all(|p| (p[axis] - value).abs() <= tol);
        if on_plane(min[axis]) {
            return Some(2 * axis + 1);
        }
        if on_plane(max[axis]) {
            return Some(2 * axis + 2);
        }
    }
    None
}

/// Generates a uniform triangle mesh of the rectangle `[min.x, max.x] × [min.y, max.y]` with
/// `cells.x × cells.y` rectangular cells, each split into two triangles.
///
/// # Panics
///
/// Panics if the number of cells in any direction is zero, or if the rectangle is degenerate.
pub fn create_rectangular_uniform_tri_mesh_2d<T>(
    min: &Vector2<T>,
    max: &Vector2<T>,
    cells: [usize; 2],
) -> TriangleMesh2d<T>
where
    T: RealField + Copy,
{
    let [nx, ny] = cells;
    assert!(nx > 0 && ny > 0, "Number of cells must be positive.");
    assert!(min.x < max.x && min.y < max.y, "Rectangle must not be degenerate.");

    let to_global_vertex_index = |i, j| (nx + 1) * j + i;

    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            vertices.push(Point2::new(
                grid_coordinate(min.x, max.x, i, nx),
                grid_coordinate(min.y, max.y, j, ny),
            ));
        }
    }

    let mut cells = Vec::with_capacity(2 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let v00 = to_global_vertex_index(i, j);
            let v10 = to_global_vertex_index(i + 1, j);
            let v11 = to_global_vertex_index(i + 1, j + 1);
            let v01 = to_global_vertex_index(i, j + 1);
            cells.push(Tri3d2Connectivity([v00, v10, v11]));
            cells.push(Tri3d2Connectivity([v00, v11, v01]));
        }
    }

    let mut mesh = TriangleMesh2d::from_vertices_and_connectivity(vertices, cells);
    let (min, max) = ([min.x, min.y], [max.x, max.y]);
    mesh.mark_boundary(|points| box_face_marker(points, &min, &max));
    mesh
}

pub fn create_unit_square_uniform_tri_mesh_2d<T>(cells_per_dim: usize) -> TriangleMesh2d<T>
where
    T: RealField + Copy,
{
    create_rectangular_uniform_tri_mesh_2d(
        &Vector2::zeros(),
        &Vector2::repeat(T::one()),
        [cells_per_dim, cells_per_dim],
    )
}

/// Generates a uniform tetrahedral mesh of an axis-aligned box with `cells[0] × cells[1] ×
/// cells[2]` hexahedral cells, each split into six tetrahedra.
///
/// Every cube is split along its main diagonal in the same way, so that the resulting
/// mesh is conforming.
///
/// # Panics
///
/// Panics if the number of cells in any direction is zero, or if the box is degenerate.
pub fn create_rectangular_uniform_tet_mesh<T>(min: &Vector3<T>, max: &Vector3<T>, cells: [usize; 3]) -> Tet4Mesh<T>
where
    T: RealField + Copy,
{
    let [nx, ny, nz] = cells;
    assert!(nx > 0 && ny > 0 && nz > 0, "Number of cells must be positive.");
    assert!(
        min.x < max.x && min.y < max.y && min.z < max.z,
        "Box must not be degenerate."
    );

    let to_global_vertex_index = |i, j, k| (nx + 1) * (ny + 1) * k + (nx + 1) * j + i;

    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                vertices.push(Point3::new(
                    grid_coordinate(min.x, max.x, i, nx),
                    grid_coordinate(min.y, max.y, j, ny),
                    grid_coordinate(min.z, max.z, k, nz),
                ));
            }
        }
    }

    // Each tetrahedron follows a monotone path from the (0, 0, 0) corner of the cell to the
    // (1, 1, 1) corner, one axis at a time
    const AXIS_ORDERS: [[usize; 3]; 6] = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];

    let mut cells = Vec::with_capacity(6 * nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                for order in &AXIS_ORDERS {
                    let mut corner = [i, j, k];
                    let mut tet = [to_global_vertex_index(i, j, k); 4];
                    for (step, &axis) in order.iter().enumerate() {
                        corner[axis] += 1;
                        tet[step + 1] = to_global_vertex_index(corner[0], corner[1], corner[2]);
                    }
                    cells.push(Tet4Connectivity(tet));
                }
            }
        }
    }

    let mut mesh = Tet4Mesh::from_vertices_and_connectivity(vertices, cells);
    let (min, max) = ([min.x, min.y, min.z], [max.x, max.y, max.z]);
    mesh.mark_boundary(|points| box_face_marker(points, &min, &max));
    mesh
}

pub fn create_unit_cube_uniform_tet_mesh<T>(cells_per_dim: usize) -> Tet4Mesh<T>
where
    T: RealField + Copy,
{
    create_rectangular_uniform_tet_mesh(
        &Vector3::zeros(),
        &Vector3::repeat(T::one()),
        [cells_per_dim; 3],
    )
}
