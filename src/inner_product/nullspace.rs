use crate::inner_product::InnerProductKind;
use crate::mesh::Mesh;
use nalgebra::allocator::Allocator;
use nalgebra::{DVector, DefaultAllocator, DimName};

/// Returns the (non-orthonormalized) rigid motions annihilated by the given inner product.
///
/// The vectors are nodal vector fields in interleaved layout. The Laplace inner product is
/// invariant to translations, the elasticity inner product to translations and infinitesimal
/// rotations. The Helmholtz inner product is nonsingular, so no vectors are returned.
///
/// # Panics
///
/// Panics if the geometric dimension is not 2 or 3.
pub fn nullspace_vectors<D, C>(mesh: &Mesh<f64, D, C>, kind: InnerProductKind) -> Vec<DVector<f64>>
where
    D: DimName,
    DefaultAllocator: Allocator<f64, D>,
{
    let d = D::dim();
    assert!(d == 2 || d == 3, "Only two- and three-dimensional meshes are supported.");
    let vertices = mesh.vertices();
    let field = |f: &dyn Fn(&[f64]) -> [f64; 3]| {
        let mut values = DVector::zeros(d * vertices.len());
        for (i, v) in vertices.iter().enumerate() {
            let value = f(v.coords.as_slice());
            for k in 0..d {
                values[d * i + k] = value[k];
            }
        }
        values
    };

    let translations = (0..d).map(|axis| {
        field(&|_| {
            let mut t = [0.0; 3];
            t[axis] = 1.0;
            t
        })
    });

    match kind {
        InnerProductKind::Helmholtz => Vec::new(),
        InnerProductKind::Laplace => translations.collect(),
        InnerProductKind::Elasticity => {
            let mut vectors: Vec<_> = translations.collect();
            if d == 2 {
                vectors.push(field(&|x| [x[1], -x[0], 0.0]));
            } else {
                vectors.push(field(&|x| [-x[1], x[0], 0.0]));
                vectors.push(field(&|x| [-x[2], 0.0, x[0]]));
                vectors.push(field(&|x| [0.0, -x[2], x[1]]));
            }
            vectors
        }
    }
}
