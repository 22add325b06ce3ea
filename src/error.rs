//! Errors reported while constructing control spaces and inner products.
use fenris_shape_spline::SplineError;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// A configuration that cannot be used to construct a control space or an inner product.
///
/// Configuration errors are detected before any matrix is assembled.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// Only two- and three-dimensional meshes are supported.
    UnsupportedDimension { dim: usize },
    /// The B-spline parameters do not describe a valid spline space.
    InvalidSpline(SplineError),
    /// A per-axis configuration does not have one entry per geometric dimension.
    GeometricDimensionMismatch { expected: usize, actual: usize },
    /// The requested polynomial order is not available for the mesh.
    UnsupportedOrder { order: usize },
    /// The mesh has no marked boundary facets, but boundary conditions are requested.
    NoBoundaryMarkers,
    /// A fixed boundary id does not occur among the boundary markers of the mesh.
    UnknownBoundaryId { id: usize, available: Vec<usize> },
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedDimension { dim } => {
                write!(f, "unsupported geometric dimension {} (must be 2 or 3)", dim)
            }
            Self::InvalidSpline(err) => write!(f, "invalid B-spline configuration: {}", err),
            Self::GeometricDimensionMismatch { expected, actual } => write!(
                f,
                "expected one entry per geometric dimension ({}), but got {}",
                expected, actual
            ),
            Self::UnsupportedOrder { order } => write!(
                f,
                "unsupported polynomial order {} (only piecewise linear spaces are available)",
                order
            ),
            Self::NoBoundaryMarkers => write!(f, "the mesh has no marked boundary facets"),
            Self::UnknownBoundaryId { id, available } => {
                write!(f, "unknown boundary id {} (available ids: {:?})", id, available)
            }
        }
    }
}

impl Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidSpline(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SplineError> for ConfigurationError {
    fn from(err: SplineError) -> Self {
        Self::InvalidSpline(err)
    }
}
