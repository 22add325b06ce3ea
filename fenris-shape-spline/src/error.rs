use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Invalid parameters for a B-spline space.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SplineError {
    InvalidOrder { axis: usize, order: usize },
    InvalidLevel { axis: usize, level: usize },
    DegenerateInterval { axis: usize, min: f64, max: f64 },
    /// The requested knots and boundary regularity leave no basis function on the axis.
    EmptySpace { axis: usize, dim: isize },
    AxisCountMismatch { intervals: usize, orders: usize, levels: usize, regularities: usize },
    NoAxes,
}

impl Display for SplineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOrder { axis, order } => {
                write!(f, "Order must be at least 1, but axis {} has order {}.", axis, order)
            }
            Self::InvalidLevel { axis, level } => {
                write!(f, "Level must be at least 1, but axis {} has level {}.", axis, level)
            }
            Self::DegenerateInterval { axis, min, max } => {
                write!(f, "Interval [{}, {}] of axis {} is degenerate.", min, max, axis)
            }
            Self::EmptySpace { axis, dim } => {
                write!(f, "Spline space of axis {} has non-positive dimension {}.", axis, dim)
            }
            Self::AxisCountMismatch {
                intervals,
                orders,
                levels,
                regularities,
            } => write!(
                f,
                "Inconsistent number of axes: {} intervals, {} orders, {} levels and {} regularities.",
                intervals, orders, levels, regularities
            ),
            Self::NoAxes => write!(f, "A spline space requires at least one axis."),
        }
    }
}

impl Error for SplineError {}
