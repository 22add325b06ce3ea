use crate::basis::{find_span, nonzero_basis_functions};
use crate::SplineError;

/// Clamped knot vector on `[min, max]` with `2^level` uniform intervals.
///
/// The knot vector consists of `order - 1` copies of `min`, `2^level + 1` uniformly spaced
/// breakpoints and `order - 1` copies of `max`.
pub fn clamped_uniform_knots(order: usize, level: usize, min: f64, max: f64) -> Vec<f64> {
    let num_intervals = 1usize << level;
    let repeated = order.saturating_sub(1);
    let mut knots = Vec::with_capacity(num_intervals + 1 + 2 * repeated);
    knots.extend(std::iter::repeat(0.0).take(repeated));
    knots.extend((0..=num_intervals).map(|i| i as f64 / num_intervals as f64));
    knots.extend(std::iter::repeat(1.0).take(repeated));
    knots.into_iter().map(|t| (max - min) * t + min).collect()
}

/// Univariate B-spline space on a clamped, uniformly refined knot vector.
///
/// The first and last `regularity` basis functions are excluded from the space, so that
/// (for `regularity >= 1`) every function in the space vanishes at the ends of the
/// interval. Basis function `i` of the space is the B-spline with index `i + regularity`
/// on the full knot vector.
#[derive(Debug, Clone, PartialEq)]
pub struct UnivariateSplineSpace {
    order: usize,
    level: usize,
    interval: (f64, f64),
    regularity: usize,
    knots: Vec<f64>,
}

impl UnivariateSplineSpace {
    pub fn new(order: usize, level: usize, interval: (f64, f64), regularity: usize) -> Result<Self, SplineError> {
        Self::new_on_axis(0, order, level, interval, regularity)
    }

    fn new_on_axis(
        axis: usize,
        order: usize,
        level: usize,
        interval: (f64, f64),
        regularity: usize,
    ) -> Result<Self, SplineError> {
        let (min, max) = interval;
        if order < 1 {
            return Err(SplineError::InvalidOrder { axis, order });
        }
        if level < 1 {
            return Err(SplineError::InvalidLevel { axis, level });
        }
        if !(min < max) || !min.is_finite() || !max.is_finite() {
            return Err(SplineError::DegenerateInterval { axis, min, max });
        }
        // Guard against overflowing the shift when computing the number of intervals
        if level >= usize::BITS as usize - 1 {
            return Err(SplineError::InvalidLevel { axis, level });
        }

        let knots = clamped_uniform_knots(order, level, min, max);
        let dim = knots.len() as isize - order as isize - 2 * regularity as isize;
        if dim <= 0 {
            return Err(SplineError::EmptySpace { axis, dim });
        }

        Ok(Self {
            order,
            level,
            interval,
            regularity,
            knots,
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn degree(&self) -> usize {
        self.order - 1
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn interval(&self) -> (f64, f64) {
        self.interval
    }

    pub fn regularity(&self) -> usize {
        self.regularity
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Number of B-splines on the full knot vector.
    pub fn full_dim(&self) -> usize {
        self.knots.len() - self.order
    }

    /// Dimension of the space, i.e. the number of kept basis functions.
    pub fn dim(&self) -> usize {
        self.full_dim() - 2 * self.regularity
    }

    /// Index of the first kept basis function on the full knot vector.
    pub fn basis_offset(&self) -> usize {
        self.regularity
    }

    /// Evaluates all kept basis functions that are nonzero at `x`.
    ///
    /// Returns pairs `(i, value)` with `i` the index of the basis function in the space, in
    /// increasing order. Points outside of the interval give no entries.
    pub fn evaluate_nonzero(&self, x: f64) -> Vec<(usize, f64)> {
        let offset = self.basis_offset();
        let dim = self.dim();
        match find_span(&self.knots, self.degree(), x) {
            None => Vec::new(),
            Some(span) => {
                let values = nonzero_basis_functions(&self.knots, self.degree(), span, x);
                let first = span - self.degree();
                values
                    .into_iter()
                    .enumerate()
                    .map(|(local, value)| (first + local, value))
                    .filter(|&(i, value)| i >= offset && i - offset < dim && value != 0.0)
                    .map(|(i, value)| (i - offset, value))
                    .collect()
            }
        }
    }
}

/// Tensor product of univariate spline spaces, one per axis.
///
/// Scalar basis functions are indexed with the first axis as the most significant, i.e.
/// the multi-index `(i_0, ..., i_{d-1})` corresponds to `(...(i_0 n_1 + i_1) n_2 + ...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorSplineSpace {
    axes: Vec<UnivariateSplineSpace>,
}

impl TensorSplineSpace {
    pub fn new(
        intervals: &[(f64, f64)],
        orders: &[usize],
        levels: &[usize],
        regularities: &[usize],
    ) -> Result<Self, SplineError> {
        let num_axes = intervals.len();
        if orders.len() != num_axes || levels.len() != num_axes || regularities.len() != num_axes {
            return Err(SplineError::AxisCountMismatch {
                intervals: num_axes,
                orders: orders.len(),
                levels: levels.len(),
                regularities: regularities.len(),
            });
        }
        if num_axes == 0 {
            return Err(SplineError::NoAxes);
        }

        let axes = (0..num_axes)
            .map(|axis| {
                let (order, level, regularity) = (orders[axis], levels[axis], regularities[axis]);
                UnivariateSplineSpace::new_on_axis(axis, order, level, intervals[axis], regularity)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { axes })
    }

    pub fn axes(&self) -> &[UnivariateSplineSpace] {
        &self.axes
    }

    pub fn num_axes(&self) -> usize {
        self.axes.len()
    }

    /// Dimensions of the univariate spaces.
    pub fn axis_dims(&self) -> Vec<usize> {
        self.axes.iter().map(|axis| axis.dim()).collect()
    }

    /// Dimension of the scalar tensor product space.
    pub fn dim(&self) -> usize {
        self.axes.iter().map(|axis| axis.dim()).product()
    }
}
