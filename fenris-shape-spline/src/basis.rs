//! Evaluation of B-spline basis functions with the Cox–de Boor recursion.

/// Finds the knot span `s` with `knots[s] <= x < knots[s + 1]` among the spans where
/// B-splines of the given degree are defined.
///
/// The right end of the domain belongs to the last non-empty span. Returns `None` if `x`
/// lies outside `[knots[degree], knots[len - degree - 1]]`.
pub fn find_span(knots: &[f64], degree: usize, x: f64) -> Option<usize> {
    let len = knots.len();
    if len < 2 * degree + 2 {
        return None;
    }
    let low = degree;
    let high = len - degree - 1;
    let (start, end) = (knots[low], knots[high]);
    if !(x >= start && x <= end) {
        return None;
    }

    if x == end {
        // Last span with positive length
        return (low..high).rev().find(|&s| knots[s] < knots[s + 1]);
    }

    // Number of knots in knots[low..=high] that are <= x, which is at least one
    let count = knots[low..=high].partition_point(|&t| t <= x);
    Some(low + count - 1)
}

/// Computes the `degree + 1` basis functions that may be nonzero on the given span.
///
/// Entry `j` of the result holds the value at `x` of the B-spline with index
/// `span - degree + j`.
pub fn nonzero_basis_functions(knots: &[f64], degree: usize, span: usize, x: f64) -> Vec<f64> {
    let mut values = vec![0.0; degree + 1];
    let mut left = vec![0.0; degree + 1];
    let mut right = vec![0.0; degree + 1];
    values[0] = 1.0;

    for j in 1..=degree {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let denominator = right[r + 1] + left[j - r];
            let temp = if denominator == 0.0 { 0.0 } else { values[r] / denominator };
            values[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        values[j] = saved;
    }

    values
}

/// Evaluates every B-spline on the full knot vector at `x`.
///
/// Mostly useful for testing, since it allocates a dense vector of length
/// `knots.len() - degree - 1`.
pub fn evaluate_all(knots: &[f64], degree: usize, x: f64) -> Vec<f64> {
    let num_basis = knots.len().saturating_sub(degree + 1);
    let mut all = vec![0.0; num_basis];
    if let Some(span) = find_span(knots, degree, x) {
        let values = nonzero_basis_functions(knots, degree, span, x);
        for (j, value) in values.into_iter().enumerate() {
            all[span - degree + j] = value;
        }
    }
    all
}
