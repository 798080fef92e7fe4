//! Natural cubic spline interpolation.
//!
//! The spline stores its knots, knot values and the second derivative at
//! every knot. Both end second derivatives are zero (natural boundary). On
//! each interval `[x_i, x_{i+1}]` with `h = x_{i+1} - x_i`,
//! `a = (x_{i+1} - t) / h` and `b = (t - x_i) / h`:
//!
//! ```text
//! S(t) = a*y_i + b*y_{i+1} + ((a^3 - a)*M_i + (b^3 - b)*M_{i+1}) * h^2 / 6
//! ```
//!
//! which reproduces `y_i` exactly at every knot.

use serde::{Deserialize, Serialize};

use crate::error::{FitError, PipelineError, PipelineResult};
use crate::segmentation::SeriesEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SplineParts", into = "SplineParts")]
pub struct CubicSpline {
    knots: Vec<f64>,
    values: Vec<f64>,
    second_derivatives: Vec<f64>,
}

/// Serialized shape; checked on the way back in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SplineParts {
    knots: Vec<f64>,
    values: Vec<f64>,
    second_derivatives: Vec<f64>,
}

impl TryFrom<SplineParts> for CubicSpline {
    type Error = String;

    fn try_from(parts: SplineParts) -> Result<Self, Self::Error> {
        let n = parts.knots.len();
        if n < 2 || parts.values.len() != n || parts.second_derivatives.len() != n {
            return Err(format!(
                "inconsistent spline: {} knots, {} values, {} second derivatives",
                n,
                parts.values.len(),
                parts.second_derivatives.len()
            ));
        }
        if parts.knots.windows(2).any(|pair| !(pair[1] > pair[0])) {
            return Err("spline knots are not strictly increasing".into());
        }
        Ok(Self {
            knots: parts.knots,
            values: parts.values,
            second_derivatives: parts.second_derivatives,
        })
    }
}

impl From<CubicSpline> for SplineParts {
    fn from(spline: CubicSpline) -> Self {
        Self {
            knots: spline.knots,
            values: spline.values,
            second_derivatives: spline.second_derivatives,
        }
    }
}

impl CubicSpline {
    /// Fit through `(times[k], values[k])`. Times must be finite and strictly
    /// increasing, with at least two points.
    pub fn fit(times: &[f64], values: &[f64]) -> Result<Self, FitError> {
        if times.len() != values.len() {
            return Err(FitError::LengthMismatch {
                times: times.len(),
                values: values.len(),
            });
        }
        let n = times.len();
        if n < 2 {
            return Err(FitError::TooFewPoints { count: n });
        }
        if let Some(index) = (0..n).find(|&i| !times[i].is_finite() || !values[i].is_finite()) {
            return Err(FitError::NonFinite { index });
        }
        if let Some(index) = (1..n).find(|&i| !(times[i] > times[i - 1])) {
            return Err(FitError::NotIncreasing { index });
        }

        let second_derivatives = natural_second_derivatives(times, values);

        Ok(Self {
            knots: times.to_vec(),
            values: values.to_vec(),
            second_derivatives,
        })
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn knot_count(&self) -> usize {
        self.knots.len()
    }

    /// Fitted range `[t_min, t_max]`. Evaluation outside it extrapolates.
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[0], self.knots[self.knots.len() - 1])
    }

    pub fn contains(&self, t: f64) -> bool {
        let (lo, hi) = self.domain();
        t >= lo && t <= hi
    }

    pub fn evaluate(&self, t: f64) -> f64 {
        let i = self.interval_for(t);
        let (x0, x1) = (self.knots[i], self.knots[i + 1]);
        let (y0, y1) = (self.values[i], self.values[i + 1]);
        let (m0, m1) = (self.second_derivatives[i], self.second_derivatives[i + 1]);

        let h = x1 - x0;
        let a = (x1 - t) / h;
        let b = (t - x0) / h;

        a * y0 + b * y1 + ((a * a * a - a) * m0 + (b * b * b - b) * m1) * (h * h) / 6.0
    }

    pub fn evaluate_many(&self, ts: &[f64]) -> Vec<f64> {
        ts.iter().map(|&t| self.evaluate(t)).collect()
    }

    /// Interval index `i` such that `t` is evaluated on `[x_i, x_{i+1}]`.
    /// Points outside the range use the nearest end interval.
    fn interval_for(&self, t: f64) -> usize {
        let last = self.knots.len() - 2;
        let upper = self.knots.partition_point(|&x| x <= t);
        upper.saturating_sub(1).min(last)
    }
}

/// Second derivatives at each knot for the natural boundary condition,
/// solved with the Thomas algorithm on the interior tridiagonal system.
fn natural_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }

    let interior = n - 2;
    let mut c_prime = vec![0.0; interior];
    let mut d_prime = vec![0.0; interior];

    for row in 0..interior {
        let i = row + 1;
        let h_prev = x[i] - x[i - 1];
        let h_next = x[i + 1] - x[i];
        let lower = h_prev;
        let diag = 2.0 * (h_prev + h_next);
        let upper = h_next;
        let rhs = 6.0 * ((y[i + 1] - y[i]) / h_next - (y[i] - y[i - 1]) / h_prev);

        if row == 0 {
            c_prime[row] = upper / diag;
            d_prime[row] = rhs / diag;
        } else {
            let denom = diag - lower * c_prime[row - 1];
            c_prime[row] = upper / denom;
            d_prime[row] = (rhs - lower * d_prime[row - 1]) / denom;
        }
    }

    m[interior] = d_prime[interior - 1];
    for row in (0..interior - 1).rev() {
        m[row + 1] = d_prime[row] - c_prime[row] * m[row + 2];
    }

    m
}

/// Fit one segment's series, mapping failures to `InsufficientData`.
pub fn fit_entry(entry: &SeriesEntry) -> PipelineResult<CubicSpline> {
    CubicSpline::fit(&entry.relative_times, &entry.values)
        .map_err(|err| PipelineError::insufficient(entry.name(), err.to_string()))
}
