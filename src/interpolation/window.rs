use crate::interpolation::spline::CubicSpline;

/// Fixed window shape used when resampling an interpolant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    /// Number of samples per window.
    pub window_size: usize,
    /// Spacing of the window's history, in milliseconds.
    pub period_ms: f64,
}

impl WindowConfig {
    /// History a query point needs before it can be windowed.
    pub fn history_ms(&self) -> f64 {
        self.period_ms * self.window_size as f64
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            period_ms: 10.0,
        }
    }
}

/// Evenly spaced evaluation times over `[end - period*size, end]`, both ends
/// included.
pub fn window_times(end_time: f64, window_size: usize, period: f64) -> Vec<f64> {
    let span = period * window_size as f64;
    let start = end_time - span;
    match window_size {
        0 => Vec::new(),
        1 => vec![end_time],
        n => {
            let step = span / (n - 1) as f64;
            (0..n)
                .map(|k| if k + 1 == n { end_time } else { start + k as f64 * step })
                .collect()
        }
    }
}

/// Evaluate `spline` over the window ending at `end_time`.
///
/// Returns `None` when there is not enough history before `end_time`
/// (`end_time < period * window_size`) or the window is empty; callers skip
/// such query points rather than extrapolating.
pub fn sample_window(
    spline: &CubicSpline,
    end_time: f64,
    window_size: usize,
    period: f64,
) -> Option<Vec<f64>> {
    if window_size == 0 || end_time < period * window_size as f64 {
        return None;
    }
    Some(spline.evaluate_many(&window_times(end_time, window_size, period)))
}
