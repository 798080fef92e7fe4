pub mod spline;
pub mod window;

pub use spline::{fit_entry, CubicSpline};
pub use window::{sample_window, window_times, WindowConfig};

use crate::models::InterpolantKey;

/// A spline together with the key it is stored under.
#[derive(Debug, Clone)]
pub struct FittedInterpolant {
    pub key: InterpolantKey,
    pub spline: CubicSpline,
}

impl FittedInterpolant {
    pub fn new(key: InterpolantKey, spline: CubicSpline) -> Self {
        Self { key, spline }
    }
}
