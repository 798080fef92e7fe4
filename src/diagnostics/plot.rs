//! PNG rendering of a fitted interpolant against the points it was fitted to.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{ImageFormat, Rgb, RgbImage};

use crate::interpolation::CubicSpline;
use crate::models::InterpolantKey;

/// Number of evaluation points along the curve.
pub const CURVE_RESOLUTION: usize = 1001;

const MARGIN: u32 = 20;
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([160, 160, 160]);
const CURVE: Rgb<u8> = Rgb([31, 119, 180]);
const POINT: Rgb<u8> = Rgb([214, 39, 40]);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("plots"),
            width: 1000,
            height: 600,
        }
    }
}

/// Pixel mapping for a `[x0, x1] x [y0, y1]` data box.
struct Canvas {
    width: u32,
    height: u32,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Canvas {
    fn to_pixel(&self, x: f64, y: f64) -> (i64, i64) {
        let inner_w = self.width.saturating_sub(2 * MARGIN).max(1) as f64;
        let inner_h = self.height.saturating_sub(2 * MARGIN).max(1) as f64;
        let fx = (x - self.x_range.0) / span(self.x_range);
        let fy = (y - self.y_range.0) / span(self.y_range);
        let px = MARGIN as f64 + fx * inner_w;
        let py = self.height.saturating_sub(MARGIN) as f64 - fy * inner_h;
        (px.round() as i64, py.round() as i64)
    }
}

fn span(range: (f64, f64)) -> f64 {
    let width = range.1 - range.0;
    if width > 0.0 {
        width
    } else {
        1.0
    }
}

fn put(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
        return;
    };
    if x < image.width() && y < image.height() {
        image.put_pixel(x, y, color);
    }
}

/// Bresenham line between two pixel positions.
fn draw_line(image: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put(image, x, y, color);
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_marker(image: &mut RgbImage, center: (i64, i64), color: Rgb<u8>) {
    for dx in -2..=2 {
        for dy in -2..=2 {
            put(image, center.0 + dx, center.1 + dy, color);
        }
    }
}

/// Draw the curve over `[0, last knot]` and the knots themselves.
pub fn render(spline: &CubicSpline, width: u32, height: u32) -> RgbImage {
    let mut image = RgbImage::from_pixel(width, height, BACKGROUND);

    let (_, last) = spline.domain();
    let x_end = last.max(0.0);
    let xs: Vec<f64> = (0..CURVE_RESOLUTION)
        .map(|k| x_end * k as f64 / (CURVE_RESOLUTION - 1) as f64)
        .collect();
    let ys = spline.evaluate_many(&xs);

    let (y_min, y_max) = ys
        .iter()
        .chain(spline.values())
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let y_range = if y_min.is_finite() { (y_min, y_max) } else { (0.0, 1.0) };
    let x_start = spline.knots().first().copied().unwrap_or(0.0).min(0.0);

    let canvas = Canvas {
        width,
        height,
        x_range: (x_start, x_end),
        y_range,
    };

    let bottom = height.saturating_sub(MARGIN) as i64;
    draw_line(
        &mut image,
        (MARGIN as i64, bottom),
        (width.saturating_sub(MARGIN) as i64, bottom),
        AXIS,
    );
    draw_line(&mut image, (MARGIN as i64, bottom), (MARGIN as i64, MARGIN as i64), AXIS);

    let pixels: Vec<(i64, i64)> = xs
        .iter()
        .zip(&ys)
        .map(|(&x, &y)| canvas.to_pixel(x, y))
        .collect();
    for pair in pixels.windows(2) {
        draw_line(&mut image, pair[0], pair[1], CURVE);
    }

    for (&x, &y) in spline.knots().iter().zip(spline.values()) {
        draw_marker(&mut image, canvas.to_pixel(x, y), POINT);
    }

    image
}

/// Render and save `{dir}/pupil_{participant}_{emotion}.png`.
pub fn write_plot(
    key: &InterpolantKey,
    spline: &CubicSpline,
    config: &PlotConfig,
) -> Result<PathBuf> {
    std::fs::create_dir_all(&config.dir)
        .with_context(|| format!("failed to create plot directory {}", config.dir.display()))?;
    let path = plot_path(&config.dir, key);
    render(spline, config.width, config.height)
        .save_with_format(&path, ImageFormat::Png)
        .with_context(|| format!("failed to write plot {}", path.display()))?;
    Ok(path)
}

pub fn plot_path(dir: &Path, key: &InterpolantKey) -> PathBuf {
    dir.join(format!("{}.png", key.artifact_name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spline() -> CubicSpline {
        let times: Vec<f64> = (0..20).map(|k| k as f64 * 100.0).collect();
        let values: Vec<f64> = times.iter().map(|t| (t / 300.0).sin()).collect();
        CubicSpline::fit(&times, &values).unwrap()
    }

    #[test]
    fn render_marks_curve_and_points() {
        let image = render(&spline(), 200, 120);
        assert_eq!(image.dimensions(), (200, 120));
        assert!(image.pixels().any(|p| *p == CURVE));
        assert!(image.pixels().any(|p| *p == POINT));
    }

    #[test]
    fn write_plot_uses_artifact_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlotConfig {
            enabled: true,
            dir: dir.path().join("plots"),
            width: 120,
            height: 80,
        };
        let key = InterpolantKey::new("ab", "joy");

        let path = write_plot(&key, &spline(), &config).unwrap();

        assert_eq!(path, config.dir.join("pupil_ab_joy.png"));
        let reloaded = image::open(&path).unwrap();
        assert_eq!(reloaded.width(), 120);
    }
}
