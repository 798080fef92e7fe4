pub mod plot;

pub use plot::{write_plot, PlotConfig};
