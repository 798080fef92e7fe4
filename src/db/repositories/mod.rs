pub mod interpolants;
pub mod recording_runs;
