pub mod cache;
pub mod classes;
pub mod joiner;

pub use cache::{InterpolantCache, InterpolantLookup};
pub use classes::{ClassIndex, ClassMap, ClassScheme, Polarity};
pub use joiner::{join_records, JoinOutcome};
