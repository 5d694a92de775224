mod summary;
pub mod views;

pub use summary::{format_summary, SurveySummary};
