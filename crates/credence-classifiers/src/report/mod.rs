pub mod plots;
pub mod report;
pub mod training;

pub use report::{Report, ReportSection};
pub use training::TrainingReport;
