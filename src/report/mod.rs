//! Offline analysis reports

mod result;

pub use result::{AnalysisReport, StreamSummary, WindowReport, ZoneSummary};
