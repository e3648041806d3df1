pub mod analyzer;
pub mod beatmap;
pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod tui;

pub use analyzer::analyze;
pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use format::ms_to_time_string;
pub use models::{AnalysisResult, BpmSection, Interval, TimingRecord};
