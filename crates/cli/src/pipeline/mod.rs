//! Pipeline orchestration module.

mod metrics_sink;
mod orchestrator;
mod stats;

pub use metrics_sink::MetricsSink;
pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::PipelineStats;
