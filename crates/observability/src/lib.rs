//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式，可选 results / debug 两个 NDJSON 日志文件)
//! - Prometheus 指标导出
//! - 探测结果指标收集与统计
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{metrics, ObservabilityConfig};
//!
//! // 初始化 (RUST_LOG 优先于 default_log_level)
//! observability::init_with_config(ObservabilityConfig::default())?;
//!
//! // 记录探测指标
//! if let Event::ResultRecorded(outcome) = &event {
//!     metrics::record_probe_outcome(outcome);
//! }
//! ```

pub mod metrics;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::Level;
use tracing_subscriber::{
    filter::filter_fn, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

// Re-exports
pub use crate::metrics::{
    record_probe_outcome, record_run_status, DestinationStats, MetricsSummary,
    ProbeMetricsAggregator, RunningStats, StatsSummary,
};

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// 默认日志级别
    pub default_log_level: String,
    /// 是否输出到控制台
    pub console_enabled: bool,
    /// results 日志文件，仅 INFO / ERROR (None = 禁用)
    pub log_file: Option<PathBuf>,
    /// debug 日志文件，仅 DEBUG / WARN (None = 禁用)
    pub debug_log_file: Option<PathBuf>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(9000),
            default_log_level: "info".to_string(),
            console_enabled: true,
            log_file: None,
            debug_log_file: None,
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON 结构化日志
    #[default]
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    Compact,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn console_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    }
}

/// results 日志收录的事件级别
const RESULTS_LEVELS: &[Level] = &[Level::INFO, Level::ERROR];

/// debug 日志收录的事件级别
const DEBUG_LEVELS: &[Level] = &[Level::DEBUG, Level::WARN];

/// 追加写入的 JSON 日志文件层，只收录 `levels` 中的事件
fn file_layer(path: &Path, levels: &'static [Level]) -> Result<BoxedLayer> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    Ok(fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .with_filter(filter_fn(move |meta| {
            !meta.is_event() || levels.contains(meta.level())
        }))
        .boxed())
}

/// 使用自定义配置初始化
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    // 1. Initialize Tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.console_enabled {
        layers.push(console_layer(config.log_format));
    }
    if let Some(path) = &config.log_file {
        layers.push(file_layer(path, RESULTS_LEVELS)?);
    }
    if let Some(path) = &config.debug_log_file {
        layers.push(file_layer(path, DEBUG_LEVELS)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    // 2. Initialize Prometheus Exporter (if enabled)
    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        log_file = ?config.log_file,
        debug_log_file = ?config.debug_log_file,
        "Observability initialized"
    );

    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
///
/// 用于 Tracing 已由其他模块初始化的场景。
pub fn init_metrics_only(port: u16) -> Result<()> {
    let builder = PrometheusBuilder::new();
    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
