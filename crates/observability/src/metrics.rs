//! 探测指标收集模块
//!
//! 基于 ProbeOutcome 收集和统计探测结果指标。

use std::collections::BTreeMap;

use contracts::{FailureKind, ProbeOutcome, ProbeResult, RunStatus};
use metrics::{counter, gauge, histogram};

/// 从 ProbeOutcome 记录指标
///
/// 每个 `ResultRecorded` 事件调用一次。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_probe_outcome;
///
/// if let Event::ResultRecorded(outcome) = &event {
///     record_probe_outcome(outcome);
/// }
/// ```
pub fn record_probe_outcome(outcome: &ProbeOutcome) {
    let destination = outcome.destination.address.clone();

    match &outcome.result {
        ProbeResult::Completed(stats) => {
            counter!("pingboard_probes_total", "status" => "completed").increment(1);

            // RTT (毫秒)
            histogram!("pingboard_probe_rtt_ms", "destination" => destination.clone())
                .record(stats.avg_rtt.as_secs_f64() * 1000.0);

            // 丢包率
            histogram!("pingboard_probe_loss_pct").record(stats.packet_loss_pct);
            gauge!("pingboard_probe_loss_pct_current", "destination" => destination)
                .set(stats.packet_loss_pct);
        }
        ProbeResult::Failed(failure) => {
            let kind = match failure.kind {
                FailureKind::Construction => "construction",
                FailureKind::Run => "run",
            };
            counter!("pingboard_probes_total", "status" => "failed").increment(1);
            if let Some(stats) = &failure.stats {
                histogram!("pingboard_probe_loss_pct").record(stats.packet_loss_pct);
                gauge!("pingboard_probe_loss_pct_current", "destination" => destination.clone())
                    .set(stats.packet_loss_pct);
            }
            counter!(
                "pingboard_probe_failures_total",
                "destination" => destination,
                "kind" => kind
            )
            .increment(1);
        }
    }
}

/// 记录运行状态 (0 = 未启动, 1 = 运行中, 2 = 已停止)
pub fn record_run_status(status: RunStatus) {
    let value = match status {
        RunStatus::NotStarted => 0.0,
        RunStatus::Running => 1.0,
        RunStatus::Stopped => 2.0,
    };
    gauge!("pingboard_run_status").set(value);
}

/// 单个目标的聚合统计
#[derive(Debug, Clone, Default)]
pub struct DestinationStats {
    pub completed: u64,
    pub failed: u64,
    /// 平均 RTT (毫秒)
    pub rtt_ms: RunningStats,
    /// 丢包率
    pub loss_pct: RunningStats,
}

/// 探测指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct ProbeMetricsAggregator {
    /// 结果总数
    pub total_results: u64,

    /// 成功次数
    pub total_completed: u64,

    /// 构造失败次数
    pub construction_failures: u64,

    /// 运行失败次数
    pub run_failures: u64,

    /// 全部目标的 RTT 统计
    pub rtt_stats: RunningStats,

    /// 全部目标的丢包率统计
    pub loss_stats: RunningStats,

    /// 按地址聚合
    pub per_destination: BTreeMap<String, DestinationStats>,
}

impl ProbeMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, outcome: &ProbeOutcome) {
        self.total_results += 1;
        let entry = self
            .per_destination
            .entry(outcome.destination.address.clone())
            .or_default();

        match &outcome.result {
            ProbeResult::Completed(stats) => {
                let rtt_ms = stats.avg_rtt.as_secs_f64() * 1000.0;
                self.total_completed += 1;
                self.rtt_stats.push(rtt_ms);
                self.loss_stats.push(stats.packet_loss_pct);
                entry.completed += 1;
                entry.rtt_ms.push(rtt_ms);
                entry.loss_pct.push(stats.packet_loss_pct);
            }
            ProbeResult::Failed(failure) => {
                match failure.kind {
                    FailureKind::Construction => self.construction_failures += 1,
                    FailureKind::Run => self.run_failures += 1,
                }
                // 全部丢包仍计入丢包率
                if let Some(stats) = &failure.stats {
                    self.loss_stats.push(stats.packet_loss_pct);
                    entry.loss_pct.push(stats.packet_loss_pct);
                }
                entry.failed += 1;
            }
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let failures = self.construction_failures + self.run_failures;
        MetricsSummary {
            total_results: self.total_results,
            total_completed: self.total_completed,
            construction_failures: self.construction_failures,
            run_failures: self.run_failures,
            failure_rate: if self.total_results > 0 {
                failures as f64 / self.total_results as f64 * 100.0
            } else {
                0.0
            },
            rtt_ms: StatsSummary::from(&self.rtt_stats),
            loss_pct: StatsSummary::from(&self.loss_stats),
            per_destination: self
                .per_destination
                .iter()
                .map(|(address, stats)| {
                    (
                        address.clone(),
                        (stats.completed, stats.failed, StatsSummary::from(&stats.rtt_ms)),
                    )
                })
                .collect(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_results: u64,
    pub total_completed: u64,
    pub construction_failures: u64,
    pub run_failures: u64,
    pub failure_rate: f64,
    pub rtt_ms: StatsSummary,
    pub loss_pct: StatsSummary,
    /// 地址 -> (成功, 失败, RTT 统计)
    pub per_destination: BTreeMap<String, (u64, u64, StatsSummary)>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Probe Metrics Summary ===")?;
        writeln!(f, "Total results: {}", self.total_results)?;
        writeln!(f, "Completed: {}", self.total_completed)?;
        writeln!(
            f,
            "Failed: {} construction, {} run ({:.2}%)",
            self.construction_failures, self.run_failures, self.failure_rate
        )?;
        writeln!(f, "RTT (ms): {}", self.rtt_ms)?;
        writeln!(f, "Packet loss (%): {}", self.loss_pct)?;

        if !self.per_destination.is_empty() {
            writeln!(f, "Per destination:")?;
            for (address, (completed, failed, rtt)) in &self.per_destination {
                writeln!(f, "  {address}: ok={completed} failed={failed} rtt_ms: {rtt}")?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Destination, JobId, ProbeError, ProbeFailure, ProbeStats};
    use std::time::Duration;

    fn completed(address: &str, rtt_ms: u64) -> ProbeOutcome {
        let stats = ProbeStats::from_rtts(4, &[Duration::from_millis(rtt_ms); 4]);
        ProbeOutcome::completed(JobId::new_v4(), Destination::new(address, address), stats)
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = ProbeMetricsAggregator::new();
        aggregator.update(&completed("1.1.1.1", 10));
        aggregator.update(&completed("1.1.1.1", 30));
        aggregator.update(&ProbeOutcome::failed(
            JobId::new_v4(),
            Destination::new("bad", "bad.invalid"),
            ProbeFailure::construction(&ProbeError::resolve("bad.invalid", "not found")),
        ));

        assert_eq!(aggregator.total_results, 3);
        assert_eq!(aggregator.total_completed, 2);
        assert_eq!(aggregator.construction_failures, 1);
        assert!((aggregator.rtt_stats.mean() - 20.0).abs() < 1e-6);
        assert_eq!(aggregator.per_destination["bad.invalid"].failed, 1);
        assert_eq!(aggregator.per_destination["1.1.1.1"].completed, 2);
    }

    #[test]
    fn test_all_lost_counts_toward_loss() {
        let mut aggregator = ProbeMetricsAggregator::new();
        aggregator.update(&completed("1.1.1.1", 10));
        aggregator.update(&ProbeOutcome::failed(
            JobId::new_v4(),
            Destination::new("dns", "1.1.1.1"),
            ProbeFailure::run(&ProbeError::AllPacketsLost {
                sent: 4,
                timeout: Duration::from_secs(1),
            }),
        ));

        assert_eq!(aggregator.run_failures, 1);
        assert_eq!(aggregator.rtt_stats.count(), 1);
        assert_eq!(aggregator.loss_stats.count(), 2);
        assert!((aggregator.loss_stats.max() - 100.0).abs() < 1e-10);
        assert_eq!(aggregator.per_destination["1.1.1.1"].loss_pct.count(), 2);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = ProbeMetricsAggregator::new();
        aggregator.update(&completed("1.1.1.1", 10));
        aggregator.update(&ProbeOutcome::failed(
            JobId::new_v4(),
            Destination::new("gw", "10.0.0.1"),
            ProbeFailure::run(&ProbeError::run("boom")),
        ));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Total results: 2"));
        assert!(output.contains("50.00%"));
        assert!(output.contains("10.0.0.1: ok=0 failed=1"));
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        record_probe_outcome(&completed("1.1.1.1", 10));
        record_run_status(RunStatus::Running);
    }
}
