//! # Dispatcher
//!
//! 探测调度模块。
//!
//! 负责：
//! - 从 ingestion 队列接收 `Job`，按 worker 空闲程度逐个转交
//! - 固定大小的 worker 池执行探测并上报结果
//! - 跟踪运行中的探测，关闭时统一取消
//! - 持有运行状态，按固定顺序关闭事件流
//! - 将事件 fan-out 到多个 sinks，隔离慢 sink

pub mod dispatcher;
pub mod error;
pub mod fanout;
pub mod gateway;
pub mod handle;
pub mod metrics;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod sinks;

pub use contracts::{Event, EventSink, Job};
pub use dispatcher::{channels, Dispatcher, DispatcherReport};
pub use error::DispatcherError;
pub use fanout::EventFanout;
pub use gateway::EventGateway;
pub use handle::SinkHandle;
pub use metrics::{PoolMetrics, PoolMetricsSnapshot, SinkMetrics, SinkMetricsSnapshot};
pub use pool::{sample_packet_count, WorkerPool};
pub use queue::{JobReceiver, JobSubmitter};
pub use registry::{ActiveProbeHandle, ActiveProbes};
pub use sinks::{BoardEntry, BoardSnapshot, FileSink, FileSinkConfig, LogSink, StatusBoard};
