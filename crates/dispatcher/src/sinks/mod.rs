//! Sink implementations
//!
//! Contains LogSink, FileSink, and StatusBoard.

mod file;
mod log;
mod status_board;

pub use self::file::{FileSink, FileSinkConfig};
pub use self::log::LogSink;
pub use self::status_board::{BoardEntry, BoardSnapshot, StatusBoard};
