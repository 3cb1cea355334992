//! EventSink trait - consumer side of the event stream
//!
//! Defines the abstract interface for sinks draining pipeline events.

use crate::{ContractError, Event};

/// Event consumer trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(EventSink: Send)]
pub trait LocalEventSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Handle one event, in stream order
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn handle(&mut self, event: &Event) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink, called once after the stream ended
    async fn close(&mut self) -> Result<(), ContractError>;
}
