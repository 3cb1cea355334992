//! StatusBoard - last known result per destination
//!
//! Keeps the current run status and, for every configured destination, the
//! most recent outcome plus success/failure counts. Clones share the board,
//! so one clone is handed to the fan-out and another is read by the caller.

use std::sync::Arc;

use contracts::{ContractError, Destination, Event, EventSink, ProbeOutcome, RunStatus};
use parking_lot::Mutex;
use tracing::{debug, instrument};

/// One row of the board
#[derive(Debug, Clone, PartialEq)]
pub struct BoardEntry {
    pub destination: Destination,
    pub last_outcome: Option<ProbeOutcome>,
    pub completed: u64,
    pub failed: u64,
}

/// Copy of the board at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct BoardSnapshot {
    pub status: RunStatus,
    /// Rows in configuration order
    pub entries: Vec<BoardEntry>,
}

impl BoardSnapshot {
    pub fn entry(&self, address: &str) -> Option<&BoardEntry> {
        self.entries
            .iter()
            .find(|e| e.destination.address == address)
    }
}

/// Sink maintaining the per-destination status table
#[derive(Clone)]
pub struct StatusBoard {
    name: String,
    board: Arc<Mutex<BoardSnapshot>>,
}

impl StatusBoard {
    /// Board with one empty row per destination
    pub fn new(name: impl Into<String>, destinations: &[Destination]) -> Self {
        let entries = destinations
            .iter()
            .map(|destination| BoardEntry {
                destination: destination.clone(),
                last_outcome: None,
                completed: 0,
                failed: 0,
            })
            .collect();

        Self {
            name: name.into(),
            board: Arc::new(Mutex::new(BoardSnapshot {
                status: RunStatus::NotStarted,
                entries,
            })),
        }
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.board.lock().clone()
    }

    pub fn status(&self) -> RunStatus {
        self.board.lock().status
    }

    fn record(&self, outcome: &ProbeOutcome) {
        let mut board = self.board.lock();
        let address = &outcome.destination.address;

        let index = match board
            .entries
            .iter()
            .position(|e| &e.destination.address == address)
        {
            Some(index) => index,
            None => {
                // Destination not known up front
                board.entries.push(BoardEntry {
                    destination: outcome.destination.clone(),
                    last_outcome: None,
                    completed: 0,
                    failed: 0,
                });
                board.entries.len() - 1
            }
        };

        let entry = &mut board.entries[index];
        if outcome.is_success() {
            entry.completed += 1;
        } else {
            entry.failed += 1;
        }
        entry.last_outcome = Some(outcome.clone());
    }
}

impl EventSink for StatusBoard {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "status_board_handle", skip(self, event), fields(sink = %self.name))]
    async fn handle(&mut self, event: &Event) -> Result<(), ContractError> {
        match event {
            Event::StatusChanged(status) => self.board.lock().status = *status,
            Event::ResultRecorded(outcome) => self.record(outcome),
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "StatusBoard closed");
        Ok(())
    }
}
