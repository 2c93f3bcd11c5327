use async_trait::async_trait;

use crate::error::Result;
use crate::models::ProspectRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // keyed on fetched_at
    Prospect,
    // keyed on started_at
    Run,
}

/// Read-only; snapshot requests share one store without locking.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Epoch seconds of events of `kind` within `[from, to]`.
    async fn event_times(&self, kind: EventKind, from: f64, to: f64) -> Result<Vec<f64>>;

    async fn prospect_rows(&self) -> Result<Vec<ProspectRow>>;

    async fn run_count(&self) -> Result<i64>;
}
