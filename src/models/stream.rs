use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of one proxy stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum StreamState {
    /// Sources are still being fetched; nothing has been emitted yet
    Fetching,
    /// The snapshot is sealed and being replayed
    Rotating {
        snapshot_size: usize,
        failed_sources: usize,
    },
    /// Every source came back empty
    Empty,
    /// The consumer closed or dropped the stream
    Closed,
}

impl StreamState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamState::Fetching => "fetching",
            StreamState::Rotating { .. } => "rotating",
            StreamState::Empty => "empty",
            StreamState::Closed => "closed",
        }
    }

    /// Whether the fetch phase has finished, one way or another
    pub fn is_settled(&self) -> bool {
        !matches!(self, StreamState::Fetching)
    }
}

/// Outcome of one fetch phase
#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    /// Number of sources that were invoked
    pub sources: usize,
    /// Sources whose parser errored, timed out or panicked
    pub failed_sources: usize,
    /// Endpoints collected into the snapshot
    pub endpoints: usize,
    pub completed_at: DateTime<Utc>,
}

impl FetchReport {
    pub fn succeeded_sources(&self) -> usize {
        self.sources.saturating_sub(self.failed_sources)
    }
}
