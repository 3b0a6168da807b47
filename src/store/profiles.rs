//! Player profile hand-off

#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::game::stats::SessionSummary;
use crate::game::types::PlayerHistory;

/// Receiver of per-player shot history when a session ends, resets, or
/// changes players. Aggregation happens on the receiving side.
pub trait ProfileSink: Send + Sync {
    fn record(&self, session_id: Uuid, history: &PlayerHistory);
}

/// Profile sink that logs a summary of each hand-off
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProfileSink;

impl ProfileSink for TracingProfileSink {
    fn record(&self, session_id: Uuid, history: &PlayerHistory) {
        let summary = SessionSummary::from_shots(&history.shots);
        info!(
            session_id = %session_id,
            player = %history.player,
            name = %history.name,
            shots = summary.shots,
            made = summary.made,
            safeties = summary.safeties,
            fouls = summary.fouls,
            average_time = summary.average_time,
            "Player history handed off"
        );
    }
}

/// Profile sink that keeps every hand-off in memory
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryProfileSink {
    records: Arc<Mutex<Vec<(Uuid, PlayerHistory)>>>,
}

#[cfg(test)]
impl MemoryProfileSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<(Uuid, PlayerHistory)> {
        self.records.lock().clone()
    }

    /// Everything recorded for one player name
    pub fn for_name(&self, name: &str) -> Vec<PlayerHistory> {
        self.records
            .lock()
            .iter()
            .filter(|(_, history)| history.name == name)
            .map(|(_, history)| history.clone())
            .collect()
    }
}

#[cfg(test)]
impl ProfileSink for MemoryProfileSink {
    fn record(&self, session_id: Uuid, history: &PlayerHistory) {
        self.records.lock().push((session_id, history.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::PlayerId;

    #[test]
    fn memory_sink_filters_by_name() {
        let sink = MemoryProfileSink::new();
        let session = Uuid::new_v4();
        for name in ["Efren", "Earl", "Efren"] {
            sink.record(
                session,
                &PlayerHistory {
                    player: PlayerId::One,
                    name: name.to_string(),
                    shots: Vec::new(),
                },
            );
        }
        assert_eq!(sink.records().len(), 3);
        assert_eq!(sink.for_name("Efren").len(), 2);
    }
}
