//! Fire-and-forget notifications for the audio/speech collaborator

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::types::PlayerId;

/// Something a display or speaker may want to announce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cue {
    MatchStarted,
    /// Table is set for the next shot
    ShotReady,
    ThirtySeconds,
    TenSeconds,
    /// Final seconds (5..=1)
    Countdown { seconds: u32 },
    TimeViolation,
    Extension { player: PlayerId },
    TurnChange { player: PlayerId },
}

/// Receiver of cues. Implementations must not block; the session does not
/// wait on or check the result of a notification.
pub trait CueSink: Send + Sync {
    fn notify(&self, session_id: Uuid, cue: &Cue);
}

/// Cue sink that only records cues in the trace log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCueSink;

impl CueSink for TracingCueSink {
    fn notify(&self, session_id: Uuid, cue: &Cue) {
        debug!(session_id = %session_id, cue = ?cue, "Cue");
    }
}
