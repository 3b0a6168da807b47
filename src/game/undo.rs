//! Undo of the most recent recorded shot

use tracing::debug;

use super::engine::{Effects, MatchEngine, Rejection};
use super::settings::clock_seconds;
use super::types::{GamePhase, PlayerId, SafetyResult};

impl MatchEngine {
    /// Pop the last shot and return to ASSESSING so the operator can record
    /// the outcome again. Repeated calls walk back through the history.
    pub(super) fn undo(&mut self) -> Result<Effects, Rejection> {
        let settings = &self.settings;
        let state = &mut self.state;
        let shot = state.shot_history.pop().ok_or(Rejection::EmptyHistory)?;
        let before = shot.before;

        if let Some(winner) = shot.outcome.rack_winner(shot.player) {
            state.scores[winner] = state.scores[winner].saturating_sub(1);
        }

        // Undo straight after next-rack lands back in the previous rack
        state.current_rack = shot.rack;
        state.fouls = before.fouls;
        state.extensions_remaining = before.extensions_remaining;
        if shot.extension_used {
            state.extensions_remaining[shot.player] += 1;
        }
        for player in [PlayerId::One, PlayerId::Two] {
            let remaining = &mut state.extensions_remaining[player];
            *remaining = (*remaining).min(settings.extensions_allowed);
        }

        state.pending_safety_index = None;
        if let Some(index) = shot.resolved_safety {
            if let Some(safety) = state.shot_history.get_mut(index) {
                safety.safety_result = Some(SafetyResult::Pending);
                state.pending_safety_index = Some(index);
            }
        }

        state.is_break_prep = before.break_prep;
        state.is_first_shot_after_break = before.first_after_break;
        state.is_first_shot_of_inning = before.first_of_inning;

        let budget = if state.is_break_prep {
            settings.shot_time
        } else {
            settings.next_shot_time(state.is_first_shot_after_break)
        };
        let total = budget.max(shot.time_used);
        state.total_time_for_shot = clock_seconds(total);
        state.time_left = clock_seconds(total - shot.time_used);

        state.current_player = shot.player;
        state.is_extension_active = false;
        state.is_paused = false;
        state.winner = None;
        state.phase = GamePhase::Assessing;

        debug!(
            player = %shot.player,
            outcome = ?shot.outcome,
            rack = state.current_rack,
            "Shot undone"
        );
        Ok(Effects::default())
    }
}
