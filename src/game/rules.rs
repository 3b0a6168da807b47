//! Scoring, foul and winner derivation

use super::settings::MatchSettings;
use super::types::{MatchFormat, PerPlayer, PlayerId, ShotOutcome};

/// Consecutive fouls that lose the rack under the three-foul rule
pub const FOUL_LIMIT: u32 = 3;

/// Finalized result of applying the rules to a called outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ruling {
    /// Outcome as recorded in the history
    pub outcome: ShotOutcome,
    pub rack_winner: Option<PlayerId>,
    /// Shooter's consecutive-foul count after this shot
    pub shooter_fouls: u32,
    /// Player at the table for the next shot
    pub next_player: PlayerId,
    pub next_first_of_inning: bool,
}

/// Apply foul bookkeeping, rule overrides and turn handoff to a called outcome.
///
/// `called` is never modified; a three-foul loss produces a new ruling whose
/// outcome is [`ShotOutcome::ThreeFoulLoss`].
pub fn rule(
    called: ShotOutcome,
    shooter: PlayerId,
    shooter_fouls: u32,
    three_foul_rule: bool,
) -> Ruling {
    let fouls = if called.is_foul() {
        shooter_fouls + 1
    } else if called.is_legal_pot() {
        0
    } else {
        shooter_fouls
    };

    let outcome = if three_foul_rule && called.is_foul() && fouls >= FOUL_LIMIT {
        ShotOutcome::ThreeFoulLoss
    } else {
        called
    };

    let (next_player, next_first_of_inning) = if outcome.keeps_turn() {
        (shooter, false)
    } else {
        (shooter.opponent(), true)
    };

    Ruling {
        outcome,
        rack_winner: outcome.rack_winner(shooter),
        shooter_fouls: fouls,
        next_player,
        next_first_of_inning,
    }
}

/// Match winner for the given scores, if the format has produced one.
///
/// Set format compares scores once the racks played (every rack has a winner)
/// reach the set size; a tie leaves the match open for a deciding rack.
pub fn match_winner(settings: &MatchSettings, scores: &PerPlayer<u32>) -> Option<PlayerId> {
    let leader = if scores.one > scores.two {
        Some(PlayerId::One)
    } else if scores.two > scores.one {
        Some(PlayerId::Two)
    } else {
        None
    };

    match settings.format {
        MatchFormat::Single => None,
        MatchFormat::Race => {
            if scores.one.max(scores.two) >= settings.target {
                leader
            } else {
                None
            }
        }
        MatchFormat::Set => {
            if scores.one + scores.two >= settings.target {
                leader
            } else {
                None
            }
        }
    }
}
