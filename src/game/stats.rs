//! Statistics derived from the shot history

use serde::Serialize;

use super::types::{PerPlayer, PlayerId, SafetyResult, ShotEvent, ShotOutcome};

/// Spread of the clock time used per shot (population statistics)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimingSummary {
    pub count: usize,
    pub min: u32,
    pub max: u32,
    pub mean: f64,
    pub std_dev: f64,
}

impl TimingSummary {
    pub fn from_times(times: &[u32]) -> Self {
        if times.is_empty() {
            return Self::default();
        }
        let count = times.len();
        let n = count as f64;
        let mean = times.iter().map(|&t| t as f64).sum::<f64>() / n;
        let variance = times
            .iter()
            .map(|&t| (t as f64 - mean).powi(2))
            .sum::<f64>()
            / n;

        Self {
            count,
            min: times.iter().copied().min().unwrap_or(0),
            max: times.iter().copied().max().unwrap_or(0),
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerStatistics {
    pub total_shots: usize,
    pub made: usize,
    pub missed: usize,
    pub safeties: usize,
    pub safety_successes: usize,
    pub fouls: usize,
    pub time_fouls: usize,
    /// Made shots over total shots, 0.0 with no shots
    pub potting_accuracy: f64,
    /// Successful safeties over judged safeties, `None` until one is judged
    pub safety_success_ratio: Option<f64>,
    /// Time used per shot, breaks included
    pub timing: TimingSummary,
}

impl PlayerStatistics {
    pub fn from_shots<'a>(shots: impl IntoIterator<Item = &'a ShotEvent>) -> Self {
        let mut stats = Self::default();
        let mut judged_safeties = 0;
        let mut times = Vec::new();

        for shot in shots {
            stats.total_shots += 1;
            match shot.outcome {
                ShotOutcome::Made | ShotOutcome::BreakLegal => stats.made += 1,
                outcome if outcome.is_miss() => stats.missed += 1,
                ShotOutcome::Safety => stats.safeties += 1,
                ShotOutcome::TimeFoul => stats.time_fouls += 1,
                _ => {}
            }
            if shot.outcome.is_foul() {
                stats.fouls += 1;
            }
            match shot.safety_result {
                Some(SafetyResult::Successful) => {
                    stats.safety_successes += 1;
                    judged_safeties += 1;
                }
                Some(SafetyResult::Unsuccessful | SafetyResult::Neutral) => judged_safeties += 1,
                _ => {}
            }
            times.push(shot.time_used);
        }

        if stats.total_shots > 0 {
            stats.potting_accuracy = stats.made as f64 / stats.total_shots as f64;
        }
        if judged_safeties > 0 {
            stats.safety_success_ratio =
                Some(stats.safety_successes as f64 / judged_safeties as f64);
        }
        stats.timing = TimingSummary::from_times(&times);
        stats
    }
}

/// Per-player statistics for a whole history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchStatistics {
    pub players: PerPlayer<PlayerStatistics>,
    pub total_shots: usize,
}

impl MatchStatistics {
    pub fn from_history(history: &[ShotEvent]) -> Self {
        let for_player = |player: PlayerId| {
            PlayerStatistics::from_shots(history.iter().filter(|shot| shot.player == player))
        };
        Self {
            players: PerPlayer::new(for_player(PlayerId::One), for_player(PlayerId::Two)),
            total_shots: history.len(),
        }
    }
}

/// Compact per-player summary handed to profile storage
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub shots: usize,
    /// Pots including rack wins
    pub made: usize,
    pub safeties: usize,
    pub fouls: usize,
    pub average_time: f64,
}

impl SessionSummary {
    pub fn from_shots(shots: &[ShotEvent]) -> Self {
        let made = shots
            .iter()
            .filter(|shot| shot.outcome.is_legal_pot() || shot.outcome == ShotOutcome::Win)
            .count();
        let times: Vec<u32> = shots.iter().map(|shot| shot.time_used).collect();
        Self {
            shots: shots.len(),
            made,
            safeties: shots
                .iter()
                .filter(|shot| shot.outcome == ShotOutcome::Safety)
                .count(),
            fouls: shots.iter().filter(|shot| shot.outcome.is_foul()).count(),
            average_time: TimingSummary::from_times(&times).mean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn shot(player: PlayerId, outcome: ShotOutcome, time_used: u32) -> ShotEvent {
        ShotEvent {
            id: Uuid::new_v4(),
            player,
            outcome,
            timestamp: Utc::now(),
            time_used,
            extension_used: false,
            safety_result: None,
            rack: 1,
            resolved_safety: None,
            before: Default::default(),
        }
    }

    #[test]
    fn timing_uses_population_deviation() {
        let timing = TimingSummary::from_times(&[2, 4, 4, 4, 5, 5, 7, 9]);
        assert_eq!(timing.count, 8);
        assert_eq!(timing.min, 2);
        assert_eq!(timing.max, 9);
        assert!((timing.mean - 5.0).abs() < 1e-9);
        assert!((timing.std_dev - 2.0).abs() < 1e-9);
    }

    #[test]
    fn empty_timing_is_zero() {
        assert_eq!(TimingSummary::from_times(&[]), TimingSummary::default());
    }

    #[test]
    fn counts_outcomes_per_player() {
        let mut safety = shot(PlayerId::One, ShotOutcome::Safety, 20);
        safety.safety_result = Some(SafetyResult::Successful);
        let mut neutral = shot(PlayerId::One, ShotOutcome::Safety, 10);
        neutral.safety_result = Some(SafetyResult::Neutral);
        let history = vec![
            shot(PlayerId::One, ShotOutcome::BreakLegal, 0),
            shot(PlayerId::One, ShotOutcome::Made, 10),
            safety,
            shot(PlayerId::Two, ShotOutcome::TimeFoul, 61),
            neutral,
            shot(PlayerId::Two, ShotOutcome::Missed, 30),
        ];

        let stats = MatchStatistics::from_history(&history);
        assert_eq!(stats.total_shots, 6);

        let one = &stats.players[PlayerId::One];
        assert_eq!(one.total_shots, 4);
        assert_eq!(one.made, 2);
        assert_eq!(one.safeties, 2);
        assert_eq!(one.safety_successes, 1);
        assert_eq!(one.safety_success_ratio, Some(0.5));
        assert!((one.potting_accuracy - 0.5).abs() < 1e-9);
        // Break shots count with the 0 s they record
        assert_eq!(one.timing.count, 4);
        assert_eq!(one.timing.min, 0);
        assert_eq!(one.timing.max, 20);

        let two = &stats.players[PlayerId::Two];
        assert_eq!(two.fouls, 1);
        assert_eq!(two.time_fouls, 1);
        assert_eq!(two.missed, 1);
        assert_eq!(two.safety_success_ratio, None);
        assert_eq!(two.timing.max, 61);
    }

    #[test]
    fn summary_counts_wins_as_made() {
        let shots = vec![
            shot(PlayerId::One, ShotOutcome::Made, 10),
            shot(PlayerId::One, ShotOutcome::Win, 20),
            shot(PlayerId::One, ShotOutcome::Foul, 30),
        ];
        let summary = SessionSummary::from_shots(&shots);
        assert_eq!(summary.shots, 3);
        assert_eq!(summary.made, 2);
        assert_eq!(summary.fouls, 1);
        assert!((summary.average_time - 20.0).abs() < 1e-9);
    }
}
