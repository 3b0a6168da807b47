//! Core match vocabulary: players, phases, outcomes and shot records

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the two players at the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    pub fn opponent(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::One
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => f.write_str("ONE"),
            Self::Two => f.write_str("TWO"),
        }
    }
}

impl FromStr for PlayerId {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one" | "1" | "p1" => Ok(Self::One),
            "two" | "2" | "p2" => Ok(Self::Two),
            _ => Err(ParseEnumError::new("player", s)),
        }
    }
}

/// A value stored once per player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerPlayer<T> {
    pub one: T,
    pub two: T,
}

impl<T> PerPlayer<T> {
    pub fn new(one: T, two: T) -> Self {
        Self { one, two }
    }
}

impl<T: Clone> PerPlayer<T> {
    pub fn splat(value: T) -> Self {
        Self {
            one: value.clone(),
            two: value,
        }
    }
}

impl<T> Index<PlayerId> for PerPlayer<T> {
    type Output = T;

    fn index(&self, player: PlayerId) -> &T {
        match player {
            PlayerId::One => &self.one,
            PlayerId::Two => &self.two,
        }
    }
}

impl<T> IndexMut<PlayerId> for PerPlayer<T> {
    fn index_mut(&mut self, player: PlayerId) -> &mut T {
        match player {
            PlayerId::One => &mut self.one,
            PlayerId::Two => &mut self.two,
        }
    }
}

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    /// Waiting for the operator to start a match
    Setup,
    /// A player is lining up a shot
    Aiming,
    /// Shot struck, waiting for the operator to record the outcome
    Assessing,
    /// Incoming player chooses whether to take the table after a push-out
    PushDecision,
    /// Rack decided, waiting for the next break
    RackOver,
    /// Match decided
    MatchOver,
}

/// Rule set being played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameType {
    EightBall,
    /// Nine-ball, ten-ball and other rotation games (push-out allowed)
    Rotation,
}

impl Default for GameType {
    fn default() -> Self {
        Self::EightBall
    }
}

impl FromStr for GameType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "eight_ball" | "8_ball" | "8ball" => Ok(Self::EightBall),
            "rotation" | "nine_ball" | "9_ball" | "9ball" => Ok(Self::Rotation),
            _ => Err(ParseEnumError::new("game type", s)),
        }
    }
}

/// How racks add up to a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchFormat {
    /// One game at a time, no match winner
    Single,
    /// First to `target` racks
    Race,
    /// Fixed number of racks, most racks won
    Set,
}

impl Default for MatchFormat {
    fn default() -> Self {
        Self::Single
    }
}

impl FromStr for MatchFormat {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "race" => Ok(Self::Race),
            "set" => Ok(Self::Set),
            _ => Err(ParseEnumError::new("match format", s)),
        }
    }
}

/// Result of a single shot as called by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShotOutcome {
    Made,
    Missed,
    Safety,
    Foul,
    BreakLegal,
    BreakDry,
    BreakFoul,
    TimeFoul,
    Win,
    #[serde(rename = "EARLY_8_LOSS")]
    Early8Loss,
    PushOut,
    /// Assigned by the three-foul rule, never called directly
    ThreeFoulLoss,
}

impl ShotOutcome {
    /// Fouls that count towards the consecutive-foul total
    pub fn is_foul(self) -> bool {
        matches!(
            self,
            Self::Foul | Self::TimeFoul | Self::BreakFoul | Self::ThreeFoulLoss
        )
    }

    /// A legal pot keeps the shooter at the table and clears their fouls
    pub fn is_legal_pot(self) -> bool {
        matches!(self, Self::Made | Self::BreakLegal)
    }

    pub fn is_miss(self) -> bool {
        matches!(self, Self::Missed | Self::BreakDry)
    }

    /// Outcomes that end the rack
    pub fn decides_rack(self) -> bool {
        matches!(self, Self::Win | Self::Early8Loss | Self::ThreeFoulLoss)
    }

    /// Outcomes after which the same player shoots again
    pub fn keeps_turn(self) -> bool {
        matches!(
            self,
            Self::Made | Self::BreakLegal | Self::Win | Self::Early8Loss | Self::ThreeFoulLoss
        )
    }

    /// Winner of the rack when `shooter` produced this outcome
    pub fn rack_winner(self, shooter: PlayerId) -> Option<PlayerId> {
        match self {
            Self::Win => Some(shooter),
            Self::Early8Loss | Self::ThreeFoulLoss => Some(shooter.opponent()),
            _ => None,
        }
    }
}

/// Retroactive judgement of a safety, made by the opponent's next shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyResult {
    Pending,
    Successful,
    Unsuccessful,
    Neutral,
}

impl SafetyResult {
    /// Judge a pending safety by the raw outcome of the shot that followed it
    pub fn judge(next: ShotOutcome) -> Self {
        if next.is_foul() {
            Self::Successful
        } else if next.is_legal_pot() {
            Self::Unsuccessful
        } else {
            Self::Neutral
        }
    }
}

/// A recorded shot. Immutable once appended except for `safety_result`,
/// which the following shot fills in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotEvent {
    pub id: Uuid,
    pub player: PlayerId,
    pub outcome: ShotOutcome,
    pub timestamp: DateTime<Utc>,
    /// Seconds of the shot clock consumed (0 for break shots)
    pub time_used: u32,
    pub extension_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_result: Option<SafetyResult>,
    pub rack: u32,
    /// History index of the safety this shot judged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_safety: Option<usize>,
    /// Rack state just before this shot was recorded
    #[serde(default)]
    pub before: ShotContext,
}

/// Per-rack counters and flags captured with each shot, restored by undo
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotContext {
    pub fouls: PerPlayer<u32>,
    pub extensions_remaining: PerPlayer<u32>,
    pub break_prep: bool,
    pub first_after_break: bool,
    pub first_of_inning: bool,
}

/// One player's slice of the shot history, handed to the profile collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerHistory {
    pub player: PlayerId,
    pub name: String,
    pub shots: Vec<ShotEvent>,
}

/// Error parsing one of the match enums from configuration text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized {kind}: {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_is_judged_by_the_following_shot() {
        assert_eq!(SafetyResult::judge(ShotOutcome::Foul), SafetyResult::Successful);
        assert_eq!(SafetyResult::judge(ShotOutcome::TimeFoul), SafetyResult::Successful);
        assert_eq!(SafetyResult::judge(ShotOutcome::BreakFoul), SafetyResult::Successful);
        assert_eq!(SafetyResult::judge(ShotOutcome::Made), SafetyResult::Unsuccessful);
        assert_eq!(SafetyResult::judge(ShotOutcome::BreakLegal), SafetyResult::Unsuccessful);
        assert_eq!(SafetyResult::judge(ShotOutcome::Missed), SafetyResult::Neutral);
        assert_eq!(SafetyResult::judge(ShotOutcome::Safety), SafetyResult::Neutral);
        assert_eq!(SafetyResult::judge(ShotOutcome::Win), SafetyResult::Neutral);
    }

    #[test]
    fn rack_winner_follows_outcome() {
        assert_eq!(ShotOutcome::Win.rack_winner(PlayerId::Two), Some(PlayerId::Two));
        assert_eq!(ShotOutcome::Early8Loss.rack_winner(PlayerId::Two), Some(PlayerId::One));
        assert_eq!(ShotOutcome::ThreeFoulLoss.rack_winner(PlayerId::One), Some(PlayerId::Two));
        assert_eq!(ShotOutcome::Foul.rack_winner(PlayerId::One), None);
    }

    #[test]
    fn outcomes_use_wire_names() {
        let json = serde_json::to_string(&ShotOutcome::Early8Loss).unwrap();
        assert_eq!(json, "\"EARLY_8_LOSS\"");
        let json = serde_json::to_string(&ShotOutcome::ThreeFoulLoss).unwrap();
        assert_eq!(json, "\"THREE_FOUL_LOSS\"");
        let parsed: ShotOutcome = serde_json::from_str("\"BREAK_LEGAL\"").unwrap();
        assert_eq!(parsed, ShotOutcome::BreakLegal);
    }

    #[test]
    fn per_player_indexing() {
        let mut scores = PerPlayer::splat(0u32);
        scores[PlayerId::Two] += 3;
        assert_eq!(scores, PerPlayer::new(0, 3));
        assert_eq!(scores[PlayerId::One.opponent()], 3);
    }

    #[test]
    fn parses_config_spellings() {
        assert_eq!("two".parse::<PlayerId>(), Ok(PlayerId::Two));
        assert_eq!("RACE".parse::<MatchFormat>(), Ok(MatchFormat::Race));
        assert_eq!("9-ball".parse::<GameType>(), Ok(GameType::Rotation));
        assert!("three".parse::<PlayerId>().is_err());
    }
}
