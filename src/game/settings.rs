//! Match settings consumed by the engine

use serde::{Deserialize, Serialize};

use super::types::{GameType, MatchFormat, PlayerId};

/// Upper bound for every per-shot duration, in seconds
pub const MAX_SECONDS: u32 = 3600;

/// Seconds as a clock value. Validated settings always fit.
pub fn clock_seconds(seconds: u32) -> i32 {
    i32::try_from(seconds).unwrap_or(i32::MAX)
}

/// Match configuration. Supplied by the operator's setup screen or by the
/// server defaults; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSettings {
    /// Seconds allowed per shot
    pub shot_time: u32,
    /// Seconds added by one extension
    pub extension_time: u32,
    /// Extensions each player may use per rack
    pub extensions_allowed: u32,
    /// Extra seconds for the first shot after the break
    pub first_shot_bonus: u32,
    /// Remaining seconds at which displays switch to a warning state
    pub warning_time: u32,
    /// Emit timer cues for the audio collaborator
    pub audio_enabled: bool,
    pub breaking_player: PlayerId,
    pub format: MatchFormat,
    /// Race length or set size (always 1 for single games)
    pub target: u32,
    pub game_type: GameType,
    /// Three consecutive fouls lose the rack
    pub three_foul_rule: bool,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            shot_time: 60,
            extension_time: 30,
            extensions_allowed: 1,
            first_shot_bonus: 15,
            warning_time: 10,
            audio_enabled: true,
            breaking_player: PlayerId::One,
            format: MatchFormat::Single,
            target: 1,
            game_type: GameType::EightBall,
            three_foul_rule: false,
        }
    }
}

impl MatchSettings {
    /// Enforce `target >= 1`, and `target == 1` for single games
    pub fn normalized(mut self) -> Self {
        self.target = match self.format {
            MatchFormat::Single => 1,
            MatchFormat::Race | MatchFormat::Set => self.target.max(1),
        };
        self
    }

    /// Check the settings and return their normalized form
    pub fn validated(self) -> Result<Self, SettingsError> {
        if self.shot_time == 0 {
            return Err(SettingsError::ZeroShotTime);
        }
        for (field, value) in [
            ("shot_time", self.shot_time),
            ("extension_time", self.extension_time),
            ("first_shot_bonus", self.first_shot_bonus),
        ] {
            if value > MAX_SECONDS {
                return Err(SettingsError::TooLong { field, value });
            }
        }
        if self.warning_time > self.next_shot_time(true) {
            return Err(SettingsError::WarningExceedsShotTime {
                warning_time: self.warning_time,
                shot_time: self.shot_time,
            });
        }
        Ok(self.normalized())
    }

    /// Clock budget for the shot following the one just completed
    pub fn next_shot_time(&self, after_break: bool) -> u32 {
        if after_break {
            self.shot_time.saturating_add(self.first_shot_bonus)
        } else {
            self.shot_time
        }
    }
}

/// Settings validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("shot time must be at least one second")]
    ZeroShotTime,

    #[error("warning time {warning_time}s exceeds the shot time {shot_time}s")]
    WarningExceedsShotTime { warning_time: u32, shot_time: u32 },

    #[error("{field} of {value}s exceeds the {MAX_SECONDS}s limit")]
    TooLong { field: &'static str, value: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_game_forces_target_one() {
        let settings = MatchSettings {
            format: MatchFormat::Single,
            target: 7,
            ..Default::default()
        }
        .normalized();
        assert_eq!(settings.target, 1);
    }

    #[test]
    fn zero_target_is_raised_to_one() {
        let settings = MatchSettings {
            format: MatchFormat::Race,
            target: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(settings.target, 1);
    }

    #[test]
    fn rejects_zero_shot_time() {
        let settings = MatchSettings {
            shot_time: 0,
            ..Default::default()
        };
        assert_eq!(settings.validated(), Err(SettingsError::ZeroShotTime));
    }

    #[test]
    fn rejects_durations_over_the_limit() {
        let settings = MatchSettings {
            extension_time: 3_000_000_000,
            ..Default::default()
        };
        assert_eq!(
            settings.validated(),
            Err(SettingsError::TooLong {
                field: "extension_time",
                value: 3_000_000_000
            })
        );

        let settings = MatchSettings {
            shot_time: u32::MAX,
            first_shot_bonus: 1,
            ..Default::default()
        };
        assert!(matches!(
            settings.validated(),
            Err(SettingsError::TooLong { field: "shot_time", .. })
        ));

        let settings = MatchSettings {
            shot_time: MAX_SECONDS,
            first_shot_bonus: MAX_SECONDS,
            ..Default::default()
        };
        assert_eq!(settings.next_shot_time(true), 2 * MAX_SECONDS);
        assert!(settings.validated().is_ok());
    }

    #[test]
    fn break_bonus_applies_only_after_break() {
        let settings = MatchSettings::default();
        assert_eq!(settings.next_shot_time(true), 75);
        assert_eq!(settings.next_shot_time(false), 60);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: MatchSettings =
            serde_json::from_str(r#"{"format":"RACE","target":5}"#).unwrap();
        assert_eq!(settings.format, MatchFormat::Race);
        assert_eq!(settings.target, 5);
        assert_eq!(settings.shot_time, 60);
    }
}
