//! WebSocket protocol message definitions
//! These are the wire types for operator and display clients

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::cues::Cue;
use crate::game::engine::MatchCommand;
use crate::game::settings::MatchSettings;
use crate::game::snapshot::MatchSnapshot;
use crate::game::types::{PlayerId, ShotOutcome};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Start the match from setup
    StartMatch {
        #[serde(default)]
        p1_name: String,
        #[serde(default)]
        p2_name: String,
    },

    /// Cue ball struck, clock stops
    ShotStruck,

    UseExtension,

    /// Call a time foul on an expired clock
    CallTimeFoul,

    RecordOutcome {
        outcome: ShotOutcome,
    },

    /// Incoming player's answer to a push-out
    PushDecision {
        accept: bool,
    },

    NextRack {
        breaker: PlayerId,
    },

    UpdateSettings {
        settings: MatchSettings,
        /// New names; absent keeps the current players
        #[serde(default)]
        p1_name: Option<String>,
        #[serde(default)]
        p2_name: Option<String>,
    },

    TogglePause,

    Undo,

    /// Start over with default settings
    Reset,

    /// Close the session for everyone
    EndSession,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

impl ClientMsg {
    /// Engine command carried by this message, if any
    pub fn into_command(self) -> Option<MatchCommand> {
        let command = match self {
            Self::StartMatch { p1_name, p2_name } => MatchCommand::Start { p1_name, p2_name },
            Self::ShotStruck => MatchCommand::ShotStruck,
            Self::UseExtension => MatchCommand::UseExtension,
            Self::CallTimeFoul => MatchCommand::CallTimeFoul,
            Self::RecordOutcome { outcome } => MatchCommand::RecordOutcome(outcome),
            Self::PushDecision { accept } => MatchCommand::PushDecision { accept },
            Self::NextRack { breaker } => MatchCommand::NextRack { breaker },
            Self::UpdateSettings {
                settings,
                p1_name,
                p2_name,
            } => MatchCommand::UpdateSettings {
                settings,
                p1_name,
                p2_name,
            },
            Self::TogglePause => MatchCommand::TogglePause,
            Self::Undo => MatchCommand::Undo,
            Self::Reset => MatchCommand::Reset,
            Self::EndSession | Self::Ping { .. } => return None,
        };
        Some(command)
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        session_id: Uuid,
        server_time: u64,
    },

    /// Full match state, sent on connect and after every change
    Snapshot {
        snapshot: Box<MatchSnapshot>,
    },

    /// Clock-only update, sent once per tick
    Clock {
        time_left: i32,
        total_time_for_shot: i32,
    },

    /// Audio/speech cue for displays that announce
    Cue {
        cue: Cue,
    },

    /// Session ended, no further messages follow
    SessionClosed {
        session_id: Uuid,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_outcome_message() {
        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"record_outcome","outcome":"EARLY_8_LOSS"}"#).unwrap();
        assert_eq!(
            msg.into_command(),
            Some(MatchCommand::RecordOutcome(ShotOutcome::Early8Loss))
        );
    }

    #[test]
    fn parses_partial_settings_update() {
        let msg: ClientMsg = serde_json::from_str(
            r#"{"type":"update_settings","settings":{"format":"SET","target":3}}"#,
        )
        .unwrap();
        match msg {
            ClientMsg::UpdateSettings {
                settings, p1_name, ..
            } => {
                assert_eq!(settings.target, 3);
                assert_eq!(settings.shot_time, 60);
                assert_eq!(p1_name, None);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn start_names_default_to_blank() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"start_match"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMsg::StartMatch {
                p1_name: String::new(),
                p2_name: String::new()
            }
        );
    }

    #[test]
    fn session_messages_carry_no_command() {
        assert_eq!(ClientMsg::EndSession.into_command(), None);
        assert_eq!(ClientMsg::Ping { t: 5 }.into_command(), None);
    }

    #[test]
    fn server_messages_are_tagged() {
        let json = serde_json::to_value(ServerMsg::Cue {
            cue: Cue::Countdown { seconds: 3 },
        })
        .unwrap();
        assert_eq!(json["type"], "cue");
        assert_eq!(json["cue"]["kind"], "countdown");
        assert_eq!(json["cue"]["seconds"], 3);
    }
}
