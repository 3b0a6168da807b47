//! Match state machine
//!
//! [`MatchEngine::apply`] is the only way to change a match. Every command is
//! either applied completely or rejected with the state untouched; callers
//! treat a [`Rejection`] as an ignored tap.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::clock::threshold_cue;
use super::cues::Cue;
use super::rules;
use super::settings::{clock_seconds, MatchSettings, SettingsError};
use super::types::{
    GamePhase, PerPlayer, PlayerHistory, PlayerId, SafetyResult, ShotContext, ShotEvent,
    ShotOutcome,
};

const DEFAULT_NAMES: [&str; 2] = ["Player 1", "Player 2"];

/// Input events accepted by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum MatchCommand {
    Start {
        p1_name: String,
        p2_name: String,
    },
    ShotStruck,
    UseExtension,
    CallTimeFoul,
    RecordOutcome(ShotOutcome),
    PushDecision {
        accept: bool,
    },
    NextRack {
        breaker: PlayerId,
    },
    UpdateSettings {
        settings: MatchSettings,
        p1_name: Option<String>,
        p2_name: Option<String>,
    },
    TogglePause,
    Undo,
    Reset,
    /// One second of shot clock elapsed
    Tick,
}

/// Reason a command was ignored
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("not allowed during {0:?}")]
    WrongPhase(GamePhase),

    #[error("clock is paused")]
    Paused,

    #[error("break shot is not timed")]
    BreakPrep,

    #[error("an extension is already active")]
    ExtensionActive,

    #[error("{0} has no extensions left")]
    NoExtensions(PlayerId),

    #[error("shot clock still shows {0}s")]
    ClockNotExpired(i32),

    #[error("shot clock is not running")]
    ClockIdle,

    #[error("{0:?} is assigned by the rules and cannot be recorded")]
    DerivedOutcome(ShotOutcome),

    #[error("nothing to undo")]
    EmptyHistory,

    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] SettingsError),
}

/// Side effects of an applied command, for the session to dispatch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    pub cues: Vec<Cue>,
    /// Per-player history slices leaving the engine
    pub handoffs: Vec<PlayerHistory>,
}

impl Effects {
    fn cue(cue: Cue) -> Self {
        Self {
            cues: vec![cue],
            ..Default::default()
        }
    }
}

/// Mutable match state, owned by one [`MatchEngine`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub phase: GamePhase,
    pub current_player: PlayerId,
    /// Seconds left on the shot clock (ticks do not clamp at zero)
    pub time_left: i32,
    pub total_time_for_shot: i32,
    pub is_paused: bool,
    pub is_break_prep: bool,
    pub is_first_shot_after_break: bool,
    pub is_extension_active: bool,
    pub is_first_shot_of_inning: bool,
    pub names: PerPlayer<String>,
    pub scores: PerPlayer<u32>,
    pub current_rack: u32,
    pub extensions_remaining: PerPlayer<u32>,
    /// Consecutive fouls in the current rack
    pub fouls: PerPlayer<u32>,
    pub winner: Option<PlayerId>,
    pub shot_history: Vec<ShotEvent>,
    pub pending_safety_index: Option<usize>,
}

impl MatchState {
    pub fn new(settings: &MatchSettings) -> Self {
        Self {
            phase: GamePhase::Setup,
            current_player: settings.breaking_player,
            time_left: clock_seconds(settings.shot_time),
            total_time_for_shot: clock_seconds(settings.shot_time),
            is_paused: false,
            is_break_prep: true,
            is_first_shot_after_break: false,
            is_extension_active: false,
            is_first_shot_of_inning: true,
            names: PerPlayer::new(DEFAULT_NAMES[0].to_string(), DEFAULT_NAMES[1].to_string()),
            scores: PerPlayer::splat(0),
            current_rack: 1,
            extensions_remaining: PerPlayer::splat(settings.extensions_allowed),
            fouls: PerPlayer::splat(0),
            winner: None,
            shot_history: Vec::new(),
            pending_safety_index: None,
        }
    }

    /// Whether the shot clock should be counting down
    pub fn clock_running(&self) -> bool {
        self.phase == GamePhase::Aiming && !self.is_paused && !self.is_break_prep
    }

    fn reset_clock(&mut self, seconds: u32) {
        self.time_left = clock_seconds(seconds);
        self.total_time_for_shot = clock_seconds(seconds);
        self.is_extension_active = false;
    }
}

/// The match state machine
#[derive(Debug, Clone)]
pub struct MatchEngine {
    pub(super) settings: MatchSettings,
    /// Settings restored on reset
    pub(super) defaults: MatchSettings,
    pub(super) state: MatchState,
}

impl MatchEngine {
    pub fn new(settings: MatchSettings) -> Self {
        let settings = settings.normalized();
        Self {
            state: MatchState::new(&settings),
            defaults: settings.clone(),
            settings,
        }
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Apply one command. On rejection the state is unchanged.
    pub fn apply(&mut self, command: MatchCommand) -> Result<Effects, Rejection> {
        let mut effects = match command {
            MatchCommand::Start { p1_name, p2_name } => self.start(p1_name, p2_name),
            MatchCommand::ShotStruck => self.shot_struck(),
            MatchCommand::UseExtension => self.use_extension(),
            MatchCommand::CallTimeFoul => self.call_time_foul(),
            MatchCommand::RecordOutcome(outcome) => self.record_outcome(outcome),
            MatchCommand::PushDecision { accept } => self.push_decision(accept),
            MatchCommand::NextRack { breaker } => self.next_rack(breaker),
            MatchCommand::UpdateSettings {
                settings,
                p1_name,
                p2_name,
            } => self.update_settings(settings, p1_name, p2_name),
            MatchCommand::TogglePause => self.toggle_pause(),
            MatchCommand::Undo => self.undo(),
            MatchCommand::Reset => Ok(self.reset()),
            MatchCommand::Tick => self.tick(),
        }?;

        if !self.settings.audio_enabled {
            effects.cues.clear();
        }
        Ok(effects)
    }

    /// Split the shot history into per-player slices
    pub fn handoff(&self) -> Vec<PlayerHistory> {
        [PlayerId::One, PlayerId::Two]
            .into_iter()
            .filter_map(|player| {
                let shots: Vec<ShotEvent> = self
                    .state
                    .shot_history
                    .iter()
                    .filter(|shot| shot.player == player)
                    .cloned()
                    .collect();
                (!shots.is_empty()).then(|| PlayerHistory {
                    player,
                    name: self.state.names[player].clone(),
                    shots,
                })
            })
            .collect()
    }

    fn expect_phase(&self, phase: GamePhase) -> Result<(), Rejection> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(Rejection::WrongPhase(self.state.phase))
        }
    }

    fn start(&mut self, p1_name: String, p2_name: String) -> Result<Effects, Rejection> {
        self.expect_phase(GamePhase::Setup)?;

        let mut state = MatchState::new(&self.settings);
        state.phase = GamePhase::Aiming;
        state.names = PerPlayer::new(
            name_or_default(p1_name, DEFAULT_NAMES[0]),
            name_or_default(p2_name, DEFAULT_NAMES[1]),
        );
        self.state = state;

        debug!(breaker = %self.state.current_player, "Match started");
        Ok(Effects::cue(Cue::MatchStarted))
    }

    fn shot_struck(&mut self) -> Result<Effects, Rejection> {
        self.expect_phase(GamePhase::Aiming)?;
        self.state.phase = GamePhase::Assessing;
        Ok(Effects::default())
    }

    fn use_extension(&mut self) -> Result<Effects, Rejection> {
        self.expect_phase(GamePhase::Aiming)?;
        let state = &mut self.state;
        if state.is_paused {
            return Err(Rejection::Paused);
        }
        if state.is_break_prep {
            return Err(Rejection::BreakPrep);
        }
        if state.is_extension_active {
            return Err(Rejection::ExtensionActive);
        }
        let player = state.current_player;
        if state.extensions_remaining[player] == 0 {
            return Err(Rejection::NoExtensions(player));
        }

        let extra = clock_seconds(self.settings.extension_time);
        state.time_left = state.time_left.saturating_add(extra);
        state.total_time_for_shot = state.total_time_for_shot.saturating_add(extra);
        state.extensions_remaining[player] -= 1;
        state.is_extension_active = true;

        Ok(Effects::cue(Cue::Extension { player }))
    }

    fn call_time_foul(&mut self) -> Result<Effects, Rejection> {
        self.expect_phase(GamePhase::Aiming)?;
        if self.state.time_left > 0 {
            return Err(Rejection::ClockNotExpired(self.state.time_left));
        }
        Ok(self.resolve_shot(ShotOutcome::TimeFoul))
    }

    fn record_outcome(&mut self, outcome: ShotOutcome) -> Result<Effects, Rejection> {
        self.expect_phase(GamePhase::Assessing)?;
        if outcome == ShotOutcome::ThreeFoulLoss {
            return Err(Rejection::DerivedOutcome(outcome));
        }
        Ok(self.resolve_shot(outcome))
    }

    /// Record a called outcome and advance the match
    fn resolve_shot(&mut self, called: ShotOutcome) -> Effects {
        let settings = &self.settings;
        let state = &mut self.state;
        let shooter = state.current_player;
        let was_break = state.is_break_prep;
        let time_used = if was_break {
            0
        } else {
            (state.total_time_for_shot - state.time_left).max(0) as u32
        };

        let mut resolved_safety = None;
        if let Some(index) = state.pending_safety_index.take() {
            if let Some(safety) = state.shot_history.get_mut(index) {
                safety.safety_result = Some(SafetyResult::judge(called));
                resolved_safety = Some(index);
            }
        }

        let ruling = rules::rule(
            called,
            shooter,
            state.fouls[shooter],
            settings.three_foul_rule,
        );

        state.shot_history.push(ShotEvent {
            id: Uuid::new_v4(),
            player: shooter,
            outcome: ruling.outcome,
            timestamp: Utc::now(),
            time_used,
            extension_used: state.is_extension_active,
            safety_result: (ruling.outcome == ShotOutcome::Safety).then_some(SafetyResult::Pending),
            rack: state.current_rack,
            resolved_safety,
            before: ShotContext {
                fouls: state.fouls,
                extensions_remaining: state.extensions_remaining,
                break_prep: was_break,
                first_after_break: state.is_first_shot_after_break,
                first_of_inning: state.is_first_shot_of_inning,
            },
        });

        state.fouls[shooter] = ruling.shooter_fouls;
        if let Some(rack_winner) = ruling.rack_winner {
            state.scores[rack_winner] += 1;
        }
        let match_winner = ruling
            .rack_winner
            .and_then(|_| rules::match_winner(settings, &state.scores));

        state.current_player = ruling.next_player;
        state.is_first_shot_of_inning = ruling.next_first_of_inning;
        state.is_first_shot_after_break = was_break && !called.is_foul();
        state.is_break_prep = false;
        state.is_paused = false;
        state.winner = match_winner;
        state.reset_clock(settings.next_shot_time(was_break));
        state.phase = if match_winner.is_some() {
            GamePhase::MatchOver
        } else if ruling.outcome.decides_rack() {
            GamePhase::RackOver
        } else if ruling.outcome == ShotOutcome::PushOut {
            GamePhase::PushDecision
        } else {
            GamePhase::Aiming
        };
        state.pending_safety_index = (ruling.outcome == ShotOutcome::Safety)
            .then(|| state.shot_history.len() - 1);

        debug!(
            player = %shooter,
            outcome = ?ruling.outcome,
            time_used,
            phase = ?state.phase,
            "Shot recorded"
        );

        let mut effects = Effects::default();
        if ruling.next_player != shooter {
            effects.cues.push(Cue::TurnChange {
                player: ruling.next_player,
            });
        }
        if state.phase == GamePhase::Aiming {
            effects.cues.push(Cue::ShotReady);
        }
        effects
    }

    fn push_decision(&mut self, accept: bool) -> Result<Effects, Rejection> {
        self.expect_phase(GamePhase::PushDecision)?;
        let state = &mut self.state;
        if !accept {
            state.current_player = state.current_player.opponent();
        }
        state.phase = GamePhase::Aiming;
        state.is_first_shot_after_break = false;
        state.is_first_shot_of_inning = true;
        state.is_paused = false;
        state.reset_clock(self.settings.shot_time);

        let mut effects = Effects::default();
        if !accept {
            effects.cues.push(Cue::TurnChange {
                player: state.current_player,
            });
        }
        effects.cues.push(Cue::ShotReady);
        Ok(effects)
    }

    fn next_rack(&mut self, breaker: PlayerId) -> Result<Effects, Rejection> {
        self.expect_phase(GamePhase::RackOver)?;
        let allowed = self.settings.extensions_allowed;
        let state = &mut self.state;
        state.phase = GamePhase::Aiming;
        state.current_player = breaker;
        state.current_rack += 1;
        state.is_break_prep = true;
        state.is_first_shot_after_break = false;
        state.is_first_shot_of_inning = true;
        state.is_paused = false;
        state.extensions_remaining = PerPlayer::splat(allowed);
        state.fouls = PerPlayer::splat(0);
        state.winner = None;
        state.pending_safety_index = None;
        state.reset_clock(self.settings.shot_time);

        debug!(rack = state.current_rack, breaker = %breaker, "Next rack");
        Ok(Effects::default())
    }

    fn update_settings(
        &mut self,
        settings: MatchSettings,
        p1_name: Option<String>,
        p2_name: Option<String>,
    ) -> Result<Effects, Rejection> {
        let settings = settings.validated()?;
        let mut effects = Effects::default();

        let names = PerPlayer::new(
            p1_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| self.state.names.one.clone()),
            p2_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| self.state.names.two.clone()),
        );
        if names != self.state.names {
            // New players start a fresh history
            effects.handoffs = self.handoff();
            self.state.shot_history.clear();
            self.state.pending_safety_index = None;
            self.state.names = names;
        }

        for player in [PlayerId::One, PlayerId::Two] {
            let remaining = &mut self.state.extensions_remaining[player];
            *remaining = (*remaining).min(settings.extensions_allowed);
        }
        self.settings = settings;

        if self.state.phase != GamePhase::Setup {
            self.state.winner = rules::match_winner(&self.settings, &self.state.scores);
            if self.state.winner.is_some() {
                self.state.phase = GamePhase::MatchOver;
            } else if self.state.phase == GamePhase::MatchOver {
                self.state.phase = GamePhase::RackOver;
            }
        }

        Ok(effects)
    }

    fn toggle_pause(&mut self) -> Result<Effects, Rejection> {
        if self.state.is_break_prep {
            return Err(Rejection::BreakPrep);
        }
        self.state.is_paused = !self.state.is_paused;
        Ok(Effects::default())
    }

    fn reset(&mut self) -> Effects {
        let effects = Effects {
            handoffs: self.handoff(),
            ..Default::default()
        };
        self.settings = self.defaults.clone();
        self.state = MatchState::new(&self.settings);
        effects
    }

    fn tick(&mut self) -> Result<Effects, Rejection> {
        if !self.state.clock_running() {
            return Err(Rejection::ClockIdle);
        }
        self.state.time_left -= 1;
        Ok(Effects {
            cues: threshold_cue(self.state.time_left).into_iter().collect(),
            ..Default::default()
        })
    }
}

fn name_or_default(name: String, default: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}
