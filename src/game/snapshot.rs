//! Read-only match snapshots and their broadcast

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::ws::protocol::ServerMsg;

use super::engine::{MatchEngine, MatchState};
use super::settings::{clock_seconds, MatchSettings};
use super::types::{GamePhase, GameType};

/// Everything a display needs to render one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub settings: MatchSettings,
    #[serde(flatten)]
    pub state: MatchState,
    pub clock_running: bool,
    /// Clock is running and at or below the warning threshold
    pub in_warning: bool,
    pub push_out_available: bool,
    pub safety_available: bool,
}

impl MatchSnapshot {
    pub fn of(engine: &MatchEngine) -> Self {
        let settings = engine.settings();
        let state = engine.state();
        let clock_running = state.clock_running();
        Self {
            in_warning: clock_running && state.time_left <= clock_seconds(settings.warning_time),
            push_out_available: settings.game_type == GameType::Rotation
                && state.is_first_shot_after_break
                && state.phase == GamePhase::Assessing,
            safety_available: !state.is_break_prep,
            clock_running,
            settings: settings.clone(),
            state: state.clone(),
        }
    }
}

/// Keeps the latest snapshot readable and fans changes out to subscribers
pub struct SnapshotPublisher {
    latest: Arc<RwLock<MatchSnapshot>>,
    events_tx: broadcast::Sender<ServerMsg>,
}

impl SnapshotPublisher {
    pub fn new(engine: &MatchEngine, events_tx: broadcast::Sender<ServerMsg>) -> Self {
        Self {
            latest: Arc::new(RwLock::new(MatchSnapshot::of(engine))),
            events_tx,
        }
    }

    /// Shared handle to the latest snapshot
    pub fn latest(&self) -> Arc<RwLock<MatchSnapshot>> {
        self.latest.clone()
    }

    /// Publish a full snapshot after a state change
    pub fn publish(&self, engine: &MatchEngine) {
        let snapshot = MatchSnapshot::of(engine);
        *self.latest.write() = snapshot.clone();
        // No receivers is fine; displays come and go
        let _ = self.events_tx.send(ServerMsg::Snapshot {
            snapshot: Box::new(snapshot),
        });
    }

    /// Publish only the clock after a tick
    pub fn publish_clock(&self, engine: &MatchEngine) {
        let state = engine.state();
        {
            let mut latest = self.latest.write();
            latest.state.time_left = state.time_left;
            latest.state.total_time_for_shot = state.total_time_for_shot;
            latest.in_warning =
                latest.clock_running && state.time_left <= clock_seconds(engine.settings().warning_time);
        }
        let _ = self.events_tx.send(ServerMsg::Clock {
            time_left: state.time_left,
            total_time_for_shot: state.total_time_for_shot,
        });
    }

    pub fn send(&self, msg: ServerMsg) {
        let _ = self.events_tx.send(msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::engine::tests::{shoot, started};
    use crate::game::engine::MatchCommand;
    use crate::game::types::ShotOutcome;

    #[test]
    fn push_out_offered_only_after_break() {
        let mut engine = started(MatchSettings {
            game_type: GameType::Rotation,
            ..Default::default()
        });
        shoot(&mut engine, ShotOutcome::BreakLegal);
        engine.apply(MatchCommand::ShotStruck).unwrap();
        assert!(MatchSnapshot::of(&engine).push_out_available);

        engine
            .apply(MatchCommand::RecordOutcome(ShotOutcome::Made))
            .unwrap();
        engine.apply(MatchCommand::ShotStruck).unwrap();
        assert!(!MatchSnapshot::of(&engine).push_out_available);
    }

    #[test]
    fn safety_unavailable_on_break() {
        let engine = started(MatchSettings::default());
        let snapshot = MatchSnapshot::of(&engine);
        assert!(!snapshot.safety_available);
        assert!(!snapshot.clock_running);
    }

    #[test]
    fn warning_follows_threshold() {
        let mut engine = started(MatchSettings {
            first_shot_bonus: 0,
            ..Default::default()
        });
        shoot(&mut engine, ShotOutcome::BreakLegal);
        for _ in 0..49 {
            engine.apply(MatchCommand::Tick).unwrap();
        }
        assert!(!MatchSnapshot::of(&engine).in_warning);
        engine.apply(MatchCommand::Tick).unwrap();
        assert!(MatchSnapshot::of(&engine).in_warning);
    }

    #[test]
    fn snapshot_serializes_flat() {
        let engine = started(MatchSettings::default());
        let json = serde_json::to_value(MatchSnapshot::of(&engine)).unwrap();
        assert_eq!(json["phase"], "AIMING");
        assert_eq!(json["time_left"], 60);
        assert_eq!(json["settings"]["shot_time"], 60);
        assert_eq!(json["names"]["one"], "Efren");
    }

    #[tokio::test]
    async fn publisher_broadcasts_clock() {
        let mut engine = started(MatchSettings::default());
        let (tx, mut rx) = broadcast::channel(8);
        let publisher = SnapshotPublisher::new(&engine, tx);
        shoot(&mut engine, ShotOutcome::BreakLegal);
        publisher.publish(&engine);
        engine.apply(MatchCommand::Tick).unwrap();
        publisher.publish_clock(&engine);

        assert!(matches!(rx.recv().await.unwrap(), ServerMsg::Snapshot { .. }));
        match rx.recv().await.unwrap() {
            ServerMsg::Clock { time_left, .. } => assert_eq!(time_left, 74),
            other => panic!("unexpected message: {other:?}"),
        }
        assert_eq!(publisher.latest().read().state.time_left, 74);
    }
}
