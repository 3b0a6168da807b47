//! Session actor and registry
//!
//! Each session owns one [`MatchEngine`] inside a tokio task. Operator
//! commands and shot clock ticks are serialized through the same loop.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::store::ProfileSink;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::clock::ShotClock;
use super::cues::CueSink;
use super::engine::{MatchCommand, MatchEngine};
use super::settings::{MatchSettings, SettingsError};
use super::snapshot::{MatchSnapshot, SnapshotPublisher};
use super::SessionInput;

const INPUT_QUEUE: usize = 64;
const EVENT_QUEUE: usize = 64;

/// The session task has stopped and accepts no more input
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("session {0} has ended")]
pub struct SessionEnded(pub Uuid);

/// Handle to communicate with a running session
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<SessionInput>,
    pub events_tx: broadcast::Sender<ServerMsg>,
    latest: Arc<RwLock<MatchSnapshot>>,
}

impl SessionHandle {
    /// Latest published snapshot
    pub fn snapshot(&self) -> MatchSnapshot {
        self.latest.read().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.events_tx.subscribe()
    }

    /// Queue a client message for the session loop
    pub async fn send(&self, client_id: Option<Uuid>, msg: ClientMsg) -> Result<(), SessionEnded> {
        let input = SessionInput {
            client_id,
            msg,
            received_at: unix_millis(),
        };
        self.input_tx
            .send(input)
            .await
            .map_err(|_| SessionEnded(self.id))
    }
}

/// A scorekeeping session: the engine, its shot clock and its subscribers
pub struct MatchSession {
    id: Uuid,
    engine: MatchEngine,
    clock: ShotClock,
    input_rx: mpsc::Receiver<SessionInput>,
    publisher: SnapshotPublisher,
    cue_sink: Arc<dyn CueSink>,
    profile_sink: Arc<dyn ProfileSink>,
}

impl MatchSession {
    pub fn new(
        id: Uuid,
        settings: MatchSettings,
        tick_period: Duration,
        cue_sink: Arc<dyn CueSink>,
        profile_sink: Arc<dyn ProfileSink>,
    ) -> (Self, SessionHandle) {
        let (input_tx, input_rx) = mpsc::channel(INPUT_QUEUE);
        let (events_tx, _) = broadcast::channel(EVENT_QUEUE);

        let engine = MatchEngine::new(settings);
        let publisher = SnapshotPublisher::new(&engine, events_tx.clone());
        let handle = SessionHandle {
            id,
            input_tx,
            events_tx,
            latest: publisher.latest(),
        };

        let session = Self {
            id,
            engine,
            clock: ShotClock::new(tick_period),
            input_rx,
            publisher,
            cue_sink,
            profile_sink,
        };

        (session, handle)
    }

    /// Run the session loop until it is ended. The registry holds a handle
    /// for as long as the task runs, so the input channel never closes first.
    pub async fn run(mut self) {
        info!(session_id = %self.id, "Session started");

        loop {
            tokio::select! {
                input = self.input_rx.recv() => match input {
                    Some(input) => {
                        if !self.handle_input(input) {
                            break;
                        }
                    }
                    None => break,
                },
                _ = self.clock.tick() => {
                    self.apply(MatchCommand::Tick);
                }
            }
        }

        for history in self.engine.handoff() {
            self.profile_sink.record(self.id, &history);
        }
        self.publisher
            .send(ServerMsg::SessionClosed { session_id: self.id });

        info!(
            session_id = %self.id,
            shots = self.engine.state().shot_history.len(),
            "Session ended"
        );
    }

    /// Process one client message. Returns false when the session should end.
    fn handle_input(&mut self, input: SessionInput) -> bool {
        debug!(
            session_id = %self.id,
            client_id = ?input.client_id,
            received_at = input.received_at,
            msg = ?input.msg,
            "Session input"
        );

        match input.msg {
            ClientMsg::EndSession => return false,
            ClientMsg::Ping { t } => self.publisher.send(ServerMsg::Pong { t }),
            msg => {
                if let Some(command) = msg.into_command() {
                    self.apply(command);
                }
            }
        }
        true
    }

    fn apply(&mut self, command: MatchCommand) {
        let is_tick = command == MatchCommand::Tick;

        match self.engine.apply(command) {
            Ok(effects) => {
                if is_tick {
                    self.publisher.publish_clock(&self.engine);
                } else {
                    self.publisher.publish(&self.engine);
                }
                for cue in effects.cues {
                    self.cue_sink.notify(self.id, &cue);
                    self.publisher.send(ServerMsg::Cue { cue });
                }
                for history in &effects.handoffs {
                    self.profile_sink.record(self.id, history);
                }
            }
            Err(rejection) => {
                debug!(session_id = %self.id, reason = %rejection, "Command ignored");
            }
        }

        if let Some(running) = self.clock.sync(self.engine.state().clock_running()) {
            debug!(session_id = %self.id, running, "Shot clock toggled");
        }
    }
}

/// Registry of all active sessions
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<Uuid, SessionHandle>>,
    defaults: MatchSettings,
    tick_period: Duration,
    cue_sink: Arc<dyn CueSink>,
    profile_sink: Arc<dyn ProfileSink>,
}

impl SessionRegistry {
    pub fn new(
        defaults: MatchSettings,
        tick_period: Duration,
        cue_sink: Arc<dyn CueSink>,
        profile_sink: Arc<dyn ProfileSink>,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            defaults,
            tick_period,
            cue_sink,
            profile_sink,
        }
    }

    /// Spawn a new session with the given settings, or the server defaults
    pub fn create(&self, settings: Option<MatchSettings>) -> Result<SessionHandle, SettingsError> {
        let settings = settings.unwrap_or_else(|| self.defaults.clone()).validated()?;
        let id = Uuid::new_v4();
        let (session, handle) = MatchSession::new(
            id,
            settings,
            self.tick_period,
            self.cue_sink.clone(),
            self.profile_sink.clone(),
        );

        self.sessions.insert(id, handle.clone());
        let sessions = self.sessions.clone();
        let task = tokio::spawn(session.run());
        tokio::spawn(async move {
            if let Err(e) = task.await {
                error!(session_id = %id, error = %e, "Session task failed");
            }
            sessions.remove(&id);
        });

        info!(session_id = %id, "Session created");
        Ok(handle)
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Ask a session to end. Its history is handed off by the session task.
    pub async fn close(&self, id: &Uuid) -> Result<(), SessionEnded> {
        let handle = self.get(id).ok_or(SessionEnded(*id))?;
        handle.send(None, ClientMsg::EndSession).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::cues::{Cue, TracingCueSink};
    use crate::game::types::{GamePhase, ShotOutcome};
    use crate::store::MemoryProfileSink;

    fn registry(profiles: MemoryProfileSink) -> SessionRegistry {
        SessionRegistry::new(
            MatchSettings::default(),
            Duration::from_secs(1),
            Arc::new(TracingCueSink),
            Arc::new(profiles),
        )
    }

    async fn send_all(handle: &SessionHandle, msgs: Vec<ClientMsg>) {
        for msg in msgs {
            handle.send(None, msg).await.unwrap();
        }
    }

    /// Let the session task drain its queue
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn opening() -> Vec<ClientMsg> {
        vec![
            ClientMsg::StartMatch {
                p1_name: "Efren".into(),
                p2_name: "Earl".into(),
            },
            ClientMsg::ShotStruck,
            ClientMsg::RecordOutcome {
                outcome: ShotOutcome::BreakLegal,
            },
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn clock_counts_down_while_aiming() {
        let registry = registry(MemoryProfileSink::new());
        let handle = registry.create(None).unwrap();
        send_all(&handle, opening()).await;
        settle().await;
        assert_eq!(handle.snapshot().state.time_left, 75);
        assert!(handle.snapshot().clock_running);

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(handle.snapshot().state.time_left, 72);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_clock() {
        let registry = registry(MemoryProfileSink::new());
        let handle = registry.create(None).unwrap();
        send_all(&handle, opening()).await;
        settle().await;

        tokio::time::sleep(Duration::from_millis(2500)).await;
        handle.send(None, ClientMsg::TogglePause).await.unwrap();
        settle().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.snapshot().state.time_left, 73);

        handle.send(None, ClientMsg::TogglePause).await.unwrap();
        settle().await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(handle.snapshot().state.time_left, 72);
    }

    #[tokio::test(start_paused = true)]
    async fn clock_stops_once_shot_is_struck() {
        let registry = registry(MemoryProfileSink::new());
        let handle = registry.create(None).unwrap();
        send_all(&handle, opening()).await;
        settle().await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.send(None, ClientMsg::ShotStruck).await.unwrap();
        settle().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.state.phase, GamePhase::Assessing);
        assert_eq!(snapshot.state.time_left, 74);
        assert!(!snapshot.clock_running);
    }

    #[tokio::test(start_paused = true)]
    async fn subscribers_receive_cues_and_snapshots() {
        let registry = registry(MemoryProfileSink::new());
        let handle = registry.create(None).unwrap();
        let mut events = handle.subscribe();
        handle
            .send(
                None,
                ClientMsg::StartMatch {
                    p1_name: String::new(),
                    p2_name: String::new(),
                },
            )
            .await
            .unwrap();

        assert!(matches!(events.recv().await.unwrap(), ServerMsg::Snapshot { .. }));
        match events.recv().await.unwrap() {
            ServerMsg::Cue { cue } => assert_eq!(cue, Cue::MatchStarted),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn closing_hands_off_history() {
        let profiles = MemoryProfileSink::new();
        let registry = registry(profiles.clone());
        let handle = registry.create(None).unwrap();
        let mut events = handle.subscribe();
        send_all(&handle, opening()).await;

        registry.close(&handle.id).await.unwrap();
        loop {
            if let ServerMsg::SessionClosed { session_id } = events.recv().await.unwrap() {
                assert_eq!(session_id, handle.id);
                break;
            }
        }
        settle().await;

        assert_eq!(registry.active_sessions(), 0);
        let efren = profiles.for_name("Efren");
        assert_eq!(efren.len(), 1);
        assert_eq!(efren[0].shots[0].outcome, ShotOutcome::BreakLegal);
        assert!(handle.send(None, ClientMsg::Undo).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn session_outlives_dropped_handles() {
        let registry = registry(MemoryProfileSink::new());
        let id = {
            let handle = registry.create(None).unwrap();
            send_all(&handle, opening()).await;
            handle.id
        };
        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;

        let handle = registry.get(&id).unwrap();
        assert_eq!(handle.snapshot().state.shot_history.len(), 1);
        handle.send(None, ClientMsg::ShotStruck).await.unwrap();

        registry.close(&id).await.unwrap();
        settle().await;
        assert!(registry.get(&id).is_none());
    }

    #[tokio::test]
    async fn invalid_settings_refuse_session() {
        let registry = registry(MemoryProfileSink::new());
        let result = registry.create(Some(MatchSettings {
            shot_time: 0,
            ..Default::default()
        }));
        assert!(matches!(result, Err(SettingsError::ZeroShotTime)));
        assert_eq!(registry.active_sessions(), 0);
    }
}
