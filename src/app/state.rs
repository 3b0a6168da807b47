//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::cues::{CueSink, TracingCueSink};
use crate::game::SessionRegistry;
use crate::store::{ProfileSink, TracingProfileSink};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_sinks(config, Arc::new(TracingCueSink), Arc::new(TracingProfileSink))
    }

    /// State with explicit collaborators for cues and player profiles
    pub fn with_sinks(
        config: Config,
        cue_sink: Arc<dyn CueSink>,
        profile_sink: Arc<dyn ProfileSink>,
    ) -> Self {
        let config = Arc::new(config);
        let sessions = SessionRegistry::new(
            config.match_defaults.clone(),
            config.tick_period,
            cue_sink,
            profile_sink,
        );

        Self { config, sessions }
    }
}
