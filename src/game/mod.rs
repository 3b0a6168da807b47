//! Match engine and session modules

pub mod clock;
pub mod cues;
pub mod engine;
pub mod rules;
pub mod session;
pub mod settings;
pub mod snapshot;
pub mod stats;
pub mod types;
mod undo;

pub use session::{SessionHandle, SessionRegistry};
pub use settings::{MatchSettings, SettingsError};
pub use snapshot::MatchSnapshot;
pub use stats::MatchStatistics;

use crate::ws::protocol::ClientMsg;
use uuid::Uuid;

/// Client message received from WebSocket or HTTP
#[derive(Debug, Clone)]
pub struct SessionInput {
    /// Connection that sent the message, `None` for HTTP requests
    pub client_id: Option<Uuid>,
    pub msg: ClientMsg,
    pub received_at: u64,
}
