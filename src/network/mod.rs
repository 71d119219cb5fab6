//! Network Layer
//!
//! WebSocket server, session orchestration and storage.
//! This layer is **non-deterministic**; all outcome logic runs through
//! `game/` and `proof/`.

pub mod protocol;
pub mod server;
pub mod session;
pub mod store;

pub use protocol::{ClientMessage, ErrorCode, ServerError, ServerMessage};
pub use server::{ConfigError, GameServer, GameServerError, ServerConfig};
pub use session::{SessionError, SessionManager, SessionStart, TurnResolution};
pub use store::{InMemorySessionStore, SessionStore, StoreError};
