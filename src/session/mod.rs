//! Interview session management
//!
//! This module provides the `SessionController` that manages:
//! - The connection lifecycle (idle, connecting, active, closing, error)
//! - Routing captured media to the live connection
//! - Routing synthesized speech to the playback scheduler
//! - The observable session view (state, speaking flag, error, logs)

mod config;
mod controller;
mod events;
mod outbound;
mod state;
mod stats;

pub use config::{interviewer_instruction, SessionConfig};
pub use controller::{SessionController, SessionHandle};
pub use events::{EventSink, OpenedConnection, SessionEvent, SessionEventKind, SessionId};
pub use outbound::OutboundDispatcher;
pub use state::{ConnectionState, SessionView};
pub use stats::SessionStats;
