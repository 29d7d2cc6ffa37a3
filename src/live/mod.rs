//! Connection to the remote conversational model

pub mod client;
pub mod encoding;
pub mod messages;
pub mod transport;

pub use client::{GeminiLiveTransport, DEFAULT_ENDPOINT};
pub use encoding::{from_transport_text, to_transport_text};
pub use messages::{MediaChunk, ResponseModality, ServerMessage, SessionSetup};
pub use transport::{LiveConnection, LiveTransport, MediaSender};
