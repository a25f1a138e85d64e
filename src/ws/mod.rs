//! WebSocket transport: protocol, connection hub and session lifecycle

pub mod handler;
pub mod hub;
pub mod protocol;
pub mod session;
