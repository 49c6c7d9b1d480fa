//! Library crate for beat-arena-back: real-time room, presence and battle
//! coordination for multiplayer rhythm games.

/// Configuration file loading and validation.
pub mod config;
/// Song catalog access.
pub mod dao;
/// Wire types for REST, SSE and websocket payloads.
pub mod dto;
/// Service errors and their HTTP mapping.
pub mod error;
/// HTTP routers.
pub mod routes;
/// Controllers and transport services.
pub mod services;
/// Shared in-memory state.
pub mod state;
