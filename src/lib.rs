#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::too_many_arguments,
    clippy::too_many_lines
)]

//! # Quizdash Server
//!
//! A realtime, in-memory WebSocket game server for live multiplayer quizzes.
//!
//! One process owns many concurrent rooms. Each room is a single-owner task
//! that drives a question/answer/reveal lifecycle, scores answers by latency,
//! and fans typed events out to the organizer, players, and spectators.
//! No database, no cloud services -- run the binary and connect.

/// Server configuration and environment variables
pub mod config;

/// Process-wide room index and lifecycle sweep
pub mod directory;

/// Structured logging configuration
pub mod logging;

/// WebSocket message protocol definitions
pub mod protocol;

/// Quiz snapshot ingestion and validation
pub mod quiz;

/// Per-room state machine, registry, event bus, and timers
pub mod room;

/// Answer scoring
pub mod scoring;

/// Server assembly (runtime config + directory)
pub mod server;

/// WebSocket connection handling
pub mod websocket;
