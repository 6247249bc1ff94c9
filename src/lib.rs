//! # Arcana Pairs
//!
//! Authoritative server for a two-player memory game. Players take turns
//! flipping face-down cards looking for pairs; some pairs are arcana and grant
//! power-ups that can be spent to shuffle, peek, banish or highlight cards.
//!
//! ## Features
//!
//! - **Game Engine**: board dealing, turn state machine, scoring and power-ups
//! - **Strategy**: expected-value heuristics and a power-up advisor
//! - **Sessions**: matchmaking, one worker task per match, turn and reconnect timers
//! - **Servers**: websocket game endpoint and an HTTP status endpoint
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use arcana_pairs::{
//!     auth::AnonymousVerifier,
//!     game::GameRules,
//!     servers::{GameSocketConfig, GameSocketServer},
//!     services::{LogResultSink, SessionConfig, SessionManager},
//!     strategy::HeuristicRegistry,
//! };
//!
//! # async fn run() -> arcana_pairs::Result<()> {
//! let manager = SessionManager::new(
//!     GameRules::default(),
//!     SessionConfig::default(),
//!     HeuristicRegistry::standard(),
//!     Arc::new(LogResultSink),
//! )?;
//! let server = GameSocketServer::new(
//!     GameSocketConfig::default(),
//!     manager,
//!     Arc::new(AnonymousVerifier),
//! );
//! server.start().await
//! # }
//! ```

// ============================================================================
// PUBLIC API MODULES
// ============================================================================

/// Board, cards, players and the per-match state machine
pub mod game;

/// Power-up heuristics and advice
pub mod strategy;

/// Matchmaking, match workers and the client protocol
pub mod services;

/// Server components (websocket, status)
pub mod servers;

/// Player identity verification
pub mod auth;

/// Logger setup
pub mod logging;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Main error type for the Arcana Pairs library
#[derive(Debug, thiserror::Error)]
pub enum ArcanaError {
    #[error("Board error: {0}")]
    Board(#[from] game::BoardError),

    #[error("Action error: {0}")]
    Action(#[from] game::ActionError),

    #[error("Session error: {0}")]
    Session(#[from] services::SessionError),

    #[error("Auth error: {0}")]
    Auth(#[from] auth::AuthError),

    #[error("Result sink error: {0}")]
    Sink(#[from] services::SinkError),

    #[error("Server error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ArcanaError>;

// ============================================================================
// LIBRARY VERSION INFO
// ============================================================================

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
