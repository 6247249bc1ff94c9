//! Integration tests for the Arcana Pairs library public API

use arcana_pairs::{
    game::{ActionError, BoardError},
    servers::{GameSocketConfig, StatusConfig},
    services::{RejoinError, SessionError},
    ArcanaError, Result, DESCRIPTION, NAME, VERSION,
};

#[test]
fn test_library_metadata() {
    assert!(!VERSION.is_empty());
    assert_eq!(NAME, "arcana_pairs");
    assert!(!DESCRIPTION.is_empty());
}

#[test]
fn test_error_conversions() {
    let board: ArcanaError = BoardError::Empty.into();
    assert!(matches!(board, ArcanaError::Board(BoardError::Empty)));

    let action: ArcanaError = ActionError::NotYourTurn.into();
    assert_eq!(action.to_string(), "Action error: it is not your turn");

    let session: ArcanaError = SessionError::from(RejoinError::InvalidToken).into();
    assert_eq!(session.to_string(), "Session error: invalid rejoin token");

    let server_error = ArcanaError::Server("test server error".to_string());
    assert!(matches!(server_error, ArcanaError::Server(_)));
}

#[test]
fn test_result_type_alias() {
    let success: Result<i32> = Ok(42);
    assert!(success.is_ok());
    assert_eq!(success.unwrap(), 42);

    let failure: Result<i32> = Err(ArcanaError::Server("test".to_string()));
    assert!(failure.is_err());
}

#[test]
fn test_server_configs() {
    let game = GameSocketConfig::default();
    assert_eq!(game.port, 8080);
    assert!(!game.require_auth);

    let status = StatusConfig::default();
    assert_eq!(status.port, 8081);
    assert_eq!(status.host, "0.0.0.0");
}
