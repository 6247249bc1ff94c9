pub mod connection;
pub mod match_worker;
pub mod protocol;
pub mod result_sink;
pub mod session_manager;

pub use connection::{ClientConnection, ConnectionError};
pub use match_worker::{MatchCommand, Outbound};
pub use protocol::{ClientMessage, ScoreLine, ServerMessage};
pub use result_sink::{ChannelResultSink, LogResultSink, MatchResult, PlayerRecord, ResultSink, SinkError};
pub use session_manager::{
    MatchLink, RejoinError, SessionConfig, SessionError, SessionManager, WaitingPlayer,
};
