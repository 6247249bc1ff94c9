//! Terminal match results, handed to whatever stores history.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::game::match_state::{EndReason, GameResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub user_id: String,
    pub name: String,
    pub score: u32,
    pub result: GameResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub game_id: String,
    pub players: [PlayerRecord; 2],
    pub reason: EndReason,
    pub seed: u64,
    pub actions: usize,
    pub started_at_unix_ms: i64,
    pub finished_at_unix_ms: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("result sink is closed")]
    Closed,

    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only destination for finished matches. Failures are logged by the
/// caller and never affect live play.
pub trait ResultSink: Send + Sync {
    fn record(&self, result: &MatchResult) -> Result<(), SinkError>;
}

/// Writes each result as one JSON line through the logger.
pub struct LogResultSink;

impl ResultSink for LogResultSink {
    fn record(&self, result: &MatchResult) -> Result<(), SinkError> {
        let line = serde_json::to_string(result)?;
        log::info!("🏁 match_result {}", line);
        Ok(())
    }
}

/// Forwards results to a channel, for an external store or for tests.
pub struct ChannelResultSink {
    tx: mpsc::UnboundedSender<MatchResult>,
}

impl ChannelResultSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MatchResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResultSink for ChannelResultSink {
    fn record(&self, result: &MatchResult) -> Result<(), SinkError> {
        self.tx.send(result.clone()).map_err(|_| SinkError::Closed)
    }
}
