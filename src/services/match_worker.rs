//! One task per match. The worker owns the `MatchState` and is the only code
//! that mutates it; client actions, disconnects, rejoins and timer expiries
//! all arrive as `MatchEvent`s on its queue and are handled one at a time.
//!
//! Timers are plain spawned tasks that sleep and post an event stamped with
//! the generation they were armed for. Re-arming bumps the generation, so a
//! timer that fires after being superseded is ignored on arrival.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;

use crate::game::match_state::{ActionOutcome, MatchState, PlayerAction, Seat};
use crate::game::power_up::PowerUpId;
use crate::game::snapshot::{peek_views, reveal_view, snapshot_for};
use crate::services::protocol::{ScoreLine, ServerMessage};
use crate::services::result_sink::{MatchResult, PlayerRecord, ResultSink};
use crate::services::session_manager::{
    mark_match_finished, remove_match, RejoinError, SessionConfig, SessionStoreState,
    WaitingPlayer,
};
use crate::strategy::advisor::advise;
use crate::strategy::registry::HeuristicRegistry;

/// Outbound queue of one client connection.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// A client request routed to the seat's match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchCommand {
    Flip { index: usize },
    UsePowerUp { power_up: PowerUpId, target: Option<usize> },
    RequestAdvice,
}

pub(crate) enum MatchEvent {
    Command {
        seat: Seat,
        command: MatchCommand,
    },
    Disconnected {
        seat: Seat,
        connection_id: String,
    },
    Rejoin {
        user_id: String,
        rejoin_token: String,
        connection_id: String,
        outbound: Outbound,
        reply: oneshot::Sender<Result<Seat, RejoinError>>,
    },
    /// The seat is done with the finished match.
    Acknowledge {
        seat: Seat,
    },
    TurnTimerElapsed {
        generation: u64,
    },
    ReconnectDeadline {
        seat: Seat,
        generation: u64,
    },
    RetentionElapsed,
}

/// Shared services every worker needs.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub config: SessionConfig,
    pub registry: Arc<HeuristicRegistry>,
    pub sink: Arc<dyn ResultSink>,
    pub store: Arc<RwLock<SessionStoreState>>,
}

/// A paired player as handed over by the matchmaker.
pub(crate) struct SeatHandle {
    pub player: WaitingPlayer,
    pub rejoin_token: String,
}

struct SeatSlot {
    user_id: String,
    name: String,
    rejoin_token: String,
    connection_id: Option<String>,
    outbound: Option<Outbound>,
    reconnect_generation: u64,
    reconnect_timer: Option<JoinHandle<()>>,
    /// No longer waiting on the finished match.
    released: bool,
}

impl SeatSlot {
    fn new(handle: SeatHandle) -> Self {
        let SeatHandle { player, rejoin_token } = handle;
        Self {
            user_id: player.user_id,
            name: player.name,
            rejoin_token,
            connection_id: Some(player.connection_id),
            outbound: Some(player.outbound),
            reconnect_generation: 0,
            reconnect_timer: None,
            released: false,
        }
    }

    fn is_connected(&self) -> bool {
        self.outbound.is_some()
    }

    fn cancel_reconnect_timer(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
    }
}

pub(crate) struct MatchWorker {
    state: MatchState,
    seats: [SeatSlot; 2],
    ctx: WorkerContext,
    events: mpsc::UnboundedSender<MatchEvent>,
    turn_generation: u64,
    turn_timer: Option<JoinHandle<()>>,
    turn_deadline_unix_ms: Option<i64>,
    retention_timer: Option<JoinHandle<()>>,
    started_at_unix_ms: i64,
    advice_rng: StdRng,
}

/// Starts the worker task and returns the sender feeding its queue.
pub(crate) fn spawn_match(
    state: MatchState,
    seats: [SeatHandle; 2],
    ctx: WorkerContext,
) -> mpsc::UnboundedSender<MatchEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    let [first, second] = seats;
    let worker = MatchWorker {
        state,
        seats: [SeatSlot::new(first), SeatSlot::new(second)],
        ctx,
        events: tx.clone(),
        turn_generation: 0,
        turn_timer: None,
        turn_deadline_unix_ms: None,
        retention_timer: None,
        started_at_unix_ms: now_unix_ms(),
        advice_rng: StdRng::seed_from_u64(rand::random()),
    };
    tokio::spawn(worker.run(rx));
    tx
}

fn now_unix_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

impl MatchWorker {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<MatchEvent>) {
        log::info!(
            "🎮 [{}] match started: {} vs {}, {:?} opens",
            self.state.id(),
            self.seats[0].name,
            self.seats[1].name,
            self.state.active_seat()
        );
        for seat in Seat::BOTH {
            self.send_match_found(seat);
        }
        self.arm_turn_timer();
        self.broadcast_state();

        while let Some(event) = events.recv().await {
            if self.handle(event).await.is_break() {
                break;
            }
        }
        self.teardown().await;
    }

    async fn handle(&mut self, event: MatchEvent) -> ControlFlow<()> {
        match event {
            MatchEvent::Command { seat, command } => self.on_command(seat, command).await,
            MatchEvent::Disconnected {
                seat,
                connection_id,
            } => self.on_disconnect(seat, &connection_id),
            MatchEvent::Rejoin {
                user_id,
                rejoin_token,
                connection_id,
                outbound,
                reply,
            } => {
                let result = self.on_rejoin(&user_id, &rejoin_token, connection_id, outbound);
                let _ = reply.send(result);
                ControlFlow::Continue(())
            }
            MatchEvent::Acknowledge { seat } => self.on_acknowledge(seat),
            MatchEvent::TurnTimerElapsed { generation } => self.on_turn_timer(generation).await,
            MatchEvent::ReconnectDeadline { seat, generation } => {
                self.on_reconnect_deadline(seat, generation).await
            }
            MatchEvent::RetentionElapsed => ControlFlow::Break(()),
        }
    }

    // ------------------------------------------------------------------
    // Play
    // ------------------------------------------------------------------

    async fn on_command(&mut self, seat: Seat, command: MatchCommand) -> ControlFlow<()> {
        let action = match command {
            MatchCommand::Flip { index } => PlayerAction::Flip { index },
            MatchCommand::UsePowerUp { power_up, target } => {
                PlayerAction::UsePowerUp { power_up, target }
            }
            MatchCommand::RequestAdvice => {
                self.send_advice(seat);
                return ControlFlow::Continue(());
            }
        };

        match self.state.apply(seat, action) {
            Ok(outcome) => self.publish(seat, outcome),
            Err(err) => {
                log::debug!("🚫 [{}] {:?} rejected: {}", self.state.id(), seat, err);
                self.send(seat, ServerMessage::error(err.to_string()));
                return ControlFlow::Continue(());
            }
        }

        if self.state.is_finished() {
            return self.finish().await;
        }
        ControlFlow::Continue(())
    }

    fn publish(&mut self, seat: Seat, outcome: ActionOutcome) {
        match outcome {
            ActionOutcome::Flipped { .. } => {}
            ActionOutcome::Resolved(resolution) => {
                let cards: Vec<_> = resolution
                    .indices
                    .iter()
                    .filter_map(|&index| reveal_view(&self.state, index))
                    .collect();
                for viewer in Seat::BOTH {
                    self.send(
                        viewer,
                        ServerMessage::FlipResult {
                            by_you: viewer == resolution.seat,
                            cards: cards.clone(),
                            matched: resolution.matched,
                            points: resolution.points,
                        },
                    );
                }
                log::debug!(
                    "🃏 [{}] {:?} flipped {:?}: matched={} points={} shielded={}",
                    self.state.id(),
                    seat,
                    resolution.indices,
                    resolution.matched,
                    resolution.points,
                    resolution.shielded
                );
                if !self.state.is_finished() {
                    self.arm_turn_timer();
                }
            }
            ActionOutcome::PowerUpUsed {
                power_up, target, ..
            } => {
                log::info!("✨ [{}] {:?} used {}", self.state.id(), seat, power_up);
                for viewer in Seat::BOTH {
                    self.send(
                        viewer,
                        ServerMessage::PowerUpUsed {
                            by_you: viewer == seat,
                            power_up_id: power_up,
                            card_index: target,
                        },
                    );
                }
                self.send_peeks(seat);
            }
            ActionOutcome::TurnPassed { .. } => {
                if !self.state.is_finished() {
                    self.arm_turn_timer();
                }
            }
        }
        // The closing state goes out with the result.
        if !self.state.is_finished() {
            self.broadcast_state();
        }
    }

    fn send_advice(&mut self, seat: Seat) {
        let advice = advise(&self.state, seat, &self.ctx.registry, &mut self.advice_rng);
        let message = match advice {
            Some(advice) => ServerMessage::PowerUpAdvice {
                power_up_id: Some(advice.power_up_id),
                card_index: advice.card_index,
                expected_value: advice.expected_value,
            },
            None => ServerMessage::PowerUpAdvice {
                power_up_id: None,
                card_index: None,
                expected_value: 0.0,
            },
        };
        self.send(seat, message);
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    fn schedule(&self, delay: Duration, event: MatchEvent) -> JoinHandle<()> {
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event);
        })
    }

    fn arm_turn_timer(&mut self) {
        self.cancel_turn_timer();
        self.turn_generation += 1;
        let timeout = self.ctx.config.turn_timeout;
        self.turn_deadline_unix_ms = Some(now_unix_ms() + duration_ms(timeout));
        let event = MatchEvent::TurnTimerElapsed {
            generation: self.turn_generation,
        };
        self.turn_timer = Some(self.schedule(timeout, event));
    }

    fn cancel_turn_timer(&mut self) {
        if let Some(timer) = self.turn_timer.take() {
            timer.abort();
        }
        self.turn_deadline_unix_ms = None;
    }

    async fn on_turn_timer(&mut self, generation: u64) -> ControlFlow<()> {
        if self.state.is_finished() || generation != self.turn_generation {
            return ControlFlow::Continue(());
        }
        let active = self.state.active_seat();
        if let Err(err) = self.state.apply(active, PlayerAction::TimeoutPass) {
            log::warn!("⚠️ [{}] timeout pass failed: {}", self.state.id(), err);
            return ControlFlow::Continue(());
        }
        log::info!("⏰ [{}] {:?} ran out of time", self.state.id(), active);
        self.broadcast(ServerMessage::TurnTimeout);
        self.arm_turn_timer();
        self.broadcast_state();
        ControlFlow::Continue(())
    }

    // ------------------------------------------------------------------
    // Connections
    // ------------------------------------------------------------------

    fn on_disconnect(&mut self, seat: Seat, connection_id: &str) -> ControlFlow<()> {
        let finished = self.state.is_finished();
        let grace = self.ctx.config.reconnect_grace;
        let slot = &mut self.seats[seat.index()];
        if slot.connection_id.as_deref() != Some(connection_id) {
            return ControlFlow::Continue(());
        }
        slot.connection_id = None;
        slot.outbound = None;

        if finished {
            slot.released = true;
            return self.release_check();
        }

        slot.reconnect_generation += 1;
        let event = MatchEvent::ReconnectDeadline {
            seat,
            generation: slot.reconnect_generation,
        };
        let timer = self.schedule(grace, event);
        let slot = &mut self.seats[seat.index()];
        slot.cancel_reconnect_timer();
        slot.reconnect_timer = Some(timer);

        log::info!(
            "🔌 [{}] {} disconnected, {}s to come back",
            self.state.id(),
            slot.name,
            grace.as_secs()
        );
        self.send(
            seat.opponent(),
            ServerMessage::OpponentReconnecting {
                reconnection_deadline_unix_ms: now_unix_ms() + duration_ms(grace),
            },
        );
        ControlFlow::Continue(())
    }

    fn on_rejoin(
        &mut self,
        user_id: &str,
        rejoin_token: &str,
        connection_id: String,
        outbound: Outbound,
    ) -> Result<Seat, RejoinError> {
        if self.state.is_finished() {
            return Err(RejoinError::GameFinished);
        }
        let seat = Seat::BOTH
            .into_iter()
            .find(|seat| self.seats[seat.index()].user_id == user_id)
            .ok_or(RejoinError::NoActiveGame)?;

        let slot = &mut self.seats[seat.index()];
        if slot.is_connected() {
            return Err(RejoinError::NotDisconnected);
        }
        if slot.rejoin_token != rejoin_token {
            return Err(RejoinError::InvalidToken);
        }

        slot.reconnect_generation += 1;
        slot.cancel_reconnect_timer();
        slot.connection_id = Some(connection_id);
        slot.outbound = Some(outbound);
        log::info!("🔁 [{}] {} is back", self.state.id(), slot.name);

        self.send_match_found(seat);
        self.send_state(seat);
        self.send_peeks(seat);
        self.send(seat.opponent(), ServerMessage::OpponentReconnected);
        Ok(seat)
    }

    async fn on_reconnect_deadline(&mut self, seat: Seat, generation: u64) -> ControlFlow<()> {
        let slot = &self.seats[seat.index()];
        if self.state.is_finished()
            || slot.reconnect_generation != generation
            || slot.is_connected()
        {
            return ControlFlow::Continue(());
        }

        let opponent = seat.opponent();
        if self.seats[opponent.index()].is_connected() {
            log::info!("🏳️ [{}] {:?} forfeits", self.state.id(), seat);
            self.state.forfeit(seat);
            self.send(opponent, ServerMessage::OpponentDisconnected);
        } else {
            log::info!("🕳️ [{}] both players gone, match abandoned", self.state.id());
            self.state.abandon();
        }
        self.finish().await
    }

    fn on_acknowledge(&mut self, seat: Seat) -> ControlFlow<()> {
        if !self.state.is_finished() {
            return ControlFlow::Continue(());
        }
        let slot = &mut self.seats[seat.index()];
        slot.released = true;
        slot.connection_id = None;
        slot.outbound = None;
        self.release_check()
    }

    fn release_check(&self) -> ControlFlow<()> {
        if self.seats.iter().all(|slot| slot.released) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    // ------------------------------------------------------------------
    // End of match
    // ------------------------------------------------------------------

    async fn finish(&mut self) -> ControlFlow<()> {
        let Some(end) = self.state.end() else {
            return ControlFlow::Continue(());
        };
        self.cancel_turn_timer();
        for slot in &mut self.seats {
            slot.cancel_reconnect_timer();
        }
        mark_match_finished(&self.ctx.store, self.state.id()).await;

        self.broadcast_state();
        for seat in Seat::BOTH {
            let Some(result) = self.state.result_for(seat) else {
                continue;
            };
            let message = ServerMessage::GameOver {
                result,
                you: self.score_line(seat),
                opponent: self.score_line(seat.opponent()),
                reason: end.reason,
            };
            self.send(seat, message);
        }

        if let Some(record) = self.result_record() {
            if let Err(err) = self.ctx.sink.record(&record) {
                log::error!("❌ [{}] failed to record result: {}", self.state.id(), err);
            }
        }
        log::info!(
            "🏆 [{}] match over ({:?}), winner {:?}, {} - {}",
            self.state.id(),
            end.reason,
            end.winner,
            self.state.player(Seat::First).score,
            self.state.player(Seat::Second).score
        );

        for slot in &mut self.seats {
            if !slot.is_connected() {
                slot.released = true;
            }
        }
        if self.release_check().is_break() {
            return ControlFlow::Break(());
        }
        let retention = self.ctx.config.finished_retention;
        self.retention_timer = Some(self.schedule(retention, MatchEvent::RetentionElapsed));
        ControlFlow::Continue(())
    }

    fn result_record(&self) -> Option<MatchResult> {
        let end = self.state.end()?;
        let record = |seat: Seat| -> Option<PlayerRecord> {
            let slot = &self.seats[seat.index()];
            Some(PlayerRecord {
                user_id: slot.user_id.clone(),
                name: slot.name.clone(),
                score: self.state.player(seat).score,
                result: self.state.result_for(seat)?,
            })
        };
        Some(MatchResult {
            game_id: self.state.id().to_string(),
            players: [record(Seat::First)?, record(Seat::Second)?],
            reason: end.reason,
            seed: self.state.seed(),
            actions: self.state.actions().len(),
            started_at_unix_ms: self.started_at_unix_ms,
            finished_at_unix_ms: now_unix_ms(),
        })
    }

    async fn teardown(&mut self) {
        self.cancel_turn_timer();
        for slot in &mut self.seats {
            slot.cancel_reconnect_timer();
        }
        if let Some(timer) = self.retention_timer.take() {
            timer.abort();
        }
        remove_match(&self.ctx.store, self.state.id()).await;
        log::info!("🧹 [{}] match retired", self.state.id());
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    fn send(&self, seat: Seat, message: ServerMessage) {
        if let Some(outbound) = &self.seats[seat.index()].outbound {
            let _ = outbound.send(message);
        }
    }

    fn broadcast(&self, message: ServerMessage) {
        for seat in Seat::BOTH {
            self.send(seat, message.clone());
        }
    }

    fn send_state(&self, seat: Seat) {
        let view = snapshot_for(&self.state, seat, self.turn_deadline_unix_ms);
        self.send(seat, ServerMessage::GameState(view));
    }

    fn send_peeks(&self, seat: Seat) {
        let cards = peek_views(&self.state, seat);
        if !cards.is_empty() {
            self.send(seat, ServerMessage::PeekResult { cards });
        }
    }

    fn broadcast_state(&self) {
        for seat in Seat::BOTH {
            self.send_state(seat);
        }
    }

    fn send_match_found(&self, seat: Seat) {
        let slot = &self.seats[seat.index()];
        let board = self.state.board();
        self.send(
            seat,
            ServerMessage::MatchFound {
                game_id: self.state.id().to_string(),
                rejoin_token: slot.rejoin_token.clone(),
                opponent_name: self.seats[seat.opponent().index()].name.clone(),
                board_rows: board.rows(),
                board_cols: board.cols(),
                your_turn: self.state.active_seat() == seat && !self.state.is_finished(),
            },
        );
    }

    fn score_line(&self, seat: Seat) -> ScoreLine {
        let player = self.state.player(seat);
        ScoreLine {
            name: player.name.clone(),
            score: player.score,
        }
    }
}
