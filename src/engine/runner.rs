use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::core::config::SessionConfig;
use crate::core::error::{ProtocolViolation, SessionError, StateConflict, TurnLabel};
use crate::core::lobby::Role;
use crate::core::network::{Message, MessageKind};
use crate::core::renderer::GameRenderer;
use crate::core::shutdown::Shutdown;
use crate::engine::input::{parse_command, Command, MAX_CHAT_CHARS};
use crate::engine::EngineEvent;
use crate::games::gomoku::{GameSnapshot, MoveOutcome, Outcome, Player, Session, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Guest only: connected, waiting for the host's `assign`.
    AwaitingAssignment,
    Active,
    /// Terminal. Only chat is still recorded.
    Finished,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Finished(Outcome),
    /// The local player left with `/q`.
    Quit,
    /// Transport failure, peer hang-up, closed input or Ctrl+C.
    EndedUnexpectedly,
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub outcome: SessionOutcome,
    pub game: GameSnapshot,
}

/// The synchronization engine: the only mutator of the [`Session`].
///
/// Events from the network, local input and the tick are applied one at a time.
/// Outbound messages are queued for the sender task and never awaited here.
pub struct SyncEngine<R> {
    session: Session,
    role: Role,
    phase: Phase,
    outbox: Option<mpsc::Sender<Message>>,
    shutdown: Shutdown,
    renderer: R,
    notice: Option<String>,
    quit: bool,
}

impl<R: GameRenderer<View>> SyncEngine<R> {
    pub fn new(role: Role, config: &SessionConfig, renderer: R, outbox: mpsc::Sender<Message>, shutdown: Shutdown) -> Self {
        Self {
            session: Session::new(config.chat_capacity),
            role,
            phase: Phase::AwaitingAssignment,
            outbox: Some(outbox),
            shutdown,
            renderer,
            notice: None,
            quit: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// The host takes Player 1, opens the game and tells the guest it is Player 2.
    pub async fn start(&mut self) {
        if self.role != Role::Host {
            info!("waiting for player assignment from host");
            return;
        }
        let assigned = self.session.game.lock().await.assign_local_player(Player::One);
        if let Err(conflict) = assigned {
            debug!(%conflict, "host already assigned");
            return;
        }
        info!("assigned as player 1");
        self.phase = Phase::Active;
        self.queue(Message::assign(Player::Two));
        self.set_notice("You are Player 1 (X). You move first.");
    }

    /// Runs until the game finishes, the user quits, or shutdown is signalled.
    pub async fn run(
        mut self,
        mut inbound: mpsc::Receiver<Message>,
        mut input: mpsc::Receiver<String>,
        tick_interval: std::time::Duration,
    ) -> Result<SessionReport, SessionError> {
        self.start().await;

        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.session.redraw.consume() {
                if let Err(e) = self.render().await {
                    self.shutdown.trigger();
                    return Err(SessionError::Render(e));
                }
            }
            if self.phase == Phase::Finished || self.quit {
                break;
            }

            let event = tokio::select! {
                _ = self.shutdown.wait() => EngineEvent::Shutdown,
                Some(line) = input.recv() => EngineEvent::Input(line),
                msg = inbound.recv() => match msg {
                    Some(msg) => EngineEvent::Network(msg),
                    None => EngineEvent::PeerClosed,
                },
                _ = ticker.tick() => EngineEvent::Tick,
            };
            // another branch may have won the race against an already closed token
            if self.shutdown.is_triggered() {
                info!("shutdown observed, leaving event loop");
                break;
            }
            match event {
                EngineEvent::Shutdown => break,
                EngineEvent::PeerClosed => {
                    info!("peer closed the connection");
                    self.shutdown.trigger();
                    break;
                }
                EngineEvent::Input(line) => self.handle_input(&line).await,
                EngineEvent::Network(msg) => self.handle_network(msg).await,
                EngineEvent::Tick => {}
            }
        }

        // closing the outbox lets the sender task flush and finish
        self.outbox = None;
        let game = self.session.snapshot().await;
        let outcome = match (self.phase, game.outcome) {
            (Phase::Finished, Some(outcome)) => SessionOutcome::Finished(outcome),
            _ if self.quit => SessionOutcome::Quit,
            _ => SessionOutcome::EndedUnexpectedly,
        };
        info!(?outcome, "session over");
        Ok(SessionReport { outcome, game })
    }

    async fn render(&mut self) -> std::io::Result<()> {
        let view = View {
            game: self.session.snapshot().await,
            notice: self.notice.clone(),
        };
        self.renderer.render(&view)
    }

    fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(text.into());
        self.session.redraw.set();
    }

    /// Fire-and-forget hand-off to the sender task.
    fn queue(&self, msg: Message) {
        let Some(outbox) = &self.outbox else { return };
        match outbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(msg)) => {
                warn!(kind = ?msg.kind, "outbound queue full, peer is not draining");
                self.shutdown.trigger();
            }
            Err(TrySendError::Closed(msg)) => {
                debug!(kind = ?msg.kind, "sender task gone, dropping message");
                self.shutdown.trigger();
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        if self.phase != Phase::Finished {
            info!(?outcome, "game over");
            self.phase = Phase::Finished;
        }
    }

    // ---------------------------------------------------------------------
    // Network events
    // ---------------------------------------------------------------------

    pub async fn handle_network(&mut self, msg: Message) {
        debug!(kind = ?msg.kind, player = msg.player, "handling message");
        if self.phase == Phase::Finished {
            if msg.kind == MessageKind::Chat {
                self.on_remote_chat(&msg).await;
            } else {
                info!(kind = ?msg.kind, "ignoring message, game is over");
            }
            return;
        }
        match msg.kind {
            MessageKind::Move => self.on_remote_move(&msg).await,
            MessageKind::Chat => self.on_remote_chat(&msg).await,
            MessageKind::State => self.on_state_sync(&msg).await,
            MessageKind::Assign => self.on_assign(&msg).await,
            MessageKind::Error => {
                warn!(content = %msg.content, "peer reported an error");
                self.set_notice(format!("Opponent reported: {}", msg.content));
            }
            MessageKind::Notify => {
                info!(content = %msg.content, "notification from peer");
                self.set_notice(msg.content.clone());
            }
            MessageKind::Unknown => warn!(player = msg.player, "ignoring message of unknown type"),
        }
    }

    async fn on_remote_move(&mut self, msg: &Message) {
        let (local, result) = {
            let mut game = self.session.game.lock().await;
            let local = game.local_player();
            let result = match msg.sender() {
                Ok(sender) if Some(sender) == local => Err(Rejection::Conflict(StateConflict::SelfEcho)),
                Ok(sender) if game.current_player() != Some(sender) => {
                    Err(Rejection::Violation(ProtocolViolation::OutOfTurn {
                        sender,
                        expected: TurnLabel(game.current_player()),
                    }))
                }
                Ok(sender) => game
                    .apply_move(msg.x, msg.y, sender)
                    .map(|outcome| (sender, outcome))
                    .map_err(|e| Rejection::Violation(e.into())),
                Err(violation) => Err(Rejection::Violation(violation)),
            };
            (local, result)
        };

        match result {
            Ok((sender, outcome)) => {
                info!(player = %sender, x = msg.x, y = msg.y, "opponent moved");
                self.notice = None;
                self.session.redraw.set();
                if let Some(done) = outcome.finished() {
                    self.finish(done);
                }
            }
            Err(Rejection::Conflict(conflict)) => debug!(%conflict, "discarding move"),
            Err(Rejection::Violation(violation)) => {
                warn!(%violation, x = msg.x, y = msg.y, "rejected move from peer");
                if let Some(local) = local {
                    self.queue(Message::error(local, violation.to_string()));
                }
            }
        }
    }

    async fn on_remote_chat(&mut self, msg: &Message) {
        let local = self.session.game.lock().await.local_player();
        match msg.sender() {
            Ok(sender) if Some(sender) == local => debug!(conflict = %StateConflict::SelfEcho, "discarding chat"),
            Ok(sender) => self.session.add_chat(&format!("Player {sender}"), &msg.content).await,
            Err(violation) => warn!(%violation, "discarding chat"),
        }
    }

    async fn on_state_sync(&mut self, msg: &Message) {
        let (turn, winner) = match msg.state() {
            Ok(state) => state,
            Err(violation) => {
                warn!(%violation, "discarding state message");
                return;
            }
        };
        self.session.game.lock().await.sync_state(turn, winner);
        debug!(?turn, ?winner, "state synchronised from peer");
        self.session.redraw.set();
        if let Some(outcome) = winner {
            info!("received game over state from peer");
            self.finish(outcome);
        }
    }

    async fn on_assign(&mut self, msg: &Message) {
        let player = match msg.sender() {
            Ok(player) => player,
            Err(violation) => {
                warn!(%violation, "discarding assignment");
                return;
            }
        };
        let assigned = self.session.game.lock().await.assign_local_player(player);
        match assigned {
            Ok(()) => {
                info!(%player, "assigned player id");
                if self.phase == Phase::AwaitingAssignment {
                    self.phase = Phase::Active;
                }
                self.set_notice(format!("You are Player {player} ({}).", player.mark()));
            }
            Err(conflict) => debug!(%conflict, "ignoring duplicate assignment"),
        }
    }

    // ---------------------------------------------------------------------
    // Local input
    // ---------------------------------------------------------------------

    pub async fn handle_input(&mut self, line: &str) {
        match parse_command(line) {
            Ok(Command::Move { x, y }) => self.local_move(x, y).await,
            Ok(Command::Chat(text)) => self.local_chat(text).await,
            Ok(Command::Quit) => {
                info!("local player quit");
                if let Some(me) = self.session.game.lock().await.local_player() {
                    self.queue(Message::notify(me, format!("Player {me} left the game.")));
                }
                self.quit = true;
            }
            Ok(Command::Refresh) => {
                self.notice = None;
                self.session.redraw.set();
            }
            Err(e) => self.set_notice(e.to_string()),
        }
    }

    async fn local_move(&mut self, x: i32, y: i32) {
        let attempt = {
            let mut game = self.session.game.lock().await;
            match game.local_player() {
                None => Err("Still waiting for player assignment. Input ignored.".to_string()),
                Some(_) if game.is_over() || self.phase == Phase::Finished => {
                    Err("Game is over. Input ignored.".to_string())
                }
                Some(me) if game.current_player() != Some(me) => Err("It's not your turn.".to_string()),
                Some(me) => game
                    .apply_move(x, y, me)
                    .map(|outcome| (me, outcome))
                    .map_err(|e| format!("Invalid move: {e}. Try again.")),
            }
        };

        let (me, outcome) = match attempt {
            Ok(applied) => applied,
            Err(text) => {
                debug!(x, y, reason = %text, "local move rejected");
                self.set_notice(text);
                return;
            }
        };

        self.queue(Message::movement(me, x, y));
        self.notice = None;
        self.session.redraw.set();
        match outcome {
            MoveOutcome::Continued { next } => info!(x, y, next = %next, "move played"),
            finished => {
                if let Some(done) = finished.finished() {
                    // the peer derives the same result from the move; this only converges it
                    self.queue(Message::state_sync(me, None, Some(done)));
                    self.finish(done);
                }
            }
        }
    }

    async fn local_chat(&mut self, text: String) {
        if text.is_empty() {
            self.session.redraw.set();
            return;
        }
        if text.chars().count() > MAX_CHAT_CHARS {
            self.set_notice(format!("Chat message too long (max {MAX_CHAT_CHARS} characters). Not sent."));
            return;
        }
        let Some(me) = self.session.game.lock().await.local_player() else {
            self.set_notice("Still waiting for player assignment. Chat not sent.");
            return;
        };
        self.session.add_chat(&format!("You (Player {me})"), &text).await;
        self.queue(Message::chat(me, text));
    }
}

/// Why a remote move was not applied.
enum Rejection {
    Conflict(StateConflict),
    Violation(ProtocolViolation),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::gomoku::{Cell, Pos};
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Keeps every rendered view for inspection.
    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<View>>>);

    impl GameRenderer<View> for Recorder {
        fn render(&mut self, view: &View) -> io::Result<()> {
            self.0.lock().unwrap().push(view.clone());
            Ok(())
        }
    }

    fn engine(role: Role) -> (SyncEngine<Recorder>, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(16);
        let engine = SyncEngine::new(role, &SessionConfig::default(), Recorder::default(), tx, Shutdown::new());
        (engine, rx)
    }

    async fn host() -> (SyncEngine<Recorder>, mpsc::Receiver<Message>) {
        let (mut engine, mut rx) = engine(Role::Host);
        engine.start().await;
        assert_eq!(rx.try_recv().unwrap(), Message::assign(Player::Two));
        (engine, rx)
    }

    async fn stones(engine: &SyncEngine<Recorder>) -> usize {
        engine.session().game.lock().await.board().stone_count()
    }

    #[tokio::test]
    async fn host_assigns_itself_and_moves_first() {
        let (engine, _rx) = host().await;
        let game = engine.session().game.lock().await;
        assert_eq!(game.local_player(), Some(Player::One));
        assert_eq!(game.current_player(), Some(Player::One));
        assert_eq!(engine.phase(), Phase::Active);
    }

    #[tokio::test]
    async fn guest_accepts_first_assignment_only() {
        let (mut engine, _rx) = engine(Role::Guest);
        engine.start().await;
        assert_eq!(engine.phase(), Phase::AwaitingAssignment);

        engine.handle_network(Message::assign(Player::Two)).await;
        {
            let game = engine.session().game.lock().await;
            assert_eq!(game.local_player(), Some(Player::Two));
            assert_eq!(game.current_player(), Some(Player::One));
        }
        assert_eq!(engine.phase(), Phase::Active);

        engine.handle_network(Message::assign(Player::One)).await;
        let game = engine.session().game.lock().await;
        assert_eq!(game.local_player(), Some(Player::Two));
    }

    #[tokio::test]
    async fn local_move_is_applied_and_queued() {
        let (mut engine, mut rx) = host().await;
        engine.handle_input("7,7").await;

        assert_eq!(rx.try_recv().unwrap(), Message::movement(Player::One, 7, 7));
        let game = engine.session().game.lock().await;
        assert_eq!(game.board().get(Pos { row: 7, col: 7 }), Cell::Stone(Player::One));
        assert_eq!(game.current_player(), Some(Player::Two));
    }

    #[tokio::test]
    async fn local_move_rejected_when_not_our_turn_or_unassigned() {
        let (mut guest, mut rx) = engine(Role::Guest);
        guest.handle_input("1,1").await;
        assert!(guest.notice().unwrap().contains("waiting for player assignment"));

        guest.handle_network(Message::assign(Player::Two)).await;
        guest.handle_input("1,1").await;
        assert_eq!(guest.notice(), Some("It's not your turn."));
        assert_eq!(stones(&guest).await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn invalid_local_move_changes_nothing() {
        let (mut engine, mut rx) = host().await;
        engine.handle_input("15,3").await;
        assert!(engine.notice().unwrap().starts_with("Invalid move"));
        engine.handle_input("hello").await;
        assert!(engine.notice().unwrap().starts_with("Invalid input format"));
        assert_eq!(stones(&engine).await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn remote_move_in_turn_is_applied() {
        let (mut engine, _rx) = host().await;
        engine.handle_input("0,0").await;
        engine.handle_network(Message::movement(Player::Two, 1, 1)).await;

        let game = engine.session().game.lock().await;
        assert_eq!(game.board().get(Pos { row: 1, col: 1 }), Cell::Stone(Player::Two));
        assert_eq!(game.current_player(), Some(Player::One));
    }

    #[tokio::test]
    async fn out_of_turn_move_is_discarded_and_answered() {
        let (mut engine, mut rx) = host().await;
        engine.handle_network(Message::movement(Player::Two, 1, 1)).await;

        assert_eq!(stones(&engine).await, 0);
        let reply = rx.try_recv().unwrap();
        assert_eq!(reply.kind, MessageKind::Error);
        assert_eq!(reply.player, 1);
        assert!(reply.content.contains("turn"));
    }

    #[tokio::test]
    async fn self_echo_is_silently_dropped() {
        let (mut engine, mut rx) = host().await;
        engine.handle_network(Message::movement(Player::One, 3, 3)).await;
        assert_eq!(stones(&engine).await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn replayed_move_is_rejected_without_board_change() {
        let (mut guest, mut rx) = engine(Role::Guest);
        guest.handle_network(Message::assign(Player::Two)).await;
        guest.handle_network(Message::movement(Player::One, 7, 7)).await;
        guest.handle_input("8,8").await;
        assert_eq!(rx.try_recv().unwrap(), Message::movement(Player::Two, 8, 8));
        let before = guest.session().game.lock().await.board().clone();

        // same move again, now in turn: the cell is taken
        guest.handle_network(Message::movement(Player::One, 7, 7)).await;
        assert_eq!(guest.session().game.lock().await.board(), &before);
        let reply = rx.try_recv().unwrap();
        assert_eq!(reply.kind, MessageKind::Error);
        assert!(reply.content.contains("occupied"));
    }

    #[tokio::test]
    async fn winning_local_move_queues_state_sync() {
        let (mut engine, mut rx) = host().await;
        for y in 0..4 {
            engine.handle_input(&format!("7,{y}")).await;
            rx.try_recv().unwrap();
            engine.handle_network(Message::movement(Player::Two, 0, y)).await;
        }
        engine.handle_input("7,4").await;

        assert_eq!(rx.try_recv().unwrap(), Message::movement(Player::One, 7, 4));
        let sync = rx.try_recv().unwrap();
        assert_eq!(sync.kind, MessageKind::State);
        assert_eq!(sync.winner, 1);
        assert_eq!(engine.phase(), Phase::Finished);

        // finished: moves are refused, chat is still recorded
        engine.handle_network(Message::movement(Player::Two, 0, 4)).await;
        assert_eq!(stones(&engine).await, 9);
        engine.handle_network(Message::chat(Player::Two, "gg")).await;
        assert_eq!(engine.session().chat.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn remote_state_sync_ends_the_game() {
        let (mut guest, _rx) = engine(Role::Guest);
        guest.handle_network(Message::assign(Player::Two)).await;
        guest
            .handle_network(Message::state_sync(Player::One, None, Some(Outcome::Won(Player::One))))
            .await;
        assert_eq!(guest.phase(), Phase::Finished);
        assert_eq!(
            guest.session().game.lock().await.winner(),
            Some(Outcome::Won(Player::One))
        );

        guest.handle_input("3,3").await;
        assert_eq!(guest.notice(), Some("Game is over. Input ignored."));
    }

    #[tokio::test]
    async fn malformed_state_sync_is_ignored() {
        let (mut engine, _rx) = host().await;
        let mut msg = Message::state_sync(Player::Two, None, None);
        msg.winner = 7;
        engine.handle_network(msg).await;
        assert_eq!(engine.phase(), Phase::Active);
        assert_eq!(engine.session().game.lock().await.current_player(), Some(Player::One));
    }

    #[tokio::test]
    async fn chat_goes_to_log_and_outbox() {
        let (mut engine, mut rx) = host().await;
        engine.handle_input("/c hello").await;
        engine.handle_network(Message::chat(Player::Two, "hi back")).await;
        engine.handle_network(Message::chat(Player::One, "echo")).await;

        assert_eq!(rx.try_recv().unwrap(), Message::chat(Player::One, "hello"));
        let chat: Vec<String> = engine.session().chat.lock().await.lines().map(str::to_owned).collect();
        assert_eq!(chat, ["[You (Player 1)]: hello", "[Player 2]: hi back"]);
    }

    #[tokio::test]
    async fn notify_and_error_only_surface_text() {
        let (mut engine, _rx) = host().await;
        engine.handle_network(Message::notify(Player::Two, "brb")).await;
        assert_eq!(engine.notice(), Some("brb"));
        engine.handle_network(Message::error(Player::Two, "bad move")).await;
        assert_eq!(engine.notice(), Some("Opponent reported: bad move"));
        assert_eq!(engine.phase(), Phase::Active);
    }

    #[tokio::test]
    async fn full_outbox_signals_shutdown() {
        let (tx, _rx) = mpsc::channel(1);
        let shutdown = Shutdown::new();
        let mut engine = SyncEngine::new(Role::Host, &SessionConfig::default(), Recorder::default(), tx, shutdown.clone());
        engine.start().await;
        assert!(!shutdown.is_triggered());
        engine.handle_input("/c one too many").await;
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn quit_tells_the_peer() {
        let (mut engine, mut rx) = host().await;
        engine.handle_input("/q").await;
        assert_eq!(rx.try_recv().unwrap(), Message::notify(Player::One, "Player 1 left the game."));
    }

    #[tokio::test]
    async fn nothing_is_applied_or_answered_after_shutdown() {
        let (outbox, mut out_rx) = mpsc::channel(16);
        let (in_tx, in_rx) = mpsc::channel(4);
        let (_input_tx, input_rx) = mpsc::channel(1);
        let shutdown = Shutdown::new();
        let engine = SyncEngine::new(Role::Host, &SessionConfig::default(), Recorder::default(), outbox, shutdown.clone());

        // out of turn: would be answered with an error if it were handled
        in_tx.send(Message::movement(Player::Two, 1, 1)).await.unwrap();
        shutdown.trigger();

        let report = engine.run(in_rx, input_rx, std::time::Duration::from_millis(20)).await.unwrap();
        assert_eq!(report.outcome, SessionOutcome::EndedUnexpectedly);
        assert_eq!(report.game.board.stone_count(), 0);
        assert_eq!(out_rx.recv().await.unwrap(), Message::assign(Player::Two));
        assert!(out_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn peer_close_is_seen_after_its_last_move() {
        let (outbox, _out_rx) = mpsc::channel(16);
        let (in_tx, in_rx) = mpsc::channel(4);
        let (_input_tx, input_rx) = mpsc::channel(1);
        let shutdown = Shutdown::new();
        let engine = SyncEngine::new(Role::Guest, &SessionConfig::default(), Recorder::default(), outbox, shutdown.clone());

        in_tx.send(Message::assign(Player::Two)).await.unwrap();
        in_tx.send(Message::movement(Player::One, 7, 7)).await.unwrap();
        drop(in_tx);

        let report = engine.run(in_rx, input_rx, std::time::Duration::from_millis(20)).await.unwrap();
        assert_eq!(report.outcome, SessionOutcome::EndedUnexpectedly);
        assert_eq!(report.game.local, Some(Player::Two));
        assert_eq!(report.game.board.get(Pos { row: 7, col: 7 }), Cell::Stone(Player::One));
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn overlong_chat_is_refused_locally() {
        let (mut engine, mut rx) = host().await;
        let long = "y".repeat(MAX_CHAT_CHARS + 1);
        engine.handle_input(&format!("/c {long}")).await;

        assert!(engine.notice().unwrap().starts_with("Chat message too long"));
        assert!(engine.session().chat.lock().await.is_empty());
        assert!(rx.try_recv().is_err());

        engine.handle_input(&format!("/c {}", "y".repeat(MAX_CHAT_CHARS))).await;
        assert_eq!(rx.try_recv().unwrap().content.len(), MAX_CHAT_CHARS);
    }

    #[tokio::test]
    async fn loop_exits_on_shutdown_and_reports_abort() {
        let (outbox, _out_rx) = mpsc::channel(16);
        let (_in_tx, in_rx) = mpsc::channel(1);
        let (_input_tx, input_rx) = mpsc::channel(1);
        let shutdown = Shutdown::new();
        let recorder = Recorder::default();
        let engine = SyncEngine::new(Role::Guest, &SessionConfig::default(), recorder.clone(), outbox, shutdown.clone());

        let tick = std::time::Duration::from_millis(20);
        let run = tokio::spawn(engine.run(in_rx, input_rx, tick));
        tokio::time::sleep(tick * 2).await;
        shutdown.trigger();

        let report = tokio::time::timeout(tick * 2, run).await.unwrap().unwrap().unwrap();
        assert_eq!(report.outcome, SessionOutcome::EndedUnexpectedly);
        assert!(!recorder.0.lock().unwrap().is_empty());
    }
}
