//! The room state machine.
//!
//! One task owns everything in here. Commands, timer fires, and status
//! probes arrive on a single channel and are processed to completion one
//! at a time, so no handler ever observes a half-applied transition.
//! Publishing never blocks: events go to bounded subscriber queues and a
//! subscriber that cannot keep up is dropped like a disconnect.
//!
//! Phase diagram (initial Lobby, terminal Closed):
//!
//! ```text
//! Lobby -- START_GAME --> Intro
//! Intro -- NEXT_QUESTION --> Question
//! Question -- expiry OR all answered --> Reveal
//! Reveal -- NEXT_QUESTION (more left) --> Question
//! Reveal -- NEXT_QUESTION (none left) OR END_QUIZ --> Podium
//! Question -- END_QUIZ --> Podium
//! Podium -- RESET_ROOM --> Lobby
//! any non-Closed -- TTL / grace expiry / eviction --> Closed
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::RngExt;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::protocol::{
    validation, ClientMessage, ConnectionId, ErrorCode, GamePhase, JoinSyncPayload,
    OrganizerSyncPayload, OrganizerToken, PodiumPayload, PowerUp, QuestionOverPayload,
    RoomCloseReason, ServerMessage,
};
use crate::quiz::{QuizData, QuizSnapshot};
use crate::room::bus::{EventBus, SubscriberRole};
use crate::room::clock::{self, TimerHandle};
use crate::room::command::{
    ConnectRequest, ConnectRole, EventSender, RoomCommand, RoomError, RoomStatus, TimerEvent,
    TimerKind,
};
use crate::room::leaderboard;
use crate::room::registry::{ParticipantRegistry, UpsertOutcome};
use crate::room::RoomConfig;
use crate::scoring;

/// An accepted answer for the current question. The full table is the
/// ledger that makes scoring auditable: replaying it through the scorer
/// reproduces every participant's score delta for this question.
#[derive(Debug, Clone)]
struct RecordedAnswer {
    option_index: usize,
    correct: bool,
    points: u32,
    multiplier: f64,
    answered_at: Instant,
}

/// The internal room state. Runs inside a single tokio task.
pub(crate) struct RoomActor {
    code: String,
    config: RoomConfig,
    quiz: Arc<QuizSnapshot>,
    time_limit: Duration,
    organizer_token: OrganizerToken,

    phase: GamePhase,
    registry: ParticipantRegistry,
    bus: EventBus,

    /// Defined iff phase is Intro, Question, or Reveal.
    current_question: Option<usize>,
    question_started_at: Option<Instant>,
    question_deadline: Option<Instant>,
    answers: HashMap<String, RecordedAnswer>,

    organizer_conn: Option<ConnectionId>,
    /// Player connections that have not sent `JOIN` yet.
    pending: HashMap<ConnectionId, EventSender>,
    /// Client-supplied connection labels, for logs only.
    labels: HashMap<ConnectionId, String>,

    question_timers: Vec<TimerHandle>,
    question_generation: u64,
    grace_timer: Option<TimerHandle>,
    grace_generation: u64,
    ttl_timer: Option<TimerHandle>,
    ttl_generation: u64,

    last_activity: Instant,

    rx: mpsc::Receiver<RoomCommand>,
    /// Kept for timer tasks to post fires back onto the command queue.
    tx: mpsc::Sender<RoomCommand>,
}

impl RoomActor {
    pub(crate) fn new(
        code: String,
        quiz: Arc<QuizSnapshot>,
        time_limit: Duration,
        organizer_token: OrganizerToken,
        config: RoomConfig,
        rx: mpsc::Receiver<RoomCommand>,
        tx: mpsc::Sender<RoomCommand>,
    ) -> Self {
        Self {
            code,
            config,
            quiz,
            time_limit,
            organizer_token,
            phase: GamePhase::Lobby,
            registry: ParticipantRegistry::new(),
            bus: EventBus::new(),
            current_question: None,
            question_started_at: None,
            question_deadline: None,
            answers: HashMap::new(),
            organizer_conn: None,
            pending: HashMap::new(),
            labels: HashMap::new(),
            question_timers: Vec::new(),
            question_generation: 0,
            grace_timer: None,
            grace_generation: 0,
            ttl_timer: None,
            ttl_generation: 0,
            last_activity: clock::now(),
            rx,
            tx,
        }
    }

    pub(crate) async fn run(mut self) {
        tracing::info!(room_code = %self.code, questions = self.quiz.len(), "room task started");
        self.arm_ttl(self.config.room_ttl);

        while let Some(command) = self.rx.recv().await {
            match command {
                RoomCommand::Connect(request) => self.handle_connect(request),
                RoomCommand::Client { conn_id, message } => self.handle_client(conn_id, message),
                RoomCommand::Malformed {
                    conn_id,
                    code,
                    detail,
                } => self.handle_malformed(conn_id, code, &detail),
                RoomCommand::Disconnected { conn_id } => self.handle_disconnected(conn_id),
                RoomCommand::Timer(event) => self.handle_timer(event),
                RoomCommand::Status { reply } => {
                    let _ = reply.send(self.status());
                }
                RoomCommand::Close { reason } => self.close_room(reason),
            }

            // The task holds a sender to its own channel for timers, so the
            // channel never closes on its own; exit once the room is done.
            if self.phase == GamePhase::Closed {
                break;
            }
        }

        tracing::info!(room_code = %self.code, "room task stopped");
    }

    // -- Connection lifecycle ------------------------------------------------

    fn handle_connect(&mut self, request: ConnectRequest) {
        if self.phase == GamePhase::Closed {
            let _ = request.reply.send(Err(RoomError::Closed));
            return;
        }

        match request.role {
            ConnectRole::Organizer { token } => {
                if token != self.organizer_token {
                    tracing::warn!(
                        room_code = %self.code,
                        conn_label = %request.label,
                        "organizer connect rejected: bad token"
                    );
                    let _ = request.reply.send(Err(RoomError::Unauthorized));
                    return;
                }
                self.attach_organizer(request);
            }
            ConnectRole::Spectator => {
                self.labels.insert(request.conn_id, request.label);
                self.bus
                    .insert(request.conn_id, SubscriberRole::Spectator, request.sender);
                let _ = request.reply.send(Ok(()));
                let sync = self.join_sync(None);
                self.bus.send_to(
                    request.conn_id,
                    self.phase,
                    ServerMessage::JoinedRoom(Box::new(sync)),
                );
                tracing::debug!(room_code = %self.code, conn = %request.conn_id, "spectator attached");
            }
            ConnectRole::Player => {
                self.labels.insert(request.conn_id, request.label);
                self.pending.insert(request.conn_id, request.sender);
                let _ = request.reply.send(Ok(()));
            }
        }
    }

    fn attach_organizer(&mut self, request: ConnectRequest) {
        // A takeover from a second organizer tab displaces the first.
        if let Some(old_conn) = self.organizer_conn.take() {
            self.bus
                .send_to(old_conn, self.phase, ServerMessage::Kicked);
            self.bus.remove(old_conn);
            self.labels.remove(&old_conn);
            tracing::info!(room_code = %self.code, "organizer connection displaced by newer one");
        }

        let grace_was_open = self.grace_timer.is_some();
        self.cancel_grace();

        self.labels.insert(request.conn_id, request.label);
        self.organizer_conn = Some(request.conn_id);
        self.bus
            .insert(request.conn_id, SubscriberRole::Organizer, request.sender);
        let _ = request.reply.send(Ok(()));

        // The organizer UI always resynchronizes from this projection,
        // whether this is the first attach or a reconnect.
        let projection = self.organizer_sync();
        self.bus.send_to(
            request.conn_id,
            self.phase,
            ServerMessage::OrganizerReconnected(Box::new(projection)),
        );

        if grace_was_open {
            let dropped = self
                .bus
                .publish_audience(self.phase, ServerMessage::HostReconnected);
            self.reap(dropped);
            tracing::info!(room_code = %self.code, "organizer reconnected within grace window");
        }
        self.touch();
    }

    fn handle_disconnected(&mut self, conn_id: ConnectionId) {
        self.labels.remove(&conn_id);

        if self.pending.remove(&conn_id).is_some() {
            return;
        }

        if self.organizer_conn == Some(conn_id) {
            self.organizer_disconnected(conn_id);
            return;
        }

        if let Some(nickname) = self.registry.detach(conn_id) {
            self.bus.remove(conn_id);

            // In the lobby there is no progress to preserve: the roster
            // simply shrinks. Once the game has started the record stays
            // for reconnection.
            let message = if self.phase == GamePhase::Lobby {
                self.registry.remove(&nickname);
                tracing::info!(
                    room_code = %self.code,
                    %nickname,
                    players = self.registry.len(),
                    "player left lobby"
                );
                ServerMessage::PlayerLeft {
                    nickname,
                    participants: self.registry.roster(),
                    player_count: self.registry.len(),
                }
            } else {
                tracing::info!(
                    room_code = %self.code,
                    %nickname,
                    connected = self.registry.connected_count(),
                    "player disconnected"
                );
                ServerMessage::PlayerDisconnected {
                    nickname,
                    participants: self.registry.roster(),
                    player_count: self.registry.len(),
                }
            };
            let dropped = self.bus.publish_all(self.phase, message);
            self.reap(dropped);
            self.touch();
            return;
        }

        // Spectator or already-removed subscriber.
        self.bus.remove(conn_id);
    }

    fn organizer_disconnected(&mut self, conn_id: ConnectionId) {
        if self.phase == GamePhase::Closed {
            return;
        }
        self.organizer_conn = None;
        self.bus.remove(conn_id);

        let grace = self.config.organizer_grace;
        tracing::warn!(
            room_code = %self.code,
            phase = %self.phase,
            grace_seconds = grace.as_secs(),
            "organizer disconnected; grace window open"
        );

        let dropped = self
            .bus
            .publish_audience(self.phase, ServerMessage::OrganizerDisconnected);
        self.reap(dropped);

        self.grace_generation += 1;
        self.grace_timer = Some(clock::schedule(
            self.tx.clone(),
            grace,
            RoomCommand::Timer(TimerEvent {
                generation: self.grace_generation,
                kind: TimerKind::OrganizerGrace,
            }),
        ));
    }

    // -- Inbound frames ------------------------------------------------------

    fn handle_client(&mut self, conn_id: ConnectionId, message: ClientMessage) {
        if self.phase == GamePhase::Closed {
            return;
        }
        match message {
            ClientMessage::Join {
                nickname,
                avatar,
                team,
            } => self.handle_join(conn_id, &nickname, avatar, team),
            ClientMessage::Answer { answer_index } => self.handle_answer(conn_id, answer_index),
            ClientMessage::UsePowerUp { power_up } => self.handle_power_up(conn_id, power_up),
            ClientMessage::StartGame => self.handle_start_game(conn_id),
            ClientMessage::NextQuestion => self.handle_next_question(conn_id),
            ClientMessage::EndQuiz => self.handle_end_quiz(conn_id),
            ClientMessage::ResetRoom {
                quiz_data,
                time_limit_seconds,
            } => self.handle_reset_room(conn_id, quiz_data, time_limit_seconds),
        }
    }

    fn handle_malformed(&mut self, conn_id: ConnectionId, code: ErrorCode, detail: &str) {
        tracing::debug!(
            room_code = %self.code,
            conn = %conn_id,
            error_code = %code,
            detail,
            "rejected client frame"
        );
        self.send_error(conn_id, code);
    }

    fn handle_join(
        &mut self,
        conn_id: ConnectionId,
        nickname: &str,
        avatar: Option<String>,
        team: Option<String>,
    ) {
        // Only unjoined player connections may JOIN.
        if !self.pending.contains_key(&conn_id) {
            self.send_error(conn_id, ErrorCode::InvalidCommand);
            return;
        }

        let nickname = match validation::validate_nickname_with_config(nickname, &self.config.protocol)
        {
            Ok(nickname) => nickname,
            Err(reason) => {
                self.send_error_message(conn_id, ErrorCode::InvalidNickname, reason);
                return;
            }
        };

        let avatar = avatar.unwrap_or_default();
        if let Err(reason) = validation::validate_avatar_with_config(&avatar, &self.config.protocol)
        {
            self.send_error_message(conn_id, ErrorCode::InvalidAvatar, reason);
            return;
        }

        let team = team
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        if let Some(tag) = &team {
            if let Err(reason) = validation::validate_team_with_config(tag, &self.config.protocol) {
                self.send_error_message(conn_id, ErrorCode::InvalidTeam, reason);
                return;
            }
        }

        // Admission: only brand-new nicknames consume a player slot.
        let is_new = self.registry.get(&nickname).is_none();
        if is_new && self.registry.len() >= self.config.max_players {
            tracing::info!(
                room_code = %self.code,
                %nickname,
                limit = self.config.max_players,
                "join rejected: room full"
            );
            // RoomFull disconnects, so send_error also drops the pending entry.
            self.send_error(conn_id, ErrorCode::RoomFull);
            return;
        }

        // SAFETY-adjacent guard: checked contains_key above.
        let Some(sender) = self.pending.remove(&conn_id) else {
            return;
        };

        let outcome = self.registry.upsert(&nickname, avatar, team, conn_id);

        if let UpsertOutcome::Displaced { old_conn } = outcome {
            // Last one wins: the displaced connection learns why, then goes.
            self.bus.send_to(old_conn, self.phase, ServerMessage::Kicked);
            self.bus.remove(old_conn);
            self.labels.remove(&old_conn);
            tracing::info!(room_code = %self.code, %nickname, "nickname takeover; old connection kicked");
        }

        self.bus.insert(conn_id, SubscriberRole::Player, sender);

        let sync = self.join_sync(Some(&nickname));
        let (reply, announcement) = match outcome {
            UpsertOutcome::New => (
                ServerMessage::JoinedRoom(Box::new(sync)),
                ServerMessage::PlayerJoined {
                    nickname: nickname.clone(),
                    participants: self.registry.roster(),
                    player_count: self.registry.len(),
                },
            ),
            UpsertOutcome::Reconnected | UpsertOutcome::Displaced { .. } => (
                ServerMessage::Reconnected(Box::new(sync)),
                ServerMessage::PlayerReconnected {
                    nickname: nickname.clone(),
                    participants: self.registry.roster(),
                    player_count: self.registry.len(),
                },
            ),
        };

        self.bus.send_to(conn_id, self.phase, reply);
        let dropped = self.bus.publish_all_except(self.phase, announcement, conn_id);
        self.reap(dropped);

        tracing::info!(
            room_code = %self.code,
            %nickname,
            players = self.registry.len(),
            phase = %self.phase,
            "player joined"
        );
        self.touch();
    }

    fn handle_answer(&mut self, conn_id: ConnectionId, answer_index: usize) {
        let Some(nickname) = self.registry.nickname_for(conn_id).map(str::to_string) else {
            self.send_error(conn_id, ErrorCode::InvalidCommand);
            return;
        };
        if self.phase != GamePhase::Question {
            self.send_error(conn_id, ErrorCode::InvalidCommand);
            return;
        }
        if self.answers.contains_key(&nickname) {
            self.send_error(conn_id, ErrorCode::AlreadyAnswered);
            return;
        }

        let (Some(index), Some(started_at)) = (self.current_question, self.question_started_at)
        else {
            self.invariant_violation(conn_id, "Question phase without a current question");
            return;
        };
        let Some(question) = self.quiz.question(index) else {
            self.invariant_violation(conn_id, "current question index out of quiz range");
            return;
        };

        if answer_index >= question.options.len() {
            self.send_error(conn_id, ErrorCode::InvalidAnswerIndex);
            return;
        }

        let now = clock::now();
        let latency_fraction =
            (now - started_at).as_secs_f64() / self.time_limit.as_secs_f64().max(f64::MIN_POSITIVE);
        let correct = answer_index == question.correct_index;

        let (multiplier, previous_streak) = {
            let Some(participant) = self.registry.get(&nickname) else {
                self.invariant_violation(conn_id, "answer from unregistered nickname");
                return;
            };
            (participant.multiplier, participant.streak)
        };

        let score = scoring::score_answer(
            correct,
            latency_fraction,
            previous_streak,
            multiplier,
            question.is_bonus,
        );

        if let Some(participant) = self.registry.get_mut(&nickname) {
            participant.score += score.points;
            participant.streak = score.new_streak;
        }
        self.answers.insert(
            nickname.clone(),
            RecordedAnswer {
                option_index: answer_index,
                correct,
                points: score.points,
                multiplier,
                answered_at: now,
            },
        );

        tracing::debug!(
            room_code = %self.code,
            %nickname,
            answer_index,
            correct,
            points = score.points,
            streak = score.new_streak,
            "answer recorded"
        );

        self.bus.send_to(
            conn_id,
            self.phase,
            ServerMessage::AnswerResult {
                correct,
                points: score.points,
                multiplier,
                streak: score.new_streak,
            },
        );
        let dropped = self.bus.publish_observers(
            self.phase,
            ServerMessage::AnswerCount {
                answered: self.answers.len(),
            },
        );
        self.reap(dropped);
        self.touch();

        if self.all_live_answered() {
            self.finish_question(false);
        }
    }

    fn handle_power_up(&mut self, conn_id: ConnectionId, power_up: PowerUp) {
        let Some(nickname) = self.registry.nickname_for(conn_id).map(str::to_string) else {
            self.send_error(conn_id, ErrorCode::InvalidCommand);
            return;
        };
        if self.phase != GamePhase::Question {
            self.send_error(conn_id, ErrorCode::InvalidCommand);
            return;
        }
        // Power-ups only apply before the player's own answer.
        if self.answers.contains_key(&nickname) {
            self.send_error(conn_id, ErrorCode::PowerUpUnavailable);
            return;
        }

        let Some(index) = self.current_question else {
            self.invariant_violation(conn_id, "Question phase without a current question");
            return;
        };
        let Some(question) = self.quiz.question(index) else {
            self.invariant_violation(conn_id, "current question index out of quiz range");
            return;
        };

        // Fifty-fifty on a two-option question would remove the only wrong
        // option; rejected without consuming the power-up.
        if power_up == PowerUp::FiftyFifty && question.options.len() == 2 {
            self.send_error(conn_id, ErrorCode::PowerUpUnavailable);
            return;
        }

        let correct_index = question.correct_index;
        let option_count = question.options.len();

        let Some(participant) = self.registry.get_mut(&nickname) else {
            self.invariant_violation(conn_id, "power-up from unregistered nickname");
            return;
        };
        if !participant.power_ups.consume(power_up) {
            self.send_error(conn_id, ErrorCode::PowerUpUnavailable);
            return;
        }

        let remove_indices = match power_up {
            PowerUp::DoublePoints => {
                participant.multiplier = 2.0;
                None
            }
            PowerUp::FiftyFifty => {
                let mut wrong: Vec<usize> =
                    (0..option_count).filter(|i| *i != correct_index).collect();
                let mut rng = rand::rng();
                let first = wrong.swap_remove(rng.random_range(0..wrong.len()));
                let second = wrong.swap_remove(rng.random_range(0..wrong.len()));
                let mut picked = vec![first, second];
                picked.sort_unstable();
                Some(picked)
            }
        };

        tracing::debug!(
            room_code = %self.code,
            %nickname,
            power_up = %power_up,
            "power-up consumed"
        );

        self.bus.send_to(
            conn_id,
            self.phase,
            ServerMessage::PowerUpActivated {
                power_up,
                remove_indices,
            },
        );
        self.touch();
    }

    // -- Organizer commands --------------------------------------------------

    fn require_organizer(&mut self, conn_id: ConnectionId) -> bool {
        if self.organizer_conn == Some(conn_id) {
            return true;
        }
        self.send_error(conn_id, ErrorCode::InvalidCommand);
        false
    }

    fn handle_start_game(&mut self, conn_id: ConnectionId) {
        if !self.require_organizer(conn_id) {
            return;
        }
        if self.phase != GamePhase::Lobby {
            self.send_error(conn_id, ErrorCode::InvalidCommand);
            return;
        }
        if self.registry.is_empty() {
            self.send_error_message(
                conn_id,
                ErrorCode::InvalidCommand,
                "Cannot start with no participants".to_string(),
            );
            return;
        }

        let dropped = self.bus.publish_all(self.phase, ServerMessage::GameStarting);
        self.reap(dropped);
        self.phase = GamePhase::Intro;
        self.current_question = Some(0);

        tracing::info!(
            room_code = %self.code,
            players = self.registry.len(),
            "game starting"
        );
        self.touch();
    }

    fn handle_next_question(&mut self, conn_id: ConnectionId) {
        if !self.require_organizer(conn_id) {
            return;
        }
        let next = match (self.phase, self.current_question) {
            // Intro presents the question the index already points at.
            (GamePhase::Intro, Some(current)) => current,
            (GamePhase::Reveal, Some(current)) => current + 1,
            _ => {
                self.send_error(conn_id, ErrorCode::InvalidCommand);
                return;
            }
        };

        if next >= self.quiz.len() {
            self.enter_podium();
        } else {
            self.begin_question(next);
        }
        self.touch();
    }

    fn handle_end_quiz(&mut self, conn_id: ConnectionId) {
        if !self.require_organizer(conn_id) {
            return;
        }
        if !matches!(self.phase, GamePhase::Question | GamePhase::Reveal) {
            self.send_error(conn_id, ErrorCode::InvalidCommand);
            return;
        }
        self.cancel_question_timers();
        self.enter_podium();
        self.touch();
    }

    fn handle_reset_room(
        &mut self,
        conn_id: ConnectionId,
        quiz_data: Option<QuizData>,
        time_limit_seconds: Option<u64>,
    ) {
        if !self.require_organizer(conn_id) {
            return;
        }
        // Podium is the replay path; Lobby allows swapping the quiz before
        // a game ever starts.
        if !matches!(self.phase, GamePhase::Podium | GamePhase::Lobby) {
            self.send_error(conn_id, ErrorCode::InvalidCommand);
            return;
        }

        if let Some(data) = quiz_data {
            match QuizSnapshot::from_data(data) {
                Ok(snapshot) => self.quiz = Arc::new(snapshot),
                Err(err) => {
                    self.send_error_message(conn_id, ErrorCode::InvalidQuiz, err.to_string());
                    return;
                }
            }
        }
        if let Some(seconds) = time_limit_seconds {
            if seconds == 0 {
                self.send_error_message(
                    conn_id,
                    ErrorCode::InvalidCommand,
                    "time_limit_seconds must be greater than 0".to_string(),
                );
                return;
            }
            self.time_limit = Duration::from_secs(seconds);
        }

        self.cancel_question_timers();
        self.registry.reset_for_replay();
        self.answers.clear();
        self.current_question = None;
        self.question_started_at = None;
        self.question_deadline = None;
        self.phase = GamePhase::Lobby;

        let message = ServerMessage::RoomReset {
            participants: self.registry.roster(),
            player_count: self.registry.len(),
        };
        let dropped = self.bus.publish_all(self.phase, message);
        self.reap(dropped);

        tracing::info!(
            room_code = %self.code,
            questions = self.quiz.len(),
            "room reset to lobby"
        );
        self.touch();
    }

    // -- Question lifecycle --------------------------------------------------

    fn begin_question(&mut self, index: usize) {
        let Some(view) = self.quiz.view(index, self.time_limit.as_secs()) else {
            tracing::error!(room_code = %self.code, index, "begin_question out of range");
            self.close_room(RoomCloseReason::InternalError);
            return;
        };

        self.cancel_question_timers();
        self.phase = GamePhase::Question;
        self.current_question = Some(index);
        self.answers.clear();
        self.registry.reset_multipliers();

        let now = clock::now();
        self.question_started_at = Some(now);
        self.question_deadline = Some(now + self.time_limit);

        self.question_generation += 1;
        let generation = self.question_generation;
        self.question_timers.push(clock::schedule_repeating(
            self.tx.clone(),
            Duration::from_secs(1),
            move || {
                RoomCommand::Timer(TimerEvent {
                    generation,
                    kind: TimerKind::QuestionTick,
                })
            },
        ));
        self.question_timers.push(clock::schedule(
            self.tx.clone(),
            self.time_limit,
            RoomCommand::Timer(TimerEvent {
                generation,
                kind: TimerKind::QuestionExpiry,
            }),
        ));

        tracing::info!(
            room_code = %self.code,
            question = index + 1,
            total = self.quiz.len(),
            time_limit_seconds = self.time_limit.as_secs(),
            "question started"
        );

        let dropped = self
            .bus
            .publish_all(self.phase, ServerMessage::Question(Box::new(view)));
        self.reap(dropped);
    }

    /// Question -> Reveal. `timed_out` selects whether the terminal
    /// `TIMER 0` is emitted; the early all-answered path skips it.
    fn finish_question(&mut self, timed_out: bool) {
        if self.phase != GamePhase::Question {
            return;
        }
        let Some(index) = self.current_question else {
            tracing::error!(room_code = %self.code, "finish_question without current question");
            self.close_room(RoomCloseReason::InternalError);
            return;
        };
        let Some(question) = self.quiz.question(index) else {
            tracing::error!(room_code = %self.code, index, "finish_question out of range");
            self.close_room(RoomCloseReason::InternalError);
            return;
        };
        let correct_index = question.correct_index;

        self.cancel_question_timers();

        if timed_out {
            let dropped = self
                .bus
                .publish_all(self.phase, ServerMessage::Timer { remaining: 0 });
            self.reap(dropped);
        }

        // A missed question breaks the streak (I5).
        let unanswered: Vec<String> = self
            .registry
            .list()
            .filter(|p| !self.answers.contains_key(&p.nickname))
            .map(|p| p.nickname.clone())
            .collect();
        for nickname in unanswered {
            if let Some(participant) = self.registry.get_mut(&nickname) {
                participant.streak = 0;
            }
        }

        self.phase = GamePhase::Reveal;

        let board = leaderboard::compute(&self.registry);
        leaderboard::snapshot_ranks(&mut self.registry, &board);

        let is_final = index + 1 >= self.quiz.len();
        let correct_count = self.answers.values().filter(|a| a.correct).count();
        tracing::info!(
            room_code = %self.code,
            question = index + 1,
            answered = self.answers.len(),
            correct = correct_count,
            timed_out,
            is_final,
            "question over"
        );
        if let Some(started_at) = self.question_started_at {
            for (nickname, answer) in &self.answers {
                #[allow(clippy::cast_possible_truncation)]
                let latency_ms = (answer.answered_at - started_at).as_millis() as u64;
                tracing::trace!(
                    room_code = %self.code,
                    %nickname,
                    option = answer.option_index,
                    correct = answer.correct,
                    points = answer.points,
                    multiplier = answer.multiplier,
                    latency_ms,
                    "answer ledger entry"
                );
            }
        }

        let message = ServerMessage::QuestionOver(Box::new(QuestionOverPayload {
            correct_index,
            leaderboard: board,
            is_final,
        }));
        let dropped = self.bus.publish_all(self.phase, message);
        self.reap(dropped);
        self.touch();
    }

    fn enter_podium(&mut self) {
        self.phase = GamePhase::Podium;
        self.current_question = None;
        self.question_started_at = None;
        self.question_deadline = None;

        let message = ServerMessage::Podium(Box::new(PodiumPayload {
            leaderboard: leaderboard::compute(&self.registry),
            team_leaderboard: leaderboard::team_standings(&self.registry),
        }));
        let dropped = self.bus.publish_all(self.phase, message);
        self.reap(dropped);

        tracing::info!(room_code = %self.code, players = self.registry.len(), "podium");
    }

    /// True when every connected player has an accepted answer.
    /// Disconnected players never hold up the reveal.
    fn all_live_answered(&self) -> bool {
        let mut live = 0;
        for participant in self.registry.list() {
            if participant.is_connected() {
                live += 1;
                if !self.answers.contains_key(&participant.nickname) {
                    return false;
                }
            }
        }
        live > 0
    }

    // -- Timers --------------------------------------------------------------

    fn handle_timer(&mut self, event: TimerEvent) {
        match event.kind {
            TimerKind::QuestionTick => {
                if event.generation != self.question_generation
                    || self.phase != GamePhase::Question
                {
                    return;
                }
                let Some(deadline) = self.question_deadline else {
                    return;
                };
                let remaining = deadline
                    .saturating_duration_since(clock::now())
                    .as_secs_f64()
                    .round();
                // The zero tick belongs to the expiry path, immediately
                // before the transition to Reveal.
                if remaining >= 1.0 {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let remaining = remaining as u64;
                    let dropped = self
                        .bus
                        .publish_all(self.phase, ServerMessage::Timer { remaining });
                    self.reap(dropped);
                }
            }
            TimerKind::QuestionExpiry => {
                if event.generation != self.question_generation
                    || self.phase != GamePhase::Question
                {
                    return;
                }
                self.finish_question(true);
            }
            TimerKind::OrganizerGrace => {
                if event.generation != self.grace_generation || self.organizer_conn.is_some() {
                    return;
                }
                tracing::warn!(room_code = %self.code, "organizer grace expired; closing room");
                self.close_room(RoomCloseReason::OrganizerLeft);
            }
            TimerKind::RoomTtl => {
                if event.generation != self.ttl_generation || self.phase == GamePhase::Closed {
                    return;
                }
                let idle = clock::now() - self.last_activity;
                if idle >= self.config.room_ttl {
                    tracing::info!(
                        room_code = %self.code,
                        idle_seconds = idle.as_secs(),
                        "room TTL expired"
                    );
                    self.close_room(RoomCloseReason::TtlExpired);
                } else {
                    // Activity happened since arming; sleep out the rest.
                    self.arm_ttl(self.config.room_ttl - idle);
                }
            }
        }
    }

    fn arm_ttl(&mut self, delay: Duration) {
        if let Some(timer) = self.ttl_timer.take() {
            timer.cancel();
        }
        self.ttl_generation += 1;
        self.ttl_timer = Some(clock::schedule(
            self.tx.clone(),
            delay,
            RoomCommand::Timer(TimerEvent {
                generation: self.ttl_generation,
                kind: TimerKind::RoomTtl,
            }),
        ));
    }

    fn cancel_question_timers(&mut self) {
        for timer in self.question_timers.drain(..) {
            timer.cancel();
        }
        self.question_generation += 1;
    }

    fn cancel_grace(&mut self) {
        if let Some(timer) = self.grace_timer.take() {
            timer.cancel();
        }
        self.grace_generation += 1;
    }

    // -- Close ---------------------------------------------------------------

    fn close_room(&mut self, reason: RoomCloseReason) {
        if self.phase == GamePhase::Closed {
            return;
        }
        tracing::info!(
            room_code = %self.code,
            phase = %self.phase,
            ?reason,
            players = self.registry.len(),
            "room closing"
        );

        self.cancel_question_timers();
        self.cancel_grace();
        if let Some(timer) = self.ttl_timer.take() {
            timer.cancel();
        }

        let dropped = self
            .bus
            .publish_all(self.phase, ServerMessage::RoomClosed { reason });
        // Subscribers are going away regardless; no need to reap.
        let _ = dropped;

        self.phase = GamePhase::Closed;
        self.current_question = None;
        self.question_started_at = None;
        self.question_deadline = None;
        self.organizer_conn = None;
        self.bus.clear();
        self.pending.clear();
        self.labels.clear();
    }

    // -- Helpers -------------------------------------------------------------

    /// Treats connections whose outbound queue overflowed as disconnects.
    /// Handling one drop can publish more events and overflow further
    /// subscribers; iterate until quiet.
    fn reap(&mut self, dropped: Vec<ConnectionId>) {
        let mut queue = dropped;
        while let Some(conn_id) = queue.pop() {
            tracing::warn!(
                room_code = %self.code,
                conn = %conn_id,
                "subscriber queue overflowed; dropping connection"
            );
            self.handle_disconnected(conn_id);
        }
    }

    fn send_error(&mut self, conn_id: ConnectionId, code: ErrorCode) {
        self.send_error_message(conn_id, code, code.description().to_string());
    }

    fn send_error_message(&mut self, conn_id: ConnectionId, code: ErrorCode, message: String) {
        let event = ServerMessage::Error {
            message,
            error_code: Some(code),
        };
        if self.bus.contains(conn_id) {
            self.bus.send_to(conn_id, self.phase, event);
        } else if let Some(sender) = self.pending.get(&conn_id) {
            let frame = crate::protocol::EventFrame::new(self.phase, event);
            let _ = sender.try_send(Arc::new(frame));
        }
        if code.should_disconnect() {
            self.bus.remove(conn_id);
            self.pending.remove(&conn_id);
        }
    }

    /// A bug surfaced at runtime: log everything, drop the offending
    /// connection, and terminate the room cleanly rather than continue
    /// with corrupt state.
    fn invariant_violation(&mut self, conn_id: ConnectionId, context: &str) {
        tracing::error!(
            room_code = %self.code,
            phase = %self.phase,
            current_question = ?self.current_question,
            conn = %conn_id,
            context,
            "internal invariant violation"
        );
        self.send_error(conn_id, ErrorCode::InternalError);
        self.close_room(RoomCloseReason::InternalError);
    }

    fn touch(&mut self) {
        self.last_activity = clock::now();
    }

    fn time_remaining(&self) -> Option<u64> {
        if self.phase != GamePhase::Question {
            return None;
        }
        let deadline = self.question_deadline?;
        let remaining = deadline
            .saturating_duration_since(clock::now())
            .as_secs_f64()
            .round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let seconds = remaining.max(0.0) as u64;
        Some(seconds)
    }

    fn current_view(&self) -> Option<crate::protocol::QuestionView> {
        if self.phase != GamePhase::Question {
            return None;
        }
        self.quiz
            .view(self.current_question?, self.time_limit.as_secs())
    }

    fn join_sync(&self, nickname: Option<&str>) -> JoinSyncPayload {
        let participant = nickname.and_then(|n| self.registry.get(n));
        JoinSyncPayload {
            room_code: self.code.clone(),
            nickname: nickname.map(str::to_string),
            question_number: self
                .current_question
                .filter(|_| self.phase.has_question())
                .map(|i| i + 1),
            total_questions: self.quiz.len(),
            score: participant.map_or(0, |p| p.score),
            streak: participant.map_or(0, |p| p.streak),
            participants: self.registry.roster(),
            player_count: self.registry.len(),
            question: self.current_view(),
            time_remaining_seconds: self.time_remaining(),
        }
    }

    fn organizer_sync(&self) -> OrganizerSyncPayload {
        OrganizerSyncPayload {
            room_code: self.code.clone(),
            quiz_title: self.quiz.title().to_string(),
            question_number: self
                .current_question
                .filter(|_| self.phase.has_question())
                .map(|i| i + 1),
            total_questions: self.quiz.len(),
            question: self.current_view(),
            time_remaining_seconds: self.time_remaining(),
            answered: self.answers.len(),
            leaderboard: leaderboard::compute(&self.registry),
            participants: self.registry.roster(),
            player_count: self.registry.len(),
        }
    }

    fn status(&self) -> RoomStatus {
        RoomStatus {
            phase: self.phase,
            participant_count: self.registry.len(),
            connected_players: self.registry.connected_count(),
            spectator_count: self.bus.count_role(SubscriberRole::Spectator),
            has_organizer: self.organizer_conn.is_some(),
            idle: clock::now() - self.last_activity,
        }
    }
}
