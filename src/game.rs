use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, info, instrument, warn};

use crate::ai::{DifficultySelector, MoveSelector};
use crate::board::{Board, Move};
use crate::error::GameError;
use crate::messaging::{ChannelId, MessageHandle, ReactionEmoji, UserId};
use crate::pagination::{self, Fingerprint};
use crate::types::{Color, Difficulty, Outcome, Position, Score};

pub type GameId = String;

/// The human always plays Black and moves first.
pub const PLAYER_COLOR: Color = Color::Black;
pub const AI_COLOR: Color = Color::White;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    Ended,
}

/// What happened as a result of one accepted player move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    pub player_move: Position,
    pub ai_moves: Vec<Position>,
    /// Sides that had to pass, in order.
    pub passes: Vec<Color>,
    pub outcome: Option<Outcome>,
}

/// One game against the computer, plus the state needed to keep its chat
/// message in sync.
pub struct GameSession {
    id: GameId,
    channel_id: ChannelId,
    owner_id: UserId,
    board: Board,
    current_turn: Color,
    difficulty: Difficulty,
    status: GameStatus,
    last_note: Option<String>,
    page: usize,
    locked: bool,
    last_fingerprint: Option<Fingerprint>,
    reactions_degraded: bool,
    posted_reactions: BTreeSet<ReactionEmoji>,
    tracking_message: Option<MessageHandle>,
    selector: Box<dyn MoveSelector>,
}

impl GameSession {
    pub fn new(id: GameId, channel_id: ChannelId, owner_id: UserId, difficulty: Difficulty) -> Self {
        Self::with_board(id, channel_id, owner_id, difficulty, Board::new(), PLAYER_COLOR)
    }

    /// Starts from an arbitrary position. A position that is already over is
    /// marked ended immediately.
    pub fn with_board(
        id: GameId,
        channel_id: ChannelId,
        owner_id: UserId,
        difficulty: Difficulty,
        board: Board,
        current_turn: Color,
    ) -> Self {
        let mut session = Self {
            id,
            channel_id,
            owner_id,
            board,
            current_turn,
            difficulty,
            status: GameStatus::InProgress,
            last_note: None,
            page: 0,
            locked: false,
            last_fingerprint: None,
            reactions_degraded: false,
            posted_reactions: BTreeSet::new(),
            tracking_message: None,
            selector: Box::new(DifficultySelector),
        };
        session.finish_if_terminal();
        session
    }

    /// Replaces the computer's move selector.
    pub fn with_selector(mut self, selector: Box<dyn MoveSelector>) -> Self {
        self.selector = selector;
        self
    }

    pub fn id(&self) -> &GameId {
        &self.id
    }

    pub fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_turn(&self) -> Color {
        self.current_turn
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_ended(&self) -> bool {
        self.status == GameStatus::Ended
    }

    pub fn last_note(&self) -> Option<&str> {
        self.last_note.as_deref()
    }

    pub fn score(&self) -> Score {
        self.board.score()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Moves the player may choose from right now, in canonical order.
    pub fn selectable_moves(&self) -> Vec<Move> {
        if self.is_ended() || self.current_turn != PLAYER_COLOR {
            return Vec::new();
        }
        self.board.legal_moves(PLAYER_COLOR)
    }

    /// Current page, clamped against the current move list.
    pub fn page(&self) -> usize {
        pagination::clamp_page(self.page, self.selectable_moves().len())
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = pagination::clamp_page(page, self.selectable_moves().len());
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.selectable_moves().len(), self.page)
    }

    pub fn needs_reconcile(&self, fingerprint: Fingerprint) -> bool {
        !self.reactions_degraded && self.last_fingerprint != Some(fingerprint)
    }

    pub fn mark_reconciled(&mut self, fingerprint: Fingerprint) {
        self.last_fingerprint = Some(fingerprint);
    }

    /// Forgets the last reconciled state so the next pass diffs again.
    pub fn invalidate_reconciled(&mut self) {
        self.last_fingerprint = None;
    }

    pub fn reactions_degraded(&self) -> bool {
        self.reactions_degraded
    }

    /// Switches to text-only control for good. Returns `true` the first time.
    pub fn degrade_reactions(&mut self) -> bool {
        !std::mem::replace(&mut self.reactions_degraded, true)
    }

    pub fn posted_reactions(&self) -> &BTreeSet<ReactionEmoji> {
        &self.posted_reactions
    }

    pub fn record_reaction(&mut self, emoji: ReactionEmoji, present: bool) {
        if present {
            self.posted_reactions.insert(emoji);
        } else {
            self.posted_reactions.remove(&emoji);
        }
    }

    pub fn tracking_message(&self) -> Option<&MessageHandle> {
        self.tracking_message.as_ref()
    }

    pub fn set_tracking_message(&mut self, message: MessageHandle) {
        self.tracking_message = Some(message);
    }

    /// Claims the single-writer guard.
    pub fn try_lock(&mut self) -> Result<(), GameError> {
        if self.locked {
            return Err(GameError::Busy);
        }
        self.locked = true;
        Ok(())
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Plays `position` for the player, then lets the computer answer.
    ///
    /// Rejections leave the session untouched.
    #[instrument(skip(self), fields(game_id = %self.id))]
    pub fn handle_player_move(&mut self, position: Position) -> Result<MoveReport, GameError> {
        if self.locked {
            warn!("move rejected: session busy");
            return Err(GameError::Busy);
        }
        if self.is_ended() {
            return Err(GameError::GameEnded);
        }
        if self.current_turn != PLAYER_COLOR {
            return Err(GameError::NotYourTurn);
        }
        let mv = self
            .board
            .legal_moves(PLAYER_COLOR)
            .into_iter()
            .find(|mv| mv.position() == position)
            .ok_or(GameError::IllegalMove { position })?;

        self.try_lock()?;
        let report = self.play_locked(&mv);
        self.unlock();

        info!(
            player_move = %report.player_move,
            ai_moves = ?report.ai_moves,
            passes = ?report.passes,
            outcome = ?report.outcome,
            "move resolved"
        );
        Ok(report)
    }

    fn play_locked(&mut self, mv: &Move) -> MoveReport {
        self.board.apply_move(PLAYER_COLOR, mv);
        self.current_turn = AI_COLOR;
        self.last_note = None;

        let mut report = MoveReport {
            player_move: mv.position(),
            ai_moves: Vec::new(),
            passes: Vec::new(),
            outcome: None,
        };

        // Every AI ply fills a square and two passes in a row mean the game is
        // over, so the loop settles within two steps per empty square.
        let max_steps = 2 * self.board.empty_count() as usize + 1;
        for _ in 0..max_steps {
            if self.board.is_terminal() {
                break;
            }

            let moves = self.board.legal_moves(self.current_turn);
            if moves.is_empty() {
                debug!(side = ?self.current_turn, "no legal moves, passing");
                report.passes.push(self.current_turn);
                self.last_note = Some(pass_note(self.current_turn));
                self.current_turn = self.current_turn.opponent();
                continue;
            }

            if self.current_turn != AI_COLOR {
                break;
            }

            let reply = self.pick_ai_move(&moves);
            self.board.apply_move(AI_COLOR, &reply);
            report.ai_moves.push(reply.position());
            self.current_turn = PLAYER_COLOR;
        }

        report.outcome = self.finish_if_terminal();
        report
    }

    fn pick_ai_move(&self, moves: &[Move]) -> Move {
        match self
            .selector
            .select_move(&self.board, moves, self.difficulty, AI_COLOR)
        {
            Some(mv) if moves.contains(&mv) => mv,
            other => {
                warn!(selected = ?other.map(|mv| mv.position()), "selector returned an unusable move, using first legal move");
                moves[0].clone()
            }
        }
    }

    fn finish_if_terminal(&mut self) -> Option<Outcome> {
        if !self.board.is_terminal() {
            return None;
        }
        let score = self.board.score();
        let outcome = score.outcome();
        self.status = GameStatus::Ended;
        self.last_note = Some(outcome_note(outcome, score));
        info!(game_id = %self.id, ?outcome, black = score.black, white = score.white, "game over");
        Some(outcome)
    }
}

impl fmt::Debug for GameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("id", &self.id)
            .field("channel_id", &self.channel_id)
            .field("owner_id", &self.owner_id)
            .field("current_turn", &self.current_turn)
            .field("difficulty", &self.difficulty)
            .field("status", &self.status)
            .field("page", &self.page)
            .field("locked", &self.locked)
            .field("reactions_degraded", &self.reactions_degraded)
            .finish_non_exhaustive()
    }
}

pub fn side_label(color: Color) -> String {
    let who = if color == PLAYER_COLOR { "You" } else { "AI" };
    format!("{who} ({})", color.symbol())
}

fn pass_note(color: Color) -> String {
    format!("{} had no legal moves and passed.", side_label(color))
}

fn outcome_note(outcome: Outcome, score: Score) -> String {
    let result = match outcome {
        Outcome::Winner(color) if color == PLAYER_COLOR => "you win!",
        Outcome::Winner(_) => "the AI wins.",
        Outcome::Draw => "it's a draw.",
    };
    format!(
        "Game over ({} {} - {} {}): {result}",
        Color::Black.symbol(),
        score.black,
        score.white,
        Color::White.symbol()
    )
}
