//! Drives a game through a chat message: renders the board, keeps the bot's
//! reactions in step with the selectable moves, and turns reactions (or text
//! replies when reactions are unavailable) into moves.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info, instrument, warn};

use crate::config::BotConfig;
use crate::error::{ControllerError, GameError, MessagingError};
use crate::game::{GameId, GameSession, MoveReport, PLAYER_COLOR, side_label};
use crate::messaging::{Attachment, ChannelId, MessageHandle, Messenger, ReactionEmoji};
use crate::pagination;
use crate::registry::{GameRegistry, SharedSession, lock_session};
use crate::render::render_board;
use crate::types::{Color, Difficulty, Position};

pub const ATTACHMENT_NAME: &str = "reversi.png";
const DEGRADED_WARNING: &str = "⚠️ I don't have permission to manage reactions here. \
Pick moves by replying with the number or square from the list (e.g. `3` or `d3`), \
or `next` / `prev` to change page.";
const GENERIC_FAILURE: &str = "⚠️ Something went wrong while updating the board.";

/// What an inbound reaction or text command resulted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Not addressed to a live game, or not a game command.
    Ignored,
    /// Someone other than the owner reacted; the reaction was removed.
    Revoked,
    PageChanged { page: usize },
    Played(MoveReport),
    /// The command was understood but the game refused it.
    Rejected(GameError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Page(isize),
    Index(usize),
    Square(Position),
}

impl Command {
    fn from_reaction(reaction: ReactionEmoji) -> Self {
        match reaction {
            ReactionEmoji::Prev => Self::Page(-1),
            ReactionEmoji::Next => Self::Page(1),
            ReactionEmoji::Digit(d) => Self::Index(d as usize),
        }
    }

    fn parse_text(input: &str) -> Option<Self> {
        let input = input.trim();
        match input.to_ascii_lowercase().as_str() {
            "next" | ">" => return Some(Self::Page(1)),
            "prev" | "<" => return Some(Self::Page(-1)),
            _ => {}
        }
        if let Some(reaction) = ReactionEmoji::parse(input) {
            return Some(Self::from_reaction(reaction));
        }
        if let Ok(index) = input.parse::<usize>() {
            return (index < pagination::PAGE_SIZE).then_some(Self::Index(index));
        }
        Position::parse(input).map(Self::Square)
    }
}

/// Everything needed to publish one state of a game, captured under the
/// session lock so the network calls can run without it.
struct Frame {
    game_id: GameId,
    channel_id: ChannelId,
    message: Option<MessageHandle>,
    text: String,
    png: Vec<u8>,
    ended: bool,
}

/// Owns the registry and mediates every interaction between games and the
/// messaging platform.
pub struct ReactionController {
    messenger: Arc<dyn Messenger>,
    registry: Mutex<GameRegistry>,
    config: BotConfig,
}

impl ReactionController {
    pub fn new(messenger: Arc<dyn Messenger>, config: BotConfig) -> Self {
        Self::with_registry(messenger, config, GameRegistry::new())
    }

    pub fn with_registry(messenger: Arc<dyn Messenger>, config: BotConfig, registry: GameRegistry) -> Self {
        Self {
            messenger,
            registry: Mutex::new(registry),
            config,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Looks up a game that is still registered.
    pub fn session(&self, game_id: &str) -> Option<SharedSession> {
        self.registry().get(game_id)
    }

    pub fn active_games(&self) -> usize {
        self.registry().len()
    }

    /// Starts a new game from the opening position and posts its board.
    pub async fn start_game(
        &self,
        owner_id: &str,
        channel_id: &str,
        difficulty: Option<Difficulty>,
    ) -> Result<GameId, ControllerError> {
        let difficulty = difficulty.unwrap_or(self.config.default_difficulty);
        let (owner, channel) = (owner_id.to_string(), channel_id.to_string());
        self.start_with(channel_id, move |id| GameSession::new(id, channel, owner, difficulty))
            .await
    }

    /// Registers the session built by `build`, posts it, and links the posted
    /// message. If the post fails the game is discarded.
    #[instrument(skip(self, build))]
    pub async fn start_with(
        &self,
        channel_id: &str,
        build: impl FnOnce(GameId) -> GameSession + Send,
    ) -> Result<GameId, ControllerError> {
        if !self.config.allows_channel(channel_id) {
            warn!("game start refused: channel not allowed");
            return Err(GameError::ChannelNotAllowed.into());
        }

        let session = self.registry().create_with(build);
        let frame = match self.frame(&session) {
            Ok(frame) => frame,
            Err(err) => {
                let id = lock_session(&session).id().clone();
                self.registry().unlink(&id);
                return Err(err);
            }
        };

        let attachment = Attachment::png(ATTACHMENT_NAME, frame.png);
        let handle = match self
            .messenger
            .send(&frame.channel_id, &frame.text, Some(attachment))
            .await
        {
            Ok(handle) => handle,
            Err(err) => {
                error!(game_id = %frame.game_id, error = %err, "failed to post board");
                self.registry().unlink(&frame.game_id);
                return Err(err.into());
            }
        };

        lock_session(&session).set_tracking_message(handle.clone());
        self.registry()
            .link_message(&frame.game_id, handle.message_id.clone());
        info!(game_id = %frame.game_id, message_id = %handle.message_id, "game started");

        self.reconcile(&session).await;
        if frame.ended {
            self.retire(&frame.game_id);
        }
        Ok(frame.game_id)
    }

    /// Handles a reaction added to any message the bot can see.
    #[instrument(skip(self))]
    pub async fn on_reaction_added(
        &self,
        message_id: &str,
        emoji: &str,
        user_id: &str,
    ) -> CommandOutcome {
        if user_id == self.messenger.bot_user() {
            return CommandOutcome::Ignored;
        }
        let Some(session) = self.registry().by_message(message_id) else {
            return CommandOutcome::Ignored;
        };

        let is_owner = lock_session(&session).is_owner(user_id);
        let outcome = if !is_owner {
            debug!("reaction from non-owner");
            CommandOutcome::Revoked
        } else {
            match ReactionEmoji::parse(emoji) {
                Some(reaction) => {
                    self.run_command(&session, Command::from_reaction(reaction))
                        .await
                }
                None => CommandOutcome::Ignored,
            }
        };

        self.revoke(&session, emoji, user_id).await;
        outcome
    }

    /// Text fallback for choosing moves: a page index, a square like `d3`, or
    /// `next` / `prev`.
    #[instrument(skip(self))]
    pub async fn text_command(
        &self,
        game_id: &str,
        user_id: &str,
        input: &str,
    ) -> Result<CommandOutcome, ControllerError> {
        let session = self.session(game_id).ok_or_else(|| GameError::UnknownGame {
            id: game_id.to_string(),
        })?;
        if !lock_session(&session).is_owner(user_id) {
            return Err(GameError::NotOwner.into());
        }
        let Some(command) = Command::parse_text(input) else {
            return Ok(CommandOutcome::Ignored);
        };
        Ok(self.run_command(&session, command).await)
    }

    async fn run_command(&self, session: &SharedSession, command: Command) -> CommandOutcome {
        let outcome = {
            let mut game = lock_session(session);
            match command {
                Command::Page(delta) => {
                    let current = game.page();
                    let target = current.saturating_add_signed(delta);
                    game.set_page(target);
                    if game.page() == current {
                        return CommandOutcome::Ignored;
                    }
                    CommandOutcome::PageChanged { page: game.page() }
                }
                Command::Index(index) => {
                    let moves = game.selectable_moves();
                    let visible = pagination::page_slice(&moves, game.page());
                    match visible.get(index).map(|mv| mv.position()) {
                        Some(position) => play(&mut game, position),
                        None => return CommandOutcome::Ignored,
                    }
                }
                Command::Square(position) => play(&mut game, position),
            }
        };

        match &outcome {
            CommandOutcome::Rejected(err) => {
                let channel = lock_session(session).channel_id().clone();
                self.notify(&channel, &format!("⚠️ {err}")).await;
            }
            _ => self.refresh(session).await,
        }
        outcome
    }

    /// Re-renders the tracking message and reconciles reactions. Failures are
    /// logged and reported as a generic notice; game state is never rolled back.
    async fn refresh(&self, session: &SharedSession) {
        let frame = match self.frame(session) {
            Ok(frame) => frame,
            Err(err) => {
                error!(error = %err, "render failed");
                return;
            }
        };

        if let Some(message) = &frame.message {
            let attachment = Attachment::png(ATTACHMENT_NAME, frame.png);
            if let Err(err) = self
                .messenger
                .edit(message, &frame.text, Some(attachment))
                .await
            {
                self.report_failure(&frame.channel_id, &err).await;
            }
        }

        self.reconcile(session).await;
        if frame.ended {
            self.retire(&frame.game_id);
        }
    }

    /// Brings the bot's reactions on the tracking message in line with the
    /// current page. Skipped when nothing it depends on changed; repeated when
    /// the session moved on while reactions were being updated.
    async fn reconcile(&self, session: &SharedSession) {
        loop {
            let (fingerprint, posted, message) = {
                let game = lock_session(session);
                let fingerprint = game.fingerprint();
                let Some(message) = game.tracking_message().cloned() else {
                    return;
                };
                if !game.needs_reconcile(fingerprint) {
                    debug!(?fingerprint, "reactions already in sync");
                    return;
                }
                (fingerprint, game.posted_reactions().clone(), message)
            };

            let desired = fingerprint.desired_reactions();
            let desired_set: BTreeSet<ReactionEmoji> = desired.iter().copied().collect();
            debug!(?fingerprint, desired = desired.len(), posted = posted.len(), "reconciling reactions");

            for emoji in desired.iter().filter(|e| !posted.contains(*e)) {
                match self.messenger.add_reaction(&message, emoji.as_str()).await {
                    Ok(()) => {
                        lock_session(session).record_reaction(*emoji, true);
                    }
                    Err(err) => return self.reaction_failure(session, &message.channel_id, err).await,
                }
            }

            let bot = self.messenger.bot_user();
            for emoji in posted.difference(&desired_set) {
                match self
                    .messenger
                    .remove_reaction(&message, emoji.as_str(), &bot)
                    .await
                {
                    Ok(()) => {
                        lock_session(session).record_reaction(*emoji, false);
                    }
                    Err(err) => return self.reaction_failure(session, &message.channel_id, err).await,
                }
            }

            let mut game = lock_session(session);
            if game.fingerprint() == fingerprint {
                game.mark_reconciled(fingerprint);
                return;
            }
            debug!(?fingerprint, current = ?game.fingerprint(), "session changed during reconcile");
            game.invalidate_reconciled();
        }
    }

    /// Removes a user's reaction so it acts as a one-shot button.
    async fn revoke(&self, session: &SharedSession, emoji: &str, user_id: &str) {
        let (message, degraded) = {
            let game = lock_session(session);
            (game.tracking_message().cloned(), game.reactions_degraded())
        };
        let Some(message) = message.filter(|_| !degraded) else {
            return;
        };
        if let Err(err) = self
            .messenger
            .remove_reaction(&message, emoji, &user_id.to_string())
            .await
        {
            self.reaction_failure(session, &message.channel_id, err).await;
        }
    }

    async fn reaction_failure(&self, session: &SharedSession, channel_id: &ChannelId, err: MessagingError) {
        if !err.is_permission() {
            self.report_failure(channel_id, &err).await;
            return;
        }
        let first = lock_session(session).degrade_reactions();
        if first {
            warn!(error = %err, "reaction permission missing, switching to text control");
            self.notify(channel_id, DEGRADED_WARNING).await;
        }
    }

    async fn report_failure(&self, channel_id: &ChannelId, err: &MessagingError) {
        error!(channel_id = %channel_id, error = %err, "messaging call failed");
        self.notify(channel_id, GENERIC_FAILURE).await;
    }

    /// Best-effort plain message.
    async fn notify(&self, channel_id: &ChannelId, text: &str) {
        if let Err(err) = self.messenger.send(channel_id, text, None).await {
            error!(channel_id = %channel_id, error = %err, "failed to send notice");
        }
    }

    fn retire(&self, game_id: &str) {
        self.registry().unlink(game_id);
    }

    fn frame(&self, session: &SharedSession) -> Result<Frame, ControllerError> {
        let game = lock_session(session);
        let moves = game.selectable_moves();
        let page = game.page();
        let visible = pagination::page_slice(&moves, page);
        let labels = pagination::label_map(visible);
        let png = render_board(game.board(), &labels).to_png()?;
        let text = status_text(&self.config.game_label, &game, visible, page, pagination::total_pages(moves.len()));

        Ok(Frame {
            game_id: game.id().clone(),
            channel_id: game.channel_id().clone(),
            message: game.tracking_message().cloned(),
            text,
            png,
            ended: game.is_ended(),
        })
    }

    fn registry(&self) -> MutexGuard<'_, GameRegistry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn play(game: &mut GameSession, position: Position) -> CommandOutcome {
    match game.handle_player_move(position) {
        Ok(report) => CommandOutcome::Played(report),
        Err(err) => {
            debug!(error = %err, "move rejected");
            CommandOutcome::Rejected(err)
        }
    }
}

/// Message body shown above the board image.
pub fn status_text(
    label: &str,
    game: &GameSession,
    visible: &[crate::board::Move],
    page: usize,
    total_pages: usize,
) -> String {
    let control = if game.reactions_degraded() {
        "text replies"
    } else {
        "reactions"
    };
    let turn = if game.is_ended() {
        "game over".to_string()
    } else {
        side_label(game.current_turn())
    };
    let score = game.score();

    let mut lines = vec![
        format!(
            "**{label}** | AI: {} | controls: {control}",
            game.difficulty().label()
        ),
        format!(
            "Turn: {turn} | {} {} - {} {}",
            Color::Black.symbol(),
            score.black,
            score.white,
            Color::White.symbol()
        ),
    ];
    if let Some(note) = game.last_note() {
        lines.push(note.to_string());
    }
    lines.push(format!("page {}/{}", page + 1, total_pages));

    if visible.is_empty() {
        if !game.is_ended() && game.current_turn() == PLAYER_COLOR {
            lines.push("No moves available.".to_string());
        }
    } else {
        let listing: Vec<String> = visible
            .iter()
            .enumerate()
            .map(|(i, mv)| format!("{i}: {}", mv.position()))
            .collect();
        lines.push(listing.join("  "));
    }

    lines.join("\n")
}
