//! End-to-end controller behaviour against a recording messenger.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reversi_bot::ai::MoveSelector;
use reversi_bot::controller::ATTACHMENT_NAME;
use reversi_bot::messaging::{ChannelId, UserId};
use reversi_bot::pagination::Fingerprint;
use reversi_bot::registry::lock_session;
use reversi_bot::{
    Attachment, Board, BotConfig, Color, CommandOutcome, ControllerError, Difficulty, GameError,
    GameSession, MessageHandle, Messenger, MessagingError, Move, Position, ReactionController,
    ReactionEmoji,
};

const BOT: &str = "bot";
const OWNER: &str = "alice";
const CHANNEL: &str = "general";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Send { content: String, attachment: Option<String> },
    Edit { content: String, attachment: Option<String> },
    Add(String),
    Remove(String, String),
}

type Hook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct RecordingMessenger {
    calls: Mutex<Vec<Call>>,
    deny_reactions: bool,
    failing_edits: AtomicUsize,
    failing_adds: AtomicUsize,
    before_add: Mutex<Option<Hook>>,
}

impl RecordingMessenger {
    fn denying_reactions() -> Self {
        Self {
            deny_reactions: true,
            ..Self::default()
        }
    }

    /// The next `n` edits fail with a non-permission error.
    fn fail_edits(&self, n: usize) {
        self.failing_edits.store(n, Ordering::SeqCst);
    }

    fn fail_adds(&self, n: usize) {
        self.failing_adds.store(n, Ordering::SeqCst);
    }

    /// Runs `hook` at the start of the next `add_reaction`, standing in for a
    /// handler that touches the session while the controller is suspended.
    fn before_next_add(&self, hook: impl FnOnce() + Send + 'static) {
        *self.before_add.lock().unwrap() = Some(Box::new(hook));
    }

    fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn consume(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(
        &self,
        channel_id: &ChannelId,
        content: &str,
        attachment: Option<Attachment>,
    ) -> Result<MessageHandle, MessagingError> {
        self.record(Call::Send {
            content: content.to_string(),
            attachment: attachment.map(|a| a.file_name),
        });
        Ok(MessageHandle {
            channel_id: channel_id.clone(),
            message_id: "m1".to_string(),
        })
    }

    async fn edit(
        &self,
        _message: &MessageHandle,
        content: &str,
        attachment: Option<Attachment>,
    ) -> Result<(), MessagingError> {
        if consume(&self.failing_edits) {
            return Err(MessagingError::other("edit timed out"));
        }
        self.record(Call::Edit {
            content: content.to_string(),
            attachment: attachment.map(|a| a.file_name),
        });
        Ok(())
    }

    async fn add_reaction(&self, _message: &MessageHandle, emoji: &str) -> Result<(), MessagingError> {
        let hook = self.before_add.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        if consume(&self.failing_adds) {
            return Err(MessagingError::other("rate limited"));
        }
        if self.deny_reactions {
            return Err(MessagingError::permission("add reactions"));
        }
        self.record(Call::Add(emoji.to_string()));
        Ok(())
    }

    async fn remove_reaction(
        &self,
        _message: &MessageHandle,
        emoji: &str,
        user_id: &UserId,
    ) -> Result<(), MessagingError> {
        if self.deny_reactions {
            return Err(MessagingError::permission("manage reactions"));
        }
        self.record(Call::Remove(emoji.to_string(), user_id.clone()));
        Ok(())
    }

    fn bot_user(&self) -> UserId {
        BOT.to_string()
    }
}

struct FirstMove;

impl MoveSelector for FirstMove {
    fn select_move(&self, _: &Board, moves: &[Move], _: Difficulty, _: Color) -> Option<Move> {
        moves.first().cloned()
    }
}

fn sq(row: usize, col: usize) -> u64 {
    1u64 << (row * 8 + col)
}

/// Black to move with 23 legal moves: rows 3 and 4 (16) plus seven on row 8.
fn wide_board() -> Board {
    let black = 0xFF | (0xFF << 40);
    let white = (0xFF << 8) | (0xFF << 32) | sq(6, 0) | sq(6, 3) | sq(6, 6);
    Board::from_bitboards(black, white)
}

/// Only a1 is empty; Black taking it fills the board.
fn last_move_board() -> Board {
    let black = sq(0, 2);
    Board::from_bitboards(black, u64::MAX ^ sq(0, 0) ^ black)
}

fn controller_with(messenger: Arc<RecordingMessenger>, config: BotConfig) -> ReactionController {
    ReactionController::new(messenger, config)
}

async fn start_on(controller: &ReactionController, board: Board) -> String {
    controller
        .start_with(CHANNEL, move |id| {
            GameSession::with_board(
                id,
                CHANNEL.to_string(),
                OWNER.to_string(),
                Difficulty::Normal,
                board,
                Color::Black,
            )
            .with_selector(Box::new(FirstMove))
        })
        .await
        .expect("game starts")
}

fn added(calls: &[Call]) -> Vec<ReactionEmoji> {
    calls
        .iter()
        .filter_map(|c| match c {
            Call::Add(e) => ReactionEmoji::parse(e),
            _ => None,
        })
        .collect()
}

fn removed_by(calls: &[Call], user: &str) -> Vec<ReactionEmoji> {
    calls
        .iter()
        .filter_map(|c| match c {
            Call::Remove(e, u) if u == user => ReactionEmoji::parse(e),
            _ => None,
        })
        .collect()
}

fn digits(range: std::ops::Range<u8>) -> Vec<ReactionEmoji> {
    range.map(ReactionEmoji::Digit).collect()
}

fn generic_notices(calls: &[Call]) -> usize {
    calls
        .iter()
        .filter(|c| matches!(c, Call::Send { content, attachment: None } if content.contains("Something went wrong")))
        .count()
}

#[tokio::test]
async fn new_game_posts_board_and_one_reaction_per_move() {
    let messenger = Arc::new(RecordingMessenger::default());
    let controller = controller_with(messenger.clone(), BotConfig::default());

    let id = controller
        .start_game(OWNER, CHANNEL, Some(Difficulty::Hard))
        .await
        .expect("game starts");

    let calls = messenger.take();
    match &calls[0] {
        Call::Send { content, attachment } => {
            assert_eq!(attachment.as_deref(), Some(ATTACHMENT_NAME));
            assert!(content.contains("AI: hard"));
            assert!(content.contains("0: D3  1: C4  2: F5  3: E6"));
        }
        other => panic!("expected the board to be posted first, got {other:?}"),
    }
    assert_eq!(added(&calls), digits(0..4));
    assert_eq!(controller.active_games(), 1);

    let session = controller.session(&id).expect("registered");
    let game = lock_session(&session);
    assert_eq!(game.tracking_message().map(|m| m.message_id.as_str()), Some("m1"));
    assert_eq!(game.posted_reactions().len(), 4);
}

#[tokio::test]
async fn channel_outside_allow_list_is_refused() {
    let messenger = Arc::new(RecordingMessenger::default());
    let config = BotConfig {
        allowed_channels: ["games".to_string()].into(),
        ..BotConfig::default()
    };
    let controller = controller_with(messenger.clone(), config);

    let err = controller.start_game(OWNER, CHANNEL, None).await.unwrap_err();

    assert_eq!(err, ControllerError::Game(GameError::ChannelNotAllowed));
    assert!(messenger.take().is_empty());
    assert_eq!(controller.active_games(), 0);
}

#[tokio::test]
async fn paging_through_twenty_three_moves_reconciles_incrementally() {
    let messenger = Arc::new(RecordingMessenger::default());
    let controller = controller_with(messenger.clone(), BotConfig::default());
    start_on(&controller, wide_board()).await;

    let mut expected = digits(0..10);
    expected.push(ReactionEmoji::Next);
    assert_eq!(added(&messenger.take()), expected);

    let next = ReactionEmoji::Next.as_str();
    assert_eq!(
        controller.on_reaction_added("m1", next, OWNER).await,
        CommandOutcome::PageChanged { page: 1 }
    );
    let calls = messenger.take();
    assert_eq!(added(&calls), vec![ReactionEmoji::Prev]);
    assert!(removed_by(&calls, BOT).is_empty());
    assert_eq!(removed_by(&calls, OWNER), vec![ReactionEmoji::Next]);
    assert!(calls.iter().any(|c| matches!(c, Call::Edit { content, .. } if content.contains("page 2/3"))));

    assert_eq!(
        controller.on_reaction_added("m1", next, OWNER).await,
        CommandOutcome::PageChanged { page: 2 }
    );
    let calls = messenger.take();
    assert!(added(&calls).is_empty());
    let mut gone = digits(3..10);
    gone.push(ReactionEmoji::Next);
    assert_eq!(removed_by(&calls, BOT), gone);

    // Digit 0 on the last page is the 21st move in canonical order.
    let outcome = controller
        .on_reaction_added("m1", ReactionEmoji::Digit(0).as_str(), OWNER)
        .await;
    match outcome {
        CommandOutcome::Played(report) => assert_eq!(report.player_move, Position::new(7, 5)),
        other => panic!("expected a move, got {other:?}"),
    }
}

#[tokio::test]
async fn unchanged_fingerprint_makes_no_reaction_calls() {
    let messenger = Arc::new(RecordingMessenger::default());
    let controller = controller_with(messenger.clone(), BotConfig::default());
    controller.start_game(OWNER, CHANNEL, None).await.expect("starts");
    messenger.take();

    // Single page: paging is a no-op.
    let outcome = controller
        .on_reaction_added("m1", ReactionEmoji::Next.as_str(), OWNER)
        .await;

    assert_eq!(outcome, CommandOutcome::Ignored);
    let calls = messenger.take();
    assert!(added(&calls).is_empty());
    assert!(removed_by(&calls, BOT).is_empty());
    assert_eq!(removed_by(&calls, OWNER), vec![ReactionEmoji::Next]);
}

#[tokio::test]
async fn strangers_and_echoes_cannot_move() {
    let messenger = Arc::new(RecordingMessenger::default());
    let controller = controller_with(messenger.clone(), BotConfig::default());
    let id = controller.start_game(OWNER, CHANNEL, None).await.expect("starts");
    messenger.take();
    let before = *lock_session(&controller.session(&id).expect("live")).board();
    let digit = ReactionEmoji::Digit(0).as_str();

    assert_eq!(controller.on_reaction_added("m1", digit, BOT).await, CommandOutcome::Ignored);
    assert!(messenger.take().is_empty());

    assert_eq!(controller.on_reaction_added("m1", digit, "mallory").await, CommandOutcome::Revoked);
    assert_eq!(messenger.take(), vec![Call::Remove(digit.to_string(), "mallory".to_string())]);

    assert_eq!(controller.on_reaction_added("m9", digit, OWNER).await, CommandOutcome::Ignored);
    assert!(messenger.take().is_empty());

    assert_eq!(*lock_session(&controller.session(&id).expect("live")).board(), before);
    assert_eq!(
        controller.text_command(&id, "mallory", "d3").await,
        Err(ControllerError::Game(GameError::NotOwner))
    );
}

#[tokio::test]
async fn owner_move_updates_board_and_revokes_reaction() {
    let messenger = Arc::new(RecordingMessenger::default());
    let controller = controller_with(messenger.clone(), BotConfig::default());
    let id = controller.start_game(OWNER, CHANNEL, Some(Difficulty::Max)).await.expect("starts");
    messenger.take();

    let digit = ReactionEmoji::Digit(0).as_str();
    let outcome = controller.on_reaction_added("m1", digit, OWNER).await;

    let CommandOutcome::Played(report) = outcome else {
        panic!("expected a move, got {outcome:?}");
    };
    assert_eq!(report.player_move, Position::new(2, 3));
    assert_eq!(report.ai_moves.len(), 1);
    let calls = messenger.take();
    assert!(calls.iter().any(|c| matches!(c, Call::Edit { attachment: Some(name), .. } if name == ATTACHMENT_NAME)));
    assert_eq!(calls.last(), Some(&Call::Remove(digit.to_string(), OWNER.to_string())));

    let session = controller.session(&id).expect("still live");
    let score = lock_session(&session).score();
    assert_eq!(score.black + score.white, 6);
}

#[tokio::test]
async fn illegal_square_is_reported_without_changing_the_game() {
    let messenger = Arc::new(RecordingMessenger::default());
    let controller = controller_with(messenger.clone(), BotConfig::default());
    let id = controller.start_game(OWNER, CHANNEL, None).await.expect("starts");
    messenger.take();

    let outcome = controller.text_command(&id, OWNER, "a1").await.expect("owner");

    assert_eq!(
        outcome,
        CommandOutcome::Rejected(GameError::IllegalMove {
            position: Position::new(0, 0)
        })
    );
    let calls = messenger.take();
    assert_eq!(calls.len(), 1);
    assert!(matches!(&calls[0], Call::Send { content, attachment: None } if content.contains("A1")));
}

#[tokio::test]
async fn missing_permission_degrades_to_text_control_once() {
    let messenger = Arc::new(RecordingMessenger::denying_reactions());
    let controller = controller_with(messenger.clone(), BotConfig::default());
    let id = controller.start_game(OWNER, CHANNEL, None).await.expect("starts");

    let calls = messenger.take();
    let warnings = calls
        .iter()
        .filter(|c| matches!(c, Call::Send { content, .. } if content.contains("permission")))
        .count();
    assert_eq!(warnings, 1);
    assert!(lock_session(&controller.session(&id).expect("live")).reactions_degraded());

    let outcome = controller.text_command(&id, OWNER, "0").await.expect("owner");
    assert!(matches!(outcome, CommandOutcome::Played(_)));

    let calls = messenger.take();
    assert!(calls.iter().all(|c| !matches!(c, Call::Send { .. })));
    assert!(calls.iter().any(|c| matches!(c, Call::Edit { content, .. } if content.contains("controls: text replies"))));
}

#[tokio::test]
async fn finishing_the_game_clears_reactions_and_unlinks() {
    let messenger = Arc::new(RecordingMessenger::default());
    let controller = controller_with(messenger.clone(), BotConfig::default());
    let id = start_on(&controller, last_move_board()).await;
    assert_eq!(added(&messenger.take()), digits(0..1));

    let session = controller.session(&id).expect("live");
    let outcome = controller
        .on_reaction_added("m1", ReactionEmoji::Digit(0).as_str(), OWNER)
        .await;

    let CommandOutcome::Played(report) = outcome else {
        panic!("expected a move, got {outcome:?}");
    };
    assert!(report.outcome.is_some());
    let calls = messenger.take();
    assert!(calls.iter().any(|c| matches!(c, Call::Edit { content, .. } if content.contains("AI wins"))));
    assert_eq!(removed_by(&calls, BOT), digits(0..1));
    assert!(lock_session(&session).is_ended());
    assert_eq!(controller.active_games(), 0);
    assert_eq!(
        controller
            .on_reaction_added("m1", ReactionEmoji::Digit(0).as_str(), OWNER)
            .await,
        CommandOutcome::Ignored
    );
}

#[tokio::test]
async fn failed_edit_keeps_the_move_and_sends_one_generic_notice() {
    let messenger = Arc::new(RecordingMessenger::default());
    let controller = controller_with(messenger.clone(), BotConfig::default());
    let id = controller.start_game(OWNER, CHANNEL, None).await.expect("starts");
    messenger.take();
    messenger.fail_edits(1);

    let outcome = controller
        .on_reaction_added("m1", ReactionEmoji::Digit(0).as_str(), OWNER)
        .await;

    assert!(matches!(outcome, CommandOutcome::Played(_)));
    let calls = messenger.take();
    assert_eq!(generic_notices(&calls), 1);
    assert!(!calls.iter().any(|c| matches!(c, Call::Edit { .. })));

    let session = controller.session(&id).expect("live");
    let game = lock_session(&session);
    let score = game.score();
    assert_eq!(score.black + score.white, 6);
    assert!(!game.reactions_degraded());
    assert!(!game.needs_reconcile(game.fingerprint()));
}

#[tokio::test]
async fn failed_reaction_add_is_retried_on_the_next_refresh() {
    let messenger = Arc::new(RecordingMessenger::default());
    let controller = controller_with(messenger.clone(), BotConfig::default());
    let id = start_on(&controller, wide_board()).await;
    messenger.take();
    messenger.fail_adds(1);

    assert_eq!(
        controller
            .on_reaction_added("m1", ReactionEmoji::Next.as_str(), OWNER)
            .await,
        CommandOutcome::PageChanged { page: 1 }
    );
    let calls = messenger.take();
    assert_eq!(generic_notices(&calls), 1);
    assert!(added(&calls).is_empty());
    {
        let session = controller.session(&id).expect("live");
        let game = lock_session(&session);
        assert!(!game.reactions_degraded());
        assert!(game.needs_reconcile(game.fingerprint()));
    }

    assert_eq!(
        controller.text_command(&id, OWNER, "next").await,
        Ok(CommandOutcome::PageChanged { page: 2 })
    );
    let calls = messenger.take();
    assert_eq!(generic_notices(&calls), 0);
    assert_eq!(added(&calls), vec![ReactionEmoji::Prev]);

    let session = controller.session(&id).expect("live");
    let game = lock_session(&session);
    let expected: BTreeSet<ReactionEmoji> = Fingerprint::new(23, 2).desired_reactions().into_iter().collect();
    assert_eq!(game.posted_reactions(), &expected);
}

#[tokio::test]
async fn page_change_during_reconcile_converges_on_latest_page() {
    let messenger = Arc::new(RecordingMessenger::default());
    let controller = controller_with(messenger.clone(), BotConfig::default());
    let id = start_on(&controller, wide_board()).await;
    messenger.take();

    let session = controller.session(&id).expect("live");
    let concurrent = Arc::clone(&session);
    messenger.before_next_add(move || lock_session(&concurrent).set_page(2));

    assert_eq!(
        controller
            .on_reaction_added("m1", ReactionEmoji::Next.as_str(), OWNER)
            .await,
        CommandOutcome::PageChanged { page: 1 }
    );

    let game = lock_session(&session);
    assert_eq!(game.page(), 2);
    let expected: BTreeSet<ReactionEmoji> = game.fingerprint().desired_reactions().into_iter().collect();
    assert_eq!(game.posted_reactions(), &expected);
    assert!(!game.needs_reconcile(game.fingerprint()));
}
