//! Reversi against the computer, played through chat-message reactions.
//!
//! The rules live in [`board`], move choice in [`ai`], and per-game state in
//! [`game`]. [`controller`] publishes each game as a message with a rendered
//! board image and keeps its reaction buttons in sync.

pub mod ai;
pub mod board;
pub mod config;
pub mod controller;
pub mod error;
pub mod game;
pub mod messaging;
pub mod pagination;
pub mod png;
pub mod registry;
pub mod render;
pub mod types;

pub use board::{Board, Move};
pub use config::BotConfig;
pub use controller::{CommandOutcome, ReactionController};
pub use error::{ConfigError, ControllerError, GameError, MessagingError};
pub use game::{GameSession, MoveReport};
pub use messaging::{Attachment, MessageHandle, Messenger, ReactionEmoji};
pub use types::{Color, Difficulty, Position};
