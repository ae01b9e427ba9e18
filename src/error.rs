//! Error types shared across the game and its chat surface.

use derive_more::{Display, Error, From};
use tracing::instrument;

use crate::png::PngError;
use crate::types::Position;

/// Rejections of a player action. None of these change game state.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GameError {
    #[display("{position} is not a legal move right now")]
    IllegalMove { position: Position },
    #[display("it is not your turn")]
    NotYourTurn,
    #[display("the game has already ended")]
    GameEnded,
    #[display("the game is busy processing another move")]
    Busy,
    #[display("no game with id {id}")]
    UnknownGame { id: String },
    #[display("only the player who started this game can control it")]
    NotOwner,
    #[display("games cannot be started in this channel")]
    ChannelNotAllowed,
}

/// Failures reported by the messaging collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum MessagingError {
    #[display("missing permission to {action}")]
    PermissionDenied { action: String },
    #[display("messaging failure: {message}")]
    Other { message: String },
}

impl MessagingError {
    pub fn permission(action: impl Into<String>) -> Self {
        Self::PermissionDenied {
            action: action.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Errors surfaced by controller entry points.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, From)]
pub enum ControllerError {
    #[display("{_0}")]
    Game(GameError),
    #[display("{_0}")]
    Messaging(MessagingError),
    #[display("render failed: {_0}")]
    Render(PngError),
}

/// Configuration error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
