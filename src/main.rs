//! Plays a game in the terminal using the same controller the chat bot uses.

mod console;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use console::ConsoleMessenger;
use reversi_bot::registry::lock_session;
use reversi_bot::{BotConfig, CommandOutcome, Difficulty, ReactionController, ReactionEmoji};

const CONSOLE_CHANNEL: &str = "console";
const CONSOLE_USER: &str = "player";

#[derive(Debug, Parser)]
#[command(name = "reversi", about = "Play Reversi against the computer")]
struct Cli {
    /// AI strength: easy, normal, hard or max.
    #[arg(short, long)]
    difficulty: Option<Difficulty>,

    /// Directory that receives the rendered board images.
    #[arg(short, long, default_value = "frames")]
    out_dir: PathBuf,

    /// TOML config file; otherwise the environment (and `.env`) is used.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => BotConfig::from_file(path)?,
        None => BotConfig::from_env()?,
    };
    // The console is always allowed to host a game.
    config.allowed_channels.clear();

    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("creating {}", cli.out_dir.display()))?;

    let messenger = Arc::new(ConsoleMessenger::new(cli.out_dir.clone()));
    let controller = ReactionController::new(messenger, config);
    let game_id = controller
        .start_game(CONSOLE_USER, CONSOLE_CHANNEL, cli.difficulty)
        .await?;
    info!(game_id = %game_id, "type a list index, a square like d3, < or >, or quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.eq_ignore_ascii_case("quit") {
            break;
        }
        let Some(session) = controller.session(&game_id) else {
            break;
        };
        let message_id = lock_session(&session)
            .tracking_message()
            .map(|m| m.message_id.clone());

        let outcome = match (as_reaction(input), message_id) {
            (Some(emoji), Some(message_id)) => {
                controller
                    .on_reaction_added(&message_id, emoji.as_str(), CONSOLE_USER)
                    .await
            }
            _ => controller.text_command(&game_id, CONSOLE_USER, input).await?,
        };
        match outcome {
            CommandOutcome::Ignored => warn!(input, "not understood"),
            CommandOutcome::Played(report) if report.outcome.is_some() => break,
            _ => {}
        }
    }

    Ok(())
}

/// Single digits and arrows are delivered as reactions, like a chat user
/// clicking the buttons.
fn as_reaction(input: &str) -> Option<ReactionEmoji> {
    match input {
        "<" => Some(ReactionEmoji::Prev),
        ">" => Some(ReactionEmoji::Next),
        _ => {
            let mut chars = input.chars();
            let digit = chars.next()?.to_digit(10)?;
            chars.next().is_none().then_some(ReactionEmoji::Digit(digit as u8))
        }
    }
}
