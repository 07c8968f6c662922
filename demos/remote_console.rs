//! # Remote Console Example
//!
//! A terminal remote control for a scoreboard session:
//!
//! 1. Join a session over HTTP
//! 2. Change scores optimistically from the keyboard
//! 3. Mirror pushes from the scoreboard server as they arrive
//! 4. End sets and start new ones
//! 5. Shut down gracefully on `quit`, Ctrl+C or end of input
//!
//! ## Running
//!
//! ```sh
//! # Start the scoreboard server on localhost:8001, then:
//! cargo run --example remote_console
//!
//! # Point at another server:
//! PICKLEBALL_API_URL=http://scores.local:8001 cargo run --example remote_console
//! ```
//!
//! ## Commands
//!
//! ```text
//! join <id>   join a session
//! a+ a- b+ b- change a score
//! end <A|B>   end the set with the given winner
//! new         start a new set
//! quit        leave
//! ```

use pickleball_remote::{
    Element, HttpSessionApi, RemoteApp, RemoteConfig, ScoreAction, Side, Surface,
    WebSocketConnector,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Prints every display update to stdout.
struct ConsoleSurface;

impl Surface for ConsoleSurface {
    fn set_text(&mut self, element: Element, text: &str) -> bool {
        println!("  {:<14} {text}", element.id());
        true
    }

    fn set_hidden(&mut self, element: Element, hidden: bool) -> bool {
        if !hidden {
            println!("── {} ──", element.id());
        }
        true
    }

    fn alert(&mut self, message: &str) {
        println!("!! {}", message.replace('\n', "\n!! "));
    }
}

enum Command {
    Join(String),
    Score(Side, ScoreAction),
    EndSet(Side),
    NewSet,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let command = match (words.next()?, words.next()) {
        ("join", Some(id)) => Command::Join(id.to_string()),
        ("a+", None) => Command::Score(Side::A, ScoreAction::Add),
        ("a-", None) => Command::Score(Side::A, ScoreAction::Subtract),
        ("b+", None) => Command::Score(Side::B, ScoreAction::Add),
        ("b-", None) => Command::Score(Side::B, ScoreAction::Subtract),
        ("end", Some(side)) => Command::EndSet(side.parse().ok()?),
        ("new", None) => Command::NewSet,
        ("quit" | "exit", None) => Command::Quit,
        _ => return None,
    };
    Some(command)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=debug` to see every frame.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let config = RemoteConfig::from_env()?;
    tracing::info!(
        api = %config.api_base_url,
        push = %config.push_base_url,
        "using scoreboard server"
    );

    let api = HttpSessionApi::new(config.clone());
    let mut app = RemoteApp::new(config, api, WebSocketConnector::new(), ConsoleSurface);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Commands: join <id> | a+ a- b+ b- | end <A|B> | new | quit");

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    tracing::info!("end of input");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let Some(command) = parse_command(&line) else {
                    println!("?? unknown command: {}", line.trim());
                    continue;
                };
                // Failures have already been shown through the surface.
                match command {
                    Command::Join(id) => {
                        if let Err(e) = app.join(&id).await {
                            tracing::debug!("join failed: {e}");
                        }
                    }
                    Command::Score(side, action) => {
                        if !app.update_score(side, action) {
                            println!("?? join a session first");
                        }
                    }
                    Command::EndSet(winner) => {
                        if let Err(e) = app.end_current_set(winner).await {
                            tracing::debug!("end set failed: {e}");
                        }
                    }
                    Command::NewSet => {
                        if let Err(e) = app.start_new_set().await {
                            tracing::debug!("new set failed: {e}");
                        }
                    }
                    Command::Quit => break,
                }
            }

            Some(event) = app.recv_push() => {
                app.handle_push_event(event);
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down…");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    app.shutdown().await;
    tracing::info!("Remote shut down. Goodbye!");
    Ok(())
}
