//! Command execution and dispatch

use std::time::Duration;

use bulletin_core::{ColorPair, ParticipantIdentity};
use bulletin_harness::MemorySurface;
use bulletin_overlay::{BubbleBoard, RandomSource, SeededRandom, SystemRandom};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::app::{ChatApp, Flow};
use crate::cli::Commands;
use crate::config::AppConfig;
use crate::error::Result;

/// Executes CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a command
    pub async fn execute(command: Commands, mut config: AppConfig) -> Result<()> {
        match command {
            Commands::Chat { name, peer } => {
                if let Some(name) = name {
                    config.identity.name = name;
                }
                if let Some(peer) = peer {
                    config.peer.name = peer;
                }
                run_chat(config).await
            }
            Commands::Place { count, seed } => {
                for line in place_bubbles(&config, count, seed) {
                    println!("{}", line);
                }
                Ok(())
            }
            Commands::ExampleConfig => {
                print!("{}", AppConfig::default().to_toml()?);
                Ok(())
            }
        }
    }
}

/// Read lines from stdin until EOF or `/quit`, redrawing on a timer
async fn run_chat(config: AppConfig) -> Result<()> {
    let interval = Duration::from_millis(config.surface.redraw_interval_ms);
    let mut app = ChatApp::new(config)?;
    app.start();
    print_lines(app.take_output());
    println!("type a message, or /help");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut redraw = tokio::time::interval(interval);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("Input closed");
                    break;
                };
                let flow = app.handle_line(&line);
                print_lines(app.take_output());
                if flow == Flow::Quit {
                    break;
                }
            }
            _ = redraw.tick() => {
                app.redraw();
                print_lines(app.take_output());
            }
        }
    }

    app.shutdown();
    print_lines(app.take_output());
    Ok(())
}

/// Place `count` bubbles on the configured surface and describe each one
fn place_bubbles(config: &AppConfig, count: usize, seed: Option<u64>) -> Vec<String> {
    let seed = seed
        .or(config.surface.seed)
        .unwrap_or_else(|| u64::from(SystemRandom::new().gen_u32()));
    info!(seed, count, bounds = %config.surface.bounds(), "Placing bubbles");

    let colors = ColorPair::parse_or(
        Some(config.identity.colors.as_str()),
        config.bridge.fallback_colors(),
    );
    let owner = ParticipantIdentity::new(config.identity.name.clone(), colors, true);
    let mut board = BubbleBoard::new(
        SeededRandom::new(seed),
        MemorySurface::new(config.surface.bounds()),
        config.overlay.clone(),
    );

    let mut output = vec![format!("seed {} on {}", seed, config.surface.bounds())];
    for i in 1..=count {
        let id = board.add(owner.clone(), &format!("message {}", i));
        if let Some(bubble) = board.get(id) {
            output.push(format!("{} {} {}", id, bubble.origin, bubble.size));
        }
    }
    output
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_is_reproducible_with_seed() {
        let config = AppConfig::default();
        let first = place_bubbles(&config, 5, Some(11));
        let second = place_bubbles(&config, 5, Some(11));

        assert_eq!(first.len(), 6);
        assert_eq!(first[0], "seed 11 on 1200x900");
        assert_eq!(first, second);
    }

    #[test]
    fn test_configured_seed_is_used_when_none_given() {
        let mut config = AppConfig::default();
        config.surface.seed = Some(3);
        assert_eq!(place_bubbles(&config, 0, None), vec!["seed 3 on 1200x900".to_string()]);
    }
}
