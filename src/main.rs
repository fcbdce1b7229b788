//! # Quiz Engine
//!
//! Terminal front end for the quiz session engine. It loads a question
//! catalog, lets the player pick a mode, plays one session and prints the
//! settlement.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use figlet_rs::FIGfont;
use log::error;
use quiz_engine::data_loader::{load_engine_config, JsonQuestionProvider};
use quiz_engine::{config, EngineConfig, GameMode, SessionController};

mod game;

/// Command Line Interface arguments for the quiz engine.
#[derive(Parser, Debug)]
#[clap(author, version, about = "Play a timed quiz session in the terminal.", long_about = None)]
struct CliArgs {
    /// Game id from the question catalog.
    #[arg(short, long, default_value = "general")]
    game: String,

    /// Mode to play (standard, quick, blitz). Prompts when omitted.
    #[arg(short, long)]
    mode: Option<String>,

    /// Question catalog to use instead of the bundled one.
    #[arg(long)]
    questions: Option<PathBuf>,

    /// Engine settings file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Offer the Blitz mode regardless of the config file.
    #[arg(long)]
    enable_blitz: bool,

    /// Player's lifetime XP, used to pick the level for the XP award.
    #[arg(long, default_value_t = 0)]
    xp: u64,

    /// Seed for reproducible question order.
    #[arg(long)]
    seed: Option<u64>,

    /// List the games in the catalog and the enabled modes, then exit.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let banner = FIGfont::standard()
        .ok()
        .and_then(|font| font.convert("Quiz Time").map(|figure| figure.to_string()))
        .unwrap_or_else(|| "Quiz Time".to_string());
    println!("{}", banner.cyan());
    println!(
        "{} {}",
        "quiz-engine".green().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("{}", env!("CARGO_PKG_DESCRIPTION").italic().dimmed());
    println!();

    let mut engine_config = match &args.config {
        Some(path) => load_engine_config(path)?,
        None => EngineConfig::default(),
    };
    if args.enable_blitz {
        engine_config.features.blitz = true;
    }

    let provider = match &args.questions {
        Some(path) => JsonQuestionProvider::from_path(path),
        None => JsonQuestionProvider::embedded(),
    }
    .context("Loading questions failed")?;

    if args.list {
        println!("{}", "Games:".bold());
        for game_id in provider.game_ids() {
            println!("  {}", game_id);
        }
        println!("{}", "Modes:".bold());
        for mode in engine_config.available_modes() {
            println!("  {} ({})", mode.id(), mode.config().label);
        }
        return Ok(());
    }

    let mode: GameMode = match &args.mode {
        Some(id) => id.parse()?,
        None => config::prompt_mode(&engine_config).context("Mode selection failed")?,
    };
    println!();

    let mut controller = match args.seed {
        Some(seed) => SessionController::with_seed(engine_config, seed),
        None => SessionController::new(engine_config),
    };
    controller.set_player_xp(args.xp);

    if let Err(e) = controller.start_from_provider(&provider, &args.game, mode.id()) {
        error!("Failed to start session: {}", e);
        return Err(anyhow::Error::new(e).context(format!("Could not start game '{}'", args.game)));
    }

    if let Err(e) = game::run_game(&mut controller) {
        error!("Game error: {:?}", e);
        std::process::exit(1);
    }

    game::print_results(&controller);
    Ok(())
}
