//! Hub Pong entry point
//!
//! Parses the command line, sets up logging, picks the hub reader and runs the
//! terminal game loop.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use hub_pong::app::App;
use hub_pong::device::serial;
use hub_pong::device::{DeviceReader, HubReader, NullReader, SerialConnector};
use hub_pong::render::TerminalRenderer;
use hub_pong::settings::DEFAULT_PATH;
use hub_pong::sim::PlayerSkills;
use hub_pong::{Settings, SkillLevel};

/// Two-player Pong with paddles driven by the motors of a programmable hub
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Skill level for both players (1-5); skips the selection screen
    #[arg(short, long)]
    skill: Option<u8>,

    /// Skill level for player 1 only
    #[arg(long)]
    skill_a: Option<u8>,

    /// Skill level for player 2 only
    #[arg(long)]
    skill_b: Option<u8>,

    /// Serial device of the hub (auto-detected when omitted)
    #[arg(short, long, env = "HUB_PONG_PORT")]
    port: Option<String>,

    /// Play with the keyboard only
    #[arg(long)]
    no_hub: bool,

    /// Path to the settings file
    #[arg(long, default_value = DEFAULT_PATH)]
    settings: PathBuf,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_settings: bool,

    /// Log file (the terminal is taken by the game)
    #[arg(long, default_value = "hub-pong.log")]
    log_file: PathBuf,

    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Seed for serve angles (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_ports {
        list_ports();
        return Ok(());
    }

    init_logging(&args.log_file, &args.log_level)?;
    info!("Starting Hub Pong v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = Settings::load(&args.settings)?;
    let skills = apply_overrides(&args, &mut settings)?;
    if args.save_settings {
        settings.save(&args.settings)?;
    }

    let seed = args.seed.unwrap_or_else(seed_from_clock);
    info!("Serve seed {seed}");

    let final_score = if args.no_hub {
        info!("Hub disabled, keyboard only");
        play(NullReader, settings, skills, seed)?
    } else {
        let connector = SerialConnector {
            path: settings.serial_port.clone(),
            baud: settings.baud_rate,
            ..Default::default()
        };
        play(HubReader::new(connector), settings, skills, seed)?
    };

    // Terminal is restored by now
    println!(
        "Final score: Player 1 {} - {} Player 2",
        final_score.0, final_score.1
    );
    info!("Hub Pong shutdown complete");
    Ok(())
}

fn play<D: DeviceReader>(
    device: D,
    settings: Settings,
    skills: Option<PlayerSkills>,
    seed: u64,
) -> Result<(u32, u32)> {
    let mut renderer = TerminalRenderer::new().context("Failed to set up the terminal")?;
    let app = App::new(device, settings, skills, seed);
    let result = app.run(&mut renderer)?;
    Ok((result.score_a, result.score_b))
}

/// Fold command-line skills into the settings. Returns the skills to play
/// with when they are fully decided, which skips the selection screen.
fn apply_overrides(args: &Args, settings: &mut Settings) -> Result<Option<PlayerSkills>> {
    if let Some(level) = args.skill {
        // Both players, so per-side levels from the file no longer apply
        settings.skill = SkillLevel::new(level)?;
        settings.skill_a = None;
        settings.skill_b = None;
    }
    if let Some(level) = args.skill_a {
        settings.skill_a = Some(SkillLevel::new(level)?);
    }
    if let Some(level) = args.skill_b {
        settings.skill_b = Some(SkillLevel::new(level)?);
    }
    if let Some(port) = &args.port {
        settings.serial_port = Some(port.clone());
    }

    let from_cli = args.skill.is_some() || args.skill_a.is_some() || args.skill_b.is_some();
    let decided = from_cli || settings.has_explicit_skills();
    Ok(decided.then(|| settings.skills()))
}

fn init_logging(path: &Path, level: &str) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}

fn list_ports() {
    let candidates = serial::list_candidates();
    if candidates.is_empty() {
        println!("No serial ports found");
        return;
    }
    let pick = serial::pick_hub_port(&candidates);
    for candidate in &candidates {
        let marker = if pick.as_deref() == Some(candidate.name.as_str()) {
            "*"
        } else {
            " "
        };
        match &candidate.description {
            Some(description) => println!("{marker} {} ({description})", candidate.name),
            None => println!("{marker} {}", candidate.name),
        }
    }
}

fn seed_from_clock() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
