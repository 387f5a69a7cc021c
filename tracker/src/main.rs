//! Step execution tracker CLI.
//!
//! Manages a session file (`session.json` by default) holding an ordered list
//! of steps and their outcomes. Actions are registered by programs embedding
//! the library; the CLI creates, extends, inspects and validates sessions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde_json::Value;

use tracker::core::step::Step;
use tracker::core::types::Params;
use tracker::exit_codes;
use tracker::io::config::load_config;
use tracker::io::session_store::{list_sessions, load_session};
use tracker::logging;
use tracker::session::{add_step, init_session};

#[derive(Parser)]
#[command(
    name = "tracker",
    version,
    about = "Run ordered steps with bounded retries and resumable sessions"
)]
struct Cli {
    /// Session file to operate on.
    #[arg(long, global = true, default_value = "session.json")]
    session: PathBuf,

    /// Tracker configuration (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "tracker.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty session file.
    Init {
        /// Overwrite an existing session.
        #[arg(short, long)]
        force: bool,
    },
    /// Append a step to the session.
    Add {
        /// Step name, unique within the session.
        name: String,
        /// Key of the registered action the step runs.
        action: String,
        /// Action params as a JSON object.
        #[arg(long, default_value = "{}")]
        params: String,
        /// Retry limit (defaults to `default_max_retries` from the config).
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// Print step outcomes. Exit code reflects session state.
    Status,
    /// Check session against schema and invariants, and the config file.
    Validate,
    /// List session files in a directory.
    List {
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => {
            init_session(&cli.session, force)?;
            println!("{}", cli.session.display());
            Ok(exit_codes::OK)
        }
        Command::Add {
            name,
            action,
            params,
            max_retries,
        } => cmd_add(&cli.session, &cli.config, name, action, &params, max_retries),
        Command::Status => cmd_status(&cli.session),
        Command::Validate => {
            load_config(&cli.config)?;
            load_session(&cli.session)?;
            println!("ok");
            Ok(exit_codes::OK)
        }
        Command::List { dir } => {
            for path in list_sessions(&dir)? {
                println!("{}", path.display());
            }
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_add(
    session: &Path,
    config: &Path,
    name: String,
    action: String,
    params: &str,
    max_retries: Option<u32>,
) -> Result<i32> {
    let cfg = load_config(config)?;
    let params = parse_params(params)?;
    let max_retries = max_retries.unwrap_or(cfg.default_max_retries);
    if max_retries == 0 {
        return Err(anyhow!("--max-retries must be > 0"));
    }
    let state = add_step(session, Step::new(name, action, params).with_max_retries(max_retries))?;
    println!("{} steps", state.steps.len());
    Ok(exit_codes::OK)
}

fn cmd_status(session: &Path) -> Result<i32> {
    let state = load_session(session)?;
    let report = state.report();
    print!("{report}");
    let code = if state.has_remaining() {
        exit_codes::PENDING
    } else if report.has_failures() {
        exit_codes::FAILED
    } else {
        exit_codes::OK
    };
    Ok(code)
}

fn parse_params(raw: &str) -> Result<Params> {
    let value: Value = serde_json::from_str(raw).context("parse --params")?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("--params must be a JSON object, got {other}")),
    }
}
