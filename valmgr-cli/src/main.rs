mod commands;
mod config;
mod error;

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use valmgr_lib::ServerValidationManager;

use crate::commands::Coordinate;
use crate::config::CliConfig;
use crate::error::CliError;

/// Inspect server validation errors the way an editing form receives them.
#[derive(Debug, Parser)]
#[command(name = "valmgr", version)]
struct Cli {
    /// JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Raise the log level; repeat for more.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add a ModelState document and print every stored entry.
    Inspect {
        file: PathBuf,
        /// Nest every property below this validation path.
        #[arg(long)]
        parent: Option<String>,
    },
    /// Add a ModelState document and print the entries at a coordinate.
    Query {
        file: PathBuf,
        #[command(flatten)]
        coordinate: Coordinate,
    },
    /// Replay documents as successive submissions and print what a
    /// subscriber at a coordinate is told.
    Watch {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        coordinate: Coordinate,
    },
}

fn init_logger(config: &CliConfig, verbosity: u8) -> Result<(), CliError> {
    let level = config.level_filter(verbosity)?;
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(path) = &config.log_file {
        let file = File::create(path).map_err(|source| CliError::LogFile {
            path: path.clone(),
            source,
        })?;
        loggers.push(WriteLogger::new(
            level.max(LevelFilter::Debug),
            Config::default(),
            file,
        ));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}

async fn run(cli: Cli, config: CliConfig) -> Result<Value, CliError> {
    let manager = ServerValidationManager::with_config(config.manager);
    match cli.command {
        Command::Inspect { file, parent } => {
            let model_state = commands::load_model_state(&file)?;
            Ok(commands::inspect(&manager, &model_state, parent.as_deref()))
        }
        Command::Query { file, coordinate } => {
            let model_state = commands::load_model_state(&file)?;
            manager.add_errors_for_model_state(&model_state, None);
            manager.flush();
            Ok(serde_json::to_value(commands::query(&manager, &coordinate))?)
        }
        Command::Watch { files, coordinate } => {
            let submissions = files
                .into_iter()
                .map(|path| commands::load_model_state(&path).map(|ms| (path, ms)))
                .collect::<Result<Vec<_>, _>>()?;
            let events = commands::watch(&manager, &coordinate, &submissions).await?;
            Ok(Value::Array(events))
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CliConfig::load(path),
        None => Ok(CliConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logger(&config, cli.verbose) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let output = run(cli, config)
        .await
        .and_then(|value| serde_json::to_string_pretty(&value).map_err(CliError::from));
    match output {
        Ok(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
