pub mod cli;
pub mod commands;
pub mod config;
pub mod filter;
pub mod formatter;
pub mod row;
pub mod stream;

use crate::cli::{Commands, TplCommands};
use crate::config::{Settings, SettingsStore, default_settings_path};
use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

pub use cli::{Cli, cli_parse};
pub use config::ConfigError;
pub use filter::{Filter, FilterNode, SyntaxError};
pub use formatter::{FormatParams, Formatter};
pub use row::{Row, RowError};
pub use stream::{CancelScope, RowStream, StreamConfig, StreamError, StreamReader, StreamState};

/// Diagnostics go to stderr. `RUST_LOG` overrides the `-v` count.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // a second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run() -> Result<()> {
    let cli = cli_parse();
    init_logging(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    let store = cli
        .settings
        .clone()
        .or_else(default_settings_path)
        .map(SettingsStore::new);
    let settings = match &store {
        Some(store) => store
            .load()
            .with_context(|| format!("cannot load settings from {}", store.path().display()))?,
        None => Settings::default(),
    };
    let reader = StreamReader::new(settings.stream);

    let command = cli
        .command
        .unwrap_or_else(|| Commands::Watch(Default::default()));
    match command {
        Commands::Watch(args) => commands::watch(args, &reader, store.as_ref()),
        Commands::Tail(args) => commands::tail(args, &reader),
        Commands::Tpl(TplCommands::Save(args)) => {
            commands::tpl_save(args, store.as_ref().context("no settings file location known")?)
        }
        Commands::Tpl(TplCommands::List) => {
            commands::tpl_list(store.as_ref().context("no settings file location known")?)
        }
    }
}
