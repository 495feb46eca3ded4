use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Master CLI entry point (spec §6 "Master CLI"). Modernized from the
/// teacher's macro-built `clap::App` (`sup/src/main.rs`) to clap v4's
/// derive API.
#[derive(Debug, Parser)]
#[command(name = "orchestratord", version, about = "Multi-module data acquisition orchestrator")]
pub struct Cli {
    /// Root directory for module discovery, per-module config, and session output.
    #[arg(long, value_name = "PATH")]
    pub data_dir: PathBuf,

    /// Prefix used to name each session directory.
    #[arg(long, value_name = "STRING", default_value = "session")]
    pub session_prefix: String,

    #[arg(long, value_enum, default_value = "interactive")]
    pub mode: RunMode,

    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    #[arg(long, overrides_with = "no_console")]
    pub console: bool,

    #[arg(long, overrides_with = "console")]
    pub no_console: bool,
}

impl Cli {
    /// `--no-console` wins when both are given explicitly; console output
    /// defaults on.
    pub fn console_enabled(&self) -> bool {
        !self.no_console
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    Gui,
    Interactive,
    Cli,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Error | LogLevel::Critical => log::LevelFilter::Error,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        }
    }
}
