use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

/// Custom enum for log levels that can be used with clap's ValueEnum
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convert our custom LogLevel enum to log crate's LevelFilter
impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Command line arguments structure using clap derive macros
#[derive(Parser, Debug)]
#[command(name = "ctray")]
#[command(about = "Ray traces CT volumes composited over shaded ellipsoids")]
pub struct Args {
    /// Scene description (TOML)
    #[arg(short, long, help = "Scene description (TOML); renders the built-in demo scene when omitted")]
    pub scene: Option<PathBuf>,

    /// Image width in pixels, overriding the scene
    #[arg(long)]
    pub width: Option<u32>,

    /// Image height in pixels, overriding the scene
    #[arg(long)]
    pub height: Option<u32>,

    /// Output file path (.png or .exr)
    #[arg(short, long, default_value = "output.png")]
    pub output: String,

    /// Worker threads (0 = one per core)
    #[arg(short = 'j', long, default_value = "0")]
    pub threads: usize,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,

    /// Set the logging level (defaults to "info")
    #[arg(long, default_value = "info", help = "Set the logging level")]
    pub debug_level: LogLevel,
}
