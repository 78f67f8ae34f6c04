//! Command-line entry point: a verbosity counter, an optional log file,
//! and a thread override.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "specview-server")]
#[command(author, version, about = "specview interactive image-viewer backend")]
pub struct Cli {
    /// Path to a `specview.toml`. Defaults to `./specview.toml` if present,
    /// otherwise built-in defaults.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Overrides the configured bind address (host:port).
    #[arg(long)]
    pub bind: Option<String>,

    /// Refuses write operations regardless of what the config says.
    #[arg(long)]
    pub read_only: bool,

    /// Verbose output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write log output to a file (default path if none given).
    #[arg(short = 'l', long = "log")]
    pub log: Option<Option<PathBuf>>,

    /// Thread cap handed to the compute pool (0 = let rayon choose).
    #[arg(short = 'j', long, default_value = "0")]
    pub threads: usize,
}
