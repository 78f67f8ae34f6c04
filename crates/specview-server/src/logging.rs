//! Tracing setup, mirroring the workspace's established
//! verbosity-to-filter mapping. A small legacy [`Logger`] mirrors
//! messages to a plain file when `--log` is given, independent of
//! whatever `tracing` subscriber ends up installed.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

struct Logger {
    file: File,
}

impl Logger {
    fn new(path: &Path) -> std::io::Result<Self> {
        let file = File::options().append(true).create(true).open(path)?;
        Ok(Self { file })
    }

    fn log(&mut self, msg: &str) {
        let _ = writeln!(self.file, "{msg}");
    }
}

pub fn log(msg: &str) {
    eprintln!("{msg}");
    if let Ok(mut guard) = LOGGER.lock() {
        if let Some(ref mut logger) = *guard {
            logger.log(msg);
        }
    }
}

pub fn default_log_path() -> PathBuf {
    if let Ok(exe_path) = std::env::current_exe() {
        let mut log_path = exe_path;
        log_path.set_extension("log");
        log_path
    } else {
        PathBuf::from("specview-server.log")
    }
}

/// Maps `-v`/`-vv`/`-vvv` to a filter scoped to this crate and its
/// session/wire dependencies, falling back to `RUST_LOG` if set.
pub fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "specview_server=info,specview_session=info",
        2 => "specview_server=debug,specview_session=debug,specview_frame=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

pub fn install_file_logger(path: &Path) {
    if let Ok(logger) = Logger::new(path) {
        if let Ok(mut guard) = LOGGER.lock() {
            *guard = Some(logger);
        }
    }
}
