//! Process-wide registry of temporary files, emptied on interrupt.
//!
//! `tempfile` removes its files when they drop, which covers normal returns
//! and errors. A signal skips destructors, so every live temp path is also
//! listed here and a watcher thread removes them before exiting.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

static TEMP_PATHS: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());

fn paths() -> std::sync::MutexGuard<'static, Vec<PathBuf>> {
    TEMP_PATHS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Keeps `path` in the registry for as long as it lives.
#[derive(Debug)]
pub struct TempGuard {
    path: PathBuf,
}

impl TempGuard {
    pub fn register(path: &Path) -> Self {
        paths().push(path.to_path_buf());
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        paths().retain(|p| p != &self.path);
    }
}

/// Delete every registered path that still exists.
pub fn remove_all() {
    for path in paths().drain(..) {
        if path.exists() {
            debug!(path = %path.display(), "removing temp file");
            let _ = fs::remove_file(&path);
        }
    }
}

/// Install the SIGINT/SIGTERM/SIGHUP watcher. It removes registered temp
/// files and exits with `128 + signal`.
#[cfg(unix)]
pub fn install_signal_hook() -> io::Result<()> {
    use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            remove_all();
            std::process::exit(128 + signal);
        }
    });
    Ok(())
}

#[cfg(not(unix))]
pub fn install_signal_hook() -> io::Result<()> {
    Ok(())
}
