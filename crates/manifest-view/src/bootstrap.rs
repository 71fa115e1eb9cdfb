use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application directory under the user's home.
pub const APP_DIR: &str = ".manifest-view";

/// Log file used by the dashboard when no `--log-file` is given.
pub const DEFAULT_LOG_FILE: &str = "manifest-view.log";

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure `~/.manifest-view/` and its `logs/` and `cache/` subdirectories
/// exist. Returns the application directory.
pub fn ensure_directories() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    ensure_directories_in(&home)
}

/// [`ensure_directories`] rooted at `home`.
pub fn ensure_directories_in(home: &Path) -> anyhow::Result<PathBuf> {
    let app_dir = home.join(APP_DIR);
    std::fs::create_dir_all(app_dir.join("logs"))?;
    std::fs::create_dir_all(app_dir.join("cache"))?;
    Ok(app_dir)
}

/// Where log output should go.
///
/// An explicit `--log-file` always wins. The dashboard owns the terminal, so
/// without one it logs to `logs/manifest-view.log` under `app_dir`; the
/// summary view logs to stderr.
pub fn resolve_log_file(explicit: Option<&Path>, view: &str, app_dir: &Path) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None if view == "dashboard" => Some(app_dir.join("logs").join(DEFAULT_LOG_FILE)),
        None => None,
    }
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a Python-style level name to an [`EnvFilter`] directive.
///
/// Unknown names are passed through so that full directives such as
/// `"manifest_data=debug"` still work.
pub fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to `log_file` (appended, no ANSI colours) when given,
/// otherwise to stderr. Falls back to `"info"` if the level is not a valid
/// filter directive.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            registry
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            registry
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
