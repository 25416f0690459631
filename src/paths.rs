//! Application path resolution
//!
//! A `config.yaml` in the working directory wins (handy with `cargo run`);
//! otherwise the file lives in the platform config directory, e.g.
//! `~/.config/v49-editor/config.yaml` on Linux or `%APPDATA%\v49-editor` on
//! Windows.

use std::path::{Path, PathBuf};

/// Application name used for the config directory
const APP_NAME: &str = "v49-editor";

const CONFIG_FILE: &str = "config.yaml";

/// Default location of the application config file
pub fn default_config_path() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_config_path(&cwd, dirs::config_dir())
}

fn resolve_config_path(cwd: &Path, config_dir: Option<PathBuf>) -> PathBuf {
    let local = cwd.join(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    match config_dir {
        Some(dir) => dir.join(APP_NAME).join(CONFIG_FILE),
        None => local,
    }
}
