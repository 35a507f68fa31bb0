//! Centralized path definitions for combotcha
//!
//! Single source of truth for the default locations of the config file,
//! the checkpoint state file and the repository working copies.
//!
//! ## Layout
//!
//! ```text
//! ~/.config/combotcha/
//! └── config.toml                 # IRC network, repositories, timings
//!
//! ~/.local/share/combotcha/
//! ├── state.json                  # Checkpoints, one per repository
//! └── repos/
//!     ├── engine/                 # Working copy cloned from its url
//!     └── docs/
//! ```
//!
//! Every path can be overridden in the config file; the config path
//! itself via `--config` or `COMBOTCHA_CONFIG`.

use std::path::PathBuf;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "COMBOTCHA_CONFIG";

const APP_DIR: &str = "combotcha";
const CONFIG_FILE: &str = "config.toml";
const STATE_FILE: &str = "state.json";
const REPOS_DIR: &str = "repos";

/// Directory holding the config file
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| home().join(".config"))
        .join(APP_DIR)
}

/// Config file to use when none is given on the command line
#[must_use]
pub fn default_config() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(|| config_dir().join(CONFIG_FILE), PathBuf::from)
}

/// Directory holding state and working copies
#[must_use]
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| home().join(".local/share"))
        .join(APP_DIR)
}

/// Default checkpoint state file
#[must_use]
pub fn default_state_file() -> PathBuf {
    data_dir().join(STATE_FILE)
}

/// Default working copy for the repository `name`
#[must_use]
pub fn repo_checkout(name: &str) -> PathBuf {
    data_dir().join(REPOS_DIR).join(name_to_dirname(name))
}

/// Convert a repository name to a safe directory name
/// e.g., "team/engine" -> "team-engine"
#[must_use]
pub fn name_to_dirname(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '.' { c } else { '-' })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
