//! Check-config command - validate the config file

use std::path::Path;

use anyhow::Context;
use combotcha::config::Config;
use combotcha::output::{ConfigSummary, OutputMode};

/// Load and validate the config, then print what it sets up
pub fn check_config(config_path: &Path, output_mode: OutputMode) -> anyhow::Result<()> {
    let config = Config::load(config_path).context("Config check failed")?;

    ConfigSummary {
        path: config_path.display().to_string(),
        server: config.irc.server.clone(),
        channel: config.irc.channel.clone(),
        nick: config.irc.nick.clone(),
        poll_interval_secs: config.notifier.poll_interval_secs,
        first_run: config.notifier.first_run.to_string(),
        state_file: config.state_file().display().to_string(),
        repos: config.repos.iter().map(|r| r.name.clone()).collect(),
    }
    .render(output_mode);
    Ok(())
}
