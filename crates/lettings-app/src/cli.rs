//! CLI argument definitions for the lettings binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lettings - a chat assistant for a property-management office.
#[derive(Parser, Debug)]
#[command(name = "lettings", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the WebSocket chat server.
    Serve {
        /// Server port.
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,
    },
    /// Open an interactive chat session against a running server.
    Chat {
        /// WebSocket URL of the server.
        #[arg(short = 'u', long = "url")]
        url: Option<String>,
    },
    /// Insert the sample properties and residents into empty collections.
    Seed,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > LETTINGS_CONFIG env var > ~/.lettings/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("LETTINGS_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the server port: --port flag, else the configured value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        match self.command {
            Command::Serve { port: Some(p) } => p,
            _ => config_port,
        }
    }

    /// Resolve the server URL for `chat`: --url flag, else the configured value.
    pub fn resolve_url(&self, config_url: &str) -> String {
        match self.command {
            Command::Chat { url: Some(ref u) } => u.clone(),
            _ => config_url.to_string(),
        }
    }

    /// Resolve the log level.
    ///
    /// Returns `None` if not overridden.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}

fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".lettings").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".lettings").join("config.toml");
    }
    PathBuf::from("config.toml")
}
