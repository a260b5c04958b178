use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{
    display::DisplayStyle,
    link::{SerialConfig, DEFAULT_BAUD_RATE, DEFAULT_PORT},
};

/// Gateway settings, loadable from a JSON file and overridden by CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Serial device path or COM name
    #[serde(default = "default_port_name")]
    pub port_name: String,
    /// Baud rate; falls back to 9600 when absent
    #[serde(default)]
    pub baud_rate: Option<u32>,
    /// Read and write timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Terminator appended to every outbound frame
    #[serde(default = "default_newline")]
    pub newline: String,
    /// Label shown in front of peer messages
    #[serde(default = "default_peer_label")]
    pub peer_label: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_port_name() -> String {
    DEFAULT_PORT.to_string()
}

fn default_timeout_ms() -> u64 {
    500
}

fn default_newline() -> String {
    "\n".to_string()
}

fn default_peer_label() -> String {
    "Scanner".to_string()
}

fn default_prompt() -> String {
    "You: ".to_string()
}

fn default_color() -> bool {
    true
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port_name: default_port_name(),
            baud_rate: None,
            timeout_ms: default_timeout_ms(),
            newline: default_newline(),
            peer_label: default_peer_label(),
            prompt: default_prompt(),
            color: default_color(),
        }
    }
}

impl GatewayConfig {
    /// Parse configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Read configuration from a file
    pub fn from_file(file_path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read config file {file_path}"))?;
        Self::from_json(&content).with_context(|| format!("Invalid config file {file_path}"))
    }

    /// Convert to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Build the effective configuration: `--config` file first, then flags.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mut config = match matches.get_one::<String>("config") {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(port) = matches.get_one::<String>("port") {
            config.port_name = port.clone();
        }
        if let Some(raw) = matches.get_one::<String>("baud-rate") {
            match parse_baud_rate(raw) {
                Some(baud) => config.baud_rate = Some(baud),
                None => log::warn!(
                    "Invalid baud rate '{raw}', falling back to {}",
                    config.effective_baud_rate()
                ),
            }
        }
        if let Some(timeout_ms) = matches.get_one::<u64>("timeout-ms") {
            config.timeout_ms = *timeout_ms;
        }
        if matches.get_flag("no-color") {
            config.color = false;
        }
        Ok(config)
    }

    /// Baud rate to open the port with.
    pub fn effective_baud_rate(&self) -> u32 {
        self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE)
    }

    pub fn serial_config(&self) -> SerialConfig {
        let timeout = Duration::from_millis(self.timeout_ms);
        SerialConfig {
            port_name: self.port_name.clone(),
            baud_rate: self.effective_baud_rate(),
            read_timeout: timeout,
            write_timeout: timeout,
            newline: self.newline.as_bytes().to_vec(),
            ..Default::default()
        }
    }

    pub fn display_style(&self) -> DisplayStyle {
        DisplayStyle {
            peer_label: self.peer_label.clone(),
            prompt: self.prompt.clone(),
            color: self.color,
        }
    }
}

/// Lenient `--baud-rate` parsing: anything that is not a positive integer
/// yields `None`.
pub fn parse_baud_rate(raw: &str) -> Option<u32> {
    match raw.trim().parse::<u32>() {
        Ok(baud) if baud > 0 => Some(baud),
        _ => None,
    }
}
