use std::fs;
use std::io;

use log::{error, warn};
use serde::Deserialize;

use crate::chat;
use crate::error::Result;
use crate::ping::Status;
use crate::proxy::Player;
use crate::router::Router;

// ---------- Data structures ----------

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Port the front door listens on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Debug flag.
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub prometheus_exporter: PrometheusExporterConfig,
    /// Server-list statuses per hostname group.
    #[serde(default)]
    pub statuses: Vec<StatusEntry>,
    /// Where incoming connections go, per hostname group.
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

#[derive(Debug, Deserialize)]
pub struct StatusEntry {
    pub hostnames: Vec<String>,
    #[serde(default)]
    pub online: i32,
    #[serde(default)]
    pub max: i32,
    /// Shown as the server-list description; `&` codes are rewritten to `§`.
    #[serde(default)]
    pub message: String,
    #[serde(default = "default_protocol")]
    pub protocol: i32,
    #[serde(default = "default_show_connection", rename = "show-connection")]
    pub show_connection: bool,
}

/// A route either forwards transparently to `target` or answers login
/// attempts locally with `message`.
#[derive(Debug, Deserialize)]
pub struct RouteEntry {
    pub hostnames: Vec<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Configuration for the Prometheus exporter endpoint.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PrometheusExporterConfig {
    pub enabled: bool,
    #[serde(rename = "bind-address")]
    pub bind_address: String,
}

impl Default for PrometheusExporterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "0.0.0.0:9100".to_string(),
        }
    }
}

// ---------- Defaults ----------

fn default_port() -> u16 {
    25565
}

fn default_protocol() -> i32 {
    47
}

fn default_show_connection() -> bool {
    true
}

// ---------- Loading & applying ----------

/// Loads YAML configuration from `config_path`. On the first run, when no
/// file exists yet, the commented default template is written out and
/// parsed in its place. Read, write and parse failures all propagate.
pub fn load_config(config_path: &str) -> Result<Config> {
    let contents = match fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!("no config at {}, seeding the default template", config_path);
            let template = default_config();
            fs::write(config_path, &template)?;
            template
        }
        Err(err) => return Err(err.into()),
    };

    Ok(serde_yaml::from_str(&contents)?)
}

/// Binds the configured statuses and routes onto the router. Invalid
/// entries are logged and skipped.
pub fn apply(config: &Config, router: &Router) {
    for entry in &config.statuses {
        let hostnames: Vec<&str> = entry.hostnames.iter().map(String::as_str).collect();
        router.set_status(
            &hostnames,
            Status {
                online_players: entry.online,
                max_players: entry.max,
                message: chat::format(&entry.message),
                show_connection: entry.show_connection,
                protocol_number: entry.protocol,
            },
        );
    }

    for entry in &config.routes {
        let hostnames: Vec<&str> = entry.hostnames.iter().map(String::as_str).collect();
        match (&entry.target, &entry.message) {
            (Some(target), _) => match validate_target(target) {
                Ok(()) => router.forward(&hostnames, target),
                Err(err) => error!("skipping route for {:?}: {}", entry.hostnames, err),
            },
            (None, Some(message)) => {
                let message = chat::format(message);
                router.handle(&hostnames, move |_: &Player| message.clone());
            }
            (None, None) => {
                error!(
                    "route for {:?} needs either a target or a message",
                    entry.hostnames
                );
            }
        }
    }
}

/// Forward targets must name a port; a bare hostname is a configuration
/// error, not an implied 25565.
fn validate_target(target: &str) -> std::result::Result<(), String> {
    match target.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => port
            .parse::<u16>()
            .map(|_| ())
            .map_err(|_| format!("invalid port in target '{}'", target)),
        _ => Err(format!("target '{}' must include a port", target)),
    }
}

// A default config, just in case the file doesn't exist.
fn default_config() -> String {
    r#"# Default configuration for the front door.
# Port to listen on for Minecraft connections.
port: 25565

# Debug messages for development
debug: false

# Prometheus exporter configuration
prometheus_exporter:
  enabled: false
  bind-address: "0.0.0.0:9100"

# Server-list entries shown to clients pinging these hostnames.
statuses:
  - hostnames: ["localhost"]
    online: 0
    max: 20
    message: "&6A hostname-routed front door"
    protocol: 47
    show-connection: true

# Where should we route incoming connections?
routes:
  # Transparent forward; the target must include the port.
  - hostnames: ["localhost"]
    target: "127.0.0.1:25566"

  # Local handler: players are turned away with this message.
  - hostnames: ["old.example.com"]
    message: "&cThis server has moved."
"#
    .to_string()
}
