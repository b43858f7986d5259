use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::util::split_channels;

/// How the control plane pushes payloads to workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagingMethod {
    /// Publish on the shared store's pub/sub facility (default).
    Redis,
    /// Point-to-point HTTP call to the worker's advertised address.
    Direct,
}

/// sockgate configuration, shared by the API and worker binaries.
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "sockgate", version, about = "Distributed WebSocket delivery gateway")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "SOCKGATE_PORT", default_value = "6241")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "SOCKGATE_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./sockgate.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "SOCKGATE_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Redis connection URL (shared directory store)
    #[arg(long, env = "SOCKGATE_REDIS_URL", default_value = "redis://localhost:6379")]
    pub redis_url: String,

    /// Bearer token protecting the control API and inter-service calls
    #[arg(long, env = "SOCKGATE_TOKEN", default_value = "")]
    pub token: String,

    /// Shared secret for JWT authentication on connect (empty = disabled)
    #[arg(long, env = "SOCKGATE_JWT_SECRET", default_value = "")]
    pub jwt_secret: String,

    /// Comma-separated channels every connection joins on connect
    #[arg(long, env = "SOCKGATE_DEFAULT_CHANNELS", default_value = "")]
    pub default_channels: String,

    /// Delivery transport to workers: "redis" or "direct"
    #[arg(long, env = "SOCKGATE_MESSAGING_METHOD", default_value = "redis")]
    pub messaging_method: String,

    /// Hostname workers advertise for direct-mode delivery
    #[arg(long, env = "SOCKGATE_DIRECT_HOSTNAME", default_value = "")]
    pub direct_hostname: String,

    /// Port workers advertise for direct-mode delivery (defaults to `port`)
    #[arg(long, env = "SOCKGATE_DIRECT_PORT")]
    pub direct_port: Option<u16>,

    /// Liveness window in seconds: TTL refresh period for worker and
    /// connection records, and the protocol ping interval
    #[arg(long, env = "SOCKGATE_TTL_SECONDS", default_value = "60")]
    pub ttl_seconds: u64,
}

/// Slack added on top of the liveness window so a record never expires
/// between two refresh ticks.
pub const TTL_BUFFER_SECONDS: u64 = 30;

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 6241,
            bind_address: "0.0.0.0".to_string(),
            config: "./sockgate.toml".to_string(),
            json_logs: false,
            generate_config: false,
            redis_url: "redis://localhost:6379".to_string(),
            token: String::new(),
            jwt_secret: String::new(),
            default_channels: String::new(),
            messaging_method: "redis".to_string(),
            direct_hostname: String::new(),
            direct_port: None,
            ttl_seconds: 60,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (SOCKGATE_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("SOCKGATE_"))
            .merge(Serialized::defaults(cli))
            .extract()?;

        // Fail early on an unknown transport instead of at first dispatch
        config.resolve_messaging_method().map_err(|e| {
            figment::Error::from(e)
        })?;

        Ok(config)
    }

    pub fn resolve_messaging_method(&self) -> Result<MessagingMethod, String> {
        match self.messaging_method.as_str() {
            "redis" => Ok(MessagingMethod::Redis),
            "direct" => Ok(MessagingMethod::Direct),
            other => Err(format!(
                "invalid messaging_method {:?} (expected \"redis\" or \"direct\")",
                other
            )),
        }
    }

    /// Transport selected by config. `load` already validated the string.
    pub fn messaging(&self) -> MessagingMethod {
        self.resolve_messaging_method()
            .unwrap_or(MessagingMethod::Redis)
    }

    /// Channels every identity is subscribed to on admit.
    pub fn default_channel_list(&self) -> Vec<String> {
        split_channels(&self.default_channels)
    }

    /// Address advertised in the worker record for direct-mode delivery.
    pub fn direct_address(&self) -> String {
        format!(
            "{}:{}",
            self.direct_hostname,
            self.direct_port.unwrap_or(self.port)
        )
    }

    /// JWT authentication is only enabled when a secret is configured.
    pub fn jwt_enabled(&self) -> bool {
        !self.jwt_secret.is_empty()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# sockgate configuration
# Place this file at ./sockgate.toml or specify with --config <path>
# All settings can be overridden via environment variables (SOCKGATE_PORT, etc.)
# or CLI flags (--port, etc.)

# Listen port (default: 6241)
# port = 6241

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Redis connection URL (shared directory store)
# redis_url = "redis://localhost:6379"

# Bearer token protecting the control API (query param or Authorization header).
# Leave empty to disable (NOT recommended outside development).
# token = ""

# Shared secret enabling JWT authentication on /connect (HS256).
# Leave empty to only accept claims.
# jwt_secret = ""

# Channels every connection is subscribed to on connect (comma-separated)
# default_channels = ""

# Delivery transport from the API to workers: "redis" (pub/sub) or "direct"
# (point-to-point HTTP to the worker's advertised address)
# messaging_method = "redis"

# Direct mode only: the hostname and port this worker advertises
# direct_hostname = ""
# direct_port = 6241

# Liveness window in seconds. Worker/connection records in the store expire
# this many seconds (plus a fixed buffer) after the last refresh.
# ttl_seconds = 60
"#
    .to_string()
}
