//! Server configuration from environment variables

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_PLAYERS: usize = 8;
pub const DEFAULT_LOBBY_IDLE_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// JSON question catalog, loaded once at startup
    pub questions_path: PathBuf,
    /// Directory served for everything that is not an API route
    pub static_dir: PathBuf,
    pub max_players: usize,
    /// How long a lobby may sit without players before it is swept
    pub lobby_idle: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            questions_path: PathBuf::from("questions.json"),
            static_dir: PathBuf::from("public"),
            max_players: DEFAULT_MAX_PLAYERS,
            lobby_idle: Duration::from_secs(DEFAULT_LOBBY_IDLE_SECS),
        }
    }
}

/// Read and parse an env var, warning and falling back on bad values
fn parse_env<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid value for {}: {:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

impl ServerConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_players = parse_env("MAX_PLAYERS", defaults.max_players);
        let max_players = if max_players == 0 {
            tracing::warn!("MAX_PLAYERS must be at least 1, using default");
            DEFAULT_MAX_PLAYERS
        } else {
            max_players
        };

        Self {
            bind_addr: parse_env("BIND_ADDR", defaults.bind_addr),
            port: parse_env("PORT", defaults.port),
            questions_path: std::env::var("QUESTIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.questions_path),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            max_players,
            lobby_idle: Duration::from_secs(parse_env(
                "LOBBY_IDLE_SECS",
                DEFAULT_LOBBY_IDLE_SECS,
            )),
        }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}
