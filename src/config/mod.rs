//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::game::{GenerationError, GenerationOptions};

/// Supabase credentials for the score ledger
#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    /// Supabase project URL
    pub url: String,
    /// Supabase service role key (bypasses RLS - server only!)
    pub service_role_key: String,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,

    /// Options used for every dungeon generation
    pub dungeon: GenerationOptions,
    /// Fixed generator seed, random when unset
    pub dungeon_seed: Option<u64>,

    /// Roster broadcast period
    pub broadcast_interval: Duration,
    /// Entries in the published leaderboard
    pub leaderboard_size: usize,
    /// Inbound WebSocket frames allowed per second per connection
    pub max_frames_per_sec: u32,

    /// Directory served for static client assets
    pub static_dir: PathBuf,
    /// Allowed client origins for CORS, comma-separated. Permissive when unset.
    pub client_origin: Option<String>,

    /// Score ledger database; in-memory ledger when unset
    pub supabase: Option<SupabaseConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
            log_level: "info".to_string(),
            log_json: false,
            dungeon: GenerationOptions::default(),
            dungeon_seed: None,
            broadcast_interval: Duration::from_millis(500),
            leaderboard_size: 3,
            max_frames_per_sec: 30,
            static_dir: PathBuf::from("public"),
            client_origin: None,
            supabase: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = match (lookup("PORT"), lookup("SERVER_ADDR")) {
            (Some(port), _) => format!("0.0.0.0:{}", port)
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            (None, Some(addr)) => addr.parse().map_err(|_| ConfigError::InvalidAddress)?,
            (None, None) => defaults.server_addr,
        };

        let dungeon = GenerationOptions {
            width: parse_var(&lookup, "DUNGEON_WIDTH")?.unwrap_or(defaults.dungeon.width),
            height: parse_var(&lookup, "DUNGEON_HEIGHT")?.unwrap_or(defaults.dungeon.height),
            room_count: parse_var(&lookup, "DUNGEON_ROOMS")?.unwrap_or(defaults.dungeon.room_count),
            average_room_size: parse_var(&lookup, "DUNGEON_ROOM_SIZE")?
                .unwrap_or(defaults.dungeon.average_room_size),
        };
        dungeon.validate()?;

        let broadcast_interval = match parse_var::<u64, _>(&lookup, "BROADCAST_INTERVAL_MS")? {
            Some(0) => return Err(ConfigError::Invalid("BROADCAST_INTERVAL_MS")),
            Some(ms) => Duration::from_millis(ms),
            None => defaults.broadcast_interval,
        };

        let leaderboard_size = match parse_var(&lookup, "LEADERBOARD_SIZE")? {
            Some(0) => return Err(ConfigError::Invalid("LEADERBOARD_SIZE")),
            Some(n) => n,
            None => defaults.leaderboard_size,
        };

        let log_json = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => false,
            Some("json") => true,
            Some(_) => return Err(ConfigError::Invalid("LOG_FORMAT")),
        };

        let supabase = match (lookup("SUPABASE_URL"), lookup("SUPABASE_SERVICE_ROLE_KEY")) {
            (Some(url), Some(service_role_key)) => Some(SupabaseConfig {
                url,
                service_role_key,
            }),
            (Some(_), None) => return Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY")),
            (None, _) => None,
        };

        Ok(Self {
            server_addr,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json,
            dungeon,
            dungeon_seed: parse_var(&lookup, "DUNGEON_SEED")?,
            broadcast_interval,
            leaderboard_size,
            max_frames_per_sec: parse_var(&lookup, "MAX_FRAMES_PER_SEC")?
                .unwrap_or(defaults.max_frames_per_sec),
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            client_origin: lookup("CLIENT_ORIGIN"),
            supabase,
        })
    }
}

/// Parse an optional variable, failing if present but malformed
fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().parse().map_err(|_| ConfigError::Invalid(key)))
        .transpose()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid dungeon options: {0}")]
    Dungeon(#[from] GenerationError),
}
