use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Connection settings for the hotel REST API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// TTLs for the room catalogue. Availability and bookings are never cached.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_rooms_ttl")]
    pub rooms_ttl_secs: u64,
    #[serde(default = "default_room_ttl")]
    pub room_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            rooms_ttl_secs: default_rooms_ttl(),
            room_ttl_secs: default_room_ttl(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:3000/api".into()
}

fn default_timeout() -> u64 {
    15
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into()
}

fn default_max_entries() -> usize {
    200
}

fn default_rooms_ttl() -> u64 {
    300
}

fn default_room_ttl() -> u64 {
    600
}
