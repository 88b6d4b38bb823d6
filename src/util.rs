use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use tracing::warn;

pub const ENV_PREFIX: &str = "SYS_HEALTH_";

const DEFAULT_PORT: u16 = 51243;

const DEFAULT_ADDR: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

pub fn get_default_port() -> u16 {
    DEFAULT_PORT
}

pub fn get_default_bind_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(DEFAULT_ADDR), DEFAULT_PORT)
}

/// Parse an environment value, ignoring (and logging) values that do not parse.
pub fn parse_env_value<T: FromStr>(key: &str, value: &str) -> Option<T> {
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("ignoring invalid value '{value}' for {key}");
            None
        }
    }
}

/// Full environment variable name for a setting, e.g. `SYS_HEALTH_INTERVAL_MS`.
pub fn env_key(name: &str) -> String {
    format!("{ENV_PREFIX}{name}")
}
