//! Link configuration
//!
//! Defaults target a drone on its own access point. `TelloConfig::from_env`
//! overlays values from `TELLO_*` environment variables.

use anyhow::{Context, Result};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tello_shared::protocol::{COMMAND_PORT, DEFAULT_PEER_IP};

/// Transport session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Drone command endpoint
    pub peer: SocketAddr,
    /// Local address to bind (port 0 picks an ephemeral port)
    pub bind: SocketAddr,
    /// How long a receive waits for a reply
    pub receive_timeout: Duration,
    /// Pause between setup attempts while the network is unavailable
    pub retry_delay: Duration,
    /// Setup attempts before the session fails
    pub max_setup_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let peer_ip: IpAddr = DEFAULT_PEER_IP
            .parse()
            .unwrap_or(IpAddr::from([192, 168, 10, 1]));
        Self {
            peer: SocketAddr::new(peer_ip, COMMAND_PORT),
            bind: SocketAddr::from(([0, 0, 0, 0], 0)),
            receive_timeout: Duration::from_secs(15), // takeoff/land reply late
            retry_delay: Duration::from_secs(1),
            max_setup_attempts: 5,
        }
    }
}

/// Command dispatch settings
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// How long a submission waits for the session to become ready
    pub ready_timeout: Duration,
    /// Reject out-of-range parameters locally instead of forwarding them
    pub validate_commands: bool,
    /// Capacity of the result stream before slow observers lag
    pub result_buffer: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(5),
            validate_commands: true,
            result_buffer: 64,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct TelloConfig {
    pub session: SessionConfig,
    pub dispatch: DispatchConfig,
    /// Delay between commands of a plan
    pub plan_delay: Duration,
}

impl Default for TelloConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            dispatch: DispatchConfig::default(),
            plan_delay: Duration::from_secs(1),
        }
    }
}

impl TelloConfig {
    /// Defaults overlaid with `TELLO_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(peer) = parse_var::<SocketAddr, _>(&lookup, "TELLO_PEER")? {
            config.session.peer = peer;
        }
        if let Some(bind) = parse_var::<SocketAddr, _>(&lookup, "TELLO_BIND")? {
            config.session.bind = bind;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "TELLO_RECEIVE_TIMEOUT_MS")? {
            if ms == 0 {
                anyhow::bail!(
                    "Invalid value for TELLO_RECEIVE_TIMEOUT_MS: must be greater than zero"
                );
            }
            config.session.receive_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "TELLO_PLAN_DELAY_MS")? {
            config.plan_delay = Duration::from_millis(ms);
        }
        if let Some(validate) = parse_var::<bool, _>(&lookup, "TELLO_VALIDATE")? {
            config.dispatch.validate_commands = validate;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => {
            let value = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid value for {}: {:?}", key, raw))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}
