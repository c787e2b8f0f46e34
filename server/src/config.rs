//! Runtime settings for one server instance.

use shared::{PING_DISCONNECT_THRESHOLD, PING_INTERVAL_MS, SERVER_PORT, TICKS_PER_SEC};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub tick_duration: Duration,
    /// Time between liveness pings to each slot.
    pub ping_interval: Duration,
    /// Consecutive unanswered pings before a slot is freed.
    pub disconnect_threshold: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, SERVER_PORT)),
            tick_duration: tick_duration_for(TICKS_PER_SEC),
            ping_interval: Duration::from_millis(PING_INTERVAL_MS),
            disconnect_threshold: PING_DISCONNECT_THRESHOLD,
        }
    }
}

impl ServerConfig {
    pub fn with_bind_addr(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }
}

/// Tick period for a rate in Hz. A zero rate is treated as 1 Hz.
pub fn tick_duration_for(ticks_per_sec: u32) -> Duration {
    Duration::from_secs_f64(1.0 / ticks_per_sec.max(1) as f64)
}
