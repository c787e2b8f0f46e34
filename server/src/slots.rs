//! Fixed table of player slots and the ping/pong liveness check.
//!
//! A player's id is its index in the table and stays the same for as long as
//! the connection lives. Freeing a slot only deactivates it, so ids of the
//! remaining players never shift.

use log::info;
use rand::Rng;
use shared::protocol::{PlayerListPacket, StatePacket};
use shared::{Player, MAX_PLAYERS};
use std::net::SocketAddr;
use std::time::Duration;

/// What a slot's liveness check wants done after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessAction {
    Idle,
    /// Send a ping carrying this correlation id.
    SendPing(u32),
    /// Too many pings went unanswered.
    Evict,
}

/// Ping/pong bookkeeping for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liveness {
    /// Id of the ping currently awaiting a pong.
    pub correlation_id: u32,
    /// Time since the last ping went out.
    pub since_ping: Duration,
    /// Whether the last ping was answered. Starts `true` so a fresh slot
    /// gets a full interval before its first ping can count as missed.
    pub did_pong: bool,
    /// Consecutive unanswered pings.
    pub failures: u32,
    pub last_rtt_ms: u32,
}

impl Default for Liveness {
    fn default() -> Self {
        Self {
            correlation_id: 0,
            since_ping: Duration::ZERO,
            did_pong: true,
            failures: 0,
            last_rtt_ms: 0,
        }
    }
}

impl Liveness {
    /// Advances the ping clock by `dt`. Once `interval` has passed, settles
    /// the outstanding ping and either starts a new one or asks for eviction.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        dt: Duration,
        interval: Duration,
        threshold: u32,
        rng: &mut R,
    ) -> LivenessAction {
        self.since_ping += dt;
        if self.since_ping < interval {
            return LivenessAction::Idle;
        }

        if self.did_pong {
            self.failures = 0;
        } else {
            self.failures += 1;
            if self.failures >= threshold {
                return LivenessAction::Evict;
            }
        }

        self.correlation_id = rng.gen();
        self.did_pong = false;
        self.since_ping = Duration::ZERO;
        LivenessAction::SendPing(self.correlation_id)
    }

    /// Records a pong. Returns `false` for stale or unknown correlation ids.
    pub fn pong(&mut self, correlation_id: u32) -> bool {
        if self.did_pong || correlation_id != self.correlation_id {
            return false;
        }
        self.did_pong = true;
        self.last_rtt_ms = self.since_ping.as_millis().min(u32::MAX as u128) as u32;
        true
    }
}

/// The server's copy of one player plus its connection state.
#[derive(Debug, Clone, Default)]
pub struct ServerPlayer {
    pub player: Player,
    /// Where packets for this slot go. `None` for a slot never used.
    pub addr: Option<SocketAddr>,
    pub liveness: Liveness,
}

impl ServerPlayer {
    pub fn is_active(&self) -> bool {
        self.player.active
    }
}

/// All player slots, indexed by player id.
#[derive(Debug, Clone)]
pub struct PlayerSlots {
    slots: [ServerPlayer; MAX_PLAYERS],
}

impl Default for PlayerSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerSlots {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| ServerPlayer::default()),
        }
    }

    /// Claims a slot for `addr`.
    ///
    /// An address that already holds an active slot gets its existing id back
    /// unchanged. Otherwise the lowest free slot is reset to a fresh player at
    /// full health. Returns `None` when every slot is taken.
    pub fn allocate(&mut self, addr: SocketAddr) -> Option<u32> {
        if let Some(id) = self.find_by_addr(addr) {
            return Some(id);
        }

        let (id, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| !slot.is_active())?;

        *slot = ServerPlayer {
            player: Player::spawn(),
            addr: Some(addr),
            liveness: Liveness::default(),
        };
        info!("Player {} joined from {}", id, addr);
        Some(id as u32)
    }

    /// Frees an active slot. Returns `false` if it was already free.
    pub fn free(&mut self, id: u32) -> bool {
        match self.get_mut(id) {
            Some(slot) => {
                slot.player.active = false;
                info!("Player {} left", id);
                true
            }
            None => false,
        }
    }

    /// Id of the active slot bound to `addr`.
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.slots
            .iter()
            .position(|slot| slot.is_active() && slot.addr == Some(addr))
            .map(|id| id as u32)
    }

    /// The slot for `id`, if it is active.
    pub fn get(&self, id: u32) -> Option<&ServerPlayer> {
        self.slots.get(id as usize).filter(|slot| slot.is_active())
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut ServerPlayer> {
        self.slots.get_mut(id as usize).filter(|slot| slot.is_active())
    }

    pub fn active(&self) -> impl Iterator<Item = (u32, &ServerPlayer)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_active())
            .map(|(id, slot)| (id as u32, slot))
    }

    pub fn active_mut(&mut self) -> impl Iterator<Item = (u32, &mut ServerPlayer)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter(|(_, slot)| slot.is_active())
            .map(|(id, slot)| (id as u32, slot))
    }

    pub fn active_ids(&self) -> Vec<u32> {
        self.active().map(|(id, _)| id).collect()
    }

    /// Ids and addresses of every active slot, for broadcasting.
    pub fn active_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.active()
            .filter_map(|(id, slot)| slot.addr.map(|addr| (id, addr)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.active().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == MAX_PLAYERS
    }

    /// Roster as seen by the player in slot `assigned_id`.
    pub fn roster(&self, assigned_id: u32) -> PlayerListPacket {
        let mut packet = PlayerListPacket {
            assigned_id,
            ..Default::default()
        };
        for (i, id) in self.active_ids().into_iter().enumerate() {
            packet.active_ids[i] = id;
        }
        packet.active_count = self.len() as u32;
        packet
    }

    /// Public state of every slot, active or not.
    pub fn state(&self) -> StatePacket {
        let mut packet = StatePacket::default();
        for (i, slot) in self.slots.iter().enumerate() {
            packet.positions[i] = slot.player.position;
            packet.angles[i] = slot.player.angle;
            packet.weapons[i] = slot.player.weapon;
            packet.healths[i] = slot.player.health;
        }
        packet
    }
}
