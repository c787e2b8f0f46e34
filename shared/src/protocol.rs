//! Datagram layout shared by server and clients.
//!
//! Every datagram is one bincode-encoded [`Packet`] using fixed-width little
//! endian integers. The enum variant index is written first as a `u32`, so the
//! first four bytes of any datagram are its tag. Every packet has a fixed
//! length except `Projectiles`, whose tag is followed by a `u64` record count
//! and then `count` records of [`PROJECTILE_RECORD_LEN`] bytes each.
//!
//! Receivers read in two phases: peek at most [`HEADER_LEN`] bytes, ask
//! [`PacketHeader::parse`] how long the datagram must be, then receive into a
//! buffer of that size and hand it to [`decode_exact`].

use crate::player::WeaponKind;
use crate::projectile::ProjectileKind;
use crate::{MAX_PLAYERS, MAX_PROJECTILES};
use bincode::Options;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tag plus the `u64` record count of a projectiles packet.
pub const HEADER_LEN: usize = 12;
/// Position, radius and kind of one projectile.
pub const PROJECTILE_RECORD_LEN: usize = 20;
/// The largest valid datagram: a full projectiles packet.
pub const MAX_DATAGRAM_LEN: usize = HEADER_LEN + MAX_PROJECTILES * PROJECTILE_RECORD_LEN;

const TAG_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty datagram")]
    Empty,

    #[error("unknown packet tag {0}")]
    UnknownTag(u32),

    #[error("truncated datagram: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("oversized datagram: expected {expected} bytes, got {actual}")]
    Oversized { expected: usize, actual: usize },

    #[error("projectile count {0} exceeds capacity")]
    TooManyProjectiles(u64),

    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputPacket {
    pub player_id: u32,
    pub position: Vec3,
    pub angle: Vec2,
    pub size: Vec3,
    pub shoot: bool,
    pub weapon: WeaponKind,
}

/// Every slot's public state, indexed by player id. Inactive slots carry
/// whatever the server last held for them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatePacket {
    pub positions: [Vec3; MAX_PLAYERS],
    pub angles: [Vec2; MAX_PLAYERS],
    pub weapons: [WeaponKind; MAX_PLAYERS],
    pub healths: [f32; MAX_PLAYERS],
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkProjectile {
    pub position: Vec3,
    pub radius: f32,
    pub kind: ProjectileKind,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectilesPacket {
    pub projectiles: Vec<NetworkProjectile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JoinPacket {
    pub protocol_version: u16,
}

/// Roster of active slots. Only the first `active_count` ids are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerListPacket {
    pub active_ids: [u32; MAX_PLAYERS],
    pub active_count: u32,
    /// Id of the slot the receiving client occupies.
    pub assigned_id: u32,
}

impl PlayerListPacket {
    pub fn active(&self) -> &[u32] {
        let count = (self.active_count as usize).min(MAX_PLAYERS);
        &self.active_ids[..count]
    }
}

/// Liveness probe. The server sends one with a fresh correlation id and the
/// client echoes it back unchanged as the pong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PingPacket {
    pub player_id: u32,
    pub correlation_id: u32,
    pub last_rtt_ms: u32,
}

/// A whole datagram. Variant order is the wire tag and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    Input(InputPacket),
    State(StatePacket),
    Projectiles(ProjectilesPacket),
    Join(JoinPacket),
    PlayerList(PlayerListPacket),
    Ping(PingPacket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Input = 0,
    State = 1,
    Projectiles = 2,
    Join = 3,
    PlayerList = 4,
    Ping = 5,
}

impl TryFrom<u32> for PacketKind {
    type Error = ProtocolError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        Ok(match tag {
            0 => PacketKind::Input,
            1 => PacketKind::State,
            2 => PacketKind::Projectiles,
            3 => PacketKind::Join,
            4 => PacketKind::PlayerList,
            5 => PacketKind::Ping,
            other => return Err(ProtocolError::UnknownTag(other)),
        })
    }
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Input(_) => PacketKind::Input,
            Packet::State(_) => PacketKind::State,
            Packet::Projectiles(_) => PacketKind::Projectiles,
            Packet::Join(_) => PacketKind::Join,
            Packet::PlayerList(_) => PacketKind::PlayerList,
            Packet::Ping(_) => PacketKind::Ping,
        }
    }

    pub fn join() -> Self {
        Packet::Join(JoinPacket {
            protocol_version: crate::PROTOCOL_VERSION,
        })
    }

    /// Rejects packets that decode cleanly but carry values no peer may send.
    fn validate(&self) -> Result<(), ProtocolError> {
        let valid_id = |id: u32| (id as usize) < MAX_PLAYERS;

        match self {
            Packet::Input(input) => {
                if !valid_id(input.player_id) {
                    return Err(ProtocolError::InvalidField("player_id"));
                }
                if !input.position.is_finite() || !input.angle.is_finite() {
                    return Err(ProtocolError::InvalidField("position"));
                }
                if !input.size.is_finite() || input.size.min_element() <= 0.0 {
                    return Err(ProtocolError::InvalidField("size"));
                }
            }
            Packet::Projectiles(packet) => {
                if packet.projectiles.len() > MAX_PROJECTILES {
                    return Err(ProtocolError::TooManyProjectiles(packet.projectiles.len() as u64));
                }
            }
            Packet::PlayerList(list) => {
                if list.active_count as usize > MAX_PLAYERS {
                    return Err(ProtocolError::InvalidField("active_count"));
                }
                if !list.active().iter().all(|&id| valid_id(id)) {
                    return Err(ProtocolError::InvalidField("active_ids"));
                }
                if !valid_id(list.assigned_id) {
                    return Err(ProtocolError::InvalidField("assigned_id"));
                }
            }
            Packet::Ping(ping) => {
                if !valid_id(ping.player_id) {
                    return Err(ProtocolError::InvalidField("player_id"));
                }
            }
            Packet::State(_) | Packet::Join(_) => {}
        }
        Ok(())
    }
}

impl PacketKind {
    /// Encoded length of a packet of this kind carrying `count` records. Only
    /// projectiles packets depend on the count.
    pub fn encoded_len(self, count: usize) -> Result<usize, ProtocolError> {
        let template = match self {
            PacketKind::Input => Packet::Input(InputPacket::default()),
            PacketKind::State => Packet::State(StatePacket::default()),
            PacketKind::Projectiles => return Ok(HEADER_LEN + count * PROJECTILE_RECORD_LEN),
            PacketKind::Join => Packet::Join(JoinPacket::default()),
            PacketKind::PlayerList => Packet::PlayerList(PlayerListPacket::default()),
            PacketKind::Ping => Packet::Ping(PingPacket::default()),
        };
        Ok(codec().serialized_size(&template)? as usize)
    }
}

/// What the first bytes of a datagram say about the rest of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub kind: PacketKind,
    pub expected_len: usize,
}

impl PacketHeader {
    /// Parses a peeked prefix of at most [`HEADER_LEN`] bytes.
    pub fn parse(peeked: &[u8]) -> Result<Self, ProtocolError> {
        if peeked.is_empty() {
            return Err(ProtocolError::Empty);
        }
        let tag_bytes: [u8; TAG_LEN] = peeked
            .get(..TAG_LEN)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(ProtocolError::Truncated {
                expected: TAG_LEN,
                actual: peeked.len(),
            })?;
        let kind = PacketKind::try_from(u32::from_le_bytes(tag_bytes))?;

        let count = if kind == PacketKind::Projectiles {
            let count_bytes: [u8; 8] = peeked
                .get(TAG_LEN..HEADER_LEN)
                .and_then(|bytes| bytes.try_into().ok())
                .ok_or(ProtocolError::Truncated {
                    expected: HEADER_LEN,
                    actual: peeked.len(),
                })?;
            let count = u64::from_le_bytes(count_bytes);
            if count > MAX_PROJECTILES as u64 {
                return Err(ProtocolError::TooManyProjectiles(count));
            }
            count as usize
        } else {
            0
        };

        Ok(Self {
            kind,
            expected_len: kind.encoded_len(count)?,
        })
    }
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_DATAGRAM_LEN as u64)
}

pub fn encode(packet: &Packet) -> Result<Vec<u8>, ProtocolError> {
    packet.validate()?;
    Ok(codec().serialize(packet)?)
}

/// Decodes one whole datagram. Trailing bytes are an error.
pub fn decode(bytes: &[u8]) -> Result<Packet, ProtocolError> {
    if bytes.is_empty() {
        return Err(ProtocolError::Empty);
    }
    let packet: Packet = codec().deserialize(bytes)?;
    packet.validate()?;
    Ok(packet)
}

/// Decodes a datagram whose length was announced by [`PacketHeader::parse`].
pub fn decode_exact(bytes: &[u8], expected_len: usize) -> Result<Packet, ProtocolError> {
    let actual = bytes.len();
    if actual < expected_len {
        return Err(ProtocolError::Truncated {
            expected: expected_len,
            actual,
        });
    }
    if actual > expected_len {
        return Err(ProtocolError::Oversized {
            expected: expected_len,
            actual,
        });
    }
    decode(bytes)
}
