use crate::config::ServerConfig;
use crate::slots::{LivenessAction, PlayerSlots};
use glam::Vec3;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::geometry::{ray_aabb, Aabb};
use shared::physics::{aim_direction, eye_position};
use shared::protocol::{InputPacket, PingPacket, ProjectilesPacket};
use shared::{
    Mesh, Packet, Projectile, ProjectileKind, Projectiles, WeaponKind, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::time::Duration;

/// A packet the game wants sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub addr: SocketAddr,
    pub packet: Packet,
}

/// Result of one shoot action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shot {
    /// Hitscan struck this player.
    Hit(u32),
    Miss,
    /// A projectile was spawned at this index.
    Thrown(usize),
    /// The projectile collection is full.
    Refused,
}

/// The authoritative world: level, player slots and projectiles.
pub struct ServerGame {
    mesh: Mesh,
    slots: PlayerSlots,
    projectiles: Projectiles,
    rng: StdRng,
    ping_interval: Duration,
    disconnect_threshold: u32,
    pub tick: u64,
}

impl ServerGame {
    pub fn new(mesh: Mesh, config: &ServerConfig) -> Self {
        Self::with_rng(mesh, config, StdRng::from_entropy())
    }

    pub fn with_rng(mesh: Mesh, config: &ServerConfig, rng: StdRng) -> Self {
        Self {
            mesh,
            slots: PlayerSlots::new(),
            projectiles: Projectiles::new(),
            rng,
            ping_interval: config.ping_interval,
            disconnect_threshold: config.disconnect_threshold,
            tick: 0,
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn slots(&self) -> &PlayerSlots {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut PlayerSlots {
        &mut self.slots
    }

    pub fn projectiles(&self) -> &Projectiles {
        &self.projectiles
    }

    /// Applies one inbound packet and returns whatever must be sent in reply.
    pub fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) -> Vec<Outbound> {
        match packet {
            Packet::Join(join) => {
                if join.protocol_version != PROTOCOL_VERSION {
                    warn!(
                        "Rejecting join from {}: protocol version {} (expected {})",
                        addr, join.protocol_version, PROTOCOL_VERSION
                    );
                    return Vec::new();
                }

                match self.slots.allocate(addr) {
                    Some(_) => self.roster_broadcast(),
                    None => {
                        warn!("Rejecting join from {}: server full", addr);
                        Vec::new()
                    }
                }
            }

            Packet::Input(input) => {
                self.apply_input(&input, addr);
                Vec::new()
            }

            Packet::Ping(pong) => {
                self.apply_pong(&pong, addr);
                Vec::new()
            }

            other => {
                warn!("Unexpected {:?} packet from {}", other.kind(), addr);
                Vec::new()
            }
        }
    }

    /// Overwrites the sender's player with its reported state. The server
    /// performs no movement validation, so a modified client can place itself
    /// anywhere.
    fn apply_input(&mut self, input: &InputPacket, addr: SocketAddr) {
        let Some(slot) = self.slots.get_mut(input.player_id) else {
            debug!("Input for inactive player {} from {}", input.player_id, addr);
            return;
        };
        if slot.addr != Some(addr) {
            warn!(
                "Input for player {} from {} which does not own the slot",
                input.player_id, addr
            );
            return;
        }

        let player = &mut slot.player;
        player.position = input.position;
        player.angle = input.angle;
        player.size = input.size;
        player.weapon = input.weapon;

        if input.shoot {
            self.shoot(input.player_id);
        }
    }

    fn apply_pong(&mut self, pong: &PingPacket, addr: SocketAddr) {
        let Some(id) = self.slots.find_by_addr(addr) else {
            debug!("Pong from unknown address {}", addr);
            return;
        };
        if id != pong.player_id {
            warn!("Pong from {} claims player {} but owns {}", addr, pong.player_id, id);
            return;
        }

        if let Some(slot) = self.slots.get_mut(id) {
            if slot.liveness.pong(pong.correlation_id) {
                debug!("Player {} rtt {}ms", id, slot.liveness.last_rtt_ms);
            }
        }
    }

    /// Fires the owner's current weapon from their eye along their aim.
    pub fn shoot(&mut self, owner: u32) -> Shot {
        let Some(player) = self.slots.get(owner).map(|slot| slot.player) else {
            return Shot::Miss;
        };
        let eye = eye_position(player.position, player.size);
        let dir = aim_direction(player.angle);

        let kind = match player.weapon {
            WeaponKind::Bullet => return self.hitscan(owner, eye, dir, player.weapon),
            WeaponKind::Grenade => ProjectileKind::Grenade,
            WeaponKind::JumpBall => ProjectileKind::JumpBall,
        };

        match self.projectiles.spawn(Projectile::launch(kind, eye, dir, owner)) {
            Some(index) => {
                debug!("Player {} threw {:?}", owner, kind);
                Shot::Thrown(index)
            }
            None => {
                warn!("Projectile limit reached, shot from player {} refused", owner);
                Shot::Refused
            }
        }
    }

    fn hitscan(&mut self, owner: u32, eye: Vec3, dir: Vec3, weapon: WeaponKind) -> Shot {
        let nearest = self
            .slots
            .active()
            .filter(|(id, _)| *id != owner)
            .filter_map(|(id, slot)| {
                let bounds = Aabb::around(slot.player.position, slot.player.size);
                ray_aabb(eye, dir, &bounds).map(|t| (id, t))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b));

        let Some((target, distance)) = nearest else {
            return Shot::Miss;
        };

        if let Some(wall) = self.mesh.raycast(eye, dir) {
            if wall.distance < distance {
                debug!("Shot from player {} blocked by level", owner);
                return Shot::Miss;
            }
        }

        if let Some(slot) = self.slots.get_mut(target) {
            slot.player.take_damage(weapon.damage());
            info!(
                "Player {} hit player {} with {:?}, health {:.1}",
                owner, target, weapon, slot.player.health
            );
        }
        Shot::Hit(target)
    }

    /// Runs one simulation tick of length `dt`.
    pub fn tick(&mut self, dt: Duration) -> Vec<Outbound> {
        self.tick += 1;
        self.projectiles.update(&self.mesh, dt.as_secs_f32());

        let mut outbound = Vec::new();
        let state = Packet::State(self.slots.state());
        let projectiles = Packet::Projectiles(ProjectilesPacket {
            projectiles: self.projectiles.snapshot(),
        });
        for (_, addr) in self.slots.active_addrs() {
            outbound.push(Outbound { addr, packet: state.clone() });
            outbound.push(Outbound { addr, packet: projectiles.clone() });
        }

        let mut evicted = Vec::new();
        for (id, slot) in self.slots.active_mut() {
            let action = slot.liveness.advance(
                dt,
                self.ping_interval,
                self.disconnect_threshold,
                &mut self.rng,
            );
            match action {
                LivenessAction::Idle => {}
                LivenessAction::SendPing(correlation_id) => {
                    if let Some(addr) = slot.addr {
                        outbound.push(Outbound {
                            addr,
                            packet: Packet::Ping(PingPacket {
                                player_id: id,
                                correlation_id,
                                last_rtt_ms: slot.liveness.last_rtt_ms,
                            }),
                        });
                    }
                }
                LivenessAction::Evict => {
                    warn!("Player {} missed {} pings, evicting", id, slot.liveness.failures);
                    evicted.push(id);
                }
            }
        }

        for id in &evicted {
            self.slots.free(*id);
        }
        if !evicted.is_empty() {
            outbound.extend(self.roster_broadcast());
        }

        if self.tick % 60 == 0 && !self.slots.is_empty() {
            debug!(
                "Tick {}: {} players, {} projectiles, {:.1}Hz",
                self.tick,
                self.slots.len(),
                self.projectiles.len(),
                1.0 / dt.as_secs_f32().max(f32::EPSILON)
            );
        }

        outbound
    }

    /// The current roster, addressed to every active player with their own id.
    fn roster_broadcast(&self) -> Vec<Outbound> {
        self.slots
            .active_addrs()
            .into_iter()
            .map(|(id, addr)| Outbound {
                addr,
                packet: Packet::PlayerList(self.slots.roster(id)),
            })
            .collect()
    }
}
