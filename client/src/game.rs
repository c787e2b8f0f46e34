use log::{debug, info, warn};
use shared::physics::{apply_look, step_player};
use shared::protocol::{InputPacket, NetworkProjectile};
use shared::{Mesh, MoveIntent, Packet, Player, MAX_PLAYERS};
use glam::Vec2;

/// The client's view of the match: its own player, which it moves locally,
/// and everyone else as last reported by the server.
#[derive(Debug, Clone)]
pub struct ClientWorld {
    players: [Player; MAX_PLAYERS],
    local_id: Option<u32>,
    projectiles: Vec<NetworkProjectile>,
    last_rtt_ms: u32,
}

impl ClientWorld {
    pub fn new() -> Self {
        Self {
            players: [Player::default(); MAX_PLAYERS],
            local_id: None,
            projectiles: Vec::new(),
            last_rtt_ms: 0,
        }
    }

    pub fn local_id(&self) -> Option<u32> {
        self.local_id
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.local_id.map(|id| &self.players[id as usize])
    }

    fn local_player_mut(&mut self) -> Option<&mut Player> {
        self.local_id.map(|id| &mut self.players[id as usize])
    }

    /// Active players with their ids.
    pub fn players(&self) -> impl Iterator<Item = (u32, &Player)> {
        self.players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.active)
            .map(|(id, p)| (id as u32, p))
    }

    pub fn projectiles(&self) -> &[NetworkProjectile] {
        &self.projectiles
    }

    pub fn last_rtt_ms(&self) -> u32 {
        self.last_rtt_ms
    }

    /// Folds one server packet into the world. Returns the reply to send, if
    /// any; only pings get one.
    pub fn apply_packet(&mut self, packet: Packet) -> Option<Packet> {
        match packet {
            Packet::PlayerList(list) => {
                let assigned = list.assigned_id as usize;
                if assigned >= MAX_PLAYERS {
                    warn!("Roster assigned out-of-range id {}", list.assigned_id);
                    return None;
                }

                if self.local_id != Some(list.assigned_id) {
                    info!("Joined as player {}", list.assigned_id);
                    self.players[assigned] = Player::spawn();
                    self.local_id = Some(list.assigned_id);
                }

                let active = list.active();
                for (id, player) in self.players.iter_mut().enumerate() {
                    player.active = active.contains(&(id as u32));
                }
                self.players[assigned].active = true;
                debug!("Roster: {:?}", active);
                None
            }

            Packet::State(state) => {
                for (id, player) in self.players.iter_mut().enumerate() {
                    player.health = state.healths[id];
                    if Some(id as u32) == self.local_id {
                        continue;
                    }
                    player.position = state.positions[id];
                    player.angle = state.angles[id];
                    player.weapon = state.weapons[id];
                }
                None
            }

            Packet::Projectiles(packet) => {
                self.projectiles = packet.projectiles;
                None
            }

            Packet::Ping(ping) => {
                self.last_rtt_ms = ping.last_rtt_ms;
                Some(Packet::Ping(ping))
            }

            other => {
                warn!("Unexpected {:?} packet from server", other.kind());
                None
            }
        }
    }

    /// Moves the local player by one frame of input. Does nothing before the
    /// server has assigned a slot.
    pub fn step_local(&mut self, mesh: &Mesh, intent: &MoveIntent, look_delta: Vec2, dt: f32) {
        if let Some(player) = self.local_player_mut() {
            player.angle = apply_look(player.angle, look_delta);
            step_player(mesh, player, intent, dt);
        }
    }

    pub fn switch_weapon(&mut self) {
        if let Some(player) = self.local_player_mut() {
            player.weapon = player.weapon.next();
            info!("Switched to {:?}", player.weapon);
        }
    }

    /// The input packet describing the local player this frame.
    pub fn input_packet(&self, shoot: bool) -> Option<Packet> {
        let id = self.local_id?;
        let player = &self.players[id as usize];
        Some(Packet::Input(InputPacket {
            player_id: id,
            position: player.position,
            angle: player.angle,
            size: player.size,
            shoot,
            weapon: player.weapon,
        }))
    }
}

impl Default for ClientWorld {
    fn default() -> Self {
        Self::new()
    }
}
