use crate::{MAX_HEALTH, PLAYER_SIZE, SPAWN_POINT};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// The weapon a player currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeaponKind {
    #[default]
    Grenade,
    JumpBall,
    /// Instant hitscan.
    Bullet,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 3] = [WeaponKind::Grenade, WeaponKind::JumpBall, WeaponKind::Bullet];

    /// Health removed from a player struck by this weapon.
    pub fn damage(self) -> f32 {
        0.3
    }

    pub fn next(self) -> Self {
        match self {
            WeaponKind::Grenade => WeaponKind::JumpBall,
            WeaponKind::JumpBall => WeaponKind::Bullet,
            WeaponKind::Bullet => WeaponKind::Grenade,
        }
    }

    pub fn is_hitscan(self) -> bool {
        matches!(self, WeaponKind::Bullet)
    }
}

/// Actions a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveFront,
    MoveBack,
    MoveRight,
    MoveLeft,
    Jump,
    Shoot,
    SwitchWeapon,
}

/// One player record. The server keeps an authoritative table of these and
/// each client keeps its own copy, reconciled only through state packets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Player {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Half extent of the bounding box.
    pub size: Vec3,
    /// Yaw (x) and pitch (y) in radians.
    pub angle: Vec2,
    pub weapon: WeaponKind,
    pub health: f32,
    pub grounded: bool,
    pub active: bool,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            position: SPAWN_POINT,
            velocity: Vec3::ZERO,
            size: PLAYER_SIZE,
            angle: Vec2::ZERO,
            weapon: WeaponKind::default(),
            health: MAX_HEALTH,
            grounded: false,
            active: false,
        }
    }
}

impl Player {
    pub fn spawn() -> Self {
        Self {
            active: true,
            ..Self::default()
        }
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.health = (self.health - amount).max(0.0);
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0.0
    }
}
