//! Simulation core shared by the server and every client: geometry, level mesh,
//! collision response, physics integration, projectiles and the wire protocol.

use glam::Vec3;

pub mod collision;
pub mod geometry;
pub mod mesh;
pub mod physics;
pub mod player;
pub mod projectile;
pub mod protocol;

pub use collision::{resolve_motion, MotionQuery, MotionResult, Response, SurfaceFilter, Volume};
pub use geometry::{box_intersects_triangle, sphere_intersects_triangle, Triangle};
pub use mesh::{Mesh, MeshPart, RayHit};
pub use physics::{apply_gravity, step_player, GravityResult, MoveIntent};
pub use player::{InputAction, Player, WeaponKind};
pub use projectile::{Projectile, ProjectileKind, Projectiles};
pub use protocol::{Packet, PacketKind, ProtocolError};

pub const GRAVITY: f32 = 9.81;
pub const PLAYER_SPEED: f32 = 4.0;
pub const JUMP_VELOCITY: f32 = 4.5;
pub const PLAYER_SIZE: Vec3 = Vec3::new(0.15, 0.75, 0.15);
pub const SPAWN_POINT: Vec3 = Vec3::new(4.0, 0.75, 4.0);
pub const MAX_HEALTH: f32 = 10.0;

pub const MAX_PLAYERS: usize = 4;
pub const MAX_PROJECTILES: usize = 100;

/// Initial size of the broad-pass candidate buffer. The buffer grows past it.
pub const REBOUND_CANDIDATE_CAPACITY: usize = 100;
/// Corrected displacements shorter than this snap back to the start position.
pub const MIN_MOTION: f32 = 1e-3;
/// Surfaces with `|normal.y|` at or above this count as floor or ceiling.
pub const FLOOR_NORMAL_THRESHOLD: f32 = 0.7;
pub const KILL_PLANE: f32 = -50.0;
pub const WORLD_UP: Vec3 = Vec3::Y;

pub const EYE_HEIGHT_FACTOR: f32 = 0.9;
pub const PITCH_LIMIT: f32 = 89.0 * std::f32::consts::PI / 180.0;
pub const MOUSE_SENSITIVITY: f32 = 0.003;

pub const SERVER_PORT: u16 = 20586;
pub const PROTOCOL_VERSION: u16 = 1;
pub const TICKS_PER_SEC: u32 = 60;
pub const PING_INTERVAL_MS: u64 = 1000;
pub const PING_DISCONNECT_THRESHOLD: u32 = 3;
