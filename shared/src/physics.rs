//! Per-tick movement shared by every role that advances a player: the client
//! for its own avatar and the headless bot. Vertical motion is integrated by
//! [`apply_gravity`] against a downward ray, horizontal motion goes through
//! [`resolve_motion`] with walls only, so the two never correct the same axis.

use crate::collision::{resolve_motion, MotionQuery};
use crate::mesh::Mesh;
use crate::player::Player;
use crate::{EYE_HEIGHT_FACTOR, GRAVITY, JUMP_VELOCITY, MOUSE_SENSITIVITY, PITCH_LIMIT, PLAYER_SPEED};
use glam::{Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GravityResult {
    pub position: Vec3,
    pub velocity: Vec3,
    pub grounded: bool,
}

/// Integrates gravity for one tick and snaps onto the floor below.
///
/// The ray is cast from whichever of the old and tentative positions is
/// higher, so a fall faster than `radius` per tick still finds the floor it
/// passed through.
pub fn apply_gravity(mesh: &Mesh, position: Vec3, radius: f32, velocity: Vec3, dt: f32) -> GravityResult {
    let mut velocity = velocity;
    velocity.y -= GRAVITY * dt;
    let tentative = position + Vec3::new(0.0, velocity.y * dt, 0.0);

    let origin = if position.y > tentative.y { position } else { tentative };
    if let Some(hit) = mesh.raycast(origin, Vec3::NEG_Y) {
        if hit.point.y > tentative.y - radius {
            velocity.y = 0.0;
            return GravityResult {
                position: Vec3::new(tentative.x, hit.point.y + radius, tentative.z),
                velocity,
                grounded: true,
            };
        }
    }

    GravityResult {
        position: tentative,
        velocity,
        grounded: false,
    }
}

/// Movement keys held during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

impl MoveIntent {
    /// Horizontal wish direction for the given yaw, unit length or zero.
    pub fn wish_direction(&self, yaw: f32) -> Vec3 {
        let forward = Vec3::new(-yaw.sin(), 0.0, -yaw.cos());
        let right = Vec3::new(yaw.cos(), 0.0, -yaw.sin());
        let axis = |pos: bool, neg: bool| pos as i32 as f32 - neg as i32 as f32;

        (forward * axis(self.forward, self.back) + right * axis(self.right, self.left)).normalize_or_zero()
    }
}

/// Advances one player by one tick of input.
pub fn step_player(mesh: &Mesh, player: &mut Player, intent: &MoveIntent, dt: f32) {
    let wish = intent.wish_direction(player.angle.x) * PLAYER_SPEED;
    player.velocity.x = wish.x;
    player.velocity.z = wish.z;

    if intent.jump && player.grounded {
        player.velocity.y = JUMP_VELOCITY;
    }

    let fall = apply_gravity(mesh, player.position, player.size.y, player.velocity, dt);
    player.position = fall.position;
    player.velocity = fall.velocity;
    player.grounded = fall.grounded;

    let vertical = player.velocity.y;
    player.velocity.y = 0.0;
    let desired = player.position + player.velocity * dt;
    let moved = resolve_motion(
        mesh,
        player.position,
        desired,
        &MotionQuery::player(player.size.x),
        player.velocity,
        dt,
    );
    player.position = moved.position;
    player.velocity.y = vertical;
}

/// Applies a mouse delta to yaw/pitch, clamping pitch short of straight up
/// and down.
pub fn apply_look(angle: Vec2, mouse_delta: Vec2) -> Vec2 {
    let yaw = angle.x - mouse_delta.x * MOUSE_SENSITIVITY;
    let pitch = (angle.y - mouse_delta.y * MOUSE_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    Vec2::new(yaw, pitch)
}

/// Unit view direction for yaw (x) and pitch (y).
pub fn aim_direction(angle: Vec2) -> Vec3 {
    let (yaw, pitch) = (angle.x, angle.y);
    Vec3::new(-yaw.sin() * pitch.cos(), pitch.sin(), -yaw.cos() * pitch.cos())
}

pub fn eye_position(position: Vec3, size: Vec3) -> Vec3 {
    position + Vec3::new(0.0, size.y * EYE_HEIGHT_FACTOR, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PLAYER_SIZE;
    use assert_approx_eq::assert_approx_eq;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_lands_on_floor_in_one_tick() {
        let mesh = Mesh::floor(10.0);
        let radius = PLAYER_SIZE.y;
        let result = apply_gravity(&mesh, Vec3::new(0.3, radius, 0.7), radius, Vec3::ZERO, DT);

        assert!(result.grounded);
        assert_approx_eq!(result.position.y, radius, 1e-6);
        assert_eq!(result.velocity.y, 0.0);
    }

    #[test]
    fn test_falls_when_airborne() {
        let mesh = Mesh::floor(10.0);
        let result = apply_gravity(&mesh, Vec3::new(0.3, 5.0, 0.7), 0.75, Vec3::ZERO, DT);

        assert!(!result.grounded);
        assert_approx_eq!(result.velocity.y, -GRAVITY * DT, 1e-6);
        assert!(result.position.y < 5.0);
    }

    #[test]
    fn test_fast_fall_does_not_tunnel() {
        let mesh = Mesh::floor(10.0);
        let result = apply_gravity(&mesh, Vec3::new(0.3, 0.8, 0.7), 0.75, Vec3::new(0.0, -100.0, 0.0), DT);

        assert!(result.grounded);
        assert_approx_eq!(result.position.y, 0.75, 1e-6);
    }

    #[test]
    fn test_no_floor_keeps_falling() {
        let mesh = Mesh::default();
        let result = apply_gravity(&mesh, Vec3::ZERO, 0.75, Vec3::ZERO, DT);
        assert!(!result.grounded);
    }

    #[test]
    fn test_wish_direction() {
        let intent = MoveIntent { forward: true, ..Default::default() };
        let dir = intent.wish_direction(0.0);
        assert_approx_eq!(dir.z, -1.0, 1e-6);

        let diagonal = MoveIntent { forward: true, right: true, ..Default::default() };
        assert_approx_eq!(diagonal.wish_direction(0.0).length(), 1.0, 1e-6);

        let cancelled = MoveIntent { forward: true, back: true, ..Default::default() };
        assert_eq!(cancelled.wish_direction(1.0), Vec3::ZERO);
    }

    #[test]
    fn test_step_player_walks_forward() {
        let mesh = Mesh::floor(10.0);
        let mut player = Player::spawn();
        player.position = Vec3::new(0.3, PLAYER_SIZE.y, 0.7);
        let intent = MoveIntent { forward: true, ..Default::default() };

        for _ in 0..10 {
            step_player(&mesh, &mut player, &intent, DT);
        }

        assert!(player.grounded);
        assert_approx_eq!(player.position.y, PLAYER_SIZE.y, 1e-5);
        assert_approx_eq!(player.position.z, 0.7 - PLAYER_SPEED * 10.0 * DT, 1e-4);
        assert_approx_eq!(player.position.x, 0.3, 1e-5);
    }

    #[test]
    fn test_step_player_blocked_by_wall() {
        let mesh = Mesh::arena();
        let mut player = Player::spawn();
        player.position = Vec3::new(0.3, PLAYER_SIZE.y, -19.3);
        let intent = MoveIntent { forward: true, ..Default::default() };

        step_player(&mesh, &mut player, &intent, DT);

        assert_approx_eq!(player.position.z, -19.3, 1e-5);
        assert!(player.grounded);
    }

    #[test]
    fn test_step_player_jump() {
        let mesh = Mesh::floor(10.0);
        let mut player = Player::spawn();
        player.position = Vec3::new(0.3, PLAYER_SIZE.y, 0.7);
        player.grounded = true;
        let intent = MoveIntent { jump: true, ..Default::default() };

        step_player(&mesh, &mut player, &intent, DT);

        assert!(!player.grounded);
        assert!(player.velocity.y > 0.0);
        assert!(player.position.y > PLAYER_SIZE.y);

        // Holding jump mid-air does nothing.
        let vy = player.velocity.y;
        step_player(&mesh, &mut player, &intent, DT);
        assert!(player.velocity.y < vy);
    }

    #[test]
    fn test_look_clamps_pitch() {
        let angle = apply_look(Vec2::ZERO, Vec2::new(0.0, -1.0e6));
        assert_approx_eq!(angle.y, PITCH_LIMIT, 1e-6);
        let angle = apply_look(Vec2::ZERO, Vec2::new(100.0, 0.0));
        assert_approx_eq!(angle.x, -100.0 * MOUSE_SENSITIVITY, 1e-6);
    }

    #[test]
    fn test_aim_direction_is_unit() {
        for angle in [Vec2::ZERO, Vec2::new(1.2, 0.4), Vec2::new(-2.0, -1.0)] {
            assert_approx_eq!(aim_direction(angle).length(), 1.0, 1e-5);
        }
        assert_approx_eq!(aim_direction(Vec2::ZERO).z, -1.0, 1e-6);
    }

    #[test]
    fn test_eye_position() {
        let eye = eye_position(Vec3::new(1.0, 0.75, 2.0), PLAYER_SIZE);
        assert_approx_eq!(eye.y, 0.75 + 0.75 * EYE_HEIGHT_FACTOR, 1e-6);
    }
}
