//! In-flight projectiles and the explosions they turn into.

use crate::collision::{resolve_motion, MotionQuery};
use crate::mesh::Mesh;
use crate::protocol::NetworkProjectile;
use crate::{GRAVITY, KILL_PLANE, MAX_PROJECTILES, WORLD_UP};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Ground contact is a bounce off a surface whose normal is within 60 degrees of up.
const GROUND_CONTACT_DOT: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Explodes the moment it lands.
    Grenade,
    /// Bounces around until its fuse runs out.
    JumpBall,
    /// Stationary blast volume.
    Explosion,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileTuning {
    /// Launch speed in metres per second.
    pub speed: f32,
    pub radius: f32,
    pub gravity: bool,
    /// Seconds alive before the projectile detonates or despawns.
    pub fuse: Option<f32>,
    /// Radius of the explosion this projectile becomes. `None` means it is
    /// simply removed.
    pub explosion_radius: Option<f32>,
}

impl ProjectileKind {
    pub fn tuning(self) -> ProjectileTuning {
        match self {
            ProjectileKind::Grenade => ProjectileTuning {
                speed: 12.0,
                radius: 0.1,
                gravity: true,
                fuse: None,
                explosion_radius: Some(2.0),
            },
            ProjectileKind::JumpBall => ProjectileTuning {
                speed: 12.0,
                radius: 0.1,
                gravity: true,
                fuse: Some(3.0),
                explosion_radius: Some(5.0),
            },
            ProjectileKind::Explosion => ProjectileTuning {
                speed: 0.0,
                radius: 2.0,
                gravity: false,
                fuse: Some(1.0),
                explosion_radius: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub position: Vec3,
    pub velocity: Vec3,
    pub radius: f32,
    /// Seconds since spawn, or since turning into an explosion.
    pub lifetime: f32,
    pub kind: ProjectileKind,
    pub owner: u32,
}

impl Projectile {
    /// A projectile of `kind` thrown from `origin` along `direction`.
    pub fn launch(kind: ProjectileKind, origin: Vec3, direction: Vec3, owner: u32) -> Self {
        let tuning = kind.tuning();
        Self {
            position: origin,
            velocity: direction.normalize_or_zero() * tuning.speed,
            radius: tuning.radius,
            lifetime: 0.0,
            kind,
            owner,
        }
    }

    fn explode(&mut self, radius: f32) {
        self.kind = ProjectileKind::Explosion;
        self.radius = radius;
        self.velocity = Vec3::ZERO;
        self.lifetime = 0.0;
    }

    /// Advances one tick. Returns `false` when the projectile should be removed.
    fn step(&mut self, mesh: &Mesh, dt: f32) -> bool {
        self.lifetime += dt;
        let tuning = self.kind.tuning();

        if self.kind == ProjectileKind::Explosion {
            return !tuning.fuse.is_some_and(|fuse| self.lifetime > fuse);
        }

        if tuning.gravity {
            self.velocity.y -= GRAVITY * dt;
        }

        let desired = self.position + self.velocity * dt;
        let moved = resolve_motion(
            mesh,
            self.position,
            desired,
            &MotionQuery::projectile(self.radius),
            self.velocity,
            dt,
        );
        self.position = moved.position;
        self.velocity = moved.velocity;

        let landed = moved
            .hit_normal
            .is_some_and(|n| n.dot(WORLD_UP) > GROUND_CONTACT_DOT);
        let detonate = match self.kind {
            ProjectileKind::Grenade => landed,
            _ => tuning.fuse.is_some_and(|fuse| self.lifetime > fuse),
        };

        if detonate {
            match tuning.explosion_radius {
                Some(radius) => self.explode(radius),
                None => return false,
            }
        }

        self.position.y >= KILL_PLANE
    }
}

/// Bounded set of live projectiles. Order is not meaningful; removal swaps
/// the last projectile into the freed index.
#[derive(Debug, Clone)]
pub struct Projectiles {
    items: Vec<Projectile>,
}

impl Default for Projectiles {
    fn default() -> Self {
        Self::new()
    }
}

impl Projectiles {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(MAX_PROJECTILES),
        }
    }

    /// Adds a projectile, returning its current index, or `None` when the
    /// collection is full.
    pub fn spawn(&mut self, projectile: Projectile) -> Option<usize> {
        if self.items.len() >= MAX_PROJECTILES {
            return None;
        }
        self.items.push(projectile);
        Some(self.items.len() - 1)
    }

    pub fn remove(&mut self, index: usize) -> Option<Projectile> {
        (index < self.items.len()).then(|| self.items.swap_remove(index))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= MAX_PROJECTILES
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Advances every projectile by one tick, turning landed grenades and
    /// expired jump balls into explosions in place and dropping expired
    /// explosions and anything below the kill plane.
    pub fn update(&mut self, mesh: &Mesh, dt: f32) {
        let mut i = 0;
        while i < self.items.len() {
            if self.items[i].step(mesh, dt) {
                i += 1;
            } else {
                self.items.swap_remove(i);
            }
        }
    }

    pub fn snapshot(&self) -> Vec<NetworkProjectile> {
        self.items
            .iter()
            .map(|p| NetworkProjectile {
                position: p.position,
                radius: p.radius,
                kind: p.kind,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const DT: f32 = 1.0 / 60.0;

    fn grenade_at(position: Vec3, velocity: Vec3) -> Projectile {
        Projectile {
            velocity,
            ..Projectile::launch(ProjectileKind::Grenade, position, Vec3::ZERO, 0)
        }
    }

    #[test]
    fn test_launch_uses_tuning() {
        let p = Projectile::launch(ProjectileKind::JumpBall, Vec3::ZERO, Vec3::new(0.0, 0.0, -3.0), 2);
        assert_approx_eq!(p.velocity.length(), 12.0, 1e-5);
        assert_approx_eq!(p.radius, 0.1);
        assert_eq!(p.owner, 2);
    }

    #[test]
    fn test_spawn_refuses_when_full() {
        let mut projectiles = Projectiles::new();
        for i in 0..MAX_PROJECTILES {
            assert_eq!(projectiles.spawn(grenade_at(Vec3::ZERO, Vec3::ZERO)), Some(i));
        }
        assert!(projectiles.is_full());
        assert_eq!(projectiles.spawn(grenade_at(Vec3::ZERO, Vec3::ZERO)), None);
        assert_eq!(projectiles.len(), MAX_PROJECTILES);
    }

    #[test]
    fn test_remove_swaps_last_in() {
        let mut projectiles = Projectiles::new();
        for owner in 0..3 {
            projectiles.spawn(Projectile::launch(ProjectileKind::Grenade, Vec3::ZERO, Vec3::X, owner));
        }

        let removed = projectiles.remove(0).unwrap();
        assert_eq!(removed.owner, 0);
        assert_eq!(projectiles.len(), 2);
        assert_eq!(projectiles.iter().next().unwrap().owner, 2);
        assert!(projectiles.remove(5).is_none());
    }

    #[test]
    fn test_grenade_becomes_one_explosion_on_floor() {
        let mesh = Mesh::floor(10.0);
        let mut projectiles = Projectiles::new();
        projectiles.spawn(grenade_at(Vec3::new(2.0, 0.15, -3.0), Vec3::new(0.0, -5.0, 0.0)));

        projectiles.update(&mesh, DT);

        assert_eq!(projectiles.len(), 1);
        let p = projectiles.iter().next().unwrap();
        assert_eq!(p.kind, ProjectileKind::Explosion);
        assert_approx_eq!(p.radius, 2.0);
        assert_eq!(p.velocity, Vec3::ZERO);
        assert!(p.position.y > 0.0);
        assert_approx_eq!(p.position.x, 2.0, 1e-5);
    }

    #[test]
    fn test_grenade_bouncing_off_wall_keeps_flying() {
        // Plane x = 1 facing -x.
        let mut part = crate::mesh::MeshPart::default();
        let corners = [
            Vec3::new(1.0, -5.0, -5.0),
            Vec3::new(1.0, 5.0, -5.0),
            Vec3::new(1.0, 5.0, 5.0),
            Vec3::new(1.0, -5.0, 5.0),
        ];
        for i in [0, 1, 2, 0, 2, 3] {
            part.vertices.extend_from_slice(&corners[i].to_array());
            part.normals.extend_from_slice(&Vec3::NEG_X.to_array());
        }
        let mesh = Mesh::from_parts(&[part]);

        let mut projectiles = Projectiles::new();
        projectiles.spawn(grenade_at(Vec3::new(0.85, 0.0, 0.3), Vec3::new(6.0, 0.0, 0.0)));
        projectiles.update(&mesh, DT);

        let p = projectiles.iter().next().unwrap();
        assert_eq!(p.kind, ProjectileKind::Grenade);
        assert!(p.velocity.x < 0.0);
    }

    #[test]
    fn test_jump_ball_explodes_after_fuse() {
        let mesh = Mesh::default();
        let mut projectiles = Projectiles::new();
        projectiles.spawn(Projectile::launch(ProjectileKind::JumpBall, Vec3::new(0.0, 10.0, 0.0), Vec3::X, 1));

        for _ in 0..170 {
            projectiles.update(&mesh, DT);
        }
        assert_eq!(projectiles.iter().next().unwrap().kind, ProjectileKind::JumpBall);

        for _ in 0..20 {
            projectiles.update(&mesh, DT);
        }
        let p = projectiles.iter().next().unwrap();
        assert_eq!(p.kind, ProjectileKind::Explosion);
        assert_approx_eq!(p.radius, 5.0);
        assert_eq!(p.owner, 1);
    }

    #[test]
    fn test_explosion_expires() {
        let mesh = Mesh::default();
        let mut projectiles = Projectiles::new();
        projectiles.spawn(Projectile::launch(ProjectileKind::Explosion, Vec3::ZERO, Vec3::ZERO, 0));

        for _ in 0..30 {
            projectiles.update(&mesh, DT);
        }
        assert_eq!(projectiles.len(), 1);

        for _ in 0..31 {
            projectiles.update(&mesh, DT);
        }
        assert!(projectiles.is_empty());
    }

    #[test]
    fn test_kill_plane_removes() {
        let mesh = Mesh::default();
        let mut projectiles = Projectiles::new();
        projectiles.spawn(grenade_at(Vec3::new(0.0, KILL_PLANE + 0.01, 0.0), Vec3::new(0.0, -10.0, 0.0)));
        projectiles.spawn(grenade_at(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO));

        projectiles.update(&mesh, DT);

        assert_eq!(projectiles.len(), 1);
        assert!(projectiles.iter().all(|p| p.position.y > KILL_PLANE));
    }

    #[test]
    fn test_snapshot_mirrors_state() {
        let mut projectiles = Projectiles::new();
        projectiles.spawn(Projectile::launch(ProjectileKind::Explosion, Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, 0));
        let snapshot = projectiles.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(snapshot[0].kind, ProjectileKind::Explosion);
    }
}
