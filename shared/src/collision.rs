//! Narrow-phase collision response of a moving volume against the level mesh.
//!
//! [`resolve_motion`] runs in two passes. The broad pass tests the volume at
//! the desired position against every triangle and records a
//! [`ReboundCandidate`] for each overlap. Candidates are then ordered from
//! least to most penetrating and applied one by one against the running
//! corrected position, so earlier corrections can make later candidates moot.

use crate::geometry::{box_intersects_triangle, sphere_intersects_triangle, Triangle};
use crate::mesh::Mesh;
use crate::{FLOOR_NORMAL_THRESHOLD, MIN_MOTION, REBOUND_CANDIDATE_CAPACITY, WORLD_UP};
use glam::Vec3;
use log::debug;

/// Bounding volume swept by a motion query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volume {
    Sphere,
    /// Cube with half extent equal to the query radius.
    Aabb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Cancel motion into the surface, keep motion along it.
    Slide,
    /// Reflect the velocity about the surface normal.
    Bounce,
}

/// Which triangles a query considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceFilter {
    All,
    /// Skip floors and ceilings; those are left to the grounding ray.
    WallsOnly,
}

impl SurfaceFilter {
    fn accepts(self, normal: Vec3) -> bool {
        match self {
            SurfaceFilter::All => true,
            SurfaceFilter::WallsOnly => normal.dot(WORLD_UP).abs() < FLOOR_NORMAL_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionQuery {
    pub volume: Volume,
    pub radius: f32,
    pub response: Response,
    pub surfaces: SurfaceFilter,
}

impl MotionQuery {
    pub fn player(half_width: f32) -> Self {
        Self {
            volume: Volume::Aabb,
            radius: half_width,
            response: Response::Slide,
            surfaces: SurfaceFilter::WallsOnly,
        }
    }

    pub fn projectile(radius: f32) -> Self {
        Self {
            volume: Volume::Sphere,
            radius,
            response: Response::Bounce,
            surfaces: SurfaceFilter::All,
        }
    }

    fn overlaps(&self, center: Vec3, tri: &Triangle) -> bool {
        match self.volume {
            Volume::Sphere => sphere_intersects_triangle(center, self.radius, tri.a, tri.b, tri.c),
            Volume::Aabb => {
                let half = Vec3::splat(self.radius);
                box_intersects_triangle(center - half, center + half, tri.a, tri.b, tri.c)
            }
        }
    }
}

/// A triangle hit during the broad pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReboundCandidate {
    pub vertices: [Vec3; 3],
    pub normal: Vec3,
    pub penetration: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionResult {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Normal of the last surface bounced off, if any.
    pub hit_normal: Option<Vec3>,
}

/// Gathers every triangle the volume overlaps at `desired`, least penetrating
/// first. Equal penetrations keep mesh order.
pub fn broad_pass(mesh: &Mesh, desired: Vec3, query: &MotionQuery) -> Vec<ReboundCandidate> {
    let mut candidates = Vec::with_capacity(REBOUND_CANDIDATE_CAPACITY);

    for tri in mesh.triangles() {
        if !query.surfaces.accepts(tri.normal) || !query.overlaps(desired, tri) {
            continue;
        }

        if candidates.len() == candidates.capacity() {
            debug!(
                "Rebound candidate buffer full at {}, growing",
                candidates.capacity()
            );
        }

        let depth = query.radius - (desired - tri.a).dot(tri.normal);
        candidates.push(ReboundCandidate {
            vertices: tri.vertices(),
            normal: tri.normal,
            penetration: tri.normal * depth,
        });
    }

    // `sort_by` is stable, so ties stay in discovery order.
    candidates.sort_by(|a, b| {
        a.penetration
            .length_squared()
            .total_cmp(&b.penetration.length_squared())
    });
    candidates
}

/// Moves a volume from `current` towards `desired`, correcting the motion
/// against every triangle it would overlap.
///
/// `velocity` is only read by [`Response::Bounce`], which returns it reflected
/// and advances the position by `velocity * dt` instead of towards `desired`.
pub fn resolve_motion(
    mesh: &Mesh,
    current: Vec3,
    desired: Vec3,
    query: &MotionQuery,
    velocity: Vec3,
    dt: f32,
) -> MotionResult {
    let mut corrected = desired;
    let mut velocity = velocity;
    let mut hit_normal = None;

    for candidate in broad_pass(mesh, desired, query) {
        let [a, b, c] = candidate.vertices;
        let tri = Triangle::new(a, b, c, candidate.normal);
        if !query.overlaps(corrected, &tri) {
            continue;
        }

        let n = candidate.normal;
        match query.response {
            Response::Slide => {
                let displacement = corrected - current;
                let tangent = n.cross(WORLD_UP).normalize_or_zero();
                corrected = current
                    + tangent * displacement.dot(tangent)
                    + n * displacement.dot(n).max(0.0);
            }
            Response::Bounce => {
                // Already moving away from this surface.
                if velocity.dot(n) >= 0.0 {
                    continue;
                }
                velocity -= 2.0 * velocity.dot(n) * n;
                hit_normal = Some(n);
                corrected = current + velocity * dt;
            }
        }
    }

    if (corrected - current).length() < MIN_MOTION {
        corrected = current;
    }

    MotionResult {
        position: corrected,
        velocity,
        hit_normal,
    }
}
