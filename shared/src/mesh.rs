//! Static level geometry consumed read-only by the collision code.
//!
//! A mesh is a list of parts laid out the way a model loader hands them over:
//! flat xyz vertex and normal arrays, three vertices per triangle. The part
//! arrays are flattened once into [`Triangle`]s; queries walk every triangle.

use crate::geometry::{ray_triangle, Triangle};
use glam::Vec3;
use log::warn;

/// One part of a loaded model.
#[derive(Debug, Clone, Default)]
pub struct MeshPart {
    pub vertices: Vec<f32>,
    pub normals: Vec<f32>,
}

impl MeshPart {
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 9
    }

    fn push_triangle(&mut self, corners: [Vec3; 3], normal: Vec3) {
        for corner in corners {
            self.vertices.extend_from_slice(&corner.to_array());
            self.normals.extend_from_slice(&normal.to_array());
        }
    }

    fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3) {
        self.push_triangle([corners[0], corners[1], corners[2]], normal);
        self.push_triangle([corners[0], corners[2], corners[3]], normal);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn from_parts(parts: &[MeshPart]) -> Self {
        let mut triangles = Vec::new();

        for (index, part) in parts.iter().enumerate() {
            if part.normals.len() != part.vertices.len() {
                warn!(
                    "Mesh part {} has {} vertex floats but {} normal floats, skipping",
                    index,
                    part.vertices.len(),
                    part.normals.len()
                );
                continue;
            }

            for (v, n) in part.vertices.chunks_exact(9).zip(part.normals.chunks_exact(9)) {
                let a = Vec3::new(v[0], v[1], v[2]);
                let b = Vec3::new(v[3], v[4], v[5]);
                let c = Vec3::new(v[6], v[7], v[8]);
                let normals = [
                    Vec3::new(n[0], n[1], n[2]),
                    Vec3::new(n[3], n[4], n[5]),
                    Vec3::new(n[6], n[7], n[8]),
                ];

                if let Some(triangle) = Triangle::from_vertex_normals(a, b, c, normals) {
                    triangles.push(triangle);
                }
            }
        }

        Self { triangles }
    }

    pub fn triangles(&self) -> impl Iterator<Item = &Triangle> {
        self.triangles.iter()
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Nearest hit of a ray against every triangle. `dir` must be unit length
    /// for `distance` to be in world units.
    pub fn raycast(&self, origin: Vec3, dir: Vec3) -> Option<RayHit> {
        self.triangles
            .iter()
            .filter_map(|tri| ray_triangle(origin, dir, tri).map(|t| (t, tri)))
            .min_by(|(a, _), (b, _)| a.total_cmp(b))
            .map(|(distance, tri)| RayHit {
                distance,
                point: origin + dir * distance,
                normal: tri.normal,
            })
    }

    /// Square floor at `y = 0` spanning `[-half_size, half_size]` on x and z.
    pub fn floor(half_size: f32) -> Self {
        let mut part = MeshPart::default();
        let s = half_size;
        part.push_quad(
            [
                Vec3::new(-s, 0.0, -s),
                Vec3::new(s, 0.0, -s),
                Vec3::new(s, 0.0, s),
                Vec3::new(-s, 0.0, s),
            ],
            Vec3::Y,
        );
        Self::from_parts(&[part])
    }

    /// The arena both server and clients play in: a floor, four outer walls,
    /// a handful of pillars and a ramp onto a raised platform.
    pub fn arena() -> Self {
        const HALF: f32 = 20.0;
        const WALL_HEIGHT: f32 = 4.0;

        let mut parts = vec![
            box_part(Vec3::new(0.0, -0.5, 0.0), Vec3::new(HALF, 0.5, HALF)),
            box_part(Vec3::new(0.0, WALL_HEIGHT / 2.0, -HALF), Vec3::new(HALF, WALL_HEIGHT / 2.0, 0.5)),
            box_part(Vec3::new(0.0, WALL_HEIGHT / 2.0, HALF), Vec3::new(HALF, WALL_HEIGHT / 2.0, 0.5)),
            box_part(Vec3::new(-HALF, WALL_HEIGHT / 2.0, 0.0), Vec3::new(0.5, WALL_HEIGHT / 2.0, HALF)),
            box_part(Vec3::new(HALF, WALL_HEIGHT / 2.0, 0.0), Vec3::new(0.5, WALL_HEIGHT / 2.0, HALF)),
        ];

        for pillar in [
            Vec3::new(-8.0, 1.5, -8.0),
            Vec3::new(8.0, 1.5, -8.0),
            Vec3::new(-8.0, 1.5, 8.0),
            Vec3::new(10.0, 1.5, 10.0),
        ] {
            parts.push(box_part(pillar, Vec3::new(1.0, 1.5, 1.0)));
        }

        // Raised platform reached by a ramp climbing toward -x.
        parts.push(box_part(Vec3::new(-12.0, 0.75, 0.0), Vec3::new(3.0, 0.75, 3.0)));
        let mut ramp = MeshPart::default();
        let rise = 1.5;
        let (x0, x1) = (-3.0, -9.0);
        let normal = Vec3::new(rise, x0 - x1, 0.0).normalize();
        ramp.push_quad(
            [
                Vec3::new(x0, 0.0, -2.0),
                Vec3::new(x0, 0.0, 2.0),
                Vec3::new(x1, rise, 2.0),
                Vec3::new(x1, rise, -2.0),
            ],
            normal,
        );
        parts.push(ramp);

        Self::from_parts(&parts)
    }
}

/// Six outward-facing quads of an axis-aligned box.
fn box_part(center: Vec3, half: Vec3) -> MeshPart {
    let mut part = MeshPart::default();
    let min = center - half;
    let max = center + half;

    let corner = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);

    part.push_quad(
        [corner(min.x, max.y, min.z), corner(max.x, max.y, min.z), corner(max.x, max.y, max.z), corner(min.x, max.y, max.z)],
        Vec3::Y,
    );
    part.push_quad(
        [corner(min.x, min.y, min.z), corner(min.x, min.y, max.z), corner(max.x, min.y, max.z), corner(max.x, min.y, min.z)],
        Vec3::NEG_Y,
    );
    part.push_quad(
        [corner(max.x, min.y, min.z), corner(max.x, min.y, max.z), corner(max.x, max.y, max.z), corner(max.x, max.y, min.z)],
        Vec3::X,
    );
    part.push_quad(
        [corner(min.x, min.y, min.z), corner(min.x, max.y, min.z), corner(min.x, max.y, max.z), corner(min.x, min.y, max.z)],
        Vec3::NEG_X,
    );
    part.push_quad(
        [corner(min.x, min.y, max.z), corner(min.x, max.y, max.z), corner(max.x, max.y, max.z), corner(max.x, min.y, max.z)],
        Vec3::Z,
    );
    part.push_quad(
        [corner(min.x, min.y, min.z), corner(max.x, min.y, min.z), corner(max.x, max.y, min.z), corner(min.x, max.y, min.z)],
        Vec3::NEG_Z,
    );

    part
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_floor_has_two_triangles() {
        let mesh = Mesh::floor(10.0);
        assert_eq!(mesh.len(), 2);
        assert!(mesh.triangles().all(|t| t.normal == Vec3::Y));
    }

    #[test]
    fn test_from_parts_averages_vertex_normals() {
        let part = MeshPart {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            normals: vec![0.0, 1.0, 0.0, 1.0, 1.0, 0.0, -1.0, 1.0, 0.0],
        };
        let mesh = Mesh::from_parts(&[part]);
        let tri = mesh.triangles().next().unwrap();
        assert_approx_eq!(tri.normal.x, 0.0, 1e-6);
        assert_approx_eq!(tri.normal.y, 1.0, 1e-6);
    }

    #[test]
    fn test_from_parts_skips_mismatched_part() {
        let part = MeshPart {
            vertices: vec![0.0; 9],
            normals: vec![0.0; 3],
        };
        assert!(Mesh::from_parts(&[part]).is_empty());
    }

    #[test]
    fn test_raycast_picks_nearest() {
        let mesh = Mesh::arena();
        // Straight down onto a pillar top, which is above the floor.
        let hit = mesh.raycast(Vec3::new(-8.3, 10.0, -7.9), Vec3::NEG_Y).unwrap();
        assert_approx_eq!(hit.point.y, 3.0, 1e-4);
        assert_approx_eq!(hit.normal.y, 1.0, 1e-6);

        let floor_hit = mesh.raycast(Vec3::new(0.3, 10.0, -1.1), Vec3::NEG_Y).unwrap();
        assert_approx_eq!(floor_hit.distance, 10.0, 1e-4);
    }

    #[test]
    fn test_raycast_miss() {
        let mesh = Mesh::floor(5.0);
        assert!(mesh.raycast(Vec3::new(0.0, 1.0, 0.0), Vec3::Y).is_none());
        assert!(mesh.raycast(Vec3::new(50.0, 1.0, 0.0), Vec3::NEG_Y).is_none());
    }

    #[test]
    fn test_arena_ramp_is_walkable() {
        let mesh = Mesh::arena();
        let hit = mesh.raycast(Vec3::new(-6.0, 5.0, 0.7), Vec3::NEG_Y).unwrap();
        assert!(hit.point.y > 0.0 && hit.point.y < 1.5);
        assert!(hit.normal.y >= crate::FLOOR_NORMAL_THRESHOLD);
    }
}
