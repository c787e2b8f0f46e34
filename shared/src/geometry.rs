//! Narrow-phase intersection tests between bounding volumes, rays and triangles.
//!
//! Every function here is pure. The box and sphere tests are separating-axis
//! tests: they answer overlap/no-overlap without computing a contact point.

use glam::Vec3;

/// A single level triangle with its unit surface normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub normal: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3, normal: Vec3) -> Self {
        Self { a, b, c, normal }
    }

    /// Builds a triangle whose normal is the normalized average of the three
    /// per-vertex normals, falling back to the face normal when the average
    /// cancels out. Returns `None` when no unit normal can be derived.
    pub fn from_vertex_normals(a: Vec3, b: Vec3, c: Vec3, normals: [Vec3; 3]) -> Option<Self> {
        let averaged = (normals[0] + normals[1] + normals[2]).normalize_or_zero();
        let normal = if averaged != Vec3::ZERO {
            averaged
        } else {
            (b - a).cross(c - a).normalize_or_zero()
        };

        if normal == Vec3::ZERO {
            return None;
        }

        Some(Self::new(a, b, c, normal))
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.a, self.b, self.c]
    }
}

/// Axis-aligned box described by its two corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Box centered on `center` that extends `half_extent` along every axis.
    pub fn around(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    pub fn cube(center: Vec3, radius: f32) -> Self {
        Self::around(center, Vec3::splat(radius))
    }
}

/// Separating-axis test between an axis-aligned box and a triangle
/// (Ericson, Real-Time Collision Detection, 5.2.9).
///
/// Tests the three box face normals, the triangle face normal and the nine
/// box-axis x triangle-edge cross products. Axes that collapse to zero (edges
/// parallel to a box axis, zero-area triangles) never report a gap.
pub fn box_intersects_triangle(box_min: Vec3, box_max: Vec3, a: Vec3, b: Vec3, c: Vec3) -> bool {
    let tri_min = a.min(b).min(c);
    let tri_max = a.max(b).max(c);

    if tri_min.x >= box_max.x
        || tri_max.x <= box_min.x
        || tri_min.y >= box_max.y
        || tri_max.y <= box_min.y
        || tri_min.z >= box_max.z
        || tri_max.z <= box_min.z
    {
        return false;
    }

    let center = (box_min + box_max) * 0.5;
    let half = box_max - center;

    let va = a - center;
    let vb = b - center;
    let vc = c - center;
    let edges = [b - a, c - a, c - b];

    let face_normal = edges[0].cross(edges[1]);
    if face_normal.length_squared() > f32::EPSILON {
        let s = face_normal.dot(va);
        let r = half.dot(face_normal.abs());
        if s.abs() >= r {
            return false;
        }
    }

    for box_axis in [Vec3::X, Vec3::Y, Vec3::Z] {
        for edge in edges {
            let axis = box_axis.cross(edge);
            let pa = axis.dot(va);
            let pb = axis.dot(vb);
            let pc = axis.dot(vc);
            let r = half.dot(axis.abs());

            let lo = pa.min(pb).min(pc);
            let hi = pa.max(pb).max(pc);
            if lo > r || hi < -r {
                return false;
            }
        }
    }

    true
}

/// Closed-form sphere vs triangle separation test.
///
/// Works in sphere-centered coordinates and checks the seven candidate
/// separating directions: the triangle plane, the three vertex regions and the
/// three edge regions. Nothing is normalized, so degenerate triangles simply
/// fall through to the vertex and edge checks.
pub fn sphere_intersects_triangle(center: Vec3, radius: f32, a: Vec3, b: Vec3, c: Vec3) -> bool {
    let a = a - center;
    let b = b - center;
    let c = c - center;
    let rr = radius * radius;

    let v = (b - a).cross(c - a);
    let d = a.dot(v);
    let e = v.dot(v);
    let sep_plane = d * d > rr * e;

    let aa = a.dot(a);
    let ab = a.dot(b);
    let ac = a.dot(c);
    let bb = b.dot(b);
    let bc = b.dot(c);
    let cc = c.dot(c);

    let sep_a = aa > rr && ab > aa && ac > aa;
    let sep_b = bb > rr && ab > bb && bc > bb;
    let sep_c = cc > rr && ac > cc && bc > cc;

    let ab_edge = b - a;
    let bc_edge = c - b;
    let ca_edge = a - c;

    let d1 = ab - aa;
    let d2 = bc - bb;
    let d3 = ac - cc;

    let e1 = ab_edge.dot(ab_edge);
    let e2 = bc_edge.dot(bc_edge);
    let e3 = ca_edge.dot(ca_edge);

    let q1 = a * e1 - ab_edge * d1;
    let q2 = b * e2 - bc_edge * d2;
    let q3 = c * e3 - ca_edge * d3;
    let qc = c * e1 - q1;
    let qa = a * e2 - q2;
    let qb = b * e3 - q3;

    let sep_ab = q1.dot(q1) > rr * e1 * e1 && q1.dot(qc) > 0.0;
    let sep_bc = q2.dot(q2) > rr * e2 * e2 && q2.dot(qa) > 0.0;
    let sep_ca = q3.dot(q3) > rr * e3 * e3 && q3.dot(qb) > 0.0;

    !(sep_plane || sep_a || sep_b || sep_c || sep_ab || sep_bc || sep_ca)
}

/// Moller-Trumbore ray/triangle intersection, double sided.
///
/// Returns the distance along `dir` (in units of `dir`'s length) for hits at
/// or in front of the origin.
pub fn ray_triangle(origin: Vec3, dir: Vec3, tri: &Triangle) -> Option<f32> {
    let e1 = tri.b - tri.a;
    let e2 = tri.c - tri.a;
    let p = dir.cross(e2);
    let det = e1.dot(p);

    if det.abs() < 1e-8 {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = origin - tri.a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(e1);
    let v = dir.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = e2.dot(q) * inv_det;
    (t >= 0.0).then_some(t)
}

/// Slab test of a ray against an axis-aligned box. A ray starting inside the
/// box hits at `t = 0`.
pub fn ray_aabb(origin: Vec3, dir: Vec3, aabb: &Aabb) -> Option<f32> {
    let mut t_min = 0.0f32;
    let mut t_max = f32::INFINITY;

    for axis in 0..3 {
        let o = origin[axis];
        let d = dir[axis];
        let (lo, hi) = (aabb.min[axis], aabb.max[axis]);

        if d.abs() < 1e-8 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t0 = (lo - o) * inv;
        let mut t1 = (hi - o) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }

        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }

    Some(t_min)
}
