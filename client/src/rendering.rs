use crate::game::ClientWorld;
use macroquad::prelude::*;
use shared::physics::{aim_direction, eye_position};
use shared::{Mesh, ProjectileKind, WeaponKind, MAX_HEALTH, WORLD_UP};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub local_id: Option<u32>,
    pub weapon: Option<WeaponKind>,
    pub health: Option<f32>,
    pub rtt_ms: u32,
    pub player_count: usize,
}

pub struct Renderer {
    edges: Vec<(Vec3, Vec3)>,
}

impl Renderer {
    pub fn new(mesh: &Mesh) -> Self {
        Renderer {
            edges: wire_edges(mesh),
        }
    }

    pub fn render(&self, world: &ClientWorld) {
        clear_background(Color::from_rgba(26, 26, 26, 255));

        let local = world.local_player();
        let camera = match local {
            Some(player) => {
                let eye = eye_position(player.position, player.size);
                Camera3D {
                    position: eye,
                    target: eye + aim_direction(player.angle),
                    up: WORLD_UP,
                    ..Default::default()
                }
            }
            // Overview until the server assigns a slot.
            None => Camera3D {
                position: vec3(0.0, 30.0, 30.0),
                target: Vec3::ZERO,
                up: WORLD_UP,
                ..Default::default()
            },
        };
        set_camera(&camera);

        for (a, b) in &self.edges {
            draw_line_3d(*a, *b, Color::from_rgba(120, 120, 120, 255));
        }

        for (id, player) in world.players() {
            if Some(id) == world.local_id() {
                continue;
            }
            let size = player.size * 2.0;
            draw_cube(player.position, size, None, player_color(id));
            draw_cube_wires(player.position, size, WHITE);
        }

        for projectile in world.projectiles() {
            let color = match projectile.kind {
                ProjectileKind::Grenade => ORANGE,
                ProjectileKind::JumpBall => SKYBLUE,
                ProjectileKind::Explosion => Color::new(1.0, 0.3, 0.1, 0.4),
            };
            draw_sphere(projectile.position, projectile.radius, None, color);
        }

        let view = camera.matrix();
        set_default_camera();

        for (id, player) in world.players() {
            if Some(id) == world.local_id() {
                continue;
            }
            let head = player.position + vec3(0.0, player.size.y + 0.2, 0.0);
            if let Some(screen) = project(view, head) {
                draw_health_bar(screen.x - 20.0, screen.y, 40.0, player.health);
            }
        }

        self.draw_crosshair();
        self.draw_ui(UiConfig {
            local_id: world.local_id(),
            weapon: local.map(|p| p.weapon),
            health: local.map(|p| p.health),
            rtt_ms: world.last_rtt_ms(),
            player_count: world.players().count(),
        });
    }

    fn draw_crosshair(&self) {
        let (cx, cy) = (screen_width() / 2.0, screen_height() / 2.0);
        draw_line(cx - 8.0, cy, cx + 8.0, cy, 2.0, WHITE);
        draw_line(cx, cy - 8.0, cx, cy + 8.0, 2.0, WHITE);
    }

    fn draw_ui(&self, config: UiConfig) {
        let connection_color = if config.local_id.is_some() { GREEN } else { RED };
        draw_rectangle(10.0, 10.0, 8.0, 8.0, connection_color);
        let status = match config.local_id {
            Some(id) => format!("player {}", id),
            None => "joining...".to_string(),
        };
        draw_text(&status, 24.0, 18.0, 16.0, WHITE);

        draw_text(&format!("{}ms", config.rtt_ms), 10.0, 36.0, 16.0, WHITE);
        draw_text(&format!("{} players", config.player_count), 10.0, 54.0, 16.0, WHITE);

        if let Some(weapon) = config.weapon {
            draw_text(&format!("{:?}", weapon), 10.0, screen_height() - 34.0, 20.0, WHITE);
        }
        if let Some(health) = config.health {
            draw_health_bar(10.0, screen_height() - 24.0, 160.0, health);
        }
    }
}

/// Unique edges of every triangle in the mesh.
fn wire_edges(mesh: &Mesh) -> Vec<(Vec3, Vec3)> {
    let key = |v: Vec3| [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()];
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for tri in mesh.triangles() {
        let [a, b, c] = tri.vertices();
        for (p, q) in [(a, b), (b, c), (c, a)] {
            let (kp, kq) = (key(p), key(q));
            let edge = if kp <= kq { (kp, kq) } else { (kq, kp) };
            if seen.insert(edge) {
                edges.push((p, q));
            }
        }
    }

    edges
}

fn project(view: Mat4, point: Vec3) -> Option<Vec2> {
    let clip = view * point.extend(1.0);
    if clip.w <= 0.0 {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some(vec2(
        (ndc.x + 1.0) / 2.0 * screen_width(),
        (1.0 - ndc.y) / 2.0 * screen_height(),
    ))
}

fn health_fraction(health: f32) -> f32 {
    (health / MAX_HEALTH).clamp(0.0, 1.0)
}

fn draw_health_bar(x: f32, y: f32, width: f32, health: f32) {
    let fraction = health_fraction(health);
    let color = if fraction > 0.5 {
        GREEN
    } else if fraction > 0.2 {
        YELLOW
    } else {
        RED
    };
    draw_rectangle(x, y, width, 6.0, Color::from_rgba(51, 51, 51, 255));
    draw_rectangle(x, y, width * fraction, 6.0, color);
}

fn player_color(id: u32) -> Color {
    match id % 4 {
        0 => RED,
        1 => BLUE,
        2 => YELLOW,
        _ => MAGENTA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_wire_edges_share_diagonal() {
        // Two triangles of one quad: five distinct edges.
        let edges = wire_edges(&Mesh::floor(5.0));
        assert_eq!(edges.len(), 5);
    }

    #[test]
    fn test_health_fraction_clamped() {
        assert_approx_eq!(health_fraction(MAX_HEALTH), 1.0);
        assert_approx_eq!(health_fraction(MAX_HEALTH / 2.0), 0.5);
        assert_approx_eq!(health_fraction(-3.0), 0.0);
        assert_approx_eq!(health_fraction(MAX_HEALTH * 2.0), 1.0);
    }
}
