//! Performance benchmarks for the collision and simulation hot paths
//!
//! Ceilings are loose enough for unoptimised test builds; the printed
//! per-iteration timings are the interesting output.

use glam::{Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use server::config::ServerConfig;
use server::game::ServerGame;
use shared::protocol::{decode, encode, StatePacket};
use shared::{
    apply_gravity, resolve_motion, step_player, Mesh, MotionQuery, MoveIntent, Packet, Player,
    Projectile, ProjectileKind, Projectiles, MAX_PLAYERS, MAX_PROJECTILES, PLAYER_SIZE,
};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

const DT: f32 = 1.0 / 60.0;

fn report(name: &str, iterations: u32, duration: Duration) {
    println!(
        "{}: {} iterations in {:?} ({:.2} μs/iter)",
        name,
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );
}

/// Benchmarks the player AABB resolver against the arena, pressed into a pillar
#[test]
fn benchmark_resolve_motion() {
    let mesh = Mesh::arena();
    let query = MotionQuery::player(PLAYER_SIZE.x);
    let current = Vec3::new(-8.0, 0.75, -6.9);
    let velocity = Vec3::new(1.0, 0.0, -4.0);
    let desired = current + velocity * DT;

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let _ = resolve_motion(&mesh, current, desired, &query, velocity, DT);
    }

    let duration = start.elapsed();
    report("Resolve motion", iterations, duration);

    // Should complete in under 5 seconds
    assert!(duration.as_secs() < 5);
}

/// Benchmarks the grounding ray used every tick for every player
#[test]
fn benchmark_apply_gravity() {
    let mesh = Mesh::arena();
    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        let position = Vec3::new((i % 30) as f32 - 15.0, 0.76, 2.0);
        let _ = apply_gravity(&mesh, position, PLAYER_SIZE.y, Vec3::new(0.0, -1.0, 0.0), DT);
    }

    let duration = start.elapsed();
    report("Apply gravity", iterations, duration);

    assert!(duration.as_secs() < 5);
}

/// Benchmarks nearest-hit raycasts in random directions
#[test]
fn benchmark_mesh_raycast() {
    let mesh = Mesh::arena();
    let mut rng = StdRng::seed_from_u64(42);
    let dirs: Vec<Vec3> = (0..1_000)
        .map(|_| {
            Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
                .normalize_or_zero()
        })
        .collect();

    let iterations = 10_000;
    let origin = Vec3::new(0.0, 1.4, 0.0);
    let start = Instant::now();

    let mut hits = 0;
    for i in 0..iterations {
        if mesh.raycast(origin, dirs[i as usize % dirs.len()]).is_some() {
            hits += 1;
        }
    }

    let duration = start.elapsed();
    report("Mesh raycast", iterations, duration);

    // Everything aimed below the horizon lands on the floor.
    assert!(hits > iterations / 4);
    assert!(duration.as_secs() < 5);
}

/// Benchmarks a second of simulation with the projectile table full
#[test]
fn benchmark_full_projectile_table() {
    let mesh = Mesh::arena();
    let mut rng = StdRng::seed_from_u64(7);
    let mut projectiles = Projectiles::new();
    for i in 0..MAX_PROJECTILES {
        let kind = if i % 2 == 0 {
            ProjectileKind::Grenade
        } else {
            ProjectileKind::JumpBall
        };
        let dir = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(0.0..1.0), rng.gen_range(-1.0..1.0));
        projectiles.spawn(Projectile::launch(kind, Vec3::new(0.0, 2.0, 0.0), dir.normalize_or_zero(), 0));
    }
    assert!(projectiles.is_full());

    let iterations = 60;
    let start = Instant::now();

    for _ in 0..iterations {
        projectiles.update(&mesh, DT);
    }

    let duration = start.elapsed();
    report("Projectile update (full table)", iterations, duration);

    assert!(duration.as_secs() < 10);
}

/// Benchmarks player movement for a full server's worth of players
#[test]
fn benchmark_player_movement() {
    let mesh = Mesh::arena();
    let mut players = [Player::spawn(); MAX_PLAYERS];
    let intent = MoveIntent {
        forward: true,
        right: true,
        ..MoveIntent::default()
    };

    let iterations = 600;
    let start = Instant::now();

    for tick in 0..iterations {
        for (i, player) in players.iter_mut().enumerate() {
            player.angle = Vec2::new(i as f32 + tick as f32 * 0.01, 0.0);
            step_player(&mesh, player, &intent, DT);
        }
    }

    let duration = start.elapsed();
    report("Player movement ticks", iterations, duration);

    assert!(duration.as_secs() < 10);
}

/// Benchmarks encoding and decoding the per-tick state packet
#[test]
fn benchmark_state_packet_codec() {
    let packet = Packet::State(StatePacket {
        positions: [Vec3::new(1.0, 0.75, -3.0); MAX_PLAYERS],
        healths: [7.5; MAX_PLAYERS],
        ..StatePacket::default()
    });

    let iterations = 100_000;
    let start = Instant::now();

    for _ in 0..iterations {
        let bytes = encode(&packet).unwrap();
        let _ = decode(&bytes).unwrap();
    }

    let duration = start.elapsed();
    report("State packet codec", iterations, duration);

    assert!(duration.as_secs() < 5);
}

/// Benchmarks full server ticks with every slot taken and shots flying
#[test]
fn benchmark_server_tick() {
    let config = ServerConfig::with_bind_addr("127.0.0.1:0".parse().unwrap());
    let mut game = ServerGame::with_rng(Mesh::arena(), &config, StdRng::seed_from_u64(9));
    for port in 0..MAX_PLAYERS as u16 {
        let addr = SocketAddr::from(([127, 0, 0, 1], 5000 + port));
        game.handle_packet(Packet::join(), addr);
    }

    // Nobody answers pings, so stay short of the eviction threshold.
    let iterations = 150;
    let start = Instant::now();

    for tick in 0..iterations {
        if tick % 10 == 0 {
            for id in 0..MAX_PLAYERS as u32 {
                let _ = game.shoot(id);
            }
        }
        let outbound = game.tick(Duration::from_secs_f32(DT));
        assert!(!outbound.is_empty());
    }

    let duration = start.elapsed();
    report("Server tick", iterations, duration);

    assert!(duration.as_secs() < 10);
}
