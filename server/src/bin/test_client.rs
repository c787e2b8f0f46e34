//! Headless bot that plays the client role against a running server: it
//! joins, wanders around the arena with the shared movement code, answers
//! pings and fires its weapon now and then.

use clap::Parser;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::physics::{step_player, MoveIntent};
use shared::protocol::{decode, encode, InputPacket, MAX_DATAGRAM_LEN};
use shared::{Mesh, Packet, Player, SERVER_PORT, TICKS_PER_SEC};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = SocketAddr::from(([127, 0, 0, 1], SERVER_PORT)))]
    server: SocketAddr,

    /// How long to play before exiting
    #[arg(long, default_value_t = 30)]
    seconds: u64,

    /// Fire every this many ticks, 0 to never fire
    #[arg(long, default_value_t = 60)]
    shoot_every: u64,
}

struct Bot {
    socket: UdpSocket,
    server: SocketAddr,
    id: Option<u32>,
    player: Player,
    intent: MoveIntent,
    rng: StdRng,
    pongs: u32,
}

impl Bot {
    async fn send(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        self.socket.send_to(&encode(packet)?, self.server).await?;
        Ok(())
    }

    async fn handle(&mut self, packet: Packet) -> Result<(), Box<dyn std::error::Error>> {
        match packet {
            Packet::PlayerList(list) => {
                if self.id != Some(list.assigned_id) {
                    info!("Assigned player id {}", list.assigned_id);
                }
                self.id = Some(list.assigned_id);
                info!("Roster: {:?}", list.active());
            }
            Packet::Ping(ping) => {
                self.pongs += 1;
                debug!("Ping {} (last rtt {}ms)", ping.correlation_id, ping.last_rtt_ms);
                self.send(&Packet::Ping(ping)).await?;
            }
            Packet::State(state) => {
                if let Some(id) = self.id {
                    self.player.health = state.healths[id as usize];
                }
            }
            Packet::Projectiles(projectiles) => {
                debug!("{} projectiles in flight", projectiles.projectiles.len());
            }
            other => warn!("Unexpected {:?} packet from server", other.kind()),
        }
        Ok(())
    }

    /// Picks a new heading and set of keys at random.
    fn wander(&mut self) {
        self.player.angle.x = self.rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI);
        self.intent = MoveIntent {
            forward: self.rng.gen_bool(0.8),
            left: self.rng.gen_bool(0.2),
            right: self.rng.gen_bool(0.2),
            jump: self.rng.gen_bool(0.1),
            ..MoveIntent::default()
        };
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Bot socket bound to {}", socket.local_addr()?);

    let mesh = Mesh::arena();
    let mut bot = Bot {
        socket,
        server: args.server,
        id: None,
        player: Player::spawn(),
        intent: MoveIntent::default(),
        rng: StdRng::from_entropy(),
        pongs: 0,
    };

    info!("Joining {}", args.server);
    bot.send(&Packet::join()).await?;

    let dt = 1.0 / TICKS_PER_SEC as f32;
    let mut ticker = interval(Duration::from_secs_f32(dt));
    let mut buf = vec![0u8; MAX_DATAGRAM_LEN + 1];
    let started = Instant::now();
    let mut tick: u64 = 0;

    while started.elapsed() < Duration::from_secs(args.seconds) {
        tokio::select! {
            biased;

            received = bot.socket.recv_from(&mut buf) => {
                let (len, from) = match received {
                    Ok(received) => received,
                    Err(e) => {
                        // The server not being up yet shows up here as a refused connection.
                        warn!("Error receiving packet: {}", e);
                        continue;
                    }
                };
                if from != bot.server {
                    continue;
                }
                match decode(&buf[..len]) {
                    Ok(packet) => bot.handle(packet).await?,
                    Err(e) => warn!("Dropping datagram from server: {}", e),
                }
            }

            _ = ticker.tick() => {
                tick += 1;
                let Some(id) = bot.id else {
                    if tick % TICKS_PER_SEC as u64 == 0 {
                        info!("No roster yet, joining again");
                        bot.send(&Packet::join()).await?;
                    }
                    continue;
                };

                if tick % TICKS_PER_SEC as u64 == 0 {
                    bot.wander();
                    info!(
                        "Player {} at {:.2?}, health {:.1}",
                        id, bot.player.position, bot.player.health
                    );
                }
                step_player(&mesh, &mut bot.player, &bot.intent, dt);

                let shoot = args.shoot_every > 0 && tick % args.shoot_every == 0;
                bot.send(&Packet::Input(InputPacket {
                    player_id: id,
                    position: bot.player.position,
                    angle: bot.player.angle,
                    size: bot.player.size,
                    shoot,
                    weapon: bot.player.weapon,
                }))
                .await?;
            }
        }
    }

    info!("Done after {}s, answered {} pings", args.seconds, bot.pongs);
    Ok(())
}
