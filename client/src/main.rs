use clap::Parser;
use client::game::ClientWorld;
use client::input::InputManager;
use client::network::Session;
use client::rendering::Renderer;
use log::{error, info};
use macroquad::prelude::*;
use server::config::ServerConfig;
use server::network::Server;
use shared::{Mesh, SERVER_PORT};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

const JOIN_RETRY: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = SocketAddr::from((Ipv4Addr::LOCALHOST, SERVER_PORT)))]
    server: SocketAddr,

    /// Also run a server in this process, on the port given by --server
    #[arg(long)]
    host: bool,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: i32,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: i32,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Arena".to_owned(),
        window_width: args.width,
        window_height: args.height,
        ..Default::default()
    }
}

/// Runs a server on its own thread and runtime. The client only ever talks
/// to it over loopback UDP.
fn spawn_local_server(port: u16) {
    let config = ServerConfig::with_bind_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("Failed to start local server runtime: {}", e);
                return;
            }
        };
        runtime.block_on(async move {
            match Server::new(config).await {
                Ok(mut server) => {
                    if let Err(e) = server.run().await {
                        error!("Local server stopped: {}", e);
                    }
                }
                Err(e) => error!("Failed to start local server: {}", e),
            }
        });
    });
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let server_addr = if args.host {
        info!("Hosting on port {}", args.server.port());
        spawn_local_server(args.server.port());
        SocketAddr::from((Ipv4Addr::LOCALHOST, args.server.port()))
    } else {
        args.server
    };

    let mesh = Mesh::arena();
    let mut session = Session::new(server_addr)?;
    let mut world = ClientWorld::new();
    let mut input = InputManager::new();
    let renderer = Renderer::new(&mesh);

    session.join()?;
    let mut last_join = Instant::now();

    set_cursor_grab(true);
    show_mouse(false);

    loop {
        for packet in session.drain() {
            if let Some(reply) = world.apply_packet(packet) {
                if let Err(e) = session.pong(&reply) {
                    error!("Error sending pong: {}", e);
                }
            }
        }

        if world.local_id().is_none() && last_join.elapsed() >= JOIN_RETRY {
            if let Err(e) = session.join() {
                error!("Error sending join: {}", e);
            }
            last_join = Instant::now();
        }

        let frame = input.update();
        if frame.switch_weapon {
            world.switch_weapon();
        }

        // Long frames (window drags, breakpoints) would tunnel through walls.
        let dt = get_frame_time().min(0.1);
        world.step_local(&mesh, &frame.intent, frame.look_delta, dt);

        if let Some(packet) = world.input_packet(frame.shoot) {
            if let Err(e) = session.send_input(&packet) {
                error!("Error sending input: {}", e);
            }
        }

        renderer.render(&world);

        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        next_frame().await;
    }

    info!("Leaving {}", session.server_addr());
    Ok(())
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    info!("Controls: WASD to move, mouse to look, Space to jump, click to shoot, Q to switch weapon");

    if let Err(e) = run(args).await {
        error!("Client error: {}", e);
    }
}
