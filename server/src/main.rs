use clap::Parser;
use log::info;
use server::config::{tick_duration_for, ServerConfig};
use server::network::Server;
use shared::{PING_DISCONNECT_THRESHOLD, PING_INTERVAL_MS, SERVER_PORT, TICKS_PER_SEC};
use std::net::IpAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// UDP port to listen on
    #[arg(short, long, default_value_t = SERVER_PORT)]
    port: u16,

    /// Simulation ticks per second
    #[arg(short, long, default_value_t = TICKS_PER_SEC)]
    tick_rate: u32,

    /// Milliseconds between liveness pings
    #[arg(long, default_value_t = PING_INTERVAL_MS)]
    ping_interval_ms: u64,

    /// Unanswered pings in a row before a player is dropped
    #[arg(long, default_value_t = PING_DISCONNECT_THRESHOLD)]
    disconnect_threshold: u32,
}

impl Args {
    fn config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: (self.host, self.port).into(),
            tick_duration: tick_duration_for(self.tick_rate),
            ping_interval: Duration::from_millis(self.ping_interval_ms),
            disconnect_threshold: self.disconnect_threshold.max(1),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = args.config();

    info!("Starting server on {} at {}Hz", config.bind_addr, args.tick_rate);

    let mut server = Server::new(config).await?;
    server.run().await?;

    Ok(())
}
