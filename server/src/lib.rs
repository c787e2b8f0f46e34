//! # Arena Server Library
//!
//! The authoritative server for the arena shooter. It owns the canonical
//! player table and every in-flight projectile, accepts joins and per-player
//! input over UDP, runs the projectile simulation, and broadcasts full world
//! state to every connected client each tick.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Projectiles are simulated only here. Each tick they are advanced against
//! the level mesh with the shared collision code, and grenades and jump balls
//! turn into explosions according to their kind.
//!
//! ### Player Slots
//! Players occupy a fixed table of slots. A slot index is the player id for as
//! long as the connection lives; a rejoin from the same address keeps its id,
//! and a join with every slot taken is dropped.
//!
//! ### Liveness
//! There is no disconnect packet. Each active slot is pinged on a fixed
//! interval with a random correlation id, and a slot that leaves several
//! pings in a row unanswered is freed and the roster rebroadcast.
//!
//! ## Trust Model
//! Player positions are client-authoritative: an input packet overwrites the
//! sender's position, angle, size and weapon without validation. This keeps
//! client and server movement identical without reconciliation, at the cost
//! of letting a modified client teleport. Inputs are only accepted from the
//! address that holds the slot.
//!
//! ## Modules
//!
//! ### Config Module (`config`)
//! Bind address, tick rate and liveness settings.
//!
//! ### Slots Module (`slots`)
//! The player table and per-slot ping bookkeeping.
//!
//! ### Game Module (`game`)
//! Packet handling, shooting, and the tick that produces outbound packets.
//!
//! ### Network Module (`network`)
//! The UDP socket and the loop that drains datagrams before each tick.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod game;
pub mod network;
pub mod slots;
