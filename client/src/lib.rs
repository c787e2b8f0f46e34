//! # Arena Client Library
//!
//! A thin client for the arena shooter. It moves its own player locally with
//! the same movement code the server's bots use, sends the result to the
//! server every frame, and draws whatever the server last reported for
//! everyone else.
//!
//! ## Authority
//!
//! The local player's position is decided here and sent as-is; the server
//! accepts it without checking. Remote players, health and projectiles come
//! only from the server. There is no prediction, reconciliation or
//! interpolation: remote players jump to each new state packet.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! [`game::ClientWorld`] folds server packets into a local copy of the match
//! and steps the local player.
//!
//! ### Input Module (`input`)
//! A binding table from keys and mouse buttons to actions, sampled once per
//! frame into a [`input::FrameInput`].
//!
//! ### Network Module (`network`)
//! [`network::Session`] wraps a non-blocking UDP socket that is drained once
//! per frame.
//!
//! ### Rendering Module (`rendering`)
//! Map wireframe, players, projectiles and the HUD, drawn with macroquad.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::game::ClientWorld;
//! use client::network::Session;
//! use shared::Mesh;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mesh = Mesh::arena();
//! let mut session = Session::new("127.0.0.1:20586".parse()?)?;
//! let mut world = ClientWorld::new();
//! session.join()?;
//!
//! loop {
//!     for packet in session.drain() {
//!         if let Some(pong) = world.apply_packet(packet) {
//!             session.pong(&pong)?;
//!         }
//!     }
//!     world.step_local(&mesh, &Default::default(), glam::Vec2::ZERO, 1.0 / 60.0);
//!     if let Some(input) = world.input_packet(false) {
//!         session.send_input(&input)?;
//!     }
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
