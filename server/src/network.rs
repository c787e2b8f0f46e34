//! Server network layer: the UDP socket and the loop that interleaves
//! datagram handling with simulation ticks.

use crate::config::ServerConfig;
use crate::game::{Outbound, ServerGame};
use log::{error, info, warn};
use shared::protocol::{decode_exact, encode, PacketHeader, ProtocolError, HEADER_LEN, MAX_DATAGRAM_LEN};
use shared::{Mesh, Packet};
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::{interval, MissedTickBehavior};

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: UdpSocket,
    game: ServerGame,
    tick_duration: Duration,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_game(config.clone(), ServerGame::new(Mesh::arena(), &config)).await
    }

    pub async fn with_game(
        config: ServerConfig,
        game: ServerGame,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        info!("Server listening on {}", socket.local_addr()?);

        Ok(Server {
            socket,
            game,
            tick_duration: config.tick_duration,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn game(&self) -> &ServerGame {
        &self.game
    }

    /// Reads one datagram in two phases: peek the header to learn the
    /// datagram's announced length, then receive into a buffer one byte larger
    /// so oversized datagrams are caught rather than silently cut.
    ///
    /// The datagram is always consumed, even when its header is rejected.
    async fn read_packet(
        socket: &UdpSocket,
        buf: &mut Vec<u8>,
    ) -> io::Result<(Result<Packet, ProtocolError>, SocketAddr)> {
        let mut header = [0u8; HEADER_LEN];
        let (peeked, _) = socket.peek_from(&mut header).await?;
        let expected = PacketHeader::parse(&header[..peeked]).map(|h| h.expected_len);

        let capacity = expected.as_ref().map_or(MAX_DATAGRAM_LEN, |len| *len) + 1;
        buf.resize(capacity, 0);
        let (len, addr) = socket.recv_from(buf).await?;

        Ok((expected.and_then(|expected| decode_exact(&buf[..len], expected)), addr))
    }

    async fn send_all(&self, outbound: Vec<Outbound>) {
        for Outbound { addr, packet } in outbound {
            let data = match encode(&packet) {
                Ok(data) => data,
                Err(e) => {
                    error!("Failed to encode {:?} packet: {}", packet.kind(), e);
                    continue;
                }
            };
            if let Err(e) = self.socket.send_to(&data, addr).await {
                error!("Failed to send packet to {}: {}", addr, e);
            }
        }
    }

    /// Main server loop. Every datagram already waiting is handled before the
    /// next tick runs, and each tick advances the simulation by the wall-clock
    /// time since the previous one.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();
        let mut buf = Vec::with_capacity(MAX_DATAGRAM_LEN + 1);

        info!("Server started, tick every {:?}", self.tick_duration);

        loop {
            tokio::select! {
                biased;

                read = Self::read_packet(&self.socket, &mut buf) => match read {
                    Ok((Ok(packet), addr)) => {
                        let outbound = self.game.handle_packet(packet, addr);
                        self.send_all(outbound).await;
                    }
                    Ok((Err(e), addr)) => {
                        warn!("Dropping datagram from {}: {}", addr, e);
                    }
                    Err(e) => {
                        // Connection resets from departed peers land here too.
                        error!("Error receiving packet: {}", e);
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick);
                    last_tick = now;

                    let outbound = self.game.tick(dt);
                    self.send_all(outbound).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::{decode, PlayerListPacket};
    use std::net::{IpAddr, Ipv4Addr};

    fn loopback_config() -> ServerConfig {
        ServerConfig::with_bind_addr(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
    }

    async fn recv_packet(socket: &UdpSocket) -> Packet {
        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .expect("timed out waiting for packet")
            .unwrap();
        decode(&buf[..len]).unwrap()
    }

    async fn recv_roster(socket: &UdpSocket) -> PlayerListPacket {
        loop {
            if let Packet::PlayerList(list) = recv_packet(socket).await {
                return list;
            }
        }
    }

    #[tokio::test]
    async fn test_read_packet_two_phase() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let bytes = encode(&Packet::join()).unwrap();
        client.send_to(&bytes, server.local_addr().unwrap()).await.unwrap();

        let mut buf = Vec::new();
        let (packet, addr) = Server::read_packet(&server, &mut buf).await.unwrap();
        assert_eq!(packet.unwrap(), Packet::join());
        assert_eq!(addr, client.local_addr().unwrap());
    }

    #[tokio::test]
    async fn test_read_packet_consumes_rejected_datagram() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = server.local_addr().unwrap();

        client.send_to(&77u32.to_le_bytes(), target).await.unwrap();
        let mut padded = encode(&Packet::join()).unwrap();
        padded.extend_from_slice(&[0, 0, 0]);
        client.send_to(&padded, target).await.unwrap();
        client.send_to(&encode(&Packet::join()).unwrap(), target).await.unwrap();

        let mut buf = Vec::new();
        let (first, _) = Server::read_packet(&server, &mut buf).await.unwrap();
        assert!(matches!(first, Err(ProtocolError::UnknownTag(77))));
        let (second, _) = Server::read_packet(&server, &mut buf).await.unwrap();
        assert!(matches!(second, Err(ProtocolError::Oversized { .. })));
        let (third, _) = Server::read_packet(&server, &mut buf).await.unwrap();
        assert_eq!(third.unwrap(), Packet::join());
    }

    #[tokio::test]
    async fn test_server_join_over_udp() {
        let mut server = Server::new(loopback_config()).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.run().await;
        });

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(&encode(&Packet::join()).unwrap(), addr).await.unwrap();

        let roster = recv_roster(&client).await;
        assert_eq!(roster.active(), &[0]);
        assert_eq!(roster.assigned_id, 0);

        // State follows on the next tick.
        loop {
            if let Packet::State(state) = recv_packet(&client).await {
                assert_eq!(state.positions[0], shared::SPAWN_POINT);
                break;
            }
        }
    }
}
