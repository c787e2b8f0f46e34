use log::{error, info, warn};
use shared::protocol::{decode_exact, encode, PacketHeader, HEADER_LEN, MAX_DATAGRAM_LEN};
use shared::Packet;
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, UdpSocket};

/// Non-blocking UDP session with one server, polled once per frame.
pub struct Session {
    socket: UdpSocket,
    server_addr: SocketAddr,
    buf: Vec<u8>,
}

impl Session {
    pub fn new(server_addr: SocketAddr) -> Result<Self, Box<dyn std::error::Error>> {
        let bind_addr: SocketAddr = if server_addr.is_ipv4() {
            "0.0.0.0:0".parse()?
        } else {
            "[::]:0".parse()?
        };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;
        info!("Client socket bound to {}", socket.local_addr()?);

        Ok(Session {
            socket,
            server_addr,
            buf: Vec::with_capacity(MAX_DATAGRAM_LEN + 1),
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    fn send(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        let data = encode(packet)?;
        self.socket.send_to(&data, self.server_addr)?;
        Ok(())
    }

    pub fn join(&self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Joining {}", self.server_addr);
        self.send(&Packet::join())
    }

    pub fn send_input(&self, input: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        self.send(input)
    }

    /// Echoes a ping back to the server.
    pub fn pong(&self, ping: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        self.send(ping)
    }

    /// Reads every datagram currently queued. Datagrams that fail to decode
    /// or come from anyone but the server are dropped with a warning.
    pub fn drain(&mut self) -> Vec<Packet> {
        let mut packets = Vec::new();

        loop {
            let mut header = [0u8; HEADER_LEN];
            let peeked = match self.socket.peek_from(&mut header) {
                Ok((peeked, _)) => peeked,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    // ICMP port unreachable shows up here while the server is down.
                    error!("Error receiving packet: {}", e);
                    break;
                }
            };

            let expected = PacketHeader::parse(&header[..peeked]).map(|h| h.expected_len);
            let capacity = expected.as_ref().map_or(MAX_DATAGRAM_LEN, |len| *len) + 1;
            self.buf.resize(capacity, 0);

            let (len, from) = match self.socket.recv_from(&mut self.buf) {
                Ok(received) => received,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    error!("Error receiving packet: {}", e);
                    break;
                }
            };

            if from != self.server_addr {
                warn!("Ignoring datagram from {}", from);
                continue;
            }

            match expected.and_then(|expected| decode_exact(&self.buf[..len], expected)) {
                Ok(packet) => packets.push(packet),
                Err(e) => warn!("Dropping datagram from {}: {}", from, e),
            }
        }

        packets
    }
}
