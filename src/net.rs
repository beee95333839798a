/*!
The switch ports

Every port of the switch is a UDP tunnel: Ethernet frames arriving as
datagrams on the port's bound socket are received on the port, and frames
sent out the port are sent as datagrams to a fixed peer address.
*/

use lock;
use packet::{MacAddr, Packet};

use std::error;
use std::fmt;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Maximum size of a received frame including an 802.1Q tag
const MAX_FRAME_LEN: usize = 1522;
/// Receive buffer size, large enough for any UDP datagram
const RECV_BUF_LEN: usize = 65535;
/// How often the reader threads look at the running flag
const READ_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum Error {
    /// Nothing arrived within the receive timeout
    NoPackets,
    /// The network was shut down
    Shutdown,
    UnknownPort(u16),
    Io(io::Error),
}

impl error::Error for Error {
    fn description(&self) -> &str {
        match *self {
            Error::NoPackets => "no packets",
            Error::Shutdown => "network shut down",
            Error::UnknownPort(_) => "unknown port",
            Error::Io(_) => "I/O error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::NoPackets => write!(f, "No packets received"),
            Error::Shutdown => write!(f, "The network is shut down"),
            Error::UnknownPort(p) => write!(f, "There is no port {}", p),
            Error::Io(ref e) => write!(f, "{}", e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = result::Result<T, Error>;

/// What the switch announces about a port
#[derive(Debug, Clone, PartialEq)]
pub struct PortInfo {
    pub port_no: u16,
    pub name: String,
    pub hw_addr: MacAddr,
}

/// The network interfaces a switch forwards between.
pub trait Network: Send + Sync {
    fn ports(&self) -> Vec<PortInfo>;

    /// Waits at most `timeout` for a packet and returns it with its ingress port.
    /// Returns `Error::NoPackets` on timeout and `Error::Shutdown` once the
    /// network is shut down.
    fn recv_packet(&self, timeout: Duration) -> Result<(u16, Packet)>;

    fn send_packet(&self, port_no: u16, packet: &Packet) -> Result<()>;

    /// Stops receiving. Pending and later `recv_packet` calls return `Error::Shutdown`.
    fn shutdown(&self);
}

/// The configuration of a UDP tunnel port
#[derive(Debug, Clone, PartialEq)]
pub struct TunnelPort {
    pub port_no: u16,
    pub name: String,
    pub bind: SocketAddr,
    pub peer: SocketAddr,
}

impl TunnelPort {
    /// A locally administered hardware address derived from the port number
    fn hw_addr(&self) -> MacAddr {
        [0x02, 0, 0, 0, (self.port_no >> 8) as u8, self.port_no as u8]
    }
}

struct OpenPort {
    info: PortInfo,
    socket: UdpSocket,
    peer: SocketAddr,
}

/// A `Network` of UDP tunnel ports
pub struct UdpNetwork {
    ports: Vec<OpenPort>,
    rx: Mutex<Receiver<(u16, Packet)>>,
    running: Arc<AtomicBool>,
    readers: Mutex<Vec<JoinHandle<()>>>,
}

fn read_port(
    port_no: u16,
    socket: UdpSocket,
    peer: SocketAddr,
    running: Arc<AtomicBool>,
    tx: Sender<(u16, Packet)>,
) {
    let mut buf = vec![0; RECV_BUF_LEN];
    while running.load(Ordering::SeqCst) {
        match socket.recv_from(&mut buf) {
            Ok((len, from)) => {
                if from != peer {
                    debug!("Port {}: ignoring datagram from {}", port_no, from);
                    continue;
                }
                if len > MAX_FRAME_LEN {
                    debug!("Port {}: dropping oversized frame of {} bytes", port_no, len);
                    continue;
                }
                let packet = Packet::from_bytes(buf[..len].to_vec());
                trace!("Port {}: received {}", port_no, packet);
                if tx.send((port_no, packet)).is_err() {
                    return;
                }
            }
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => {
                // e.g. ICMP port unreachable from a peer that is not up yet
                debug!("Port {}: {}", port_no, e);
            }
        }
    }
}

impl UdpNetwork {
    /// Binds the sockets of all ports and starts receiving on them.
    pub fn open(config: &[TunnelPort]) -> io::Result<UdpNetwork> {
        let (tx, rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let mut ports = vec![];
        let mut readers = vec![];
        for port in config {
            let socket = UdpSocket::bind(port.bind)?;
            socket.set_read_timeout(Some(READ_TIMEOUT))?;
            info!(
                "Port {} ({}) tunnels {} <-> {}",
                port.port_no,
                port.name,
                socket.local_addr()?,
                port.peer
            );
            let reader_socket = socket.try_clone()?;
            let (port_no, peer) = (port.port_no, port.peer);
            let (running, tx) = (running.clone(), tx.clone());
            readers.push(thread::spawn(move || {
                read_port(port_no, reader_socket, peer, running, tx)
            }));
            ports.push(OpenPort {
                info: PortInfo {
                    port_no: port.port_no,
                    name: port.name.clone(),
                    hw_addr: port.hw_addr(),
                },
                socket: socket,
                peer: port.peer,
            });
        }
        Ok(UdpNetwork {
            ports: ports,
            rx: Mutex::new(rx),
            running: running,
            readers: Mutex::new(readers),
        })
    }
}

impl Network for UdpNetwork {
    fn ports(&self) -> Vec<PortInfo> {
        self.ports.iter().map(|p| p.info.clone()).collect()
    }

    fn recv_packet(&self, timeout: Duration) -> Result<(u16, Packet)> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(Error::Shutdown);
        }
        match lock(&self.rx).recv_timeout(timeout) {
            Ok(received) => Ok(received),
            Err(RecvTimeoutError::Timeout) => {
                if self.running.load(Ordering::SeqCst) {
                    Err(Error::NoPackets)
                } else {
                    Err(Error::Shutdown)
                }
            }
            Err(RecvTimeoutError::Disconnected) => Err(Error::Shutdown),
        }
    }

    fn send_packet(&self, port_no: u16, packet: &Packet) -> Result<()> {
        let port = self
            .ports
            .iter()
            .find(|p| p.info.port_no == port_no)
            .ok_or(Error::UnknownPort(port_no))?;
        trace!("Port {}: sending {}", port_no, packet);
        port.socket.send_to(packet.as_bytes(), port.peer)?;
        Ok(())
    }

    fn shutdown(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Shutting down the network");
            for reader in lock(&self.readers).drain(..) {
                if reader.join().is_err() {
                    error!("A port reader thread panicked");
                }
            }
        }
    }
}
