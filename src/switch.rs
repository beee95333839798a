/*!
The switch: shared state, the datapath loop and the controller sessions

`SwitchCore` holds everything the datapath thread and the session threads
share. Each structure sits behind its own lock, which is only held for a
single operation. `Switch` owns the core and the session threads.
*/

use action::{self, Datapath, Origin};
use buffer::PacketBuffer;
use conf::SwitchConf;
use flow_table::{FlowEntry, FlowFilter, FlowTable};
use lock;
use net::{self, Network};
use openflow::error::{Error, Result};
use openflow::messages::*;
use openflow::{Session, SessionLink, READ_TIMEOUT, WRITE_TIMEOUT};
use packet::Packet;

use std::io;
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long the datapath waits for a packet before sweeping expired flows
const RECV_TIMEOUT: Duration = Duration::from_secs(1);
/// Poll interval while no controller has completed the handshake
const READY_POLL: Duration = Duration::from_millis(100);

pub struct SwitchCore {
    datapath_id: u64,
    network: Arc<dyn Network>,
    table: Mutex<FlowTable>,
    buffers: Mutex<PacketBuffer>,
    config: Mutex<OfpSwitchConfig>,
    xid: AtomicU32,
    ready: AtomicBool,
    running: AtomicBool,
    sessions: Mutex<Vec<Arc<SessionLink>>>,
}

impl SwitchCore {
    pub fn new(network: Arc<dyn Network>, conf: &SwitchConf) -> SwitchCore {
        SwitchCore {
            datapath_id: conf.datapath_id,
            network: network,
            table: Mutex::new(FlowTable::new()),
            buffers: Mutex::new(PacketBuffer::new(conf.buffers)),
            config: Mutex::new(OfpSwitchConfig {
                flags: OfpConfigFlags::FragNormal as u16,
                miss_send_len: conf.miss_send_len,
            }),
            xid: AtomicU32::new(0),
            ready: AtomicBool::new(false),
            running: AtomicBool::new(true),
            sessions: Mutex::new(vec![]),
        }
    }

    /// A transaction id not used before by this switch
    pub fn next_xid(&self) -> u32 {
        let xid = self.xid.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        trace!("Using xid {} for the outgoing message", xid);
        xid
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Called once a controller has completed the handshake
    pub fn mark_ready(&self) {
        if !self.ready.swap(true, Ordering::SeqCst) {
            info!("Switch is ready");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stops the datapath loop and the sessions
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Stopping the switch");
        }
        self.network.shutdown();
    }

    pub fn features(&self) -> OfpSwitchFeatures {
        let ports = self
            .network
            .ports()
            .into_iter()
            .map(|p| OfpPhyPort {
                port_no: p.port_no,
                hw_addr: p.hw_addr,
                name: p.name,
                config: 0,
                state: 0,
                curr: 0,
                advertised: 0,
                supported: 0,
                peer: 0,
            })
            .collect();
        OfpSwitchFeatures {
            datapath_id: self.datapath_id,
            n_buffers: lock(&self.buffers).capacity() as u32,
            n_tables: 1,
            capabilities: OfpCapabilities::ArpMatchIp as u32,
            actions: SUPPORTED_ACTIONS,
            ports: ports,
        }
    }

    pub fn config(&self) -> OfpSwitchConfig {
        *lock(&self.config)
    }

    pub fn set_config(&self, config: OfpSwitchConfig) {
        let config = OfpSwitchConfig {
            flags: config.flags & OFPC_FRAG_MASK,
            miss_send_len: config.miss_send_len,
        };
        info!(
            "Setting fragment handling flags {} and miss send length {}",
            config.flags, config.miss_send_len
        );
        *lock(&self.config) = config;
    }

    pub fn register(&self, link: Arc<SessionLink>) {
        lock(&self.sessions).push(link);
    }

    pub fn unregister(&self, link: &Arc<SessionLink>) {
        lock(&self.sessions).retain(|l| !Arc::ptr_eq(l, link));
    }

    /// Sends `msg` to every controller that completed the handshake.
    /// Returns the number of controllers reached.
    fn broadcast(&self, msg: &Message) -> usize {
        let links: Vec<_> = lock(&self.sessions)
            .iter()
            .filter(|l| l.is_established())
            .cloned()
            .collect();
        let mut sent = 0;
        for link in links {
            match link.send(msg, self.next_xid()) {
                Ok(()) => sent += 1,
                Err(e) => {
                    error!("Dropping controller {}: {}", link.peer(), e);
                    self.unregister(&link);
                }
            }
        }
        sent
    }

    /// Buffers `packet` and announces it to the controllers with at most
    /// `max_len` of its bytes. Nothing is sent if all buffers are in use.
    pub fn send_packet_in(
        &self,
        in_port: u16,
        packet: &Packet,
        reason: OfpPacketInReason,
        max_len: u16,
    ) {
        let buffer_id = match lock(&self.buffers).add(packet) {
            Ok(id) => id,
            Err(e) => {
                error!("Dropping Packet-In for a packet from port {}: {}", in_port, e);
                return;
            }
        };
        let packet_in = OfpPacketIn {
            buffer_id: buffer_id,
            total_len: packet.len() as u16,
            in_port: in_port,
            reason: reason as u8,
            data: packet.truncated(max_len as usize),
        };
        let n = self.broadcast(&Message::PacketIn(packet_in));
        debug!("Sent Packet-In with buffer id {} to {} controller(s)", buffer_id, n);
    }

    fn notify_removed<I>(&self, removed: I, now: Instant)
    where
        I: IntoIterator<Item = (FlowEntry, OfpFlowRemovedReason)>,
    {
        for (entry, reason) in removed {
            info!(
                "Removed flow with cookie {:#x} and priority {} ({:?})",
                entry.cookie, entry.priority, reason
            );
            if entry.sends_flow_removed() {
                self.broadcast(&Message::FlowRemoved(entry.flow_removed(reason, now)));
            }
        }
    }

    /// Removes expired flows and notifies the controllers
    pub fn expire_flows(&self, now: Instant) {
        let expired = lock(&self.table).expire(now);
        self.notify_removed(expired, now);
    }

    fn add_flow(&self, flow_mod: &OfpFlowMod, now: Instant) -> Result<()> {
        let entry = FlowEntry::from_flow_mod(flow_mod, now);
        lock(&self.table).insert(entry)?;
        debug!("Installed flow with priority {}", flow_mod.priority);
        Ok(())
    }

    /// Applies a Flow-Mod to the flow table
    pub fn flow_mod(&self, flow_mod: OfpFlowMod) -> Result<()> {
        let command = OfpFlowModCommand::from_code(flow_mod.command)
            .ok_or(Error::FlowModFailed(OfpFlowModFailedCode::BadCommand))?;
        let now = Instant::now();
        let strict =
            command == OfpFlowModCommand::ModifyStrict || command == OfpFlowModCommand::DeleteStrict;
        let filter = FlowFilter::new(&flow_mod.match_field, strict).priority(flow_mod.priority);
        match command {
            OfpFlowModCommand::Add => self.add_flow(&flow_mod, now)?,
            OfpFlowModCommand::Modify | OfpFlowModCommand::ModifyStrict => {
                let n = lock(&self.table).modify(&filter, &flow_mod.actions, flow_mod.cookie);
                debug!("Modified {} flow(s)", n);
                if n == 0 {
                    self.add_flow(&flow_mod, now)?;
                }
            }
            OfpFlowModCommand::Delete | OfpFlowModCommand::DeleteStrict => {
                let filter = filter.out_port(flow_mod.out_port);
                let removed = lock(&self.table).delete(&filter);
                let reason = OfpFlowRemovedReason::Delete;
                self.notify_removed(removed.into_iter().map(|e| (e, reason)), now);
                return Ok(());
            }
        }

        if flow_mod.buffer_id != OFP_NO_BUFFER {
            let packet = lock(&self.buffers).pop(flow_mod.buffer_id).map_err(|e| {
                warn!("{}", e);
                Error::BadRequest(OfpBadRequestCode::BufferUnknown)
            })?;
            let in_port = flow_mod.match_field.in_port.unwrap_or(OFPP_NONE);
            self.execute(&flow_mod.actions, in_port, packet, Origin::Flow)?;
        }
        Ok(())
    }

    /// Sends a packet on behalf of a controller
    pub fn packet_out(&self, packet_out: OfpPacketOut) -> Result<()> {
        let packet = if packet_out.buffer_id == OFP_NO_BUFFER {
            Packet::from_bytes(packet_out.data)
        } else {
            lock(&self.buffers).pop(packet_out.buffer_id).map_err(|e| {
                warn!("{}", e);
                Error::BadRequest(OfpBadRequestCode::BufferUnknown)
            })?
        };
        self.execute(&packet_out.actions, packet_out.in_port, packet, Origin::PacketOut)
    }

    fn execute(&self, actions: &[Action], in_port: u16, packet: Packet, origin: Origin) -> Result<()> {
        action::execute(self, actions, in_port, packet, origin).map_err(|e| {
            error!("{}", e);
            Error::BadAction(e.bad_action_code())
        })
    }

    /// Forwards a packet received on `in_port` according to the flow table,
    /// or asks the controllers if no flow matches.
    pub fn process_packet(&self, in_port: u16, packet: Packet) {
        let actions = lock(&self.table).match_packet(in_port, &packet, Instant::now());
        match actions {
            Some(actions) => {
                if let Err(e) = action::execute(self, &actions, in_port, packet, Origin::Flow) {
                    error!("Packet from port {}: {}", in_port, e);
                }
            }
            None => {
                let max_len = self.config().miss_send_len;
                self.send_packet_in(in_port, &packet, OfpPacketInReason::NoMatch, max_len);
            }
        }
    }

    /// Receives and forwards packets until the network is shut down.
    ///
    /// Forwarding starts once a controller has completed the handshake.
    pub fn run_datapath(&self) {
        while !self.is_ready() {
            if !self.is_running() {
                return;
            }
            thread::sleep(READY_POLL);
        }
        info!("Datapath is running");
        while self.is_running() {
            match self.network.recv_packet(RECV_TIMEOUT) {
                Ok((port, packet)) => {
                    debug!("Port {}: {}", port, packet);
                    self.process_packet(port, packet);
                }
                Err(net::Error::NoPackets) => {}
                Err(net::Error::Shutdown) => {
                    info!("The network was shut down");
                    break;
                }
                Err(e) => error!("Receiving a packet failed: {}", e),
            }
            self.expire_flows(Instant::now());
        }
    }
}

impl Datapath for SwitchCore {
    fn port_numbers(&self) -> Vec<u16> {
        self.network.ports().iter().map(|p| p.port_no).collect()
    }

    fn output(&self, port_no: u16, packet: &Packet) -> net::Result<()> {
        self.network.send_packet(port_no, packet)
    }

    fn output_to_controller(&self, in_port: u16, packet: &Packet, max_len: u16) {
        self.send_packet_in(in_port, packet, OfpPacketInReason::Action, max_len);
    }

    fn output_to_table(&self, in_port: u16, packet: &Packet) {
        self.process_packet(in_port, packet.clone());
    }
}

/// A switch with its controller connections
pub struct Switch {
    core: Arc<SwitchCore>,
    sessions: Vec<JoinHandle<()>>,
}

impl Switch {
    pub fn new(network: Arc<dyn Network>, conf: &SwitchConf) -> Switch {
        info!("Starting switch with datapath id {:#018x}", conf.datapath_id);
        Switch {
            core: Arc::new(SwitchCore::new(network, conf)),
            sessions: vec![],
        }
    }

    /// The shared state, e.g. for stopping the switch from another thread
    pub fn core(&self) -> Arc<SwitchCore> {
        self.core.clone()
    }

    /// Connects to a controller and starts a session thread for it.
    pub fn add_controller(&mut self, addr: &SocketAddr) -> io::Result<()> {
        let stream = TcpStream::connect(addr)?;
        info!("Connected to controller {}", addr);
        stream.set_read_timeout(Some(READ_TIMEOUT))?;
        stream.set_write_timeout(Some(WRITE_TIMEOUT))?;
        stream.set_nodelay(true)?;
        let link = Arc::new(SessionLink::new(addr.to_string(), stream.try_clone()?));
        self.core.register(link.clone());
        let mut session = Session::new(self.core.clone(), link);
        session.start()?;
        self.sessions.push(thread::spawn(move || session.run(stream)));
        Ok(())
    }

    /// Runs the datapath until the network is shut down, then stops all sessions.
    pub fn run(self) {
        self.core.run_datapath();
        self.shutdown();
    }

    fn shutdown(self) {
        self.core.stop();
        for session in self.sessions {
            if session.join().is_err() {
                error!("A controller session thread panicked");
            }
        }
        info!("Switch stopped");
    }
}
