/*!
The switch side of the OpenFlow 1.0 protocol

A `Session` serves one controller connection. It greets the controller with
a Hello, waits for the controller's Hello and then answers requests and
applies commands to the shared switch state. Asynchronous messages such as
Packet-In are written by the switch through the session's `SessionLink`.
*/

pub mod error;
pub mod messages;

use lock;
use openflow::error::{Error, Result};
use openflow::messages::*;
use switch::SwitchCore;

use std::io;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Read timeout of the controller connections, so a session notices
/// a stopped switch.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);
/// Write timeout of the controller connections. A controller that does not
/// read for this long loses its connection.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionState {
    /// Our Hello is not sent yet
    Connecting,
    AwaitingHello,
    Established,
    Terminated,
}

/// The sending half of a controller connection, shared between the
/// session and the switch
pub struct SessionLink {
    peer: String,
    writer: Mutex<Box<dyn Write + Send>>,
    established: AtomicBool,
    broken: AtomicBool,
}

impl SessionLink {
    pub fn new<W: Write + Send + 'static>(peer: String, writer: W) -> SessionLink {
        SessionLink {
            peer: peer,
            writer: Mutex::new(Box::new(writer)),
            established: AtomicBool::new(false),
            broken: AtomicBool::new(false),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Whether the controller's Hello was received
    pub fn is_established(&self) -> bool {
        self.established.load(Ordering::SeqCst)
    }

    pub fn set_established(&self) {
        self.established.store(true, Ordering::SeqCst);
    }

    /// Whether a write failed. A broken link accepts no more messages.
    pub fn is_broken(&self) -> bool {
        self.broken.load(Ordering::SeqCst)
    }

    /// Writes a whole message at once, so that messages of
    /// different threads do not interleave.
    ///
    /// A failed or timed out write may have left part of a message on the
    /// connection, so the link is broken afterwards.
    pub fn send(&self, msg: &Message, xid: u32) -> io::Result<()> {
        let mut buf = vec![];
        msg.serialize(&mut buf, xid)?;
        let mut writer = lock(&self.writer);
        if self.is_broken() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "The connection to the controller is broken",
            ));
        }
        let result = writer.write_all(&buf).and_then(|_| writer.flush());
        if result.is_err() {
            self.broken.store(true, Ordering::SeqCst);
            self.established.store(false, Ordering::SeqCst);
        }
        result
    }
}

/// A received message with its raw header
#[derive(Debug)]
pub struct RawMessage {
    pub header_buf: [u8; 8],
    pub header: OfpHeader,
    pub body: Vec<u8>,
}

/// Collects bytes from a stream until a complete message is available.
///
/// Bytes of an incomplete message are kept across read timeouts.
#[derive(Debug, Default)]
pub struct MessageReader {
    buf: Vec<u8>,
}

impl MessageReader {
    pub fn new() -> MessageReader {
        MessageReader { buf: vec![] }
    }

    fn take_message(&mut self) -> io::Result<Option<RawMessage>> {
        let header_len = OfpHeader::header_length();
        if self.buf.len() < header_len {
            return Ok(None);
        }
        let mut header_buf = [0; 8];
        header_buf.copy_from_slice(&self.buf[..header_len]);
        let header = OfpHeader::deserialize(&header_buf);
        let length = header.length() as usize;
        if length < header_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("OpenFlow message with invalid length {}", length),
            ));
        }
        if self.buf.len() < length {
            return Ok(None);
        }
        let body = self.buf[header_len..length].to_vec();
        self.buf.drain(..length);
        Ok(Some(RawMessage {
            header_buf: header_buf,
            header: header,
            body: body,
        }))
    }

    /// Returns the next message, or `None` if the stream timed out before
    /// a complete message arrived.
    pub fn read_message<R: Read>(&mut self, stream: &mut R) -> io::Result<Option<RawMessage>> {
        let mut chunk = [0; 4096];
        loop {
            if let Some(msg) = self.take_message()? {
                return Ok(Some(msg));
            }
            match stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "The controller closed the connection",
                    ))
                }
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(ref e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    return Ok(None)
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}

/// The protocol state machine of one controller connection
pub struct Session {
    switch: Arc<SwitchCore>,
    link: Arc<SessionLink>,
    state: SessionState,
    version: Option<u8>,
}

impl Session {
    pub fn new(switch: Arc<SwitchCore>, link: Arc<SessionLink>) -> Session {
        Session {
            switch: switch,
            link: link,
            state: SessionState::Connecting,
            version: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The protocol version agreed upon with the controller
    pub fn version(&self) -> Option<u8> {
        self.version
    }

    /// Greets the controller
    pub fn start(&mut self) -> io::Result<()> {
        let xid = self.switch.next_xid();
        self.link.send(&Message::Hello, xid)?;
        self.state = SessionState::AwaitingHello;
        Ok(())
    }

    fn handle_hello(&mut self, header: &OfpHeader) -> Result<()> {
        // simple version discovery: the smaller version is agreed upon
        if header.version() == 0 {
            return Err(Error::HelloFailed(header.version()));
        }
        let version = header.version().min(OFP_VERSION);
        info!(
            "Controller {} announced OpenFlow version {:#x}, using {:#x}",
            self.link.peer(),
            header.version(),
            version
        );
        self.version = Some(version);
        if self.state != SessionState::Established {
            self.state = SessionState::Established;
            self.link.set_established();
            self.switch.mark_ready();
        }
        Ok(())
    }

    /// Processes one message and returns the replies with their xids.
    pub fn handle(&mut self, header: &OfpHeader, body: &[u8]) -> Result<Vec<(u32, Message)>> {
        debug!("Incoming message: {:?}", header);
        if self.state == SessionState::Terminated {
            return Ok(vec![]);
        }
        let t = header.typ();
        if t != OfpType::Hello as u8 && header.version() != OFP_VERSION {
            return Err(Error::BadRequest(OfpBadRequestCode::BadVersion));
        }

        let replies = match Message::deserialize(header, body.to_vec())? {
            Message::Hello => {
                self.handle_hello(header)?;
                vec![]
            }
            Message::EchoRequest(req) => {
                let reply = OfpEchoReply::new(req.arbitrary());
                vec![(header.xid(), Message::EchoReply(reply))]
            }
            Message::EchoReply(_) => vec![],
            Message::Error(err) => {
                error!("Controller {} reported {}", self.link.peer(), err);
                vec![]
            }
            _ if self.state != SessionState::Established => {
                warn!("Message of type {} before the handshake was completed", t);
                return Err(Error::BadRequest(OfpBadRequestCode::BadVersion));
            }
            Message::FeaturesRequest => {
                let features = self.switch.features();
                vec![(self.switch.next_xid(), Message::FeaturesReply(features))]
            }
            Message::SetConfig(config) => {
                self.switch.set_config(config);
                vec![]
            }
            Message::GetConfigRequest => {
                let config = self.switch.config();
                vec![(self.switch.next_xid(), Message::GetConfigReply(config))]
            }
            Message::FlowMod(flow_mod) => {
                self.switch.flow_mod(flow_mod)?;
                vec![]
            }
            Message::PacketOut(packet_out) => {
                self.switch.packet_out(packet_out)?;
                vec![]
            }
            Message::BarrierRequest => vec![(header.xid(), Message::BarrierReply)],
            other => {
                warn!(
                    "Ignoring message of unsupported type {} from {}",
                    other.type_code(),
                    self.link.peer()
                );
                vec![]
            }
        };
        Ok(replies)
    }

    /// Reports an error to the controller.
    /// Returns the error if the session cannot continue.
    fn handle_of_errors(&mut self, error: Error, raw: &RawMessage) -> Result<()> {
        if let Some(err_msg) = error.to_error_msg(&raw.header_buf, &raw.body) {
            debug!("Outgoing error message: {}", err_msg);
            self.link.send(&Message::Error(err_msg), raw.header.xid())?;
        }
        if error.is_fatal() {
            return Err(error);
        }
        warn!("Rejected request of controller {}: {}", self.link.peer(), error);
        Ok(())
    }

    /// Handles a message and sends the replies or the error report.
    pub fn dispatch(&mut self, msg: RawMessage) -> Result<()> {
        match self.handle(&msg.header, &msg.body) {
            Ok(replies) => {
                for (xid, reply) in replies {
                    self.link.send(&reply, xid)?;
                }
                Ok(())
            }
            Err(e) => self.handle_of_errors(e, &msg),
        }
    }

    fn terminate(&mut self) {
        self.state = SessionState::Terminated;
        self.link.established.store(false, Ordering::SeqCst);
        self.switch.unregister(&self.link);
        info!("Session with controller {} terminated", self.link.peer());
    }

    /// Handles the messages from `stream` until the connection fails,
    /// a fatal protocol error occurs or the switch is stopped.
    pub fn run<S: Read>(mut self, mut stream: S) {
        let mut reader = MessageReader::new();
        while self.state != SessionState::Terminated && self.switch.is_running() {
            if self.link.is_broken() {
                warn!("Closing session with {}: sending failed", self.link.peer());
                break;
            }
            match reader.read_message(&mut stream) {
                Ok(Some(msg)) => {
                    if let Err(e) = self.dispatch(msg) {
                        error!("Closing session with {}: {}", self.link.peer(), e);
                        self.state = SessionState::Terminated;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    if self.switch.is_running() {
                        warn!("Connection to controller {} lost: {}", self.link.peer(), e);
                    }
                    self.state = SessionState::Terminated;
                }
            }
        }
        self.terminate();
    }
}

/// In-memory connections for the unit tests
#[cfg(test)]
pub mod tests {
    use super::*;
    use conf::SwitchConf;
    use net::tests::MockNetwork;
    use packet::tests::tcp_frame;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// A writer whose bytes stay readable by the test
    #[derive(Clone, Default)]
    pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub fn bytes(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Decodes all messages of a byte stream
    pub fn decode_all(mut bytes: &[u8]) -> Vec<(OfpHeader, Message)> {
        let mut reader = MessageReader::new();
        let mut msgs = vec![];
        while let Ok(Some(raw)) = reader.read_message(&mut bytes) {
            let msg = Message::deserialize(&raw.header, raw.body).unwrap();
            msgs.push((raw.header, msg));
        }
        msgs
    }

    fn request(msg: &Message, xid: u32) -> RawMessage {
        let mut bytes = vec![];
        msg.serialize(&mut bytes, xid).unwrap();
        MessageReader::new()
            .read_message(&mut &bytes[..])
            .unwrap()
            .unwrap()
    }

    fn session() -> (SharedBuf, Arc<SwitchCore>, Arc<MockNetwork>, Session) {
        let network = Arc::new(MockNetwork::new(2));
        let conf = SwitchConf {
            datapath_id: 42,
            buffers: 4,
            miss_send_len: 128,
        };
        let switch = Arc::new(SwitchCore::new(network.clone(), &conf));
        let buf = SharedBuf::default();
        let link = Arc::new(SessionLink::new("test".to_string(), buf.clone()));
        switch.register(link.clone());
        let session = Session::new(switch.clone(), link);
        (buf, switch, network, session)
    }

    fn established() -> (SharedBuf, Arc<SwitchCore>, Arc<MockNetwork>, Session) {
        let (buf, switch, network, mut session) = session();
        session.start().unwrap();
        session.dispatch(request(&Message::Hello, 1000)).unwrap();
        buf.0.lock().unwrap().clear();
        (buf, switch, network, session)
    }

    fn handle(session: &mut Session, msg: &Message, xid: u32) -> Result<Vec<(u32, Message)>> {
        let raw = request(msg, xid);
        session.handle(&raw.header, &raw.body)
    }

    /// A reader returning the given chunks, then timing out
    struct Chunks(VecDeque<Vec<u8>>);

    impl Read for Chunks {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Err(io::Error::new(io::ErrorKind::WouldBlock, "timeout")),
            }
        }
    }

    #[test]
    fn reader_keeps_partial_messages_across_timeouts() {
        let mut bytes = vec![];
        Message::BarrierRequest.serialize(&mut bytes, 7).unwrap();
        Message::EchoRequest(OfpEchoRequest::new(vec![1, 2])).serialize(&mut bytes, 8).unwrap();
        let mut reader = MessageReader::new();
        let mut stream = Chunks(vec![bytes[..5].to_vec()].into_iter().collect());
        assert!(reader.read_message(&mut stream).unwrap().is_none());

        stream.0.push_back(bytes[5..12].to_vec());
        let first = reader.read_message(&mut stream).unwrap().unwrap();
        assert_eq!(7, first.header.xid());
        assert!(first.body.is_empty());
        assert!(reader.read_message(&mut stream).unwrap().is_none());

        stream.0.push_back(bytes[12..].to_vec());
        let second = reader.read_message(&mut stream).unwrap().unwrap();
        assert_eq!(8, second.header.xid());
        assert_eq!(vec![1, 2], second.body);
    }

    #[test]
    fn reader_fails_on_eof_and_bad_length() {
        let mut reader = MessageReader::new();
        let mut empty: &[u8] = &[];
        let err = reader.read_message(&mut empty).unwrap_err();
        assert_eq!(io::ErrorKind::UnexpectedEof, err.kind());

        let mut bad: &[u8] = &[1, 0, 0, 4, 0, 0, 0, 1];
        let err = MessageReader::new().read_message(&mut bad).unwrap_err();
        assert_eq!(io::ErrorKind::InvalidData, err.kind());
    }

    /// A connection whose peer stopped reading
    struct Stalled(Arc<Mutex<usize>>);

    impl Write for Stalled {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            *self.0.lock().unwrap() += 1;
            Err(io::Error::new(io::ErrorKind::WouldBlock, "write timed out"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_send_breaks_link() {
        let attempts = Arc::new(Mutex::new(0));
        let link = SessionLink::new("stalled".to_string(), Stalled(attempts.clone()));
        link.set_established();
        assert!(link.send(&Message::Hello, 1).is_err());
        assert!(link.is_broken());
        assert!(!link.is_established());

        match link.send(&Message::Hello, 2) {
            Err(ref e) if e.kind() == io::ErrorKind::BrokenPipe => {}
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(1, *attempts.lock().unwrap());
    }

    #[test]
    fn session_ends_when_link_breaks() {
        let (_, switch, _, _) = session();
        let link = Arc::new(SessionLink::new(
            "stalled".to_string(),
            Stalled(Arc::new(Mutex::new(0))),
        ));
        switch.register(link.clone());
        let mut session = Session::new(switch.clone(), link.clone());
        assert!(session.start().is_err());
        // the stream only ever times out
        session.run(Chunks(VecDeque::new()));
        assert!(switch.is_running());
        assert!(link.is_broken());
    }

    #[test]
    fn start_sends_hello() {
        let (buf, _, _, mut session) = session();
        assert_eq!(SessionState::Connecting, session.state());
        session.start().unwrap();
        assert_eq!(SessionState::AwaitingHello, session.state());
        let msgs = decode_all(&buf.bytes());
        assert_eq!(1, msgs.len());
        assert_eq!(Message::Hello, msgs[0].1);
        assert_eq!(1, msgs[0].0.xid());
    }

    #[test]
    fn hello_establishes() {
        let (_, switch, _, mut session) = session();
        session.start().unwrap();
        assert!(!switch.is_ready());
        assert!(handle(&mut session, &Message::Hello, 5).unwrap().is_empty());
        assert_eq!(SessionState::Established, session.state());
        assert_eq!(Some(OFP_VERSION), session.version());
        assert!(switch.is_ready());
        assert!(session.link.is_established());
    }

    #[test]
    fn newer_hello_negotiates_down() {
        let (_, _, _, mut session) = session();
        session.start().unwrap();
        let mut raw = request(&Message::Hello, 5);
        raw.header_buf[0] = 4;
        let header = OfpHeader::deserialize(&raw.header_buf);
        session.handle(&header, &raw.body).unwrap();
        assert_eq!(Some(OFP_VERSION), session.version());
    }

    #[test]
    fn hello_without_common_version_fails() {
        let (buf, _, _, mut session) = session();
        session.start().unwrap();
        let mut raw = request(&Message::Hello, 5);
        raw.header_buf[0] = 0;
        raw.header = OfpHeader::deserialize(&raw.header_buf);
        match session.dispatch(raw) {
            Err(Error::HelloFailed(0)) => {}
            other => panic!("unexpected {:?}", other),
        }
        let msgs = decode_all(&buf.bytes());
        match msgs[1].1 {
            Message::Error(ref e) => {
                assert_eq!(OfpErrorType::HelloFailed as u16, e.typ());
                assert_eq!(5, msgs[1].0.xid());
            }
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn requests_before_hello_are_rejected() {
        let (buf, _, _, mut session) = session();
        session.start().unwrap();
        session.dispatch(request(&Message::FeaturesRequest, 9)).unwrap();
        assert_eq!(SessionState::AwaitingHello, session.state());
        let msgs = decode_all(&buf.bytes());
        assert_eq!(2, msgs.len());
        match msgs[1].1 {
            Message::Error(ref e) => {
                assert_eq!(OfpErrorType::BadRequest as u16, e.typ());
                assert_eq!(OfpBadRequestCode::BadVersion as u16, e.code());
            }
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn echo_reply_echoes_xid_and_payload() {
        let (_, _, _, mut session) = established();
        let req = Message::EchoRequest(OfpEchoRequest::new(vec![9, 8, 7]));
        let replies = handle(&mut session, &req, 0xabcd).unwrap();
        assert_eq!(
            vec![(0xabcd, Message::EchoReply(OfpEchoReply::new(vec![9, 8, 7])))],
            replies
        );
    }

    #[test]
    fn barrier_reply_echoes_xid() {
        let (_, _, _, mut session) = established();
        let replies = handle(&mut session, &Message::BarrierRequest, 77).unwrap();
        assert_eq!(vec![(77, Message::BarrierReply)], replies);
    }

    #[test]
    fn features_reply_uses_fresh_xid() {
        let (_, switch, _, mut session) = established();
        let replies = handle(&mut session, &Message::FeaturesRequest, 77).unwrap();
        assert_eq!(1, replies.len());
        assert_eq!(2, replies[0].0);
        match replies[0].1 {
            Message::FeaturesReply(ref f) => {
                assert_eq!(42, f.datapath_id);
                assert_eq!(2, f.ports.len());
            }
            ref other => panic!("unexpected {:?}", other),
        }
        assert_eq!(3, switch.next_xid());
    }

    #[test]
    fn set_and_get_config() {
        let (_, _, _, mut session) = established();
        let config = OfpSwitchConfig {
            flags: OfpConfigFlags::FragDrop as u16,
            miss_send_len: 256,
        };
        assert!(handle(&mut session, &Message::SetConfig(config), 3).unwrap().is_empty());
        let replies = handle(&mut session, &Message::GetConfigRequest, 4).unwrap();
        assert_eq!(Message::GetConfigReply(config), replies[0].1);
    }

    #[test]
    fn unknown_types_are_ignored() {
        let (buf, _, _, mut session) = established();
        let stats = Message::Unknown(OfpType::StatsRequest as u8, vec![0, 0, 0, 0]);
        session.dispatch(request(&stats, 3)).unwrap();
        assert_eq!(SessionState::Established, session.state());
        assert!(buf.bytes().is_empty());
    }

    #[test]
    fn unknown_flow_mod_command_is_fatal() {
        let (buf, _, _, mut session) = established();
        let mut flow_mod = OfpFlowMod::new(
            OfpFlowModCommand::Add,
            1,
            OfpMatch::default(),
            vec![],
        );
        flow_mod.command = 42;
        match session.dispatch(request(&Message::FlowMod(flow_mod), 12)) {
            Err(Error::FlowModFailed(OfpFlowModFailedCode::BadCommand)) => {}
            other => panic!("unexpected {:?}", other),
        }
        let msgs = decode_all(&buf.bytes());
        assert_eq!(12, msgs[0].0.xid());
        match msgs[0].1 {
            Message::Error(ref e) => {
                assert_eq!(OfpErrorType::FlowModFailed as u16, e.typ());
                assert_eq!(OfpFlowModFailedCode::BadCommand as u16, e.code());
            }
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn overlapping_flow_is_rejected_but_not_fatal() {
        let (buf, _, _, mut session) = established();
        let mut flow_mod = OfpFlowMod::new(
            OfpFlowModCommand::Add,
            1,
            OfpMatch::default(),
            vec![],
        );
        session.dispatch(request(&Message::FlowMod(flow_mod.clone()), 1)).unwrap();
        flow_mod.flags = OFPFF_CHECK_OVERLAP;
        session.dispatch(request(&Message::FlowMod(flow_mod), 2)).unwrap();
        match decode_all(&buf.bytes())[0].1 {
            Message::Error(ref e) => {
                assert_eq!(OfpFlowModFailedCode::Overlap as u16, e.code())
            }
            ref other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn packet_out_with_unknown_buffer_is_fatal() {
        let (_, _, _, mut session) = established();
        let packet_out = OfpPacketOut {
            buffer_id: 99,
            in_port: 1,
            actions: vec![Action::Output(PseudoPort::Physical(2))],
            data: vec![],
        };
        let result = session.dispatch(request(&Message::PacketOut(packet_out), 1));
        assert!(result.unwrap_err().is_fatal());
    }

    #[test]
    fn packet_out_is_executed() {
        let (_, _, network, mut session) = established();
        let packet_out = OfpPacketOut {
            buffer_id: OFP_NO_BUFFER,
            in_port: OFPP_NONE,
            actions: vec![Action::Output(PseudoPort::Physical(2))],
            data: tcp_frame(1, 80).as_bytes().to_vec(),
        };
        session.dispatch(request(&Message::PacketOut(packet_out), 1)).unwrap();
        assert_eq!(vec![2], network.sent_ports());
    }

    #[test]
    fn run_until_eof() {
        let (buf, switch, _, mut session) = session();
        session.start().unwrap();
        let mut input = vec![];
        Message::Hello.serialize(&mut input, 100).unwrap();
        Message::FeaturesRequest.serialize(&mut input, 101).unwrap();
        Message::BarrierRequest.serialize(&mut input, 102).unwrap();
        let link = session.link.clone();
        session.run(Cursor::new(input));

        let types: Vec<_> = decode_all(&buf.bytes())
            .into_iter()
            .map(|(h, _)| (h.typ(), h.xid()))
            .collect();
        assert_eq!(
            vec![
                (OfpType::Hello as u8, 1),
                (OfpType::FeaturesReply as u8, 2),
                (OfpType::BarrierReply as u8, 102),
            ],
            types
        );
        assert!(!link.is_established());
        // the session is gone, so a Packet-In reaches nobody
        switch.process_packet(1, tcp_frame(1, 80));
        assert_eq!(3, decode_all(&buf.bytes()).len());
    }
}
