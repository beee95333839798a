/*!
All the OpenFlow 1.0 message primitives a switch needs to talk to its controllers

This is based on the openflow.h from OpenFlow Switch Specification 1.0.0.
The type names are changed to align with the Rust conventions.
*/

pub mod deserialize;
pub mod serialize;

use ipnetwork::Ipv4Network;
use packet::MacAddr;

use std::fmt;
use std::net::Ipv4Addr;

impl OfpErrorMsg {
    /// The OpenFlow error data for a failed request:
    /// its header followed by at most the first 64 bytes overall.
    fn first_64_bytes(header: &[u8], body: &[u8]) -> Vec<u8> {
        let mut buf = vec![];
        buf.extend_from_slice(header);
        let target_length = 64 - header.len();
        let shrunk_body = if body.len() < target_length {
            body
        }
        else {
            &body[0..target_length]
        };
        buf.extend_from_slice(shrunk_body);
        buf
    }

    /// Constructs a Hello Failed error
    pub fn new_hello_failed() -> OfpErrorMsg {
        let text = "Only OpenFlow 1.0 is supported";
        OfpErrorMsg {
            typ: OfpErrorType::HelloFailed as u16,
            code: OfpHelloFailedCode::Incompatible as u16,
            data: text.as_bytes().to_vec(),
        }
    }

    /// Constructs a Bad Request error
    pub fn new_bad_request(code: OfpBadRequestCode, header: &[u8], body: &[u8]) -> OfpErrorMsg {
        OfpErrorMsg {
            typ: OfpErrorType::BadRequest as u16,
            code: code as u16,
            data: Self::first_64_bytes(header, body),
        }
    }

    /// Constructs a Bad Action error
    pub fn new_bad_action(code: OfpBadActionCode, header: &[u8], body: &[u8]) -> OfpErrorMsg {
        OfpErrorMsg {
            typ: OfpErrorType::BadAction as u16,
            code: code as u16,
            data: Self::first_64_bytes(header, body),
        }
    }

    /// Constructs a Flow Mod Failed error
    pub fn new_flow_mod_failed(
        code: OfpFlowModFailedCode,
        header: &[u8],
        body: &[u8],
    ) -> OfpErrorMsg {
        OfpErrorMsg {
            typ: OfpErrorType::FlowModFailed as u16,
            code: code as u16,
            data: Self::first_64_bytes(header, body),
        }
    }

    /// Gets the error type's numerical representation
    pub fn typ(&self) -> u16 {
        self.typ
    }

    /// Gets the error code's numerical representation
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Gets the error data
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Display for OfpErrorMsg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let typ = match self.typ {
            0 => OfpErrorType::HelloFailed,
            1 => OfpErrorType::BadRequest,
            2 => OfpErrorType::BadAction,
            3 => OfpErrorType::FlowModFailed,
            4 => OfpErrorType::PortModFailed,
            5 => OfpErrorType::QueueOpFailed,
            _ => return write!(f, "OpenFlow Error: type({}), code({})", self.typ, self.code),
        };
        write!(f, "OpenFlow Error: {:?}, code({})", typ, self.code)
    }
}

/* Some getters */

impl OfpHeader {
    /// Gets the packet's OpenFlow version
    pub fn version(&self) -> u8 {
        self.version
    }
    /// Gets this packet's `OfpType`'s numerical respresentation.
    pub fn typ(&self) -> u8 {
        self.typ
    }
    /// Gets the packet's length including the header
    pub fn length(&self) -> u16 {
        self.length
    }
    /// Gets the packet's transaction id
    pub fn xid(&self) -> u32 {
        self.xid
    }
}

impl OfpEchoRequest {
    /// Gets the message's content
    pub fn arbitrary(self) -> Vec<u8> {
        self.arbitrary
    }
}

/// An OpenFlow Echo Request
#[derive(Debug, Clone, PartialEq)]
pub struct OfpEchoRequest {
    arbitrary: Vec<u8>,
}

/// An OpenFlow Echo Reply
#[derive(Debug, Clone, PartialEq)]
pub struct OfpEchoReply {
    arbitrary: Vec<u8>,
}

/// A decoded OpenFlow 1.0 message without its header.
///
/// Types the switch does not handle are kept as `Unknown`
/// with their raw type code and body.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello,
    Error(OfpErrorMsg),
    EchoRequest(OfpEchoRequest),
    EchoReply(OfpEchoReply),
    FeaturesRequest,
    FeaturesReply(OfpSwitchFeatures),
    GetConfigRequest,
    GetConfigReply(OfpSwitchConfig),
    SetConfig(OfpSwitchConfig),
    PacketIn(OfpPacketIn),
    FlowRemoved(OfpFlowRemoved),
    PacketOut(OfpPacketOut),
    FlowMod(OfpFlowMod),
    BarrierRequest,
    BarrierReply,
    Unknown(u8, Vec<u8>),
}

impl Message {
    /// The numerical message type as used in `OfpHeader`
    pub fn type_code(&self) -> u8 {
        let t = match *self {
            Message::Hello => OfpType::Hello,
            Message::Error(_) => OfpType::Error,
            Message::EchoRequest(_) => OfpType::EchoRequest,
            Message::EchoReply(_) => OfpType::EchoReply,
            Message::FeaturesRequest => OfpType::FeaturesRequest,
            Message::FeaturesReply(_) => OfpType::FeaturesReply,
            Message::GetConfigRequest => OfpType::GetConfigRequest,
            Message::GetConfigReply(_) => OfpType::GetConfigReply,
            Message::SetConfig(_) => OfpType::SetConfig,
            Message::PacketIn(_) => OfpType::PacketIn,
            Message::FlowRemoved(_) => OfpType::FlowRemoved,
            Message::PacketOut(_) => OfpType::PacketOut,
            Message::FlowMod(_) => OfpType::FlowMod,
            Message::BarrierRequest => OfpType::BarrierRequest,
            Message::BarrierReply => OfpType::BarrierReply,
            Message::Unknown(t, _) => return t,
        };
        t as u8
    }
}

/* Copyright (c) 2008 The Board of Trustees of The Leland Stanford Junior University
 *
 * We are making the OpenFlow specification and associated documentation
 * (Software) available for public use and benefit with the expectation
 * that others will use, modify and enhance the Software and contribute
 * those enhancements back to the community. However, since we would
 * like to make the Software available for broadest use, with as few
 * restrictions as possible permission is hereby granted, free of
 * charge, to any person obtaining a copy of this Software to deal in
 * the Software under the copyrights without restriction, including
 * without limitation the rights to use, copy, modify, merge, publish,
 * distribute, sublicense, and/or sell copies of the Software, and to
 * permit persons to whom the Software is furnished to do so, subject to
 * the following conditions:
 *
 * The above copyright notice and this permission notice shall be
 * included in all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
 * EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
 * MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
 * NONINFRINGEMENT.  IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS
 * BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN
 * ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN
 * CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 *
 * The name and trademarks of copyright holder(s) may NOT be used in
 * advertising or publicity pertaining to the Software or any
 * derivatives without specific, written prior permission.
 */

/// Version number:
/// OpenFlow versions released: 0x01 = 1.0 ; 0x02 = 1.1 ; 0x03 = 1.2; 0x04 = 1.3.
///
/// The most significant bit in the version field is reserved and must be set to zero.
pub const OFP_VERSION: u8 = 0x01;

/// The TCP port controllers listen on by default.
pub const OFP_TCP_PORT: u16 = 6633;

/// Maximum number of physical switch ports.
pub const OFPP_MAX: u16 = 0xff00;
/// Send the packet out the input port.
pub const OFPP_IN_PORT: u16 = 0xfff8;
/// Perform actions in flow table. Only for `OfpPacketOut` messages.
pub const OFPP_TABLE: u16 = 0xfff9;
/// Process with normal L2/L3 switching.
pub const OFPP_NORMAL: u16 = 0xfffa;
/// All physical ports except input port and those disabled by STP.
pub const OFPP_FLOOD: u16 = 0xfffb;
/// All physical ports except input port.
pub const OFPP_ALL: u16 = 0xfffc;
/// Send to controller.
pub const OFPP_CONTROLLER: u16 = 0xfffd;
/// Local openflow "port".
pub const OFPP_LOCAL: u16 = 0xfffe;
/// Not associated with a physical port.
pub const OFPP_NONE: u16 = 0xffff;

/// A message's type, the most fundamental to
/// distinguish information between messages
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpType {
    /* Immutable messages. */
    /// Symmetric message
    Hello = 0,
    /// Symmetric message
    Error = 1,
    /// Symmetric message
    EchoRequest = 2,
    /// Symmetric message
    EchoReply = 3,
    /// Symmetric message
    Vendor = 4,

    /* Switch configuration messages. */
    /// Controller/switch message
    FeaturesRequest = 5,
    /// Controller/switch message
    FeaturesReply = 6,
    /// Controller/switch message
    GetConfigRequest = 7,
    /// Controller/switch message
    GetConfigReply = 8,
    /// Controller/switch message
    SetConfig = 9,

    /* Asynchronous messages. */
    /// Async message
    PacketIn = 10,
    /// Async message
    FlowRemoved = 11,
    /// Async message
    PortStatus = 12,

    /* Controller command messages. */
    /// Controller/switch message
    PacketOut = 13,
    /// Controller/switch message
    FlowMod = 14,
    /// Controller/switch message
    PortMod = 15,

    /* Statistics messages. */
    /// Controller/switch message
    StatsRequest = 16,
    /// Controller/switch message
    StatsReply = 17,

    /* Barrier messages. */
    /// Controller/switch message
    BarrierRequest = 18,
    /// Controller/switch message
    BarrierReply = 19,
}

/// Header on all OpenFlow packets.
#[derive(Debug, PartialEq, Clone)]
pub struct OfpHeader {
    /// OFP_VERSION.
    version: u8,
    /// This packet's OfpType.
    typ: u8,
    /// This packet's length including this OfpHeader.
    length: u16,
    /// Transaction id associated with this packet.
    /// Replies use the same id as was in the request
    /// to facilitate pairing.
    xid: u32,
}

/// Capabilities supported by the datapath.
pub enum OfpCapabilities {
    /// Flow statistics.
    FlowStats = 1 << 0,
    /// Table statistics.
    TableStats = 1 << 1,
    /// Port statistics.
    PortStats = 1 << 2,
    /// 802.1d spanning tree.
    Stp = 1 << 3,
    /// Can reassemble IP fragments.
    IpReasm = 1 << 5,
    /// Queue statistics.
    QueueStats = 1 << 6,
    /// Match IP addresses in ARP pkts.
    ArpMatchIp = 1 << 7,
}

/// Switch features.
#[derive(Debug, Clone, PartialEq)]
pub struct OfpSwitchFeatures {
    /// Datapath unique ID. The lower 48-bits are for
    /// a MAC address, while the upper 16-bits are
    /// implementer-defined.
    pub datapath_id: u64,
    /// Max packets buffered at once.
    pub n_buffers: u32,
    /// Number of tables supported by datapath.
    pub n_tables: u8,
    /// Bitmap of support OfpCapabilities.
    pub capabilities: u32,
    /// Bitmap of supported "1 << OfpActionType"s.
    pub actions: u32,
    /// Port definitions.
    pub ports: Vec<OfpPhyPort>,
}

/// Length of a port name including its NUL padding.
pub const OFP_MAX_PORT_NAME_LEN: usize = 16;

/// Description of a physical port
#[derive(Debug, Clone, PartialEq)]
pub struct OfpPhyPort {
    pub port_no: u16,
    pub hw_addr: MacAddr,
    /// Null-terminated on the wire
    pub name: String,
    /// Bitmap of OFPPC_* flags.
    pub config: u32,
    /// Bitmap of OFPPS_* flags.
    pub state: u32,

    /* Bitmaps of OFPPF_* that describe features. All bits zeroed if
     * unsupported or unavailable. */
    /// Current features.
    pub curr: u32,
    /// Features being advertised by the port.
    pub advertised: u32,
    /// Features supported by the port.
    pub supported: u32,
    /// Features advertised by peer.
    pub peer: u32,
}

/// Handling of IP fragments, as stored in `OfpSwitchConfig::flags`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpConfigFlags {
    /// No special handling for fragments.
    FragNormal = 0,
    /// Drop fragments.
    FragDrop = 1,
    /// Reassemble (only if OFPC_IP_REASM set).
    FragReasm = 2,
}

/// Mask of all fragment handling bits.
pub const OFPC_FRAG_MASK: u16 = 3;

/// Switch configuration, as set by `SetConfig` and
/// returned by `GetConfigReply`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfpSwitchConfig {
    /// OFPC_* flags.
    pub flags: u16,
    /// Max bytes of new flow that datapath should send to the controller.
    pub miss_send_len: u16,
}

/* ## ------------------ ## */
/* ## OpenFlow 1.0 Match. ## */
/* ## ------------------ ## */

/// Flow wildcards.
pub mod wildcards {
    /// Switch input port.
    pub const IN_PORT: u32 = 1 << 0;
    /// VLAN id.
    pub const DL_VLAN: u32 = 1 << 1;
    /// Ethernet source address.
    pub const DL_SRC: u32 = 1 << 2;
    /// Ethernet destination address.
    pub const DL_DST: u32 = 1 << 3;
    /// Ethernet frame type.
    pub const DL_TYPE: u32 = 1 << 4;
    /// IP protocol.
    pub const NW_PROTO: u32 = 1 << 5;
    /// TCP/UDP source port.
    pub const TP_SRC: u32 = 1 << 6;
    /// TCP/UDP destination port.
    pub const TP_DST: u32 = 1 << 7;

    /// IP source address wildcard bit count. 0 is exact match,
    /// 1 ignores the LSB, 2 ignores the 2 least-significant bits, ...,
    /// 32 and higher wildcard the entire field.
    pub const NW_SRC_SHIFT: u32 = 8;
    /// IP destination address wildcard bit count, same as for the source.
    pub const NW_DST_SHIFT: u32 = 14;
    /// Width of the IP address wildcard bit counts.
    pub const NW_BITS: u32 = 6;

    /// VLAN priority.
    pub const DL_VLAN_PCP: u32 = 1 << 20;
    /// IP ToS (DSCP field, 6 bits).
    pub const NW_TOS: u32 = 1 << 21;
}

/// Fields to match against flows.
///
/// Every `None` field is wildcarded. IPv4 addresses are matched by prefix,
/// which covers the OpenFlow 1.0 bit count wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfpMatch {
    /// Input switch port.
    pub in_port: Option<u16>,
    /// Ethernet source address.
    pub dl_src: Option<MacAddr>,
    /// Ethernet destination address.
    pub dl_dst: Option<MacAddr>,
    /// Input VLAN id, `packet::VLAN_NONE` for untagged frames.
    pub dl_vlan: Option<u16>,
    /// Input VLAN priority.
    pub dl_vlan_pcp: Option<u8>,
    /// Ethernet frame type.
    pub dl_type: Option<u16>,
    /// IP ToS (actually DSCP field, 6 bits).
    pub nw_tos: Option<u8>,
    /// IP protocol or lower 8 bits of ARP opcode.
    pub nw_proto: Option<u8>,
    /// IP source address.
    pub nw_src: Option<Ipv4Network>,
    /// IP destination address.
    pub nw_dst: Option<Ipv4Network>,
    /// TCP/UDP source port or ICMP type.
    pub tp_src: Option<u16>,
    /// TCP/UDP destination port or ICMP code.
    pub tp_dst: Option<u16>,
}

/// The wire size of `OfpMatch`
pub const OFP_MATCH_LEN: usize = 40;

/* ## ----------------- ## */
/* ## OpenFlow Actions. ## */
/* ## ----------------- ## */

/// The type of an OpenFlow Action
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpActionType {
    /// Output to switch port.
    Output = 0,
    /// Set the 802.1q VLAN id.
    SetVlanVid = 1,
    /// Set the 802.1q priority.
    SetVlanPcp = 2,
    /// Strip the 802.1q header.
    StripVlan = 3,
    /// Ethernet source address.
    SetDlSrc = 4,
    /// Ethernet destination address.
    SetDlDst = 5,
    /// IP source address.
    SetNwSrc = 6,
    /// IP destination address.
    SetNwDst = 7,
    /// IP ToS (DSCP field, 6 bits).
    SetNwTos = 8,
    /// TCP/UDP source port.
    SetTpSrc = 9,
    /// TCP/UDP destination port.
    SetTpDst = 10,
    /// Output to queue.
    Enqueue = 11,
    /// Vendor specific action.
    Vendor = 0xffff,
}

/// The destination of an output action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoPort {
    /// A physical switch port
    Physical(u16),
    /// The port the packet came in on
    InPort,
    /// Submit to the flow table (`OfpPacketOut` only)
    Table,
    /// Traditional non-OpenFlow forwarding
    Normal,
    /// All ports except the input port
    Flood,
    /// All ports except the input port
    All,
    /// The controller(s), with the number of bytes to send
    Controller(u16),
    /// The local networking stack
    Local,
}

impl PseudoPort {
    /// The wire port number
    pub fn port_no(&self) -> u16 {
        match *self {
            PseudoPort::Physical(p) => p,
            PseudoPort::InPort => OFPP_IN_PORT,
            PseudoPort::Table => OFPP_TABLE,
            PseudoPort::Normal => OFPP_NORMAL,
            PseudoPort::Flood => OFPP_FLOOD,
            PseudoPort::All => OFPP_ALL,
            PseudoPort::Controller(_) => OFPP_CONTROLLER,
            PseudoPort::Local => OFPP_LOCAL,
        }
    }
}

/// Actions associated with flows and packets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Output to switch port.
    Output(PseudoPort),
    /// Set the 802.1q VLAN id.
    SetVlanVid(u16),
    /// Set the 802.1q priority.
    SetVlanPcp(u8),
    /// Strip the 802.1q header.
    StripVlan,
    /// Ethernet source address.
    SetDlSrc(MacAddr),
    /// Ethernet destination address.
    SetDlDst(MacAddr),
    /// IP source address.
    SetNwSrc(Ipv4Addr),
    /// IP destination address.
    SetNwDst(Ipv4Addr),
    /// IP ToS (DSCP field, 6 bits).
    SetNwTos(u8),
    /// TCP/UDP source port.
    SetTpSrc(u16),
    /// TCP/UDP destination port.
    SetTpDst(u16),
    /// Output to a queue of a port.
    Enqueue { port: u16, queue_id: u32 },
    /// Vendor specific action with its opaque body.
    Vendor(u32, Vec<u8>),
}

/// Bitmap of the action types this switch can execute.
pub const SUPPORTED_ACTIONS: u32 = (1 << OfpActionType::Output as u32)
    | (1 << OfpActionType::SetVlanVid as u32)
    | (1 << OfpActionType::SetVlanPcp as u32)
    | (1 << OfpActionType::StripVlan as u32)
    | (1 << OfpActionType::SetDlSrc as u32)
    | (1 << OfpActionType::SetDlDst as u32)
    | (1 << OfpActionType::SetNwSrc as u32)
    | (1 << OfpActionType::SetNwDst as u32)
    | (1 << OfpActionType::SetNwTos as u32)
    | (1 << OfpActionType::SetTpSrc as u32)
    | (1 << OfpActionType::SetTpDst as u32);

/* ## --------------------------- ## */
/* ## OpenFlow Flow Modification. ## */
/* ## --------------------------- ## */

/// The command that is embedded in a flow mod message
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpFlowModCommand {
    /// New flow.
    Add = 0,
    /// Modify all matching flows.
    Modify = 1,
    /// Modify entry strictly matching wildcards.
    ModifyStrict = 2,
    /// Delete all matching flows.
    Delete = 3,
    /// Delete entry strictly matching wildcards and priority.
    DeleteStrict = 4,
}

impl OfpFlowModCommand {
    /// Maps the numerical command, `None` for unknown commands
    pub fn from_code(code: u16) -> Option<OfpFlowModCommand> {
        match code {
            0 => Some(OfpFlowModCommand::Add),
            1 => Some(OfpFlowModCommand::Modify),
            2 => Some(OfpFlowModCommand::ModifyStrict),
            3 => Some(OfpFlowModCommand::Delete),
            4 => Some(OfpFlowModCommand::DeleteStrict),
            _ => None,
        }
    }
}

/// Send flow removed message when flow expires or is deleted.
pub const OFPFF_SEND_FLOW_REM: u16 = 1 << 0;
/// Check for overlapping entries first.
pub const OFPFF_CHECK_OVERLAP: u16 = 1 << 1;

/// Value used in `idle_timeout` and `hard_timeout` to indicate that the entry is permanent.
pub const OFP_FLOW_PERMANENT: u16 = 0;

/// By default, choose a priority in the middle.
pub const OFP_DEFAULT_PRIORITY: u16 = 0x8000;

/// Flow setup and teardown (controller -> datapath).
#[derive(Debug, Clone, PartialEq)]
pub struct OfpFlowMod {
    /// Fields to match.
    pub match_field: OfpMatch,
    /// Opaque controller-issued identifier.
    pub cookie: u64,
    /// One of OfpFlowModCommand.
    pub command: u16,
    /// Idle time before discarding (seconds).
    pub idle_timeout: u16,
    /// Max time before discarding (seconds).
    pub hard_timeout: u16,
    /// Priority level of flow entry.
    pub priority: u16,
    /// Buffered packet to apply to (or OFP_NO_BUFFER).
    /// Not meaningful for OfpFlowModCommand::Delete*.
    pub buffer_id: u32,
    /// For OfpFlowModCommand::Delete* commands, require
    /// matching entries to include this as an
    /// output port. A value of OFPP_NONE
    /// indicates no restriction.
    pub out_port: u16,
    /// Bitmap of OFPFF_* flags.
    pub flags: u16,
    /// The action length is inferred from the length field in the header.
    pub actions: Vec<Action>,
}

/// The wire size of the `OfpFlowMod` body without actions
pub const OFP_FLOW_MOD_LEN: usize = 64;

/// A reserved buffer ID to express that no buffer is assigned
pub const OFP_NO_BUFFER: u32 = 0xffff_ffff;

/// Why is this packet being sent to the controller?
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpPacketInReason {
    /// No matching flow.
    NoMatch = 0,
    /// Action explicitly output to controller.
    Action = 1,
}

/// Packet received on port (datapath -> controller).
#[derive(Debug, Clone, PartialEq)]
pub struct OfpPacketIn {
    /// ID assigned by datapath.
    pub buffer_id: u32,
    /// Full length of frame.
    pub total_len: u16,
    /// Port on which frame was received.
    pub in_port: u16,
    /// Reason packet is being sent (one of OfpPacketInReason)
    pub reason: u8,
    /// Ethernet frame, possibly truncated.
    pub data: Vec<u8>,
}

/// Send packet (controller -> datapath).
#[derive(Debug, Clone, PartialEq)]
pub struct OfpPacketOut {
    /// ID assigned by datapath (OFP_NO_BUFFER if none).
    pub buffer_id: u32,
    /// Packet's input port (OFPP_NONE if none).
    pub in_port: u16,
    /// Actions.
    pub actions: Vec<Action>,
    /// Packet data, only meaningful if buffer_id == OFP_NO_BUFFER.
    pub data: Vec<u8>,
}

/// Why was this flow removed?
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpFlowRemovedReason {
    /// Flow idle time exceeded idle_timeout.
    IdleTimeout = 0,
    /// Time exceeded hard_timeout.
    HardTimeout = 1,
    /// Evicted by a DELETE flow mod.
    Delete = 2,
}

/// Flow removed (datapath -> controller).
#[derive(Debug, Clone, PartialEq)]
pub struct OfpFlowRemoved {
    /// Description of fields.
    pub match_field: OfpMatch,
    /// Opaque controller-issued identifier.
    pub cookie: u64,
    /// Priority level of flow entry.
    pub priority: u16,
    /// One of OfpFlowRemovedReason.
    pub reason: u8,
    /// Time flow was alive in seconds.
    pub duration_sec: u32,
    /// Time flow was alive in nanoseconds beyond duration_sec.
    pub duration_nsec: u32,
    /// Idle timeout from original flow mod.
    pub idle_timeout: u16,
    pub packet_count: u64,
    pub byte_count: u64,
}

/// Values for 'type' in `OfpErrorMsg`. These values are immutable: they will
/// not change in future versions of the protocol (although new values may be added).
#[derive(Debug)]
pub enum OfpErrorType {
    /// Hello protocol failed.
    HelloFailed = 0,
    /// Request was not understood.
    BadRequest = 1,
    /// Error in action description.
    BadAction = 2,
    /// Problem modifying flow entry.
    FlowModFailed = 3,
    /// Port mod request failed.
    PortModFailed = 4,
    /// Queue operation failed.
    QueueOpFailed = 5,
}

/// `OfpErrorMsg` 'code' values for `OfpErrorType::HelloFailed`.
///
/// 'data' contains an ASCII text string that may give failure details.
pub enum OfpHelloFailedCode {
    /// No compatible version.
    Incompatible = 0,
}

/// `OfpErrorMsg` 'code' values for `OfpErrorType::BadRequest`.
///
/// 'data' contains at least the first 64 bytes of the failed request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpBadRequestCode {
    /// ofp_header.version not supported.
    BadVersion = 0,
    /// ofp_header.type not supported.
    BadType = 1,
    /// Wrong request length for type.
    BadLen = 6,
    /// Specified buffer has already been used.
    BufferEmpty = 7,
    /// Specified buffer does not exist.
    BufferUnknown = 8,
}

/// `OfpErrorMsg` 'code' values for `OfpErrorType::BadAction`.
///
/// 'data' contains at least the first 64 bytes of the failed request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpBadActionCode {
    /// Unknown action type.
    BadType = 0,
    /// Length problem in actions.
    BadLen = 1,
    /// Unknown vendor id specified.
    BadVendor = 2,
    /// Problem validating output action.
    BadOutPort = 4,
    /// Bad action argument.
    BadArgument = 5,
}

/// `OfpErrorMsg` 'code' values for `OfpErrorType::FlowModFailed`.
///
/// 'data' contains at least the first 64 bytes of the failed request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OfpFlowModFailedCode {
    /// Flow not added because of full tables.
    AllTablesFull = 0,
    /// Attempted to add overlapping flow with CHECK_OVERLAP flag set.
    Overlap = 1,
    /// Unknown command.
    BadCommand = 4,
    /// Unsupported action list - cannot process in the order specified.
    Unsupported = 5,
}

/// Error message (datapath -> controller).
#[derive(Debug, Clone, PartialEq)]
pub struct OfpErrorMsg {
    typ: u16,
    code: u16,
    /// Variable-length data. Interpreted based on the type and code. No padding.
    data: Vec<u8>,
}
