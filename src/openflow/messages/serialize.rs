/*!
All serialization and construction routines for the OpenFlow message primitives

Use the trait `OfpPacket` for serialization implementations of message bodies.
`Message::serialize` frames a body with its header. Other primitives that are
part of a message implement a serialize function that operates on a given byte stream.
*/

use byteorder::{NetworkEndian, WriteBytesExt};
use openflow::messages::*;
use std::io;
use std::io::Write;

impl OfpHeader {
    /// Constructs an `OfpHeader` for a message without body
    pub fn new(typ: OfpType, xid: u32) -> OfpHeader {
        OfpHeader {
            version: OFP_VERSION,
            typ: typ as u8,
            length: OfpHeader::header_length() as u16,
            xid: xid,
        }
    }

    /// Returns the fixed header length of 8 (in byte)
    pub fn header_length() -> usize {
        8
    }

    /// Returns the body length in byte
    pub fn body_length(&self) -> usize {
        (self.length as usize).saturating_sub(OfpHeader::header_length())
    }

    /// Serializes this header on the given stream
    pub fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        stream.write_all(&[self.version, self.typ])?;
        stream.write_u16::<NetworkEndian>(self.length)?;
        stream.write_u32::<NetworkEndian>(self.xid)
    }
}

/// Width of the wildcard bit count for an IPv4 prefix
fn nw_wildcard_bits(net: &Option<Ipv4Network>) -> u32 {
    match *net {
        Some(ref n) => 32 - n.prefix() as u32,
        None => 32,
    }
}

fn nw_addr(net: &Option<Ipv4Network>) -> u32 {
    match *net {
        Some(ref n) => u32::from(n.network()),
        None => 0,
    }
}

impl OfpMatch {
    /// Constructs a match with all fields wildcarded.
    pub fn new() -> OfpMatch {
        OfpMatch::default()
    }

    /// The OpenFlow 1.0 wildcards field for this match
    pub fn wildcards(&self) -> u32 {
        let mut w = 0;
        if self.in_port.is_none() {
            w |= wildcards::IN_PORT;
        }
        if self.dl_vlan.is_none() {
            w |= wildcards::DL_VLAN;
        }
        if self.dl_src.is_none() {
            w |= wildcards::DL_SRC;
        }
        if self.dl_dst.is_none() {
            w |= wildcards::DL_DST;
        }
        if self.dl_type.is_none() {
            w |= wildcards::DL_TYPE;
        }
        if self.nw_proto.is_none() {
            w |= wildcards::NW_PROTO;
        }
        if self.tp_src.is_none() {
            w |= wildcards::TP_SRC;
        }
        if self.tp_dst.is_none() {
            w |= wildcards::TP_DST;
        }
        w |= nw_wildcard_bits(&self.nw_src) << wildcards::NW_SRC_SHIFT;
        w |= nw_wildcard_bits(&self.nw_dst) << wildcards::NW_DST_SHIFT;
        if self.dl_vlan_pcp.is_none() {
            w |= wildcards::DL_VLAN_PCP;
        }
        if self.nw_tos.is_none() {
            w |= wildcards::NW_TOS;
        }
        w
    }

    /// Serializes the fixed size match structure, wildcarded fields are zeroed
    pub fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        stream.write_u32::<NetworkEndian>(self.wildcards())?;
        stream.write_u16::<NetworkEndian>(self.in_port.unwrap_or(0))?;
        stream.write_all(&self.dl_src.unwrap_or([0; 6]))?;
        stream.write_all(&self.dl_dst.unwrap_or([0; 6]))?;
        stream.write_u16::<NetworkEndian>(self.dl_vlan.unwrap_or(0))?;
        stream.write_all(&[self.dl_vlan_pcp.unwrap_or(0), 0])?;
        stream.write_u16::<NetworkEndian>(self.dl_type.unwrap_or(0))?;
        stream.write_all(&[self.nw_tos.unwrap_or(0), self.nw_proto.unwrap_or(0), 0, 0])?;
        stream.write_u32::<NetworkEndian>(nw_addr(&self.nw_src))?;
        stream.write_u32::<NetworkEndian>(nw_addr(&self.nw_dst))?;
        stream.write_u16::<NetworkEndian>(self.tp_src.unwrap_or(0))?;
        stream.write_u16::<NetworkEndian>(self.tp_dst.unwrap_or(0))
    }
}

impl Action {
    /// The wire length of this action including its header
    pub fn length(&self) -> usize {
        match *self {
            Action::SetDlSrc(_) | Action::SetDlDst(_) | Action::Enqueue { .. } => 16,
            Action::Vendor(_, ref body) => 8 + body.len(),
            _ => 8,
        }
    }

    fn typ(&self) -> OfpActionType {
        match *self {
            Action::Output(_) => OfpActionType::Output,
            Action::SetVlanVid(_) => OfpActionType::SetVlanVid,
            Action::SetVlanPcp(_) => OfpActionType::SetVlanPcp,
            Action::StripVlan => OfpActionType::StripVlan,
            Action::SetDlSrc(_) => OfpActionType::SetDlSrc,
            Action::SetDlDst(_) => OfpActionType::SetDlDst,
            Action::SetNwSrc(_) => OfpActionType::SetNwSrc,
            Action::SetNwDst(_) => OfpActionType::SetNwDst,
            Action::SetNwTos(_) => OfpActionType::SetNwTos,
            Action::SetTpSrc(_) => OfpActionType::SetTpSrc,
            Action::SetTpDst(_) => OfpActionType::SetTpDst,
            Action::Enqueue { .. } => OfpActionType::Enqueue,
            Action::Vendor(..) => OfpActionType::Vendor,
        }
    }

    /// Serializes the action with its type and length header
    pub fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        stream.write_u16::<NetworkEndian>(self.typ() as u16)?;
        stream.write_u16::<NetworkEndian>(self.length() as u16)?;
        match *self {
            Action::Output(ref port) => {
                let max_len = match *port {
                    PseudoPort::Controller(len) => len,
                    _ => 0,
                };
                stream.write_u16::<NetworkEndian>(port.port_no())?;
                stream.write_u16::<NetworkEndian>(max_len)
            }
            Action::SetVlanVid(vid) => {
                stream.write_u16::<NetworkEndian>(vid)?;
                stream.write_all(&[0; 2])
            }
            Action::SetVlanPcp(pcp) => stream.write_all(&[pcp, 0, 0, 0]),
            Action::StripVlan => stream.write_all(&[0; 4]),
            Action::SetDlSrc(ref mac) | Action::SetDlDst(ref mac) => {
                stream.write_all(mac)?;
                stream.write_all(&[0; 6])
            }
            Action::SetNwSrc(ip) | Action::SetNwDst(ip) => stream.write_all(&ip.octets()),
            Action::SetNwTos(tos) => stream.write_all(&[tos, 0, 0, 0]),
            Action::SetTpSrc(port) | Action::SetTpDst(port) => {
                stream.write_u16::<NetworkEndian>(port)?;
                stream.write_all(&[0; 2])
            }
            Action::Enqueue { port, queue_id } => {
                stream.write_u16::<NetworkEndian>(port)?;
                stream.write_all(&[0; 6])?;
                stream.write_u32::<NetworkEndian>(queue_id)
            }
            Action::Vendor(vendor, ref body) => {
                stream.write_u32::<NetworkEndian>(vendor)?;
                stream.write_all(body)
            }
        }
    }

    /// Serializes a list of actions one after another
    pub fn serialize_sequence<S: Write>(actions: &[Action], stream: &mut S) -> io::Result<()> {
        for action in actions {
            action.serialize(stream)?;
        }
        Ok(())
    }
}

impl OfpPhyPort {
    fn serialize<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        let mut name = [0; OFP_MAX_PORT_NAME_LEN];
        // keep at least one terminating NUL
        let len = self.name.len().min(OFP_MAX_PORT_NAME_LEN - 1);
        name[..len].copy_from_slice(&self.name.as_bytes()[..len]);

        stream.write_u16::<NetworkEndian>(self.port_no)?;
        stream.write_all(&self.hw_addr)?;
        stream.write_all(&name)?;
        stream.write_u32::<NetworkEndian>(self.config)?;
        stream.write_u32::<NetworkEndian>(self.state)?;
        stream.write_u32::<NetworkEndian>(self.curr)?;
        stream.write_u32::<NetworkEndian>(self.advertised)?;
        stream.write_u32::<NetworkEndian>(self.supported)?;
        stream.write_u32::<NetworkEndian>(self.peer)
    }
}

/// An OpenFlow message body. Must be implemented for all OpenFlow messsages with a body that are sent.
pub trait OfpPacket {
    /// Serializes this packet's body.
    /// Implementers have to output network byte order on the given stream.
    fn serialize_body<S: Write>(&self, stream: &mut S) -> io::Result<()>;
}

impl OfpEchoRequest {
    /// Constructs a new `OfpEchoRequest` with `arbitrary` content.
    pub fn new(arbitrary: Vec<u8>) -> OfpEchoRequest {
        OfpEchoRequest {
            arbitrary: arbitrary,
        }
    }
}
impl OfpPacket for OfpEchoRequest {
    fn serialize_body<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        stream.write_all(&self.arbitrary)
    }
}

impl OfpEchoReply {
    /// Constructs a new `OfpEchoReply` with `arbitrary` content.
    /// This should be the same as in the `OfpEchoRequest` that issued this reply.
    pub fn new(arbitrary: Vec<u8>) -> OfpEchoReply {
        OfpEchoReply {
            arbitrary: arbitrary,
        }
    }
}
impl OfpPacket for OfpEchoReply {
    fn serialize_body<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        stream.write_all(&self.arbitrary)
    }
}

impl OfpPacket for OfpErrorMsg {
    fn serialize_body<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        stream.write_u16::<NetworkEndian>(self.typ)?;
        stream.write_u16::<NetworkEndian>(self.code)?;
        stream.write_all(&self.data)
    }
}

impl OfpPacket for OfpSwitchFeatures {
    fn serialize_body<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        stream.write_u64::<NetworkEndian>(self.datapath_id)?;
        stream.write_u32::<NetworkEndian>(self.n_buffers)?;
        stream.write_all(&[self.n_tables, 0, 0, 0])?;
        stream.write_u32::<NetworkEndian>(self.capabilities)?;
        stream.write_u32::<NetworkEndian>(self.actions)?;
        for port in &self.ports {
            port.serialize(stream)?;
        }
        Ok(())
    }
}

impl OfpPacket for OfpSwitchConfig {
    fn serialize_body<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        stream.write_u16::<NetworkEndian>(self.flags)?;
        stream.write_u16::<NetworkEndian>(self.miss_send_len)
    }
}

impl OfpPacket for OfpPacketIn {
    fn serialize_body<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        stream.write_u32::<NetworkEndian>(self.buffer_id)?;
        stream.write_u16::<NetworkEndian>(self.total_len)?;
        stream.write_u16::<NetworkEndian>(self.in_port)?;
        stream.write_all(&[self.reason, 0])?;
        stream.write_all(&self.data)
    }
}

impl OfpPacket for OfpFlowRemoved {
    fn serialize_body<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        self.match_field.serialize(stream)?;
        stream.write_u64::<NetworkEndian>(self.cookie)?;
        stream.write_u16::<NetworkEndian>(self.priority)?;
        stream.write_all(&[self.reason, 0])?;
        stream.write_u32::<NetworkEndian>(self.duration_sec)?;
        stream.write_u32::<NetworkEndian>(self.duration_nsec)?;
        stream.write_u16::<NetworkEndian>(self.idle_timeout)?;
        stream.write_all(&[0; 2])?;
        stream.write_u64::<NetworkEndian>(self.packet_count)?;
        stream.write_u64::<NetworkEndian>(self.byte_count)
    }
}

impl OfpPacket for OfpPacketOut {
    fn serialize_body<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        let actions_len: usize = self.actions.iter().map(Action::length).sum();
        stream.write_u32::<NetworkEndian>(self.buffer_id)?;
        stream.write_u16::<NetworkEndian>(self.in_port)?;
        stream.write_u16::<NetworkEndian>(actions_len as u16)?;
        Action::serialize_sequence(&self.actions, stream)?;
        stream.write_all(&self.data)
    }
}

impl OfpFlowMod {
    /// Constructs an `OfpFlowMod` with the given fields.
    /// The other fields are set to permanent, unbuffered and without flags.
    pub fn new(
        command: OfpFlowModCommand,
        priority: u16,
        match_field: OfpMatch,
        actions: Vec<Action>,
    ) -> OfpFlowMod {
        OfpFlowMod {
            match_field: match_field,
            cookie: 0,
            command: command as u16,
            idle_timeout: OFP_FLOW_PERMANENT,
            hard_timeout: OFP_FLOW_PERMANENT,
            priority: priority,
            buffer_id: OFP_NO_BUFFER,
            out_port: OFPP_NONE,
            flags: 0,
            actions: actions,
        }
    }
}

impl OfpPacket for OfpFlowMod {
    fn serialize_body<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        self.match_field.serialize(stream)?;
        stream.write_u64::<NetworkEndian>(self.cookie)?;
        stream.write_u16::<NetworkEndian>(self.command)?;
        stream.write_u16::<NetworkEndian>(self.idle_timeout)?;
        stream.write_u16::<NetworkEndian>(self.hard_timeout)?;
        stream.write_u16::<NetworkEndian>(self.priority)?;
        stream.write_u32::<NetworkEndian>(self.buffer_id)?;
        stream.write_u16::<NetworkEndian>(self.out_port)?;
        stream.write_u16::<NetworkEndian>(self.flags)?;
        Action::serialize_sequence(&self.actions, stream)
    }
}

impl Message {
    fn serialize_body<S: Write>(&self, stream: &mut S) -> io::Result<()> {
        match *self {
            Message::Hello
            | Message::FeaturesRequest
            | Message::GetConfigRequest
            | Message::BarrierRequest
            | Message::BarrierReply => Ok(()),
            Message::Error(ref m) => m.serialize_body(stream),
            Message::EchoRequest(ref m) => m.serialize_body(stream),
            Message::EchoReply(ref m) => m.serialize_body(stream),
            Message::FeaturesReply(ref m) => m.serialize_body(stream),
            Message::GetConfigReply(ref m) | Message::SetConfig(ref m) => m.serialize_body(stream),
            Message::PacketIn(ref m) => m.serialize_body(stream),
            Message::FlowRemoved(ref m) => m.serialize_body(stream),
            Message::PacketOut(ref m) => m.serialize_body(stream),
            Message::FlowMod(ref m) => m.serialize_body(stream),
            Message::Unknown(_, ref body) => stream.write_all(body),
        }
    }

    /// Serializes this message with network byte order.
    /// The xid is used as its header's transaction id.
    pub fn serialize<S: Write>(&self, stream: &mut S, xid: u32) -> io::Result<()> {
        let mut body = vec![];
        self.serialize_body(&mut body)?;
        let length = OfpHeader::header_length() + body.len();
        if length > 0xffff {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("OpenFlow message of {} bytes exceeds the maximum length", length),
            ));
        }
        let header = OfpHeader {
            version: OFP_VERSION,
            typ: self.type_code(),
            length: length as u16,
            xid: xid,
        };
        trace!("Outgoing message: {:?}", header);
        header.serialize(stream)?;
        stream.write_all(&body)
    }
}
