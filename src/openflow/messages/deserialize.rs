/*!
All deserialization routines for the OpenFlow message primitives

The header and the match use a special deserialization because their sizes are known.
Use the trait `Deserialize` for any other deserialization implementation.
*/

use byteorder::{ByteOrder, NetworkEndian};
use ipnetwork::Ipv4Network;
use openflow::error::{Error, Result};
use openflow::messages::*;

use std::net::Ipv4Addr;

impl OfpHeader {
    /// Deserializes an OpenFlow header
    pub fn deserialize(bytes: &[u8; 8]) -> OfpHeader {
        OfpHeader {
            version: bytes[0],
            typ: bytes[1],
            length: NetworkEndian::read_u16(&bytes[2..4]),
            xid: NetworkEndian::read_u32(&bytes[4..]),
        }
    }
}

/// To be implemented by all OpenFlow message parts that are received.
pub trait Deserialize {
    /// The type to deserialize
    type R;

    /// Deserialize the bytes buffer
    /// Fails on providing a too small or too large buffer
    fn deserialize(bytes: Vec<u8>) -> Result<Self::R> {
        if Self::min_length() > bytes.len() || Self::max_length() < bytes.len() {
            return Err(Error::BadRequest(OfpBadRequestCode::BadLen));
        }
        Self::deserialize_len_ok(bytes)
    }

    /// Deserializes the byte buffer (network byte order)
    /// Implementers can rely on the bytes buffer's size to be greater or equal Self::min_length()
    fn deserialize_len_ok(bytes: Vec<u8>) -> Result<Self::R>;

    /// The minimum length of the message part in bytes
    fn min_length() -> usize;

    /// The maximum length of the message part in bytes
    /// May not return a value greater than 0xFFF7
    /// If Self::R is fixed size, you probably have to
    /// override this implementation.
    fn max_length() -> usize {
        0xffff - OfpHeader::header_length()
    }
}

fn read_mac(bytes: &[u8]) -> MacAddr {
    let mut mac = [0; 6];
    mac.copy_from_slice(&bytes[0..6]);
    mac
}

/// Converts an address with an OpenFlow 1.0 wildcard bit count into a prefix.
fn read_nw_addr(addr: u32, wildcard_bits: u32) -> Option<Ipv4Network> {
    if wildcard_bits >= 32 {
        return None;
    }
    let masked = addr & (!0u32 << wildcard_bits);
    Ipv4Network::new(Ipv4Addr::from(masked), (32 - wildcard_bits) as u8).ok()
}

impl OfpMatch {
    /// Deserializes the fixed size match structure.
    /// The slice has to hold at least `OFP_MATCH_LEN` bytes.
    pub fn deserialize(bytes: &[u8]) -> OfpMatch {
        let w = NetworkEndian::read_u32(&bytes[0..4]);
        let exact = |bit: u32| w & bit == 0;
        let nw_bits = |shift: u32| (w >> shift) & ((1 << wildcards::NW_BITS) - 1);

        OfpMatch {
            in_port: if exact(wildcards::IN_PORT) {
                Some(NetworkEndian::read_u16(&bytes[4..6]))
            } else {
                None
            },
            dl_src: if exact(wildcards::DL_SRC) {
                Some(read_mac(&bytes[6..12]))
            } else {
                None
            },
            dl_dst: if exact(wildcards::DL_DST) {
                Some(read_mac(&bytes[12..18]))
            } else {
                None
            },
            dl_vlan: if exact(wildcards::DL_VLAN) {
                Some(NetworkEndian::read_u16(&bytes[18..20]))
            } else {
                None
            },
            dl_vlan_pcp: if exact(wildcards::DL_VLAN_PCP) {
                Some(bytes[20])
            } else {
                None
            },
            // bytes[21] is padding
            dl_type: if exact(wildcards::DL_TYPE) {
                Some(NetworkEndian::read_u16(&bytes[22..24]))
            } else {
                None
            },
            nw_tos: if exact(wildcards::NW_TOS) {
                Some(bytes[24])
            } else {
                None
            },
            nw_proto: if exact(wildcards::NW_PROTO) {
                Some(bytes[25])
            } else {
                None
            },
            // bytes[26..28] is padding
            nw_src: read_nw_addr(
                NetworkEndian::read_u32(&bytes[28..32]),
                nw_bits(wildcards::NW_SRC_SHIFT),
            ),
            nw_dst: read_nw_addr(
                NetworkEndian::read_u32(&bytes[32..36]),
                nw_bits(wildcards::NW_DST_SHIFT),
            ),
            tp_src: if exact(wildcards::TP_SRC) {
                Some(NetworkEndian::read_u16(&bytes[36..38]))
            } else {
                None
            },
            tp_dst: if exact(wildcards::TP_DST) {
                Some(NetworkEndian::read_u16(&bytes[38..40]))
            } else {
                None
            },
        }
    }
}

impl PseudoPort {
    fn deserialize(port: u16, max_len: u16) -> Result<PseudoPort> {
        Ok(match port {
            OFPP_IN_PORT => PseudoPort::InPort,
            OFPP_TABLE => PseudoPort::Table,
            OFPP_NORMAL => PseudoPort::Normal,
            OFPP_FLOOD => PseudoPort::Flood,
            OFPP_ALL => PseudoPort::All,
            OFPP_CONTROLLER => PseudoPort::Controller(max_len),
            OFPP_LOCAL => PseudoPort::Local,
            p if p > 0 && p <= OFPP_MAX => PseudoPort::Physical(p),
            _ => return Err(Error::BadAction(OfpBadActionCode::BadOutPort)),
        })
    }
}

impl Action {
    /// Deserializes a list of actions that fills the whole slice.
    pub fn deserialize_sequence(mut bytes: &[u8]) -> Result<Vec<Action>> {
        let mut actions = vec![];
        while !bytes.is_empty() {
            if bytes.len() < 8 {
                return Err(Error::BadAction(OfpBadActionCode::BadLen));
            }
            let typ = NetworkEndian::read_u16(&bytes[0..2]);
            let len = NetworkEndian::read_u16(&bytes[2..4]) as usize;
            if len < 8 || len % 8 != 0 || len > bytes.len() {
                return Err(Error::BadAction(OfpBadActionCode::BadLen));
            }
            actions.push(Action::deserialize(typ, &bytes[..len])?);
            bytes = &bytes[len..];
        }
        Ok(actions)
    }

    /// Deserializes a single action. `bytes` includes the type and length fields.
    fn deserialize(typ: u16, bytes: &[u8]) -> Result<Action> {
        let expect_len = |len: usize| {
            if bytes.len() == len {
                Ok(())
            } else {
                Err(Error::BadAction(OfpBadActionCode::BadLen))
            }
        };
        let u16_at = |i: usize| NetworkEndian::read_u16(&bytes[i..i + 2]);
        let u32_at = |i: usize| NetworkEndian::read_u32(&bytes[i..i + 4]);

        let action = match typ {
            t if t == OfpActionType::Output as u16 => {
                expect_len(8)?;
                Action::Output(PseudoPort::deserialize(u16_at(4), u16_at(6))?)
            }
            t if t == OfpActionType::SetVlanVid as u16 => {
                expect_len(8)?;
                let vid = u16_at(4);
                if vid > 0xfff {
                    return Err(Error::BadAction(OfpBadActionCode::BadArgument));
                }
                Action::SetVlanVid(vid)
            }
            t if t == OfpActionType::SetVlanPcp as u16 => {
                expect_len(8)?;
                if bytes[4] > 7 {
                    return Err(Error::BadAction(OfpBadActionCode::BadArgument));
                }
                Action::SetVlanPcp(bytes[4])
            }
            t if t == OfpActionType::StripVlan as u16 => {
                expect_len(8)?;
                Action::StripVlan
            }
            t if t == OfpActionType::SetDlSrc as u16 => {
                expect_len(16)?;
                Action::SetDlSrc(read_mac(&bytes[4..10]))
            }
            t if t == OfpActionType::SetDlDst as u16 => {
                expect_len(16)?;
                Action::SetDlDst(read_mac(&bytes[4..10]))
            }
            t if t == OfpActionType::SetNwSrc as u16 => {
                expect_len(8)?;
                Action::SetNwSrc(Ipv4Addr::from(u32_at(4)))
            }
            t if t == OfpActionType::SetNwDst as u16 => {
                expect_len(8)?;
                Action::SetNwDst(Ipv4Addr::from(u32_at(4)))
            }
            t if t == OfpActionType::SetNwTos as u16 => {
                expect_len(8)?;
                Action::SetNwTos(bytes[4])
            }
            t if t == OfpActionType::SetTpSrc as u16 => {
                expect_len(8)?;
                Action::SetTpSrc(u16_at(4))
            }
            t if t == OfpActionType::SetTpDst as u16 => {
                expect_len(8)?;
                Action::SetTpDst(u16_at(4))
            }
            t if t == OfpActionType::Enqueue as u16 => {
                expect_len(16)?;
                Action::Enqueue {
                    port: u16_at(4),
                    queue_id: u32_at(12),
                }
            }
            t if t == OfpActionType::Vendor as u16 => {
                Action::Vendor(u32_at(4), bytes[8..].to_vec())
            }
            _ => return Err(Error::BadAction(OfpBadActionCode::BadType)),
        };
        Ok(action)
    }
}

impl Deserialize for OfpEchoRequest {
    type R = OfpEchoRequest;

    fn deserialize_len_ok(bytes: Vec<u8>) -> Result<Self::R> {
        Ok(OfpEchoRequest { arbitrary: bytes })
    }

    fn min_length() -> usize {
        0
    }
}

impl Deserialize for OfpEchoReply {
    type R = OfpEchoReply;

    fn deserialize_len_ok(bytes: Vec<u8>) -> Result<Self::R> {
        Ok(OfpEchoReply { arbitrary: bytes })
    }

    fn min_length() -> usize {
        0
    }
}

impl Deserialize for OfpErrorMsg {
    type R = OfpErrorMsg;

    fn deserialize_len_ok(bytes: Vec<u8>) -> Result<Self::R> {
        let typ = NetworkEndian::read_u16(&bytes[0..2]);
        let code = NetworkEndian::read_u16(&bytes[2..4]);
        Ok(OfpErrorMsg {
            typ: typ,
            code: code,
            data: bytes[4..].to_vec(),
        })
    }

    fn min_length() -> usize {
        4
    }
}

/// The wire size of `OfpPhyPort`
const OFP_PHY_PORT_LEN: usize = 48;

impl Deserialize for OfpPhyPort {
    type R = OfpPhyPort;

    fn deserialize_len_ok(bytes: Vec<u8>) -> Result<Self::R> {
        let name_bytes = &bytes[8..8 + OFP_MAX_PORT_NAME_LEN];
        let name_len = name_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(OFP_MAX_PORT_NAME_LEN);
        Ok(OfpPhyPort {
            port_no: NetworkEndian::read_u16(&bytes[0..2]),
            hw_addr: read_mac(&bytes[2..8]),
            name: String::from_utf8_lossy(&name_bytes[..name_len]).into_owned(),
            config: NetworkEndian::read_u32(&bytes[24..28]),
            state: NetworkEndian::read_u32(&bytes[28..32]),
            curr: NetworkEndian::read_u32(&bytes[32..36]),
            advertised: NetworkEndian::read_u32(&bytes[36..40]),
            supported: NetworkEndian::read_u32(&bytes[40..44]),
            peer: NetworkEndian::read_u32(&bytes[44..48]),
        })
    }

    fn min_length() -> usize {
        OFP_PHY_PORT_LEN
    }

    fn max_length() -> usize {
        OFP_PHY_PORT_LEN
    }
}

impl Deserialize for OfpSwitchFeatures {
    type R = OfpSwitchFeatures;

    fn deserialize_len_ok(bytes: Vec<u8>) -> Result<Self::R> {
        if (bytes.len() - 24) % OFP_PHY_PORT_LEN != 0 {
            return Err(Error::BadRequest(OfpBadRequestCode::BadLen));
        }
        let mut ports = vec![];
        for port in bytes[24..].chunks(OFP_PHY_PORT_LEN) {
            ports.push(OfpPhyPort::deserialize(port.to_vec())?);
        }
        Ok(OfpSwitchFeatures {
            datapath_id: NetworkEndian::read_u64(&bytes[0..8]),
            n_buffers: NetworkEndian::read_u32(&bytes[8..12]),
            n_tables: bytes[12],
            // bytes[13..16] is padding
            capabilities: NetworkEndian::read_u32(&bytes[16..20]),
            actions: NetworkEndian::read_u32(&bytes[20..24]),
            ports: ports,
        })
    }

    fn min_length() -> usize {
        24
    }
}

impl Deserialize for OfpSwitchConfig {
    type R = OfpSwitchConfig;

    fn deserialize_len_ok(bytes: Vec<u8>) -> Result<Self::R> {
        Ok(OfpSwitchConfig {
            flags: NetworkEndian::read_u16(&bytes[0..2]),
            miss_send_len: NetworkEndian::read_u16(&bytes[2..4]),
        })
    }

    fn min_length() -> usize {
        4
    }

    fn max_length() -> usize {
        4
    }
}

impl Deserialize for OfpPacketIn {
    type R = OfpPacketIn;

    fn deserialize_len_ok(bytes: Vec<u8>) -> Result<Self::R> {
        Ok(OfpPacketIn {
            buffer_id: NetworkEndian::read_u32(&bytes[0..4]),
            total_len: NetworkEndian::read_u16(&bytes[4..6]),
            in_port: NetworkEndian::read_u16(&bytes[6..8]),
            reason: bytes[8],
            // bytes[9] is padding
            data: bytes[10..].to_vec(),
        })
    }

    fn min_length() -> usize {
        10
    }
}

impl Deserialize for OfpFlowRemoved {
    type R = OfpFlowRemoved;

    fn deserialize_len_ok(bytes: Vec<u8>) -> Result<Self::R> {
        let b = &bytes[OFP_MATCH_LEN..];
        Ok(OfpFlowRemoved {
            match_field: OfpMatch::deserialize(&bytes),
            cookie: NetworkEndian::read_u64(&b[0..8]),
            priority: NetworkEndian::read_u16(&b[8..10]),
            reason: b[10],
            duration_sec: NetworkEndian::read_u32(&b[12..16]),
            duration_nsec: NetworkEndian::read_u32(&b[16..20]),
            idle_timeout: NetworkEndian::read_u16(&b[20..22]),
            packet_count: NetworkEndian::read_u64(&b[24..32]),
            byte_count: NetworkEndian::read_u64(&b[32..40]),
        })
    }

    fn min_length() -> usize {
        OFP_MATCH_LEN + 40
    }

    fn max_length() -> usize {
        OFP_MATCH_LEN + 40
    }
}

impl Deserialize for OfpPacketOut {
    type R = OfpPacketOut;

    fn deserialize_len_ok(bytes: Vec<u8>) -> Result<Self::R> {
        let actions_len = NetworkEndian::read_u16(&bytes[6..8]) as usize;
        if 8 + actions_len > bytes.len() {
            return Err(Error::BadRequest(OfpBadRequestCode::BadLen));
        }
        Ok(OfpPacketOut {
            buffer_id: NetworkEndian::read_u32(&bytes[0..4]),
            in_port: NetworkEndian::read_u16(&bytes[4..6]),
            actions: Action::deserialize_sequence(&bytes[8..8 + actions_len])?,
            data: bytes[8 + actions_len..].to_vec(),
        })
    }

    fn min_length() -> usize {
        8
    }
}

impl Deserialize for OfpFlowMod {
    type R = OfpFlowMod;

    fn deserialize_len_ok(bytes: Vec<u8>) -> Result<Self::R> {
        let b = &bytes[OFP_MATCH_LEN..];
        Ok(OfpFlowMod {
            match_field: OfpMatch::deserialize(&bytes),
            cookie: NetworkEndian::read_u64(&b[0..8]),
            command: NetworkEndian::read_u16(&b[8..10]),
            idle_timeout: NetworkEndian::read_u16(&b[10..12]),
            hard_timeout: NetworkEndian::read_u16(&b[12..14]),
            priority: NetworkEndian::read_u16(&b[14..16]),
            buffer_id: NetworkEndian::read_u32(&b[16..20]),
            out_port: NetworkEndian::read_u16(&b[20..22]),
            flags: NetworkEndian::read_u16(&b[22..24]),
            actions: Action::deserialize_sequence(&b[24..])?,
        })
    }

    fn min_length() -> usize {
        OFP_FLOW_MOD_LEN
    }
}

impl Message {
    /// Decodes a message body according to its header's type.
    /// The header's version is not checked here.
    pub fn deserialize(header: &OfpHeader, body: Vec<u8>) -> Result<Message> {
        let t = header.typ();
        let msg = if t == OfpType::Hello as u8 {
            // OpenFlow 1.0 ignores any Hello body
            Message::Hello
        } else if t == OfpType::Error as u8 {
            Message::Error(OfpErrorMsg::deserialize(body)?)
        } else if t == OfpType::EchoRequest as u8 {
            Message::EchoRequest(OfpEchoRequest::deserialize(body)?)
        } else if t == OfpType::EchoReply as u8 {
            Message::EchoReply(OfpEchoReply::deserialize(body)?)
        } else if t == OfpType::FeaturesRequest as u8 {
            Message::FeaturesRequest
        } else if t == OfpType::FeaturesReply as u8 {
            Message::FeaturesReply(OfpSwitchFeatures::deserialize(body)?)
        } else if t == OfpType::GetConfigRequest as u8 {
            Message::GetConfigRequest
        } else if t == OfpType::GetConfigReply as u8 {
            Message::GetConfigReply(OfpSwitchConfig::deserialize(body)?)
        } else if t == OfpType::SetConfig as u8 {
            Message::SetConfig(OfpSwitchConfig::deserialize(body)?)
        } else if t == OfpType::PacketIn as u8 {
            Message::PacketIn(OfpPacketIn::deserialize(body)?)
        } else if t == OfpType::FlowRemoved as u8 {
            Message::FlowRemoved(OfpFlowRemoved::deserialize(body)?)
        } else if t == OfpType::PacketOut as u8 {
            Message::PacketOut(OfpPacketOut::deserialize(body)?)
        } else if t == OfpType::FlowMod as u8 {
            Message::FlowMod(OfpFlowMod::deserialize(body)?)
        } else if t == OfpType::BarrierRequest as u8 {
            Message::BarrierRequest
        } else if t == OfpType::BarrierReply as u8 {
            Message::BarrierReply
        } else {
            Message::Unknown(t, body)
        };
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_deserialization() {
        let expected = OfpHeader {
            version: 1,
            typ: 14,
            length: 0x5234,
            xid: 0x12345678,
        };
        let bytes = [1, 14, 0x52, 0x34, 0x12, 0x34, 0x56, 0x78];
        assert_eq!(expected, OfpHeader::deserialize(&bytes));
    }

    #[test]
    fn min_lengths() {
        assert_eq!(0, OfpEchoRequest::min_length());
        assert_eq!(24, OfpSwitchFeatures::min_length());
        assert_eq!(4, OfpErrorMsg::min_length());
        assert_eq!(64, OfpFlowMod::min_length());
        assert_eq!(80, OfpFlowRemoved::min_length());
    }

    #[test]
    fn max_lengths() {
        assert_eq!(0xFFF7, OfpEchoRequest::max_length());
        assert_eq!(4, OfpSwitchConfig::max_length());
        assert_eq!(0xFFF7, OfpPacketOut::max_length());
    }

    #[test]
    fn match_all_wildcards() {
        let mut bytes = vec![0; OFP_MATCH_LEN];
        NetworkEndian::write_u32(&mut bytes[0..4], 0x003f_ffff);
        assert_eq!(OfpMatch::default(), OfpMatch::deserialize(&bytes));
    }

    #[test]
    fn match_nw_wildcard_bits_become_prefix() {
        let mut bytes = vec![0; OFP_MATCH_LEN];
        // everything but nw_src wildcarded, 8 wildcard bits on nw_src
        let w = 0x003f_ffff & !(0x3f << wildcards::NW_SRC_SHIFT) | (8 << wildcards::NW_SRC_SHIFT);
        NetworkEndian::write_u32(&mut bytes[0..4], w);
        bytes[28..32].copy_from_slice(&[10, 1, 2, 3]);
        let m = OfpMatch::deserialize(&bytes);
        let net = m.nw_src.unwrap();
        assert_eq!(Ipv4Addr::new(10, 1, 2, 0), net.network());
        assert_eq!(24, net.prefix());
        assert_eq!(None, m.nw_dst);
    }

    #[test]
    fn output_action() {
        let bytes = [0, 0, 0, 8, 0, 2, 0, 0];
        let actions = Action::deserialize_sequence(&bytes).unwrap();
        assert_eq!(vec![Action::Output(PseudoPort::Physical(2))], actions);
    }

    #[test]
    fn controller_action_keeps_max_len() {
        let bytes = [0, 0, 0, 8, 0xff, 0xfd, 0, 128];
        let actions = Action::deserialize_sequence(&bytes).unwrap();
        assert_eq!(vec![Action::Output(PseudoPort::Controller(128))], actions);
    }

    #[test]
    fn action_with_bad_length() {
        let bytes = [0, 0, 0, 12, 0, 2, 0, 0, 0, 0, 0, 0];
        match Action::deserialize_sequence(&bytes) {
            Err(Error::BadAction(OfpBadActionCode::BadLen)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_action_type() {
        let bytes = [0, 42, 0, 8, 0, 0, 0, 0];
        match Action::deserialize_sequence(&bytes) {
            Err(Error::BadAction(OfpBadActionCode::BadType)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn packet_out_with_inline_data() {
        let mut body = vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0, 8];
        body.extend_from_slice(&[0, 0, 0, 8, 0xff, 0xfb, 0, 0]);
        body.extend_from_slice(&[1, 2, 3]);
        let po = OfpPacketOut::deserialize(body).unwrap();
        assert_eq!(OFP_NO_BUFFER, po.buffer_id);
        assert_eq!(OFPP_NONE, po.in_port);
        assert_eq!(vec![Action::Output(PseudoPort::Flood)], po.actions);
        assert_eq!(vec![1, 2, 3], po.data);
    }

    #[test]
    fn packet_out_actions_len_too_large() {
        let body = vec![0, 0, 0, 1, 0, 1, 0, 16, 0, 0, 0, 8];
        match OfpPacketOut::deserialize(body) {
            Err(Error::BadRequest(OfpBadRequestCode::BadLen)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn flow_mod_too_short() {
        match OfpFlowMod::deserialize(vec![0; 63]) {
            Err(Error::BadRequest(OfpBadRequestCode::BadLen)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_message_type_is_kept() {
        let header = OfpHeader::deserialize(&[1, 16, 0, 12, 0, 0, 0, 7]);
        let msg = Message::deserialize(&header, vec![0, 1, 0, 0]).unwrap();
        assert_eq!(Message::Unknown(16, vec![0, 1, 0, 0]), msg);
    }
}
