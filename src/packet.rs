/*!
Ethernet frames as the datapath sees them

A `Packet` owns the raw bytes of one frame. Header fields are read on demand
(`Packet::flow_key`) and rewritten in place by the `set_*` methods, so the
serialized form is always just the byte buffer. Cloning a packet is a deep
copy of its bytes.

Supported headers are Ethernet II, one 802.1Q tag, ARP, IPv4, TCP, UDP and
ICMP. Setting a field that the frame does not carry leaves the frame unchanged.
*/

use byteorder::{ByteOrder, NetworkEndian};

use std::fmt;
use std::net::Ipv4Addr;

/// An Ethernet hardware address
pub type MacAddr = [u8; 6];

const ETH_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;

pub const ETH_TYPE_IPV4: u16 = 0x0800;
pub const ETH_TYPE_ARP: u16 = 0x0806;
pub const ETH_TYPE_VLAN: u16 = 0x8100;
/// `dl_type` of 802.3 frames without an Ethernet II type field.
pub const DL_TYPE_NOT_ETH_TYPE: u16 = 0x05ff;

pub const IP_PROTO_ICMP: u8 = 1;
pub const IP_PROTO_TCP: u8 = 6;
pub const IP_PROTO_UDP: u8 = 17;

/// `dl_vlan` of frames without 802.1Q header.
pub const VLAN_NONE: u16 = 0xffff;

/// The header fields of a packet an OpenFlow 1.0 match can look at.
///
/// Fields the frame does not carry are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowKey {
    pub in_port: u16,
    pub dl_src: Option<MacAddr>,
    pub dl_dst: Option<MacAddr>,
    pub dl_vlan: Option<u16>,
    pub dl_vlan_pcp: Option<u8>,
    pub dl_type: Option<u16>,
    pub nw_tos: Option<u8>,
    pub nw_proto: Option<u8>,
    pub nw_src: Option<Ipv4Addr>,
    pub nw_dst: Option<Ipv4Addr>,
    pub tp_src: Option<u16>,
    pub tp_dst: Option<u16>,
}

/// A single Ethernet frame
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    data: Vec<u8>,
}

impl Packet {
    /// Wraps raw frame bytes, e.g. as received from a port or a controller.
    pub fn from_bytes(data: Vec<u8>) -> Packet {
        Packet { data: data }
    }

    /// The frame length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The serialized frame
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// At most the first `max_len` bytes of the serialized frame
    pub fn truncated(&self, max_len: usize) -> Vec<u8> {
        let len = self.data.len().min(max_len);
        self.data[..len].to_vec()
    }

    fn u16_at(&self, offset: usize) -> u16 {
        NetworkEndian::read_u16(&self.data[offset..offset + 2])
    }

    fn mac_at(&self, offset: usize) -> MacAddr {
        let mut mac = [0; 6];
        mac.copy_from_slice(&self.data[offset..offset + 6]);
        mac
    }

    fn ipv4_at(&self, offset: usize) -> Ipv4Addr {
        Ipv4Addr::from(NetworkEndian::read_u32(&self.data[offset..offset + 4]))
    }

    fn is_tagged(&self) -> bool {
        self.data.len() >= ETH_HEADER_LEN + VLAN_TAG_LEN && self.u16_at(12) == ETH_TYPE_VLAN
    }

    /// Offset of the ethertype field
    fn type_offset(&self) -> Option<usize> {
        if self.data.len() < ETH_HEADER_LEN {
            None
        } else if self.is_tagged() {
            Some(12 + VLAN_TAG_LEN)
        } else {
            Some(12)
        }
    }

    fn ethertype(&self) -> Option<u16> {
        self.type_offset().map(|o| self.u16_at(o))
    }

    /// Offset and header length of a complete IPv4 header
    fn ipv4_header(&self) -> Option<(usize, usize)> {
        let l3 = self.type_offset()? + 2;
        if self.ethertype() != Some(ETH_TYPE_IPV4) || self.data.len() < l3 + 20 {
            return None;
        }
        let ihl = (self.data[l3] & 0x0f) as usize * 4;
        if ihl < 20 || self.data.len() < l3 + ihl {
            return None;
        }
        Some((l3, ihl))
    }

    /// Offset of the transport header of an unfragmented (or first fragment) IPv4 packet
    fn l4_offset(&self) -> Option<(usize, u8)> {
        let (l3, ihl) = self.ipv4_header()?;
        let frag_offset = self.u16_at(l3 + 6) & 0x1fff;
        if frag_offset != 0 {
            return None;
        }
        Some((l3 + ihl, self.data[l3 + 9]))
    }

    /// Offset of the TCP/UDP checksum field, if the packet has one in use
    fn l4_checksum_offset(&self) -> Option<usize> {
        let (l4, proto) = self.l4_offset()?;
        match proto {
            IP_PROTO_TCP if self.data.len() >= l4 + 18 => Some(l4 + 16),
            // a zero UDP checksum means the sender did not compute one
            IP_PROTO_UDP if self.data.len() >= l4 + 8 && self.u16_at(l4 + 6) != 0 => Some(l4 + 6),
            _ => None,
        }
    }

    /// Extracts the header fields for flow table lookups.
    pub fn flow_key(&self, in_port: u16) -> FlowKey {
        let mut key = FlowKey {
            in_port: in_port,
            ..FlowKey::default()
        };
        if self.data.len() < ETH_HEADER_LEN {
            return key;
        }
        key.dl_dst = Some(self.mac_at(0));
        key.dl_src = Some(self.mac_at(6));
        if self.is_tagged() {
            let tci = self.u16_at(14);
            key.dl_vlan = Some(tci & 0x0fff);
            key.dl_vlan_pcp = Some((tci >> 13) as u8);
        } else {
            key.dl_vlan = Some(VLAN_NONE);
            key.dl_vlan_pcp = Some(0);
        }
        let typ = match self.ethertype() {
            Some(t) if t < 0x0600 => DL_TYPE_NOT_ETH_TYPE,
            Some(t) => t,
            None => return key,
        };
        key.dl_type = Some(typ);

        let l3 = self.type_offset().unwrap_or(12) + 2;
        if typ == ETH_TYPE_ARP && self.data.len() >= l3 + 28 {
            key.nw_proto = Some(self.u16_at(l3 + 6) as u8);
            key.nw_src = Some(self.ipv4_at(l3 + 14));
            key.nw_dst = Some(self.ipv4_at(l3 + 24));
        } else if let Some((l3, _)) = self.ipv4_header() {
            key.nw_tos = Some(self.data[l3 + 1] & 0xfc);
            key.nw_proto = Some(self.data[l3 + 9]);
            key.nw_src = Some(self.ipv4_at(l3 + 12));
            key.nw_dst = Some(self.ipv4_at(l3 + 16));
            if let Some((l4, proto)) = self.l4_offset() {
                match proto {
                    IP_PROTO_TCP | IP_PROTO_UDP if self.data.len() >= l4 + 4 => {
                        key.tp_src = Some(self.u16_at(l4));
                        key.tp_dst = Some(self.u16_at(l4 + 2));
                    }
                    IP_PROTO_ICMP if self.data.len() >= l4 + 2 => {
                        key.tp_src = Some(self.data[l4] as u16);
                        key.tp_dst = Some(self.data[l4 + 1] as u16);
                    }
                    _ => {}
                }
            }
        }
        key
    }

    pub fn set_dl_src(&mut self, mac: &MacAddr) {
        if self.data.len() >= ETH_HEADER_LEN {
            self.data[6..12].copy_from_slice(mac);
        }
    }

    pub fn set_dl_dst(&mut self, mac: &MacAddr) {
        if self.data.len() >= ETH_HEADER_LEN {
            self.data[0..6].copy_from_slice(mac);
        }
    }

    /// Rewrites the 802.1Q tag control information, adding a tag if there is none.
    fn update_tci<F: Fn(u16) -> u16>(&mut self, f: F) {
        if self.data.len() < ETH_HEADER_LEN {
            return;
        }
        if !self.is_tagged() {
            let tag = [0x81, 0x00, 0, 0];
            let tail = self.data.split_off(12);
            self.data.extend_from_slice(&tag);
            self.data.extend_from_slice(&tail);
        }
        let tci = f(self.u16_at(14));
        NetworkEndian::write_u16(&mut self.data[14..16], tci);
    }

    pub fn set_vlan_vid(&mut self, vid: u16) {
        self.update_tci(|tci| (tci & 0xf000) | (vid & 0x0fff));
    }

    pub fn set_vlan_pcp(&mut self, pcp: u8) {
        self.update_tci(|tci| (tci & 0x1fff) | ((pcp as u16 & 0x7) << 13));
    }

    pub fn strip_vlan(&mut self) {
        if self.is_tagged() {
            self.data.drain(12..12 + VLAN_TAG_LEN);
        }
    }

    fn refresh_ipv4_checksum(&mut self, l3: usize, ihl: usize) {
        NetworkEndian::write_u16(&mut self.data[l3 + 10..l3 + 12], 0);
        let csum = checksum(&self.data[l3..l3 + ihl]);
        NetworkEndian::write_u16(&mut self.data[l3 + 10..l3 + 12], csum);
    }

    /// Replaces a 16 bit word covered by the transport checksum
    fn replace_l4_word(&mut self, offset: usize, new: u16) {
        let old = self.u16_at(offset);
        NetworkEndian::write_u16(&mut self.data[offset..offset + 2], new);
        if let Some(c) = self.l4_checksum_offset() {
            let mut csum = checksum_adjust(self.u16_at(c), old, new);
            if csum == 0 && self.l4_offset().map(|(_, p)| p) == Some(IP_PROTO_UDP) {
                csum = 0xffff;
            }
            NetworkEndian::write_u16(&mut self.data[c..c + 2], csum);
        }
    }

    fn set_nw_addr(&mut self, field_offset: usize, addr: Ipv4Addr) {
        if let Some((l3, ihl)) = self.ipv4_header() {
            let offset = l3 + field_offset;
            let new = u32::from(addr);
            self.replace_l4_word(offset, (new >> 16) as u16);
            self.replace_l4_word(offset + 2, new as u16);
            self.refresh_ipv4_checksum(l3, ihl);
        }
    }

    pub fn set_nw_src(&mut self, addr: Ipv4Addr) {
        self.set_nw_addr(12, addr);
    }

    pub fn set_nw_dst(&mut self, addr: Ipv4Addr) {
        self.set_nw_addr(16, addr);
    }

    /// Sets the DSCP bits, the ECN bits are kept
    pub fn set_nw_tos(&mut self, tos: u8) {
        if let Some((l3, ihl)) = self.ipv4_header() {
            self.data[l3 + 1] = (tos & 0xfc) | (self.data[l3 + 1] & 0x03);
            self.refresh_ipv4_checksum(l3, ihl);
        }
    }

    fn set_tp_port(&mut self, field_offset: usize, port: u16) {
        if let Some((l4, proto)) = self.l4_offset() {
            let is_tp = proto == IP_PROTO_TCP || proto == IP_PROTO_UDP;
            if is_tp && self.data.len() >= l4 + 4 {
                self.replace_l4_word(l4 + field_offset, port);
            }
        }
    }

    pub fn set_tp_src(&mut self, port: u16) {
        self.set_tp_port(0, port);
    }

    pub fn set_tp_dst(&mut self, port: u16) {
        self.set_tp_port(2, port);
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let key = self.flow_key(0);
        match (key.nw_src, key.nw_dst) {
            (Some(src), Some(dst)) => write!(
                f,
                "{} -> {} proto {} ({} bytes)",
                src,
                dst,
                key.nw_proto.unwrap_or(0),
                self.len()
            ),
            _ => match key.dl_type {
                Some(t) => write!(f, "ethertype {:#06x} ({} bytes)", t, self.len()),
                None => write!(f, "runt frame ({} bytes)", self.len()),
            },
        }
    }
}

/// The internet checksum of `data`
fn checksum(data: &[u8]) -> u16 {
    let mut sum = 0u32;
    for chunk in data.chunks(2) {
        let word = if chunk.len() == 2 {
            NetworkEndian::read_u16(chunk)
        } else {
            (chunk[0] as u16) << 8
        };
        sum += word as u32;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// Incremental checksum update for one replaced 16 bit word (RFC 1624, eqn. 3)
fn checksum_adjust(csum: u16, old: u16, new: u16) -> u16 {
    let mut sum = (!csum as u32) + (!old as u32) + new as u32;
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

/// Frame builders shared by the unit tests of the whole crate
#[cfg(test)]
pub mod tests {
    use super::*;

    pub const SRC_MAC: MacAddr = [0x02, 0, 0, 0, 0, 0x01];
    pub const DST_MAC: MacAddr = [0x02, 0, 0, 0, 0, 0x02];

    /// An untagged IPv4 frame with a transport header of `l4` bytes
    fn ipv4_frame(proto: u8, l4: &[u8]) -> Vec<u8> {
        let mut f = vec![];
        f.extend_from_slice(&DST_MAC);
        f.extend_from_slice(&SRC_MAC);
        f.extend_from_slice(&[0x08, 0x00]);
        let total_len = 20 + l4.len() as u16;
        let mut ip = vec![
            0x45, 0x10, (total_len >> 8) as u8, total_len as u8, 0, 1, 0, 0, 64, proto, 0, 0,
            10, 0, 0, 1, 10, 0, 0, 2,
        ];
        let csum = checksum(&ip);
        NetworkEndian::write_u16(&mut ip[10..12], csum);
        f.extend_from_slice(&ip);
        f.extend_from_slice(l4);
        f
    }

    /// Ones' complement sum over the pseudo header and the transport segment
    fn l4_checksum(frame: &[u8], proto: u8) -> u16 {
        let l4 = &frame[34..];
        let mut pseudo = vec![];
        pseudo.extend_from_slice(&frame[26..34]);
        pseudo.extend_from_slice(&[0, proto, (l4.len() >> 8) as u8, l4.len() as u8]);
        pseudo.extend_from_slice(l4);
        checksum(&pseudo)
    }

    /// A TCP segment from 10.0.0.1:`src_port` to 10.0.0.2:`dst_port`
    /// with a correct checksum and a four byte payload
    pub fn tcp_frame(src_port: u16, dst_port: u16) -> Packet {
        let mut tcp = vec![0; 24];
        NetworkEndian::write_u16(&mut tcp[0..2], src_port);
        NetworkEndian::write_u16(&mut tcp[2..4], dst_port);
        tcp[12] = 5 << 4;
        tcp[20..24].copy_from_slice(b"ping");
        let mut frame = ipv4_frame(IP_PROTO_TCP, &tcp);
        let csum = l4_checksum(&frame, IP_PROTO_TCP);
        NetworkEndian::write_u16(&mut frame[50..52], csum);
        Packet::from_bytes(frame)
    }

    /// A UDP datagram from 10.0.0.1:`src_port` to 10.0.0.2:`dst_port`
    pub fn udp_frame(src_port: u16, dst_port: u16) -> Packet {
        let mut udp = vec![0; 12];
        NetworkEndian::write_u16(&mut udp[0..2], src_port);
        NetworkEndian::write_u16(&mut udp[2..4], dst_port);
        NetworkEndian::write_u16(&mut udp[4..6], 12);
        udp[8..12].copy_from_slice(b"pong");
        let mut frame = ipv4_frame(IP_PROTO_UDP, &udp);
        let csum = l4_checksum(&frame, IP_PROTO_UDP);
        NetworkEndian::write_u16(&mut frame[40..42], csum);
        Packet::from_bytes(frame)
    }

    /// An ARP request for 10.0.0.2 from 10.0.0.1
    pub fn arp_frame() -> Packet {
        let mut f = vec![];
        f.extend_from_slice(&[0xff; 6]);
        f.extend_from_slice(&SRC_MAC);
        f.extend_from_slice(&[0x08, 0x06]);
        f.extend_from_slice(&[0, 1, 0x08, 0x00, 6, 4, 0, 1]);
        f.extend_from_slice(&SRC_MAC);
        f.extend_from_slice(&[10, 0, 0, 1]);
        f.extend_from_slice(&[0; 6]);
        f.extend_from_slice(&[10, 0, 0, 2]);
        Packet::from_bytes(f)
    }

    #[test]
    fn tcp_flow_key() {
        let key = tcp_frame(1234, 80).flow_key(3);
        assert_eq!(3, key.in_port);
        assert_eq!(Some(SRC_MAC), key.dl_src);
        assert_eq!(Some(DST_MAC), key.dl_dst);
        assert_eq!(Some(VLAN_NONE), key.dl_vlan);
        assert_eq!(Some(ETH_TYPE_IPV4), key.dl_type);
        assert_eq!(Some(0x10), key.nw_tos);
        assert_eq!(Some(IP_PROTO_TCP), key.nw_proto);
        assert_eq!(Some(Ipv4Addr::new(10, 0, 0, 1)), key.nw_src);
        assert_eq!(Some(Ipv4Addr::new(10, 0, 0, 2)), key.nw_dst);
        assert_eq!(Some(1234), key.tp_src);
        assert_eq!(Some(80), key.tp_dst);
    }

    #[test]
    fn arp_flow_key() {
        let key = arp_frame().flow_key(1);
        assert_eq!(Some(ETH_TYPE_ARP), key.dl_type);
        assert_eq!(Some(1), key.nw_proto);
        assert_eq!(Some(Ipv4Addr::new(10, 0, 0, 1)), key.nw_src);
        assert_eq!(Some(Ipv4Addr::new(10, 0, 0, 2)), key.nw_dst);
        assert_eq!(None, key.tp_src);
    }

    #[test]
    fn runt_frame_has_only_in_port() {
        let key = Packet::from_bytes(vec![1, 2, 3]).flow_key(7);
        assert_eq!(FlowKey { in_port: 7, ..FlowKey::default() }, key);
    }

    #[test]
    fn vlan_tag_push_and_strip() {
        let original = tcp_frame(1, 2);
        let mut p = original.clone();
        p.set_vlan_vid(42);
        p.set_vlan_pcp(5);
        assert_eq!(original.len() + 4, p.len());
        let key = p.flow_key(1);
        assert_eq!(Some(42), key.dl_vlan);
        assert_eq!(Some(5), key.dl_vlan_pcp);
        assert_eq!(Some(2), key.tp_dst);
        p.strip_vlan();
        assert_eq!(original, p);
    }

    #[test]
    fn nw_rewrite_keeps_checksums_valid() {
        let mut p = tcp_frame(1234, 80);
        p.set_nw_dst(Ipv4Addr::new(192, 0, 2, 99));
        p.set_tp_dst(8080);
        let key = p.flow_key(1);
        assert_eq!(Some(Ipv4Addr::new(192, 0, 2, 99)), key.nw_dst);
        assert_eq!(Some(8080), key.tp_dst);
        // a header including its correct checksum sums up to zero
        assert_eq!(0, checksum(&p.as_bytes()[14..34]));
        assert_eq!(0, l4_checksum(p.as_bytes(), IP_PROTO_TCP));
    }

    #[test]
    fn udp_port_rewrite_keeps_checksum_valid() {
        let mut p = udp_frame(5000, 53);
        p.set_tp_src(6000);
        assert_eq!(Some(6000), p.flow_key(1).tp_src);
        assert_eq!(0, l4_checksum(p.as_bytes(), IP_PROTO_UDP));
    }

    #[test]
    fn tos_keeps_ecn_bits() {
        let mut p = tcp_frame(1, 2);
        p.set_nw_tos(0xff);
        assert_eq!(Some(0xfc), p.flow_key(1).nw_tos);
        assert_eq!(0x10 & 0x03, p.as_bytes()[15] & 0x03);
        assert_eq!(0, checksum(&p.as_bytes()[14..34]));
    }

    #[test]
    fn nw_fields_are_ignored_on_arp() {
        let original = arp_frame();
        let mut p = original.clone();
        p.set_nw_src(Ipv4Addr::new(1, 2, 3, 4));
        p.set_tp_dst(9);
        assert_eq!(original, p);
    }

    #[test]
    fn truncation() {
        let p = tcp_frame(1, 2);
        assert_eq!(p.as_bytes()[..20].to_vec(), p.truncated(20));
        assert_eq!(p.len(), p.truncated(1500).len());
    }
}
