/*!
The flow table and the matching semantics of `OfpMatch`

Entries are kept sorted by priority, highest first. Entries of equal
priority keep their insertion order, so the first matching entry of a
linear scan is the one that applies to a packet.
*/

use ipnetwork::Ipv4Network;
use openflow::messages::*;
use packet::{FlowKey, Packet};

use std::error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::Ipv4Addr;
use std::result;
use std::slice;
use std::time::{Duration, Instant};

#[derive(Debug, PartialEq)]
pub enum Error {
    /// An entry of the same priority overlaps the one to be inserted
    Overlap { priority: u16 },
}

impl error::Error for Error {
    fn description(&self) -> &str {
        "overlapping flow entry"
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Overlap { priority } => write!(
                f,
                "An overlapping flow entry with priority {} is already installed",
                priority
            ),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

fn field_matches<T: PartialEq>(pattern: Option<T>, value: Option<T>) -> bool {
    match pattern {
        None => true,
        Some(p) => value == Some(p),
    }
}

fn fields_overlap<T: PartialEq>(a: Option<T>, b: Option<T>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

fn nw_matches(net: Option<Ipv4Network>, addr: Option<Ipv4Addr>) -> bool {
    match (net, addr) {
        (None, _) => true,
        (Some(net), Some(addr)) => net.contains(addr),
        (Some(_), None) => false,
    }
}

fn nw_overlaps(a: Option<Ipv4Network>, b: Option<Ipv4Network>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.contains(b.network()) || b.contains(a.network()),
        _ => true,
    }
}

impl OfpMatch {
    /// Whether a packet with these header fields satisfies the match
    pub fn matches(&self, key: &FlowKey) -> bool {
        field_matches(self.in_port, Some(key.in_port))
            && field_matches(self.dl_src, key.dl_src)
            && field_matches(self.dl_dst, key.dl_dst)
            && field_matches(self.dl_vlan, key.dl_vlan)
            && field_matches(self.dl_vlan_pcp, key.dl_vlan_pcp)
            && field_matches(self.dl_type, key.dl_type)
            && field_matches(self.nw_tos, key.nw_tos)
            && field_matches(self.nw_proto, key.nw_proto)
            && nw_matches(self.nw_src, key.nw_src)
            && nw_matches(self.nw_dst, key.nw_dst)
            && field_matches(self.tp_src, key.tp_src)
            && field_matches(self.tp_dst, key.tp_dst)
    }

    /// Whether some packet could satisfy both matches.
    /// If `strict` is set, the matches have to be equal instead.
    pub fn overlaps_with(&self, other: &OfpMatch, strict: bool) -> bool {
        if strict {
            return self == other;
        }
        fields_overlap(self.in_port, other.in_port)
            && fields_overlap(self.dl_src, other.dl_src)
            && fields_overlap(self.dl_dst, other.dl_dst)
            && fields_overlap(self.dl_vlan, other.dl_vlan)
            && fields_overlap(self.dl_vlan_pcp, other.dl_vlan_pcp)
            && fields_overlap(self.dl_type, other.dl_type)
            && fields_overlap(self.nw_tos, other.nw_tos)
            && fields_overlap(self.nw_proto, other.nw_proto)
            && nw_overlaps(self.nw_src, other.nw_src)
            && nw_overlaps(self.nw_dst, other.nw_dst)
            && fields_overlap(self.tp_src, other.tp_src)
            && fields_overlap(self.tp_dst, other.tp_dst)
    }
}

fn elapsed(since: Instant, now: Instant) -> Duration {
    if now > since {
        now - since
    } else {
        Duration::from_secs(0)
    }
}

/// An installed flow
///
/// Two entries are the same flow if their cookies are equal.
#[derive(Debug, Clone)]
pub struct FlowEntry {
    pub match_field: OfpMatch,
    pub priority: u16,
    pub cookie: u64,
    /// Seconds without a matching packet until the entry expires, 0 for never
    pub idle_timeout: u16,
    /// Seconds after installation until the entry expires, 0 for never
    pub hard_timeout: u16,
    pub actions: Vec<Action>,
    /// Bitmap of OFPFF_* flags
    pub flags: u16,
    pub packet_count: u64,
    pub byte_count: u64,
    pub installed: Instant,
    pub last_matched: Instant,
}

impl FlowEntry {
    pub fn from_flow_mod(flow_mod: &OfpFlowMod, now: Instant) -> FlowEntry {
        FlowEntry {
            match_field: flow_mod.match_field.clone(),
            priority: flow_mod.priority,
            cookie: flow_mod.cookie,
            idle_timeout: flow_mod.idle_timeout,
            hard_timeout: flow_mod.hard_timeout,
            actions: flow_mod.actions.clone(),
            flags: flow_mod.flags,
            packet_count: 0,
            byte_count: 0,
            installed: now,
            last_matched: now,
        }
    }

    /// Whether the controllers want to know when this entry is removed
    pub fn sends_flow_removed(&self) -> bool {
        self.flags & OFPFF_SEND_FLOW_REM != 0
    }

    fn outputs_to(&self, port: u16) -> bool {
        self.actions.iter().any(|a| match *a {
            Action::Output(ref p) => p.port_no() == port,
            _ => false,
        })
    }

    fn expiry(&self, now: Instant) -> Option<OfpFlowRemovedReason> {
        let hard = Duration::from_secs(self.hard_timeout as u64);
        let idle = Duration::from_secs(self.idle_timeout as u64);
        if self.hard_timeout != OFP_FLOW_PERMANENT && elapsed(self.installed, now) >= hard {
            Some(OfpFlowRemovedReason::HardTimeout)
        } else if self.idle_timeout != OFP_FLOW_PERMANENT
            && elapsed(self.last_matched, now) >= idle
        {
            Some(OfpFlowRemovedReason::IdleTimeout)
        } else {
            None
        }
    }

    /// The Flow-Removed message announcing the removal of this entry
    pub fn flow_removed(&self, reason: OfpFlowRemovedReason, now: Instant) -> OfpFlowRemoved {
        let duration = elapsed(self.installed, now);
        OfpFlowRemoved {
            match_field: self.match_field.clone(),
            cookie: self.cookie,
            priority: self.priority,
            reason: reason as u8,
            duration_sec: duration.as_secs() as u32,
            duration_nsec: duration.subsec_nanos(),
            idle_timeout: self.idle_timeout,
            packet_count: self.packet_count,
            byte_count: self.byte_count,
        }
    }
}

impl PartialEq for FlowEntry {
    fn eq(&self, other: &FlowEntry) -> bool {
        self.cookie == other.cookie
    }
}

impl Eq for FlowEntry {}

impl Hash for FlowEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cookie.hash(state);
    }
}

/// Selects the entries a modify or delete command applies to
#[derive(Debug, Clone)]
pub struct FlowFilter<'a> {
    match_field: &'a OfpMatch,
    strict: bool,
    /// Only compared for strict filters
    priority: u16,
    /// `OFPP_NONE` or a port the selected entries have to output to
    out_port: u16,
}

impl<'a> FlowFilter<'a> {
    /// Selects the entries overlapping `match_field`, or if `strict`
    /// the ones with an equal match and the default priority.
    pub fn new(match_field: &'a OfpMatch, strict: bool) -> FlowFilter<'a> {
        FlowFilter {
            match_field: match_field,
            strict: strict,
            priority: OFP_DEFAULT_PRIORITY,
            out_port: OFPP_NONE,
        }
    }

    pub fn priority(mut self, priority: u16) -> FlowFilter<'a> {
        self.priority = priority;
        self
    }

    pub fn out_port(mut self, out_port: u16) -> FlowFilter<'a> {
        self.out_port = out_port;
        self
    }

    fn selects(&self, entry: &FlowEntry) -> bool {
        if self.strict && entry.priority != self.priority {
            return false;
        }
        entry.match_field.overlaps_with(self.match_field, self.strict)
            && (self.out_port == OFPP_NONE || entry.outputs_to(self.out_port))
    }
}

/// A single OpenFlow table
#[derive(Debug, Default)]
pub struct FlowTable {
    entries: Vec<FlowEntry>,
}

impl FlowTable {
    pub fn new() -> FlowTable {
        FlowTable { entries: vec![] }
    }

    /// Installs `entry` behind all entries of higher or equal priority.
    ///
    /// An entry with the same match and priority is replaced.
    pub fn insert(&mut self, entry: FlowEntry) -> Result<()> {
        if entry.flags & OFPFF_CHECK_OVERLAP != 0 {
            let overlapping = self.entries.iter().any(|e| {
                e.priority == entry.priority && e.match_field.overlaps_with(&entry.match_field, false)
            });
            if overlapping {
                return Err(Error::Overlap {
                    priority: entry.priority,
                });
            }
        }
        let same = self
            .entries
            .iter()
            .position(|e| e.priority == entry.priority && e.match_field == entry.match_field);
        if let Some(i) = same {
            debug!("Replacing flow entry with cookie {:#x}", self.entries[i].cookie);
            self.entries[i] = entry;
            return Ok(());
        }
        let pos = self
            .entries
            .iter()
            .position(|e| e.priority < entry.priority)
            .unwrap_or_else(|| self.entries.len());
        self.entries.insert(pos, entry);
        Ok(())
    }

    /// Looks up the actions for a packet received on `in_port`
    /// and updates the counters of the matching entry.
    pub fn match_packet(
        &mut self,
        in_port: u16,
        packet: &Packet,
        now: Instant,
    ) -> Option<Vec<Action>> {
        let key = packet.flow_key(in_port);
        self.entries
            .iter_mut()
            .find(|e| e.match_field.matches(&key))
            .map(|e| {
                e.packet_count += 1;
                e.byte_count += packet.len() as u64;
                e.last_matched = now;
                e.actions.clone()
            })
    }

    /// Removes and returns all entries selected by `filter`
    pub fn delete(&mut self, filter: &FlowFilter) -> Vec<FlowEntry> {
        let (removed, kept): (Vec<FlowEntry>, Vec<FlowEntry>) =
            self.entries.drain(..).partition(|e| filter.selects(e));
        self.entries = kept;
        removed
    }

    /// Replaces actions and cookie of all entries selected by `filter`.
    /// Counters and timers are kept. Returns the number of modified entries.
    pub fn modify(&mut self, filter: &FlowFilter, actions: &[Action], cookie: u64) -> usize {
        let mut count = 0;
        for entry in self.entries.iter_mut().filter(|e| filter.selects(e)) {
            entry.actions = actions.to_vec();
            entry.cookie = cookie;
            count += 1;
        }
        count
    }

    /// Removes all entries whose hard or idle timeout has elapsed at `now`
    pub fn expire(&mut self, now: Instant) -> Vec<(FlowEntry, OfpFlowRemovedReason)> {
        let mut expired = vec![];
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match entry.expiry(now) {
                Some(reason) => expired.push((entry, reason)),
                None => kept.push(entry),
            }
        }
        self.entries = kept;
        expired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<FlowEntry> {
        self.entries.iter()
    }
}
