/*!
Packets waiting for a controller's forwarding decision

When a packet misses the flow table only its first bytes are sent to the
controllers. The whole packet stays here under a buffer id which a later
Packet-Out or Flow-Mod can refer to.
*/

use openflow::messages::OFP_NO_BUFFER;
use packet::Packet;

use std::collections::HashMap;
use std::error;
use std::fmt;
use std::result;

#[derive(Debug, PartialEq)]
pub enum Error {
    /// All buffers are in use
    Full { capacity: usize },
    /// No packet is buffered under this id
    NotFound(u32),
}

impl error::Error for Error {
    fn description(&self) -> &str {
        match *self {
            Error::Full { .. } => "packet buffer is full",
            Error::NotFound(_) => "unknown buffer id",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Full { capacity } => {
                write!(f, "All {} packet buffers are in use", capacity)
            }
            Error::NotFound(id) => write!(f, "No packet buffered with id {}", id),
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// A bounded store of packet copies keyed by buffer id.
///
/// Ids start at 1 and are never reused while the packet they name is still
/// buffered. `OFP_NO_BUFFER` is never handed out.
#[derive(Debug)]
pub struct PacketBuffer {
    capacity: usize,
    next_id: u32,
    packets: HashMap<u32, Packet>,
}

impl PacketBuffer {
    pub fn new(capacity: usize) -> PacketBuffer {
        PacketBuffer {
            capacity: capacity,
            next_id: 1,
            packets: HashMap::with_capacity(capacity),
        }
    }

    fn fresh_id(&mut self) -> u32 {
        loop {
            let id = self.next_id;
            self.next_id = match self.next_id.wrapping_add(1) {
                0 | OFP_NO_BUFFER => 1,
                n => n,
            };
            if !self.packets.contains_key(&id) {
                return id;
            }
        }
    }

    /// Stores a copy of `packet` and returns its buffer id.
    pub fn add(&mut self, packet: &Packet) -> Result<u32> {
        if self.packets.len() >= self.capacity {
            return Err(Error::Full {
                capacity: self.capacity,
            });
        }
        let id = self.fresh_id();
        self.packets.insert(id, packet.clone());
        Ok(id)
    }

    /// Removes the packet buffered under `id` and returns it.
    pub fn pop(&mut self, id: u32) -> Result<Packet> {
        self.packets.remove(&id).ok_or(Error::NotFound(id))
    }

    /// Returns the packet buffered under `id` without releasing the buffer.
    pub fn lookup(&self, id: u32) -> Result<&Packet> {
        self.packets.get(&id).ok_or(Error::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packet::tests::{arp_frame, tcp_frame};

    #[test]
    fn ids_start_at_one() {
        let mut buffer = PacketBuffer::new(4);
        assert_eq!(Ok(1), buffer.add(&arp_frame()));
        assert_eq!(Ok(2), buffer.add(&arp_frame()));
    }

    #[test]
    fn capacity_is_enforced() {
        let mut buffer = PacketBuffer::new(2);
        buffer.add(&arp_frame()).unwrap();
        let second = buffer.add(&arp_frame()).unwrap();
        assert_eq!(Err(Error::Full { capacity: 2 }), buffer.add(&arp_frame()));
        buffer.pop(second).unwrap();
        assert!(buffer.add(&arp_frame()).is_ok());
        assert_eq!(2, buffer.len());
    }

    #[test]
    fn single_buffer_scenario() {
        let mut buffer = PacketBuffer::new(1);
        let id = buffer.add(&tcp_frame(1, 80)).unwrap();
        assert!(buffer.add(&arp_frame()).is_err());
        assert_eq!(Ok(tcp_frame(1, 80)), buffer.pop(id));
        assert!(buffer.add(&arp_frame()).is_ok());
    }

    #[test]
    fn pop_consumes_and_lookup_does_not() {
        let mut buffer = PacketBuffer::new(4);
        let packet = tcp_frame(1000, 22);
        let id = buffer.add(&packet).unwrap();
        assert_eq!(Ok(&packet), buffer.lookup(id));
        assert_eq!(Ok(&packet), buffer.lookup(id));
        assert_eq!(Ok(packet), buffer.pop(id));
        assert_eq!(Err(Error::NotFound(id)), buffer.pop(id));
        assert_eq!(Err(Error::NotFound(id)), buffer.lookup(id).map(|_| ()));
    }

    #[test]
    fn ids_stay_unique_after_pop() {
        let mut buffer = PacketBuffer::new(2);
        let first = buffer.add(&arp_frame()).unwrap();
        let second = buffer.add(&arp_frame()).unwrap();
        buffer.pop(first).unwrap();
        let third = buffer.add(&arp_frame()).unwrap();
        assert!(third != second);
    }

    #[test]
    fn wrapping_skips_sentinel_and_live_ids() {
        let mut buffer = PacketBuffer::new(3);
        let first = buffer.add(&arp_frame()).unwrap();
        buffer.next_id = OFP_NO_BUFFER - 1;
        assert_eq!(Ok(OFP_NO_BUFFER - 1), buffer.add(&arp_frame()));
        // 1 is still in use
        assert_eq!(1, first);
        assert_eq!(Ok(2), buffer.add(&arp_frame()));
    }
}
