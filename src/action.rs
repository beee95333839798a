/*!
Applies OpenFlow 1.0 action lists to packets
*/

use net;
use openflow::messages::{Action, OfpBadActionCode, PseudoPort};
use packet::Packet;

use std::error;
use std::fmt;
use std::result;

#[derive(Debug)]
pub enum Error {
    /// The switch cannot execute this action
    Unsupported(Action),
    /// Sending the packet out a port failed
    Output { port: u16, cause: net::Error },
}

impl Error {
    /// The code reporting this error in an OpenFlow `BadAction` message
    pub fn bad_action_code(&self) -> OfpBadActionCode {
        match *self {
            Error::Unsupported(Action::Output(_)) | Error::Output { .. } => {
                OfpBadActionCode::BadOutPort
            }
            Error::Unsupported(Action::Vendor(..)) => OfpBadActionCode::BadVendor,
            Error::Unsupported(_) => OfpBadActionCode::BadType,
        }
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        match *self {
            Error::Unsupported(_) => "unsupported action",
            Error::Output { .. } => "output failed",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Unsupported(ref a) => write!(f, "Unsupported action {:?}", a),
            Error::Output { port, ref cause } => {
                write!(f, "Output to port {} failed: {}", port, cause)
            }
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

/// Where an action list comes from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Origin {
    /// A flow table entry
    Flow,
    /// A controller's Packet-Out, which may resubmit to the flow table
    PacketOut,
}

/// The forwarding primitives output actions are built upon
pub trait Datapath {
    /// Numbers of all switch ports
    fn port_numbers(&self) -> Vec<u16>;

    fn output(&self, port_no: u16, packet: &Packet) -> net::Result<()>;

    /// Sends at most `max_len` bytes of the packet to the controllers
    /// as a Packet-In caused by an action.
    fn output_to_controller(&self, in_port: u16, packet: &Packet, max_len: u16);

    /// Processes the packet as if it had been received on `in_port`
    fn output_to_table(&self, in_port: u16, packet: &Packet);
}

fn output<D: Datapath>(datapath: &D, port_no: u16, packet: &Packet) -> Result<()> {
    datapath.output(port_no, packet).map_err(|e| Error::Output {
        port: port_no,
        cause: e,
    })
}

/// Applies `actions` in order to `packet` which was received on `in_port`.
///
/// Execution stops at the first action that fails.
pub fn execute<D: Datapath>(
    datapath: &D,
    actions: &[Action],
    in_port: u16,
    mut packet: Packet,
    origin: Origin,
) -> Result<()> {
    if actions.is_empty() {
        debug!("Dropping packet from port {}", in_port);
    }
    for action in actions {
        match *action {
            Action::Output(port) => match port {
                PseudoPort::Physical(p) if p == in_port => {
                    debug!("Not sending packet back to its ingress port {}", p);
                }
                PseudoPort::Physical(p) => output(datapath, p, &packet)?,
                PseudoPort::InPort => output(datapath, in_port, &packet)?,
                PseudoPort::Flood | PseudoPort::All => {
                    for p in datapath.port_numbers() {
                        if p != in_port {
                            output(datapath, p, &packet)?;
                        }
                    }
                }
                PseudoPort::Controller(max_len) => {
                    datapath.output_to_controller(in_port, &packet, max_len)
                }
                PseudoPort::Table if origin == Origin::PacketOut => {
                    datapath.output_to_table(in_port, &packet)
                }
                PseudoPort::Table | PseudoPort::Normal | PseudoPort::Local => {
                    return Err(Error::Unsupported(action.clone()));
                }
            },
            Action::SetVlanVid(vid) => packet.set_vlan_vid(vid),
            Action::SetVlanPcp(pcp) => packet.set_vlan_pcp(pcp),
            Action::StripVlan => packet.strip_vlan(),
            Action::SetDlSrc(ref mac) => packet.set_dl_src(mac),
            Action::SetDlDst(ref mac) => packet.set_dl_dst(mac),
            Action::SetNwSrc(addr) => packet.set_nw_src(addr),
            Action::SetNwDst(addr) => packet.set_nw_dst(addr),
            Action::SetNwTos(tos) => packet.set_nw_tos(tos),
            Action::SetTpSrc(port) => packet.set_tp_src(port),
            Action::SetTpDst(port) => packet.set_tp_dst(port),
            Action::Enqueue { .. } | Action::Vendor(..) => {
                return Err(Error::Unsupported(action.clone()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use packet::tests::tcp_frame;
    use std::cell::RefCell;
    use std::net::Ipv4Addr;

    #[derive(Default)]
    struct Recorder {
        sent: RefCell<Vec<(u16, Packet)>>,
        to_controller: RefCell<Vec<(u16, u16)>>,
        to_table: RefCell<Vec<u16>>,
    }

    impl Datapath for Recorder {
        fn port_numbers(&self) -> Vec<u16> {
            vec![1, 2, 3, 4]
        }

        fn output(&self, port_no: u16, packet: &Packet) -> net::Result<()> {
            if port_no > 4 {
                return Err(net::Error::UnknownPort(port_no));
            }
            self.sent.borrow_mut().push((port_no, packet.clone()));
            Ok(())
        }

        fn output_to_controller(&self, in_port: u16, _packet: &Packet, max_len: u16) {
            self.to_controller.borrow_mut().push((in_port, max_len));
        }

        fn output_to_table(&self, in_port: u16, _packet: &Packet) {
            self.to_table.borrow_mut().push(in_port);
        }
    }

    impl Recorder {
        fn ports(&self) -> Vec<u16> {
            self.sent.borrow().iter().map(|&(p, _)| p).collect()
        }
    }

    fn out(p: PseudoPort) -> Action {
        Action::Output(p)
    }

    #[test]
    fn physical_and_in_port() {
        let dp = Recorder::default();
        let actions = [out(PseudoPort::Physical(3)), out(PseudoPort::InPort)];
        execute(&dp, &actions, 2, tcp_frame(1, 80), Origin::Flow).unwrap();
        assert_eq!(vec![3, 2], dp.ports());
    }

    #[test]
    fn physical_ingress_port_is_skipped() {
        let dp = Recorder::default();
        let actions = [out(PseudoPort::Physical(2)), out(PseudoPort::Physical(1))];
        execute(&dp, &actions, 2, tcp_frame(1, 80), Origin::Flow).unwrap();
        assert_eq!(vec![1], dp.ports());
    }

    #[test]
    fn flood_skips_ingress() {
        let dp = Recorder::default();
        execute(&dp, &[out(PseudoPort::Flood)], 2, tcp_frame(1, 80), Origin::Flow).unwrap();
        assert_eq!(vec![1, 3, 4], dp.ports());
        let dp = Recorder::default();
        execute(&dp, &[out(PseudoPort::All)], 4, tcp_frame(1, 80), Origin::Flow).unwrap();
        assert_eq!(vec![1, 2, 3], dp.ports());
    }

    #[test]
    fn controller_output() {
        let dp = Recorder::default();
        let actions = [out(PseudoPort::Controller(128))];
        execute(&dp, &actions, 1, tcp_frame(1, 80), Origin::Flow).unwrap();
        assert_eq!(vec![(1, 128)], *dp.to_controller.borrow());
    }

    #[test]
    fn table_only_for_packet_out() {
        let dp = Recorder::default();
        let actions = [out(PseudoPort::Table)];
        execute(&dp, &actions, 1, tcp_frame(1, 80), Origin::PacketOut).unwrap();
        assert_eq!(vec![1], *dp.to_table.borrow());
        match execute(&dp, &actions, 1, tcp_frame(1, 80), Origin::Flow) {
            Err(Error::Unsupported(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rewrite_applies_to_later_outputs() {
        let dp = Recorder::default();
        let actions = [
            out(PseudoPort::Physical(1)),
            Action::SetNwDst(Ipv4Addr::new(10, 9, 9, 9)),
            Action::SetTpDst(8080),
            out(PseudoPort::Physical(2)),
        ];
        execute(&dp, &actions, 3, tcp_frame(1, 80), Origin::Flow).unwrap();
        let sent = dp.sent.borrow();
        assert_eq!(tcp_frame(1, 80), sent[0].1);
        let key = sent[1].1.flow_key(3);
        assert_eq!(Some(Ipv4Addr::new(10, 9, 9, 9)), key.nw_dst);
        assert_eq!(Some(8080), key.tp_dst);
    }

    #[test]
    fn unsupported_action_stops_execution() {
        let dp = Recorder::default();
        let actions = [
            out(PseudoPort::Physical(1)),
            Action::Enqueue { port: 2, queue_id: 1 },
            out(PseudoPort::Physical(2)),
        ];
        let err = execute(&dp, &actions, 3, tcp_frame(1, 80), Origin::Flow).unwrap_err();
        assert_eq!(OfpBadActionCode::BadType, err.bad_action_code());
        assert_eq!(vec![1], dp.ports());
    }

    #[test]
    fn normal_and_local_are_unsupported() {
        let dp = Recorder::default();
        for p in &[PseudoPort::Normal, PseudoPort::Local] {
            let err = execute(&dp, &[out(*p)], 1, tcp_frame(1, 80), Origin::PacketOut)
                .unwrap_err();
            assert_eq!(OfpBadActionCode::BadOutPort, err.bad_action_code());
        }
        assert!(dp.ports().is_empty());
    }

    #[test]
    fn unknown_port_fails() {
        let dp = Recorder::default();
        match execute(&dp, &[out(PseudoPort::Physical(9))], 1, tcp_frame(1, 80), Origin::Flow) {
            Err(Error::Output { port: 9, .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
