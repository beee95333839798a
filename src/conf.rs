/*!
A parser for an INI file with the following structure:

```ini
[Connection]
; one or more comma separated controllers
uri=tcp:192.0.2.1:6633,tcp:192.0.2.2

[Switch]
; a MAC address or a hexadecimal number
dpid=de:ad:00:00:be:ef
buffers=100
miss_send_len=1500

[Ports]
; <port number>=<name>,<local UDP address>,<peer UDP address>
1=eth1,0.0.0.0:10001,192.0.2.10:10001
2=eth2,0.0.0.0:10002,192.0.2.11:10002
```

Only the `[Ports]` section is mandatory.
*/

use net::TunnelPort;
use openflow::messages::OFPP_MAX;
use openflow::messages::OFP_TCP_PORT;

use ini::ini;
use ini::Ini;

use std::convert::From;
use std::default::Default;
use std::error;
use std::fmt;
use std::io;
use std::net::*;
use std::num::ParseIntError;
use std::str::FromStr;

const CONN_SECTION: &str = "Connection";
const URI_KEY: &str = "uri";

const SWITCH_SECTION: &str = "Switch";
const DPID_KEY: &str = "dpid";
const BUFFERS_KEY: &str = "buffers";
const MISS_SEND_LEN_KEY: &str = "miss_send_len";

const PORTS_SECTION: &str = "Ports";

const DEFAULT_DPID: u64 = 0xdead_0000_beef;
const DEFAULT_BUFFERS: usize = 100;
const DEFAULT_MISS_SEND_LEN: u16 = 1500;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Ini(ini::Error),
    ParseSwitchPort(ParseIntError),
    InvalidSwitchPortNo(String),
    InvalidPort(String),
    InvalidValue(&'static str, String),
    MissingSection(&'static str),
    InvalidUri(String),
    UnsupportedProtocol(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "{}", e),
            Error::Ini(ref e) => write!(f, "{}", e),
            Error::ParseSwitchPort(ref e) => {
                write!(f, "Error on trying to parse a switch port number: {}", e)
            }
            Error::InvalidSwitchPortNo(ref p) => write!(f, "Switch port number {} is invalid", p),
            Error::InvalidPort(ref p) => write!(
                f,
                "The port definition '{}' is not of the form <name>,<bind address>,<peer address>",
                p
            ),
            Error::InvalidValue(k, ref v) => write!(f, "Invalid value '{}' for '{}'", v, k),
            Error::MissingSection(s) => write!(f, "The INI file does not have a [{}] section", s),
            Error::InvalidUri(ref u) => write!(f, "The OpenFlow connection URI '{}' is invalid", u),
            Error::UnsupportedProtocol(ref p) => write!(
                f,
                "The connection protocol '{}' is not supported, use 'tcp'",
                p
            ),
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(ioe) => ioe,
            _ => io::Error::new(io::ErrorKind::InvalidData, e),
        }
    }
}
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
impl From<ParseIntError> for Error {
    fn from(e: ParseIntError) -> Self {
        Error::ParseSwitchPort(e)
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        "INI configuration parser error"
    }
}

trait Section {
    type S;

    fn from_ini(conf: &Ini) -> Result<Self::S, Error>;
}

#[derive(Debug, PartialEq)]
enum ConnectionProtocol {
    Tcp,
}
impl FromStr for ConnectionProtocol {
    type Err = Error;

    fn from_str(proto: &str) -> Result<ConnectionProtocol, Self::Err> {
        match proto {
            "tcp" => Ok(ConnectionProtocol::Tcp),
            _ => Err(Error::UnsupportedProtocol(proto.to_owned())),
        }
    }
}

/// A controller to connect to
#[derive(Debug, PartialEq)]
pub struct OfConnection {
    pub socket: SocketAddr,
}

impl FromStr for OfConnection {
    type Err = Error;

    /// Parses `tcp:<host>[:<port>]`, the port defaults to 6633
    fn from_str(conn: &str) -> Result<OfConnection, Self::Err> {
        let conn = conn.trim();
        let mut conn_split = conn.splitn(2, ':');
        let proto = conn_split.next().unwrap_or("");
        let address = conn_split
            .next()
            .ok_or_else(|| Error::InvalidUri(conn.to_owned()))?;
        ConnectionProtocol::from_str(proto)?;

        let with_port = format!("{}:{}", address, OFP_TCP_PORT);
        let socket = [address, with_port.as_str()]
            .iter()
            .filter_map(|a| a.to_socket_addrs().ok().and_then(|mut addrs| addrs.next()))
            .next()
            .ok_or_else(|| Error::InvalidUri(conn.to_owned()))?;
        let connection = OfConnection { socket: socket };
        debug!("Got {:?}", connection);
        Ok(connection)
    }
}

impl Default for OfConnection {
    fn default() -> Self {
        let socket_v4 = SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), OFP_TCP_PORT);
        OfConnection {
            socket: SocketAddr::V4(socket_v4),
        }
    }
}

/// Parses a comma separated list of controller URIs
pub fn parse_uris(uris: &str) -> Result<Vec<OfConnection>, Error> {
    uris.split(',')
        .filter(|u| !u.trim().is_empty())
        .map(OfConnection::from_str)
        .collect()
}

impl Section for Vec<OfConnection> {
    type S = Vec<OfConnection>;

    fn from_ini(conf: &Ini) -> Result<Self::S, Error> {
        debug!("Reading [{}] section", CONN_SECTION);

        let uris = conf
            .section(Some(CONN_SECTION.to_owned()))
            .and_then(|s| s.get(URI_KEY));
        match uris {
            Some(uris) => parse_uris(uris),
            None => Ok(vec![OfConnection::default()]),
        }
    }
}

/// The identity and resources of the switch
#[derive(Debug, PartialEq)]
pub struct SwitchConf {
    pub datapath_id: u64,
    /// Number of packets the switch buffers for the controllers
    pub buffers: usize,
    /// Default number of bytes of a missed packet sent to the controllers
    pub miss_send_len: u16,
}

impl Default for SwitchConf {
    fn default() -> Self {
        SwitchConf {
            datapath_id: DEFAULT_DPID,
            buffers: DEFAULT_BUFFERS,
            miss_send_len: DEFAULT_MISS_SEND_LEN,
        }
    }
}

/// Parses a datapath id given as MAC address or hexadecimal number
fn parse_dpid(dpid: &str) -> Result<u64, Error> {
    let invalid = || Error::InvalidValue(DPID_KEY, dpid.to_owned());
    if dpid.contains(':') {
        let octets: Vec<_> = dpid.split(':').collect();
        if octets.len() != 6 {
            return Err(invalid());
        }
        octets.iter().try_fold(0u64, |id, o| {
            u8::from_str_radix(o, 16)
                .map(|b| id << 8 | b as u64)
                .map_err(|_| invalid())
        })
    } else {
        let hex = dpid.trim_start_matches("0x");
        u64::from_str_radix(hex, 16).map_err(|_| invalid())
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, Error> {
    value
        .parse()
        .map_err(|_| Error::InvalidValue(key, value.to_owned()))
}

impl Section for SwitchConf {
    type S = SwitchConf;

    fn from_ini(conf: &Ini) -> Result<Self::S, Error> {
        debug!("Reading [{}] section", SWITCH_SECTION);

        let mut switch = SwitchConf::default();
        if let Some(section) = conf.section(Some(SWITCH_SECTION.to_owned())) {
            if let Some(dpid) = section.get(DPID_KEY) {
                switch.datapath_id = parse_dpid(dpid)?;
            }
            if let Some(buffers) = section.get(BUFFERS_KEY) {
                switch.buffers = parse_value(BUFFERS_KEY, buffers)?;
            }
            if let Some(len) = section.get(MISS_SEND_LEN_KEY) {
                switch.miss_send_len = parse_value(MISS_SEND_LEN_KEY, len)?;
            }
        }
        debug!("Got {:?}", switch);
        Ok(switch)
    }
}

fn parse_port_no(port: &str) -> Result<u16, Error> {
    let port_no: u32 = port.parse()?;
    if 0 == port_no || port_no > OFPP_MAX as u32 {
        return Err(Error::InvalidSwitchPortNo(port_no.to_string()));
    }
    Ok(port_no as u16)
}

fn parse_port(port_no: &str, definition: &str) -> Result<TunnelPort, Error> {
    let invalid = || Error::InvalidPort(definition.to_owned());
    let parts: Vec<_> = definition.split(',').map(|p| p.trim()).collect();
    if parts.len() != 3 || parts[0].is_empty() {
        return Err(invalid());
    }
    Ok(TunnelPort {
        port_no: parse_port_no(port_no.trim())?,
        name: parts[0].to_owned(),
        bind: SocketAddr::from_str(parts[1]).map_err(|_| invalid())?,
        peer: SocketAddr::from_str(parts[2]).map_err(|_| invalid())?,
    })
}

impl Section for Vec<TunnelPort> {
    type S = Vec<TunnelPort>;

    fn from_ini(conf: &Ini) -> Result<Self::S, Error> {
        debug!("Reading [{}] section", PORTS_SECTION);

        let ports_section = conf
            .section(Some(PORTS_SECTION.to_owned()))
            .ok_or(Error::MissingSection(PORTS_SECTION))?;

        let mut ports = ports_section
            .iter()
            .map(|(no, def)| parse_port(no, def))
            .collect::<Result<Vec<_>, _>>()?;
        ports.sort_by_key(|p| p.port_no);

        debug!("Got {:?}", ports);
        Ok(ports)
    }
}

/// The complete switch configuration
#[derive(Debug)]
pub struct Conf {
    pub controllers: Vec<OfConnection>,
    pub switch: SwitchConf,
    pub ports: Vec<TunnelPort>,
}

fn from_ini(conf: &Ini) -> Result<Conf, Error> {
    Ok(Conf {
        controllers: Vec::<OfConnection>::from_ini(conf)?,
        switch: SwitchConf::from_ini(conf)?,
        ports: Vec::<TunnelPort>::from_ini(conf)?,
    })
}

pub fn parse_file(path: &str) -> Result<Conf, Error> {
    info!("Reading INI file {}", path);

    let conf = match Ini::load_from_file(path) {
        Ok(i) => i,
        Err(e) => {
            return Err(Error::Ini(e));
        }
    };
    from_ini(&conf)
}
