use flow_table;
use openflow::messages::*;
use std::error;
use std::fmt;
use std::io;
use std::result;

/// Everything that can go wrong while handling one controller message.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    /// The controller announced this unusable version in its Hello
    HelloFailed(u8),
    BadRequest(OfpBadRequestCode),
    BadAction(OfpBadActionCode),
    FlowModFailed(OfpFlowModFailedCode),
}

impl Error {
    /// Whether the session has to be torn down after reporting this error.
    ///
    /// Malformed messages, a failed Hello, unknown flow mod commands and
    /// unresolvable buffer ids mean that switch and controller disagree
    /// on the protocol state.
    pub fn is_fatal(&self) -> bool {
        match *self {
            Error::Io(_) | Error::HelloFailed(_) => true,
            Error::BadRequest(code) => match code {
                OfpBadRequestCode::BadVersion | OfpBadRequestCode::BadType => false,
                _ => true,
            },
            Error::BadAction(code) => code == OfpBadActionCode::BadLen,
            Error::FlowModFailed(code) => code == OfpFlowModFailedCode::BadCommand,
        }
    }

    /// The OpenFlow error message reporting this error to the controller.
    /// `header` and `body` are the bytes of the failed request.
    pub fn to_error_msg(&self, header: &[u8], body: &[u8]) -> Option<OfpErrorMsg> {
        match *self {
            Error::Io(_) => None,
            Error::HelloFailed(_) => Some(OfpErrorMsg::new_hello_failed()),
            Error::BadRequest(code) => Some(OfpErrorMsg::new_bad_request(code, header, body)),
            Error::BadAction(code) => Some(OfpErrorMsg::new_bad_action(code, header, body)),
            Error::FlowModFailed(code) => {
                Some(OfpErrorMsg::new_flow_mod_failed(code, header, body))
            }
        }
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        "OpenFlow protocol error"
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "{}", e),
            Error::HelloFailed(v) => {
                write!(f, "The controller only supports OpenFlow protocol version {:x}", v)
            }
            Error::BadRequest(code) => write!(f, "Bad request: {:?}", code),
            Error::BadAction(code) => write!(f, "Bad action: {:?}", code),
            Error::FlowModFailed(code) => write!(f, "Flow mod failed: {:?}", code),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<flow_table::Error> for Error {
    fn from(e: flow_table::Error) -> Self {
        match e {
            flow_table::Error::Overlap { .. } => {
                Error::FlowModFailed(OfpFlowModFailedCode::Overlap)
            }
        }
    }
}

pub type Result<T> = result::Result<T, Error>;
