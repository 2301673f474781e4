use std::net::SocketAddr;

pub use chem_protocol::{
    ActionRequest, ChemAction, ClientCommand, ErrorCode, ServerMessage, StateSnapshot,
    WindowConfig,
};

pub const INBOUND_CAP: usize = 256;
pub const OUTBOUND_CAP: usize = 256;

/// Network thread -> view.
pub enum InboundMsg {
    Connected,
    Disconnected,
    Server { msg: ServerMessage },
}

/// View -> network thread.
pub enum OutboundMsg {
    Send { cmd: ClientCommand },
}

/// Backend server thread -> backend main loop.
pub enum BackendInbound {
    ClientConnected {
        socket_addr: SocketAddr,
        src_ref: String,
    },
    ClientDisconnected,
    /// An `act` frame that carried the current ref and decoded cleanly.
    Action { action: ChemAction },
}

/// Backend main loop -> backend server thread.
pub enum BackendOutbound {
    Send { msg: ServerMessage },
}
