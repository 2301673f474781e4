pub mod backend;
mod bridge;
pub mod config;
mod error;
mod net;
mod protocol;
pub mod view;

pub use crate::bridge::{ActionSink, SyncBridge};
pub use crate::config::BridgeConfig;
pub use crate::error::BridgeError;
pub use crate::net::NetworkThread;
pub use crate::protocol::{
    BackendInbound, BackendOutbound, InboundMsg, OutboundMsg, INBOUND_CAP, OUTBOUND_CAP,
};
pub use chem_protocol as wire;
