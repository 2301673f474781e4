use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::net::NetworkThread;
use crate::protocol::{
    ActionRequest, ChemAction, ClientCommand, InboundMsg, OutboundMsg, ServerMessage,
    StateSnapshot, WindowConfig,
};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use tracing::{debug, warn};

/// Anything that accepts actions from the panel.
pub trait ActionSink {
    /// Fire-and-forget: no acknowledgment, no error surfaced to the caller.
    fn dispatch(&self, action: ChemAction);
}

/// Keeps the latest backend snapshot and forwards actions back to it.
///
/// Meant to be owned by the UI loop: call [`SyncBridge::tick`] once per
/// frame, read [`SyncBridge::snapshot`], and dispatch from input handlers.
/// None of these block.
pub struct SyncBridge {
    inbound_rx: Receiver<InboundMsg>,
    outbound_tx: Sender<OutboundMsg>,
    snapshot: StateSnapshot,
    window: Option<WindowConfig>,
    connected: bool,
    net: Option<NetworkThread>,
}

impl SyncBridge {
    /// Bridge over caller-provided queues, with no transport of its own.
    pub fn new(inbound_rx: Receiver<InboundMsg>, outbound_tx: Sender<OutboundMsg>) -> Self {
        Self {
            inbound_rx,
            outbound_tx,
            snapshot: StateSnapshot::default(),
            window: None,
            connected: false,
            net: None,
        }
    }

    /// Bridge backed by a WebSocket network thread. Connection happens in the
    /// background and is retried with backoff.
    pub fn connect(config: &BridgeConfig) -> Result<Self, BridgeError> {
        let (inbound_cap, outbound_cap) = config.queue_caps();
        let (in_tx, in_rx) = bounded(inbound_cap);
        let (out_tx, out_rx) = bounded(outbound_cap);
        let net = NetworkThread::spawn(config, in_tx, out_rx)?;
        let mut bridge = Self::new(in_rx, out_tx);
        bridge.net = Some(net);
        Ok(bridge)
    }

    /// Applies everything received since the last call. Returns `true` when
    /// the snapshot was replaced.
    pub fn tick(&mut self) -> bool {
        let mut changed = false;

        loop {
            match self.inbound_rx.try_recv() {
                Ok(InboundMsg::Connected) => self.connected = true,
                Ok(InboundMsg::Disconnected) => {
                    self.connected = false;
                    self.window = None;
                }
                Ok(InboundMsg::Server { msg }) => match msg {
                    ServerMessage::Update { config, data } => {
                        self.window = Some(config);
                        self.snapshot = data;
                        changed = true;
                    }
                    ServerMessage::Error { msg, code } => {
                        warn!(?code, %msg, "backend reported an error");
                    }
                },
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        changed
    }

    pub fn snapshot(&self) -> &StateSnapshot {
        &self.snapshot
    }

    pub fn window(&self) -> Option<&WindowConfig> {
        self.window.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn shutdown(&mut self) {
        if let Some(net) = self.net.take() {
            net.shutdown();
        }
    }
}

impl ActionSink for SyncBridge {
    fn dispatch(&self, action: ChemAction) {
        let name = action.name();
        let Some(window) = self.window.as_ref() else {
            debug!(action = name, "no window ref yet; dropping action");
            return;
        };
        let cmd = ClientCommand::Act {
            src_ref: window.src_ref.clone(),
            action: ActionRequest::from(action),
        };
        match self.outbound_tx.try_send(OutboundMsg::Send { cmd }) {
            Ok(()) => debug!(action = name, "action queued"),
            Err(TrySendError::Full(_)) => warn!(action = name, "outbound queue full; dropping action"),
            Err(TrySendError::Disconnected(_)) => {
                debug!(action = name, "network thread gone; dropping action")
            }
        }
    }
}

impl Drop for SyncBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}
