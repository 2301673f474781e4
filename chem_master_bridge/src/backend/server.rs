use crate::error::BridgeError;
use crate::protocol::{
    BackendInbound, BackendOutbound, ChemAction, ClientCommand, ErrorCode, ServerMessage,
};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message;
use tungstenite::WebSocket;

const REF_LEN: usize = 32;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);
const READ_TIMEOUT: Duration = Duration::from_millis(30);
const WRITE_TIMEOUT: Duration = Duration::from_millis(200);
const IDLE_SLEEP: Duration = Duration::from_millis(25);

/// Single-client WebSocket server in front of a backend [`super::MainLoop`].
/// A new connection replaces the previous one.
pub struct BackendServer {
    listen_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl BackendServer {
    pub fn spawn(
        addr: &str,
        in_tx: Sender<BackendInbound>,
        out_rx: Receiver<BackendOutbound>,
    ) -> Result<Self, BridgeError> {
        let bind_err = |source| BridgeError::Bind {
            addr: addr.to_string(),
            source,
        };
        let listener = TcpListener::bind(addr).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        let listen_addr = listener.local_addr().map_err(bind_err)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);
        let join_handle = thread::Builder::new()
            .name("chem-master-backend".to_string())
            .spawn(move || {
                let mut session = Session { in_tx, panel: None };
                while !stop.load(Ordering::Relaxed) {
                    session.accept_pending(&listener);
                    if !session.forward_updates(&out_rx) {
                        break;
                    }
                    if !session.poll_panel() {
                        thread::sleep(IDLE_SLEEP);
                    }
                }
                session.detach("server stopping");
            })
            .map_err(BridgeError::Spawn)?;

        info!(%listen_addr, "backend listening");
        Ok(Self {
            listen_addr,
            shutdown,
            join_handle: Mutex::new(Some(join_handle)),
        })
    }

    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let handle = self.join_handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Drop for BackendServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The connected panel window and the ref it must echo on every action.
struct Panel {
    ws: WebSocket<TcpStream>,
    src_ref: String,
}

impl Panel {
    fn reply_error(&mut self, code: ErrorCode, msg: impl Into<String>) {
        let msg = ServerMessage::Error {
            msg: msg.into(),
            code,
        };
        let _ = send_server_message(&mut self.ws, &msg);
    }

    /// Turns one `act` frame into a typed action, or the error code the
    /// panel gets back for it.
    fn decode_act(&self, text: &str) -> Result<ChemAction, (ErrorCode, String)> {
        let cmd: ClientCommand = serde_json::from_str(text)
            .map_err(|e| (ErrorCode::InvalidCommand, format!("invalid json: {e}")))?;
        if cmd.src_ref() != self.src_ref {
            return Err((ErrorCode::Unauthorized, "unauthorized".to_string()));
        }
        let ClientCommand::Act { action, .. } = cmd;
        ChemAction::try_from(action).map_err(|e| (ErrorCode::InvalidCommand, e.to_string()))
    }
}

struct Session {
    in_tx: Sender<BackendInbound>,
    panel: Option<Panel>,
}

impl Session {
    fn accept_pending(&mut self, listener: &TcpListener) {
        loop {
            match listener.accept() {
                Ok((stream, socket_addr)) => {
                    if let Some(ws) = handshake(stream) {
                        self.attach(ws, socket_addr);
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) => {
                    warn!(error = %e, "ws accept failed");
                    return;
                }
            }
        }
    }

    fn attach(&mut self, ws: WebSocket<TcpStream>, socket_addr: SocketAddr) {
        self.detach("replaced by a new panel");

        let src_ref: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(REF_LEN)
            .map(char::from)
            .collect();
        let mut panel = Panel { ws, src_ref };

        let connected = BackendInbound::ClientConnected {
            socket_addr,
            src_ref: panel.src_ref.clone(),
        };
        if self.in_tx.try_send(connected).is_err() {
            panel.reply_error(ErrorCode::Busy, "server busy");
            let _ = panel.ws.close(None);
            return;
        }
        self.panel = Some(panel);
    }

    fn detach(&mut self, reason: &str) {
        if let Some(mut panel) = self.panel.take() {
            debug!(reason, "panel detached");
            let _ = panel.ws.close(None);
            let _ = panel.ws.flush();
            let _ = self.in_tx.try_send(BackendInbound::ClientDisconnected);
        }
    }

    /// Returns `false` once the main loop has gone away.
    fn forward_updates(&mut self, out_rx: &Receiver<BackendOutbound>) -> bool {
        loop {
            match out_rx.try_recv() {
                Ok(BackendOutbound::Send { msg }) => {
                    let Some(panel) = self.panel.as_mut() else {
                        continue;
                    };
                    if send_server_message(&mut panel.ws, &msg).is_err() {
                        self.detach("send failed");
                    }
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Reads at most one frame from the panel. Returns `false` when there is
    /// no panel to read from.
    fn poll_panel(&mut self) -> bool {
        let Some(panel) = self.panel.as_mut() else {
            return false;
        };

        let text = match panel.ws.read() {
            Ok(Message::Text(text)) => text,
            Ok(Message::Ping(payload)) => {
                let _ = panel.ws.send(Message::Pong(payload));
                return true;
            }
            Ok(Message::Close(_)) => {
                self.detach("panel closed");
                return true;
            }
            Ok(_) => return true,
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                return true
            }
            Err(e) => {
                debug!(error = %e, "panel read failed");
                self.detach("connection lost");
                return true;
            }
        };

        match panel.decode_act(&text) {
            Ok(action) => {
                if self.in_tx.try_send(BackendInbound::Action { action }).is_err() {
                    panel.reply_error(ErrorCode::Busy, "server busy");
                }
            }
            Err((code, msg)) => {
                debug!(?code, %msg, "act rejected");
                panel.reply_error(code, msg);
            }
        }
        true
    }
}

fn handshake(stream: TcpStream) -> Option<WebSocket<TcpStream>> {
    // Accepted sockets may inherit the listener's non-blocking flag.
    let _ = stream.set_nonblocking(false);
    let _ = stream.set_nodelay(true);
    let _ = stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT));
    let _ = stream.set_write_timeout(Some(WRITE_TIMEOUT));

    let ws = tungstenite::accept(stream)
        .map_err(|e| warn!(error = %e, "ws handshake failed"))
        .ok()?;
    ws.get_ref()
        .set_read_timeout(Some(READ_TIMEOUT))
        .map_err(|e| warn!(error = %e, "set read timeout failed"))
        .ok()?;
    Some(ws)
}

fn send_server_message(
    ws: &mut WebSocket<TcpStream>,
    msg: &ServerMessage,
) -> Result<(), tungstenite::Error> {
    let payload = serde_json::to_string(msg).map_err(|e| {
        tungstenite::Error::Io(std::io::Error::new(ErrorKind::InvalidData, e))
    })?;
    ws.send(Message::Text(payload.into()))
}
