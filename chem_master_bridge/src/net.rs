use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::protocol::{ClientCommand, InboundMsg, OutboundMsg, ServerMessage};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message;
use tungstenite::WebSocket;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);
const WRITE_TIMEOUT: Duration = Duration::from_millis(200);
const SHUTDOWN_POLL: Duration = Duration::from_millis(25);

pub struct NetworkThread {
    shutdown: Arc<AtomicBool>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkThread {
    pub fn spawn(
        config: &BridgeConfig,
        in_tx: Sender<InboundMsg>,
        out_rx: Receiver<OutboundMsg>,
    ) -> Result<Self, BridgeError> {
        let url = config.parsed_url()?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_for_thread = Arc::clone(&shutdown);
        let read_timeout = config.read_timeout;
        let backoff = Backoff::new(config.reconnect_delays.clone());

        let join_handle = thread::Builder::new()
            .name("chem-master-net".to_string())
            .spawn(move || {
                run_client(url, read_timeout, backoff, in_tx, out_rx, shutdown_for_thread)
            })
            .map_err(BridgeError::Spawn)?;

        Ok(Self {
            shutdown,
            join_handle: Mutex::new(Some(join_handle)),
        })
    }

    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Ok(mut h) = self.join_handle.lock() {
            if let Some(h) = h.take() {
                let _ = h.join();
            }
        }
    }
}

impl Drop for NetworkThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

enum ConnectionEnd {
    Lost,
    Stopped,
}

fn run_client(
    url: Url,
    read_timeout: Duration,
    mut backoff: Backoff,
    in_tx: Sender<InboundMsg>,
    out_rx: Receiver<OutboundMsg>,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        let mut ws = match connect(&url, read_timeout) {
            Ok(ws) => {
                backoff.reset();
                info!(url = %url, "connected to backend");
                ws
            }
            Err(e) => {
                let retry = backoff.next_delay();
                warn!(url = %url, error = %e, retry_in = ?retry, "backend connect failed");
                sleep_unless_shutdown(retry, &shutdown);
                continue;
            }
        };

        let _ = in_tx.try_send(InboundMsg::Connected);
        let end = serve_connection(&mut ws, &in_tx, &out_rx, &shutdown);
        let _ = ws.close(None);
        let _ = ws.flush();
        let _ = in_tx.try_send(InboundMsg::Disconnected);

        match end {
            ConnectionEnd::Stopped => return,
            ConnectionEnd::Lost => info!(url = %url, "backend connection lost"),
        }
    }
}

fn connect(url: &Url, read_timeout: Duration) -> Result<WebSocket<TcpStream>, String> {
    let addrs: Vec<SocketAddr> = url
        .socket_addrs(|| Some(80))
        .map_err(|e| format!("resolve failed: {e}"))?;
    let mut last_err = "no addresses resolved".to_string();
    for addr in addrs {
        let stream = match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(s) => s,
            Err(e) => {
                last_err = format!("tcp connect to {addr} failed: {e}");
                continue;
            }
        };
        let _ = stream.set_nodelay(true);
        let _ = stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT));
        let _ = stream.set_write_timeout(Some(WRITE_TIMEOUT));

        let (ws, _) = tungstenite::client(url.as_str(), stream)
            .map_err(|e| format!("ws handshake failed: {e}"))?;
        ws.get_ref()
            .set_read_timeout(Some(read_timeout))
            .map_err(|e| format!("set read timeout failed: {e}"))?;
        return Ok(ws);
    }
    Err(last_err)
}

fn serve_connection(
    ws: &mut WebSocket<TcpStream>,
    in_tx: &Sender<InboundMsg>,
    out_rx: &Receiver<OutboundMsg>,
    shutdown: &AtomicBool,
) -> ConnectionEnd {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            return ConnectionEnd::Stopped;
        }

        // Outbound: drain queued actions.
        loop {
            match out_rx.try_recv() {
                Ok(OutboundMsg::Send { cmd }) => {
                    if let Err(e) = send_command(ws, &cmd) {
                        warn!(error = %e, "send to backend failed");
                        return ConnectionEnd::Lost;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return ConnectionEnd::Stopped,
            }
        }

        // Inbound: read at most one frame per loop (timeouts keep the loop moving).
        match ws.read() {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                Ok(msg) => {
                    if in_tx.try_send(InboundMsg::Server { msg }).is_err() {
                        warn!("inbound queue full; dropping server frame");
                    }
                }
                Err(e) => warn!(error = %e, "undecodable server frame"),
            },
            Ok(Message::Close(_)) => return ConnectionEnd::Lost,
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(tungstenite::Error::ConnectionClosed) => return ConnectionEnd::Lost,
            Err(e) => {
                debug!(error = %e, "ws read failed");
                return ConnectionEnd::Lost;
            }
        }
    }
}

fn send_command(ws: &mut WebSocket<TcpStream>, cmd: &ClientCommand) -> Result<(), String> {
    let payload = serde_json::to_string(cmd).map_err(|e| e.to_string())?;
    ws.send(Message::Text(payload.into()))
        .map_err(|e| e.to_string())
}

fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) {
    let mut slept = Duration::ZERO;
    while slept < total && !shutdown.load(Ordering::Relaxed) {
        let step = SHUTDOWN_POLL.min(total - slept);
        thread::sleep(step);
        slept += step;
    }
}

struct Backoff {
    delays: Vec<Duration>,
    idx: usize,
}

impl Backoff {
    fn new(delays: Vec<Duration>) -> Self {
        Self { delays, idx: 0 }
    }

    fn reset(&mut self) {
        self.idx = 0;
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self
            .delays
            .get(self.idx)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::from_secs(1));
        self.idx = (self.idx + 1).min(self.delays.len());
        delay
    }
}
