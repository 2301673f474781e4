use std::io;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid backend url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("ws bind failed on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn network thread: {0}")]
    Spawn(#[source] io::Error),
}
