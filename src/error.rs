use std::path::PathBuf;

/// Why a connection attempt was refused. The `Display` text is meant to be
/// shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionRejection {
    #[error("already connected.")]
    AlreadyConnected,
    #[error("an output port allows only one connection.")]
    OutputAlreadyConnected { port_id: String },
    #[error("cannot connect within the same node")]
    SameNode,
    #[error("cannot connect two ports of the same direction")]
    SameDirection,
    #[error("port {port_id} does not exist")]
    MissingPort { port_id: String },
}

impl ConnectionRejection {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// A merge-patch would have broken an entity invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("node size must be finite and positive, got {width}x{height}")]
    InvalidSize { width: f32, height: f32 },
    #[error("position must be finite, got ({x}, {y})")]
    InvalidPosition { x: f32, y: f32 },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },
}
