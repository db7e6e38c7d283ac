//! Error taxonomy shared by the proxy, the query layer, and the presenter.

use thiserror::Error;

/// Every failure gifscope knows how to name.
#[derive(Debug, Error)]
pub enum Error {
    /// The upstream search API answered non-2xx, or could not be reached at all.
    ///
    /// `status` is the upstream status when there was one, 500 otherwise. The proxy
    /// always answers its own callers with 500 and `message`.
    #[error("{message}")]
    UpstreamUnavailable { status: u16, message: String },

    /// A required configuration value is absent. Fatal at startup.
    #[error("missing required configuration: {0}")]
    ConfigMissing(&'static str),

    /// A configuration file exists but cannot be used.
    #[error("configuration error: {0}")]
    Config(String),

    /// The clipboard cannot hold this kind of content on this platform.
    #[error("clipboard unsupported: {0}")]
    ClipboardUnsupported(String),

    /// The clipboard rejected a write.
    #[error("clipboard write failed: {0}")]
    ClipboardWriteFailed(String),

    /// A media download died mid-flight.
    #[error("fetch aborted: {0}")]
    FetchAborted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Upstream failure with an explicit status.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Error::UpstreamUnavailable { status, message: message.into() }
    }

    /// Upstream unreachable: generic 500.
    pub fn upstream_unreachable() -> Self {
        Error::upstream(500, "Internal server error")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
