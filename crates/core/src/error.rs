//! Error types for the playback session library.

use std::fmt;

/// User-facing text shown for any address rejected by
/// [`validate`](crate::address::validate).
pub const INVALID_ADDRESS_MESSAGE: &str =
    "Invalid RTSP URL format. Use rtsp://username:password@ip:port/stream";

/// Errors returned by [`SessionController`](crate::SessionController) commands.
///
/// Playback failures never show up here: they are folded into
/// [`PlayerState::Error`](crate::PlayerState::Error) and the session's error
/// message. A command only fails when the controller itself is unusable.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The worker thread that owns the session has exited.
    #[error("session controller has shut down")]
    Closed,
}

/// Reasons a stream address is rejected before any transport call.
///
/// Both variants render the same user-facing message; match on the variant
/// when the cause matters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Address was empty or whitespace only.
    #[error("{}", INVALID_ADDRESS_MESSAGE)]
    Empty,
    /// Address does not start with `rtsp://`.
    #[error("{}", INVALID_ADDRESS_MESSAGE)]
    BadScheme,
}

/// The transport refused to construct a media resource.
///
/// Raised synchronously from [`MediaTransport::open`](crate::transport::MediaTransport::open).
#[derive(Debug, thiserror::Error)]
pub enum TransportCreationError {
    /// The address could not be parsed as an RTSP URI.
    #[error("{0}")]
    InvalidAddress(#[from] UriError),

    /// The transport rejected the input for its own reasons.
    #[error("{0}")]
    Rejected(String),
}

/// Failure to split an `rtsp://` address into its parts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UriError {
    #[error("address must start with rtsp://")]
    MissingScheme,
    #[error("address has no host")]
    MissingHost,
    #[error("invalid port: {0:?}")]
    InvalidPort(String),
}

/// Errors raised while exchanging RTSP messages with a server.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Socket failure, timeout, or connection closed mid-message.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer's answer could not be parsed (RFC 2326 §7).
    #[error("RTSP parse error: {kind}")]
    Parse { kind: ParseErrorKind },
}

/// Specific kind of RTSP response parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Status line does not start with `RTSP/` (e.g. an HTTP server answered).
    NotRtsp,
    /// Status line did not have the expected `Version Code Reason` format.
    InvalidStatusLine,
    /// A header line did not contain a colon separator.
    InvalidHeader,
    /// `Content-Length` was not a number or exceeded the body limit.
    InvalidContentLength,
    /// A status or header line ran past the line limit.
    LineTooLong,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRtsp => write!(f, "not an RTSP response"),
            Self::InvalidStatusLine => write!(f, "invalid status line"),
            Self::InvalidHeader => write!(f, "invalid header"),
            Self::InvalidContentLength => write!(f, "invalid content length"),
            Self::LineTooLong => write!(f, "line too long"),
        }
    }
}

/// Convenience alias for `Result<T, SessionError>`.
pub type Result<T> = std::result::Result<T, SessionError>;
