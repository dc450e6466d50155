//! Translation of transport failures into user-facing errors.
//!
//! Media engines tend to wrap every failure in one top-level error type, so
//! the category is decided by the root cause, not by the outer error.

use std::error::Error as StdError;
use std::fmt;

/// Root-cause category reported with a [`TransportFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    /// The stream's container or codec was not recognized.
    UnsupportedFormat,
    /// Connectivity or socket-level failure, including timeouts.
    Io,
    /// Anything else the transport reports.
    Other,
}

/// Asynchronous failure reported by the transport for a live resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    pub cause: FailureCause,
    /// The transport's own description of the failure.
    pub raw_message: String,
}

impl TransportFailure {
    pub fn new(cause: FailureCause, raw_message: impl Into<String>) -> Self {
        Self {
            cause,
            raw_message: raw_message.into(),
        }
    }

    /// Build a failure from a Rust error, deriving the cause from its
    /// `source()` chain.
    ///
    /// An [`UnsupportedFormatError`] anywhere in the chain takes precedence
    /// over an [`std::io::Error`]; everything else is [`FailureCause::Other`].
    /// The raw message is the outermost error's `Display`.
    pub fn from_error(error: &(dyn StdError + 'static)) -> Self {
        let mut cause = FailureCause::Other;
        let mut current = Some(error);

        while let Some(err) = current {
            if is_unsupported_format(err) {
                cause = FailureCause::UnsupportedFormat;
                break;
            }
            if cause == FailureCause::Other && err.is::<std::io::Error>() {
                cause = FailureCause::Io;
            }
            current = err.source();
        }

        Self::new(cause, error.to_string())
    }
}

fn is_unsupported_format(err: &(dyn StdError + 'static)) -> bool {
    if err.is::<UnsupportedFormatError>() {
        return true;
    }
    // io::Error hides a custom payload from source(), look inside it
    err.downcast_ref::<std::io::Error>()
        .and_then(|io| io.get_ref())
        .is_some_and(|inner| inner.is::<UnsupportedFormatError>())
}

/// Marker error for streams the transport cannot decode or describe.
///
/// Put it in a failure's cause chain to have it classified as
/// [`UserError::UnsupportedFormat`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported stream format: {0}")]
pub struct UnsupportedFormatError(pub String);

/// User-facing error category, rendered as the session's error message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserError {
    #[error("Unsupported stream format. Check URL format and compatibility.")]
    UnsupportedFormat,
    #[error("Network connection issue. Check your internet and stream availability.")]
    NetworkIssue,
    #[error("Playback error: {0}")]
    Generic(String),
}

/// Classify a transport failure. First match wins: format, then I/O, then
/// a generic message carrying the raw transport text.
pub fn classify(failure: &TransportFailure) -> UserError {
    match failure.cause {
        FailureCause::UnsupportedFormat => UserError::UnsupportedFormat,
        FailureCause::Io => UserError::NetworkIssue,
        FailureCause::Other => UserError::Generic(failure.raw_message.clone()),
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat => write!(f, "unsupported format"),
            Self::Io => write!(f, "I/O failure"),
            Self::Other => write!(f, "other"),
        }
    }
}
