pub mod address;
pub mod classify;
pub mod controller;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use classify::{FailureCause, TransportFailure, UserError, classify};
pub use controller::{SessionConfig, SessionController};
pub use error::{Result, SessionError, TransportCreationError, ValidationError};
pub use session::{Command, PlayerState, Session, SessionSnapshot};
pub use transport::{
    EventSink, MediaTransport, OpenOptions, RawState, ResourceHandle, RtspProbeTransport,
    TransportEvent,
};
