//! Boundary with the media transport engine.
//!
//! The session never talks RTSP or RTP itself. It drives a [`MediaTransport`]
//! through a handful of synchronous calls and learns about progress through
//! the [`EventSink`] handed over at [`open`](MediaTransport::open):
//!
//! ```text
//! open(address, options, sink) -> handle
//! prepare_and_play(handle)       ... sink.state_changed(handle, Buffering)
//!                                ... sink.state_changed(handle, Ready)
//!                                ... sink.error(handle, failure)
//! pause(handle) / stop(handle) / release(handle)
//! ```
//!
//! Notifications are tagged with the handle they belong to so a session can
//! drop late events from a resource it has already discarded.
//!
//! [`probe::RtspProbeTransport`] is a minimal engine that performs the RTSP
//! OPTIONS/DESCRIBE handshake over TCP.

pub mod probe;

use std::fmt;
use std::sync::Arc;

use crate::classify::TransportFailure;
use crate::error::TransportCreationError;

pub use probe::RtspProbeTransport;

/// Identity of one transport resource. Issued by the transport, compared by
/// the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// Options applied when constructing a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOptions {
    /// Force RTP over the RTSP TCP connection instead of UDP.
    pub force_reliable_transport: bool,
    /// Upper bound for connect/prepare, enforced by the transport.
    pub timeout_ms: u64,
}

/// Playback state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawState {
    Idle,
    Buffering,
    Ready,
    Ended,
    /// Engine-specific value with no known meaning.
    Unknown(i32),
}

/// An asynchronous notification from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    StateChanged {
        handle: ResourceHandle,
        state: RawState,
    },
    Error {
        handle: ResourceHandle,
        failure: TransportFailure,
    },
}

impl TransportEvent {
    pub fn handle(&self) -> ResourceHandle {
        match self {
            Self::StateChanged { handle, .. } | Self::Error { handle, .. } => *handle,
        }
    }
}

/// Callback channel from the transport back into the session.
///
/// Cheap to clone, callable from any thread. Delivery never blocks and never
/// runs session logic on the caller's stack, so a transport may emit from
/// inside one of its own [`MediaTransport`] methods.
#[derive(Clone)]
pub struct EventSink {
    deliver: Arc<dyn Fn(TransportEvent) + Send + Sync>,
}

impl EventSink {
    pub fn new(deliver: impl Fn(TransportEvent) + Send + Sync + 'static) -> Self {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    pub fn emit(&self, event: TransportEvent) {
        (self.deliver)(event);
    }

    pub fn state_changed(&self, handle: ResourceHandle, state: RawState) {
        self.emit(TransportEvent::StateChanged { handle, state });
    }

    pub fn error(&self, handle: ResourceHandle, failure: TransportFailure) {
        self.emit(TransportEvent::Error { handle, failure });
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink").finish_non_exhaustive()
    }
}

/// Capability surface of a media transport engine.
///
/// All methods are called from the session's worker thread and must not
/// block on the network: negotiation happens in the background and is
/// reported through the [`EventSink`]. Calls with a handle the transport no
/// longer knows are ignored.
pub trait MediaTransport: Send {
    /// Construct a resource for `address`. Fails synchronously only when the
    /// transport rejects the input outright.
    fn open(
        &mut self,
        address: &str,
        options: &OpenOptions,
        events: EventSink,
    ) -> Result<ResourceHandle, TransportCreationError>;

    /// Prepare the resource and start playback once ready. Also used to
    /// resume after [`pause`](Self::pause).
    fn prepare_and_play(&mut self, handle: ResourceHandle);

    fn pause(&mut self, handle: ResourceHandle);

    fn stop(&mut self, handle: ResourceHandle);

    /// Free the resource. The transport should stop emitting for `handle`;
    /// anything that still slips through is dropped by the session.
    fn release(&mut self, handle: ResourceHandle);
}

impl<T: MediaTransport + ?Sized> MediaTransport for Box<T> {
    fn open(
        &mut self,
        address: &str,
        options: &OpenOptions,
        events: EventSink,
    ) -> Result<ResourceHandle, TransportCreationError> {
        (**self).open(address, options, events)
    }

    fn prepare_and_play(&mut self, handle: ResourceHandle) {
        (**self).prepare_and_play(handle)
    }

    fn pause(&mut self, handle: ResourceHandle) {
        (**self).pause(handle)
    }

    fn stop(&mut self, handle: ResourceHandle) {
        (**self).stop(handle)
    }

    fn release(&mut self, handle: ResourceHandle) {
        (**self).release(handle)
    }
}
