//! Playback session state machine.
//!
//! A [`Session`] owns the observable playback state, the draft stream
//! address, the last error message and at most one live transport resource.
//! It is a plain single-threaded value: callers serialize access to it (the
//! [`SessionController`](crate::SessionController) does so on a worker
//! thread) and pass in the transport for each command.
//!
//! ## Transitions
//!
//! ```text
//! Initial/Error/Ended --start(valid)--> Buffering --ready--> Ready
//! any                 --start(invalid)--> Error
//! Buffering/Ready     --transport error--> Error
//! Ready               --pause--> Paused --start--> Buffering
//! Ready               --ended--> Ended
//! any                 --stop--> Initial
//! ```
//!
//! Transport notifications are only honored for the live resource; anything
//! tagged with a superseded handle is dropped.

pub mod state;

use crate::address;
use crate::classify::classify;
use crate::transport::{
    EventSink, MediaTransport, OpenOptions, RawState, ResourceHandle, TransportEvent,
};

pub use state::{Command, PlayerState, SessionSnapshot};

/// The live transport resource and the address it was opened with.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveSource {
    handle: ResourceHandle,
    address: String,
}

/// A single playback session.
#[derive(Debug)]
pub struct Session {
    state: PlayerState,
    stream_address: String,
    error_message: Option<String>,
    source: Option<ActiveSource>,
    options: OpenOptions,
}

impl Session {
    /// Create an idle session. `options` are applied to every resource it opens.
    pub fn new(options: OpenOptions) -> Self {
        Session {
            state: PlayerState::Initial,
            stream_address: String::new(),
            error_message: None,
            source: None,
            options,
        }
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn stream_address(&self) -> &str {
        &self.stream_address
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Handle of the live transport resource, if any.
    pub fn live_handle(&self) -> Option<ResourceHandle> {
        self.source.as_ref().map(|s| s.handle)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            stream_address: self.stream_address.clone(),
            error_message: self.error_message.clone(),
        }
    }

    /// Replace the draft address. Never touches the live resource.
    pub fn update_address(&mut self, address: &str) {
        self.stream_address = address.trim().to_string();
        tracing::debug!(address = %self.stream_address, "stream address updated");
    }

    /// Start, resume, retry or replay playback of the draft address.
    ///
    /// Resuming from [`PlayerState::Paused`] re-issues play on the live
    /// resource as long as the draft address still matches it. In every other
    /// case the live resource is torn down and a fresh one is opened.
    pub fn start(&mut self, transport: &mut dyn MediaTransport, events: &EventSink) -> PlayerState {
        let address = match address::validate(&self.stream_address) {
            Ok(address) => address,
            Err(e) => {
                tracing::warn!(address = %self.stream_address, error = ?e, "rejected stream address");
                self.fail(e.to_string());
                return self.state;
            }
        };

        if self.state == PlayerState::Paused
            && let Some(source) = &self.source
            && source.address == address.as_str()
        {
            let handle = source.handle;
            tracing::info!(%handle, "resuming playback");
            self.set_state(PlayerState::Buffering);
            transport.prepare_and_play(handle);
            return self.state;
        }

        self.set_state(PlayerState::Buffering);
        self.release_source(transport);

        match transport.open(address.as_str(), &self.options, events.clone()) {
            Ok(handle) => {
                tracing::info!(
                    %handle,
                    address = %address,
                    force_reliable_transport = self.options.force_reliable_transport,
                    timeout_ms = self.options.timeout_ms,
                    "media source opened"
                );
                self.source = Some(ActiveSource {
                    handle,
                    address: address.into_string(),
                });
                transport.prepare_and_play(handle);
            }
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "failed to create media source");
                self.fail(format!("Failed to create media source: {e}"));
            }
        }

        self.state
    }

    /// Pause playback. Only honored in [`PlayerState::Ready`]; ignored
    /// elsewhere.
    pub fn pause(&mut self, transport: &mut dyn MediaTransport) -> PlayerState {
        match (self.state, self.live_handle()) {
            (PlayerState::Ready, Some(handle)) => {
                transport.pause(handle);
                tracing::info!(%handle, "playback paused");
                self.set_state(PlayerState::Paused);
            }
            (state, _) => {
                tracing::debug!(%state, "pause ignored");
            }
        }
        self.state
    }

    /// Stop playback from any state, releasing the live resource.
    pub fn stop(&mut self, transport: &mut dyn MediaTransport) -> PlayerState {
        if let Some(source) = self.source.take() {
            transport.stop(source.handle);
            transport.release(source.handle);
            tracing::info!(handle = %source.handle, "playback stopped");
        }
        self.set_state(PlayerState::Initial);
        self.state
    }

    /// Release the live resource without a stop call. Idempotent.
    pub fn teardown(&mut self, transport: &mut dyn MediaTransport) {
        if let Some(source) = self.source.take() {
            transport.release(source.handle);
            tracing::info!(handle = %source.handle, "session torn down");
        }
        self.set_state(PlayerState::Initial);
    }

    /// Apply a transport notification. Returns `false` when it was dropped.
    pub fn handle_event(&mut self, event: TransportEvent) -> bool {
        if self.live_handle() != Some(event.handle()) {
            tracing::trace!(handle = %event.handle(), "dropping event for superseded resource");
            return false;
        }

        match event {
            TransportEvent::Error { handle, failure } => {
                let message = classify(&failure).to_string();
                tracing::warn!(
                    %handle,
                    cause = %failure.cause,
                    raw = %failure.raw_message,
                    "transport error"
                );
                self.fail(message);
                true
            }
            TransportEvent::StateChanged { handle, state } => self.apply_raw_state(handle, state),
        }
    }

    fn apply_raw_state(&mut self, handle: ResourceHandle, raw: RawState) -> bool {
        let next = PlayerState::from(raw);

        let accepted = match self.state {
            // only start/stop leave an error
            PlayerState::Error => false,
            PlayerState::Paused => !matches!(next, PlayerState::Ready | PlayerState::Buffering),
            _ => true,
        };

        if !accepted {
            tracing::trace!(%handle, ?raw, state = %self.state, "transport state ignored");
            return false;
        }

        self.set_state(next);
        true
    }

    fn release_source(&mut self, transport: &mut dyn MediaTransport) {
        if let Some(source) = self.source.take() {
            transport.stop(source.handle);
            transport.release(source.handle);
            tracing::debug!(handle = %source.handle, "previous media source released");
        }
    }

    /// Enter [`PlayerState::Error`] with a user-facing message.
    fn fail(&mut self, message: String) {
        self.set_state(PlayerState::Error);
        self.error_message = Some(message);
    }

    /// Transition to a new state. Leaving the error state clears its message.
    fn set_state(&mut self, state: PlayerState) {
        if self.state != state {
            tracing::debug!(old_state = %self.state, new_state = %state, "state transition");
        }
        self.state = state;
        if state != PlayerState::Error {
            self.error_message = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{FailureCause, TransportFailure};
    use crate::error::{INVALID_ADDRESS_MESSAGE, TransportCreationError};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Open(String),
        PrepareAndPlay(u64),
        Pause(u64),
        Stop(u64),
        Release(u64),
    }

    #[derive(Default)]
    struct FakeTransport {
        calls: Vec<Call>,
        next_id: u64,
        reject: Option<String>,
    }

    impl MediaTransport for FakeTransport {
        fn open(
            &mut self,
            address: &str,
            _options: &OpenOptions,
            _events: EventSink,
        ) -> Result<ResourceHandle, TransportCreationError> {
            self.calls.push(Call::Open(address.to_string()));
            if let Some(reason) = &self.reject {
                return Err(TransportCreationError::Rejected(reason.clone()));
            }
            self.next_id += 1;
            Ok(ResourceHandle::new(self.next_id))
        }

        fn prepare_and_play(&mut self, handle: ResourceHandle) {
            self.calls.push(Call::PrepareAndPlay(handle.id()));
        }

        fn pause(&mut self, handle: ResourceHandle) {
            self.calls.push(Call::Pause(handle.id()));
        }

        fn stop(&mut self, handle: ResourceHandle) {
            self.calls.push(Call::Stop(handle.id()));
        }

        fn release(&mut self, handle: ResourceHandle) {
            self.calls.push(Call::Release(handle.id()));
        }
    }

    fn options() -> OpenOptions {
        OpenOptions {
            force_reliable_transport: true,
            timeout_ms: 10_000,
        }
    }

    fn sink() -> EventSink {
        EventSink::new(|_| {})
    }

    fn ready(handle: ResourceHandle) -> TransportEvent {
        TransportEvent::StateChanged {
            handle,
            state: RawState::Ready,
        }
    }

    fn io_error(handle: ResourceHandle) -> TransportEvent {
        TransportEvent::Error {
            handle,
            failure: TransportFailure::new(FailureCause::Io, "connection reset"),
        }
    }

    fn playing(transport: &mut FakeTransport) -> (Session, ResourceHandle) {
        let mut session = Session::new(options());
        session.update_address("rtsp://cam/live");
        session.start(transport, &sink());
        let handle = session.live_handle().unwrap();
        assert!(session.handle_event(ready(handle)));
        (session, handle)
    }

    #[test]
    fn update_address_trims_and_keeps_state() {
        let mut session = Session::new(options());
        session.update_address("  rtsp://cam/live  ");
        assert_eq!(session.stream_address(), "rtsp://cam/live");
        assert_eq!(session.state(), PlayerState::Initial);
    }

    #[test]
    fn invalid_address_fails_without_transport_call() {
        let mut transport = FakeTransport::default();
        let mut session = Session::new(options());
        session.update_address("http://cam/live");

        assert_eq!(session.start(&mut transport, &sink()), PlayerState::Error);
        assert_eq!(session.error_message(), Some(INVALID_ADDRESS_MESSAGE));
        assert!(transport.calls.is_empty());
    }

    #[test]
    fn start_opens_and_plays() {
        let mut transport = FakeTransport::default();
        let mut session = Session::new(options());
        session.update_address("rtsp://cam/live");

        assert_eq!(session.start(&mut transport, &sink()), PlayerState::Buffering);
        assert_eq!(
            transport.calls,
            vec![Call::Open("rtsp://cam/live".into()), Call::PrepareAndPlay(1)]
        );
        assert_eq!(session.live_handle(), Some(ResourceHandle::new(1)));
    }

    #[test]
    fn creation_failure_surfaces_message() {
        let mut transport = FakeTransport {
            reject: Some("missing host".into()),
            ..Default::default()
        };
        let mut session = Session::new(options());
        session.update_address("rtsp://");

        assert_eq!(session.start(&mut transport, &sink()), PlayerState::Error);
        assert_eq!(
            session.error_message(),
            Some("Failed to create media source: missing host")
        );
        assert_eq!(session.live_handle(), None);
    }

    #[test]
    fn restart_releases_previous_resource() {
        let mut transport = FakeTransport::default();
        let (mut session, first) = playing(&mut transport);
        transport.calls.clear();

        session.start(&mut transport, &sink());

        assert_eq!(
            transport.calls,
            vec![
                Call::Stop(first.id()),
                Call::Release(first.id()),
                Call::Open("rtsp://cam/live".into()),
                Call::PrepareAndPlay(2),
            ]
        );
    }

    #[test]
    fn pause_and_resume_reuse_resource() {
        let mut transport = FakeTransport::default();
        let (mut session, handle) = playing(&mut transport);
        transport.calls.clear();

        assert_eq!(session.pause(&mut transport), PlayerState::Paused);
        assert_eq!(session.start(&mut transport, &sink()), PlayerState::Buffering);
        assert_eq!(
            transport.calls,
            vec![Call::Pause(handle.id()), Call::PrepareAndPlay(handle.id())]
        );
        assert_eq!(session.live_handle(), Some(handle));
    }

    #[test]
    fn resume_after_address_change_reopens() {
        let mut transport = FakeTransport::default();
        let (mut session, handle) = playing(&mut transport);
        session.pause(&mut transport);
        session.update_address("rtsp://cam/other");
        transport.calls.clear();

        session.start(&mut transport, &sink());

        assert_eq!(
            transport.calls,
            vec![
                Call::Stop(handle.id()),
                Call::Release(handle.id()),
                Call::Open("rtsp://cam/other".into()),
                Call::PrepareAndPlay(2),
            ]
        );
    }

    #[test]
    fn pause_outside_ready_is_ignored() {
        let mut transport = FakeTransport::default();
        let mut session = Session::new(options());
        assert_eq!(session.pause(&mut transport), PlayerState::Initial);

        session.update_address("rtsp://cam/live");
        session.start(&mut transport, &sink());
        transport.calls.clear();
        assert_eq!(session.pause(&mut transport), PlayerState::Buffering);
        assert!(transport.calls.is_empty());
    }

    #[test]
    fn stop_is_idempotent_and_clears_error() {
        let mut transport = FakeTransport::default();
        let (mut session, handle) = playing(&mut transport);
        session.handle_event(io_error(handle));
        assert!(session.error_message().is_some());

        assert_eq!(session.stop(&mut transport), PlayerState::Initial);
        let once = session.snapshot();
        assert_eq!(session.stop(&mut transport), PlayerState::Initial);

        assert_eq!(session.snapshot(), once);
        assert_eq!(once.error_message, None);
        assert_eq!(session.live_handle(), None);
        let releases = transport
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Release(_)))
            .count();
        assert_eq!(releases, 1);
    }

    #[test]
    fn error_event_wins_in_any_live_state() {
        let mut transport = FakeTransport::default();

        let (mut session, handle) = playing(&mut transport);
        session.pause(&mut transport);
        assert!(session.handle_event(io_error(handle)));
        assert_eq!(session.state(), PlayerState::Error);
        assert_eq!(
            session.error_message(),
            Some("Network connection issue. Check your internet and stream availability.")
        );
    }

    #[test]
    fn error_is_sticky_against_state_events() {
        let mut transport = FakeTransport::default();
        let (mut session, handle) = playing(&mut transport);
        session.handle_event(io_error(handle));

        let idle = TransportEvent::StateChanged {
            handle,
            state: RawState::Idle,
        };
        assert!(!session.handle_event(idle));
        assert_eq!(session.state(), PlayerState::Error);
        assert!(session.error_message().is_some());
    }

    #[test]
    fn paused_ignores_ready_but_not_ended() {
        let mut transport = FakeTransport::default();
        let (mut session, handle) = playing(&mut transport);
        session.pause(&mut transport);

        assert!(!session.handle_event(ready(handle)));
        assert_eq!(session.state(), PlayerState::Paused);

        let ended = TransportEvent::StateChanged {
            handle,
            state: RawState::Ended,
        };
        assert!(session.handle_event(ended));
        assert_eq!(session.state(), PlayerState::Ended);
    }

    #[test]
    fn superseded_handle_is_ignored() {
        let mut transport = FakeTransport::default();
        let mut session = Session::new(options());
        session.update_address("rtsp://cam/live");
        session.start(&mut transport, &sink());
        let first = session.live_handle().unwrap();
        session.start(&mut transport, &sink());

        assert!(!session.handle_event(ready(first)));
        assert!(!session.handle_event(io_error(first)));
        assert_eq!(session.state(), PlayerState::Buffering);
        assert_eq!(session.error_message(), None);
    }

    #[test]
    fn unknown_raw_state_maps_to_initial() {
        let mut transport = FakeTransport::default();
        let (mut session, handle) = playing(&mut transport);
        let odd = TransportEvent::StateChanged {
            handle,
            state: RawState::Unknown(99),
        };
        assert!(session.handle_event(odd));
        assert_eq!(session.state(), PlayerState::Initial);
    }

    #[test]
    fn teardown_releases_once() {
        let mut transport = FakeTransport::default();
        let (mut session, handle) = playing(&mut transport);
        transport.calls.clear();

        session.teardown(&mut transport);
        session.teardown(&mut transport);

        assert_eq!(transport.calls, vec![Call::Release(handle.id())]);
        assert_eq!(session.state(), PlayerState::Initial);
    }

    #[test]
    fn ended_and_error_accept_start() {
        let mut transport = FakeTransport::default();
        let (mut session, handle) = playing(&mut transport);
        let ended = TransportEvent::StateChanged {
            handle,
            state: RawState::Ended,
        };
        session.handle_event(ended);
        assert_eq!(session.start(&mut transport, &sink()), PlayerState::Buffering);

        let handle = session.live_handle().unwrap();
        session.handle_event(io_error(handle));
        assert_eq!(session.start(&mut transport, &sink()), PlayerState::Buffering);
        assert_eq!(session.error_message(), None);
    }
}
