use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Result, SessionError};
use crate::session::{PlayerState, Session, SessionSnapshot};
use crate::transport::{EventSink, MediaTransport, OpenOptions, TransportEvent};

/// Default bound on connect/prepare, enforced by the transport.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Session-level configuration applied to every resource the controller opens.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Ask the transport to carry media over TCP instead of UDP.
    pub force_reliable_transport: bool,
    /// Connect/prepare timeout handed to the transport.
    pub timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            force_reliable_transport: true,
            timeout: DEFAULT_OPEN_TIMEOUT,
        }
    }
}

impl SessionConfig {
    pub fn open_options(&self) -> OpenOptions {
        OpenOptions {
            force_reliable_transport: self.force_reliable_transport,
            timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

enum Message {
    UpdateAddress(String),
    Start(Sender<PlayerState>),
    Pause(Sender<PlayerState>),
    Stop(Sender<PlayerState>),
    Teardown(Sender<()>),
    Snapshot(Sender<SessionSnapshot>),
    Subscribe(Sender<SessionSnapshot>),
    Transport(TransportEvent),
    Shutdown,
}

/// Thread-safe façade over a playback [`Session`].
///
/// A dedicated worker thread owns the session and the transport. Commands
/// and transport notifications are queued on one channel and applied in
/// order, so a command never observes a half-applied callback and vice
/// versa. Commands return once their synchronous part is done (validation,
/// resource creation, play dispatch); readiness and failures arrive later
/// and are visible through [`snapshot`](Self::snapshot) and
/// [`subscribe`](Self::subscribe).
///
/// Dropping the controller releases any live resource and joins the worker.
pub struct SessionController {
    tx: Sender<Message>,
    worker: Option<JoinHandle<()>>,
}

impl SessionController {
    pub fn new(transport: impl MediaTransport + 'static) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    /// Create a controller with custom transport options.
    pub fn with_config(transport: impl MediaTransport + 'static, config: SessionConfig) -> Self {
        let (tx, rx) = mpsc::channel();

        let events_tx = tx.clone();
        let events = EventSink::new(move |event| {
            // worker gone means the session is over; late events are moot
            let _ = events_tx.send(Message::Transport(event));
        });

        let session = Session::new(config.open_options());
        let worker = thread::spawn(move || {
            Worker::new(session, Box::new(transport), events).run(rx);
        });

        tracing::debug!(
            force_reliable_transport = config.force_reliable_transport,
            timeout_ms = config.open_options().timeout_ms,
            "session controller started"
        );

        Self {
            tx,
            worker: Some(worker),
        }
    }

    /// Store a new stream address. Takes effect on the next [`start`](Self::start).
    pub fn update_address(&self, address: &str) -> Result<()> {
        self.send(Message::UpdateAddress(address.to_string()))
    }

    /// Start, resume, retry or replay playback of the stored address.
    ///
    /// Returns [`PlayerState::Buffering`] on success or
    /// [`PlayerState::Error`] when the address or resource was rejected.
    pub fn start(&self) -> Result<PlayerState> {
        self.request(Message::Start)
    }

    /// Pause playback. Ignored unless the state is [`PlayerState::Ready`].
    pub fn pause(&self) -> Result<PlayerState> {
        self.request(Message::Pause)
    }

    /// Stop playback and release the resource. Always ends in
    /// [`PlayerState::Initial`].
    pub fn stop(&self) -> Result<PlayerState> {
        self.request(Message::Stop)
    }

    /// Release the resource unconditionally. Safe to call repeatedly.
    pub fn teardown(&self) -> Result<()> {
        self.request(Message::Teardown)
    }

    /// Current observable state, ordered after every previously queued
    /// command and notification.
    pub fn snapshot(&self) -> Result<SessionSnapshot> {
        self.request(Message::Snapshot)
    }

    pub fn player_state(&self) -> Result<PlayerState> {
        Ok(self.snapshot()?.state)
    }

    pub fn error_message(&self) -> Result<Option<String>> {
        Ok(self.snapshot()?.error_message)
    }

    pub fn stream_address(&self) -> Result<String> {
        Ok(self.snapshot()?.stream_address)
    }

    /// Receive a [`SessionSnapshot`] after every observable change.
    ///
    /// The current snapshot is delivered first. The subscription ends when
    /// the receiver is dropped or the controller shuts down.
    pub fn subscribe(&self) -> Result<Receiver<SessionSnapshot>> {
        let (tx, rx) = mpsc::channel();
        self.send(Message::Subscribe(tx))?;
        Ok(rx)
    }

    fn send(&self, message: Message) -> Result<()> {
        self.tx.send(message).map_err(|_| SessionError::Closed)
    }

    fn request<T>(&self, message: impl FnOnce(Sender<T>) -> Message) -> Result<T> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send(message(reply_tx))?;
        reply_rx.recv().map_err(|_| SessionError::Closed)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let _ = self.tx.send(Message::Shutdown);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("session worker panicked");
        }
    }
}

/// Owner of the session on the worker thread.
struct Worker {
    session: Session,
    transport: Box<dyn MediaTransport>,
    events: EventSink,
    subscribers: Vec<Sender<SessionSnapshot>>,
    published: SessionSnapshot,
}

impl Worker {
    fn new(session: Session, transport: Box<dyn MediaTransport>, events: EventSink) -> Self {
        let published = session.snapshot();
        Self {
            session,
            transport,
            events,
            subscribers: Vec::new(),
            published,
        }
    }

    fn run(mut self, rx: Receiver<Message>) {
        while let Ok(message) = rx.recv() {
            match message {
                Message::UpdateAddress(address) => self.session.update_address(&address),
                Message::Start(reply) => {
                    let state = self.session.start(&mut *self.transport, &self.events);
                    let _ = reply.send(state);
                }
                Message::Pause(reply) => {
                    let state = self.session.pause(&mut *self.transport);
                    let _ = reply.send(state);
                }
                Message::Stop(reply) => {
                    let state = self.session.stop(&mut *self.transport);
                    let _ = reply.send(state);
                }
                Message::Teardown(reply) => {
                    self.session.teardown(&mut *self.transport);
                    let _ = reply.send(());
                }
                Message::Snapshot(reply) => {
                    let _ = reply.send(self.session.snapshot());
                }
                Message::Subscribe(subscriber) => {
                    if subscriber.send(self.published.clone()).is_ok() {
                        self.subscribers.push(subscriber);
                    }
                }
                Message::Transport(event) => {
                    self.session.handle_event(event);
                }
                Message::Shutdown => break,
            }
            self.publish();
        }

        self.session.teardown(&mut *self.transport);
        self.publish();
        tracing::debug!("session worker exited");
    }

    /// Push the snapshot to subscribers if anything observable changed.
    fn publish(&mut self) {
        let snapshot = self.session.snapshot();
        if snapshot == self.published {
            return;
        }
        self.subscribers
            .retain(|subscriber| subscriber.send(snapshot.clone()).is_ok());
        self.published = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_reliable_with_ten_second_timeout() {
        let options = SessionConfig::default().open_options();
        assert!(options.force_reliable_transport);
        assert_eq!(options.timeout_ms, 10_000);
    }

    #[test]
    fn custom_timeout_converts_to_millis() {
        let config = SessionConfig {
            force_reliable_transport: false,
            timeout: Duration::from_millis(2_500),
        };
        assert_eq!(
            config.open_options(),
            OpenOptions {
                force_reliable_transport: false,
                timeout_ms: 2_500,
            }
        );
    }
}
