use std::collections::HashMap;
use std::io::{self, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::classify::{FailureCause, TransportFailure, UnsupportedFormatError};
use crate::error::{ParseErrorKind, ProtocolError, TransportCreationError};
use crate::protocol::sdp::{self, MediaDescription};
use crate::protocol::{RtspRequest, RtspResponse, RtspUri};
use crate::transport::{EventSink, MediaTransport, OpenOptions, RawState, ResourceHandle};

/// Upper bound on any single handshake, whatever the configured timeout.
const MAX_HANDSHAKE_TIME: Duration = Duration::from_secs(24 * 60 * 60);

/// Reasons a probe handshake fails. Classified through its source chain.
#[derive(Debug, thiserror::Error)]
enum ProbeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Format(#[from] UnsupportedFormatError),

    #[error("RTSP {code} {reason}")]
    Status { code: u16, reason: String },
}

/// Transport that establishes an RTSP session description over TCP.
///
/// `prepare_and_play` runs `OPTIONS` and `DESCRIBE` on a background thread
/// and reports [`RawState::Ready`] once the server has described at least one
/// media section. No RTP is received, so [`RawState::Ended`] never occurs.
/// Useful as a connectivity and format check, and as the engine behind the
/// `rtsp-player` shell.
///
/// Every attempt carries a cancellation flag. `pause`, `stop`, `release` and
/// a repeated `prepare_and_play` raise it so a slow handshake cannot report
/// into a resource the caller has moved on from.
#[derive(Default)]
pub struct RtspProbeTransport {
    next_id: u64,
    probes: HashMap<ResourceHandle, Probe>,
}

struct Probe {
    uri: RtspUri,
    timeout: Duration,
    events: EventSink,
    cancel: Arc<AtomicBool>,
}

impl Probe {
    fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }
}

impl RtspProbeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources opened and not yet released.
    #[cfg(test)]
    fn live_resources(&self) -> usize {
        self.probes.len()
    }
}

impl MediaTransport for RtspProbeTransport {
    fn open(
        &mut self,
        address: &str,
        options: &OpenOptions,
        events: EventSink,
    ) -> Result<ResourceHandle, TransportCreationError> {
        let uri = RtspUri::parse(address)?;

        if !options.force_reliable_transport {
            tracing::warn!("probe transport is TCP-only, ignoring UDP preference");
        }

        self.next_id += 1;
        let handle = ResourceHandle::new(self.next_id);

        tracing::debug!(%handle, host = %uri.host, port = uri.port, "probe resource opened");

        self.probes.insert(
            handle,
            Probe {
                uri,
                timeout: Duration::from_millis(options.timeout_ms),
                events,
                cancel: Arc::new(AtomicBool::new(true)),
            },
        );

        Ok(handle)
    }

    fn prepare_and_play(&mut self, handle: ResourceHandle) {
        let Some(probe) = self.probes.get_mut(&handle) else {
            tracing::debug!(%handle, "prepare for unknown resource");
            return;
        };

        probe.cancel();
        let cancel = Arc::new(AtomicBool::new(false));
        probe.cancel = cancel.clone();

        let uri = probe.uri.clone();
        let timeout = probe.timeout;
        let events = probe.events.clone();

        thread::spawn(move || {
            run_probe(handle, &uri, timeout, &events, &cancel);
        });
    }

    fn pause(&mut self, handle: ResourceHandle) {
        if let Some(probe) = self.probes.get(&handle) {
            probe.cancel();
            tracing::debug!(%handle, "probe paused");
        }
    }

    fn stop(&mut self, handle: ResourceHandle) {
        if let Some(probe) = self.probes.get(&handle) {
            probe.cancel();
            tracing::debug!(%handle, "probe stopped");
        }
    }

    fn release(&mut self, handle: ResourceHandle) {
        if let Some(probe) = self.probes.remove(&handle) {
            probe.cancel();
            tracing::debug!(%handle, remaining = self.probes.len(), "probe resource released");
        }
    }
}

/// Body of one probe attempt. Emits nothing once `cancel` is raised.
fn run_probe(
    handle: ResourceHandle,
    uri: &RtspUri,
    timeout: Duration,
    events: &EventSink,
    cancel: &AtomicBool,
) {
    let live = || !cancel.load(Ordering::SeqCst);

    if live() {
        events.state_changed(handle, RawState::Buffering);
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handshake(uri, timeout)));

    match outcome {
        Ok(Ok(media)) => {
            let codecs: Vec<&str> = media
                .iter()
                .flat_map(|m| m.codecs.iter().map(String::as_str))
                .collect();
            tracing::info!(%handle, authority = %uri.authority(), tracks = media.len(), ?codecs, "stream described");
            if live() {
                events.state_changed(handle, RawState::Ready);
            }
        }
        Ok(Err(e)) => {
            tracing::warn!(%handle, authority = %uri.authority(), error = %e, "probe failed");
            if live() {
                events.error(handle, TransportFailure::from_error(&e));
            }
        }
        Err(_) => {
            tracing::error!(%handle, authority = %uri.authority(), "probe handshake panicked");
            if live() {
                events.error(
                    handle,
                    TransportFailure::new(FailureCause::Other, "RTSP handshake aborted"),
                );
            }
        }
    }
}

/// OPTIONS then DESCRIBE on a fresh connection, all within `timeout`.
fn handshake(uri: &RtspUri, timeout: Duration) -> Result<Vec<MediaDescription>, ProbeError> {
    let deadline = Instant::now() + timeout.min(MAX_HANDSHAKE_TIME);
    let stream = connect(uri, deadline)?;

    let mut writer = DeadlineStream::new(stream.try_clone()?, deadline);
    let mut reader = BufReader::new(DeadlineStream::new(stream, deadline));

    let request_uri = uri.request_uri();
    let authorization = uri.authorization();
    let authorize = |request: RtspRequest| match &authorization {
        Some(value) => request.add_header("Authorization", value),
        None => request,
    };

    let options = authorize(RtspRequest::new("OPTIONS", &request_uri, 1));
    expect_success(exchange(&mut writer, &mut reader, &options)?)?;

    let describe = authorize(
        RtspRequest::new("DESCRIBE", &request_uri, 2).add_header("Accept", "application/sdp"),
    );
    let response = expect_success(exchange(&mut writer, &mut reader, &describe)?)?;

    match response.content_type() {
        Some(content_type) if content_type == "application/sdp" => {}
        other => {
            return Err(UnsupportedFormatError(format!(
                "DESCRIBE answered with {}",
                other.as_deref().unwrap_or("no content type")
            ))
            .into());
        }
    }

    let media = sdp::parse_media(response.body.as_deref().unwrap_or(""));
    if media.is_empty() {
        return Err(UnsupportedFormatError("session description has no media".to_string()).into());
    }

    Ok(media)
}

fn connect(uri: &RtspUri, deadline: Instant) -> io::Result<TcpStream> {
    let mut last_err = None;

    for addr in (uri.host.as_str(), uri.port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, remaining(deadline)?) {
            Ok(stream) => {
                tracing::debug!(%addr, "probe connected");
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!(%addr, error = %e, "probe connect attempt failed");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} did not resolve to any address", uri.host),
        )
    }))
}

/// Time left before `deadline`, or `TimedOut` once it has passed.
fn remaining(deadline: Instant) -> io::Result<Duration> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
        .ok_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "RTSP handshake timed out"))
}

/// A socket whose reads and writes share one deadline, so a peer that
/// trickles bytes cannot stretch the handshake.
struct DeadlineStream {
    stream: TcpStream,
    deadline: Instant,
}

impl DeadlineStream {
    fn new(stream: TcpStream, deadline: Instant) -> Self {
        Self { stream, deadline }
    }
}

impl Read for DeadlineStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.set_read_timeout(Some(remaining(self.deadline)?))?;
        self.stream.read(buf)
    }
}

impl Write for DeadlineStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.set_write_timeout(Some(remaining(self.deadline)?))?;
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

fn exchange(
    writer: &mut DeadlineStream,
    reader: &mut BufReader<DeadlineStream>,
    request: &RtspRequest,
) -> Result<RtspResponse, ProbeError> {
    tracing::trace!(method = %request.method, uri = %request.uri, "request");
    writer.write_all(request.serialize().as_bytes())?;

    match RtspResponse::read_from(reader) {
        Ok(response) => {
            tracing::trace!(status = response.status_code, "response");
            Ok(response)
        }
        Err(ProtocolError::Parse {
            kind: ParseErrorKind::NotRtsp,
        }) => Err(UnsupportedFormatError("server did not answer with RTSP".to_string()).into()),
        Err(e) => Err(e.into()),
    }
}

fn expect_success(response: RtspResponse) -> Result<RtspResponse, ProbeError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(ProbeError::Status {
            code: response.status_code,
            reason: response.status_text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> OpenOptions {
        OpenOptions {
            force_reliable_transport: true,
            timeout_ms: 1_000,
        }
    }

    #[test]
    fn open_rejects_missing_host() {
        let mut transport = RtspProbeTransport::new();
        let err = transport
            .open("rtsp://", &options(), EventSink::new(|_| {}))
            .unwrap_err();
        assert_eq!(err.to_string(), "address has no host");
        assert_eq!(transport.live_resources(), 0);
    }

    #[test]
    fn handles_are_unique_and_released() {
        let mut transport = RtspProbeTransport::new();
        let a = transport
            .open("rtsp://cam/a", &options(), EventSink::new(|_| {}))
            .unwrap();
        let b = transport
            .open("rtsp://cam/b", &options(), EventSink::new(|_| {}))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(transport.live_resources(), 2);

        transport.release(a);
        transport.release(a);
        assert_eq!(transport.live_resources(), 1);
    }

    #[test]
    fn status_error_is_generic() {
        let err = ProbeError::Status {
            code: 404,
            reason: "Not Found".into(),
        };
        let failure = TransportFailure::from_error(&err);
        assert_eq!(failure.cause, FailureCause::Other);
        assert_eq!(failure.raw_message, "RTSP 404 Not Found");
    }

    #[test]
    fn protocol_io_error_is_network() {
        let err = ProbeError::from(ProtocolError::from(io::Error::new(
            io::ErrorKind::TimedOut,
            "timed out",
        )));
        assert_eq!(TransportFailure::from_error(&err).cause, FailureCause::Io);
    }

    #[test]
    fn passed_deadline_is_timeout() {
        let deadline = Instant::now();
        thread::sleep(Duration::from_millis(2));
        let err = remaining(deadline).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        let left = remaining(Instant::now() + Duration::from_secs(5)).unwrap();
        assert!(left <= Duration::from_secs(5));
    }

    #[test]
    fn format_error_is_unsupported() {
        let err = ProbeError::from(UnsupportedFormatError("no media".into()));
        assert_eq!(
            TransportFailure::from_error(&err).cause,
            FailureCause::UnsupportedFormat
        );
    }
}
