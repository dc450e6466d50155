//! Client side of the RTSP signaling protocol (RFC 2326).
//!
//! Just enough to probe a stream: split the address, build requests, parse
//! responses and look inside the SDP returned by DESCRIBE.
//!
//! ## RTSP message format (RFC 2326 §4)
//!
//! RTSP messages follow HTTP/1.1 syntax with a different method set:
//!
//! ```text
//! DESCRIBE rtsp://server/stream RTSP/1.0\r\n
//! CSeq: 2\r\n
//! Accept: application/sdp\r\n
//! \r\n
//! ```
//!
//! ## Methods used
//!
//! | Method | RFC section | Purpose |
//! |--------|-------------|---------|
//! | OPTIONS | §10.1 | Reachability and capability check |
//! | DESCRIBE | §10.2 | Retrieve the SDP session description |

pub mod request;
pub mod response;
pub mod sdp;
pub mod uri;

pub use request::RtspRequest;
pub use response::RtspResponse;
pub use uri::RtspUri;
