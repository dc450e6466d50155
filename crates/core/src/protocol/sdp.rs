//! SDP (Session Description Protocol) inspection (RFC 4566 / RFC 8866).
//!
//! Only what a client needs to decide whether a DESCRIBE answer describes
//! something playable:
//!
//! ```text
//! v=0
//! o=- 0 0 IN IP4 10.0.0.5
//! s=Stream
//! m=video 0 RTP/AVP 96          ← media description
//! a=rtpmap:96 H264/90000        ← codec/clock rate
//! a=control:track1
//! ```

/// One `m=` section of a session description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescription {
    /// Media type (`video`, `audio`, ...).
    pub kind: String,
    /// Transport protocol from the `m=` line (e.g. `RTP/AVP`).
    pub protocol: String,
    /// Encoding names from `a=rtpmap` lines (e.g. `H264`).
    pub codecs: Vec<String>,
}

/// Extract the media sections from an SDP body. Unknown lines are skipped.
pub fn parse_media(sdp: &str) -> Vec<MediaDescription> {
    let mut media: Vec<MediaDescription> = Vec::new();

    for line in sdp.lines().map(str::trim) {
        if let Some(desc) = line.strip_prefix("m=") {
            let mut fields = desc.split_whitespace();
            let kind = fields.next().unwrap_or("").to_string();
            let protocol = fields.nth(1).unwrap_or("").to_string();
            if kind.is_empty() {
                continue;
            }
            media.push(MediaDescription {
                kind,
                protocol,
                codecs: Vec::new(),
            });
        } else if let Some(rtpmap) = line.strip_prefix("a=rtpmap:")
            && let Some(current) = media.last_mut()
        {
            // a=rtpmap:<pt> <encoding>/<clock>[/<params>]
            if let Some(encoding) = rtpmap
                .split_whitespace()
                .nth(1)
                .and_then(|e| e.split('/').next())
            {
                current.codecs.push(encoding.to_string());
            }
        }
    }

    tracing::trace!(sections = media.len(), "parsed SDP media");
    media
}
