/// Client identification sent with every request (RFC 2326 §12.41).
pub const USER_AGENT: &str = "rtsp-playback/0.1";

/// An outgoing RTSP request (RFC 2326 §6).
///
/// ```text
/// DESCRIBE rtsp://cam:554/live RTSP/1.0\r\n
/// CSeq: 2\r\n
/// User-Agent: rtsp-playback/0.1\r\n
/// Accept: application/sdp\r\n
/// \r\n
/// ```
///
/// Builder style like the response side: chain
/// [`add_header`](Self::add_header), then [`serialize`](Self::serialize).
#[must_use]
#[derive(Debug)]
pub struct RtspRequest {
    /// RTSP method (OPTIONS, DESCRIBE, ...).
    pub method: String,
    /// Request-URI, without credentials.
    pub uri: String,
    /// Headers in send order.
    pub headers: Vec<(String, String)>,
}

impl RtspRequest {
    /// Start a request. `CSeq` and `User-Agent` are always included.
    pub fn new(method: &str, uri: &str, cseq: u32) -> Self {
        RtspRequest {
            method: method.to_string(),
            uri: uri.to_string(),
            headers: vec![
                ("CSeq".to_string(), cseq.to_string()),
                ("User-Agent".to_string(), USER_AGENT.to_string()),
            ],
        }
    }

    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Serialize to the RTSP text wire format.
    pub fn serialize(&self) -> String {
        let mut request = format!("{} {} RTSP/1.0\r\n", self.method, self.uri);

        for (name, value) in &self.headers {
            request.push_str(&format!("{}: {}\r\n", name, value));
        }

        request.push_str("\r\n");
        request
    }
}
