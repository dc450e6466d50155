use std::io::{self, BufRead, Read};

use crate::error::{ParseErrorKind, ProtocolError};

/// Largest body accepted. A session description is a few hundred bytes.
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Largest status or header line accepted, terminator included.
pub const MAX_LINE_LENGTH: usize = 8 * 1024;

/// A parsed RTSP response (RFC 2326 §7).
///
/// ```text
/// RTSP/1.0 200 OK\r\n
/// CSeq: 2\r\n
/// Content-Type: application/sdp\r\n
/// Content-Length: 142\r\n
/// \r\n
/// v=0\r\n...
/// ```
///
/// Header lookup is case-insensitive per RFC 2326 §4.2. The body is read
/// only when `Content-Length` is present and at most [`MAX_BODY_SIZE`].
#[derive(Debug)]
pub struct RtspResponse {
    pub status_code: u16,
    pub status_text: String,
    /// Headers as ordered (name, value) pairs, names as received.
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl RtspResponse {
    /// Read one complete response from `reader`.
    ///
    /// EOF before the status line is reported as
    /// [`io::ErrorKind::UnexpectedEof`]; the server hung up.
    pub fn read_from(reader: &mut impl BufRead) -> Result<Self, ProtocolError> {
        let status_line = read_line(reader)?.ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by server")
        })?;

        let (status_code, status_text) = parse_status_line(&status_line)?;

        let mut headers = Vec::new();
        while let Some(line) = read_line(reader)? {
            if line.is_empty() {
                break;
            }

            let colon_pos = line.find(':').ok_or(ProtocolError::Parse {
                kind: ParseErrorKind::InvalidHeader,
            })?;

            let name = line[..colon_pos].trim().to_string();
            let value = line[colon_pos + 1..].trim().to_string();
            headers.push((name, value));
        }

        let mut response = RtspResponse {
            status_code,
            status_text,
            headers,
            body: None,
        };

        if let Some(len) = response.content_length()?
            && len > 0
        {
            if len > MAX_BODY_SIZE {
                return Err(ProtocolError::Parse {
                    kind: ParseErrorKind::InvalidContentLength,
                });
            }
            let mut body = vec![0u8; len];
            reader.read_exact(&mut body)?;
            response.body = Some(String::from_utf8_lossy(&body).into_owned());
        }

        Ok(response)
    }

    /// Look up a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// 2xx status (RFC 2326 §7.1.1).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Media type of the body without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.get_header("Content-Type").map(|value| {
            value
                .split(';')
                .next()
                .unwrap_or(value)
                .trim()
                .to_ascii_lowercase()
        })
    }

    fn content_length(&self) -> Result<Option<usize>, ProtocolError> {
        match self.get_header("Content-Length") {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| ProtocolError::Parse {
                kind: ParseErrorKind::InvalidContentLength,
            }),
        }
    }
}

/// Read one line without its terminator. `None` at EOF.
fn read_line(reader: &mut impl BufRead) -> Result<Option<String>, ProtocolError> {
    let mut line = String::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE_LENGTH as u64)
        .read_line(&mut line)?;
    if read == 0 {
        return Ok(None);
    }
    if read == MAX_LINE_LENGTH && !line.ends_with('\n') {
        return Err(ProtocolError::Parse {
            kind: ParseErrorKind::LineTooLong,
        });
    }
    let trimmed = line.trim_end_matches(['\r', '\n']);
    Ok(Some(trimmed.to_string()))
}

fn parse_status_line(line: &str) -> Result<(u16, String), ProtocolError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or("");

    if !version.starts_with("RTSP/") {
        return Err(ProtocolError::Parse {
            kind: ParseErrorKind::NotRtsp,
        });
    }

    let code = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or(ProtocolError::Parse {
            kind: ParseErrorKind::InvalidStatusLine,
        })?;
    let reason = parts.next().unwrap_or("").trim().to_string();

    Ok((code, reason))
}
