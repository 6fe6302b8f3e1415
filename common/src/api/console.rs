use crate::errors::HostError;

pub const HOST_PREFIX: &str = "Node Controller:";
pub const HOST_KEY_FAILURE: &str = "Host key verification failed.";
pub const CONNECT_MARKER: &str = "Connecting to ";

/// Splits a byte stream into lines without buffering the whole body.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line that got completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(idx) = self.buf.iter().position(|b| *b == b'\n') {
            let line = self.buf.drain(..=idx).collect::<Vec<_>>();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Trailing data without a final newline.
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.buf).into_owned())
        }
    }
}

/// Match a console line announcing the executing host.
///
/// Returns `None` for unrelated lines so scanning continues.
pub fn parse_host_line(line: &str) -> Option<Result<String, HostError>> {
    if !line.starts_with(HOST_PREFIX) {
        return None;
    }

    let host = line
        .split(':')
        .nth(1)
        .unwrap_or_default()
        .trim_matches(|c| matches!(c, ' ' | '\r' | '\n' | '\t'));

    let host = if host.is_empty() {
        Err(HostError::Empty)
    } else if host == HOST_KEY_FAILURE {
        Err(HostError::HostKeyVerification)
    } else {
        Ok(host.to_string())
    };
    Some(host)
}

/// Match a node log line like `Connecting to 10.0.0.2 on port 22`.
pub fn parse_ip_line(line: &str) -> Option<String> {
    let idx = line.find(CONNECT_MARKER)?;
    let rest = &line[idx + CONNECT_MARKER.len()..];
    let ip = rest.split_whitespace().next()?;
    Some(ip.to_string())
}
