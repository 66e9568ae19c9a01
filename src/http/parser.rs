//! Incremental HTTP/1.0 request parser.
//!
//! [`RequestParser`] accepts the request one network read at a time. Bytes are
//! appended to a single growable buffer and every parsed field is recorded as a
//! `Span` (offset + length) into that buffer. Spans are resolved against the
//! buffer on access, so growing the buffer never invalidates a field that was
//! parsed before the growth.
//!
//! ```text
//!   AwaitingRequestLine ──CRLF──▶ AwaitingHeaders ──empty line──▶ AwaitingBody
//!                                   ▲        │                        │
//!                                   └─header─┘          Content-Length bytes
//!                                                                     ▼
//!                                                                  Complete
//! ```

use std::fmt;

use bytes::BytesMut;

use crate::http::request::Request;

/// Initial buffer allocation for a new connection.
pub const INITIAL_CAPACITY: usize = 1024;

/// Default upper bound on the bytes buffered for a single request.
pub const DEFAULT_LIMIT: usize = 1024 * 1024;

/// A view into the parser buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Span {
    start: usize,
    len: usize,
}

impl Span {
    fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn resolve<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.start..self.start + self.len]
    }
}

/// Grammar position of the parser. Only ever moves forward until [`RequestParser::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    AwaitingRequestLine,
    AwaitingHeaders,
    AwaitingBody,
}

/// Outcome of a successful [`RequestParser::feed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// More bytes are needed.
    Incomplete,
    /// Request line, headers and the full body are available.
    Complete,
}

/// A malformed request. The connection must be dropped; the parser does not recover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A line ended in `\n` without a preceding `\r`.
    BareLineFeed,
    InvalidRequestLine,
    /// The request target does not start with `/`.
    InvalidPath,
    InvalidHeader,
    InvalidContentLength,
    /// The request exceeded the configured size limit.
    TooLarge,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ParseError::BareLineFeed => "line terminated by bare LF",
            ParseError::InvalidRequestLine => "invalid request line",
            ParseError::InvalidPath => "request path must start with '/'",
            ParseError::InvalidHeader => "invalid header line",
            ParseError::InvalidContentLength => "invalid Content-Length",
            ParseError::TooLarge => "request too large",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ParseError {}

/// Stateful parser for one request at a time.
///
/// The parser owns its buffer exclusively. It is created once per connection
/// and [`reset`](RequestParser::reset) between requests, which keeps the
/// allocation around for the next one.
#[derive(Debug)]
pub struct RequestParser {
    buffer: BytesMut,
    parsed: usize,
    // End of the region already searched for a line feed.
    scanned: usize,
    state: ParseState,
    method: Span,
    path: Span,
    version: Span,
    headers: Vec<(Span, Span)>,
    content_length: usize,
    limit: usize,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            // One spare byte past the written region is always kept.
            buffer: BytesMut::with_capacity(capacity.max(1)),
            parsed: 0,
            scanned: 0,
            state: ParseState::AwaitingRequestLine,
            method: Span::default(),
            path: Span::default(),
            version: Span::default(),
            headers: Vec::new(),
            content_length: 0,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Sets the maximum number of bytes buffered for one request.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Appends `chunk` to the buffer and advances the state machine as far as
    /// the buffered bytes allow.
    ///
    /// Once [`Status::Complete`] has been returned, further calls keep
    /// returning it; bytes past the body are buffered but ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Status, ParseError> {
        self.buffer.reserve(chunk.len() + 1);
        self.buffer.extend_from_slice(chunk);

        loop {
            match self.state {
                ParseState::AwaitingBody => {
                    if self.buffer.len() - self.parsed >= self.content_length {
                        return Ok(Status::Complete);
                    }
                    break;
                }
                state => {
                    let Some(line) = self.next_line()? else {
                        break;
                    };
                    if state == ParseState::AwaitingRequestLine {
                        self.parse_request_line(line)?;
                    } else {
                        self.parse_header_line(line)?;
                    }
                }
            }
        }

        if self.buffer.len() > self.limit {
            return Err(ParseError::TooLarge);
        }
        Ok(Status::Incomplete)
    }

    /// Clears all parse state for the next request on the same connection.
    ///
    /// Buffered bytes are discarded but the allocation is kept. Every
    /// previously returned view is invalidated.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.parsed = 0;
        self.scanned = 0;
        self.state = ParseState::AwaitingRequestLine;
        self.method = Span::default();
        self.path = Span::default();
        self.version = Span::default();
        self.headers.clear();
        self.content_length = 0;
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == ParseState::AwaitingBody
            && self.buffer.len() - self.parsed >= self.content_length
    }

    pub fn method(&self) -> &str {
        self.text(self.method)
    }

    pub fn path(&self) -> &str {
        self.text(self.path)
    }

    pub fn version(&self) -> &str {
        self.text(self.version)
    }

    /// Looks up a header by its exact, case-sensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.resolve(&self.buffer) == name.as_bytes())
            .map(|(_, v)| self.text(*v))
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(n, v)| (self.text(*n), self.text(*v)))
    }

    pub fn content_length(&self) -> usize {
        self.content_length
    }

    /// Body bytes received so far, never more than `Content-Length`.
    pub fn body(&self) -> &[u8] {
        if self.state != ParseState::AwaitingBody {
            return &[];
        }
        let end = (self.parsed + self.content_length).min(self.buffer.len());
        &self.buffer[self.parsed..end]
    }

    /// Borrowed view of the request, available once parsing is complete.
    pub fn request(&self) -> Option<Request<'_>> {
        if !self.is_complete() {
            return None;
        }
        Some(Request {
            method: self.method(),
            path: self.path(),
            version: self.version(),
            headers: self.headers().collect(),
            body: self.body(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Bytes received since the last reset.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes consumed by the request line and headers.
    pub fn parsed(&self) -> usize {
        self.parsed
    }

    // Spans are only created over lines that passed UTF-8 validation.
    fn text(&self, span: Span) -> &str {
        std::str::from_utf8(span.resolve(&self.buffer)).unwrap_or_default()
    }

    /// Consumes the next CRLF-terminated line from the unparsed tail.
    ///
    /// Bytes searched by an earlier call are not searched again.
    fn next_line(&mut self) -> Result<Option<Span>, ParseError> {
        let from = self.scanned.max(self.parsed);
        let Some(offset) = self.buffer[from..].iter().position(|&b| b == b'\n') else {
            self.scanned = self.buffer.len();
            return Ok(None);
        };
        let lf = from + offset;
        if lf == self.parsed || self.buffer[lf - 1] != b'\r' {
            return Err(ParseError::BareLineFeed);
        }

        let line = Span::new(self.parsed, lf - 1 - self.parsed);
        self.parsed = lf + 1;
        self.scanned = self.parsed;
        Ok(Some(line))
    }

    fn parse_request_line(&mut self, line: Span) -> Result<(), ParseError> {
        let bytes = line.resolve(&self.buffer);
        if std::str::from_utf8(bytes).is_err() {
            return Err(ParseError::InvalidRequestLine);
        }

        let mut tokens = split_tokens(bytes, line.start);
        let (Some(method), Some(path), Some(version), None) =
            (tokens.next(), tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(ParseError::InvalidRequestLine);
        };

        if path.resolve(&self.buffer).first() != Some(&b'/') {
            return Err(ParseError::InvalidPath);
        }

        self.method = method;
        self.path = path;
        self.version = version;
        self.state = ParseState::AwaitingHeaders;
        Ok(())
    }

    fn parse_header_line(&mut self, line: Span) -> Result<(), ParseError> {
        if line.is_empty() {
            self.state = ParseState::AwaitingBody;
            return Ok(());
        }

        let bytes = line.resolve(&self.buffer);
        if std::str::from_utf8(bytes).is_err() {
            return Err(ParseError::InvalidHeader);
        }
        let colon = bytes
            .iter()
            .position(|&b| b == b':')
            .ok_or(ParseError::InvalidHeader)?;

        let name = trim(Span::new(line.start, colon), &self.buffer);
        let value = trim(
            Span::new(line.start + colon + 1, line.len - colon - 1),
            &self.buffer,
        );
        if name.is_empty() || value.is_empty() {
            return Err(ParseError::InvalidHeader);
        }

        let name_bytes = name.resolve(&self.buffer);
        if name_bytes == b"Content-Length" {
            let length = parse_content_length(value.resolve(&self.buffer))?;
            if self.parsed + length > self.limit {
                return Err(ParseError::TooLarge);
            }
            self.content_length = length;
        }

        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.resolve(&self.buffer) == name_bytes)
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
        Ok(())
    }
}

fn is_blank(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

// Control characters and space, excluding NUL.
fn is_trimmable(b: u8) -> bool {
    (1..=32).contains(&b)
}

/// Splits `line` on runs of spaces and tabs, yielding spans offset by `base`.
fn split_tokens(line: &[u8], base: usize) -> impl Iterator<Item = Span> + '_ {
    let mut pos = 0;
    std::iter::from_fn(move || {
        while pos < line.len() && is_blank(line[pos]) {
            pos += 1;
        }
        if pos == line.len() {
            return None;
        }
        let start = pos;
        while pos < line.len() && !is_blank(line[pos]) {
            pos += 1;
        }
        Some(Span::new(base + start, pos - start))
    })
}

fn trim(span: Span, buf: &[u8]) -> Span {
    let bytes = span.resolve(buf);
    let start = bytes
        .iter()
        .position(|&b| !is_trimmable(b))
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&b| !is_trimmable(b))
        .map_or(start, |i| i + 1);
    Span::new(span.start + start, end - start)
}

fn parse_content_length(value: &[u8]) -> Result<usize, ParseError> {
    if value.is_empty() || !value.iter().all(u8::is_ascii_digit) {
        return Err(ParseError::InvalidContentLength);
    }
    std::str::from_utf8(value)
        .ok()
        .and_then(|v| v.parse().ok())
        .ok_or(ParseError::InvalidContentLength)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tokens_skips_runs_of_blanks() {
        let line = b" GET \t /a  HTTP/1.0 ";
        let spans: Vec<_> = split_tokens(line, 10).collect();

        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0], Span::new(11, 3));
        assert_eq!(spans[1].resolve(&[&[0u8; 10][..], &line[..]].concat()), b"/a");
    }

    #[test]
    fn trim_strips_control_and_space() {
        let buf = b"\t\r  value \x01";
        let span = trim(Span::new(0, buf.len()), buf);
        assert_eq!(span.resolve(buf), b"value");

        let blank = trim(Span::new(0, 3), b"   ");
        assert!(blank.is_empty());
    }

    #[test]
    fn trim_keeps_nul() {
        let buf = b"\0x\0";
        let span = trim(Span::new(0, buf.len()), buf);
        assert_eq!(span.len, 3);
    }

    #[test]
    fn next_line_resumes_where_the_last_scan_stopped() {
        let mut parser = RequestParser::new();
        parser.feed(b"GET / HTTP/1.0\r\nX-Long: ").unwrap();
        assert_eq!(parser.scanned, parser.buffer.len());

        for _ in 0..10 {
            parser.feed(b"abcd").unwrap();
            assert_eq!(parser.scanned, parser.buffer.len());
        }
        parser.feed(b"\r").unwrap();

        assert_eq!(parser.feed(b"\n\r\n"), Ok(Status::Complete));
        assert_eq!(parser.header("X-Long"), Some("abcd".repeat(10).as_str()));
        assert_eq!(parser.scanned, parser.parsed);
    }

    #[test]
    fn content_length_rejects_signs_and_text() {
        assert_eq!(parse_content_length(b"42"), Ok(42));
        assert_eq!(parse_content_length(b"0"), Ok(0));
        assert_eq!(
            parse_content_length(b"+5"),
            Err(ParseError::InvalidContentLength)
        );
        assert_eq!(
            parse_content_length(b"abc"),
            Err(ParseError::InvalidContentLength)
        );
        assert_eq!(
            parse_content_length(b"99999999999999999999999999"),
            Err(ParseError::InvalidContentLength)
        );
    }

    #[test]
    fn parse_simple_get() {
        let mut parser = RequestParser::new();
        let status = parser
            .feed(b"GET / HTTP/1.0\r\nHost: example.com\r\n\r\n")
            .unwrap();

        assert_eq!(status, Status::Complete);
        assert_eq!(parser.path(), "/");
        assert_eq!(parser.header("Host"), Some("example.com"));
    }
}
