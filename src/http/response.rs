/// HTTP status codes the server emits.
///
/// - `Ok` (200): File served
/// - `BadMessage` (400): Method other than `GET`
/// - `NotFound` (404): No such file beneath the document root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 Ok
    Ok,
    /// 400 Bad Message
    BadMessage,
    /// 404 Not Found
    NotFound,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use warden::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadMessage => 400,
            StatusCode::NotFound => 404,
        }
    }

    /// Returns the reason phrase written on the status line.
    ///
    /// # Example
    ///
    /// ```
    /// # use warden::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "Ok");
    /// assert_eq!(StatusCode::BadMessage.reason_phrase(), "Bad Message");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "Ok",
            StatusCode::BadMessage => "Bad Message",
            StatusCode::NotFound => "Not Found",
        }
    }
}

/// Represents an HTTP response ready to be written to a client.
///
/// Headers keep their insertion order so the serialized bytes are stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers in the order they are written
    pub headers: Vec<(String, String)>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```
/// # use warden::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "text/html")
///     .body(b"<p>hi</p>".to_vec())
///     .build();
/// assert_eq!(response.header("Content-Length"), Some("9"));
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Adds a header, or replaces the value of an existing one in place.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Appends a Content-Length header based on body size if not already present.
    pub fn build(mut self) -> Response {
        if !self.headers.iter().any(|(k, _)| k == "Content-Length") {
            self.headers
                .push(("Content-Length".to_string(), self.body.len().to_string()));
        }

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Head of a `200 Ok` for a file of `len` bytes. The body is streamed separately.
    pub fn ok_head(server: &str, len: u64) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .header("Server", server)
            .header("Content-Type", "text/html")
            .header("Content-Length", len.to_string())
            .build()
    }

    /// The fixed `400 Bad Message` response.
    pub fn bad_message(server: &str) -> Self {
        ResponseBuilder::new(StatusCode::BadMessage)
            .header("Server", server)
            .body(b"400 bad message".to_vec())
            .build()
    }

    /// The fixed `404 Not Found` response.
    pub fn not_found(server: &str) -> Self {
        ResponseBuilder::new(StatusCode::NotFound)
            .header("Server", server)
            .body(b"404 not found".to_vec())
            .build()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
