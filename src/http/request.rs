/// A parsed request, borrowed from the parser buffer.
///
/// Nothing here is copied out of the connection's buffer; the view lives as
/// long as the parser is not fed or reset.
#[derive(Debug, Clone)]
pub struct Request<'a> {
    /// Method token exactly as received (e.g. "GET")
    pub method: &'a str,
    /// Request target (e.g. "/index.html")
    pub path: &'a str,
    /// Protocol version token (typically "HTTP/1.0")
    pub version: &'a str,
    /// Header name/value pairs; names are unique
    pub headers: Vec<(&'a str, &'a str)>,
    /// Exactly `Content-Length` body bytes
    pub body: &'a [u8],
}

impl<'a> Request<'a> {
    /// Retrieves a header value by name.
    ///
    /// The lookup is case-sensitive: `content-length` does not match a
    /// `Content-Length` header.
    pub fn header(&self, key: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| *value)
    }
}
