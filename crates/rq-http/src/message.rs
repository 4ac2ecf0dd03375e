//! The raw inbound message.
//!
//! [`HttpMessage`] is what the transport hands to the request layer. It owns
//! the head (method, path, query, headers) and the body. The media type is
//! not a separate field: it is read from and written to the `Content-Type`
//! header, so the two can never disagree.

use bytes::Bytes;

use crate::media::MediaType;

const CONTENT_TYPE: &str = "content-type";

/// Request method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Other(String),
}

impl Method {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "OPTIONS" => Self::Options,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound HTTP message.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpMessage {
    pub method: Method,
    /// Path component of the target, always starting with `/`.
    pub path: String,
    query: Option<String>,
    pub version: String,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl Default for HttpMessage {
    fn default() -> Self {
        Self::new(Method::Get, "/")
    }
}

impl HttpMessage {
    /// Create a message from a method and a target (`/path?query`).
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        Self {
            method,
            path,
            query,
            version: "HTTP/1.1".into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append_header(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>, media_type: MediaType) -> Self {
        self.set_body(body);
        self.set_media_type(Some(media_type));
        self
    }

    // ── Target ────────────────────────────────────────────────────────────

    /// Raw query component, without the leading `?`. `None` when the target
    /// had no `?` at all.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn set_query(&mut self, query: Option<String>) {
        self.query = query;
    }

    /// `path` plus `?query` if present.
    pub fn target(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }

    // ── Headers ───────────────────────────────────────────────────────────

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of a header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Replace every value of `name` with a single one. The first
    /// occurrence keeps its position; a missing header is appended.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.headers.iter().position(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(first) => {
                self.headers[first].1 = value;
                let mut index = 0;
                self.headers.retain(|(k, _)| {
                    let keep = index <= first || !k.eq_ignore_ascii_case(name);
                    index += 1;
                    keep
                });
            }
            None => self.headers.push((name.to_string(), value)),
        }
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
    }

    // ── Body ──────────────────────────────────────────────────────────────

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Media type from `Content-Type`. An unparsable header counts as absent.
    pub fn media_type(&self) -> Option<MediaType> {
        self.header(CONTENT_TYPE).and_then(|v| v.parse().ok())
    }

    pub fn set_media_type(&mut self, media_type: Option<MediaType>) {
        match media_type {
            Some(media) => self.set_header(CONTENT_TYPE, media.to_string()),
            None => self.remove_header(CONTENT_TYPE),
        }
    }
}

impl std::fmt::Display for HttpMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.method, self.target(), self.version)?;
        for (name, value) in &self.headers {
            write!(f, "\n{name}: {value}")?;
        }
        if !self.body.is_empty() {
            write!(f, "\n\n{}", String::from_utf8_lossy(&self.body))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for HttpMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMessage")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("body", &format_args!("<{} bytes>", self.body.len()))
            .finish()
    }
}
