//! Outbound response.

use bytes::Bytes;
use serde::Serialize;

use crate::error::{Abort, Status};
use crate::media::MediaType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: Status) -> Self {
        Self {
            status: status.code(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>, media_type: MediaType) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case("content-type"));
        self.headers
            .push(("content-type".into(), media_type.to_string()));
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new(Status::Ok).with_body(body.into(), MediaType::plain_text())
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, Abort> {
        let body = serde_json::to_vec(value)
            .map_err(|e| Abort::internal(format!("Failed to serialize response: {e}")))?;
        Ok(Self::new(Status::Ok).with_body(body, MediaType::json()))
    }

    pub fn status(&self) -> Status {
        Status::from_code(self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl From<Abort> for Response {
    fn from(abort: Abort) -> Self {
        let status = abort.status;
        let body = serde_json::json!({ "error": abort });
        Self {
            status,
            headers: vec![("content-type".into(), MediaType::json().to_string())],
            body: Bytes::from(body.to_string()),
        }
    }
}
