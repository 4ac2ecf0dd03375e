//! Error vocabulary: HTTP status codes, the handler-facing [`Abort`] and the
//! structured [`Diagnostic`] used for configuration mistakes.

use serde::{Deserialize, Serialize};

/// Response status codes used by the server, plus an escape hatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Created,
    NoContent,
    BadRequest,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    UnsupportedMediaType,
    UnprocessableEntity,
    InternalServerError,
    ServiceUnavailable,

    // Any other code
    Custom(u16),
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::NoContent => 204,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::PayloadTooLarge => 413,
            Self::UnsupportedMediaType => 415,
            Self::UnprocessableEntity => 422,
            Self::InternalServerError => 500,
            Self::ServiceUnavailable => 503,
            Self::Custom(c) => *c,
        }
    }

    pub fn from_code(code: u16) -> Self {
        match code {
            200 => Self::Ok,
            201 => Self::Created,
            204 => Self::NoContent,
            400 => Self::BadRequest,
            404 => Self::NotFound,
            405 => Self::MethodNotAllowed,
            413 => Self::PayloadTooLarge,
            415 => Self::UnsupportedMediaType,
            422 => Self::UnprocessableEntity,
            500 => Self::InternalServerError,
            503 => Self::ServiceUnavailable,
            c => Self::Custom(c),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code())
    }
}

/// Where a [`Diagnostic`] was raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    /// Capture the location of the caller.
    #[track_caller]
    pub fn capture() -> Self {
        let location = std::panic::Location::caller();
        Self {
            file: location.file().to_string(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A structured, actionable error.
///
/// `identifier` is a stable machine-readable code (e.g. `"defaultDB"`);
/// `reason` is the human-readable explanation. `suggested_fixes` and
/// `possible_causes` are shown to the developer verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub identifier: String,
    pub reason: String,
    #[serde(rename = "possibleCauses", default, skip_serializing_if = "Vec::is_empty")]
    pub possible_causes: Vec<String>,
    #[serde(rename = "suggestedFixes", default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_fixes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceLocation>,
}

impl Diagnostic {
    /// Create a diagnostic, recording the caller's location as its source.
    #[track_caller]
    pub fn new(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            reason: reason.into(),
            possible_causes: Vec::new(),
            suggested_fixes: Vec::new(),
            source: Some(SourceLocation::capture()),
        }
    }

    pub fn with_possible_causes<I, S>(mut self, causes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.possible_causes.extend(causes.into_iter().map(Into::into));
        self
    }

    pub fn with_suggested_fixes<I, S>(mut self, fixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggested_fixes.extend(fixes.into_iter().map(Into::into));
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.identifier, self.reason)?;
        for fix in &self.suggested_fixes {
            write!(f, "\n  - {fix}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Handler-facing error: a status, a message and optional JSON data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Abort {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Abort {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status: status.code(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, message)
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(Status::NotFound, format!("No route for {path}"))
    }

    pub fn unsupported_media_type(message: impl Into<String>) -> Self {
        Self::new(Status::UnsupportedMediaType, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(Status::UnprocessableEntity, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Status::InternalServerError, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(Status::ServiceUnavailable, message)
    }

    pub fn status(&self) -> Status {
        Status::from_code(self.status)
    }
}

impl From<Diagnostic> for Abort {
    fn from(diagnostic: Diagnostic) -> Self {
        let data = serde_json::to_value(&diagnostic).ok();
        Self {
            status: Status::InternalServerError.code(),
            message: diagnostic.reason,
            data,
        }
    }
}

impl std::fmt::Display for Abort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Abort [{}]: {}", self.status, self.message)
    }
}

impl std::error::Error for Abort {}
