//! Media types (`type/subtype; key=value`).

use std::str::FromStr;

use thiserror::Error;

/// A parsed media type. Comparison with [`MediaType::matches`] ignores
/// parameters; `==` does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    kind: String,
    subtype: String,
    parameters: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid media type: {0:?}")]
pub struct MediaTypeError(pub String);

impl MediaType {
    pub fn new(kind: impl Into<String>, subtype: impl Into<String>) -> Self {
        Self {
            kind: kind.into().to_ascii_lowercase(),
            subtype: subtype.into().to_ascii_lowercase(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters
            .push((key.into().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn json() -> Self {
        Self::new("application", "json").with_parameter("charset", "utf-8")
    }

    pub fn url_encoded_form() -> Self {
        Self::new("application", "x-www-form-urlencoded").with_parameter("charset", "utf-8")
    }

    pub fn plain_text() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Same type and subtype, parameters ignored. `*` matches anything.
    pub fn matches(&self, other: &MediaType) -> bool {
        let kind = self.kind == "*" || other.kind == "*" || self.kind == other.kind;
        let subtype =
            self.subtype == "*" || other.subtype == "*" || self.subtype == other.subtype;
        kind && subtype
    }
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(';');
        let essence = parts.next().unwrap_or("").trim();
        let (kind, subtype) = essence
            .split_once('/')
            .filter(|(k, st)| !k.is_empty() && !st.is_empty())
            .ok_or_else(|| MediaTypeError(s.to_string()))?;

        let mut media = MediaType::new(kind.trim(), subtype.trim());
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (key, value) = param
                .split_once('=')
                .ok_or_else(|| MediaTypeError(s.to_string()))?;
            media = media.with_parameter(key.trim(), value.trim().trim_matches('"'));
        }
        Ok(media)
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (key, value) in &self.parameters {
            write!(f, "; {key}={value}")?;
        }
        Ok(())
    }
}
