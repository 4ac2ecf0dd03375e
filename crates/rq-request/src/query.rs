//! Structured view over a request's query string.
//!
//! Multi-value policy: when a name occurs more than once, the last
//! occurrence wins, for `get` and for `decode` alike.

use std::str::FromStr;

use rq_container::Container;
use rq_http::Abort;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("failed to decode query: {0}")]
    Decode(#[from] serde_urlencoded::de::Error),

    #[error("failed to encode query: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),

    #[error("query parameter {name:?} value {value:?} is not a valid {expected}")]
    Invalid {
        name: String,
        value: String,
        expected: &'static str,
    },
}

impl From<QueryError> for Abort {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::Encode(_) => Abort::internal(err.to_string()),
            _ => Abort::bad_request(err.to_string()),
        }
    }
}

/// Query string view. Holds its own copy of the query: [`encode`](Self::encode)
/// rewrites that copy only, never the request it came from.
pub struct QueryContainer<'a> {
    query: String,
    container: &'a dyn Container,
}

impl<'a> QueryContainer<'a> {
    pub fn new(query: impl Into<String>, container: &'a dyn Container) -> Self {
        Self {
            query: query.into(),
            container,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.query
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    /// The scope this view resolves services from.
    pub fn container(&self) -> &'a dyn Container {
        self.container
    }

    /// Decoded `(name, value)` pairs in order of appearance. Empty for an
    /// empty query.
    pub fn parameters(&self) -> Vec<(String, String)> {
        // Percent-decoding is lossy, so string pairs always decode.
        serde_urlencoded::from_str(&self.query).unwrap_or_default()
    }

    /// Value of the last occurrence of `name`.
    pub fn get(&self, name: &str) -> Option<String> {
        self.parameters()
            .into_iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    pub fn get_as<T: FromStr>(&self, name: &str) -> Result<Option<T>, QueryError> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|_| QueryError::Invalid {
                name: name.to_string(),
                value,
                expected: std::any::type_name::<T>(),
            }),
        }
    }

    /// Decode the whole query into `T`, collapsing repeated names to their
    /// last value first.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, QueryError> {
        let mut collapsed: Vec<(String, String)> = Vec::new();
        for (name, value) in self.parameters() {
            match collapsed.iter_mut().find(|(k, _)| *k == name) {
                Some(existing) => existing.1 = value,
                None => collapsed.push((name, value)),
            }
        }
        let normalized = serde_urlencoded::to_string(&collapsed)?;
        Ok(serde_urlencoded::from_str(&normalized)?)
    }

    /// Replace this view's query with `value` encoded.
    pub fn encode<T: Serialize>(&mut self, value: &T) -> Result<(), QueryError> {
        self.query = serde_urlencoded::to_string(value)?;
        Ok(())
    }

    pub fn into_string(self) -> String {
        self.query
    }
}

impl std::fmt::Debug for QueryContainer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryContainer")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}
