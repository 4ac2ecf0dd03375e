//! Routing parameters.

use std::str::FromStr;

use rq_http::Abort;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterValue {
    pub slug: String,
    pub value: String,
}

/// Parameters resolved by the router, in the order their segments matched.
///
/// Slugs may repeat; lookups by slug return the most recent match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    values: Vec<ParameterValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("no parameter named {0:?}")]
    Missing(String),

    #[error("no parameters remaining")]
    Exhausted,

    #[error("parameter {slug:?} value {value:?} is not a valid {expected}")]
    Invalid {
        slug: String,
        value: String,
        expected: &'static str,
    },
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, slug: impl Into<String>, value: impl Into<String>) {
        self.values.push(ParameterValue {
            slug: slug.into(),
            value: value.into(),
        });
    }

    /// Most recently inserted value for `slug`.
    pub fn get(&self, slug: &str) -> Option<&str> {
        self.values
            .iter()
            .rev()
            .find(|p| p.slug == slug)
            .map(|p| p.value.as_str())
    }

    pub fn get_as<T: FromStr>(&self, slug: &str) -> Result<T, ParameterError> {
        let value = self
            .get(slug)
            .ok_or_else(|| ParameterError::Missing(slug.to_string()))?;
        parse(slug, value)
    }

    /// Remove and parse the first remaining parameter.
    pub fn next<T: FromStr>(&mut self) -> Result<T, ParameterError> {
        if self.values.is_empty() {
            return Err(ParameterError::Exhausted);
        }
        let ParameterValue { slug, value } = self.values.remove(0);
        parse(&slug, &value)
    }

    pub fn values(&self) -> &[ParameterValue] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn parse<T: FromStr>(slug: &str, value: &str) -> Result<T, ParameterError> {
    value.parse().map_err(|_| ParameterError::Invalid {
        slug: slug.to_string(),
        value: value.to_string(),
        expected: std::any::type_name::<T>(),
    })
}

impl<S: Into<String>> FromIterator<(S, S)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (S, S)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (slug, value) in iter {
            params.push(slug, value);
        }
        params
    }
}

impl From<ParameterError> for Abort {
    fn from(err: ParameterError) -> Self {
        Abort::bad_request(err.to_string())
    }
}
