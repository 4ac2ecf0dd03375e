//! Path routing.
//!
//! Patterns are `/`-separated. `:name` captures one component into the
//! request's [`Parameters`], `*` matches one component without capturing,
//! and a trailing `**` captures the remainder of the path under the slug
//! `**`.

use std::sync::Arc;

use rq_http::{Abort, Method, Status};
use rq_request::Parameters;
use thiserror::Error;
use tracing::debug;

use crate::responder::{Responder, ResponderDyn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Constant(String),
    Parameter(String),
    Anything,
    CatchAll,
}

impl Segment {
    pub fn parse_path(path: &str) -> Vec<Segment> {
        components(path)
            .map(|c| match c {
                "*" => Segment::Anything,
                "**" => Segment::CatchAll,
                _ => match c.strip_prefix(':') {
                    Some(name) => Segment::Parameter(name.to_string()),
                    None => Segment::Constant(c.to_string()),
                },
            })
            .collect()
    }
}

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no route for {0}")]
    NotFound(String),

    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },
}

impl From<RouteError> for Abort {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::NotFound(path) => Abort::not_found(&path),
            e @ RouteError::MethodNotAllowed { .. } => {
                Abort::new(Status::MethodNotAllowed, e.to_string())
            }
        }
    }
}

struct Route {
    method: Method,
    pattern: Vec<Segment>,
    responder: Arc<dyn ResponderDyn>,
}

/// Routes are tried in registration order; the first match wins.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<R: Responder>(&mut self, method: Method, path: &str, responder: R) -> &mut Self {
        let pattern = Segment::parse_path(path);
        debug!("Registered route {} {path}", method.as_str());
        self.routes.push(Route {
            method,
            pattern,
            responder: Arc::new(responder),
        });
        self
    }

    pub fn get<R: Responder>(&mut self, path: &str, responder: R) -> &mut Self {
        self.on(Method::Get, path, responder)
    }

    pub fn post<R: Responder>(&mut self, path: &str, responder: R) -> &mut Self {
        self.on(Method::Post, path, responder)
    }

    pub fn put<R: Responder>(&mut self, path: &str, responder: R) -> &mut Self {
        self.on(Method::Put, path, responder)
    }

    pub fn delete<R: Responder>(&mut self, path: &str, responder: R) -> &mut Self {
        self.on(Method::Delete, path, responder)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The parameters the first route accepting `method` and `path` captures.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<Parameters, RouteError> {
        self.route(method, path).map(|(_, parameters)| parameters)
    }

    pub(crate) fn route(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<(Arc<dyn ResponderDyn>, Parameters), RouteError> {
        let path_components: Vec<&str> = components(path).collect();
        let mut path_matched = false;

        for route in &self.routes {
            let Some(parameters) = match_pattern(&route.pattern, &path_components) else {
                continue;
            };
            if &route.method == method {
                return Ok((route.responder.clone(), parameters));
            }
            path_matched = true;
        }

        if path_matched {
            Err(RouteError::MethodNotAllowed {
                method: method.as_str().to_string(),
                path: path.to_string(),
            })
        } else {
            Err(RouteError::NotFound(path.to_string()))
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| (r.method.as_str(), &r.pattern)))
            .finish()
    }
}

fn match_pattern(pattern: &[Segment], path: &[&str]) -> Option<Parameters> {
    let mut parameters = Parameters::new();
    let mut index = 0;

    for segment in pattern {
        match segment {
            Segment::CatchAll => {
                if index >= path.len() {
                    return None;
                }
                parameters.push("**", path[index..].join("/"));
                return Some(parameters);
            }
            Segment::Constant(expected) => {
                if path.get(index) != Some(&expected.as_str()) {
                    return None;
                }
            }
            Segment::Parameter(slug) => {
                let value = path.get(index)?;
                parameters.push(slug.as_str(), *value);
            }
            Segment::Anything => {
                path.get(index)?;
            }
        }
        index += 1;
    }

    (index == path.len()).then_some(parameters)
}
