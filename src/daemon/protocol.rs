//! Routes the CLI and the daemon agree on.
//!
//! The channel speaks HTTP/1.1, one request per connection, with hyper
//! doing the framing on both ends. This module only maps requests onto
//! daemon operations:
//!
//! ```text
//! GET /dict?query=doctor&engine=mdx&format=md
//! GET /status
//! ```

use hyper::{Method, StatusCode, Uri};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dict::{Engine, Format};

/// Header carrying the headword actually shown when it differs from the
/// query: `suggestion;<headword>`.
pub const MATCH_HEADER: &str = "x-ondict-match";

pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";

/// A dictionary lookup as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictQuery {
    pub word: String,
    pub engine: Engine,
    pub format: Format,
}

impl DictQuery {
    pub fn new(word: impl Into<String>, engine: Engine, format: Format) -> Self {
        Self { word: word.into(), engine, format }
    }

    /// Request target, e.g. `/dict?query=doctor&engine=mdx&format=md`.
    pub fn target(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("query", &self.word)
            .append_pair("engine", self.engine.as_str())
            .append_pair("format", self.format.as_str())
            .finish();
        format!("/dict?{query}")
    }
}

/// Daemon health, served on `/status`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusResult {
    pub status: String,
    /// Seconds since the daemon started.
    pub uptime: u64,
    pub headwords: usize,
    /// Idle timeout in seconds; `None` when the daemon never idles out.
    pub idle_timeout: Option<f64>,
}

/// What a request asks the daemon to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Dict(DictQuery),
    Status,
}

/// Why a request could not be routed. Each maps to one status code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    MethodNotAllowed(String),
}

impl RouteError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

/// Map a request onto a daemon operation.
pub fn route(method: &Method, uri: &Uri) -> Result<Route, RouteError> {
    if *method != Method::GET {
        return Err(RouteError::MethodNotAllowed(format!("method {method} not allowed")));
    }
    match uri.path() {
        "/status" => Ok(Route::Status),
        p if p.ends_with("/dict") => parse_dict_query(uri.query().unwrap_or("")).map(Route::Dict),
        other => Err(RouteError::NotFound(format!("no such path: {other}"))),
    }
}

fn parse_dict_query(query: &str) -> Result<DictQuery, RouteError> {
    let mut word = None;
    let mut engine = Engine::default();
    let mut format = Format::default();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "query" => word = Some(value.into_owned()),
            "engine" if !value.is_empty() => {
                engine = value.parse().map_err(RouteError::BadRequest)?;
            }
            "format" if !value.is_empty() => {
                format = value.parse().map_err(RouteError::BadRequest)?;
            }
            _ => {}
        }
    }
    match word {
        Some(word) if !word.trim().is_empty() => Ok(DictQuery { word, engine, format }),
        _ => Err(RouteError::BadRequest("missing query parameter".to_string())),
    }
}
