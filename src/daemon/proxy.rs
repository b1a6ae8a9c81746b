//! Request handling inside the daemon.
//!
//! The proxy owns the service context every connection is answered from:
//! the dictionary (with its match index) and the idle timer. The dictionary
//! is shared read-only; the timer is the only mutable state and guards
//! itself.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};

use super::idle::IdleTimer;
use super::protocol::{
    self, DictQuery, Route, StatusResult, CONTENT_TYPE_HTML, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT,
    MATCH_HEADER,
};
use crate::dict::{Dictionary, MatchKind};

pub type ResponseBody = Full<Bytes>;

pub struct RequestProxy {
    dictionary: Arc<Dictionary>,
    idle: Arc<IdleTimer>,
    started: Instant,
}

impl RequestProxy {
    pub fn new(dictionary: Arc<Dictionary>, idle: Arc<IdleTimer>) -> Self {
        Self { dictionary, idle, started: Instant::now() }
    }

    /// Serve one connection: one request, one response, then close.
    ///
    /// Malformed requests are answered by hyper itself and come back here
    /// as an error.
    pub async fn serve_connection<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let service = service_fn(|request: Request<hyper::body::Incoming>| {
            std::future::ready(Ok::<_, Infallible>(self.handle(&request)))
        });
        http1::Builder::new()
            .keep_alive(false)
            .serve_connection(TokioIo::new(stream), service)
            .await
            .context("Failed to serve connection")
    }

    /// Answer a single request. Every request counts as activity for the
    /// idle timer, whether or not it routes.
    pub fn handle<B>(&self, request: &Request<B>) -> Response<ResponseBody> {
        self.idle.reset();
        tracing::debug!("Received request: {} {}", request.method(), request.uri());

        let response = match protocol::route(request.method(), request.uri()) {
            Ok(route) => self.respond(route),
            Err(err) => text_response(err.status(), err.to_string()),
        };
        tracing::debug!("Sending response: status={}", response.status());
        response
    }

    /// Answer a routed request.
    pub fn respond(&self, route: Route) -> Response<ResponseBody> {
        match route {
            Route::Dict(query) => self.handle_dict(&query),
            Route::Status => self.handle_status(),
        }
    }

    fn handle_dict(&self, query: &DictQuery) -> Response<ResponseBody> {
        tracing::debug!(
            "Query dict: {:?}, engine: {}, format: {}",
            query.word,
            query.engine,
            query.format
        );
        let Some(entry) = self.dictionary.lookup(&query.word, query.format) else {
            return text_response(
                StatusCode::NOT_FOUND,
                format!("no entry found for {:?}", query.word),
            );
        };

        let mut response = body_response(StatusCode::OK, CONTENT_TYPE_HTML, entry.body);
        if entry.kind == MatchKind::Suggestion {
            match HeaderValue::try_from(format!("suggestion;{}", entry.headword)) {
                Ok(value) => {
                    response.headers_mut().insert(MATCH_HEADER, value);
                }
                Err(err) => {
                    return text_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("headword {:?} cannot be sent: {err}", entry.headword),
                    );
                }
            }
        }
        response
    }

    fn handle_status(&self) -> Response<ResponseBody> {
        let status = StatusResult {
            status: "running".to_string(),
            uptime: self.started.elapsed().as_secs(),
            headwords: self.dictionary.len(),
            idle_timeout: self.idle.timeout().map(|t| t.as_secs_f64()),
        };
        match serde_json::to_string(&status) {
            Ok(json) => body_response(StatusCode::OK, CONTENT_TYPE_JSON, json),
            Err(err) => text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to encode status: {err}"),
            ),
        }
    }
}

fn body_response(
    status: StatusCode,
    content_type: &'static str,
    body: String,
) -> Response<ResponseBody> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn text_response(status: StatusCode, message: String) -> Response<ResponseBody> {
    body_response(status, CONTENT_TYPE_TEXT, message)
}
