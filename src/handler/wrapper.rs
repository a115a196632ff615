//! Request wrapper
//!
//! Adapts an application [`Handler`] into a transport handler: applies the
//! default headers, runs the handler, writes the envelope as JSON and logs
//! one record per request.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Response, StatusCode};

use crate::http::{apply_json_headers, build_response, Envelope, Request};
use crate::logger::{events, Fields, Logger};
use crate::routing::Handler;

const FORWARDED_FOR: &str = "x-forwarded-for";

/// State shared by every wrapped handler; read-only while serving
pub struct Pipeline {
    headers: Vec<(HeaderName, HeaderValue)>,
    logger: Arc<dyn Logger>,
    event_base: u32,
}

impl Pipeline {
    pub fn new(
        headers: Vec<(HeaderName, HeaderValue)>,
        logger: Arc<dyn Logger>,
        event_base: u32,
    ) -> Self {
        Self {
            headers,
            logger,
            event_base,
        }
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    /// Absolute event id for an offset from [`events`]
    pub const fn event(&self, offset: u32) -> u32 {
        self.event_base.saturating_add(offset)
    }

    /// Request record for a response that was produced.
    /// Does nothing when the record was already written.
    pub fn log_served(&self, log: &RequestLog, handler: &str, code: u16) {
        if !log.claim() {
            return;
        }
        self.logger.info(
            self.event(events::REQUEST),
            &format!("{} {} {code}", log.method, log.path),
            &log.fields(handler, code),
        );
    }

    /// Request record for a connection closed without a response.
    /// Does nothing when the record was already written.
    pub fn log_abandoned(&self, log: &RequestLog, handler: &str, reason: &str) {
        if !log.claim() {
            return;
        }
        self.logger.warning(
            self.event(events::REQUEST),
            &format!("{} {} closed: {reason}", log.method, log.path),
            &log.fields(handler, 0).with("error", reason),
        );
    }
}

/// What the request record needs, captured when the request arrives.
///
/// Clones share one claim flag, so however many paths try to log a request
/// only the first one writes its record.
#[derive(Debug, Clone)]
pub struct RequestLog {
    src: String,
    method: Method,
    /// Query strings are never logged
    path: String,
    started: Instant,
    claimed: Arc<AtomicBool>,
}

impl RequestLog {
    pub fn begin(
        headers: &HeaderMap,
        method: &Method,
        path: &str,
        remote: SocketAddr,
    ) -> Self {
        Self {
            src: client_address(headers, remote),
            method: method.clone(),
            path: path.to_string(),
            started: Instant::now(),
            claimed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    /// True for the first caller only
    fn claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::AcqRel)
    }

    fn fields(&self, handler: &str, code: u16) -> Fields {
        Fields::new()
            .with("src", &self.src)
            .with("method", &self.method)
            .with("uri", &self.path)
            .with("code", code)
            .with("handler", handler)
            .with("duration", format!("{:.4}", self.started.elapsed().as_secs_f64()))
    }
}

/// A named handler bound to the shared pipeline
#[derive(Clone)]
pub struct Wrapper {
    name: String,
    handler: Arc<dyn Handler>,
    pipeline: Arc<Pipeline>,
}

impl Wrapper {
    pub fn new(
        name: impl Into<String>,
        handler: Arc<dyn Handler>,
        pipeline: Arc<Pipeline>,
    ) -> Self {
        Self {
            name: name.into(),
            handler,
            pipeline,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn serve(&self, request: Request) -> Response<Full<Bytes>> {
        let log = RequestLog::begin(
            request.headers(),
            request.method(),
            request.path(),
            request.remote_addr(),
        );
        self.serve_logged(request, log).await
    }

    /// Serve `request`, writing its record into `log`.
    ///
    /// No record is written when `log` was already claimed elsewhere, e.g.
    /// after the caller gave up waiting for the response.
    pub async fn serve_logged(&self, request: Request, log: RequestLog) -> Response<Full<Bytes>> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.pipeline.headers {
            headers.insert(name.clone(), value.clone());
        }

        let envelope = self.handler.call(request).await;

        for name in envelope.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in &envelope.headers {
            headers.append(name.clone(), value.clone());
        }
        apply_json_headers(&mut headers);

        let (status, body) = self.encode(&envelope, &log);
        let response = build_response(status, headers, body);

        self.pipeline.log_served(&log, &self.name, status.as_u16());
        response
    }

    /// Status line and JSON body for `envelope`.
    ///
    /// Failures are logged and degrade to a 500 status or an empty body;
    /// they never abort the request.
    fn encode(&self, envelope: &Envelope, log: &RequestLog) -> (StatusCode, Bytes) {
        let status = StatusCode::from_u16(envelope.code).unwrap_or_else(|_| {
            self.log_encode_error(
                &format!("invalid status code {} from {} handler", envelope.code, self.name),
                log,
            );
            StatusCode::INTERNAL_SERVER_ERROR
        });

        let body = match serde_json::to_vec(envelope) {
            Ok(mut json) => {
                json.push(b'\n');
                Bytes::from(json)
            }
            Err(e) => {
                self.log_encode_error(
                    &format!("JSON encode error in {} handler: {e}", self.name),
                    log,
                );
                Bytes::new()
            }
        };

        (status, body)
    }

    fn log_encode_error(&self, message: &str, log: &RequestLog) {
        self.pipeline.logger.error(
            self.pipeline.event(events::ENCODE_ERROR),
            message,
            &Fields::new()
                .with("src", &log.src)
                .with("method", &log.method)
                .with("uri", &log.path)
                .with("handler", &self.name),
        );
    }
}

/// Client address for logging.
///
/// The first non-empty entry of `X-Forwarded-For` wins, otherwise the
/// transport peer address; any port is stripped.
pub fn client_address(headers: &HeaderMap, remote: SocketAddr) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').map(str::trim).find(|s| !s.is_empty()));

    match forwarded {
        Some(addr) => strip_port(addr).to_string(),
        None => remote.ip().to_canonical().to_string(),
    }
}

/// Remove a trailing port from `addr`, handling `[v6]:port` and `v4:port`
pub fn strip_port(addr: &str) -> &str {
    if addr.parse::<IpAddr>().is_ok() {
        return addr;
    }
    if let Some(rest) = addr.strip_prefix('[') {
        return rest.split_once(']').map_or(rest, |(host, _)| host);
    }
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => {
            host
        }
        _ => addr,
    }
}
