//! Server module
//!
//! [`Server`] owns configuration, routes and extra headers. `start` binds the
//! listener and serves until `stop` is called from another task; `stop`
//! waits for in-flight requests for up to [`SHUTDOWN_GRACE`].

pub mod connection;
pub mod dispatch;
pub mod limit;
pub mod listener;
pub mod signal;
pub mod tls;

// `loop` is a keyword, so the file is mounted as `server_loop`
#[path = "loop.rs"]
pub mod server_loop;

use hyper::header::{HeaderName, HeaderValue};
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::watch;

use crate::config::{ServerConfig, ServerOption};
use crate::error::{Error, Result};
use crate::handler::{builtin, Pipeline, Wrapper};
use crate::http::response::DEFAULT_HEADERS;
use crate::logger::{events, Fields, Logger, SimpleLogger};
use crate::routing::router::Inserted;
use crate::routing::{Route, Router, Routes};

use connection::ConnectionContext;
use dispatch::Dispatcher;
use limit::ConnectionLimit;

/// How long `stop` lets in-flight requests finish
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Extra response header added with [`Server::add_header`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub key: String,
    pub value: String,
}

impl Header {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    fn to_pair(&self) -> Result<(HeaderName, HeaderValue)> {
        let invalid = |reason: String| Error::InvalidHeader {
            key: self.key.clone(),
            reason,
        };
        let name = HeaderName::from_bytes(self.key.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let value = HeaderValue::from_str(&self.value).map_err(|e| invalid(e.to_string()))?;
        Ok((name, value))
    }
}

/// Handle to a started server
struct Live {
    local_addr: SocketAddr,
    logger: Arc<dyn Logger>,
    event_base: u32,
    shutdown: watch::Sender<bool>,
    /// `Some(drained)` once the serve loop has ended
    finished: watch::Sender<Option<bool>>,
}

pub struct Server {
    /// Settings read by `start`; options and callers may change them before
    pub config: ServerConfig,
    headers: Vec<Header>,
    routes: Routes,
    logger: Option<Arc<dyn Logger>>,
    live: OnceLock<Live>,
}

impl Server {
    /// Create a server from defaults, applying `options` in order.
    /// The first failing option aborts construction.
    pub fn new(options: impl IntoIterator<Item = ServerOption>) -> Result<Self> {
        let mut server = Self::with_config(ServerConfig::default());
        for option in options {
            option(&mut server)?;
        }
        Ok(server)
    }

    /// Create a server from an already loaded configuration
    pub fn from_config(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            headers: Vec::new(),
            routes: Vec::new(),
            logger: None,
            live: OnceLock::new(),
        }
    }

    /// Replace the default logger
    pub fn set_logger(&mut self, logger: Arc<dyn Logger>) {
        self.logger = Some(logger);
    }

    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn add_routes(&mut self, routes: impl IntoIterator<Item = Route>) {
        self.routes.extend(routes);
    }

    /// Add a header to every response. Checked when the server starts.
    pub fn add_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.push(Header::new(key, value));
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// Bound address once the server is listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.live.get().map(|live| live.local_addr)
    }

    /// Bind the listener and serve until [`Server::stop`].
    ///
    /// Returns `Ok(())` after a requested stop; configuration, TLS and bind
    /// failures are returned before anything is served. A server can be
    /// started once.
    pub async fn start(&self) -> Result<()> {
        if self.live.get().is_some() {
            return Err(Error::AlreadyStarted);
        }

        let logger = self.resolve_logger()?;
        let base = self.config.event_base;
        logger.info(
            base.saturating_add(events::STARTING),
            "Starting server",
            &Fields::new()
                .with("listen", &self.config.listen)
                .with("tls", self.config.tls)
                .with("max_concurrent", self.config.max_concurrent),
        );

        let pipeline = Arc::new(Pipeline::new(
            self.response_headers()?,
            Arc::clone(&logger),
            base,
        ));
        let dispatcher = self.build_dispatcher(&pipeline)?;
        let tls = if self.config.tls {
            Some(tls::build_acceptor(&self.config)?)
        } else {
            None
        };

        let listener = listener::bind_listener(&self.config.listen).await?;
        let local_addr = listener.local_addr()?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let (finished, _) = watch::channel(None);
        self.live
            .set(Live {
                local_addr,
                logger: Arc::clone(&logger),
                event_base: base,
                shutdown,
                finished,
            })
            .map_err(|_| Error::AlreadyStarted)?;
        let live = self.live.get().ok_or(Error::NotRunning)?;

        logger.debug(
            base.saturating_add(events::STARTING),
            "Listening",
            &Fields::new().with("addr", local_addr),
        );

        let ctx = Arc::new(ConnectionContext {
            dispatcher,
            pipeline,
            tls,
            read_timeout: self.config.read_timeout(),
            idle_timeout: self.config.idle_timeout(),
        });
        let limit = ConnectionLimit::new(self.config.max_concurrent);

        let draining = server_loop::accept_loop(listener, limit, ctx, shutdown_rx).await;
        let drained = draining.drain(SHUTDOWN_GRACE).await;
        live.finished.send_replace(Some(drained));

        logger.info(
            base.saturating_add(events::STOPPED),
            "Server stopped",
            &Fields::new().with("drained", drained),
        );
        Ok(())
    }

    /// Stop accepting connections and wait for in-flight requests.
    ///
    /// Fails when the server was never started, or when requests were still
    /// running after [`SHUTDOWN_GRACE`] and had to be abandoned.
    pub async fn stop(&self) -> Result<()> {
        let live = self.live.get().ok_or(Error::NotRunning)?;
        live.logger.info(
            live.event_base.saturating_add(events::SHUTDOWN_REQUESTED),
            "Shutdown requested",
            &Fields::new().with("addr", live.local_addr),
        );
        live.shutdown.send_replace(true);

        let mut finished = live.finished.subscribe();
        let wait = async {
            finished
                .wait_for(Option::is_some)
                .await
                .is_ok_and(|outcome| *outcome == Some(true))
        };
        // The margin covers aborting connections after the grace expires
        let drained = tokio::time::timeout(SHUTDOWN_GRACE + Duration::from_secs(1), wait)
            .await
            .unwrap_or(false);

        if drained {
            Ok(())
        } else {
            Err(Error::ShutdownTimeout(SHUTDOWN_GRACE))
        }
    }

    fn resolve_logger(&self) -> Result<Arc<dyn Logger>> {
        if let Some(logger) = &self.logger {
            return Ok(Arc::clone(logger));
        }
        let logger = SimpleLogger::new(self.config.log_file.as_deref())?.with_debug(self.config.debug);
        Ok(Arc::new(logger))
    }

    /// User headers followed by the default cache headers
    fn response_headers(&self) -> Result<Vec<(HeaderName, HeaderValue)>> {
        let defaults: Vec<Header> = if self.config.default_headers {
            DEFAULT_HEADERS.iter().map(|(k, v)| Header::new(*k, *v)).collect()
        } else {
            Vec::new()
        };
        self.headers.iter().chain(&defaults).map(Header::to_pair).collect()
    }

    /// Routes in registration order, then the enabled built-ins
    fn routing_table(&self) -> Routes {
        let mut routes = self.routes.clone();
        if self.config.health_handler {
            routes.push(Route::get(
                "health",
                "/health",
                builtin::health(self.config.down_file.clone()),
            ));
        }
        if self.config.test_handler {
            routes.push(Route::get("test", "/test", builtin::echo_id));
            routes.push(Route::get("test", "/test/{id}", builtin::echo_id));
        }
        routes
    }

    fn build_dispatcher(&self, pipeline: &Arc<Pipeline>) -> Result<Dispatcher> {
        let logger = pipeline.logger();
        let mut router = Router::new(self.config.strict_slash);

        for route in self.routing_table() {
            let fields = Fields::new()
                .with("name", &route.name)
                .with("method", &route.method)
                .with("pattern", &route.pattern);
            let wrapper = Wrapper::new(
                route.name.clone(),
                Arc::clone(&route.handler),
                Arc::clone(pipeline),
            );

            match router.insert(route.method.clone(), &route.pattern, wrapper) {
                Ok(Inserted::Added) => {
                    logger.debug(
                        pipeline.event(events::ROUTE_REGISTERED),
                        "Registered route",
                        &fields,
                    );
                }
                Ok(Inserted::Duplicate) => {
                    logger.warning(
                        pipeline.event(events::DUPLICATE_ROUTE),
                        "Duplicate route ignored",
                        &fields,
                    );
                }
                Err(source) => {
                    return Err(Error::RouteConflict {
                        name: route.name,
                        method: route.method.to_string(),
                        pattern: route.pattern,
                        source,
                    });
                }
            }
        }

        Ok(Dispatcher::new(
            router,
            Arc::clone(pipeline),
            Wrapper::new("not_found", Arc::new(builtin::not_found), Arc::clone(pipeline)),
            Wrapper::new(
                "method_not_allowed",
                Arc::new(builtin::method_not_allowed),
                Arc::clone(pipeline),
            ),
            self.config.read_timeout(),
            self.config.write_timeout(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{with_default_headers, with_logger, with_test_handler};
    use crate::logger::Level;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<(Level, u32, String)>>);

    impl Logger for Capture {
        fn log(&self, level: Level, event_id: u32, message: &str, _fields: &Fields) {
            self.0.lock().unwrap().push((level, event_id, message.to_string()));
        }
    }

    #[test]
    fn test_response_headers_order_and_validation() {
        let mut server = Server::new(Vec::new()).unwrap();
        server.add_header("X-Service", "wrapsrv");
        let headers = server.response_headers().unwrap();
        assert_eq!(headers[0].0, "x-service");
        assert_eq!(headers.len(), 1 + DEFAULT_HEADERS.len());

        let mut server = Server::new(vec![with_default_headers(false)]).unwrap();
        server.add_header("Bad Header", "x");
        assert!(matches!(
            server.response_headers(),
            Err(Error::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_routing_table_builtins_follow_user_routes() {
        let mut server = Server::new(vec![with_test_handler(true)]).unwrap();
        server.add_route(Route::get("mine", "/health", builtin::not_found));
        let names: Vec<_> = server
            .routing_table()
            .iter()
            .map(|r| r.name.clone())
            .collect();
        assert_eq!(names, ["mine", "health", "test", "test"]);
    }

    #[test]
    fn test_duplicate_and_conflicting_routes() {
        let capture = Arc::new(Capture::default());
        let mut server = Server::new(vec![with_logger(capture.clone())]).unwrap();
        server.add_route(Route::get("a", "/things/{id}", builtin::not_found));
        server.add_route(Route::get("b", "/things/{id}", builtin::not_found));
        let pipeline = Arc::new(Pipeline::new(Vec::new(), capture.clone(), 100));
        assert!(server.build_dispatcher(&pipeline).is_ok());
        assert!(capture
            .0
            .lock()
            .unwrap()
            .iter()
            .any(|(level, id, _)| *level == Level::Warning && *id == 100 + events::DUPLICATE_ROUTE));

        server.add_route(Route::get("c", "/things/{name}", builtin::not_found));
        assert!(matches!(
            server.build_dispatcher(&pipeline),
            Err(Error::RouteConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_stop_before_start() {
        let server = Server::new(Vec::new()).unwrap();
        assert!(matches!(server.stop().await, Err(Error::NotRunning)));
        assert!(server.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_tls_without_material_fails_start() {
        let server = Server::new(vec![
            crate::config::with_tls(true),
            crate::config::with_listen("127.0.0.1:0"),
            with_logger(Arc::new(Capture::default())),
        ])
        .unwrap();
        assert!(matches!(server.start().await, Err(Error::TlsMaterialMissing)));
        assert!(server.local_addr().is_none());
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_lifecycle_futures_are_send() {
        let server = Server::new(Vec::new()).unwrap();
        let start = server.start();
        assert_send(&start);
        let stop = server.stop();
        assert_send(&stop);
    }
}
