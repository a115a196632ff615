// Dispatch module
// Routes one transport request to its wrapper under the read/write budgets

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, ALLOW};
use hyper::{Request as HyperRequest, Response, StatusCode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::handler::{Pipeline, RequestLog, Wrapper};
use crate::http::{build_redirect_response, Params, Request};
use crate::routing::{Lookup, Router};

/// Handler name logged for strict-slash redirects
const REDIRECT: &str = "redirect";

pub struct Dispatcher {
    router: Router<Wrapper>,
    pipeline: Arc<Pipeline>,
    not_found: Wrapper,
    method_not_allowed: Wrapper,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        router: Router<Wrapper>,
        pipeline: Arc<Pipeline>,
        not_found: Wrapper,
        method_not_allowed: Wrapper,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        Self {
            router,
            pipeline,
            not_found,
            method_not_allowed,
            read_timeout,
            write_timeout,
        }
    }

    /// Serve one request.
    ///
    /// An `Err` makes hyper drop the connection without a response; that is
    /// how an exceeded read or write budget surfaces to the client. Every
    /// request gets exactly one log record, including those.
    pub async fn dispatch<B>(
        &self,
        request: HyperRequest<B>,
        remote: SocketAddr,
    ) -> Result<Response<Full<Bytes>>>
    where
        B: hyper::body::Body<Data = Bytes>,
        Error: From<B::Error>,
    {
        let (parts, body) = request.into_parts();
        let log = RequestLog::begin(&parts.headers, &parts.method, parts.uri.path(), remote);

        let (wrapper, params, allowed) =
            match self.router.at(&parts.method, parts.uri.path(), parts.uri.query()) {
                Lookup::Found { endpoint, params } => (endpoint, params, None),
                Lookup::MethodNotAllowed { allowed } => {
                    (&self.method_not_allowed, Params::default(), Some(allowed))
                }
                Lookup::Redirect(location) => {
                    let response = build_redirect_response(&location);
                    self.pipeline
                        .log_served(&log, REDIRECT, StatusCode::MOVED_PERMANENTLY.as_u16());
                    return Ok(response);
                }
                Lookup::NotFound => (&self.not_found, Params::default(), None),
            };

        let collected = match timeout(self.read_timeout, body.collect()).await {
            Ok(Ok(collected)) => collected,
            Ok(Err(e)) => {
                let e = Error::from(e);
                self.pipeline.log_abandoned(&log, wrapper.name(), &e.to_string());
                return Err(e);
            }
            Err(_) => {
                self.pipeline.log_abandoned(&log, wrapper.name(), "read timeout");
                return Err(Error::ReadTimeout(self.read_timeout));
            }
        };

        let request = Request::from_parts(parts, collected.to_bytes(), remote).with_params(params);

        // Handlers are not cancelled when the write budget runs out
        let task = {
            let wrapper = wrapper.clone();
            let log = log.clone();
            tokio::spawn(async move { wrapper.serve_logged(request, log).await })
        };
        let mut response = match timeout(self.write_timeout, task).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                self.pipeline.log_abandoned(&log, wrapper.name(), "handler failed");
                return Err(Error::Handler(e));
            }
            Err(_) => {
                self.pipeline.log_abandoned(&log, wrapper.name(), "write timeout");
                return Err(Error::WriteTimeout(self.write_timeout));
            }
        };

        if let Some(allowed) = allowed {
            let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(ALLOW, value);
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{method_not_allowed, not_found, Pipeline};
    use crate::http::Envelope;
    use crate::logger::{events, Fields, Level, Logger};
    use hyper::body::{Body, Frame};
    use hyper::Method;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::task::{Context, Poll};

    #[derive(Default)]
    struct Records(Mutex<Vec<(Level, u32, Fields)>>);

    impl Records {
        /// Request records written so far
        fn requests(&self) -> Vec<(Level, Fields)> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, id, _)| *id == events::REQUEST)
                .map(|(level, _, fields)| (*level, fields.clone()))
                .collect()
        }
    }

    impl Logger for Records {
        fn log(&self, level: Level, event_id: u32, _: &str, fields: &Fields) {
            self.0.lock().unwrap().push((level, event_id, fields.clone()));
        }
    }

    /// A body whose client never sends anything
    struct Stalled;

    impl Body for Stalled {
        type Data = Bytes;
        type Error = std::convert::Infallible;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<std::result::Result<Frame<Bytes>, Self::Error>>> {
            Poll::Pending
        }
    }

    async fn item(request: Request) -> Envelope {
        let id = request.param("id").unwrap_or_default().to_string();
        Envelope::ok().with_details(format!("item {id} {}", request.body().len()))
    }

    async fn slow(_request: Request) -> Envelope {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Envelope::ok()
    }

    fn dispatcher(strict_slash: bool, write_timeout: Duration) -> Dispatcher {
        dispatcher_with(
            Arc::new(Records::default()),
            strict_slash,
            Duration::from_secs(1),
            write_timeout,
        )
    }

    fn dispatcher_with(
        records: Arc<Records>,
        strict_slash: bool,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Dispatcher {
        let pipeline = Arc::new(Pipeline::new(Vec::new(), records, 0));
        let wrap = |name: &str, handler: Arc<dyn crate::routing::Handler>| {
            Wrapper::new(name, handler, Arc::clone(&pipeline))
        };

        let mut router = Router::new(strict_slash);
        router
            .insert(Method::POST, "/items/{id}", wrap("item", Arc::new(item)))
            .unwrap();
        router.insert(Method::GET, "/slow", wrap("slow", Arc::new(slow))).unwrap();

        Dispatcher::new(
            router,
            Arc::clone(&pipeline),
            wrap("not_found", Arc::new(not_found)),
            wrap("method_not_allowed", Arc::new(method_not_allowed)),
            read_timeout,
            write_timeout,
        )
    }

    fn request(method: Method, uri: &str, body: &'static str) -> HyperRequest<Full<Bytes>> {
        HyperRequest::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    async fn envelope(response: Response<Full<Bytes>>) -> Envelope {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn remote() -> SocketAddr {
        "10.1.2.3:5555".parse().unwrap()
    }

    #[tokio::test]
    async fn test_found_with_params_and_body() {
        let d = dispatcher(false, Duration::from_secs(1));
        let response = d
            .dispatch(request(Method::POST, "/items/42", "abc"), remote())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(envelope(response).await.details, "item 42 3");
    }

    #[tokio::test]
    async fn test_not_found_and_method_not_allowed() {
        let d = dispatcher(false, Duration::from_secs(1));

        let response = d.dispatch(request(Method::GET, "/nope", ""), remote()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(envelope(response).await.details, "object does not exist");

        let response = d
            .dispatch(request(Method::GET, "/items/42", ""), remote())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "POST");
        assert_eq!(envelope(response).await.details, "method not allowed");
    }

    #[tokio::test]
    async fn test_strict_slash_redirect() {
        let d = dispatcher(true, Duration::from_secs(1));
        let response = d
            .dispatch(request(Method::GET, "/slow/?x=1", ""), remote())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()["location"], "/slow?x=1");
    }

    #[tokio::test]
    async fn test_write_timeout() {
        let d = dispatcher(false, Duration::from_millis(20));
        let result = d.dispatch(request(Method::GET, "/slow", ""), remote()).await;
        assert!(matches!(result, Err(Error::WriteTimeout(_))));
    }

    #[tokio::test]
    async fn test_redirect_is_logged_once() {
        let records = Arc::new(Records::default());
        let d = dispatcher_with(
            Arc::clone(&records),
            true,
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        let response = d
            .dispatch(request(Method::GET, "/slow/?x=1", ""), remote())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);

        let logged = records.requests();
        assert_eq!(logged.len(), 1);
        let (level, fields) = &logged[0];
        assert_eq!(*level, Level::Info);
        assert_eq!(fields.get("code"), Some("301"));
        assert_eq!(fields.get("handler"), Some("redirect"));
        assert_eq!(fields.get("uri"), Some("/slow/"));
    }

    #[tokio::test]
    async fn test_write_timeout_is_logged_once() {
        let records = Arc::new(Records::default());
        let d = dispatcher_with(
            Arc::clone(&records),
            false,
            Duration::from_secs(1),
            Duration::from_millis(20),
        );
        let result = d.dispatch(request(Method::GET, "/slow", ""), remote()).await;
        assert!(matches!(result, Err(Error::WriteTimeout(_))));

        let logged = records.requests();
        assert_eq!(logged.len(), 1);
        let (level, fields) = &logged[0];
        assert_eq!(*level, Level::Warning);
        assert_eq!(fields.get("code"), Some("0"));
        assert_eq!(fields.get("handler"), Some("slow"));
        assert_eq!(fields.get("error"), Some("write timeout"));

        // The handler still completes, without a second record
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(records.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_read_timeout_is_logged_once() {
        let records = Arc::new(Records::default());
        let d = dispatcher_with(
            Arc::clone(&records),
            false,
            Duration::from_millis(20),
            Duration::from_secs(1),
        );
        let stalled = HyperRequest::builder()
            .method(Method::POST)
            .uri("/items/7")
            .body(Stalled)
            .unwrap();
        let result = d.dispatch(stalled, remote()).await;
        assert!(matches!(result, Err(Error::ReadTimeout(_))));

        let logged = records.requests();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].1.get("code"), Some("0"));
        assert_eq!(logged[0].1.get("handler"), Some("item"));
        assert_eq!(logged[0].1.get("error"), Some("read timeout"));
    }

    #[tokio::test]
    async fn test_served_request_is_logged_once() {
        let records = Arc::new(Records::default());
        let d = dispatcher_with(
            Arc::clone(&records),
            false,
            Duration::from_secs(1),
            Duration::from_secs(1),
        );
        d.dispatch(request(Method::GET, "/nope", ""), remote()).await.unwrap();

        let logged = records.requests();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].1.get("code"), Some("404"));
        assert_eq!(logged[0].1.get("handler"), Some("not_found"));
        assert_eq!(logged[0].1.get("src"), Some("10.1.2.3"));
    }
}
