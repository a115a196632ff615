//! Built-in handlers
//!
//! Health check, fixed error envelopes, and the path-variable echo used to
//! validate routing.

use std::path::{Path, PathBuf};

use hyper::StatusCode;

use crate::http::{Envelope, Request};
use crate::routing::Handler;

/// Health envelope: "down"/503 when the marker file exists, else "ok"/200
pub async fn health_status(down_file: Option<&Path>) -> Envelope {
    let down = match down_file {
        Some(path) => tokio::fs::metadata(path).await.is_ok(),
        None => false,
    };

    if down {
        Envelope::new("down", StatusCode::SERVICE_UNAVAILABLE.as_u16())
            .with_details("server is shutting down")
    } else {
        Envelope::ok().with_details("health check ok")
    }
}

/// Health handler bound to a down-marker file
pub fn health(down_file: Option<PathBuf>) -> impl Handler {
    move |_request: Request| {
        let down_file = down_file.clone();
        async move { health_status(down_file.as_deref()).await }
    }
}

pub async fn unauthorized(_request: Request) -> Envelope {
    Envelope::error(StatusCode::UNAUTHORIZED, "not authorized")
}

pub async fn not_found(_request: Request) -> Envelope {
    Envelope::error(StatusCode::NOT_FOUND, "object does not exist")
}

pub async fn method_not_allowed(_request: Request) -> Envelope {
    Envelope::error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
}

/// Echoes the optional `id` path variable
pub async fn echo_id(request: Request) -> Envelope {
    let details = match request.param("id") {
        Some(id) if !id.is_empty() => format!("received ID {id}"),
        _ => "no ID received".to_string(),
    };
    Envelope::ok().with_details(details)
}
