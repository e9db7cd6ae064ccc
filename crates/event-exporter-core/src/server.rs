// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use event_sinks::metric_sink::EventCounter;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{header, http, Method, Response, StatusCode};
use std::io;
use std::sync::Arc;
use tracing::{debug, error};

pub const METRICS_ENDPOINT_PATH: &str = "/metrics";

/// Serves the counter in the Prometheus text format until accepting fails.
pub async fn serve_metrics(
    listener: tokio::net::TcpListener,
    counter: Arc<EventCounter>,
) -> io::Result<()> {
    let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
        let counter = Arc::clone(&counter);
        async move { metrics_endpoint_handler(&counter, req.method(), req.uri().path()) }
    });

    let server = hyper::server::conn::http1::Builder::new();
    let mut joinset = tokio::task::JoinSet::new();

    loop {
        let conn = tokio::select! {
            con_res = listener.accept() => match con_res {
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::ConnectionAborted
                            | io::ErrorKind::ConnectionReset
                            | io::ErrorKind::ConnectionRefused
                    ) =>
                {
                    continue;
                }
                Err(e) => {
                    error!("Server error: {e}");
                    return Err(e);
                }
                Ok((conn, _)) => conn,
            },
            finished = async {
                match joinset.join_next().await {
                    Some(finished) => finished,
                    None => std::future::pending().await,
                }
            } => match finished {
                Err(e) if e.is_panic() => {
                    error!("Connection handler panicked: {:?}", e);
                    continue;
                },
                Ok(()) | Err(_) => continue,
            },
        };
        let conn = hyper_util::rt::TokioIo::new(conn);
        let server = server.clone();
        let service = service.clone();
        joinset.spawn(async move {
            if let Err(e) = server.serve_connection(conn, service).await {
                error!("Connection error: {e}");
            }
        });
    }
}

pub fn metrics_endpoint_handler(
    counter: &EventCounter,
    method: &Method,
    path: &str,
) -> http::Result<Response<Full<Bytes>>> {
    if path != METRICS_ENDPOINT_PATH {
        return text_response(StatusCode::NOT_FOUND, "text/plain", "Not Found".to_string());
    }
    if method != Method::GET && method != Method::HEAD {
        return text_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "text/plain",
            "Method Not Allowed".to_string(),
        );
    }

    match counter.encode() {
        Ok(body) => {
            debug!("Serving {} bytes of metrics", body.len());
            text_response(StatusCode::OK, &counter.content_type(), body)
        }
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "text/plain",
                "Failed to encode metrics".to_string(),
            )
        }
    }
}

fn text_response(
    status: StatusCode,
    content_type: &str,
    body: String,
) -> http::Result<Response<Full<Bytes>>> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content_type)
        .body(Full::new(Bytes::from(body)))
}
