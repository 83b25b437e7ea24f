//! HTTP exposition endpoint for the metrics registry
//!
//! Binds eagerly so the caller learns the real address (the env contract
//! allows port 0 for an ephemeral port), then serves until cancelled.
//! A connection that fails never takes the endpoint down; the accept loop
//! logs and keeps going.
//!
//! Routes: `GET /metrics` returns the Prometheus text exposition, `GET /`
//! a short index naming it. Non-GET methods get 405 with an `Allow`
//! header, anything else 404.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics::MetricsRegistry;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Bound-and-ready metrics endpoint
pub struct MetricsServer {
    metrics: Arc<MetricsRegistry>,
    listener: TcpListener,
}

impl MetricsServer {
    /// Binds the endpoint.
    ///
    /// # Arguments
    /// * `metrics` - The shared metrics registry
    /// * `endpoint` - Address to bind; `127.0.0.1:0` picks a free port
    ///
    /// # Errors
    /// Fails when the address does not parse or cannot be bound.
    pub async fn bind(metrics: Arc<MetricsRegistry>, endpoint: &str) -> anyhow::Result<Self> {
        let addr: SocketAddr = endpoint.parse()?;
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "Metrics endpoint bound");
        Ok(Self { metrics, listener })
    }

    /// The address the endpoint actually listens on.
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves connections until `shutdown` fires.
    ///
    /// Should be spawned as a background task. Accept and connection
    /// failures are logged, never fatal.
    pub async fn serve(self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(peer = %peer, "Metrics scrape connection");
                            tokio::spawn(handle_connection(stream, Arc::clone(&self.metrics)));
                        }
                        Err(e) => warn!(error = %e, "Metrics accept failed"),
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Metrics endpoint shutting down");
                    break;
                }
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, metrics: Arc<MetricsRegistry>) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| {
        let metrics = Arc::clone(&metrics);
        async move { Ok::<_, Infallible>(route(&req, &metrics)) }
    });

    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
        debug!(error = %e, "Metrics connection ended with error");
    }
}

/// Dispatches one request.
fn route(req: &Request<hyper::body::Incoming>, metrics: &MetricsRegistry) -> Response<Full<Bytes>> {
    if req.method() != Method::GET {
        let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed\n");
        response
            .headers_mut()
            .insert(hyper::header::ALLOW, "GET".parse().expect("static header"));
        return response;
    }

    match req.uri().path() {
        "/metrics" => match metrics.encode() {
            Ok(body) => {
                let mut response = text_response(StatusCode::OK, &body);
                response.headers_mut().insert(
                    hyper::header::CONTENT_TYPE,
                    PROMETHEUS_CONTENT_TYPE.parse().expect("static header"),
                );
                response
            }
            Err(e) => {
                warn!(error = %e, "Metrics encoding failed");
                text_response(StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable\n")
            }
        },
        "/" => text_response(StatusCode::OK, "lowkey metrics endpoint; scrape /metrics\n"),
        _ => text_response(StatusCode::NOT_FOUND, "not found\n"),
    }
}

fn text_response(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response parts")
}
