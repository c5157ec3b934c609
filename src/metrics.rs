use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use lazy_static::lazy_static;
use log::{error, info};
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};
use std::convert::Infallible;
use std::net::SocketAddr;

lazy_static! {
    static ref CONNECTIONS_ACCEPTED: IntCounter = register_int_counter!(
        "beacon_connections_accepted_total",
        "Total number of client connections accepted by the listener."
    )
    .unwrap();
    static ref STATUS_REQUESTS: IntCounter = register_int_counter!(
        "beacon_status_requests_total",
        "Total number of server-list status requests handled."
    )
    .unwrap();
    static ref PING_REQUESTS: IntCounter = register_int_counter!(
        "beacon_ping_requests_total",
        "Total number of ping packets received."
    )
    .unwrap();
    static ref LOGIN_ATTEMPTS: IntCounter = register_int_counter!(
        "beacon_login_attempts_total",
        "Total number of login-start packets handled locally."
    )
    .unwrap();
    static ref FORWARDS_OPENED: IntCounter = register_int_counter!(
        "beacon_forwards_opened_total",
        "Total number of sessions spliced onto an upstream server."
    )
    .unwrap();
    static ref ACTIVE_FORWARDS: IntGauge = register_int_gauge!(
        "beacon_active_forwards",
        "Current number of sessions being forwarded."
    )
    .unwrap();
    static ref UPSTREAM_FAILURES: IntCounter = register_int_counter!(
        "beacon_upstream_failures_total",
        "Total number of upstream connections that could not be established."
    )
    .unwrap();
    static ref BYTES_TRANSFERRED: IntCounterVec = register_int_counter_vec!(
        "beacon_bytes_transferred_total",
        "Total number of bytes forwarded between client and upstream.",
        &["direction"]
    )
    .unwrap();
}

/// Starts the exporter endpoint on `addr`, serving the counters at
/// `/metrics` and a liveness probe at `/healthz`. Called once at startup;
/// bind failures are logged from the exporter task.
pub fn spawn_metrics_server(addr: SocketAddr) {
    tokio::spawn(async move {
        let service =
            make_service_fn(|_| async { Ok::<_, Infallible>(service_fn(handle_request)) });

        let server = match Server::try_bind(&addr) {
            Ok(builder) => builder.serve(service),
            Err(err) => {
                error!("metrics exporter could not bind {}: {}", addr, err);
                return;
            }
        };

        info!("metrics exporter on http://{}/metrics", addr);
        if let Err(err) = server.await {
            error!("metrics exporter exited: {}", err);
        }
    });
}

async fn handle_request(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    if req.method() != Method::GET {
        return Ok(plain_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "method not allowed",
        ));
    }

    match req.uri().path() {
        "/metrics" => Ok(render_metrics()),
        "/healthz" => Ok(Response::new(Body::from("ok"))),
        _ => Ok(plain_response(StatusCode::NOT_FOUND, "not found")),
    }
}

fn render_metrics() -> Response<Body> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    match encoder.encode(&prometheus::gather(), &mut buffer) {
        Ok(()) => Response::builder()
            .header("Content-Type", encoder.format_type())
            .body(Body::from(buffer))
            .unwrap(),
        Err(err) => {
            error!("could not encode metrics: {}", err);
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "encoding failed")
        }
    }
}

fn plain_response(status: StatusCode, message: &'static str) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(message))
        .unwrap()
}

pub fn record_connection_accepted() {
    CONNECTIONS_ACCEPTED.inc();
}

pub fn record_status_request() {
    STATUS_REQUESTS.inc();
}

pub fn record_ping_request() {
    PING_REQUESTS.inc();
}

pub fn record_login_attempt() {
    LOGIN_ATTEMPTS.inc();
}

pub fn record_forward_opened() {
    FORWARDS_OPENED.inc();
    ACTIVE_FORWARDS.inc();
}

pub fn record_forward_closed() {
    ACTIVE_FORWARDS.dec();
}

pub fn record_upstream_failure() {
    UPSTREAM_FAILURES.inc();
}

pub fn record_bytes(direction: &'static str, bytes: usize) {
    if bytes > 0 {
        BYTES_TRANSFERRED
            .with_label_values(&[direction])
            .inc_by(bytes as u64);
    }
}
