//! Transport Tests
//!
//! Both transports against a local warp solve server.

use gsolve_schema::{DefinitionRef, SliderInputs, SolveRequest};
use gsolve_transport::{Endpoint, TransportConfig, TransportError};
use serde_json::{json, Value};
use std::time::Duration;
use warp::http::StatusCode;
use warp::Filter;

fn inputs() -> SliderInputs {
    SliderInputs::new()
        .with("grow", 3.0)
        .unwrap()
        .with("seed", 7.0)
        .unwrap()
}

fn solved() -> Value {
    json!({
        "values": [{
            "ParamName": "RH_OUT:mesh",
            "InnerTree": {"{ 0; }": [{"type": "Rhino.Geometry.Mesh", "data": "{\"version\":10000}"}]}
        }]
    })
}

#[tokio::test]
async fn app_server_posts_inputs_and_reads_timing() {
    let route = warp::post()
        .and(warp::path("solve"))
        .and(warp::body::json())
        .map(|body: Value| {
            assert_eq!(body["definition"], "orbs.gh");
            assert_eq!(body["inputs"], json!({"grow": 3.0, "seed": 7.0}));
            warp::reply::with_header(
                warp::reply::json(&solved()),
                "server-timing",
                "compute;dur=40, network;dur=5",
            )
        });
    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let transport = TransportConfig::new()
        .with_endpoint(Endpoint::app_server(format!("http://{addr}/")))
        .connect()
        .unwrap();
    let request = SolveRequest::new(DefinitionRef::named("orbs.gh"), inputs());

    let reply = transport.solve(&request).await.unwrap();
    let body: Value = serde_json::from_slice(&reply.body).unwrap();
    assert_eq!(body, solved());

    let timing = reply.server_timing.expect("server-timing header");
    assert!((timing.total_ms() - 45.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn non_success_status_is_transport_error() {
    let route = warp::post()
        .and(warp::path("solve"))
        .map(|| warp::reply::with_status(warp::reply(), StatusCode::INTERNAL_SERVER_ERROR));
    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let transport = TransportConfig::new()
        .with_endpoint(Endpoint::app_server(format!("http://{addr}")))
        .connect()
        .unwrap();
    let request = SolveRequest::new(DefinitionRef::named("orbs.gh"), inputs());

    let err = transport.solve(&request).await.unwrap_err();
    assert_eq!(
        err,
        TransportError::Status {
            status: 500,
            reason: "Internal Server Error".to_string()
        }
    );
}

#[tokio::test]
async fn compute_service_sends_key_and_trees() {
    let route = warp::post()
        .and(warp::path("grasshopper"))
        .and(warp::header::<String>("rhinocomputekey"))
        .and(warp::body::json())
        .map(|key: String, body: Value| {
            assert_eq!(key, "secret");
            assert_eq!(body["algo"], "AQID");
            assert_eq!(body["values"][0]["ParamName"], "RH_IN:grow");
            assert_eq!(body["values"][1]["InnerTree"]["{0}"][0]["data"], 7.0);
            warp::reply::json(&solved())
        });
    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let transport = TransportConfig::new()
        .with_endpoint(Endpoint::compute_service(
            format!("http://{addr}"),
            Some("secret".to_string()),
        ))
        .connect()
        .unwrap();
    let request = SolveRequest::new(DefinitionRef::inline("test.gh", vec![1, 2, 3]), inputs());

    let reply = transport.solve(&request).await.unwrap();
    assert!(reply.server_timing.is_none());
    assert!(!reply.body.is_empty());
}

#[tokio::test]
async fn slow_service_times_out() {
    let route = warp::post().and(warp::path("solve")).and_then(|| async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok::<_, warp::Rejection>(warp::reply::json(&solved()))
    });
    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let transport = TransportConfig::new()
        .with_endpoint(Endpoint::app_server(format!("http://{addr}")))
        .with_timeout(Duration::from_millis(50))
        .connect()
        .unwrap();
    let request = SolveRequest::new(DefinitionRef::named("orbs.gh"), inputs());

    let err = transport.solve(&request).await.unwrap_err();
    assert_eq!(
        err,
        TransportError::Timeout {
            after: Duration::from_millis(50)
        }
    );
}

#[tokio::test]
async fn unreachable_service_is_network_error() {
    let transport = TransportConfig::new()
        .with_endpoint(Endpoint::app_server("http://127.0.0.1:9"))
        .with_timeout(Duration::from_secs(2))
        .connect()
        .unwrap();
    let request = SolveRequest::new(DefinitionRef::named("orbs.gh"), inputs());

    let err = transport.solve(&request).await.unwrap_err();
    assert!(matches!(err, TransportError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn app_server_rejects_inline_definition_before_sending() {
    let transport = TransportConfig::new()
        .with_endpoint(Endpoint::app_server("http://127.0.0.1:9"))
        .connect()
        .unwrap();
    let request = SolveRequest::new(DefinitionRef::inline("test.gh", vec![1]), inputs());

    let err = transport.solve(&request).await.unwrap_err();
    assert!(matches!(err, TransportError::Encode(_)));
}
