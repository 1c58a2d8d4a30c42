//! Session Tests
//!
//! The full stack against a local warp solve server.

use gsolve_cycle::{CycleError, CycleOutcome, DisplayMode, Generation};
use gsolve_schema::{ProtocolError, SliderInputs};
use gsolve_transport::Endpoint;
use gsolve_viewer::envelope::BUNDLE_MAGIC;
use gsolve_viewer::{Session, ViewerConfig, ViewerError};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use warp::Filter;

fn envelope(data: &str) -> String {
    json!({"version": 10000, "archive3dm": 70, "opennurbs": -1877964136, "data": data}).to_string()
}

fn solved(items: &[&str]) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|data| json!({"type": "Rhino.Geometry.Mesh", "data": envelope(data)}))
        .collect();
    json!({"values": [{"ParamName": "RH_OUT:mesh", "InnerTree": {"{ 0; }": items}}]})
}

fn config(endpoint: Endpoint) -> ViewerConfig {
    let mut config = ViewerConfig::new().with_endpoint(endpoint);
    config.inputs = SliderInputs::new()
        .with("grow", 3.0)
        .unwrap()
        .with("seed", 7.0)
        .unwrap();
    config
}

#[tokio::test]
async fn app_server_solve_and_export() {
    let route = warp::post()
        .and(warp::path("solve"))
        .and(warp::body::json())
        .map(|body: Value| {
            assert_eq!(body["inputs"], json!({"grow": 3.0, "seed": 7.0}));
            warp::reply::json(&solved(&["AQID", "BAU="]))
        });
    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let mut config = config(Endpoint::app_server(format!("http://{addr}")));
    config.cycle.display_mode = DisplayMode::Document;
    let session = Session::open(&config).await.unwrap();

    let outcome = session.solve().await.unwrap();
    let CycleOutcome::Applied(report) = outcome else {
        panic!("expected applied outcome");
    };
    assert_eq!(report.generation, Generation(1));
    assert_eq!(report.objects, 2);
    assert_eq!(session.scene().live_objects(), 2);
    assert!(session.ui().export_enabled());
    assert!(!session.ui().is_busy());

    let dir = tempfile::tempdir().unwrap();
    let artifact = session.export(dir.path()).await.unwrap();
    let written = std::fs::read(dir.path().join("solve.3dm")).unwrap();
    assert_eq!(written, artifact.bytes);
    assert_eq!(&written[..4], BUNDLE_MAGIC);

    session.close();
    assert_eq!(session.scene().live_nodes(), 0);
    assert_eq!(session.decoder().live_objects(), 0);
}

#[tokio::test]
async fn compute_service_sends_key_and_displays_first_record() {
    let route = warp::post()
        .and(warp::path("grasshopper"))
        .and(warp::header::<String>("rhinocomputekey"))
        .and(warp::body::json())
        .map(|key: String, body: Value| {
            assert_eq!(key, "k-123");
            assert_eq!(body["pointer"], "orbs.gh");
            warp::reply::json(&solved(&["AQID", "BAU="]))
        });
    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let config = config(Endpoint::compute_service(
        format!("http://{addr}"),
        Some("k-123".to_string()),
    ));
    let session = Session::open(&config).await.unwrap();

    let outcome = session.solve().await.unwrap();

    assert_eq!(outcome.applied().unwrap().objects, 1);
    assert_eq!(session.scene().live_nodes(), 1);
    session.close();
}

#[tokio::test]
async fn malformed_response_leaves_nothing_displayed() {
    let route = warp::post()
        .and(warp::path("solve"))
        .map(|| warp::reply::json(&json!({"values": []})));
    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let session = Session::open(&config(Endpoint::app_server(format!("http://{addr}"))))
        .await
        .unwrap();

    let err = session.solve().await.unwrap_err();

    assert!(matches!(
        err,
        ViewerError::Cycle(CycleError::Protocol(ProtocolError::NoOutputs))
    ));
    assert!(!session.controller().has_geometry());
    assert!(!session.ui().export_enabled());

    let dir = tempfile::tempdir().unwrap();
    let err = session.export(dir.path()).await.unwrap_err();
    assert!(matches!(err, ViewerError::Export(_)));
}
