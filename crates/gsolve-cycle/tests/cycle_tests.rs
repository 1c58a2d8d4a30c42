//! Request cycle behavior against scripted collaborators

use gsolve_cycle::{
    CycleConfig, CycleError, CycleOutcome, DisplayMode, ExportError, Generation, MaterialId,
};
use gsolve_schema::ProtocolError;
use gsolve_test_utils::{
    body_with_items, body_with_outputs, broken_record, inputs, mesh_record, mesh_reply,
    setup_controller, Harness, MemorySink, UiEvent,
};
use gsolve_transport::{SolveReply, TransportError};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn document_config() -> CycleConfig {
    CycleConfig::new().with_display_mode(DisplayMode::Document)
}

async fn wait_for_requests(h: &Harness, count: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while h.transport.request_count() < count {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn every_record_decoded_and_attached_once() {
    let h = setup_controller(document_config());
    h.transport.reply(SolveReply::new(body_with_outputs(vec![
        vec![mesh_record(1), mesh_record(2)],
        vec![mesh_record(3), mesh_record(4)],
    ])));

    let outcome = h.controller.run_cycle(inputs(3.0, 7.0)).await.unwrap();

    assert_eq!(outcome.applied().unwrap().objects, 4);
    assert_eq!(h.decoder.decoded(), 4);
    let attached = h.scene.attached();
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].ids, vec![1, 2, 3, 4]);
    assert_eq!(attached[0].material, None);
}

#[tokio::test]
async fn previous_geometry_released_exactly_once() {
    let h = setup_controller(document_config());
    h.transport
        .reply(mesh_reply(&[1, 2, 3]))
        .reply(mesh_reply(&[4]))
        .reply(mesh_reply(&[5]));

    for _ in 0..3 {
        h.controller.run_cycle(inputs(1.0, 1.0)).await.unwrap();
    }

    let first = h.scene.attached()[0].node;
    let second = h.scene.attached()[1].node;
    assert_eq!(h.scene.released(), vec![first, second]);
    assert_eq!(h.decoder.release_calls(), 2);
    assert_eq!(h.decoder.released(), 4);
    assert_eq!(h.scene.live_nodes().len(), 1);
    assert_eq!(h.decoder.live(), 1);
}

#[tokio::test]
async fn failed_exchange_keeps_display_and_clears_busy() {
    let h = setup_controller(CycleConfig::new());
    h.transport.reply(mesh_reply(&[1])).fail(TransportError::Status {
        status: 500,
        reason: "Internal Server Error".to_string(),
    });

    h.controller.run_cycle(inputs(1.0, 1.0)).await.unwrap();
    let err = h.controller.run_cycle(inputs(2.0, 1.0)).await.unwrap_err();

    assert!(matches!(
        err,
        CycleError::Transport(TransportError::Status { status: 500, .. })
    ));
    assert_eq!(h.controller.displayed_generation(), Some(Generation(1)));
    assert_eq!(
        h.ui.events()[4..],
        [
            UiEvent::Busy(true),
            UiEvent::Export(false),
            UiEvent::Busy(false),
            UiEvent::Export(true),
        ]
    );
}

#[tokio::test]
async fn missing_branch_is_protocol_error() {
    let h = setup_controller(CycleConfig::new());
    let body = serde_json::to_vec(&serde_json::json!({
        "values": [{"ParamName": "RH_OUT:mesh", "InnerTree": {"{ 1; }": [mesh_record(1)]}}]
    }))
    .unwrap();
    h.transport.reply(SolveReply::new(body));

    let err = h.controller.run_cycle(inputs(1.0, 1.0)).await.unwrap_err();

    assert!(matches!(
        err,
        CycleError::Protocol(ProtocolError::MissingBranch { .. })
    ));
    assert!(!h.controller.has_geometry());
    assert!(!h.ui.is_busy());
    assert!(!h.ui.export_enabled());
}

#[tokio::test]
async fn input_change_displays_one_mesh() {
    let h = setup_controller(CycleConfig::new());
    h.transport.reply(mesh_reply(&[9]));

    h.controller.on_input_changed().await;

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].inputs().get("grow"), Some(3.0));
    assert_eq!(requests[0].inputs().get("seed"), Some(7.0));
    assert_eq!(h.controller.displayed_generation(), Some(Generation(1)));
    assert_eq!(h.scene.attached()[0].ids, vec![9]);
    assert!(!h.ui.is_busy());
    assert!(h.ui.export_enabled());
}

#[tokio::test]
async fn superseded_cycle_is_discarded_without_error() {
    let h = setup_controller(CycleConfig::new());
    let _first_gate = h.transport.gated();
    let second_gate = h.transport.gated();

    let controller = h.controller.clone();
    let first = tokio::spawn(async move { controller.run_cycle(inputs(1.0, 1.0)).await });
    wait_for_requests(&h, 1).await;

    let controller = h.controller.clone();
    let second = tokio::spawn(async move { controller.run_cycle(inputs(2.0, 1.0)).await });
    wait_for_requests(&h, 2).await;
    second_gate.open(mesh_reply(&[2]));

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();

    assert_eq!(
        first,
        CycleOutcome::Superseded {
            generation: Generation(1),
            latest: Generation(2),
        }
    );
    assert_eq!(second.applied().unwrap().generation, Generation(2));
    assert_eq!(h.scene.attached().len(), 1);
    assert_eq!(h.scene.attached()[0].ids, vec![2]);
    assert!(!h.ui.is_busy());
}

#[tokio::test]
async fn spawned_events_apply_latest_only() {
    let h = setup_controller(CycleConfig::new());
    h.transport
        .delayed(Duration::from_millis(50), mesh_reply(&[1]))
        .reply(mesh_reply(&[2]));

    h.ui.set_inputs(inputs(1.0, 1.0));
    let first = h.controller.spawn_on_input_changed();
    wait_for_requests(&h, 1).await;
    h.ui.set_inputs(inputs(2.0, 1.0));
    let second = h.controller.spawn_on_input_changed();
    first.await.unwrap();
    second.await.unwrap();

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].inputs().get("grow"), Some(1.0));
    assert_eq!(requests[1].inputs().get("grow"), Some(2.0));
    assert_eq!(h.controller.latest_generation(), Generation(2));
    assert_eq!(h.controller.displayed_generation(), Some(Generation(2)));
    assert_eq!(h.scene.attached().len(), 1);
    assert_eq!(h.scene.attached()[0].ids, vec![2]);
    assert_eq!(h.decoder.live(), 1);
    assert!(!h.ui.is_busy());
}

#[tokio::test]
async fn aborted_spawned_cycle_clears_busy() {
    let h = setup_controller(CycleConfig::new());
    h.transport.reply(mesh_reply(&[1]));
    h.controller.run_cycle(inputs(1.0, 1.0)).await.unwrap();
    let _gate = h.transport.gated();

    let handle = h.controller.spawn_on_input_changed();
    wait_for_requests(&h, 2).await;
    assert!(h.ui.is_busy());
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    assert!(!h.ui.is_busy());
    assert!(h.ui.export_enabled());
    assert_eq!(h.controller.displayed_generation(), Some(Generation(1)));
    assert_eq!(
        h.ui.events()[4..],
        [
            UiEvent::Busy(true),
            UiEvent::Export(false),
            UiEvent::Busy(false),
            UiEvent::Export(true),
        ]
    );
}

#[tokio::test]
async fn dropped_cycle_future_clears_busy() {
    let h = setup_controller(CycleConfig::new());
    let _gate = h.transport.gated();

    let result = tokio::time::timeout(
        Duration::from_millis(50),
        h.controller.run_cycle(inputs(1.0, 1.0)),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(h.transport.request_count(), 1);
    assert!(!h.ui.is_busy());
    assert!(!h.ui.export_enabled());
    assert!(!h.controller.has_geometry());
}

#[tokio::test]
async fn slow_service_times_out() {
    let h = setup_controller(CycleConfig::new().with_timeout(Duration::from_millis(50)));
    h.transport.delayed(Duration::from_millis(500), mesh_reply(&[1]));

    let err = h.controller.run_cycle(inputs(1.0, 1.0)).await.unwrap_err();

    assert_eq!(
        err,
        CycleError::Transport(TransportError::Timeout {
            after: Duration::from_millis(50)
        })
    );
    assert!(err.is_retryable());
    assert!(!h.ui.is_busy());
}

#[tokio::test]
async fn shutdown_cancels_in_flight_cycle() {
    let h = setup_controller(CycleConfig::new());
    h.transport.reply(mesh_reply(&[1]));
    h.controller.run_cycle(inputs(1.0, 1.0)).await.unwrap();
    let gate = h.transport.gated();

    let controller = h.controller.clone();
    let pending = tokio::spawn(async move { controller.run_cycle(inputs(2.0, 1.0)).await });
    wait_for_requests(&h, 2).await;
    h.controller.shutdown();
    gate.open(mesh_reply(&[2]));

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err, CycleError::Cancelled);
    assert!(!h.controller.has_geometry());
    assert_eq!(h.scene.live_nodes().len(), 0);
    assert_eq!(h.decoder.live(), 0);
    assert!(!h.ui.is_busy());
    assert!(!h.ui.export_enabled());

    let err = h.controller.run_cycle(inputs(3.0, 1.0)).await.unwrap_err();
    assert_eq!(err, CycleError::Cancelled);
}

#[tokio::test]
async fn single_mesh_reuses_material() {
    let h = setup_controller(CycleConfig::new());
    h.transport.reply(mesh_reply(&[1, 2])).reply(mesh_reply(&[3]));

    h.controller.run_cycle(inputs(1.0, 1.0)).await.unwrap();
    h.controller.run_cycle(inputs(2.0, 1.0)).await.unwrap();

    assert_eq!(h.scene.materials_created(), 1);
    let attached = h.scene.attached();
    assert_eq!(attached[0].ids, vec![1]);
    assert_eq!(attached[1].ids, vec![3]);
    assert!(attached.iter().all(|a| a.material == Some(MaterialId(1))));
}

#[tokio::test]
async fn decode_fault_releases_partial_document() {
    let h = setup_controller(document_config());
    h.transport.reply(SolveReply::new(body_with_items(vec![
        mesh_record(1),
        mesh_record(2),
        broken_record(),
    ])));

    let err = h.controller.run_cycle(inputs(1.0, 1.0)).await.unwrap_err();

    assert!(matches!(err, CycleError::Decode { index: 2, .. }));
    assert_eq!(h.decoder.decoded(), 2);
    assert_eq!(h.decoder.live(), 0);
    assert!(h.scene.attached().is_empty());
}

#[tokio::test]
async fn export_serializes_displayed_geometry() {
    let h = setup_controller(document_config());
    let sink = MemorySink::new();

    let err = h.controller.export(&sink).await.unwrap_err();
    assert_eq!(err, ExportError::NothingDisplayed);

    h.transport.reply(mesh_reply(&[4, 5]));
    h.controller.run_cycle(inputs(1.0, 1.0)).await.unwrap();
    let artifact = h.controller.export(&sink).await.unwrap();

    assert_eq!(artifact.file_name, "solve.3dm");
    assert_eq!(artifact.mime_type, "application/octet-stream");
    assert_eq!(artifact.generation, Generation(1));
    assert_eq!(artifact.bytes, b"[4,5]".to_vec());
    assert_eq!(sink.saved(), vec![artifact]);

    let err = h
        .controller
        .export(&MemorySink::rejecting())
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Sink(_)));
}

#[tokio::test]
async fn concurrent_cycles_converge_on_latest() {
    let h = setup_controller(CycleConfig::new());
    for id in 1..=5 {
        h.transport.delayed(Duration::from_millis(10), mesh_reply(&[id]));
    }

    let cycles = (1..=5).map(|i| h.controller.run_cycle(inputs(f64::from(i), 1.0)));
    let outcomes = futures::future::join_all(cycles).await;

    let applied: Vec<_> = outcomes
        .iter()
        .filter_map(|o| o.as_ref().unwrap().applied())
        .collect();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].generation, Generation(5));
    assert_eq!(h.scene.attached().len(), 1);
    assert_eq!(h.decoder.live(), 1);
    assert!(!h.ui.is_busy());
    assert!(h.ui.export_enabled());
}
