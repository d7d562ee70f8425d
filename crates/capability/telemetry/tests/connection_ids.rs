use mconn_telemetry::{connection_span, init_tracing, new_connection_id};

#[test]
fn connection_ids_unique() {
    let first = new_connection_id();
    let second = new_connection_id();
    assert!(!first.is_empty());
    assert_ne!(first, second);
}

#[test]
fn init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    let span = connection_span("demo", &new_connection_id());
    let _entered = span.enter();
    tracing::info!(target: "mconn.connector", "inside_connection_span");
}
