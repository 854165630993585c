//! Trace ID Tests
//!
//! Covers how trace IDs are assigned, echoed and inherited:
//! - A generated ID is echoed in the response header, a received one is not
//! - Nested calls made while handling a call reuse its ID
//! - Calls made outside any handler start without an ID

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common::fooapi::{register_test_service, test_func, TestClient, TestServerFuncs, TEST_DO_SOMETHING3};
use common::TestServer;
use futures::FutureExt;
use serde_json::Value;
use trellis::client::ClientOptions;
use trellis::common::protocol::BoxError;
use trellis::common::rpc::{outgoing_filter, Envelope};
use trellis::common::trace::{current_trace_id, with_trace_id, TRACE_ID_HEADER};
use trellis::server::{Router, ServerOptions};

type TraceLog = Arc<Mutex<Vec<String>>>;

/// Server whose `DoSomething3` records the ambient trace ID under `label`.
async fn recording_server(label: &'static str, log: &TraceLog, options: &ServerOptions) -> TestServer {
    let log = log.clone();
    let funcs = TestServerFuncs {
        do_something3: Some(test_func(move |()| {
            log.lock()
                .unwrap()
                .push(format!("{}-{}", label, current_trace_id().unwrap_or_default()));
            async { Ok(()) }
        })),
        ..TestServerFuncs::default()
    };
    let mut router = Router::new();
    register_test_service(&mut router, funcs, options).unwrap();
    TestServer::start(router).await
}

// ============================================================================
// Inheritance
// ============================================================================

#[tokio::test]
async fn test_nested_calls_inherit_trace_id() {
    let log: TraceLog = Arc::default();

    let downstream = recording_server("A", &log, &ServerOptions::default()).await;
    let downstream_client = Arc::new(TestClient::new(downstream.base_url(), ClientOptions::default()));

    let k = AtomicUsize::new(0);
    let mut upstream_options = ServerOptions::new();
    upstream_options.set_trace_id_generator(Arc::new(move || {
        format!("My-Trace-ID-{}", k.fetch_add(1, Ordering::SeqCst) + 1)
    }));
    let record = log.clone();
    let funcs = TestServerFuncs {
        do_something3: Some(test_func(move |()| {
            let (record, downstream_client) = (record.clone(), downstream_client.clone());
            async move {
                let trace_id = current_trace_id().unwrap_or_default();
                record.lock().unwrap().push(format!("B1-{}", trace_id));
                let result = downstream_client.do_something3().await;
                record.lock().unwrap().push(format!("B2-{}", trace_id));
                result.map_err(|e| -> BoxError { Box::new(e) })
            }
        })),
        ..TestServerFuncs::default()
    };
    let mut router = Router::new();
    register_test_service(&mut router, funcs, &upstream_options).unwrap();
    let upstream = TestServer::start(router).await;

    let record = log.clone();
    let mut client_options = ClientOptions::new();
    client_options.add_rpc_filters(
        &TEST_DO_SOMETHING3,
        [outgoing_filter("Record", move |rpc, next| {
            let record = record.clone();
            async move {
                record.lock().unwrap().push(format!("C1-{}", rpc.trace_id()));
                let result = next.run(&mut *rpc).await;
                record.lock().unwrap().push(format!("C2-{}", rpc.trace_id()));
                result
            }
            .boxed()
        })],
    );
    let client = TestClient::new(upstream.base_url(), client_options);

    client.do_something3().await.unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "C1-",
            "B1-My-Trace-ID-1",
            "A-My-Trace-ID-1",
            "B2-My-Trace-ID-1",
            "C2-My-Trace-ID-1",
        ]
    );
}

#[tokio::test]
async fn test_ambient_trace_id_is_sent() {
    let log: TraceLog = Arc::default();
    let server = recording_server("A", &log, &ServerOptions::default()).await;
    let client = TestClient::new(server.base_url(), ClientOptions::default());

    with_trace_id("outer-trace".to_string(), client.do_something3())
        .await
        .unwrap();
    client.do_something3().await.unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log[0], "A-outer-trace");
    assert!(log[1].starts_with("A-"));
    assert_ne!(log[1], "A-outer-trace");
    assert_eq!(log[1].len(), "A-".len() + 22);
}

#[tokio::test]
async fn test_in_memory_transport_forwards_trace_id() {
    let log: TraceLog = Arc::default();
    let log2 = log.clone();
    let funcs = TestServerFuncs {
        do_something3: Some(test_func(move |()| {
            log2.lock().unwrap().push(current_trace_id().unwrap_or_default());
            async { Ok(()) }
        })),
        ..TestServerFuncs::default()
    };
    let mut router = Router::new();
    register_test_service(&mut router, funcs, &ServerOptions::default()).unwrap();
    let router = Arc::new(router);
    let mut options = ClientOptions::new();
    options.set_transport(router.in_memory_transport());
    let client = TestClient::new("http://in-memory", options);

    with_trace_id("in-memory-trace".to_string(), client.do_something3())
        .await
        .unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["in-memory-trace"]);
}

// ============================================================================
// Response Header
// ============================================================================

#[tokio::test]
async fn test_generated_trace_id_is_echoed() {
    let log: TraceLog = Arc::default();
    let server = recording_server("A", &log, &ServerOptions::default()).await;

    let response = reqwest::Client::new()
        .post(server.rpc_url("Foo.Test.DoSomething3"))
        .send()
        .await
        .unwrap();
    let header = response.headers()[TRACE_ID_HEADER].to_str().unwrap().to_owned();
    let body: Value = response.json().await.unwrap();

    assert_eq!(header.len(), 22);
    assert_eq!(body["traceID"], header.as_str());
    assert_eq!(log.lock().unwrap()[0], format!("A-{}", header));
}

#[tokio::test]
async fn test_received_trace_id_is_kept_but_not_echoed() {
    let log: TraceLog = Arc::default();
    let server = recording_server("A", &log, &ServerOptions::default()).await;

    let response = reqwest::Client::new()
        .post(server.rpc_url("Foo.Test.DoSomething3"))
        .header(TRACE_ID_HEADER, "caller-trace")
        .send()
        .await
        .unwrap();
    assert!(response.headers().get(TRACE_ID_HEADER).is_none());
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["traceID"], "caller-trace");
    assert_eq!(log.lock().unwrap()[0], "A-caller-trace");
}
