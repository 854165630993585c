//! Shared helpers for the workspace integration tests

#![allow(dead_code)]

pub mod fooapi;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use trellis::common::protocol::Result;
use trellis::server::{HttpServer, Router};

use fooapi::{MyStructString, XString};

/// A server on an ephemeral port, stopped when dropped.
pub struct TestServer {
    pub addr: SocketAddr,
    pub router: Arc<Router>,
    handle: JoinHandle<Result<()>>,
}

impl TestServer {
    pub async fn start(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Arc::new(router);
        let handle = tokio::spawn(HttpServer::new(router.clone()).serve(listener));
        Self { addr, router, handle }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn rpc_url(&self, full_method_name: &str) -> String {
        format!("{}/rpc/{}", self.base_url(), full_method_name)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A `MyStructString` that passes validation.
pub fn my_struct_string() -> MyStructString {
    MyStructString {
        the_string_a: "abc".to_string(),
        the_x_string_b: XString::from("abcde"),
        the_optional_x_string_b: Some(XString::from("abcde")),
        the_repeated_x_string_b: vec![XString::from("abcde"), XString::from("fghij")],
        the_enum_string: "abc".to_string(),
        the_count_limited_repeated_enum_string: vec!["abc".into(), "def".into(), "abc".into(), "def".into()],
        others: Vec::new(),
    }
}
