//! Trellis Server
//!
//! This crate provides the server side of trellis: the [`Router`] that maps
//! `/rpc/{fullMethodName}` paths to handlers, the [`ServiceRegistrar`] used
//! by generated code to register a service's methods, the hyper-based
//! [`HttpServer`] and the [`IncomingRpcLogger`] filter.

pub mod http_server;
pub mod logger;
pub mod options;
pub mod registrar;
pub mod router;

pub use http_server::HttpServer;
pub use logger::IncomingRpcLogger;
pub use options::{ServerConfig, ServerMiddleware, ServerOptions};
pub use registrar::{HandlerResult, ServiceRegistrar};
pub use router::{RouteInfo, Router};
