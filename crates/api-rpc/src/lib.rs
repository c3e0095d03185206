//! JSON-RPC API Layer
//!
//! Exposes the generation queue, gallery and usage counters over JSON-RPC 2.0.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
