//! Protocol adapters for the tessera table store
//!
//! Both surfaces share one `Arc<DataStore>` and never hold a table lock across
//! an await point.

pub mod config;
pub mod http;
pub mod rpc;

pub use config::Config;
pub use http::router;
pub use rpc::RpcServer;
