//! TCP client for the tessera RPC server

mod client;

pub use client::{ClientError, TableClient};
pub use tessera_core::wire::rpc::{
    ProtocolError, RpcColumn, RpcRow, RpcSchema, RpcValue, UpdateCellResponse,
};
pub use tessera_core::TableInfo;
