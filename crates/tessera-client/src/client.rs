//! RPC client implementation

use tessera_core::wire::rpc::{
    decode_rows, decode_table_list, encode_table_id, parse_header, write_request, Command,
    ProtocolError, RpcRow, RpcSchema, RpcValue, Status, UpdateCellRequest, UpdateCellResponse,
    HEADER_LEN,
};
use tessera_core::TableInfo;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Client error types
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Table server client
pub struct TableClient {
    stream: TcpStream,
}

impl TableClient {
    /// Connect to an RPC server, e.g. `127.0.0.1:50051`
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self { stream })
    }

    /// Send a request and read the response payload
    async fn request(&mut self, cmd: Command, payload: &[u8]) -> Result<Vec<u8>, ClientError> {
        self.stream.write_all(&write_request(cmd, payload)).await?;

        // Read response header (5 bytes)
        let mut header = [0u8; HEADER_LEN];
        self.stream.read_exact(&mut header).await?;
        let (code, payload_len) = parse_header(&header)?;
        let status = Status::try_from(code)?;

        // Read response payload
        let mut payload = vec![0u8; payload_len];
        if payload_len > 0 {
            self.stream.read_exact(&mut payload).await?;
        }

        match status {
            Status::Ok => Ok(payload),
            Status::NotFound => Err(ClientError::NotFound(
                String::from_utf8_lossy(&payload).to_string(),
            )),
            Status::Error => Err(ClientError::Server(
                String::from_utf8_lossy(&payload).to_string(),
            )),
        }
    }

    /// Ping the server
    pub async fn ping(&mut self) -> Result<String, ClientError> {
        let payload = self.request(Command::Ping, &[]).await?;
        Ok(String::from_utf8_lossy(&payload).to_string())
    }

    /// List every table's id and display name
    pub async fn list_tables(&mut self) -> Result<Vec<TableInfo>, ClientError> {
        let payload = self.request(Command::ListTables, &[]).await?;
        Ok(decode_table_list(&payload)?)
    }

    /// Fetch a table's schema
    pub async fn get_schema(&mut self, table_id: &str) -> Result<RpcSchema, ClientError> {
        let payload = self
            .request(Command::GetSchema, &encode_table_id(table_id))
            .await?;
        Ok(RpcSchema::decode(&payload)?)
    }

    /// Fetch every row of a table
    pub async fn get_data(&mut self, table_id: &str) -> Result<Vec<RpcRow>, ClientError> {
        let payload = self
            .request(Command::GetData, &encode_table_id(table_id))
            .await?;
        Ok(decode_rows(&payload)?)
    }

    /// Update one cell.
    ///
    /// Rejections by the store come back as `ok == false` with a message, not
    /// as an `Err`.
    pub async fn update_cell(
        &mut self,
        table_id: &str,
        row_id: &str,
        column_id: &str,
        value: RpcValue,
    ) -> Result<UpdateCellResponse, ClientError> {
        let request = UpdateCellRequest {
            table_id: table_id.to_string(),
            row_id: row_id.to_string(),
            column_id: column_id.to_string(),
            value,
        };
        let payload = self.request(Command::UpdateCell, &request.encode()).await?;
        Ok(UpdateCellResponse::decode(&payload)?)
    }
}
