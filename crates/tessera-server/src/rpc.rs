//! Binary RPC server
//!
//! Reads return `Status::NotFound` for an unknown table. Updates always answer
//! with an `UpdateCellResponse` envelope, so every update failure (including an
//! unknown table) arrives as `ok = false` plus the message.

use std::io;
use std::sync::Arc;
use tessera_core::wire::rpc::{
    decode_table_id, decode_value, encode_rows, encode_table_list, parse_header, read_request,
    rows_from_table, write_response, Command, ProtocolError, RpcSchema, Status,
    UpdateCellRequest, UpdateCellResponse, HEADER_LEN, MAX_PAYLOAD_SIZE,
};
use tessera_core::DataStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// RPC server over a shared store
pub struct RpcServer {
    store: Arc<DataStore>,
}

impl RpcServer {
    pub fn new(store: Arc<DataStore>) -> Self {
        Self { store }
    }

    /// Serve connections until the task is cancelled
    pub async fn serve(&self, listener: TcpListener) -> io::Result<()> {
        info!("RPC server listening on {}", listener.local_addr()?);

        loop {
            let (socket, peer_addr) = listener.accept().await?;
            let store = self.store.clone();

            tokio::spawn(async move {
                debug!("New connection from {}", peer_addr);
                if let Err(e) = handle_connection(socket, store).await {
                    warn!("Connection error from {}: {}", peer_addr, e);
                }
                debug!("Connection closed: {}", peer_addr);
            });
        }
    }
}

async fn handle_connection(
    mut socket: TcpStream,
    store: Arc<DataStore>,
) -> Result<(), ProtocolError> {
    // Disable Nagle's algorithm for lower latency
    socket.set_nodelay(true)?;

    let mut buf = vec![0u8; 64 * 1024];

    loop {
        let n = socket.read(&mut buf[..HEADER_LEN]).await?;
        if n == 0 {
            return Ok(());
        }
        if n < HEADER_LEN {
            socket.read_exact(&mut buf[n..HEADER_LEN]).await?;
        }

        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&buf[..HEADER_LEN]);
        let payload_len = match parse_header(&header) {
            Ok((_, len)) => len,
            Err(e) => {
                // Stream position is lost once a length is rejected
                let response = write_response(Status::Error, e.to_string().as_bytes());
                socket.write_all(&response).await?;
                return Err(e);
            }
        };

        if buf.len() < HEADER_LEN + payload_len {
            buf.resize(HEADER_LEN + payload_len, 0);
        }
        socket
            .read_exact(&mut buf[HEADER_LEN..HEADER_LEN + payload_len])
            .await?;

        let response = match process_request(&buf[..HEADER_LEN + payload_len], &store) {
            Ok(resp) => resp,
            Err(e) => {
                warn!("Rejected request: {}", e);
                write_response(Status::Error, e.to_string().as_bytes())
            }
        };

        socket.write_all(&response).await?;
    }
}

/// Handle one complete request frame and produce the response frame
pub fn process_request(data: &[u8], store: &DataStore) -> Result<Vec<u8>, ProtocolError> {
    dispatch(data, store, MAX_PAYLOAD_SIZE as usize)
}

/// Dispatch a request; any `Ok` payload longer than `limit` is answered with an
/// `Error` frame instead, since no client reads a frame past the limit.
fn dispatch(data: &[u8], store: &DataStore, limit: usize) -> Result<Vec<u8>, ProtocolError> {
    let (cmd, payload) = read_request(data)?;

    let encoded = match cmd {
        Command::Ping => b"PONG".to_vec(),
        Command::ListTables => encode_table_list(&store.list_tables()),
        Command::GetSchema => {
            let table_id = decode_table_id(payload)?;
            match store.table(&table_id) {
                Ok(table) => RpcSchema::from(&*table).encode(),
                Err(e) => return Ok(write_response(Status::NotFound, e.to_string().as_bytes())),
            }
        }
        Command::GetData => {
            let table_id = decode_table_id(payload)?;
            match store.table(&table_id) {
                Ok(table) => encode_rows(&rows_from_table(&table)),
                Err(e) => return Ok(write_response(Status::NotFound, e.to_string().as_bytes())),
            }
        }
        Command::UpdateCell => {
            let request = UpdateCellRequest::decode(payload)?;
            let result = store.update_cell_with(
                &request.table_id,
                &request.row_id,
                &request.column_id,
                |column| decode_value(&request.value, column),
            );
            let envelope = match result {
                Ok(()) => UpdateCellResponse::success(),
                Err(e) => UpdateCellResponse::failure(&e),
            };
            envelope.encode()
        }
    };

    if encoded.len() > limit {
        let message = format!(
            "Response too large: {} bytes (max {} bytes)",
            encoded.len(),
            limit
        );
        warn!("{:?}: {}", cmd, message);
        return Ok(write_response(Status::Error, message.as_bytes()));
    }
    Ok(write_response(Status::Ok, &encoded))
}
