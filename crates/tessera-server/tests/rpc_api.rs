//! Integration tests for the binary RPC surface over a real socket

use std::sync::Arc;
use tessera_client::{ClientError, RpcValue, TableClient};
use tessera_core::seed::demo_store;
use tessera_core::{ColumnType, DataStore};
use tessera_server::RpcServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Start a server on an ephemeral port and return its address
async fn start_server(store: Arc<DataStore>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let server = RpcServer::new(store);
        server.serve(listener).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_list_and_schema() {
    let addr = start_server(Arc::new(demo_store().unwrap())).await;
    let mut client = TableClient::connect(&addr).await.unwrap();

    assert_eq!(client.ping().await.unwrap(), "PONG");

    let tables = client.list_tables().await.unwrap();
    let ids: Vec<_> = tables.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["employees", "inventory"]);

    let schema = client.get_schema("employees").await.unwrap();
    assert_eq!(schema.primary_key, "id");
    assert_eq!(schema.columns.len(), 6);
    let salary = schema.columns.iter().find(|c| c.id == "salary").unwrap();
    assert_eq!(salary.column_type, ColumnType::Currency);
    assert!(salary.is_editable);
    assert!(!schema.columns[0].is_editable);
}

#[tokio::test]
async fn test_unknown_table_reads_are_not_found() {
    let addr = start_server(Arc::new(demo_store().unwrap())).await;
    let mut client = TableClient::connect(&addr).await.unwrap();

    let err = client.get_schema("ghost").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
    let err = client.get_data("ghost").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));

    // connection stays usable
    assert_eq!(client.ping().await.unwrap(), "PONG");
}

#[tokio::test]
async fn test_update_salary_and_primary_key() {
    let store = Arc::new(demo_store().unwrap());
    let addr = start_server(store.clone()).await;
    let mut client = TableClient::connect(&addr).await.unwrap();

    let response = client
        .update_cell("employees", "1", "salary", RpcValue::Int(600000))
        .await
        .unwrap();
    assert!(response.ok, "{}", response.error_message);

    let rows = client.get_data("employees").await.unwrap();
    let first = rows.iter().find(|r| r.id == "1").unwrap();
    assert_eq!(first.cells["salary"], RpcValue::Double(600000.0));

    let response = client
        .update_cell("employees", "1", "id", RpcValue::String("99".into()))
        .await
        .unwrap();
    assert!(!response.ok);
    assert_eq!(response.error_message, "Primary key column is read-only");

    let rows = client.get_data("employees").await.unwrap();
    assert!(rows.iter().any(|r| r.id == "1"));
    assert!(rows.iter().all(|r| r.id != "99"));
}

#[tokio::test]
async fn test_update_envelopes() {
    let addr = start_server(Arc::new(demo_store().unwrap())).await;
    let mut client = TableClient::connect(&addr).await.unwrap();

    let cases = [
        ("ghost", "1", "name", RpcValue::String("x".into()), "Table not found"),
        ("employees", "1", "ghost", RpcValue::Null, "Column not found"),
        ("employees", "77", "name", RpcValue::String("x".into()), "Row not found"),
        ("employees", "1", "name", RpcValue::Int(3), "Expected string value"),
        ("employees", "1", "salary", RpcValue::Unset, "Value is missing"),
        ("employees", "1", "pid", RpcValue::Null, "Column is read-only"),
    ];

    for (table, row, column, value, message) in cases {
        let response = client.update_cell(table, row, column, value).await.unwrap();
        assert!(!response.ok);
        assert_eq!(response.error_message, message);
    }
}

#[tokio::test]
async fn test_both_surfaces_share_one_store() {
    let store = Arc::new(demo_store().unwrap());
    let addr = start_server(store.clone()).await;
    let mut client = TableClient::connect(&addr).await.unwrap();

    client
        .update_cell("inventory", "GPU-NV-40", "qty", RpcValue::Double(7.0))
        .await
        .unwrap();

    let table = store.table("inventory").unwrap();
    assert_eq!(
        table.row("GPU-NV-40").unwrap().cell("qty"),
        &tessera_core::Value::Integer(7)
    );
}

#[tokio::test]
async fn test_concurrent_clients() {
    let store = Arc::new(demo_store().unwrap());
    let addr = start_server(store.clone()).await;

    let mut tasks = Vec::new();
    for row in ["1", "2", "3", "4"] {
        let addr = addr.clone();
        tasks.push(tokio::spawn(async move {
            let mut client = TableClient::connect(&addr).await.unwrap();
            for i in 0..50 {
                let response = client
                    .update_cell("employees", row, "salary", RpcValue::Int(i))
                    .await
                    .unwrap();
                assert!(response.ok);
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let table = store.table("employees").unwrap();
    for row in ["1", "2", "3", "4"] {
        assert_eq!(
            table.row(row).unwrap().cell("salary"),
            &tessera_core::Value::Real(49.0)
        );
    }
}

#[tokio::test]
async fn test_unknown_command_keeps_connection() {
    let addr = start_server(Arc::new(demo_store().unwrap())).await;
    let mut stream = TcpStream::connect(&addr).await.unwrap();

    stream.write_all(&[0x7F, 0, 0, 0, 0]).await.unwrap();
    let mut header = [0u8; 5];
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(header[0], 0x02);
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
    let mut message = vec![0u8; len];
    stream.read_exact(&mut message).await.unwrap();
    assert_eq!(message, b"Invalid command: 127");

    // Ping still answered on the same connection
    stream.write_all(&[0x01, 0, 0, 0, 0]).await.unwrap();
    stream.read_exact(&mut header).await.unwrap();
    assert_eq!(header[0], 0x00);
}
