use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::integration::init_tracing;
use crate::utils::TestRelay;

#[tokio::test]
async fn test_health_endpoint() {
    init_tracing();

    let relay = TestRelay::start().await.expect("Failed to start relay");
    let mut stream = TcpStream::connect(relay.addr)
        .await
        .expect("Failed to connect");

    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
    assert!(response.ends_with("ok"), "got: {response}");
}
