use std::net::SocketAddr;

use serial_test::serial;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::{sleep, Duration};

use redlite::config::Settings;
use redlite::server;

async fn start_server() -> SocketAddr {
    let settings = Settings::new("/tmp".to_string(), "dump.rdb".to_string());
    let (ready_tx, ready_rx) = oneshot::channel();

    tokio::spawn(server::run_with_signal(0, settings, Some(ready_tx)));

    ready_rx.await.unwrap()
}

async fn connect() -> TcpStream {
    let addr = start_server().await;
    TcpStream::connect(addr).await.unwrap()
}

/// Writes a request and asserts the byte-exact reply.
async fn send_expect(stream: &mut TcpStream, request: &[u8], expected: &[u8]) {
    stream.write_all(request).await.unwrap();

    let mut reply = vec![0u8; expected.len()];
    stream.read_exact(&mut reply).await.unwrap();

    assert_eq!(
        reply,
        expected,
        "expected {:?}, got {:?}",
        String::from_utf8_lossy(expected),
        String::from_utf8_lossy(&reply)
    );
}

#[tokio::test]
async fn test_ping() {
    let mut stream = connect().await;

    send_expect(&mut stream, b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await;
}

#[tokio::test]
async fn test_inline_ping() {
    let mut stream = connect().await;

    send_expect(&mut stream, b"PING\r\n", b"+PONG\r\n").await;
    // Case-insensitive, and the connection keeps serving afterwards.
    send_expect(&mut stream, b"ping\r\n", b"+PONG\r\n").await;
}

#[tokio::test]
async fn test_echo() {
    let mut stream = connect().await;

    send_expect(
        &mut stream,
        b"*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n",
        b"$3\r\nhey\r\n",
    )
    .await;
}

#[tokio::test]
async fn test_set_then_get() {
    let mut stream = connect().await;

    send_expect(
        &mut stream,
        b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n",
        b"+OK\r\n",
    )
    .await;
    send_expect(
        &mut stream,
        b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n",
        b"$3\r\nbar\r\n",
    )
    .await;
}

#[tokio::test]
async fn test_get_missing_key() {
    let mut stream = connect().await;

    send_expect(&mut stream, b"*2\r\n$3\r\nGET\r\n$4\r\nnope\r\n", b"$-1\r\n").await;
}

#[tokio::test]
async fn test_set_overwrites() {
    let mut stream = connect().await;

    send_expect(
        &mut stream,
        b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$2\r\nv1\r\n",
        b"+OK\r\n",
    )
    .await;
    send_expect(
        &mut stream,
        b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$2\r\nv2\r\n",
        b"+OK\r\n",
    )
    .await;
    send_expect(&mut stream, b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n", b"$2\r\nv2\r\n").await;
}

#[tokio::test]
#[serial]
async fn test_set_with_px_expiry() {
    let mut stream = connect().await;

    send_expect(
        &mut stream,
        b"*5\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n$2\r\nPX\r\n$3\r\n100\r\n",
        b"+OK\r\n",
    )
    .await;

    sleep(Duration::from_millis(200)).await;

    send_expect(&mut stream, b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n", b"$-1\r\n").await;

    // The entry must not resurface later.
    sleep(Duration::from_millis(100)).await;
    send_expect(&mut stream, b"*2\r\n$3\r\nGET\r\n$3\r\nfoo\r\n", b"$-1\r\n").await;
}

#[tokio::test]
async fn test_set_with_non_integer_px_keeps_connection_open() {
    let mut stream = connect().await;

    send_expect(
        &mut stream,
        b"*5\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n$2\r\nPX\r\n$4\r\nsoon\r\n",
        b"-ERR invalid argument for 'SET': PX\r\n",
    )
    .await;
    send_expect(&mut stream, b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await;
}

#[tokio::test]
async fn test_config_get() {
    let mut stream = connect().await;

    send_expect(
        &mut stream,
        b"*3\r\n$6\r\nCONFIG\r\n$3\r\nGET\r\n$3\r\ndir\r\n",
        b"*2\r\n$3\r\ndir\r\n$4\r\n/tmp\r\n",
    )
    .await;
    send_expect(
        &mut stream,
        b"*3\r\n$6\r\nCONFIG\r\n$3\r\nGET\r\n$10\r\ndbfilename\r\n",
        b"*2\r\n$10\r\ndbfilename\r\n$8\r\ndump.rdb\r\n",
    )
    .await;
}

#[tokio::test]
async fn test_unknown_command_keeps_connection_open() {
    let mut stream = connect().await;

    send_expect(
        &mut stream,
        b"*1\r\n$8\r\nFLUSHALL\r\n",
        b"-ERR unknown command 'flushall'\r\n",
    )
    .await;
    send_expect(&mut stream, b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await;
}

#[tokio::test]
async fn test_error_reply_for_verb_with_control_bytes_stays_framed() {
    let mut stream = connect().await;

    // The unknown verb carries an embedded CRLF; the error reply must stay a
    // single line frame so the pipelined PING's reply is not misframed.
    send_expect(
        &mut stream,
        b"*1\r\n$6\r\nAB\r\nCD\r\n*1\r\n$4\r\nPING\r\n",
        b"-ERR unknown command 'ab  cd'\r\n+PONG\r\n",
    )
    .await;
}

#[tokio::test]
async fn test_oversized_array_count_closes_connection_without_panic() {
    let addr = start_server().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"*9223372036854775807\r\n").await.unwrap();

    // Treated as a protocol error: the connection closes without allocating.
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    assert!(buf.is_empty());

    // The listener is unaffected and keeps serving new connections.
    let mut stream = TcpStream::connect(addr).await.unwrap();
    send_expect(&mut stream, b"*1\r\n$4\r\nPING\r\n", b"+PONG\r\n").await;
}

#[tokio::test]
async fn test_pipelined_commands_replied_in_order() {
    let mut stream = connect().await;

    send_expect(
        &mut stream,
        b"*1\r\n$4\r\nPING\r\n*2\r\n$4\r\nECHO\r\n$3\r\nhey\r\n*1\r\n$4\r\nPING\r\n",
        b"+PONG\r\n$3\r\nhey\r\n+PONG\r\n",
    )
    .await;
}

#[tokio::test]
async fn test_malformed_length_closes_connection() {
    let mut stream = connect().await;

    stream.write_all(b"*2\r\n$abc\r\nxx\r\n").await.unwrap();

    // The server gives up on the connection without crashing the process.
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    assert!(buf.is_empty());
}

#[tokio::test]
#[serial]
async fn test_concurrent_sets_lose_nothing() {
    let addr = start_server().await;

    let mut tasks = Vec::new();
    for i in 0..8 {
        tasks.push(tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let key = format!("key{}", i);
            let value = format!("value{}", i);

            let request = format!(
                "*3\r\n$3\r\nSET\r\n${}\r\n{}\r\n${}\r\n{}\r\n",
                key.len(),
                key,
                value.len(),
                value
            );
            send_expect(&mut stream, request.as_bytes(), b"+OK\r\n").await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let mut stream = TcpStream::connect(addr).await.unwrap();
    for i in 0..8 {
        let key = format!("key{}", i);
        let value = format!("value{}", i);

        let request = format!("*2\r\n$3\r\nGET\r\n${}\r\n{}\r\n", key.len(), key);
        let expected = format!("${}\r\n{}\r\n", value.len(), value);
        send_expect(&mut stream, request.as_bytes(), expected.as_bytes()).await;
    }
}
