//! End-to-end scenarios driven over real TCP sockets, wiring the listener,
//! subscription server, and dispatcher exactly as `followers_maze::run`
//! does but with OS-assigned ports so many tests can run concurrently.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use followers_maze::dispatcher::Dispatcher;
use followers_maze::listener::Listener;
use followers_maze::subscription::SubscriptionServer;

struct Harness {
    event_source_addr: std::net::SocketAddr,
    client_addr: std::net::SocketAddr,
}

async fn spawn_system(resequencer_type: &str, resequencer_capacity: usize) -> Harness {
    let (dispatch_tx, dispatch_rx) = mpsc::channel(64);
    let (subscription_tx, subscription_rx) = mpsc::channel(64);
    let (control_tx, control_rx) = mpsc::channel(64);

    let listener = Listener::bind(
        0,
        dispatch_tx,
        control_tx,
        resequencer_type.to_owned(),
        resequencer_capacity,
        0,
    )
    .await
    .unwrap();
    let event_source_addr = listener.local_addr().unwrap();

    let subscription_server = SubscriptionServer::bind(0, subscription_tx).await.unwrap();
    let client_addr = subscription_server.local_addr().unwrap();

    let dispatcher = Dispatcher::new(dispatch_rx, subscription_rx, control_rx);

    tokio::spawn(listener.serve());
    tokio::spawn(subscription_server.serve());
    tokio::spawn(dispatcher.run());

    Harness {
        event_source_addr,
        client_addr,
    }
}

async fn subscribe(h: &Harness, id: &str) -> TcpStream {
    let mut stream = TcpStream::connect(h.client_addr).await.unwrap();
    stream.write_all(format!("{id}\n").as_bytes()).await.unwrap();
    stream
}

async fn connect_event_source(h: &Harness) -> TcpStream {
    TcpStream::connect(h.event_source_addr).await.unwrap()
}

async fn expect_line(stream: &mut TcpStream, expected: &str) {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    tokio::time::timeout(Duration::from_secs(1), reader.read_line(&mut line))
        .await
        .expect("timed out waiting for delivery")
        .unwrap();
    assert_eq!(line, expected);
}

#[tokio::test]
async fn s1_broadcast_fan_out_over_real_sockets() {
    let h = spawn_system("stream", 100).await;
    let mut sub1 = subscribe(&h, "1").await;
    let mut sub2 = subscribe(&h, "2").await;
    // Let the subscription handshakes land before the event source writes.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut source = connect_event_source(&h).await;
    source.write_all(b"1|B\n").await.unwrap();

    expect_line(&mut sub1, "1|B\n").await;
    expect_line(&mut sub2, "1|B\n").await;
}

#[tokio::test]
async fn s2_follow_then_status_reaches_the_new_follower() {
    let h = spawn_system("stream", 100).await;
    let mut sub20 = subscribe(&h, "20").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut source = connect_event_source(&h).await;
    source.write_all(b"1|F|20|10\n").await.unwrap();
    expect_line(&mut sub20, "1|F|20|10\n").await;

    source.write_all(b"2|S|10\n").await.unwrap();
    expect_line(&mut sub20, "2|S|10\n").await;
}

#[tokio::test]
async fn s3_unfollow_removes_the_follower() {
    let h = spawn_system("stream", 100).await;
    let mut sub20 = subscribe(&h, "20").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut source = connect_event_source(&h).await;
    source.write_all(b"1|F|20|10\n").await.unwrap();
    expect_line(&mut sub20, "1|F|20|10\n").await;

    source.write_all(b"2|U|20|10\n").await.unwrap();
    source.write_all(b"3|S|10\n").await.unwrap();

    let mut buf = [0u8; 1];
    let result = tokio::time::timeout(Duration::from_millis(200), sub20.read(&mut buf)).await;
    assert!(result.is_err(), "no further delivery expected after unfollow");
}

#[tokio::test]
async fn s4_private_message() {
    let h = spawn_system("stream", 100).await;
    let mut sub7 = subscribe(&h, "7").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut source = connect_event_source(&h).await;
    source.write_all(b"1|P|3|7\n").await.unwrap();
    expect_line(&mut sub7, "1|P|3|7\n").await;
}

#[tokio::test]
async fn s5_out_of_order_stream_resequencing() {
    let h = spawn_system("stream", 100).await;
    let mut sub = subscribe(&h, "1").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut source = connect_event_source(&h).await;
    source.write_all(b"3|B\n1|B\n2|B\n").await.unwrap();

    expect_line(&mut sub, "1|B\n").await;
    expect_line(&mut sub, "2|B\n").await;
    expect_line(&mut sub, "3|B\n").await;
}

#[tokio::test]
async fn s6_batch_resequencer_flushes_on_source_disconnect() {
    let h = spawn_system("batch", 5).await;
    let mut sub = subscribe(&h, "1").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut source = connect_event_source(&h).await;
    source.write_all(b"3|B\n1|B\n4|B\n").await.unwrap();
    source.shutdown().await.unwrap();
    drop(source);

    expect_line(&mut sub, "1|B\n").await;
    expect_line(&mut sub, "3|B\n").await;
    expect_line(&mut sub, "4|B\n").await;
}

#[tokio::test]
async fn event_source_disconnect_resets_the_directory() {
    let h = spawn_system("stream", 100).await;
    let mut sub1 = subscribe(&h, "1").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut source = connect_event_source(&h).await;
    source.write_all(b"1|B\n").await.unwrap();
    expect_line(&mut sub1, "1|B\n").await;

    source.shutdown().await.unwrap();
    drop(source);

    let mut buf = [0u8; 1];
    let n = tokio::time::timeout(Duration::from_secs(1), sub1.read(&mut buf))
        .await
        .expect("timed out waiting for directory reset to disconnect subscriber")
        .unwrap();
    assert_eq!(n, 0, "subscriber socket should close when the event source drops");
}
