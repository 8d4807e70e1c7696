// tests/integration/relay_test.rs

//! End-to-end tests over real sockets.

use super::test_helpers::{TestRelay, test_config};
use chatrelay::core::protocol::QuitMatch;
use std::time::Duration;

#[tokio::test]
async fn test_welcome_message_names_id_and_timeout() {
    let relay = TestRelay::start(test_config()).await;
    let client = relay.connect().await;

    let welcome = client.all_text();
    assert!(welcome.starts_with(&format!("Welcome user{}.\r\n", client.id)));
    assert!(welcome.contains("idle for 5 seconds"));
    assert!(welcome.contains("To quit, type 'quit'."));
    assert!(client.id.parse::<i32>().is_ok());

    relay.stop().await;
}

#[tokio::test]
async fn test_two_clients_sender_excluded() {
    let relay = TestRelay::start(test_config()).await;
    let mut a = relay.connect().await;
    let mut b = relay.connect().await;
    a.read_until(&format!("user{}: <arrives>\r\n", b.id)).await;

    a.send(b"hi\n").await;
    let line = b.read_until("\r\n").await;
    assert_eq!(line, format!("user{}: hi\r\n", a.id));

    // A marker from B proves A has seen everything routed before it.
    b.send(b"ping\n").await;
    a.read_until(&format!("user{}: ping\r\n", b.id)).await;
    assert!(!a.all_text().contains(&format!("user{}: hi", a.id)));

    let stats = relay.stop().await;
    assert_eq!(stats.connections_accepted, 2);
    assert_eq!(stats.lines_relayed, 2);
}

#[tokio::test]
async fn test_line_split_across_writes_is_delivered_once() {
    let relay = TestRelay::start(test_config()).await;
    let mut a = relay.connect().await;
    let mut b = relay.connect().await;
    a.read_until(&format!("user{}: <arrives>\r\n", b.id)).await;

    a.send(b"hel").await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    a.send(b"lo\n").await;

    let line = b.read_until("\r\n").await;
    assert_eq!(line, format!("user{}: hello\r\n", a.id));

    relay.stop().await;
}

#[tokio::test]
async fn test_arrival_is_broadcast_to_existing_clients() {
    let relay = TestRelay::start(test_config()).await;
    let mut a = relay.connect().await;
    let b = relay.connect().await;

    a.read_until(&format!("user{}: <arrives>\r\n", b.id)).await;

    relay.stop().await;
}

#[tokio::test]
async fn test_quit_closes_without_broadcasting_text() {
    let relay = TestRelay::start(test_config()).await;
    let mut a = relay.connect().await;
    let mut b = relay.connect().await;
    a.read_until(&format!("user{}: <arrives>\r\n", b.id)).await;

    a.send(b"  QUIT \r\n").await;
    assert!(a.wait_closed(Duration::from_secs(2)).await);

    b.read_until(&format!("user{}: <quits>\r\n", a.id)).await;
    assert!(!b.all_text().contains("QUIT"));

    let stats = relay.stop().await;
    assert_eq!(stats.quits, 1);
}

#[tokio::test]
async fn test_exact_quit_policy_relays_embedded_token() {
    let config = chatrelay::config::Config {
        quit_match: QuitMatch::Exact,
        ..test_config()
    };
    let relay = TestRelay::start(config).await;
    let mut a = relay.connect().await;
    let mut b = relay.connect().await;
    a.read_until(&format!("user{}: <arrives>\r\n", b.id)).await;

    a.send(b"quit worrying\n").await;
    b.read_until(&format!("user{}: quit worrying\r\n", a.id)).await;

    relay.stop().await;
}

#[tokio::test]
async fn test_idle_client_is_timed_out() {
    let config = chatrelay::config::Config {
        idle_timeout: Duration::from_millis(500),
        ..test_config()
    };
    let relay = TestRelay::start(config).await;
    let mut idle = relay.connect().await;

    assert!(idle.wait_closed(Duration::from_secs(3)).await);

    let stats = relay.stop().await;
    assert_eq!(stats.timeouts, 1);
}

#[tokio::test]
async fn test_partial_line_does_not_keep_client_alive() {
    let config = chatrelay::config::Config {
        idle_timeout: Duration::from_millis(600),
        ..test_config()
    };
    let relay = TestRelay::start(config).await;
    let mut client = relay.connect().await;

    for _ in 0..4 {
        client.send(b"x").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(client.wait_closed(Duration::from_secs(3)).await);

    relay.stop().await;
}

#[tokio::test]
async fn test_hangup_closes_connection() {
    let relay = TestRelay::start(test_config()).await;
    let a = relay.connect().await;
    drop(a);

    tokio::time::sleep(Duration::from_millis(300)).await;
    let stats = relay.stop().await;
    assert_eq!(stats.connections_closed(), 1);
}

#[tokio::test]
async fn test_reset_peer_does_not_disturb_others() {
    let relay = TestRelay::start(test_config()).await;
    let mut a = relay.connect().await;
    let mut b = relay.connect().await;
    let c = relay.connect().await;
    a.read_until(&format!("user{}: <arrives>\r\n", c.id)).await;
    b.read_until(&format!("user{}: <arrives>\r\n", c.id)).await;

    let gone = c.id.clone();
    c.reset();
    tokio::time::sleep(Duration::from_millis(200)).await;

    a.send(b"anyone there?\n").await;
    let line = b.read_until("\r\n").await;
    assert_eq!(line, format!("user{}: anyone there?\r\n", a.id));

    b.send(b"yes\n").await;
    a.read_until(&format!("user{}: yes\r\n", b.id)).await;
    assert!(!a.all_text().contains(&format!("user{gone}: anyone")));

    let stats = relay.stop().await;
    assert_eq!(stats.connections_closed(), 1);
}

#[tokio::test]
async fn test_empty_line_probes_sender() {
    let relay = TestRelay::start(test_config()).await;
    let mut a = relay.connect().await;
    let mut b = relay.connect().await;
    a.read_until(&format!("user{}: <arrives>\r\n", b.id)).await;

    a.send(b"\n").await;
    a.read_until("\0").await;

    b.send(b"after\n").await;
    a.read_until(&format!("user{}: after\r\n", b.id)).await;
    assert!(!b.all_text().contains(&format!("user{}: \r\n", a.id)));

    relay.stop().await;
}
