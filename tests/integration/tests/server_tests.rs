//! End-to-end tests for hosted servers
//!
//! Each test starts a hosted server on a free loopback port and talks to it
//! over real UDP sockets.
//!
//! Run with: cargo test -p integration-tests

use std::time::Duration;

use integration_tests::{TestServer, SILENCE};
use huddle_core::UserRole;
use huddle_server::broadcast::SchedulerConfig;
use huddle_server::presence::PresenceStatus;
use huddle_server::protocol::{LoadChannelDataRequest, RequestType, SendMessageRequest, Status};
use huddle_server::server::ServerStatus;

const PUSH_WAIT: Duration = Duration::from_secs(2);

fn status_of(server: &TestServer, username: &str) -> Option<PresenceStatus> {
    server
        .server
        .presence()
        .into_iter()
        .find(|user| user.username.as_str() == username)
        .map(|user| user.status)
}

// ============================================================================
// Join and channel listing
// ============================================================================

#[tokio::test]
async fn test_join_then_list_channels() {
    let server = TestServer::start().await.expect("server starts");
    server.channel("general").await.expect("channel");
    server.channel("random").await.expect("channel");

    let mut alice = server.client().await.expect("client");
    assert_eq!(alice.join("alice").await.expect("join"), Status::Success);
    assert_eq!(status_of(&server, "alice"), Some(PresenceStatus::Offline));

    let list = alice
        .channels(RequestType::LoadServerInformation)
        .await
        .expect("channel list");
    let names: Vec<&str> = list.0.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["general", "random"]);

    server.stop().await.expect("server stops");
}

#[tokio::test]
async fn test_second_join_from_same_host_fails() {
    let server = TestServer::start().await.expect("server starts");
    let mut client = server.client().await.expect("client");

    assert_eq!(client.join("alice").await.expect("join"), Status::Success);
    assert_eq!(client.join("mallory").await.expect("join"), Status::Fail);

    server.stop().await.expect("server stops");
}

#[tokio::test]
async fn test_create_channel_over_the_wire() {
    let server = TestServer::start().await.expect("server starts");
    let mut client = server.client().await.expect("client");
    client.join("alice").await.expect("join");

    assert_eq!(
        client.create_channel("lounge").await.expect("create"),
        Status::Success
    );
    let list = client
        .channels(RequestType::LoadAdminMenuData)
        .await
        .expect("channel list");
    assert_eq!(list.0.len(), 1);
    assert_eq!(list.0[0].name.as_str(), "lounge");

    server.stop().await.expect("server stops");
}

#[tokio::test]
async fn test_joined_data_reflects_role_changes() {
    let server = TestServer::start().await.expect("server starts");
    let mut client = server.client().await.expect("client");
    client.join("alice").await.expect("join");

    let data = client.joined_server_data().await.expect("request");
    assert_eq!(data.map(|d| d.admin), Some(false));

    assert!(server
        .server
        .set_user_role("alice", UserRole::Admin)
        .await
        .expect("role update"));
    let data = client.joined_server_data().await.expect("request");
    assert_eq!(data.map(|d| d.admin), Some(true));

    server.stop().await.expect("server stops");
}

// ============================================================================
// Messaging and broadcast
// ============================================================================

#[tokio::test]
async fn test_message_reaches_channel_viewers_only() {
    let server = TestServer::start().await.expect("server starts");
    let general = server.channel("general").await.expect("channel");
    let random = server.channel("random").await.expect("channel");

    let mut alice = server.client().await.expect("client");
    let mut bob = server.client().await.expect("client");
    let mut carol = server.client().await.expect("client");
    alice.join("alice").await.expect("join");
    bob.join("bob").await.expect("join");
    carol.join("carol").await.expect("join");

    assert!(alice.load_channel(general).await.expect("load").is_some());
    assert!(bob.load_channel(general).await.expect("load").is_some());
    assert!(carol.load_channel(random).await.expect("load").is_some());
    assert_eq!(status_of(&server, "alice"), Some(PresenceStatus::Online));

    alice.send_message(general, "hello").await.expect("send");

    let batch = bob
        .next_push(PUSH_WAIT)
        .await
        .expect("push")
        .expect("bob receives the batch");
    assert_eq!(batch.0.len(), 1);
    assert_eq!(batch.0[0].text, "hello");
    assert_eq!(batch.0[0].sender_username.as_str(), "alice");

    // The sender views the channel too
    let own = alice.next_push(PUSH_WAIT).await.expect("push");
    assert!(own.is_some());

    assert!(carol.next_push(SILENCE).await.expect("push").is_none());

    // History now includes the message
    let history = carol.load_channel(general).await.expect("load").expect("history");
    assert_eq!(history.0.len(), 1);
    assert_eq!(history.0[0].text, "hello");

    server.stop().await.expect("server stops");
}

#[tokio::test]
async fn test_send_message_is_never_answered() {
    let server = TestServer::start().await.expect("server starts");
    let general = server.channel("general").await.expect("channel");
    let mut alice = server.client().await.expect("client");
    alice.join("alice").await.expect("join");
    alice.load_channel(general).await.expect("load");

    alice
        .request_expecting_silence(
            RequestType::SendMessage,
            &SendMessageRequest {
                channel_id: general,
                text: "quiet".to_string(),
            },
        )
        .await
        .expect("no response");

    server.stop().await.expect("server stops");
}

#[tokio::test]
async fn test_unknown_sender_is_ignored() {
    let server = TestServer::start().await.expect("server starts");
    let general = server.channel("general").await.expect("channel");

    let mut viewer = server.client().await.expect("client");
    viewer.join("viewer").await.expect("join");
    viewer.load_channel(general).await.expect("load");

    let mut stranger = server.client().await.expect("client");
    stranger
        .request_expecting_silence(
            RequestType::LoadChannelData,
            &LoadChannelDataRequest { channel_id: general },
        )
        .await
        .expect("no history for strangers");
    stranger.send_message(general, "spam").await.expect("send");

    assert!(viewer.next_push(SILENCE).await.expect("push").is_none());
    let history = viewer.load_channel(general).await.expect("load").expect("history");
    assert!(history.0.is_empty());

    server.stop().await.expect("server stops");
}

#[tokio::test]
async fn test_malformed_datagram_does_not_stop_server() {
    let server = TestServer::start().await.expect("server starts");
    let mut client = server.client().await.expect("client");

    client
        .send_raw(bytes::Bytes::from_static(&[0xff, 0xff]))
        .await
        .expect("send");
    client
        .send_raw(bytes::Bytes::from_static(&[99, 0, 0, 0]))
        .await
        .expect("send");

    assert_eq!(client.join("alice").await.expect("join"), Status::Success);

    server.stop().await.expect("server stops");
}

#[tokio::test]
async fn test_history_larger_than_a_datagram_is_delivered() {
    let server = TestServer::start().await.expect("server starts");
    let general = server.channel("general").await.expect("channel");
    let mut alice = server.client().await.expect("client");
    alice.join("alice").await.expect("join");

    // About 93 KiB of history
    server
        .seed_history(general, "alice", 400, 200)
        .await
        .expect("seed history");

    let history = alice
        .load_channel(general)
        .await
        .expect("load")
        .expect("history arrives");
    assert_eq!(history.0.len(), 400);
    assert!(history.0.iter().all(|row| row.text.len() == 200));
    assert!(history.0.windows(2).all(|pair| pair[0].id < pair[1].id));

    server.stop().await.expect("server stops");
}

#[tokio::test]
async fn test_large_message_reaches_viewers() {
    let server = TestServer::start().await.expect("server starts");
    let general = server.channel("general").await.expect("channel");
    let mut alice = server.client().await.expect("client");
    let mut bob = server.client().await.expect("client");
    alice.join("alice").await.expect("join");
    bob.join("bob").await.expect("join");
    alice.load_channel(general).await.expect("load");
    bob.load_channel(general).await.expect("load");

    let text = "y".repeat(40 * 1024);
    alice.send_message(general, &text).await.expect("send");

    let batch = bob
        .next_push(PUSH_WAIT)
        .await
        .expect("push")
        .expect("bob receives the message");
    assert_eq!(batch.0.len(), 1);
    assert_eq!(batch.0[0].text, text);

    server.stop().await.expect("server stops");
}

// ============================================================================
// Heartbeats
// ============================================================================

#[tokio::test]
async fn test_silent_client_is_demoted() {
    let server = TestServer::start_with_scheduler(SchedulerConfig {
        tick: Duration::from_millis(20),
        heartbeat_stale_after: Duration::from_millis(100),
        heartbeat_timeout: Duration::from_millis(100),
    })
    .await
    .expect("server starts");
    let general = server.channel("general").await.expect("channel");

    let mut alive = server.client().await.expect("client");
    let mut silent = server.client().await.expect("client");
    silent.answer_heartbeats = false;
    alive.join("alive").await.expect("join");
    silent.join("silent").await.expect("join");
    alive.load_channel(general).await.expect("load");
    silent.load_channel(general).await.expect("load");

    // The live client keeps answering while the silent one times out
    alive.pump(Duration::from_millis(800)).await.expect("pump");

    assert_eq!(status_of(&server, "alive"), Some(PresenceStatus::Online));
    assert_eq!(status_of(&server, "silent"), Some(PresenceStatus::Offline));

    // Demoted users no longer receive pushes
    alive.send_message(general, "anyone?").await.expect("send");
    assert!(alive.next_push(PUSH_WAIT).await.expect("push").is_some());
    assert!(silent.next_push(SILENCE).await.expect("push").is_none());

    server.stop().await.expect("server stops");
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_restart_recognizes_known_host() {
    let server = TestServer::start().await.expect("server starts");
    let general = server.channel("general").await.expect("channel");

    let mut alice = server.client().await.expect("client");
    alice.join("alice").await.expect("join");
    alice.load_channel(general).await.expect("load");
    alice.send_message(general, "before restart").await.expect("send");
    alice.next_push(PUSH_WAIT).await.expect("push");

    server.stop().await.expect("server stops");
    assert_eq!(server.server.status().await, ServerStatus::Stopped);
    server.server.start().await.expect("server restarts");

    // Presence starts over, but the user is still known by address
    assert_eq!(status_of(&server, "alice"), Some(PresenceStatus::Offline));
    let history = alice.load_channel(general).await.expect("load").expect("history");
    assert_eq!(history.0.len(), 1);
    assert_eq!(history.0[0].text, "before restart");
    assert_eq!(status_of(&server, "alice"), Some(PresenceStatus::Online));

    server.stop().await.expect("server stops");
}
