use std::sync::Arc;
use std::time::Duration;

use futures::stream;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tungstenite::protocol::Message as WsMessage;

use super::message::{ChatRequest, JoinRequest, ServerMessage, render_topic_list};
use super::session::{Session, SessionState, Step};
use crate::connection::ConnectionHandle;
use crate::relay::{ChatMessage, Relay};
use crate::utils::ProtocolError;

type Frames = Vec<Result<WsMessage, tungstenite::Error>>;

fn text(frame: &str) -> Result<WsMessage, tungstenite::Error> {
    Ok(WsMessage::text(frame.to_string()))
}

fn drain(rx: &mut UnboundedReceiver<WsMessage>) -> Vec<String> {
    let mut out = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        out.push(frame.to_text().unwrap().to_string());
    }
    out
}

fn relay() -> Arc<Relay> {
    Arc::new(Relay::new(Duration::from_secs(30)))
}

#[test]
fn test_join_request_parse() {
    let req = JoinRequest::parse(r#"{"username":"alice","topic":"lobby"}"#).unwrap();
    assert_eq!(req.username, "alice");
    assert_eq!(req.topic, "lobby");
}

#[test]
fn test_join_request_rejects_bad_frames() {
    assert_eq!(
        JoinRequest::parse("not json"),
        Err(ProtocolError::MalformedJoin)
    );
    assert_eq!(
        JoinRequest::parse(r#"{"username":"alice"}"#),
        Err(ProtocolError::MissingJoinFields)
    );
    assert_eq!(
        JoinRequest::parse(r#"{"username":"","topic":"lobby"}"#),
        Err(ProtocolError::MissingJoinFields)
    );
    assert_eq!(
        JoinRequest::parse(r#"{"username":7,"topic":"lobby"}"#),
        Err(ProtocolError::MissingJoinFields)
    );
    assert_eq!(
        JoinRequest::parse(r#"["alice","lobby"]"#),
        Err(ProtocolError::MissingJoinFields)
    );
}

#[test]
fn test_chat_request_parse() {
    let req = ChatRequest::parse(r#"{"message":"hi","timestamp":1000}"#)
        .unwrap()
        .unwrap();
    assert_eq!(req.message, "hi");
    assert_eq!(req.timestamp, Some(1000));

    let req = ChatRequest::parse(r#"{"message":"hi"}"#).unwrap().unwrap();
    assert_eq!(req.timestamp, None);
}

#[test]
fn test_chat_request_empty_message_is_ignored() {
    assert_eq!(ChatRequest::parse(r#"{"message":""}"#), Ok(None));
    assert_eq!(ChatRequest::parse(r#"{"timestamp":5}"#), Ok(None));
    assert_eq!(ChatRequest::parse(r#"{"message":null}"#), Ok(None));
}

#[test]
fn test_chat_request_errors() {
    assert_eq!(ChatRequest::parse("{oops"), Err(ProtocolError::MalformedJson));
    assert_eq!(ChatRequest::parse("[1,2]"), Err(ProtocolError::NotAnObject));
    assert_eq!(
        ChatRequest::parse(r#"{"message":42}"#),
        Err(ProtocolError::InvalidField {
            field: "message",
            expected: "a string"
        })
    );
    assert_eq!(
        ChatRequest::parse(r#"{"message":"hi","timestamp":"noon"}"#),
        Err(ProtocolError::InvalidField {
            field: "timestamp",
            expected: "an integer"
        })
    );
}

#[test]
fn test_server_message_wire_shapes() {
    let msg = ChatMessage::new("alice", "hi", 1000);

    assert_eq!(
        serde_json::to_value(ServerMessage::delivered(&msg)).unwrap(),
        json!({ "status": "delivered", "message": "hi", "timestamp": 1000 })
    );
    assert_eq!(
        serde_json::to_value(&msg).unwrap(),
        json!({ "username": "alice", "message": "hi", "timestamp": 1000 })
    );
    assert_eq!(
        serde_json::to_value(ServerMessage::error(&ProtocolError::MalformedJson)).unwrap(),
        json!({ "error": "Invalid JSON" })
    );
    assert_eq!(
        serde_json::to_value(ServerMessage::renamed("alice#2")).unwrap(),
        json!({ "system": "Your username is now 'alice#2' (original was taken)" })
    );
}

#[test]
fn test_server_message_decodes_each_variant() {
    let chat: ServerMessage =
        serde_json::from_str(r#"{"username":"a","message":"m","timestamp":1}"#).unwrap();
    assert!(matches!(chat, ServerMessage::Chat { .. }));

    let ack: ServerMessage =
        serde_json::from_str(r#"{"status":"delivered","message":"m","timestamp":1}"#).unwrap();
    assert!(matches!(ack, ServerMessage::Delivered { .. }));

    let err: ServerMessage = serde_json::from_str(r#"{"error":"x"}"#).unwrap();
    assert!(matches!(err, ServerMessage::Error { .. }));
}

#[test]
fn test_render_topic_list() {
    assert_eq!(render_topic_list(&[]), "Active Topics:\nNo active topics");
    let topics = vec![("a".to_string(), 1), ("b".to_string(), 2)];
    assert_eq!(
        render_topic_list(&topics),
        "Active Topics:\na (1 users)\nb (2 users)"
    );
}

#[tokio::test]
async fn test_session_state_transitions() {
    let relay = relay();
    let (handle, _rx) = ConnectionHandle::channel();
    let mut session = Session::new(relay.clone(), handle);
    assert_eq!(session.state(), SessionState::Connecting);

    session.handshake_complete();
    assert_eq!(session.state(), SessionState::Joining);

    let mut frames = stream::iter(vec![text(r#"{"username":"alice","topic":"lobby"}"#)]);
    assert_eq!(session.step(&mut frames).await, Step::Ok);
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(session.username(), Some("alice"));
    assert_eq!(session.topic(), Some("lobby"));

    assert_eq!(session.step(&mut frames).await, Step::Disconnected);

    session.close();
    assert_eq!(session.state(), SessionState::Closed);
    assert!(!relay.registry().contains_topic("lobby"));
}

#[tokio::test]
async fn test_session_bad_join_never_joins() {
    let relay = relay();
    let (handle, mut rx) = ConnectionHandle::channel();
    let session = Session::new(relay.clone(), handle);

    let frames: Frames = vec![
        text(r#"{"username":"alice"}"#),
        text(r#"{"username":"alice","topic":"lobby"}"#),
    ];
    session.run(stream::iter(frames)).await;

    assert_eq!(
        drain(&mut rx),
        vec![r#"{"error":"Need username and topic!"}"#.to_string()]
    );
    assert!(relay.registry().list_topics().is_empty());
}

#[tokio::test]
async fn test_session_bad_chat_frame_is_recoverable() {
    let relay = relay();
    let (handle, mut rx) = ConnectionHandle::channel();
    let session = Session::new(relay.clone(), handle);

    let frames: Frames = vec![
        text(r#"{"username":"alice","topic":"lobby"}"#),
        text("{oops"),
        text(r#"{"message":""}"#),
        text(r#"{"message":"hi","timestamp":1000}"#),
    ];
    session.run(stream::iter(frames)).await;

    assert_eq!(
        drain(&mut rx),
        vec![
            r#"{"error":"Invalid JSON"}"#.to_string(),
            r#"{"status":"delivered","message":"hi","timestamp":1000}"#.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_session_rename_notice_and_broadcast() {
    let relay = relay();
    let (first, mut rx_first) = ConnectionHandle::channel();
    relay.registry().join("lobby", "alice", first);

    let (handle, mut rx) = ConnectionHandle::channel();
    let session = Session::new(relay.clone(), handle);
    let frames: Frames = vec![
        text(r#"{"username":"alice","topic":"lobby"}"#),
        text(r#"{"message":"hello"}"#),
    ];
    session.run(stream::iter(frames)).await;

    let replies = drain(&mut rx);
    assert_eq!(
        replies[0],
        r#"{"system":"Your username is now 'alice#2' (original was taken)"}"#
    );
    let ack: serde_json::Value = serde_json::from_str(&replies[1]).unwrap();
    assert_eq!(ack["status"], "delivered");
    assert!(ack["timestamp"].as_i64().unwrap() > 0);

    let received: serde_json::Value = serde_json::from_str(&drain(&mut rx_first)[0]).unwrap();
    assert_eq!(received["username"], "alice#2");
    assert_eq!(received["message"], "hello");

    // The renamed member left; the original stays.
    assert_eq!(relay.registry().list_topics(), vec![("lobby".to_string(), 1)]);
}

#[tokio::test]
async fn test_session_list_command() {
    let relay = relay();
    let (other, _rx_other) = ConnectionHandle::channel();
    relay.registry().join("a", "zed", other);

    let (handle, mut rx) = ConnectionHandle::channel();
    let session = Session::new(relay.clone(), handle);
    let frames: Frames = vec![
        text(r#"{"username":"alice","topic":"b"}"#),
        text("  /list \n"),
    ];
    session.run(stream::iter(frames)).await;

    assert_eq!(
        drain(&mut rx),
        vec!["Active Topics:\na (1 users)\nb (1 users)".to_string()]
    );
}

#[tokio::test]
async fn test_session_ignores_non_text_frames() {
    let relay = relay();
    let (handle, mut rx) = ConnectionHandle::channel();
    let mut session = Session::new(relay.clone(), handle);
    session.handshake_complete();

    let frames: Frames = vec![
        Ok(WsMessage::binary(vec![1u8, 2, 3])),
        Ok(WsMessage::Close(None)),
    ];
    let mut frames = stream::iter(frames);
    assert_eq!(session.step(&mut frames).await, Step::Ok);
    assert_eq!(session.state(), SessionState::Joining);
    assert_eq!(session.step(&mut frames).await, Step::Disconnected);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_pruned_session_cannot_speak_under_reused_name() {
    let relay = relay();
    let (handle, mut rx) = ConnectionHandle::channel();
    let mut session = Session::new(relay.clone(), handle);
    session.handshake_complete();

    let frames: Frames = vec![
        text(r#"{"username":"alice","topic":"lobby"}"#),
        text(r#"{"message":"ghost","timestamp":1}"#),
    ];
    let mut frames = stream::iter(frames);
    assert_eq!(session.step(&mut frames).await, Step::Ok);

    // Fanout drops the member, then a newcomer takes the freed name.
    assert!(relay.registry().leave("lobby", "alice"));
    let (successor, mut rx_successor) = ConnectionHandle::channel();
    assert_eq!(relay.registry().join("lobby", "alice", successor), "alice");

    assert_eq!(session.step(&mut frames).await, Step::Disconnected);
    assert!(rx_successor.try_recv().is_err());
    assert!(drain(&mut rx).is_empty());
    assert!(relay.registry().messages("lobby").is_empty());

    session.close();
    assert_eq!(relay.registry().member_count("lobby"), 1);
}
