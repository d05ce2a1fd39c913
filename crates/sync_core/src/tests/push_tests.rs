use super::*;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    routing::get,
    Router,
};
use chrono::{TimeZone, Utc};
use shared::domain::{ConversationId, Direction};
use shared::protocol::MessagePayload;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::mpsc as tokio_mpsc, sync::Mutex};

#[derive(Clone)]
struct WsServerState {
    /// Frames the server sends once the client has spoken first. Waiting
    /// for a client frame keeps the tests deterministic: the subscriber is
    /// guaranteed to exist before any event is broadcast.
    outbound_frames: Vec<String>,
    /// Text frames received from the client are forwarded here.
    received: Arc<Mutex<Option<tokio_mpsc::UnboundedSender<String>>>>,
    /// Close the socket after sending the scripted frames.
    close_after_send: bool,
}

async fn ws_handler(
    State(state): State<WsServerState>,
    upgrade: WebSocketUpgrade,
) -> axum::response::Response {
    upgrade.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: WsServerState) {
    let mut frames_sent = state.outbound_frames.is_empty() && !state.close_after_send;
    while let Some(Ok(message)) = socket.recv().await {
        if let WsMessage::Text(text) = message {
            {
                let guard = state.received.lock().await;
                if let Some(tx) = guard.as_ref() {
                    let _ = tx.send(text);
                }
            }
            if !frames_sent {
                frames_sent = true;
                for frame in &state.outbound_frames {
                    if socket.send(WsMessage::Text(frame.clone())).await.is_err() {
                        return;
                    }
                }
                if state.close_after_send {
                    let _ = socket.send(WsMessage::Close(None)).await;
                    return;
                }
            }
        }
    }
}

async fn trigger(channel: &PushChannelClient) {
    channel
        .send_command(RoomCommand::ThreadJoin {
            conversation_id: ConversationId::from("trigger"),
        })
        .await
        .expect("trigger frame");
}

async fn spawn_ws_server(
    outbound_frames: Vec<String>,
    close_after_send: bool,
) -> (String, tokio_mpsc::UnboundedReceiver<String>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = tokio_mpsc::unbounded_channel();
    let state = WsServerState {
        outbound_frames,
        received: Arc::new(Mutex::new(Some(tx))),
        close_after_send,
    };
    let app = Router::new().route("/ws", get(ws_handler)).with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), rx)
}

fn live_message_frame(conversation_id: &str, message_id: &str) -> String {
    let event = PushEvent::MessageNew {
        conversation_id: ConversationId::from(conversation_id),
        message: MessagePayload {
            id: Some(shared::domain::MessageId::from(message_id)),
            conversation_id: ConversationId::from(conversation_id),
            text: Some("live text".to_string()),
            content_type: Some("text".to_string()),
            direction: Direction::Incoming,
            sent_at: Utc.timestamp_opt(1000, 0).unwrap(),
            delivery_status: None,
            attachments: Vec::new(),
        },
    };
    serde_json::to_string(&event).expect("frame")
}

#[tokio::test]
async fn connect_rejects_unknown_url_schemes() {
    let err = PushChannelClient::connect("ftp://example.test", "agent-1")
        .await
        .expect_err("scheme");
    assert!(err.to_string().contains("http"));
}

#[tokio::test]
async fn delivers_push_events_to_subscribers() {
    let (server_url, _rx) = spawn_ws_server(vec![live_message_frame("c1", "m1")], false).await;
    let channel = PushChannelClient::connect(&server_url, "agent-1")
        .await
        .expect("connect");
    let mut events = channel.subscribe();
    trigger(&channel).await;

    let event = events.recv().await.expect("event");
    match event {
        PushEvent::MessageNew {
            conversation_id,
            message,
        } => {
            assert_eq!(conversation_id, ConversationId::from("c1"));
            assert_eq!(message.text.as_deref(), Some("live text"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_frames_are_skipped_not_fatal() {
    let frames = vec![
        "{not json at all".to_string(),
        r#"{"type":"unknown:event","payload":{}}"#.to_string(),
        live_message_frame("c2", "m9"),
    ];
    let (server_url, _rx) = spawn_ws_server(frames, false).await;
    let channel = PushChannelClient::connect(&server_url, "agent-1")
        .await
        .expect("connect");
    let mut events = channel.subscribe();
    trigger(&channel).await;

    let event = events.recv().await.expect("event");
    assert!(matches!(event, PushEvent::MessageNew { conversation_id, .. }
        if conversation_id == ConversationId::from("c2")));
}

#[tokio::test]
async fn room_commands_reach_the_server_as_json_frames() {
    let (server_url, mut rx) = spawn_ws_server(Vec::new(), false).await;
    let channel = PushChannelClient::connect(&server_url, "agent-1")
        .await
        .expect("connect");

    channel
        .send_command(RoomCommand::ThreadJoin {
            conversation_id: ConversationId::from("c1"),
        })
        .await
        .expect("join");
    channel
        .send_command(RoomCommand::ThreadLeave {
            conversation_id: ConversationId::from("c1"),
        })
        .await
        .expect("leave");

    let first: RoomCommand =
        serde_json::from_str(&rx.recv().await.expect("first frame")).expect("parse");
    assert!(matches!(first, RoomCommand::ThreadJoin { conversation_id }
        if conversation_id == ConversationId::from("c1")));
    let second: RoomCommand =
        serde_json::from_str(&rx.recv().await.expect("second frame")).expect("parse");
    assert!(matches!(second, RoomCommand::ThreadLeave { .. }));
}

#[tokio::test]
async fn server_close_flips_the_connected_watch() {
    let (server_url, _rx) = spawn_ws_server(Vec::new(), true).await;
    let channel = PushChannelClient::connect(&server_url, "agent-1")
        .await
        .expect("connect");
    assert!(channel.is_connected());
    let mut connected = channel.watch_connected();
    trigger(&channel).await;

    connected.changed().await.expect("change");
    assert!(!*connected.borrow());
}
