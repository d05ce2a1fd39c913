//! Websocket push channel: server events in, room commands out.
//!
//! The channel is a thin transport. It deserializes frames and forwards them
//! on a broadcast sender; it never touches the stores. Room membership
//! commands are queued through an mpsc so callers never hold the socket.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures::{SinkExt, StreamExt};
use shared::protocol::{PushEvent, RoomCommand};
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const COMMAND_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug)]
pub struct PushChannelClient {
    events: broadcast::Sender<PushEvent>,
    commands: mpsc::Sender<RoomCommand>,
    connected: Arc<watch::Sender<bool>>,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

impl PushChannelClient {
    /// Dials `<server_url>/ws?user_id=<identity>` and starts the reader and
    /// writer tasks. Fails fast if the URL scheme is not http(s) or the
    /// handshake is refused.
    pub async fn connect(server_url: &str, identity: &str) -> Result<Self> {
        let ws_url = if server_url.starts_with("https://") {
            server_url.replacen("https://", "wss://", 1)
        } else if server_url.starts_with("http://") {
            server_url.replacen("http://", "ws://", 1)
        } else {
            return Err(anyhow!("server_url must start with http:// or https://"));
        };
        let ws_url = format!("{ws_url}/ws?user_id={identity}");
        let (ws_stream, _) = connect_async(&ws_url)
            .await
            .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (commands, mut command_rx) = mpsc::channel::<RoomCommand>(COMMAND_CHANNEL_CAPACITY);
        let (connected, _) = watch::channel(true);
        let connected = Arc::new(connected);

        let writer_task = tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                let text = match serde_json::to_string(&command) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!("failed to serialize room command: {err}");
                        continue;
                    }
                };
                if let Err(err) = ws_writer.send(Message::Text(text)).await {
                    warn!("websocket send failed: {err}");
                    break;
                }
            }
        });

        let event_tx = events.clone();
        let connected_tx = Arc::clone(&connected);
        let reader_task = tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<PushEvent>(&text) {
                        Ok(event) => {
                            let _ = event_tx.send(event);
                        }
                        Err(err) => {
                            warn!("dropping malformed push frame: {err}");
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!("push channel closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!("websocket receive failed: {err}");
                        break;
                    }
                }
            }
            let _ = connected_tx.send(false);
        });

        Ok(Self {
            events,
            commands,
            connected,
            reader_task,
            writer_task,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.events.subscribe()
    }

    pub fn watch_connected(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Queues a room membership command for the writer task.
    pub async fn send_command(&self, command: RoomCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("push channel is closed"))
    }

    /// Tears down both tasks. Safe to call on an already-dead channel.
    pub fn disconnect(&self) {
        self.reader_task.abort();
        self.writer_task.abort();
        let _ = self.connected.send(false);
    }
}

impl Drop for PushChannelClient {
    fn drop(&mut self) {
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

#[cfg(test)]
#[path = "tests/push_tests.rs"]
mod tests;
