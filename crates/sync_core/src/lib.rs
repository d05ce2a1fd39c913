//! Client-side synchronization engine for a multi-platform message inbox.
//!
//! REST is the source of truth for history; a websocket push channel layers
//! live updates on top. The engine owns the conversation list, the per-thread
//! timelines and the optimistic outbox, and emits coarse change events so a
//! frontend can re-render whatever store was touched.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use shared::{
    domain::{ConversationId, DeliveryStatus, Direction, MessageId},
    error::{ApiError, ApiException},
    protocol::{
        MarkReadRequest, MessagePage, MessagePayload, PushEvent, RoomCommand, SendMessageRequest,
        SendMessageResponse, ThreadListResponse,
    },
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

pub mod config;
pub mod conversations;
pub mod error;
pub mod outbox;
pub mod pager;
pub mod push;
pub mod timeline;

pub use crate::config::{load_settings, Settings};
pub use crate::conversations::{Conversation, ConversationFilter, SortOrder};
pub use crate::error::{InvalidCursorError, SyncError};
pub use crate::pager::{ScrollAnchor, ScrollMetrics};
pub use crate::timeline::{LoadPhase, Message};

use crate::conversations::ConversationStore;
use crate::outbox::Outbox;
use crate::pager::ScrollAnchoredPager;
use crate::push::PushChannelClient;
use crate::timeline::TimelineStore;

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Coarse change notifications for the frontend. Payloads carry ids, not
/// data; consumers read the stores back through the client.
#[derive(Debug, Clone)]
pub enum InboxEvent {
    ConversationsUpdated,
    TimelineUpdated {
        conversation_id: ConversationId,
    },
    ConnectionChanged {
        connected: bool,
    },
    MessageFailed {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
    Error(String),
}

struct InboxState {
    server_url: Option<String>,
    identity: Option<String>,
    active_conversation: Option<ConversationId>,
    conversations: ConversationStore,
    timelines: TimelineStore,
    outbox: Outbox,
}

pub struct InboxClient {
    http: Client,
    settings: Settings,
    pager: ScrollAnchoredPager,
    inner: Mutex<InboxState>,
    push: Mutex<Option<PushChannelClient>>,
    pump_task: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<InboxEvent>,
}

impl InboxClient {
    pub fn new(settings: Settings) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let pager = ScrollAnchoredPager::new(settings.near_top_threshold);
        Arc::new(Self {
            http: Client::new(),
            settings,
            pager,
            inner: Mutex::new(InboxState {
                server_url: None,
                identity: None,
                active_conversation: None,
                conversations: ConversationStore::default(),
                timelines: TimelineStore::default(),
                outbox: Outbox::default(),
            }),
            push: Mutex::new(None),
            pump_task: Mutex::new(None),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<InboxEvent> {
        self.events.subscribe()
    }

    /// Opens a session: remembers the server, dials the push channel and
    /// takes the first conversation snapshot. A failed push dial rolls the
    /// session back so a retry starts clean.
    pub async fn login(self: &Arc<Self>, server_url: &str, identity: &str) -> Result<()> {
        {
            let mut guard = self.inner.lock().await;
            guard.server_url = Some(server_url.to_string());
            guard.identity = Some(identity.to_string());
        }

        let channel = match PushChannelClient::connect(server_url, identity).await {
            Ok(channel) => channel,
            Err(err) => {
                let mut guard = self.inner.lock().await;
                guard.server_url = None;
                guard.identity = None;
                return Err(SyncError::Transport(err.to_string()).into());
            }
        };

        self.install_push_channel(channel).await;
        self.refresh_threads().await?;
        Ok(())
    }

    pub async fn logout(&self) {
        if let Some(channel) = self.push.lock().await.take() {
            channel.disconnect();
        }
        if let Some(task) = self.pump_task.lock().await.take() {
            task.abort();
        }
        let mut guard = self.inner.lock().await;
        guard.server_url = None;
        guard.identity = None;
        guard.active_conversation = None;
        guard.conversations = ConversationStore::default();
        guard.timelines = TimelineStore::default();
        guard.outbox = Outbox::default();
    }

    /// Re-dials the push channel after a drop and re-enters the active
    /// room. The server does not restore room membership on its own, and no
    /// events are replayed, so a snapshot refresh closes the gap.
    pub async fn reconnect_push(self: &Arc<Self>) -> Result<()> {
        let (server_url, identity) = self.session().await?;
        let channel = PushChannelClient::connect(&server_url, &identity)
            .await
            .map_err(|err| SyncError::Transport(err.to_string()))?;
        let active = { self.inner.lock().await.active_conversation.clone() };
        if let Some(conversation_id) = active {
            if let Err(err) = channel
                .send_command(RoomCommand::ThreadJoin { conversation_id })
                .await
            {
                warn!("failed to rejoin active room after reconnect: {err}");
            }
        }
        self.install_push_channel(channel).await;
        self.refresh_threads().await?;
        Ok(())
    }

    async fn install_push_channel(self: &Arc<Self>, channel: PushChannelClient) {
        let mut push_events = channel.subscribe();
        let mut connected_rx = channel.watch_connected();

        if let Some(previous) = self.push.lock().await.replace(channel) {
            previous.disconnect();
        }
        if let Some(task) = self.pump_task.lock().await.take() {
            task.abort();
        }

        let _ = self.events.send(InboxEvent::ConnectionChanged { connected: true });

        let client = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = push_events.recv() => match event {
                        Ok(event) => client.apply_push_event(event).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "push event pump lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    changed = connected_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let connected = *connected_rx.borrow();
                        let _ = client
                            .events
                            .send(InboxEvent::ConnectionChanged { connected });
                        if !connected {
                            break;
                        }
                    }
                }
            }
        });
        *self.pump_task.lock().await = Some(task);
    }

    async fn session(&self) -> Result<(String, String)> {
        let guard = self.inner.lock().await;
        let server_url = guard
            .server_url
            .clone()
            .ok_or_else(|| anyhow!("not logged in: missing server_url"))?;
        let identity = guard
            .identity
            .clone()
            .ok_or_else(|| anyhow!("not logged in: missing identity"))?;
        Ok((server_url, identity))
    }

    /// Fetches the conversation snapshot and merges it into the store.
    /// Volatile push-driven fields of known rows survive the merge.
    pub async fn refresh_threads(&self) -> Result<()> {
        let (server_url, _) = self.session().await?;
        let response = self
            .http
            .get(format!("{server_url}/threads"))
            .query(&[("status", "open"), ("page", "1")])
            .query(&[("page_size", self.settings.thread_page_size)])
            .send()
            .await
            .map_err(|err| SyncError::Fetch {
                context: "thread snapshot".to_string(),
                source: err.into(),
            })?;
        let response: ThreadListResponse = require_success(response)
            .await
            .map_err(|source| SyncError::Fetch {
                context: "thread snapshot".to_string(),
                source,
            })?
            .json()
            .await
            .map_err(|err| SyncError::Fetch {
                context: "thread snapshot body".to_string(),
                source: err.into(),
            })?;

        let mut guard = self.inner.lock().await;
        guard.conversations.merge_snapshot(response.items);
        drop(guard);
        let _ = self.events.send(InboxEvent::ConversationsUpdated);
        Ok(())
    }

    /// Filtered, sorted copy of the conversation list.
    pub async fn conversations(
        &self,
        filter: &ConversationFilter,
        order: SortOrder,
    ) -> Vec<Conversation> {
        self.inner.lock().await.conversations.project(filter, order)
    }

    pub async fn conversation(&self, conversation_id: &ConversationId) -> Option<Conversation> {
        self.inner
            .lock()
            .await
            .conversations
            .get(conversation_id)
            .cloned()
    }

    /// Chronological copy of a thread's loaded messages.
    pub async fn timeline_messages(&self, conversation_id: &ConversationId) -> Vec<Message> {
        self.inner
            .lock()
            .await
            .timelines
            .get(conversation_id)
            .map(|t| t.messages().to_vec())
            .unwrap_or_default()
    }

    pub async fn timeline_has_more(&self, conversation_id: &ConversationId) -> bool {
        self.inner
            .lock()
            .await
            .timelines
            .get(conversation_id)
            .is_some_and(|t| t.has_more())
    }

    /// Switches the active thread. Exactly one room is subscribed at a
    /// time: the previous room is left before the next one is joined, and
    /// only the new thread keeps a redelivery dedup window. Activation
    /// optimistically zeroes the
    /// unread counter and posts the read marker in the background; a marker
    /// failure is reported but never blocks the switch.
    pub async fn set_active_conversation(
        self: &Arc<Self>,
        next: Option<ConversationId>,
    ) -> Result<()> {
        let (previous, needs_initial, unread_cleared) = {
            let mut guard = self.inner.lock().await;
            let previous = guard.active_conversation.clone();
            if previous == next {
                return Ok(());
            }
            guard.active_conversation = next.clone();
            guard.conversations.retain_fingerprints(next.as_ref());
            let mut needs_initial = false;
            let mut unread_cleared = false;
            if let Some(cid) = &next {
                needs_initial = guard
                    .timelines
                    .get(cid)
                    .map_or(true, |t| t.phase() == LoadPhase::Empty);
                unread_cleared = guard.conversations.reset_unread(cid);
            }
            (previous, needs_initial, unread_cleared)
        };

        if unread_cleared {
            let _ = self.events.send(InboxEvent::ConversationsUpdated);
        }

        {
            let push = self.push.lock().await;
            if let Some(channel) = push.as_ref() {
                if let Some(conversation_id) = previous {
                    if let Err(err) = channel
                        .send_command(RoomCommand::ThreadLeave { conversation_id })
                        .await
                    {
                        warn!("failed to leave room: {err}");
                    }
                }
                if let Some(conversation_id) = next.clone() {
                    if let Err(err) = channel
                        .send_command(RoomCommand::ThreadJoin { conversation_id })
                        .await
                    {
                        warn!("failed to join room: {err}");
                    }
                }
            }
        }

        let Some(conversation_id) = next else {
            return Ok(());
        };

        self.spawn_mark_read(conversation_id.clone());

        if needs_initial {
            self.load_initial(&conversation_id).await?;
        }
        Ok(())
    }

    fn spawn_mark_read(self: &Arc<Self>, conversation_id: ConversationId) {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = client.post_mark_read(&conversation_id).await {
                let _ = client.events.send(InboxEvent::Error(format!(
                    "failed to mark conversation {conversation_id} read: {err}"
                )));
            }
        });
    }

    async fn post_mark_read(&self, conversation_id: &ConversationId) -> Result<()> {
        let (server_url, _) = self.session().await?;
        let response = self
            .http
            .post(format!("{server_url}/conversations/{conversation_id}/mark-read"))
            .json(&MarkReadRequest {
                send_mark_seen: true,
            })
            .send()
            .await?;
        require_success(response).await?;
        Ok(())
    }

    /// Loads the newest page of a thread. The result lands in the timeline
    /// keyed by thread id, so a response that arrives after the user has
    /// moved on still updates the right thread.
    pub async fn load_initial(&self, conversation_id: &ConversationId) -> Result<()> {
        {
            let mut guard = self.inner.lock().await;
            guard.timelines.entry(conversation_id).begin_initial_load();
        }

        let page = match self.fetch_message_page(conversation_id, None).await {
            Ok(page) => page,
            Err(err) => {
                let mut guard = self.inner.lock().await;
                if let Some(timeline) = guard.timelines.get_mut(conversation_id) {
                    if timeline.phase() == LoadPhase::Loading {
                        timeline.reset_to_empty();
                    }
                }
                return Err(err);
            }
        };

        let mut guard = self.inner.lock().await;
        guard
            .timelines
            .entry(conversation_id)
            .apply_initial_page(page, self.settings.message_page_size);
        drop(guard);
        let _ = self.events.send(InboxEvent::TimelineUpdated {
            conversation_id: conversation_id.clone(),
        });
        Ok(())
    }

    /// Loads one page of older history. Cursor misuse (no cursor, already
    /// in flight, history exhausted) is a contract violation that is logged
    /// and swallowed; only transport failures surface to the caller.
    pub async fn load_older(&self, conversation_id: &ConversationId) -> Result<()> {
        let cursor = {
            let mut guard = self.inner.lock().await;
            match guard.timelines.entry(conversation_id).begin_older_load() {
                Ok(cursor) => cursor,
                Err(err) => {
                    warn!(conversation_id = %conversation_id, "backward load rejected: {err}");
                    return Ok(());
                }
            }
        };

        let page = match self.fetch_message_page(conversation_id, Some(&cursor)).await {
            Ok(page) => page,
            Err(err) => {
                let mut guard = self.inner.lock().await;
                if let Some(timeline) = guard.timelines.get_mut(conversation_id) {
                    timeline.abort_older_load();
                }
                return Err(err);
            }
        };

        let mut guard = self.inner.lock().await;
        guard
            .timelines
            .entry(conversation_id)
            .apply_older_page(page);
        drop(guard);
        let _ = self.events.send(InboxEvent::TimelineUpdated {
            conversation_id: conversation_id.clone(),
        });
        Ok(())
    }

    async fn fetch_message_page(
        &self,
        conversation_id: &ConversationId,
        before_id: Option<&MessageId>,
    ) -> Result<MessagePage> {
        let (server_url, _) = self.session().await?;
        let mut request = self
            .http
            .get(format!("{server_url}/threads/{conversation_id}/messages"))
            .query(&[("limit", self.settings.message_page_size)]);
        if let Some(before_id) = before_id {
            request = request.query(&[("before_id", before_id.as_str())]);
        }
        let response = request.send().await.map_err(|err| SyncError::Fetch {
            context: format!("messages for {conversation_id}"),
            source: err.into(),
        })?;
        let page = require_success(response)
            .await
            .map_err(|source| SyncError::Fetch {
                context: format!("messages for {conversation_id}"),
                source,
            })?
            .json()
            .await
            .map_err(|err| SyncError::Fetch {
                context: format!("message page body for {conversation_id}"),
                source: err.into(),
            })?;
        Ok(page)
    }

    /// Viewport scroll handler. When the geometry says the user is near
    /// the top, an anchor is captured, a backward page is fetched and the
    /// anchor is returned so the caller can restore the scroll position
    /// after the prepend. Returns `None` when no fetch was warranted.
    pub async fn handle_scroll(
        &self,
        conversation_id: &ConversationId,
        metrics: ScrollMetrics,
    ) -> Result<Option<ScrollAnchor>> {
        let triggered = {
            let guard = self.inner.lock().await;
            let (in_flight, has_more) = guard
                .timelines
                .get(conversation_id)
                .map(|t| (t.is_loading_older(), t.has_more()))
                .unwrap_or((false, false));
            self.pager.should_trigger(metrics, in_flight, has_more)
        };
        if !triggered {
            return Ok(None);
        }
        let anchor = ScrollAnchor::capture(metrics);
        self.load_older(conversation_id).await?;
        Ok(Some(anchor))
    }

    /// Optimistic send: the message appears immediately with a temporary id
    /// and `queued` status, then a single submission attempt runs. On
    /// success the temporary id is reconciled to the server id exactly
    /// once; on failure the message flips to `failed` and stays retryable.
    pub async fn send_message(
        self: &Arc<Self>,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<MessageId> {
        let temp_id = MessageId::temporary();
        {
            let mut guard = self.inner.lock().await;
            guard.timelines.entry(conversation_id).push_outgoing(
                temp_id.clone(),
                text.to_string(),
                Utc::now(),
            );
            guard
                .outbox
                .register(temp_id.clone(), conversation_id.clone(), text.to_string());
            let active = guard.active_conversation.clone();
            guard.conversations.apply_message_patch(
                conversation_id,
                &outgoing_preview(conversation_id, text),
                active.as_ref(),
            );
        }
        let _ = self.events.send(InboxEvent::TimelineUpdated {
            conversation_id: conversation_id.clone(),
        });
        let _ = self.events.send(InboxEvent::ConversationsUpdated);

        self.dispatch_send(&temp_id).await?;
        Ok(temp_id)
    }

    /// Re-submits a failed message in place, with its original text. The
    /// message id does not change until the server acknowledges it.
    pub async fn retry_message(self: &Arc<Self>, message_id: &MessageId) -> Result<()> {
        let conversation_id = {
            let mut guard = self.inner.lock().await;
            if !guard.outbox.is_pending(message_id) {
                return Err(anyhow!("message {message_id} is not retryable"));
            }
            let conversation_id = guard
                .timelines
                .find_conversation(message_id)
                .cloned()
                .ok_or_else(|| anyhow!("message {message_id} is not in any timeline"))?;
            let requeued = guard
                .timelines
                .get_mut(&conversation_id)
                .is_some_and(|t| t.mark_queued(message_id));
            if !requeued {
                return Err(anyhow!("message {message_id} is not in a failed state"));
            }
            conversation_id
        };
        let _ = self.events.send(InboxEvent::TimelineUpdated {
            conversation_id: conversation_id.clone(),
        });

        self.dispatch_send(message_id).await
    }

    /// Single submission path for first attempts and retries. The outbox
    /// in-flight flag guarantees one attempt per message at a time.
    async fn dispatch_send(&self, message_id: &MessageId) -> Result<()> {
        let (conversation_id, body) = {
            let mut guard = self.inner.lock().await;
            guard
                .outbox
                .begin_attempt(message_id)
                .map_err(|err| anyhow!(err))?
        };

        let result = self.post_send_message(&conversation_id, &body).await;

        match result {
            Ok(response) => {
                let mut guard = self.inner.lock().await;
                let sent_at = response.sent_at;
                if let Some(timeline) = guard.timelines.get_mut(&conversation_id) {
                    timeline.reconcile_sent(message_id, response.id, sent_at);
                }
                guard.outbox.complete(message_id);
                let active = guard.active_conversation.clone();
                let mut preview = outgoing_preview(&conversation_id, &body);
                preview.sent_at = sent_at;
                preview.delivery_status = Some(DeliveryStatus::Sent);
                guard
                    .conversations
                    .apply_message_patch(&conversation_id, &preview, active.as_ref());
                drop(guard);
                let _ = self.events.send(InboxEvent::TimelineUpdated {
                    conversation_id: conversation_id.clone(),
                });
                let _ = self.events.send(InboxEvent::ConversationsUpdated);
                Ok(())
            }
            Err(err) => {
                let mut guard = self.inner.lock().await;
                if let Some(timeline) = guard.timelines.get_mut(&conversation_id) {
                    timeline.mark_failed(message_id);
                }
                guard.outbox.fail(message_id);
                let active = guard.active_conversation.clone();
                let mut preview = outgoing_preview(&conversation_id, &body);
                preview.delivery_status = Some(DeliveryStatus::Failed);
                guard
                    .conversations
                    .apply_message_patch(&conversation_id, &preview, active.as_ref());
                drop(guard);
                let _ = self.events.send(InboxEvent::ConversationsUpdated);
                let _ = self.events.send(InboxEvent::MessageFailed {
                    conversation_id: conversation_id.clone(),
                    message_id: message_id.clone(),
                });
                let _ = self.events.send(InboxEvent::TimelineUpdated {
                    conversation_id: conversation_id.clone(),
                });
                Err(SyncError::Send {
                    conversation_id,
                    source: err,
                }
                .into())
            }
        }
    }

    async fn post_send_message(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<SendMessageResponse> {
        let (server_url, _) = self.session().await?;
        let response = self
            .http
            .post(format!("{server_url}/threads/{conversation_id}/send"))
            .json(&SendMessageRequest {
                text: text.to_string(),
            })
            .send()
            .await?;
        let response: SendMessageResponse = require_success(response).await?.json().await?;
        Ok(response)
    }

    /// Routes one push frame into the stores. Malformed frames never get
    /// here; redelivered messages are absorbed by the fingerprint and id
    /// dedup layers.
    async fn apply_push_event(&self, event: PushEvent) {
        match event {
            PushEvent::ThreadNew { message } => {
                let conversation_id = message.conversation_id.clone();
                self.apply_live_message(conversation_id, message).await;
            }
            PushEvent::MessageNew {
                conversation_id,
                message,
            } => {
                self.apply_live_message(conversation_id, message).await;
            }
            PushEvent::ThreadUpdate(patch) => {
                let changed = {
                    let mut guard = self.inner.lock().await;
                    guard.conversations.apply_thread_patch(&patch)
                };
                if changed {
                    let _ = self.events.send(InboxEvent::ConversationsUpdated);
                } else {
                    info!(conversation_id = %patch.id, "dropping patch for unknown thread");
                }
            }
            PushEvent::ThreadRead {
                conversation_id,
                up_to,
            } => {
                let timeline_changed = {
                    let mut guard = self.inner.lock().await;
                    guard.conversations.apply_read_receipt(&conversation_id);
                    guard
                        .timelines
                        .get_mut(&conversation_id)
                        .is_some_and(|t| t.apply_read_receipt(up_to.as_ref()))
                };
                let _ = self.events.send(InboxEvent::ConversationsUpdated);
                if timeline_changed {
                    let _ = self.events.send(InboxEvent::TimelineUpdated { conversation_id });
                }
            }
        }
    }

    async fn apply_live_message(&self, conversation_id: ConversationId, message: MessagePayload) {
        let (summary_changed, timeline_changed) = {
            let mut guard = self.inner.lock().await;
            let active = guard.active_conversation.clone();
            let summary_changed =
                guard
                    .conversations
                    .apply_message_patch(&conversation_id, &message, active.as_ref());
            if !summary_changed {
                (false, false)
            } else {
                let timeline_changed = guard
                    .timelines
                    .get_mut(&conversation_id)
                    .filter(|t| {
                        matches!(t.phase(), LoadPhase::Loaded | LoadPhase::LoadingOlder)
                    })
                    .is_some_and(|t| t.append_live(message));
                (true, timeline_changed)
            }
        };

        if summary_changed {
            let _ = self.events.send(InboxEvent::ConversationsUpdated);
        }
        if timeline_changed {
            let _ = self.events.send(InboxEvent::TimelineUpdated { conversation_id });
        }
    }
}

/// Promotes a non-2xx response to an error, carrying the backend's
/// structured `ApiError` body when one was sent.
async fn require_success(response: reqwest::Response) -> anyhow::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match response.json::<ApiError>().await {
        Ok(body) => Err(ApiException::new(status.as_u16(), body).into()),
        Err(_) => Err(anyhow!("request failed with status {status}")),
    }
}

fn outgoing_preview(conversation_id: &ConversationId, text: &str) -> MessagePayload {
    MessagePayload {
        id: None,
        conversation_id: conversation_id.clone(),
        text: Some(text.to_string()),
        content_type: Some("text".to_string()),
        direction: Direction::Outgoing,
        sent_at: Utc::now(),
        delivery_status: Some(DeliveryStatus::Queued),
        attachments: Vec::new(),
    }
}

/// Frontend-facing surface of the engine.
#[async_trait]
pub trait InboxHandle: Send + Sync {
    async fn login(&self, server_url: &str, identity: &str) -> Result<()>;
    async fn logout(&self);
    async fn refresh_threads(&self) -> Result<()>;
    async fn conversations(
        &self,
        filter: &ConversationFilter,
        order: SortOrder,
    ) -> Vec<Conversation>;
    async fn set_active_conversation(&self, next: Option<ConversationId>) -> Result<()>;
    async fn timeline_messages(&self, conversation_id: &ConversationId) -> Vec<Message>;
    async fn handle_scroll(
        &self,
        conversation_id: &ConversationId,
        metrics: ScrollMetrics,
    ) -> Result<Option<ScrollAnchor>>;
    async fn send_message(&self, conversation_id: &ConversationId, text: &str)
        -> Result<MessageId>;
    async fn retry_message(&self, message_id: &MessageId) -> Result<()>;
    fn subscribe_events(&self) -> broadcast::Receiver<InboxEvent>;
}

#[async_trait]
impl InboxHandle for Arc<InboxClient> {
    async fn login(&self, server_url: &str, identity: &str) -> Result<()> {
        InboxClient::login(self, server_url, identity).await
    }

    async fn logout(&self) {
        InboxClient::logout(self).await
    }

    async fn refresh_threads(&self) -> Result<()> {
        InboxClient::refresh_threads(self).await
    }

    async fn conversations(
        &self,
        filter: &ConversationFilter,
        order: SortOrder,
    ) -> Vec<Conversation> {
        InboxClient::conversations(self, filter, order).await
    }

    async fn set_active_conversation(&self, next: Option<ConversationId>) -> Result<()> {
        InboxClient::set_active_conversation(self, next).await
    }

    async fn timeline_messages(&self, conversation_id: &ConversationId) -> Vec<Message> {
        InboxClient::timeline_messages(self, conversation_id).await
    }

    async fn handle_scroll(
        &self,
        conversation_id: &ConversationId,
        metrics: ScrollMetrics,
    ) -> Result<Option<ScrollAnchor>> {
        InboxClient::handle_scroll(self, conversation_id, metrics).await
    }

    async fn send_message(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<MessageId> {
        InboxClient::send_message(self, conversation_id, text).await
    }

    async fn retry_message(&self, message_id: &MessageId) -> Result<()> {
        InboxClient::retry_message(self, message_id).await
    }

    fn subscribe_events(&self) -> broadcast::Receiver<InboxEvent> {
        InboxClient::subscribe_events(self)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
