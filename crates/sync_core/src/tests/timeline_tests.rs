use super::*;
use chrono::TimeZone;

fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn payload(id: &str, at: i64, direction: Direction) -> MessagePayload {
    MessagePayload {
        id: Some(MessageId::from(id)),
        conversation_id: ConversationId::from("c1"),
        text: Some(format!("body of {id}")),
        content_type: Some("text".to_string()),
        direction,
        sent_at: ts(at),
        delivery_status: None,
        attachments: Vec::new(),
    }
}

fn page(ids: &[(&str, i64)], next_before_id: Option<&str>) -> MessagePage {
    MessagePage {
        items: ids
            .iter()
            .map(|(id, at)| payload(id, *at, Direction::Incoming))
            .collect(),
        next_before_id: next_before_id.map(MessageId::from),
    }
}

fn loaded_timeline(ids: &[(&str, i64)], page_size: u32) -> Timeline {
    let mut timeline = Timeline::new(ConversationId::from("c1"));
    timeline.begin_initial_load();
    timeline.apply_initial_page(page(ids, None), page_size);
    timeline
}

#[test]
fn full_initial_page_sets_cursor_to_oldest_message() {
    let timeline = loaded_timeline(&[("m1", 100), ("m2", 200), ("m3", 300)], 3);
    assert_eq!(timeline.phase(), LoadPhase::Loaded);
    assert!(timeline.has_more());
    assert_eq!(timeline.messages().len(), 3);
    assert_eq!(timeline.messages()[0].id, MessageId::from("m1"));
}

#[test]
fn short_initial_page_means_history_is_complete() {
    let timeline = loaded_timeline(&[("m1", 100), ("m2", 200)], 30);
    assert!(!timeline.has_more());

    let mut timeline = timeline;
    assert_eq!(
        timeline.begin_older_load(),
        Err(InvalidCursorError::Exhausted(ConversationId::from("c1")))
    );
}

#[test]
fn older_page_prepends_and_adopts_the_server_cursor() {
    let mut timeline = loaded_timeline(&[("m4", 400), ("m5", 500), ("m6", 600)], 3);

    let cursor = timeline.begin_older_load().expect("cursor");
    assert_eq!(cursor, MessageId::from("m4"));

    timeline.apply_older_page(page(&[("m1", 100), ("m2", 200), ("m3", 300)], Some("m1")));
    let ids: Vec<&str> = timeline.messages().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3", "m4", "m5", "m6"]);
    assert!(timeline.has_more());

    // The next backward fetch queries with the server-issued cursor.
    assert_eq!(timeline.begin_older_load().expect("cursor"), MessageId::from("m1"));
}

#[test]
fn null_server_cursor_exhausts_history_permanently() {
    let mut timeline = loaded_timeline(&[("m4", 400), ("m5", 500), ("m6", 600)], 3);
    timeline.begin_older_load().expect("cursor");
    timeline.apply_older_page(page(&[("m1", 100), ("m2", 200), ("m3", 300)], None));

    assert!(!timeline.has_more());
    assert_eq!(
        timeline.begin_older_load(),
        Err(InvalidCursorError::Exhausted(ConversationId::from("c1")))
    );
}

#[test]
fn empty_older_page_exhausts_history() {
    let mut timeline = loaded_timeline(&[("m4", 400), ("m5", 500), ("m6", 600)], 3);
    timeline.begin_older_load().expect("cursor");
    timeline.apply_older_page(page(&[], Some("m4")));
    assert!(!timeline.has_more());
    assert_eq!(timeline.messages().len(), 3);
}

#[test]
fn concurrent_older_loads_are_rejected() {
    let mut timeline = loaded_timeline(&[("m4", 400), ("m5", 500), ("m6", 600)], 3);
    timeline.begin_older_load().expect("cursor");
    assert_eq!(
        timeline.begin_older_load(),
        Err(InvalidCursorError::LoadInFlight(ConversationId::from("c1")))
    );
}

#[test]
fn aborted_older_load_keeps_cursor_and_stays_retryable() {
    let mut timeline = loaded_timeline(&[("m4", 400), ("m5", 500), ("m6", 600)], 3);
    timeline.begin_older_load().expect("cursor");
    timeline.abort_older_load();

    assert_eq!(timeline.phase(), LoadPhase::Loaded);
    assert!(timeline.has_more());
    assert_eq!(timeline.begin_older_load().expect("cursor"), MessageId::from("m4"));
}

#[test]
fn older_page_drops_messages_already_present() {
    let mut timeline = loaded_timeline(&[("m3", 300), ("m4", 400), ("m5", 500)], 3);
    timeline.begin_older_load().expect("cursor");
    // Overlapping page: m3 is already loaded.
    timeline.apply_older_page(page(&[("m1", 100), ("m2", 200), ("m3", 300)], Some("m1")));
    let ids: Vec<&str> = timeline.messages().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2", "m3", "m4", "m5"]);
}

#[test]
fn append_live_accepts_only_new_incoming_messages() {
    let mut timeline = loaded_timeline(&[("m1", 100)], 30);

    assert!(timeline.append_live(payload("m2", 200, Direction::Incoming)));
    assert!(!timeline.append_live(payload("m2", 200, Direction::Incoming)));
    // Outgoing echoes never come through the live path.
    assert!(!timeline.append_live(payload("m3", 300, Direction::Outgoing)));
    assert_eq!(timeline.messages().len(), 2);
}

#[test]
fn optimistic_send_reconciles_to_server_id_once() {
    let mut timeline = loaded_timeline(&[("m1", 100)], 30);
    let temp_id = MessageId::temporary();
    timeline.push_outgoing(temp_id.clone(), "outgoing text".to_string(), ts(200));

    let message = timeline.get(&temp_id).expect("optimistic message");
    assert!(message.id.is_temporary());
    assert_eq!(message.status, DeliveryStatus::Queued);

    assert!(timeline.reconcile_sent(&temp_id, MessageId::from("m2"), ts(201)));
    assert!(timeline.get(&temp_id).is_none());
    let message = timeline.get(&MessageId::from("m2")).expect("reconciled");
    assert_eq!(message.status, DeliveryStatus::Sent);
    assert_eq!(message.body, "outgoing text");

    // A second reconcile attempt finds nothing to swap.
    assert!(!timeline.reconcile_sent(&temp_id, MessageId::from("m3"), ts(202)));
}

#[test]
fn failed_send_loops_between_failed_and_queued() {
    let mut timeline = loaded_timeline(&[], 30);
    let temp_id = MessageId::temporary();
    timeline.push_outgoing(temp_id.clone(), "will fail".to_string(), ts(100));

    assert!(timeline.mark_failed(&temp_id));
    assert_eq!(timeline.get(&temp_id).unwrap().status, DeliveryStatus::Failed);

    assert!(timeline.mark_queued(&temp_id));
    assert_eq!(timeline.get(&temp_id).unwrap().status, DeliveryStatus::Queued);
}

#[test]
fn read_receipt_stops_at_the_boundary_message() {
    let mut timeline = Timeline::new(ConversationId::from("c1"));
    let items: Vec<MessagePayload> = [("m1", 100), ("m2", 200), ("m3", 300)]
        .iter()
        .map(|(id, at)| {
            let mut message = payload(id, *at, Direction::Outgoing);
            message.delivery_status = Some(DeliveryStatus::Delivered);
            message
        })
        .collect();
    timeline.apply_initial_page(
        MessagePage {
            items,
            next_before_id: None,
        },
        30,
    );

    assert!(timeline.apply_read_receipt(Some(&MessageId::from("m2"))));
    assert_eq!(timeline.get(&MessageId::from("m1")).unwrap().status, DeliveryStatus::Read);
    assert_eq!(timeline.get(&MessageId::from("m2")).unwrap().status, DeliveryStatus::Read);
    assert_eq!(
        timeline.get(&MessageId::from("m3")).unwrap().status,
        DeliveryStatus::Delivered
    );
}

#[test]
fn read_receipt_without_boundary_covers_the_whole_timeline() {
    let mut timeline = Timeline::new(ConversationId::from("c1"));
    let items: Vec<MessagePayload> = [("m1", 100), ("m2", 200)]
        .iter()
        .map(|(id, at)| {
            let mut message = payload(id, *at, Direction::Outgoing);
            message.delivery_status = Some(DeliveryStatus::Sent);
            message
        })
        .collect();
    timeline.apply_initial_page(
        MessagePage {
            items,
            next_before_id: None,
        },
        30,
    );

    assert!(timeline.apply_read_receipt(None));
    for id in ["m1", "m2"] {
        assert_eq!(
            timeline.get(&MessageId::from(id)).unwrap().status,
            DeliveryStatus::Read
        );
    }
}

#[test]
fn payload_without_text_falls_back_to_attachment_key() {
    let mut raw = payload("m1", 100, Direction::Incoming);
    raw.text = None;
    raw.attachments = vec![shared::protocol::AttachmentPayload {
        storage_key: "uploads/voice-note.ogg".to_string(),
        mime_type: None,
    }];
    let message = Message::from_payload(raw);
    assert_eq!(message.body, "uploads/voice-note.ogg");
    assert_eq!(message.status, DeliveryStatus::Sent);
}

#[test]
fn store_routes_messages_back_to_their_thread() {
    let mut store = TimelineStore::default();
    let temp_id = MessageId::temporary();
    store
        .entry(&ConversationId::from("c2"))
        .push_outgoing(temp_id.clone(), "hi".to_string(), ts(100));

    assert_eq!(
        store.find_conversation(&temp_id),
        Some(&ConversationId::from("c2"))
    );
    assert_eq!(store.find_conversation(&MessageId::from("nope")), None);
}
