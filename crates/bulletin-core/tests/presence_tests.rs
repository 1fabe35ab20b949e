//! Presence bridge tests
//!
//! Notifications, channel setup on shared/joined events, setup failure with
//! retry, and the failed-send queue.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use bulletin_core::presence::{
    DISCONNECTED_MESSAGE, JOINED_MESSAGE, LEFT_MESSAGE, OFFLINE_INVITE_MESSAGE, OFFLINE_TITLE,
    ONLINE_MESSAGE, ONLINE_TITLE,
};
use bulletin_core::*;
use bulletin_harness::{
    ChannelCall, LoopbackBehavior, LoopbackChannel, LoopbackGroup, LoopbackHandle,
    MemoryActivity, MemoryConnection, MemoryDirectory, RecordingSink,
};

const CONN_SELF: Handle = Handle::new(1);
const BOB: Handle = Handle::new(30);

fn owner() -> BuddyRecord {
    BuddyRecord::new("me-key", "me", None)
}

fn bob() -> BuddyRecord {
    BuddyRecord::new("bob-key", "bob", Some("#0000ff,#ffff00"))
}

struct Fixture {
    bridge: PresenceEventBridge,
    activity: MemoryActivity,
    sink: Arc<RecordingSink>,
}

fn fixture(scope: SharingScope) -> Fixture {
    let activity = MemoryActivity::new(scope);
    let sink = Arc::new(RecordingSink::new());
    let directory = MemoryDirectory::new(owner()).with_buddy(BOB, bob());
    let bridge = PresenceEventBridge::new(
        Box::new(activity.clone()),
        Arc::new(MemoryConnection::new(CONN_SELF)),
        Arc::new(directory),
        Arc::clone(&sink) as Arc<dyn NotificationSink>,
        BridgeConfig::testing(),
    );
    Fixture {
        bridge,
        activity,
        sink,
    }
}

fn offer_group_channel(activity: &MemoryActivity) -> LoopbackHandle {
    let (channel, handle) = LoopbackChannel::with_group(LoopbackGroup::new(
        Handle::new(100),
        GroupFlags::empty(),
    ));
    activity.offer_channel(channel);
    handle
}

fn entry(title: &str, message: &str) -> (String, String) {
    (title.to_string(), message.to_string())
}

// ----------------------------------------------------------------------------
// Startup
// ----------------------------------------------------------------------------

#[test]
fn test_private_unshared_activity_reports_offline() {
    let mut f = fixture(SharingScope::Private);
    f.bridge.start();

    assert_eq!(f.sink.entries(), vec![entry(OFFLINE_TITLE, OFFLINE_INVITE_MESSAGE)]);
    assert!(!f.bridge.is_active());
    assert_eq!(f.activity.open_attempts(), 0);
}

#[test]
fn test_already_shared_activity_joins_at_startup() {
    let mut f = fixture(SharingScope::Neighborhood);
    f.activity.set_shared(true);
    f.activity.add_buddy(owner());
    f.activity.add_buddy(bob());
    offer_group_channel(&f.activity);

    f.bridge.start();

    assert_eq!(
        f.sink.entries(),
        vec![
            entry("bob", JOINED_MESSAGE),
            entry(ONLINE_TITLE, ONLINE_MESSAGE)
        ]
    );
    assert!(f.bridge.is_active());
}

#[test]
fn test_unshared_invite_activity_stays_quiet() {
    let mut f = fixture(SharingScope::Invite);
    f.bridge.start();
    assert!(f.sink.entries().is_empty());
}

// ----------------------------------------------------------------------------
// Events
// ----------------------------------------------------------------------------

#[test]
fn test_buddy_join_and_leave_notifications_skip_owner() {
    let mut f = fixture(SharingScope::Neighborhood);
    f.bridge.handle_event(PresenceEvent::BuddyJoined(owner()));
    f.bridge.handle_event(PresenceEvent::BuddyJoined(bob()));
    f.bridge.handle_event(PresenceEvent::BuddyLeft(bob()));

    assert_eq!(
        f.sink.entries(),
        vec![entry("bob", JOINED_MESSAGE), entry("bob", LEFT_MESSAGE)]
    );
}

#[test]
fn test_shared_event_sets_up_channel_and_drains_pending() {
    let mut f = fixture(SharingScope::Neighborhood);
    let handle = offer_group_channel(&f.activity);
    handle.queue_pending(BOB, "waiting");

    let received = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&received);
    f.bridge
        .set_received_callback(Arc::new(move |identity: &ParticipantIdentity, text: &str| {
            sink.borrow_mut()
                .push(format!("{}: {}", identity.display_name, text));
        }));

    f.bridge.handle_event(PresenceEvent::Shared);

    assert!(f.bridge.is_active());
    assert_eq!(received.borrow().as_slice(), &["bob: waiting".to_string()]);
    assert_eq!(
        handle.active_subscriptions(),
        vec![SignalKind::Closed, SignalKind::Received]
    );
    assert_eq!(f.sink.entries(), vec![entry(ONLINE_TITLE, ONLINE_MESSAGE)]);
}

#[test]
fn test_setup_failure_leaves_bridge_inactive_and_retryable() {
    let mut f = fixture(SharingScope::Neighborhood);
    f.activity
        .offer_failure(TransportError::unavailable("tubes not ready"));

    f.bridge.handle_event(PresenceEvent::Shared);
    assert!(!f.bridge.is_active());
    assert!(matches!(
        f.bridge.last_setup_error(),
        Some(BulletinError::Transport(_))
    ));
    assert!(f.sink.entries().is_empty());

    offer_group_channel(&f.activity);
    assert!(f.bridge.retry());
    assert!(f.bridge.last_setup_error().is_none());
    assert_eq!(f.activity.open_attempts(), 2);
}

#[test]
fn test_setup_failure_after_open_releases_subscriptions() {
    let mut f = fixture(SharingScope::Neighborhood);
    let handle = offer_group_channel(&f.activity);
    handle.set_behavior(LoopbackBehavior {
        fail_list_pending: true,
        ..LoopbackBehavior::default()
    });

    f.bridge.handle_event(PresenceEvent::Shared);

    assert!(!f.bridge.is_active());
    assert!(matches!(
        f.bridge.last_setup_error(),
        Some(BulletinError::Transport(TransportError::Unavailable { .. }))
    ));
    assert!(handle.active_subscriptions().is_empty());
    assert_eq!(handle.count_calls(|c| matches!(c, ChannelCall::Disconnect(_))), 2);
    assert!(f.sink.entries().is_empty());
}

#[test]
fn test_repeated_shared_event_keeps_existing_session() {
    let mut f = fixture(SharingScope::Neighborhood);
    offer_group_channel(&f.activity);

    f.bridge.handle_event(PresenceEvent::Shared);
    f.bridge.handle_event(PresenceEvent::Shared);

    assert_eq!(f.activity.open_attempts(), 1);
    assert_eq!(f.sink.entries().len(), 1);
}

#[test]
fn test_remote_close_reports_disconnected() {
    let mut f = fixture(SharingScope::Neighborhood);
    let handle = offer_group_channel(&f.activity);
    f.bridge.handle_event(PresenceEvent::Shared);
    f.sink.take();

    handle.close_remotely();
    for signal in handle.drain_signals() {
        f.bridge.handle_signal(signal);
    }

    assert!(!f.bridge.is_active());
    assert!(f.bridge.session().is_none());
    assert_eq!(f.sink.entries(), vec![entry(OFFLINE_TITLE, DISCONNECTED_MESSAGE)]);
}

// ----------------------------------------------------------------------------
// Sending
// ----------------------------------------------------------------------------

#[test]
fn test_send_without_session_queues_failed_send() {
    let mut f = fixture(SharingScope::Neighborhood);

    let err = f.bridge.send("lost?").unwrap_err();
    assert!(err.is_closed());
    assert_eq!(f.bridge.take_failed_sends(), vec!["lost?".to_string()]);
    assert!(f.bridge.take_failed_sends().is_empty());
    assert_eq!(f.bridge.stats().failed_sends, 1);
}

#[test]
fn test_send_on_dropped_channel_queues_failed_send() {
    let mut f = fixture(SharingScope::Neighborhood);
    let handle = offer_group_channel(&f.activity);
    f.bridge.handle_event(PresenceEvent::Shared);
    f.sink.take();

    // Gone before its closed signal is handled
    handle.close_remotely();
    let result = f.bridge.send("late");

    assert!(matches!(
        result,
        Err(BulletinError::Transport(TransportError::Unavailable { .. }))
    ));
    assert_eq!(f.bridge.take_failed_sends(), vec!["late".to_string()]);
    assert_eq!(f.bridge.stats().failed_sends, 1);

    for signal in handle.drain_signals() {
        f.bridge.handle_signal(signal);
    }
    assert!(!f.bridge.is_active());
    assert_eq!(f.sink.entries(), vec![entry(OFFLINE_TITLE, DISCONNECTED_MESSAGE)]);
}

#[test]
fn test_stats_survive_session_turnover() {
    let mut f = fixture(SharingScope::Neighborhood);
    let first = offer_group_channel(&f.activity);
    f.bridge.handle_event(PresenceEvent::Shared);
    f.bridge.send("one").unwrap();
    f.bridge.send("two").unwrap();

    first.close_remotely();
    for signal in first.drain_signals() {
        f.bridge.handle_signal(signal);
    }

    let second = offer_group_channel(&f.activity);
    assert!(f.bridge.retry());
    f.bridge.send("three").unwrap();

    assert_eq!(first.sent(), vec!["one", "two"]);
    assert_eq!(second.sent(), vec!["three"]);
    assert_eq!(f.bridge.stats().sent, 3);
}

#[test]
fn test_explicit_close_through_bridge() {
    let mut f = fixture(SharingScope::Neighborhood);
    let handle = offer_group_channel(&f.activity);
    f.bridge.handle_event(PresenceEvent::Shared);

    f.bridge.close();
    assert!(f.bridge.is_active());

    for signal in handle.drain_signals() {
        f.bridge.handle_signal(signal);
    }
    assert!(!f.bridge.is_active());
}
