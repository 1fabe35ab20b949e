//! In-memory presence collaborators
//!
//! Connection, buddy directory, shared activity and notification sink
//! backed by plain collections.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bulletin_core::errors::TransportError;
use bulletin_core::transport::{
    Connection, Notification, NotificationSink, PresenceDirectory, SharedActivity,
    TransportChannel, TransportResult,
};
use bulletin_core::types::{BuddyRecord, Handle, SharingScope};
use tracing::debug;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ----------------------------------------------------------------------------
// Connection
// ----------------------------------------------------------------------------

/// Connection with a fixed self handle and alias table
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    self_handle: Handle,
    aliases: HashMap<Handle, String>,
}

impl MemoryConnection {
    pub fn new(self_handle: Handle) -> Self {
        Self {
            self_handle,
            aliases: HashMap::new(),
        }
    }

    pub fn with_alias<T: Into<String>>(mut self, handle: Handle, alias: T) -> Self {
        self.aliases.insert(handle, alias.into());
        self
    }
}

impl Connection for MemoryConnection {
    fn self_handle(&self) -> Handle {
        self.self_handle
    }

    fn aliases(&self, handles: &[Handle]) -> TransportResult<Vec<String>> {
        handles
            .iter()
            .map(|handle| {
                self.aliases.get(handle).cloned().ok_or_else(|| {
                    TransportError::rejected("aliases", format!("no alias for handle {}", handle))
                })
            })
            .collect()
    }
}

// ----------------------------------------------------------------------------
// Directory
// ----------------------------------------------------------------------------

/// Buddy directory keyed by connection-level handle
#[derive(Debug, Clone)]
pub struct MemoryDirectory {
    owner: BuddyRecord,
    buddies: HashMap<Handle, BuddyRecord>,
}

impl MemoryDirectory {
    pub fn new(owner: BuddyRecord) -> Self {
        Self {
            owner,
            buddies: HashMap::new(),
        }
    }

    pub fn with_buddy(mut self, handle: Handle, record: BuddyRecord) -> Self {
        self.buddies.insert(handle, record);
        self
    }
}

impl PresenceDirectory for MemoryDirectory {
    fn buddy_by_handle(&self, handle: Handle) -> Option<BuddyRecord> {
        self.buddies.get(&handle).cloned()
    }

    fn owner(&self) -> BuddyRecord {
        self.owner.clone()
    }
}

// ----------------------------------------------------------------------------
// Shared Activity
// ----------------------------------------------------------------------------

struct ActivityState {
    scope: SharingScope,
    shared: bool,
    buddies: Vec<BuddyRecord>,
    offers: VecDeque<TransportResult<Box<dyn TransportChannel>>>,
    open_attempts: usize,
}

impl core::fmt::Debug for ActivityState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActivityState")
            .field("scope", &self.scope)
            .field("shared", &self.shared)
            .field("buddies", &self.buddies)
            .field("offers", &self.offers.len())
            .field("open_attempts", &self.open_attempts)
            .finish()
    }
}

/// Activity handing out queued channel offers
///
/// Clones share state, so a test can keep one clone while the bridge owns
/// another.
#[derive(Debug, Clone)]
pub struct MemoryActivity {
    state: Arc<Mutex<ActivityState>>,
}

impl MemoryActivity {
    pub fn new(scope: SharingScope) -> Self {
        Self {
            state: Arc::new(Mutex::new(ActivityState {
                scope,
                shared: false,
                buddies: Vec::new(),
                offers: VecDeque::new(),
                open_attempts: 0,
            })),
        }
    }

    pub fn set_shared(&self, shared: bool) {
        lock(&self.state).shared = shared;
    }

    pub fn set_scope(&self, scope: SharingScope) {
        lock(&self.state).scope = scope;
    }

    pub fn add_buddy(&self, record: BuddyRecord) {
        lock(&self.state).buddies.push(record);
    }

    pub fn remove_buddy(&self, record: &BuddyRecord) {
        lock(&self.state).buddies.retain(|b| !b.same_buddy(record));
    }

    /// Queue a channel for the next `open_text_channel`
    pub fn offer_channel<C: TransportChannel + 'static>(&self, channel: C) {
        let channel: Box<dyn TransportChannel> = Box::new(channel);
        lock(&self.state).offers.push_back(Ok(channel));
    }

    /// Make the next `open_text_channel` fail
    pub fn offer_failure(&self, error: TransportError) {
        lock(&self.state).offers.push_back(Err(error));
    }

    pub fn open_attempts(&self) -> usize {
        lock(&self.state).open_attempts
    }
}

impl SharedActivity for MemoryActivity {
    fn sharing_scope(&self) -> SharingScope {
        lock(&self.state).scope
    }

    fn is_shared(&self) -> bool {
        lock(&self.state).shared
    }

    fn joined_buddies(&self) -> Vec<BuddyRecord> {
        lock(&self.state).buddies.clone()
    }

    fn open_text_channel(&mut self) -> TransportResult<Box<dyn TransportChannel>> {
        let mut state = lock(&self.state);
        state.open_attempts += 1;
        debug!(attempt = state.open_attempts, "Opening text channel");
        state
            .offers
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::unavailable("no text channel offered")))
    }
}

// ----------------------------------------------------------------------------
// Notification Sink
// ----------------------------------------------------------------------------

/// Sink that keeps every notification it is given
#[derive(Debug, Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    /// `(title, message)` pairs in arrival order
    pub fn entries(&self) -> Vec<(String, String)> {
        lock(&self.notifications)
            .iter()
            .map(|n| (n.title.clone(), n.message.clone()))
            .collect()
    }

    pub fn take(&self) -> Vec<Notification> {
        core::mem::take(&mut *lock(&self.notifications))
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        debug!(title = %notification.title, message = %notification.message, "Notification");
        lock(&self.notifications).push(notification);
    }
}
