//! Presence event bridge
//!
//! Turns activity lifecycle events into channel session setup and teardown
//! and surfaces status notifications. Setup failures never escape: the bridge
//! logs them and stays inactive until the next event or an explicit
//! [`PresenceEventBridge::retry`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::dispatcher::ReceivedCallback;
use crate::errors::{BulletinError, Result};
use crate::resolver::HandleResolver;
use crate::session::{ChannelSession, ClosedCallback};
use crate::stats::BridgeStats;
use crate::transport::{
    Connection, Notification, NotificationSink, PresenceDirectory, SharedActivity, Signal,
};
use crate::types::{BuddyRecord, SharingScope};

pub const ONLINE_TITLE: &str = "Online";
pub const ONLINE_MESSAGE: &str = "Connected";
pub const OFFLINE_TITLE: &str = "Offline";
pub const OFFLINE_INVITE_MESSAGE: &str = "Share, or invite someone.";
pub const DISCONNECTED_MESSAGE: &str = "Disconnected";
pub const JOINED_MESSAGE: &str = "joined the chat";
pub const LEFT_MESSAGE: &str = "left the chat";

/// Session-level events observed by the bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceEvent {
    /// The local user shared the activity and hosts the session
    Shared,
    /// The local user joined an existing shared session
    Joined,
    BuddyJoined(BuddyRecord),
    BuddyLeft(BuddyRecord),
}

/// Whether the bridge currently has a usable session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BridgeStatus {
    /// No session; the next shared/joined event or `retry` sets one up
    Inactive,
    Active,
}

/// Drives channel session setup from presence events
pub struct PresenceEventBridge {
    activity: Box<dyn SharedActivity>,
    connection: Arc<dyn Connection>,
    directory: Arc<dyn PresenceDirectory>,
    notifier: Arc<dyn NotificationSink>,
    config: BridgeConfig,
    session: Option<ChannelSession>,
    consumer: Option<ReceivedCallback>,
    failed_sends: Vec<String>,
    retired_stats: BridgeStats,
    last_setup_error: Option<BulletinError>,
}

impl PresenceEventBridge {
    pub fn new(
        activity: Box<dyn SharedActivity>,
        connection: Arc<dyn Connection>,
        directory: Arc<dyn PresenceDirectory>,
        notifier: Arc<dyn NotificationSink>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            activity,
            connection,
            directory,
            notifier,
            config,
            session: None,
            consumer: None,
            failed_sends: Vec::new(),
            retired_stats: BridgeStats::default(),
            last_setup_error: None,
        }
    }

    pub fn status(&self) -> BridgeStatus {
        match &self.session {
            Some(session) if session.is_open() => BridgeStatus::Active,
            _ => BridgeStatus::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status() == BridgeStatus::Active
    }

    pub fn session(&self) -> Option<&ChannelSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut ChannelSession> {
        self.session.as_mut()
    }

    pub fn last_setup_error(&self) -> Option<&BulletinError> {
        self.last_setup_error.as_ref()
    }

    /// Counters across every session this bridge has run
    pub fn stats(&self) -> BridgeStats {
        let mut stats = self.retired_stats;
        if let Some(session) = &self.session {
            stats.merge(session.stats());
        }
        stats
    }

    /// Inspect the activity once at startup
    ///
    /// An already shared activity is treated as joined. A private, unshared
    /// activity only gets the offline notification.
    pub fn start(&mut self) {
        if self.activity.is_shared() {
            debug!("Activity already shared at startup, joining");
            self.handle_event(PresenceEvent::Joined);
        } else if self.activity.sharing_scope() == SharingScope::Private {
            info!("Activity is private, staying offline");
            self.notify(OFFLINE_TITLE, OFFLINE_INVITE_MESSAGE);
        }
    }

    pub fn handle_event(&mut self, event: PresenceEvent) {
        match event {
            PresenceEvent::Shared => {
                info!("Activity shared");
                self.setup();
            }
            PresenceEvent::Joined => {
                info!("Joined shared activity");
                for buddy in self.activity.joined_buddies() {
                    self.announce(&buddy, JOINED_MESSAGE);
                }
                self.setup();
            }
            PresenceEvent::BuddyJoined(buddy) => self.announce(&buddy, JOINED_MESSAGE),
            PresenceEvent::BuddyLeft(buddy) => self.announce(&buddy, LEFT_MESSAGE),
        }
    }

    /// Re-attempt setup after a failure or a closed session
    pub fn retry(&mut self) -> bool {
        if !self.is_active() {
            self.setup();
        }
        self.is_active()
    }

    /// Forward a transport signal to the session
    pub fn handle_signal(&mut self, signal: Signal) {
        let Some(session) = self.session.as_mut() else {
            debug!(kind = %signal.kind(), "Signal with no session");
            return;
        };

        session.handle_signal(signal);
        if !session.is_open() {
            self.retire_session();
            self.notify(OFFLINE_TITLE, DISCONNECTED_MESSAGE);
        }
    }

    /// Attach the message consumer, now and for every later session
    pub fn set_received_callback(&mut self, callback: ReceivedCallback) {
        self.consumer = Some(callback.clone());
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = attach_consumer(session, callback) {
                warn!(error = %e, "Failed to attach consumer to session");
            }
        }
    }

    /// Register the consumer of the current session's closed event
    pub fn set_closed_callback(&mut self, callback: ClosedCallback) -> Result<()> {
        match self.session.as_mut() {
            Some(session) => {
                session.set_closed_callback(callback);
                Ok(())
            }
            None => Err(BulletinError::channel_closed("register closed callback")),
        }
    }

    /// Send a message; without an open session it is queued as a failed send
    pub fn send(&mut self, text: &str) -> Result<()> {
        let result = match self.session.as_mut() {
            Some(session) => session.send(text),
            None => Err(BulletinError::channel_closed("send")),
        };

        if let Err(e) = &result {
            if e.is_closed() {
                warn!("Message not sent: no open channel");
                self.failed_sends.push(text.to_string());
                self.retired_stats.failed_sends += 1;
            }
        }
        result
    }

    /// Texts that could not be sent, oldest first
    pub fn take_failed_sends(&mut self) -> Vec<String> {
        core::mem::take(&mut self.failed_sends)
    }

    /// Request closure of the current session
    pub fn close(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.close();
        if !session.is_open() {
            self.retire_session();
            self.notify(OFFLINE_TITLE, DISCONNECTED_MESSAGE);
        }
    }

    fn setup(&mut self) {
        if self.is_active() {
            debug!("Session already active");
            return;
        }

        match self.open_session() {
            Ok(session) => {
                self.session = Some(session);
                self.last_setup_error = None;
                self.notify(ONLINE_TITLE, ONLINE_MESSAGE);
            }
            Err(e) => {
                error!(error = %e, "Channel setup failed, bridge stays inactive");
                self.last_setup_error = Some(e);
            }
        }
    }

    fn open_session(&mut self) -> Result<ChannelSession> {
        let transport = self.activity.open_text_channel()?;
        let resolver = HandleResolver::new(
            Arc::clone(&self.connection),
            Arc::clone(&self.directory),
            &self.config,
        );

        let mut session = ChannelSession::open(transport, resolver, &self.config)?;
        if let Err(e) = wire_session(&mut session, self.consumer.clone()) {
            session.abort(e.clone());
            return Err(e);
        }
        Ok(session)
    }

    fn retire_session(&mut self) {
        if let Some(session) = self.session.take() {
            self.retired_stats.merge(session.stats());
        }
    }

    fn announce(&self, buddy: &BuddyRecord, message: &str) {
        if buddy.same_buddy(&self.directory.owner()) {
            return;
        }
        let nick = buddy.nick().unwrap_or(self.config.unknown_display_name.as_str());
        self.notify(nick, message);
    }

    fn notify(&self, title: &str, message: &str) {
        self.notifier.notify(Notification::new(
            title,
            message,
            self.config.notification_timeout(),
        ));
    }
}

/// Subscribe to received messages and replay what the transport holds
fn wire_session(session: &mut ChannelSession, consumer: Option<ReceivedCallback>) -> Result<()> {
    session.subscribe_received()?;
    match consumer {
        Some(callback) => attach_consumer(session, callback),
        None => session.drain_pending().map(|_| ()),
    }
}

/// Install `callback` and replay what the transport still holds
fn attach_consumer(session: &mut ChannelSession, callback: ReceivedCallback) -> Result<()> {
    session.set_received_callback(callback)?;
    let delivered = session.drain_pending()?;
    debug!(delivered, "Consumer attached");
    Ok(())
}
