//! Interactive chat session over a loopback channel
//!
//! Wires a presence bridge to a bubble board. Messages delivered by the
//! bridge become bubbles; a scripted peer on the same loopback channel
//! answers every line that is sent.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use bulletin_core::{
    BridgeStats, BridgeStatus, BuddyRecord, Handle, NotificationSink, ParticipantIdentity,
    PresenceEvent, PresenceEventBridge, SharingScope,
};
use bulletin_harness::{
    LoopbackChannel, LoopbackGroup, LoopbackHandle, MemoryActivity, MemoryConnection,
    MemoryDirectory, MemorySurface, RecordingSink,
};
use bulletin_overlay::{BubbleBoard, BubbleId, Point, RandomSource, SeededRandom, SystemRandom};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::Result;

// ----------------------------------------------------------------------------
// Loopback Topology
// ----------------------------------------------------------------------------

const CONNECTION_SELF: Handle = Handle::new(1);
const CONNECTION_PEER: Handle = Handle::new(2);
const GROUP_SELF: Handle = Handle::new(101);
const GROUP_PEER: Handle = Handle::new(102);

const OWNER_KEY: &str = "local-owner";
const PEER_KEY: &str = "scripted-peer";

/// Whether the input loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Snapshot printed by `/status`
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub status: BridgeStatus,
    pub stats: BridgeStats,
    pub bubbles: usize,
    pub visible: bool,
}

type Inbox = Rc<RefCell<VecDeque<(ParticipantIdentity, String)>>>;

pub struct ChatApp {
    config: AppConfig,
    bridge: PresenceEventBridge,
    activity: MemoryActivity,
    channel: LoopbackHandle,
    sink: Arc<RecordingSink>,
    board: BubbleBoard<SeededRandom, MemorySurface>,
    inbox: Inbox,
    peer: BuddyRecord,
    output: Vec<String>,
}

impl ChatApp {
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let owner = BuddyRecord::new(OWNER_KEY, &config.identity.name, Some(config.identity.colors.as_str()));
        let peer = BuddyRecord::new(PEER_KEY, &config.peer.name, Some(config.peer.colors.as_str()));

        let connection = MemoryConnection::new(CONNECTION_SELF)
            .with_alias(CONNECTION_SELF, &config.identity.name)
            .with_alias(CONNECTION_PEER, &config.peer.name);
        let directory = MemoryDirectory::new(owner.clone()).with_buddy(CONNECTION_PEER, peer.clone());

        let activity = MemoryActivity::new(SharingScope::Neighborhood);
        activity.add_buddy(owner);
        let channel = offer_loopback_channel(&activity);

        let sink = Arc::new(RecordingSink::new());
        let mut bridge = PresenceEventBridge::new(
            Box::new(activity.clone()),
            Arc::new(connection),
            Arc::new(directory),
            Arc::clone(&sink) as Arc<dyn NotificationSink>,
            config.bridge.clone(),
        );

        let inbox: Inbox = Rc::new(RefCell::new(VecDeque::new()));
        let queue = Rc::clone(&inbox);
        bridge.set_received_callback(Arc::new(move |identity: &ParticipantIdentity, text: &str| {
            queue
                .borrow_mut()
                .push_back((identity.clone(), text.to_string()));
        }));

        let seed = config
            .surface
            .seed
            .unwrap_or_else(|| u64::from(SystemRandom::new().gen_u32()));
        debug!(seed, "Placement seed");
        let board = BubbleBoard::new(
            SeededRandom::new(seed),
            MemorySurface::new(config.surface.bounds()),
            config.overlay.clone(),
        );

        Ok(Self {
            config,
            bridge,
            activity,
            channel,
            sink,
            board,
            inbox,
            peer,
            output: Vec::new(),
        })
    }

    /// Share the activity and bring the peer into the session
    pub fn start(&mut self) {
        self.bridge.start();
        self.activity.set_shared(true);
        self.bridge.handle_event(PresenceEvent::Shared);

        self.activity.add_buddy(self.peer.clone());
        self.bridge
            .handle_event(PresenceEvent::BuddyJoined(self.peer.clone()));
        self.settle();
    }

    /// Handle one line of user input
    pub fn handle_line(&mut self, line: &str) -> Flow {
        let line = line.trim();
        if line.is_empty() {
            return Flow::Continue;
        }

        let flow = match line.strip_prefix('/') {
            Some(command) => self.handle_command(command),
            None => {
                self.send(line);
                Flow::Continue
            }
        };
        self.settle();
        flow
    }

    /// Periodic redraw pass over every bubble
    pub fn redraw(&mut self) {
        let moved = self.board.redraw();
        if moved > 0 {
            self.say(format!("relocated {} bubble(s)", moved));
        }
    }

    /// Close the session before exit
    pub fn shutdown(&mut self) {
        self.bridge.close();
        self.settle();
        info!(stats = ?self.bridge.stats(), "Chat finished");
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            status: self.bridge.status(),
            stats: self.bridge.stats(),
            bubbles: self.board.len(),
            visible: self.board.is_visible(),
        }
    }

    pub fn board(&self) -> &BubbleBoard<SeededRandom, MemorySurface> {
        &self.board
    }

    pub fn take_output(&mut self) -> Vec<String> {
        core::mem::take(&mut self.output)
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    fn handle_command(&mut self, command: &str) -> Flow {
        let mut words = command.split_whitespace();
        match words.next().unwrap_or_default() {
            "quit" | "exit" => return Flow::Quit,
            "close" => self.bridge.close(),
            "remote-close" => self.channel.close_remotely(),
            "retry" => self.retry(),
            "clear" => {
                let removed = self.board.clear();
                self.say(format!("cleared {} bubble(s)", removed));
            }
            "hide" => self.board.set_visible(false),
            "show" => self.board.set_visible(true),
            "drag" => self.drag(words.collect()),
            "status" => match serde_json::to_string(&self.status()) {
                Ok(json) => self.say(json),
                Err(e) => self.say(format!("status unavailable: {}", e)),
            },
            "help" => self.say(
                "commands: /drag <id> <dx> <dy>, /clear, /hide, /show, /close, \
                 /remote-close, /retry, /status, /quit"
                    .to_string(),
            ),
            other => self.say(format!("unknown command: /{}", other)),
        }
        Flow::Continue
    }

    fn send(&mut self, text: &str) {
        if let Err(e) = self.bridge.send(text) {
            self.say(format!("message not sent: {}", e));
            return;
        }

        // The group echoes our own message back
        self.channel.receive(GROUP_SELF, text);
        if self.config.peer.echo {
            let reply = format!("{} heard: {}", self.config.peer.name, text);
            self.channel.receive(GROUP_PEER, &reply);
        }
    }

    fn retry(&mut self) {
        if self.bridge.is_active() {
            self.say("already connected".to_string());
            return;
        }

        self.channel = offer_loopback_channel(&self.activity);
        if !self.bridge.retry() {
            if let Some(e) = self.bridge.last_setup_error() {
                self.say(format!("setup failed: {}", e));
            }
            return;
        }

        self.settle();
        for text in self.bridge.take_failed_sends() {
            self.send(&text);
        }
    }

    fn drag(&mut self, args: Vec<&str>) {
        let parsed = match args.as_slice() {
            [id, dx, dy] => id
                .parse::<u64>()
                .ok()
                .zip(dx.parse::<i32>().ok())
                .zip(dy.parse::<i32>().ok())
                .map(|((id, dx), dy)| (BubbleId::new(id), Point::new(dx, dy))),
            _ => None,
        };
        let Some((id, delta)) = parsed else {
            self.say("usage: /drag <id> <dx> <dy>".to_string());
            return;
        };

        match self.board.drag_by(id, delta) {
            Ok(rest) => self.say(format!("bubble {} moved to {}", id, rest)),
            Err(e) => self.say(format!("drag failed: {}", e)),
        }
    }

    // ------------------------------------------------------------------------
    // Event Pump
    // ------------------------------------------------------------------------

    /// Deliver queued signals, then render messages and notifications
    fn settle(&mut self) {
        loop {
            let signals = self.channel.drain_signals();
            if signals.is_empty() {
                break;
            }
            for signal in signals {
                self.bridge.handle_signal(signal);
            }
        }

        let delivered: Vec<_> = self.inbox.borrow_mut().drain(..).collect();
        for (identity, text) in delivered {
            let id = self.board.add(identity.clone(), &text);
            let origin = self.board.get(id).map(|bubble| bubble.origin).unwrap_or_default();
            let marker = if identity.is_self { "*" } else { " " };
            self.say(format!(
                "[{}]{} {}: {}  @ {}",
                id, marker, identity.display_name, text, origin
            ));
        }

        for notification in self.sink.take() {
            self.say(format!("-- {}: {}", notification.title, notification.message));
        }
    }

    fn say(&mut self, line: String) {
        self.output.push(line);
    }
}

/// Put a fresh group channel on offer for the next setup
fn offer_loopback_channel(activity: &MemoryActivity) -> LoopbackHandle {
    let group = LoopbackGroup::channel_specific(GROUP_SELF)
        .with_owner(GROUP_PEER, CONNECTION_PEER);
    let (channel, handle) = LoopbackChannel::with_group(group);
    activity.offer_channel(channel);
    handle
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulletin_overlay::DisplaySurface;

    fn app() -> ChatApp {
        let mut config = AppConfig::default();
        config.surface.seed = Some(42);
        config.identity.name = "alice".to_string();
        config.peer.name = "bob".to_string();
        let mut app = ChatApp::new(config).unwrap();
        app.start();
        app
    }

    #[test]
    fn test_start_connects_and_announces_peer() {
        let mut app = app();
        let output = app.take_output();
        assert_eq!(
            output,
            vec![
                "-- Online: Connected".to_string(),
                "-- bob: joined the chat".to_string(),
            ]
        );
        assert_eq!(app.status().status, BridgeStatus::Active);
    }

    #[test]
    fn test_sent_line_becomes_two_bubbles() {
        let mut app = app();
        app.take_output();

        assert_eq!(app.handle_line("hello"), Flow::Continue);

        let output = app.take_output();
        assert_eq!(output.len(), 2);
        assert!(output[0].starts_with("[1]* alice: hello"));
        assert!(output[1].starts_with("[2]  bob: bob heard: hello"));

        let bounds = app.board().surface().bounds();
        assert!(app.board().iter().all(|b| bounds.fits(b.origin, b.size)));

        let status = app.status();
        assert_eq!(status.stats.sent, 1);
        assert_eq!(status.stats.delivered, 2);
        assert_eq!(status.stats.acknowledged, 2);
    }

    #[test]
    fn test_send_after_close_is_reported_and_resent_on_retry() {
        let mut app = app();
        app.handle_line("/close");
        assert!(app
            .take_output()
            .contains(&"-- Offline: Disconnected".to_string()));

        app.handle_line("lost");
        let output = app.take_output();
        assert!(output[0].starts_with("message not sent"));
        assert_eq!(app.status().stats.failed_sends, 1);

        app.handle_line("/retry");
        let output = app.take_output();
        assert!(output.contains(&"-- Online: Connected".to_string()));
        assert!(output.iter().any(|line| line.contains("alice: lost")));
        assert_eq!(app.status().status, BridgeStatus::Active);
    }

    #[test]
    fn test_remote_close_goes_offline() {
        let mut app = app();
        app.take_output();
        app.handle_line("/remote-close");
        assert_eq!(app.take_output(), vec!["-- Offline: Disconnected".to_string()]);
        assert_eq!(app.status().status, BridgeStatus::Inactive);
    }

    #[test]
    fn test_drag_command() {
        let mut app = app();
        app.handle_line("hi");
        app.take_output();
        let start = app.board().get(BubbleId::new(1)).unwrap().origin;

        app.handle_line("/drag 1 5 -5");
        assert_eq!(
            app.take_output(),
            vec![format!("bubble 1 moved to {}", Point::new(start.x + 5, start.y - 5))]
        );

        app.handle_line("/drag one 5");
        assert_eq!(app.take_output(), vec!["usage: /drag <id> <dx> <dy>".to_string()]);

        app.handle_line("/drag 9 1 1");
        assert!(app.take_output()[0].starts_with("drag failed"));
    }

    #[test]
    fn test_status_is_json() {
        let mut app = app();
        app.take_output();
        app.handle_line("/status");
        let output = app.take_output();
        let value: serde_json::Value = serde_json::from_str(&output[0]).unwrap();
        assert_eq!(value["status"], "Active");
        assert_eq!(value["bubbles"], 0);
    }

    #[test]
    fn test_quit_and_unknown_commands() {
        let mut app = app();
        app.take_output();
        assert_eq!(app.handle_line("/quit"), Flow::Quit);
        app.handle_line("/frobnicate");
        assert_eq!(app.take_output(), vec!["unknown command: /frobnicate".to_string()]);
    }
}
