//! Participant handle resolution
//!
//! Senders on a group channel are named by handles that may only be valid
//! inside that channel. [`HandleResolver`] maps them to connection-level
//! handles and then to a [`ParticipantIdentity`] via the presence directory.
//! Direct peer-to-peer channels have no group capability; their senders are
//! resolved through the connection's alias lookup instead.

use std::sync::Arc;

use tracing::debug;

use crate::config::BridgeConfig;
use crate::errors::{BulletinError, Result};
use crate::transport::{Connection, GroupFlags, GroupMembership, PresenceDirectory, TransportChannel};
use crate::types::{ColorPair, Handle, ParticipantIdentity};

/// Resolves sender handles to participant identities
pub struct HandleResolver {
    connection: Arc<dyn Connection>,
    directory: Arc<dyn PresenceDirectory>,
    fallback_colors: ColorPair,
    unknown_name: String,
}

impl HandleResolver {
    pub fn new(
        connection: Arc<dyn Connection>,
        directory: Arc<dyn PresenceDirectory>,
        config: &BridgeConfig,
    ) -> Self {
        Self {
            connection,
            directory,
            fallback_colors: config.fallback_colors(),
            unknown_name: config.unknown_display_name.clone(),
        }
    }

    /// Resolve `handle` as seen on `channel`
    pub fn resolve(
        &self,
        channel: &dyn TransportChannel,
        handle: Handle,
    ) -> Result<ParticipantIdentity> {
        match channel.group() {
            Some(group) => self.resolve_group_member(group, handle),
            None => self.resolve_peer(handle),
        }
    }

    /// Map a group handle to its connection-level handle
    ///
    /// Our own group handle maps to the connection's self handle. Handles of
    /// a group with channel-specific handles go through owner translation,
    /// and a null owner is an error. Any other handle is already global.
    pub fn connection_handle(&self, group: &dyn GroupMembership, handle: Handle) -> Result<Handle> {
        if handle == group.self_handle() {
            return Ok(self.connection.self_handle());
        }

        if !group.flags().contains(GroupFlags::CHANNEL_SPECIFIC_HANDLES) {
            return Ok(handle);
        }

        let owners = group
            .handle_owners(&[handle])
            .map_err(|e| BulletinError::handle_resolution(handle, e.to_string()))?;
        match owners.first() {
            Some(owner) if !owner.is_none() => Ok(*owner),
            Some(_) => Err(BulletinError::handle_resolution(
                handle,
                "owner translation returned the null handle",
            )),
            None => Err(BulletinError::handle_resolution(
                handle,
                "owner translation returned no handle",
            )),
        }
    }

    /// Identity of the local user
    pub fn owner_identity(&self) -> ParticipantIdentity {
        ParticipantIdentity::from_record(
            &self.directory.owner(),
            true,
            self.fallback_colors,
            &self.unknown_name,
        )
    }

    /// Placeholder for senders that cannot be resolved
    pub fn unknown_identity(&self) -> ParticipantIdentity {
        ParticipantIdentity::unknown(self.unknown_name.clone(), self.fallback_colors)
    }

    fn resolve_group_member(
        &self,
        group: &dyn GroupMembership,
        handle: Handle,
    ) -> Result<ParticipantIdentity> {
        let global = self.connection_handle(group, handle)?;
        if global == self.connection.self_handle() {
            return Ok(self.owner_identity());
        }

        let record = self
            .directory
            .buddy_by_handle(global)
            .ok_or(BulletinError::UnresolvedHandle { handle: global })?;
        let is_self = record.same_buddy(&self.directory.owner());
        debug!(%handle, %global, "Resolved group member");

        Ok(ParticipantIdentity::from_record(
            &record,
            is_self,
            self.fallback_colors,
            &self.unknown_name,
        ))
    }

    fn resolve_peer(&self, handle: Handle) -> Result<ParticipantIdentity> {
        let aliases = self.connection.aliases(&[handle])?;
        let alias = aliases
            .into_iter()
            .next()
            .ok_or(BulletinError::UnresolvedHandle { handle })?;
        let is_self = handle == self.connection.self_handle();

        Ok(ParticipantIdentity::new(alias, self.fallback_colors, is_self))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::transport::{SignalKind, SubscriptionId, TransportResult};
    use crate::types::{BuddyRecord, MessageId, MessageKind, PendingMessage};
    use std::collections::HashMap;

    const CONN_SELF: Handle = Handle::new(1);

    struct TestConnection;

    impl Connection for TestConnection {
        fn self_handle(&self) -> Handle {
            CONN_SELF
        }

        fn aliases(&self, handles: &[Handle]) -> TransportResult<Vec<String>> {
            Ok(handles.iter().map(|h| format!("peer-{}", h)).collect())
        }
    }

    struct TestDirectory {
        buddies: HashMap<Handle, BuddyRecord>,
    }

    impl PresenceDirectory for TestDirectory {
        fn buddy_by_handle(&self, handle: Handle) -> Option<BuddyRecord> {
            self.buddies.get(&handle).cloned()
        }

        fn owner(&self) -> BuddyRecord {
            BuddyRecord::new("owner-key", "me", Some("#111111,#222222"))
        }
    }

    struct TestGroup {
        self_handle: Handle,
        flags: GroupFlags,
        owners: HashMap<Handle, Handle>,
    }

    impl GroupMembership for TestGroup {
        fn self_handle(&self) -> Handle {
            self.self_handle
        }

        fn flags(&self) -> GroupFlags {
            self.flags
        }

        fn handle_owners(&self, handles: &[Handle]) -> TransportResult<Vec<Handle>> {
            Ok(handles
                .iter()
                .map(|h| self.owners.get(h).copied().unwrap_or(Handle::NONE))
                .collect())
        }
    }

    struct TestChannel {
        group: Option<TestGroup>,
    }

    impl TransportChannel for TestChannel {
        fn connect_signal(&mut self, _kind: SignalKind) -> TransportResult<SubscriptionId> {
            Ok(SubscriptionId(1))
        }

        fn disconnect_signal(&mut self, _subscription: SubscriptionId) -> TransportResult<()> {
            Ok(())
        }

        fn send(&mut self, _kind: MessageKind, _text: &str) -> TransportResult<()> {
            Ok(())
        }

        fn list_pending(&mut self) -> TransportResult<Vec<PendingMessage>> {
            Ok(Vec::new())
        }

        fn acknowledge(&mut self, _ids: &[MessageId]) -> TransportResult<()> {
            Ok(())
        }

        fn close(&mut self) -> TransportResult<()> {
            Err(TransportError::unavailable("test channel"))
        }

        fn group(&self) -> Option<&dyn GroupMembership> {
            self.group.as_ref().map(|g| g as &dyn GroupMembership)
        }
    }

    fn resolver() -> HandleResolver {
        let mut buddies = HashMap::new();
        buddies.insert(Handle::new(20), BuddyRecord::new("k20", "alice", Some("#ff0000,#00ff00")));
        buddies.insert(Handle::new(30), BuddyRecord::new("k30", "bob", Some("broken")));
        HandleResolver::new(
            Arc::new(TestConnection),
            Arc::new(TestDirectory { buddies }),
            &BridgeConfig::default(),
        )
    }

    fn group(flags: GroupFlags) -> TestGroup {
        let mut owners = HashMap::new();
        owners.insert(Handle::new(200), Handle::new(20));
        TestGroup {
            self_handle: Handle::new(100),
            flags,
            owners,
        }
    }

    #[test]
    fn test_self_handle_maps_to_connection_self() {
        let resolver = resolver();
        let group = group(GroupFlags::CHANNEL_SPECIFIC_HANDLES);

        assert_eq!(resolver.connection_handle(&group, Handle::new(100)).unwrap(), CONN_SELF);

        let channel = TestChannel { group: Some(group) };
        let identity = resolver.resolve(&channel, Handle::new(100)).unwrap();
        assert!(identity.is_self);
        assert_eq!(identity.display_name, "me");
    }

    #[test]
    fn test_channel_specific_handles_are_translated() {
        let resolver = resolver();
        let channel = TestChannel {
            group: Some(group(GroupFlags::CHANNEL_SPECIFIC_HANDLES)),
        };

        let identity = resolver.resolve(&channel, Handle::new(200)).unwrap();
        assert_eq!(identity.display_name, "alice");
        assert!(!identity.is_self);
    }

    #[test]
    fn test_non_specific_handles_pass_through() {
        let resolver = resolver();
        let group = group(GroupFlags::empty());
        assert_eq!(resolver.connection_handle(&group, Handle::new(20)).unwrap(), Handle::new(20));
        assert_eq!(resolver.connection_handle(&group, Handle::new(999)).unwrap(), Handle::new(999));
    }

    #[test]
    fn test_null_owner_is_a_resolution_error() {
        let resolver = resolver();
        let group = group(GroupFlags::CHANNEL_SPECIFIC_HANDLES);
        let err = resolver.connection_handle(&group, Handle::new(555)).unwrap_err();
        assert!(matches!(err, BulletinError::HandleResolution { handle, .. } if handle == Handle::new(555)));
    }

    #[test]
    fn test_unknown_buddy_is_unresolved() {
        let resolver = resolver();
        let channel = TestChannel {
            group: Some(group(GroupFlags::empty())),
        };
        let err = resolver.resolve(&channel, Handle::new(77)).unwrap_err();
        assert_eq!(err, BulletinError::UnresolvedHandle { handle: Handle::new(77) });
    }

    #[test]
    fn test_malformed_buddy_colors_fall_back() {
        let resolver = resolver();
        let channel = TestChannel {
            group: Some(group(GroupFlags::empty())),
        };
        let identity = resolver.resolve(&channel, Handle::new(30)).unwrap();
        assert_eq!(identity.colors, ColorPair::default());
    }

    #[test]
    fn test_peer_channel_uses_alias_lookup() {
        let resolver = resolver();
        let channel = TestChannel { group: None };
        let identity = resolver.resolve(&channel, Handle::new(42)).unwrap();
        assert_eq!(identity.display_name, "peer-42");
        assert_eq!(identity.colors, ColorPair::default());
        assert!(!identity.is_self);
    }
}
