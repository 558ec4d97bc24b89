//! The relay's watched-set.

use std::collections::BTreeMap;

use crate::mux::Handle;

/// Handles the relay submits to every wait: the listening endpoint plus one
/// entry per live accepted connection.
///
/// The listener is fixed at construction and cannot be removed. Peers are
/// kept ordered by handle, which is the order broadcasts visit them in.
#[derive(Debug)]
pub struct WatchedSet<C> {
    listener: Handle,
    peers: BTreeMap<Handle, C>,
}

impl<C> WatchedSet<C> {
    pub fn new(listener: Handle) -> Self {
        Self {
            listener,
            peers: BTreeMap::new(),
        }
    }

    pub fn listener(&self) -> Handle {
        self.listener
    }

    /// Adds a peer, returning the connection previously stored under the
    /// same handle, if any. The listener handle is never stored as a peer.
    pub fn insert(&mut self, handle: Handle, connection: C) -> Option<C> {
        if handle == self.listener {
            return Some(connection);
        }
        self.peers.insert(handle, connection)
    }

    pub fn remove(&mut self, handle: Handle) -> Option<C> {
        self.peers.remove(&handle)
    }

    pub fn get(&self, handle: Handle) -> Option<&C> {
        self.peers.get(&handle)
    }

    /// True for the listener and for every live peer.
    pub fn contains(&self, handle: Handle) -> bool {
        handle == self.listener || self.peers.contains_key(&handle)
    }

    /// Snapshot of every member, in ascending order.
    pub fn interest(&self) -> Vec<Handle> {
        let mut interest = Vec::with_capacity(self.peers.len() + 1);
        interest.push(self.listener);
        interest.extend(self.peers.keys().copied());
        interest.sort_unstable();
        interest
    }

    /// Every peer except `sender`, ascending.
    pub fn recipients(&self, sender: Handle) -> impl Iterator<Item = (Handle, &C)> {
        self.peers
            .iter()
            .filter(move |(handle, _)| **handle != sender)
            .map(|(handle, connection)| (*handle, connection))
    }

    /// Highest member handle. Always at least the listener.
    pub fn max_handle(&self) -> Handle {
        self.peers
            .keys()
            .next_back()
            .copied()
            .map_or(self.listener, |last| last.max(self.listener))
    }

    /// Number of live peers; the listener is not counted.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::os::fd::RawFd;

    use super::*;

    fn handle(fd: RawFd) -> Handle {
        Handle::of(&fd)
    }

    #[test]
    fn listener_is_always_a_member() {
        let mut set: WatchedSet<&str> = WatchedSet::new(handle(3));
        assert!(set.contains(handle(3)));
        assert_eq!(set.interest(), vec![handle(3)]);
        assert_eq!(set.max_handle(), handle(3));

        assert!(set.remove(handle(3)).is_none());
        assert!(set.contains(handle(3)));
        assert_eq!(set.insert(handle(3), "impostor"), Some("impostor"));
        assert!(set.is_empty());
    }

    #[test]
    fn interest_is_ascending_and_includes_listener() {
        let mut set = WatchedSet::new(handle(4));
        set.insert(handle(9), "carol");
        set.insert(handle(5), "alice");
        set.insert(handle(7), "bob");

        assert_eq!(
            set.interest(),
            vec![handle(4), handle(5), handle(7), handle(9)]
        );
        assert_eq!(set.len(), 3);
        assert_eq!(set.max_handle(), handle(9));
    }

    #[test]
    fn recipients_exclude_sender_and_listener() {
        let mut set = WatchedSet::new(handle(3));
        set.insert(handle(6), "carol");
        set.insert(handle(4), "alice");
        set.insert(handle(5), "bob");

        let names: Vec<_> = set.recipients(handle(5)).map(|(_, name)| *name).collect();
        assert_eq!(names, vec!["alice", "carol"]);
    }

    #[test]
    fn removing_one_peer_leaves_the_rest() {
        let mut set = WatchedSet::new(handle(3));
        set.insert(handle(4), "alice");
        set.insert(handle(5), "bob");
        set.insert(handle(6), "carol");

        assert_eq!(set.remove(handle(6)), Some("carol"));
        assert_eq!(set.remove(handle(6)), None);
        assert_eq!(set.interest(), vec![handle(3), handle(4), handle(5)]);
        assert_eq!(set.max_handle(), handle(5));

        let remaining: Vec<_> = set
            .recipients(set.listener())
            .map(|(_, name)| *name)
            .collect();
        assert_eq!(remaining, vec!["alice", "bob"]);
    }

    #[test]
    fn max_handle_covers_a_listener_above_all_peers() {
        let mut set = WatchedSet::new(handle(10));
        set.insert(handle(4), "alice");
        assert_eq!(set.max_handle(), handle(10));
    }
}
