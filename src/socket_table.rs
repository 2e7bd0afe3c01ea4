//! Registered descriptors and the interest sets derived from them.

use std::collections::{BTreeSet, HashMap};
use std::os::unix::io::RawFd;

use crate::reactor::Callback;
use crate::selector::Interest;
use crate::sockops::{self, Group, Priority, SockOps};

pub(crate) struct Entry<R> {
    /// Event bits; the notify request is kept apart in `notify`.
    pub(crate) ops: SockOps,
    /// Dispatch to an entry without a callback is a silent no-op.
    pub(crate) callback: Option<Callback<R>>,
    pub(crate) context: R,
    pub(crate) priority: Priority,
    /// Set when the mask carried [`sockops::UNREGISTER`] at registration.
    pub(crate) notify: bool,
}

/// State after clearing bits from an entry.
pub(crate) enum Cleared<R> {
    Unknown,
    StillActive,
    /// The mask is now zero; the entry is still present.
    Idle {
        notify: Option<(Callback<R>, R)>,
    },
}

pub(crate) struct SocketTable<R> {
    entries: HashMap<RawFd, Entry<R>>,
    read: BTreeSet<RawFd>,
    write: BTreeSet<RawFd>,
    except: BTreeSet<RawFd>,
    all: BTreeSet<RawFd>,
    max_fd: Option<RawFd>,
}

impl<R> Default for SocketTable<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            read: BTreeSet::new(),
            write: BTreeSet::new(),
            except: BTreeSet::new(),
            all: BTreeSet::new(),
            max_fd: None,
        }
    }
}

impl<R: Clone> SocketTable<R> {
    /// Insert or overwrite the entry for `fd`, then OR `fd` into every group
    /// the new mask touches. Groups are only left through [`Self::clear`].
    pub(crate) fn register(
        &mut self,
        fd: RawFd,
        context: R,
        ops: SockOps,
        callback: Option<Callback<R>>,
        priority: Priority,
    ) {
        let entry = Entry {
            ops: ops & !sockops::UNREGISTER,
            callback,
            context,
            priority,
            notify: sockops::mask_has(ops, sockops::UNREGISTER),
        };
        self.entries.insert(fd, entry);
        for group in Group::DISPATCH_ORDER {
            if sockops::mask_has(ops, group.bits()) {
                self.set_mut(group).insert(fd);
            }
        }
        self.all.insert(fd);
        if self.max_fd.is_none_or(|max| fd > max) {
            self.max_fd = Some(fd);
        }
    }

    /// Clear `ops` from `fd`, dropping it from every group left without bits.
    pub(crate) fn clear(&mut self, fd: RawFd, ops: SockOps) -> Cleared<R> {
        let Some(entry) = self.entries.get_mut(&fd) else {
            return Cleared::Unknown;
        };
        entry.ops &= !ops;
        let remaining = entry.ops;
        // The notify request is consumed so a re-entrant unregister cannot repeat it.
        let notify = if remaining == 0 && entry.notify {
            entry.notify = false;
            entry
                .callback
                .clone()
                .map(|callback| (callback, entry.context.clone()))
        } else {
            None
        };
        for group in Group::DISPATCH_ORDER {
            if !sockops::mask_has(remaining, group.bits()) {
                self.set_mut(group).remove(&fd);
            }
        }
        if remaining == 0 {
            Cleared::Idle { notify }
        } else {
            Cleared::StillActive
        }
    }

    /// Free the entry for `fd` if its mask is still zero.
    pub(crate) fn release_if_idle(&mut self, fd: RawFd) -> bool {
        if !self.entries.get(&fd).is_some_and(|e| e.ops == 0) {
            return false;
        }
        self.entries.remove(&fd);
        self.all.remove(&fd);
        if self.max_fd == Some(fd) {
            self.max_fd = self.all.last().copied();
        }
        true
    }

    pub(crate) fn retrieve(&self, fd: RawFd) -> Option<(Option<Callback<R>>, R)> {
        self.entries
            .get(&fd)
            .map(|e| (e.callback.clone(), e.context.clone()))
    }
}

impl<R> SocketTable<R> {
    fn set(&self, group: Group) -> &BTreeSet<RawFd> {
        match group {
            Group::Read => &self.read,
            Group::Write => &self.write,
            Group::Except => &self.except,
        }
    }

    fn set_mut(&mut self, group: Group) -> &mut BTreeSet<RawFd> {
        match group {
            Group::Read => &mut self.read,
            Group::Write => &mut self.write,
            Group::Except => &mut self.except,
        }
    }

    pub(crate) fn in_group(&self, fd: RawFd, group: Group) -> bool {
        self.set(group).contains(&fd)
    }

    pub(crate) fn ops(&self, fd: RawFd) -> Option<SockOps> {
        self.entries.get(&fd).map(|e| e.ops)
    }

    pub(crate) fn priority(&self, fd: RawFd) -> Option<Priority> {
        self.entries.get(&fd).map(|e| e.priority)
    }

    pub(crate) fn contains(&self, fd: RawFd) -> bool {
        self.entries.contains_key(&fd)
    }

    pub(crate) fn descriptors(&self) -> Vec<RawFd> {
        self.all.iter().copied().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn max_fd(&self) -> Option<RawFd> {
        self.max_fd
    }

    /// Drop every entry and empty every set.
    pub(crate) fn clear_all(&mut self) {
        self.entries.clear();
        self.read.clear();
        self.write.clear();
        self.except.clear();
        self.all.clear();
        self.max_fd = None;
    }

    /// One interest per descriptor present in any group, ascending.
    pub(crate) fn interests(&self) -> Vec<Interest> {
        self.all
            .iter()
            .map(|&fd| Interest {
                fd,
                read: self.read.contains(&fd),
                write: self.write.contains(&fd),
                except: self.except.contains(&fd),
            })
            .filter(|i| i.read || i.write || i.except)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sockops::{OOB, READ, UNREGISTER, WRITE};
    use crate::reactor::callback;

    fn noop() -> Option<Callback<()>> {
        Some(callback(|_, _, _, _| Ok(())))
    }

    #[test]
    fn mask_algebra_tracks_groups() {
        let mut table = SocketTable::<()>::default();
        table.register(5, (), READ | WRITE, noop(), 0);
        assert!(table.in_group(5, Group::Read));
        assert!(table.in_group(5, Group::Write));
        assert!(!table.in_group(5, Group::Except));

        assert!(matches!(table.clear(5, WRITE), Cleared::StillActive));
        assert!(table.in_group(5, Group::Read));
        assert!(!table.in_group(5, Group::Write));

        assert!(matches!(
            table.clear(5, READ),
            Cleared::Idle { notify: None }
        ));
        assert!(table.contains(5));
        assert!(table.release_if_idle(5));
        assert!(!table.contains(5));
        assert!(table.interests().is_empty());
    }

    #[test]
    fn register_overwrites_mask_but_ors_groups() {
        let mut table = SocketTable::<()>::default();
        table.register(3, (), READ | UNREGISTER, noop(), 0);
        table.register(3, (), OOB, noop(), 1);
        assert_eq!(table.ops(3), Some(OOB));
        assert_eq!(table.priority(3), Some(1));
        assert!(table.in_group(3, Group::Read));
        assert!(table.in_group(3, Group::Except));
        assert!(matches!(
            table.clear(3, OOB),
            Cleared::Idle { notify: None }
        ));
        assert!(!table.in_group(3, Group::Read));
        assert!(!table.in_group(3, Group::Except));
    }

    #[test]
    fn clearing_a_missing_group_drops_stale_membership() {
        let mut table = SocketTable::<()>::default();
        table.register(4, (), READ, noop(), 0);
        table.register(4, (), WRITE, noop(), 0);
        assert!(table.in_group(4, Group::Read));
        assert!(table.in_group(4, Group::Write));
        assert!(matches!(table.clear(4, READ), Cleared::StillActive));
        assert!(!table.in_group(4, Group::Read));
        assert!(table.in_group(4, Group::Write));
    }

    #[test]
    fn entry_without_callback_has_nothing_to_notify() {
        let mut table = SocketTable::<()>::default();
        table.register(5, (), READ | UNREGISTER, None, 0);
        assert!(matches!(table.retrieve(5), Some((None, ()))));
        assert!(matches!(
            table.clear(5, READ),
            Cleared::Idle { notify: None }
        ));
    }

    #[test]
    fn clear_all_resets_everything() {
        let mut table = SocketTable::<()>::default();
        table.register(3, (), READ | WRITE | OOB, noop(), 0);
        table.register(8, (), WRITE, noop(), 0);
        table.clear_all();
        assert_eq!(table.len(), 0);
        assert_eq!(table.max_fd(), None);
        assert!(table.interests().is_empty());
        assert!(table.descriptors().is_empty());
        assert!(!table.in_group(3, Group::Except));
    }

    #[test]
    fn high_water_mark_rescans_on_free() {
        let mut table = SocketTable::<()>::default();
        for fd in [4, 9, 7] {
            table.register(fd, (), READ, noop(), 0);
        }
        assert_eq!(table.max_fd(), Some(9));
        table.clear(9, READ);
        table.release_if_idle(9);
        assert_eq!(table.max_fd(), Some(7));
        table.clear(4, READ);
        table.release_if_idle(4);
        assert_eq!(table.max_fd(), Some(7));
        assert_eq!(table.descriptors(), vec![7]);
    }

    fn noop_u8() -> Option<Callback<u8>> {
        Some(callback(|_, _, _, _| Ok(())))
    }

    #[test]
    fn notify_flag_hands_back_callback() {
        let mut table = SocketTable::<u8>::default();
        table.register(6, 42, WRITE | READ | UNREGISTER, noop_u8(), 0);
        assert_eq!(table.ops(6), Some(WRITE | READ));
        assert!(matches!(table.clear(6, WRITE), Cleared::StillActive));
        match table.clear(6, READ) {
            Cleared::Idle { notify: Some((_, ctx)) } => assert_eq!(ctx, 42),
            _ => panic!("expected notify"),
        }
        table.register(6, 42, READ | UNREGISTER, noop_u8(), 0);
        table.clear(6, READ);
        assert!(matches!(table.clear(6, READ), Cleared::Idle { notify: None }));
    }
}
