//! Identity registry: one anchor per normalized address, and the link graph
//! between anchors.
//!
//! Anchors live in a generational arena. Parents own their children and every
//! outgoing link; the `sources` list of a parent is a weak back-reference list
//! with one entry per edge that targets the parent or one of its children.
//! Deletion is a two-phase unlink-then-reclaim walk that only frees parents
//! without an attached document.

use std::collections::HashSet;

use crate::address;
use crate::anchor::{Anchor, AnchorId, ParentAnchor};
use crate::config::RegistryConfig;
use crate::link::{Link, LinkResult, LinkType, Method};
use crate::metadata::Metadata;
use crate::trace;

#[derive(Debug)]
struct Slot<D> {
    generation: u32,
    anchor: Option<Anchor<D>>,
}

/// Hash-indexed store of anchors, generic over the loaded-document handle `D`.
#[derive(Debug)]
pub struct Registry<D = ()> {
    slots: Vec<Slot<D>>,
    free: Vec<u32>,
    buckets: Vec<Vec<AnchorId>>,
    live: usize,
}

impl<D> Default for Registry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Registry<D> {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        let buckets = config.buckets.max(1);
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            buckets: (0..buckets).map(|_| Vec::new()).collect(),
            live: 0,
        }
    }

    /// Number of live anchors, parents and children together.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of live parent anchors.
    pub fn parent_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn contains(&self, id: AnchorId) -> bool {
        self.get(id).is_some()
    }

    /// Every live parent, bucket by bucket.
    pub fn parents(&self) -> impl Iterator<Item = AnchorId> + '_ {
        self.buckets.iter().flatten().copied()
    }

    // ------------------------------------------------------------------
    // Arena plumbing
    // ------------------------------------------------------------------

    fn get(&self, id: AnchorId) -> Option<&Anchor<D>> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.anchor.as_ref()
    }

    fn get_mut(&mut self, id: AnchorId) -> Option<&mut Anchor<D>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.anchor.as_mut()
    }

    fn alloc(&mut self, build: impl FnOnce(AnchorId) -> Anchor<D>) -> AnchorId {
        let id = match self.free.pop() {
            Some(index) => AnchorId {
                index,
                generation: self.slots[index as usize].generation,
            },
            None => {
                let index = u32::try_from(self.slots.len())
                    .unwrap_or_else(|_| panic!("anchor arena exhausted"));
                self.slots.push(Slot {
                    generation: 0,
                    anchor: None,
                });
                AnchorId {
                    index,
                    generation: 0,
                }
            }
        };
        self.slots[id.index as usize].anchor = Some(build(id));
        self.live += 1;
        id
    }

    fn release(&mut self, id: AnchorId) -> Option<Anchor<D>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let anchor = slot.anchor.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(anchor)
    }

    fn parent_anchor(&self, id: AnchorId) -> Option<&ParentAnchor<D>> {
        let parent = self.get(id)?.parent;
        self.get(parent)?.as_parent()
    }

    fn parent_anchor_mut(&mut self, id: AnchorId) -> Option<&mut ParentAnchor<D>> {
        let parent = self.get(id)?.parent;
        self.get_mut(parent)?.as_parent_mut()
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Resolve an address to its anchor, creating it on first sight.
    ///
    /// An address with a fragment resolves to a child of the parent for the
    /// fragment-less address. Otherwise the address is simplified and looked up
    /// by exact string match.
    pub fn find_address(&mut self, address: &str) -> AnchorId {
        let (base, tag) = address::split_fragment(address);
        if let Some(tag) = tag {
            let parent = self.find_parent(base);
            return self.new_or_existing_child(parent, Some(tag));
        }
        self.find_parent(base)
    }

    fn find_parent(&mut self, address: &str) -> AnchorId {
        let normalized = address::simplify(address);
        let hash = address::bucket_hash(&normalized, self.buckets.len());
        let existing = self.buckets[hash].iter().copied().find(|id| {
            self.get(*id)
                .and_then(Anchor::as_parent)
                .is_some_and(|p| p.address == normalized)
        });
        if let Some(id) = existing {
            trace!("anchor"; "parent {id} with address `{normalized}` already exists");
            return id;
        }
        let id = self.alloc(|id| Anchor::new_parent(id, normalized.clone()));
        self.buckets[hash].push(id);
        trace!("anchor"; "parent {id} with hash {hash} and address `{normalized}` created");
        id
    }

    /// Find the child of `parent` named `tag`, or create one.
    ///
    /// A missing or empty tag always creates a new anonymous child. A child
    /// handle is accepted in place of its parent.
    pub fn find_child(&mut self, parent: AnchorId, tag: Option<&str>) -> Option<AnchorId> {
        let parent = self.parent(parent)?;
        Some(self.new_or_existing_child(parent, tag))
    }

    fn new_or_existing_child(&mut self, parent: AnchorId, tag: Option<&str>) -> AnchorId {
        let tag = tag.filter(|t| !t.is_empty());
        if let Some(tag) = tag {
            let existing = self.parent_anchor(parent).and_then(|p| {
                p.children
                    .iter()
                    .copied()
                    .find(|child| self.get(*child).and_then(Anchor::tag) == Some(tag))
            });
            if let Some(child) = existing {
                trace!("anchor"; "child {child} of {parent} named `{tag}` already exists");
                return child;
            }
        }
        let child = self.alloc(|_| Anchor::new_child(parent, tag.map(str::to_string)));
        if let Some(p) = self.get_mut(parent).and_then(Anchor::as_parent_mut) {
            p.children.push_front(child);
        }
        trace!("anchor"; "child {child} named `{}` created under {parent}", tag.unwrap_or(""));
        child
    }

    /// Find or create a child and, when `href` is given, link it to the anchor
    /// `href` names relative to the parent's address.
    pub fn find_child_and_link(
        &mut self,
        parent: AnchorId,
        tag: Option<&str>,
        href: Option<&str>,
        link_type: Option<LinkType>,
    ) -> Option<AnchorId> {
        let child = self.find_child(parent, tag)?;
        if let Some(href) = href.filter(|h| !h.is_empty()) {
            let base = self.address(parent)?;
            let target = address::resolve_relative(href, &base);
            let dest = self.find_address(&target);
            self.link(child, dest, link_type, Method::Invalid);
        }
        Some(child)
    }

    // ------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------

    /// Add an edge from `source` to `dest`. Returns `false` if either is stale.
    pub fn link(
        &mut self,
        source: AnchorId,
        dest: AnchorId,
        link_type: Option<LinkType>,
        method: Method,
    ) -> bool {
        if !self.contains(source) || !self.contains(dest) {
            return false;
        }
        let link = Link::new(dest, link_type, method);
        if let Some(anchor) = self.get_mut(source) {
            if anchor.main_link.is_none() {
                anchor.main_link = Some(link);
            } else {
                anchor.links.push_front(link);
            }
        }
        if let Some(p) = self.parent_anchor_mut(dest) {
            p.sources.push(source);
        }
        trace!("anchor"; "linked {source} to {dest}");
        true
    }

    /// The edge from `src` to `dest`, main link first.
    pub fn find_link(&self, src: AnchorId, dest: AnchorId) -> Option<&Link> {
        self.get(src)?.outgoing().find(|l| l.dest == dest)
    }

    pub fn find_link_mut(&mut self, src: AnchorId, dest: AnchorId) -> Option<&mut Link> {
        let anchor = self.get_mut(src)?;
        if anchor.main_link.as_ref().is_some_and(|l| l.dest == dest) {
            return anchor.main_link.as_mut();
        }
        anchor.links.iter_mut().find(|l| l.dest == dest)
    }

    /// Record the outcome of an operation performed across the `src -> dest` edge.
    pub fn set_link_result(&mut self, src: AnchorId, dest: AnchorId, result: LinkResult) -> bool {
        match self.find_link_mut(src, dest) {
            Some(link) => {
                link.result = result;
                true
            }
            None => false,
        }
    }

    pub fn main_link(&self, id: AnchorId) -> Option<&Link> {
        self.get(id)?.main_link.as_ref()
    }

    /// Secondary links, most recent first. Empty for a stale handle.
    pub fn secondary_links(&self, id: AnchorId) -> impl Iterator<Item = &Link> {
        self.get(id).into_iter().flat_map(|a| a.links.iter())
    }

    /// Every outgoing edge, main link first.
    pub fn links(&self, id: AnchorId) -> impl Iterator<Item = &Link> {
        self.get(id).into_iter().flat_map(|a| a.outgoing())
    }

    pub fn follow_main_link(&self, id: AnchorId) -> Option<AnchorId> {
        self.main_link(id).map(|l| l.dest)
    }

    pub fn main_link_method(&self, id: AnchorId) -> Method {
        self.main_link(id).map_or(Method::Invalid, |l| l.method)
    }

    /// Destination of the first edge of the given type.
    pub fn follow_typed_link(&self, id: AnchorId, link_type: &LinkType) -> Option<AnchorId> {
        self.get(id)?
            .outgoing()
            .find(|l| l.link_type.as_ref() == Some(link_type))
            .map(|l| l.dest)
    }

    /// Promote the secondary link at `index` to main link.
    ///
    /// The previous main link, if any, moves to the front of the secondary list.
    pub fn make_main_link(&mut self, id: AnchorId, index: usize) -> bool {
        let Some(anchor) = self.get_mut(id) else {
            return false;
        };
        let Some(moving) = anchor.links.remove(index) else {
            return false;
        };
        if let Some(previous) = anchor.main_link.replace(moving) {
            anchor.links.push_front(previous);
        }
        true
    }

    /// Remove one edge from `src` to `dest`.
    pub fn remove_link(&mut self, src: AnchorId, dest: AnchorId) -> bool {
        let Some(anchor) = self.get_mut(src) else {
            return false;
        };
        let removed = if anchor.main_link.as_ref().is_some_and(|l| l.dest == dest) {
            anchor.main_link.take()
        } else {
            anchor
                .links
                .iter()
                .position(|l| l.dest == dest)
                .and_then(|pos| anchor.links.remove(pos))
        };
        if removed.is_none() {
            return false;
        }
        if let Some(p) = self.parent_anchor_mut(dest) {
            p.remove_source(src);
        }
        trace!("anchor"; "removed link from {src} to {dest}");
        true
    }

    /// Remove every outgoing edge of `id`.
    pub fn remove_all_links(&mut self, id: AnchorId) -> bool {
        let Some(anchor) = self.get_mut(id) else {
            return false;
        };
        for link in anchor.take_links() {
            if let Some(p) = self.parent_anchor_mut(link.dest) {
                p.remove_source(id);
            }
        }
        trace!("anchor"; "removed all links from {id}");
        true
    }

    /// Replace the outgoing edges of `dest` with those of `src`, leaving `src`
    /// without edges. Used when one identity substitutes another on redirect.
    pub fn move_all_links(&mut self, src: AnchorId, dest: AnchorId) -> bool {
        if !self.contains(src) || !self.contains(dest) {
            return false;
        }
        if src == dest {
            return true;
        }
        self.remove_all_links(dest);
        let (main, links) = match self.get_mut(src) {
            Some(anchor) => (anchor.main_link.take(), std::mem::take(&mut anchor.links)),
            None => return false,
        };
        for link in main.iter().chain(links.iter()) {
            if let Some(p) = self.parent_anchor_mut(link.dest) {
                p.remove_source(src);
                p.sources.push(dest);
            }
        }
        if let Some(anchor) = self.get_mut(dest) {
            anchor.main_link = main;
            anchor.links = links;
        }
        trace!("anchor"; "moved links from {src} to {dest}");
        true
    }

    /// Move a child to the front of its parent's children.
    pub fn make_last_child(&mut self, child: AnchorId) -> bool {
        let Some(parent) = self.get(child).map(|a| a.parent) else {
            return false;
        };
        if parent == child {
            return false;
        }
        let Some(p) = self.get_mut(parent).and_then(Anchor::as_parent_mut) else {
            return false;
        };
        if let Some(pos) = p.children.iter().position(|c| *c == child) {
            p.children.remove(pos);
        }
        p.children.push_front(child);
        true
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    /// Delete a parent anchor and, transitively, every unloaded anchor that only
    /// it kept alive.
    ///
    /// Nothing happens when the parent has a document attached. When other
    /// anchors still link here, the parent and its children survive but all of
    /// their outgoing edges are removed. Returns `true` if the parent was freed.
    pub fn delete(&mut self, id: AnchorId) -> bool {
        if !self.is_parent(id) {
            return false;
        }
        let mut in_progress = HashSet::new();
        self.delete_parent(id, &mut in_progress)
    }

    fn delete_parent(&mut self, id: AnchorId, in_progress: &mut HashSet<AnchorId>) -> bool {
        if !in_progress.insert(id) {
            return false;
        }
        let deleted = self.try_reclaim(id, in_progress);
        in_progress.remove(&id);
        deleted
    }

    fn try_reclaim(&mut self, id: AnchorId, in_progress: &mut HashSet<AnchorId>) -> bool {
        match self.get(id).and_then(Anchor::as_parent) {
            Some(p) if p.document.is_none() => {}
            _ => return false,
        }

        self.unlink(id, in_progress);

        let (referenced, children) = match self.get(id).and_then(Anchor::as_parent) {
            Some(p) => (
                !p.sources.is_empty(),
                p.children.iter().copied().collect::<Vec<_>>(),
            ),
            None => return false,
        };
        for child in &children {
            self.unlink(*child, in_progress);
        }
        if referenced {
            trace!("anchor"; "parent {id} still referenced, kept");
            return false;
        }

        for child in children {
            self.release(child);
        }
        if let Some(anchor) = self.release(id) {
            if let Some(p) = anchor.as_parent() {
                let hash = address::bucket_hash(&p.address, self.buckets.len());
                self.buckets[hash].retain(|other| *other != id);
                trace!("anchor"; "parent {id} `{}` deleted", p.address);
            }
        }
        true
    }

    /// Detach every outgoing edge of `id`, dropping the matching back-reference
    /// and trying to delete each unloaded target.
    fn unlink(&mut self, id: AnchorId, in_progress: &mut HashSet<AnchorId>) {
        let links = match self.get_mut(id) {
            Some(anchor) => anchor.take_links(),
            None => return,
        };
        for link in links {
            let Some(target) = self.parent(link.dest) else {
                continue;
            };
            let unloaded = match self.get_mut(target).and_then(Anchor::as_parent_mut) {
                Some(p) => {
                    p.remove_source(id);
                    p.document.is_none()
                }
                None => false,
            };
            if unloaded {
                self.delete_parent(target, in_progress);
            }
        }
    }

    /// Free every anchor and reset the table.
    ///
    /// Attached documents are handed back, bucket by bucket, so the caller can
    /// dispose of them.
    pub fn delete_all(&mut self) -> Vec<D> {
        let mut documents = Vec::new();
        let buckets = std::mem::take(&mut self.buckets);
        let bucket_count = buckets.len();
        for id in buckets.into_iter().flatten() {
            let Some(anchor) = self.release(id) else {
                continue;
            };
            if let Some(mut p) = anchor.into_parent() {
                if let Some(doc) = p.document.take() {
                    documents.push(doc);
                }
                for child in p.children.drain(..) {
                    self.release(child);
                }
            }
        }
        self.buckets = (0..bucket_count).map(|_| Vec::new()).collect();
        trace!("anchor"; "deleted all anchors, {} documents returned", documents.len());
        documents
    }

    // ------------------------------------------------------------------
    // Data access
    // ------------------------------------------------------------------

    /// Owning parent of `id`; a parent is its own parent.
    pub fn parent(&self, id: AnchorId) -> Option<AnchorId> {
        self.get(id).map(|a| a.parent)
    }

    pub fn is_parent(&self, id: AnchorId) -> bool {
        self.get(id).is_some_and(|a| a.parent == id)
    }

    /// Tag of a child anchor; `None` for parents and anonymous children.
    pub fn tag(&self, id: AnchorId) -> Option<&str> {
        self.get(id)?.tag()
    }

    /// Full address: the parent's address, plus `#tag` for a named child.
    pub fn address(&self, id: AnchorId) -> Option<String> {
        let anchor = self.get(id)?;
        let parent = self.get(anchor.parent)?.as_parent()?;
        Some(match anchor.tag() {
            Some(tag) => format!("{}#{tag}", parent.address),
            None => parent.address.clone(),
        })
    }

    pub fn has_children(&self, id: AnchorId) -> bool {
        self.get(id)
            .and_then(Anchor::as_parent)
            .is_some_and(|p| !p.children.is_empty())
    }

    /// Children of a parent, most recent first.
    pub fn children(&self, id: AnchorId) -> impl Iterator<Item = AnchorId> + '_ {
        self.get(id)
            .and_then(Anchor::as_parent)
            .into_iter()
            .flat_map(|p| p.children.iter().copied())
    }

    /// Back-references into a parent, one per incoming edge.
    pub fn sources(&self, id: AnchorId) -> &[AnchorId] {
        self.get(id)
            .and_then(Anchor::as_parent)
            .map(|p| p.sources.as_slice())
            .unwrap_or(&[])
    }

    /// Attach a loaded document, returning the one it replaces.
    pub fn set_document(&mut self, id: AnchorId, document: D) -> Option<D> {
        self.parent_anchor_mut(id)?.document.replace(document)
    }

    pub fn document(&self, id: AnchorId) -> Option<&D> {
        self.parent_anchor(id)?.document.as_ref()
    }

    /// Detach the loaded document, making the anchor deletable again.
    pub fn take_document(&mut self, id: AnchorId) -> Option<D> {
        self.parent_anchor_mut(id)?.document.take()
    }

    /// Metadata of the anchor's parent.
    pub fn meta(&self, id: AnchorId) -> Option<&Metadata> {
        Some(&self.parent_anchor(id)?.meta)
    }

    pub fn meta_mut(&mut self, id: AnchorId) -> Option<&mut Metadata> {
        Some(&mut self.parent_anchor_mut(id)?.meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_normalization_shares_identity() {
        let mut reg: Registry = Registry::new();
        let a = reg.find_address("http://h/a/b/../c");
        let b = reg.find_address("http://h/a/./c");
        let c = reg.find_address("http://h/a/c");
        assert_eq!(a, b);
        assert_eq!(b, c);
        let other = reg.find_address("http://h/a/d");
        assert_ne!(a, other);
        assert_eq!(reg.parent_count(), 2);
        assert_eq!(reg.address(a).as_deref(), Some("http://h/a/c"));
    }

    #[test]
    fn fragment_resolves_to_child_of_base() {
        let mut reg: Registry = Registry::new();
        let child = reg.find_address("http://h/doc#sec1");
        let parent = reg.find_address("http://h/doc");
        assert_eq!(reg.parent(child), Some(parent));
        assert!(!reg.is_parent(child));
        assert!(reg.is_parent(parent));
        assert_eq!(reg.tag(child), Some("sec1"));
        assert_eq!(reg.address(child).as_deref(), Some("http://h/doc#sec1"));
        assert_eq!(reg.find_address("http://h/doc#sec1"), child);
    }

    #[test]
    fn named_children_dedup_anonymous_do_not() {
        let mut reg: Registry = Registry::new();
        let p = reg.find_address("http://h/p");
        let a = reg.find_child(p, Some("sec1")).unwrap();
        let b = reg.find_child(p, Some("sec1")).unwrap();
        assert_eq!(a, b);
        let x = reg.find_child(p, Some("")).unwrap();
        let y = reg.find_child(p, None).unwrap();
        assert_ne!(x, y);
        assert_eq!(reg.children(p).count(), 3);
        assert_eq!(reg.children(p).next(), Some(y));
    }

    #[test]
    fn make_last_child_promotes_to_front() {
        let mut reg: Registry = Registry::new();
        let p = reg.find_address("http://h/p");
        let first = reg.find_child(p, Some("one")).unwrap();
        let _second = reg.find_child(p, Some("two")).unwrap();
        assert!(reg.make_last_child(first));
        assert_eq!(reg.children(p).next(), Some(first));
        assert!(!reg.make_last_child(p));
    }

    #[test]
    fn link_records_main_then_secondary_and_sources() {
        let mut reg: Registry = Registry::new();
        let a = reg.find_address("http://h/a");
        let b = reg.find_address("http://h/b");
        let c_child = reg.find_address("http://h/c#part");
        let c = reg.parent(c_child).unwrap();

        assert!(reg.link(a, b, Some("next".into()), Method::Get));
        assert!(reg.link(a, c_child, None, Method::Invalid));
        assert_eq!(reg.follow_main_link(a), Some(b));
        assert_eq!(reg.main_link_method(a), Method::Get);
        assert_eq!(reg.secondary_links(a).count(), 1);
        assert_eq!(reg.sources(b), &[a]);
        assert_eq!(reg.sources(c), &[a]);
        assert_eq!(reg.follow_typed_link(a, &"next".into()), Some(b));
        assert_eq!(reg.follow_typed_link(a, &"prev".into()), None);
    }

    #[test]
    fn link_rejects_stale_endpoints() {
        let mut reg: Registry = Registry::new();
        let a = reg.find_address("http://h/a");
        let b = reg.find_address("http://h/b");
        assert!(reg.delete(b));
        assert!(!reg.link(a, b, None, Method::Get));
        assert!(reg.main_link(a).is_none());
    }

    #[test]
    fn set_link_result_updates_in_place() {
        let mut reg: Registry = Registry::new();
        let a = reg.find_address("http://h/a");
        let b = reg.find_address("http://h/b");
        let c = reg.find_address("http://h/c");
        reg.link(a, b, None, Method::Post);
        reg.link(a, c, None, Method::Put);
        assert!(reg.set_link_result(a, c, LinkResult::Ok));
        assert_eq!(reg.find_link(a, c).map(|l| l.result), Some(LinkResult::Ok));
        assert_eq!(
            reg.find_link(a, b).map(|l| l.result),
            Some(LinkResult::Invalid)
        );
        assert!(!reg.set_link_result(b, a, LinkResult::Error));
    }

    #[test]
    fn make_main_link_swaps_with_secondary() {
        let mut reg: Registry = Registry::new();
        let n = reg.find_address("http://h/n");
        let b = reg.find_address("http://h/b");
        let c = reg.find_address("http://h/c");
        reg.link(n, b, None, Method::Get);
        reg.link(n, c, None, Method::Head);

        assert!(reg.make_main_link(n, 0));
        assert_eq!(reg.follow_main_link(n), Some(c));
        assert_eq!(reg.main_link_method(n), Method::Head);
        let secondary: Vec<_> = reg.secondary_links(n).map(|l| l.dest).collect();
        assert_eq!(secondary, vec![b]);
        assert!(!reg.make_main_link(n, 5));
    }

    #[test]
    fn remove_link_keeps_sources_in_step() {
        let mut reg: Registry = Registry::new();
        let a = reg.find_address("http://h/a");
        let b = reg.find_address("http://h/b");
        let c = reg.find_address("http://h/c");
        reg.link(a, b, None, Method::Get);
        reg.link(a, c, None, Method::Get);
        assert!(reg.remove_link(a, c));
        assert!(reg.sources(c).is_empty());
        assert!(!reg.remove_link(a, c));
        assert!(reg.remove_link(a, b));
        assert!(reg.main_link(a).is_none());
        assert!(reg.sources(b).is_empty());
    }

    #[test]
    fn move_all_links_transfers_edges() {
        let mut reg: Registry = Registry::new();
        let old = reg.find_address("http://h/old");
        let new = reg.find_address("http://h/new");
        let x = reg.find_address("http://h/x");
        let y = reg.find_address("http://h/y");
        let z = reg.find_address("http://h/z");
        reg.link(old, x, None, Method::Get);
        reg.link(old, y, None, Method::Get);
        reg.link(new, z, None, Method::Get);

        assert!(reg.move_all_links(old, new));
        assert!(reg.main_link(old).is_none());
        assert_eq!(reg.secondary_links(old).count(), 0);
        assert_eq!(reg.follow_main_link(new), Some(x));
        assert_eq!(reg.secondary_links(new).next().map(|l| l.dest), Some(y));
        assert_eq!(reg.sources(x), &[new]);
        assert_eq!(reg.sources(y), &[new]);
        assert!(reg.sources(z).is_empty());
    }

    #[test]
    fn find_child_and_link_resolves_relative_href() {
        let mut reg: Registry = Registry::new();
        let page = reg.find_address("http://h/dir/page.html");
        let child = reg
            .find_child_and_link(page, Some("ref"), Some("../other.html#top"), None)
            .unwrap();
        let dest = reg.follow_main_link(child).unwrap();
        assert_eq!(reg.address(dest).as_deref(), Some("http://h/other.html#top"));
        let dest_parent = reg.parent(dest).unwrap();
        assert_eq!(reg.sources(dest_parent), &[child]);

        let bare = reg.find_child_and_link(page, None, None, None).unwrap();
        assert!(reg.main_link(bare).is_none());
    }

    #[test]
    fn document_guards_deletion() {
        let mut reg: Registry<&'static str> = Registry::new();
        let a = reg.find_address("http://h/a");
        let b = reg.find_address("http://h/b");
        reg.link(b, a, None, Method::Get);
        assert_eq!(reg.set_document(a, "doc"), None);
        assert!(!reg.delete(a));
        assert!(reg.contains(a));
        assert_eq!(reg.document(a), Some(&"doc"));
        // deleting the referrer must not collect the loaded target
        assert!(reg.delete(b));
        assert!(reg.contains(a));
        assert_eq!(reg.take_document(a), Some("doc"));
        assert!(reg.delete(a));
    }

    #[test]
    fn unreferenced_chain_collapses() {
        let mut reg: Registry = Registry::new();
        let a = reg.find_address("http://h/a");
        let b = reg.find_address("http://h/b");
        let c = reg.find_address("http://h/c");
        reg.link(a, b, None, Method::Get);
        reg.link(b, c, None, Method::Get);
        assert!(reg.delete(a));
        assert!(!reg.contains(a));
        assert!(!reg.contains(b));
        assert!(!reg.contains(c));
        assert!(reg.is_empty());
        assert_eq!(reg.parent_count(), 0);
    }

    #[test]
    fn shared_target_survives() {
        let mut reg: Registry = Registry::new();
        let a = reg.find_address("http://h/a");
        let b = reg.find_address("http://h/b");
        let d = reg.find_address("http://h/d");
        reg.link(a, b, None, Method::Get);
        reg.link(d, b, None, Method::Get);
        assert!(reg.delete(a));
        assert!(reg.contains(b));
        assert_eq!(reg.sources(b), &[d]);
        assert_eq!(reg.follow_main_link(d), Some(b));
    }

    #[test]
    fn referenced_parent_survives_but_children_lose_edges() {
        let mut reg: Registry = Registry::new();
        let p = reg.find_address("http://h/p");
        let referrer = reg.find_address("http://h/r");
        let target = reg.find_address("http://h/t");
        reg.link(referrer, p, None, Method::Get);
        let child = reg.find_child(p, Some("s")).unwrap();
        reg.link(child, target, None, Method::Get);

        assert!(!reg.delete(p));
        assert!(reg.contains(p));
        assert!(reg.contains(child));
        assert!(reg.main_link(child).is_none());
        assert!(!reg.contains(target));
    }

    #[test]
    fn cycles_are_collected() {
        let mut reg: Registry = Registry::new();
        let a = reg.find_address("http://h/a");
        let b = reg.find_address("http://h/b");
        reg.link(a, b, None, Method::Get);
        reg.link(b, a, None, Method::Get);
        reg.link(a, a, None, Method::Get);
        assert!(reg.delete(a));
        assert!(!reg.contains(a));
        assert!(!reg.contains(b));
        assert!(reg.is_empty());
    }

    #[test]
    fn freed_handles_do_not_alias_new_anchors() {
        let mut reg: Registry = Registry::new();
        let a = reg.find_address("http://h/a");
        assert!(reg.delete(a));
        let b = reg.find_address("http://h/b");
        assert_eq!(a.index, b.index);
        assert_ne!(a, b);
        assert!(!reg.contains(a));
        assert_eq!(reg.address(a), None);
    }

    #[test]
    fn delete_all_returns_documents_and_empties() {
        let mut reg: Registry<u32> = Registry::new();
        let a = reg.find_address("http://h/a");
        let b = reg.find_address("http://h/b#frag");
        reg.find_address("http://h/c");
        reg.set_document(a, 1);
        reg.set_document(b, 2);
        let mut docs = reg.delete_all();
        docs.sort();
        assert_eq!(docs, vec![1, 2]);
        assert!(reg.is_empty());
        assert_eq!(reg.parent_count(), 0);
        assert!(!reg.contains(a));
        let again = reg.find_address("http://h/a");
        assert_ne!(again, a);
    }

    #[test]
    fn metadata_is_shared_by_children() {
        let mut reg: Registry = Registry::new();
        let child = reg.find_address("http://h/m#x");
        let parent = reg.parent(child).unwrap();
        reg.meta_mut(child).unwrap().set_title("Doc");
        assert_eq!(reg.meta(parent).and_then(Metadata::title), Some("Doc"));
    }
}
