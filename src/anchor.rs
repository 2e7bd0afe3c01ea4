//! Anchor nodes stored in the registry arena.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

use crate::link::Link;
use crate::metadata::Metadata;

/// Handle to an anchor in a [`crate::Registry`].
///
/// Handles carry a generation so a handle to a freed anchor never aliases a
/// later anchor that reuses the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AnchorId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}.{}", self.index, self.generation)
    }
}

/// One node of the resource graph, parent or child.
#[derive(Debug)]
pub(crate) struct Anchor<D> {
    /// Owning parent; equal to the anchor's own id for parents.
    pub(crate) parent: AnchorId,
    pub(crate) main_link: Option<Link>,
    /// Secondary links, most recent first.
    pub(crate) links: VecDeque<Link>,
    pub(crate) kind: AnchorKind<D>,
}

#[derive(Debug)]
pub(crate) enum AnchorKind<D> {
    Parent(Box<ParentAnchor<D>>),
    Child { tag: Option<String> },
}

#[derive(Debug)]
pub(crate) struct ParentAnchor<D> {
    pub(crate) address: String,
    /// Children, most recently created or promoted first.
    pub(crate) children: VecDeque<AnchorId>,
    /// Sources of every edge into this parent or its children, one entry per edge.
    pub(crate) sources: Vec<AnchorId>,
    pub(crate) document: Option<D>,
    pub(crate) meta: Metadata,
}

impl<D> Anchor<D> {
    pub(crate) fn new_parent(id: AnchorId, address: String) -> Self {
        Self {
            parent: id,
            main_link: None,
            links: VecDeque::new(),
            kind: AnchorKind::Parent(Box::new(ParentAnchor {
                address,
                children: VecDeque::new(),
                sources: Vec::new(),
                document: None,
                meta: Metadata::default(),
            })),
        }
    }

    pub(crate) fn new_child(parent: AnchorId, tag: Option<String>) -> Self {
        Self {
            parent,
            main_link: None,
            links: VecDeque::new(),
            kind: AnchorKind::Child { tag },
        }
    }

    pub(crate) fn as_parent(&self) -> Option<&ParentAnchor<D>> {
        match &self.kind {
            AnchorKind::Parent(p) => Some(p),
            AnchorKind::Child { .. } => None,
        }
    }

    pub(crate) fn as_parent_mut(&mut self) -> Option<&mut ParentAnchor<D>> {
        match &mut self.kind {
            AnchorKind::Parent(p) => Some(p),
            AnchorKind::Child { .. } => None,
        }
    }

    pub(crate) fn into_parent(self) -> Option<Box<ParentAnchor<D>>> {
        match self.kind {
            AnchorKind::Parent(p) => Some(p),
            AnchorKind::Child { .. } => None,
        }
    }

    pub(crate) fn tag(&self) -> Option<&str> {
        match &self.kind {
            AnchorKind::Child { tag } => tag.as_deref(),
            AnchorKind::Parent(_) => None,
        }
    }

    /// Main link followed by secondary links.
    pub(crate) fn outgoing(&self) -> impl Iterator<Item = &Link> {
        self.main_link.iter().chain(self.links.iter())
    }

    /// Detach every outgoing edge, main link first.
    pub(crate) fn take_links(&mut self) -> Vec<Link> {
        let mut out = Vec::with_capacity(self.links.len() + 1);
        out.extend(self.main_link.take());
        out.extend(self.links.drain(..));
        out
    }
}

impl<D> ParentAnchor<D> {
    /// Drop one back-reference from `source`, if any.
    pub(crate) fn remove_source(&mut self, source: AnchorId) -> bool {
        match self.sources.iter().position(|s| *s == source) {
            Some(pos) => {
                self.sources.remove(pos);
                true
            }
            None => false,
        }
    }
}
