use std::fmt;

use dagpath_wire::ContentAddress;

use crate::node::Node;
use crate::prototype::Prototype;

/// A directed edge to another block.
///
/// A link is nothing more than the address it carries plus optional hints:
/// a cached `size` of the target and, for typed links, the `target`
/// prototype the block should be decoded into. Traversing a link means
/// fetching the block its address denotes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub address: ContentAddress,
    pub size: Option<u64>,
    pub target: Option<Prototype>,
}

impl Link {
    #[must_use]
    pub fn new(address: ContentAddress) -> Self {
        Self {
            address,
            size: None,
            target: None,
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Mark this link as typed: its target decodes into `prototype`.
    #[must_use]
    pub fn typed(mut self, prototype: Prototype) -> Self {
        self.target = Some(prototype);
        self
    }
}

impl From<ContentAddress> for Link {
    fn from(address: ContentAddress) -> Self {
        Self::new(address)
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Link");
        s.field("address", &format_args!("{}", self.address));
        if let Some(size) = self.size {
            s.field("size", &size);
        }
        if let Some(target) = self.target {
            s.field("target", &target);
        }
        s.finish()
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.address, f)
    }
}

/// Where a link was found: the node it was read from, the segment that
/// selected it, and the link itself.
///
/// Handed to the prototype chooser and the reifier so their decisions can
/// depend on *where* an address came from. The root of a resolution has an
/// empty context.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinkContext<'a> {
    pub parent: Option<&'a Node>,
    pub segment: Option<&'a str>,
    pub link: Option<&'a Link>,
}

impl<'a> LinkContext<'a> {
    /// The context of a resolution root.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn child(parent: &'a Node, segment: &'a str, link: &'a Link) -> Self {
        Self {
            parent: Some(parent),
            segment: Some(segment),
            link: Some(link),
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.link.is_none()
    }
}
