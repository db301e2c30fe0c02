use dagpath_types::{
    BlockError, BlockSource, BoxFuture, ContentAddress, Interrupt, Link, LinkContext, Node,
    Prototype, ResolveContext, Step,
};

use crate::config::{ReifyPolicy, ResolverConfig};
use crate::error::{ReifyError, ResolveError};
use crate::reify::{Lookup, NodeLoader};

/// The outcome of [`Resolver::resolve_path`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    /// The node at the end of the path. For a path ending inside a block,
    /// this is the inline sub-node, not the whole block.
    pub node: Node,
    /// A direct link to the block containing `node`.
    pub link: Link,
}

/// The outcome of [`Resolver::resolve_to_last_node`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastNode {
    /// The last content-addressed link reached. Its block was not fetched
    /// if the path ended on it.
    pub link: Link,
    /// Segments resolved inside `link`'s block after it was reached, in
    /// path order. Empty when the path ended on a link.
    pub remainder: Vec<String>,
}

/// Resolve one segment on an already decoded node, without fetching.
///
/// This is the single step every resolution is built from, exposed for
/// callers that hold a node and want to look one edge ahead.
#[must_use]
pub fn resolve_single(node: &Node, segment: &str) -> Step {
    node.resolve_segment(segment)
}

/// Walks a Merkle DAG from a root address along a path of segments.
///
/// The resolver owns a [`BlockSource`] and a [`ResolverConfig`]; it holds
/// no other state, so one resolver serves any number of concurrent
/// resolutions.
///
/// ```text
///  segments ──▶ ┌───────────────┐  address   ┌─────────────┐
///               │ link resolver │──────────▶ │ BlockSource │
///               │     loop      │ ◀──────────│             │
///               └───────┬───────┘   bytes    └─────────────┘
///                       │
///                       ▼
///        chooser ──▶ decoder ──▶ reifier ──▶ Node::resolve_segment
/// ```
///
/// Each iteration:
///
///   1. Check the context for cancellation or an expired deadline.
///   2. Fetch the block, racing the fetch against the context.
///   3. Choose a prototype from the address and link context, decode.
///   4. If segments remain, let the reifier look up the next one, loading
///      only what that lookup needs. If the block ends the walk, reify it
///      whole. Either is subject to the configured [`ReifyPolicy`].
///   5. Resolve segments on the node until one crosses into another
///      block; that link becomes the next address.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use dagpath_encoder::{DagBuilder, MemoryBlockStore};
/// use dagpath_resolver::Resolver;
/// use dagpath_types::{Node, ResolveContext, Value};
///
/// let store = Arc::new(MemoryBlockStore::new());
/// let root = DagBuilder::new(store.clone())
///     .put_value(&Value::map([("greeting", Value::String("hi".into()))]))
///     .unwrap();
///
/// let resolver = Resolver::new(store);
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let resolved = rt
///     .block_on(resolver.resolve_path(&ResolveContext::background(), &root.address, &["greeting"]))
///     .unwrap();
/// assert_eq!(resolved.node, Node::Value(Value::String("hi".into())));
/// ```
pub struct Resolver<S> {
    source: S,
    config: ResolverConfig,
}

/// Per-resolution bookkeeping for the walk.
struct Walk {
    node: Node,
    link: Link,
    consumed: Vec<String>,
    remainder: Vec<String>,
    components: Vec<Node>,
    /// The reifier's answer for the next segment, if it looked it up.
    pending: Option<Lookup>,
}

/// A block the walk is entering and how it got there.
#[derive(Clone, Copy)]
struct Hop<'a> {
    link: &'a Link,
    link_ctx: LinkContext<'a>,
    consumed: &'a [String],
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// Fetch and decode the final target.
    AtNode,
    /// Stop on the final link without fetching it.
    AtLastLink,
}

impl<S: BlockSource> Resolver<S> {
    /// A resolver with the default configuration.
    pub fn new(source: S) -> Self {
        Self::with_config(source, ResolverConfig::default())
    }

    pub fn with_config(source: S, config: ResolverConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve the whole path and return the node it ends on.
    ///
    /// The final target is always fetched and decoded.
    ///
    /// # Errors
    ///
    /// Any [`ResolveError`]; see its table.
    #[tracing::instrument(level = "debug", skip_all, fields(root = %root, segments = segments.len()))]
    pub async fn resolve_path<P: AsRef<str> + Sync>(
        &self,
        ctx: &ResolveContext,
        root: &ContentAddress,
        segments: &[P],
    ) -> Result<Resolved, ResolveError> {
        let walk = self.walk(ctx, root, segments, Stop::AtNode, false).await?;
        Ok(Resolved {
            node: walk.node,
            link: walk.link,
        })
    }

    /// Resolve as far as the last content-addressed link on the path.
    ///
    /// If the path ends on a link, that link is returned without fetching
    /// its block. If the path ends inside a block, the link to that block is
    /// returned together with the segments resolved inside it. With no
    /// segments at all, the root is returned and nothing is fetched.
    ///
    /// # Errors
    ///
    /// Any [`ResolveError`]; see its table.
    #[tracing::instrument(level = "debug", skip_all, fields(root = %root, segments = segments.len()))]
    pub async fn resolve_to_last_node<P: AsRef<str> + Sync>(
        &self,
        ctx: &ResolveContext,
        root: &ContentAddress,
        segments: &[P],
    ) -> Result<LastNode, ResolveError> {
        if segments.is_empty() {
            ctx
                .check()
                .map_err(|i| ResolveError::from_interrupt(i, root, &[]))?;
            return Ok(LastNode {
                link: Link::new(root.clone()),
                remainder: Vec::new(),
            });
        }
        let walk = self.walk(ctx, root, segments, Stop::AtLastLink, false).await?;
        Ok(LastNode {
            link: walk.link,
            remainder: walk.remainder,
        })
    }

    /// Resolve the whole path and return every block node fetched along
    /// it, root first, after reification.
    ///
    /// # Errors
    ///
    /// Any [`ResolveError`]; see its table.
    #[tracing::instrument(level = "debug", skip_all, fields(root = %root, segments = segments.len()))]
    pub async fn resolve_path_components<P: AsRef<str> + Sync>(
        &self,
        ctx: &ResolveContext,
        root: &ContentAddress,
        segments: &[P],
    ) -> Result<Vec<Node>, ResolveError> {
        let walk = self.walk(ctx, root, segments, Stop::AtNode, true).await?;
        Ok(walk.components)
    }

    async fn walk<P: AsRef<str> + Sync>(
        &self,
        ctx: &ResolveContext,
        root: &ContentAddress,
        segments: &[P],
        stop: Stop,
        keep_components: bool,
    ) -> Result<Walk, ResolveError> {
        if segments.len() > self.config.max_depth {
            return Err(ResolveError::PathTooLong {
                len: segments.len(),
                limit: self.config.max_depth,
            });
        }

        let root_link = Link::new(root.clone());
        let hop = Hop {
            link: &root_link,
            link_ctx: LinkContext::root(),
            consumed: &[],
        };
        let first: Option<&str> = segments.first().map(AsRef::as_ref);
        let decoded = self.fetch(ctx, hop).await?;
        let (node, pending) = self
            .present(ctx, hop, decoded, first, keep_components)
            .await?;
        let mut walk = Walk {
            components: if keep_components { vec![node.clone()] } else { Vec::new() },
            node,
            link: root_link,
            consumed: Vec::with_capacity(segments.len()),
            remainder: Vec::new(),
            pending,
        };

        let last = segments.len().saturating_sub(1);
        for (i, segment) in segments.iter().enumerate() {
            let segment = segment.as_ref();
            let (step, kind) = match walk.pending.take() {
                Some(lookup) => (lookup.step, lookup.kind),
                None => (walk.node.resolve_segment(segment), walk.node.kind_name()),
            };
            match step {
                Step::Inline(child) => {
                    tracing::debug!(segment, kind = child.kind_name(), "resolved inline");
                    walk.consumed.push(segment.to_owned());
                    walk.remainder.push(segment.to_owned());
                    walk.node = child;
                }
                Step::Link(next) => {
                    walk.consumed.push(segment.to_owned());
                    walk.remainder.clear();
                    if stop == Stop::AtLastLink && i == last {
                        tracing::debug!(segment, target = %next.address, "stopped on last link");
                        walk.link = next;
                        return Ok(walk);
                    }
                    tracing::debug!(segment, target = %next.address, "following link");
                    let hop = Hop {
                        link: &next,
                        link_ctx: LinkContext::child(&walk.node, segment, &next),
                        consumed: &walk.consumed,
                    };
                    let rest: Option<&str> = segments.get(i + 1).map(AsRef::as_ref);
                    let decoded = self.fetch(ctx, hop).await?;
                    let (child, pending) = self
                        .present(ctx, hop, decoded, rest, keep_components)
                        .await?;
                    if keep_components {
                        walk.components.push(child.clone());
                    }
                    walk.node = child;
                    walk.link = next;
                    walk.pending = pending;
                }
                Step::Missing => {
                    return Err(ResolveError::NotFound {
                        address: walk.link.address,
                        consumed: walk.consumed,
                        segment: segment.to_owned(),
                    });
                }
                Step::Leaf => {
                    return Err(ResolveError::CannotTraverseLeaf {
                        address: walk.link.address,
                        consumed: walk.consumed,
                        segment: segment.to_owned(),
                        kind,
                    });
                }
            }
        }
        Ok(walk)
    }

    /// Fetch and decode the block behind `hop.link`.
    async fn fetch(&self, ctx: &ResolveContext, hop: Hop<'_>) -> Result<Node, ResolveError> {
        let address = &hop.link.address;
        let block = self
            .get_block(ctx, address)
            .await
            .map_err(|e| match e {
                Fetch::Interrupted(i) => ResolveError::from_interrupt(i, address, hop.consumed),
                Fetch::Block(e) => ResolveError::from_block(e, hop.consumed),
            })?;

        let prototype = self.config.chooser.choose(address, &hop.link_ctx);
        let node = self
            .config
            .decoder
            .decode(&block, address, prototype)
            .map_err(|source| ResolveError::Decode {
                address: address.clone(),
                consumed: hop.consumed.to_vec(),
                source,
            })?;
        tracing::debug!(%address, prototype = prototype.name(), kind = node.kind_name(), "decoded");
        Ok(node)
    }

    /// Decide what the walk continues on for a freshly decoded block.
    ///
    /// With a segment left, the reifier looks up only that segment. The
    /// whole node is reified when it ends the walk, when the reifier has no
    /// lookup for it, or when it is kept as a component.
    async fn present(
        &self,
        ctx: &ResolveContext,
        hop: Hop<'_>,
        decoded: Node,
        next: Option<&str>,
        keep_components: bool,
    ) -> Result<(Node, Option<Lookup>), ResolveError> {
        if let Some(segment) = next {
            if let Some(lookup) = self.lookup(ctx, hop, &decoded, segment).await? {
                let continues = matches!(lookup.step, Step::Link(_) | Step::Inline(_));
                let node = if keep_components && continues {
                    self.reify(ctx, hop, decoded).await?
                } else {
                    decoded
                };
                return Ok((node, Some(lookup)));
            }
        }
        Ok((self.reify(ctx, hop, decoded).await?, None))
    }

    async fn lookup(
        &self,
        ctx: &ResolveContext,
        hop: Hop<'_>,
        node: &Node,
        segment: &str,
    ) -> Result<Option<Lookup>, ResolveError> {
        let address = &hop.link.address;
        let found = self
            .config
            .reifier
            .lookup(ctx, address, node, segment, self)
            .await;
        match found {
            Ok(found) => Ok(found),
            Err(err) if self.swallows(&err) => {
                tracing::warn!(
                    %address,
                    segment,
                    error = %err,
                    "reifier lookup failed, using decoded node"
                );
                Ok(Some(Lookup::new(node.resolve_segment(segment), node.kind_name())))
            }
            Err(err) => Err(reify_failed(hop, err)),
        }
    }

    async fn reify(
        &self,
        ctx: &ResolveContext,
        hop: Hop<'_>,
        node: Node,
    ) -> Result<Node, ResolveError> {
        let address = &hop.link.address;
        let reified = self
            .config
            .reifier
            .reify(ctx, address, &node, hop.link_ctx, self)
            .await;
        match reified {
            Ok(Some(substitute)) => {
                tracing::debug!(%address, kind = substitute.kind_name(), "reified");
                Ok(substitute)
            }
            Ok(None) => Ok(node),
            Err(err) if self.swallows(&err) => {
                tracing::warn!(%address, error = %err, "reification failed, using decoded node");
                Ok(node)
            }
            Err(err) => Err(reify_failed(hop, err)),
        }
    }

    /// Best-effort reification drops failures, but never interrupts.
    fn swallows(&self, err: &ReifyError) -> bool {
        self.config.reify_policy == ReifyPolicy::BestEffort
            && !matches!(err, ReifyError::Interrupted(_))
    }

    /// Fetch raw block bytes, giving up as soon as the context is
    /// interrupted even if the source never returns.
    async fn get_block(
        &self,
        ctx: &ResolveContext,
        address: &ContentAddress,
    ) -> Result<Vec<u8>, Fetch> {
        ctx.check().map_err(Fetch::Interrupted)?;
        tokio::select! {
            biased;
            interrupt = ctx.interrupted() => Err(Fetch::Interrupted(interrupt)),
            block = self.source.get(ctx, address) => block.map_err(Fetch::Block),
        }
    }
}

fn reify_failed(hop: Hop<'_>, err: ReifyError) -> ResolveError {
    let address = &hop.link.address;
    match err {
        ReifyError::Interrupted(i) => ResolveError::from_interrupt(i, address, hop.consumed),
        source => ResolveError::Reification {
            address: address.clone(),
            consumed: hop.consumed.to_vec(),
            source,
        },
    }
}

enum Fetch {
    Interrupted(Interrupt),
    Block(BlockError),
}

impl<S: BlockSource> NodeLoader for Resolver<S> {
    fn load<'a>(
        &'a self,
        ctx: &'a ResolveContext,
        link: &'a Link,
        prototype: Prototype,
    ) -> BoxFuture<'a, Result<Node, ReifyError>> {
        Box::pin(async move {
            let block = self.get_block(ctx, &link.address).await.map_err(|e| match e {
                Fetch::Interrupted(i) => ReifyError::Interrupted(i),
                Fetch::Block(e) => ReifyError::Block(e),
            })?;
            self
                .config
                .decoder
                .decode(&block, &link.address, prototype)
                .map_err(|source| ReifyError::Decode {
                    address: link.address.clone(),
                    source,
                })
        })
    }
}
