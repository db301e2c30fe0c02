use std::borrow::Cow;

use dagpath_types::hamt::{ShardLayout, ShardLinkName};
use dagpath_types::{
    BoxFuture, ContentAddress, DagNode, Directory, Link, LinkContext, Node, NodeData, NodeKind,
    Prototype, ResolveContext, Step, TypeError,
};

use crate::error::ReifyError;

/// Deepest chain of nested file nodes [`FsReifier`] follows.
pub const MAX_FILE_DEPTH: u32 = 64;

/// Largest file [`FsReifier`] assembles by default: 1 GiB.
pub const DEFAULT_MAX_FILE_SIZE: usize = 1 << 30;

/// Fetches and decodes the blocks a reifier needs beyond the node it was
/// given, such as the other shards of a sharded directory.
///
/// The resolver implements this on top of its own block source and
/// decoder, so loads made during reification honor the same context and
/// verification settings as the resolution itself.
pub trait NodeLoader: Send + Sync {
    fn load<'a>(
        &'a self,
        ctx: &'a ResolveContext,
        link: &'a Link,
        prototype: Prototype,
    ) -> BoxFuture<'a, Result<Node, ReifyError>>;
}

/// One segment looked up through a reifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lookup {
    pub step: Step,
    /// Kind of the reified node, reported when `step` is [`Step::Leaf`].
    pub kind: &'static str,
}

impl Lookup {
    #[must_use]
    pub fn new(step: Step, kind: &'static str) -> Self {
        Self { step, kind }
    }
}

/// Presents a decoded node as a different logical node.
///
/// The resolver asks for one of two things:
///
/// ```text
/// ┌──────────┬────────────────────────────────┬──────────────────────────────┐
/// │ Method   │ Called when                    │ Loads                        │
/// ├──────────┼────────────────────────────────┼──────────────────────────────┤
/// │ lookup   │ segments remain after the node │ only blocks on that segment  │
/// │ reify    │ the node itself is returned    │ whatever the full view needs │
/// └──────────┴────────────────────────────────┴──────────────────────────────┘
/// ```
///
/// Both return `Ok(None)` when the node is not a shape this reifier knows.
/// A reifier must not change what a recognized shape *means*, only how its
/// edges are found, and `lookup` must agree with resolving the segment on
/// the node `reify` returns.
pub trait Reifier: Send + Sync {
    fn reify<'a>(
        &'a self,
        ctx: &'a ResolveContext,
        address: &'a ContentAddress,
        node: &'a Node,
        link_ctx: LinkContext<'a>,
        loader: &'a dyn NodeLoader,
    ) -> BoxFuture<'a, Result<Option<Node>, ReifyError>>;

    /// Resolve `segment` on the reified form of `node` without building
    /// all of it.
    ///
    /// The default returns `Ok(None)`, and the resolver falls back to
    /// [`reify`](Self::reify) followed by an ordinary segment lookup.
    fn lookup<'a>(
        &'a self,
        _ctx: &'a ResolveContext,
        _address: &'a ContentAddress,
        _node: &'a Node,
        _segment: &'a str,
        _loader: &'a dyn NodeLoader,
    ) -> BoxFuture<'a, Result<Option<Lookup>, ReifyError>> {
        Box::pin(async { Ok(None) })
    }
}

/// Never substitutes anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopReifier;

impl Reifier for NoopReifier {
    fn reify<'a>(
        &'a self,
        _ctx: &'a ResolveContext,
        _address: &'a ContentAddress,
        _node: &'a Node,
        _link_ctx: LinkContext<'a>,
        _loader: &'a dyn NodeLoader,
    ) -> BoxFuture<'a, Result<Option<Node>, ReifyError>> {
        Box::pin(async { Ok(None) })
    }
}

/// Reifies the file-system layer stored in DAG node data records.
///
/// ```text
/// ┌───────────────┬──────────────────┬────────────────────────┬─────────────────────────┐
/// │ NodeData kind │ Reified as       │ lookup loads           │ reify loads             │
/// ├───────────────┼──────────────────┼────────────────────────┼─────────────────────────┤
/// │ Directory     │ Node::Directory  │ none                   │ none                    │
/// │ HamtShard     │ Node::Directory  │ shards on the bucket   │ every child shard       │
/// │               │                  │ chain of the segment   │                         │
/// │ File          │ Node::Bytes      │ none (always a leaf)   │ every chunk, in order   │
/// │ (no data)     │ unchanged        │ none                   │ none                    │
/// └───────────────┴──────────────────┴────────────────────────┴─────────────────────────┘
/// ```
///
/// A sharded directory and the flat directory holding the same entries
/// resolve every name identically. Walking through one touches a single
/// shard per trie level; only returning the directory itself flattens the
/// whole trie.
#[derive(Clone, Copy, Debug)]
pub struct FsReifier {
    max_file_size: usize,
}

impl Default for FsReifier {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl FsReifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to assemble files larger than `limit` bytes.
    #[must_use]
    pub fn max_file_size(mut self, limit: usize) -> Self {
        self.max_file_size = limit;
        self
    }
}

impl Reifier for FsReifier {
    fn reify<'a>(
        &'a self,
        ctx: &'a ResolveContext,
        address: &'a ContentAddress,
        node: &'a Node,
        _link_ctx: LinkContext<'a>,
        loader: &'a dyn NodeLoader,
    ) -> BoxFuture<'a, Result<Option<Node>, ReifyError>> {
        Box::pin(async move {
            let Some((dag, data)) = fs_node(address, node)? else {
                return Ok(None);
            };

            let reified = match data.kind {
                NodeKind::Directory => {
                    let mut dir = Directory::new();
                    for named in &dag.links {
                        dir.insert(named.name.clone(), named.link.clone());
                    }
                    Node::Directory(dir)
                }
                NodeKind::HamtShard => {
                    let layout = shard_layout(address, &data)?;
                    let mut dir = Directory::new();
                    walk_shard(ctx, address, dag, layout, 0, loader, &mut dir).await?;
                    Node::Directory(dir)
                }
                NodeKind::File => {
                    let mut out = Vec::new();
                    let file = FileRead {
                        ctx,
                        loader,
                        limit: self.max_file_size,
                    };
                    file.append(address, dag, 0, &mut out).await?;
                    Node::Bytes(out)
                }
            };
            Ok(Some(reified))
        })
    }

    fn lookup<'a>(
        &'a self,
        ctx: &'a ResolveContext,
        address: &'a ContentAddress,
        node: &'a Node,
        segment: &'a str,
        loader: &'a dyn NodeLoader,
    ) -> BoxFuture<'a, Result<Option<Lookup>, ReifyError>> {
        Box::pin(async move {
            let Some((dag, data)) = fs_node(address, node)? else {
                return Ok(None);
            };

            let found = match data.kind {
                NodeKind::Directory => Lookup::new(dag.resolve_segment(segment), "directory"),
                NodeKind::HamtShard => {
                    let layout = shard_layout(address, &data)?;
                    let step = find_in_shard(ctx, address, dag, layout, segment, loader).await?;
                    Lookup::new(step, "directory")
                }
                NodeKind::File => Lookup::new(Step::Leaf, "bytes"),
            };
            Ok(Some(found))
        })
    }
}

/// The DAG node behind `node` and its data record, if it carries one.
fn fs_node<'n>(
    address: &ContentAddress,
    node: &'n Node,
) -> Result<Option<(&'n DagNode, NodeData)>, ReifyError> {
    let Node::Dag(dag) = node else {
        return Ok(None);
    };
    let Some(data) = dag.node_data() else {
        return Ok(None);
    };
    let data = data.map_err(|source| invalid_data(address, source))?;
    Ok(Some((dag, data)))
}

fn invalid_data(address: &ContentAddress, source: TypeError) -> ReifyError {
    ReifyError::InvalidNodeData {
        address: address.clone(),
        source,
    }
}

fn node_data(
    address: &ContentAddress,
    dag: &DagNode,
    kind: &'static str,
) -> Result<NodeData, ReifyError> {
    match dag.node_data() {
        Some(Ok(data)) => Ok(data),
        Some(Err(source)) => Err(invalid_data(address, source)),
        None => Err(ReifyError::Malformed {
            address: address.clone(),
            kind,
            reason: "node has no data record".into(),
        }),
    }
}

fn shard_layout(address: &ContentAddress, data: &NodeData) -> Result<ShardLayout, ReifyError> {
    let fanout = data.fanout.ok_or_else(|| ReifyError::Malformed {
        address: address.clone(),
        kind: "shard",
        reason: "missing fanout".into(),
    })?;
    ShardLayout::new(fanout).map_err(|source| invalid_data(address, source))
}

fn too_deep(address: &ContentAddress, layout: ShardLayout) -> ReifyError {
    ReifyError::Malformed {
        address: address.clone(),
        kind: "shard",
        reason: format!("trie deeper than {} levels", layout.max_level() + 1),
    }
}

/// Load a child shard and check it belongs to the same trie.
async fn load_shard(
    ctx: &ResolveContext,
    link: &Link,
    layout: ShardLayout,
    loader: &dyn NodeLoader,
) -> Result<DagNode, ReifyError> {
    let Node::Dag(child) = loader.load(ctx, link, Prototype::DagNode).await? else {
        return Err(ReifyError::Malformed {
            address: link.address.clone(),
            kind: "shard",
            reason: "child shard is not a dag node".into(),
        });
    };
    let data = node_data(&link.address, &child, "shard")?;
    if data.kind != NodeKind::HamtShard || data.fanout != Some(layout.fanout()) {
        return Err(ReifyError::Malformed {
            address: link.address.clone(),
            kind: "shard",
            reason: "child shard kind or fanout differs from parent".into(),
        });
    }
    Ok(child)
}

/// Follow `segment`'s bucket down the trie, loading one shard per level.
async fn find_in_shard(
    ctx: &ResolveContext,
    address: &ContentAddress,
    root: &DagNode,
    layout: ShardLayout,
    segment: &str,
    loader: &dyn NodeLoader,
) -> Result<Step, ReifyError> {
    let mut at = address.clone();
    let mut shard = Cow::Borrowed(root);
    for level in 0..=layout.max_level() {
        let bucket = layout.bucket(segment, level);
        let mut child = None;
        for named in &shard.links {
            match layout
                .parse(&named.name)
                .map_err(|source| invalid_data(&at, source))?
            {
                ShardLinkName::Entry { bucket: b, name } if b == bucket && name == segment => {
                    return Ok(Step::Link(named.link.clone()));
                }
                ShardLinkName::Child { bucket: b } if b == bucket => {
                    child = Some(named.link.clone());
                }
                _ => {}
            }
        }

        let Some(link) = child else {
            return Ok(Step::Missing);
        };
        tracing::trace!(level, shard = %link.address, segment, "descending into child shard");
        shard = Cow::Owned(load_shard(ctx, &link, layout, loader).await?);
        at = link.address;
    }
    Err(too_deep(&at, layout))
}

fn walk_shard<'a>(
    ctx: &'a ResolveContext,
    address: &'a ContentAddress,
    shard: &'a DagNode,
    layout: ShardLayout,
    level: u32,
    loader: &'a dyn NodeLoader,
    dir: &'a mut Directory,
) -> BoxFuture<'a, Result<(), ReifyError>> {
    Box::pin(async move {
        if level > layout.max_level() {
            return Err(too_deep(address, layout));
        }

        for named in &shard.links {
            let parsed = layout
                .parse(&named.name)
                .map_err(|source| invalid_data(address, source))?;
            match parsed {
                ShardLinkName::Entry { name, .. } => dir.insert(name, named.link.clone()),
                ShardLinkName::Child { .. } => {
                    let child = load_shard(ctx, &named.link, layout, loader).await?;
                    walk_shard(ctx, &named.link.address, &child, layout, level + 1, loader, dir)
                        .await?;
                }
            }
        }
        Ok(())
    })
}

/// Assembles a chunked file, bounded by `limit` bytes in total.
struct FileRead<'a> {
    ctx: &'a ResolveContext,
    loader: &'a dyn NodeLoader,
    limit: usize,
}

impl FileRead<'_> {
    fn append<'s>(
        &'s self,
        address: &'s ContentAddress,
        file: &'s DagNode,
        depth: u32,
        out: &'s mut Vec<u8>,
    ) -> BoxFuture<'s, Result<(), ReifyError>> {
        Box::pin(async move {
            if depth > MAX_FILE_DEPTH {
                let reason = format!("chunks nested deeper than {MAX_FILE_DEPTH}");
                return Err(malformed_file(address, reason));
            }
            let data = node_data(address, file, "file")?;
            if data.kind != NodeKind::File {
                return Err(malformed_file(address, "chunk is not a file node".into()));
            }

            self.push(address, out, &data.payload)?;
            for named in &file.links {
                match self.loader.load(self.ctx, &named.link, Prototype::Any).await? {
                    Node::Bytes(chunk) => self.push(&named.link.address, out, &chunk)?,
                    Node::Dag(inner) => {
                        self.append(&named.link.address, &inner, depth + 1, out).await?;
                    }
                    other => {
                        let reason = format!("chunk decoded as {}", other.kind_name());
                        return Err(malformed_file(&named.link.address, reason));
                    }
                }
            }
            Ok(())
        })
    }

    fn push(
        &self,
        address: &ContentAddress,
        out: &mut Vec<u8>,
        bytes: &[u8],
    ) -> Result<(), ReifyError> {
        if out.len() + bytes.len() > self.limit {
            let reason = format!("file exceeds {} bytes", self.limit);
            return Err(malformed_file(address, reason));
        }
        out.extend_from_slice(bytes);
        Ok(())
    }
}

fn malformed_file(address: &ContentAddress, reason: String) -> ReifyError {
    ReifyError::Malformed {
        address: address.clone(),
        kind: "file",
        reason,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use dagpath_decoder::{BlockDecoder, Decoder};
    use dagpath_encoder::{DagBuilder, MemoryBlockStore};
    use dagpath_types::{BlockSource, NamedLink, Value};
    use dagpath_types::hamt::ShardLinkName;

    use super::*;

    struct StoreLoader {
        store: Arc<MemoryBlockStore>,
        loads: AtomicUsize,
    }

    impl StoreLoader {
        fn new(store: &Arc<MemoryBlockStore>) -> Self {
            Self {
                store: store.clone(),
                loads: AtomicUsize::new(0),
            }
        }

        fn loads(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    impl NodeLoader for StoreLoader {
        fn load<'a>(
            &'a self,
            ctx: &'a ResolveContext,
            link: &'a Link,
            prototype: Prototype,
        ) -> BoxFuture<'a, Result<Node, ReifyError>> {
            Box::pin(async move {
                self.loads.fetch_add(1, Ordering::SeqCst);
                let block = self.store.get(ctx, &link.address).await?;
                BlockDecoder::new()
                    .decode(&block, &link.address, prototype)
                    .map_err(|source| ReifyError::Decode {
                        address: link.address.clone(),
                        source,
                    })
            })
        }
    }

    fn fixture() -> (Arc<MemoryBlockStore>, DagBuilder<Arc<MemoryBlockStore>>) {
        let store = Arc::new(MemoryBlockStore::new());
        (store.clone(), DagBuilder::new(store))
    }

    async fn reify(
        store: &Arc<MemoryBlockStore>,
        link: &Link,
    ) -> Result<Option<Node>, ReifyError> {
        let ctx = ResolveContext::background();
        let loader = StoreLoader::new(store);
        let node = loader.load(&ctx, link, Prototype::Any).await?;
        FsReifier::new()
            .reify(&ctx, &link.address, &node, LinkContext::root(), &loader)
            .await
    }

    fn entries(builder: &DagBuilder<Arc<MemoryBlockStore>>, n: usize) -> BTreeMap<String, Link> {
        (0..n)
            .map(|i| (format!("entry-{i}"), builder.put_raw(&i.to_le_bytes()).unwrap()))
            .collect()
    }

    #[tokio::test]
    async fn flat_directory_becomes_directory() {
        let (store, b) = fixture();
        let input = entries(&b, 3);
        let dir = b.put_directory(input.clone()).unwrap();
        let Some(Node::Directory(out)) = reify(&store, &dir).await.unwrap() else {
            panic!("expected directory");
        };
        assert_eq!(out.entries, input);
    }

    #[tokio::test]
    async fn sharded_directory_matches_flat() {
        let (store, b) = fixture();
        let input = entries(&b, 100);
        let sharded = b.put_sharded_directory(input.clone(), Some(8)).unwrap();
        let Some(Node::Directory(out)) = reify(&store, &sharded).await.unwrap() else {
            panic!("expected directory");
        };
        assert_eq!(out.entries, input);
    }

    #[tokio::test]
    async fn chunked_file_is_concatenated() {
        let (store, b) = fixture();
        let content = b"the quick brown fox jumps over the lazy dog";
        let file = b.chunk_size(5).put_file(content).unwrap();
        assert_eq!(
            reify(&store, &file).await.unwrap(),
            Some(Node::Bytes(content.to_vec()))
        );
    }

    #[tokio::test]
    async fn plain_nodes_are_not_recognized() {
        let (store, b) = fixture();
        let value = b.put_value(&Value::Int(7)).unwrap();
        let dag = b.put_dag(&DagNode::default()).unwrap();
        assert_eq!(reify(&store, &value).await.unwrap(), None);
        assert_eq!(reify(&store, &dag).await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_child_shard_is_block_error() {
        let (store, b) = fixture();
        let sharded = b.put_sharded_directory(entries(&b, 100), Some(4)).unwrap();
        let ctx = ResolveContext::background();
        let loader = StoreLoader::new(&store);
        let root = loader.load(&ctx, &sharded, Prototype::Any).await.unwrap();
        for link in root.links() {
            store.remove(&link.address);
        }
        let err = FsReifier::new()
            .reify(&ctx, &sharded.address, &root, LinkContext::root(), &loader)
            .await
            .unwrap_err();
        assert!(matches!(err, ReifyError::Block(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn bad_shard_prefix_is_invalid_node_data() {
        let (store, b) = fixture();
        let target = b.put_raw(b"x").unwrap();
        let shard = b
            .put_dag(&DagNode {
                links: vec![NamedLink::new("zz-not-hex", target)],
                data: Some(NodeData::hamt_shard(256).encode()),
            })
            .unwrap();
        assert!(matches!(
            reify(&store, &shard).await,
            Err(ReifyError::InvalidNodeData { .. })
        ));
    }

    #[tokio::test]
    async fn noop_reifier_never_substitutes() {
        let (store, b) = fixture();
        let dir = b.put_directory(entries(&b, 2)).unwrap();
        let ctx = ResolveContext::background();
        let loader = StoreLoader::new(&store);
        let node = loader.load(&ctx, &dir, Prototype::Any).await.unwrap();
        let out = NoopReifier
            .reify(&ctx, &dir.address, &node, LinkContext::root(), &loader)
            .await
            .unwrap();
        assert!(out.is_none());
    }

    /// Child shards on `name`'s bucket chain below `root`.
    async fn chain_len(
        store: &Arc<MemoryBlockStore>,
        root: &Link,
        layout: ShardLayout,
        name: &str,
    ) -> usize {
        let ctx = ResolveContext::background();
        let loader = StoreLoader::new(store);
        let mut shard = loader.load(&ctx, root, Prototype::DagNode).await.unwrap();
        let mut level = 0;
        loop {
            let prefix = layout.prefix(layout.bucket(name, level));
            let Step::Link(child) = shard.resolve_segment(&prefix) else {
                return level as usize;
            };
            shard = loader.load(&ctx, &child, Prototype::DagNode).await.unwrap();
            level += 1;
        }
    }

    #[tokio::test]
    async fn shard_lookup_loads_only_the_bucket_chain() {
        let (store, b) = fixture();
        let input = entries(&b, 300);
        let sharded = b.put_sharded_directory(input.clone(), Some(4)).unwrap();
        let layout = ShardLayout::new(4).unwrap();
        let ctx = ResolveContext::background();
        let loader = StoreLoader::new(&store);
        let root = loader.load(&ctx, &sharded, Prototype::Any).await.unwrap();

        for name in ["entry-7", "entry-123", "entry-299"] {
            let before = loader.loads();
            let found = FsReifier::new()
                .lookup(&ctx, &sharded.address, &root, name, &loader)
                .await
                .unwrap();
            assert_eq!(
                found,
                Some(Lookup::new(Step::Link(input[name].clone()), "directory"))
            );
            let expected = chain_len(&store, &sharded, layout, name).await;
            assert_eq!(loader.loads() - before, expected, "{name}");
        }

        let absent = FsReifier::new()
            .lookup(&ctx, &sharded.address, &root, "absent", &loader)
            .await
            .unwrap();
        assert_eq!(absent.map(|l| l.step), Some(Step::Missing));
    }

    #[tokio::test]
    async fn shard_lookup_ignores_unrelated_missing_shards() {
        let (store, b) = fixture();
        let input = entries(&b, 300);
        let sharded = b.put_sharded_directory(input.clone(), Some(4)).unwrap();
        let layout = ShardLayout::new(4).unwrap();
        let ctx = ResolveContext::background();
        let loader = StoreLoader::new(&store);
        let root = loader.load(&ctx, &sharded, Prototype::Any).await.unwrap();

        let target = "entry-42";
        let bucket = layout.bucket(target, 0);
        let Node::Dag(dag) = &root else {
            panic!("expected a shard node");
        };
        let mut removed = 0;
        for named in &dag.links {
            let parsed = layout.parse(&named.name).unwrap();
            if matches!(parsed, ShardLinkName::Child { bucket: other } if other != bucket) {
                store.remove(&named.link.address);
                removed += 1;
            }
        }
        assert!(removed > 0);

        let found = FsReifier::new()
            .lookup(&ctx, &sharded.address, &root, target, &loader)
            .await
            .unwrap();
        assert_eq!(found.map(|l| l.step), Some(Step::Link(input[target].clone())));
    }

    #[tokio::test]
    async fn file_lookup_is_a_leaf_without_loading_chunks() {
        let (store, b) = fixture();
        let file = b.chunk_size(4).put_file(b"0123456789").unwrap();
        let ctx = ResolveContext::background();
        let loader = StoreLoader::new(&store);
        let node = loader.load(&ctx, &file, Prototype::Any).await.unwrap();

        let found = FsReifier::new()
            .lookup(&ctx, &file.address, &node, "x", &loader)
            .await
            .unwrap();
        assert_eq!(found, Some(Lookup::new(Step::Leaf, "bytes")));
        assert_eq!(loader.loads(), 1);
    }

    #[tokio::test]
    async fn file_over_size_limit_is_malformed() {
        let (store, b) = fixture();
        let file = b.chunk_size(4).put_file(b"0123456789").unwrap();
        let ctx = ResolveContext::background();
        let loader = StoreLoader::new(&store);
        let node = loader.load(&ctx, &file, Prototype::Any).await.unwrap();

        let err = FsReifier::new()
            .max_file_size(8)
            .reify(&ctx, &file.address, &node, LinkContext::root(), &loader)
            .await
            .unwrap_err();
        assert!(matches!(err, ReifyError::Malformed { kind: "file", .. }), "got {err:?}");

        let whole = FsReifier::new()
            .max_file_size(10)
            .reify(&ctx, &file.address, &node, LinkContext::root(), &loader)
            .await
            .unwrap();
        assert_eq!(whole, Some(Node::Bytes(b"0123456789".to_vec())));
    }

    #[tokio::test]
    async fn plain_nodes_have_no_lookup() {
        let (store, b) = fixture();
        let value = b.put_value(&Value::map([("k", Value::Int(1))])).unwrap();
        let ctx = ResolveContext::background();
        let loader = StoreLoader::new(&store);
        let node = loader.load(&ctx, &value, Prototype::Any).await.unwrap();
        let found = FsReifier::new()
            .lookup(&ctx, &value.address, &node, "k", &loader)
            .await
            .unwrap();
        assert!(found.is_none());
    }
}
