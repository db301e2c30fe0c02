use std::collections::BTreeMap;

use dagpath_types::hamt::{DEFAULT_FANOUT, ShardLayout};
use dagpath_types::{
    BlockSink, Codec, ContentAddress, DagNode, HashFn, Link, NamedLink, NodeData, Value,
};
use dagpath_wire::{BlockFlags, BlockFrame};

use crate::compression::{self, COMPRESSION_THRESHOLD};
use crate::error::EncodeError;

/// Maximum block body size (16 MiB). Larger bodies produce
/// [`EncodeError::BlockTooLarge`].
pub const MAX_BLOCK_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Default chunk size for file contents: 256 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// DAG builder: encodes nodes into blocks and writes them to a sink.
///
/// Every `put_*` method encodes one logical object, stores every block it
/// needs, and returns a [`Link`] to the root block of that object. Links
/// returned by one call can be embedded in the next, so a DAG is built
/// bottom-up:
///
/// ```rust
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
/// use dagpath_encoder::{DagBuilder, MemoryBlockStore};
///
/// let store = Arc::new(MemoryBlockStore::new());
/// let builder = DagBuilder::new(store.clone());
///
/// let readme = builder.put_file(b"# dagpath").unwrap();
/// let root = builder
///     .put_directory(BTreeMap::from([("README.md".to_string(), readme)]))
///     .unwrap();
/// assert_eq!(store.len(), 2);
/// # let _ = root;
/// ```
///
/// # Blocks
///
/// ```text
/// ┌──────────────────────┬──────────┬────────────────────────────────┐
/// │ Method               │ Codec    │ Blocks written                 │
/// ├──────────────────────┼──────────┼────────────────────────────────┤
/// │ put_raw              │ raw      │ 1                              │
/// │ put_value            │ value    │ 1                              │
/// │ put_dag              │ dag-node │ 1                              │
/// │ put_file             │ dag/raw  │ 1, or 1 + one raw per chunk    │
/// │ put_directory        │ dag-node │ 1                              │
/// │ put_sharded_directory│ dag-node │ one per shard in the trie      │
/// └──────────────────────┴──────────┴────────────────────────────────┘
/// ```
///
/// # Compression
///
/// When enabled (the default), bodies of at least
/// [`COMPRESSION_THRESHOLD`] bytes are zstd-compressed if that makes them
/// smaller, and the frame's `COMPRESSED` flag is set. The address covers
/// the framed bytes, so the same node stored with and without compression
/// has two different addresses.
pub struct DagBuilder<S> {
    sink: S,
    hash_fn: HashFn,
    compress: bool,
    chunk_size: usize,
}

impl<S: BlockSink> DagBuilder<S> {
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            hash_fn: HashFn::default(),
            compress: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    #[must_use]
    pub fn hash_fn(mut self, hash_fn: HashFn) -> Self {
        self.hash_fn = hash_fn;
        self
    }

    #[must_use]
    pub fn compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    /// Files larger than `chunk_size` are split into raw chunk blocks.
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Frame one body, then address and store it.
    ///
    /// # Errors
    ///
    /// [`EncodeError::BlockTooLarge`] or a sink failure.
    pub fn put_block(&self, codec: Codec, body: Vec<u8>) -> Result<Link, EncodeError> {
        if body.len() > MAX_BLOCK_BODY_SIZE {
            return Err(EncodeError::BlockTooLarge {
                size: body.len(),
                limit: MAX_BLOCK_BODY_SIZE,
            });
        }

        let frame = match self.compressed(&body) {
            Some(compressed) => BlockFrame {
                flags: BlockFlags::COMPRESSED,
                body: compressed,
            },
            None => BlockFrame::plain(body),
        };
        let block = frame.to_bytes();
        let address = ContentAddress::compute(codec, self.hash_fn, &block);
        self.sink.put(&address, &block)?;

        tracing::trace!(
            %address,
            codec = codec.name(),
            bytes = block.len(),
            compressed = frame.flags.is_compressed(),
            "stored block"
        );
        Ok(Link::new(address).with_size(block.len() as u64))
    }

    fn compressed(&self, body: &[u8]) -> Option<Vec<u8>> {
        if self.compress && body.len() >= COMPRESSION_THRESHOLD {
            compression::compress(body)
        } else {
            None
        }
    }

    /// # Errors
    ///
    /// Same as [`put_block`](Self::put_block).
    pub fn put_raw(&self, data: &[u8]) -> Result<Link, EncodeError> {
        self.put_block(Codec::Raw, data.to_vec())
    }

    /// # Errors
    ///
    /// Same as [`put_block`](Self::put_block).
    pub fn put_value(&self, value: &Value) -> Result<Link, EncodeError> {
        self.put_block(Codec::Value, value.encode_body())
    }

    /// # Errors
    ///
    /// Same as [`put_block`](Self::put_block).
    pub fn put_dag(&self, node: &DagNode) -> Result<Link, EncodeError> {
        self.put_block(Codec::DagNode, node.encode_body())
    }

    /// Store file contents.
    ///
    /// Contents up to the chunk size live inline in a single `File` node.
    /// Larger contents are split into raw chunk blocks linked, in order, by
    /// unnamed links from the `File` node.
    ///
    /// # Errors
    ///
    /// Same as [`put_block`](Self::put_block).
    pub fn put_file(&self, data: &[u8]) -> Result<Link, EncodeError> {
        if data.len() <= self.chunk_size {
            return self.put_dag(&DagNode {
                links: Vec::new(),
                data: Some(NodeData::file(data).encode()),
            });
        }

        let links = data
            .chunks(self.chunk_size)
            .map(|chunk| Ok(NamedLink::new("", self.put_raw(chunk)?)))
            .collect::<Result<Vec<_>, EncodeError>>()?;
        self.put_dag(&DagNode {
            links,
            data: Some(NodeData::file(Vec::new()).encode()),
        })
    }

    /// Store a flat directory: one node, one link per entry, in name order.
    ///
    /// # Errors
    ///
    /// [`EncodeError::EmptyEntryName`], or same as
    /// [`put_block`](Self::put_block).
    pub fn put_directory(&self, entries: BTreeMap<String, Link>) -> Result<Link, EncodeError> {
        if entries.contains_key("") {
            return Err(EncodeError::EmptyEntryName);
        }
        let links = entries
            .into_iter()
            .map(|(name, link)| NamedLink::new(name, link))
            .collect();
        self.put_dag(&DagNode {
            links,
            data: Some(NodeData::directory().encode()),
        })
    }

    /// Store a directory as a hash-array-mapped trie of shards.
    ///
    /// A reifier that understands shards presents the result exactly like
    /// the flat directory [`put_directory`](Self::put_directory) would have
    /// produced. Pass `None` for the default fanout of 256.
    ///
    /// # Errors
    ///
    /// [`EncodeError::InvalidFanout`], [`EncodeError::EmptyEntryName`], or
    /// same as [`put_block`](Self::put_block).
    pub fn put_sharded_directory(
        &self,
        entries: BTreeMap<String, Link>,
        fanout: Option<u64>,
    ) -> Result<Link, EncodeError> {
        if entries.contains_key("") {
            return Err(EncodeError::EmptyEntryName);
        }
        let layout =
            ShardLayout::new(fanout.unwrap_or(DEFAULT_FANOUT)).map_err(EncodeError::InvalidFanout)?;
        self.put_shard(layout, entries.into_iter().collect(), 0)
    }
}
