use dagpath_types::{BlockError, TypeError};

/// Errors that can occur while building and storing a DAG.
///
/// The builder validates structural constraints (block size, entry names,
/// shard fanout) and propagates failures from the block sink it writes
/// into.
///
/// Error hierarchy:
///
/// ```text
///   EncodeError
///   ├── BlockTooLarge        ← single block body exceeds size limit
///   ├── EmptyEntryName       ← directory entry with an empty name
///   ├── InvalidFanout        ← shard fanout not a supported power of two
///   └── Sink(BlockError)     ← the block sink refused a block
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("block body exceeds maximum size ({size} bytes, limit {limit})")]
    BlockTooLarge { size: usize, limit: usize },

    #[error("directory entries must have a non-empty name")]
    EmptyEntryName,

    #[error("invalid shard fanout: {0}")]
    InvalidFanout(#[source] TypeError),

    #[error(transparent)]
    Sink(#[from] BlockError),
}
