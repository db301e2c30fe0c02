use dagpath_decoder::DecodeError;
use dagpath_types::{BlockError, ContentAddress, Interrupt, TypeError};

/// Errors returned by path resolution.
///
/// Every variant raised while walking the DAG carries the address being
/// processed and the segments consumed to reach it, so a failure can be
/// located without re-running the resolution.
///
/// ```text
/// ┌────────────────────┬───────────────────────────────────────────────┐
/// │ Variant            │ Cause                                         │
/// ├────────────────────┼───────────────────────────────────────────────┤
/// │ BlockNotFound      │ The source has no block for the address       │
/// │ BlockSource        │ The source failed (I/O, transport), transient │
/// │ Decode             │ Block bytes malformed or wrong shape          │
/// │ Reification        │ Required reification failed                   │
/// │ NotFound           │ Segment absent on a traversable node          │
/// │ CannotTraverseLeaf │ Segment applied to a scalar or raw leaf       │
/// │ Cancelled          │ The context's token was cancelled             │
/// │ DeadlineExceeded   │ The context's deadline passed                 │
/// │ PathTooLong        │ More segments than the configured maximum     │
/// └────────────────────┴───────────────────────────────────────────────┘
/// ```
///
/// The resolver never recovers locally from any of these; a best-effort
/// reification failure is not an error at all and is only logged.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("block {address} not found (at /{})", .consumed.join("/"))]
    BlockNotFound {
        address: ContentAddress,
        consumed: Vec<String>,
    },

    #[error("block source failed for {address} (at /{}): {source}", .consumed.join("/"))]
    BlockSource {
        address: ContentAddress,
        consumed: Vec<String>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("cannot decode block {address} (at /{}): {source}", .consumed.join("/"))]
    Decode {
        address: ContentAddress,
        consumed: Vec<String>,
        #[source]
        source: DecodeError,
    },

    #[error("cannot reify block {address} (at /{}): {source}", .consumed.join("/"))]
    Reification {
        address: ContentAddress,
        consumed: Vec<String>,
        #[source]
        source: ReifyError,
    },

    #[error("no link named {segment:?} under {address} (at /{})", .consumed.join("/"))]
    NotFound {
        address: ContentAddress,
        consumed: Vec<String>,
        segment: String,
    },

    #[error("cannot traverse {segment:?} into {kind} leaf in {address} (at /{})", .consumed.join("/"))]
    CannotTraverseLeaf {
        address: ContentAddress,
        consumed: Vec<String>,
        segment: String,
        kind: &'static str,
    },

    #[error("resolution cancelled at {address} (at /{})", .consumed.join("/"))]
    Cancelled {
        address: ContentAddress,
        consumed: Vec<String>,
    },

    #[error("deadline exceeded at {address} (at /{})", .consumed.join("/"))]
    DeadlineExceeded {
        address: ContentAddress,
        consumed: Vec<String>,
    },

    #[error("path has {len} segments, limit is {limit}")]
    PathTooLong { len: usize, limit: usize },
}

impl ResolveError {
    pub(crate) fn from_block(err: BlockError, consumed: &[String]) -> Self {
        match err {
            BlockError::NotFound { address } => Self::BlockNotFound {
                address,
                consumed: consumed.to_vec(),
            },
            BlockError::Source { address, source } => Self::BlockSource {
                address,
                consumed: consumed.to_vec(),
                source,
            },
        }
    }

    pub(crate) fn from_interrupt(
        interrupt: Interrupt,
        address: &ContentAddress,
        consumed: &[String],
    ) -> Self {
        let address = address.clone();
        let consumed = consumed.to_vec();
        match interrupt {
            Interrupt::Cancelled => Self::Cancelled { address, consumed },
            Interrupt::DeadlineExceeded => Self::DeadlineExceeded { address, consumed },
        }
    }

    /// The address being processed when resolution failed.
    #[must_use]
    pub fn address(&self) -> Option<&ContentAddress> {
        match self {
            Self::BlockNotFound { address, .. }
            | Self::BlockSource { address, .. }
            | Self::Decode { address, .. }
            | Self::Reification { address, .. }
            | Self::NotFound { address, .. }
            | Self::CannotTraverseLeaf { address, .. }
            | Self::Cancelled { address, .. }
            | Self::DeadlineExceeded { address, .. } => Some(address),
            Self::PathTooLong { .. } => None,
        }
    }

    /// The segments consumed before the failure, in path order.
    #[must_use]
    pub fn consumed(&self) -> &[String] {
        match self {
            Self::BlockNotFound { consumed, .. }
            | Self::BlockSource { consumed, .. }
            | Self::Decode { consumed, .. }
            | Self::Reification { consumed, .. }
            | Self::NotFound { consumed, .. }
            | Self::CannotTraverseLeaf { consumed, .. }
            | Self::Cancelled { consumed, .. }
            | Self::DeadlineExceeded { consumed, .. } => consumed,
            Self::PathTooLong { .. } => &[],
        }
    }

    /// Return `true` for failures that may succeed on retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::BlockSource { .. } | Self::Cancelled { .. } | Self::DeadlineExceeded { .. }
        )
    }
}

/// Errors raised by a [`Reifier`](crate::Reifier).
///
/// ```text
///   ReifyError
///   ├── Block(BlockError)        ← a shard or chunk block could not be fetched
///   ├── Decode                   ← a shard or chunk block did not decode
///   ├── InvalidNodeData          ← the node's data record is malformed
///   ├── Malformed                ← structure inconsistent with its kind
///   └── Interrupted(Interrupt)   ← cancelled or past deadline while loading
/// ```
///
/// `Interrupted` is never swallowed by best-effort reification: it always
/// surfaces as [`ResolveError::Cancelled`] or
/// [`ResolveError::DeadlineExceeded`].
#[derive(Debug, thiserror::Error)]
pub enum ReifyError {
    #[error(transparent)]
    Block(#[from] BlockError),

    #[error("cannot decode {address}: {source}")]
    Decode {
        address: ContentAddress,
        #[source]
        source: DecodeError,
    },

    #[error("invalid node data in {address}: {source}")]
    InvalidNodeData {
        address: ContentAddress,
        #[source]
        source: TypeError,
    },

    #[error("malformed {kind} at {address}: {reason}")]
    Malformed {
        address: ContentAddress,
        kind: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Interrupted(#[from] Interrupt),
}
