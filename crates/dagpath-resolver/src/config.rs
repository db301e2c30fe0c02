use dagpath_decoder::{BlockDecoder, Decoder};

use crate::chooser::{DefaultChooser, PrototypeChooser};
use crate::reify::{FsReifier, Reifier};

/// Default limit on path length.
pub const DEFAULT_MAX_DEPTH: usize = 4096;

/// Configuration for the resolver.
///
/// Carries the pluggable strategies a resolution runs through, plus the
/// policy knobs around them.
///
/// ```text
/// ┌──────────────┬───────────────────────────────────────────────────┐
/// │ Field        │ Purpose                                           │
/// ├──────────────┼───────────────────────────────────────────────────┤
/// │ chooser      │ Picks the prototype for each fetched block        │
/// │ decoder      │ Turns block bytes into a node                     │
/// │ reifier      │ Optionally substitutes a richer node view         │
/// │ reify_policy │ Whether reification failures are fatal            │
/// │ max_depth    │ Longest accepted path, in segments                │
/// └──────────────┴───────────────────────────────────────────────────┘
/// ```
///
/// The default verifies every block against its address, reifies
/// file-system nodes on a best-effort basis, and accepts paths of up to
/// [`DEFAULT_MAX_DEPTH`] segments.
pub struct ResolverConfig {
    /// Picks the prototype each fetched block is decoded as.
    pub chooser: Box<dyn PrototypeChooser>,

    /// Turns block bytes into nodes. Also used for blocks the reifier loads.
    pub decoder: Box<dyn Decoder>,

    /// Presents decoded nodes as richer views, looked up one segment at a
    /// time while walking and built whole only for the returned node.
    pub reifier: Box<dyn Reifier>,

    /// Whether a failing reifier fails the resolution.
    pub reify_policy: ReifyPolicy,

    /// Longest accepted path, in segments. Checked before any fetch.
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            chooser: Box::new(DefaultChooser),
            decoder: Box::new(BlockDecoder::new()),
            reifier: Box::new(FsReifier::default()),
            reify_policy: ReifyPolicy::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ResolverConfig {
    #[must_use]
    pub fn with_chooser(mut self, chooser: impl PrototypeChooser + 'static) -> Self {
        self.chooser = Box::new(chooser);
        self
    }

    #[must_use]
    pub fn with_decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    #[must_use]
    pub fn with_reifier(mut self, reifier: impl Reifier + 'static) -> Self {
        self.reifier = Box::new(reifier);
        self
    }

    #[must_use]
    pub fn with_reify_policy(mut self, policy: ReifyPolicy) -> Self {
        self.reify_policy = policy;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Replace the decoder with a [`BlockDecoder`] that does or does not
    /// check block digests.
    #[must_use]
    pub fn verify_blocks(self, verify: bool) -> Self {
        self.with_decoder(BlockDecoder::new().verify_blocks(verify))
    }
}

/// What happens when the reifier fails on a node it recognized.
///
/// ```text
/// ┌────────────┬────────────────────────────────────────────────────┐
/// │ Policy     │ Behavior                                           │
/// ├────────────┼────────────────────────────────────────────────────┤
/// │ BestEffort │ Log a warning, continue with the unreified node    │
/// │ Required   │ Fail the resolution with ResolveError::Reification │
/// └────────────┴────────────────────────────────────────────────────┘
/// ```
///
/// Cancellation and deadline expiry during reification are never
/// swallowed, whatever the policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReifyPolicy {
    #[default]
    BestEffort,
    Required,
}
