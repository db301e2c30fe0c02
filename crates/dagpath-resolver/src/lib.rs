#![warn(clippy::pedantic)]

pub mod chooser;
pub mod config;
pub mod error;
pub mod reify;
pub mod resolver;

pub use chooser::{DefaultChooser, PrototypeChooser};
pub use config::{ReifyPolicy, ResolverConfig};
pub use error::{ReifyError, ResolveError};
pub use reify::{FsReifier, Lookup, NodeLoader, NoopReifier, Reifier};
pub use resolver::{LastNode, Resolved, Resolver, resolve_single};
