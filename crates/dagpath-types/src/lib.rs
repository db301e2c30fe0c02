#![warn(clippy::pedantic)]

pub mod block_source;
pub mod context;
pub mod dag_node;
pub mod error;
pub mod fields;
pub mod hamt;
pub mod link;
pub mod node;
pub mod prototype;
pub mod value;

pub use block_source::{BlockError, BlockSink, BlockSource, BoxFuture};
pub use context::{CancellationToken, Interrupt, ResolveContext};
pub use dag_node::{DagNode, NamedLink, NodeData, NodeKind};
pub use error::TypeError;
pub use link::{Link, LinkContext};
pub use node::{Directory, Node, Step};
pub use prototype::Prototype;
pub use value::Value;

pub use dagpath_wire::{Codec, ContentAddress, HashFn};
