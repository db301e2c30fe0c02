#![warn(clippy::pedantic)]

pub mod builder;
pub mod compression;
pub mod error;
pub mod memory_store;

mod shard;

pub use builder::DagBuilder;
pub use error::EncodeError;
pub use memory_store::MemoryBlockStore;
