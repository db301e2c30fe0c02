#![warn(clippy::pedantic)]

pub mod address;
pub mod block_frame;
pub mod error;
pub mod varint;

pub use address::{Codec, ContentAddress, HashFn};
pub use block_frame::{BlockFlags, BlockFrame};
pub use error::WireError;
