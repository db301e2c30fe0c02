#![warn(clippy::pedantic)]

pub mod decoder;
pub mod error;

mod decompression;

pub use decoder::{BlockDecoder, Decoder};
pub use decompression::MAX_BLOCK_DECOMPRESSED_SIZE;
pub use error::DecodeError;
