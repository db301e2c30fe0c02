//! Bucket arithmetic shared by the shard builder and the shard reifier.
//!
//! A sharded directory spreads its entries over a trie of DAG nodes. Each
//! level consumes `log2(fanout)` bits of the BLAKE3 hash of an entry name,
//! most significant bit first, to pick a bucket. Link names in a shard are
//! prefixed with the bucket as fixed-width uppercase hex:
//!
//! ```text
//! ┌───────────────────┬─────────────────────────────────────────┐
//! │ Link name         │ Meaning                                 │
//! ├───────────────────┼─────────────────────────────────────────┤
//! │ "1F"              │ child shard for bucket 0x1F             │
//! │ "1Freadme.md"     │ entry "readme.md" stored in bucket 0x1F │
//! └───────────────────┴─────────────────────────────────────────┘
//! ```

use crate::error::TypeError;

/// Default fanout of a shard: 256 buckets, two hex digits per prefix.
pub const DEFAULT_FANOUT: u64 = 256;

/// Largest supported fanout.
pub const MAX_FANOUT: u64 = 4096;

/// The geometry of one sharded directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShardLayout {
    fanout: u64,
    bits: u32,
    width: usize,
}

/// One parsed shard link name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShardLinkName<'a> {
    Child { bucket: u64 },
    Entry { bucket: u64, name: &'a str },
}

impl ShardLayout {
    /// # Errors
    ///
    /// [`TypeError::InvalidEnumValue`] unless `fanout` is a power of two in
    /// `2..=MAX_FANOUT`.
    pub fn new(fanout: u64) -> Result<Self, TypeError> {
        if !fanout.is_power_of_two() || !(2..=MAX_FANOUT).contains(&fanout) {
            return Err(TypeError::InvalidEnumValue {
                enum_name: "fanout",
                value: fanout,
            });
        }
        let bits = fanout.trailing_zeros();
        Ok(Self {
            fanout,
            bits,
            width: bits.div_ceil(4) as usize,
        })
    }

    #[must_use]
    pub fn fanout(self) -> u64 {
        self.fanout
    }

    /// Hex digits in every bucket prefix.
    #[must_use]
    pub fn width(self) -> usize {
        self.width
    }

    /// Deepest level at which the hash still has unused bits.
    #[must_use]
    pub fn max_level(self) -> u32 {
        256 / self.bits - 1
    }

    /// The bucket `name` falls into at `level`.
    #[must_use]
    pub fn bucket(self, name: &str, level: u32) -> u64 {
        let hash = blake3::hash(name.as_bytes());
        let bytes = hash.as_bytes();
        let start = (level.min(self.max_level()) * self.bits) as usize;
        let mut bucket = 0u64;
        for bit in start..start + self.bits as usize {
            let set = (bytes[bit / 8] >> (7 - bit % 8)) & 1;
            bucket = (bucket << 1) | u64::from(set);
        }
        bucket
    }

    #[must_use]
    pub fn prefix(self, bucket: u64) -> String {
        format!("{bucket:0width$X}", width = self.width)
    }

    /// Split a shard link name into its bucket and, for entries, the name.
    ///
    /// # Errors
    ///
    /// [`TypeError::InvalidEnumValue`] if the prefix is not hex or names a
    /// bucket beyond the fanout.
    pub fn parse<'a>(self, link_name: &'a str) -> Result<ShardLinkName<'a>, TypeError> {
        let invalid = || TypeError::InvalidEnumValue {
            enum_name: "shard bucket",
            value: self.fanout,
        };
        let prefix = link_name.get(..self.width).ok_or_else(invalid)?;
        if !prefix.bytes().all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b)) {
            return Err(invalid());
        }
        let bucket = u64::from_str_radix(prefix, 16).map_err(|_| invalid())?;
        if bucket >= self.fanout {
            return Err(invalid());
        }
        let rest = &link_name[self.width..];
        Ok(if rest.is_empty() {
            ShardLinkName::Child { bucket }
        } else {
            ShardLinkName::Entry { bucket, name: rest }
        })
    }
}
