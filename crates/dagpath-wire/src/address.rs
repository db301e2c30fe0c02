use std::fmt;
use std::str::FromStr;

use sha2::Digest as _;

use crate::error::WireError;
use crate::varint::{decode_varint, push_varint};

/// Version prefix of every binary address.
pub const ADDRESS_VERSION: u64 = 1;

/// Multibase-style prefix of the textual address form (lowercase hex).
pub const TEXT_PREFIX: char = 'f';

/// How the bytes of a block are to be interpreted.
///
/// The codec is part of the address, so the same payload stored under two
/// codecs has two distinct addresses.
///
/// ```text
/// ┌─────────┬──────┬────────────────────────────────────────────┐
/// │ Codec   │ Tag  │ Body                                       │
/// ├─────────┼──────┼────────────────────────────────────────────┤
/// │ Raw     │ 0x55 │ opaque bytes                               │
/// │ DagNode │ 0x70 │ TLV: repeated named links + optional data  │
/// │ Value   │ 0x71 │ TLV: one kind-tagged value tree            │
/// └─────────┴──────┴────────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Codec {
    Raw,
    DagNode,
    Value,
}

impl Codec {
    /// The numeric tag written into the address.
    #[must_use]
    pub fn code(self) -> u64 {
        match self {
            Self::Raw => 0x55,
            Self::DagNode => 0x70,
            Self::Value => 0x71,
        }
    }

    /// Map a numeric tag back to a codec.
    ///
    /// # Errors
    ///
    /// [`WireError::UnknownCodec`] for unregistered tags.
    pub fn from_code(code: u64) -> Result<Self, WireError> {
        match code {
            0x55 => Ok(Self::Raw),
            0x70 => Ok(Self::DagNode),
            0x71 => Ok(Self::Value),
            other => Err(WireError::UnknownCodec { code: other }),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::DagNode => "dag-node",
            Self::Value => "value",
        }
    }
}

/// Hash function used to derive the address digest from the block bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashFn {
    #[default]
    Blake3,
    Sha2_256,
}

impl HashFn {
    #[must_use]
    pub fn code(self) -> u64 {
        match self {
            Self::Blake3 => 0x1e,
            Self::Sha2_256 => 0x12,
        }
    }

    /// # Errors
    ///
    /// [`WireError::UnknownHashFn`] for unregistered tags.
    pub fn from_code(code: u64) -> Result<Self, WireError> {
        match code {
            0x1e => Ok(Self::Blake3),
            0x12 => Ok(Self::Sha2_256),
            other => Err(WireError::UnknownHashFn { code: other }),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha2_256 => "sha2-256",
        }
    }

    /// Digest size in bytes.
    #[must_use]
    pub fn digest_len(self) -> usize {
        32
    }

    /// Hash `data` with this function.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Blake3 => blake3::hash(data).as_bytes().to_vec(),
            Self::Sha2_256 => sha2::Sha256::digest(data).to_vec(),
        }
    }
}

/// Self-describing identifier of an immutable block.
///
/// An address is derived from the exact bytes of a block and never changes
/// meaning. Two addresses are equal iff their binary forms are equal; the
/// decoded content of the block plays no part in equality.
///
/// Binary layout (all integers are LEB128 varints):
///
/// ```text
/// ┌────────────┬────────────┬─────────────┬──────────────┬─────────────┐
/// │ version=1  │ codec tag  │ hash fn tag │ digest_len   │ digest      │
/// └────────────┴────────────┴─────────────┴──────────────┴─────────────┘
/// ```
///
/// The text form is `f` followed by the lowercase hex of the binary form,
/// e.g. `f01701e20…` for a BLAKE3-addressed DAG node.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentAddress {
    codec: Codec,
    hash_fn: HashFn,
    digest: Vec<u8>,
}

impl ContentAddress {
    /// Build an address from its parts, checking the digest length.
    ///
    /// # Errors
    ///
    /// [`WireError::DigestLength`] when `digest` does not fit `hash_fn`.
    pub fn new(codec: Codec, hash_fn: HashFn, digest: Vec<u8>) -> Result<Self, WireError> {
        if digest.len() != hash_fn.digest_len() {
            return Err(WireError::DigestLength {
                hash_fn: hash_fn.name(),
                expected: hash_fn.digest_len(),
                found: digest.len(),
            });
        }
        Ok(Self {
            codec,
            hash_fn,
            digest,
        })
    }

    /// Hash the encoded block bytes and build the address for them.
    #[must_use]
    pub fn compute(codec: Codec, hash_fn: HashFn, block: &[u8]) -> Self {
        Self {
            codec,
            hash_fn,
            digest: hash_fn.digest(block),
        }
    }

    #[must_use]
    pub fn codec(&self) -> Codec {
        self.codec
    }

    #[must_use]
    pub fn hash_fn(&self) -> HashFn {
        self.hash_fn
    }

    #[must_use]
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Return `true` if `block` hashes to this address's digest.
    #[must_use]
    pub fn verify(&self, block: &[u8]) -> bool {
        self.hash_fn.digest(block) == self.digest
    }

    /// Serialize to the binary form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.digest.len());
        push_varint(&mut out, ADDRESS_VERSION);
        push_varint(&mut out, self.codec.code());
        push_varint(&mut out, self.hash_fn.code());
        push_varint(&mut out, self.digest.len() as u64);
        out.extend_from_slice(&self.digest);
        out
    }

    /// Read an address from the front of `buf`.
    ///
    /// Returns `(address, bytes_consumed)`.
    ///
    /// # Errors
    ///
    /// Any [`WireError`] describing a truncated or unregistered prefix.
    pub fn read_from(buf: &[u8]) -> Result<(Self, usize), WireError> {
        let mut cursor = 0;
        let next = |cursor: &mut usize| -> Result<u64, WireError> {
            let rest = buf
                .get(*cursor..)
                .ok_or(WireError::UnexpectedEof { offset: *cursor })?;
            let (value, n) = decode_varint(rest).map_err(|e| match e {
                WireError::UnexpectedEof { offset } => WireError::UnexpectedEof {
                    offset: *cursor + offset,
                },
                other => other,
            })?;
            *cursor += n;
            Ok(value)
        };

        let version = next(&mut cursor)?;
        if version != ADDRESS_VERSION {
            return Err(WireError::UnsupportedAddressVersion { version });
        }
        let codec = Codec::from_code(next(&mut cursor)?)?;
        let hash_fn = HashFn::from_code(next(&mut cursor)?)?;
        let len = usize::try_from(next(&mut cursor)?).unwrap_or(usize::MAX);
        if len != hash_fn.digest_len() {
            return Err(WireError::DigestLength {
                hash_fn: hash_fn.name(),
                expected: hash_fn.digest_len(),
                found: len,
            });
        }
        let digest = buf
            .get(cursor..cursor + len)
            .ok_or(WireError::UnexpectedEof { offset: buf.len() })?
            .to_vec();
        cursor += len;

        Ok((
            Self {
                codec,
                hash_fn,
                digest,
            },
            cursor,
        ))
    }

    /// Parse an address that must span all of `buf`.
    ///
    /// # Errors
    ///
    /// As [`read_from`](Self::read_from), plus [`WireError::TrailingData`].
    pub fn from_bytes(buf: &[u8]) -> Result<Self, WireError> {
        let (address, consumed) = Self::read_from(buf)?;
        if consumed != buf.len() {
            return Err(WireError::TrailingData {
                what: "address",
                extra_bytes: buf.len() - consumed,
            });
        }
        Ok(address)
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TEXT_PREFIX}{}", hex::encode(self.to_bytes()))
    }
}

impl fmt::Debug for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentAddress({self})")
    }
}

impl FromStr for ContentAddress {
    type Err = WireError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let hex_part = text
            .strip_prefix(TEXT_PREFIX)
            .ok_or_else(|| WireError::InvalidAddressText {
                text: text.to_string(),
                reason: "missing 'f' prefix",
            })?;
        let bytes = hex::decode(hex_part).map_err(|_| WireError::InvalidAddressText {
            text: text.to_string(),
            reason: "not lowercase hex",
        })?;
        Self::from_bytes(&bytes)
    }
}
