use serde::{Deserialize, Serialize};
use sha3::{Digest as _, Keccak256};
use std::fmt;
use std::str::FromStr;

pub const DIGEST_LEN: usize = 32;
pub const ADDRESS_LEN: usize = 20;
/// Width of the fixed-point amount field inside a leaf preimage.
pub const AMOUNT_LEN: usize = 32;

pub type Digest = [u8; DIGEST_LEN];

#[inline]
pub fn keccak256(data: &[u8]) -> Digest {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Node hash: `keccak256(left ++ right)`. Pair order is fixed by the tree.
#[inline]
pub fn hash_pair(left: &[u8], right: &[u8]) -> Digest {
    let mut hasher = Keccak256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Fixed-width big-endian encoding of a base-unit amount, zero-extended to
/// 32 bytes. Part of the committed leaf preimage; must never change.
#[inline]
pub fn amount_be_bytes(units: u128) -> [u8; AMOUNT_LEN] {
    let mut out = [0u8; AMOUNT_LEN];
    out[AMOUNT_LEN - 16..].copy_from_slice(&units.to_be_bytes());
    out
}

/// Leaf hash: `keccak256(address(20) ++ amount_be(32))`.
#[inline]
pub fn leaf_hash(address: &Address, units: u128) -> Digest {
    let mut hasher = Keccak256::new();
    hasher.update(address.as_bytes());
    hasher.update(amount_be_bytes(units));
    hasher.finalize().into()
}

/// A 20-byte recipient identity in canonical Ethereum address form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", hex::encode(self.0))
    }
}
