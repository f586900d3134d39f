use merkledrop_hash::{leaf_hash, Address, Digest};
use merkledrop_merkle::{MerkleError, MerkleTree};
use merkledrop_units::{to_base_units, AmountError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One allocation line: who gets how much, amount as decimal text so the
/// fixed-point conversion stays exact.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Record {
    pub address: Address,
    pub amount: String,
}

impl Record {
    pub fn new(address: Address, amount: impl Into<String>) -> Self {
        Self {
            address,
            amount: amount.into(),
        }
    }
}

/// Claimable entry produced by [`merklize`]: the converted base-unit amount,
/// the leaf position (needed to orient the proof), and the sibling path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub address: Address,
    pub amount: u128,
    pub index: usize,
    pub proof: Vec<Digest>,
}

impl Award {
    pub fn verify(&self, root: &Digest) -> bool {
        verify_award(root, &self.address, self.amount, self.index, &self.proof)
    }
}

/// Output of [`merklize`]: the commitment root plus one award per record,
/// in input order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub root: Digest,
    pub awards: Vec<Award>,
}

impl Distribution {
    /// First award for `address`. Duplicate addresses get independent
    /// awards; callers that allow duplicates must index by position.
    pub fn award_for(&self, address: &Address) -> Option<&Award> {
        self.awards.iter().find(|a| a.address == *address)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerklizeError {
    #[error("cannot merklize an empty record list")]
    EmptyInput,
    #[error("record {index} ({address}): {source}")]
    Amount {
        index: usize,
        address: Address,
        source: AmountError,
    },
    #[error(transparent)]
    Tree(#[from] MerkleError),
}

/// Build the commitment for one airdrop: convert every amount to base
/// units, hash the leaves in input order, build the tree, and open a proof
/// for every record. Deterministic; nothing is built on error.
pub fn merklize(records: &[Record]) -> Result<Distribution, MerklizeError> {
    if records.is_empty() {
        return Err(MerklizeError::EmptyInput);
    }
    let mut units = Vec::with_capacity(records.len());
    let mut leaves = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let amount = to_base_units(&record.amount).map_err(|source| MerklizeError::Amount {
            index,
            address: record.address,
            source,
        })?;
        leaves.push(leaf_hash(&record.address, amount));
        units.push(amount);
    }
    let tree = MerkleTree::build(&leaves)?;
    let root = tree.root();

    let mut awards = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        awards.push(Award {
            address: record.address,
            amount: units[index],
            index,
            proof: tree.open(index)?,
        });
    }
    Ok(Distribution { root, awards })
}

/// Recompute the canonical leaf and fold it against `root`.
pub fn verify_award(
    root: &Digest,
    address: &Address,
    amount: u128,
    index: usize,
    proof: &[Digest],
) -> bool {
    MerkleTree::verify(root, index, &leaf_hash(address, amount), proof)
}

/// Several independent inclusion proofs packed into one blob: the hashes of
/// all proofs concatenated in claim order, and a length table saying how
/// many belong to each. `lengths[i]` slices out sub-proof `i`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedProof {
    pub hashes: Vec<Digest>,
    pub lengths: Vec<usize>,
}

impl CombinedProof {
    pub fn proof_count(&self) -> usize {
        self.lengths.len()
    }

    /// Slice the blob back into the original sub-proofs. Fails if the
    /// length table does not account for every hash exactly.
    pub fn split(&self) -> Result<Vec<&[Digest]>, CombineError> {
        let expected: usize = self.lengths.iter().sum();
        if expected != self.hashes.len() {
            return Err(CombineError::LengthMismatch {
                expected,
                actual: self.hashes.len(),
            });
        }
        let mut parts = Vec::with_capacity(self.lengths.len());
        let mut offset = 0;
        for &len in &self.lengths {
            parts.push(&self.hashes[offset..offset + len]);
            offset += len;
        }
        Ok(parts)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombineError {
    #[error("no proofs to combine")]
    EmptyInput,
    #[error("length table accounts for {expected} hashes but blob holds {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Pack independent proofs (one per airdrop, in the order the claim will
/// present its airdrop ids) into a [`CombinedProof`]. Pure repacking: no
/// hashing, no validation, inputs untouched.
pub fn combine_proofs(proofs: &[Vec<Digest>]) -> Result<CombinedProof, CombineError> {
    if proofs.is_empty() {
        return Err(CombineError::EmptyInput);
    }
    let lengths = proofs.iter().map(Vec::len).collect();
    let hashes = proofs.iter().flatten().copied().collect();
    Ok(CombinedProof { hashes, lengths })
}
