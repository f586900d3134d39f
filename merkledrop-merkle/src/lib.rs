use merkledrop_hash::{hash_pair, Digest, DIGEST_LEN};
use rayon::prelude::*;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("cannot build a tree from zero leaves")]
    EmptyInput,
    #[error("leaf index {index} out of range for {leaves} leaves")]
    IndexOutOfRange { index: usize, leaves: usize },
}

/// Binary Merkle tree over a fixed leaf sequence, stored as a flat heap
/// array: `nodes[1]` is the root, children of `i` sit at `2i` and `2i+1`.
///
/// The leaf level is padded to the next power of two by repeating the last
/// leaf. This padding rule is committed into the root; the index-parity
/// verifier below assumes it and must never diverge from the builder.
#[derive(Clone, Debug)]
pub struct MerkleTree {
    nodes: Vec<Digest>,
    leaf_count: usize,
}

impl MerkleTree {
    pub fn build(leaves: &[Digest]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyInput);
        }
        let n = leaves.len().next_power_of_two();
        let mut nodes = vec![[0u8; DIGEST_LEN]; 2 * n];
        // Fill leaves in parallel; padding slots repeat the last real leaf
        nodes[n..n + n].par_iter_mut().enumerate().for_each(|(i, slot)| {
            *slot = if i < leaves.len() {
                leaves[i]
            } else {
                leaves[leaves.len() - 1]
            };
        });
        for i in (1..n).rev() {
            nodes[i] = hash_pair(&nodes[i << 1], &nodes[i << 1 | 1]);
        }
        Ok(Self {
            nodes,
            leaf_count: leaves.len(),
        })
    }

    pub fn root(&self) -> Digest {
        self.nodes[1]
    }

    /// Number of real (unpadded) leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Proof length for every leaf: log2 of the padded leaf count.
    pub fn depth(&self) -> usize {
        (self.nodes.len() / 2).trailing_zeros() as usize
    }

    /// Authentication path for the leaf at `idx`, bottom-up.
    pub fn open(&self, mut idx: usize) -> Result<Vec<Digest>, MerkleError> {
        if idx >= self.leaf_count {
            return Err(MerkleError::IndexOutOfRange {
                index: idx,
                leaves: self.leaf_count,
            });
        }
        let base = self.nodes.len() / 2;
        idx += base;
        let mut path = Vec::with_capacity(self.depth());
        while idx > 1 {
            path.push(self.nodes[idx ^ 1]);
            idx >>= 1;
        }
        Ok(path)
    }

    /// Fold `leaf` up through `path`, pairing left or right by the parity of
    /// the index at each level, and compare against `root`.
    pub fn verify(root: &Digest, mut idx: usize, leaf: &Digest, path: &[Digest]) -> bool {
        let mut h = *leaf;
        for sib in path {
            h = if idx % 2 == 0 {
                hash_pair(&h, sib)
            } else {
                hash_pair(sib, &h)
            };
            idx >>= 1;
        }
        h == *root
    }
}
