//! In-memory airdrop registry and claim verifier.
//!
//! This is the collaborator that owns airdrop state (root, pause flag,
//! unlock time) and the exactly-once claim ledger. It consumes roots from
//! `merkledrop_proof::merklize` and verifies single or combined claims
//! against them. It holds no token balances; crediting the transfer is the
//! caller's job, as is any access control around the mutating methods.

use merkledrop_hash::{Address, Digest};
use merkledrop_proof::{verify_award, CombineError, CombinedProof};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

pub type AirdropId = u64;

/// One distribution event. `root` is the published commitment; `data_uri`
/// points at the full off-chain leaf data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Airdrop {
    pub id: AirdropId,
    pub root: Digest,
    pub data_uri: String,
    pub unlock_timestamp: u64,
    pub paused: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("unknown airdrop id {0}")]
    UnknownAirdrop(AirdropId),
    #[error("airdrop {0} is paused")]
    Paused(AirdropId),
    #[error("airdrop {0} is locked until {1}")]
    Locked(AirdropId, u64),
    #[error("airdrop {0} already claimed by {1}")]
    AlreadyClaimed(AirdropId, Address),
    #[error("inclusion proof for airdrop {0} does not match its root")]
    InvalidProof(AirdropId),
    #[error("claim arrays disagree: {0} ids, {1} amounts, {2} indices, {3} sub-proofs")]
    MalformedClaim(usize, usize, usize, usize),
    #[error("claim lists no airdrops")]
    EmptyClaim,
    #[error(transparent)]
    Combine(#[from] CombineError),
}

/// A batched claim across several airdrops. Everything travels in one
/// struct so the id, amount, index and sub-proof at position `i` can never
/// drift apart: sub-proof `i` of `proof` is checked against the root of
/// `airdrop_ids[i]` for `(claimant, amounts[i])` at leaf `indices[i]`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultiClaim {
    pub airdrop_ids: Vec<AirdropId>,
    pub claimant: Address,
    pub amounts: Vec<u128>,
    pub indices: Vec<usize>,
    pub proof: CombinedProof,
}

/// Registry of live airdrops plus the ledger of spent claims. Ids count up
/// from 1 in registration order.
#[derive(Clone, Debug, Default)]
pub struct AirdropRegistry {
    airdrops: Vec<Airdrop>,
    claimed: HashSet<(AirdropId, Address)>,
}

impl AirdropRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new commitment and return its id.
    pub fn start(&mut self, root: Digest, data_uri: impl Into<String>, unlock_timestamp: u64) -> AirdropId {
        let id = self.airdrops.len() as AirdropId + 1;
        self.airdrops.push(Airdrop {
            id,
            root,
            data_uri: data_uri.into(),
            unlock_timestamp,
            paused: false,
        });
        id
    }

    pub fn count(&self) -> usize {
        self.airdrops.len()
    }

    pub fn get(&self, id: AirdropId) -> Result<&Airdrop, ClaimError> {
        id.checked_sub(1)
            .and_then(|i| self.airdrops.get(i as usize))
            .ok_or(ClaimError::UnknownAirdrop(id))
    }

    pub fn set_pause(&mut self, id: AirdropId, paused: bool) -> Result<(), ClaimError> {
        let i = id
            .checked_sub(1)
            .map(|i| i as usize)
            .filter(|&i| i < self.airdrops.len())
            .ok_or(ClaimError::UnknownAirdrop(id))?;
        self.airdrops[i].paused = paused;
        Ok(())
    }

    pub fn is_claimed(&self, id: AirdropId, claimant: &Address) -> bool {
        self.claimed.contains(&(id, *claimant))
    }

    /// Claim a single award. `now` is the caller's clock (seconds); the
    /// registry does no I/O. On success the claim is recorded and the
    /// credited amount returned.
    pub fn award(
        &mut self,
        id: AirdropId,
        claimant: Address,
        amount: u128,
        index: usize,
        proof: &[Digest],
        now: u64,
    ) -> Result<u128, ClaimError> {
        self.check_claim(id, &claimant, amount, index, proof, now)?;
        self.claimed.insert((id, claimant));
        Ok(amount)
    }

    /// Claim several airdrops in one call. All-or-nothing: every sub-claim
    /// is validated before any is recorded, so a single bad entry (or a
    /// repeated id within the batch) leaves the ledger untouched.
    pub fn award_from_many(&mut self, claim: &MultiClaim, now: u64) -> Result<u128, ClaimError> {
        let n = claim.airdrop_ids.len();
        if n == 0 {
            return Err(ClaimError::EmptyClaim);
        }
        if n != claim.amounts.len()
            || n != claim.indices.len()
            || n != claim.proof.proof_count()
        {
            return Err(ClaimError::MalformedClaim(
                n,
                claim.amounts.len(),
                claim.indices.len(),
                claim.proof.proof_count(),
            ));
        }
        let parts = claim.proof.split()?;

        let mut seen = HashSet::with_capacity(n);
        for i in 0..n {
            let id = claim.airdrop_ids[i];
            if !seen.insert(id) {
                return Err(ClaimError::AlreadyClaimed(id, claim.claimant));
            }
            self.check_claim(id, &claim.claimant, claim.amounts[i], claim.indices[i], parts[i], now)?;
        }
        for &id in &claim.airdrop_ids {
            self.claimed.insert((id, claim.claimant));
        }
        Ok(claim.amounts.iter().sum())
    }

    fn check_claim(
        &self,
        id: AirdropId,
        claimant: &Address,
        amount: u128,
        index: usize,
        proof: &[Digest],
        now: u64,
    ) -> Result<(), ClaimError> {
        let airdrop = self.get(id)?;
        if airdrop.paused {
            return Err(ClaimError::Paused(id));
        }
        if now < airdrop.unlock_timestamp {
            return Err(ClaimError::Locked(id, airdrop.unlock_timestamp));
        }
        if self.is_claimed(id, claimant) {
            return Err(ClaimError::AlreadyClaimed(id, *claimant));
        }
        if !verify_award(&airdrop.root, claimant, amount, index, proof) {
            return Err(ClaimError::InvalidProof(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merkledrop_proof::{combine_proofs, merklize, Record};

    fn addr(b: u8) -> Address {
        Address([b; merkledrop_hash::ADDRESS_LEN])
    }

    fn records() -> Vec<Record> {
        vec![
            Record::new(addr(1), "123.4567"),
            Record::new(addr(2), "0.001"),
            Record::new(addr(3), "2.001"),
        ]
    }

    #[test]
    fn users_claim_their_awards_once() {
        let setup = merklize(&records()).unwrap();
        let mut reg = AirdropRegistry::new();
        let id = reg.start(setup.root, "mock-data-uri", 0);
        assert_eq!(reg.count(), 1);

        for award in &setup.awards {
            let got = reg
                .award(id, award.address, award.amount, award.index, &award.proof, 100)
                .unwrap();
            assert_eq!(got, award.amount);
            assert!(reg.is_claimed(id, &award.address));
        }
        let a = &setup.awards[0];
        assert_eq!(
            reg.award(id, a.address, a.amount, a.index, &a.proof, 100),
            Err(ClaimError::AlreadyClaimed(id, a.address))
        );
    }

    #[test]
    fn claims_across_two_airdrops_with_one_combined_proof() {
        // Same claimant owed 1 token in two separate drops
        let drop1 = merklize(&[Record::new(addr(4), "1"), Record::new(addr(5), "1")]).unwrap();
        let drop2 = merklize(&[Record::new(addr(4), "1"), Record::new(addr(5), "1")]).unwrap();

        let mut reg = AirdropRegistry::new();
        let id1 = reg.start(drop1.root, "mock-data-uri", 0);
        let id2 = reg.start(drop2.root, "mock-data-uri", 0);
        assert_eq!(reg.count(), 2);

        let a1 = drop1.award_for(&addr(4)).unwrap();
        let a2 = drop2.award_for(&addr(4)).unwrap();
        let proof = combine_proofs(&[a1.proof.clone(), a2.proof.clone()]).unwrap();
        let claim = MultiClaim {
            airdrop_ids: vec![id1, id2],
            claimant: addr(4),
            amounts: vec![a1.amount, a2.amount],
            indices: vec![a1.index, a2.index],
            proof,
        };
        let credited = reg.award_from_many(&claim, 100).unwrap();
        assert_eq!(credited, 2 * merkledrop_units::SCALE);
        assert!(reg.is_claimed(id1, &addr(4)));
        assert!(reg.is_claimed(id2, &addr(4)));
        // Replay of the whole batch fails and changes nothing
        assert!(matches!(
            reg.award_from_many(&claim, 100),
            Err(ClaimError::AlreadyClaimed(_, _))
        ));
    }

    #[test]
    fn refuses_to_claim_when_paused() {
        let setup = merklize(&records()).unwrap();
        let mut reg = AirdropRegistry::new();
        let id = reg.start(setup.root, "mock-data-uri", 0);
        reg.set_pause(id, true).unwrap();

        let a = &setup.awards[2];
        assert_eq!(
            reg.award(id, a.address, a.amount, a.index, &a.proof, 100),
            Err(ClaimError::Paused(id))
        );

        reg.set_pause(id, false).unwrap();
        assert!(reg.award(id, a.address, a.amount, a.index, &a.proof, 100).is_ok());
    }

    #[test]
    fn refuses_to_claim_when_locked() {
        let setup = merklize(&records()).unwrap();
        let mut reg = AirdropRegistry::new();
        let id = reg.start(setup.root, "mock-data-uri", 500);

        let a = &setup.awards[0];
        assert_eq!(
            reg.award(id, a.address, a.amount, a.index, &a.proof, 499),
            Err(ClaimError::Locked(id, 500))
        );
        assert!(reg.award(id, a.address, a.amount, a.index, &a.proof, 500).is_ok());
    }

    #[test]
    fn rejects_wrong_amount_and_unknown_airdrop() {
        let setup = merklize(&records()).unwrap();
        let mut reg = AirdropRegistry::new();
        let id = reg.start(setup.root, "mock-data-uri", 0);

        let a = &setup.awards[0];
        assert_eq!(
            reg.award(id, a.address, a.amount + 1, a.index, &a.proof, 100),
            Err(ClaimError::InvalidProof(id))
        );
        assert_eq!(
            reg.award(99, a.address, a.amount, a.index, &a.proof, 100),
            Err(ClaimError::UnknownAirdrop(99))
        );
        assert_eq!(
            reg.award(0, a.address, a.amount, a.index, &a.proof, 100),
            Err(ClaimError::UnknownAirdrop(0))
        );
    }

    #[test]
    fn bad_batch_leaves_the_ledger_untouched() {
        let drop1 = merklize(&records()).unwrap();
        let drop2 = merklize(&[Record::new(addr(1), "1")]).unwrap();
        let mut reg = AirdropRegistry::new();
        let id1 = reg.start(drop1.root, "mock-data-uri", 0);
        let id2 = reg.start(drop2.root, "mock-data-uri", 0);
        reg.set_pause(id2, true).unwrap();

        let a1 = drop1.award_for(&addr(1)).unwrap();
        let a2 = drop2.award_for(&addr(1)).unwrap();
        let claim = MultiClaim {
            airdrop_ids: vec![id1, id2],
            claimant: addr(1),
            amounts: vec![a1.amount, a2.amount],
            indices: vec![a1.index, a2.index],
            proof: combine_proofs(&[a1.proof.clone(), a2.proof.clone()]).unwrap(),
        };
        assert_eq!(reg.award_from_many(&claim, 100), Err(ClaimError::Paused(id2)));
        // The valid first sub-claim must not have been recorded
        assert!(!reg.is_claimed(id1, &addr(1)));
    }

    #[test]
    fn batch_with_no_airdrops_is_rejected() {
        let mut reg = AirdropRegistry::new();
        let claim = MultiClaim {
            airdrop_ids: vec![],
            claimant: addr(1),
            amounts: vec![],
            indices: vec![],
            proof: CombinedProof {
                hashes: vec![],
                lengths: vec![],
            },
        };
        assert_eq!(reg.award_from_many(&claim, 100), Err(ClaimError::EmptyClaim));
    }

    #[test]
    fn malformed_batches_are_rejected() {
        let setup = merklize(&records()).unwrap();
        let mut reg = AirdropRegistry::new();
        let id = reg.start(setup.root, "mock-data-uri", 0);
        let a = &setup.awards[0];

        // Amounts list shorter than ids list
        let claim = MultiClaim {
            airdrop_ids: vec![id, id],
            claimant: a.address,
            amounts: vec![a.amount],
            indices: vec![a.index, a.index],
            proof: combine_proofs(&[a.proof.clone(), a.proof.clone()]).unwrap(),
        };
        assert!(matches!(
            reg.award_from_many(&claim, 100),
            Err(ClaimError::MalformedClaim(2, 1, 2, 2))
        ));

        // Length table that lies about the blob
        let mut proof = combine_proofs(&[a.proof.clone()]).unwrap();
        proof.lengths[0] += 1;
        let claim = MultiClaim {
            airdrop_ids: vec![id],
            claimant: a.address,
            amounts: vec![a.amount],
            indices: vec![a.index],
            proof,
        };
        assert!(matches!(
            reg.award_from_many(&claim, 100),
            Err(ClaimError::Combine(CombineError::LengthMismatch { .. }))
        ));
    }
}
