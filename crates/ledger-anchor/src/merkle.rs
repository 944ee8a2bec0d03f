//! Merkle tree and inclusion proofs.
//!
//! A lone unpaired leaf is *duplicated* and paired with itself; a lone
//! unpaired node at any level above the leaves is promoted unchanged into
//! the next level instead of being re-duplicated. Every leaf gets a
//! bottom-up sibling proof rather than just a membership test. The
//! level-building loop produces a full `Vec<Vec<Hash>>` of levels bottom-up,
//! combining pairs with `SHA256(left || right)`.

use ledger_contracts::error::{LedgerError, LedgerResult};
use ledger_crypto::sha256;

/// A raw 32-byte SHA-256 digest, used uniformly for leaves and internal
/// nodes.
pub type Hash32 = [u8; 32];

fn combine(left: &Hash32, right: &Hash32) -> Hash32 {
    let mut data = Vec::with_capacity(64);
    data.extend_from_slice(left);
    data.extend_from_slice(right);
    sha256(&data)
}

/// Which side of the combine a proof step's sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Sibling is the left operand: `combine(sibling, current)`.
    Left,
    /// Sibling is the right operand: `combine(current, sibling)`.
    Right,
}

/// The bottom-up sibling path for one leaf.
#[derive(Debug, Clone)]
pub struct MerkleProof {
    pub leaf_index: usize,
    pub siblings: Vec<(Hash32, Position)>,
}

impl MerkleProof {
    /// Recomputes the root from `leaf` and this proof's sibling path.
    pub fn verify(&self, leaf: Hash32, root: Hash32) -> bool {
        let mut current = leaf;
        for (sibling, position) in &self.siblings {
            current = match position {
                Position::Left => combine(sibling, &current),
                Position::Right => combine(&current, sibling),
            };
        }
        current == root
    }
}

/// A Merkle tree built over a contiguous batch of event hashes.
///
/// `levels[0]` holds the leaves; each subsequent level halves (rounding up)
/// until `levels.last()` holds the single root node. A lone unpaired *leaf*
/// is duplicated and paired with itself, since a leaf has no other
/// representation to fall back on. A lone unpaired node at any level above
/// the leaves is promoted unchanged into the next level instead — it is
/// paired once it meets another node higher up, never re-duplicated.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    /// Builds a tree over `leaves`. `leaves` must be non-empty — an anchor
    /// batch is only ever created over a non-empty contiguous range.
    pub fn build(leaves: Vec<Hash32>) -> LedgerResult<Self> {
        if leaves.is_empty() {
            return Err(LedgerError::ValidationError {
                reason: "cannot build a Merkle tree over zero leaves".to_string(),
            });
        }

        let mut levels = vec![leaves];
        while levels.last().expect("levels is never empty").len() > 1 {
            let is_leaf_level = levels.len() == 1;
            let current = levels.last().expect("levels is never empty");
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            let mut i = 0;
            while i + 1 < current.len() {
                next.push(combine(&current[i], &current[i + 1]));
                i += 2;
            }
            if i < current.len() {
                if is_leaf_level {
                    next.push(combine(&current[i], &current[i]));
                } else {
                    next.push(current[i]);
                }
            }
            levels.push(next);
        }

        Ok(Self { levels })
    }

    pub fn root(&self) -> Hash32 {
        self.levels.last().expect("levels is never empty")[0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// The sibling path for leaf `leaf_index`, bottom-up.
    pub fn proof(&self, leaf_index: usize) -> LedgerResult<MerkleProof> {
        if leaf_index >= self.levels[0].len() {
            return Err(LedgerError::ValidationError {
                reason: format!("leaf index {leaf_index} is out of range"),
            });
        }

        let mut siblings = Vec::new();
        let mut index = leaf_index;
        for (level_idx, level) in self.levels[..self.levels.len() - 1].iter().enumerate() {
            let is_unpaired_tail = level.len() % 2 == 1 && index == level.len() - 1;
            if is_unpaired_tail && level_idx > 0 {
                // Promoted unchanged into the next level; no sibling here.
                index /= 2;
                continue;
            }
            let is_left = index % 2 == 0;
            let sibling_index = if is_left {
                if index + 1 < level.len() { index + 1 } else { index }
            } else {
                index - 1
            };
            let position = if is_left { Position::Right } else { Position::Left };
            siblings.push((level[sibling_index], position));
            index /= 2;
        }

        Ok(MerkleProof { leaf_index, siblings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(byte: u8) -> Hash32 {
        [byte; 32]
    }

    #[test]
    fn every_leaf_proves_inclusion() {
        let leaves = vec![leaf(0), leaf(1), leaf(2), leaf(3), leaf(4)];
        let tree = MerkleTree::build(leaves.clone()).unwrap();
        let root = tree.root();
        for (i, l) in leaves.iter().enumerate() {
            let proof = tree.proof(i).unwrap();
            assert!(proof.verify(*l, root), "leaf {i} failed to verify");
        }
    }

    #[test]
    fn odd_level_duplicates_last_leaf() {
        let five = MerkleTree::build(vec![leaf(0), leaf(1), leaf(2), leaf(3), leaf(4)]).unwrap();
        let six = MerkleTree::build(vec![leaf(0), leaf(1), leaf(2), leaf(3), leaf(4), leaf(4)]).unwrap();
        assert_eq!(five.root(), six.root());
    }

    #[test]
    fn no_duplication_at_even_size() {
        let four = MerkleTree::build(vec![leaf(0), leaf(1), leaf(2), leaf(3)]).unwrap();
        // 4 leaves pair cleanly at every level; the root must differ from
        // any tree that duplicated a node.
        let tampered = MerkleTree::build(vec![leaf(0), leaf(1), leaf(2), leaf(3), leaf(3)]).unwrap();
        assert_ne!(four.root(), tampered.root());
    }

    #[test]
    fn proof_matches_expected_path_for_five_leaves() {
        // Batch of 5 leaves h0..h4: h4 is the odd one out, duplicated once
        // at the leaf level then carried up unchanged. For leaf 2 the
        // sibling path is h3 (right), hash(h0,h1) (left), hash(h4,h4)
        // (right).
        let leaves = vec![leaf(0), leaf(1), leaf(2), leaf(3), leaf(4)];
        let tree = MerkleTree::build(leaves.clone()).unwrap();
        let proof = tree.proof(2).unwrap();

        assert_eq!(proof.siblings[0], (leaf(3), Position::Right));
        assert_eq!(proof.siblings[1], (combine(&leaf(0), &leaf(1)), Position::Left));
        assert_eq!(proof.siblings[2], (combine(&leaf(4), &leaf(4)), Position::Right));
        assert!(proof.verify(leaf(2), tree.root()));
    }

    #[test]
    fn tampered_leaf_fails_verification() {
        let leaves = vec![leaf(0), leaf(1), leaf(2), leaf(3)];
        let tree = MerkleTree::build(leaves).unwrap();
        let proof = tree.proof(1).unwrap();
        assert!(!proof.verify(leaf(9), tree.root()));
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(MerkleTree::build(vec![]).is_err());
    }
}
