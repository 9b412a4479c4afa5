use crate::{constants::GENESIS_PREVIOUS_HASH, pow::meets_difficulty, Block, ChainError};

/// How much a foreign chain is checked before it may replace the local one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Hash linkage and self-consistency only; historical difficulty is not checked.
    #[default]
    Linkage,
    /// Linkage plus the given difficulty on every block after genesis.
    Strict { difficulty: usize },
}

impl ValidationPolicy {
    pub fn check(&self, chain: &[Block]) -> Result<(), ChainError> {
        match *self {
            ValidationPolicy::Linkage => validate_chain(chain),
            ValidationPolicy::Strict { difficulty } => validate_chain_strict(chain, difficulty),
        }
    }
}

/// Walks the chain from genesis, checking that every block links to the hash
/// before it and that its stored hash is its own seal.
pub fn validate_chain(chain: &[Block]) -> Result<(), ChainError> {
    let mut expected_previous = GENESIS_PREVIOUS_HASH;
    for (position, block) in chain.iter().enumerate() {
        if block.previous_hash != expected_previous {
            return Err(ChainError::BrokenLink {
                position,
                expected: expected_previous.to_string(),
                found: block.previous_hash.clone(),
            });
        }
        let computed = block.seal();
        if block.hash != computed {
            return Err(ChainError::HashMismatch {
                position,
                stored: block.hash.clone(),
                computed,
            });
        }
        expected_previous = block.hash.as_str();
    }
    Ok(())
}

/// [`validate_chain`] plus the proof-of-work predicate on every non-genesis block.
pub fn validate_chain_strict(chain: &[Block], difficulty: usize) -> Result<(), ChainError> {
    validate_chain(chain)?;
    for (position, block) in chain.iter().enumerate().skip(1) {
        if !meets_difficulty(&block.hash, difficulty) {
            return Err(ChainError::InsufficientWork {
                position,
                hash: block.hash.clone(),
                difficulty,
            });
        }
    }
    Ok(())
}

pub fn is_valid(chain: &[Block]) -> bool {
    validate_chain(chain).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pow, Transaction};

    fn tx(content: &str) -> Transaction {
        Transaction {
            author: "alice".into(),
            content: content.into(),
            timestamp: "2024-01-01 00:00:00.000000".into(),
        }
    }

    fn mined_chain(len: usize, difficulty: usize) -> Vec<Block> {
        let mut chain = vec![Block::genesis()];
        for i in 1..len {
            let last = chain.last().unwrap();
            let mut block = Block::new(i as u64, vec![tx(&format!("post {i}"))], last.hash.clone());
            block.hash = pow::proof_of_work(&mut block, difficulty);
            chain.push(block);
        }
        chain
    }

    #[test]
    fn valid_chain_passes() {
        let chain = mined_chain(4, 2);
        assert!(is_valid(&chain));
        assert!(validate_chain_strict(&chain, 2).is_ok());
    }

    #[test]
    fn empty_chain_is_trivially_valid() {
        assert!(is_valid(&[]));
    }

    #[test]
    fn tampered_content_fails() {
        let mut chain = mined_chain(4, 2);
        chain[2].transactions[0].content = "forged".into();
        assert!(matches!(
            validate_chain(&chain),
            Err(ChainError::HashMismatch { position: 2, .. })
        ));
    }

    #[test]
    fn tampered_previous_hash_fails() {
        let mut chain = mined_chain(4, 2);
        chain[3].previous_hash = chain[1].hash.clone();
        assert!(matches!(
            validate_chain(&chain),
            Err(ChainError::BrokenLink { position: 3, .. })
        ));
    }

    #[test]
    fn tampered_nonce_fails() {
        let mut chain = mined_chain(4, 2);
        chain[1].nonce += 1;
        assert!(!is_valid(&chain));
    }

    #[test]
    fn every_single_block_mutation_is_caught() {
        let chain = mined_chain(5, 1);
        for i in 0..chain.len() {
            let mut copy = chain.clone();
            copy[i].nonce = copy[i].nonce.wrapping_add(1);
            assert!(!is_valid(&copy), "nonce change at {i} slipped through");

            let mut copy = chain.clone();
            copy[i].previous_hash.push('f');
            assert!(!is_valid(&copy), "link change at {i} slipped through");
        }
    }

    #[test]
    fn rehashed_forgery_breaks_the_next_link() {
        let mut chain = mined_chain(4, 2);
        chain[1].transactions[0].content = "forged".into();
        chain[1].hash = chain[1].seal();
        assert!(matches!(
            validate_chain(&chain),
            Err(ChainError::BrokenLink { position: 2, .. })
        ));
    }

    #[test]
    fn first_block_must_point_at_zero() {
        let mut chain = mined_chain(2, 1);
        chain.remove(0);
        assert!(matches!(
            validate_chain(&chain),
            Err(ChainError::BrokenLink { position: 0, .. })
        ));
    }

    #[test]
    fn linkage_policy_ignores_historical_difficulty() {
        let chain = mined_chain(3, 0);
        assert!(ValidationPolicy::Linkage.check(&chain).is_ok());
    }

    #[test]
    fn strict_policy_rejects_cheap_blocks() {
        let mut chain = vec![Block::genesis()];
        let mut block = Block::new(1, vec![tx("cheap")], chain[0].hash.clone());
        block.hash = block.seal();
        while pow::meets_difficulty(&block.hash, 2) {
            block.nonce += 1;
            block.hash = block.seal();
        }
        chain.push(block);
        assert!(is_valid(&chain));
        assert!(matches!(
            ValidationPolicy::Strict { difficulty: 2 }.check(&chain),
            Err(ChainError::InsufficientWork { position: 1, .. })
        ));
    }
}
