use crate::{pow::meets_difficulty, Block};
use rayon::prelude::*;
use tracing::debug;

/// Nonces examined per parallel round.
const NONCE_BATCH: u64 = 1 << 16;

/// Parallel counterpart of [`crate::pow::proof_of_work`].
///
/// Nonces are searched in consecutive batches; within a batch rayon's `find_first`
/// keeps the lowest hit, so the result is the same smallest nonce the sequential
/// search would find.
pub fn proof_of_work_parallel(block: &mut Block, difficulty: usize) -> String {
    let template = block.seal_template();
    let mut start = 0u64;
    loop {
        let end = start.saturating_add(NONCE_BATCH);
        let found = (start..end)
            .into_par_iter()
            .map(|nonce| (nonce, template.digest(nonce)))
            .find_first(|(_, hash)| meets_difficulty(hash, difficulty));

        if let Some((nonce, hash)) = found {
            debug!(index = block.index, nonce, "parallel search found proof");
            block.nonce = nonce;
            return hash;
        }
        // past u64::MAX the search wraps, matching the sequential loop
        start = if end == u64::MAX { 0 } else { end };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pow, Transaction};

    fn candidate(content: &str) -> Block {
        Block {
            index: 4,
            transactions: vec![Transaction {
                author: "miner".into(),
                content: content.into(),
                timestamp: "2024-03-03 10:00:00.000000".into(),
            }],
            timestamp: "2024-03-03 10:00:01.000000".into(),
            previous_hash: "00aa".into(),
            nonce: 0,
            hash: String::new(),
        }
    }

    #[test]
    fn parallel_and_sequential_agree() {
        for content in ["one", "two", "three"] {
            let mut seq = candidate(content);
            let mut par = candidate(content);
            let h_seq = pow::proof_of_work(&mut seq, 3);
            let h_par = proof_of_work_parallel(&mut par, 3);
            assert_eq!(seq.nonce, par.nonce);
            assert_eq!(h_seq, h_par);
        }
    }

    #[test]
    fn parallel_result_is_a_valid_proof() {
        let mut block = candidate("proof");
        let hash = proof_of_work_parallel(&mut block, 2);
        assert!(pow::is_valid_proof(&block, &hash, 2));
    }
}
