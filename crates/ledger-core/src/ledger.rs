use tracing::{info, warn};

use crate::{
    constants::POW_DEFAULT_DIFFICULTY,
    pow::{self, is_valid_proof},
    Block, LedgerError, LedgerResult, Transaction, ValidationPolicy,
};

/// The canonical chain and the pool of transactions waiting to be mined.
///
/// A `Ledger` is a plain owned value; callers that share it between tasks
/// put it behind a single lock. Every mutating method either completes or
/// leaves the ledger untouched.
#[derive(Clone, Debug)]
pub struct Ledger {
    chain: Vec<Block>,
    pool: Vec<Transaction>,
    difficulty: usize,
    policy: ValidationPolicy,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(POW_DEFAULT_DIFFICULTY)
    }
}

impl Ledger {
    /// Fresh ledger holding only a genesis block.
    pub fn new(difficulty: usize) -> Self {
        Self {
            chain: vec![Block::genesis()],
            pool: Vec::new(),
            difficulty,
            policy: ValidationPolicy::Linkage,
        }
    }

    /// Policy applied to chains offered through [`Ledger::replace_chain`].
    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pool
    }

    pub fn last_block(&self) -> &Block {
        // the chain is never empty: it starts with genesis and bootstrap refuses empty dumps
        &self.chain[self.chain.len() - 1]
    }

    /// Number of blocks, genesis included.
    pub fn height(&self) -> usize {
        self.chain.len()
    }

    pub fn submit_transaction(
        &mut self,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> LedgerResult<Transaction> {
        let tx = Transaction::new(author, content)?;
        self.pool.push(tx.clone());
        Ok(tx)
    }

    /// Unmined block over a snapshot of the pool, or `None` if the pool is empty.
    pub fn candidate(&self) -> LedgerResult<Option<Block>> {
        if self.pool.is_empty() {
            return Ok(None);
        }
        let last = self.last_block();
        // indices are not validated on adopted chains, so the tip may already be at the limit
        let index = last
            .index
            .checked_add(1)
            .ok_or(LedgerError::IndexOverflow { tip: last.index })?;
        Ok(Some(Block::new(index, self.pool.clone(), last.hash.clone())))
    }

    /// Mines the whole pool into one block on the calling thread.
    /// `Ok(None)` means there was nothing to mine.
    pub fn mine(&mut self) -> LedgerResult<Option<u64>> {
        let Some(mut block) = self.candidate()? else {
            return Ok(None);
        };
        let proof = pow::proof_of_work(&mut block, self.difficulty);
        self.commit_mined(block, proof).map(Some)
    }

    /// Second half of a mining job whose proof-of-work ran without the ledger.
    ///
    /// Accepts the block like [`Ledger::add_block`] and then drains exactly the
    /// transactions it absorbed from the front of the pool; anything submitted
    /// while the proof was being searched stays pooled.
    pub fn commit_mined(&mut self, block: Block, proof: String) -> LedgerResult<u64> {
        self.check_block(&block, &proof)?;
        if !self.pool.starts_with(&block.transactions) {
            return Err(LedgerError::PoolChanged { index: block.index });
        }
        let absorbed = block.transactions.len();
        let index = self.append(block, proof);
        self.pool.drain(..absorbed);
        Ok(index)
    }

    /// Accepts a block on top of the current tip if `proof` is its valid proof-of-work.
    pub fn add_block(&mut self, block: Block, proof: &str) -> LedgerResult<u64> {
        if let Err(err) = self.check_block(&block, proof) {
            warn!(index = block.index, %err, "block rejected");
            return Err(err);
        }
        Ok(self.append(block, proof.to_string()))
    }

    fn check_block(&self, block: &Block, proof: &str) -> LedgerResult<()> {
        let tip = &self.last_block().hash;
        if block.previous_hash != *tip {
            return Err(LedgerError::StaleParent {
                expected: tip.clone(),
                found: block.previous_hash.clone(),
            });
        }
        if !is_valid_proof(block, proof, self.difficulty) {
            return Err(LedgerError::InvalidProof { index: block.index });
        }
        Ok(())
    }

    fn append(&mut self, mut block: Block, proof: String) -> u64 {
        block.hash = proof;
        let index = block.index;
        info!(index, hash = %block.hash, txs = block.transactions.len(), "block appended");
        self.chain.push(block);
        index
    }

    /// Swaps in a peer's chain if it is strictly longer and passes the ledger's policy.
    pub fn replace_chain(&mut self, new_chain: Vec<Block>) -> LedgerResult<()> {
        if new_chain.len() <= self.chain.len() {
            return Err(LedgerError::NotLonger {
                offered: new_chain.len(),
                current: self.chain.len(),
            });
        }
        self.policy.check(&new_chain)?;
        info!(from = self.chain.len(), to = new_chain.len(), "chain replaced");
        self.chain = new_chain;
        Ok(())
    }

    /// Adopts a chain dump from a trusted node without validating it.
    pub fn bootstrap(&mut self, chain: Vec<Block>) -> LedgerResult<()> {
        if chain.is_empty() {
            return Err(LedgerError::EmptyChain);
        }
        info!(length = chain.len(), "chain adopted from bootstrap node");
        self.chain = chain;
        Ok(())
    }
}
