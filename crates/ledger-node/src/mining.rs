use ledger_core::{mine::proof_of_work_parallel, pow::proof_of_work, Block, LedgerError};
use tracing::{info, warn};

use crate::{constants::MINE_ATTEMPTS, error::ApiError, state::AppState};

#[derive(Debug)]
pub enum MineOutcome {
    Mined(Block),
    NothingToMine,
}

/// Mines the pending pool into a new block.
///
/// The ledger is locked only to snapshot the pool and to commit. The search
/// runs on the blocking pool so `/chain` and friends stay responsive. If the
/// tip moves while searching, the job is rebuilt on the new tip and retried.
pub async fn mine(state: &AppState) -> Result<MineOutcome, ApiError> {
    if state.config.parallel_mining {
        mine_with(state, proof_of_work_parallel).await
    } else {
        mine_with(state, proof_of_work).await
    }
}

async fn mine_with<F>(state: &AppState, search: F) -> Result<MineOutcome, ApiError>
where
    F: Fn(&mut Block, usize) -> String + Clone + Send + 'static,
{
    let _job = state.mining.lock().await;

    for attempt in 1..=MINE_ATTEMPTS {
        let (candidate, difficulty) = {
            let ledger = state.ledger.read().await;
            match ledger.candidate()? {
                Some(block) => (block, ledger.difficulty()),
                None => return Ok(MineOutcome::NothingToMine),
            }
        };

        let search = search.clone();
        let (block, proof) = tokio::task::spawn_blocking(move || {
            let mut block = candidate;
            let proof = search(&mut block, difficulty);
            (block, proof)
        })
        .await?;

        let mut ledger = state.ledger.write().await;
        match ledger.commit_mined(block, proof) {
            Ok(index) => {
                info!(index, attempt, "mined block");
                return Ok(MineOutcome::Mined(ledger.last_block().clone()));
            }
            Err(err @ (LedgerError::StaleParent { .. } | LedgerError::PoolChanged { .. })) => {
                warn!(attempt, %err, "chain moved during mining, rebuilding job");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(ApiError::MiningAbandoned(MINE_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use ledger_core::is_valid;

    use super::*;
    use crate::{config::NodeConfig, state::SharedState};

    fn node(difficulty: usize) -> SharedState {
        AppState::new(NodeConfig {
            difficulty,
            ..NodeConfig::default()
        })
        .unwrap()
    }

    /// Lands an empty block on the current tip, as a peer's `/add_block` would.
    fn land_rival_block(state: &AppState) {
        let mut ledger = state.ledger.blocking_write();
        let tip = ledger.last_block();
        let mut rival = Block::new(tip.index + 1, vec![], tip.hash.clone());
        let proof = proof_of_work(&mut rival, ledger.difficulty());
        ledger.add_block(rival, &proof).unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn job_is_rebuilt_when_tip_moves_during_search() {
        let state = node(1);
        state
            .ledger
            .write()
            .await
            .submit_transaction("a", "queued")
            .unwrap();

        let searches = Arc::new(AtomicUsize::new(0));
        let search = {
            let state = state.clone();
            let searches = searches.clone();
            move |block: &mut Block, difficulty: usize| {
                if searches.fetch_add(1, Ordering::SeqCst) == 0 {
                    land_rival_block(&state);
                }
                proof_of_work(block, difficulty)
            }
        };

        let MineOutcome::Mined(block) = mine_with(&state, search).await.unwrap() else {
            panic!("expected a mined block");
        };
        assert_eq!(searches.load(Ordering::SeqCst), 2);
        assert_eq!(block.index, 2);
        assert_eq!(block.transactions[0].content, "queued");

        let ledger = state.ledger.read().await;
        assert_eq!(ledger.height(), 3);
        assert_eq!(block.previous_hash, ledger.chain()[1].hash);
        assert!(ledger.chain()[1].transactions.is_empty());
        assert!(ledger.pending().is_empty());
        assert!(is_valid(ledger.chain()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn job_is_abandoned_when_tip_never_settles() {
        let state = node(1);
        state
            .ledger
            .write()
            .await
            .submit_transaction("a", "unlucky")
            .unwrap();

        let search = {
            let state = state.clone();
            move |block: &mut Block, difficulty: usize| {
                land_rival_block(&state);
                proof_of_work(block, difficulty)
            }
        };

        let err = mine_with(&state, search).await.unwrap_err();
        assert!(matches!(err, ApiError::MiningAbandoned(MINE_ATTEMPTS)));

        let ledger = state.ledger.read().await;
        assert_eq!(ledger.height(), 1 + MINE_ATTEMPTS);
        assert_eq!(ledger.pending().len(), 1);
    }

    #[tokio::test]
    async fn empty_pool_mines_nothing() {
        let state = node(1);
        assert!(matches!(
            mine(&state).await.unwrap(),
            MineOutcome::NothingToMine
        ));
        assert_eq!(state.ledger.read().await.height(), 1);
    }
}
