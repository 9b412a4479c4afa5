use tracing::{debug, warn};

use crate::{ChainDump, ValidationPolicy};

/// A chain offered by one peer during a resolution round.
#[derive(Clone, Debug)]
pub struct ChainCandidate {
    pub peer: String,
    pub dump: ChainDump,
}

/// Longest-chain rule over the chains collected in one pass.
///
/// A candidate qualifies only if it is strictly longer than `local_len`, its
/// advertised length is honest, and it passes `policy`. Among qualifying
/// candidates of the same maximal length the one seen last wins.
pub fn select_longest<I>(
    local_len: usize,
    candidates: I,
    policy: ValidationPolicy,
) -> Option<ChainCandidate>
where
    I: IntoIterator<Item = ChainCandidate>,
{
    let mut best: Option<ChainCandidate> = None;
    for candidate in candidates {
        let length = candidate.dump.length;
        if !candidate.dump.is_consistent() {
            warn!(
                peer = %candidate.peer,
                advertised = length,
                actual = candidate.dump.chain.len(),
                "peer advertised a length its chain does not have"
            );
            continue;
        }
        let to_beat = best.as_ref().map(|b| b.dump.length);
        if length <= local_len || to_beat.is_some_and(|best_len| length < best_len) {
            debug!(peer = %candidate.peer, length, local_len, "peer chain not longer");
            continue;
        }
        if let Err(err) = policy.check(&candidate.dump.chain) {
            warn!(peer = %candidate.peer, %err, "discarding invalid peer chain");
            continue;
        }
        best = Some(candidate);
    }
    best
}
