use serde::{Deserialize, Serialize};

use crate::Block;

/// Full snapshot a node hands out on `/chain` and `/register_node`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDump {
    pub length: usize,
    pub chain: Vec<Block>,
    pub peers: Vec<String>,
}

impl ChainDump {
    pub fn new(chain: Vec<Block>, peers: Vec<String>) -> Self {
        Self {
            length: chain.len(),
            chain,
            peers,
        }
    }

    /// The advertised length must match the blocks actually sent.
    pub fn is_consistent(&self) -> bool {
        self.length == self.chain.len()
    }
}
