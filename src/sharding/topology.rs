use crate::config::ShardConfig;

use std::collections::HashMap;
use std::hash::Hasher;
use thiserror::Error;
use twox_hash::XxHash64;

const HASH_SEED: u64 = 0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("no shards configured")]
    Empty,

    #[error("duplicate shard found, index: {0}")]
    DuplicateIndex(usize),

    #[error("shard with index {0} was not found")]
    MissingIndex(usize),

    #[error("shard {0:?} was not found")]
    UnknownShard(String),
}

/// Validated static shard layout as seen from one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    count: usize,
    current: usize,
    addrs: HashMap<usize, String>,
}

impl Topology {
    /// Builds the topology for the node named `self_name`.
    ///
    /// Fails when an index repeats, when indices do not cover `0..n` exactly,
    /// or when `self_name` is not among the entries.
    pub fn build(shards: &[ShardConfig], self_name: &str) -> Result<Self, TopologyError> {
        if shards.is_empty() {
            return Err(TopologyError::Empty);
        }

        let count = shards.len();
        let mut addrs = HashMap::with_capacity(count);
        let mut current = None;

        for shard in shards {
            if addrs.insert(shard.idx, shard.address.clone()).is_some() {
                return Err(TopologyError::DuplicateIndex(shard.idx));
            }
            if shard.name == self_name {
                current = Some(shard.idx);
            }
        }

        // With `count` distinct indices, every one of 0..count present means no gaps.
        if let Some(missing) = (0..count).find(|idx| !addrs.contains_key(idx)) {
            return Err(TopologyError::MissingIndex(missing));
        }

        let current = current.ok_or_else(|| TopologyError::UnknownShard(self_name.to_string()))?;

        Ok(Self {
            count,
            current,
            addrs,
        })
    }

    pub fn shard_count(&self) -> usize {
        self.count
    }

    /// Index of the shard this node serves.
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Shard index that owns `key`.
    pub fn owner_of(&self, key: &[u8]) -> usize {
        let mut hasher = XxHash64::with_seed(HASH_SEED);
        hasher.write(key);
        (hasher.finish() % self.count as u64) as usize
    }

    pub fn is_local(&self, key: &[u8]) -> bool {
        self.owner_of(key) == self.current
    }

    pub fn address_of(&self, shard: usize) -> Option<&str> {
        self.addrs.get(&shard).map(String::as_str)
    }

    /// Address of this node's own shard; on a replica this is the leader to poll.
    pub fn current_address(&self) -> Option<&str> {
        self.address_of(self.current)
    }
}
