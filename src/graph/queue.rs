use std::collections::{HashSet, VecDeque};

use crate::package::hash::ContentHash;
use crate::package::manifest::{Dependency, Package};

/// FIFO of dependency edges still to visit.
///
/// A hash is accepted at most once over the queue's lifetime, so draining
/// it visits every package of a closure exactly once no matter how many
/// importers share it.
#[derive(Debug, Default)]
pub struct DependencyQueue {
    pending: VecDeque<Dependency>,
    seen: HashSet<ContentHash>,
}

impl DependencyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue every dependency of `pkg` not seen before. Returns how many
    /// were added.
    pub fn enqueue(&mut self, pkg: &Package) -> usize {
        let mut added = 0;
        for dep in &pkg.dependencies {
            if self.seen.insert(dep.hash) {
                self.pending.push_back(dep.clone());
                added += 1;
            }
        }
        added
    }

    pub fn dequeue(&mut self) -> Option<Dependency> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn seen(&self, hash: &ContentHash) -> bool {
        self.seen.contains(hash)
    }
}
