// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Port grouping: ports joined by connections, transitively, share one transport.

use std::collections::HashMap;

use crate::graph::PortRef;

/// Union-find over port identities.
#[derive(Debug, Default)]
pub(crate) struct PortGroups {
    index: HashMap<PortRef, usize>,
    order: Vec<PortRef>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

/// The finished partition. Groups are numbered in order of first appearance.
#[derive(Debug)]
pub(crate) struct Grouping {
    pub(crate) members: Vec<Vec<PortRef>>,
    group_of: HashMap<PortRef, usize>,
}

impl Grouping {
    pub(crate) fn group_of(&self, port: &PortRef) -> Option<usize> {
        self.group_of.get(port).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }
}

impl PortGroups {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a port as its own group if it is not known yet.
    pub(crate) fn insert(&mut self, port: &PortRef) -> usize {
        if let Some(&slot) = self.index.get(port) {
            return slot;
        }
        let slot = self.order.len();
        self.index.insert(port.clone(), slot);
        self.order.push(port.clone());
        self.parent.push(slot);
        self.rank.push(0);
        slot
    }

    pub(crate) fn union(&mut self, a: &PortRef, b: &PortRef) {
        let a = self.insert(a);
        let b = self.insert(b);
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a == root_b {
            return;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
    }

    fn find(&mut self, mut slot: usize) -> usize {
        while self.parent[slot] != slot {
            // path halving
            self.parent[slot] = self.parent[self.parent[slot]];
            slot = self.parent[slot];
        }
        slot
    }

    pub(crate) fn finish(mut self) -> Grouping {
        let mut numbering: HashMap<usize, usize> = HashMap::new();
        let mut members: Vec<Vec<PortRef>> = Vec::new();
        let mut group_of = HashMap::with_capacity(self.order.len());

        for slot in 0..self.order.len() {
            let root = self.find(slot);
            let group = *numbering.entry(root).or_insert_with(|| {
                members.push(Vec::new());
                members.len() - 1
            });
            let port = self.order[slot].clone();
            members[group].push(port.clone());
            group_of.insert(port, group);
        }

        Grouping { members, group_of }
    }
}
