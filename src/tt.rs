//! Transposition table.
//!
//! A fixed-size array of single-entry buckets indexed by `hash % size`.
//! Probes only return an entry whose full 64-bit key matches, so index
//! collisions can cost a lookup but never corrupt the search.

use crate::defs::SQ_NONE;

/// 2^20 entries, ~24MB.
pub const TT_SIZE: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TTFlag {
    /// Score is exact within the searched window.
    Exact,
    /// Fail-low: score is an upper bound.
    Alpha,
    /// Fail-high: score is a lower bound.
    Beta,
}

#[derive(Clone, Copy)]
pub struct TTEntry {
    pub key: u64,
    pub score: i16,
    pub depth: i8,
    pub flag: TTFlag,
    /// Best move found at this node; `SQ_NONE` when unknown.
    pub best_from: u8,
    pub best_to: u8,
    pub age: u8,
}

const EMPTY_ENTRY: TTEntry = TTEntry {
    key: 0,
    score: 0,
    depth: 0,
    flag: TTFlag::Exact,
    best_from: SQ_NONE,
    best_to: SQ_NONE,
    age: 0,
};

pub struct TranspositionTable {
    entries: Vec<TTEntry>,
    age: u8,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::with_capacity(TT_SIZE)
    }

    /// Smaller tables are only used by tests.
    pub fn with_capacity(size: usize) -> Self {
        TranspositionTable {
            entries: vec![EMPTY_ENTRY; size.max(1)],
            age: 0,
        }
    }

    /// Bumps the age counter; called once per top-level search so stale
    /// entries lose their replacement priority.
    pub fn new_search(&mut self) {
        self.age = self.age.wrapping_add(1);
    }

    pub fn age(&self) -> u8 {
        self.age
    }

    pub fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = EMPTY_ENTRY;
        }
        self.age = 0;
    }

    /// Returns the bucket entry only on a full key match.
    pub fn probe(&self, key: u64) -> Option<&TTEntry> {
        let index = (key % self.entries.len() as u64) as usize;
        let entry = &self.entries[index];
        if entry.key == key && entry.key != 0 {
            Some(entry)
        } else {
            None
        }
    }

    /// Stores an entry, favoring same-key updates and fresher or deeper
    /// data: replace when the bucket is empty, holds the same key, was
    /// written by an older search, or is not deeper than the incoming entry.
    pub fn store(&mut self, key: u64, score: i16, depth: i8, flag: TTFlag, best_from: u8, best_to: u8) {
        let index = (key % self.entries.len() as u64) as usize;
        let entry = &mut self.entries[index];

        let replace = entry.key == 0
            || entry.key == key
            || entry.age != self.age
            || entry.depth <= depth;

        if replace {
            *entry = TTEntry {
                key,
                score,
                depth,
                flag,
                best_from,
                best_to,
                age: self.age,
            };
        }
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        TranspositionTable::new()
    }
}
