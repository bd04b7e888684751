//! Journal of the mutations a reflow issued.
//!
//! Provides a ring buffer of recent mutations so a failed or surprising run
//! can be reconstructed. `reanchor --trace` dumps it as JSON.

use std::collections::VecDeque;
use std::time::Instant;

use serde::Serialize;

/// Maximum number of entries to keep in the journal
const DEFAULT_MAX_ENTRIES: usize = 256;

/// How a failed call is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Failure aborts the run
    Propagate,
    /// Failure is logged and the run continues
    Tolerate,
}

/// Result of a journaled call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallOutcome {
    Ok,
    Failed { error: String },
}

/// A single journaled mutation
#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    pub sequence: u64,
    pub timestamp_ms: u64,
    pub action: String,
    pub policy: Policy,
    #[serde(flatten)]
    pub outcome: CallOutcome,
}

/// Mutation journal with ring buffer storage
pub struct Journal {
    entries: VecDeque<JournalEntry>,
    max_entries: usize,
    sequence: u64,
    /// Tolerated calls that failed, including evicted ones
    tolerated_failures: usize,
    start_time: Instant,
}

impl Journal {
    /// Create a new journal with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Create a new journal with specified capacity
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries),
            max_entries,
            sequence: 0,
            tolerated_failures: 0,
            start_time: Instant::now(),
        }
    }

    fn timestamp(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Record a call and how it ended
    pub fn record(&mut self, action: String, policy: Policy, outcome: CallOutcome) {
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }

        self.sequence += 1;
        if policy == Policy::Tolerate && outcome != CallOutcome::Ok {
            self.tolerated_failures += 1;
        }
        self.entries.push_back(JournalEntry {
            sequence: self.sequence,
            timestamp_ms: self.timestamp(),
            action,
            policy,
            outcome,
        });
    }

    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    /// Number of calls that failed but were allowed to continue
    pub fn tolerated_failures(&self) -> usize {
        self.tolerated_failures
    }

    /// Total number of calls recorded, including evicted ones
    pub fn total(&self) -> u64 {
        self.sequence
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let entries: Vec<&JournalEntry> = self.entries().collect();
        serde_json::to_string_pretty(&entries)
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}
