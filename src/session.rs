//! Caller-owned state for one interactive session.
//!
//! Created empty; each completed run replaces the previous one wholesale.
//! Results from different runs are never merged.

use crate::fanout::{BatchOptions, BatchOutcome};

#[derive(Debug, Default)]
pub struct Session {
    pub options: BatchOptions,
    last_run: Option<BatchOutcome>,
    runs: usize,
}

impl Session {
    pub fn new(options: BatchOptions) -> Self {
        Self {
            options,
            last_run: None,
            runs: 0,
        }
    }

    /// Stores `outcome` as the current run and hands back the one it replaced.
    pub fn replace(&mut self, outcome: BatchOutcome) -> Option<BatchOutcome> {
        self.runs += 1;
        self.last_run.replace(outcome)
    }

    pub fn last_run(&self) -> Option<&BatchOutcome> {
        self.last_run.as_ref()
    }

    pub fn runs(&self) -> usize {
        self.runs
    }
}
