//! Trial descriptors, per-trial outcomes and sweep reports

use serde::{Deserialize, Serialize};
use std::fmt;

/// One move trial: offsets are displacements from the region bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferDescriptor {
    pub source_offset: usize,
    pub dest_offset: usize,
    pub length: usize,
}

/// One fill trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FillDescriptor {
    pub dest_offset: usize,
    pub length: usize,
    pub pattern: i32,
}

/// The trial that produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrialDescriptor {
    /// Source and destination in independent regions
    Move(TransferDescriptor),
    /// Source and destination inside the same region
    OverlapMove(TransferDescriptor),
    Fill(FillDescriptor),
}

impl fmt::Display for TrialDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialDescriptor::Move(d) => write!(
                f,
                "srcalign {}, dstalign {}, size {}",
                d.source_offset, d.dest_offset, d.length
            ),
            TrialDescriptor::OverlapMove(d) => write!(
                f,
                "in-place srcoff {}, dstoff {}, size {}",
                d.source_offset, d.dest_offset, d.length
            ),
            TrialDescriptor::Fill(d) => write!(
                f,
                "align {}, c {:#04x} ({}), size {}",
                d.dest_offset, d.pattern as u8, d.pattern, d.length
            ),
        }
    }
}

/// Which primitive a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Move,
    OverlapMove,
    Fill,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Move => write!(f, "memcpy"),
            Operation::OverlapMove => write!(f, "memmove (overlapping)"),
            Operation::Fill => write!(f, "memset"),
        }
    }
}

/// A diverging trial.
///
/// Only built from a non-empty diff, so an outcome always carries at least
/// one diverging index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub descriptor: TrialDescriptor,
    /// First diverging byte indices, relative to the region base
    pub diverging_indices: Vec<usize>,
    /// Total number of diverging bytes in the compared span
    pub diverging_total: usize,
}

impl ValidationOutcome {
    /// Compare two spans; `None` when they are identical.
    ///
    /// At most `max_indices` indices are kept (at least one is always kept).
    pub fn from_diff(
        descriptor: TrialDescriptor,
        expected: &[u8],
        actual: &[u8],
        max_indices: usize,
    ) -> Option<Self> {
        let keep = max_indices.max(1);
        let mut diverging_indices = Vec::new();
        let mut diverging_total = 0;

        for (index, (e, a)) in expected.iter().zip(actual).enumerate() {
            if e != a {
                if diverging_indices.len() < keep {
                    diverging_indices.push(index);
                }
                diverging_total += 1;
            }
        }

        // Bytes past the shorter span count as diverging too.
        let common = expected.len().min(actual.len());
        let extra = expected.len().max(actual.len()) - common;
        for index in common..common + extra {
            if diverging_indices.len() < keep {
                diverging_indices.push(index);
            }
        }
        diverging_total += extra;

        if diverging_total == 0 {
            None
        } else {
            Some(Self {
                descriptor,
                diverging_indices,
                diverging_total,
            })
        }
    }

    pub fn matched(&self) -> bool {
        self.diverging_indices.is_empty()
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error! {}: {} byte(s) differ, first at {:?}",
            self.descriptor, self.diverging_total, self.diverging_indices
        )?;
        if self.diverging_indices.len() < self.diverging_total {
            write!(f, " ...")?;
        }
        Ok(())
    }
}

/// Fixed-capacity list of outcomes.
///
/// Once full, further outcomes are counted in `dropped` but not stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeLog {
    capacity: usize,
    entries: Vec<ValidationOutcome>,
    dropped: u64,
}

impl OutcomeLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity.min(1024)),
            dropped: 0,
        }
    }

    /// Store `outcome` if there is room; returns whether it was stored.
    pub fn record(&mut self, outcome: ValidationOutcome) -> bool {
        if self.is_full() {
            self.dropped += 1;
            false
        } else {
            self.entries.push(outcome);
            true
        }
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationOutcome> {
        self.entries.iter()
    }
}

/// Result of one sweep of one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub operation: Operation,
    pub candidate: String,
    /// Trials executed
    pub trials: u64,
    /// Diverging trials, including those not stored in `outcomes`
    pub mismatches: u64,
    pub outcomes: OutcomeLog,
    /// Whether the sweep stopped early at the error ceiling
    pub halted: bool,
}

impl ValidationReport {
    pub fn new(operation: Operation, candidate: impl Into<String>, error_ceiling: usize) -> Self {
        Self {
            operation,
            candidate: candidate.into(),
            trials: 0,
            mismatches: 0,
            outcomes: OutcomeLog::with_capacity(error_ceiling),
            halted: false,
        }
    }

    /// Account for one trial; returns true once the ceiling has been reached.
    pub fn record_trial(&mut self, outcome: Option<ValidationOutcome>) -> bool {
        self.trials += 1;
        if let Some(outcome) = outcome {
            self.mismatches += 1;
            self.outcomes.record(outcome);
        }
        self.outcomes.is_full()
    }

    pub fn passed(&self) -> bool {
        self.mismatches == 0
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.passed() { "PASS" } else { "FAIL" };
        write!(
            f,
            "{} [{}]: {} - {} trials, {} mismatches",
            self.operation, self.candidate, verdict, self.trials, self.mismatches
        )?;
        if self.halted {
            write!(f, " (halted at error ceiling {})", self.outcomes.capacity())?;
        }
        Ok(())
    }
}
