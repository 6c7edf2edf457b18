//! memprim: word-wise memory move/fill primitives and their validator
//!
//! - [`word_mover`] / [`word_filler`]: alignment-aware reference
//!   implementations of `memmove`/`memcpy` and `memset`
//! - [`candidate`]: the `Mover` / `Filler` seams and the built-in candidates
//! - [`validator`]: exhaustive alignment x length comparison of a candidate
//!   against the reference on canary-seeded regions
//! - [`bench`]: throughput driver over buffer sizes and alignments

// ============================================================================
// Reference primitives
// ============================================================================

pub mod word;
pub mod word_filler;
pub mod word_mover;

// ============================================================================
// Candidates
// ============================================================================

pub mod candidate;
#[cfg(feature = "opt-simd")]
pub mod simd;

// ============================================================================
// Validation and benchmarking
// ============================================================================

pub mod bench;
pub mod canary;
pub mod config;
pub mod outcome;
pub mod region;
pub mod validator;

pub use bench::{BenchContext, BenchSample, Bencher, format_rate};
pub use candidate::{
    ByteFiller, ByteMover, FILLER_NAMES, FillRoutine, Filler, MOVER_NAMES, MoveRoutine, Mover,
    NullMover, RoutineFiller, RoutineMover, StdFiller, StdMover, lookup_filler, lookup_mover,
};
pub use canary::{DEST_SEED, SOURCE_SEED, seed_canary};
pub use config::{BenchConfig, RunConfig, ValidationConfig};
pub use outcome::{
    FillDescriptor, Operation, OutcomeLog, TransferDescriptor, TrialDescriptor, ValidationOutcome,
    ValidationReport,
};
pub use region::MemoryRegion;
#[cfg(feature = "opt-simd")]
pub use simd::{SimdFiller, SimdMover, simd_feature_name};
pub use validator::{ValidationContext, Validator};
pub use word::{WORD_SIZE, Word, WordPattern};
pub use word_filler::{WordFiller, fill_slice, word_fill};
pub use word_mover::{WordMover, copy_into, move_within, word_copy, word_move};

pub use memprim_error::{MemError, MemResult};
