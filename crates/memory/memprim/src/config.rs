//! Run configuration
//!
//! Defaults reproduce the classic sweep: offsets `[0, 64)`, lengths
//! `[0, 256)`, fill values `-1 ..= 256`, and benchmark buffers from 4 KiB to
//! 16 MiB moving 1 GiB per sample.

use std::path::Path;

use memprim_error::{MemError, MemResult};
use serde::{Deserialize, Serialize};

use crate::region::DEFAULT_REGION_ALIGN;

/// Parameters of the validation sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Source offsets are swept over `[0, max_source_align)`
    pub max_source_align: usize,
    /// Destination offsets are swept over `[0, max_dest_align)`
    pub max_dest_align: usize,
    /// Lengths are swept over `[0, max_length)`
    pub max_length: usize,
    /// Lowest fill value (inclusive)
    pub min_pattern: i32,
    /// Highest fill value (inclusive)
    pub max_pattern: i32,
    /// Mismatches stored per report
    pub error_ceiling: usize,
    /// Diverging indices stored per mismatch
    pub max_indices_per_outcome: usize,
    /// Stop the sweep once the ceiling is reached
    pub halt_on_ceiling: bool,
    /// Base alignment of the working regions
    pub region_align: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_source_align: 64,
            max_dest_align: 64,
            max_length: 256,
            min_pattern: -1,
            max_pattern: 256,
            error_ceiling: 32,
            max_indices_per_outcome: 16,
            halt_on_ceiling: false,
            region_align: DEFAULT_REGION_ALIGN,
        }
    }
}

impl ValidationConfig {
    /// Bytes seeded and compared per trial.
    ///
    /// Twice the longest transfer, and never less than the furthest byte a
    /// trial can touch. Saturates; [`validate`](Self::validate) rejects
    /// configurations whose span does not fit a `usize`.
    pub fn working_span(&self) -> usize {
        self.checked_working_span().unwrap_or(usize::MAX)
    }

    fn checked_working_span(&self) -> Option<usize> {
        let furthest = self
            .max_source_align
            .max(self.max_dest_align)
            .checked_add(self.max_length)?;
        Some(self.max_length.checked_mul(2)?.max(furthest))
    }

    /// Number of trials of the move sweep
    pub fn move_trials(&self) -> u64 {
        self.checked_move_trials().unwrap_or(u64::MAX)
    }

    fn checked_move_trials(&self) -> Option<u64> {
        u64::try_from(self.max_source_align)
            .ok()?
            .checked_mul(u64::try_from(self.max_dest_align).ok()?)?
            .checked_mul(u64::try_from(self.max_length).ok()?)
    }

    /// Number of trials of the fill sweep
    pub fn fill_trials(&self) -> u64 {
        self.checked_fill_trials().unwrap_or(u64::MAX)
    }

    fn checked_fill_trials(&self) -> Option<u64> {
        let patterns = u64::try_from(i64::from(self.max_pattern) - i64::from(self.min_pattern) + 1)
            .unwrap_or(0);
        u64::try_from(self.max_dest_align)
            .ok()?
            .checked_mul(u64::try_from(self.max_length).ok()?)?
            .checked_mul(patterns)
    }

    pub fn validate(&self) -> MemResult<()> {
        if self.max_source_align == 0 || self.max_dest_align == 0 {
            return Err(MemError::InvalidConfig(
                "alignment ranges must not be empty".to_string(),
            ));
        }
        if self.max_length == 0 {
            return Err(MemError::InvalidConfig(
                "length range must not be empty".to_string(),
            ));
        }
        if !self.region_align.is_power_of_two() {
            return Err(MemError::InvalidConfig(format!(
                "region alignment {} is not a power of two",
                self.region_align
            )));
        }
        if self.max_source_align > self.region_align || self.max_dest_align > self.region_align {
            return Err(MemError::InvalidConfig(format!(
                "offsets up to {} exceed the region alignment {}",
                self.max_source_align.max(self.max_dest_align),
                self.region_align
            )));
        }
        if self.min_pattern > self.max_pattern {
            return Err(MemError::InvalidConfig(format!(
                "fill range {}..={} is empty",
                self.min_pattern, self.max_pattern
            )));
        }
        if self.error_ceiling == 0 {
            return Err(MemError::InvalidConfig(
                "error ceiling must be at least 1".to_string(),
            ));
        }
        if self.checked_working_span().is_none()
            || self.checked_move_trials().is_none()
            || self.checked_fill_trials().is_none()
        {
            return Err(MemError::InvalidConfig(format!(
                "sweep of length {} at offsets up to {} overflows",
                self.max_length,
                self.max_source_align.max(self.max_dest_align)
            )));
        }
        Ok(())
    }
}

/// Parameters of the throughput benchmark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// First buffer size
    pub min_buffer_size: usize,
    /// Last buffer size (inclusive)
    pub max_buffer_size: usize,
    /// Factor between consecutive buffer sizes
    pub size_multiplier: usize,
    /// Bytes moved per sample; iterations = total / size
    pub total_transfer: u64,
    /// Alignments are stepped up to this value
    pub max_alignment: usize,
    pub region_align: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            min_buffer_size: 4 * 1024,
            max_buffer_size: 16 * 1024 * 1024,
            size_multiplier: 4,
            total_transfer: 1024 * 1024 * 1024,
            max_alignment: 64,
            region_align: DEFAULT_REGION_ALIGN,
        }
    }
}

impl BenchConfig {
    /// Capacity of each benchmark region
    pub fn region_len(&self) -> usize {
        self.max_buffer_size
            .saturating_add(self.max_alignment.max(256))
    }

    pub fn validate(&self) -> MemResult<()> {
        if self.min_buffer_size == 0 || self.min_buffer_size > self.max_buffer_size {
            return Err(MemError::InvalidConfig(format!(
                "buffer sizes {}..={} are not a valid range",
                self.min_buffer_size, self.max_buffer_size
            )));
        }
        if self.size_multiplier < 2 {
            return Err(MemError::InvalidConfig(
                "size multiplier must be at least 2".to_string(),
            ));
        }
        if self.total_transfer == 0 {
            return Err(MemError::InvalidConfig(
                "total transfer must be non-zero".to_string(),
            ));
        }
        if !self.region_align.is_power_of_two() {
            return Err(MemError::InvalidConfig(format!(
                "region alignment {} is not a power of two",
                self.region_align
            )));
        }
        if self
            .max_buffer_size
            .checked_add(self.max_alignment.max(256))
            .is_none()
        {
            return Err(MemError::InvalidConfig(format!(
                "buffer size {} overflows the region length",
                self.max_buffer_size
            )));
        }
        if self.max_alignment > self.region_align {
            return Err(MemError::InvalidConfig(format!(
                "alignment steps up to {} exceed the region alignment {}",
                self.max_alignment, self.region_align
            )));
        }
        Ok(())
    }
}

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub validation: ValidationConfig,
    pub bench: BenchConfig,
}

impl RunConfig {
    /// Load a JSON configuration file
    pub fn from_file(path: &Path) -> MemResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| MemError::Parse {
            message: format!("{}: {}", path.display(), e),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MemResult<()> {
        self.validation.validate()?;
        self.bench.validate()
    }
}
