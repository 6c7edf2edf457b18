//! Exhaustive correctness oracle
//!
//! Every trial re-seeds four independent regions with the canary pattern,
//! runs the reference transform on the primary pair and the candidate on
//! the shadow pair with the same descriptor, then compares the whole working
//! span of both destinations. Comparing the full span (not only the
//! transferred bytes) catches candidates that write past their length.
//!
//! The sweep never aborts on a mismatch. Stored diagnostics are bounded by
//! the report's [`OutcomeLog`](crate::outcome::OutcomeLog); with
//! `halt_on_ceiling` the sweep additionally stops once that log is full.

use memprim_error::{MemError, MemResult};

use crate::candidate::{Filler, Mover};
use crate::canary::{DEST_SEED, SOURCE_SEED, seed_canary};
use crate::config::ValidationConfig;
use crate::outcome::{
    FillDescriptor, Operation, TransferDescriptor, TrialDescriptor, ValidationOutcome,
    ValidationReport,
};
use crate::region::MemoryRegion;
use crate::word_filler::word_fill;
use crate::word_mover::word_move;

/// Working buffers of a validation run.
///
/// Owned by the driver and lent to a [`Validator`]; freed when dropped.
#[derive(Debug)]
pub struct ValidationContext {
    source: MemoryRegion,
    dest: MemoryRegion,
    shadow_source: MemoryRegion,
    shadow_dest: MemoryRegion,
}

impl ValidationContext {
    /// Allocate four regions of `len` bytes aligned to `align`.
    ///
    /// If any allocation fails the regions already acquired are released
    /// before the error is returned.
    pub fn new(len: usize, align: usize) -> MemResult<Self> {
        let ctx = Self {
            source: MemoryRegion::new(len, align)?,
            dest: MemoryRegion::new(len, align)?,
            shadow_source: MemoryRegion::new(len, align)?,
            shadow_dest: MemoryRegion::new(len, align)?,
        };
        log::info!(
            "validation regions: src {:p}, dst {:p}, src2 {:p}, dst2 {:p} ({} bytes each)",
            ctx.source.as_ptr(),
            ctx.dest.as_ptr(),
            ctx.shadow_source.as_ptr(),
            ctx.shadow_dest.as_ptr(),
            len
        );
        Ok(ctx)
    }

    /// Allocate regions sized for `config` once it has been validated.
    pub fn for_config(config: &ValidationConfig) -> MemResult<Self> {
        config.validate()?;
        Self::new(config.working_span(), config.region_align)
    }

    /// Usable bytes per region
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn reseed(&mut self, span: usize) {
        seed_canary(&mut self.source.as_mut_slice()[..span], SOURCE_SEED);
        seed_canary(&mut self.shadow_source.as_mut_slice()[..span], SOURCE_SEED);
        seed_canary(&mut self.dest.as_mut_slice()[..span], DEST_SEED);
        seed_canary(&mut self.shadow_dest.as_mut_slice()[..span], DEST_SEED);
    }

    fn compare(
        &self,
        descriptor: TrialDescriptor,
        span: usize,
        max_indices: usize,
    ) -> Option<ValidationOutcome> {
        ValidationOutcome::from_diff(
            descriptor,
            &self.dest.as_slice()[..span],
            &self.shadow_dest.as_slice()[..span],
            max_indices,
        )
    }
}

/// Drives the reference and a candidate over the alignment x length grid.
pub struct Validator<'ctx> {
    config: ValidationConfig,
    ctx: &'ctx mut ValidationContext,
}

impl<'ctx> Validator<'ctx> {
    pub fn new(config: ValidationConfig, ctx: &'ctx mut ValidationContext) -> MemResult<Self> {
        config.validate()?;
        let span = config.working_span();
        if ctx.len() < span {
            return Err(MemError::OutOfBounds {
                offset: 0,
                length: span,
                capacity: ctx.len(),
            });
        }
        Ok(Self { config, ctx })
    }

    /// Sweep source offset x destination offset x length for a memcpy-like
    /// candidate, with source and destination in independent regions.
    pub fn validate_move(&mut self, candidate: &dyn Mover) -> ValidationReport {
        let cfg = self.config.clone();
        let span = cfg.working_span();
        let mut report = ValidationReport::new(Operation::Move, candidate.name(), cfg.error_ceiling);

        log::info!(
            "testing {} [{}] for correctness: srcalign 0..{}, dstalign 0..{}, size 0..{}",
            Operation::Move,
            candidate.name(),
            cfg.max_source_align,
            cfg.max_dest_align,
            cfg.max_length
        );

        'sweep: for source_offset in 0..cfg.max_source_align {
            log::debug!("srcalign {}", source_offset);
            for dest_offset in 0..cfg.max_dest_align {
                for length in 0..cfg.max_length {
                    let desc = TransferDescriptor {
                        source_offset,
                        dest_offset,
                        length,
                    };
                    let ctx = &mut *self.ctx;
                    ctx.reseed(span);

                    // SAFETY: offset + length <= working_span <= region length
                    unsafe {
                        word_move(
                            ctx.dest.as_mut_ptr().add(dest_offset),
                            ctx.source.as_ptr().add(source_offset),
                            length,
                        );
                        candidate.move_bytes(
                            ctx.shadow_dest.as_mut_ptr().add(dest_offset),
                            ctx.shadow_source.as_ptr().add(source_offset),
                            length,
                        );
                    }

                    let outcome = ctx.compare(
                        TrialDescriptor::Move(desc),
                        span,
                        cfg.max_indices_per_outcome,
                    );
                    if Self::record(&mut report, outcome, cfg.halt_on_ceiling) {
                        break 'sweep;
                    }
                }
            }
        }

        Self::summarize(&report);
        report
    }

    /// Sweep in-place moves: source and destination share one region, so
    /// every overlap direction and distance up to the alignment range is hit.
    pub fn validate_overlapping_move(&mut self, candidate: &dyn Mover) -> ValidationReport {
        let cfg = self.config.clone();
        let span = cfg.working_span();
        let mut report = ValidationReport::new(
            Operation::OverlapMove,
            candidate.name(),
            cfg.error_ceiling,
        );

        if !candidate.handles_overlap() {
            log::warn!(
                "candidate [{}] does not promise memmove semantics; divergences are expected",
                candidate.name()
            );
        }
        log::info!(
            "testing {} [{}] for correctness: srcoff 0..{}, dstoff 0..{}, size 0..{}",
            Operation::OverlapMove,
            candidate.name(),
            cfg.max_source_align,
            cfg.max_dest_align,
            cfg.max_length
        );

        'sweep: for source_offset in 0..cfg.max_source_align {
            log::debug!("srcoff {}", source_offset);
            for dest_offset in 0..cfg.max_dest_align {
                for length in 0..cfg.max_length {
                    let desc = TransferDescriptor {
                        source_offset,
                        dest_offset,
                        length,
                    };
                    let ctx = &mut *self.ctx;
                    ctx.reseed(span);

                    // SAFETY: both offsets + length stay within the working span
                    unsafe {
                        let base = ctx.dest.as_mut_ptr();
                        word_move(base.add(dest_offset), base.add(source_offset), length);

                        let shadow = ctx.shadow_dest.as_mut_ptr();
                        candidate.move_bytes(
                            shadow.add(dest_offset),
                            shadow.add(source_offset),
                            length,
                        );
                    }

                    let outcome = ctx.compare(
                        TrialDescriptor::OverlapMove(desc),
                        span,
                        cfg.max_indices_per_outcome,
                    );
                    if Self::record(&mut report, outcome, cfg.halt_on_ceiling) {
                        break 'sweep;
                    }
                }
            }
        }

        Self::summarize(&report);
        report
    }

    /// Sweep destination offset x length x fill value for a memset-like
    /// candidate. The value range includes one below and one above the byte
    /// range to expose signed/unsigned truncation bugs.
    pub fn validate_fill(&mut self, candidate: &dyn Filler) -> ValidationReport {
        let cfg = self.config.clone();
        let span = cfg.working_span();
        let mut report = ValidationReport::new(Operation::Fill, candidate.name(), cfg.error_ceiling);

        log::info!(
            "testing {} [{}] for correctness: align 0..{}, size 0..{}, c {}..={}",
            Operation::Fill,
            candidate.name(),
            cfg.max_dest_align,
            cfg.max_length,
            cfg.min_pattern,
            cfg.max_pattern
        );

        'sweep: for dest_offset in 0..cfg.max_dest_align {
            log::debug!("align {}", dest_offset);
            for length in 0..cfg.max_length {
                for pattern in cfg.min_pattern..=cfg.max_pattern {
                    let desc = FillDescriptor {
                        dest_offset,
                        length,
                        pattern,
                    };
                    let ctx = &mut *self.ctx;
                    ctx.reseed(span);

                    // SAFETY: offset + length <= working_span <= region length
                    unsafe {
                        word_fill(ctx.dest.as_mut_ptr().add(dest_offset), pattern, length);
                        candidate.fill_bytes(
                            ctx.shadow_dest.as_mut_ptr().add(dest_offset),
                            pattern,
                            length,
                        );
                    }

                    let outcome = ctx.compare(
                        TrialDescriptor::Fill(desc),
                        span,
                        cfg.max_indices_per_outcome,
                    );
                    if Self::record(&mut report, outcome, cfg.halt_on_ceiling) {
                        break 'sweep;
                    }
                }
            }
        }

        Self::summarize(&report);
        report
    }

    /// Validate several move candidates in one run.
    pub fn validate_all_moves(&mut self, candidates: &[&dyn Mover]) -> Vec<ValidationReport> {
        candidates.iter().map(|c| self.validate_move(*c)).collect()
    }

    /// Validate several fill candidates in one run.
    pub fn validate_all_fills(&mut self, candidates: &[&dyn Filler]) -> Vec<ValidationReport> {
        candidates.iter().map(|c| self.validate_fill(*c)).collect()
    }

    /// Returns true when the sweep must stop.
    fn record(
        report: &mut ValidationReport,
        outcome: Option<ValidationOutcome>,
        halt_on_ceiling: bool,
    ) -> bool {
        let ceiling_reached = report.record_trial(outcome);
        if ceiling_reached && halt_on_ceiling {
            report.halted = true;
        }
        report.halted
    }

    fn summarize(report: &ValidationReport) {
        if report.passed() {
            log::info!("{}", report);
            return;
        }

        for outcome in report.outcomes.iter() {
            log::warn!("[{}] {}", report.candidate, outcome);
        }
        if report.outcomes.dropped() > 0 {
            log::warn!(
                "[{}] {} further mismatches not recorded",
                report.candidate,
                report.outcomes.dropped()
            );
        }
        log::error!("{}", report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{ByteFiller, ByteMover, NullMover, StdFiller, StdMover};
    use crate::word_filler::WordFiller;
    use crate::word_mover::WordMover;

    /// Small enough for debug builds, still several words past every boundary.
    fn small_config() -> ValidationConfig {
        ValidationConfig {
            max_source_align: 16,
            max_dest_align: 16,
            max_length: 48,
            min_pattern: -1,
            max_pattern: 2,
            ..Default::default()
        }
    }

    /// Copies one byte too many.
    struct OverrunMover;

    impl Mover for OverrunMover {
        fn name(&self) -> &str {
            "overrun"
        }

        unsafe fn move_bytes(&self, dest: *mut u8, src: *const u8, len: usize) -> *mut u8 {
            unsafe { std::ptr::copy_nonoverlapping(src, dest, len + 1) };
            dest
        }
    }

    /// Fills with the value clamped to the byte range instead of truncated.
    struct ClampingFiller;

    impl Filler for ClampingFiller {
        fn name(&self) -> &str {
            "clamping"
        }

        unsafe fn fill_bytes(&self, dest: *mut u8, pattern: i32, len: usize) -> *mut u8 {
            unsafe { std::ptr::write_bytes(dest, pattern.clamp(0, 255) as u8, len) };
            dest
        }
    }

    #[test]
    fn test_context_rejects_short_regions() {
        let config = small_config();
        let mut ctx = ValidationContext::new(config.working_span() - 1, 64).unwrap();
        assert!(matches!(
            Validator::new(config, &mut ctx),
            Err(MemError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_context_rejects_overflowing_config() {
        let config = ValidationConfig {
            max_length: 1 << (usize::BITS - 1),
            ..Default::default()
        };
        assert!(matches!(
            ValidationContext::for_config(&config),
            Err(MemError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_correct_movers_pass() {
        let config = small_config();
        let mut ctx = ValidationContext::for_config(&config).unwrap();
        let mut validator = Validator::new(config.clone(), &mut ctx).unwrap();

        let reports = validator.validate_all_moves(&[&WordMover, &StdMover, &ByteMover]);
        assert_eq!(reports.len(), 3);
        for report in &reports {
            assert!(report.passed(), "{}", report);
            assert_eq!(report.trials, config.move_trials());
            assert!(report.outcomes.is_empty());
        }
    }

    #[test]
    fn test_correct_fillers_pass() {
        let config = small_config();
        let mut ctx = ValidationContext::for_config(&config).unwrap();
        let mut validator = Validator::new(config.clone(), &mut ctx).unwrap();

        for report in validator.validate_all_fills(&[&WordFiller, &StdFiller, &ByteFiller]) {
            assert!(report.passed(), "{}", report);
            assert_eq!(report.trials, config.fill_trials());
        }
    }

    #[test]
    fn test_overrun_is_detected() {
        let config = small_config();
        let mut ctx = ValidationContext::for_config(&config).unwrap();
        let mut validator = Validator::new(config.clone(), &mut ctx).unwrap();

        let report = validator.validate_move(&OverrunMover);
        assert!(!report.passed());
        assert!(!report.halted);
        assert_eq!(report.trials, config.move_trials());
        assert_eq!(report.outcomes.len(), config.error_ceiling);

        // The first stored mismatch is the first trial: 0-length copy writes one byte.
        let first = report.outcomes.iter().next().unwrap();
        assert_eq!(
            first.descriptor,
            TrialDescriptor::Move(TransferDescriptor {
                source_offset: 0,
                dest_offset: 0,
                length: 0
            })
        );
        assert_eq!(first.diverging_indices[0], 0);
    }

    #[test]
    fn test_halt_on_ceiling_stops_early() {
        let config = ValidationConfig {
            halt_on_ceiling: true,
            error_ceiling: 4,
            ..small_config()
        };
        let mut ctx = ValidationContext::for_config(&config).unwrap();
        let mut validator = Validator::new(config, &mut ctx).unwrap();

        let report = validator.validate_move(&NullMover);
        assert!(report.halted);
        assert_eq!(report.mismatches, 4);
        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.outcomes.dropped(), 0);
        // length 0 passes, lengths 1..=4 fail
        assert_eq!(report.trials, 5);
    }

    #[test]
    fn test_clamping_filler_is_detected_at_sentinels() {
        let config = small_config();
        let mut ctx = ValidationContext::for_config(&config).unwrap();
        let mut validator = Validator::new(config, &mut ctx).unwrap();

        let report = validator.validate_fill(&ClampingFiller);
        assert!(!report.passed());
        for outcome in report.outcomes.iter() {
            match outcome.descriptor {
                TrialDescriptor::Fill(d) => {
                    assert_eq!(d.pattern, -1);
                    assert!(d.length > 0);
                }
                other => panic!("unexpected descriptor {:?}", other),
            }
        }
    }

    #[test]
    fn test_overlap_sweep() {
        let config = ValidationConfig {
            max_length: 40,
            ..small_config()
        };
        let mut ctx = ValidationContext::for_config(&config).unwrap();
        let mut validator = Validator::new(config, &mut ctx).unwrap();

        assert!(validator.validate_overlapping_move(&WordMover).passed());
        assert!(validator.validate_overlapping_move(&StdMover).passed());

        // A forward byte loop corrupts overlapping moves with dest > src.
        let report = validator.validate_overlapping_move(&ByteMover);
        assert!(!report.passed());
        for outcome in report.outcomes.iter() {
            if let TrialDescriptor::OverlapMove(d) = outcome.descriptor {
                assert!(d.dest_offset > d.source_offset);
                assert!(d.dest_offset < d.source_offset + d.length);
            }
        }
    }
}
