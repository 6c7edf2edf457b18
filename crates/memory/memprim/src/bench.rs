//! Throughput benchmark driver
//!
//! For each buffer size (geometric from `min_buffer_size` to
//! `max_buffer_size`) every candidate is timed over a grid of source and
//! destination alignments. Each sample repeats the transfer until about
//! `total_transfer` bytes have been moved, so samples of different sizes are
//! directly comparable.

use std::hint::black_box;
use std::time::{Duration, Instant};

use memprim_error::{MemError, MemResult};
use serde::{Deserialize, Serialize};

use crate::candidate::{Filler, Mover};
use crate::canary::{SOURCE_SEED, seed_canary};
use crate::config::BenchConfig;
use crate::outcome::Operation;
use crate::region::MemoryRegion;

const KIB: f64 = 1024.0;
const MIB: f64 = KIB * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Alignment offsets visited by the benchmark: every offset below 8, then
/// powers of two up to and including `max`.
pub fn alignment_steps(max: usize) -> Vec<usize> {
    let mut steps = Vec::new();
    let mut align = 0;
    while align <= max {
        steps.push(align);
        align = if align < 8 { align + 1 } else { align << 1 };
    }
    steps
}

/// Buffer sizes of one benchmark run
pub fn buffer_sizes(config: &BenchConfig) -> Vec<usize> {
    let mut sizes = Vec::new();
    let mut size = config.min_buffer_size;
    while size <= config.max_buffer_size {
        sizes.push(size);
        size = match size.checked_mul(config.size_multiplier) {
            Some(next) => next,
            None => break,
        };
    }
    sizes
}

/// Repetitions needed to move `total` bytes in transfers of `size`; at least one.
pub fn iterations(total: u64, size: usize) -> u64 {
    if size == 0 {
        return 1;
    }
    (total / size as u64).max(1)
}

/// Human readable transfer rate.
pub fn format_rate(bytes: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return "inf".to_string();
    }

    let rate = bytes as f64 / secs;
    if rate > GIB {
        format!("{:.3} GB/sec", rate / GIB)
    } else if rate > MIB {
        format!("{:.3} MB/sec", rate / MIB)
    } else {
        format!("{} bytes/sec", rate as u64)
    }
}

/// One timed measurement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchSample {
    pub operation: Operation,
    pub candidate: String,
    pub size: usize,
    /// Zero for fills
    pub source_align: usize,
    pub dest_align: usize,
    pub iterations: u64,
    pub elapsed: Duration,
}

impl BenchSample {
    /// Bytes written over the whole sample
    pub fn bytes(&self) -> u64 {
        self.size as u64 * self.iterations
    }

    pub fn rate(&self) -> String {
        format_rate(self.bytes(), self.elapsed)
    }
}

impl std::fmt::Display for BenchSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.operation {
            Operation::Fill => write!(f, "dstalign {:2}: ", self.dest_align)?,
            _ => write!(
                f,
                "srcalign {:2}, dstalign {:2}: ",
                self.source_align, self.dest_align
            )?,
        }
        write!(
            f,
            "{} {:>10}us {}",
            self.candidate,
            self.elapsed.as_micros(),
            self.rate()
        )
    }
}

/// Source and destination buffers of a benchmark run.
#[derive(Debug)]
pub struct BenchContext {
    source: MemoryRegion,
    dest: MemoryRegion,
}

impl BenchContext {
    pub fn new(config: &BenchConfig) -> MemResult<Self> {
        config.validate()?;
        let len = config.region_len();
        let mut source = MemoryRegion::new(len, config.region_align)?;
        let dest = MemoryRegion::new(len, config.region_align)?;
        seed_canary(source.as_mut_slice(), SOURCE_SEED);
        log::info!(
            "benchmark regions: src {:p}, dst {:p} ({} bytes each)",
            source.as_ptr(),
            dest.as_ptr(),
            len
        );
        Ok(Self { source, dest })
    }

    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Bencher<'ctx> {
    config: BenchConfig,
    ctx: &'ctx mut BenchContext,
}

impl<'ctx> Bencher<'ctx> {
    pub fn new(config: BenchConfig, ctx: &'ctx mut BenchContext) -> MemResult<Self> {
        config.validate()?;
        if ctx.len() < config.region_len() {
            return Err(MemError::OutOfBounds {
                offset: 0,
                length: config.region_len(),
                capacity: ctx.len(),
            });
        }
        Ok(Self { config, ctx })
    }

    /// Time one move configuration.
    pub fn time_move(
        &mut self,
        candidate: &dyn Mover,
        source_align: usize,
        dest_align: usize,
        size: usize,
    ) -> MemResult<BenchSample> {
        MemError::check_bounds(source_align, size, self.ctx.len())?;
        MemError::check_bounds(dest_align, size, self.ctx.len())?;

        let iterations = iterations(self.config.total_transfer, size);
        let src = self.ctx.source.as_ptr();
        let dst = self.ctx.dest.as_mut_ptr();

        let start = Instant::now();
        for _ in 0..iterations {
            // SAFETY: both ranges were bounds-checked and the regions are distinct
            unsafe {
                black_box(candidate.move_bytes(
                    dst.add(dest_align),
                    src.add(source_align),
                    black_box(size),
                ));
            }
        }
        let elapsed = start.elapsed();

        Ok(BenchSample {
            operation: Operation::Move,
            candidate: candidate.name().to_string(),
            size,
            source_align,
            dest_align,
            iterations,
            elapsed,
        })
    }

    /// Time one fill configuration (fill value 0).
    pub fn time_fill(
        &mut self,
        candidate: &dyn Filler,
        dest_align: usize,
        size: usize,
    ) -> MemResult<BenchSample> {
        MemError::check_bounds(dest_align, size, self.ctx.len())?;

        let iterations = iterations(self.config.total_transfer, size);
        let dst = self.ctx.dest.as_mut_ptr();

        let start = Instant::now();
        for _ in 0..iterations {
            // SAFETY: range was bounds-checked
            unsafe {
                black_box(candidate.fill_bytes(dst.add(dest_align), black_box(0), black_box(size)));
            }
        }
        let elapsed = start.elapsed();

        Ok(BenchSample {
            operation: Operation::Fill,
            candidate: candidate.name().to_string(),
            size,
            source_align: 0,
            dest_align,
            iterations,
            elapsed,
        })
    }

    /// Run the move grid, handing each sample to `on_sample` as soon as it
    /// is taken.
    pub fn bench_move_with<F>(
        &mut self,
        candidates: &[&dyn Mover],
        mut on_sample: F,
    ) -> MemResult<Vec<BenchSample>>
    where
        F: FnMut(&BenchSample),
    {
        let steps = alignment_steps(self.config.max_alignment);
        let mut samples = Vec::new();

        for size in buffer_sizes(&self.config) {
            log::info!("{} buffer size {}", Operation::Move, size);
            for &source_align in &steps {
                for &dest_align in &steps {
                    for candidate in candidates {
                        let sample = self.time_move(*candidate, source_align, dest_align, size)?;
                        on_sample(&sample);
                        samples.push(sample);
                    }
                }
            }
        }
        Ok(samples)
    }

    pub fn bench_move(&mut self, candidates: &[&dyn Mover]) -> MemResult<Vec<BenchSample>> {
        self.bench_move_with(candidates, |_| {})
    }

    /// Run the fill grid: every destination offset in `[0, max_alignment)`.
    pub fn bench_fill_with<F>(
        &mut self,
        candidates: &[&dyn Filler],
        mut on_sample: F,
    ) -> MemResult<Vec<BenchSample>>
    where
        F: FnMut(&BenchSample),
    {
        let mut samples = Vec::new();

        for size in buffer_sizes(&self.config) {
            log::info!("{} buffer size {}", Operation::Fill, size);
            for dest_align in 0..self.config.max_alignment {
                for candidate in candidates {
                    let sample = self.time_fill(*candidate, dest_align, size)?;
                    on_sample(&sample);
                    samples.push(sample);
                }
            }
        }
        Ok(samples)
    }

    pub fn bench_fill(&mut self, candidates: &[&dyn Filler]) -> MemResult<Vec<BenchSample>> {
        self.bench_fill_with(candidates, |_| {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{NullMover, StdFiller, StdMover};
    use crate::word_filler::WordFiller;
    use crate::word_mover::WordMover;

    fn tiny_config() -> BenchConfig {
        BenchConfig {
            min_buffer_size: 64,
            max_buffer_size: 256,
            size_multiplier: 4,
            total_transfer: 1024,
            max_alignment: 4,
            ..Default::default()
        }
    }

    #[test]
    fn test_alignment_steps() {
        assert_eq!(
            alignment_steps(64),
            vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 16, 32, 64]
        );
        assert_eq!(alignment_steps(5), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(alignment_steps(20), vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 16]);
        assert_eq!(alignment_steps(0), vec![0]);
    }

    #[test]
    fn test_default_buffer_sizes() {
        let sizes = buffer_sizes(&BenchConfig::default());
        assert_eq!(sizes.first(), Some(&4096));
        assert_eq!(sizes.last(), Some(&(16 * 1024 * 1024)));
        assert_eq!(sizes.len(), 7);
    }

    #[test]
    fn test_iterations() {
        assert_eq!(iterations(1 << 30, 4096), 1 << 18);
        assert_eq!(iterations(100, 4096), 1);
        assert_eq!(iterations(100, 0), 1);
    }

    #[test]
    fn test_format_rate_thresholds() {
        let second = Duration::from_secs(1);
        assert_eq!(format_rate(2 << 30, second), "2.000 GB/sec");
        assert_eq!(format_rate(1 << 30, second), "1024.000 MB/sec");
        assert_eq!(format_rate(3 << 20, second), "3.000 MB/sec");
        assert_eq!(format_rate(500, second), "500 bytes/sec");
        assert_eq!(format_rate(500, Duration::ZERO), "inf");
    }

    #[test]
    fn test_bencher_rejects_small_context() {
        let mut ctx = BenchContext::new(&tiny_config()).unwrap();
        let bigger = BenchConfig {
            max_buffer_size: 1 << 20,
            ..tiny_config()
        };
        assert!(matches!(
            Bencher::new(bigger, &mut ctx),
            Err(MemError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_context_rejects_overflowing_config() {
        let config = BenchConfig {
            max_buffer_size: usize::MAX,
            ..Default::default()
        };
        assert!(matches!(
            BenchContext::new(&config),
            Err(MemError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_time_move_transfers_data() {
        let config = tiny_config();
        let mut ctx = BenchContext::new(&config).unwrap();
        let mut bencher = Bencher::new(config, &mut ctx).unwrap();

        let sample = bencher.time_move(&WordMover, 3, 1, 200).unwrap();
        assert_eq!(sample.iterations, 5);
        assert_eq!(sample.bytes(), 1000);
        assert_eq!(&ctx.dest.as_slice()[1..201], &ctx.source.as_slice()[3..203]);
    }

    #[test]
    fn test_time_fill_out_of_bounds() {
        let config = tiny_config();
        let mut ctx = BenchContext::new(&config).unwrap();
        let len = ctx.len();
        let mut bencher = Bencher::new(config, &mut ctx).unwrap();
        assert!(bencher.time_fill(&StdFiller, 1, len).is_err());
    }

    #[test]
    fn test_move_grid() {
        let config = tiny_config();
        let mut ctx = BenchContext::new(&config).unwrap();
        let mut bencher = Bencher::new(config, &mut ctx).unwrap();

        let mut streamed = 0;
        let samples = bencher
            .bench_move_with(&[&StdMover, &NullMover], |_| streamed += 1)
            .unwrap();
        // 2 sizes x 5 x 5 alignments x 2 candidates
        assert_eq!(samples.len(), 100);
        assert_eq!(streamed, 100);
        assert_eq!(samples[0].candidate, "std");
        assert_eq!(samples[1].candidate, "null");
        assert_eq!(samples[0].iterations, 16);
        assert_eq!(samples[99].size, 256);
        assert_eq!(samples[99].iterations, 4);
    }

    #[test]
    fn test_fill_grid() {
        let config = tiny_config();
        let mut ctx = BenchContext::new(&config).unwrap();
        let mut bencher = Bencher::new(config, &mut ctx).unwrap();

        let samples = bencher.bench_fill(&[&WordFiller]).unwrap();
        // 2 sizes x 4 offsets
        assert_eq!(samples.len(), 8);
        assert!(samples.iter().all(|s| s.dest_align < 4));
        assert!(samples[0].to_string().starts_with("dstalign  0: reference"));
    }
}
