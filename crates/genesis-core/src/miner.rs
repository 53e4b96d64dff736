//! Multi-threaded proof-of-work search over the header nonce.
//!
//! Workers take interleaved batches of the nonce range (worker `i` owns
//! batches `i`, `i + threads`, ...) so every thread sweeps upward together.
//! A hit is published with an atomic minimum; a worker stops once its next
//! batch starts above the best published nonce, which keeps the reported
//! nonce the lowest satisfying one for any thread count. Timeout is polled
//! once per batch and only while nothing has been found.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::block::{BlockHeader, GenesisTemplate, MinedBlock};
use crate::config::GenesisConfig;
use crate::difficulty::{expected_hashes, format_difficulty, meets_target, Target};
use crate::error::{Error, Result};
use crate::hash::{DoubleSha256, PowHasher};

/// Number of distinct nonce values.
pub const NONCE_SPACE: u64 = 1 << 32;

/// Nonces hashed between two cancellation checks.
pub const DEFAULT_BATCH_SIZE: u32 = 1 << 16;

const NO_HIT: u64 = u64::MAX;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Snapshot of a running search.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Hashes computed in the current sweep.
    pub hashes: u64,
    pub elapsed: Duration,
    /// Hashes per second.
    pub hash_rate: f64,
    /// Highest nonce tried so far.
    pub nonce: u64,
    /// Timestamp of the header being swept.
    pub timestamp: u32,
}

impl Progress {
    /// Format hash rate for display.
    pub fn format_hash_rate(&self) -> String {
        if self.hash_rate >= 1_000_000_000.0 {
            format!("{:.2} GH/s", self.hash_rate / 1_000_000_000.0)
        } else if self.hash_rate >= 1_000_000.0 {
            format!("{:.2} MH/s", self.hash_rate / 1_000_000.0)
        } else if self.hash_rate >= 1_000.0 {
            format!("{:.2} KH/s", self.hash_rate / 1_000.0)
        } else {
            format!("{:.2} H/s", self.hash_rate)
        }
    }
}

/// Side channel for search progress. Never affects the result.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &Progress);

    /// Called before a new sweep with an advanced timestamp.
    fn on_timestamp_roll(&self, _timestamp: u32, _roll: u32) {}
}

/// Logs progress through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_progress(&self, progress: &Progress) {
        info!(
            "Tried {} nonces ({}), highest nonce {} at timestamp {}",
            progress.hashes,
            progress.format_hash_rate(),
            progress.nonce,
            progress.timestamp
        );
    }

    fn on_timestamp_roll(&self, timestamp: u32, roll: u32) {
        info!("Advancing timestamp to {} (roll {})", timestamp, roll);
    }
}

/// Terminal state of one sweep over the nonce range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found { nonce: u32, hash: [u8; 32] },
    Exhausted,
    TimedOut,
}

/// Work done by a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchStats {
    pub hashes: u64,
    pub elapsed: Duration,
}

impl SearchStats {
    pub fn hash_rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.hashes as f64 / secs
        } else {
            0.0
        }
    }
}

/// State shared by the workers of one sweep.
struct SweepState {
    best: AtomicU64,
    timed_out: AtomicBool,
    hashes: AtomicU64,
    highest: AtomicU64,
}

impl SweepState {
    fn new() -> Self {
        SweepState {
            best: AtomicU64::new(NO_HIT),
            timed_out: AtomicBool::new(false),
            hashes: AtomicU64::new(0),
            highest: AtomicU64::new(0),
        }
    }

    fn progress(&self, started: Instant, timestamp: u32) -> Progress {
        let hashes = self.hashes.load(Ordering::Relaxed);
        let elapsed = started.elapsed();
        let secs = elapsed.as_secs_f64();
        Progress {
            hashes,
            elapsed,
            hash_rate: if secs > 0.0 { hashes as f64 / secs } else { 0.0 },
            nonce: self.highest.load(Ordering::Relaxed),
            timestamp,
        }
    }
}

/// Proof-of-work miner.
pub struct Miner<H = DoubleSha256> {
    hasher: H,
    threads: usize,
    batch_size: u32,
    nonce_range: Range<u64>,
    time_limit: Option<Duration>,
    timestamp_rolls: u32,
    progress_interval: Duration,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl Default for Miner<DoubleSha256> {
    fn default() -> Self {
        Self::new()
    }
}

impl Miner<DoubleSha256> {
    /// Single-threaded double SHA256 miner over the full nonce space.
    pub fn new() -> Self {
        Miner {
            hasher: DoubleSha256,
            threads: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            nonce_range: 0..NONCE_SPACE,
            time_limit: None,
            timestamp_rolls: 0,
            progress_interval: Duration::from_secs(10),
            observer: None,
        }
    }

    /// Miner settings taken from a configuration record.
    pub fn from_config(config: &GenesisConfig) -> Self {
        Self::new()
            .with_threads(config.thread_count)
            .with_time_limit(config.time_limit())
            .with_timestamp_rolls(config.max_timestamp_rolls)
            .with_progress_interval(config.progress_interval())
    }
}

impl<H: PowHasher> Miner<H> {
    /// Swap the hash primitive.
    pub fn with_hasher<H2: PowHasher>(self, hasher: H2) -> Miner<H2> {
        Miner {
            hasher,
            threads: self.threads,
            batch_size: self.batch_size,
            nonce_range: self.nonce_range,
            time_limit: self.time_limit,
            timestamp_rolls: self.timestamp_rolls,
            progress_interval: self.progress_interval,
            observer: self.observer,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Restrict the sweep to `range`, clamped to the 32-bit nonce space.
    pub fn with_nonce_range(mut self, range: Range<u64>) -> Self {
        let end = range.end.min(NONCE_SPACE);
        self.nonce_range = range.start.min(end)..end;
        self
    }

    /// Overall budget for [`Miner::mine`], across timestamp rolls.
    pub fn with_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.time_limit = limit;
        self
    }

    /// Allow up to `rolls` timestamp increments after an exhausted sweep.
    pub fn with_timestamp_rolls(mut self, rolls: u32) -> Self {
        self.timestamp_rolls = rolls;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Mine `template` until its hash meets the target.
    pub fn mine(&self, template: &GenesisTemplate) -> Result<MinedBlock> {
        self.mine_with_stats(template).map(|(block, _)| block)
    }

    /// [`Miner::mine`], also returning the work done.
    pub fn mine_with_stats(&self, template: &GenesisTemplate) -> Result<(MinedBlock, SearchStats)> {
        let started = Instant::now();
        let deadline = self.time_limit.map(|limit| started + limit);
        let mut header = template.header;
        let mut hashes = 0u64;

        let difficulty = template.target.difficulty();
        info!(
            "Mining genesis block with {} threads at bits {:#010x} (difficulty {}, ~{:.0} hashes expected)",
            self.threads,
            header.bits,
            format_difficulty(difficulty),
            expected_hashes(&template.target)
        );

        for roll in 0..=self.timestamp_rolls {
            if roll > 0 {
                header.timestamp = match header.timestamp.checked_add(1) {
                    Some(timestamp) => timestamp,
                    None => break,
                };
                info!("Nonce space exhausted, advancing timestamp to {}", header.timestamp);
                if let Some(observer) = &self.observer {
                    observer.on_timestamp_roll(header.timestamp, roll);
                }
            }

            let (outcome, sweep) = self.search_until(&header, &template.target, deadline);
            hashes += sweep.hashes;

            match outcome {
                SearchOutcome::Found { nonce, hash } => {
                    header.nonce = nonce;
                    let stats = SearchStats {
                        hashes,
                        elapsed: started.elapsed(),
                    };
                    info!(
                        "Found nonce {} at timestamp {} after {} hashes in {:?}",
                        nonce, header.timestamp, hashes, stats.elapsed
                    );
                    return Ok((MinedBlock::new(template, header, hash, roll), stats));
                }
                SearchOutcome::TimedOut => {
                    let elapsed = started.elapsed();
                    warn!("Search timed out after {:?} ({} hashes)", elapsed, hashes);
                    return Err(Error::TimedOut { elapsed, hashes });
                }
                SearchOutcome::Exhausted => {
                    debug!("Sweep at timestamp {} exhausted", header.timestamp);
                }
            }
        }

        warn!(
            "Nonce space exhausted at timestamp {} after {} hashes",
            header.timestamp, hashes
        );
        Err(Error::Exhausted {
            timestamp: header.timestamp,
            hashes,
        })
    }

    /// Sweep the configured nonce range once for `header`.
    pub fn search(&self, header: &BlockHeader, target: &Target) -> (SearchOutcome, SearchStats) {
        let deadline = self.time_limit.map(|limit| Instant::now() + limit);
        self.search_until(header, target, deadline)
    }

    fn search_until(
        &self,
        header: &BlockHeader,
        target: &Target,
        deadline: Option<Instant>,
    ) -> (SearchOutcome, SearchStats) {
        let started = Instant::now();
        let range = self.nonce_range.clone();
        if range.is_empty() {
            return (SearchOutcome::Exhausted, SearchStats::default());
        }

        let batch = self.batch_size as u64;
        let batches = (range.end - range.start).div_ceil(batch);
        let workers = self.threads.min(batches as usize).max(1);
        let prefix = header.serialize_without_nonce();
        let state = SweepState::new();

        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    let state = &state;
                    let prefix = &prefix;
                    let range = range.clone();
                    scope.spawn(move || {
                        self.run_worker(worker, workers, prefix, target, range, state, deadline)
                    })
                })
                .collect();

            let mut last_report = Instant::now();
            while !handles.iter().all(|handle| handle.is_finished()) {
                thread::sleep(POLL_INTERVAL.min(self.progress_interval));
                if let Some(observer) = &self.observer {
                    if last_report.elapsed() >= self.progress_interval {
                        observer.on_progress(&state.progress(started, header.timestamp));
                        last_report = Instant::now();
                    }
                }
            }
        });

        if let Some(observer) = &self.observer {
            observer.on_progress(&state.progress(started, header.timestamp));
        }

        let stats = SearchStats {
            hashes: state.hashes.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        };

        let best = state.best.load(Ordering::Acquire);
        let outcome = if state.timed_out.load(Ordering::Acquire) {
            SearchOutcome::TimedOut
        } else if best != NO_HIT {
            let mut winner = *header;
            winner.nonce = best as u32;
            SearchOutcome::Found {
                nonce: winner.nonce,
                hash: winner.hash_with(&self.hasher),
            }
        } else {
            SearchOutcome::Exhausted
        };

        (outcome, stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_worker(
        &self,
        worker: usize,
        stride: usize,
        prefix: &[u8; 76],
        target: &Target,
        range: Range<u64>,
        state: &SweepState,
        deadline: Option<Instant>,
    ) {
        debug!("Worker {} started", worker);

        let batch = self.batch_size as u64;
        let mut header = [0u8; 80];
        header[..76].copy_from_slice(prefix);

        let mut batch_index = worker as u64;
        let mut hashes = 0u64;

        loop {
            let batch_start = range.start + batch_index * batch;
            if batch_start >= range.end || batch_start > state.best.load(Ordering::Acquire) {
                break;
            }

            if state.best.load(Ordering::Acquire) == NO_HIT {
                if state.timed_out.load(Ordering::Acquire) {
                    break;
                }
                if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    state.timed_out.store(true, Ordering::Release);
                    break;
                }
            }

            let batch_end = (batch_start + batch).min(range.end);
            let mut hit = None;
            let mut tried = 0u64;

            for nonce in batch_start..batch_end {
                header[76..80].copy_from_slice(&(nonce as u32).to_le_bytes());
                let hash = self.hasher.hash(&header);
                tried += 1;
                if meets_target(&hash, target) {
                    hit = Some(nonce);
                    break;
                }
            }

            hashes += tried;
            state.hashes.fetch_add(tried, Ordering::Relaxed);
            state.highest.fetch_max(batch_start + tried - 1, Ordering::Relaxed);

            if let Some(nonce) = hit {
                debug!("Worker {} found nonce {}", worker, nonce);
                state.best.fetch_min(nonce, Ordering::AcqRel);
                break;
            }

            batch_index += stride as u64;
        }

        debug!("Worker {} stopped after {} hashes", worker, hashes);
    }
}

/// Mine `template` with a default single-threaded miner.
pub fn mine(template: &GenesisTemplate) -> Result<MinedBlock> {
    Miner::new().mine(template)
}
