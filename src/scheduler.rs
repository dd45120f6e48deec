// Analysis scheduler - per-tick routing between live and offline analysis
//
// While playing, pitch readouts come from live analyser frames, which are
// cheap to read every tick. While paused, a spectrum has to be computed from
// the sample data at the exact playhead position; that FFT is deferred into
// a task queue and picked up on a later tick so a burst of seek updates does
// not stack up redundant transforms. At most one offline job is in flight,
// and a job whose playhead is out of date by the time it is picked up is
// dropped rather than computed.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::dsp::{
    band_bins, estimate_from_complex, estimate_from_db, hann_window, transform, PitchStabilizer,
    RawPitchEstimate,
};
use crate::playback::LiveSpectrum;
use crate::sample::{AudioSample, SampleStore, SlotId};

/// Playhead drift beyond which a deferred job's result no longer describes
/// the current position (seconds).
const JOB_PLAYHEAD_TOLERANCE_SECS: f64 = 1e-6;

/// One deferred offline analysis request, pinned to the samples, playhead,
/// and invalidation generation at issue time.
pub struct OfflineJob {
    pub playhead_secs: f64,
    pub generation: u64,
    pub a: Option<Arc<AudioSample>>,
    pub b: Option<Arc<AudioSample>>,
}

/// Deferral seam between the scheduler and whatever runs its jobs later.
pub trait Defer {
    fn defer(&mut self, job: OfflineJob);
    fn take_ready(&mut self) -> Option<OfflineJob>;
}

/// FIFO queue where a deferred job becomes ready on the next poll.
#[derive(Default)]
pub struct TaskQueue {
    jobs: VecDeque<OfflineJob>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl Defer for TaskQueue {
    fn defer(&mut self, job: OfflineJob) {
        self.jobs.push_back(job);
    }

    fn take_ready(&mut self) -> Option<OfflineJob> {
        self.jobs.pop_front()
    }
}

/// Per-tick analysis orchestrator.
pub struct AnalysisScheduler {
    config: AnalysisConfig,
    /// The paused-state readout no longer matches the playhead
    offline_stale: bool,
    /// An offline job has been deferred and not yet resolved
    computing: bool,
    /// Bumped on every invalidation; jobs stamped with an older value were
    /// issued against state (samples, playhead) that no longer holds
    generation: u64,
    /// Scratch buffer for live analyser frames
    live_frame: Vec<f32>,
}

impl AnalysisScheduler {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            offline_stale: true,
            computing: false,
            generation: 0,
            live_frame: Vec::new(),
        }
    }

    /// Invalidate the paused-state readout (source reloaded, seek moved the
    /// playhead, or playback just stopped). Any job already in the queue was
    /// issued against superseded state and will be dropped at pickup.
    pub fn mark_stale(&mut self) {
        self.offline_stale = true;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn is_stale(&self) -> bool {
        self.offline_stale
    }

    /// Run one analysis tick.
    ///
    /// `stabilizers` is indexed by `SlotId::index()`; whichever path runs
    /// feeds its raw estimates through the matching stabilizer.
    pub fn tick(
        &mut self,
        store: &SampleStore,
        live: &mut dyn LiveSpectrum,
        queue: &mut dyn Defer,
        playing: bool,
        playhead_secs: f64,
        stabilizers: &mut [PitchStabilizer; 2],
    ) {
        if playing {
            self.tick_live(store, live, stabilizers);
            // Whatever the paused display showed is behind the moving playhead
            self.offline_stale = true;
            return;
        }

        if let Some(job) = queue.take_ready() {
            self.computing = false;
            let current = job.generation == self.generation
                && (job.playhead_secs - playhead_secs).abs() <= JOB_PLAYHEAD_TOLERANCE_SECS;
            if current {
                self.run_offline_job(&job, stabilizers);
                self.offline_stale = false;
            } else {
                log::debug!(
                    "[Scheduler] Dropping superseded job at {:.3}s gen {} (playhead {:.3}s gen {})",
                    job.playhead_secs,
                    job.generation,
                    playhead_secs,
                    self.generation
                );
            }
        }

        if self.offline_stale && !self.computing {
            let a = store.get(SlotId::A).cloned();
            let b = store.get(SlotId::B).cloned();
            if a.is_some() || b.is_some() {
                queue.defer(OfflineJob {
                    playhead_secs,
                    generation: self.generation,
                    a,
                    b,
                });
                self.computing = true;
            }
        }
    }

    fn tick_live(
        &mut self,
        store: &SampleStore,
        live: &mut dyn LiveSpectrum,
        stabilizers: &mut [PitchStabilizer; 2],
    ) {
        let bin_count = live.bin_count();
        if bin_count == 0 {
            return;
        }
        self.live_frame.resize(bin_count, 0.0);
        let fft_size = bin_count * 2;

        for slot in [SlotId::A, SlotId::B] {
            let Some(sample) = store.get(slot) else {
                continue;
            };
            if !live.fill_db_frame(slot, &mut self.live_frame) {
                continue;
            }
            let sample_rate = sample.sample_rate();
            let (min_bin, max_bin) =
                band_bins(sample_rate, fft_size, self.config.hz_min, self.config.hz_max);
            let estimate = estimate_from_db(
                &self.live_frame,
                min_bin,
                max_bin,
                sample_rate,
                fft_size,
                self.config.live_floor_db,
            );
            stabilizers[slot.index()].update(&estimate);
        }
    }

    fn run_offline_job(&self, job: &OfflineJob, stabilizers: &mut [PitchStabilizer; 2]) {
        for (slot, sample) in [(SlotId::A, &job.a), (SlotId::B, &job.b)] {
            let Some(sample) = sample else {
                continue;
            };
            let estimate = self.compute_offline(sample, job.playhead_secs);
            stabilizers[slot.index()].update(&estimate);
        }
    }

    /// One windowed FFT over the sample data starting at the playhead.
    fn compute_offline(&self, sample: &AudioSample, playhead_secs: f64) -> RawPitchEstimate {
        let fft_size = self.config.fft_size;
        let sample_rate = sample.sample_rate();
        let start = (playhead_secs * sample_rate as f64).round().max(0.0) as usize;

        let window = hann_window(fft_size);
        let mut re: Vec<f64> = (0..fft_size)
            .map(|i| sample.sample_or_zero(start + i) as f64 * window[i])
            .collect();
        let mut im = vec![0.0f64; fft_size];
        transform(&mut re, &mut im);

        let (min_bin, max_bin) =
            band_bins(sample_rate, fft_size, self.config.hz_min, self.config.hz_max);
        estimate_from_complex(
            &re,
            &im,
            min_bin,
            max_bin,
            sample_rate,
            fft_size,
            self.config.offline_floor_db,
        )
    }
}
