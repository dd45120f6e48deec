// Engine - the single entry point tying decode, transport, and analysis
// together
//
// The engine owns every collaborator behind a trait object so hosts can swap
// in a real audio device, a fake clock, or an alternate decoder without the
// orchestration logic noticing. Hosts drive it with load/play/seek calls and
// poll `tick()` for a snapshot of the timeline and both pitch readouts.

use crate::config::AppConfig;
use crate::decode::{Decoder, WavDecoder};
use crate::dsp::PitchStabilizer;
use crate::error::{log_decode_error, DecodeError};
use crate::playback::{LiveSpectrum, NullSink, PlaybackSink, SilentSpectrum};
use crate::sample::{AudioSample, SampleStore, SlotId};
use crate::scheduler::{AnalysisScheduler, TaskQueue};
use crate::transport::{Clock, SystemClock, TransportController};

/// One tick's worth of observable engine state, ready for display.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct Snapshot {
    /// Current timeline position in seconds
    pub playhead_secs: f64,
    /// Comparable timeline length, absent while no source is loaded
    pub effective_duration: Option<f64>,
    /// Whether the transport is advancing
    pub playing: bool,
    /// Stabilized pitch readout for slot A (Hz)
    pub pitch_a: Option<f64>,
    /// Stabilized pitch readout for slot B (Hz)
    pub pitch_b: Option<f64>,
}

/// Dual-source pitch comparison engine.
pub struct Engine {
    store: SampleStore,
    transport: TransportController,
    scheduler: AnalysisScheduler,
    queue: TaskQueue,
    stabilizers: [PitchStabilizer; 2],
    decoder: Box<dyn Decoder>,
    sink: Box<dyn PlaybackSink>,
    live: Box<dyn LiveSpectrum>,
    clock: Box<dyn Clock>,
}

impl Engine {
    /// Build an engine with the default headless collaborators: WAV decode,
    /// no audio output, no live analyser, wall clock.
    pub fn new(config: AppConfig) -> Self {
        Self {
            store: SampleStore::new(),
            transport: TransportController::new(config.transport.clone()),
            scheduler: AnalysisScheduler::new(config.analysis.clone()),
            queue: TaskQueue::new(),
            stabilizers: [
                PitchStabilizer::new(config.stabilizer.clone()),
                PitchStabilizer::new(config.stabilizer.clone()),
            ],
            decoder: Box::new(WavDecoder::new()),
            sink: Box::new(NullSink::new()),
            live: Box::new(SilentSpectrum::new()),
            clock: Box::new(SystemClock::new()),
        }
    }

    pub fn with_decoder(mut self, decoder: Box<dyn Decoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn PlaybackSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_live(mut self, live: Box<dyn LiveSpectrum>) -> Self {
        self.live = live;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Decode `bytes` and load the result into `slot`.
    ///
    /// On failure the slot becomes empty, even if it previously held a
    /// sample, and dependent features degrade to their unavailable state.
    pub fn load_source(&mut self, slot: SlotId, bytes: &[u8]) -> Result<(), DecodeError> {
        match self.decoder.decode(bytes) {
            Ok(sample) => {
                self.load_sample(slot, sample);
                Ok(())
            }
            Err(err) => {
                log_decode_error(&err, &format!("load_source slot {}", slot.label()));
                self.unload(slot);
                Err(err)
            }
        }
    }

    /// Load an already-decoded sample into `slot`.
    ///
    /// Playback stops, the slot's smoothing history is discarded, and the
    /// paused readout is recomputed at the (possibly clamped) playhead.
    pub fn load_sample(&mut self, slot: SlotId, sample: AudioSample) {
        self.transport.pause(self.sink.as_mut());
        self.store.load(slot, sample);
        self.transport.clamp_playhead(&self.store);
        self.stabilizers[slot.index()].reset();
        self.scheduler.mark_stale();
    }

    /// Clear `slot`, stopping playback.
    pub fn unload(&mut self, slot: SlotId) {
        self.transport.pause(self.sink.as_mut());
        self.store.unload(slot);
        self.transport.clamp_playhead(&self.store);
        self.stabilizers[slot.index()].reset();
        self.scheduler.mark_stale();
    }

    pub fn play(&mut self) {
        self.transport
            .play(&self.store, self.sink.as_mut(), self.clock.as_ref());
    }

    pub fn pause(&mut self) {
        self.transport.pause(self.sink.as_mut());
        self.scheduler.mark_stale();
    }

    pub fn toggle(&mut self) {
        self.transport
            .toggle(&self.store, self.sink.as_mut(), self.clock.as_ref());
        if !self.transport.is_playing() {
            self.scheduler.mark_stale();
        }
    }

    /// Return to the initial state: stopped at zero with both slots empty.
    pub fn reset(&mut self) {
        self.transport.reset(self.sink.as_mut());
        self.store.clear();
        for stabilizer in &mut self.stabilizers {
            stabilizer.reset();
        }
        self.scheduler.mark_stale();
    }

    /// Begin a drag-seek from a pointer position `x` on a control of the
    /// given `width`.
    pub fn begin_seek(&mut self, x: f64, width: f64) {
        self.transport
            .begin_seek(fraction_of(x, width), &self.store, self.sink.as_mut());
        self.scheduler.mark_stale();
    }

    /// Move an in-progress drag-seek.
    pub fn update_seek(&mut self, x: f64, width: f64) {
        self.transport.update_seek(fraction_of(x, width), &self.store);
        self.scheduler.mark_stale();
    }

    /// Finish the drag-seek, resuming playback if it was running.
    pub fn end_seek(&mut self) {
        self.transport
            .end_seek(&self.store, self.sink.as_mut(), self.clock.as_ref());
    }

    /// Advance the timeline and the analysis by one tick and report the
    /// resulting state.
    pub fn tick(&mut self) -> Snapshot {
        self.transport
            .tick(&self.store, self.sink.as_mut(), self.clock.as_ref());
        self.scheduler.tick(
            &self.store,
            self.live.as_mut(),
            &mut self.queue,
            self.transport.is_playing(),
            self.transport.playhead_secs(),
            &mut self.stabilizers,
        );
        self.snapshot()
    }

    /// The current state without advancing anything.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            playhead_secs: self.transport.playhead_secs(),
            effective_duration: self.store.effective_duration(),
            playing: self.transport.is_playing(),
            pitch_a: self.stabilizers[SlotId::A.index()].current(),
            pitch_b: self.stabilizers[SlotId::B.index()].current(),
        }
    }

    pub fn is_loaded(&self, slot: SlotId) -> bool {
        self.store.is_loaded(slot)
    }
}

/// Pointer position to timeline fraction, tolerant of degenerate widths.
fn fraction_of(x: f64, width: f64) -> f64 {
    if width > 0.0 {
        (x / width).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence_sample(secs: f64, rate: u32) -> AudioSample {
        AudioSample::new(vec![0.0; (secs * rate as f64) as usize], rate)
    }

    #[test]
    fn test_snapshot_of_empty_engine() {
        let engine = Engine::new(AppConfig::default());
        let snap = engine.snapshot();
        assert_eq!(snap.playhead_secs, 0.0);
        assert!(snap.effective_duration.is_none());
        assert!(!snap.playing);
        assert!(snap.pitch_a.is_none());
        assert!(snap.pitch_b.is_none());
    }

    #[test]
    fn test_play_requires_both_sources() {
        let mut engine = Engine::new(AppConfig::default());
        engine.load_sample(SlotId::A, silence_sample(1.0, 44_100));
        engine.play();
        assert!(!engine.snapshot().playing);

        engine.load_sample(SlotId::B, silence_sample(1.0, 44_100));
        engine.play();
        assert!(engine.snapshot().playing);
    }

    #[test]
    fn test_load_clamps_playhead_to_shorter_timeline() {
        let mut engine = Engine::new(AppConfig::default());
        engine.load_sample(SlotId::A, silence_sample(10.0, 44_100));
        engine.load_sample(SlotId::B, silence_sample(10.0, 44_100));
        engine.begin_seek(80.0, 100.0);
        engine.end_seek();
        assert!((engine.snapshot().playhead_secs - 8.0).abs() < 1e-9);

        // Replacing B with a 5s sample pulls the playhead back
        engine.load_sample(SlotId::B, silence_sample(5.0, 44_100));
        assert!(engine.snapshot().playhead_secs <= 5.0);
    }

    #[test]
    fn test_decode_failure_empties_the_slot() {
        let mut engine = Engine::new(AppConfig::default());
        engine.load_sample(SlotId::A, silence_sample(2.0, 44_100));
        engine.load_sample(SlotId::B, silence_sample(2.0, 44_100));

        let err = engine.load_source(SlotId::A, b"not audio").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Malformed { .. } | DecodeError::UnsupportedFormat { .. }
        ));
        assert!(
            !engine.is_loaded(SlotId::A),
            "A failed reload leaves the slot absent"
        );
        assert!(engine.is_loaded(SlotId::B), "The other slot is untouched");

        // Degraded, not broken: play is a no-op and B keeps its timeline
        engine.play();
        let snap = engine.snapshot();
        assert!(!snap.playing);
        assert!((snap.effective_duration.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset_returns_to_initial_state() {
        let mut engine = Engine::new(AppConfig::default());
        engine.load_sample(SlotId::A, silence_sample(2.0, 44_100));
        engine.load_sample(SlotId::B, silence_sample(2.0, 44_100));
        engine.play();
        engine.reset();

        let snap = engine.snapshot();
        assert!(!snap.playing);
        assert_eq!(snap.playhead_secs, 0.0);
        assert!(snap.effective_duration.is_none());
        assert!(!engine.is_loaded(SlotId::A));
        assert!(!engine.is_loaded(SlotId::B));
    }

    #[test]
    fn test_snapshot_serializes() {
        let engine = Engine::new(AppConfig::default());
        let json = serde_json::to_string(&engine.snapshot()).unwrap();
        assert!(json.contains("playhead_secs"));
        assert!(json.contains("pitch_a"));
    }
}
