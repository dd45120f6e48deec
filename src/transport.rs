// Transport - the shared playback timeline for both sources
//
// The transport owns the play/pause/seek state machine and derives the
// playhead from a monotonic clock rather than from the audio device, so the
// timeline keeps advancing identically whether a real sink is attached or
// not. Playback scheduling is delegated to the sink; the transport only has
// to keep its derived playhead consistent with what it asked the sink to do.

use std::cell::Cell;
use std::time::Instant;

use crate::config::TransportConfig;
use crate::error::PlaybackError;
use crate::playback::PlaybackSink;
use crate::sample::SampleStore;

/// Monotonic time source, injectable for deterministic tests.
pub trait Clock {
    fn now_secs(&self) -> f64;
}

/// Wall clock measured from construction.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_secs(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl<C: Clock + ?Sized> Clock for std::rc::Rc<C> {
    fn now_secs(&self) -> f64 {
        (**self).now_secs()
    }
}

/// Hand-advanced clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, secs: f64) {
        self.now.set(secs);
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> f64 {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
    /// A drag-seek is in progress; the playhead follows the pointer and
    /// playback stays suspended until the drag ends.
    Seeking,
}

/// Play/pause/seek state machine over a clock-derived playhead.
///
/// Collaborators (store, sink, clock) are passed into each method instead of
/// being owned, so the engine can keep single ownership of all of them.
pub struct TransportController {
    config: TransportConfig,
    state: TransportState,
    /// Timeline position, valid in every state
    playhead_secs: f64,
    /// Clock time corresponding to timeline zero while playing
    schedule_base: f64,
    /// State to return to when a drag-seek ends
    resume_after_seek: bool,
}

impl TransportController {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            state: TransportState::Stopped,
            playhead_secs: 0.0,
            schedule_base: 0.0,
            resume_after_seek: false,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn playhead_secs(&self) -> f64 {
        self.playhead_secs
    }

    /// Start synchronized playback from the current playhead.
    ///
    /// A no-op unless both slots are loaded. Sink failures other than
    /// `AlreadyStarted` leave the transport stopped.
    pub fn play(&mut self, store: &SampleStore, sink: &mut dyn PlaybackSink, clock: &dyn Clock) {
        if self.state == TransportState::Playing {
            return;
        }
        let Some(duration) = store.effective_duration() else {
            return;
        };
        if !store.both_loaded() {
            log::debug!("[Transport] Play ignored: only one source loaded");
            return;
        }

        let (Some(a), Some(b)) = (
            store.get(crate::sample::SlotId::A).cloned(),
            store.get(crate::sample::SlotId::B).cloned(),
        ) else {
            return;
        };

        let offset = self.clamp_offset(self.playhead_secs, duration);
        let lead = self.config.start_lead_secs;

        match sink.schedule_start(a, b, offset, lead) {
            Ok(()) => {}
            Err(PlaybackError::AlreadyStarted) => {
                // Harmless double invocation; keep going with our timeline
                log::debug!("[Transport] Sink already started");
            }
            Err(err) => {
                log::warn!("[Transport] Failed to start playback: {}", err);
                return;
            }
        }

        let scheduled_start = clock.now_secs() + lead;
        self.schedule_base = scheduled_start - offset;
        self.playhead_secs = offset;
        self.state = TransportState::Playing;
        log::info!("[Transport] Playing from {:.3}s", offset);
    }

    /// Stop playback, keeping the playhead where it is.
    pub fn pause(&mut self, sink: &mut dyn PlaybackSink) {
        if self.state == TransportState::Stopped {
            return;
        }
        sink.stop();
        self.state = TransportState::Stopped;
        self.resume_after_seek = false;
        log::info!("[Transport] Paused at {:.3}s", self.playhead_secs);
    }

    pub fn toggle(&mut self, store: &SampleStore, sink: &mut dyn PlaybackSink, clock: &dyn Clock) {
        if self.is_playing() {
            self.pause(sink);
        } else {
            self.play(store, sink, clock);
        }
    }

    /// Begin a drag-seek at `fraction` of the effective duration.
    pub fn begin_seek(&mut self, fraction: f64, store: &SampleStore, sink: &mut dyn PlaybackSink) {
        let Some(duration) = store.effective_duration() else {
            return;
        };
        self.resume_after_seek = self.state == TransportState::Playing;
        if self.state == TransportState::Playing {
            sink.stop();
        }
        self.state = TransportState::Seeking;
        self.playhead_secs = self.clamp_offset(fraction.clamp(0.0, 1.0) * duration, duration);
    }

    /// Move the in-progress drag-seek. Ignored outside a drag.
    pub fn update_seek(&mut self, fraction: f64, store: &SampleStore) {
        if self.state != TransportState::Seeking {
            return;
        }
        let Some(duration) = store.effective_duration() else {
            return;
        };
        self.playhead_secs = self.clamp_offset(fraction.clamp(0.0, 1.0) * duration, duration);
    }

    /// Finish the drag-seek, resuming playback if it was playing when the
    /// drag began.
    pub fn end_seek(
        &mut self,
        store: &SampleStore,
        sink: &mut dyn PlaybackSink,
        clock: &dyn Clock,
    ) {
        if self.state != TransportState::Seeking {
            return;
        }
        self.state = TransportState::Stopped;
        if self.resume_after_seek {
            self.resume_after_seek = false;
            self.play(store, sink, clock);
        }
    }

    /// Advance the derived playhead and detect end-of-timeline. Call once
    /// per UI tick.
    pub fn tick(&mut self, store: &SampleStore, sink: &mut dyn PlaybackSink, clock: &dyn Clock) {
        if self.state != TransportState::Playing {
            // Still drain sink events so a late Ended cannot leak into the
            // next playback run
            let _ = sink.take_ended();
            return;
        }

        let Some(duration) = store.effective_duration() else {
            self.pause(sink);
            return;
        };

        let raw = clock.now_secs() - self.schedule_base;
        self.playhead_secs = raw.clamp(0.0, duration);

        if sink.take_ended() || self.playhead_secs >= duration {
            self.playhead_secs = duration;
            sink.stop();
            self.state = TransportState::Stopped;
            log::info!("[Transport] Reached end of comparable timeline");
        }
    }

    /// Pull the playhead back inside the current effective duration after a
    /// slot load or unload shortened the timeline.
    pub fn clamp_playhead(&mut self, store: &SampleStore) {
        match store.effective_duration() {
            Some(duration) => {
                self.playhead_secs = self.playhead_secs.min(duration);
            }
            None => {
                self.playhead_secs = 0.0;
            }
        }
    }

    /// Reset to a stopped transport at timeline zero.
    pub fn reset(&mut self, sink: &mut dyn PlaybackSink) {
        sink.stop();
        self.state = TransportState::Stopped;
        self.playhead_secs = 0.0;
        self.schedule_base = 0.0;
        self.resume_after_seek = false;
    }

    /// Keep start offsets inside the playable range, leaving an epsilon gap
    /// before the end so a start there does not immediately finish.
    fn clamp_offset(&self, offset: f64, duration: f64) -> f64 {
        let max = (duration - self.config.seek_epsilon_secs).max(0.0);
        offset.clamp(0.0, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::NullSink;
    use crate::sample::{AudioSample, SlotId};

    fn loaded_store(secs_a: f64, secs_b: f64) -> SampleStore {
        let mut store = SampleStore::new();
        store.load(
            SlotId::A,
            AudioSample::new(vec![0.0; (secs_a * 1000.0) as usize], 1000),
        );
        store.load(
            SlotId::B,
            AudioSample::new(vec![0.0; (secs_b * 1000.0) as usize], 1000),
        );
        store
    }

    fn transport() -> TransportController {
        TransportController::new(TransportConfig::default())
    }

    #[test]
    fn test_play_requires_both_slots() {
        let mut t = transport();
        let mut sink = NullSink::new();
        let clock = ManualClock::new();

        let mut store = SampleStore::new();
        store.load(SlotId::A, AudioSample::new(vec![0.0; 1000], 1000));
        t.play(&store, &mut sink, &clock);
        assert_eq!(t.state(), TransportState::Stopped);
    }

    #[test]
    fn test_playhead_follows_clock_after_lead() {
        let mut t = transport();
        let mut sink = NullSink::new();
        let clock = ManualClock::new();
        let store = loaded_store(10.0, 7.0);

        t.play(&store, &mut sink, &clock);
        assert_eq!(t.state(), TransportState::Playing);

        // Lead is 0.05s; 1.05s of wall time is 1.0s of timeline
        clock.set(1.05);
        t.tick(&store, &mut sink, &clock);
        assert!(
            (t.playhead_secs() - 1.0).abs() < 1e-9,
            "Playhead should be 1.0s, got {}",
            t.playhead_secs()
        );
    }

    #[test]
    fn test_tick_stops_at_effective_duration() {
        let mut t = transport();
        let mut sink = NullSink::new();
        let clock = ManualClock::new();
        let store = loaded_store(10.0, 7.0);

        t.play(&store, &mut sink, &clock);
        clock.set(8.0);
        t.tick(&store, &mut sink, &clock);

        assert_eq!(t.state(), TransportState::Stopped);
        assert!((t.playhead_secs() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_pause_freezes_playhead() {
        let mut t = transport();
        let mut sink = NullSink::new();
        let clock = ManualClock::new();
        let store = loaded_store(10.0, 10.0);

        t.play(&store, &mut sink, &clock);
        clock.set(2.05);
        t.tick(&store, &mut sink, &clock);
        t.pause(&mut sink);

        clock.set(5.0);
        t.tick(&store, &mut sink, &clock);
        assert!((t.playhead_secs() - 2.0).abs() < 1e-9);
        assert_eq!(t.state(), TransportState::Stopped);
    }

    #[test]
    fn test_seek_clamps_near_end() {
        let mut t = transport();
        let mut sink = NullSink::new();
        let store = loaded_store(10.0, 7.0);

        t.begin_seek(1.0, &store, &mut sink);
        let eps = TransportConfig::default().seek_epsilon_secs;
        assert!(
            (t.playhead_secs() - (7.0 - eps)).abs() < 1e-9,
            "Full-right drag should clamp just before the end, got {}",
            t.playhead_secs()
        );
    }

    #[test]
    fn test_seek_during_playback_resumes() {
        let mut t = transport();
        let mut sink = NullSink::new();
        let clock = ManualClock::new();
        let store = loaded_store(10.0, 10.0);

        t.play(&store, &mut sink, &clock);
        clock.set(1.05);
        t.tick(&store, &mut sink, &clock);

        t.begin_seek(0.5, &store, &mut sink);
        assert_eq!(t.state(), TransportState::Seeking);
        t.update_seek(0.6, &store);
        assert!((t.playhead_secs() - 6.0).abs() < 1e-9);

        t.end_seek(&store, &mut sink, &clock);
        assert_eq!(t.state(), TransportState::Playing);
        assert!((t.playhead_secs() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_seek_while_stopped_stays_stopped() {
        let mut t = transport();
        let mut sink = NullSink::new();
        let clock = ManualClock::new();
        let store = loaded_store(10.0, 10.0);

        t.begin_seek(0.3, &store, &mut sink);
        t.end_seek(&store, &mut sink, &clock);
        assert_eq!(t.state(), TransportState::Stopped);
        assert!((t.playhead_secs() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_update_seek_ignored_outside_drag() {
        let mut t = transport();
        let store = loaded_store(10.0, 10.0);
        t.update_seek(0.5, &store);
        assert_eq!(t.playhead_secs(), 0.0);
    }

    #[test]
    fn test_toggle_round_trip() {
        let mut t = transport();
        let mut sink = NullSink::new();
        let clock = ManualClock::new();
        let store = loaded_store(5.0, 5.0);

        t.toggle(&store, &mut sink, &clock);
        assert!(t.is_playing());
        t.toggle(&store, &mut sink, &clock);
        assert!(!t.is_playing());
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let mut t = transport();
        let mut sink = NullSink::new();
        let clock = ManualClock::new();
        let store = loaded_store(5.0, 5.0);

        t.play(&store, &mut sink, &clock);
        clock.set(2.05);
        t.tick(&store, &mut sink, &clock);
        t.reset(&mut sink);

        assert_eq!(t.state(), TransportState::Stopped);
        assert_eq!(t.playhead_secs(), 0.0);
    }
}
