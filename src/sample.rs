// Audio sample store - decoded PCM for the two comparison slots
//
// Each slot owns one immutable decoded buffer (first channel only). Slots
// are replaced wholesale on reload; the analysis side only ever reads them
// through shared references, so there is no writer contention once loaded.

use std::sync::Arc;

/// Identifies one of the two comparison slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    /// Stable array index for per-slot state.
    pub fn index(self) -> usize {
        match self {
            SlotId::A => 0,
            SlotId::B => 1,
        }
    }

    /// Short display label ("A" / "B").
    pub fn label(self) -> &'static str {
        match self {
            SlotId::A => "A",
            SlotId::B => "B",
        }
    }
}

/// One decoded audio source: first-channel samples plus rate metadata.
///
/// Immutable once constructed; the store replaces the whole value on reload.
#[derive(Debug, Clone)]
pub struct AudioSample {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSample {
    /// Build a sample from first-channel PCM data.
    ///
    /// `sample_rate` must be positive; this is a decoder-side contract.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        debug_assert!(sample_rate > 0, "sample rate must be positive");
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration derived from the sample count.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Sample at `index`, or zero when out of range (used for zero-padded
    /// analysis windows at the buffer edges).
    pub fn sample_or_zero(&self, index: usize) -> f32 {
        self.samples.get(index).copied().unwrap_or(0.0)
    }
}

/// The two comparison slots.
#[derive(Debug, Default)]
pub struct SampleStore {
    slots: [Option<Arc<AudioSample>>; 2],
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot's sample. Returns the previous occupant so the
    /// caller can log or release it.
    pub fn load(&mut self, slot: SlotId, sample: AudioSample) -> Option<Arc<AudioSample>> {
        log::info!(
            "[SampleStore] Loaded slot {}: {:.3}s at {} Hz",
            slot.label(),
            sample.duration_secs(),
            sample.sample_rate()
        );
        self.slots[slot.index()].replace(Arc::new(sample))
    }

    /// Clear the slot and release the underlying buffer.
    pub fn unload(&mut self, slot: SlotId) {
        if self.slots[slot.index()].take().is_some() {
            log::info!("[SampleStore] Unloaded slot {}", slot.label());
        }
    }

    /// Clear both slots.
    pub fn clear(&mut self) {
        self.slots = [None, None];
    }

    pub fn get(&self, slot: SlotId) -> Option<&Arc<AudioSample>> {
        self.slots[slot.index()].as_ref()
    }

    pub fn is_loaded(&self, slot: SlotId) -> bool {
        self.slots[slot.index()].is_some()
    }

    pub fn both_loaded(&self) -> bool {
        self.is_loaded(SlotId::A) && self.is_loaded(SlotId::B)
    }

    /// The shared comparable timeline: the shorter duration when both slots
    /// are loaded, the present one's duration when only one is, `None` when
    /// the store is empty.
    pub fn effective_duration(&self) -> Option<f64> {
        let a = self.get(SlotId::A).map(|s| s.duration_secs());
        let b = self.get(SlotId::B).map(|s| s.duration_secs());
        match (a, b) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}
