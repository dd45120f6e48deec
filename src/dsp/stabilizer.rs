// PitchStabilizer - confidence- and jitter-gated smoothing of pitch estimates
//
// Raw per-tick estimates flicker: spectral noise moves the dominant bin
// around even when the underlying tone is steady. The stabilizer holds the
// last good value through weak or noisy frames and only follows large jumps
// when the evidence is strong, applying exponential smoothing to everything
// it accepts.
//
// Rules, applied in order:
// 1. Candidate absent            -> hold previous
// 2. No previous value           -> adopt candidate (cold start)
// 3. Peak below min_peak_db      -> hold previous
// 4. SNR below snr_min_db        -> hold previous
// 5. Jump > jitter_guard_pct and SNR below snr_strong_db -> hold previous
// 6. Otherwise                   -> previous*(1-alpha) + candidate*alpha

use crate::config::StabilizerConfig;
use crate::dsp::peak::RawPitchEstimate;

/// Per-stream pitch smoothing filter with memory.
#[derive(Debug, Clone)]
pub struct PitchStabilizer {
    config: StabilizerConfig,
    previous: Option<f64>,
}

impl PitchStabilizer {
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            config,
            previous: None,
        }
    }

    /// The current stabilized value, if any estimate has been accepted since
    /// the last reset.
    pub fn current(&self) -> Option<f64> {
        self.previous
    }

    /// Discard all smoothing history (used when the source is reloaded).
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Feed one raw estimate through the filter and return the new
    /// stabilized value.
    pub fn update(&mut self, estimate: &RawPitchEstimate) -> Option<f64> {
        let Some(candidate) = estimate.hz else {
            // No usable peak this frame; keep showing the last good value
            return self.previous;
        };

        let Some(previous) = self.previous else {
            self.previous = Some(candidate);
            return self.previous;
        };

        if estimate.peak_db < self.config.min_peak_db {
            return self.previous;
        }

        let avg_db = if estimate.avg_db.is_finite() {
            estimate.avg_db
        } else {
            self.config.default_avg_db
        };
        let snr = estimate.peak_db - avg_db;
        if snr < self.config.snr_min_db {
            return self.previous;
        }

        let diff = (candidate - previous).abs() / previous.max(1.0);
        if diff > self.config.jitter_guard_pct && snr < self.config.snr_strong_db {
            // Large jump with middling confidence: treat as jitter
            return self.previous;
        }

        let alpha = self.config.smoothing_alpha;
        self.previous = Some(previous * (1.0 - alpha) + candidate * alpha);
        self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(hz: Option<f64>, peak_db: f64, avg_db: f64) -> RawPitchEstimate {
        RawPitchEstimate {
            hz,
            peak_db,
            avg_db,
        }
    }

    fn stabilizer_at(previous: Option<f64>) -> PitchStabilizer {
        let mut s = PitchStabilizer::new(StabilizerConfig::default());
        s.previous = previous;
        s
    }

    #[test]
    fn test_cold_start_adopts_candidate() {
        let mut s = stabilizer_at(None);
        // Levels are irrelevant on cold start
        let result = s.update(&estimate(Some(300.0), -80.0, -82.0));
        assert_eq!(result, Some(300.0), "Cold start should adopt directly");
    }

    #[test]
    fn test_absent_candidate_holds_previous() {
        let mut s = stabilizer_at(Some(440.0));
        let result = s.update(&estimate(None, -30.0, -60.0));
        assert_eq!(result, Some(440.0));
    }

    #[test]
    fn test_strong_signal_is_smoothed() {
        let mut s = stabilizer_at(Some(440.0));
        // snr = 30 dB, above the strong threshold; small move accepted via EMA
        let result = s.update(&estimate(Some(445.0), -30.0, -60.0));
        let value = result.expect("value should be present");
        assert!(
            (value - 441.0).abs() < 1e-9,
            "Expected 440*0.8 + 445*0.2 = 441.0, got {}",
            value
        );
    }

    #[test]
    fn test_jitter_jump_is_rejected() {
        let mut s = stabilizer_at(Some(440.0));
        // snr = 10 dB (above min, below strong) and 13.6% jump: rejected
        let result = s.update(&estimate(Some(500.0), -40.0, -50.0));
        assert_eq!(result, Some(440.0), "Large low-confidence jump should hold");
    }

    #[test]
    fn test_jump_accepted_when_confident() {
        let mut s = stabilizer_at(Some(440.0));
        // Same jump but snr = 30 dB: genuine pitch change, follow it
        let result = s.update(&estimate(Some(500.0), -30.0, -60.0));
        let value = result.expect("value should be present");
        assert!(
            (value - 452.0).abs() < 1e-9,
            "Expected 440*0.8 + 500*0.2 = 452.0, got {}",
            value
        );
    }

    #[test]
    fn test_weak_peak_is_rejected() {
        let mut s = stabilizer_at(Some(440.0));
        let result = s.update(&estimate(Some(445.0), -90.0, -120.0));
        assert_eq!(result, Some(440.0), "Sub-floor peak should hold previous");
    }

    #[test]
    fn test_low_snr_is_rejected() {
        let mut s = stabilizer_at(Some(440.0));
        // snr = 5 dB, below the minimum gate
        let result = s.update(&estimate(Some(445.0), -40.0, -45.0));
        assert_eq!(result, Some(440.0));
    }

    #[test]
    fn test_missing_avg_uses_default_floor() {
        let mut s = stabilizer_at(Some(440.0));
        // avg unavailable: defaults to -120 dB, so snr is huge and accepted
        let result = s.update(&estimate(Some(445.0), -30.0, f64::NEG_INFINITY));
        let value = result.expect("value should be present");
        assert!((value - 441.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut s = stabilizer_at(Some(440.0));
        s.reset();
        assert_eq!(s.current(), None);
        let result = s.update(&estimate(Some(300.0), -80.0, -90.0));
        assert_eq!(result, Some(300.0), "Post-reset update is a cold start");
    }
}
