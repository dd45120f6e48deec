// Spectral peak estimation - dominant-frequency search with parabolic refinement
//
// Two entry points share one scan core: the live path receives decibel bins
// straight from the streaming analyser, the offline path receives raw FFT
// output and converts magnitudes to the same decibel scale first. Both report
// peak and band-average levels so the stabilizer can gate on confidence.

/// Raw per-frame pitch estimate before stabilization.
///
/// `hz` is absent when no bin in the analyzed band clears the level gate;
/// `peak_db` and `avg_db` are still reported so callers can log or gate.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct RawPitchEstimate {
    /// Refined dominant frequency in Hz, absent for silence/noise
    pub hz: Option<f64>,
    /// Level of the strongest bin in the band (dB)
    pub peak_db: f64,
    /// Average level across the band (dB), used as the noise-floor proxy
    pub avg_db: f64,
}

/// Compute the inclusive bin range covering `[hz_min, hz_max]`.
///
/// The upper bound is capped at Nyquist and at the last positive-frequency
/// bin; the lower bound skips DC.
pub fn band_bins(sample_rate: u32, fft_size: usize, hz_min: f64, hz_max: f64) -> (usize, usize) {
    let bin_hz = sample_rate as f64 / fft_size as f64;
    let hz_max = hz_max.min(sample_rate as f64 / 2.0);
    let min_bin = ((hz_min / bin_hz).floor() as usize).max(1);
    let max_bin = ((hz_max / bin_hz).floor() as usize).min(fft_size / 2 - 1);
    (min_bin, max_bin)
}

/// Estimate the dominant frequency from a decibel-domain spectrum frame.
///
/// Used for live streaming frames where the platform analyser already
/// provides log-domain levels.
///
/// # Arguments
/// * `spectrum_db` - Decibel levels per bin (at least `max_bin + 1` long)
/// * `min_bin`, `max_bin` - Inclusive scan band
/// * `floor_db` - Minimum peak level; quieter frames yield `hz: None`
pub fn estimate_from_db(
    spectrum_db: &[f32],
    min_bin: usize,
    max_bin: usize,
    sample_rate: u32,
    fft_size: usize,
    floor_db: f64,
) -> RawPitchEstimate {
    estimate_core(
        |i| spectrum_db.get(i).copied().map(f64::from),
        min_bin,
        max_bin.min(spectrum_db.len().saturating_sub(1)),
        sample_rate,
        fft_size,
        floor_db,
    )
}

/// Estimate the dominant frequency from raw complex FFT output.
///
/// Used for offline analysis at an arbitrary playhead position. Bin
/// magnitudes (`re^2 + im^2`) are converted to decibels relative to a
/// full-scale Hann-windowed sine, so the same style of gates applies as on
/// the live path.
pub fn estimate_from_complex(
    re: &[f64],
    im: &[f64],
    min_bin: usize,
    max_bin: usize,
    sample_rate: u32,
    fft_size: usize,
    floor_db: f64,
) -> RawPitchEstimate {
    debug_assert_eq!(re.len(), im.len());
    // A full-scale sine under a Hann window peaks at N/4 magnitude; use that
    // as the 0 dB reference so the decibel gates line up with the live path.
    let reference = (fft_size as f64 / 4.0).max(1.0);
    let level = |i: usize| -> Option<f64> {
        if i >= re.len() {
            return None;
        }
        let power = re[i] * re[i] + im[i] * im[i];
        if power <= 0.0 {
            Some(-200.0)
        } else {
            Some(10.0 * (power / (reference * reference)).log10())
        }
    };
    estimate_core(
        level,
        min_bin,
        max_bin.min(re.len().saturating_sub(1)),
        sample_rate,
        fft_size,
        floor_db,
    )
}

/// Shared band scan + parabolic refinement.
///
/// Scans `[min_bin, max_bin]` for the strongest bin while accumulating the
/// band average, rejects peaks below `floor_db`, then refines the integer
/// bin with the three-point parabola vertex
/// `p = 0.5 * (alpha - gamma) / (alpha - 2*beta - gamma)`.
fn estimate_core<F>(
    level: F,
    min_bin: usize,
    max_bin: usize,
    sample_rate: u32,
    fft_size: usize,
    floor_db: f64,
) -> RawPitchEstimate
where
    F: Fn(usize) -> Option<f64>,
{
    let mut peak_db = f64::NEG_INFINITY;
    let mut peak_idx: Option<usize> = None;
    let mut sum_db = 0.0f64;
    let mut count = 0usize;

    for i in min_bin..=max_bin {
        let Some(db) = level(i) else { break };
        sum_db += db;
        count += 1;
        if db > peak_db {
            peak_db = db;
            peak_idx = Some(i);
        }
    }

    let avg_db = if count > 0 {
        sum_db / count as f64
    } else {
        f64::NEG_INFINITY
    };

    let Some(idx) = peak_idx else {
        return RawPitchEstimate {
            hz: None,
            peak_db,
            avg_db,
        };
    };

    if peak_db < floor_db {
        // Too quiet to be anything but noise
        return RawPitchEstimate {
            hz: None,
            peak_db,
            avg_db,
        };
    }

    // Neighbors fall back to just-below-peak so edge bins still refine sanely
    let alpha = if idx > 0 { level(idx - 1) } else { None }.unwrap_or(peak_db - 1.0);
    let beta = peak_db;
    let gamma = level(idx + 1).unwrap_or(peak_db - 1.0);

    let denom = alpha - 2.0 * beta - gamma;
    let p = if denom.abs() > f64::EPSILON {
        let p = 0.5 * (alpha - gamma) / denom;
        if p.is_finite() {
            p
        } else {
            0.0
        }
    } else {
        0.0
    };

    let bin_hz = sample_rate as f64 / fft_size as f64;
    RawPitchEstimate {
        hz: Some((idx as f64 + p) * bin_hz),
        peak_db,
        avg_db,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::fft::{hann_window, transform, FFT_SIZE};

    fn windowed_sine(freq_hz: f64, sample_rate: u32) -> (Vec<f64>, Vec<f64>) {
        let window = hann_window(FFT_SIZE);
        let mut re: Vec<f64> = (0..FFT_SIZE)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (2.0 * std::f64::consts::PI * freq_hz * t).sin() * window[i]
            })
            .collect();
        let mut im = vec![0.0; FFT_SIZE];
        transform(&mut re, &mut im);
        (re, im)
    }

    #[test]
    fn test_sine_440_within_two_hz() {
        let sample_rate = 44_100;
        let (re, im) = windowed_sine(440.0, sample_rate);
        let (min_bin, max_bin) = band_bins(sample_rate, FFT_SIZE, 40.0, 12_000.0);

        let est = estimate_from_complex(&re, &im, min_bin, max_bin, sample_rate, FFT_SIZE, -85.0);
        let hz = est.hz.expect("440 Hz sine should be detected");
        assert!(
            (hz - 440.0).abs() < 2.0,
            "Estimate {} Hz outside 440 +/- 2 Hz",
            hz
        );
    }

    #[test]
    fn test_parabolic_refinement_beats_raw_bin() {
        // 443.3 Hz does not land on a bin center at 44.1k/4096
        let sample_rate = 44_100;
        let target = 443.3;
        let (re, im) = windowed_sine(target, sample_rate);
        let (min_bin, max_bin) = band_bins(sample_rate, FFT_SIZE, 40.0, 12_000.0);

        let est = estimate_from_complex(&re, &im, min_bin, max_bin, sample_rate, FFT_SIZE, -85.0);
        let refined = est.hz.expect("sine should be detected");

        // Recover the raw integer-bin estimate for comparison
        let bin_hz = sample_rate as f64 / FFT_SIZE as f64;
        let raw_bin = (refined / bin_hz).round();
        let raw_hz = raw_bin * bin_hz;

        assert!(
            (refined - target).abs() <= (raw_hz - target).abs(),
            "Refined estimate {} should be at least as close to {} as raw bin {}",
            refined,
            target,
            raw_hz
        );
    }

    #[test]
    fn test_silence_reports_no_pitch() {
        let re = vec![0.0; FFT_SIZE];
        let im = vec![0.0; FFT_SIZE];
        let (min_bin, max_bin) = band_bins(44_100, FFT_SIZE, 40.0, 12_000.0);

        let est = estimate_from_complex(&re, &im, min_bin, max_bin, 44_100, FFT_SIZE, -85.0);
        assert!(est.hz.is_none(), "Silence should not produce a pitch");
    }

    #[test]
    fn test_db_frame_peak_detection() {
        // Synthetic analyser frame: quiet floor with one loud bin
        let fft_size = 2048;
        let sample_rate = 48_000;
        let mut frame = vec![-100.0f32; fft_size / 2];
        let bin = 50; // 50 * 48000/2048 = ~1171.9 Hz
        frame[bin - 1] = -40.0;
        frame[bin] = -30.0;
        frame[bin + 1] = -40.0;

        let (min_bin, max_bin) = band_bins(sample_rate, fft_size, 40.0, 12_000.0);
        let est = estimate_from_db(&frame, min_bin, max_bin, sample_rate, fft_size, -110.0);

        let hz = est.hz.expect("loud bin should be detected");
        let expected = bin as f64 * sample_rate as f64 / fft_size as f64;
        // Symmetric neighbors leave the parabola vertex on the bin center
        assert!(
            (hz - expected).abs() < 1e-9,
            "Expected {} Hz, got {}",
            expected,
            hz
        );
        assert!((est.peak_db - -30.0).abs() < 1e-9);
        assert!(est.avg_db < -90.0, "Band average should sit near the floor");
    }

    #[test]
    fn test_db_frame_below_floor_is_rejected() {
        let frame = vec![-120.0f32; 1024];
        let est = estimate_from_db(&frame, 1, 1000, 48_000, 2048, -110.0);
        assert!(est.hz.is_none(), "Frame below the gate should be rejected");
    }
}
