//! Configuration management for analysis and transport tuning
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling threshold experiments without recompilation. The defaults
//! encode the shipped behavior; a config file only needs to override the
//! knobs under test.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub stabilizer: StabilizerConfig,
    pub transport: TransportConfig,
}

/// Spectral analysis parameters shared by the live and offline paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// FFT length for offline analysis (power of two)
    pub fft_size: usize,
    /// Lower edge of the scanned frequency band in Hz
    pub hz_min: f64,
    /// Upper edge of the scanned frequency band in Hz (capped at Nyquist)
    pub hz_max: f64,
    /// Peak level gate for live analyser frames (dB)
    pub live_floor_db: f64,
    /// Peak level gate for offline FFT frames (dB)
    pub offline_floor_db: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 4096,
            // Wide band from the tool's later revision. The two floors stay
            // different per entry point: the live analyser applies its own
            // time smoothing, so it gets the looser gate.
            hz_min: 40.0,
            hz_max: 12_000.0,
            live_floor_db: -110.0,
            offline_floor_db: -85.0,
        }
    }
}

/// Pitch stabilizer gating and smoothing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilizerConfig {
    /// Reject candidates whose peak level falls below this (dB)
    pub min_peak_db: f64,
    /// Minimum peak-over-average SNR to trust a candidate at all (dB)
    pub snr_min_db: f64,
    /// SNR above which large jumps are accepted as genuine (dB)
    pub snr_strong_db: f64,
    /// Relative frequency jump treated as jitter below the strong SNR
    pub jitter_guard_pct: f64,
    /// Exponential smoothing factor for accepted candidates
    pub smoothing_alpha: f64,
    /// Assumed band average when the estimator could not compute one (dB)
    pub default_avg_db: f64,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            min_peak_db: -85.0,
            snr_min_db: 8.0,
            snr_strong_db: 18.0,
            jitter_guard_pct: 0.12,
            smoothing_alpha: 0.2,
            default_avg_db: -120.0,
        }
    }
}

/// Transport scheduling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Lead time before the synchronized start of both sources (seconds)
    pub start_lead_secs: f64,
    /// Gap kept between a clamped start offset and the effective end (seconds)
    pub seek_epsilon_secs: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            start_lead_secs: 0.05,
            seek_epsilon_secs: 0.001,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file, falling back to defaults on any
    /// read or parse failure.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default assets location.
    pub fn load() -> Self {
        Self::load_from_file("assets/analysis_config.json")
    }
}
