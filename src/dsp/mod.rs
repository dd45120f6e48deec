// DSP module - spectral analysis pipeline for pitch readout
//
// This module contains the three stages that turn raw audio into a stable
// on-screen pitch value:
// - fft: in-place radix-2 transform used by the offline analysis path
// - peak: dominant-bin search with parabolic refinement and level/SNR reporting
// - stabilizer: confidence- and jitter-gated smoothing of successive estimates

pub mod fft;
pub mod peak;
pub mod stabilizer;

pub use fft::{hann_window, transform, FFT_SIZE};
pub use peak::{band_bins, estimate_from_complex, estimate_from_db, RawPitchEstimate};
pub use stabilizer::PitchStabilizer;
