// abpitch - dual-source audio comparison engine
// Synchronized two-stream playback with a stabilized pitch readout per source

// Module declarations
pub mod config;
pub mod decode;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod playback;
pub mod sample;
pub mod scheduler;
pub mod transport;

// Re-exports for convenience
pub use config::AppConfig;
pub use engine::{Engine, Snapshot};
pub use sample::{AudioSample, SlotId};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Verify the crate-level surface is accessible
        let engine = Engine::new(AppConfig::default());
        assert!(!engine.is_loaded(SlotId::A));
    }
}
