// Playback sink - synchronized two-source audio output
//
// The transport drives playback through the `PlaybackSink` trait and reads
// live analysis frames through `LiveSpectrum`. `CpalSink` is the real device
// implementation; `NullSink` and `SilentSpectrum` keep the engine fully
// functional (timeline, seeking, offline analysis) when no output device is
// wanted, such as in tests or headless hosts.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::PlaybackError;
use crate::sample::{AudioSample, SlotId};

/// Commands the control side pushes into the audio callback.
enum SinkCommand {
    Start {
        a: Arc<AudioSample>,
        b: Arc<AudioSample>,
        offset_secs: f64,
        lead_secs: f64,
    },
    Stop,
}

/// Events the audio callback pushes back to the control side.
enum SinkEvent {
    Ended,
}

/// Schedules and stops synchronized playback of the two loaded sources.
///
/// `schedule_start` begins both sources at the same timeline offset after a
/// shared lead delay, so they stay sample-locked relative to each other.
pub trait PlaybackSink {
    fn schedule_start(
        &mut self,
        a: Arc<AudioSample>,
        b: Arc<AudioSample>,
        offset_secs: f64,
        lead_secs: f64,
    ) -> Result<(), PlaybackError>;

    fn stop(&mut self);

    /// True once after either source has played to its end since the last
    /// start. Polled by the transport each tick.
    fn take_ended(&mut self) -> bool;
}

/// Per-slot live magnitude frames from the output path.
///
/// `fill_db_frame` copies the most recent dB-scaled spectrum frame for the
/// slot into `out` and returns whether a fresh frame was available.
pub trait LiveSpectrum {
    fn bin_count(&self) -> usize;
    fn fill_db_frame(&mut self, slot: SlotId, out: &mut [f32]) -> bool;
}

/// Sink that schedules nothing. The transport timeline still runs.
#[derive(Debug, Default)]
pub struct NullSink {
    started: bool,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaybackSink for NullSink {
    fn schedule_start(
        &mut self,
        _a: Arc<AudioSample>,
        _b: Arc<AudioSample>,
        _offset_secs: f64,
        _lead_secs: f64,
    ) -> Result<(), PlaybackError> {
        if self.started {
            return Err(PlaybackError::AlreadyStarted);
        }
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.started = false;
    }

    fn take_ended(&mut self) -> bool {
        false
    }
}

/// Live spectrum source that never produces frames, forcing the scheduler
/// onto its offline analysis path.
#[derive(Debug, Default)]
pub struct SilentSpectrum;

impl SilentSpectrum {
    pub fn new() -> Self {
        Self
    }
}

impl LiveSpectrum for SilentSpectrum {
    fn bin_count(&self) -> usize {
        crate::dsp::FFT_SIZE / 2
    }

    fn fill_db_frame(&mut self, _slot: SlotId, _out: &mut [f32]) -> bool {
        false
    }
}

/// One playing source inside the audio callback: resampled by fractional
/// position stepping from its native rate to the output rate.
struct ActiveSource {
    sample: Arc<AudioSample>,
    /// Fractional read position in source samples
    position: f64,
    /// Source samples advanced per output frame
    step: f64,
}

impl ActiveSource {
    fn new(sample: Arc<AudioSample>, offset_secs: f64, output_rate: f64) -> Self {
        let source_rate = sample.sample_rate() as f64;
        Self {
            position: offset_secs * source_rate,
            step: source_rate / output_rate,
            sample,
        }
    }

    fn exhausted(&self) -> bool {
        self.position as usize >= self.sample.samples().len()
    }

    fn next_sample(&mut self) -> f32 {
        let value = self.sample.sample_or_zero(self.position as usize);
        self.position += self.step;
        value
    }
}

/// Callback-side playback state machine.
struct CallbackState {
    commands: Consumer<SinkCommand>,
    events: Producer<SinkEvent>,
    output_rate: f64,
    /// Frames to emit as silence before the sources begin
    lead_frames: u64,
    sources: Option<(ActiveSource, ActiveSource)>,
}

impl CallbackState {
    fn fill(&mut self, data: &mut [f32], channels: usize) {
        while let Ok(command) = self.commands.pop() {
            match command {
                SinkCommand::Start {
                    a,
                    b,
                    offset_secs,
                    lead_secs,
                } => {
                    self.lead_frames = (lead_secs * self.output_rate).round() as u64;
                    self.sources = Some((
                        ActiveSource::new(a, offset_secs, self.output_rate),
                        ActiveSource::new(b, offset_secs, self.output_rate),
                    ));
                }
                SinkCommand::Stop => {
                    self.sources = None;
                }
            }
        }

        let frame_count = data.len() / channels;
        for i in 0..frame_count {
            let mut value = 0.0f32;

            if self.lead_frames > 0 {
                self.lead_frames -= 1;
            } else if let Some((a, b)) = self.sources.as_mut() {
                if a.exhausted() || b.exhausted() {
                    // Either source finishing ends the comparison pass
                    self.sources = None;
                    let _ = self.events.push(SinkEvent::Ended);
                } else {
                    // Equal-weight mix, halved to avoid clipping
                    value = 0.5 * (a.next_sample() + b.next_sample());
                }
            }

            for ch in 0..channels {
                data[i * channels + ch] = value;
            }
        }
    }
}

/// Device-backed sink built on cpal's default output stream.
///
/// The stream is built lazily on the first `schedule_start` and kept alive
/// across stop/start cycles; commands and end-of-stream events cross the
/// realtime boundary over lock-free rings.
pub struct CpalSink {
    stream: Option<cpal::Stream>,
    command_tx: Option<Producer<SinkCommand>>,
    event_rx: Option<Consumer<SinkEvent>>,
    started: bool,
}

impl CpalSink {
    pub fn new() -> Self {
        Self {
            stream: None,
            command_tx: None,
            event_rx: None,
            started: false,
        }
    }

    fn ensure_stream(&mut self) -> Result<(), PlaybackError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PlaybackError::StreamOpenFailed {
                reason: "No default output device found".to_string(),
            })?;

        let config = device
            .default_output_config()
            .map_err(|e| PlaybackError::StreamOpenFailed {
                reason: format!("Failed to get default output config: {:?}", e),
            })?;

        let stream_config: cpal::StreamConfig = config.clone().into();
        let channels_count = stream_config.channels as usize;
        let output_rate = stream_config.sample_rate.0 as f64;

        let (command_tx, command_rx) = RingBuffer::<SinkCommand>::new(8);
        let (event_tx, event_rx) = RingBuffer::<SinkEvent>::new(8);

        let mut state = CallbackState {
            commands: command_rx,
            events: event_tx,
            output_rate,
            lead_frames: 0,
            sources: None,
        };

        let err_fn = |err| eprintln!("Output stream error: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    state.fill(data, channels_count);
                },
                err_fn,
                None,
            ),
            _ => {
                return Err(PlaybackError::StreamOpenFailed {
                    reason: "Only F32 sample format is currently supported for output".to_string(),
                })
            }
        }
        .map_err(|e| PlaybackError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

        stream.play().map_err(|e| PlaybackError::HardwareError {
            details: format!("Output start failed: {}", e),
        })?;

        self.stream = Some(stream);
        self.command_tx = Some(command_tx);
        self.event_rx = Some(event_rx);
        Ok(())
    }
}

impl Default for CpalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackSink for CpalSink {
    fn schedule_start(
        &mut self,
        a: Arc<AudioSample>,
        b: Arc<AudioSample>,
        offset_secs: f64,
        lead_secs: f64,
    ) -> Result<(), PlaybackError> {
        if self.started {
            return Err(PlaybackError::AlreadyStarted);
        }
        self.ensure_stream()?;

        let tx = self
            .command_tx
            .as_mut()
            .ok_or_else(|| PlaybackError::HardwareError {
                details: "Command channel missing after stream open".to_string(),
            })?;
        tx.push(SinkCommand::Start {
            a,
            b,
            offset_secs,
            lead_secs,
        })
        .map_err(|_| PlaybackError::HardwareError {
            details: "Audio callback command queue is full".to_string(),
        })?;

        self.started = true;
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(tx) = self.command_tx.as_mut() {
            let _ = tx.push(SinkCommand::Stop);
        }
        self.started = false;
    }

    fn take_ended(&mut self) -> bool {
        let mut ended = false;
        if let Some(rx) = self.event_rx.as_mut() {
            while let Ok(SinkEvent::Ended) = rx.pop() {
                ended = true;
            }
        }
        if ended {
            self.started = false;
        }
        ended
    }
}
