//! Microphone capture pipeline.
//!
//! cpal streams are not `Send`, so a dedicated thread owns the input stream
//! and forwards mono chunks over a channel. A tokio task does the rest:
//! keeps a rolling analysis window feeding the energy meter (published on a
//! watch channel for the visualizer) and resamples the microphone audio to
//! the Live API input rate before handing it to the controller.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::mpsc as std_mpsc;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, StreamConfig};
use immergo_core::controller::ControllerEvent;
use immergo_core::ports::{Capture, SessionError};
use immergo_native_utils::audio::LIVE_API_INPUT_SAMPLE_RATE;
use immergo_native_utils::{audio, device};
use rubato::{FastFixedIn, Resampler};
use tokio::sync::{mpsc, watch};

use crate::config::{ANALYSIS_WINDOW_SIZE, INPUT_CHUNK_SIZE};

/// Averages interleaved frames down to a single channel.
pub fn downmix(data: &[f32], channel_count: usize) -> Vec<f32> {
    if channel_count > 1 {
        data.chunks(channel_count)
            .map(|frame| frame.iter().sum::<f32>() / channel_count as f32)
            .collect()
    } else {
        data.to_vec()
    }
}

/// Appends a chunk to the rolling window, discarding the oldest samples.
fn push_window(window: &mut VecDeque<f32>, chunk: &[f32], capacity: usize) {
    window.extend(chunk.iter().copied());
    while window.len() > capacity {
        window.pop_front();
    }
}

struct CaptureSession {
    shutdown_tx: std_mpsc::Sender<()>,
    stream_thread: std::thread::JoinHandle<()>,
    analysis: tokio::task::JoinHandle<()>,
}

pub struct CapturePipeline {
    events_tx: mpsc::Sender<ControllerEvent>,
    energy_tx: Arc<watch::Sender<f32>>,
    energy_rx: watch::Receiver<f32>,
    session: Option<CaptureSession>,
}

impl CapturePipeline {
    pub fn new(events_tx: mpsc::Sender<ControllerEvent>) -> Self {
        let (energy_tx, energy_rx) = watch::channel(0.0);
        Self {
            events_tx,
            energy_tx: Arc::new(energy_tx),
            energy_rx,
            session: None,
        }
    }

    /// Live smoothed voice energy in [0, 1]; 0 while inactive.
    pub fn energy(&self) -> watch::Receiver<f32> {
        self.energy_rx.clone()
    }

    fn start(&mut self) -> Result<(), SessionError> {
        if self.session.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel();
        let (audio_tx, audio_rx) = mpsc::channel::<Vec<f32>>(1024);

        let stream_thread =
            std::thread::spawn(move || run_input_stream(ready_tx, shutdown_rx, audio_tx));

        // The thread reports back as soon as the stream is playing (or the
        // device was refused), so this wait is short.
        let input_sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = stream_thread.join();
                return Err(SessionError::CaptureUnavailable(e.to_string()));
            }
            Err(_) => {
                let _ = stream_thread.join();
                return Err(SessionError::CaptureUnavailable(
                    "input stream thread exited before reporting".to_string(),
                ));
            }
        };

        let resampler = match audio::create_resampler(
            input_sample_rate as f64,
            LIVE_API_INPUT_SAMPLE_RATE,
            INPUT_CHUNK_SIZE,
        ) {
            Ok(resampler) => resampler,
            Err(e) => {
                let _ = shutdown_tx.send(());
                let _ = stream_thread.join();
                return Err(SessionError::CaptureUnavailable(e.to_string()));
            }
        };

        let analysis = tokio::spawn(analysis_loop(
            audio_rx,
            resampler,
            self.energy_tx.clone(),
            self.events_tx.clone(),
        ));

        self.session = Some(CaptureSession {
            shutdown_tx,
            stream_thread,
            analysis,
        });
        tracing::info!("microphone capture active at {} Hz", input_sample_rate);
        Ok(())
    }

    async fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let _ = session.shutdown_tx.send(());
        let thread = session.stream_thread;
        if tokio::task::spawn_blocking(move || thread.join())
            .await
            .is_err()
        {
            tracing::error!("input stream thread join failed");
        }
        // Dropping the stream drops the audio sender, which ends the loop.
        if let Err(e) = session.analysis.await {
            tracing::debug!("analysis task ended abnormally: {}", e);
        }
        let _ = self.energy_tx.send(0.0);
        tracing::info!("microphone capture released");
    }
}

#[async_trait]
impl Capture for CapturePipeline {
    async fn activate(&mut self, active: bool) -> Result<(), SessionError> {
        if active {
            self.start()
        } else {
            self.stop().await;
            Ok(())
        }
    }

    fn is_active(&self) -> bool {
        self.session.is_some()
    }
}

/// Owns the cpal input stream for the lifetime of one activation. Reports
/// the device sample rate through `ready_tx`, then parks until shutdown.
fn run_input_stream(
    ready_tx: std_mpsc::Sender<anyhow::Result<u32>>,
    shutdown_rx: std_mpsc::Receiver<()>,
    audio_tx: mpsc::Sender<Vec<f32>>,
) {
    let build = || -> anyhow::Result<(cpal::Stream, u32)> {
        let input = device::get_or_default_input(None)?;
        tracing::info!("Using input device: {:?}", input.name()?);

        let default_config = input.default_input_config()?;
        let stream_config = StreamConfig {
            channels: default_config.channels(),
            sample_rate: default_config.sample_rate(),
            buffer_size: cpal::BufferSize::Fixed(FrameCount::from(INPUT_CHUNK_SIZE as u32)),
        };
        let channel_count = stream_config.channels as usize;
        let sample_rate = stream_config.sample_rate.0;
        tracing::debug!("Input stream config: {:?}", &stream_config);

        let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if let Err(e) = audio_tx.try_send(downmix(data, channel_count)) {
                tracing::warn!("Failed to send audio data to analysis task: {:?}", e);
            }
        };

        let stream = input.build_input_stream(
            &stream_config,
            input_data_fn,
            move |err| tracing::error!("An error occurred on input stream: {}", err),
            None,
        )?;
        stream.play()?;
        Ok((stream, sample_rate))
    };

    match build() {
        Ok((stream, sample_rate)) => {
            let _ = ready_tx.send(Ok(sample_rate));
            let _ = shutdown_rx.recv();
            drop(stream);
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        }
    }
}

async fn analysis_loop(
    mut audio_rx: mpsc::Receiver<Vec<f32>>,
    mut resampler: FastFixedIn<f32>,
    energy_tx: Arc<watch::Sender<f32>>,
    events_tx: mpsc::Sender<ControllerEvent>,
) {
    let mut meter = immergo_native_utils::level::EnergyMeter::new();
    let mut window: VecDeque<f32> = VecDeque::with_capacity(ANALYSIS_WINDOW_SIZE);
    let mut pending: VecDeque<f32> = VecDeque::with_capacity(INPUT_CHUNK_SIZE * 2);

    while let Some(chunk) = audio_rx.recv().await {
        push_window(&mut window, &chunk, ANALYSIS_WINDOW_SIZE);
        let level = meter.update(window.make_contiguous());
        let _ = energy_tx.send(level);

        pending.extend(chunk);
        let mut resampled: Vec<f32> = vec![];
        while pending.len() >= INPUT_CHUNK_SIZE {
            let audio_chunk: Vec<f32> = pending.drain(..INPUT_CHUNK_SIZE).collect();
            if let Ok(frames) = resampler.process(&[audio_chunk.as_slice()], None) {
                if let Some(frames) = frames.first() {
                    resampled.extend(frames.iter().cloned());
                }
            }
        }
        if !resampled.is_empty()
            && events_tx
                .try_send(ControllerEvent::MicAudio(resampled))
                .is_err()
        {
            tracing::warn!("controller event channel full; dropping a mic chunk");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_stereo_frames() {
        let interleaved = [0.2, 0.4, -0.6, -0.2];
        assert_eq!(downmix(&interleaved, 2), vec![0.3, -0.4]);
    }

    #[test]
    fn downmix_passes_mono_through() {
        let mono = [0.1, 0.2, 0.3];
        assert_eq!(downmix(&mono, 1), mono.to_vec());
    }

    #[test]
    fn window_keeps_only_the_newest_samples() {
        let mut window = VecDeque::new();
        push_window(&mut window, &[1.0, 2.0, 3.0], 4);
        push_window(&mut window, &[4.0, 5.0], 4);
        assert_eq!(window.make_contiguous(), &[2.0, 3.0, 4.0, 5.0]);
    }
}
