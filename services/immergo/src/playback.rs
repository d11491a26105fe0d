//! Agent-speech playback queue.
//!
//! Mirrors the capture side: a dedicated thread owns the cpal output stream,
//! whose callback drains a ring buffer shared with the queue. `play` resamples
//! decoded agent audio from the Live API output rate to the device rate and
//! pushes it into the buffer; `interrupt` flips a flag the callback honors by
//! discarding everything queued before the next fill.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FrameCount, StreamConfig};
use immergo_core::ports::{Playback, SessionError};
use immergo_native_utils::audio::LIVE_API_OUTPUT_SAMPLE_RATE;
use immergo_native_utils::{audio, device};
use ringbuf::HeapProd;
use ringbuf::traits::{Consumer, Producer, Split};
use rubato::{FastFixedIn, Resampler};

use crate::config::{OUTPUT_CHUNK_SIZE, OUTPUT_LATENCY_MS};

struct PlaybackSink {
    producer: HeapProd<f32>,
    resampler: FastFixedIn<f32>,
    interrupted: Arc<AtomicBool>,
    shutdown_tx: std_mpsc::Sender<()>,
}

pub struct PlaybackQueue {
    sink: Option<PlaybackSink>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self { sink: None }
    }
}

impl Default for PlaybackQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Playback for PlaybackQueue {
    async fn init(&mut self) -> Result<(), SessionError> {
        if self.sink.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel();
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = interrupted.clone();

        std::thread::spawn(move || run_output_stream(ready_tx, shutdown_rx, flag));

        let (producer, output_sample_rate) = match ready_rx.recv() {
            Ok(Ok(ready)) => ready,
            Ok(Err(e)) => return Err(SessionError::PlaybackInit(e.to_string())),
            Err(_) => {
                return Err(SessionError::PlaybackInit(
                    "output stream thread exited before reporting".to_string(),
                ));
            }
        };

        let resampler = audio::create_resampler(
            LIVE_API_OUTPUT_SAMPLE_RATE,
            output_sample_rate as f64,
            100,
        )
        .map_err(|e| {
            let _ = shutdown_tx.send(());
            SessionError::PlaybackInit(e.to_string())
        })?;

        self.sink = Some(PlaybackSink {
            producer,
            resampler,
            interrupted,
            shutdown_tx,
        });
        tracing::info!("audio playback ready at {} Hz", output_sample_rate);
        Ok(())
    }

    fn play(&mut self, samples: Vec<f32>) {
        let Some(sink) = self.sink.as_mut() else {
            tracing::warn!("playback not initialized; dropping agent audio");
            return;
        };
        let chunk_size = sink.resampler.input_frames_next();
        for chunk in audio::split_for_chunks(&samples, chunk_size) {
            if let Ok(frames) = sink.resampler.process(&[chunk.as_slice()], None) {
                if let Some(frames) = frames.first() {
                    for frame in frames {
                        if sink.producer.try_push(*frame).is_err() {
                            tracing::warn!("playback buffer full; dropping a sample");
                        }
                    }
                }
            }
        }
    }

    fn interrupt(&mut self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.interrupted.store(true, Ordering::Release);
        }
    }
}

impl Drop for PlaybackQueue {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.take() {
            let _ = sink.shutdown_tx.send(());
        }
    }
}

/// Fills one output callback buffer from `pop`, duplicating the mono sample
/// across the first two channels and zeroing anything the queue cannot cover.
fn fill_output(data: &mut [f32], channel_count: usize, mut pop: impl FnMut() -> Option<f32>) {
    let mut sample_index = 0;
    while sample_index < data.len() {
        let sample = pop().unwrap_or(0.0);
        // Left channel (ch:0).
        if sample_index < data.len() {
            data[sample_index] = sample;
            sample_index += 1;
        }
        // Right channel (ch:1), if it exists.
        if channel_count > 1 && sample_index < data.len() {
            data[sample_index] = sample;
            sample_index += 1;
        }
        // Ignore other channels.
        sample_index += channel_count.saturating_sub(2);
    }
}

fn run_output_stream(
    ready_tx: std_mpsc::Sender<anyhow::Result<(HeapProd<f32>, u32)>>,
    shutdown_rx: std_mpsc::Receiver<()>,
    interrupted: Arc<AtomicBool>,
) {
    let build = || -> anyhow::Result<(cpal::Stream, HeapProd<f32>, u32)> {
        let output = device::get_or_default_output(None)?;
        tracing::info!("Using output device: {:?}", output.name()?);

        let default_config = output.default_output_config()?;
        let stream_config = StreamConfig {
            channels: default_config.channels(),
            sample_rate: default_config.sample_rate(),
            buffer_size: cpal::BufferSize::Fixed(FrameCount::from(OUTPUT_CHUNK_SIZE as u32)),
        };
        let channel_count = stream_config.channels as usize;
        let sample_rate = stream_config.sample_rate.0;
        tracing::debug!("Output stream config: {:?}", &stream_config);

        let buffer = audio::shared_buffer(sample_rate as usize * OUTPUT_LATENCY_MS / 1000);
        let (producer, mut consumer) = buffer.split();

        let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            if interrupted.swap(false, Ordering::AcqRel) {
                while consumer.try_pop().is_some() {}
            }
            fill_output(data, channel_count, || consumer.try_pop());
        };

        let stream = output.build_output_stream(
            &stream_config,
            output_data_fn,
            move |err| tracing::error!("An error occurred on output stream: {}", err),
            None,
        )?;
        stream.play()?;
        Ok((stream, producer, sample_rate))
    };

    match build() {
        Ok((stream, producer, sample_rate)) => {
            let _ = ready_tx.send(Ok((producer, sample_rate)));
            let _ = shutdown_rx.recv();
            drop(stream);
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_duplicates_mono_across_stereo_channels() {
        let mut queue = vec![0.5f32, -0.25].into_iter();
        let mut data = [0.0f32; 6];
        fill_output(&mut data, 2, || queue.next());
        assert_eq!(data, [0.5, 0.5, -0.25, -0.25, 0.0, 0.0]);
    }

    #[test]
    fn fill_pads_with_silence_when_the_queue_runs_dry() {
        let mut data = [1.0f32; 4];
        fill_output(&mut data, 1, || None);
        assert_eq!(data, [0.0; 4]);
    }

    #[test]
    fn fill_skips_channels_past_stereo() {
        let mut queue = vec![0.5f32].into_iter();
        let mut data = [9.0f32; 4];
        fill_output(&mut data, 4, || queue.next());
        // Mono sample lands on the first two channels; the rest are skipped.
        assert_eq!(&data[..2], &[0.5, 0.5]);
    }

    #[test]
    fn play_before_init_is_a_no_op() {
        let mut queue = PlaybackQueue::new();
        queue.play(vec![0.1, 0.2]);
        queue.interrupt();
    }
}
