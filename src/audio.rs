//! Real-time audio output using cpal
//! Works with JACK, ALSA, OpenSL ES (Android/Termux), etc.
//!
//! The drain thread writes notes into a ring buffer; the device callback
//! only copies samples out of it. A note write blocks until the whole note
//! fits in the ring, which keeps playback strictly sequential.

use crate::error::{KeytoneError, Result};
use crate::sink::AudioSink;
use crate::synth::SampleBuffer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Give up on a write when the device has not consumed anything for this long
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Keeps the device stream alive. Drop it to stop audio.
pub struct OutputStream {
    _stream: cpal::Stream,
    device_name: String,
    sample_rate: u32,
    channels: usize,
}

impl OutputStream {
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

/// Sink feeding the default output device
pub struct CpalSink {
    producer: HeapProd<f32>,
    source_rate: u32,
    device_rate: u32,
}

impl CpalSink {
    /// Open the default output device.
    ///
    /// `source_rate` is the rate notes are rendered at; `ring_seconds` sizes
    /// the ring buffer in device time.
    pub fn open(source_rate: u32, ring_seconds: f64) -> Result<(CpalSink, OutputStream)> {
        // Get the default audio host (JACK/ALSA/OpenSL ES/etc)
        let host = cpal::default_host();
        info!("Audio host: {:?}", host.id());

        let device = host
            .default_output_device()
            .ok_or_else(|| KeytoneError::Audio("No audio output device found".to_string()))?;
        let device_name = device.name().map_err(|e| KeytoneError::Audio(e.to_string()))?;
        info!("Audio device: {}", device_name);

        let config = device
            .default_output_config()
            .map_err(|e| KeytoneError::Audio(format!("Failed to get default config: {}", e)))?;
        info!("Audio config: {:?}", config);

        let device_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        let ring_size = ((device_rate as f64 * ring_seconds) as usize).max(1024);
        let ring = HeapRb::<f32>::new(ring_size);
        let (producer, consumer) = ring.split();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config.into(), consumer, channels)
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config.into(), consumer, channels)
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config.into(), consumer, channels)
            }
            cpal::SampleFormat::U8 => {
                Self::build_stream::<u8>(&device, &config.into(), consumer, channels)
            }
            other => {
                return Err(KeytoneError::Audio(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        }?;

        stream
            .play()
            .map_err(|e| KeytoneError::Audio(format!("Failed to start stream: {}", e)))?;
        info!(
            "Audio stream started at {} Hz, {} channels (notes rendered at {} Hz)",
            device_rate, channels, source_rate
        );

        Ok((
            CpalSink {
                producer,
                source_rate,
                device_rate,
            },
            OutputStream {
                _stream: stream,
                device_name,
                sample_rate: device_rate,
                channels,
            },
        ))
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut consumer: HeapCons<f32>,
        channels: usize,
    ) -> Result<cpal::Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // Mono -> every channel; silence on underrun
                    for frame in data.chunks_mut(channels) {
                        let sample = consumer.try_pop().unwrap_or(0.0);
                        for channel in frame.iter_mut() {
                            *channel = T::from_sample(sample);
                        }
                    }
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| KeytoneError::Audio(format!("Failed to build stream: {}", e)))
    }
}

impl AudioSink for CpalSink {
    fn write(&mut self, buffer: &SampleBuffer) -> Result<()> {
        let samples = resample_linear(&buffer.to_f32(), self.source_rate, self.device_rate);

        let mut offset = 0;
        let mut last_progress = Instant::now();
        while offset < samples.len() {
            let written = self.producer.push_slice(&samples[offset..]);
            offset += written;

            if written > 0 {
                last_progress = Instant::now();
            } else if last_progress.elapsed() > STALL_TIMEOUT {
                return Err(KeytoneError::Audio(format!(
                    "Output stalled with {} samples unwritten ({} queued)",
                    samples.len() - offset,
                    self.producer.occupied_len()
                )));
            } else {
                // Ring buffer is full, sleep briefly
                thread::sleep(Duration::from_millis(1));
            }
        }
        Ok(())
    }
}

/// Linear-interpolation resampler
pub fn resample_linear(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() || from_rate == 0 || to_rate == 0 {
        return input.to_vec();
    }

    let out_len = (input.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let step = from_rate as f64 / to_rate as f64;

    (0..out_len)
        .map(|j| {
            let pos = j as f64 * step;
            let idx = pos as usize;
            let frac = (pos - idx as f64) as f32;
            let a = input[idx];
            let b = input.get(idx + 1).copied().unwrap_or(a);
            a + (b - a) * frac
        })
        .collect()
}
