//! cpal-backed implementations of the hub's audio boundary.
//!
//! The audio host delivers samples on its own callback thread; ring
//! buffers bridge them to the single-threaded scheduler, which polls whole
//! 960-sample blocks without ever blocking. Capture keeps draining even
//! when the scheduler is slow; overflow drops the newest samples and
//! playback underrun plays silence, both logged by the callbacks' owners.

use std::io;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, StreamConfig};
use linkhub_audio::WIDE_BLOCK;
use linkhub_hub::device::{AudioInput, AudioOutput};
use ringbuf::{traits::*, HeapRb};
use tracing::{info, warn};

/// Hardware sample rate; everything at this boundary runs wide-band.
const SAMPLE_RATE: u32 = 48_000;

/// Ring capacity: ten 20ms blocks each way.
const RING_CAPACITY: usize = WIDE_BLOCK * 10;

/// Capture side: the callback fills a ring, the scheduler polls blocks.
pub struct CpalInput {
    _stream: cpal::Stream,
    buffer: Arc<Mutex<HeapRb<i16>>>,
}

impl AudioInput for CpalInput {
    fn read_block(&mut self) -> Option<Vec<i16>> {
        let mut buffer = self.buffer.lock().unwrap();
        if buffer.occupied_len() < WIDE_BLOCK {
            return None;
        }
        let mut block = Vec::with_capacity(WIDE_BLOCK);
        for _ in 0..WIDE_BLOCK {
            block.push(buffer.try_pop().unwrap_or(0));
        }
        Some(block)
    }
}

/// Playback side: the scheduler pushes blocks, the callback drains the
/// ring and substitutes silence on underrun.
pub struct CpalOutput {
    _stream: cpal::Stream,
    buffer: Arc<Mutex<HeapRb<i16>>>,
}

impl AudioOutput for CpalOutput {
    fn write(&mut self, pcm: &[i16]) -> io::Result<()> {
        let mut buffer = self.buffer.lock().unwrap();
        let mut dropped = 0usize;
        for &sample in pcm {
            if buffer.try_push(sample).is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            return Err(io::Error::other(format!(
                "playback buffer overflow, dropped {dropped} samples"
            )));
        }
        Ok(())
    }
}

/// Opens the named device (or the host default) for capture and playback.
pub fn open(device_name: &str) -> Result<(CpalInput, CpalOutput)> {
    let host = cpal::default_host();

    let input_device = find_device(&host, device_name, true)?;
    let output_device = find_device(&host, device_name, false)?;
    info!(
        input = input_device.name().unwrap_or_default(),
        output = output_device.name().unwrap_or_default(),
        "audio devices selected"
    );

    let input = open_input(&input_device)?;
    let output = open_output(&output_device)?;
    Ok((input, output))
}

fn find_device(host: &cpal::Host, name: &str, input: bool) -> Result<Device> {
    if name == "default" {
        let device = if input {
            host.default_input_device()
        } else {
            host.default_output_device()
        };
        return device.ok_or_else(|| {
            anyhow!("no default {} device", if input { "capture" } else { "playback" })
        });
    }

    let mut devices = if input {
        host.input_devices().context("enumerating capture devices")?
    } else {
        host.output_devices().context("enumerating playback devices")?
    };
    devices
        .find(|d| d.name().map(|n| n == name).unwrap_or(false))
        .ok_or_else(|| anyhow!("audio device not found: {name}"))
}

fn stream_config(device: &Device, input: bool) -> Result<StreamConfig> {
    let target = cpal::SampleRate(SAMPLE_RATE);
    let supported: Vec<_> = if input {
        device.supported_input_configs().context("querying capture configs")?.collect()
    } else {
        device.supported_output_configs().context("querying playback configs")?.collect()
    };

    for config in &supported {
        if config.sample_format() == SampleFormat::F32
            && config.min_sample_rate() <= target
            && config.max_sample_rate() >= target
        {
            return Ok(config.clone().with_sample_rate(target).into());
        }
    }
    Err(anyhow!("no f32 stream at {SAMPLE_RATE}Hz on this device"))
}

fn open_input(device: &Device) -> Result<CpalInput> {
    let config = stream_config(device, true)?;
    let channels = config.channels as usize;
    let buffer = Arc::new(Mutex::new(HeapRb::new(RING_CAPACITY)));
    let shared = Arc::clone(&buffer);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mut rb = shared.lock().unwrap();
                // Keep the first channel; drop the rest.
                for frame in data.chunks(channels) {
                    let sample = (frame[0].clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                    let _ = rb.try_push(sample);
                }
            },
            |err| warn!(error = %err, "capture stream error"),
            None,
        )
        .context("building capture stream")?;
    stream.play().context("starting capture stream")?;

    Ok(CpalInput { _stream: stream, buffer })
}

fn open_output(device: &Device) -> Result<CpalOutput> {
    let config = stream_config(device, false)?;
    let channels = config.channels as usize;
    let buffer = Arc::new(Mutex::new(HeapRb::new(RING_CAPACITY)));
    let shared = Arc::clone(&buffer);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut rb = shared.lock().unwrap();
                for frame in data.chunks_mut(channels) {
                    let sample = rb.try_pop().unwrap_or(0) as f32 / i16::MAX as f32;
                    for out in frame {
                        *out = sample;
                    }
                }
            },
            |err| warn!(error = %err, "playback stream error"),
            None,
        )
        .context("building playback stream")?;
    stream.play().context("starting playback stream")?;

    Ok(CpalOutput { _stream: stream, buffer })
}
