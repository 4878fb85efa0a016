use std::sync::Arc;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::audio_api::{AudioCommand, TriggerParams};
use crate::pipeline::render::{RenderError, Renderer};

mod engine;
mod frame;
mod sample_buffer;
mod voice;

pub use engine::{Engine, MAX_VOICES};
pub use frame::StereoFrame;
pub use sample_buffer::SampleBuffer;

#[cfg(test)]
pub(crate) use sample_buffer::tests::wav_bytes;

const COMMAND_QUEUE: usize = 1024;

// Owns the output stream; dropping it closes the device.
pub struct AudioHandle {
    sender: AudioSender,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn sender(&self) -> AudioSender {
        self.sender.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Cheap, thread-safe handle for feeding the engine. This is the renderer the
/// scheduler plays through.
#[derive(Clone, Debug)]
pub struct AudioSender {
    tx: Sender<AudioCommand>,
}

impl AudioSender {
    pub fn new(tx: Sender<AudioCommand>) -> Self {
        Self { tx }
    }

    pub fn send(&self, cmd: AudioCommand) -> Result<(), RenderError> {
        self.tx.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => RenderError::QueueFull,
            TrySendError::Disconnected(_) => RenderError::Disconnected,
        })
    }
}

impl Renderer for AudioSender {
    fn render(
        &self,
        sample: &Arc<SampleBuffer>,
        panning: f32,
        track_volume: f32,
        master_volume: f32,
    ) -> Result<(), RenderError> {
        let params = TriggerParams::new(Arc::clone(sample), panning, track_volume, master_volume);
        self.send(AudioCommand::Trigger(params))
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_QUEUE);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream = build_output_stream_f32(&device, &config.into(), rx, channels)?;
            output_stream.play().context("failed to play output stream")?;
            tracing::info!(sample_rate, channels, "audio output started");

            Ok(AudioHandle {
                sender: AudioSender::new(tx),
                sample_rate,
                _output_stream: output_stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new();
    let mut scratch: Vec<StereoFrame> = Vec::with_capacity(4096);

    let err_fn = |err| tracing::error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels.max(1);
            scratch.resize(n_frames, StereoFrame::zero()); // only grows past the first callback
            engine.render_block(&mut scratch);
            write_interleaved(&scratch, data, channels);
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

// Spread stereo frames over the device's channel layout.
fn write_interleaved(frames: &[StereoFrame], data: &mut [f32], channels: usize) {
    match channels {
        0 => {}
        1 => {
            for (out, f) in data.iter_mut().zip(frames) {
                *out = 0.5 * (f.left + f.right);
            }
        }
        n => {
            for (out, f) in data.chunks_exact_mut(n).zip(frames) {
                out[0] = f.left;
                out[1] = f.right;
                out[2..].fill(0.0);
            }
        }
    }
}
