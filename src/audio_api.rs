use std::sync::Arc;

pub use crate::audio::{SampleBuffer, StereoFrame};

#[derive(Clone, Debug)]
pub struct TriggerParams {
    pub sample: Arc<SampleBuffer>,
    pub gain: f32, // track volume * master volume
    pub pan: f32,  // -1.0 (left) to 1.0 (right)
}

impl TriggerParams {
    // Track and master volume meet here and nowhere else.
    pub fn new(sample: Arc<SampleBuffer>, panning: f32, track_volume: f32, master_volume: f32) -> Self {
        Self {
            sample,
            gain: track_volume * master_volume,
            pan: panning.clamp(-1.0, 1.0),
        }
    }
}

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // Start a one-shot voice. The engine never loads files; buffers arrive
    // already decoded and shared with the kit they came from.
    Trigger(TriggerParams),

    // Silence every voice, e.g. when the session shuts down
    StopAll,
}
