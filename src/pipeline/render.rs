use std::sync::Arc;

use crate::audio::SampleBuffer;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("audio command queue is full")]
    QueueFull,

    #[error("audio engine is gone")]
    Disconnected,
}

/// Starts a one-shot `source -> gain(track_volume * master_volume) -> pan -> out`
/// chain and returns immediately. Nothing is handed back: the voice lives and
/// dies inside the audio engine.
pub trait Renderer: Send + Sync {
    fn render(
        &self,
        sample: &Arc<SampleBuffer>,
        panning: f32,
        track_volume: f32,
        master_volume: f32,
    ) -> Result<(), RenderError>;
}

impl<R: Renderer + ?Sized> Renderer for Arc<R> {
    fn render(
        &self,
        sample: &Arc<SampleBuffer>,
        panning: f32,
        track_volume: f32,
        master_volume: f32,
    ) -> Result<(), RenderError> {
        (**self).render(sample, panning, track_volume, master_volume)
    }
}
