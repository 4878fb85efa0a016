use crate::audio_api::{AudioCommand, TriggerParams};

use super::frame::StereoFrame;
use super::voice::Voice;

pub const MAX_VOICES: usize = 32; // hard cap so we wont malloc in audio callback

pub struct Engine {
    voices: Vec<Option<Voice>>, // fixed pool of voices
}

impl Engine {
    pub fn new() -> Self {
        Self {
            voices: vec![None; MAX_VOICES],
        }
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Trigger(t) => self.trigger_voice(t),
            AudioCommand::StopAll => self.voices.iter_mut().for_each(|v| *v = None),
        }
    }

    fn trigger_voice(&mut self, t: TriggerParams) {
        // what slot do we write to? steal the first one when the pool is full
        let slot = self.voices.iter().position(Option::is_none).unwrap_or(0);
        self.voices[slot] = Some(Voice::new(t));
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_some()).count()
    }

    // Overwrite `out` with the mix of every live voice.
    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());
        for slot in &mut self.voices {
            if let Some(voice) = slot {
                voice.render_into(out);
                if voice.is_finished() {
                    *slot = None;
                }
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::SampleBuffer;

    fn trigger(len: usize, pan: f32) -> AudioCommand {
        let sample = Arc::new(SampleBuffer::from_frames(vec![StereoFrame::mono(0.5); len]));
        AudioCommand::Trigger(TriggerParams::new(sample, pan, 1.0, 1.0))
    }

    #[test]
    fn overlapping_voices_are_summed() {
        let mut engine = Engine::new();
        engine.handle_cmd(trigger(8, 0.0));
        engine.handle_cmd(trigger(2, 0.0));
        let mut out = [StereoFrame::zero(); 4];
        engine.render_block(&mut out);
        assert_eq!(out[0], StereoFrame::mono(1.0));
        assert_eq!(out[3], StereoFrame::mono(0.5));
        assert_eq!(engine.active_voices(), 1);
    }

    #[test]
    fn finished_voices_free_their_slot() {
        let mut engine = Engine::new();
        for _ in 0..MAX_VOICES + 4 {
            engine.handle_cmd(trigger(1, 0.0));
        }
        assert_eq!(engine.active_voices(), MAX_VOICES);
        let mut out = [StereoFrame::zero(); 2];
        engine.render_block(&mut out);
        assert_eq!(engine.active_voices(), 0);
    }

    #[test]
    fn stop_all_silences() {
        let mut engine = Engine::new();
        engine.handle_cmd(trigger(16, 1.0));
        engine.handle_cmd(AudioCommand::StopAll);
        let mut out = [StereoFrame::mono(9.0); 2];
        engine.render_block(&mut out);
        assert_eq!(out[0], StereoFrame::zero());
    }
}
