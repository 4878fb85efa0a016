use std::sync::Arc;

use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use crate::audio_api::TriggerParams;

// One-shot playback of a sample: source -> gain -> pan -> mix bus.
#[derive(Clone, Debug)]
pub struct Voice {
    sample: Arc<SampleBuffer>,
    pos: usize,
    gain: f32,
    pan: f32,
}

impl Voice {
    pub fn new(t: TriggerParams) -> Self {
        Self {
            sample: t.sample,
            pos: 0,
            gain: t.gain,
            pan: t.pan,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.pos >= self.sample.len()
    }

    // Mix the next `out.len()` frames of this voice into `out`.
    pub fn render_into(&mut self, out: &mut [StereoFrame]) {
        let data = &self.sample.data;
        for frame in out.iter_mut() {
            let Some(&s) = data.get(self.pos) else {
                break;
            };
            let s = s.scale(self.gain).pan(self.pan);
            frame.left += s.left;
            frame.right += s.right;
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plays_once_then_finishes() {
        let sample = Arc::new(SampleBuffer::from_frames(vec![StereoFrame::mono(1.0); 3]));
        let mut v = Voice::new(TriggerParams::new(sample, 0.0, 0.5, 0.5));
        let mut out = [StereoFrame::zero(); 4];
        v.render_into(&mut out);
        assert!(v.is_finished());
        assert_eq!(out[0], StereoFrame::mono(0.25));
        assert_eq!(out[3], StereoFrame::zero());
    }
}
