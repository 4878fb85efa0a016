use std::f32::consts::FRAC_PI_2;

// The smallest unit of audio; one stereo frame
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    pub fn zero() -> Self { // just giving `default` a better name for clarity
        Self::default()
    }

    pub fn mono(x: f32) -> Self {
        Self { left: x, right: x }
    }

    pub fn scale(self, gain: f32) -> Self {
        Self {
            left: self.left * gain,
            right: self.right * gain,
        }
    }

    /// Equal-power stereo pan, `pan` in [-1, 1]. Panning left folds the right
    /// channel into the left one (and vice versa). A centred frame is returned
    /// untouched and hard pans move everything to one side exactly.
    pub fn pan(self, pan: f32) -> Self {
        let pan = pan.clamp(-1.0, 1.0);
        let x = if pan <= 0.0 { pan + 1.0 } else { pan };
        let (gain_l, gain_r) = equal_power(x);
        if pan <= 0.0 {
            Self {
                left: self.left + self.right * gain_l,
                right: self.right * gain_r,
            }
        } else {
            Self {
                left: self.left * gain_l,
                right: self.right + self.left * gain_r,
            }
        }
    }
}

// (cos, sin) of x * pi/2 for x in [0, 1], pinned at the endpoints where f32
// trig misses 0 and 1 by an ulp or so
fn equal_power(x: f32) -> (f32, f32) {
    if x <= 0.0 {
        (1.0, 0.0)
    } else if x >= 1.0 {
        (0.0, 1.0)
    } else {
        let a = x * FRAC_PI_2;
        (a.cos(), a.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn centre_pan_is_identity() {
        let f = StereoFrame { left: 0.3, right: -0.2 };
        assert_eq!(f.pan(0.0), f);
        assert_eq!(StereoFrame::mono(0.25).pan(0.0), StereoFrame::mono(0.25));
    }

    #[test]
    fn hard_pans_move_everything_to_one_side() {
        let f = StereoFrame::mono(0.5);
        assert_eq!(f.pan(-1.0), StereoFrame { left: 1.0, right: 0.0 });
        assert_eq!(f.pan(1.0), StereoFrame { left: 0.0, right: 1.0 });
    }

    #[test]
    fn half_pan_keeps_equal_power() {
        let p = StereoFrame::mono(1.0).pan(-0.5);
        // right channel at cos(pi/4), the rest folded left
        assert!(close(p.right, std::f32::consts::FRAC_1_SQRT_2));
        assert!(close(p.left, 1.0 + std::f32::consts::FRAC_1_SQRT_2));
    }
}
