// The composition model: settings plus an ordered list of tracks, each a row
// of cells over the global step count.

use std::sync::Arc;

use crate::audio::SampleBuffer;
use crate::loader::kit::CATEGORIES;
use crate::shared::{
    KitIndex, TrackName, DEFAULT_BPM, DEFAULT_MASTER_VOLUME, DEFAULT_STEPS, DEFAULT_TRACK_PANNING,
    DEFAULT_TRACK_VOLUME, MAX_BPM, MIN_BPM,
};

/// One step of one track. `kit` and `sample` are set and cleared together; the
/// sample is a cached copy of the kit pad's buffer so playback never looks it up.
#[derive(Clone, Debug, Default)]
pub struct TimelineCell {
    kit: Option<KitIndex>,
    sample: Option<Arc<SampleBuffer>>,
    pub playing: bool,
}

impl TimelineCell {
    pub fn kit(&self) -> Option<KitIndex> {
        self.kit
    }

    pub fn sample(&self) -> Option<&Arc<SampleBuffer>> {
        self.sample.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.kit.is_none()
    }

    pub fn assign(&mut self, kit: KitIndex, sample: Arc<SampleBuffer>) {
        self.kit = Some(kit);
        self.sample = Some(sample);
    }

    pub fn clear(&mut self) {
        self.kit = None;
        self.sample = None;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackState {
    pub solo: bool,
    pub muted: bool,
    pub ignored: bool, // another track is soloed; derived, see TimelineStore::toggle_solo
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackAudio {
    pub volume: f32,  // 0.0 to 1.0
    pub panning: f32, // -1.0 to 1.0
}

impl Default for TrackAudio {
    fn default() -> Self {
        Self {
            volume: DEFAULT_TRACK_VOLUME,
            panning: DEFAULT_TRACK_PANNING,
        }
    }
}

impl TrackAudio {
    pub fn clamped(self) -> Self {
        Self {
            volume: clamp_unit(self.volume),
            panning: if self.panning.is_nan() { 0.0 } else { self.panning.clamp(-1.0, 1.0) },
        }
    }
}

#[derive(Clone, Debug)]
pub struct Track {
    pub name: TrackName,
    pub cells: Vec<TimelineCell>,
    pub state: TrackState,
    pub audio: TrackAudio,
}

impl Track {
    pub fn new(name: TrackName, steps: usize) -> Self {
        Self {
            name,
            cells: vec![TimelineCell::default(); steps],
            state: TrackState::default(),
            audio: TrackAudio::default(),
        }
    }

    // truncate or pad with empty cells
    pub fn resize(&mut self, steps: usize) {
        self.cells.resize_with(steps, TimelineCell::default);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settings {
    pub bpm: f64,
    pub master_volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            master_volume: DEFAULT_MASTER_VOLUME,
        }
    }
}

impl Settings {
    /// One beat, which is also one step.
    pub fn beat_ms(&self) -> f64 {
        60_000.0 / self.bpm
    }

    // NaN and infinities fall outside the range too
    pub fn bpm_in_range(bpm: f64) -> bool {
        (MIN_BPM..=MAX_BPM).contains(&bpm)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Composition {
    pub settings: Settings,
    pub tracks: Vec<Track>,
}

impl Composition {
    // A blank grid with one track per built-in instrument category.
    pub fn template() -> Self {
        let tracks = CATEGORIES
            .iter()
            .filter_map(|c| TrackName::new(*c).ok())
            .map(|name| Track::new(name, DEFAULT_STEPS))
            .collect();
        Self {
            settings: Settings::default(),
            tracks,
        }
    }

    pub fn track(&self, name: &TrackName) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.name == name)
    }

    pub fn track_mut(&mut self, name: &TrackName) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| &t.name == name)
    }

    pub fn filled_cells(&self) -> usize {
        self.tracks.iter().flat_map(|t| &t.cells).filter(|c| !c.is_empty()).count()
    }
}

pub(crate) fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
