use rand::seq::SliceRandom;
use rand::Rng;

use super::mix::any_solo;
use super::timeline::{clamp_unit, Composition, Settings, Track};
use super::SequencerError;
use crate::loader::KitSet;
use crate::shared::{KitIndex, TrackName, DEFAULT_BPM, DEFAULT_STEPS, MAX_BPM, MAX_STEPS, MIN_BPM};

/// Partial update of a track's volume and panning.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AudioPatch {
    pub volume: Option<f32>,
    pub panning: Option<f32>,
}

/// Owns the composition and the global step count. Every track always has
/// exactly `step_count` cells.
#[derive(Clone, Debug)]
pub struct TimelineStore {
    composition: Composition,
    steps: usize,
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new(Composition::template())
    }
}

impl TimelineStore {
    pub fn new(composition: Composition) -> Self {
        let mut store = Self {
            composition: Composition::default(),
            steps: DEFAULT_STEPS,
        };
        store.replace(composition);
        store
    }

    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    pub fn snapshot(&self) -> Composition {
        self.composition.clone()
    }

    pub fn settings(&self) -> Settings {
        self.composition.settings
    }

    pub fn step_count(&self) -> usize {
        self.steps
    }

    pub fn tracks(&self) -> &[Track] {
        &self.composition.tracks
    }

    // Cell contents and flags only; callers must not add, drop or resize tracks.
    pub(crate) fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.composition.tracks
    }

    /// Swap in a whole composition. The step count becomes the longest
    /// track's length (shorter tracks are padded); with no tracks it is kept.
    pub fn replace(&mut self, composition: Composition) {
        self.composition = composition;
        if let Some(longest) = self.composition.tracks.iter().map(|t| t.cells.len()).max() {
            self.steps = longest.clamp(1, MAX_STEPS);
        }
        let steps = self.steps;
        for track in &mut self.composition.tracks {
            track.resize(steps);
            track.audio = track.audio.clamped();
            track.cells.iter_mut().for_each(|c| c.playing = false);
        }
        let settings = &mut self.composition.settings;
        settings.master_volume = clamp_unit(settings.master_volume);
        if !Settings::bpm_in_range(settings.bpm) {
            settings.bpm = if settings.bpm.is_nan() { DEFAULT_BPM } else { settings.bpm.clamp(MIN_BPM, MAX_BPM) };
        }
        self.refresh_ignored();
    }

    pub fn set_step_count(&mut self, steps: usize) -> Result<(), SequencerError> {
        if !(1..=MAX_STEPS).contains(&steps) {
            return Err(SequencerError::InvalidStepCount(steps));
        }
        for track in &mut self.composition.tracks {
            track.resize(steps);
        }
        self.steps = steps;
        Ok(())
    }

    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), SequencerError> {
        if !Settings::bpm_in_range(bpm) {
            return Err(SequencerError::InvalidBpm(bpm));
        }
        self.composition.settings.bpm = bpm;
        Ok(())
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.composition.settings.master_volume = clamp_unit(volume);
    }

    /// Assign-or-clear by source match: an empty cell, or one holding another
    /// kit, gets `selected`; a cell already holding `selected` is cleared.
    /// Returns the cell's kit afterwards.
    pub fn toggle_cell(
        &mut self,
        track: &TrackName,
        index: usize,
        selected: KitIndex,
        kits: &KitSet,
    ) -> Result<Option<KitIndex>, SequencerError> {
        if index >= self.steps {
            return Err(SequencerError::StepOutOfRange { index, steps: self.steps });
        }
        let t = self.track_mut(track)?;
        let cell = &t.cells[index];
        if cell.kit() == Some(selected) {
            t.cells[index].clear();
            return Ok(None);
        }
        let sample = kits.sample_for(selected, &t.name).ok_or_else(|| SequencerError::PadNotFound {
            kit: selected,
            track: t.name.clone(),
        })?;
        t.cells[index].assign(selected, sample);
        Ok(Some(selected))
    }

    // Empties every cell; flags and audio settings stay as they are.
    pub fn clear_all(&mut self) {
        for cell in self.composition.tracks.iter_mut().flat_map(|t| &mut t.cells) {
            cell.clear();
        }
    }

    /// Clear the grid, then fill each cell with probability `density` from a
    /// random built-in kit that has a pad for the cell's track.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, density: f64, rng: &mut R, kits: &KitSet) {
        self.clear_all();
        let density = if density.is_nan() { 0.0 } else { density.clamp(0.0, 1.0) };
        for track in &mut self.composition.tracks {
            let candidates = kits.builtin_candidates(&track.name);
            if candidates.is_empty() {
                continue;
            }
            for cell in &mut track.cells {
                if !rng.gen_bool(density) {
                    continue;
                }
                let Some(&kit) = candidates.choose(rng) else { continue };
                if let Some(sample) = kits.sample_for(kit, &track.name) {
                    cell.assign(kit, sample);
                }
            }
        }
    }

    pub fn set_track_audio(&mut self, track: &TrackName, patch: AudioPatch) -> Result<(), SequencerError> {
        let t = self.track_mut(track)?;
        if let Some(volume) = patch.volume {
            t.audio.volume = volume;
        }
        if let Some(panning) = patch.panning {
            t.audio.panning = panning;
        }
        t.audio = t.audio.clamped();
        Ok(())
    }

    /// Solo is exclusive: soloing a track un-solos every other one. Afterwards
    /// every non-soloed track is flagged ignored while a solo is active, and
    /// nothing is ignored once no track is soloed. Returns the new solo flag.
    pub fn toggle_solo(&mut self, track: &TrackName) -> Result<bool, SequencerError> {
        let idx = self.position(track)?;
        let tracks = &mut self.composition.tracks;
        for (i, t) in tracks.iter_mut().enumerate() {
            if i != idx {
                t.state.solo = false;
            }
        }
        tracks[idx].state.solo = !tracks[idx].state.solo;
        let solo = tracks[idx].state.solo;
        self.refresh_ignored();
        Ok(solo)
    }

    pub fn toggle_mute(&mut self, track: &TrackName) -> Result<bool, SequencerError> {
        let t = self.track_mut(track)?;
        t.state.muted = !t.state.muted;
        Ok(t.state.muted)
    }

    // New tracks start empty, at default volume and centred.
    pub fn add_track(&mut self, name: TrackName) -> Result<(), SequencerError> {
        if self.composition.track(&name).is_some() {
            return Err(SequencerError::DuplicateTrack(name));
        }
        let mut track = Track::new(name, self.steps);
        track.state.ignored = any_solo(&self.composition.tracks);
        self.composition.tracks.push(track);
        Ok(())
    }

    pub fn clear_playing(&mut self) {
        for cell in self.composition.tracks.iter_mut().flat_map(|t| &mut t.cells) {
            cell.playing = false;
        }
    }

    fn refresh_ignored(&mut self) {
        let soloing = any_solo(&self.composition.tracks);
        for t in &mut self.composition.tracks {
            t.state.ignored = soloing && !t.state.solo;
        }
    }

    fn position(&self, name: &TrackName) -> Result<usize, SequencerError> {
        self.composition
            .tracks
            .iter()
            .position(|t| &t.name == name)
            .ok_or_else(|| SequencerError::TrackNotFound(name.clone()))
    }

    fn track_mut(&mut self, name: &TrackName) -> Result<&mut Track, SequencerError> {
        let idx = self.position(name)?;
        Ok(&mut self.composition.tracks[idx])
    }
}
