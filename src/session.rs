// The layer between input and the sequencer core. It owns the kits, the shared
// timeline and the scheduler, and keeps the editing cursor for the front end.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;

use crate::loader::{self, DecodeError, KitSet};
use crate::pipeline::persistence::{self, FormatError, UnresolvedCell};
use crate::pipeline::render::Renderer;
use crate::pipeline::scheduler::PlaybackScheduler;
use crate::pipeline::{AudioPatch, Composition, SequencerError, SharedTimeline, TimelineStore};
use crate::shared::{
    Direction, InputEvent, KitIndex, TrackName, CUSTOM_KIT, MAX_BPM, MIN_BPM, SHUFFLE_DENSITY, STEP_OPTIONS,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Sequencer(#[from] SequencerError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("could not add instrument: {0}")]
    Decode(#[from] DecodeError),

    #[error("instrument \"{0}\" is already loaded")]
    DuplicateInstrument(TrackName),

    #[error("built-in kits are not decoded yet")]
    KitsNotLoaded,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    pub track: usize,
    pub step: usize,
}

// Everything the front end draws, taken in one read.
#[derive(Clone, Debug)]
pub struct DisplayState {
    pub composition: Composition,
    pub steps: usize,
    pub playing: bool,
    pub cursor: Cursor,
    pub selected_kit: KitIndex,
}

pub struct Session {
    kits: KitSet,
    timeline: SharedTimeline,
    scheduler: PlaybackScheduler,
    sample_rate: u32,
    cursor: Cursor,
    selected_kit: KitIndex,
    // cells of the last import waiting for a custom instrument
    unresolved: Vec<UnresolvedCell>,
}

impl Session {
    /// Playback needs every built-in sample, so the kits must be decoded first.
    pub fn new(
        kits: KitSet,
        store: TimelineStore,
        renderer: Arc<dyn Renderer>,
        sample_rate: u32,
    ) -> Result<Self, SessionError> {
        if !kits.is_loaded() {
            return Err(SessionError::KitsNotLoaded);
        }
        let timeline = SharedTimeline::new(store);
        Ok(Self {
            scheduler: PlaybackScheduler::new(timeline.clone(), renderer),
            kits,
            timeline,
            sample_rate,
            cursor: Cursor::default(),
            selected_kit: KitIndex::default(),
            unresolved: Vec::new(),
        })
    }

    pub fn kits(&self) -> &KitSet {
        &self.kits
    }

    pub fn timeline(&self) -> &SharedTimeline {
        &self.timeline
    }

    pub fn snapshot(&self) -> Composition {
        self.timeline.snapshot()
    }

    pub fn display_state(&self) -> DisplayState {
        let store = self.timeline.read();
        DisplayState {
            composition: store.snapshot(),
            steps: store.step_count(),
            playing: self.scheduler.is_running(),
            cursor: self.cursor,
            selected_kit: self.selected_kit,
        }
    }

    // -- transport --

    pub fn is_playing(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn start(&mut self) -> bool {
        self.scheduler.start()
    }

    pub fn stop(&mut self) -> bool {
        self.scheduler.stop()
    }

    pub fn toggle_playback(&mut self) -> bool {
        self.scheduler.toggle()
    }

    // -- edits --

    pub fn toggle_cell(&mut self, track: &TrackName, index: usize, kit: KitIndex) -> Result<Option<KitIndex>, SessionError> {
        Ok(self.timeline.write().toggle_cell(track, index, kit, &self.kits)?)
    }

    // Clearing and shuffling stop playback first.
    pub fn clear_all(&mut self) {
        self.scheduler.stop();
        self.timeline.write().clear_all();
    }

    pub fn shuffle_with<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.scheduler.stop();
        self.timeline.write().shuffle(SHUFFLE_DENSITY, rng, &self.kits);
    }

    pub fn shuffle(&mut self) {
        self.shuffle_with(&mut rand::thread_rng());
    }

    pub fn set_step_count(&mut self, steps: usize) -> Result<(), SessionError> {
        self.timeline.write().set_step_count(steps)?;
        self.cursor.step = self.cursor.step.min(steps - 1);
        Ok(())
    }

    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), SessionError> {
        Ok(self.timeline.write().set_bpm(bpm)?)
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.timeline.write().set_master_volume(volume);
    }

    pub fn set_track_audio(&mut self, track: &TrackName, patch: AudioPatch) -> Result<(), SessionError> {
        Ok(self.timeline.write().set_track_audio(track, patch)?)
    }

    pub fn toggle_solo(&mut self, track: &TrackName) -> Result<bool, SessionError> {
        Ok(self.timeline.write().toggle_solo(track)?)
    }

    pub fn toggle_mute(&mut self, track: &TrackName) -> Result<bool, SessionError> {
        Ok(self.timeline.write().toggle_mute(track)?)
    }

    /// Decode `bytes` and add the result to the custom kit. A track of the
    /// same name is reused, and cells of the last import that were saved
    /// against this instrument are filled in again; otherwise a new track is
    /// appended. Any failure leaves kits and timeline as they were.
    pub fn add_custom_instrument(&mut self, name: &str, source_ref: &str, bytes: &[u8]) -> Result<TrackName, SessionError> {
        let name = TrackName::new(name).map_err(SequencerError::from)?;
        if self.kits.custom().pad_for(&name).is_some() {
            return Err(SessionError::DuplicateInstrument(name));
        }
        let sample = Arc::new(loader::decode(bytes, self.sample_rate)?);

        let mut store = self.timeline.write();
        if store.composition().track(&name).is_none() {
            store.add_track(name.clone())?;
        }
        let pad = self.kits.add_custom(name.clone(), source_ref.to_string(), sample);
        tracing::info!(track = %name, pad = pad.id, color = %pad.color, "custom instrument added");

        let kits = &self.kits;
        let mut restored = 0;
        self.unresolved.retain(|cell| {
            if cell.track != name || cell.kit != CUSTOM_KIT {
                return true;
            }
            // only cells that are still on the grid and still empty
            let empty = store
                .composition()
                .track(&name)
                .and_then(|t| t.cells.get(cell.step))
                .is_some_and(|c| c.is_empty());
            if empty && store.toggle_cell(&name, cell.step, CUSTOM_KIT, kits).is_ok() {
                restored += 1;
            }
            false
        });
        if restored > 0 {
            tracing::info!(track = %name, restored, "saved cells restored");
        }
        Ok(name)
    }

    // -- files --

    /// Replace the timeline with the composition stored at `path`. On error
    /// the current timeline is left untouched.
    pub fn import(&mut self, path: &Path) -> Result<(), SessionError> {
        let (composition, unresolved) = persistence::load_with_unresolved(path, &self.kits)?;
        self.replace(composition, unresolved);
        Ok(())
    }

    pub fn import_str(&mut self, text: &str) -> Result<(), SessionError> {
        let (composition, unresolved) = persistence::deserialize_with_unresolved(text, &self.kits)?;
        self.replace(composition, unresolved);
        Ok(())
    }

    fn replace(&mut self, composition: Composition, unresolved: Vec<UnresolvedCell>) {
        self.scheduler.stop();
        self.unresolved = unresolved;
        let mut store = self.timeline.write();
        store.replace(composition);
        self.cursor = Cursor {
            track: self.cursor.track.min(store.tracks().len().saturating_sub(1)),
            step: self.cursor.step.min(store.step_count() - 1),
        };
    }

    pub fn export(&self, path: &Path) -> Result<PathBuf, SessionError> {
        Ok(persistence::save(path, &self.snapshot())?)
    }

    pub fn export_string(&self) -> String {
        persistence::serialize(&self.snapshot())
    }

    // -- input --

    pub fn handle_input(&mut self, event: InputEvent) -> Result<(), SessionError> {
        match event {
            InputEvent::TogglePlayback => {
                self.toggle_playback();
            }
            InputEvent::MoveCursor(dir) => self.move_cursor(dir),
            InputEvent::ToggleCell => {
                if let Some(track) = self.cursor_track() {
                    self.toggle_cell(&track, self.cursor.step, self.selected_kit)?;
                }
            }
            InputEvent::SelectKit(n) => {
                if let Ok(kit) = KitIndex::new(n) {
                    self.selected_kit = kit;
                }
            }
            InputEvent::ClearAll => self.clear_all(),
            InputEvent::Shuffle => self.shuffle(),
            InputEvent::ToggleMute => {
                if let Some(track) = self.cursor_track() {
                    self.toggle_mute(&track)?;
                }
            }
            InputEvent::ToggleSolo => {
                if let Some(track) = self.cursor_track() {
                    self.toggle_solo(&track)?;
                }
            }
            InputEvent::AdjustVolume(delta) => self.nudge_track_audio(delta, 0.0)?,
            InputEvent::AdjustPanning(delta) => self.nudge_track_audio(0.0, delta)?,
            InputEvent::AdjustBpm(delta) => {
                let bpm = self.timeline.read().settings().bpm;
                self.set_bpm((bpm + delta).clamp(MIN_BPM, MAX_BPM))?;
            }
            InputEvent::StepsDown => self.step_option(false)?,
            InputEvent::StepsUp => self.step_option(true)?,
            // file handling and quitting belong to the front end
            InputEvent::Save | InputEvent::Reload | InputEvent::Quit => {}
        }
        Ok(())
    }

    fn cursor_track(&self) -> Option<TrackName> {
        self.timeline.read().tracks().get(self.cursor.track).map(|t| t.name.clone())
    }

    fn move_cursor(&mut self, dir: Direction) {
        let store = self.timeline.read();
        let last_track = store.tracks().len().saturating_sub(1);
        let last_step = store.step_count() - 1;
        let c = &mut self.cursor;
        match dir {
            Direction::Up => c.track = c.track.saturating_sub(1),
            Direction::Down => c.track = (c.track + 1).min(last_track),
            Direction::Left => c.step = c.step.saturating_sub(1),
            Direction::Right => c.step = (c.step + 1).min(last_step),
        }
    }

    // Move to the neighbouring entry of STEP_OPTIONS, if there is one.
    fn step_option(&mut self, up: bool) -> Result<(), SessionError> {
        let steps = self.timeline.read().step_count();
        let next = if up {
            STEP_OPTIONS.iter().copied().find(|&s| s > steps)
        } else {
            STEP_OPTIONS.iter().rev().copied().find(|&s| s < steps)
        };
        match next {
            Some(next) => self.set_step_count(next),
            None => Ok(()),
        }
    }

    fn nudge_track_audio(&mut self, volume: f32, panning: f32) -> Result<(), SessionError> {
        let Some(track) = self.cursor_track() else { return Ok(()) };
        let mut store = self.timeline.write();
        let Some(audio) = store.composition().track(&track).map(|t| t.audio) else {
            return Ok(());
        };
        store.set_track_audio(&track, AudioPatch {
            volume: Some(audio.volume + volume),
            panning: Some(audio.panning + panning),
        })?;
        Ok(())
    }
}
