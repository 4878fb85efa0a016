// The sequencer core: timeline model, its store, mixing rules, the tempo
// scheduler and the on-disk format.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::shared::{EmptyTrackName, KitIndex, TrackName};

pub mod mix;
pub mod persistence;
pub mod render;
pub mod scheduler;
pub mod store;
pub mod timeline;

pub use store::{AudioPatch, TimelineStore};
pub use timeline::{Composition, Settings, TimelineCell, Track, TrackAudio, TrackState};

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SequencerError {
    #[error("no track named \"{0}\"")]
    TrackNotFound(TrackName),

    #[error("a track named \"{0}\" already exists")]
    DuplicateTrack(TrackName),

    #[error("step {index} is outside the {steps}-step grid")]
    StepOutOfRange { index: usize, steps: usize },

    #[error("kit {kit} has no decoded pad for track \"{track}\"")]
    PadNotFound { kit: KitIndex, track: TrackName },

    #[error("step count {0} is outside 1..={max}", max = crate::shared::MAX_STEPS)]
    InvalidStepCount(usize),

    #[error("bpm must be within {min}..={max}, got {0}", min = crate::shared::MIN_BPM, max = crate::shared::MAX_BPM)]
    InvalidBpm(f64),

    #[error(transparent)]
    InvalidTrackName(#[from] EmptyTrackName),
}

/// The single timeline of a session, shared by the editor and the scheduler.
/// Every mutation holds the write lock for its whole read-modify-write.
#[derive(Clone, Debug)]
pub struct SharedTimeline(Arc<RwLock<TimelineStore>>);

impl SharedTimeline {
    pub fn new(store: TimelineStore) -> Self {
        Self(Arc::new(RwLock::new(store)))
    }

    // A panicking writer never leaves a half-applied edit behind (each
    // operation validates before it mutates), so poisoning is not fatal.
    pub fn read(&self) -> RwLockReadGuard<'_, TimelineStore> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, TimelineStore> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Composition {
        self.read().snapshot()
    }
}
