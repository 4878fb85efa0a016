// Types shared between the sequencer core, the session layer and the terminal
// front end.
//
// Keys (see tui/input.rs):
//   Space         //  TogglePlayback
//   arrows        //  MoveCursor
//   Enter         //  ToggleCell at the cursor with the selected kit
//   1 2 3 4       //  SelectKit(1..=4), 4 is the custom kit
//   c / s         //  ClearAll / Shuffle
//   m / o         //  ToggleMute / ToggleSolo on the cursor's track
//   [ / ]         //  AdjustVolume on the cursor's track
//   ; / '         //  AdjustPanning on the cursor's track
//   - / =         //  AdjustBpm
//   , / .         //  Steps down / up through STEP_OPTIONS
//   w / r         //  Save / Reload the composition file
//   Esc           //  Quit (saves first)

use std::fmt;

pub const DEFAULT_STEPS: usize = 16;
pub const MAX_STEPS: usize = 64;
pub const STEP_OPTIONS: [usize; 8] = [4, 8, 12, 16, 20, 24, 28, 32];

pub const DEFAULT_BPM: f64 = 240.0;
pub const MIN_BPM: f64 = 1.0;
pub const MAX_BPM: f64 = 1000.0;
pub const DEFAULT_MASTER_VOLUME: f32 = 0.5;
pub const DEFAULT_TRACK_VOLUME: f32 = 0.5;
pub const DEFAULT_TRACK_PANNING: f32 = 0.0;

pub const SHUFFLE_DENSITY: f64 = 0.25;

pub const NUM_BUILTIN_KITS: u8 = 3;
pub const CUSTOM_KIT: KitIndex = KitIndex(NUM_BUILTIN_KITS + 1);

// -- identifiers --

/// Name of a track, and the category of every pad that can sound on it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackName(String);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("track name must not be empty")]
pub struct EmptyTrackName;

impl TrackName {
    pub fn new(name: impl Into<String>) -> Result<Self, EmptyTrackName> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(EmptyTrackName);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 1-based kit number. Kits 1..=3 are built in, kit 4 holds custom instruments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KitIndex(u8);

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("kit index {0} is outside 1..={max}", max = NUM_BUILTIN_KITS + 1)]
pub struct KitIndexOutOfRange(pub u64);

impl KitIndex {
    pub fn new(index: u8) -> Result<Self, KitIndexOutOfRange> {
        if (1..=NUM_BUILTIN_KITS + 1).contains(&index) {
            Ok(Self(index))
        } else {
            Err(KitIndexOutOfRange(index as u64))
        }
    }

    pub fn builtin() -> impl Iterator<Item = KitIndex> {
        (1..=NUM_BUILTIN_KITS).map(KitIndex)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_builtin(self) -> bool {
        self.0 <= NUM_BUILTIN_KITS
    }

    // position inside KitSet's kit array
    pub(crate) fn slot(self) -> usize {
        (self.0 - 1) as usize
    }
}

// The first built-in kit.
impl Default for KitIndex {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u64> for KitIndex {
    type Error = KitIndexOutOfRange;
    fn try_from(value: u64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| KitIndexOutOfRange(value))
            .and_then(KitIndex::new)
    }
}

impl fmt::Display for KitIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -- input --

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    TogglePlayback,
    MoveCursor(Direction),
    ToggleCell,
    SelectKit(u8),
    ClearAll,
    Shuffle,
    ToggleMute,
    ToggleSolo,
    AdjustVolume(f32),
    AdjustPanning(f32),
    AdjustBpm(f64),
    StepsDown,
    StepsUp,
    Save,
    Reload,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_names_are_trimmed_and_non_empty() {
        assert_eq!(TrackName::new("  Kick ").unwrap().as_str(), "Kick");
        assert_eq!(TrackName::new("   "), Err(EmptyTrackName));
    }

    #[test]
    fn kit_index_range() {
        assert!(KitIndex::new(0).is_err());
        assert!(KitIndex::new(5).is_err());
        assert!(KitIndex::new(3).unwrap().is_builtin());
        assert!(!CUSTOM_KIT.is_builtin());
        assert_eq!(KitIndex::try_from(300u64), Err(KitIndexOutOfRange(300)));
        assert_eq!(KitIndex::builtin().count(), 3);
    }
}
