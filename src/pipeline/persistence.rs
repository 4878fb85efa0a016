// Saving and loading compositions as `.beat` files (pretty JSON).
//
// Only the kit index of each cell is authoritative on disk. Samples are looked
// up again from the kit set on load; the `sound` field is an informational
// "kit<N>/<track>" tag and is ignored when reading.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::timeline::{Composition, Settings, TimelineCell, Track, TrackAudio, TrackState};
use crate::loader::KitSet;
use crate::shared::{KitIndex, TrackName, MAX_BPM, MIN_BPM};

pub const EXTENSION: &str = "beat";
pub const DEFAULT_FILE_NAME: &str = "MyBeat.beat";

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("not a valid beat file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid beat file: {0}")]
    Invalid(String),

    #[error("could not access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Serialize, Deserialize)]
struct CompositionFile {
    settings: SettingsFile,
    tracks: Vec<TrackFile>,
}

#[derive(Serialize, Deserialize)]
struct SettingsFile {
    #[serde(alias = "BPM")]
    bpm: f64,
    #[serde(rename = "masterVolume")]
    master_volume: f32,
}

#[derive(Serialize, Deserialize)]
struct TrackFile {
    name: String,
    pads: Vec<PadFile>,
    state: StateFile,
    audio: AudioFile,
}

#[derive(Serialize, Deserialize)]
struct PadFile {
    #[serde(rename = "kitIndex", alias = "kit")]
    kit_index: Option<u64>,
    #[serde(default)]
    sound: serde_json::Value,
    playing: bool,
}

#[derive(Serialize, Deserialize)]
struct StateFile {
    solo: bool,
    muted: bool,
    ignored: bool,
}

#[derive(Serialize, Deserialize)]
struct AudioFile {
    volume: f32,
    panning: f32,
}

pub fn serialize(composition: &Composition) -> String {
    let file = CompositionFile {
        settings: SettingsFile {
            bpm: composition.settings.bpm,
            master_volume: composition.settings.master_volume,
        },
        tracks: composition.tracks.iter().map(track_to_file).collect(),
    };
    // plain structs of numbers, bools and strings; this cannot fail
    serde_json::to_string_pretty(&file).unwrap_or_default()
}

fn track_to_file(track: &Track) -> TrackFile {
    let pads = track
        .cells
        .iter()
        .map(|cell| PadFile {
            kit_index: cell.kit().map(|k| k.get() as u64),
            sound: match cell.kit() {
                Some(k) => serde_json::Value::String(format!("kit{k}/{}", track.name)),
                None => serde_json::Value::Null,
            },
            playing: cell.playing,
        })
        .collect();
    TrackFile {
        name: track.name.to_string(),
        pads,
        state: StateFile {
            solo: track.state.solo,
            muted: track.state.muted,
            ignored: track.state.ignored,
        },
        audio: AudioFile {
            volume: track.audio.volume,
            panning: track.audio.panning,
        },
    }
}

/// A saved cell whose kit had no pad for its track at load time. It loads
/// empty; the session fills it in if that pad turns up later.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedCell {
    pub track: TrackName,
    pub step: usize,
    pub kit: KitIndex,
}

/// Parse and validate a beat file. Nothing is returned unless the whole file
/// is usable, so a failed import never touches the caller's state.
pub fn deserialize(text: &str, kits: &KitSet) -> Result<Composition, FormatError> {
    deserialize_with_unresolved(text, kits).map(|(composition, _)| composition)
}

// Same as `deserialize`, also listing the cells that could not be resolved.
pub fn deserialize_with_unresolved(text: &str, kits: &KitSet) -> Result<(Composition, Vec<UnresolvedCell>), FormatError> {
    let file: CompositionFile = serde_json::from_str(text)?;

    let bpm = file.settings.bpm;
    if !Settings::bpm_in_range(bpm) {
        return Err(FormatError::Invalid(format!("bpm must be within {MIN_BPM}..={MAX_BPM}, got {bpm}")));
    }
    if !file.settings.master_volume.is_finite() {
        return Err(FormatError::Invalid("masterVolume is not a number".into()));
    }

    let mut seen = HashSet::new();
    let mut unresolved = Vec::new();
    let mut tracks = Vec::with_capacity(file.tracks.len());
    for t in file.tracks {
        let name = TrackName::new(t.name).map_err(|e| FormatError::Invalid(e.to_string()))?;
        if !seen.insert(name.clone()) {
            return Err(FormatError::Invalid(format!("track \"{name}\" appears twice")));
        }
        let cells = t
            .pads
            .iter()
            .enumerate()
            .map(|(i, pad)| pad_to_cell(pad, &name, i, kits, &mut unresolved))
            .collect::<Result<Vec<_>, _>>()?;
        tracks.push(Track {
            name,
            cells,
            state: TrackState {
                solo: t.state.solo,
                muted: t.state.muted,
                ignored: t.state.ignored,
            },
            audio: TrackAudio {
                volume: t.audio.volume,
                panning: t.audio.panning,
            }
            .clamped(),
        });
    }

    let composition = Composition {
        settings: Settings {
            bpm,
            master_volume: file.settings.master_volume.clamp(0.0, 1.0),
        },
        tracks,
    };
    Ok((composition, unresolved))
}

fn pad_to_cell(
    pad: &PadFile,
    track: &TrackName,
    step: usize,
    kits: &KitSet,
    unresolved: &mut Vec<UnresolvedCell>,
) -> Result<TimelineCell, FormatError> {
    let mut cell = TimelineCell::default();
    cell.playing = pad.playing;
    let kit = match pad.kit_index {
        None | Some(0) => return Ok(cell),
        Some(raw) => KitIndex::try_from(raw)
            .map_err(|e| FormatError::Invalid(format!("track \"{track}\" step {step}: {e}")))?,
    };
    match kits.sample_for(kit, track) {
        Some(sample) => cell.assign(kit, sample),
        None => {
            tracing::warn!(%track, step, %kit, "no sample for cell, leaving it empty");
            unresolved.push(UnresolvedCell { track: track.clone(), step, kit });
        }
    }
    Ok(cell)
}

// `name` with the .beat extension, unless it already has one
pub fn with_extension(path: &Path) -> PathBuf {
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(EXTENSION)
    }
}

// Save the composition to disk, making parent directories if they don't exist already
pub fn save(path: &Path, composition: &Composition) -> Result<PathBuf, FormatError> {
    let path = with_extension(path);
    let io = |source| FormatError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io)?;
    }
    std::fs::write(&path, serialize(composition)).map_err(io)?;
    tracing::info!(path = %path.display(), tracks = composition.tracks.len(), "composition saved");
    Ok(path)
}

pub fn load(path: &Path, kits: &KitSet) -> Result<Composition, FormatError> {
    load_with_unresolved(path, kits).map(|(composition, _)| composition)
}

pub fn load_with_unresolved(path: &Path, kits: &KitSet) -> Result<(Composition, Vec<UnresolvedCell>), FormatError> {
    let text = std::fs::read_to_string(path).map_err(|source| FormatError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let (composition, unresolved) = deserialize_with_unresolved(&text, kits)?;
    tracing::info!(
        path = %path.display(),
        tracks = composition.tracks.len(),
        unresolved = unresolved.len(),
        "composition loaded"
    );
    Ok((composition, unresolved))
}
