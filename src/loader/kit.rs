use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use super::{decode, AssetSource, DecodeError};
use crate::audio::SampleBuffer;
use crate::shared::{EmptyTrackName, KitIndex, TrackName, CUSTOM_KIT, NUM_BUILTIN_KITS};

/// Instrument categories shared by the three built-in kits, in display order.
pub const CATEGORIES: [&str; 10] = [
    "Kick", "Snare", "Clap", "Closed Hat", "Open Hat",
    "Low Tom", "High Tom", "Rim", "Crash", "Shaker",
];

const CATEGORY_COLORS: [&str; 10] = [
    "#ff6b9d", "#ffb3d9", "#c084fc", "#60a5fa", "#38bdf8",
    "#34d399", "#a3e635", "#facc15", "#fb923c", "#f87171",
];

#[derive(Debug, thiserror::Error)]
pub enum KitError {
    #[error("could not read kit manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed kit manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("pad {id}: {reason}")]
    InvalidPad { id: u32, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn from_u24(v: u32) -> Self {
        Self {
            r: (v >> 16) as u8,
            g: (v >> 8) as u8,
            b: v as u8,
        }
    }

    pub fn random() -> Self {
        Self::from_u24(rand::random::<u32>() & 0x00ff_ffff)
    }
}

impl FromStr for Rgb {
    type Err = String;

    // "#rrggbb"; shorter hex strings are read as zero-padded on the left
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.is_empty() || hex.len() > 6 {
            return Err(format!("bad colour {s:?}"));
        }
        u32::from_str_radix(hex, 16)
            .map(Self::from_u24)
            .map_err(|_| format!("bad colour {s:?}"))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// One entry of a kit manifest, as stored in `kitN.json`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PadDescriptor {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    pub color: String,
    pub name: String,
}

#[derive(Debug)]
pub struct Pad {
    pub id: u32,
    pub category: TrackName,
    pub source_ref: String,
    pub color: Rgb,
    pub label: String,
    sample: OnceLock<Arc<SampleBuffer>>,
}

impl Pad {
    pub fn from_descriptor(d: &PadDescriptor) -> Result<Self, KitError> {
        let invalid = |reason: String| KitError::InvalidPad { id: d.id, reason };
        Ok(Self {
            id: d.id,
            category: TrackName::new(d.kind.as_str()).map_err(|e: EmptyTrackName| invalid(e.to_string()))?,
            source_ref: d.path.clone(),
            color: d.color.parse().map_err(invalid)?,
            label: d.name.clone(),
            sample: OnceLock::new(),
        })
    }

    pub fn sample(&self) -> Option<&Arc<SampleBuffer>> {
        self.sample.get()
    }

    pub fn is_decoded(&self) -> bool {
        self.sample.get().is_some()
    }

    // A pad's sample is written once; later calls are ignored and return false.
    pub fn set_sample(&self, sample: Arc<SampleBuffer>) -> bool {
        self.sample.set(sample).is_ok()
    }
}

#[derive(Debug, Default)]
pub struct Kit {
    pub pads: Vec<Pad>,
}

impl Kit {
    pub fn from_descriptors(descriptors: &[PadDescriptor]) -> Result<Self, KitError> {
        let pads = descriptors.iter().map(Pad::from_descriptor).collect::<Result<_, _>>()?;
        Ok(Self { pads })
    }

    pub fn pad_for(&self, track: &TrackName) -> Option<&Pad> {
        self.pads.iter().find(|p| &p.category == track)
    }

    // decode every pad that has no sample yet, in order
    fn decode_all(&self, assets: &dyn AssetSource, target_rate: u32) -> Result<(), DecodeError> {
        for pad in self.pads.iter().filter(|p| !p.is_decoded()) {
            let bytes = assets.fetch(&pad.source_ref)?;
            pad.set_sample(Arc::new(decode(&bytes, target_rate)?));
        }
        Ok(())
    }
}

/// The three built-in kits followed by the custom kit.
#[derive(Debug)]
pub struct KitSet {
    kits: [Kit; NUM_BUILTIN_KITS as usize + 1],
}

impl KitSet {
    pub fn new(builtin: [Kit; NUM_BUILTIN_KITS as usize]) -> Self {
        let [a, b, c] = builtin;
        Self {
            kits: [a, b, c, Kit::default()],
        }
    }

    pub fn from_manifests(manifests: &[Vec<PadDescriptor>; NUM_BUILTIN_KITS as usize]) -> Result<Self, KitError> {
        Ok(Self::new([
            Kit::from_descriptors(&manifests[0])?,
            Kit::from_descriptors(&manifests[1])?,
            Kit::from_descriptors(&manifests[2])?,
        ]))
    }

    // Compiled-in manifests, each replaced by `<dir>/kitN.json` when that file exists.
    pub fn load_manifests(dir: &Path) -> Result<Self, KitError> {
        let mut manifests = builtin_manifests();
        for (i, manifest) in manifests.iter_mut().enumerate() {
            let path = dir.join(format!("kit{}.json", i + 1));
            if !path.exists() {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|source| KitError::Io {
                path: path.display().to_string(),
                source,
            })?;
            *manifest = serde_json::from_str(&text)?;
            tracing::debug!(path = %path.display(), pads = manifest.len(), "kit manifest override");
        }
        Self::from_manifests(&manifests)
    }

    pub fn kit(&self, index: KitIndex) -> &Kit {
        &self.kits[index.slot()]
    }

    pub fn custom(&self) -> &Kit {
        self.kit(CUSTOM_KIT)
    }

    /// Decode all built-in kits, one thread per kit. Returns once every pad has
    /// a sample, or with the first failure.
    pub fn decode_builtin(&self, assets: &dyn AssetSource, target_rate: u32) -> Result<(), DecodeError> {
        std::thread::scope(|s| {
            let handles: Vec<_> = self.kits[..NUM_BUILTIN_KITS as usize]
                .iter()
                .map(|kit| s.spawn(move || kit.decode_all(assets, target_rate)))
                .collect();
            // join everything before reporting, so no decode outlives the call
            let results: Vec<_> = handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|_| Err(DecodeError::Unsupported("decoder thread panicked".into()))))
                .collect();
            results.into_iter().collect::<Result<(), _>>()
        })?;
        tracing::info!(pads = self.builtin_pad_count(), "built-in kits decoded");
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.kits[..NUM_BUILTIN_KITS as usize]
            .iter()
            .all(|k| k.pads.iter().all(Pad::is_decoded))
    }

    fn builtin_pad_count(&self) -> usize {
        self.kits[..NUM_BUILTIN_KITS as usize].iter().map(|k| k.pads.len()).sum()
    }

    pub fn sample_for(&self, kit: KitIndex, track: &TrackName) -> Option<Arc<SampleBuffer>> {
        self.kit(kit).pad_for(track).and_then(Pad::sample).cloned()
    }

    // built-in kits able to sound on `track`
    pub fn builtin_candidates(&self, track: &TrackName) -> Vec<KitIndex> {
        KitIndex::builtin()
            .filter(|&k| self.kit(k).pad_for(track).is_some_and(Pad::is_decoded))
            .collect()
    }

    /// Append an already decoded instrument to the custom kit.
    pub fn add_custom(&mut self, name: TrackName, source_ref: String, sample: Arc<SampleBuffer>) -> &Pad {
        let next_id = self.kits.iter().flat_map(|k| &k.pads).map(|p| p.id).max().unwrap_or(0) + 1;
        let pad = Pad {
            id: next_id,
            label: name.to_string(),
            category: name,
            source_ref,
            color: Rgb::random(),
            sample: OnceLock::new(),
        };
        pad.set_sample(sample);
        let custom = &mut self.kits[CUSTOM_KIT.slot()];
        custom.pads.push(pad);
        &custom.pads[custom.pads.len() - 1]
    }
}

pub fn builtin_manifests() -> [Vec<PadDescriptor>; NUM_BUILTIN_KITS as usize] {
    std::array::from_fn(|k| {
        CATEGORIES
            .iter()
            .zip(CATEGORY_COLORS)
            .enumerate()
            .map(|(i, (category, color))| PadDescriptor {
                id: (k * CATEGORIES.len() + i + 1) as u32,
                kind: category.to_string(),
                path: format!("kit{}/{}.wav", k + 1, category.to_lowercase().replace(' ', "_")),
                color: color.to_string(),
                name: format!("{category} {}", k + 1),
            })
            .collect()
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;
    use crate::audio::StereoFrame;

    // Assets served from memory; every path decodes to a short tone unless listed as broken.
    pub(crate) struct MemoryAssets {
        pub broken: Vec<String>,
        pub fetched: Mutex<HashMap<String, usize>>,
    }

    impl MemoryAssets {
        pub fn new() -> Self {
            Self { broken: Vec::new(), fetched: Mutex::new(HashMap::new()) }
        }
    }

    impl AssetSource for MemoryAssets {
        fn fetch(&self, path: &str) -> Result<Vec<u8>, DecodeError> {
            *self.fetched.lock().unwrap().entry(path.to_string()).or_default() += 1;
            if self.broken.iter().any(|b| b == path) {
                return Ok(b"RIFF garbage".to_vec());
            }
            Ok(crate::audio::wav_bytes(&[1000; 8], 44100))
        }
    }

    /// Built-in kits with every pad already holding a one-frame sample.
    pub(crate) fn decoded_kits() -> KitSet {
        let kits = KitSet::from_manifests(&builtin_manifests()).unwrap();
        for k in KitIndex::builtin() {
            for pad in &kits.kit(k).pads {
                pad.set_sample(Arc::new(SampleBuffer::from_frames(vec![StereoFrame::mono(k.get() as f32)])));
            }
        }
        kits
    }

    #[test]
    fn builtin_manifest_ids_and_paths() {
        let m = builtin_manifests();
        assert_eq!(m[0][0].id, 1);
        assert_eq!(m[2][9].id, 30);
        assert_eq!(m[1][3].path, "kit2/closed_hat.wav");
        assert_eq!(m[0][3].kind, "Closed Hat");
    }

    #[test]
    fn colours_parse_and_print() {
        let c: Rgb = "#ff6b9d".parse().unwrap();
        assert_eq!(c, Rgb { r: 0xff, g: 0x6b, b: 0x9d });
        assert_eq!(c.to_string(), "#ff6b9d");
        // short random colours are zero padded
        assert_eq!("#abc".parse::<Rgb>().unwrap(), Rgb { r: 0, g: 0x0a, b: 0xbc });
        assert!("#nothex".parse::<Rgb>().is_err());
    }

    #[test]
    fn pad_sample_is_set_once() {
        let kits = KitSet::from_manifests(&builtin_manifests()).unwrap();
        let pad = &kits.kit(KitIndex::new(1).unwrap()).pads[0];
        assert!(pad.set_sample(Arc::new(SampleBuffer::default())));
        assert!(!pad.set_sample(Arc::new(SampleBuffer::default())));
    }

    #[test]
    fn decodes_every_builtin_pad_once() {
        let kits = KitSet::from_manifests(&builtin_manifests()).unwrap();
        let assets = MemoryAssets::new();
        kits.decode_builtin(&assets, 44100).unwrap();
        assert!(kits.is_loaded());
        let fetched = assets.fetched.lock().unwrap();
        assert_eq!(fetched.len(), 30);
        assert!(fetched.values().all(|&n| n == 1));
    }

    #[test]
    fn a_broken_pad_fails_the_load() {
        let kits = KitSet::from_manifests(&builtin_manifests()).unwrap();
        let mut assets = MemoryAssets::new();
        assets.broken.push("kit3/rim.wav".into());
        assert!(kits.decode_builtin(&assets, 44100).is_err());
        assert!(!kits.is_loaded());
    }

    #[test]
    fn manifest_override_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let pads = vec![PadDescriptor {
            id: 7,
            kind: "Cowbell".into(),
            path: "cow.wav".into(),
            color: "#00ff00".into(),
            name: "Cow".into(),
        }];
        std::fs::write(dir.path().join("kit2.json"), serde_json::to_string(&pads).unwrap()).unwrap();
        let kits = KitSet::load_manifests(dir.path()).unwrap();
        let kit2 = kits.kit(KitIndex::new(2).unwrap());
        assert_eq!(kit2.pads.len(), 1);
        assert!(kit2.pad_for(&TrackName::new("Cowbell").unwrap()).is_some());
        assert_eq!(kits.kit(KitIndex::new(1).unwrap()).pads.len(), 10);
    }

    #[test]
    fn custom_pads_continue_after_builtin_ids() {
        let mut kits = decoded_kits();
        let name = TrackName::new("Vox").unwrap();
        let pad = kits.add_custom(name.clone(), "vox.wav".into(), Arc::new(SampleBuffer::default()));
        assert_eq!(pad.id, 31);
        assert!(kits.sample_for(CUSTOM_KIT, &name).is_some());
        assert!(kits.builtin_candidates(&name).is_empty());
        assert_eq!(kits.builtin_candidates(&TrackName::new("Kick").unwrap()).len(), 3);
    }
}
