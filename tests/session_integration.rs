// End-to-end checks through the public API: kits decoded from WAV files on
// disk, a session editing and playing a beat, and the beat file surviving
// a save and reload.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use beatgrid::audio::SampleBuffer;
use beatgrid::loader::kit::builtin_manifests;
use beatgrid::loader::{DirAssets, KitSet};
use beatgrid::pipeline::persistence;
use beatgrid::pipeline::render::{RenderError, Renderer};
use beatgrid::pipeline::TimelineStore;
use beatgrid::session::{Session, SessionError};
use beatgrid::shared::{KitIndex, TrackName, CUSTOM_KIT};

const RATE: u32 = 44100;

#[derive(Default)]
struct Recorder {
    renders: Mutex<Vec<(usize, f32, f32, f32)>>,
}

impl Renderer for Recorder {
    fn render(&self, sample: &Arc<SampleBuffer>, panning: f32, track_volume: f32, master_volume: f32) -> Result<(), RenderError> {
        self.renders.lock().unwrap().push((sample.len(), panning, track_volume, master_volume));
        Ok(())
    }
}

fn write_wav(path: &Path, frames: usize) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        writer.write_sample(((i % 64) as i16 - 32) * 500).unwrap();
    }
    writer.finalize().unwrap();
}

// kit N's samples are N * 10 frames long so renders show which kit played
fn kits_on_disk(dir: &Path) -> KitSet {
    for (k, manifest) in builtin_manifests().iter().enumerate() {
        for pad in manifest {
            write_wav(&dir.join(&pad.path), (k + 1) * 10);
        }
    }
    let kits = KitSet::load_manifests(dir).unwrap();
    kits.decode_builtin(&DirAssets::new(dir), RATE).unwrap();
    kits
}

fn track(name: &str) -> TrackName {
    TrackName::new(name).unwrap()
}

#[test]
fn kits_decode_from_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let kits = kits_on_disk(dir.path());
    assert!(kits.is_loaded());
    let sample = kits.sample_for(KitIndex::new(2).unwrap(), &track("Open Hat")).unwrap();
    assert_eq!(sample.len(), 20);
    assert!(kits.custom().pads.is_empty());
}

#[test]
fn missing_kit_file_is_a_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let kits = KitSet::load_manifests(dir.path()).unwrap();
    assert!(kits.decode_builtin(&DirAssets::new(dir.path()), RATE).is_err());
    assert!(!kits.is_loaded());
}

#[test]
fn edit_play_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let kits = kits_on_disk(&dir.path().join("kits"));
    let recorder = Arc::new(Recorder::default());
    let mut session = Session::new(kits, TimelineStore::default(), recorder.clone(), RATE).unwrap();

    // a custom instrument from a WAV on disk
    let vox_path = dir.path().join("vox.wav");
    write_wav(&vox_path, 7);
    let vox = session
        .add_custom_instrument("Vox", &vox_path.display().to_string(), &std::fs::read(&vox_path).unwrap())
        .unwrap();

    session.set_step_count(4).unwrap();
    session.set_bpm(600.0).unwrap(); // 100ms per step
    let kit3 = KitIndex::new(3).unwrap();
    session.toggle_cell(&track("Kick"), 0, kit3).unwrap();
    session.toggle_cell(&vox, 2, CUSTOM_KIT).unwrap();

    session.start();
    std::thread::sleep(Duration::from_millis(250)); // columns 0, 1 and 2
    session.stop();
    {
        let renders = recorder.renders.lock().unwrap();
        let lengths: Vec<usize> = renders.iter().map(|r| r.0).collect();
        assert_eq!(lengths, vec![30, 7]);
    }
    assert!(session.snapshot().tracks.iter().flat_map(|t| &t.cells).all(|c| !c.playing));

    let saved = session.export(&dir.path().join("beats/first")).unwrap();
    assert_eq!(saved, dir.path().join("beats/first.beat"));

    session.clear_all();
    assert_eq!(session.snapshot().filled_cells(), 0);
    session.import(&saved).unwrap();

    let snap = session.snapshot();
    assert_eq!(snap.settings.bpm, 600.0);
    assert_eq!(snap.tracks.len(), 11);
    assert_eq!(snap.tracks[0].cells[0].kit(), Some(kit3));
    assert_eq!(snap.tracks[10].name, vox);
    assert_eq!(snap.tracks[10].cells[2].kit(), Some(CUSTOM_KIT));
}

#[test]
fn a_beat_file_from_another_session_loses_unknown_custom_cells() {
    let dir = tempfile::tempdir().unwrap();
    let kits = kits_on_disk(&dir.path().join("kits"));
    let mut session = Session::new(kits, TimelineStore::default(), Arc::new(Recorder::default()), RATE).unwrap();

    let text = r#"{
        "settings": {"BPM": 100, "masterVolume": 0.7},
        "tracks": [{
            "name": "Cowbell",
            "pads": [{"kitIndex": 4, "sound": "kit4/Cowbell", "playing": false}, {"kitIndex": null, "sound": null, "playing": false}],
            "state": {"solo": false, "muted": true, "ignored": false},
            "audio": {"volume": 2.0, "panning": -0.5}
        }]
    }"#;
    let path = dir.path().join("shared.beat");
    std::fs::write(&path, text).unwrap();
    session.import(&path).unwrap();

    let snap = session.snapshot();
    assert_eq!(snap.settings.bpm, 100.0);
    assert_eq!(snap.tracks.len(), 1);
    assert!(snap.tracks[0].cells.iter().all(|c| c.is_empty()));
    assert!(snap.tracks[0].state.muted);
    assert_eq!(snap.tracks[0].audio.volume, 1.0);
    assert_eq!(session.display_state().steps, 2);
}

#[test]
fn unreadable_file_leaves_the_session_alone() {
    let dir = tempfile::tempdir().unwrap();
    let kits = kits_on_disk(&dir.path().join("kits"));
    let mut session = Session::new(kits, TimelineStore::default(), Arc::new(Recorder::default()), RATE).unwrap();
    session.set_bpm(150.0).unwrap();

    let err = session.import(&dir.path().join("nope.beat")).unwrap_err();
    assert!(matches!(err, SessionError::Format(persistence::FormatError::Io { .. })));

    let path = dir.path().join("broken.beat");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(session.import(&path).is_err());

    let snap = session.snapshot();
    assert_eq!(snap.settings.bpm, 150.0);
    assert_eq!(snap.tracks.len(), 10);
}

#[test]
fn custom_instrument_cells_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let vox_path = dir.path().join("Vox.wav");
    write_wav(&vox_path, 7);
    let vox_bytes = std::fs::read(&vox_path).unwrap();
    let beat = dir.path().join("MyBeat.beat");

    {
        let kits = kits_on_disk(&dir.path().join("kits"));
        let mut session = Session::new(kits, TimelineStore::default(), Arc::new(Recorder::default()), RATE).unwrap();
        let vox = session.add_custom_instrument("Vox", &vox_path.display().to_string(), &vox_bytes).unwrap();
        session.toggle_cell(&vox, 1, CUSTOM_KIT).unwrap();
        session.export(&beat).unwrap();
    }

    // next run: file first, then the instrument again
    let kits = kits_on_disk(&dir.path().join("kits"));
    let mut session = Session::new(kits, TimelineStore::default(), Arc::new(Recorder::default()), RATE).unwrap();
    session.import(&beat).unwrap();
    let vox = track("Vox");
    let cell_kit = |s: &Session| {
        let snap = s.snapshot();
        snap.tracks.iter().find(|t| t.name == vox).map(|t| t.cells[1].kit())
    };
    assert_eq!(cell_kit(&session), Some(None));

    session.add_custom_instrument("Vox", &vox_path.display().to_string(), &vox_bytes).unwrap();
    assert_eq!(cell_kit(&session), Some(Some(CUSTOM_KIT)));
    assert_eq!(session.snapshot().tracks.len(), 11);
    assert_eq!(session.kits().custom().pads.len(), 1);
}
