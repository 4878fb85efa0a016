use std::path::PathBuf;

use clap::Parser;

use crate::pipeline::persistence::DEFAULT_FILE_NAME;
use crate::pipeline::{SequencerError, TimelineStore};

/// Step-sequencer drum machine for the terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "beatgrid")]
#[command(about = "A step-sequencer drum machine for the terminal")]
#[command(version)]
pub struct Config {
    /// Directory holding kit1/..kit3/ sample folders and optional kitN.json manifests
    #[arg(long, default_value = "kits")]
    pub kits: PathBuf,

    /// Composition file, loaded at start-up and saved on quit
    #[arg(short, long, default_value = DEFAULT_FILE_NAME)]
    pub file: PathBuf,

    /// Tempo override; the file's tempo is used otherwise
    #[arg(long)]
    pub bpm: Option<f64>,

    /// Grid length override
    #[arg(long)]
    pub steps: Option<usize>,

    /// Master volume override, 0.0 to 1.0
    #[arg(long)]
    pub master_volume: Option<f32>,

    /// WAV files to add as custom instruments, named after the file stem
    #[arg(short, long)]
    pub instrument: Vec<PathBuf>,

    /// Where log output goes while the terminal UI owns stdout
    #[arg(long, default_value = "beatgrid.log")]
    pub log_file: PathBuf,
}

impl Config {
    // Explicit flags win over whatever the loaded file says.
    pub fn apply_overrides(&self, store: &mut TimelineStore) -> Result<(), SequencerError> {
        if let Some(bpm) = self.bpm {
            store.set_bpm(bpm)?;
        }
        if let Some(steps) = self.steps {
            store.set_step_count(steps)?;
        }
        if let Some(volume) = self.master_volume {
            store.set_master_volume(volume);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["beatgrid"]).unwrap();
        assert_eq!(config.kits, PathBuf::from("kits"));
        assert_eq!(config.file, PathBuf::from("MyBeat.beat"));
        assert!(config.bpm.is_none() && config.steps.is_none());
        assert!(config.instrument.is_empty());
    }

    #[test]
    fn overrides_apply_to_the_store() {
        let config = Config::try_parse_from([
            "beatgrid", "--bpm", "128", "--steps", "32", "--master-volume", "0.8",
            "-i", "vox.wav", "-i", "clave.wav",
        ])
        .unwrap();
        assert_eq!(config.instrument.len(), 2);

        let mut store = TimelineStore::default();
        config.apply_overrides(&mut store).unwrap();
        assert_eq!(store.settings().bpm, 128.0);
        assert_eq!(store.settings().master_volume, 0.8);
        assert_eq!(store.step_count(), 32);
    }

    #[test]
    fn tempo_override_is_range_checked() {
        let config = Config::try_parse_from(["beatgrid", "--bpm", "1e-18"]).unwrap();
        let mut store = TimelineStore::default();
        assert_eq!(config.apply_overrides(&mut store), Err(SequencerError::InvalidBpm(1e-18)));
    }

    #[test]
    fn bad_override_is_an_error() {
        let config = Config::try_parse_from(["beatgrid", "--steps", "0"]).unwrap();
        let mut store = TimelineStore::default();
        assert_eq!(config.apply_overrides(&mut store), Err(SequencerError::InvalidStepCount(0)));
    }
}
