use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use super::mix::audible_tracks;
use super::render::Renderer;
use super::store::TimelineStore;
use super::SharedTimeline;
use crate::audio::SampleBuffer;
use crate::shared::TrackName;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

// Handle on a live tick loop.
struct Running {
    alive: Arc<AtomicBool>,
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

/// Walks the grid one column per beat on its own thread, reading tempo and
/// step count from the shared timeline on every tick.
pub struct PlaybackScheduler {
    timeline: SharedTimeline,
    renderer: Arc<dyn Renderer>,
    running: Option<Running>,
}

impl PlaybackScheduler {
    pub fn new(timeline: SharedTimeline, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            timeline,
            renderer,
            running: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Returns false (and does nothing) when already running.
    pub fn start(&mut self) -> bool {
        if self.running.is_some() {
            return false;
        }
        let alive = Arc::new(AtomicBool::new(true));
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let timeline = self.timeline.clone();
        let renderer = Arc::clone(&self.renderer);
        let loop_alive = Arc::clone(&alive);
        let thread = std::thread::Builder::new()
            .name("beatgrid-scheduler".into())
            .spawn(move || run_loop(&timeline, renderer.as_ref(), &loop_alive, &stop_rx));
        match thread {
            Ok(thread) => {
                tracing::info!("playback started");
                self.running = Some(Running { alive, stop_tx, thread });
                true
            }
            Err(e) => {
                tracing::error!("could not spawn scheduler thread: {e}");
                false
            }
        }
    }

    /// Halts the loop and clears every playing flag. Returns false (and does
    /// nothing) when already stopped. No tick runs after this returns.
    pub fn stop(&mut self) -> bool {
        let Some(running) = self.running.take() else {
            return false;
        };
        running.alive.store(false, Ordering::Release);
        let _ = running.stop_tx.try_send(()); // wake a pending suspend
        if running.thread.join().is_err() {
            tracing::error!("scheduler thread panicked");
        }
        self.timeline.write().clear_playing();
        tracing::info!("playback stopped");
        true
    }

    // Space bar behaviour; returns whether playback is now running.
    pub fn toggle(&mut self) -> bool {
        if self.is_running() {
            self.stop();
        } else {
            self.start();
        }
        self.is_running()
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(timeline: &SharedTimeline, renderer: &dyn Renderer, alive: &AtomicBool, stop_rx: &Receiver<()>) {
    let mut column = 0;
    while alive.load(Ordering::Acquire) {
        let (hits, beat) = {
            let mut store = timeline.write();
            // wrap against the live step count, so a grown grid is walked to its new end
            if column >= store.step_count() {
                column = 0;
            }
            let hits = play_column(&mut store, column);
            (hits, store.settings().beat_ms())
        };
        render_hits(renderer, &hits, column);
        column += 1;

        match stop_rx.recv_timeout(Duration::from_secs_f64(beat / 1000.0)) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// A cell that should sound on this tick.
#[derive(Clone, Debug)]
pub struct Hit {
    pub track: TrackName,
    pub sample: Arc<SampleBuffer>,
    pub panning: f32,
    pub volume: f32,
    pub master_volume: f32,
}

/// One tick's worth of state changes: `column` becomes the only playing cell
/// on every track, and the audible assigned cells are collected.
pub fn play_column(store: &mut TimelineStore, column: usize) -> Vec<Hit> {
    if column >= store.step_count() {
        return Vec::new();
    }
    let master_volume = store.settings().master_volume;
    let audible = audible_tracks(store.tracks());

    let mut hits = Vec::new();
    for (track, audible) in store.tracks_mut().iter_mut().zip(audible) {
        for (i, cell) in track.cells.iter_mut().enumerate() {
            cell.playing = i == column;
        }
        let cell = &track.cells[column];
        if !audible {
            continue;
        }
        if let Some(sample) = cell.sample() {
            hits.push(Hit {
                track: track.name.clone(),
                sample: Arc::clone(sample),
                panning: track.audio.panning,
                volume: track.audio.volume,
                master_volume,
            });
        }
    }
    hits
}

// Failures stay per track: a bad render never costs the rest of the column.
pub fn render_hits(renderer: &dyn Renderer, hits: &[Hit], column: usize) -> usize {
    hits.iter()
        .filter(|hit| {
            match renderer.render(&hit.sample, hit.panning, hit.volume, hit.master_volume) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(track = %hit.track, column, "render failed: {e}");
                    false
                }
            }
        })
        .count()
}
