mod tui;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::EnvFilter;

use beatgrid::audio;
use beatgrid::audio_api::AudioCommand;
use beatgrid::config::Config;
use beatgrid::loader::{DirAssets, KitSet};
use beatgrid::pipeline::TimelineStore;
use beatgrid::session::Session;
use beatgrid::shared::InputEvent;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::parse();
    init_logging(&config.log_file)?;

    let kits = KitSet::load_manifests(&config.kits).context("reading kit manifests")?;
    let audio = audio::start_audio()?;
    let sample_rate = audio.sample_rate();
    kits.decode_builtin(&DirAssets::new(config.kits.clone()), sample_rate)
        .with_context(|| format!("decoding kits from {}", config.kits.display()))?;

    let mut tui_state = tui::mode::TuiState::default();
    let mut session = Session::new(kits, TimelineStore::default(), Arc::new(audio.sender()), sample_rate)?;
    // a missing file starts a fresh beat; an unreadable one does too, with a warning
    if config.file.exists() {
        if let Err(e) = session.import(&config.file) {
            tracing::warn!(path = %config.file.display(), "could not load composition: {e}");
            tui_state.set_status(format!("{}: {e}", config.file.display()));
        }
    }
    config.apply_overrides(&mut session.timeline().write())?;

    // instruments come after the file, so cells saved against them are restored
    for path in &config.instrument {
        if let Err(e) = add_instrument(&mut session, path) {
            tracing::warn!(path = %path.display(), "skipping instrument: {e:#}");
            tui_state.set_status(format!("{}: {e}", path.display()));
        }
    }

    terminal::enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), terminal::EnterAlternateScreen)?;
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = Duration::from_millis(16); // ~60fps
    let blink_start = Instant::now();

    loop {
        let blink_on = (blink_start.elapsed().as_millis() / 250) % 2 == 0;
        let ds = session.display_state();

        term.draw(|frame| {
            let area = frame.area();
            tui::view::render(frame, area, &ds, session.kits(), &tui_state, blink_on);
        })?;

        for event in tui::input::poll_input(tick_rate, &mut tui_state)? {
            match event {
                InputEvent::Quit => {
                    // save before quitting
                    session.stop();
                    if let Err(e) = session.export(&config.file) {
                        tracing::error!("save on quit failed: {e}");
                    }
                    let _ = audio.sender().send(AudioCommand::StopAll);
                    drop(term);
                    return Ok(());
                }
                InputEvent::Save => match session.export(&config.file) {
                    Ok(path) => tui_state.set_status(format!("saved {}", path.display())),
                    Err(e) => tui_state.set_status(e.to_string()),
                },
                InputEvent::Reload => match session.import(&config.file) {
                    Ok(()) => tui_state.set_status(format!("loaded {}", config.file.display())),
                    Err(e) => tui_state.set_status(e.to_string()),
                },
                other => {
                    if let Err(e) = session.handle_input(other) {
                        tui_state.set_status(e.to_string());
                    }
                }
            }
        }
    }
}

// Logs go to a file, the terminal belongs to the UI.
fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("beatgrid=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn add_instrument(session: &mut Session, path: &Path) -> anyhow::Result<()> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("no usable name in {}", path.display()))?;
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    session.add_custom_instrument(name, &path.display().to_string(), &bytes)?;
    Ok(())
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(std::io::stdout(), terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}
