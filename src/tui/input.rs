use std::time::Duration;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use beatgrid::shared::{Direction, InputEvent};
use super::mode::TuiState;

const VOLUME_STEP: f32 = 0.05;
const PAN_STEP: f32 = 0.1;
const BPM_STEP: f64 = 5.0;

// poll for input from the terminal and resolve keys into events for the session.
// '?' is answered here, it only changes what the tui shows
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        if key.code == KeyCode::Char('?') {
            ts.show_help = !ts.show_help;
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code).into_iter().collect());
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode) -> Option<InputEvent> {
    let event = match code {
        KeyCode::Esc => InputEvent::Quit,
        KeyCode::Char(' ') => InputEvent::TogglePlayback,
        KeyCode::Enter => InputEvent::ToggleCell,

        KeyCode::Up => InputEvent::MoveCursor(Direction::Up),
        KeyCode::Down => InputEvent::MoveCursor(Direction::Down),
        KeyCode::Left => InputEvent::MoveCursor(Direction::Left),
        KeyCode::Right => InputEvent::MoveCursor(Direction::Right),

        KeyCode::Char(c @ '1'..='4') => InputEvent::SelectKit(c as u8 - b'0'),

        KeyCode::Char('c') => InputEvent::ClearAll,
        KeyCode::Char('s') => InputEvent::Shuffle,
        KeyCode::Char('m') => InputEvent::ToggleMute,
        KeyCode::Char('o') => InputEvent::ToggleSolo,
        KeyCode::Char('w') => InputEvent::Save,
        KeyCode::Char('r') => InputEvent::Reload,

        // pairs of keys work like a knob, left key down and right key up
        KeyCode::Char('[') => InputEvent::AdjustVolume(-VOLUME_STEP),
        KeyCode::Char(']') => InputEvent::AdjustVolume(VOLUME_STEP),
        KeyCode::Char(';') => InputEvent::AdjustPanning(-PAN_STEP),
        KeyCode::Char('\'') => InputEvent::AdjustPanning(PAN_STEP),
        KeyCode::Char('-') => InputEvent::AdjustBpm(-BPM_STEP),
        KeyCode::Char('=') => InputEvent::AdjustBpm(BPM_STEP),
        KeyCode::Char(',') => InputEvent::StepsDown,
        KeyCode::Char('.') => InputEvent::StepsUp,

        _ => return None,
    };
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kit_keys() {
        assert_eq!(handle_key(KeyCode::Char('1')), Some(InputEvent::SelectKit(1)));
        assert_eq!(handle_key(KeyCode::Char('4')), Some(InputEvent::SelectKit(4)));
        assert_eq!(handle_key(KeyCode::Char('5')), None);
    }

    #[test]
    fn knob_pairs() {
        assert_eq!(handle_key(KeyCode::Char('[')), Some(InputEvent::AdjustVolume(-VOLUME_STEP)));
        assert_eq!(handle_key(KeyCode::Char('=')), Some(InputEvent::AdjustBpm(BPM_STEP)));
        assert_eq!(handle_key(KeyCode::Char('.')), Some(InputEvent::StepsUp));
    }
}
