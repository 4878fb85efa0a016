use beatgrid::loader::KitSet;
use beatgrid::session::DisplayState;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;

use super::grid::draw_step_grid;
use super::mode::TuiState;

const HELP: &str = "space play/stop  arrows move  enter toggle  1-4 kit  c clear  s shuffle  \
m mute  o solo  [ ] volume  ; ' pan  - = bpm  , . steps  w save  r reload  esc quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, kits: &KitSet, ts: &TuiState, blink_on: bool) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // transport + settings
            Constraint::Min(4),    // step grid
            Constraint::Length(3), // status or help
        ])
        .split(area);

    draw_header(frame, sections[0], state, blink_on);
    draw_step_grid(frame, sections[1], state, kits);
    draw_footer(frame, sections[2], state, ts);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) {
    let settings = &state.composition.settings;
    let transport = if state.playing {
        let style = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);
        Span::styled(if blink_on { "▶ PLAY" } else { "  PLAY" }, style)
    } else {
        Span::styled("■ STOP", Style::default().fg(Color::Red))
    };
    let line = Line::from(vec![
        transport,
        Span::raw(format!("   {:.0} bpm", settings.bpm)),
        Span::raw(format!("   master {:.0}%", settings.master_volume * 100.0)),
        Span::styled(format!("   kit {}", state.selected_kit), Style::default().fg(Color::Cyan)),
    ]);
    frame.render_widget(Paragraph::new(line).block(Block::bordered().title(" beatgrid ")), area);
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &DisplayState, ts: &TuiState) {
    let text = if ts.show_help {
        HELP.to_string()
    } else if let Some(msg) = ts.status() {
        msg.to_string()
    } else {
        // the track under the cursor
        match state.composition.tracks.get(state.cursor.track) {
            Some(t) => format!(
                "{}  step {}  volume {:.0}%  pan {:+.1}   ? for keys",
                t.name,
                state.cursor.step + 1,
                t.audio.volume * 100.0,
                t.audio.panning,
            ),
            None => "no tracks   ? for keys".to_string(),
        }
    };
    frame.render_widget(Paragraph::new(text).block(Block::bordered()), area);
}
