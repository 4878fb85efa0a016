use beatgrid::loader::KitSet;
use beatgrid::pipeline::{TimelineCell, Track};
use beatgrid::session::DisplayState;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Frame;

const NAME_WIDTH: usize = 12;

// one row per track: name, mute/solo flags, then a cell per step coloured by
// the pad it plays. the column being played is lit, the cursor is reversed
pub fn draw_step_grid(frame: &mut Frame, area: Rect, state: &DisplayState, kits: &KitSet) {
    let lines: Vec<Line> = state
        .composition
        .tracks
        .iter()
        .enumerate()
        .map(|(row, track)| track_line(row, track, state, kits))
        .collect();
    let block = Block::bordered().title(format!(" {} steps ", state.steps));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn track_line(row: usize, track: &Track, state: &DisplayState, kits: &KitSet) -> Line<'static> {
    let dimmed = track.state.muted || track.state.ignored;
    let name_style = if dimmed {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::White)
    };
    let flags = format!(
        "{}{} ",
        if track.state.muted { 'M' } else { ' ' },
        if track.state.solo { 'S' } else { ' ' },
    );

    let mut spans = vec![
        Span::styled(format!("{:<NAME_WIDTH$.NAME_WIDTH$}", track.name.as_str()), name_style),
        Span::styled(flags, Style::default().fg(Color::Yellow)),
    ];
    for (step, cell) in track.cells.iter().enumerate() {
        let mut style = cell_style(cell, track, kits);
        if cell.playing {
            style = style.bg(Color::Gray);
        }
        if row == state.cursor.track && step == state.cursor.step {
            style = style.add_modifier(Modifier::REVERSED);
        }
        let glyph = if cell.is_empty() { " ·" } else { " ■" };
        spans.push(Span::styled(glyph, style));
    }
    Line::from(spans)
}

fn cell_style(cell: &TimelineCell, track: &Track, kits: &KitSet) -> Style {
    let Some(kit) = cell.kit() else {
        return Style::default().fg(Color::DarkGray);
    };
    match kits.kit(kit).pad_for(&track.name) {
        Some(pad) => Style::default().fg(Color::Rgb(pad.color.r, pad.color.g, pad.color.b)),
        None => Style::default().fg(Color::White),
    }
}
