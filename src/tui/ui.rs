//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
};

use super::app::DebuggerApp;
use crate::asm::disassemble_word;

/// Fixed rows around the store view: status bar, help bar, borders.
const CHROME_ROWS: u16 = 8;

/// Number of store view rows that fit in `area`.
pub fn store_rows(area: Rect) -> usize {
    area.height.saturating_sub(CHROME_ROWS) as usize
}

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_status(frame, chunks[0], app);
    draw_store(frame, chunks[1], app);
    draw_help(frame, chunks[2]);
}

/// `[ STATUS ][ CYCLES ][ last instruction ][ SPEED ]`
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let (status, status_style) = if app.fault.is_some() {
        ("FAULT", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
    } else if app.is_running() {
        ("RUNNING", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        ("STOPPED", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    };
    let last = app
        .snapshot
        .last_instruction
        .map(|l| l.to_string())
        .unwrap_or_else(|| "-- --- --".into());

    let mut spans = vec![
        Span::raw("[ STATUS: "),
        Span::styled(status, status_style),
        Span::raw(format!(" ]  [ CYCLES: {} ]  ", app.snapshot.cycles)),
        Span::styled(format!("[ {} ]", last), Style::default().fg(Color::Cyan)),
        Span::raw(format!(
            "  [ SPEED: {}/{} ips ]",
            app.measured_speed,
            app.controls.speed()
        )),
    ];
    if let Some(fault) = &app.fault {
        spans.push(Span::styled(format!("  {}", fault), Style::default().fg(Color::Red)));
    }

    let status = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, area);
}

/// CI and A rows, a blank row, then the store with `>` on the CI slot.
fn draw_store(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.snapshot.regs;
    let ci = regs.ci_value();
    let bright = Style::default().fg(Color::Green).add_modifier(Modifier::BOLD);

    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!(" {}", regs.ci.render(app.style)), bright),
            Span::raw(format!("  CI = {:11}", ci)),
        ]),
        Line::from(vec![
            Span::styled(format!(" {}", regs.a.render(app.style)), bright),
            Span::raw(format!("  A  = {:11}", regs.a_value())),
        ]),
        Line::from(""),
    ];

    for (address, word) in app.snapshot.store.iter().enumerate() {
        let is_ci = address as u64 == ci;
        let (marker, style) = if is_ci {
            (">", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        } else if word.is_zero() {
            (" ", Style::default().fg(Color::DarkGray))
        } else {
            (" ", bright)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}{}", marker, word.render(app.style)), style),
            Span::styled(
                format!("  {:02} {}", address, disassemble_word(word, &app.model)),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    }

    let store = Paragraph::new(lines)
        .scroll((app.scroll.min(u16::MAX as usize) as u16, 0))
        .block(
            Block::default()
                .title(" Store ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta)),
        );

    frame.render_widget(store, area);
}

/// Draw help bar.
fn draw_help(frame: &mut Frame, area: Rect) {
    let key = Style::default().add_modifier(Modifier::REVERSED);
    let help = Paragraph::new(Line::from(vec![
        Span::styled(" Q ", key),
        Span::raw(" QUIT  "),
        Span::styled(" P ", key),
        Span::raw(" RUN/STOP  "),
        Span::styled("F10", key),
        Span::raw(" STEP  "),
        Span::styled(" I ", key),
        Span::raw(" SPEED UP  "),
        Span::styled(" K ", key),
        Span::raw(" SPEED DOWN  "),
        Span::styled(" D ", key),
        Span::raw(" DISPLAY  "),
        Span::raw("↑↓ SCROLL"),
    ]))
    .style(Style::default().fg(Color::Gray))
    .block(Block::default().borders(Borders::ALL));

    frame.render_widget(help, area);
}
