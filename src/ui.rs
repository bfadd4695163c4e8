use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::drill::{CharState, Drill};
use crate::session::GameState;
use crate::{App, AppScreen};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.session.state {
            GameState::Typing => render_typing(self, area, buf),
            GameState::Running | GameState::Success => render_console(self, area, buf),
            GameState::Completed => render_tier_complete(self, area, buf),
        }
    }
}

fn render_typing(app: &App, area: Rect, buf: &mut Buffer) {
    let drill = &app.session.drill;

    // error flash
    if drill.is_shaking() {
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .render(area, buf);
    }

    let ghost_lines = ghost_lines(drill);
    let ghost_height = ghost_lines.len() as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(
            [
                Constraint::Length(1), // header
                Constraint::Length((area.height.saturating_sub(ghost_height + 6)) / 2),
                Constraint::Length(ghost_height),
                Constraint::Min(1),
                Constraint::Length(1), // metrics
                Constraint::Length(1), // hints
            ]
            .as_ref(),
        )
        .split(area);

    let header = Paragraph::new(Span::styled(
        format!(
            "{} · {} · level {}/{}",
            app.session.language,
            app.session.tier,
            app.session.level_index() + 1,
            app.session.level_count(),
        ),
        Style::default().add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center);
    header.render(chunks[0], buf);

    // single-line snippets get centered for the zen feeling; multi-line code
    // stays left-aligned so indentation reads correctly
    let alignment = if ghost_height == 1 && drill.ghost.width() <= area.width as usize {
        Alignment::Center
    } else {
        Alignment::Left
    };

    let ghost = Paragraph::new(ghost_lines).alignment(alignment);
    ghost.render(chunks[2], buf);

    let metrics_style = if drill.is_shaking() {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let metrics = Paragraph::new(Span::styled(
        format!(
            "{} wpm   {}% acc   {}% done",
            drill.wpm, drill.accuracy, drill.progress
        ),
        metrics_style,
    ))
    .alignment(Alignment::Center);
    metrics.render(chunks[4], buf);

    let hints = Paragraph::new(Span::styled(
        "(esc) quit  (←) retry  (ctrl+l) leaderboard",
        Style::default()
            .add_modifier(Modifier::ITALIC)
            .add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center);
    hints.render(chunks[5], buf);
}

/// Builds the highlighted ghost text: green for correct, red for incorrect
/// (showing what was actually typed), dim for untyped, with the cursor
/// underlined at the first untyped position. Newlines render as a visible
/// return marker so the user knows to press enter.
fn ghost_lines(drill: &Drill) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let green_bold = bold.fg(Color::Green);
    let red_bold = bold.fg(Color::Red);
    let dim_bold = bold.add_modifier(Modifier::DIM);
    let cursor_style = dim_bold.add_modifier(Modifier::UNDERLINED);

    let states = drill.char_states();
    let typed: Vec<char> = drill.typed.chars().collect();
    let cursor = drill.cursor_pos();

    let mut lines: Vec<Line> = Vec::new();
    let mut spans: Vec<Span> = Vec::new();

    for (idx, g) in drill.ghost.chars().enumerate() {
        let shown = match states[idx] {
            CharState::Incorrect => match typed.get(idx) {
                Some(' ') | None => "·".to_string(),
                Some('\n') | Some('\t') => "·".to_string(),
                Some(c) => c.to_string(),
            },
            _ => match g {
                '\n' => "⏎".to_string(),
                '\t' => "⇥   ".to_string(),
                c => c.to_string(),
            },
        };

        let style = match states[idx] {
            CharState::Correct => green_bold,
            CharState::Incorrect => red_bold,
            CharState::Untyped if idx == cursor => cursor_style,
            CharState::Untyped => dim_bold,
        };

        spans.push(Span::styled(shown, style));

        if g == '\n' {
            lines.push(Line::from(std::mem::take(&mut spans)));
        }
    }

    let overflow = drill.overflow();
    if !overflow.is_empty() {
        spans.push(Span::styled(
            overflow.replace(' ', "·").replace('\n', "·"),
            red_bold,
        ));
    }

    lines.push(Line::from(spans));
    lines
}

fn render_console(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(console) = &app.session.console else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([Constraint::Min(3), Constraint::Length(1)].as_ref())
        .split(area);

    let dim_italic = Style::default()
        .add_modifier(Modifier::ITALIC)
        .add_modifier(Modifier::DIM);
    let green = Style::default().fg(Color::Green);

    let mut lines: Vec<Line> = console
        .log
        .iter()
        .map(|entry| Line::from(Span::raw(entry.clone())))
        .collect();

    if let Some(prompt) = console.current_prompt() {
        lines.push(Line::from(vec![
            Span::raw(prompt.to_string()),
            Span::styled(console.answer.clone(), green),
            Span::styled("█", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]));
    }

    if let Some(output) = &console.final_output {
        lines.push(Line::default());
        for out_line in output.lines() {
            lines.push(Line::from(Span::styled(out_line.to_string(), green)));
        }
        if let Some(explanation) = console.explanation() {
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                explanation.to_string(),
                dim_italic,
            )));
        }
    }

    let pane = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("terminal"))
        .wrap(Wrap { trim: false });
    pane.render(chunks[0], buf);

    let hint_text = if console.is_done() {
        "(n)ext level  (r)etry  (ctrl+l) leaderboard"
    } else if console.current_prompt().is_some() {
        "type your answer and press enter"
    } else {
        ""
    };
    let hints = Paragraph::new(Span::styled(hint_text, dim_italic)).alignment(Alignment::Center);
    hints.render(chunks[1], buf);
}

fn render_tier_complete(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints(
            [
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
            ]
            .as_ref(),
        )
        .split(area);

    let banner = Paragraph::new(Span::styled(
        format!("TIER COMPLETE — {}", app.session.tier),
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    banner.render(chunks[1], buf);

    let detail = match app.session.tier.next() {
        Some(next) => format!("'{}' unlocked", next),
        None => "all tiers cleared".to_string(),
    };
    let message = app.notice.clone().unwrap_or(detail);
    let detail_widget = Paragraph::new(Span::styled(
        message,
        Style::default().add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center);
    detail_widget.render(chunks[2], buf);

    let hints = Paragraph::new(Span::styled(
        "(c)ontinue to next tier  (q)uit",
        Style::default()
            .add_modifier(Modifier::ITALIC)
            .add_modifier(Modifier::DIM),
    ))
    .alignment(Alignment::Center);
    hints.render(chunks[3], buf);
}

pub fn render_leaderboard(app: &App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(0),    // table
            Constraint::Length(3), // instructions
        ])
        .split(area);

    let title = Paragraph::new("Local Leaderboard")
        .block(Block::default().borders(Borders::ALL).title("codeghost"))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let entries = app.store.leaderboard();

    if entries.is_empty() {
        let no_data = Paragraph::new("No records yet. Be the first!")
            .block(Block::default().borders(Borders::ALL).title("No Data"))
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        f.render_widget(no_data, chunks[1]);
    } else {
        let header = Row::new(vec![
            Cell::from("RANK"),
            Cell::from("OPERATOR"),
            Cell::from("LANG"),
            Cell::from("TIER"),
            Cell::from("WPM"),
            Cell::from("ACC"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let rows: Vec<Row> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                Row::new(vec![
                    Cell::from(format!("#{}", i + 1)),
                    Cell::from(entry.username.clone()),
                    Cell::from(entry.language.clone()),
                    Cell::from(entry.tier.to_string()),
                    Cell::from(entry.wpm.to_string())
                        .style(Style::default().fg(Color::Green)),
                    Cell::from(format!("{}%", entry.accuracy)),
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            &[
                Constraint::Length(6),
                Constraint::Length(20),
                Constraint::Length(12),
                Constraint::Length(14),
                Constraint::Length(6),
                Constraint::Length(6),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Top 50"));

        f.render_widget(table, chunks[1]);
    }

    let instructions = Paragraph::new("(esc) back")
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        )
        .alignment(Alignment::Center);
    f.render_widget(instructions, chunks[2]);
}

/// Top-level dispatch between screens.
pub fn draw(app: &App, f: &mut Frame) {
    match app.screen {
        AppScreen::Play | AppScreen::TierComplete => {
            f.render_widget(app, f.area());
        }
        AppScreen::Leaderboard => {
            render_leaderboard(app, f);
        }
    }
}
