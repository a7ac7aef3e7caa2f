mod popup;
mod pr_list;

pub(crate) use popup::{modal_max_scroll, preview_max_scroll};

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::{App, Focus};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub(crate) fn spinner(tick: usize) -> &'static str {
    SPINNER[tick % SPINNER.len()]
}

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    if app.loading {
        render_loading(frame, app, chunks[1]);
    } else {
        pr_list::render(frame, app, chunks[1]);
    }

    render_status_bar(frame, app, chunks[2]);

    // Overlays
    if let Some(comment) = app.flow.preview() {
        let posting = app.flow.in_flight();
        popup::render_preview(frame, comment, app.flow.scroll(), posting);
    }
    let modal = app.modal();
    if modal.is_open {
        popup::render_modal(frame, &modal, app.tick, app.flow.scroll());
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(
        "testreq - Pull Requests",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];

    if app.refreshing {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{} Refreshing", spinner(app.tick)),
            Style::default().fg(Color::Yellow),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));

    frame.render_widget(header, area);
}

fn render_loading(frame: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(area);

    let loading = Paragraph::new(Line::from(Span::styled(
        format!("{} Loading pull requests...", spinner(app.tick)),
        Style::default().fg(Color::Blue),
    )))
    .alignment(Alignment::Center);

    frame.render_widget(loading, rows[1]);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let status = if let Some(error) = &app.error {
        Line::from(vec![Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        )])
    } else if let Some(message) = &app.status_message {
        Line::from(vec![Span::styled(
            message.as_str(),
            Style::default().fg(Color::Green),
        )])
    } else if let Some(label) = app.flow.state().label() {
        Line::from(vec![Span::styled(label, Style::default().fg(Color::Yellow))])
    } else if app.loading {
        Line::from(vec![Span::styled(
            "Loading...",
            Style::default().fg(Color::Yellow),
        )])
    } else {
        let help = match app.focus() {
            Focus::List => {
                "j/k/g/G: nav | t/Enter: request tests | r: refresh | o: open | y: copy url | q: quit"
            }
            Focus::Preview => "j/k: scroll | y/Enter: post comment | n/Esc: cancel",
            Focus::Modal if app.flow.scrollable() => "j/k: scroll | Enter/Esc: close",
            Focus::Modal => "Enter/Esc: close",
        };
        Line::from(vec![Span::styled(help, Style::default().fg(Color::Gray))])
    };

    let status_bar = Paragraph::new(status).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status_bar, area);
}

#[cfg(test)]
pub(crate) mod tests {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use super::*;

    /// Render the app and return the screen as one string per row.
    pub(crate) fn draw(app: &App, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect()
    }

    #[test]
    fn spinner_cycles() {
        assert_eq!(spinner(0), spinner(SPINNER.len()));
        assert_ne!(spinner(0), spinner(1));
    }
}
