use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use crate::app::{App, Focus};
use crate::types::{PullRequest, TestBadge};

pub const EMPTY_MESSAGE: &str = "No pull requests found.";

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let is_active = app.focus() == Focus::List;

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" Pull Requests ({}) ", app.pull_requests.len()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
        .border_style(if is_active {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        });

    if app.pull_requests.is_empty() {
        let empty = Paragraph::new(EMPTY_MESSAGE)
            .block(block)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(empty, area);
        return;
    }

    let w = area.width.saturating_sub(2) as usize;

    let items: Vec<ListItem> = app
        .pull_requests
        .iter()
        .enumerate()
        .map(|(i, pr)| render_row(app, pr, i == app.selected, w))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));

    let mut state = ListState::default();
    state.select(Some(app.selected));

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_row<'a>(app: &App, pr: &'a PullRequest, is_selected: bool, width: usize) -> ListItem<'a> {
    let title_style = if is_selected {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::BOLD)
    };

    let title = truncate(&pr.title, width.saturating_sub(2));

    let mut title_line = vec![Span::styled(title, title_style)];
    if app.is_busy(pr.id) {
        title_line.push(Span::raw("  "));
        title_line.push(Span::styled(
            "Loading...",
            Style::default().fg(Color::Yellow),
        ));
    }

    let mut meta = vec![
        Span::styled(format!("#{}", pr.number), Style::default().fg(Color::Gray)),
        Span::raw(" opened by "),
        Span::styled(pr.user.login.as_str(), Style::default().fg(Color::Yellow)),
        Span::raw(" in "),
        Span::styled(
            pr.repository.full_name.as_str(),
            Style::default().fg(Color::Cyan),
        ),
    ];

    if app.show_test_badges {
        let badge = TestBadge::from(pr.has_tests);
        let color = match badge {
            TestBadge::Present => Color::Green,
            TestBadge::Missing => Color::Red,
            TestBadge::Unknown => Color::DarkGray,
        };
        meta.push(Span::raw("  "));
        meta.push(Span::styled(badge.to_string(), Style::default().fg(color)));
    }

    let mut lines = vec![Line::from(title_line), Line::from(meta)];

    if let Some(error) = app.row_errors.get(&pr.id) {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    ListItem::new(lines)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}
