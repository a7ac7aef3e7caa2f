use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::modal::{ModalState, ModalStatus};

use super::spinner;

fn preview_area(screen: Rect) -> Rect {
    centered_rect(
        screen.width.saturating_sub(8).min(100),
        screen.height.saturating_sub(4),
        screen,
    )
}

fn preview_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            " Preview Comment ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
}

fn preview_paragraph(comment: &str) -> Paragraph<'_> {
    Paragraph::new(Text::raw(comment))
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: false })
}

/// Comment body and footer rows inside a popup
fn body_and_footer(inner: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);
    (chunks[0], chunks[1])
}

/// Rows left over once the wrapped text has filled `body`.
fn max_scroll(paragraph: &Paragraph, body: Rect) -> usize {
    paragraph
        .line_count(body.width)
        .saturating_sub(body.height as usize)
}

/// Largest useful scroll offset for the preview on a `screen`-sized terminal.
pub fn preview_max_scroll(comment: &str, screen: Rect) -> usize {
    let (body, _) = body_and_footer(preview_block().inner(preview_area(screen)));
    max_scroll(&preview_paragraph(comment), body)
}

/// Preview of the generated comment with cancel / post actions.
/// The comment is shown as-is: whitespace and line breaks are preserved.
pub fn render_preview(frame: &mut Frame, comment: &str, scroll: usize, posting: bool) {
    let screen = frame.area();
    let area = preview_area(screen);
    frame.render_widget(Clear, area);

    let block = preview_block();
    let (body, footer) = body_and_footer(block.inner(area));
    frame.render_widget(block, area);

    let paragraph = preview_paragraph(comment);
    let scroll = scroll.min(max_scroll(&paragraph, body));
    frame.render_widget(
        paragraph.scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0)),
        body,
    );

    let actions = if posting {
        Line::from(Span::styled(
            "Posting...",
            Style::default().fg(Color::Yellow),
        ))
    } else {
        Line::from(vec![
            Span::styled("[n]", Style::default().fg(Color::Red)),
            Span::raw(" Cancel  "),
            Span::styled("[y]", Style::default().fg(Color::Green)),
            Span::raw(" Post Comment"),
        ])
    };
    frame.render_widget(
        Paragraph::new(actions).alignment(Alignment::Right),
        footer,
    );
}

fn modal_style(modal: &ModalState, tick: usize) -> (&'static str, Color) {
    match modal.status {
        ModalStatus::Loading => (spinner(tick), Color::Blue),
        ModalStatus::Success => ("✓", Color::Green),
        ModalStatus::Error => ("✗", Color::Red),
    }
}

fn modal_paragraph(modal: &ModalState, tick: usize) -> Paragraph<'_> {
    let (icon, color) = modal_style(modal, tick);

    let mut lines = vec![
        Line::from(Span::styled(
            icon,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        Line::from(Span::styled(
            modal.title(),
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        Line::from(""),
    ];

    match modal.status {
        ModalStatus::Loading => {
            lines.push(
                Line::from(Span::styled(
                    "Analyzing code and generating test recommendations...",
                    Style::default().fg(Color::Gray),
                ))
                .alignment(Alignment::Center),
            );
        }
        ModalStatus::Success => {
            if let Some(comment) = &modal.comment {
                lines.extend(
                    comment
                        .lines()
                        .map(|l| Line::from(Span::styled(l, Style::default().fg(Color::Gray)))),
                );
            }
        }
        ModalStatus::Error => {
            if let Some(error) = &modal.error {
                lines.push(
                    Line::from(Span::styled(
                        error.as_str(),
                        Style::default().fg(Color::Red),
                    ))
                    .alignment(Alignment::Center),
                );
            }
        }
    }

    Paragraph::new(lines).wrap(Wrap { trim: false })
}

/// Grows with the wrapped content (two borders plus the footer row), up to
/// the screen height less a margin.
fn modal_area(paragraph: &Paragraph, screen: Rect) -> Rect {
    let width = screen.width.saturating_sub(8).min(72);
    let rows = paragraph.line_count(width.saturating_sub(2));
    let height = u16::try_from(rows.saturating_add(3))
        .unwrap_or(u16::MAX)
        .min(screen.height.saturating_sub(2));
    centered_rect(width, height, screen)
}

fn modal_block(color: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

/// Largest useful scroll offset for the status modal on a `screen`-sized terminal.
pub fn modal_max_scroll(modal: &ModalState, screen: Rect) -> usize {
    let paragraph = modal_paragraph(modal, 0);
    let area = modal_area(&paragraph, screen);
    let (body, _) = body_and_footer(modal_block(Color::Reset).inner(area));
    max_scroll(&paragraph, body)
}

/// Status modal: spinner while requesting, the posted comment on success,
/// the error message on failure. Long content scrolls.
pub fn render_modal(frame: &mut Frame, modal: &ModalState, tick: usize, scroll: usize) {
    let (_, color) = modal_style(modal, tick);
    let paragraph = modal_paragraph(modal, tick);

    let area = modal_area(&paragraph, frame.area());
    frame.render_widget(Clear, area);

    let block = modal_block(color);
    let (body, footer_area) = body_and_footer(block.inner(area));
    frame.render_widget(block, area);

    let scroll = scroll.min(max_scroll(&paragraph, body));
    frame.render_widget(
        paragraph.scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0)),
        body,
    );

    let footer = match modal.status {
        ModalStatus::Loading => Span::styled(modal.footer(), Style::default().fg(Color::Gray)),
        _ => Span::styled(
            format!("[Enter] {}", modal.footer()),
            Style::default().fg(Color::Cyan),
        ),
    };
    frame.render_widget(
        Paragraph::new(Line::from(footer)).alignment(Alignment::Center),
        footer_area,
    );
}

/// Centre a `width` x `height` rect inside `outer`
fn centered_rect(width: u16, height: u16, outer: Rect) -> Rect {
    let popup_width = width.min(outer.width);
    let popup_height = height.min(outer.height);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((outer.height.saturating_sub(popup_height)) / 2),
            Constraint::Length(popup_height),
            Constraint::Min(0),
        ])
        .split(outer);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((outer.width.saturating_sub(popup_width)) / 2),
            Constraint::Length(popup_width),
            Constraint::Min(0),
        ])
        .split(vertical[1]);

    horizontal[1]
}
