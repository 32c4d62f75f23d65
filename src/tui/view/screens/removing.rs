use crate::pipeline::OutcomeStatus;
use crate::tui::state::RemovalProgress;
use crate::tui::view::components::footer::render_removing_footer;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};
use ratatui::Frame;

pub fn render_removing(f: &mut Frame, progress: &RemovalProgress) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(2),
        ])
        .split(f.area());

    let title = Paragraph::new(Line::from(vec![
        Span::styled(
            " libsweep ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("Removing "),
        Span::styled(
            format!("{}/{}", progress.outcomes.len(), progress.total_units),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(" libraries"),
    ]))
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(title, chunks[0]);

    let ratio = progress.ratio();
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio)
        .label(format!("{:.0}%", ratio * 100.0));
    f.render_widget(gauge, chunks[1]);

    let current = match &progress.current {
        Some(p) => Line::from(vec![
            Span::styled(p.unit.clone(), Style::default().fg(Color::White)),
            Span::styled(
                format!("  step {}/{}  ", p.step_index, p.step_count),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(p.message.clone(), Style::default().fg(Color::Cyan)),
        ]),
        None => Line::from(Span::styled(
            "Starting...",
            Style::default().fg(Color::DarkGray),
        )),
    };
    f.render_widget(Paragraph::new(current), chunks[2]);

    let items: Vec<ListItem> = progress
        .outcomes
        .iter()
        .map(|outcome| {
            let (mark, color) = match outcome.status {
                OutcomeStatus::Succeeded => ("✓", Color::Green),
                OutcomeStatus::Failed => ("✗", Color::Red),
                OutcomeStatus::Cancelled => ("-", Color::Yellow),
            };
            let mut spans = vec![
                Span::styled(mark, Style::default().fg(color)),
                Span::raw(" "),
                Span::raw(outcome.unit.clone()),
            ];
            if let Some(reason) = &outcome.reason {
                spans.push(Span::styled(
                    format!("  {}", reason),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items).block(Block::default().title(" Done ").borders(Borders::TOP));
    f.render_widget(list, chunks[3]);

    render_removing_footer(f, chunks[4], progress.cancel_requested);
}
