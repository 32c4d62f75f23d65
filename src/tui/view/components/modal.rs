use crate::pipeline::{OutcomeStatus, RemovalOptions};
use crate::tui::state::RemovalResultDisplay;
use crate::tui::view::components::centered_rect;
use crate::utils::format_size;
use ratatui::layout::Alignment;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

pub struct ConfirmModalData<'a> {
    pub names: Vec<&'a str>,
    pub total_size: Option<u64>,
    pub options: RemovalOptions,
}

fn flag(on: bool) -> Span<'static> {
    if on {
        Span::styled("yes", Style::default().fg(Color::Green))
    } else {
        Span::styled("no", Style::default().fg(Color::DarkGray))
    }
}

pub fn render_confirm_modal(f: &mut Frame, data: &ConfirmModalData) {
    let area = centered_rect(60, 50, f.area());

    let mut text = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("Remove ", Style::default().fg(Color::White)),
            Span::styled(
                format!("{} libraries", data.names.len()),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("?", Style::default().fg(Color::White)),
        ]),
        Line::from(""),
    ];

    const SHOWN: usize = 5;
    for name in data.names.iter().take(SHOWN) {
        text.push(Line::from(Span::styled(
            name.to_string(),
            Style::default().fg(Color::Gray),
        )));
    }
    if data.names.len() > SHOWN {
        text.push(Line::from(Span::styled(
            format!("... and {} more", data.names.len() - SHOWN),
            Style::default().fg(Color::DarkGray),
        )));
    }

    text.push(Line::from(""));
    text.push(Line::from(vec![
        Span::styled("Back up registry entry: ", Style::default().fg(Color::Gray)),
        flag(data.options.backup_config_entry),
        Span::raw("   "),
        Span::styled("Delete content: ", Style::default().fg(Color::Gray)),
        flag(data.options.delete_content_dir),
    ]));
    if data.options.delete_content_dir {
        if let Some(size) = data.total_size {
            text.push(Line::from(vec![
                Span::styled("Frees ", Style::default().fg(Color::Gray)),
                Span::styled(
                    format_size(size),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
        }
    }

    text.push(Line::from(""));
    text.push(Line::from(Span::styled(
        "This action cannot be undone.",
        Style::default().fg(Color::Red),
    )));
    text.push(Line::from(""));
    text.push(Line::from(vec![
        Span::styled("[y/Enter]", Style::default().fg(Color::Green)),
        Span::raw(" Confirm     "),
        Span::styled("[n/Esc]", Style::default().fg(Color::Red)),
        Span::raw(" Cancel"),
    ]));

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .title(" Confirm Removal ")
                .borders(Borders::ALL),
        )
        .alignment(Alignment::Center);

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

pub fn render_result_modal(f: &mut Frame, result: Option<&RemovalResultDisplay>) {
    let area = centered_rect(70, 60, f.area());

    let text = if let Some(r) = result {
        let summary = &r.summary;
        let succeeded = summary.count(OutcomeStatus::Succeeded);
        let failed = summary.count(OutcomeStatus::Failed);
        let cancelled = summary.count(OutcomeStatus::Cancelled);

        let (headline, color) = if summary.cancelled {
            ("Removal Cancelled", Color::Yellow)
        } else if failed > 0 {
            ("Removal Finished With Errors", Color::Red)
        } else {
            ("Removal Complete!", Color::Green)
        };

        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                headline,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled("Removed: ", Style::default().fg(Color::Gray)),
                Span::styled(succeeded.to_string(), Style::default().fg(Color::Green)),
                Span::styled("   Failed: ", Style::default().fg(Color::Gray)),
                Span::styled(
                    failed.to_string(),
                    Style::default().fg(if failed > 0 { Color::Red } else { Color::Green }),
                ),
                Span::styled("   Cancelled: ", Style::default().fg(Color::Gray)),
                Span::styled(cancelled.to_string(), Style::default().fg(Color::Yellow)),
            ]),
            Line::from(""),
        ];

        for outcome in &summary.outcomes {
            match outcome.status {
                OutcomeStatus::Succeeded if outcome.warnings.is_empty() => {}
                OutcomeStatus::Succeeded => lines.push(Line::from(Span::styled(
                    format!("{}: {} warning(s)", outcome.unit, outcome.warnings.len()),
                    Style::default().fg(Color::Yellow),
                ))),
                OutcomeStatus::Failed => lines.push(Line::from(Span::styled(
                    format!(
                        "{}: {}",
                        outcome.unit,
                        outcome.reason.as_deref().unwrap_or("failed")
                    ),
                    Style::default().fg(Color::Red),
                ))),
                OutcomeStatus::Cancelled if outcome.is_partial() => {
                    lines.push(Line::from(Span::styled(
                        format!("{}: partially removed; run again to finish", outcome.unit),
                        Style::default().fg(Color::Yellow),
                    )))
                }
                OutcomeStatus::Cancelled => {}
            }
        }

        lines.push(Line::from(vec![
            Span::styled("Duration: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:.2}s", r.duration.as_secs_f64()),
                Style::default().fg(Color::Gray),
            ),
        ]));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Press Enter to continue",
            Style::default().fg(Color::DarkGray),
        )));
        lines
    } else {
        vec![Line::from("No result")]
    };

    let paragraph = Paragraph::new(text)
        .block(Block::default().title(" Result ").borders(Borders::ALL))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}

fn help_line(key: &'static str, text: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(key, Style::default().fg(Color::Cyan)),
        Span::raw(text),
    ])
}

fn help_section(title: &'static str) -> Line<'static> {
    Line::from(Span::styled(
        title,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ))
}

pub fn render_help_modal(f: &mut Frame) {
    let area = centered_rect(65, 70, f.area());

    let help_text = vec![
        Line::from(Span::styled(
            "libsweep Help",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        help_section("Navigation"),
        help_line("  ↑/↓ j/k ", "Move"),
        help_line("  s       ", "Cycle sort order"),
        help_line("  r       ", "Rescan the registry"),
        Line::from(""),
        help_section("Selection"),
        help_line("  Space   ", "Toggle library"),
        help_line("  a / n   ", "Select all / none"),
        Line::from(""),
        help_section("Options"),
        help_line("  b       ", "Back up the registry entry before deleting it"),
        help_line("  d       ", "Also delete the content directory"),
        Line::from(""),
        help_section("Actions"),
        help_line("  Enter   ", "Remove selected"),
        help_line("  Esc / c ", "Cancel a running removal"),
        help_line("  ?       ", "Show this help"),
        help_line("  q       ", "Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press q, Esc, or ? to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(help_text)
        .block(Block::default().title(" Help ").borders(Borders::ALL));

    f.render_widget(Clear, area);
    f.render_widget(paragraph, area);
}
