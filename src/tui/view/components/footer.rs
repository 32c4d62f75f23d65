use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub fn render_library_list_footer(f: &mut Frame, area: Rect, status: Option<&str>) {
    let mut spans = vec![
        Span::styled("↑↓", Style::default().fg(Color::Cyan)),
        Span::raw(" Nav  "),
        Span::styled("Space", Style::default().fg(Color::Cyan)),
        Span::raw(" Select  "),
        Span::styled("a/n", Style::default().fg(Color::Cyan)),
        Span::raw(" All/None  "),
        Span::styled("b", Style::default().fg(Color::Cyan)),
        Span::raw(" Backup  "),
        Span::styled("d", Style::default().fg(Color::Cyan)),
        Span::raw(" Content  "),
        Span::styled("s", Style::default().fg(Color::Cyan)),
        Span::raw(" Sort  "),
        Span::styled("r", Style::default().fg(Color::Cyan)),
        Span::raw(" Rescan  "),
        Span::styled("Enter", Style::default().fg(Color::Cyan)),
        Span::raw(" Remove  "),
        Span::styled("?", Style::default().fg(Color::Cyan)),
        Span::raw(" Help  "),
        Span::styled("q", Style::default().fg(Color::Cyan)),
        Span::raw(" Quit"),
    ];

    if let Some(status) = status {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("| {}", status),
            Style::default().fg(Color::Red),
        ));
    }

    let footer = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::TOP));
    f.render_widget(footer, area);
}

pub fn render_removing_footer(f: &mut Frame, area: Rect, cancel_requested: bool) {
    let footer = if cancel_requested {
        Paragraph::new(Line::from(Span::styled(
            "Cancelling after the current step...",
            Style::default().fg(Color::Yellow),
        )))
    } else {
        Paragraph::new(Line::from(vec![
            Span::styled("Esc/c", Style::default().fg(Color::Cyan)),
            Span::raw(" Cancel  "),
            Span::styled("q", Style::default().fg(Color::Cyan)),
            Span::raw(" Cancel and quit"),
        ]))
    };

    f.render_widget(footer.block(Block::default().borders(Borders::TOP)), area);
}
