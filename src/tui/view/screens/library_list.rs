use crate::inventory::RemovableUnit;
use crate::pipeline::RemovalOptions;
use crate::tui::logic::sorted_indices;
use crate::tui::state::SortMode;
use crate::tui::view::components::footer::render_library_list_footer;
use crate::utils::format_size;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;
use std::collections::HashSet;

pub struct LibraryListData<'a> {
    pub list_state: &'a mut ListState,
    pub units: &'a [RemovableUnit],
    pub selected: &'a HashSet<String>,
    pub options: RemovalOptions,
    pub sort_mode: SortMode,
    pub status: Option<&'a str>,
}

fn option_span(label: &'static str, on: bool) -> Span<'static> {
    let style = if on {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(format!("[{}] {}", if on { "x" } else { " " }, label), style)
}

pub fn render_library_list(f: &mut Frame, data: &mut LibraryListData) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(2),
        ])
        .split(f.area());

    let title = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                " libsweep ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("Library Removal"),
            Span::raw("   "),
            Span::styled(
                format!("{} libraries found", data.units.len()),
                Style::default().fg(Color::Green),
            ),
            Span::styled(
                format!("   {} selected", data.selected.len()),
                Style::default().fg(Color::Yellow),
            ),
        ]),
        Line::from(vec![
            Span::raw(" "),
            option_span("Back up registry entry", data.options.backup_config_entry),
            Span::raw("   "),
            option_span("Delete content", data.options.delete_content_dir),
        ]),
    ])
    .block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(title, chunks[0]);

    let items: Vec<ListItem> = sorted_indices(data.units, data.sort_mode)
        .into_iter()
        .map(|i| {
            let unit = &data.units[i];
            let is_selected = data.selected.contains(&unit.name);
            let check = if is_selected { "[x]" } else { "[ ]" };
            let size = unit
                .known_size()
                .map(format_size)
                .unwrap_or_else(|| "...".to_string());
            let content = if unit.has_content_dir() {
                unit.content_dir.display().to_string()
            } else {
                "(no content directory)".to_string()
            };

            let name_style = if is_selected {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };

            ListItem::new(Line::from(vec![
                Span::styled(check, Style::default().fg(Color::Cyan)),
                Span::raw(" "),
                Span::styled(format!("{:<36}", unit.name), name_style),
                Span::styled(format!("{:>10}  ", size), Style::default().fg(Color::Yellow)),
                Span::styled(content, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::NONE)
                .title(format!(" Libraries (sort: {}) ", data.sort_mode.label())),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    f.render_stateful_widget(list, chunks[1], data.list_state);

    render_library_list_footer(f, chunks[2], data.status);
}
