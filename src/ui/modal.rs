// Modal UI components.
// Settings panel and confirmation dialogs drawn over the slideshow.

use ratatui::{prelude::*, widgets::*};

use crate::state::{SettingField, Settings, SettingsEditor};

/// Centered rectangle clipped to the frame.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// Draw the settings panel on top of the current view.
pub fn draw_settings_modal(frame: &mut Frame, settings: &Settings, editor: &mut SettingsEditor) {
    let modal_area = centered(frame.area(), 70, 14);

    // Clear the area behind the modal
    frame.render_widget(Clear, modal_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Field list
            Constraint::Length(3), // Input
            Constraint::Length(1), // Instructions
        ])
        .split(modal_area);

    let items: Vec<ListItem> = SettingField::ALL
        .iter()
        .map(|field| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<22}", field.label()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(field.value(settings), Style::default().fg(Color::White)),
            ]))
        })
        .collect();

    let list_widget = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Settings "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(list_widget, chunks[0], &mut editor.list_state);

    // Input section
    let (input_line, border) = match (&editor.input, &editor.error) {
        (Some(input), error) => {
            let mut spans = vec![
                Span::styled(
                    format!("{}: ", editor.selected_field().label()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(input.as_str()),
                Span::styled("█", Style::default().fg(Color::Yellow)),
            ];
            if let Some(error) = error {
                spans.push(Span::styled(
                    format!("  {}", error),
                    Style::default().fg(Color::Red),
                ));
            }
            (Line::from(spans), Color::Yellow)
        }
        (None, _) => (
            Line::from(Span::styled(
                "Select a field and press Enter to edit",
                Style::default().fg(Color::DarkGray),
            )),
            Color::DarkGray,
        ),
    };
    let input_widget = Paragraph::new(input_line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border)),
    );
    frame.render_widget(input_widget, chunks[1]);

    // Instructions
    let instructions = Line::from(vec![
        Span::styled(" Enter", Style::default().fg(Color::Yellow)),
        Span::styled(" = Edit/Save  ", Style::default().fg(Color::DarkGray)),
        Span::styled("↑↓", Style::default().fg(Color::Yellow)),
        Span::styled(" = Navigate  ", Style::default().fg(Color::DarkGray)),
        Span::styled("Esc", Style::default().fg(Color::Yellow)),
        Span::styled(" = Cancel/Close ", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(
        Paragraph::new(instructions).alignment(Alignment::Center),
        chunks[2],
    );
}

/// Draw the delete-all confirmation dialog.
pub fn draw_confirm_delete(frame: &mut Frame, server_url: &str) {
    let modal_area = centered(frame.area(), 56, 7);
    frame.render_widget(Clear, modal_area);

    let text = vec![
        Line::from(Span::styled(
            "Delete every photo on the server?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(server_url, Style::default().fg(Color::DarkGray))),
        Line::from(""),
        Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Yellow)),
            Span::styled(" = Delete  ", Style::default().fg(Color::DarkGray)),
            Span::styled("n/Esc", Style::default().fg(Color::Yellow)),
            Span::styled(" = Cancel", Style::default().fg(Color::DarkGray)),
        ]),
    ];

    let dialog = Paragraph::new(text).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Delete All Photos "),
    );
    frame.render_widget(dialog, modal_area);
}
