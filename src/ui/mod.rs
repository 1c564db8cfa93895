// UI module for rendering the TUI.
// Contains the slideshow grid, status bar, and modal overlays.

pub(crate) mod grid;
mod modal;

pub use grid::PageView;

use std::path::Path;

use ratatui::{prelude::*, widgets::*};

use crate::app::App;
use crate::state::{ActivityLevel, Settings};

/// Main draw function that renders the entire UI.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Top caption
            Constraint::Min(1),    // Slideshow
            Constraint::Length(1), // Bottom caption and upload url
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    let background = grid::parse_color(&app.settings.background_color).unwrap_or(Color::Black);

    let caption_top = Paragraph::new(Span::styled(
        app.settings.qr_caption_top.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    frame.render_widget(caption_top, chunks[0]);

    draw_content(frame, app, background, chunks[1]);

    let mut footer = vec![
        Span::raw(app.settings.qr_caption_bottom.as_str()),
        Span::raw("  "),
        Span::styled(app.config.upload_url(), Style::default().fg(Color::Cyan)),
    ];
    if let Some(artwork) = artwork_label(&app.settings) {
        footer.push(Span::styled(
            format!("  {}", artwork),
            Style::default().fg(Color::DarkGray),
        ));
    }
    let footer = Line::from(footer);
    frame.render_widget(
        Paragraph::new(footer).alignment(Alignment::Center),
        chunks[2],
    );

    draw_status_bar(frame, app, chunks[3]);

    // Overlays, rendered last so they sit on top
    if let Some(editor) = app.settings_editor.as_mut() {
        modal::draw_settings_modal(frame, &app.settings, editor);
    }
    if app.confirm_delete {
        modal::draw_confirm_delete(frame, &app.config.server_url);
    }
    if app.show_help {
        draw_help_overlay(frame);
    }
}

/// Draw the grid, or a placeholder while there is nothing to show.
fn draw_content(frame: &mut Frame, app: &App, background: Color, area: Rect) {
    let status = app.sync.status;
    if !app.slideshow.sequence().is_empty() && !status.is_empty_state() {
        grid::draw_grid(frame, app.slideshow.renderer(), background, area);
        return;
    }

    let (message, color) = if status.is_empty_state() && status.is_offline() {
        ("Cannot reach the photo server", Color::Red)
    } else if status.is_empty_state() {
        ("No photos yet. Be the first to upload!", Color::White)
    } else {
        ("Loading photos...", Color::DarkGray)
    };

    let placeholder = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(color))),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .style(Style::default().bg(background)),
    );
    frame.render_widget(placeholder, area);
}

/// File names of the configured background and QR overlay images.
fn artwork_label(settings: &Settings) -> Option<String> {
    let name = |path: &str| {
        Path::new(path)
            .file_name()
            .map_or_else(|| path.to_string(), |n| n.to_string_lossy().into_owned())
    };
    let parts: Vec<String> = [
        ("bg", settings.background_image.as_deref()),
        ("qr", settings.qr_overlay_image.as_deref()),
    ]
    .into_iter()
    .filter_map(|(label, path)| path.map(|p| format!("{}: {}", label, name(p))))
    .collect();

    (!parts.is_empty()).then(|| parts.join("  "))
}

fn status_color(name: &str) -> Color {
    match name {
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "red" => Color::Red,
        _ => Color::DarkGray,
    }
}

/// Draw the status bar at the bottom.
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (label, color) = app.sync.status.display();
    let view = app.slideshow.renderer();

    let mut spans = vec![
        Span::styled(
            format!(" {} ", label),
            Style::default()
                .fg(Color::Black)
                .bg(status_color(color))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" {} photos", app.slideshow.sequence().len())),
    ];

    if view.total > 0 {
        spans.push(Span::raw(format!("  page {}/{}", view.index + 1, view.total)));
    }
    spans.push(Span::raw(format!(
        "  every {}s",
        app.slideshow.interval().as_secs()
    )));

    if let Some(latest) = app.sync.latest() {
        let color = match latest.level {
            ActivityLevel::Info => Color::DarkGray,
            ActivityLevel::Warn => Color::Yellow,
            ActivityLevel::Error => Color::Red,
        };
        spans.push(Span::styled(
            format!("  {}", latest.message),
            Style::default().fg(color),
        ));
    }

    spans.push(Span::raw("  ? "));
    spans.push(Span::styled("Help", Style::default().fg(Color::DarkGray)));
    spans.push(Span::raw("  q "));
    spans.push(Span::styled("Quit", Style::default().fg(Color::DarkGray)));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw the help overlay.
fn draw_help_overlay(frame: &mut Frame) {
    let area = frame.area();

    // Create a centered popup
    let popup_width = 46.min(area.width);
    let popup_height = 14.min(area.height);
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let key = |keys: &'static str, action: &'static str| {
        Line::from(vec![
            Span::styled(keys, Style::default().fg(Color::Cyan)),
            Span::raw(action),
        ])
    };

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        key("  ←/→ or h/l    ", "Previous / next page"),
        key("  +/-           ", "Slower / faster page turns"),
        key("  s             ", "Settings"),
        key("  r             ", "Sync now"),
        key("  X             ", "Delete all photos on server"),
        key("  ?             ", "Toggle help"),
        key("  q             ", "Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or ? to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Help "),
    );
    frame.render_widget(help, popup_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_color() {
        assert_eq!(status_color("green"), Color::Green);
        assert_eq!(status_color("red"), Color::Red);
        assert_eq!(status_color("purple"), Color::DarkGray);
    }

    #[test]
    fn test_artwork_label() {
        let mut settings = Settings::default();
        assert_eq!(artwork_label(&settings), None);

        settings.background_image = Some("/home/kiosk/Pictures/wedding.jpg".to_string());
        assert_eq!(artwork_label(&settings).as_deref(), Some("bg: wedding.jpg"));

        settings.qr_overlay_image = Some("qr-frame.png".to_string());
        assert_eq!(
            artwork_label(&settings).as_deref(),
            Some("bg: wedding.jpg  qr: qr-frame.png")
        );
    }
}
