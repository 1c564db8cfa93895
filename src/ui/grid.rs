// Slideshow page grid.
// Holds the rendered page and draws it as a fixed 5x3 grid of photo tiles.

use ratatui::{prelude::*, widgets::*};

use crate::state::{DisplayItem, Page, PageRenderer};

const COLUMNS: usize = 5;
const ROWS: usize = 3;

/// What one grid tile shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotView {
    /// Padding on a short page.
    Empty,
    Photo {
        name: String,
        cached: bool,
        stamp: Option<String>,
    },
}

impl SlotView {
    fn from_item(item: &DisplayItem) -> Self {
        SlotView::Photo {
            name: item.file_name().to_string(),
            cached: item.is_cached(),
            stamp: item.version_stamp.clone(),
        }
    }
}

/// The page currently on screen, as last rendered by the slideshow.
#[derive(Debug, Default)]
pub struct PageView {
    pub index: usize,
    pub total: usize,
    pub slots: Vec<SlotView>,
}

impl PageRenderer for PageView {
    fn render_page(&mut self, page: &Page<'_>) {
        self.index = page.index;
        self.total = page.total;
        self.slots = page
            .slots
            .iter()
            .map(|slot| slot.map_or(SlotView::Empty, SlotView::from_item))
            .collect();
    }

    fn render_slot(&mut self, slot: usize, item: &DisplayItem) {
        if let Some(view) = self.slots.get_mut(slot) {
            *view = SlotView::from_item(item);
        }
    }
}

/// Parse a `#rgb` or `#rrggbb` color.
pub fn parse_color(value: &str) -> Option<Color> {
    let hex = value.strip_prefix('#')?;
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Draw the page grid.
pub fn draw_grid(frame: &mut Frame, view: &PageView, background: Color, area: Rect) {
    frame.render_widget(Block::default().style(Style::default().bg(background)), area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, ROWS as u32); ROWS])
        .split(area);

    for (row_index, row) in rows.iter().enumerate() {
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, COLUMNS as u32); COLUMNS])
            .split(*row);

        for (column, cell) in cells.iter().enumerate() {
            let slot = view.slots.get(row_index * COLUMNS + column);
            draw_tile(frame, slot.unwrap_or(&SlotView::Empty), *cell);
        }
    }
}

fn draw_tile(frame: &mut Frame, slot: &SlotView, area: Rect) {
    match slot {
        SlotView::Empty => {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray));
            frame.render_widget(block, area);
        }
        SlotView::Photo {
            name,
            cached,
            stamp,
        } => {
            let (marker, color) = if *cached {
                ("● cached", Color::Green)
            } else {
                ("○ remote", Color::Yellow)
            };

            let mut lines = vec![Line::from(Span::styled(marker, Style::default().fg(color)))];
            if let Some(stamp) = stamp {
                lines.push(Line::from(Span::styled(
                    stamp.clone(),
                    Style::default().fg(Color::DarkGray),
                )));
            }

            let tile = Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(Color::White))
                        .title(format!(" {} ", name)),
                );
            frame.render_widget(tile, area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::reconcile::PhotoRef;

    fn item(url: &str, source: PhotoRef) -> DisplayItem {
        DisplayItem {
            url: url.to_string(),
            version_stamp: Some("2024-01-01".to_string()),
            source,
        }
    }

    #[test]
    fn test_render_page_pads_slots() {
        let a = item("http://frame/uploads/a.jpg", PhotoRef::Remote);
        let page = Page {
            index: 2,
            total: 3,
            slots: vec![Some(&a), None, None],
        };

        let mut view = PageView::default();
        view.render_page(&page);

        assert_eq!(view.index, 2);
        assert_eq!(view.slots.len(), 3);
        assert_eq!(view.slots[1], SlotView::Empty);
        assert!(matches!(&view.slots[0], SlotView::Photo { name, cached: false, .. } if name == "a.jpg"));
    }

    #[test]
    fn test_render_slot_replaces_one_tile() {
        let a = item("http://frame/uploads/a.jpg", PhotoRef::Remote);
        let b = item("http://frame/uploads/b.jpg", PhotoRef::Remote);
        let mut view = PageView::default();
        view.render_page(&Page {
            index: 0,
            total: 1,
            slots: vec![Some(&a), Some(&b)],
        });

        let cached_b = item(
            "http://frame/uploads/b.jpg",
            PhotoRef::Cached { id: "b".to_string() },
        );
        view.render_slot(1, &cached_b);

        assert!(matches!(&view.slots[0], SlotView::Photo { cached: false, .. }));
        assert!(matches!(&view.slots[1], SlotView::Photo { cached: true, .. }));
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#112233"), Some(Color::Rgb(0x11, 0x22, 0x33)));
        assert_eq!(parse_color("#fff"), Some(Color::Rgb(255, 255, 255)));
        assert_eq!(parse_color("black"), None);
        assert_eq!(parse_color("#12345"), None);
    }
}
