//! Lays a [`RenderedFrame`] into bordered ratatui panels.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::constants::{HELP_POPUP_HEIGHT, HELP_POPUP_WIDTH};
use crate::ui::frame::RenderedFrame;
use crate::ui::theme::Theme;

pub fn draw(frame: &mut Frame, rendered: &RenderedFrame, t: &Theme) {
    let size = frame.area();

    let download_height = rendered
        .downloads
        .as_ref()
        .map(|lines| lines.len() as u16 + 2)
        .unwrap_or(0);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                                    // Header
            Constraint::Length(rendered.operation.len() as u16 + 2), // Operation
            Constraint::Length(download_height),                      // Downloads
            Constraint::Min(3),                                       // Events
            Constraint::Length(1),                                    // Status line
        ])
        .split(size);

    let header = Paragraph::new(rendered.header.clone()).block(panel(t, None, false));
    frame.render_widget(header, chunks[0]);

    let operation = Paragraph::new(rendered.operation.clone())
        .block(panel(t, Some(" Operation "), rendered.operation_active));
    frame.render_widget(operation, chunks[1]);

    if let Some(lines) = &rendered.downloads {
        let downloads =
            Paragraph::new(lines.clone()).block(panel(t, Some(" Datasets "), false));
        frame.render_widget(downloads, chunks[2]);
    }

    // Newest events stay visible: keep the tail that fits.
    let visible = chunks[3].height.saturating_sub(2) as usize;
    let skip = rendered.events.len().saturating_sub(visible);
    let events: Vec<Line> = rendered.events.iter().skip(skip).cloned().collect();
    frame.render_widget(
        Paragraph::new(events).block(panel(t, Some(" Events "), false)),
        chunks[3],
    );

    frame.render_widget(Paragraph::new(rendered.status.clone()), chunks[4]);

    if let Some(help) = &rendered.help {
        let area = centered_rect(HELP_POPUP_WIDTH, HELP_POPUP_HEIGHT, size);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(help.clone()).block(panel(t, Some(" Help (h to close) "), true)),
            area,
        );
    }
}

fn panel<'a>(t: &Theme, title: Option<&'a str>, highlight: bool) -> Block<'a> {
    let border = if highlight {
        t.border_highlight_style()
    } else {
        t.border_style()
    };
    let block = Block::default().borders(Borders::ALL).border_style(border);
    match title {
        Some(title) => block.title(Span::styled(title, t.header_style())),
        None => block,
    }
}

/// Return a `Rect` centered within `area` with the given dimensions.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    use crate::models::{Event, EventLevel};
    use crate::state::{DownloadStatus, ProgressSnapshot};
    use crate::ui::frame::{build_frame, FrameInput};

    #[test]
    fn centered_rect_normal() {
        let area = Rect::new(0, 0, 100, 50);
        let r = centered_rect(40, 20, area);
        assert_eq!(r, Rect::new(30, 15, 40, 20));
    }

    #[test]
    fn centered_rect_larger_than_area() {
        let area = Rect::new(0, 0, 20, 10);
        let r = centered_rect(40, 20, area);
        assert_eq!(r.width, 20);
        assert_eq!(r.height, 10);
    }

    #[test]
    fn draws_into_test_backend() {
        let progress = ProgressSnapshot::default();
        let downloads = DownloadStatus::default();
        let events = vec![Event::new(EventLevel::Success, "Download complete: live")];
        let input = FrameInput {
            progress: &progress,
            events: &events,
            snapshot: None,
            downloads: &downloads,
            paused: false,
            input_enabled: true,
            show_help: true,
            tick: 0,
            width: 80,
        };
        let theme = Theme::default();
        let rendered = build_frame(&input, &theme);

        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|f| draw(f, &rendered, &theme)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let screen: String = buffer.content.iter().map(|c| c.symbol()).collect();
        assert!(screen.contains("Tourney Dash"));
        assert!(screen.contains("Keyboard Shortcuts"));
    }
}
