use crate::app::{LogContent, LogOverlay};
use crate::log::Severity;
use crate::tui::spinner;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

/// Rows taken by the border around the log body.
pub const CHROME_ROWS: u16 = 2;

/// The overlay rect for a terminal of `area`: ~90% width, ~80% height, centered.
pub fn overlay_area(area: Rect) -> Rect {
    let width = (area.width * 9 / 10).max(area.width.min(20)).min(area.width);
    let height = (area.height * 8 / 10).max(6).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// Number of log lines visible at once, used for paging and scroll bounds.
pub fn visible_height(area: Rect) -> usize {
    overlay_area(area).height.saturating_sub(CHROME_ROWS) as usize
}

fn severity_style(severity: Option<Severity>) -> Style {
    match severity {
        Some(Severity::Critical) => Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
        Some(Severity::Error) => Style::default().fg(Color::Red),
        Some(Severity::Warning) => Style::default().fg(Color::Yellow),
        None => Style::default(),
    }
}

pub fn render(f: &mut Frame, overlay: &LogOverlay, spinner_frame: usize) {
    let overlay_area = overlay_area(f.area());
    f.render_widget(Clear, overlay_area);

    let inner_height = overlay_area.height.saturating_sub(CHROME_ROWS) as usize;

    let total = overlay.line_count();
    let scroll_info = if total > inner_height {
        format!(
            " [{}-{}/{}] ",
            overlay.scroll + 1,
            (overlay.scroll + inner_height).min(total),
            total,
        )
    } else {
        String::new()
    };

    let title = format!(" {} {}", overlay.title, scroll_info);
    let hints = " j/k scroll | x errors | w warnings | c critical | q close ";

    let block = Block::default()
        .title(title)
        .title_bottom(Line::from(hints).centered())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .style(Style::default().bg(Color::Black));

    let visible_lines: Vec<Line> = match &overlay.content {
        LogContent::Loading => vec![Line::from(vec![
            Span::styled(
                format!("{} ", spinner::frame(spinner_frame)),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled("Loading log…", Style::default().fg(Color::DarkGray)),
        ])],
        LogContent::Loaded { lines, .. } if lines.is_empty() => vec![Line::styled(
            "(log is empty)",
            Style::default().fg(Color::DarkGray),
        )],
        LogContent::Loaded { lines, .. } => lines
            .iter()
            .skip(overlay.scroll)
            .take(inner_height)
            .map(|l| Line::styled(l.text.as_str(), severity_style(l.severity)))
            .collect(),
    };

    let paragraph = Paragraph::new(visible_lines)
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, overlay_area);
}
