use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::AppState;

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let narrow = area.width < crate::app::NARROW_WIDTH_THRESHOLD;

    let hints: &[(&str, &str)] = if state.has_log_overlay() {
        &[
            ("j/k", "scroll"),
            ("x", "export errors"),
            ("w", "export warnings"),
            ("c", "export critical"),
            ("q", "close"),
        ]
    } else if state.has_confirm_overlay() {
        &[("y", "confirm"), ("n", "cancel")]
    } else if narrow {
        &[
            ("j/k", "nav"),
            ("e", "log"),
            ("R", "rerun"),
            ("d", "dl"),
            ("y", "copy"),
            ("r", "refresh"),
            ("q", "quit"),
        ]
    } else {
        &[
            ("↑↓/jk", "navigate"),
            ("1-9", "select"),
            ("e/Enter", "log"),
            ("R", "rerun"),
            ("d", "download"),
            ("y", "copy command"),
            ("r", "refresh"),
            ("q", "quit"),
        ]
    };

    let line = if state.picking_product {
        let count = state.selected_card().map_or(0, |c| c.products.len());
        Line::from(vec![
            Span::styled("Download which product? ", Style::default().fg(Color::Yellow)),
            Span::styled(format!("1-{count}"), Style::default().fg(Color::Cyan)),
            Span::styled(" (any other key cancels)", Style::default().fg(Color::DarkGray)),
        ])
    } else if let Some(notif) = state.notifications.last() {
        Line::from(vec![
            Span::styled("★ ", Style::default().fg(Color::Yellow)),
            Span::styled(&notif.message, Style::default().fg(Color::Yellow)),
        ])
    } else {
        let mut spans: Vec<Span> = Vec::new();
        for (i, (key, desc)) in hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw(" "));
            }
            spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
            spans.push(Span::styled(
                format!(" {desc}"),
                Style::default().fg(Color::DarkGray),
            ));
        }
        Line::from(spans)
    };

    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(footer, area);
}
