use crate::app::AppState;
use crate::tui::spinner;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let narrow = area.width < crate::app::NARROW_WIDTH_THRESHOLD;

    let mut spans = vec![
        Span::styled(
            format!(
                " bw v{}+{} ",
                env!("CARGO_PKG_VERSION"),
                env!("BUILD_NUMBER")
            ),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ "),
        Span::styled(
            state.config.base_url.as_str(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ];

    // Last updated marker, red when the latest fetch failed
    match state.store.last_updated() {
        Some(updated) => {
            let color = if updated.is_error { Color::Red } else { Color::DarkGray };
            let label = if narrow { " " } else { " updated " };
            spans.push(Span::styled(label, Style::default().fg(Color::DarkGray)));
            spans.push(Span::styled(
                updated.time.format("%H:%M:%S").to_string(),
                Style::default().fg(color),
            ));
            if updated.is_error {
                spans.push(Span::styled(
                    " !",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ));
            }
        }
        None => spans.push(Span::styled(" never updated", Style::default().fg(Color::DarkGray))),
    }

    if state.is_loading() || state.actions.any_pending() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            spinner::frame(state.spinner_frame).to_string(),
            Style::default().fg(Color::Yellow),
        ));
    } else if !narrow {
        spans.push(Span::styled(
            format!(" every {}s", state.poll_interval),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(header, area);
}
