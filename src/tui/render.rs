use crate::app::{ActiveOverlay, AppState};
use crate::tui::{cards, confirm_overlay, footer, header, log_overlay};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

pub fn render(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // header
            Constraint::Min(1),    // cards
            Constraint::Length(2), // footer
        ])
        .split(f.area());

    header::render(f, chunks[0], state);
    cards::render(f, chunks[1], state);
    footer::render(f, chunks[2], state);

    match &state.overlay {
        ActiveOverlay::Log(overlay) => log_overlay::render(f, overlay, state.spinner_frame),
        ActiveOverlay::Confirm(overlay) => confirm_overlay::render(f, overlay),
        ActiveOverlay::None => {}
    }

    // Error box stays visible over any overlay
    if let Some(err) = state.error_message() {
        render_error(f, err);
    }
}

fn render_error(f: &mut Frame, err: &str) {
    let area = f.area();
    if area.height <= 6 || area.width < 4 {
        return;
    }
    let err_area = Rect {
        x: area.x + 1,
        y: area.y + area.height.saturating_sub(6),
        width: area.width.saturating_sub(2),
        height: 4,
    };
    let err_widget = Paragraph::new(err.to_owned())
        .style(Style::default().fg(Color::Red).bg(Color::Black))
        .block(
            Block::default()
                .title(" Error (Esc to dismiss) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(ratatui::widgets::Clear, err_area);
    f.render_widget(err_widget, err_area);
}
