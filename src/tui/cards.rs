use crate::actions::{ActionBoard, ActionKind, ActionState, ControlId};
use crate::app::{AppState, BulletinStatus, QUICK_SELECT_MAX};
use crate::view::{CardRow, CardViewModel, Placeholder, PlaceholderKind};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let narrow = area.width < crate::app::NARROW_WIDTH_THRESHOLD;
    let inner_width = area.width as usize;

    let mut lines: Vec<Line> = Vec::new();
    let mut selected_span = (0, 0);
    let mut visual = 0;

    for row in &state.cards {
        match row {
            CardRow::Placeholder(placeholder) => {
                lines.push(placeholder_line(placeholder, state.spinner_frame));
            }
            CardRow::Card(card) => {
                let is_selected = visual == state.cursor;
                let has_notification = state
                    .notifications
                    .iter()
                    .any(|n| n.bulletin_id.as_deref() == Some(card.id.as_str()));
                let start = lines.len();
                lines.extend(card_lines(
                    card,
                    &state.actions,
                    visual,
                    is_selected,
                    has_notification,
                    narrow,
                    inner_width,
                ));
                if is_selected {
                    selected_span = (start, lines.len());
                }
                lines.push(Line::raw(""));
                visual += 1;
            }
        }
    }

    // Keep the whole selected card on screen
    let visible_height = area.height as usize;
    let scroll = selected_span
        .1
        .saturating_sub(visible_height)
        .min(selected_span.0);

    let list = Paragraph::new(lines)
        .scroll((scroll as u16, 0))
        .block(Block::default().borders(Borders::NONE));
    f.render_widget(list, area);
}

pub fn status_style(status: BulletinStatus) -> (&'static str, Color) {
    match status {
        BulletinStatus::Success | BulletinStatus::Ok => ("✓", Color::Green),
        BulletinStatus::Warning | BulletinStatus::Warn => ("⚠", Color::Yellow),
        BulletinStatus::Failed | BulletinStatus::Error => ("✗", Color::Red),
        BulletinStatus::Critical => ("‼", Color::Magenta),
        BulletinStatus::Pending => ("⟳", Color::Cyan),
        BulletinStatus::NoRecentRun => ("·", Color::DarkGray),
        BulletinStatus::SshError | BulletinStatus::SystemError => ("⊘", Color::Red),
        BulletinStatus::Unknown => ("?", Color::DarkGray),
    }
}

fn truncate(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        s.to_string()
    } else {
        let mut result = String::new();
        let mut width = 0;
        for c in s.chars() {
            let cw = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
            if width + cw + 1 > max_width {
                result.push('…');
                break;
            }
            result.push(c);
            width += cw;
        }
        result
    }
}

fn action_color(state: ActionState, enabled: bool) -> Color {
    match state {
        _ if !enabled => Color::DarkGray,
        ActionState::Idle => Color::Cyan,
        ActionState::Pending => Color::Yellow,
        ActionState::Success { .. } => Color::Green,
        ActionState::Failed { .. } => Color::Red,
    }
}

fn control_span(
    board: &ActionBoard,
    control: &ControlId,
    key: &str,
    enabled: bool,
) -> Vec<Span<'static>> {
    let state = board.state(control);
    let label = if enabled {
        board.label(control).to_string()
    } else {
        format!("{} (unavailable)", board.label(control))
    };
    vec![
        Span::styled(format!("{key} "), Style::default().fg(Color::DarkGray)),
        Span::styled(label, Style::default().fg(action_color(state, enabled))),
    ]
}

pub fn card_lines(
    card: &CardViewModel,
    board: &ActionBoard,
    visual_idx: usize,
    is_selected: bool,
    has_notification: bool,
    narrow: bool,
    max_width: usize,
) -> Vec<Line<'static>> {
    let (icon, color) = status_style(card.status);
    let idx_label = if visual_idx < QUICK_SELECT_MAX {
        format!("{}", visual_idx + 1)
    } else {
        " ".to_string()
    };
    let status = format!("[{}]", card.status.label());
    let warn_badge = if card.has_warnings { " ⚠ warnings" } else { "" };
    let notif_marker = if has_notification { "★ " } else { "" };

    let prefix_width = idx_label.len() + 1 + UnicodeWidthStr::width(icon) + 1;
    let suffix_width = status.len() + 1 + UnicodeWidthStr::width(warn_badge);
    let name_max = max_width.saturating_sub(prefix_width + suffix_width + 2);
    let name = truncate(&card.name, name_max);

    let select_style = if is_selected {
        Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{idx_label} {icon} "), Style::default().fg(color)),
        Span::styled(notif_marker.to_string(), Style::default().fg(Color::Yellow)),
        Span::styled(name, select_style),
        Span::styled(format!(" {status}"), Style::default().fg(color)),
        Span::styled(warn_badge.to_string(), Style::default().fg(Color::Yellow)),
    ])];

    if !card.last_run.is_empty() {
        let last_run = truncate(&card.last_run, max_width.saturating_sub(14));
        lines.push(Line::from(vec![
            Span::styled("    Last run: ", Style::default().fg(Color::DarkGray)),
            Span::raw(last_run),
        ]));
    }

    if !card.products.is_empty() {
        let mut spans = vec![Span::styled(
            "    Products:",
            Style::default().fg(Color::DarkGray),
        )];
        for product in &card.products {
            let control = ControlId::new(card.id.clone(), ActionKind::Download(product.index));
            spans.push(Span::raw(format!(" {}", product.index + 1)));
            spans.push(Span::raw(format!(" {} ", product.name)));
            if product.available {
                let state = board.state(&control);
                spans.push(Span::styled(
                    board.label(&control),
                    Style::default().fg(action_color(state, true)),
                ));
            } else {
                spans.push(Span::styled(
                    "unavailable",
                    Style::default().fg(Color::DarkGray),
                ));
            }
            if !narrow {
                if let Some(path) = &product.remote_path {
                    spans.push(Span::styled(
                        format!(" ({path})"),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }
        }
        lines.push(Line::from(spans));
    }

    let mut controls = vec![Span::raw("    ")];
    controls.extend(control_span(
        board,
        &ControlId::new(card.id.clone(), ActionKind::Rerun),
        "R",
        !card.rerun_disabled,
    ));
    controls.push(Span::raw("  "));
    controls.extend(control_span(
        board,
        &ControlId::new(card.id.clone(), ActionKind::CopyCommand),
        "y",
        card.access_command.is_some(),
    ));
    controls.push(Span::styled("  e ", Style::default().fg(Color::DarkGray)));
    controls.push(Span::styled("View log", Style::default().fg(Color::Cyan)));
    lines.push(Line::from(controls));

    if is_selected && !narrow {
        if let Some(command) = &card.access_command {
            lines.push(Line::from(vec![
                Span::styled("    $ ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    truncate(command, max_width.saturating_sub(6)),
                    Style::default().fg(Color::Blue),
                ),
            ]));
        }
    }

    lines
}

fn placeholder_line(placeholder: &Placeholder, spinner_frame: usize) -> Line<'static> {
    match placeholder.kind {
        PlaceholderKind::Loading => Line::from(vec![
            Span::styled(
                format!("  {} ", crate::tui::spinner::frame(spinner_frame)),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled(placeholder.message.clone(), Style::default().fg(Color::DarkGray)),
        ]),
        PlaceholderKind::Empty => Line::styled(
            format!("  {}", placeholder.message),
            Style::default().fg(Color::DarkGray),
        ),
        PlaceholderKind::Error => Line::styled(
            format!("  ✗ {}", placeholder.message),
            Style::default().fg(Color::Red),
        ),
    }
}
