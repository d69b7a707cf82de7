use crate::log::LogFilter;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Quit,
    DismissError,
    MoveUp,
    MoveDown,
    Refresh,
    Rerun,
    ViewLog,
    QuickSelect(usize),
    /// `d`: download the only product, or start picking one by number.
    BeginDownload,
    /// Zero-based product index chosen while picking.
    DownloadProduct(usize),
    CancelPick,
    CopyCommand,
    CloseOverlay,
    ScrollUp,
    ScrollDown,
    PageUp,
    PageDown,
    ScrollToTop,
    ScrollToBottom,
    Export(LogFilter),
    Confirm,
    Cancel,
    None,
}

/// Which overlay (if any) is currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayMode {
    #[default]
    None,
    Log,
    Confirm,
}

/// Captures the UI state needed to interpret a key press.
#[derive(Debug, Clone, Default)]
pub struct InputContext {
    pub has_error: bool,
    pub is_loading: bool,
    pub overlay: OverlayMode,
    pub picking_product: bool,
}

fn digit(c: char) -> Option<usize> {
    c.to_digit(10).filter(|d| *d != 0).map(|d| d as usize)
}

pub fn map_key(key: KeyEvent, ctx: &InputContext) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }

    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    match ctx.overlay {
        OverlayMode::Confirm => {
            return match key.code {
                KeyCode::Char('y' | 'Y') | KeyCode::Enter => Action::Confirm,
                KeyCode::Char('n' | 'N' | 'q') | KeyCode::Esc => Action::Cancel,
                _ => Action::None,
            };
        }
        OverlayMode::Log => {
            return match key.code {
                KeyCode::Char('j') | KeyCode::Down => Action::ScrollDown,
                KeyCode::Char('k') | KeyCode::Up => Action::ScrollUp,
                KeyCode::PageDown | KeyCode::Char(' ') => Action::PageDown,
                KeyCode::PageUp => Action::PageUp,
                KeyCode::Char('g') | KeyCode::Home => Action::ScrollToTop,
                KeyCode::Char('G') | KeyCode::End => Action::ScrollToBottom,
                KeyCode::Char('x') => Action::Export(LogFilter::Errors),
                KeyCode::Char('w') => Action::Export(LogFilter::Warnings),
                KeyCode::Char('c') => Action::Export(LogFilter::Critical),
                KeyCode::Char('q' | 'e') | KeyCode::Esc => Action::CloseOverlay,
                _ => Action::None,
            };
        }
        OverlayMode::None => {}
    }

    if ctx.picking_product {
        return match key.code {
            KeyCode::Char(c) => {
                digit(c).map_or(Action::CancelPick, |n| Action::DownloadProduct(n - 1))
            }
            _ => Action::CancelPick,
        };
    }

    match key.code {
        KeyCode::Char('q') => Action::Quit,
        KeyCode::Esc => {
            if ctx.has_error {
                Action::DismissError
            } else {
                Action::Quit
            }
        }
        KeyCode::Up | KeyCode::Char('k') => Action::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => Action::MoveDown,
        KeyCode::Char('r') if !ctx.is_loading => Action::Refresh,
        KeyCode::Char('R') => Action::Rerun,
        KeyCode::Char('e' | 'l') | KeyCode::Enter => Action::ViewLog,
        KeyCode::Char('d') => Action::BeginDownload,
        KeyCode::Char('y') => Action::CopyCommand,
        KeyCode::Char(c) => digit(c).map_or(Action::None, Action::QuickSelect),
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn press_with(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn release(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        }
    }

    fn ctx() -> InputContext {
        InputContext::default()
    }

    fn ctx_error() -> InputContext {
        InputContext { has_error: true, ..Default::default() }
    }

    fn ctx_loading() -> InputContext {
        InputContext { is_loading: true, ..Default::default() }
    }

    fn ctx_log() -> InputContext {
        InputContext { overlay: OverlayMode::Log, ..Default::default() }
    }

    fn ctx_confirm() -> InputContext {
        InputContext { overlay: OverlayMode::Confirm, ..Default::default() }
    }

    fn ctx_pick() -> InputContext {
        InputContext { picking_product: true, ..Default::default() }
    }

    #[test]
    fn quit_on_q() {
        assert_eq!(map_key(press(KeyCode::Char('q')), &ctx()), Action::Quit);
    }

    #[test]
    fn esc_quits_without_error() {
        assert_eq!(map_key(press(KeyCode::Esc), &ctx()), Action::Quit);
    }

    #[test]
    fn esc_dismisses_error_when_present() {
        assert_eq!(map_key(press(KeyCode::Esc), &ctx_error()), Action::DismissError);
    }

    #[test]
    fn ctrl_c_quits() {
        assert_eq!(
            map_key(press_with(KeyCode::Char('c'), KeyModifiers::CONTROL), &ctx()),
            Action::Quit
        );
    }

    #[test]
    fn move_keys() {
        assert_eq!(map_key(press(KeyCode::Up), &ctx()), Action::MoveUp);
        assert_eq!(map_key(press(KeyCode::Char('k')), &ctx()), Action::MoveUp);
        assert_eq!(map_key(press(KeyCode::Down), &ctx()), Action::MoveDown);
        assert_eq!(map_key(press(KeyCode::Char('j')), &ctx()), Action::MoveDown);
    }

    #[test]
    fn refresh_r() {
        assert_eq!(map_key(press(KeyCode::Char('r')), &ctx()), Action::Refresh);
    }

    #[test]
    fn refresh_blocked_while_loading() {
        assert_eq!(map_key(press(KeyCode::Char('r')), &ctx_loading()), Action::None);
    }

    #[test]
    fn rerun_capital_r() {
        assert_eq!(map_key(press(KeyCode::Char('R')), &ctx()), Action::Rerun);
    }

    #[test]
    fn view_log_keys() {
        assert_eq!(map_key(press(KeyCode::Char('e')), &ctx()), Action::ViewLog);
        assert_eq!(map_key(press(KeyCode::Char('l')), &ctx()), Action::ViewLog);
        assert_eq!(map_key(press(KeyCode::Enter), &ctx()), Action::ViewLog);
    }

    #[test]
    fn download_and_copy() {
        assert_eq!(map_key(press(KeyCode::Char('d')), &ctx()), Action::BeginDownload);
        assert_eq!(map_key(press(KeyCode::Char('y')), &ctx()), Action::CopyCommand);
    }

    #[test]
    fn quick_select_digits_1_to_9() {
        for d in 1..=9u8 {
            let c = (b'0' + d) as char;
            assert_eq!(
                map_key(press(KeyCode::Char(c)), &ctx()),
                Action::QuickSelect(d as usize)
            );
        }
    }

    #[test]
    fn digit_zero_returns_none() {
        assert_eq!(map_key(press(KeyCode::Char('0')), &ctx()), Action::None);
    }

    #[test]
    fn unbound_key_returns_none() {
        assert_eq!(map_key(press(KeyCode::Char('z')), &ctx()), Action::None);
    }

    #[test]
    fn non_press_event_filtered() {
        assert_eq!(map_key(release(KeyCode::Char('q')), &ctx()), Action::None);
    }

    // --- Product picking ---

    #[test]
    fn pick_digit_is_zero_based_index() {
        assert_eq!(map_key(press(KeyCode::Char('1')), &ctx_pick()), Action::DownloadProduct(0));
        assert_eq!(map_key(press(KeyCode::Char('3')), &ctx_pick()), Action::DownloadProduct(2));
    }

    #[test]
    fn pick_anything_else_cancels() {
        assert_eq!(map_key(press(KeyCode::Char('0')), &ctx_pick()), Action::CancelPick);
        assert_eq!(map_key(press(KeyCode::Esc), &ctx_pick()), Action::CancelPick);
        assert_eq!(map_key(press(KeyCode::Char('q')), &ctx_pick()), Action::CancelPick);
    }

    // --- Log overlay ---

    #[test]
    fn overlay_scrolling() {
        assert_eq!(map_key(press(KeyCode::Char('j')), &ctx_log()), Action::ScrollDown);
        assert_eq!(map_key(press(KeyCode::Char('k')), &ctx_log()), Action::ScrollUp);
        assert_eq!(map_key(press(KeyCode::PageDown), &ctx_log()), Action::PageDown);
        assert_eq!(map_key(press(KeyCode::PageUp), &ctx_log()), Action::PageUp);
        assert_eq!(map_key(press(KeyCode::Char('g')), &ctx_log()), Action::ScrollToTop);
        assert_eq!(map_key(press(KeyCode::Char('G')), &ctx_log()), Action::ScrollToBottom);
    }

    #[test]
    fn overlay_export_keys() {
        assert_eq!(
            map_key(press(KeyCode::Char('x')), &ctx_log()),
            Action::Export(LogFilter::Errors)
        );
        assert_eq!(
            map_key(press(KeyCode::Char('w')), &ctx_log()),
            Action::Export(LogFilter::Warnings)
        );
        assert_eq!(
            map_key(press(KeyCode::Char('c')), &ctx_log()),
            Action::Export(LogFilter::Critical)
        );
    }

    #[test]
    fn overlay_close_keys() {
        assert_eq!(map_key(press(KeyCode::Char('q')), &ctx_log()), Action::CloseOverlay);
        assert_eq!(map_key(press(KeyCode::Esc), &ctx_log()), Action::CloseOverlay);
        assert_eq!(map_key(press(KeyCode::Char('e')), &ctx_log()), Action::CloseOverlay);
    }

    #[test]
    fn overlay_ctrl_c_quits() {
        assert_eq!(
            map_key(press_with(KeyCode::Char('c'), KeyModifiers::CONTROL), &ctx_log()),
            Action::Quit
        );
    }

    #[test]
    fn overlay_swallows_main_keys() {
        assert_eq!(map_key(press(KeyCode::Char('R')), &ctx_log()), Action::None);
        assert_eq!(map_key(press(KeyCode::Char('1')), &ctx_log()), Action::None);
    }

    // --- Confirm overlay ---

    #[test]
    fn confirm_keys() {
        assert_eq!(map_key(press(KeyCode::Char('y')), &ctx_confirm()), Action::Confirm);
        assert_eq!(map_key(press(KeyCode::Enter), &ctx_confirm()), Action::Confirm);
        assert_eq!(map_key(press(KeyCode::Char('n')), &ctx_confirm()), Action::Cancel);
        assert_eq!(map_key(press(KeyCode::Esc), &ctx_confirm()), Action::Cancel);
        assert_eq!(map_key(press(KeyCode::Char('R')), &ctx_confirm()), Action::None);
    }
}
