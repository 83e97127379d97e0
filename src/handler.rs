use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, Command, Focus, MOUSE_SCROLL_LINES};

/// Handle a key event, returning any background work it triggers.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Vec<Command> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return app.quit();
    }

    if app.help_visible {
        if matches!(
            key.code,
            KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter
        ) {
            app.help_visible = false;
        }
        return Vec::new();
    }

    if app.tree.is_filtering {
        return handle_filter_input(app, key);
    }
    if app.viewport.is_search_input() {
        handle_search_input(app, key);
        return Vec::new();
    }

    match key.code {
        KeyCode::Char('q') => return app.quit(),
        KeyCode::Char('?') => {
            app.help_visible = true;
            return Vec::new();
        }
        KeyCode::Tab => {
            app.toggle_focus();
            return Vec::new();
        }
        KeyCode::Char('f') => {
            app.toggle_fullscreen();
            return Vec::new();
        }
        KeyCode::Esc if app.fullscreen && !app.viewport.has_active_search() => {
            app.toggle_fullscreen();
            return Vec::new();
        }
        _ => {}
    }

    if app.fullscreen || app.focus == Focus::Preview {
        handle_preview_key(app, key);
        Vec::new()
    } else {
        handle_tree_key(app, key)
    }
}

fn handle_filter_input(app: &mut App, key: KeyEvent) -> Vec<Command> {
    match key.code {
        KeyCode::Esc => {
            app.tree.clear_filter();
        }
        KeyCode::Enter => {
            app.tree.accept_filter();
        }
        KeyCode::Backspace => {
            let mut query = app.tree.filter_query.clone();
            query.pop();
            app.tree.set_filter(&query);
        }
        KeyCode::Up => app.tree.move_selection(-1),
        KeyCode::Down => app.tree.move_selection(1),
        KeyCode::Char(c) => {
            let query = format!("{}{c}", app.tree.filter_query);
            app.tree.set_filter(&query);
        }
        _ => {}
    }
    Vec::new()
}

fn handle_search_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.viewport.cancel_search(),
        KeyCode::Enter => app.viewport.commit_search(),
        KeyCode::Backspace => app.viewport.pop_search_char(),
        KeyCode::Char(c) => app.viewport.push_search_char(c),
        _ => {}
    }
}

fn handle_tree_key(app: &mut App, key: KeyEvent) -> Vec<Command> {
    let page = app.panel_layout().content_height.max(1) as isize;
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.tree.move_selection(1),
        KeyCode::Char('k') | KeyCode::Up => app.tree.move_selection(-1),
        KeyCode::PageDown => app.tree.move_selection(page),
        KeyCode::PageUp => app.tree.move_selection(-page),
        KeyCode::Char('g') | KeyCode::Home => app.tree.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.tree.select_last(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
            let action = app.tree.toggle_selected();
            return app.apply_tree_action(action);
        }
        KeyCode::Char('h') | KeyCode::Left => {
            let action = app.tree.collapse_selected();
            return app.apply_tree_action(action);
        }
        KeyCode::Char('/') => {
            app.tree.start_filter();
        }
        KeyCode::Esc if !app.tree.filter_query.is_empty() => {
            app.tree.clear_filter();
        }
        KeyCode::Char('i') => return app.toggle_ignored(),
        _ => {}
    }
    Vec::new()
}

fn handle_preview_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let viewport = &mut app.viewport;
    match key.code {
        KeyCode::Char('d') if ctrl => viewport.half_page_down(),
        KeyCode::Char('u') if ctrl => viewport.half_page_up(),
        KeyCode::Char('j') | KeyCode::Down => viewport.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => viewport.scroll_up(1),
        KeyCode::PageDown => viewport.half_page_down(),
        KeyCode::PageUp => viewport.half_page_up(),
        KeyCode::Char('g') | KeyCode::Home => viewport.goto_top(),
        KeyCode::Char('G') | KeyCode::End => viewport.goto_bottom(),
        KeyCode::Char('/') => viewport.begin_search(),
        KeyCode::Char('n') => viewport.next_match(),
        KeyCode::Char('N') => viewport.previous_match(),
        KeyCode::Esc => viewport.clear_search(),
        _ => {}
    }
}

/// Route mouse wheel events to the panel under the pointer.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    let down = match mouse.kind {
        MouseEventKind::ScrollDown => true,
        MouseEventKind::ScrollUp => false,
        _ => return,
    };

    let over_tree =
        !app.fullscreen && (mouse.column as usize) < app.panel_layout().tree_width + 2;
    if over_tree {
        app.tree.move_selection(if down { 1 } else { -1 });
    } else if down {
        app.viewport.scroll_down(MOUSE_SCROLL_LINES);
    } else {
        app.viewport.scroll_up(MOUSE_SCROLL_LINES);
    }
}
