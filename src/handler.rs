use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode, LoginField};
use crate::session::Screen;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.screen {
        Screen::Login => handle_login_key(app, key),
        Screen::Chat => match app.input_mode {
            InputMode::Normal => handle_chat_normal(app, key),
            InputMode::Editing => handle_chat_editing(app, key),
        },
        Screen::Upload => match app.input_mode {
            InputMode::Normal => handle_upload_normal(app, key),
            InputMode::Editing => handle_upload_editing(app, key),
        },
    }
}

fn handle_login_key(app: &mut App, key: KeyEvent) {
    if app.show_employee_form {
        handle_employee_form(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('g') | KeyCode::Enter => app.login_as_guest(),
        KeyCode::Char('e') => {
            app.show_employee_form = true;
            app.login_focus = LoginField::Email;
            app.input_mode = InputMode::Editing;
        }
        _ => {}
    }
}

fn handle_employee_form(app: &mut App, key: KeyEvent) {
    match key.code {
        // Back to options
        KeyCode::Esc => {
            app.show_employee_form = false;
            app.login_email.clear();
            app.login_password.clear();
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab | KeyCode::Down | KeyCode::Up => {
            app.login_focus = match app.login_focus {
                LoginField::Email => LoginField::Password,
                LoginField::Password => LoginField::Email,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginField::Email => app.login_focus = LoginField::Password,
            LoginField::Password => app.submit_employee_login(),
        },
        KeyCode::Backspace => {
            match app.login_focus {
                LoginField::Email => app.login_email.pop(),
                LoginField::Password => app.login_password.pop(),
            };
        }
        KeyCode::Char(c) => match app.login_focus {
            LoginField::Email => app.login_email.push(c),
            LoginField::Password => app.login_password.push(c),
        },
        _ => {}
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Focus the input line
        KeyCode::Char('i') | KeyCode::Char('/') => {
            app.input_mode = InputMode::Editing;
            app.chat_cursor = app.chat_input.chars().count();
        }

        // Scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(),
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        // Screen switching (route-guarded)
        KeyCode::Char('u') => app.navigate(Screen::Upload),

        KeyCode::Char('C') => app.clear_history(),
        KeyCode::Char('L') => app.logout(),
        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        // Submit; the input stays focused so follow-up questions flow.
        // Concurrent submissions are fine: each reply lands on its own turn.
        KeyCode::Enter => app.submit_chat(),
        KeyCode::Backspace => {
            if app.chat_cursor > 0 {
                app.chat_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.chat_input.chars().count();
            if app.chat_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
                app.chat_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.chat_cursor = app.chat_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.chat_input.chars().count();
            app.chat_cursor = (app.chat_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.chat_cursor = 0;
        }
        KeyCode::End => {
            app.chat_cursor = app.chat_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.chat_input, app.chat_cursor);
            app.chat_input.insert(byte_pos, c);
            app.chat_cursor += 1;
        }
        _ => {}
    }
}

fn handle_upload_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc | KeyCode::Char('c') => app.navigate(Screen::Chat),

        // Field focus
        KeyCode::Tab | KeyCode::Char('j') | KeyCode::Down => {
            app.upload_form.focus = app.upload_form.focus.next();
        }
        KeyCode::BackTab | KeyCode::Char('k') | KeyCode::Up => {
            app.upload_form.focus = app.upload_form.focus.prev();
        }

        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('s') => app.submit_upload(),
        KeyCode::Char('L') => app.logout(),
        _ => {}
    }
}

fn handle_upload_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        // Move through the form; submission happens from normal mode.
        KeyCode::Tab | KeyCode::Enter => {
            app.upload_form.focus = app.upload_form.focus.next();
        }
        KeyCode::BackTab => {
            app.upload_form.focus = app.upload_form.focus.prev();
        }
        KeyCode::Backspace => {
            app.upload_form.focused_value_mut().pop();
        }
        KeyCode::Char(c) => {
            app.upload_form.focused_value_mut().push(c);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_to_byte_index_ascii() {
        assert_eq!(char_to_byte_index("hello", 2), 2);
        assert_eq!(char_to_byte_index("hello", 99), 5);
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        // 'é' is two bytes in UTF-8
        assert_eq!(char_to_byte_index("éé", 1), 2);
    }
}
