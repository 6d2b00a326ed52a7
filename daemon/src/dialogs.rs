//! Blocking native dialogs shown from the tray thread.

use rfd::{MessageButtons, MessageDialog, MessageLevel};

pub fn show_info(title: &str, message: &str) {
    MessageDialog::new()
        .set_level(MessageLevel::Info)
        .set_title(title)
        .set_description(message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

pub fn show_error(title: &str, message: &str) {
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title(title)
        .set_description(message)
        .set_buttons(MessageButtons::Ok)
        .show();
}

/// Asks for a line of text. Returns `None` if cancelled or left blank.
pub fn prompt_text(title: &str, message: &str) -> Option<String> {
    tinyfiledialogs::input_box(title, message, "")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
