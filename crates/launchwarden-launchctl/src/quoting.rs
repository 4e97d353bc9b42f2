//! Input validation and quoting for values that reach a shell.

use std::path::Path;

use crate::error::ControlError;

/// Accept only characters that occur in reverse-DNS service labels.
pub fn validate_label(label: &str) -> Result<&str, ControlError> {
    let valid = !label.is_empty()
        && label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '@' | '+' | '-'));

    if valid {
        Ok(label)
    } else {
        Err(ControlError::InvalidLabel(label.to_string()))
    }
}

/// Reject paths that cannot be passed through a line-oriented script.
pub fn validate_path(path: &Path) -> Result<&str, ControlError> {
    let text = path
        .to_str()
        .ok_or_else(|| ControlError::InvalidPath(path.to_string_lossy().into_owned()))?;

    if text.is_empty() || text.contains(['\0', '\n', '\r']) {
        return Err(ControlError::InvalidPath(text.to_string()));
    }
    Ok(text)
}

/// Quote one argument for POSIX `sh`: `foo'bar` -> `'foo'\''bar'`.
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', "'\\''"))
}

/// Escape text for the inside of an AppleScript string literal.
pub fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
